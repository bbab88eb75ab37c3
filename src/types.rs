// src/types.rs

//! Value types shared by every lane: the subject being forgotten and the
//! per-lane settings. Both are immutable once built and are handed to lane
//! threads behind an `Arc`.

use std::collections::BTreeMap;
use std::fmt;

use uuid::Uuid;

pub const DEFAULT_USER_STORE_DOMAIN: &str = "PRIMARY";
pub const DEFAULT_TENANT_DOMAIN: &str = "-1234";
pub const SUPER_TENANT_DOMAIN: &str = "carbon.super";

/// Free-form `key = "value"` properties attached to a source.
pub type Properties = BTreeMap<String, String>;

/// Identity of the user whose data is being redacted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubjectIdentifier {
    username: String,
    user_store_domain: String,
    tenant_domain: String,
    pseudonym: String,
}

impl SubjectIdentifier {
    /// Build a subject with a freshly generated random pseudonym.
    pub fn new(
        username: impl Into<String>,
        user_store_domain: impl Into<String>,
        tenant_domain: impl Into<String>,
    ) -> Self {
        Self::with_pseudonym(
            username,
            user_store_domain,
            tenant_domain,
            Uuid::new_v4().to_string(),
        )
    }

    pub fn with_pseudonym(
        username: impl Into<String>,
        user_store_domain: impl Into<String>,
        tenant_domain: impl Into<String>,
        pseudonym: impl Into<String>,
    ) -> Self {
        Self {
            username: username.into(),
            user_store_domain: user_store_domain.into(),
            tenant_domain: tenant_domain.into(),
            pseudonym: pseudonym.into(),
        }
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn user_store_domain(&self) -> &str {
        &self.user_store_domain
    }

    pub fn tenant_domain(&self) -> &str {
        &self.tenant_domain
    }

    pub fn pseudonym(&self) -> &str {
        &self.pseudonym
    }

    /// The super tenant is spelled either by id or by name.
    pub fn is_super_tenant(&self) -> bool {
        self.tenant_domain == DEFAULT_TENANT_DOMAIN || self.tenant_domain == SUPER_TENANT_DOMAIN
    }
}

impl fmt::Display for SubjectIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}@{}",
            self.user_store_domain, self.username, self.tenant_domain
        )
    }
}

/// Settings scoped to one lane, from the `[lane.<name>]` config section.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LaneSettings {
    lane: String,
    values: BTreeMap<String, String>,
}

impl LaneSettings {
    pub fn new(lane: impl Into<String>, values: BTreeMap<String, String>) -> Self {
        Self {
            lane: lane.into(),
            values,
        }
    }

    /// Settings for a lane with no `[lane.<name>]` section.
    pub fn empty(lane: impl Into<String>) -> Self {
        Self::new(lane, BTreeMap::new())
    }

    pub fn lane(&self) -> &str {
        &self.lane
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// Interpret a setting as a boolean switch (`true`, `yes`, `1`).
    pub fn flag(&self, key: &str) -> bool {
        matches!(
            self.get(key).map(|v| v.trim().to_lowercase()).as_deref(),
            Some("true" | "yes" | "1")
        )
    }

    pub fn values(&self) -> &BTreeMap<String, String> {
        &self.values
    }
}
