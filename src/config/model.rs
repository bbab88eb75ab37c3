// src/config/model.rs

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;

use crate::engine::LaneName;
use crate::task::TaskDiscoverer;
use crate::types::{LaneSettings, Properties};

/// Upper bound on configured lanes. Every lane gets its own OS thread, and a
/// lane abandoned on timeout may keep its thread until the blocked I/O
/// returns.
pub const MAX_LANES: usize = 64;

/// Default per-lane timeout.
pub const DEFAULT_LANE_TIMEOUT: Duration = Duration::from_secs(60 * 60);

/// Top-level configuration as read from `config.toml`.
///
/// ```toml
/// [config]
/// lanes = ["log-file", "file-delete"]
/// lane_timeout = "1h"
///
/// [lane.log-file]
/// backup = "true"
///
/// [[source]]
/// path = "logs"
/// reader = "log-file"
///
/// [source.properties]
/// include = "*.log"
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawConfigFile {
    #[serde(default)]
    pub config: ConfigSection,

    /// `[lane.<name>]` settings; keys must name a declared lane.
    #[serde(default)]
    pub lane: BTreeMap<String, BTreeMap<String, String>>,

    /// `[[source]]` entries, in declaration order.
    #[serde(default)]
    pub source: Vec<SourceEntry>,
}

/// `[config]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigSection {
    /// Lane names; one pipeline and one thread per name.
    #[serde(default)]
    pub lanes: Vec<String>,

    /// Duration string (e.g. `"30m"`) bounding how long the engine waits for
    /// each lane.
    #[serde(default = "default_lane_timeout")]
    pub lane_timeout: String,
}

fn default_lane_timeout() -> String {
    "1h".to_string()
}

impl Default for ConfigSection {
    fn default() -> Self {
        Self {
            lanes: Vec::new(),
            lane_timeout: default_lane_timeout(),
        }
    }
}

/// `[[source]]` entry.
#[derive(Debug, Clone, Deserialize)]
pub struct SourceEntry {
    /// Directory or file to read instructions from, relative to the home dir.
    pub path: PathBuf,

    /// Discoverer kind, e.g. `"log-file"`.
    pub reader: String,

    /// Lane this source feeds. Defaults to the reader's own lane type.
    #[serde(default)]
    pub lane: Option<String>,

    #[serde(default)]
    pub properties: Properties,
}

/// A source with its discoverer resolved.
#[derive(Debug, Clone)]
pub struct SourceConfig {
    pub location: PathBuf,
    pub discoverer: Arc<dyn TaskDiscoverer>,
    pub properties: Properties,
    pub lane_type: String,
}

/// Validated, immutable configuration handed to the engine.
///
/// Constructed through [`SystemConfig::new`] or
/// [`SystemConfig::resolve`](crate::config::validate), both of which
/// validate.
#[derive(Debug, Clone)]
pub struct SystemConfig {
    lanes: Vec<LaneName>,
    lane_settings: BTreeMap<LaneName, Arc<LaneSettings>>,
    sources: Vec<SourceConfig>,
    lane_timeout: Duration,
}

impl SystemConfig {
    pub(crate) fn new_unchecked(
        lanes: Vec<LaneName>,
        lane_settings: BTreeMap<LaneName, Arc<LaneSettings>>,
        sources: Vec<SourceConfig>,
        lane_timeout: Duration,
    ) -> Self {
        Self {
            lanes,
            lane_settings,
            sources,
            lane_timeout,
        }
    }

    pub fn lanes(&self) -> &[LaneName] {
        &self.lanes
    }

    /// Settings for `lane`; lanes without a `[lane.<name>]` section get an
    /// empty set.
    pub fn settings_for(&self, lane: &str) -> Arc<LaneSettings> {
        self.lane_settings
            .get(lane)
            .cloned()
            .unwrap_or_else(|| Arc::new(LaneSettings::empty(lane)))
    }

    pub fn sources(&self) -> &[SourceConfig] {
        &self.sources
    }

    /// Sources whose lane type is exactly `lane`, in declaration order.
    pub fn sources_for<'a>(&'a self, lane: &'a str) -> impl Iterator<Item = &'a SourceConfig> {
        self.sources.iter().filter(move |s| s.lane_type == lane)
    }

    pub fn lane_timeout(&self) -> Duration {
        self.lane_timeout
    }
}
