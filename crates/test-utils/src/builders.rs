#![allow(dead_code)]

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use forget_me::config::{SourceConfig, SystemConfig, DEFAULT_LANE_TIMEOUT};
use forget_me::errors::Result;
use forget_me::task::TaskDiscoverer;
use forget_me::types::{LaneSettings, Properties, SubjectIdentifier};

/// Subject with a fixed pseudonym, for assertions.
pub fn test_subject() -> SubjectIdentifier {
    SubjectIdentifier::with_pseudonym("alice", "PRIMARY", "-1234", "pseudo-alice")
}

/// Builder for `SystemConfig` to simplify test setup.
pub struct SystemConfigBuilder {
    lanes: Vec<String>,
    settings: BTreeMap<String, BTreeMap<String, String>>,
    sources: Vec<SourceConfig>,
    lane_timeout: Duration,
}

impl SystemConfigBuilder {
    pub fn new() -> Self {
        Self {
            lanes: Vec::new(),
            settings: BTreeMap::new(),
            sources: Vec::new(),
            lane_timeout: DEFAULT_LANE_TIMEOUT,
        }
    }

    pub fn with_lane(mut self, name: &str) -> Self {
        self.lanes.push(name.to_string());
        self
    }

    pub fn with_lane_setting(mut self, lane: &str, key: &str, value: &str) -> Self {
        self.settings
            .entry(lane.to_string())
            .or_default()
            .insert(key.to_string(), value.to_string());
        self
    }

    /// Add a source feeding `lane_type`, located at `mem/<n>`.
    pub fn with_source(mut self, lane_type: &str, discoverer: Arc<dyn TaskDiscoverer>) -> Self {
        let location = PathBuf::from(format!("mem/{}", self.sources.len()));
        self.sources.push(SourceConfig {
            location,
            discoverer,
            properties: Properties::new(),
            lane_type: lane_type.to_string(),
        });
        self
    }

    pub fn with_lane_timeout(mut self, timeout: Duration) -> Self {
        self.lane_timeout = timeout;
        self
    }

    pub fn try_build(self) -> Result<SystemConfig> {
        let settings = self
            .settings
            .into_iter()
            .map(|(lane, values)| {
                let settings = Arc::new(LaneSettings::new(lane.clone(), values));
                (lane, settings)
            })
            .collect();
        SystemConfig::new(self.lanes, settings, self.sources, self.lane_timeout)
    }

    pub fn build(self) -> SystemConfig {
        self.try_build()
            .expect("Failed to build valid config from builder")
    }
}

impl Default for SystemConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
