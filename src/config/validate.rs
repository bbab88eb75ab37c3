// src/config/validate.rs

use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tracing::warn;

use crate::config::duration::parse_duration;
use crate::config::model::{RawConfigFile, SourceConfig, SystemConfig, MAX_LANES};
use crate::engine::LaneName;
use crate::errors::{ForgetMeError, Result};
use crate::task::DiscovererRegistry;
use crate::types::LaneSettings;

impl SystemConfig {
    /// Build a validated config from already-resolved parts.
    pub fn new(
        lanes: Vec<LaneName>,
        lane_settings: BTreeMap<LaneName, Arc<LaneSettings>>,
        sources: Vec<SourceConfig>,
        lane_timeout: Duration,
    ) -> Result<Self> {
        validate_lanes(&lanes)?;
        validate_lane_settings(&lanes, lane_settings.keys())?;
        validate_timeout(lane_timeout)?;
        warn_orphan_sources(&lanes, &sources);
        Ok(Self::new_unchecked(lanes, lane_settings, sources, lane_timeout))
    }

    /// Turn a raw TOML config into a [`SystemConfig`].
    ///
    /// Relative source paths are resolved against `home`; `reader` names are
    /// looked up in `registry`.
    pub fn resolve(
        raw: RawConfigFile,
        home: &Path,
        registry: &DiscovererRegistry,
    ) -> Result<Self> {
        let lane_timeout = parse_duration(&raw.config.lane_timeout).map_err(|e| {
            ForgetMeError::ConfigError(format!("invalid [config].lane_timeout: {e}"))
        })?;

        let mut sources = Vec::with_capacity(raw.source.len());
        for entry in raw.source {
            let discoverer = registry
                .get(&entry.reader)
                .ok_or_else(|| ForgetMeError::UnknownReader(entry.reader.clone()))?;
            let lane_type = entry
                .lane
                .unwrap_or_else(|| discoverer.lane_type().to_string());
            let location = if entry.path.is_absolute() {
                entry.path
            } else {
                home.join(entry.path)
            };
            sources.push(SourceConfig {
                location,
                discoverer,
                properties: entry.properties,
                lane_type,
            });
        }

        let lane_settings = raw
            .lane
            .into_iter()
            .map(|(name, values)| {
                let settings = Arc::new(LaneSettings::new(name.clone(), values));
                (name, settings)
            })
            .collect();

        Self::new(raw.config.lanes, lane_settings, sources, lane_timeout)
    }
}

fn validate_lanes(lanes: &[LaneName]) -> Result<()> {
    if lanes.is_empty() {
        return Err(ForgetMeError::ConfigError(
            "[config].lanes must name at least one lane".to_string(),
        ));
    }

    if lanes.len() > MAX_LANES {
        return Err(ForgetMeError::ConfigError(format!(
            "[config].lanes has {} entries; at most {} lanes are supported",
            lanes.len(),
            MAX_LANES
        )));
    }

    let mut seen = HashSet::new();
    for lane in lanes {
        if lane.trim().is_empty() {
            return Err(ForgetMeError::ConfigError(
                "[config].lanes contains an empty lane name".to_string(),
            ));
        }
        // Lane names become thread names.
        if lane.chars().any(char::is_control) {
            return Err(ForgetMeError::ConfigError(format!(
                "lane {:?} contains control characters",
                lane
            )));
        }
        if !seen.insert(lane.as_str()) {
            return Err(ForgetMeError::ConfigError(format!(
                "lane '{}' is declared more than once in [config].lanes",
                lane
            )));
        }
    }
    Ok(())
}

fn validate_lane_settings<'a>(
    lanes: &[LaneName],
    names: impl Iterator<Item = &'a LaneName>,
) -> Result<()> {
    for name in names {
        if !lanes.contains(name) {
            return Err(ForgetMeError::ConfigError(format!(
                "[lane.{}] does not match any lane in [config].lanes",
                name
            )));
        }
    }
    Ok(())
}

fn validate_timeout(timeout: Duration) -> Result<()> {
    if timeout.is_zero() {
        return Err(ForgetMeError::ConfigError(
            "[config].lane_timeout must be greater than zero".to_string(),
        ));
    }
    Ok(())
}

fn warn_orphan_sources(lanes: &[LaneName], sources: &[SourceConfig]) {
    for source in sources {
        if !lanes.contains(&source.lane_type) {
            warn!(
                location = ?source.location,
                lane_type = %source.lane_type,
                "source does not match any configured lane; it will be ignored"
            );
        }
    }
}
