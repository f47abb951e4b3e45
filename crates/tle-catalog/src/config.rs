//! Store configuration.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{CatalogError, Result};
use crate::groups::{is_valid_group, AVAILABLE_GROUPS};

/// Default refresh interval: 6 hours.
pub const DEFAULT_UPDATE_INTERVAL_SECS: u64 = 6 * 60 * 60;

/// Refresh intervals below one minute are rejected by validation.
pub const MIN_UPDATE_INTERVAL_SECS: u64 = 60;

pub const DEFAULT_CACHE_DIR: &str = "data/tle_cache";

pub const DEFAULT_MAX_TLE_AGE_DAYS: f64 = 7.0;

fn default_groups() -> Vec<String> {
    ["stations", "amateur", "cubesat"]
        .into_iter()
        .map(String::from)
        .collect()
}

/// Catalog store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    /// Upstream groups to load and keep refreshed.
    pub groups: Vec<String>,
    /// Background refresh interval in seconds.
    pub update_interval_secs: u64,
    /// Directory for the file cache.
    pub cache_dir: PathBuf,
    /// Element sets older than this are counted as stale, and cached groups
    /// older than this are no longer considered fresh.
    pub max_tle_age_days: f64,
    /// Reserved for satellite metadata enrichment.
    pub enable_metadata: bool,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            groups: default_groups(),
            update_interval_secs: DEFAULT_UPDATE_INTERVAL_SECS,
            cache_dir: PathBuf::from(DEFAULT_CACHE_DIR),
            max_tle_age_days: DEFAULT_MAX_TLE_AGE_DAYS,
            enable_metadata: false,
        }
    }
}

impl CatalogConfig {
    /// Refresh interval, clamped to at least one minute.
    pub fn update_interval(&self) -> Duration {
        Duration::from_secs(self.update_interval_secs.max(MIN_UPDATE_INTERVAL_SECS))
    }

    /// Replaces empty or out-of-range fields with defaults and rejects group
    /// names outside the known catalog.
    pub fn validate(&mut self) -> Result<()> {
        if self.update_interval_secs < MIN_UPDATE_INTERVAL_SECS {
            self.update_interval_secs = DEFAULT_UPDATE_INTERVAL_SECS;
        }
        if self.cache_dir.as_os_str().is_empty() {
            self.cache_dir = PathBuf::from(DEFAULT_CACHE_DIR);
        }
        if self.max_tle_age_days <= 0.0 {
            self.max_tle_age_days = DEFAULT_MAX_TLE_AGE_DAYS;
        }
        if self.groups.is_empty() {
            self.groups = default_groups();
        }

        let invalid: Vec<&str> = self
            .groups
            .iter()
            .filter(|g| !is_valid_group(g))
            .map(String::as_str)
            .collect();
        if !invalid.is_empty() {
            return Err(CatalogError::UnknownGroups {
                names: invalid.join(", "),
                available: AVAILABLE_GROUPS.join(", "),
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let cfg = CatalogConfig::default();
        assert_eq!(cfg.groups, vec!["stations", "amateur", "cubesat"]);
        assert_eq!(cfg.update_interval(), Duration::from_secs(21_600));
        assert_eq!(cfg.cache_dir, PathBuf::from("data/tle_cache"));
        assert_eq!(cfg.max_tle_age_days, 7.0);
        assert!(!cfg.enable_metadata);
    }

    #[test]
    fn validate_fills_and_clamps() {
        let mut cfg = CatalogConfig {
            groups: Vec::new(),
            update_interval_secs: 5,
            cache_dir: PathBuf::new(),
            max_tle_age_days: -1.0,
            enable_metadata: false,
        };

        cfg.validate().unwrap();
        assert_eq!(cfg.groups, default_groups());
        assert_eq!(cfg.update_interval_secs, DEFAULT_UPDATE_INTERVAL_SECS);
        assert_eq!(cfg.cache_dir, PathBuf::from(DEFAULT_CACHE_DIR));
        assert_eq!(cfg.max_tle_age_days, DEFAULT_MAX_TLE_AGE_DAYS);
    }

    #[test]
    fn validate_rejects_unknown_groups() {
        let mut cfg = CatalogConfig {
            groups: vec!["stations".into(), "not-a-group".into()],
            ..Default::default()
        };

        let err = cfg.validate().unwrap_err();
        assert!(matches!(err, CatalogError::UnknownGroups { .. }));
        assert!(err.to_string().contains("not-a-group"));
    }

    #[test]
    fn group_names_are_case_insensitive() {
        let mut cfg = CatalogConfig {
            groups: vec!["Stations".into(), "STARLINK".into()],
            ..Default::default()
        };
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn deserializes_with_partial_fields() {
        let cfg: CatalogConfig =
            serde_json::from_str(r#"{"groups": ["weather"], "update_interval_secs": 3600}"#)
                .unwrap();
        assert_eq!(cfg.groups, vec!["weather"]);
        assert_eq!(cfg.update_interval_secs, 3600);
        assert_eq!(cfg.max_tle_age_days, DEFAULT_MAX_TLE_AGE_DAYS);
    }
}
