//! File-backed TLE cache.
//!
//! Layout under the cache directory:
//!   - `<group>.tle`: the group's records in 3-line text form, one per
//!     block, trailing newline;
//!   - `cache_meta.json`: per-group `{ updated_at, count }` freshness
//!     metadata.
//!
//! Directories are created 0750 and files written 0600. A missing metadata
//! file reads as an empty map. Writes are single whole-file replacements, so
//! a failed fetch never leaves a partially written group behind an intact
//! metadata entry.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use orbit_core::Tle;
use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::warn;

use crate::error::{CatalogError, Result};

pub const CACHE_META_FILENAME: &str = "cache_meta.json";

const TLE_FILE_EXTENSION: &str = "tle";

/// Freshness metadata for the whole cache.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CacheMeta {
    pub groups: HashMap<String, GroupMeta>,
}

/// Metadata for one cached group.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GroupMeta {
    pub updated_at: DateTime<Utc>,
    pub count: usize,
}

impl CacheMeta {
    /// True if the group was refreshed within the last `max_age_days`.
    pub fn is_fresh(&self, group: &str, max_age_days: f64) -> bool {
        match self.groups.get(&group.to_lowercase()) {
            Some(meta) => {
                let age_ms = (Utc::now() - meta.updated_at).num_milliseconds() as f64;
                age_ms < max_age_days * 86_400_000.0
            }
            None => false,
        }
    }
}

/// TLE group cache rooted at one directory.
pub struct TleCache {
    dir: PathBuf,
}

impl TleCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn group_path(&self, group: &str) -> PathBuf {
        self.dir
            .join(format!("{}.{TLE_FILE_EXTENSION}", group.to_lowercase()))
    }

    /// Reads and parses a cached group.
    pub async fn load_group(&self, group: &str) -> Result<Vec<Tle>> {
        let path = self.group_path(group);
        let data = fs::read_to_string(&path)
            .await
            .map_err(|source| CatalogError::CacheRead {
                path: path.clone(),
                source,
            })?;

        Ok(Tle::parse_batch(&data)?)
    }

    /// Writes a group's records and refreshes its metadata entry.
    pub async fn store_group(&self, group: &str, tles: &[Tle]) -> Result<()> {
        self.ensure_dir().await?;

        let mut body = String::new();
        for tle in tles {
            body.push_str(&tle.to_string());
            body.push('\n');
        }

        let path = self.group_path(group);
        fs::write(&path, body)
            .await
            .map_err(|source| CatalogError::CacheWrite {
                path: path.clone(),
                source,
            })?;
        set_mode(&path, 0o600).await?;

        let mut meta = match self.load_meta().await {
            Ok(meta) => meta,
            Err(err) => {
                warn!(error = %err, "unreadable cache metadata, rebuilding");
                CacheMeta::default()
            }
        };
        meta.groups.insert(
            group.to_lowercase(),
            GroupMeta {
                updated_at: Utc::now(),
                count: tles.len(),
            },
        );

        self.store_meta(&meta).await
    }

    /// Loads the metadata map; a missing file is an empty map.
    pub async fn load_meta(&self) -> Result<CacheMeta> {
        let path = self.dir.join(CACHE_META_FILENAME);

        let data = match fs::read_to_string(&path).await {
            Ok(data) => data,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Ok(CacheMeta::default())
            }
            Err(source) => return Err(CatalogError::CacheRead { path, source }),
        };

        Ok(serde_json::from_str(&data)?)
    }

    pub async fn store_meta(&self, meta: &CacheMeta) -> Result<()> {
        self.ensure_dir().await?;

        let path = self.dir.join(CACHE_META_FILENAME);
        let data = serde_json::to_string_pretty(meta)?;

        fs::write(&path, data)
            .await
            .map_err(|source| CatalogError::CacheWrite {
                path: path.clone(),
                source,
            })?;
        set_mode(&path, 0o600).await
    }

    async fn ensure_dir(&self) -> Result<()> {
        fs::create_dir_all(&self.dir)
            .await
            .map_err(|source| CatalogError::CacheWrite {
                path: self.dir.clone(),
                source,
            })?;
        set_mode(&self.dir, 0o750).await
    }
}

#[cfg(unix)]
async fn set_mode(path: &Path, mode: u32) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    fs::set_permissions(path, std::fs::Permissions::from_mode(mode))
        .await
        .map_err(|source| CatalogError::CacheWrite {
            path: path.to_path_buf(),
            source,
        })
}

#[cfg(not(unix))]
async fn set_mode(_path: &Path, _mode: u32) -> Result<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{iss_tle, make_line, two_record_text, HST_LINE1_68, HST_LINE2_68};
    use tempfile::TempDir;

    fn hst_tle() -> Tle {
        let l1 = make_line(HST_LINE1_68);
        let l2 = make_line(HST_LINE2_68);
        Tle::parse(&["HST", l1.as_str(), l2.as_str()]).unwrap()
    }

    #[tokio::test]
    async fn store_and_load_roundtrip() {
        let dir = TempDir::new().unwrap();
        let cache = TleCache::new(dir.path());

        cache
            .store_group("Stations", &[iss_tle(), hst_tle()])
            .await
            .unwrap();

        // Lowercased file name, 3-line text content.
        let path = dir.path().join("stations.tle");
        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("ISS (ZARYA)\n1 25544U"));
        assert!(content.ends_with('\n'));

        let loaded = cache.load_group("stations").await.unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[0].norad_id, 25544);
        assert_eq!(loaded[1].norad_id, 20580);
        assert_eq!(loaded[0], iss_tle());
    }

    #[tokio::test]
    async fn metadata_tracks_updates() {
        let dir = TempDir::new().unwrap();
        let cache = TleCache::new(dir.path());

        cache.store_group("stations", &[iss_tle()]).await.unwrap();

        let meta = cache.load_meta().await.unwrap();
        let entry = meta.groups.get("stations").unwrap();
        assert_eq!(entry.count, 1);
        assert!((Utc::now() - entry.updated_at).num_seconds() < 30);

        assert!(meta.is_fresh("stations", 7.0));
        assert!(meta.is_fresh("STATIONS", 7.0));
        assert!(!meta.is_fresh("weather", 7.0));
    }

    #[tokio::test]
    async fn stale_metadata_is_not_fresh() {
        let mut meta = CacheMeta::default();
        meta.groups.insert(
            "stations".into(),
            GroupMeta {
                updated_at: Utc::now() - chrono::Duration::days(10),
                count: 5,
            },
        );
        assert!(!meta.is_fresh("stations", 7.0));
        assert!(meta.is_fresh("stations", 30.0));
    }

    #[tokio::test]
    async fn missing_metadata_reads_as_empty() {
        let dir = TempDir::new().unwrap();
        let cache = TleCache::new(dir.path());

        let meta = cache.load_meta().await.unwrap();
        assert!(meta.groups.is_empty());
    }

    #[tokio::test]
    async fn corrupt_metadata_is_an_error() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join(CACHE_META_FILENAME), "{not json").unwrap();

        let cache = TleCache::new(dir.path());
        let err = cache.load_meta().await.unwrap_err();
        assert!(matches!(err, CatalogError::MetaParse(_)));
    }

    #[tokio::test]
    async fn missing_group_file_is_cache_read_error() {
        let dir = TempDir::new().unwrap();
        let cache = TleCache::new(dir.path());

        let err = cache.load_group("stations").await.unwrap_err();
        assert!(matches!(err, CatalogError::CacheRead { .. }));
    }

    #[tokio::test]
    async fn corrupt_group_file_is_parse_error() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("stations.tle"), "X\n1 junk\n2 junk\n").unwrap();

        let cache = TleCache::new(dir.path());
        let err = cache.load_group("stations").await.unwrap_err();
        assert!(matches!(err, CatalogError::Parse(_)));
    }

    #[tokio::test]
    async fn raw_text_prepopulation_loads() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("test.tle"), two_record_text()).unwrap();

        let cache = TleCache::new(dir.path());
        let loaded = cache.load_group("test").await.unwrap();
        assert_eq!(loaded.len(), 2);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn files_written_with_restricted_modes() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let root = dir.path().join("cache");
        let cache = TleCache::new(&root);
        cache.store_group("stations", &[iss_tle()]).await.unwrap();

        let dir_mode = std::fs::metadata(&root).unwrap().permissions().mode() & 0o777;
        assert_eq!(dir_mode, 0o750);

        for file in ["stations.tle", CACHE_META_FILENAME] {
            let mode = std::fs::metadata(root.join(file))
                .unwrap()
                .permissions()
                .mode()
                & 0o777;
            assert_eq!(mode, 0o600, "{file}");
        }
    }
}
