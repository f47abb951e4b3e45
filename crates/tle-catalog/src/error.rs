//! Error types for the upstream client, file cache, and store.

use std::path::PathBuf;

use orbit_core::OrbitError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("rate limited by upstream (429)")]
    RateLimited,

    #[error("upstream server error: status {0}")]
    ServerError(u16),

    #[error("unexpected upstream status: {0}")]
    UnexpectedStatus(u16),

    #[error("request cancelled or deadline exceeded")]
    Cancelled,

    #[error("transport error")]
    Transport(#[source] reqwest::Error),

    #[error("parsing TLE data")]
    Parse(#[from] OrbitError),

    #[error("reading cache file {path}")]
    CacheRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("writing cache file {path}")]
    CacheWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("parsing cache metadata")]
    MetaParse(#[from] serde_json::Error),

    #[error("failed to load TLE group {group:?}: upstream and cache both failed")]
    LoadGroupFailed { group: String },

    #[error("unknown TLE groups: {names} (available: {available})")]
    UnknownGroups { names: String, available: String },
}

pub type Result<T> = std::result::Result<T, CatalogError>;
