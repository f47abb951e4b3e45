//! Upstream TLE catalog.
//!
//! An HTTP client for the CelesTrak GP endpoint (rate limited, retrying),
//! a process-wide concurrent store with group and name indexes, a file
//! cache with freshness metadata, and a background refresh loop.
//!
//! # Usage
//!
//! ```rust,ignore
//! let mut config = CatalogConfig::default();
//! config.validate()?;
//!
//! let store = Arc::new(TleStore::new(config));
//! Arc::clone(&store).start().await;
//!
//! let iss = store.get(25544);
//! let stations = store.get_by_group("stations");
//!
//! store.stop().await;
//! ```

pub mod cache;
pub mod client;
pub mod config;
pub mod error;
pub mod groups;
pub mod store;

#[cfg(test)]
mod testutil;

pub use cache::{CacheMeta, GroupMeta, TleCache};
pub use client::{
    catalog_number_url, group_url, CatalogClient, CatalogClientBuilder, CELESTRAK_BASE_URL,
    DEFAULT_MAX_RETRIES, DEFAULT_RATE_LIMIT, DEFAULT_TIMEOUT,
};
pub use config::CatalogConfig;
pub use error::{CatalogError, Result};
pub use groups::{is_valid_group, AVAILABLE_GROUPS};
pub use store::TleStore;
