//! Concurrent TLE catalog with indexes, cache fallback, and background
//! refresh.
//!
//! The primary index maps catalog number to record; secondary indexes map
//! lowercased group and satellite names to catalog numbers. All three live
//! behind one reader-writer lock that is never held across I/O: refresh
//! batches are fetched and parsed first, then merged under a brief write
//! lock, so readers always observe either none or all of a batch.
//!
//! Logging goes through the `tracing` facade; the embedding application
//! chooses the subscriber.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use orbit_core::Tle;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::cache::TleCache;
use crate::client::CatalogClient;
use crate::config::CatalogConfig;
use crate::error::{CatalogError, Result};

/// Process-wide, thread-safe TLE catalog.
///
/// Wrap it in an [`Arc`]; [`TleStore::start`] keeps the catalog warm with a
/// background refresh task until [`TleStore::stop`].
pub struct TleStore {
    indexes: RwLock<Indexes>,
    client: CatalogClient,
    cache: TleCache,
    config: CatalogConfig,
    refresh: Mutex<Option<RefreshTask>>,
}

struct RefreshTask {
    stop: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

#[derive(Default)]
struct Indexes {
    catalog: HashMap<u32, Tle>,
    by_group: HashMap<String, Vec<u32>>,
    by_name: HashMap<String, Vec<u32>>,
}

impl Indexes {
    /// Inserts or replaces a record and keeps the secondary indexes
    /// consistent: ids are never duplicated, and a record renamed by a
    /// refresh drops its stale name entry.
    fn upsert(&mut self, tle: Tle, group: Option<&str>) {
        if let Some(old) = self.catalog.get(&tle.norad_id) {
            if !old.name.is_empty() && !old.name.eq_ignore_ascii_case(&tle.name) {
                remove_from_index(&mut self.by_name, &old.name.to_lowercase(), tle.norad_id);
            }
        }

        if let Some(group) = group.filter(|g| !g.is_empty()) {
            add_to_index(&mut self.by_group, group.to_lowercase(), tle.norad_id);
        }
        if !tle.name.is_empty() {
            add_to_index(&mut self.by_name, tle.name.to_lowercase(), tle.norad_id);
        }

        self.catalog.insert(tle.norad_id, tle);
    }
}

fn add_to_index(index: &mut HashMap<String, Vec<u32>>, key: String, id: u32) {
    let ids = index.entry(key).or_default();
    if !ids.contains(&id) {
        ids.push(id);
    }
}

fn remove_from_index(index: &mut HashMap<String, Vec<u32>>, key: &str, id: u32) {
    if let Some(ids) = index.get_mut(key) {
        ids.retain(|existing| *existing != id);
        if ids.is_empty() {
            index.remove(key);
        }
    }
}

impl TleStore {
    /// Store with a default upstream client.
    pub fn new(config: CatalogConfig) -> Self {
        Self::with_client(config, CatalogClient::new())
    }

    /// Store with an injected upstream client (tests point it at a mock).
    pub fn with_client(config: CatalogConfig, client: CatalogClient) -> Self {
        let cache = TleCache::new(config.cache_dir.clone());
        Self {
            indexes: RwLock::new(Indexes::default()),
            client,
            cache,
            config,
            refresh: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &CatalogConfig {
        &self.config
    }

    /// Loads all configured groups, then spawns the refresh loop.
    ///
    /// Initial load errors are logged, not returned: the store can serve
    /// whatever groups did load. Calling `start` on a running store is a
    /// no-op.
    pub async fn start(self: Arc<Self>) {
        let mut slot = self.refresh.lock().await;
        if slot.is_some() {
            warn!("TLE store already started");
            return;
        }

        info!(
            groups = ?self.config.groups,
            interval_secs = self.config.update_interval().as_secs(),
            "starting TLE store"
        );

        if let Err(err) = self.load_all_groups().await {
            warn!(error = %err, "initial TLE load had errors");
        }

        let (stop_tx, stop_rx) = watch::channel(false);
        let store = Arc::clone(&self);
        let handle = tokio::spawn(async move {
            store.refresh_loop(stop_rx).await;
        });

        *slot = Some(RefreshTask {
            stop: stop_tx,
            handle,
        });
    }

    /// Signals the refresh loop to terminate and joins it. Idempotent.
    pub async fn stop(&self) {
        let task = self.refresh.lock().await.take();
        let Some(RefreshTask { stop, handle }) = task else {
            return;
        };

        info!("stopping TLE store");
        let _ = stop.send(true);
        let _ = handle.await;
        info!("TLE store stopped");
    }

    async fn refresh_loop(self: Arc<Self>, mut stop_rx: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(self.config.update_interval());
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // The first tick completes immediately; the initial load already ran.
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = stop_rx.changed() => {
                    info!("refresh loop stopped");
                    return;
                }
                _ = ticker.tick() => {
                    info!("starting scheduled TLE refresh");
                    if let Err(err) = self.load_all_groups().await {
                        warn!(error = %err, "scheduled TLE refresh had errors");
                    }
                }
            }
        }
    }

    /// Record for a catalog number.
    pub fn get(&self, norad_id: u32) -> Option<Tle> {
        self.read().catalog.get(&norad_id).cloned()
    }

    /// Records of a group, case-insensitive. Unknown groups yield an empty
    /// list.
    pub fn get_by_group(&self, group: &str) -> Vec<Tle> {
        let ix = self.read();
        match ix.by_group.get(&group.to_lowercase()) {
            Some(ids) => ids
                .iter()
                .filter_map(|id| ix.catalog.get(id).cloned())
                .collect(),
            None => Vec::new(),
        }
    }

    /// Records matching a satellite name: exact lowercased lookup first,
    /// then a substring scan across all names.
    pub fn get_by_name(&self, name: &str) -> Vec<Tle> {
        let needle = name.to_lowercase();
        let ix = self.read();

        if let Some(ids) = ix.by_name.get(&needle) {
            return ids
                .iter()
                .filter_map(|id| ix.catalog.get(id).cloned())
                .collect();
        }

        ix.catalog
            .values()
            .filter(|tle| tle.name.to_lowercase().contains(&needle))
            .cloned()
            .collect()
    }

    /// Snapshot of every record.
    pub fn get_all(&self) -> Vec<Tle> {
        self.read().catalog.values().cloned().collect()
    }

    /// Upserts one record without group membership.
    pub fn add(&self, tle: Tle) {
        self.write().upsert(tle, None);
    }

    /// Upserts one record into a group.
    pub fn add_with_group(&self, tle: Tle, group: &str) {
        self.write().upsert(tle, Some(group));
    }

    pub fn count(&self) -> usize {
        self.read().catalog.len()
    }

    /// Records older than the configured maximum age.
    pub fn stale_count(&self) -> usize {
        self.read()
            .catalog
            .values()
            .filter(|tle| tle.is_stale(self.config.max_tle_age_days))
            .count()
    }

    /// Names of all groups present in the index.
    pub fn groups(&self) -> Vec<String> {
        self.read().by_group.keys().cloned().collect()
    }

    pub fn group_count(&self, group: &str) -> usize {
        self.read()
            .by_group
            .get(&group.to_lowercase())
            .map_or(0, Vec::len)
    }

    /// True if the group's file cache was refreshed within the configured
    /// maximum TLE age.
    pub async fn is_group_fresh(&self, group: &str) -> bool {
        match self.cache.load_meta().await {
            Ok(meta) => meta.is_fresh(group, self.config.max_tle_age_days),
            Err(err) => {
                warn!(group, error = %err, "unreadable cache metadata");
                false
            }
        }
    }

    /// Loads every configured group, logging and continuing on per-group
    /// failure. Returns the last error so callers can decide policy; groups
    /// that succeeded are installed either way.
    pub async fn load_all_groups(&self) -> Result<()> {
        let mut last_err = None;

        let groups = self.config.groups.clone();
        for group in &groups {
            if let Err(err) = self.load_group(group).await {
                warn!(group = %group, error = %err, "failed to load TLE group");
                last_err = Some(err);
            }
        }

        info!(total = self.count(), groups = ?self.groups(), "loaded TLE groups");

        match last_err {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Loads one group: upstream first, file cache as fallback.
    ///
    /// A successful upstream fetch is written back to the cache; a cache
    /// write failure only logs. The store is left untouched for the group
    /// when both paths fail.
    pub async fn load_group(&self, group: &str) -> Result<()> {
        debug!(group, "loading TLE group");

        match self.client.fetch_group(group).await {
            Ok(tles) => {
                if let Err(err) = self.cache.store_group(group, &tles).await {
                    warn!(group, error = %err, "failed to write TLE cache");
                }

                info!(group, count = tles.len(), "loaded TLE group from upstream");
                self.install_batch(group, tles);
                Ok(())
            }
            Err(fetch_err) => {
                warn!(
                    group,
                    error = %fetch_err,
                    "upstream fetch failed, falling back to cache"
                );

                match self.cache.load_group(group).await {
                    Ok(tles) => {
                        if !self.is_group_fresh(group).await {
                            warn!(group, "serving stale cached TLEs");
                        }
                        info!(group, count = tles.len(), "loaded TLE group from cache");
                        self.install_batch(group, tles);
                        Ok(())
                    }
                    Err(cache_err) => {
                        warn!(group, error = %cache_err, "cache fallback failed");
                        Err(CatalogError::LoadGroupFailed {
                            group: group.to_string(),
                        })
                    }
                }
            }
        }
    }

    /// Merges a fetched batch under one write lock.
    fn install_batch(&self, group: &str, tles: Vec<Tle>) {
        let mut ix = self.write();
        for tle in tles {
            ix.upsert(tle, Some(group));
        }
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Indexes> {
        self.indexes.read().expect("TLE store lock poisoned")
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, Indexes> {
        self.indexes.write().expect("TLE store lock poisoned")
    }
}
