//! Upstream catalog HTTP client.
//!
//! Fetches TLE bundles from the CelesTrak GP endpoint by catalog number,
//! named group, or raw URL. Requests share a process-wide minimum spacing,
//! carry an identifying User-Agent, and retry transient failures with
//! exponential backoff. 404s and the upstream's "No GP data found" body map
//! to [`CatalogError::NotFound`] and are never retried.

use std::time::Duration;

use orbit_core::Tle;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::error::{CatalogError, Result};

/// CelesTrak GP endpoint.
pub const CELESTRAK_BASE_URL: &str = "https://celestrak.org/NORAD/elements/gp.php";

/// Minimum spacing between requests, per upstream guidance.
pub const DEFAULT_RATE_LIMIT: Duration = Duration::from_secs(2);

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Retries after the first attempt.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Body the upstream returns with status 200 when a query matches nothing.
const NO_GP_DATA: &str = "No GP data found";

/// URL fetching a named group as plain-text TLEs.
pub fn group_url(base_url: &str, group: &str) -> String {
    format!("{base_url}?GROUP={group}&FORMAT=TLE")
}

/// URL fetching a single catalog number as plain-text TLEs.
pub fn catalog_number_url(base_url: &str, norad_id: u32) -> String {
    format!("{base_url}?CATNR={norad_id}&FORMAT=TLE")
}

/// HTTP client for the upstream TLE catalog.
pub struct CatalogClient {
    http: reqwest::Client,
    base_url: String,
    rate_limit: Duration,
    max_retries: u32,
    last_request: Mutex<Option<Instant>>,
}

impl Default for CatalogClient {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl CatalogClient {
    /// Client with upstream defaults.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn builder() -> CatalogClientBuilder {
        CatalogClientBuilder::default()
    }

    /// Fetches the newest element set for one catalog number.
    pub async fn fetch_by_catalog_number(&self, norad_id: u32) -> Result<Tle> {
        let url = catalog_number_url(&self.base_url, norad_id);
        let body = self.fetch_text(&url).await?;

        let mut tles = parse_body(&body)?;
        if tles.is_empty() {
            return Err(CatalogError::NotFound(format!("catalog number {norad_id}")));
        }
        Ok(tles.swap_remove(0))
    }

    /// Fetches every element set of a named group.
    pub async fn fetch_group(&self, group: &str) -> Result<Vec<Tle>> {
        let url = group_url(&self.base_url, group);
        let body = self.fetch_text(&url).await?;
        parse_body(&body)
    }

    /// Fetches element sets from an arbitrary URL.
    pub async fn fetch_url(&self, url: &str) -> Result<Vec<Tle>> {
        let body = self.fetch_text(url).await?;
        parse_body(&body)
    }

    /// Fetches several groups concurrently.
    ///
    /// Workers serialize on the shared rate limiter. Returns everything that
    /// succeeded alongside the per-group errors.
    pub async fn fetch_groups_parallel(
        &self,
        groups: &[String],
    ) -> (Vec<Tle>, Vec<CatalogError>) {
        let fetches = groups.iter().map(|group| async move {
            self.fetch_group(group).await.map_err(|err| {
                warn!(group = %group, error = %err, "group fetch failed");
                err
            })
        });

        let mut tles = Vec::new();
        let mut errors = Vec::new();
        for outcome in futures::future::join_all(fetches).await {
            match outcome {
                Ok(batch) => tles.extend(batch),
                Err(err) => errors.push(err),
            }
        }
        (tles, errors)
    }

    /// One rate-limited fetch with retries.
    async fn fetch_text(&self, url: &str) -> Result<String> {
        self.wait_for_rate_limit().await;

        let mut last_err = CatalogError::NotFound(url.to_string());
        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let backoff = Duration::from_secs(1 << (attempt - 1));
                debug!(url, attempt, ?backoff, "retrying after backoff");
                tokio::time::sleep(backoff).await;
            }

            match self.do_request(url).await {
                Ok(body) => return Ok(body),
                // Definitive answers are not retried.
                Err(err @ (CatalogError::NotFound(_) | CatalogError::Cancelled)) => {
                    return Err(err)
                }
                Err(err) => {
                    warn!(url, attempt, error = %err, "request attempt failed");
                    last_err = err;
                }
            }
        }

        Err(last_err)
    }

    /// Blocks until the minimum spacing since the last request has elapsed,
    /// then claims the slot. The mutex is released while sleeping.
    async fn wait_for_rate_limit(&self) {
        loop {
            let wait = {
                let mut last = self.last_request.lock().await;
                match *last {
                    Some(prev) if prev.elapsed() < self.rate_limit => {
                        self.rate_limit - prev.elapsed()
                    }
                    _ => {
                        *last = Some(Instant::now());
                        return;
                    }
                }
            };
            tokio::time::sleep(wait).await;
        }
    }

    async fn do_request(&self, url: &str) -> Result<String> {
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status();
        match status {
            reqwest::StatusCode::OK => {}
            reqwest::StatusCode::NOT_FOUND => {
                return Err(CatalogError::NotFound(url.to_string()))
            }
            reqwest::StatusCode::TOO_MANY_REQUESTS => return Err(CatalogError::RateLimited),
            s if s.is_server_error() => return Err(CatalogError::ServerError(s.as_u16())),
            s => return Err(CatalogError::UnexpectedStatus(s.as_u16())),
        }

        let body = response.text().await.map_err(map_transport_error)?;
        if body == NO_GP_DATA {
            return Err(CatalogError::NotFound(url.to_string()));
        }

        Ok(body)
    }
}

/// Timeouts are deadline expirations, everything else is transport.
fn map_transport_error(err: reqwest::Error) -> CatalogError {
    if err.is_timeout() {
        CatalogError::Cancelled
    } else {
        CatalogError::Transport(err)
    }
}

/// Parses a response body, skipping malformed records.
///
/// A single bad record never fails the bundle; a body that yields nothing
/// but errors does.
fn parse_body(body: &str) -> Result<Vec<Tle>> {
    let (tles, errors) = Tle::parse_batch_lossy(body);

    for err in &errors {
        warn!(error = %err, "skipping malformed TLE record");
    }
    if tles.is_empty() {
        if let Some(err) = errors.into_iter().next() {
            return Err(CatalogError::Parse(err));
        }
    }

    Ok(tles)
}

/// Builder for [`CatalogClient`].
#[derive(Debug, Clone)]
pub struct CatalogClientBuilder {
    base_url: String,
    rate_limit: Duration,
    max_retries: u32,
    timeout: Duration,
}

impl Default for CatalogClientBuilder {
    fn default() -> Self {
        Self {
            base_url: CELESTRAK_BASE_URL.to_string(),
            rate_limit: DEFAULT_RATE_LIMIT,
            max_retries: DEFAULT_MAX_RETRIES,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl CatalogClientBuilder {
    /// Overrides the upstream endpoint (tests point this at a mock).
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn rate_limit(mut self, spacing: Duration) -> Self {
        self.rate_limit = spacing;
        self
    }

    pub fn max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }

    /// Per-request deadline.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn build(self) -> CatalogClient {
        let http = reqwest::Client::builder()
            .user_agent(concat!("orbitrack/", env!("CARGO_PKG_VERSION")))
            .timeout(self.timeout)
            .build()
            .expect("failed to create HTTP client");

        CatalogClient {
            http,
            base_url: self.base_url,
            rate_limit: self.rate_limit,
            max_retries: self.max_retries,
            last_request: Mutex::new(None),
        }
    }
}
