//! Rate-limited, retrying client for one Gazelle tracker's `ajax.php` API.
//!
//! Every call goes through three gates in order: the client's concurrency
//! semaphore, the shared per-server [`ServerPacer`], and the retry loop.

use std::sync::Arc;
use std::time::{Duration, Instant};

use reqwest::Client;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue, RETRY_AFTER};
use serde_json::{Map, Value};
use tokio::sync::Semaphore;
use tracing::{debug, info, instrument, warn};
use url::Url;

use crate::catalog::SearchHit;
use crate::tracker::{TrackerConfig, build_tracker_auth_header, window_request_limit};
use crate::user_agent;

use super::constants::{
    DEFAULT_MAX_CONCURRENCY, DEFAULT_MIN_INTERVAL, DEFAULT_TIMEOUT_SECS, WAIT_LOG_THRESHOLD,
};
use super::envelope::{ShapeError, optional_list_of_objects, response_payload};
use super::rate_limiter::ServerPacer;
use super::retry::{FailureType, RetryDecision, RetryPolicy, classify_error, is_retryable_status};
use super::ApiError;

/// Tunables for a [`TrackerClient`].
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// Total timeout per HTTP call.
    pub timeout: Duration,
    /// Maximum concurrent in-flight requests for this client.
    pub max_concurrency: usize,
    /// Minimum interval between request starts to the same server.
    pub min_interval: Duration,
    /// Retry behavior for transient failures.
    pub retry_policy: RetryPolicy,
    /// Auth mode used for pacing keys and window ceilings.
    pub auth_mode: String,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            min_interval: DEFAULT_MIN_INTERVAL,
            retry_policy: RetryPolicy::default(),
            auth_mode: "api_key".to_string(),
        }
    }
}

/// Filters for `action=browse`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BrowseParams {
    /// Free-text search string.
    pub searchstr: Option<String>,
    /// Artist name filter.
    pub artistname: Option<String>,
    /// Group (album) name filter.
    pub groupname: Option<String>,
    /// Release year filter.
    pub year: Option<i32>,
    /// Release type id filter.
    pub release_type: Option<i64>,
    /// Media filter (`CD`, `WEB`, ...).
    pub media: Option<String>,
}

impl BrowseParams {
    fn to_query(&self) -> Vec<(&'static str, String)> {
        let mut params = Vec::new();
        if let Some(searchstr) = self.searchstr.as_deref().filter(|s| !s.is_empty()) {
            params.push(("searchstr", searchstr.to_string()));
        }
        if let Some(artist) = self.artistname.as_deref().filter(|s| !s.is_empty()) {
            params.push(("artistname", artist.to_string()));
        }
        if let Some(group) = self.groupname.as_deref().filter(|s| !s.is_empty()) {
            params.push(("groupname", group.to_string()));
        }
        if let Some(year) = self.year {
            params.push(("year", year.to_string()));
        }
        if let Some(release_type) = self.release_type.filter(|t| *t != 0) {
            params.push(("releasetype", release_type.to_string()));
        }
        if let Some(media) = self.media.as_deref().filter(|s| !s.is_empty()) {
            params.push(("media", media.to_string()));
        }
        params
    }
}

/// Authenticated API client for one tracker.
///
/// Cheap to clone; clones share the HTTP connection pool, semaphore and pacer.
#[derive(Clone)]
pub struct TrackerClient {
    tracker: TrackerConfig,
    endpoint: Url,
    http: Client,
    semaphore: Arc<Semaphore>,
    pacer: Arc<ServerPacer>,
    options: ClientOptions,
    request_limit: Option<usize>,
}

impl std::fmt::Debug for TrackerClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrackerClient")
            .field("tracker", &self.tracker.name)
            .field("endpoint", &self.endpoint.as_str())
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl TrackerClient {
    /// Creates a client using the process-wide pacer.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Configuration`] when the API key is missing, the
    /// tracker is unsupported, or the base URL is invalid.
    pub fn new(tracker: TrackerConfig, options: ClientOptions) -> Result<Self, ApiError> {
        Self::with_pacer(tracker, options, ServerPacer::global())
    }

    /// Creates a client sharing the given pacer.
    ///
    /// # Errors
    ///
    /// See [`TrackerClient::new`].
    #[instrument(skip_all, fields(tracker = %tracker.name))]
    pub fn with_pacer(
        tracker: TrackerConfig,
        options: ClientOptions,
        pacer: Arc<ServerPacer>,
    ) -> Result<Self, ApiError> {
        if tracker.api_key.trim().is_empty() {
            return Err(ApiError::configuration(format!(
                "API key is required for tracker '{}'",
                tracker.name
            )));
        }

        let auth = build_tracker_auth_header(&tracker.name, &tracker.api_key)
            .map_err(|e| ApiError::configuration(e.to_string()))?;
        let mut auth_value = HeaderValue::from_str(&auth)
            .map_err(|_| ApiError::configuration("API key contains invalid header characters"))?;
        auth_value.set_sensitive(true);

        let endpoint = Url::parse(&format!("{}/ajax.php", tracker.base_url())).map_err(|e| {
            ApiError::configuration(format!("invalid tracker URL '{}': {e}", tracker.url))
        })?;

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, auth_value);
        let http = Client::builder()
            .default_headers(headers)
            .user_agent(user_agent::default_api_user_agent())
            .timeout(options.timeout)
            .gzip(true)
            .build()
            .map_err(|e| ApiError::configuration(format!("HTTP client construction failed: {e}")))?;

        let request_limit = window_request_limit(&tracker.name, &options.auth_mode);
        debug!(
            endpoint = %endpoint,
            max_concurrency = options.max_concurrency,
            ?request_limit,
            "creating tracker client"
        );

        Ok(Self {
            semaphore: Arc::new(Semaphore::new(options.max_concurrency.max(1))),
            tracker,
            endpoint,
            http,
            pacer,
            options,
            request_limit,
        })
    }

    /// The tracker this client talks to.
    #[must_use]
    pub fn tracker(&self) -> &TrackerConfig {
        &self.tracker
    }

    /// Calls `ajax.php?action={action}` and returns the full JSON body.
    ///
    /// The envelope is validated before returning, so a throttle-shaped
    /// `status: failure` body is retried like an HTTP 429.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::RetriesExhausted`] when every attempt failed with a
    /// retryable error, or the non-retryable error that ended the attempts.
    #[instrument(skip(self, params), fields(tracker = %self.tracker.name))]
    pub async fn call(&self, action: &str, params: &[(&str, String)]) -> Result<Value, ApiError> {
        let mut url = self.endpoint.clone();
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("action", action);
            for (key, value) in params {
                query.append_pair(key, value);
            }
        }

        let _permit = self
            .semaphore
            .acquire()
            .await
            .map_err(|_| ApiError::configuration("request semaphore closed"))?;

        let policy = &self.options.retry_policy;
        let started = Instant::now();
        let mut attempt = 1;
        loop {
            self.pace().await;
            debug!(action, attempt, "sending API request");

            let error = match self.send_once(action, &url).await {
                Ok(body) => {
                    debug!(
                        action,
                        elapsed_ms = started.elapsed().as_millis(),
                        "API request succeeded"
                    );
                    return Ok(body);
                }
                Err(error) => error,
            };

            let retry_after = match &error {
                ApiError::Throttle { retry_after, .. } => retry_after.clone(),
                _ => None,
            };
            let failure = classify_error(&error);
            match policy.should_retry(failure, attempt, retry_after.as_deref()) {
                RetryDecision::Retry { delay, attempt: next } => {
                    warn!(
                        tracker = %self.tracker.display_name(),
                        action,
                        attempt,
                        max_attempts = policy.max_attempts(),
                        delay_secs = delay.as_secs_f64(),
                        error = %error,
                        "retrying API request"
                    );
                    tokio::time::sleep(delay).await;
                    attempt = next;
                }
                RetryDecision::DoNotRetry { reason } => {
                    if failure != FailureType::Permanent
                        && attempt >= policy.max_attempts()
                        && attempt > 1
                    {
                        warn!(
                            tracker = %self.tracker.display_name(),
                            action,
                            attempts = attempt,
                            "API request failed after all retries"
                        );
                        return Err(ApiError::RetriesExhausted {
                            tracker: self.tracker.display_name(),
                            attempts: attempt,
                            last: Box::new(error),
                        });
                    }
                    debug!(action, %reason, "not retrying API request");
                    return Err(error);
                }
            }
        }
    }

    /// Calls an action and returns only the envelope's `response` object.
    ///
    /// # Errors
    ///
    /// See [`TrackerClient::call`].
    pub async fn call_response(
        &self,
        action: &str,
        params: &[(&str, String)],
    ) -> Result<Map<String, Value>, ApiError> {
        let body = self.call(action, params).await?;
        response_payload(&body, action)
            .cloned()
            .map_err(|e| self.shape_error(action, e))
    }

    /// `action=browse` search.
    ///
    /// # Errors
    ///
    /// See [`TrackerClient::call`].
    pub async fn browse(&self, params: &BrowseParams) -> Result<Value, ApiError> {
        self.call("browse", &params.to_query()).await
    }

    /// `action=browse`, returning the parsed result list.
    ///
    /// # Errors
    ///
    /// See [`TrackerClient::call`]; a malformed `results` field is a
    /// [`ApiError::Protocol`].
    pub async fn search(&self, params: &BrowseParams) -> Result<Vec<SearchHit>, ApiError> {
        let response = self.call_response("browse", &params.to_query()).await?;
        let results = optional_list_of_objects(&response, "results", "browse.response")
            .map_err(|e| self.shape_error("browse", e))?;
        debug!(hits = results.len(), "Browse returned results");
        Ok(results.into_iter().map(SearchHit::from_browse_result).collect())
    }

    /// `action=torrentgroup` for one group; returns the `response` object
    /// (`{group, torrents}`).
    ///
    /// # Errors
    ///
    /// See [`TrackerClient::call_response`].
    pub async fn get_group(&self, group_id: i64) -> Result<Map<String, Value>, ApiError> {
        self.call_response("torrentgroup", &[("id", group_id.to_string())])
            .await
    }

    /// `action=collage` page; returns the `response` object.
    ///
    /// # Errors
    ///
    /// See [`TrackerClient::call_response`].
    pub async fn get_collage(
        &self,
        collage_id: i64,
        page: u32,
    ) -> Result<Map<String, Value>, ApiError> {
        self.call_response(
            "collage",
            &[("id", collage_id.to_string()), ("page", page.to_string())],
        )
        .await
    }

    /// `action=torrent` for one torrent.
    ///
    /// # Errors
    ///
    /// See [`TrackerClient::call`].
    pub async fn get_torrent(&self, torrent_id: i64) -> Result<Value, ApiError> {
        self.call("torrent", &[("id", torrent_id.to_string())]).await
    }

    /// `action=index` for the authenticated user.
    ///
    /// # Errors
    ///
    /// See [`TrackerClient::call`].
    pub async fn get_index(&self) -> Result<Value, ApiError> {
        self.call("index", &[]).await
    }

    /// `action=user_torrents` page.
    ///
    /// # Errors
    ///
    /// See [`TrackerClient::call`].
    pub async fn get_user_torrents(
        &self,
        list_type: &str,
        user_id: i64,
        limit: u32,
        offset: u32,
    ) -> Result<Value, ApiError> {
        self.call(
            "user_torrents",
            &[
                ("type", list_type.to_string()),
                ("id", user_id.to_string()),
                ("limit", limit.to_string()),
                ("offset", offset.to_string()),
            ],
        )
        .await
    }

    async fn pace(&self) {
        let wait = self
            .pacer
            .acquire(
                self.tracker.base_url(),
                &self.options.auth_mode,
                self.options.min_interval,
                self.request_limit,
            )
            .await;
        if wait > WAIT_LOG_THRESHOLD {
            info!(
                tracker = %self.tracker.display_name(),
                wait_secs = wait.as_secs_f64(),
                "waiting for tracker rate limit"
            );
        }
    }

    async fn send_once(&self, action: &str, url: &Url) -> Result<Value, ApiError> {
        let tracker = self.tracker.display_name();
        let response = self
            .http
            .get(url.clone())
            .send()
            .await
            .map_err(|e| self.transport_error(action, e))?;

        let status = response.status().as_u16();
        if status >= 400 {
            if is_retryable_status(status) {
                let retry_after = response
                    .headers()
                    .get(RETRY_AFTER)
                    .and_then(|v| v.to_str().ok())
                    .map(str::to_string);
                return Err(ApiError::throttle_status(tracker, action, status, retry_after));
            }
            return Err(ApiError::protocol_status(tracker, action, status));
        }

        let text = response
            .text()
            .await
            .map_err(|e| self.transport_error(action, e))?;
        let body: Value = serde_json::from_str(&text)
            .map_err(|e| ApiError::protocol(tracker.as_str(), action, format!("body is not JSON: {e}")))?;

        response_payload(&body, action).map_err(|e| self.shape_error(action, e))?;
        Ok(body)
    }

    fn transport_error(&self, action: &str, error: reqwest::Error) -> ApiError {
        if error.is_timeout() {
            ApiError::timeout(self.tracker.display_name(), action)
        } else {
            ApiError::network(self.tracker.display_name(), action, error)
        }
    }

    fn shape_error(&self, action: &str, error: ShapeError) -> ApiError {
        if error.failure_envelope {
            ApiError::throttle_shape(self.tracker.display_name(), action, error.to_string())
        } else {
            ApiError::protocol(self.tracker.display_name(), action, error.to_string())
        }
    }
}
