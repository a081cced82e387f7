//! Announce engine: endpoint sweeps, failover, and the backoff retry loop

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::watch;

use super::client::{AnnounceTransport, HttpTransport};
use super::endpoints::{TrackerEndpoints, build_full_url};
use super::response::{decode_announce_response, decompress_body};
use super::retry::{BackoffNotice, BackoffObserver, RetryPolicy};
use super::types::TrackerResponse;
use super::TrackerError;
use crate::config::HeraldConfig;

/// Announces to one logical tracker reachable through several endpoints.
///
/// Each announce sweeps the endpoints in order and returns the first valid
/// response, promoting the endpoint that answered so later sweeps try it
/// first. With retry enabled, failed sweeps are repeated after an
/// exponentially growing delay until one succeeds or the caller cancels.
///
/// `announce` takes `&mut self`, so a single engine serves one announce at a
/// time. Share it across tasks behind a `tokio::sync::Mutex`.
pub struct AnnounceEngine {
    endpoints: TrackerEndpoints,
    transport: Arc<dyn AnnounceTransport>,
    retry_policy: RetryPolicy,
    /// Backoff sleeps taken by the announce in flight, readable while it runs
    retry_attempt: watch::Sender<u32>,
    last_request: Option<String>,
    last_response: Option<String>,
    last_success_at: Option<DateTime<Utc>>,
}

impl AnnounceEngine {
    /// Creates an engine talking HTTP with settings from `config`.
    ///
    /// # Errors
    ///
    /// - `HeraldError::Configuration` - If the configuration is invalid
    /// - `HeraldError::Tracker` - If the HTTP client cannot be built
    pub fn new(endpoints: TrackerEndpoints, config: &HeraldConfig) -> crate::Result<Self> {
        config.validate()?;
        let transport = HttpTransport::new(&config.network)?;

        Ok(Self::with_transport(
            endpoints,
            Arc::new(transport),
            RetryPolicy::from_config(&config.retry),
        ))
    }

    /// Creates an engine on top of an arbitrary transport.
    pub fn with_transport(
        endpoints: TrackerEndpoints,
        transport: Arc<dyn AnnounceTransport>,
        retry_policy: RetryPolicy,
    ) -> Self {
        Self {
            endpoints,
            transport,
            retry_policy,
            retry_attempt: watch::Sender::new(0),
            last_request: None,
            last_response: None,
            last_success_at: None,
        }
    }

    /// Announces `query` to the tracker.
    ///
    /// `query` is an already percent-encoded query string; a leading `?` or
    /// `&` is ignored. `headers` are added to every HTTP request.
    ///
    /// Without `retry`, exactly one sweep is made. With `retry`, failed
    /// sweeps are retried after a backoff; `observer` hears about every delay
    /// before the engine sleeps on it. Setting `shutdown` to `true` abandons
    /// the request or sleep in progress.
    ///
    /// # Errors
    ///
    /// - `TrackerError::TrackerUnreachable` - If every endpoint failed (last sweep)
    /// - `TrackerError::FailureReason` - If every endpoint failed and at least one
    ///   tracker reported a failure reason; the most recent reason is returned
    /// - `TrackerError::Cancelled` - If shutdown was signalled
    pub async fn announce(
        &mut self,
        query: &str,
        headers: &HashMap<String, String>,
        retry: bool,
        observer: &dyn BackoffObserver,
        mut shutdown: watch::Receiver<bool>,
    ) -> Result<TrackerResponse, TrackerError> {
        let result = self
            .run_announce(query, headers, retry, observer, &mut shutdown)
            .await;
        self.set_retry_attempt(0);
        result
    }

    async fn run_announce(
        &mut self,
        query: &str,
        headers: &HashMap<String, String>,
        retry: bool,
        observer: &dyn BackoffObserver,
        shutdown: &mut watch::Receiver<bool>,
    ) -> Result<TrackerResponse, TrackerError> {
        if *shutdown.borrow() {
            return Err(TrackerError::Cancelled);
        }

        if !retry {
            return until_shutdown(self.sweep(query, headers), shutdown).await?;
        }

        let mut backoff = self.retry_policy.backoff();
        loop {
            let error = match until_shutdown(self.sweep(query, headers), shutdown).await? {
                Ok(response) => return Ok(response),
                Err(e) if !e.is_retryable() => return Err(e),
                Err(e) => e,
            };

            let failed_sweeps = self.retry_attempt() + 1;
            if !self.retry_policy.should_retry(failed_sweeps) {
                tracing::warn!("Giving up announce after {} failed sweeps: {}", failed_sweeps, error);
                return Err(error);
            }

            let delay = backoff.next_delay();
            tracing::warn!(
                "Announce sweep {} failed ({}), retrying in {}s",
                failed_sweeps,
                error,
                delay.as_secs()
            );

            let notice = BackoffNotice {
                attempt: failed_sweeps,
                delay,
            };
            until_shutdown(observer.backoff_scheduled(notice), shutdown).await?;
            self.set_retry_attempt(failed_sweeps);
            until_shutdown(tokio::time::sleep(delay), shutdown).await?;
        }
    }

    /// Tries every endpoint in current order until one yields a response.
    async fn sweep(
        &mut self,
        query: &str,
        headers: &HashMap<String, String>,
    ) -> Result<TrackerResponse, TrackerError> {
        let mut rejection = None;

        for index in 0..self.endpoints.len() {
            let base_url = self.endpoints.as_slice()[index].clone();
            let url = build_full_url(&base_url, query);
            tracing::debug!("Announcing to tracker: {}", base_url);
            self.last_request = Some(url.clone());

            match self.request_endpoint(&url, headers).await {
                Ok(response) => {
                    tracing::info!(
                        "Tracker {} responded: interval {}s, seeders {}, leechers {}",
                        base_url,
                        response.interval,
                        response.seeders,
                        response.leechers
                    );
                    if index != 0 {
                        tracing::info!("Promoting tracker {} to primary endpoint", base_url);
                        self.endpoints.promote_to_front(index);
                    }
                    self.last_success_at = Some(Utc::now());
                    return Ok(response);
                }
                Err(e) => {
                    tracing::warn!("Tracker {} failed: {}", base_url, e);
                    if matches!(e, TrackerError::FailureReason { .. }) {
                        rejection = Some(e);
                    }
                }
            }
        }

        Err(rejection.unwrap_or(TrackerError::TrackerUnreachable {
            attempted: self.endpoints.len(),
        }))
    }

    /// Performs one request and decodes its body.
    async fn request_endpoint(
        &mut self,
        url: &str,
        headers: &HashMap<String, String>,
    ) -> Result<TrackerResponse, TrackerError> {
        let response = self.transport.get(url, headers).await?;

        if response.status != 200 {
            return Err(TrackerError::UnexpectedStatus {
                url: url.to_string(),
                status: response.status,
            });
        }

        if response.body.is_empty() {
            return Err(TrackerError::EmptyResponse {
                url: url.to_string(),
            });
        }

        let body = decompress_body(&response.body)?;
        self.last_response = Some(String::from_utf8_lossy(&body).into_owned());

        let tracker_response = decode_announce_response(&body)?;
        if let Some(warning) = &tracker_response.warning_message {
            tracing::warn!("Tracker {} warning: {}", url, warning);
        }

        Ok(tracker_response)
    }

    /// Returns endpoints in the order the next sweep will try them.
    pub fn endpoints(&self) -> &TrackerEndpoints {
        &self.endpoints
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry_policy
    }

    /// Returns backoff sleeps taken by the announce in flight (0 when idle).
    pub fn retry_attempt(&self) -> u32 {
        *self.retry_attempt.borrow()
    }

    /// Subscribes to the retry counter.
    ///
    /// `announce` holds the engine mutably for its whole retry loop, so a UI
    /// that wants the live counter watches this receiver instead of polling
    /// `retry_attempt`.
    pub fn subscribe_retry_attempt(&self) -> watch::Receiver<u32> {
        self.retry_attempt.subscribe()
    }

    fn set_retry_attempt(&self, attempt: u32) {
        self.retry_attempt.send_if_modified(|current| {
            std::mem::replace(current, attempt) != attempt
        });
    }

    /// Returns the last full request URL, for display only.
    pub fn last_request(&self) -> Option<&str> {
        self.last_request.as_deref()
    }

    /// Returns the last decompressed response body, for display only.
    pub fn last_response(&self) -> Option<&str> {
        self.last_response.as_deref()
    }

    pub fn last_success_at(&self) -> Option<DateTime<Utc>> {
        self.last_success_at
    }
}

/// Runs `future` unless shutdown is signalled first.
async fn until_shutdown<F: Future>(
    future: F,
    shutdown: &mut watch::Receiver<bool>,
) -> Result<F::Output, TrackerError> {
    tokio::select! {
        biased;
        () = wait_for_shutdown(shutdown) => Err(TrackerError::Cancelled),
        output = future => Ok(output),
    }
}

async fn wait_for_shutdown(shutdown: &mut watch::Receiver<bool>) {
    if shutdown.wait_for(|stop| *stop).await.is_err() {
        // Sender dropped, shutdown can no longer be requested
        std::future::pending::<()>().await;
    }
}
