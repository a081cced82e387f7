//! Backoff policy for announce retries and observers for backoff events
//!
//! The policy only computes delays; the engine does the sleeping. Observers
//! are told about each delay before the engine sleeps on it, which lets a UI
//! show a countdown to the next attempt.

use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::config::RetryConfig;

/// Retry strategy for failed announce sweeps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    initial_delay: Duration,
    max_delay: Duration,
    multiplier: u32,
    max_attempts: Option<u32>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&RetryConfig::default())
    }
}

impl RetryPolicy {
    /// Creates a policy from retry configuration.
    pub fn from_config(config: &RetryConfig) -> Self {
        Self {
            initial_delay: config.initial_backoff,
            max_delay: config.max_backoff,
            multiplier: config.multiplier,
            max_attempts: config.max_attempts,
        }
    }

    /// Caps the number of failed sweeps before the engine gives up.
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = Some(max_attempts);
        self
    }

    /// Starts a fresh delay sequence.
    pub fn backoff(&self) -> Backoff {
        Backoff {
            current: self.initial_delay,
            max_delay: self.max_delay,
            multiplier: self.multiplier,
        }
    }

    /// Check if another sweep is allowed after `failed_attempts` failures.
    pub fn should_retry(&self, failed_attempts: u32) -> bool {
        self.max_attempts
            .is_none_or(|max_attempts| failed_attempts < max_attempts)
    }

    pub fn max_attempts(&self) -> Option<u32> {
        self.max_attempts
    }
}

/// Exponentially growing delay sequence, capped at the policy maximum.
#[derive(Debug, Clone)]
pub struct Backoff {
    current: Duration,
    max_delay: Duration,
    multiplier: u32,
}

impl Backoff {
    /// Returns the delay to wait now and grows the next one.
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.current;
        self.current = self
            .current
            .saturating_mul(self.multiplier)
            .min(self.max_delay);
        delay
    }

    /// Returns the delay `next_delay` will hand out without advancing.
    pub fn peek(&self) -> Duration {
        self.current
    }
}

/// Backoff event passed to observers before the engine sleeps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffNotice {
    /// Number of failed sweeps so far in this announce, starting at 1
    pub attempt: u32,
    /// Time until the next sweep
    pub delay: Duration,
}

impl BackoffNotice {
    /// Returns the delay in whole seconds, truncated.
    pub fn delay_secs(&self) -> u64 {
        self.delay.as_secs()
    }
}

/// Receives a notice before each backoff sleep.
///
/// The engine awaits the notification, so an observer that blocks (such as
/// a full bounded channel) also holds back the retry loop.
#[async_trait]
pub trait BackoffObserver: Send + Sync {
    async fn backoff_scheduled(&self, notice: BackoffNotice);
}

/// Observer that ignores every notice.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

#[async_trait]
impl BackoffObserver for NoopObserver {
    async fn backoff_scheduled(&self, _notice: BackoffNotice) {}
}

/// Sends the delay in seconds, waiting for channel capacity.
#[async_trait]
impl BackoffObserver for mpsc::Sender<u64> {
    async fn backoff_scheduled(&self, notice: BackoffNotice) {
        if self.send(notice.delay_secs()).await.is_err() {
            tracing::debug!("Backoff receiver dropped, notice for attempt {} lost", notice.attempt);
        }
    }
}

/// Sends the delay in seconds without waiting.
#[async_trait]
impl BackoffObserver for mpsc::UnboundedSender<u64> {
    async fn backoff_scheduled(&self, notice: BackoffNotice) {
        if self.send(notice.delay_secs()).is_err() {
            tracing::debug!("Backoff receiver dropped, notice for attempt {} lost", notice.attempt);
        }
    }
}
