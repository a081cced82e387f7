//! Centralized configuration for Herald.
//!
//! All tunable parameters for tracker communication and retry behavior are
//! defined here to avoid hard-coded values scattered throughout the codebase.

use std::time::Duration;

use crate::HeraldError;

/// Central configuration for all Herald components.
///
/// Groups related configuration settings into logical sections.
#[derive(Debug, Clone, Default)]
pub struct HeraldConfig {
    pub network: NetworkConfig,
    pub retry: RetryConfig,
}

/// Tracker HTTP communication configuration.
///
/// Controls request timeouts, the user agent, and redirect handling for
/// announce requests.
#[derive(Debug, Clone)]
pub struct NetworkConfig {
    /// Per-request timeout for a single tracker endpoint
    pub tracker_timeout: Duration,
    /// User agent for HTTP requests, overridable per call via extra headers
    pub user_agent: &'static str,
    /// Maximum redirects followed for one announce request
    pub max_redirects: usize,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            tracker_timeout: Duration::from_secs(30),
            user_agent: "herald/0.1.0",
            max_redirects: 3,
        }
    }
}

/// Backoff configuration for the announce retry loop.
///
/// Delays start at `initial_backoff` and grow by `multiplier` after every
/// failed sweep until they reach `max_backoff`.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Delay before the first retry
    pub initial_backoff: Duration,
    /// Upper bound for any single delay
    pub max_backoff: Duration,
    /// Growth factor applied after each failed sweep
    pub multiplier: u32,
    /// Failed sweeps tolerated before giving up (None = retry forever)
    pub max_attempts: Option<u32>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            initial_backoff: Duration::from_secs(30),
            max_backoff: Duration::from_secs(900), // 15 minutes
            multiplier: 2,
            max_attempts: None,
        }
    }
}

impl HeraldConfig {
    /// Checks that every setting is usable.
    ///
    /// # Errors
    ///
    /// - `HeraldError::Configuration` - If a timeout or backoff is zero, the
    ///   backoff cap is below the initial delay, or the multiplier is zero
    pub fn validate(&self) -> Result<(), HeraldError> {
        if self.network.tracker_timeout.is_zero() {
            return Err(HeraldError::Configuration {
                reason: "tracker_timeout must be greater than zero".to_string(),
            });
        }

        if self.retry.initial_backoff.is_zero() {
            return Err(HeraldError::Configuration {
                reason: "initial_backoff must be greater than zero".to_string(),
            });
        }

        if self.retry.max_backoff < self.retry.initial_backoff {
            return Err(HeraldError::Configuration {
                reason: format!(
                    "max_backoff ({}s) is below initial_backoff ({}s)",
                    self.retry.max_backoff.as_secs(),
                    self.retry.initial_backoff.as_secs()
                ),
            });
        }

        if self.retry.multiplier == 0 {
            return Err(HeraldError::Configuration {
                reason: "multiplier must be at least 1".to_string(),
            });
        }

        Ok(())
    }
}
