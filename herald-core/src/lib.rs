//! Herald Core - resilient HTTP tracker announce client
//!
//! This crate reports peer statistics to BitTorrent HTTP trackers: it walks an
//! ordered set of fallback announce URLs, decodes (optionally gzip-compressed)
//! bencoded responses, remembers the endpoint that last worked, and retries
//! with exponential backoff until the tracker answers or the caller cancels.

pub mod config;
pub mod tracing_setup;
pub mod tracker;

// Re-export main types for convenient access
pub use config::{HeraldConfig, NetworkConfig, RetryConfig};
pub use tracker::{
    AnnounceEngine, AnnounceEvent, AnnounceQuery, AnnounceTransport, BackoffNotice,
    BackoffObserver, HttpTransport, NoopObserver, PeerId, RetryPolicy, TrackerEndpoints,
    TrackerError, TrackerResponse,
};

/// Core errors that can bubble up from any Herald subsystem.
#[derive(Debug, thiserror::Error)]
pub enum HeraldError {
    #[error("Tracker error: {0}")]
    Tracker(#[from] TrackerError),

    #[error("Configuration error: {reason}")]
    Configuration { reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl HeraldError {
    /// Returns a user-friendly error message suitable for display.
    pub fn user_message(&self) -> String {
        match self {
            HeraldError::Tracker(e) => match e {
                TrackerError::NoValidEndpoints { .. } => {
                    "Torrent has no HTTP tracker to announce to".to_string()
                }
                TrackerError::TrackerUnreachable { .. } => {
                    "Could not reach any tracker endpoint".to_string()
                }
                TrackerError::FailureReason { reason } => format!("Tracker refused: {reason}"),
                TrackerError::Cancelled => "Announce cancelled".to_string(),
                _ => "Tracker communication error occurred".to_string(),
            },
            HeraldError::Configuration { reason } => format!("Invalid configuration: {reason}"),
            HeraldError::Io(_) => "File system error occurred".to_string(),
        }
    }

    /// Checks if this error is due to caller input rather than the network.
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            HeraldError::Configuration { .. }
                | HeraldError::Tracker(TrackerError::NoValidEndpoints { .. })
        )
    }
}

pub type Result<T> = std::result::Result<T, HeraldError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_message_for_failure_reason() {
        let error = HeraldError::from(TrackerError::FailureReason {
            reason: "unregistered torrent".to_string(),
        });
        assert_eq!(error.user_message(), "Tracker refused: unregistered torrent");
        assert!(!error.is_user_error());
    }

    #[test]
    fn test_no_endpoints_is_user_error() {
        let error = HeraldError::from(TrackerError::NoValidEndpoints { candidates: 2 });
        assert!(error.is_user_error());
        assert_eq!(
            error.user_message(),
            "Torrent has no HTTP tracker to announce to"
        );
    }
}
