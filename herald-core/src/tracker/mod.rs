//! BitTorrent HTTP tracker announce client.
//!
//! Announces to an ordered set of fallback endpoints following BEP 3, decodes
//! compact bencoded responses, and retries whole sweeps with exponential backoff.

pub mod client;
pub mod endpoints;
pub mod engine;
pub mod protocol;
pub mod response;
pub mod retry;
pub mod simulated;
pub mod types;

// Re-export public API
pub use client::{AnnounceTransport, HttpTransport, TransportResponse};
pub use endpoints::{TrackerEndpoints, build_full_url};
pub use engine::AnnounceEngine;
pub use response::{decode_announce_response, extract_tracker_response};
pub use retry::{Backoff, BackoffNotice, BackoffObserver, NoopObserver, RetryPolicy};
pub use simulated::{ScriptedReply, ScriptedTransport};
pub use types::{AnnounceEvent, AnnounceQuery, PeerId, TrackerResponse};

/// Errors that can occur while announcing to a tracker.
///
/// Per-endpoint variants are absorbed by the endpoint sweep; only
/// `TrackerUnreachable`, `FailureReason`, and `Cancelled` reach callers of
/// `AnnounceEngine::announce`.
#[derive(Debug, thiserror::Error)]
pub enum TrackerError {
    #[error("No HTTP tracker URL among {candidates} announce candidates")]
    NoValidEndpoints { candidates: usize },

    #[error("Tracker connection failed: {url}")]
    TrackerConnectionFailed { url: String },

    #[error("Tracker request timed out: {url}")]
    TrackerTimeout { url: String },

    #[error("Tracker {url} returned status {status}")]
    UnexpectedStatus { url: String, status: u16 },

    #[error("Tracker {url} returned an empty body")]
    EmptyResponse { url: String },

    #[error("Protocol error: {message}")]
    ProtocolError { message: String },

    #[error("{reason}")]
    FailureReason { reason: String },

    #[error("Tracker unreachable: all {attempted} endpoints failed")]
    TrackerUnreachable { attempted: usize },

    #[error("Announce cancelled")]
    Cancelled,

    #[error("HTTP client error")]
    Http(#[from] reqwest::Error),
}

/// Categorizes tracker errors by where the failure happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Connection, timeout, or HTTP status problems
    Transport,
    /// Body could not be decompressed or decoded
    Decode,
    /// Tracker answered with an explicit failure reason
    TrackerRejected,
    /// Errors that no further endpoint or retry can fix
    Fatal,
}

impl TrackerError {
    /// Determine the failure category of this error.
    pub fn kind(&self) -> FailureKind {
        match self {
            TrackerError::TrackerConnectionFailed { .. }
            | TrackerError::TrackerTimeout { .. }
            | TrackerError::UnexpectedStatus { .. }
            | TrackerError::EmptyResponse { .. }
            | TrackerError::TrackerUnreachable { .. } => FailureKind::Transport,
            TrackerError::ProtocolError { .. } => FailureKind::Decode,
            TrackerError::FailureReason { .. } => FailureKind::TrackerRejected,
            TrackerError::NoValidEndpoints { .. }
            | TrackerError::Cancelled
            | TrackerError::Http(_) => FailureKind::Fatal,
        }
    }

    /// Checks if the failure is worth another sweep.
    pub fn is_retryable(&self) -> bool {
        self.kind() != FailureKind::Fatal
    }
}
