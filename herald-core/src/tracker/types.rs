//! Core types for BitTorrent tracker announces

use std::fmt;
use std::time::Duration;

use super::protocol::encoding::url_encode_bytes;

/// Decoded tracker announce response.
///
/// Carries the intervals the caller uses to schedule its next announce and
/// the swarm counts reported by the tracker. Missing fields decode as zero.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrackerResponse {
    /// Minimum allowed interval between announces, in seconds (advisory)
    pub min_interval: u32,
    /// Seconds until the next announce should be sent
    pub interval: u32,
    /// Number of seeders in the swarm
    pub seeders: u32,
    /// Number of leechers in the swarm
    pub leechers: u32,
    /// Non-fatal message from the tracker
    pub warning_message: Option<String>,
}

impl TrackerResponse {
    pub fn interval_duration(&self) -> Duration {
        Duration::from_secs(u64::from(self.interval))
    }

    pub fn min_interval_duration(&self) -> Duration {
        Duration::from_secs(u64::from(self.min_interval))
    }
}

/// BitTorrent announce events.
///
/// Indicates client state changes that should be reported to the tracker.
/// Periodic announces carry no event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnnounceEvent {
    /// Client started downloading this torrent
    Started,
    /// Client stopped downloading this torrent
    Stopped,
    /// Client completed downloading this torrent
    Completed,
}

impl fmt::Display for AnnounceEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnnounceEvent::Started => write!(f, "started"),
            AnnounceEvent::Stopped => write!(f, "stopped"),
            AnnounceEvent::Completed => write!(f, "completed"),
        }
    }
}

/// 20-byte peer identifier sent to the tracker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PeerId([u8; 20]);

impl PeerId {
    /// Default Azureus-style client prefix
    pub const DEFAULT_PREFIX: &'static [u8] = b"-HR0001-";

    /// Creates peer ID from 20-byte array.
    pub fn new(id: [u8; 20]) -> Self {
        Self(id)
    }

    /// Returns peer ID as byte array reference.
    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    /// Generate a random peer ID behind a client prefix.
    ///
    /// Prefixes longer than 20 bytes are truncated.
    pub fn generate(prefix: &[u8]) -> Self {
        let mut id = [0u8; 20];
        let prefix_len = prefix.len().min(id.len());
        id[..prefix_len].copy_from_slice(&prefix[..prefix_len]);
        for byte in &mut id[prefix_len..] {
            *byte = rand::random();
        }
        Self(id)
    }
}

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

/// Statistics reported in one announce.
///
/// Renders the already-encoded query string `AnnounceEngine::announce` expects.
#[derive(Debug, Clone)]
pub struct AnnounceQuery {
    /// SHA-1 of the torrent's info dictionary
    pub info_hash: [u8; 20],
    /// Client's unique identifier
    pub peer_id: PeerId,
    /// TCP port client is listening on for peer connections
    pub port: u16,
    /// Total bytes uploaded to other peers
    pub uploaded: u64,
    /// Total bytes downloaded from other peers
    pub downloaded: u64,
    /// Bytes remaining to download (0 for seeders)
    pub left: u64,
    /// State change being reported, if any
    pub event: Option<AnnounceEvent>,
    /// Number of peers wanted from the tracker
    pub numwant: Option<u32>,
    /// Per-session key letting the tracker recognize the client across IP changes
    pub key: Option<String>,
    /// Ask for the compact peer list format
    pub compact: bool,
}

impl AnnounceQuery {
    /// Creates a query with no event, no key, and compact peers requested.
    pub fn new(info_hash: [u8; 20], peer_id: PeerId, port: u16) -> Self {
        Self {
            info_hash,
            peer_id,
            port,
            uploaded: 0,
            downloaded: 0,
            left: 0,
            event: None,
            numwant: None,
            key: None,
            compact: true,
        }
    }

    /// Builds the percent-encoded query string, without a leading `?`.
    pub fn to_query_string(&self) -> String {
        // Binary fields are encoded by hand to avoid double-encoding
        let mut query = format!(
            "info_hash={}&peer_id={}&port={}&uploaded={}&downloaded={}&left={}",
            url_encode_bytes(&self.info_hash),
            url_encode_bytes(self.peer_id.as_bytes()),
            self.port,
            self.uploaded,
            self.downloaded,
            self.left,
        );

        if let Some(event) = self.event {
            query.push_str(&format!("&event={event}"));
        }
        if let Some(numwant) = self.numwant {
            query.push_str(&format!("&numwant={numwant}"));
        }
        if let Some(key) = &self.key {
            query.push_str(&format!("&key={}", url_encode_bytes(key.as_bytes())));
        }
        if self.compact {
            query.push_str("&compact=1");
        }

        query
    }
}
