//! BitTorrent tracker protocol utilities and constants

/// BitTorrent tracker protocol constants
pub mod constants {
    /// URL schemes an HTTP tracker endpoint may use
    pub const HTTP_SCHEMES: [&str; 2] = ["http", "https"];

    /// Leading bytes of a gzip stream (magic number plus deflate method)
    pub const GZIP_SIGNATURE: [u8; 3] = [0x1F, 0x8B, 0x08];

    /// Largest announce body accepted, both on the wire and after inflating
    pub const MAX_RESPONSE_SIZE: usize = 2 * 1024 * 1024;

    /// Dictionary keys of an announce response
    pub const KEY_FAILURE_REASON: &[u8] = b"failure reason";
    pub const KEY_WARNING_MESSAGE: &[u8] = b"warning message";
    pub const KEY_MIN_INTERVAL: &[u8] = b"min interval";
    pub const KEY_INTERVAL: &[u8] = b"interval";
    pub const KEY_COMPLETE: &[u8] = b"complete";
    pub const KEY_INCOMPLETE: &[u8] = b"incomplete";
}

/// URL encoding utilities for tracker communication
pub mod encoding {
    /// Encode bytes for tracker URL parameters.
    ///
    /// Every byte becomes `%XX`, which trackers accept for binary fields such
    /// as `info_hash` and `peer_id`.
    pub fn url_encode_bytes(bytes: &[u8]) -> String {
        bytes.iter().map(|&b| format!("%{b:02X}")).collect()
    }
}
