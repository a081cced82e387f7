//! Announce response decoding: gzip sniffing, bencode parsing, field extraction

use std::borrow::Cow;
use std::io::Read;

use flate2::read::GzDecoder;

use super::TrackerError;
use super::protocol::constants::{
    GZIP_SIGNATURE, KEY_COMPLETE, KEY_FAILURE_REASON, KEY_INCOMPLETE, KEY_INTERVAL,
    KEY_MIN_INTERVAL, KEY_WARNING_MESSAGE, MAX_RESPONSE_SIZE,
};
use super::types::TrackerResponse;

// Type alias for the decoded announce dictionary
pub type BencodeDict<'a> = std::collections::HashMap<&'a [u8], bencode_rs::Value<'a>>;

/// Checks whether a body starts with the gzip signature.
///
/// Trackers sometimes gzip the body without a `Content-Encoding` header, so
/// detection looks at the bytes rather than the headers.
pub fn is_gzip(body: &[u8]) -> bool {
    body.starts_with(&GZIP_SIGNATURE)
}

/// Returns the body with any gzip compression removed.
///
/// # Errors
///
/// - `TrackerError::ProtocolError` - If the body looks like gzip but does not inflate,
///   or inflates past `MAX_RESPONSE_SIZE`
pub fn decompress_body(body: &[u8]) -> Result<Cow<'_, [u8]>, TrackerError> {
    if !is_gzip(body) {
        return Ok(Cow::Borrowed(body));
    }

    let mut inflated = Vec::new();
    GzDecoder::new(body)
        .take(MAX_RESPONSE_SIZE as u64 + 1)
        .read_to_end(&mut inflated)
        .map_err(|e| TrackerError::ProtocolError {
            message: format!("Failed to decompress gzip tracker response: {e}"),
        })?;

    if inflated.len() > MAX_RESPONSE_SIZE {
        return Err(TrackerError::ProtocolError {
            message: format!("Inflated tracker response exceeds {MAX_RESPONSE_SIZE} bytes"),
        });
    }

    tracing::trace!(
        "Inflated gzip tracker response from {} to {} bytes",
        body.len(),
        inflated.len()
    );

    Ok(Cow::Owned(inflated))
}

/// Parse an (already decompressed) announce response body.
///
/// # Errors
///
/// - `TrackerError::ProtocolError` - If the body is not bencode or its root is not a dictionary
/// - `TrackerError::FailureReason` - If the tracker reported a failure reason
pub fn decode_announce_response(body: &[u8]) -> Result<TrackerResponse, TrackerError> {
    let parsed = bencode_rs::Value::parse(body).map_err(|e| TrackerError::ProtocolError {
        message: format!("Failed to parse tracker response: {e:?}"),
    })?;

    let Some(root) = parsed.first() else {
        return Err(TrackerError::ProtocolError {
            message: "Empty tracker response".to_string(),
        });
    };

    let bencode_rs::Value::Dictionary(dict) = root else {
        return Err(TrackerError::ProtocolError {
            message: "Invalid tracker response format".to_string(),
        });
    };

    extract_tracker_response(dict)
}

/// Extract a tracker response from a decoded announce dictionary.
///
/// A non-empty `failure reason` wins over every other field. Interval and
/// count fields are best effort: absent, non-integer, or out-of-range values
/// decode as zero.
///
/// # Errors
///
/// - `TrackerError::FailureReason` - If `failure reason` is a non-empty string
pub fn extract_tracker_response(dict: &BencodeDict<'_>) -> Result<TrackerResponse, TrackerError> {
    if let Some(reason) = extract_string(dict, KEY_FAILURE_REASON)
        && !reason.is_empty()
    {
        return Err(TrackerError::FailureReason { reason });
    }

    Ok(TrackerResponse {
        min_interval: extract_count(dict, KEY_MIN_INTERVAL),
        interval: extract_count(dict, KEY_INTERVAL),
        seeders: extract_count(dict, KEY_COMPLETE),
        leechers: extract_count(dict, KEY_INCOMPLETE),
        warning_message: extract_string(dict, KEY_WARNING_MESSAGE).filter(|m| !m.is_empty()),
    })
}

fn extract_string(dict: &BencodeDict<'_>, key: &[u8]) -> Option<String> {
    match dict.get(key) {
        Some(bencode_rs::Value::Bytes(bytes)) => Some(String::from_utf8_lossy(bytes).into_owned()),
        _ => None,
    }
}

fn extract_count(dict: &BencodeDict<'_>, key: &[u8]) -> u32 {
    match dict.get(key) {
        Some(bencode_rs::Value::Integer(value)) => u32::try_from(*value).unwrap_or(0),
        _ => 0, // Optional field
    }
}
