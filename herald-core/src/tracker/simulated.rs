//! Scripted transport for exercising the announce engine without a network

use std::collections::{HashMap, VecDeque};

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::Mutex;

use super::TrackerError;
use super::client::{AnnounceTransport, TransportResponse};

/// Canned outcome for one request to an endpoint.
#[derive(Debug, Clone)]
pub enum ScriptedReply {
    /// Respond with a status and body
    Respond { status: u16, body: Bytes },
    /// Fail as if the connection was refused
    ConnectionFailed,
    /// Fail as if the request timed out
    Timeout,
}

impl ScriptedReply {
    /// 200 response carrying `body`.
    pub fn ok(body: impl Into<Bytes>) -> Self {
        Self::Respond {
            status: 200,
            body: body.into(),
        }
    }

    /// Response with a non-200 status and empty body.
    pub fn status(status: u16) -> Self {
        Self::Respond {
            status,
            body: Bytes::new(),
        }
    }
}

#[derive(Debug, Default)]
struct Script {
    // Replies per endpoint base URL, consumed front to back
    replies: HashMap<String, VecDeque<ScriptedReply>>,
    // Replies reused once a queue runs dry
    fallback: HashMap<String, ScriptedReply>,
    requests: Vec<String>,
}

/// Transport answering from per-endpoint scripts.
///
/// Requests are matched to an endpoint by base URL prefix. Endpoints with no
/// script, or whose script ran out without a fallback, fail to connect.
#[derive(Debug, Default)]
pub struct ScriptedTransport {
    script: Mutex<Script>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a single reply for `endpoint`.
    pub async fn push_reply(&self, endpoint: &str, reply: ScriptedReply) {
        self.script
            .lock()
            .await
            .replies
            .entry(endpoint.to_string())
            .or_default()
            .push_back(reply);
    }

    /// Sets the reply used for `endpoint` whenever its queue is empty.
    pub async fn set_fallback(&self, endpoint: &str, reply: ScriptedReply) {
        self.script
            .lock()
            .await
            .fallback
            .insert(endpoint.to_string(), reply);
    }

    /// Returns every requested URL, in order.
    pub async fn requests(&self) -> Vec<String> {
        self.script.lock().await.requests.clone()
    }
}

#[async_trait]
impl AnnounceTransport for ScriptedTransport {
    async fn get(
        &self,
        url: &str,
        _headers: &HashMap<String, String>,
    ) -> Result<TransportResponse, TrackerError> {
        let mut script = self.script.lock().await;
        script.requests.push(url.to_string());

        // Longest matching base wins so "http://a/x" does not shadow "http://a/x2"
        let endpoint = script
            .replies
            .keys()
            .chain(script.fallback.keys())
            .filter(|base| url.starts_with(base.as_str()))
            .max_by_key(|base| base.len())
            .cloned();

        let reply = match endpoint {
            Some(endpoint) => {
                let queued = script
                    .replies
                    .get_mut(&endpoint)
                    .and_then(VecDeque::pop_front);
                queued.or_else(|| script.fallback.get(&endpoint).cloned())
            }
            None => None,
        };

        match reply {
            Some(ScriptedReply::Respond { status, body }) => Ok(TransportResponse { status, body }),
            Some(ScriptedReply::Timeout) => Err(TrackerError::TrackerTimeout {
                url: url.to_string(),
            }),
            Some(ScriptedReply::ConnectionFailed) | None => {
                Err(TrackerError::TrackerConnectionFailed {
                    url: url.to_string(),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_replies_are_consumed_in_order_then_fallback() {
        let transport = ScriptedTransport::new();
        transport
            .push_reply("http://a/announce", ScriptedReply::status(500))
            .await;
        transport
            .set_fallback("http://a/announce", ScriptedReply::ok("d8:intervali60ee"))
            .await;

        let headers = HashMap::new();
        let first = transport.get("http://a/announce?x=1", &headers).await.unwrap();
        assert_eq!(first.status, 500);

        let second = transport.get("http://a/announce?x=1", &headers).await.unwrap();
        assert_eq!(second.status, 200);
        assert_eq!(second.body, Bytes::from_static(b"d8:intervali60ee"));

        assert_eq!(transport.requests().await.len(), 2);
    }

    #[tokio::test]
    async fn test_unknown_endpoint_fails_to_connect() {
        let transport = ScriptedTransport::new();
        let result = transport.get("http://nowhere/announce", &HashMap::new()).await;
        assert!(matches!(
            result,
            Err(TrackerError::TrackerConnectionFailed { .. })
        ));
    }

    #[tokio::test]
    async fn test_longest_prefix_wins() {
        let transport = ScriptedTransport::new();
        transport
            .set_fallback("http://a/x", ScriptedReply::status(404))
            .await;
        transport
            .set_fallback("http://a/x2", ScriptedReply::status(503))
            .await;

        let response = transport.get("http://a/x2?q", &HashMap::new()).await.unwrap();
        assert_eq!(response.status, 503);
    }
}
