//! HTTP transport for announce requests

use std::collections::HashMap;

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};

use super::TrackerError;
use super::protocol::constants::MAX_RESPONSE_SIZE;
use crate::config::NetworkConfig;

/// Status and body of one tracker HTTP exchange.
#[derive(Debug, Clone)]
pub struct TransportResponse {
    pub status: u16,
    pub body: Bytes,
}

/// Abstract HTTP GET used by the announce engine.
///
/// Lets the engine run against real trackers or scripted responses while
/// keeping identical sweep and retry behavior.
#[async_trait]
pub trait AnnounceTransport: Send + Sync {
    /// Issues a GET to `url` with extra `headers`.
    ///
    /// The body is only read for status 200; any other status comes back
    /// with an empty body.
    ///
    /// # Errors
    ///
    /// - `TrackerError::TrackerConnectionFailed` - If the connection or body read failed
    /// - `TrackerError::TrackerTimeout` - If the request exceeded the configured timeout
    /// - `TrackerError::ProtocolError` - If the body exceeds `MAX_RESPONSE_SIZE`
    async fn get(
        &self,
        url: &str,
        headers: &HashMap<String, String>,
    ) -> Result<TransportResponse, TrackerError>;
}

/// reqwest-backed transport
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    /// Creates the transport with timeout, user agent, and redirect limits
    /// taken from network configuration.
    ///
    /// # Errors
    ///
    /// - `TrackerError::Http` - If the HTTP client cannot be built
    pub fn new(config: &NetworkConfig) -> Result<Self, TrackerError> {
        let client = reqwest::Client::builder()
            .timeout(config.tracker_timeout)
            .user_agent(config.user_agent)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .build()?;

        Ok(Self { client })
    }
}

#[async_trait]
impl AnnounceTransport for HttpTransport {
    async fn get(
        &self,
        url: &str,
        headers: &HashMap<String, String>,
    ) -> Result<TransportResponse, TrackerError> {
        let mut request = self.client.get(url);
        for (name, value) in headers {
            request = request.header(name.as_str(), value.as_str());
        }

        let mut response = request
            .send()
            .await
            .map_err(|e| classify_request_error(url, &e))?;

        let status = response.status().as_u16();
        if status != 200 {
            // Dropping the response closes the connection without draining it
            return Ok(TransportResponse {
                status,
                body: Bytes::new(),
            });
        }

        if let Some(length) = response.content_length()
            && length > MAX_RESPONSE_SIZE as u64
        {
            return Err(oversized_body(url));
        }

        let mut body = BytesMut::new();
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| classify_request_error(url, &e))?
        {
            if body.len() + chunk.len() > MAX_RESPONSE_SIZE {
                return Err(oversized_body(url));
            }
            body.extend_from_slice(&chunk);
        }

        Ok(TransportResponse {
            status,
            body: body.freeze(),
        })
    }
}

fn oversized_body(url: &str) -> TrackerError {
    tracing::warn!("Tracker {} sent more than {} bytes", url, MAX_RESPONSE_SIZE);
    TrackerError::ProtocolError {
        message: format!("Tracker response exceeds {MAX_RESPONSE_SIZE} bytes"),
    }
}

fn classify_request_error(url: &str, error: &reqwest::Error) -> TrackerError {
    tracing::warn!("HTTP request to {} failed: {}", url, error);

    if error.is_timeout() {
        TrackerError::TrackerTimeout {
            url: url.to_string(),
        }
    } else {
        TrackerError::TrackerConnectionFailed {
            url: url.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn test_http_transport_builds_from_config() {
        let config = NetworkConfig {
            tracker_timeout: Duration::from_secs(5),
            user_agent: "herald/test",
            max_redirects: 0,
        };
        assert!(HttpTransport::new(&config).is_ok());
    }

    /// Serves a single connection with a raw HTTP response head and body, then
    /// holds the socket open.
    async fn serve_once(head: String, body: Vec<u8>) -> String {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = [0u8; 1024];
            let _ = socket.read(&mut request).await;
            let _ = socket.write_all(head.as_bytes()).await;
            let _ = socket.write_all(&body).await;
            std::future::pending::<()>().await;
        });
        format!("http://{addr}/announce")
    }

    #[tokio::test]
    async fn test_error_status_returns_without_reading_body() {
        let head = "HTTP/1.1 503 Busy\r\nContent-Length: 1000000\r\n\r\n".to_string();
        let url = serve_once(head, b"partial".to_vec()).await;

        let config = NetworkConfig {
            tracker_timeout: Duration::from_secs(10),
            ..NetworkConfig::default()
        };
        let transport = HttpTransport::new(&config).unwrap();
        let response = tokio::time::timeout(
            Duration::from_secs(5),
            transport.get(&url, &HashMap::new()),
        )
        .await
        .expect("error status must not wait for the body")
        .unwrap();

        assert_eq!(response.status, 503);
        assert!(response.body.is_empty());
    }

    #[tokio::test]
    async fn test_declared_oversized_body_rejected() {
        let head = format!(
            "HTTP/1.1 200 OK\r\nContent-Length: {}\r\n\r\n",
            MAX_RESPONSE_SIZE + 1
        );
        let url = serve_once(head, b"d8:interval".to_vec()).await;

        let transport = HttpTransport::new(&NetworkConfig::default()).unwrap();
        let result = transport.get(&url, &HashMap::new()).await;

        assert!(matches!(result, Err(TrackerError::ProtocolError { .. })));
    }

    #[tokio::test]
    async fn test_chunked_oversized_body_rejected() {
        let chunk = vec![b'x'; 64 * 1024];
        let mut body = Vec::new();
        for _ in 0..(MAX_RESPONSE_SIZE / chunk.len() + 1) {
            body.extend_from_slice(format!("{:x}\r\n", chunk.len()).as_bytes());
            body.extend_from_slice(&chunk);
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(b"0\r\n\r\n");
        let head = "HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\n".to_string();
        let url = serve_once(head, body).await;

        let transport = HttpTransport::new(&NetworkConfig::default()).unwrap();
        let result = transport.get(&url, &HashMap::new()).await;

        assert!(matches!(result, Err(TrackerError::ProtocolError { .. })));
    }

    #[tokio::test]
    async fn test_connection_refused_is_connection_failure() {
        // Bind then drop to get a port nothing listens on
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let transport = HttpTransport::new(&NetworkConfig::default()).unwrap();
        let url = format!("http://127.0.0.1:{port}/announce");
        let result = transport.get(&url, &HashMap::new()).await;

        assert!(matches!(
            result,
            Err(TrackerError::TrackerConnectionFailed { url: failed }) if failed == url
        ));
    }
}
