//! Raw HTTP transport for the comet channel.
//!
//! The comet poll is a plain (unsigned) GET whose body may trickle in over
//! a long period. [`CometTransport::open`] returns once response headers
//! arrive; the body is then pulled chunk by chunk so the caller can enforce
//! an inactivity timeout between chunks.

use async_trait::async_trait;
use plurk_domain::config::CometConfig;
use plurk_domain::error::{Error, Result};
use reqwest::{Client, Response};

/// Opens comet GET requests.
#[async_trait]
pub trait CometTransport: Send + Sync {
    async fn open(&self, url: &str) -> Result<Box<dyn CometBody>>;
}

/// A response whose headers have arrived and whose body is still streaming.
#[async_trait]
pub trait CometBody: Send {
    fn status(&self) -> u16;

    /// The next body chunk, or `None` once the body is complete.
    async fn next_chunk(&mut self) -> Result<Option<Vec<u8>>>;
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// reqwest-backed transport
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Comet transport with its own `reqwest::Client`.
///
/// The client is separate from the signer's so that relaxing certificate
/// validation for the comet host never affects signed API traffic. No
/// overall request timeout is set; inactivity is enforced by the poller.
#[derive(Debug, Clone)]
pub struct ReqwestCometTransport {
    http: Client,
}

impl ReqwestCometTransport {
    pub fn new(cfg: &CometConfig) -> Result<Self> {
        let http = Client::builder()
            .danger_accept_invalid_certs(cfg.accept_invalid_certs)
            .build()
            .map_err(|e| Error::Config(format!("comet HTTP client build failed: {e}")))?;
        Ok(Self { http })
    }
}

#[async_trait]
impl CometTransport for ReqwestCometTransport {
    async fn open(&self, url: &str) -> Result<Box<dyn CometBody>> {
        let resp = self.http.get(url).send().await.map_err(from_reqwest)?;
        Ok(Box::new(ReqwestBody(resp)))
    }
}

struct ReqwestBody(Response);

#[async_trait]
impl CometBody for ReqwestBody {
    fn status(&self) -> u16 {
        self.0.status().as_u16()
    }

    async fn next_chunk(&mut self) -> Result<Option<Vec<u8>>> {
        let chunk = self.0.chunk().await.map_err(from_reqwest)?;
        Ok(chunk.map(|bytes| bytes.to_vec()))
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Error conversion helper
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Convert a `reqwest::Error` into a domain `Error`.
///
/// Timeout errors become `Error::Timeout`; everything else becomes
/// `Error::Transport`.
pub fn from_reqwest(e: reqwest::Error) -> Error {
    if e.is_timeout() {
        Error::Timeout(e.to_string())
    } else {
        Error::Transport(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::test_support::serve_once;

    async fn drain(body: &mut Box<dyn CometBody>) -> String {
        let mut bytes = Vec::new();
        while let Some(chunk) = body.next_chunk().await.unwrap() {
            bytes.extend_from_slice(&chunk);
        }
        String::from_utf8(bytes).unwrap()
    }

    #[tokio::test]
    async fn error_status_still_delivers_body() {
        let payload = r#"CometChannel.scriptCallback({"new_offset":3,"data":[]});"#;
        let (base, server) = serve_once(500, payload, Duration::ZERO).await;
        let transport = ReqwestCometTransport::new(&CometConfig::default()).unwrap();

        let mut body = transport
            .open(&format!("{base}comet?channel=generic-1&offset=2"))
            .await
            .unwrap();
        assert_eq!(body.status(), 500);
        assert_eq!(drain(&mut body).await, payload);

        let seen = server.await.unwrap();
        assert_eq!(seen.method, "GET");
        assert_eq!(seen.path, "/comet?channel=generic-1&offset=2");
        assert!(seen.headers.get("authorization").is_none());
    }

    #[tokio::test]
    async fn refused_connection_is_a_transport_error() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let transport = ReqwestCometTransport::new(&CometConfig::default()).unwrap();
        let err = match transport.open(&format!("http://{addr}/comet")).await {
            Ok(_) => panic!("open should fail"),
            Err(e) => e,
        };
        assert!(matches!(err, Error::Transport(_)), "{err:?}");
    }
}
