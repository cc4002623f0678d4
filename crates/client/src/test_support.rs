//! In-memory signer and comet transport doubles for unit tests, plus a
//! one-shot loopback HTTP server for exercising the reqwest adapters.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use plurk_domain::error::{Error, Result};
use plurk_domain::token::TokenPair;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

use crate::signer::{OAuthSigner, Params, SignedResponse};
use crate::transport::{CometBody, CometTransport};

#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub url: String,
    pub token: Option<TokenPair>,
    pub params: Option<Params>,
}

/// Signer that replays queued responses and records every call.
#[derive(Default)]
pub struct MockSigner {
    responses: Mutex<VecDeque<Result<SignedResponse>>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl MockSigner {
    pub fn push_ok(&self, status: u16, body: &str) {
        self.responses.lock().unwrap().push_back(Ok(SignedResponse {
            status,
            body: body.to_owned(),
        }));
    }

    pub fn push_err(&self, err: Error) {
        self.responses.lock().unwrap().push_back(Err(err));
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl OAuthSigner for MockSigner {
    async fn signed_post(
        &self,
        url: &str,
        token: Option<&TokenPair>,
        params: Option<&Params>,
    ) -> Result<SignedResponse> {
        self.calls.lock().unwrap().push(RecordedCall {
            url: url.to_owned(),
            token: token.cloned(),
            params: params.cloned(),
        });
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(Error::Transport("no scripted response".into())))
    }

    async fn request_token(&self, url: &str, callback: Option<&str>) -> Result<TokenPair> {
        let mut params = Params::new();
        if let Some(cb) = callback {
            params.insert("oauth_callback".into(), cb.to_owned());
        }
        self.calls.lock().unwrap().push(RecordedCall {
            url: url.to_owned(),
            token: None,
            params: Some(params),
        });
        Ok(TokenPair::new("req-token", "req-secret"))
    }

    async fn access_token(
        &self,
        url: &str,
        request_token: &TokenPair,
        verifier: &str,
    ) -> Result<TokenPair> {
        let mut params = Params::new();
        params.insert("oauth_verifier".into(), verifier.to_owned());
        self.calls.lock().unwrap().push(RecordedCall {
            url: url.to_owned(),
            token: Some(request_token.clone()),
            params: Some(params),
        });
        if verifier.is_empty() {
            return Err(Error::Auth("access token: missing verifier".into()));
        }
        Ok(TokenPair::new("acc-token", "acc-secret"))
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Scripted comet transport
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// One scripted comet response.
pub enum Script {
    /// `open` fails immediately.
    Fail(Error),
    /// Headers after `delay`, then each chunk after its own delay.
    Respond {
        delay: Duration,
        status: u16,
        chunks: Vec<(Duration, Vec<u8>)>,
    },
}

impl Script {
    /// An immediate, single-chunk response.
    pub fn body(status: u16, body: &str) -> Self {
        Script::Respond {
            delay: Duration::ZERO,
            status,
            chunks: vec![(Duration::ZERO, body.as_bytes().to_vec())],
        }
    }
}

/// Comet transport that replays scripts in order and counts delivered
/// chunks.
#[derive(Default)]
pub struct ScriptedTransport {
    scripts: Mutex<VecDeque<Script>>,
    urls: Mutex<Vec<String>>,
    delivered: Arc<AtomicUsize>,
}

impl ScriptedTransport {
    pub fn push(&self, script: Script) {
        self.scripts.lock().unwrap().push_back(script);
    }

    pub fn urls(&self) -> Vec<String> {
        self.urls.lock().unwrap().clone()
    }

    /// Chunks handed to a caller so far.
    pub fn delivered(&self) -> usize {
        self.delivered.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CometTransport for ScriptedTransport {
    async fn open(&self, url: &str) -> Result<Box<dyn CometBody>> {
        self.urls.lock().unwrap().push(url.to_owned());
        let script = self.scripts.lock().unwrap().pop_front();
        match script {
            None => Err(Error::Transport("no scripted response".into())),
            Some(Script::Fail(e)) => Err(e),
            Some(Script::Respond {
                delay,
                status,
                chunks,
            }) => {
                tokio::time::sleep(delay).await;
                Ok(Box::new(ScriptedBody {
                    status,
                    chunks: chunks.into(),
                    delivered: self.delivered.clone(),
                }))
            }
        }
    }
}

struct ScriptedBody {
    status: u16,
    chunks: VecDeque<(Duration, Vec<u8>)>,
    delivered: Arc<AtomicUsize>,
}

#[async_trait]
impl CometBody for ScriptedBody {
    fn status(&self) -> u16 {
        self.status
    }

    async fn next_chunk(&mut self) -> Result<Option<Vec<u8>>> {
        let Some((delay, chunk)) = self.chunks.pop_front() else {
            return Ok(None);
        };
        tokio::time::sleep(delay).await;
        self.delivered.fetch_add(1, Ordering::SeqCst);
        Ok(Some(chunk))
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Loopback HTTP server
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// A request as seen on the wire. Header names are lowercased.
#[derive(Debug, Clone)]
pub struct CapturedRequest {
    pub method: String,
    pub path: String,
    pub headers: HashMap<String, String>,
    pub body: String,
}

impl CapturedRequest {
    pub fn header(&self, name: &str) -> &str {
        self.headers.get(name).map(String::as_str).unwrap_or_default()
    }
}

/// Accept one connection on 127.0.0.1, capture its request, wait `stall`,
/// then answer with `status` and `body`.
///
/// Returns the server's base URL (with trailing slash) and a handle that
/// resolves to the captured request once the response is written.
pub async fn serve_once(
    status: u16,
    body: &str,
    stall: Duration,
) -> (String, JoinHandle<CapturedRequest>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let body = body.to_owned();

    let handle = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let request = read_request(&mut socket).await;
        tokio::time::sleep(stall).await;

        let head = format!(
            "HTTP/1.1 {status} Scripted\r\nContent-Type: text/plain\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
            body.len()
        );
        socket.write_all(head.as_bytes()).await.unwrap();
        socket.write_all(body.as_bytes()).await.unwrap();
        let _ = socket.shutdown().await;
        request
    });

    (format!("http://{addr}/"), handle)
}

async fn read_request(socket: &mut TcpStream) -> CapturedRequest {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];

    let header_end = loop {
        let n = socket.read(&mut chunk).await.unwrap();
        assert!(n > 0, "connection closed before request headers");
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = String::from_utf8_lossy(&buf[..header_end]).into_owned();
    let mut lines = head.split("\r\n");
    let mut request_line = lines.next().unwrap_or_default().split(' ');
    let method = request_line.next().unwrap_or_default().to_owned();
    let path = request_line.next().unwrap_or_default().to_owned();
    let headers: HashMap<String, String> = lines
        .filter_map(|line| line.split_once(':'))
        .map(|(k, v)| (k.trim().to_ascii_lowercase(), v.trim().to_owned()))
        .collect();

    let len = headers
        .get("content-length")
        .and_then(|v| v.parse::<usize>().ok())
        .unwrap_or(0);
    while buf.len() < header_end + len {
        let n = socket.read(&mut chunk).await.unwrap();
        assert!(n > 0, "connection closed before request body");
        buf.extend_from_slice(&chunk[..n]);
    }
    let body = String::from_utf8_lossy(&buf[header_end..header_end + len]).into_owned();

    CapturedRequest {
        method,
        path,
        headers,
        body,
    }
}
