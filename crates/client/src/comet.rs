//! Comet (long-polling) real-time channel.
//!
//! A session starts with a signed call to `Realtime/getUserChannel`, which
//! returns the channel URL in `comet_server`. Each poll is then a plain GET
//! against `<base>?channel=<id>[&offset=<n>]`; the response carries the
//! events plus a `new_offset` cursor for the next poll.
//!
//! ```text
//! Unbootstrapped ──bootstrap──▶ Holding(channel) ──poll ok──▶ Holding(channel @ new_offset)
//!                                      ▲                            │
//!                                      └────────poll failed─────────┘ (offset unchanged)
//! ```
//!
//! The channel id is fixed for the life of a session and the continuation
//! URL is rebuilt from base + id + latest offset on every poll. Nothing here
//! retries; callers own the loop and any backoff.

use std::sync::Arc;
use std::time::{Duration, Instant};

use plurk_domain::error::{Error, Result};
use plurk_domain::response::{ApiResult, Failure, Payload};
use plurk_domain::token::TokenPair;
use plurk_domain::trace::TraceEvent;
use url::Url;
use serde_json::Value;
use uuid::Uuid;

use crate::dispatch::Dispatcher;
use crate::envelope;
use crate::transport::CometTransport;

/// API path that allocates a comet channel for the calling user.
pub const USER_CHANNEL_PATH: &str = "/APP/Realtime/getUserChannel";

/// Default inactivity bound for one poll.
pub const DEFAULT_INACTIVITY_TIMEOUT: Duration = Duration::from_secs(80);

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Channel
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// A comet channel URL taken apart: base (no query), channel id and the
/// latest offset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CometChannel {
    base: Url,
    channel_id: String,
    offset: Option<String>,
}

impl CometChannel {
    /// Parse a channel URL as handed out by `comet_server`, or a
    /// continuation URL produced by a previous poll.
    pub fn parse(url: &str) -> Result<Self> {
        let mut base =
            Url::parse(url).map_err(|e| Error::InvalidChannelUrl(format!("{url}: {e}")))?;

        let mut channel_id = None;
        let mut offset = None;
        for (key, value) in base.query_pairs() {
            match key.as_ref() {
                "channel" => channel_id = Some(value.into_owned()),
                "offset" => offset = Some(value.into_owned()),
                _ => {}
            }
        }
        let channel_id = channel_id
            .filter(|id| !id.is_empty())
            .ok_or_else(|| Error::InvalidChannelUrl(format!("{url}: no channel parameter")))?;

        base.set_query(None);
        base.set_fragment(None);

        Ok(Self {
            base,
            channel_id,
            offset,
        })
    }

    pub fn channel_id(&self) -> &str {
        &self.channel_id
    }

    pub fn offset(&self) -> Option<&str> {
        self.offset.as_deref()
    }

    /// The same channel positioned at `offset`.
    pub fn at_offset(&self, offset: impl Into<String>) -> Self {
        Self {
            base: self.base.clone(),
            channel_id: self.channel_id.clone(),
            offset: Some(offset.into()),
        }
    }

    /// The URL to poll, rebuilt from scratch.
    pub fn url(&self) -> String {
        let mut url = self.base.clone();
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("channel", &self.channel_id);
            if let Some(ref offset) = self.offset {
                query.append_pair("offset", offset);
            }
        }
        url.into()
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Outcomes
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// A successful `getUserChannel` call.
#[derive(Debug, Clone)]
pub struct Bootstrapped {
    /// The full decoded response.
    pub envelope: Value,
    /// `comet_server` exactly as returned.
    pub channel_url: String,
    pub channel: CometChannel,
}

/// A successful poll.
#[derive(Debug, Clone)]
pub struct CometPoll {
    /// The decoded payload (`new_offset`, `data`, ...).
    pub data: Value,
    /// Where to poll next.
    pub next_url: String,
    pub channel: CometChannel,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Comet client
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Bootstrap and poll operations, without session state.
#[derive(Clone)]
pub struct CometClient {
    dispatcher: Dispatcher,
    transport: Arc<dyn CometTransport>,
    inactivity_timeout: Duration,
}

impl CometClient {
    pub fn new(
        dispatcher: Dispatcher,
        transport: Arc<dyn CometTransport>,
        inactivity_timeout: Duration,
    ) -> Self {
        Self {
            dispatcher,
            transport,
            inactivity_timeout,
        }
    }

    /// Ask the API for a comet channel.
    ///
    /// Dispatch failures are returned unchanged. A response without a
    /// usable `comet_server` fails with `MissingField("comet_server")` and
    /// carries the decoded envelope.
    pub async fn start_comet(&self, token: Option<&TokenPair>) -> ApiResult<Bootstrapped> {
        let envelope = self.dispatcher.rq(USER_CHANNEL_PATH, None, token).await?;

        let channel_url = envelope
            .get("comet_server")
            .and_then(Value::as_str)
            .filter(|url| !url.is_empty())
            .map(str::to_owned);
        let Some(channel_url) = channel_url else {
            return Err(Failure::with_data(
                Error::MissingField("comet_server"),
                Payload::Json(envelope),
            ));
        };

        match CometChannel::parse(&channel_url) {
            Ok(channel) => Ok(Bootstrapped {
                envelope,
                channel_url,
                channel,
            }),
            Err(e) => Err(Failure::with_data(e, Payload::Json(envelope))),
        }
    }

    /// Poll a channel URL once.
    pub async fn comet(&self, channel_url: &str) -> ApiResult<CometPoll> {
        let channel = CometChannel::parse(channel_url)?;
        self.poll_channel(&channel, None).await
    }

    pub(crate) async fn poll_channel(
        &self,
        channel: &CometChannel,
        session_id: Option<&Uuid>,
    ) -> ApiResult<CometPoll> {
        let start = Instant::now();
        let received = self.receive(&channel.url()).await;

        let status = received.as_ref().ok().map(|(status, _)| *status);
        let outcome = match received {
            Ok((status, body)) => interpret(channel, status, &body),
            Err(e) => Err(Failure::bare(e)),
        };

        TraceEvent::CometPoll {
            session_id: session_id.map(Uuid::to_string),
            channel_id: channel.channel_id().to_owned(),
            status,
            outcome: match &outcome {
                Ok(_) => "ok",
                Err(f) => match f.error {
                    Error::Timeout(_) => "timeout",
                    Error::HttpStatus { .. } => "http_status",
                    Error::MissingField(_) => "missing_offset",
                    _ => "transport",
                },
            },
            duration_ms: start.elapsed().as_millis() as u64,
        }
        .emit();

        outcome
    }

    /// Issue the GET and collect the whole body.
    ///
    /// Each wait (for headers, then for every chunk) is bounded by the
    /// inactivity timeout. On expiry the in-flight response is dropped, so
    /// data arriving afterwards is never read.
    async fn receive(&self, url: &str) -> Result<(u16, String)> {
        let idle = self.inactivity_timeout;
        let timed_out = || Error::Timeout(format!("no comet data for {}s", idle.as_secs()));

        let mut body = tokio::time::timeout(idle, self.transport.open(url))
            .await
            .map_err(|_| timed_out())??;
        let status = body.status();

        let mut buf = Vec::new();
        loop {
            match tokio::time::timeout(idle, body.next_chunk()).await {
                Err(_) => return Err(timed_out()),
                Ok(Err(e)) => return Err(e),
                Ok(Ok(None)) => break,
                Ok(Ok(Some(chunk))) => buf.extend_from_slice(&chunk),
            }
        }

        Ok((status, String::from_utf8_lossy(&buf).into_owned()))
    }
}

/// Turn a completed comet response into an outcome.
///
/// Non-2xx bodies still go through padded-JSON decoding so diagnostic
/// payloads reach the caller next to the `HttpStatus` error.
fn interpret(channel: &CometChannel, status: u16, body: &str) -> ApiResult<CometPoll> {
    let decoded = envelope::decode_padded(body);

    if !(200..=299).contains(&status) {
        let data = match decoded {
            Some(value) => Payload::Json(value),
            None => Payload::Raw(body.to_owned()),
        };
        return Err(Failure::with_data(
            Error::HttpStatus {
                status,
                body: body.to_owned(),
            },
            data,
        ));
    }

    let Some(data) = decoded else {
        return Err(Failure::with_data(
            Error::MissingField("new_offset"),
            Payload::Raw(body.to_owned()),
        ));
    };

    let Some(offset) = envelope::offset_of(&data) else {
        return Err(Failure::with_data(
            Error::MissingField("new_offset"),
            Payload::Json(data),
        ));
    };

    let channel = channel.at_offset(offset);
    Ok(CometPoll {
        data,
        next_url: channel.url(),
        channel,
    })
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Session
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CometState {
    Unbootstrapped,
    Holding(CometChannel),
}

/// One comet subscription: bootstrap once, then poll in a loop.
///
/// `poll` takes `&mut self`, so a session can never have two polls in
/// flight. Independent sessions share nothing mutable.
pub struct CometSession {
    id: Uuid,
    comet: CometClient,
    token: Option<TokenPair>,
    state: CometState,
}

impl CometSession {
    pub fn new(comet: CometClient, token: Option<TokenPair>) -> Self {
        Self {
            id: Uuid::new_v4(),
            comet,
            token,
            state: CometState::Unbootstrapped,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn state(&self) -> &CometState {
        &self.state
    }

    pub fn channel(&self) -> Option<&CometChannel> {
        match self.state {
            CometState::Holding(ref channel) => Some(channel),
            CometState::Unbootstrapped => None,
        }
    }

    /// Allocate a channel and hold it.
    ///
    /// On failure the session stays (or becomes) unbootstrapped.
    pub async fn bootstrap(&mut self) -> ApiResult<Bootstrapped> {
        self.state = CometState::Unbootstrapped;
        let boot = self.comet.start_comet(self.token.as_ref()).await?;

        TraceEvent::CometBootstrapped {
            session_id: self.id.to_string(),
            channel_id: boot.channel.channel_id().to_owned(),
        }
        .emit();

        self.state = CometState::Holding(boot.channel.clone());
        Ok(boot)
    }

    /// Poll once. A success advances the held offset; a failure leaves it
    /// where it was so the next poll resumes from the same position.
    pub async fn poll(&mut self) -> ApiResult<CometPoll> {
        let channel = match self.state {
            CometState::Holding(ref channel) => channel.clone(),
            CometState::Unbootstrapped => return Err(Failure::bare(Error::NotBootstrapped)),
        };

        let poll = self.comet.poll_channel(&channel, Some(&self.id)).await?;
        self.state = CometState::Holding(poll.channel.clone());
        Ok(poll)
    }

    /// Drop the held channel; the next `poll` requires a new `bootstrap`.
    pub fn reset(&mut self) {
        self.state = CometState::Unbootstrapped;
    }
}
