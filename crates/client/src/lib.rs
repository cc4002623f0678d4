//! `plurk-client` — Plurk API client.
//!
//! Provides signed (OAuth 1.0a) API dispatch, the comet long-polling
//! channel, and helpers for the three-legged authorization flow.
//!
//! # Quick start
//!
//! ```rust,no_run
//! use plurk_client::PlurkClient;
//! use plurk_domain::config::ClientConfig;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let cfg = ClientConfig::new("consumer-key", "consumer-secret")
//!     .with_access_token("access-token", "access-secret");
//! let client = PlurkClient::new(cfg)?;
//!
//! let me = client.rq("Users/me", None, None).await?;
//! println!("hello {}", me["display_name"]);
//!
//! let mut session = client.comet_session(None);
//! session.bootstrap().await?;
//! loop {
//!     match session.poll().await {
//!         Ok(poll) => println!("events: {}", poll.data["data"]),
//!         Err(failure) => eprintln!("poll failed: {failure}"),
//!     }
//! }
//! # }
//! ```
//!
//! Every call returns `Result<T, Failure>`; a [`Failure`] names one error
//! and may carry partial data (for example the decoded JSON of an HTTP 500
//! body).

pub mod auth;
pub mod client;
pub mod comet;
pub mod dispatch;
pub mod endpoint;
pub mod envelope;
pub mod signer;
pub mod transport;

#[cfg(test)]
mod test_support;

// ── Re-exports for ergonomic imports ─────────────────────────────────

pub use auth::AuthFlow;
pub use client::PlurkClient;
pub use comet::{Bootstrapped, CometChannel, CometClient, CometPoll, CometSession, CometState};
pub use dispatch::Dispatcher;
pub use endpoint::Endpoint;
pub use signer::{OAuthSigner, Params, ReqwestSigner, SignedResponse};
pub use transport::{from_reqwest, CometBody, CometTransport, ReqwestCometTransport};

pub use plurk_domain::{ApiResult, Error, ErrorKind, Failure, Payload, TokenPair};
