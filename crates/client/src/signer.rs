//! OAuth 1.0a signing capability.
//!
//! [`OAuthSigner`] is the seam between the dispatcher and whatever signs and
//! sends requests. [`ReqwestSigner`] is the production implementation: it
//! signs with HMAC-SHA1 via `reqwest-oauth1` and sends with a pooled
//! `reqwest::Client`.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use plurk_domain::config::ClientConfig;
use plurk_domain::error::{Error, Result};
use plurk_domain::token::TokenPair;
use reqwest::Client;
use reqwest_oauth1::{OAuthClientProvider, Secrets};

use crate::transport::from_reqwest;

/// Form parameters of a signed API call.
pub type Params = HashMap<String, String>;

/// Status and raw body of a signed request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedResponse {
    pub status: u16,
    pub body: String,
}

impl SignedResponse {
    pub fn is_success(&self) -> bool {
        (200..=299).contains(&self.status)
    }
}

/// Signs and sends OAuth 1.0a requests on behalf of one consumer.
#[async_trait]
pub trait OAuthSigner: Send + Sync {
    /// Send a signed, form-encoded POST. `token = None` signs with the
    /// consumer credentials only.
    async fn signed_post(
        &self,
        url: &str,
        token: Option<&TokenPair>,
        params: Option<&Params>,
    ) -> Result<SignedResponse>;

    /// Obtain temporary credentials (a request token).
    async fn request_token(&self, url: &str, callback: Option<&str>) -> Result<TokenPair>;

    /// Exchange an authorized request token and its verifier for an access
    /// token.
    async fn access_token(
        &self,
        url: &str,
        request_token: &TokenPair,
        verifier: &str,
    ) -> Result<TokenPair>;
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// reqwest-backed signer
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// HMAC-SHA1 signer over a shared `reqwest::Client`.
///
/// The request timeout is enforced around each exchange (send and body
/// read) so an elapsed bound always surfaces as `Error::Timeout`.
#[derive(Clone)]
pub struct ReqwestSigner {
    http: Client,
    consumer_key: String,
    consumer_secret: String,
    timeout: Duration,
}

impl std::fmt::Debug for ReqwestSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReqwestSigner")
            .field("consumer_key", &self.consumer_key)
            .field("consumer_secret", &"[REDACTED]")
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl ReqwestSigner {
    pub fn new(cfg: &ClientConfig) -> Result<Self> {
        let http = Client::builder()
            .build()
            .map_err(|e| Error::Config(format!("HTTP client build failed: {e}")))?;

        Ok(Self {
            http,
            consumer_key: cfg.consumer_key.clone(),
            consumer_secret: cfg.consumer_secret.clone(),
            timeout: Duration::from_millis(cfg.request_timeout_ms),
        })
    }

    fn secrets<'a>(&'a self, token: Option<&'a TokenPair>) -> Secrets<'a> {
        let secrets = Secrets::new(self.consumer_key.as_str(), self.consumer_secret.as_str());
        match token {
            Some(t) => secrets.token(t.token.as_str(), t.secret.as_str()),
            None => secrets,
        }
    }

    /// Sign and send a form-encoded POST, returning status and raw body.
    async fn exchange(
        &self,
        url: &str,
        token: Option<&TokenPair>,
        form: Vec<(&str, &str)>,
    ) -> Result<SignedResponse> {
        let mut rb = self.http.clone().oauth1(self.secrets(token)).post(url);
        if !form.is_empty() {
            rb = rb.form(&form);
        }

        let timed_out = || {
            Error::Timeout(format!(
                "{url}: no response within {}ms",
                self.timeout.as_millis()
            ))
        };

        let resp = tokio::time::timeout(self.timeout, rb.send())
            .await
            .map_err(|_| timed_out())?
            .map_err(|e| Error::Transport(e.to_string()))?;
        let status = resp.status().as_u16();
        let body = tokio::time::timeout(self.timeout, resp.text())
            .await
            .map_err(|_| timed_out())?
            .map_err(from_reqwest)?;

        Ok(SignedResponse { status, body })
    }

    /// Run one leg of the token handshake and read the returned pair.
    async fn token_exchange(
        &self,
        step: &str,
        url: &str,
        token: Option<&TokenPair>,
        form: Vec<(&str, &str)>,
    ) -> Result<TokenPair> {
        let resp = self.exchange(url, token, form).await?;
        if !resp.is_success() {
            return Err(Error::Auth(format!(
                "{step} returned {}: {}",
                resp.status, resp.body
            )));
        }
        parse_token_response(&resp.body).map_err(|e| match e {
            Error::Auth(msg) => Error::Auth(format!("{step}: {msg}")),
            other => other,
        })
    }
}

#[async_trait]
impl OAuthSigner for ReqwestSigner {
    async fn signed_post(
        &self,
        url: &str,
        token: Option<&TokenPair>,
        params: Option<&Params>,
    ) -> Result<SignedResponse> {
        let form: Vec<(&str, &str)> = params
            .map(|p| p.iter().map(|(k, v)| (k.as_str(), v.as_str())).collect())
            .unwrap_or_default();
        self.exchange(url, token, form).await
    }

    async fn request_token(&self, url: &str, callback: Option<&str>) -> Result<TokenPair> {
        let callback = callback.unwrap_or("oob");
        self.token_exchange("request token", url, None, vec![("oauth_callback", callback)])
            .await
    }

    async fn access_token(
        &self,
        url: &str,
        request_token: &TokenPair,
        verifier: &str,
    ) -> Result<TokenPair> {
        self.token_exchange(
            "access token",
            url,
            Some(request_token),
            vec![("oauth_verifier", verifier)],
        )
        .await
    }
}

/// Read `oauth_token` / `oauth_token_secret` from a form-encoded token
/// response.
pub fn parse_token_response(body: &str) -> Result<TokenPair> {
    let mut token = None;
    let mut secret = None;
    for (key, value) in url::form_urlencoded::parse(body.trim().as_bytes()) {
        match key.as_ref() {
            "oauth_token" => token = Some(value.into_owned()),
            "oauth_token_secret" => secret = Some(value.into_owned()),
            _ => {}
        }
    }

    match (token, secret) {
        (Some(token), Some(secret)) if !token.is_empty() => Ok(TokenPair::new(token, secret)),
        _ => Err(Error::Auth(format!(
            "token response lacks oauth_token/oauth_token_secret: {body}"
        ))),
    }
}
