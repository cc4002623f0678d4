//! `PlurkClient` — one application's handle on the API.

use std::sync::Arc;
use std::time::Duration;

use plurk_domain::config::{ClientConfig, ConfigSeverity};
use plurk_domain::error::{Error, Result};
use plurk_domain::response::ApiResult;
use plurk_domain::token::TokenPair;
use serde_json::Value;

use crate::auth::AuthFlow;
use crate::comet::{Bootstrapped, CometClient, CometPoll, CometSession};
use crate::dispatch::Dispatcher;
use crate::endpoint::Endpoint;
use crate::signer::{OAuthSigner, Params, ReqwestSigner};
use crate::transport::{CometTransport, ReqwestCometTransport};

/// Facade over the dispatcher, comet channel and authorization flow.
///
/// Cheap to clone; clones share the underlying HTTP clients.
#[derive(Clone)]
pub struct PlurkClient {
    dispatcher: Dispatcher,
    comet: CometClient,
    auth: AuthFlow,
}

impl PlurkClient {
    /// Build a client with the reqwest-backed signer and comet transport.
    pub fn new(cfg: ClientConfig) -> Result<Self> {
        let signer = Arc::new(ReqwestSigner::new(&cfg)?);
        let comet = Arc::new(ReqwestCometTransport::new(&cfg.comet)?);
        Self::with_transports(cfg, signer, comet)
    }

    /// Build a client over caller-supplied signer and comet transport.
    pub fn with_transports(
        cfg: ClientConfig,
        signer: Arc<dyn OAuthSigner>,
        comet: Arc<dyn CometTransport>,
    ) -> Result<Self> {
        let issues = cfg.validate();
        let errors: Vec<String> = issues
            .iter()
            .filter(|i| i.severity == ConfigSeverity::Error)
            .map(ToString::to_string)
            .collect();
        if !errors.is_empty() {
            return Err(Error::Config(errors.join("; ")));
        }

        if !cfg.use_tls {
            tracing::warn!(
                "HTTP for the Plurk API is deprecated; Plurk enforces HTTPS"
            );
        }

        let endpoint = Endpoint::new(&cfg.base_url);
        let dispatcher = Dispatcher::new(endpoint.clone(), signer.clone(), cfg.default_token());
        let comet = CometClient::new(
            dispatcher.clone(),
            comet,
            Duration::from_millis(cfg.comet.inactivity_timeout_ms),
        );
        let auth = AuthFlow::new(endpoint, signer);

        Ok(Self {
            dispatcher,
            comet,
            auth,
        })
    }

    pub fn endpoint(&self) -> &Endpoint {
        self.dispatcher.endpoint()
    }

    /// Resolve an API path to its absolute URL.
    pub fn join(&self, path: &str) -> String {
        self.dispatcher.endpoint().resolve(path)
    }

    // ── API calls ───────────────────────────────────────────────────

    /// Call an API path with the given token, or the configured default.
    pub async fn rq(
        &self,
        path: &str,
        params: Option<&Params>,
        token: Option<&TokenPair>,
    ) -> ApiResult<Value> {
        self.dispatcher.rq(path, params, token).await
    }

    /// Call an API path as an explicit identity.
    pub async fn post(
        &self,
        path: &str,
        token: &TokenPair,
        params: Option<&Params>,
    ) -> ApiResult<Value> {
        self.dispatcher.post(path, token, params).await
    }

    // ── comet ───────────────────────────────────────────────────────

    pub async fn start_comet(&self, token: Option<&TokenPair>) -> ApiResult<Bootstrapped> {
        self.comet.start_comet(token).await
    }

    pub async fn comet(&self, channel_url: &str) -> ApiResult<CometPoll> {
        self.comet.comet(channel_url).await
    }

    /// A new, unbootstrapped comet session for `token` (or the default).
    pub fn comet_session(&self, token: Option<TokenPair>) -> CometSession {
        CometSession::new(self.comet.clone(), token)
    }

    // ── authorization ───────────────────────────────────────────────

    pub fn authorize_url(&self, request_token: &str) -> String {
        self.auth.authorize_url(request_token)
    }

    pub fn authorize_url_mobile(&self, request_token: &str) -> String {
        self.auth.authorize_url_mobile(request_token)
    }

    pub async fn request_token(&self, callback: Option<&str>) -> Result<TokenPair> {
        self.auth.request_token(callback).await
    }

    pub async fn access_token(&self, request_token: &TokenPair, verifier: &str) -> Result<TokenPair> {
        self.auth.access_token(request_token, verifier).await
    }

    /// Alias of [`authorize_url`](Self::authorize_url).
    pub fn auth_page(&self, request_token: &str) -> String {
        self.authorize_url(request_token)
    }

    /// Alias of [`authorize_url_mobile`](Self::authorize_url_mobile).
    pub fn auth_page_mobile(&self, request_token: &str) -> String {
        self.authorize_url_mobile(request_token)
    }

    /// Alias of [`request_token`](Self::request_token).
    pub async fn get_request_token(&self, callback: Option<&str>) -> Result<TokenPair> {
        self.request_token(callback).await
    }

    /// Alias of [`access_token`](Self::access_token).
    pub async fn get_access_token(
        &self,
        request_token: &TokenPair,
        verifier: &str,
    ) -> Result<TokenPair> {
        self.access_token(request_token, verifier).await
    }
}
