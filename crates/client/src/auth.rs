//! Three-legged OAuth helpers.
//!
//! 1. [`AuthFlow::request_token`] obtains temporary credentials.
//! 2. The user visits [`AuthFlow::authorize_url`] (or the mobile page) and
//!    approves the application, receiving a verifier.
//! 3. [`AuthFlow::access_token`] trades the request token and verifier for
//!    an access token pair.

use std::sync::Arc;

use plurk_domain::error::Result;
use plurk_domain::token::TokenPair;
use plurk_domain::trace::TraceEvent;

use crate::endpoint::Endpoint;
use crate::signer::OAuthSigner;

const REQUEST_TOKEN_PATH: &str = "OAuth/request_token";
const ACCESS_TOKEN_PATH: &str = "OAuth/access_token";
const AUTHORIZE_PATH: &str = "OAuth/authorize";
const AUTHORIZE_MOBILE_PATH: &str = "m/authorize";

#[derive(Clone)]
pub struct AuthFlow {
    endpoint: Endpoint,
    signer: Arc<dyn OAuthSigner>,
}

impl AuthFlow {
    pub fn new(endpoint: Endpoint, signer: Arc<dyn OAuthSigner>) -> Self {
        Self { endpoint, signer }
    }

    /// Desktop authorization page for a request token.
    pub fn authorize_url(&self, request_token: &str) -> String {
        self.page(AUTHORIZE_PATH, request_token)
    }

    /// Mobile authorization page for a request token.
    pub fn authorize_url_mobile(&self, request_token: &str) -> String {
        self.page(AUTHORIZE_MOBILE_PATH, request_token)
    }

    fn page(&self, path: &str, request_token: &str) -> String {
        format!("{}?oauth_token={request_token}", self.endpoint.page(path))
    }

    /// Obtain a request token. `callback` defaults to out-of-band.
    pub async fn request_token(&self, callback: Option<&str>) -> Result<TokenPair> {
        let url = self.endpoint.page(REQUEST_TOKEN_PATH);
        let result = self.signer.request_token(&url, callback).await;
        TraceEvent::TokenExchange {
            step: "request_token",
            ok: result.is_ok(),
        }
        .emit();
        result
    }

    /// Exchange an authorized request token for an access token.
    pub async fn access_token(&self, request_token: &TokenPair, verifier: &str) -> Result<TokenPair> {
        let url = self.endpoint.page(ACCESS_TOKEN_PATH);
        let result = self.signer.access_token(&url, request_token, verifier).await;
        TraceEvent::TokenExchange {
            step: "access_token",
            ok: result.is_ok(),
        }
        .emit();
        result
    }
}
