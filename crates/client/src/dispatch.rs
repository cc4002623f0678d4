//! Signed request dispatch.
//!
//! `Dispatcher` resolves an API path, picks the effective token pair, hands
//! the request to the [`OAuthSigner`] and decodes the JSON envelope.

use std::sync::Arc;
use std::time::Instant;

use plurk_domain::error::Error;
use plurk_domain::response::{ApiResult, Failure, Payload};
use plurk_domain::token::TokenPair;
use plurk_domain::trace::TraceEvent;
use serde_json::Value;

use crate::endpoint::Endpoint;
use crate::envelope;
use crate::signer::{OAuthSigner, Params, SignedResponse};

/// Stateless request dispatcher shared by every API call.
///
/// Cloning is cheap; clones share the signer.
#[derive(Clone)]
pub struct Dispatcher {
    endpoint: Endpoint,
    signer: Arc<dyn OAuthSigner>,
    default_token: Option<TokenPair>,
}

impl Dispatcher {
    pub fn new(
        endpoint: Endpoint,
        signer: Arc<dyn OAuthSigner>,
        default_token: Option<TokenPair>,
    ) -> Self {
        Self {
            endpoint,
            signer,
            default_token,
        }
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// Call an API path.
    ///
    /// The token used is `token` when given, else the configured default,
    /// else none (consumer-signed only).
    pub async fn rq(
        &self,
        path: &str,
        params: Option<&Params>,
        token: Option<&TokenPair>,
    ) -> ApiResult<Value> {
        let token = token.or(self.default_token.as_ref());
        self.send(path, token, params).await
    }

    /// Call an API path as an explicit identity, ignoring the configured
    /// default token.
    pub async fn post(
        &self,
        path: &str,
        token: &TokenPair,
        params: Option<&Params>,
    ) -> ApiResult<Value> {
        self.send(path, Some(token), params).await
    }

    async fn send(
        &self,
        path: &str,
        token: Option<&TokenPair>,
        params: Option<&Params>,
    ) -> ApiResult<Value> {
        let url = self.endpoint.resolve(path);
        let start = Instant::now();
        let result = self.signer.signed_post(&url, token, params).await;

        TraceEvent::ApiCall {
            path: url,
            status: result.as_ref().map(|r| r.status).unwrap_or(0),
            duration_ms: start.elapsed().as_millis() as u64,
        }
        .emit();

        decode_response(result)
    }
}

/// Apply the envelope decode policy to a signer outcome.
///
/// * transport failure: surfaced as-is, no data;
/// * non-2xx: `HttpStatus` with the raw body as data, no decoding;
/// * undecodable 2xx body: `Decode`, no data.
pub(crate) fn decode_response(
    result: plurk_domain::error::Result<SignedResponse>,
) -> ApiResult<Value> {
    let resp = result.map_err(Failure::bare)?;

    if !resp.is_success() {
        let body = resp.body;
        return Err(Failure::with_data(
            Error::HttpStatus {
                status: resp.status,
                body: body.clone(),
            },
            Payload::Raw(body),
        ));
    }

    envelope::decode_json(&resp.body).map_err(Failure::bare)
}
