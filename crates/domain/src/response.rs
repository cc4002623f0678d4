//! Tagged call outcomes.
//!
//! Every API call resolves to `Result<T, Failure>`. A [`Failure`] always
//! names exactly one [`Error`], and may still carry whatever data could be
//! salvaged from the response (an HTTP error body that decodes as JSON, the
//! raw body of a failed signed POST, ...).

use serde_json::Value;

use crate::error::{Error, ErrorKind};

/// Best-effort data surfaced alongside a failure.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// The body (or its padded JSON span) decoded successfully.
    Json(Value),
    /// The body could not be decoded, or decoding was never attempted.
    Raw(String),
}

impl Payload {
    pub fn as_json(&self) -> Option<&Value> {
        match self {
            Payload::Json(v) => Some(v),
            Payload::Raw(_) => None,
        }
    }

    pub fn as_raw(&self) -> Option<&str> {
        match self {
            Payload::Json(_) => None,
            Payload::Raw(s) => Some(s),
        }
    }
}

/// A failed call: the error plus any partial data.
#[derive(Debug)]
pub struct Failure {
    pub error: Error,
    pub data: Option<Payload>,
}

impl Failure {
    /// A failure with nothing salvaged.
    pub fn bare(error: Error) -> Self {
        Self { error, data: None }
    }

    pub fn with_data(error: Error, data: Payload) -> Self {
        Self {
            error,
            data: Some(data),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        self.error.kind()
    }

    pub fn json(&self) -> Option<&Value> {
        self.data.as_ref().and_then(Payload::as_json)
    }
}

impl From<Error> for Failure {
    fn from(error: Error) -> Self {
        Failure::bare(error)
    }
}

impl std::fmt::Display for Failure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Display::fmt(&self.error, f)
    }
}

impl std::error::Error for Failure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

/// Outcome of a call that may fail with partial data.
pub type ApiResult<T> = std::result::Result<T, Failure>;
