/// Shared error type used across the Plurk client crates.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("transport: {0}")]
    Transport(String),

    #[error("timeout: {0}")]
    Timeout(String),

    #[error("decode: {0}")]
    Decode(String),

    #[error("missing {0}")]
    MissingField(&'static str),

    #[error("HTTP {status}: {body}")]
    HttpStatus { status: u16, body: String },

    #[error("invalid comet channel URL: {0}")]
    InvalidChannelUrl(String),

    #[error("comet session has not been bootstrapped")]
    NotBootstrapped,

    #[error("config: {0}")]
    Config(String),

    #[error("auth: {0}")]
    Auth(String),
}

/// The protocol-level failure categories callers branch on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    TransportError,
    Timeout,
    DecodeError,
    MissingField,
    HttpStatusError,
    Other,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Transport(_) => ErrorKind::TransportError,
            Error::Timeout(_) => ErrorKind::Timeout,
            Error::Decode(_) => ErrorKind::DecodeError,
            Error::MissingField(_) => ErrorKind::MissingField,
            Error::HttpStatus { .. } => ErrorKind::HttpStatusError,
            Error::InvalidChannelUrl(_)
            | Error::NotBootstrapped
            | Error::Config(_)
            | Error::Auth(_) => ErrorKind::Other,
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Decode(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
