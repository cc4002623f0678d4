//! `plurk-domain` — types shared by the Plurk client crates: the error
//! taxonomy, tagged call outcomes, client configuration, OAuth token pairs
//! and structured trace events.

pub mod config;
pub mod error;
pub mod response;
pub mod token;
pub mod trace;

pub use config::{ClientConfig, CometConfig, ConfigError, ConfigSeverity};
pub use error::{Error, ErrorKind, Result};
pub use response::{ApiResult, Failure, Payload};
pub use token::TokenPair;
pub use trace::TraceEvent;
