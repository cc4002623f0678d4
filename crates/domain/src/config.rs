use serde::{Deserialize, Serialize};
use std::fmt;

use crate::token::TokenPair;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Client config
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Connection settings for one Plurk API application.
///
/// The consumer pair identifies the application. The access token pair is
/// optional: when absent, callers supply a [`TokenPair`] per call or make
/// unauthenticated (consumer-signed) requests.
#[derive(Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    #[serde(default = "d_true")]
    pub use_tls: bool,
    #[serde(default)]
    pub consumer_key: String,
    #[serde(default)]
    pub consumer_secret: String,
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub access_token_secret: Option<String>,
    #[serde(default = "d_base_url")]
    pub base_url: String,
    /// Timeout for signed API requests (not the comet channel).
    #[serde(default = "d_30000")]
    pub request_timeout_ms: u64,
    #[serde(default)]
    pub comet: CometConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            use_tls: true,
            consumer_key: String::new(),
            consumer_secret: String::new(),
            access_token: None,
            access_token_secret: None,
            base_url: d_base_url(),
            request_timeout_ms: 30_000,
            comet: CometConfig::default(),
        }
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("use_tls", &self.use_tls)
            .field("consumer_key", &self.consumer_key)
            .field("consumer_secret", &"[REDACTED]")
            .field("access_token", &self.access_token)
            .field(
                "access_token_secret",
                &self.access_token_secret.as_ref().map(|_| "[REDACTED]"),
            )
            .field("base_url", &self.base_url)
            .field("request_timeout_ms", &self.request_timeout_ms)
            .field("comet", &self.comet)
            .finish()
    }
}

impl ClientConfig {
    pub fn new(consumer_key: impl Into<String>, consumer_secret: impl Into<String>) -> Self {
        Self {
            consumer_key: consumer_key.into(),
            consumer_secret: consumer_secret.into(),
            ..Default::default()
        }
    }

    /// Attach a default access token pair used when a call supplies none.
    pub fn with_access_token(mut self, token: impl Into<String>, secret: impl Into<String>) -> Self {
        self.access_token = Some(token.into());
        self.access_token_secret = Some(secret.into());
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// The configured default token pair, if both halves are present.
    pub fn default_token(&self) -> Option<TokenPair> {
        match (&self.access_token, &self.access_token_secret) {
            (Some(token), Some(secret)) => Some(TokenPair::new(token.clone(), secret.clone())),
            _ => None,
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Comet channel
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CometConfig {
    /// A poll fails with a timeout after this long without receiving data.
    #[serde(default = "d_80000")]
    pub inactivity_timeout_ms: u64,
    /// The comet host presents a certificate that does not validate, so
    /// validation is off for the comet transport only.
    #[serde(default = "d_true")]
    pub accept_invalid_certs: bool,
}

impl Default for CometConfig {
    fn default() -> Self {
        Self {
            inactivity_timeout_ms: 80_000,
            accept_invalid_certs: true,
        }
    }
}

// ── serde default helpers ───────────────────────────────────────────

fn d_true() -> bool {
    true
}
fn d_base_url() -> String {
    "https://www.plurk.com/".into()
}
fn d_30000() -> u64 {
    30_000
}
fn d_80000() -> u64 {
    80_000
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Config validation
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Severity level for a configuration issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSeverity {
    Error,
    Warning,
}

/// A single configuration validation issue.
#[derive(Debug, Clone)]
pub struct ConfigError {
    pub severity: ConfigSeverity,
    pub field: String,
    pub message: String,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self.severity {
            ConfigSeverity::Error => "ERROR",
            ConfigSeverity::Warning => "WARN",
        };
        write!(f, "[{tag}] {}: {}", self.field, self.message)
    }
}

impl ClientConfig {
    /// Validate the configuration and return a list of issues.
    ///
    /// Returns an empty vec when everything looks good.
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();

        if self.consumer_key.is_empty() {
            errors.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "consumer_key".into(),
                message: "consumer_key must not be empty".into(),
            });
        }

        if self.consumer_secret.is_empty() {
            errors.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "consumer_secret".into(),
                message: "consumer_secret must not be empty".into(),
            });
        }

        // Both halves of the default token pair, or neither.
        if self.access_token.is_some() != self.access_token_secret.is_some() {
            errors.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "access_token".into(),
                message: "access_token and access_token_secret must be set together".into(),
            });
        }

        match url::Url::parse(&self.base_url) {
            Err(e) => errors.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "base_url".into(),
                message: format!("base_url {:?} is not a valid URL: {e}", self.base_url),
            }),
            Ok(base) if !matches!(base.scheme(), "http" | "https") => errors.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "base_url".into(),
                message: format!("base_url must be an http(s) URL, got {:?}", self.base_url),
            }),
            Ok(base) => {
                if !self.use_tls || base.scheme() == "http" {
                    errors.push(ConfigError {
                        severity: ConfigSeverity::Warning,
                        field: "use_tls".into(),
                        message: "plain HTTP is deprecated; the Plurk API enforces HTTPS".into(),
                    });
                }
            }
        }

        if self.comet.inactivity_timeout_ms == 0 {
            errors.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "comet.inactivity_timeout_ms".into(),
                message: "timeout must be greater than 0".into(),
            });
        }

        errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn complete_config_has_no_issues() {
        let cfg = ClientConfig::new("key", "secret").with_access_token("tok", "sec");
        assert!(cfg.validate().is_empty());
        assert_eq!(cfg.default_token(), Some(TokenPair::new("tok", "sec")));
    }

    #[test]
    fn half_token_pair_is_an_error() {
        let mut cfg = ClientConfig::new("key", "secret");
        cfg.access_token = Some("tok".into());
        let issues = cfg.validate();
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].severity, ConfigSeverity::Error);
        assert_eq!(issues[0].field, "access_token");
        assert!(cfg.default_token().is_none());
    }

    #[test]
    fn plain_http_only_warns() {
        let mut cfg = ClientConfig::new("key", "secret");
        cfg.use_tls = false;
        let issues = cfg.validate();
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].severity, ConfigSeverity::Warning);
    }

    #[test]
    fn base_url_without_host_is_an_error() {
        for base in ["https://", "http://", "www.plurk.com/"] {
            let cfg = ClientConfig::new("key", "secret").with_base_url(base);
            let issues = cfg.validate();
            assert_eq!(issues.len(), 1, "{base}: {issues:?}");
            assert_eq!(issues[0].severity, ConfigSeverity::Error);
            assert_eq!(issues[0].field, "base_url");
        }
    }

    #[test]
    fn debug_redacts_secrets() {
        let cfg = ClientConfig::new("key", "consumer-shh").with_access_token("tok", "token-shh");
        let rendered = format!("{cfg:?}");
        assert!(!rendered.contains("consumer-shh"));
        assert!(!rendered.contains("token-shh"));
        assert!(rendered.contains("[REDACTED]"));
    }
}
