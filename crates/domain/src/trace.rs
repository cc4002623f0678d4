use serde::Serialize;

/// Structured trace events emitted by the Plurk client crates.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event")]
pub enum TraceEvent {
    ApiCall {
        path: String,
        status: u16,
        duration_ms: u64,
    },
    CometBootstrapped {
        session_id: String,
        channel_id: String,
    },
    CometPoll {
        session_id: Option<String>,
        channel_id: String,
        status: Option<u16>,
        outcome: &'static str,
        duration_ms: u64,
    },
    TokenExchange {
        step: &'static str,
        ok: bool,
    },
}

impl TraceEvent {
    pub fn emit(&self) {
        let json = serde_json::to_string(self).unwrap_or_default();
        tracing::debug!(trace_event = %json, "plurk_event");
    }
}
