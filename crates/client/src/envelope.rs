//! Response body decoding.
//!
//! Signed API calls return plain JSON. The comet channel wraps its JSON in
//! a JavaScript callback (`CometChannel.scriptCallback({...});`), so only
//! the span from the first `{` to the last `}` is decoded.

use plurk_domain::error::{Error, Result};
use serde_json::Value;

/// Decode a plain JSON body.
pub fn decode_json(body: &str) -> Result<Value> {
    serde_json::from_str(body).map_err(|e| Error::Decode(format!("{e}: {body}")))
}

/// The JSON object embedded in a padded body, if there is one.
pub fn extract_padded(body: &str) -> Option<&str> {
    let from = body.find('{')?;
    let to = body.rfind('}')?;
    if to < from {
        return None;
    }
    Some(&body[from..=to])
}

/// Extract and decode the JSON object embedded in a padded body.
pub fn decode_padded(body: &str) -> Option<Value> {
    extract_padded(body).and_then(|json| serde_json::from_str(json).ok())
}

/// The continuation cursor of a comet payload.
///
/// Numbers are rendered as their JSON text and strings verbatim. A null,
/// absent or structured `new_offset` is not a cursor.
pub fn offset_of(value: &Value) -> Option<String> {
    match value.get("new_offset")? {
        Value::Number(n) => Some(n.to_string()),
        Value::String(s) => Some(s.clone()),
        _ => None,
    }
}
