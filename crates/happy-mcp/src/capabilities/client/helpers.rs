//! Pure helper functions for inbound message processing.
//!
//! All functions here are used exclusively by `handler.rs`
//! (`handle_inbound_message`, `register_channels_locally`).

#[cfg(test)]
use happy_core::ConnectorCapabilities;
use happy_core::FrontendType;
use serde_json::Value;
use tracing::warn;

/// Maximum length for a custom platform name (128 bytes).
///
/// Platform names that exceed this limit are truncated at a UTF-8 character
/// boundary. Known platform names (discord, telegram, etc.) are never
/// affected since they are matched before the custom fallback.
pub(super) const MAX_PLATFORM_NAME_BYTES: usize = 128;

/// Map a platform name string to a [`FrontendType`].
///
/// Custom platform names are truncated to [`MAX_PLATFORM_NAME_BYTES`].
pub(super) fn map_platform_name(name: &str) -> FrontendType {
    match name.to_lowercase().as_str() {
        "telegram" => FrontendType::Telegram,
        "discord" => FrontendType::Discord,
        "slack" => FrontendType::Slack,
        "whatsapp" => FrontendType::WhatsApp,
        "web" => FrontendType::Web,
        "cli" => FrontendType::Cli,
        other => {
            let truncated = if other.len() > MAX_PLATFORM_NAME_BYTES {
                &other[..other.floor_char_boundary(MAX_PLATFORM_NAME_BYTES)]
            } else {
                other
            };
            FrontendType::Custom(truncated.to_string())
        },
    }
}

/// Parse connector capabilities from a channel definition JSON object.
///
/// Looks for `chatTypes` or `capabilities` arrays in the definition and maps
/// known strings to capability flags. Falls back to `receive_only()`.
///
/// Recognized strings (case-insensitive):
/// - `"receive"`, `"inbound"` → `can_receive`
/// - `"send"`, `"outbound"` → `can_send`
/// - `"chat"` → both `can_receive` and `can_send` (bidirectional)
/// - `"approve"` → `can_approve`
///
/// Other strings and non-string array elements are silently ignored.
/// Fields like `can_elicit`, `supports_rich_media`, `supports_threads`,
/// and `supports_buttons` are not yet parsed from the bridge definition
/// and default to `false`.
#[cfg(test)]
pub(super) fn parse_connector_capabilities(definition: &Value) -> ConnectorCapabilities {
    let caps_array = definition
        .get("capabilities")
        .or_else(|| definition.get("chatTypes"))
        .and_then(Value::as_array);

    let Some(arr) = caps_array else {
        return ConnectorCapabilities::receive_only();
    };

    let lowered: Vec<String> = arr
        .iter()
        .take(64) // cap allocation against adversarial arrays
        .filter_map(Value::as_str)
        .map(str::to_lowercase)
        .collect();
    if lowered.is_empty() {
        return ConnectorCapabilities::receive_only();
    }

    let can_receive = lowered
        .iter()
        .any(|s| s == "receive" || s == "inbound" || s == "chat");
    let can_send = lowered
        .iter()
        .any(|s| s == "send" || s == "outbound" || s == "chat");
    let can_approve = lowered.iter().any(|s| s == "approve");

    // If we parsed something meaningful, build from flags; otherwise receive_only
    if can_receive || can_send || can_approve {
        ConnectorCapabilities {
            can_receive,
            can_send,
            can_approve,
            ..ConnectorCapabilities::default()
        }
    } else {
        ConnectorCapabilities::receive_only()
    }
}

/// Extract `platform_user_id` from an inbound message context JSON, with
/// fallback chain: `context.from.id` → `context.senderId` → `context.userId`
/// → `"unknown"`. Truncated to [`super::notice::MAX_PLATFORM_USER_ID_BYTES`]
/// at a valid UTF-8 character boundary.
pub(super) fn extract_platform_user_id(context: &Value, max_bytes: usize) -> String {
    let raw = context
        .get("from")
        .and_then(|f| f.get("id"))
        .and_then(Value::as_str)
        .or_else(|| context.get("senderId").and_then(Value::as_str))
        .or_else(|| context.get("userId").and_then(Value::as_str))
        .unwrap_or("unknown");

    if raw.len() > max_bytes {
        // Truncate at a valid UTF-8 character boundary to avoid panics
        // on multi-byte characters that straddle the limit.
        let boundary = raw.floor_char_boundary(max_bytes);
        raw[..boundary].to_string()
    } else {
        raw.to_string()
    }
}

/// Extract and validate the `content` field from inbound message params.
///
/// Returns `None` (with a warning) if content is missing, null, empty, or
/// exceeds `max_bytes`. Non-string values are serialized to JSON with a
/// post-serialization size check to guard against escape-amplification attacks.
pub(super) fn extract_inbound_content(params: &Value, max_bytes: usize) -> Option<String> {
    let Some(content_val) = params.get("content").filter(|v| !v.is_null()) else {
        warn!("inboundMessage: missing or null content");
        return None;
    };
    if let Some(s) = content_val.as_str() {
        if s.is_empty() || s.len() > max_bytes {
            warn!("inboundMessage: string content empty or exceeds size limit");
            return None;
        }
        Some(s.to_string())
    } else {
        // Non-string content (objects, arrays) is serialized. Check the
        // expanded size to guard against escape-amplification attacks
        // (e.g. control chars expanding 1 byte → 6 bytes as \uNNNN).
        let serialized = content_val.to_string();
        if serialized.len() > max_bytes {
            warn!("inboundMessage: serialized content exceeds limit after expansion");
            return None;
        }
        Some(serialized)
    }
}

/// Estimate the serialized JSON size of a [`Value`] by walking the parsed tree.
///
/// Counts bytes for keys, string values, structural characters, and numeric
/// representations. **Known limitation:** strings containing JSON-escaped
/// characters (control chars `\x00`–`\x1f`, backslashes, quotes) can expand
/// up to 6× when re-serialized (e.g. `\x00` → `\u0000`). This means the
/// estimate may *undercount* by up to 6× in adversarial payloads.
///
/// # Recursion safety
///
/// This function recurses into nested arrays and objects. Its stack depth is
/// bounded by `serde_json`'s default recursion limit (128 levels), which is
/// applied during parsing.
pub(super) fn estimate_json_size(value: &Value) -> usize {
    match value {
        Value::Null => 4, // "null"
        Value::Bool(b) => {
            if *b { 4 } else { 5 } // "true" / "false"
        },
        Value::Number(n) => {
            // Allocates briefly for digit count; accurate for small numbers.
            n.to_string().len()
        },
        Value::String(s) => {
            // 2 for quotes + string length (ignoring escape expansion)
            s.len().saturating_add(2)
        },
        Value::Array(arr) => {
            // 2 for [] + commas + recursive sizes
            let inner: usize = arr.iter().map(estimate_json_size).sum();
            let commas = arr.len().saturating_sub(1);
            inner.saturating_add(2).saturating_add(commas)
        },
        Value::Object(map) => {
            // 2 for {} + commas + key/value pairs
            let inner: usize = map
                .iter()
                .map(|(k, v)| {
                    // key: 2 quotes + len + colon + value
                    k.len()
                        .saturating_add(3)
                        .saturating_add(estimate_json_size(v))
                })
                .sum();
            let commas = map.len().saturating_sub(1);
            inner.saturating_add(2).saturating_add(commas)
        },
    }
}
