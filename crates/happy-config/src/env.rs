//! Environment variable fallback and `${VAR}` reference resolution.
//!
//! Env vars are **fallback**, not override: they are only applied to fields
//! that no config file layer set.

use std::collections::HashMap;
use std::fmt::Write as _;

use tracing::debug;

use crate::merge::{ConfigLayer, FieldSources};

/// Mapping from environment variable name to config field path.
struct EnvMapping {
    var_name: &'static str,
    field_path: &'static str,
}

/// All supported `HAPPY_*` and per-flavor env var mappings.
const ENV_MAPPINGS: &[EnvMapping] = &[
    EnvMapping {
        var_name: "HAPPY_MODEL_PROVIDER",
        field_path: "model.provider",
    },
    EnvMapping {
        var_name: "HAPPY_MODEL_API_KEY",
        field_path: "model.api_key",
    },
    EnvMapping {
        var_name: "HAPPY_MODEL_API_URL",
        field_path: "model.api_url",
    },
    EnvMapping {
        var_name: "HAPPY_MODEL",
        field_path: "model.model",
    },
    EnvMapping {
        var_name: "HAPPY_LOG_LEVEL",
        field_path: "logging.level",
    },
    EnvMapping {
        var_name: "HAPPY_BUDGET_SESSION_MAX_USD",
        field_path: "budget.session_max_usd",
    },
    EnvMapping {
        var_name: "HAPPY_BUDGET_PER_ACTION_MAX_USD",
        field_path: "budget.per_action_max_usd",
    },
    EnvMapping {
        var_name: "HAPPY_WORKSPACE_MODE",
        field_path: "workspace.mode",
    },
    // Retry settings.
    EnvMapping {
        var_name: "HAPPY_RETRY_RELAY_MAX_ATTEMPTS",
        field_path: "retry.relay_max_attempts",
    },
    EnvMapping {
        var_name: "HAPPY_RETRY_MCP_MAX_ATTEMPTS",
        field_path: "retry.mcp_max_attempts",
    },
    // Gateway / daemon settings.
    EnvMapping {
        var_name: "HAPPY_SERVER_URL",
        field_path: "gateway.server_url",
    },
    // Per-flavor default model, matching the CLI's own precedence.
    EnvMapping {
        var_name: "ANTHROPIC_MODEL",
        field_path: "model.model",
    },
    EnvMapping {
        var_name: "ANTHROPIC_API_KEY",
        field_path: "model.api_key",
    },
    EnvMapping {
        var_name: "OPENAI_MODEL",
        field_path: "model.model",
    },
    EnvMapping {
        var_name: "OPENAI_API_KEY",
        field_path: "model.api_key",
    },
    EnvMapping {
        var_name: "GEMINI_MODEL",
        field_path: "model.model",
    },
];

/// Apply environment variable fallbacks to fields that were **not** set by
/// any config file layer.
///
/// Returns the number of env vars applied.
pub fn apply_env_fallbacks<S: ::std::hash::BuildHasher>(
    merged: &mut toml::Value,
    sources: &mut FieldSources,
    env_vars: &HashMap<String, String, S>,
) -> usize {
    let mut count: usize = 0;

    for mapping in ENV_MAPPINGS {
        // Only apply if no config file set this field.
        if sources.contains_key(mapping.field_path) {
            continue;
        }

        if let Some(val) = env_vars.get(mapping.var_name) {
            debug!(
                var = mapping.var_name,
                field = mapping.field_path,
                "applying env var fallback"
            );

            set_field_from_string(merged, mapping.field_path, val);
            sources.insert(mapping.field_path.to_owned(), ConfigLayer::Environment);
            count = count.saturating_add(1);
        }
    }

    count
}

/// Resolve `${VAR}` references in the workspace layer, restricted to only
/// `HAPPY_*` and `ANTHROPIC_*`/`OPENAI_*`/`GEMINI_*` prefixed environment
/// variables.
///
/// This prevents a malicious workspace config from exfiltrating sensitive
/// env vars like `${AWS_SECRET_ACCESS_KEY}` into fields relayed to a remote
/// client.
pub fn resolve_env_references_restricted<S: ::std::hash::BuildHasher>(
    val: &mut toml::Value,
    env_vars: &HashMap<String, String, S>,
) {
    let restricted: HashMap<String, String> = env_vars
        .iter()
        .filter(|(k, _)| {
            k.starts_with("HAPPY_")
                || k.starts_with("ANTHROPIC_")
                || k.starts_with("OPENAI_")
                || k.starts_with("GEMINI_")
        })
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();
    resolve_env_references(val, &restricted);
}

/// Resolve `${VAR}` references within string values in the config tree.
///
/// Only string values are processed. References that don't resolve are left
/// as-is (with a warning logged).
pub fn resolve_env_references<S: ::std::hash::BuildHasher>(
    val: &mut toml::Value,
    env_vars: &HashMap<String, String, S>,
) {
    match val {
        toml::Value::String(s) => {
            *s = resolve_string_refs(s, env_vars);
        },
        toml::Value::Table(table) => {
            let keys: Vec<String> = table.keys().cloned().collect();
            for key in keys {
                if let Some(child) = table.get_mut(&key) {
                    resolve_env_references(child, env_vars);
                }
            }
        },
        toml::Value::Array(arr) => {
            for child in arr.iter_mut() {
                resolve_env_references(child, env_vars);
            }
        },
        _ => {},
    }
}

/// Replace `${VAR}` references in a string with their env var values.
fn resolve_string_refs<S: ::std::hash::BuildHasher>(
    input: &str,
    env_vars: &HashMap<String, String, S>,
) -> String {
    let mut result = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && chars.peek() == Some(&'{') {
            chars.next(); // consume '{'
            let mut var_name = String::new();
            let mut closed = false;

            for ch in chars.by_ref() {
                if ch == '}' {
                    closed = true;
                    break;
                }
                var_name.push(ch);
            }

            if closed && !var_name.is_empty() {
                if let Some(val) = env_vars.get(&var_name) {
                    result.push_str(val);
                } else {
                    debug!(var = var_name, "unresolved env var reference in config");
                    // Leave the reference as-is.
                    let _ = write!(result, "${{{var_name}}}");
                }
            } else {
                // Malformed reference, leave as-is.
                result.push('$');
                result.push('{');
                result.push_str(&var_name);
            }
        } else {
            result.push(ch);
        }
    }

    result
}

/// Set a field in the TOML tree from a string value. Handles type coercion
/// for known numeric and boolean fields.
fn set_field_from_string(root: &mut toml::Value, path: &str, val: &str) {
    let segments: Vec<&str> = path.split('.').collect();

    // Determine the toml::Value to insert based on the field type.
    let toml_val = coerce_to_toml_value(path, val);

    // Navigate to the parent and insert.
    let mut current = root;
    // Safety: segments is non-empty (path contains at least one segment)
    #[allow(clippy::arithmetic_side_effects)]
    let parent_segments = &segments[..segments.len() - 1];
    for segment in parent_segments {
        if !current.as_table().is_some_and(|t| t.contains_key(*segment)) {
            // Create intermediate table.
            if let Some(table) = current.as_table_mut() {
                table.insert(
                    (*segment).to_owned(),
                    toml::Value::Table(toml::map::Map::new()),
                );
            }
        }
        current = current
            .as_table_mut()
            .and_then(|t| t.get_mut(*segment))
            .expect("just created intermediate table");
    }

    if let Some(table) = current.as_table_mut() {
        // Safety: segments is non-empty (path contains at least one segment)
        #[allow(clippy::arithmetic_side_effects)]
        let leaf = segments[segments.len() - 1];
        table.insert(leaf.to_owned(), toml_val);
    }
}

/// Attempt to coerce a string env var value to the appropriate TOML type
/// based on the field path.
fn coerce_to_toml_value(path: &str, val: &str) -> toml::Value {
    // Known float fields.
    if matches!(
        path,
        "budget.session_max_usd"
            | "budget.per_action_max_usd"
            | "model.pricing.input_per_million"
            | "model.pricing.output_per_million"
            | "model.temperature"
    ) && let Ok(f) = val.parse::<f64>()
    {
        return toml::Value::Float(f);
    }

    // Known integer fields.
    if matches!(
        path,
        "model.max_tokens"
            | "security.approval_timeout_secs"
            | "security.policy.max_argument_size"
            | "budget.warn_at_percent"
            | "rate_limits.elicitation_per_server_per_min"
            | "rate_limits.max_pending_requests"
            | "retry.relay_max_attempts"
            | "retry.mcp_max_attempts"
    ) && let Ok(i) = val.parse::<i64>()
    {
        return toml::Value::Integer(i);
    }

    // Known boolean fields.
    if matches!(
        path,
        "security.require_signatures"
            | "security.policy.require_approval_for_delete"
            | "security.policy.require_approval_for_network"
            | "gateway.hot_reload"
    ) && let Ok(b) = val.parse::<bool>()
    {
        return toml::Value::Boolean(b);
    }

    // Default: string.
    toml::Value::String(val.to_owned())
}

/// Collect all current environment variables into a map.
#[must_use]
pub fn collect_env_vars() -> HashMap<String, String> {
    std::env::vars().collect()
}
