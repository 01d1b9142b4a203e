//! Bridge from the layered `happy_config::Config` to the CLI's own ambient
//! concerns (currently just logging setup — identity/credentials resolution
//! is the daemon's job, via `happy_gateway::config_bridge`).

/// Builds a [`happy_telemetry::LogConfig`] from the resolved `[logging]`
/// section, so the CLI's own log formatting follows the same config chain
/// as everything else (workspace → user → environment → CLI flags).
#[must_use]
pub fn to_log_config(config: &happy_config::Config) -> happy_telemetry::LogConfig {
    let format = match config.logging.format.as_str() {
        "json" => happy_telemetry::LogFormat::Json,
        "pretty" | "full" => happy_telemetry::LogFormat::Pretty,
        _ => happy_telemetry::LogFormat::Compact,
    };

    let mut log_config = happy_telemetry::LogConfig::new(config.logging.level.clone()).with_format(format);
    for directive in &config.logging.directives {
        log_config = log_config.with_directive(directive.clone());
    }
    log_config
}
