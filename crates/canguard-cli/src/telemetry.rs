//! Tracing subscriber initialisation.
//!
//! | Variable | Effect |
//! |---|---|
//! | `RUST_LOG` | Log filter (default `"info"`). |
//! | `CANGUARD_LOG_FORMAT=json` | Emit newline-delimited JSON logs, overriding the config file. |
//!
//! Logs go to stderr so that `replay --json` output on stdout stays machine
//! readable.

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::LogFormat;

/// Resolve the effective format: the env var wins over the config file.
pub fn resolve_format(configured: LogFormat, env_value: Option<&str>) -> LogFormat {
    match env_value {
        Some(v) if v.eq_ignore_ascii_case("json") => LogFormat::Json,
        Some(v) if v.eq_ignore_ascii_case("compact") => LogFormat::Compact,
        _ => configured,
    }
}

/// Install the global subscriber. Call once at process start.
pub fn init_tracing(configured: LogFormat) {
    let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));
    let env_format = std::env::var("CANGUARD_LOG_FORMAT").ok();

    match resolve_format(configured, env_format.as_deref()) {
        LogFormat::Json => tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init(),
        LogFormat::Compact => tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().compact().with_writer(std::io::stderr))
            .init(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_overrides_configured_format() {
        assert_eq!(resolve_format(LogFormat::Compact, Some("json")), LogFormat::Json);
        assert_eq!(resolve_format(LogFormat::Json, Some("COMPACT")), LogFormat::Compact);
    }

    #[test]
    fn unset_or_unknown_env_keeps_config() {
        assert_eq!(resolve_format(LogFormat::Json, None), LogFormat::Json);
        assert_eq!(resolve_format(LogFormat::Compact, Some("pretty")), LogFormat::Compact);
    }
}
