//! Environment variable names used by this crate for convenient
//! configuration of the layer from microservices.
//!
//! These are purely helpers; the core types remain decoupled from
//! environment access.

/// Logger name, reported as the service of error entries.
pub const LOG_SINK_SERVICE_NAME_ENV: &str = "LOG_SINK_SERVICE_NAME";

/// Minimum level name (`trace`, `debug`, `info`, `warn`, `error`, `fatal`).
pub const LOG_SINK_LEVEL_ENV: &str = "LOG_SINK_LEVEL";

/// Set to `1`/`true` to also print events to the console.
pub const LOG_SINK_STDOUT_ENV: &str = "LOG_SINK_STDOUT";

/// Host name stamped on records.
pub const HOSTNAME_ENV: &str = "HOSTNAME";

/// Read an environment variable or fall back to a provided default.
pub fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Read a boolean flag; `1`, `true`, `yes` and `on` count as set.
pub fn env_flag(key: &str) -> bool {
    std::env::var(key)
        .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(false)
}
