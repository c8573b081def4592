use crate::env::{env_flag, env_or, HOSTNAME_ENV, LOG_SINK_LEVEL_ENV, LOG_SINK_SERVICE_NAME_ENV, LOG_SINK_STDOUT_ENV};
use crate::layer::{RecordOrigin, StackdriverLayer};
use crate::level::LogLevel;
use crate::sink::LogSink;
use crate::transform::{create_stream, StreamConfig};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::Registry;

/// Configuration of the logging layer.
///
/// **Fields**
/// - `minimum_level`: events below this level are not forwarded. `None`
///   forwards everything.
/// - `logger_name`: stamped on every record and used as the service name
///   of entries that carry an error.
/// - `hostname`: stamped on every record (dropped from the emitted entry).
/// - `enable_stdout`: if `true`, a `tracing_subscriber::fmt::Layer` is
///   installed next to the JSON layer so events are also printed in the
///   usual human-readable form.
#[derive(Clone, Debug)]
pub struct LayerConfig {
    pub minimum_level: Option<LogLevel>,
    pub logger_name: String,
    pub hostname: String,
    pub enable_stdout: bool,
}

impl Default for LayerConfig {
    fn default() -> Self {
        Self {
            minimum_level: Some(LogLevel::Info),
            logger_name: "app".to_string(),
            hostname: String::new(),
            enable_stdout: false,
        }
    }
}

impl LayerConfig {
    /// Build a config from `LOG_SINK_*` and `HOSTNAME` environment
    /// variables, falling back to [`LayerConfig::default`] values.
    ///
    /// An unparsable `LOG_SINK_LEVEL` keeps the default threshold.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let minimum_level = std::env::var(LOG_SINK_LEVEL_ENV)
            .ok()
            .and_then(|v| v.parse::<LogLevel>().ok())
            .or(defaults.minimum_level);

        Self {
            minimum_level,
            logger_name: env_or(LOG_SINK_SERVICE_NAME_ENV, &defaults.logger_name),
            hostname: env_or(HOSTNAME_ENV, &defaults.hostname),
            enable_stdout: env_flag(LOG_SINK_STDOUT_ENV),
        }
    }

    fn origin(&self) -> RecordOrigin {
        RecordOrigin::new(self.logger_name.clone()).with_hostname(self.hostname.clone())
    }
}

/// Initialize the global `tracing` subscriber using the provided sink and
/// [`LayerConfig`].
///
/// **Parameters**
/// - `sink`: implementation of [`LogSink`] that will receive the
///   [`LogRecord`](crate::record::LogRecord)s.
/// - `config`: [`LayerConfig`] controlling the threshold and record
///   identity.
///
/// **Returns**
///
/// The handle of the background task that drives the sink.
///
/// Must be called from within a Tokio runtime.
pub fn init_tracing_with_config(sink: Arc<dyn LogSink>, config: LayerConfig) -> JoinHandle<()> {
    let (layer, handle) = StackdriverLayer::new(sink, config.minimum_level, config.origin());

    // Two branches because the subscriber types differ.
    if config.enable_stdout {
        let fmt_layer = tracing_subscriber::fmt::layer();
        let subscriber = Registry::default().with(layer).with(fmt_layer);
        tracing::subscriber::set_global_default(subscriber).expect("set global subscriber");
    } else {
        let subscriber = Registry::default().with(layer);
        tracing::subscriber::set_global_default(subscriber).expect("set global subscriber");
    }

    handle
}

/// Initialize tracing with entry lines written to standard output.
///
/// Equivalent to building a stream with [`create_stream`] over stdout and
/// calling [`init_tracing_with_config`] with [`LayerConfig::from_env`].
pub fn init_tracing() -> JoinHandle<()> {
    let config = LayerConfig::from_env();
    let stream = create_stream(StreamConfig {
        minimum_level: config.minimum_level,
        output: None,
    });
    init_tracing_with_config(stream.sink, config)
}
