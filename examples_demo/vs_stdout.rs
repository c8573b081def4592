use tokio::time::{sleep, Duration};
use tracing::{error, info};

use stackdriver_log_sink::init::{init_tracing_with_config, LayerConfig};
use stackdriver_log_sink::transform::{create_stream, StreamConfig};

/// Prints every event twice: once through the usual console formatter and
/// once as a structured entry line, to compare the two side by side.
#[tokio::main]
async fn main() {
    let config = LayerConfig {
        logger_name: "mylog".to_string(),
        enable_stdout: true,
        ..LayerConfig::default()
    };
    let stream = create_stream(StreamConfig::default());
    init_tracing_with_config(stream.sink, config);

    info!("hola que tal");

    info!(todos = "putos", que = "los", "pario a todos");

    let err = std::io::Error::new(std::io::ErrorKind::Other, "esto esta mal!");
    error!(error = &err as &(dyn std::error::Error + 'static), "request failed");

    sleep(Duration::from_millis(200)).await;
}
