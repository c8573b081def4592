use tokio::time::{sleep, Duration};
use tracing::{error, info};

use stackdriver_log_sink::init::{init_tracing_with_config, LayerConfig};
use stackdriver_log_sink::transform::{create_stream, StreamConfig};

#[derive(Debug, thiserror::Error)]
#[error("esto esta mal!")]
struct Bad;

#[tokio::main]
async fn main() {
    let config = LayerConfig {
        logger_name: "mylog".to_string(),
        ..LayerConfig::default()
    };
    let stream = create_stream(StreamConfig::default());
    init_tracing_with_config(stream.sink, config);

    info!("hola que tal");

    info!(todos = "putos", que = "los", "pario a todos");

    error!(error = &Bad as &(dyn std::error::Error + 'static), "request failed");

    // Give the background task time to write the lines.
    sleep(Duration::from_millis(200)).await;
}
