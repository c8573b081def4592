use tokio::io::{AsyncBufReadExt, BufReader};

use stackdriver_log_sink::transform::{Chunk, Transformer};

/// Reads records in their JSON line shape from stdin and writes entry lines
/// to stdout, e.g. `my-service | cargo run --example raw_records`.
///
/// Lines that are not JSON are passed on as text and rejected, which shows
/// the per-record error path.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let transformer = Transformer::stdout();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    while let Some(line) = lines.next_line().await? {
        let chunk = match serde_json::from_str::<serde_json::Value>(&line) {
            Ok(value) => Chunk::Json(value),
            Err(_) => Chunk::Text(line),
        };
        if let Err(e) = transformer.transform(chunk).await {
            eprintln!("skipping record: {}", e);
        }
    }

    Ok(())
}
