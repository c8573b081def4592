use async_trait::async_trait;
use std::error::Error;
use std::sync::Arc;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::Mutex;

use crate::entry::map_record;
use crate::error::TransformError;
use crate::level::LogLevel;
use crate::record::LogRecord;
use crate::serialize::to_line;
use crate::sink::LogSink;

/// One unit of input pushed into a [`Transformer`].
#[derive(Debug, Clone)]
pub enum Chunk {
    /// An already structured record.
    Record(LogRecord),
    /// A structured value in the record's JSON line shape.
    Json(serde_json::Value),
    /// Raw text. Always rejected.
    Text(String),
}

impl From<LogRecord> for Chunk {
    fn from(record: LogRecord) -> Self {
        Chunk::Record(record)
    }
}

impl From<serde_json::Value> for Chunk {
    fn from(value: serde_json::Value) -> Self {
        Chunk::Json(value)
    }
}

impl From<String> for Chunk {
    fn from(text: String) -> Self {
        Chunk::Text(text)
    }
}

impl From<&str> for Chunk {
    fn from(text: &str) -> Self {
        Chunk::Text(text.to_string())
    }
}

/// Stream stage that turns records into entry lines on a byte sink.
///
/// Every accepted chunk produces exactly one line; a rejected chunk produces
/// none and leaves the stage ready for the next one. The writer is held
/// behind an async mutex so only one record is written at a time, in call
/// order, and a writer that is not ready suspends the caller.
pub struct Transformer<W> {
    out: Mutex<W>,
}

impl<W> Transformer<W>
where
    W: AsyncWrite + Unpin + Send,
{
    pub fn new(out: W) -> Self {
        Self { out: Mutex::new(out) }
    }

    /// Map, serialize and write one chunk.
    pub async fn transform(&self, chunk: impl Into<Chunk>) -> Result<(), TransformError> {
        let line = match chunk.into() {
            Chunk::Text(_) => return Err(TransformError::Configuration),
            Chunk::Json(value) => to_line(&map_record(&LogRecord::from_json(value)?)),
            Chunk::Record(record) => to_line(&map_record(&record)),
        };

        let mut out = self.out.lock().await;
        out.write_all(line.as_bytes()).await?;
        out.flush().await?;
        Ok(())
    }

    /// Give back the underlying writer.
    pub fn into_inner(self) -> W {
        self.out.into_inner()
    }
}

impl Transformer<tokio::io::Stdout> {
    /// Transformer writing to the process's standard output.
    pub fn stdout() -> Self {
        Self::new(tokio::io::stdout())
    }
}

#[async_trait]
impl<W> LogSink for Transformer<W>
where
    W: AsyncWrite + Unpin + Send,
{
    async fn send(&self, record: &LogRecord) -> Result<(), Box<dyn Error + Send + Sync>> {
        self.transform(record.clone()).await?;
        Ok(())
    }

    async fn flush(&self) -> Result<(), Box<dyn Error + Send + Sync>> {
        self.out.lock().await.flush().await?;
        Ok(())
    }
}

/// Boxed writer accepted by [`StreamConfig`].
pub type BoxWriter = Box<dyn AsyncWrite + Unpin + Send>;

/// Options for [`create_stream`].
#[derive(Default)]
pub struct StreamConfig {
    /// Threshold to hand to the logging front-end. The transformer itself
    /// never filters.
    pub minimum_level: Option<LogLevel>,
    /// Destination for entry lines. Standard output when `None`.
    pub output: Option<BoxWriter>,
}

/// A configured stream: the sink plus the threshold the front-end applies.
pub struct Stream {
    pub minimum_level: Option<LogLevel>,
    pub sink: Arc<dyn LogSink>,
}

/// Build a transformer over the configured output.
pub fn create_stream(config: StreamConfig) -> Stream {
    let out: BoxWriter = config
        .output
        .unwrap_or_else(|| Box::new(tokio::io::stdout()));

    Stream {
        minimum_level: config.minimum_level,
        sink: Arc::new(Transformer::new(out)),
    }
}
