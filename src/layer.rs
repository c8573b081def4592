use crate::http_request::{HttpRequest, HttpRequestInfo};
use crate::level::LogLevel;
use crate::record::{format_timestamp, ErrorInfo, LogRecord};
use crate::sink::LogSink;
use crate::value::FieldValue;
use chrono::Utc;
use std::collections::BTreeMap;
use std::sync::{Arc, atomic::{AtomicU64, Ordering}};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{Event, Subscriber};
use tracing_subscriber::layer::{Context, Layer};
use tracing_subscriber::registry::LookupSpan;

/// Identity stamped on every record the layer produces.
#[derive(Debug, Clone)]
pub struct RecordOrigin {
    /// Logger name; becomes the service name of error entries.
    pub name: String,
    pub hostname: String,
    pub pid: u32,
}

impl RecordOrigin {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            hostname: String::new(),
            pid: std::process::id(),
        }
    }

    pub fn with_hostname(mut self, hostname: impl Into<String>) -> Self {
        self.hostname = hostname.into();
        self
    }
}

/// `tracing_subscriber` layer that turns events into [`LogRecord`]s and
/// forwards them to a [`LogSink`] from a background task.
///
/// Records travel through an unbounded channel, so the application thread
/// never waits on the sink and nothing is dropped. The background task sends
/// one record at a time, in event order, and awaits each send.
pub struct StackdriverLayer {
    sender: mpsc::UnboundedSender<LogRecord>,
    minimum_level: Option<LogLevel>,
    origin: RecordOrigin,
    /// Events that passed the level threshold.
    pub forwarded_events: Arc<AtomicU64>,
    /// Records the sink refused.
    pub failed_events: Arc<AtomicU64>,
}

impl StackdriverLayer {
    /// Create a new layer and spawn the task that drains records into
    /// `sink`.
    ///
    /// Must be called from within a Tokio runtime. The task finishes, after
    /// flushing the sink, once the layer has been dropped and every queued
    /// record has been sent.
    pub fn new(
        sink: Arc<dyn LogSink>,
        minimum_level: Option<LogLevel>,
        origin: RecordOrigin,
    ) -> (Self, JoinHandle<()>) {
        let (tx, mut rx) = mpsc::unbounded_channel::<LogRecord>();

        let forwarded_events = Arc::new(AtomicU64::new(0));
        let failed_events = Arc::new(AtomicU64::new(0));
        let failed_events_bg = Arc::clone(&failed_events);

        let handle = tokio::spawn(async move {
            while let Some(record) = rx.recv().await {
                // Reported on stderr: emitting an event here would loop back
                // into this layer.
                if let Err(e) = sink.send(&record).await {
                    failed_events_bg.fetch_add(1, Ordering::Relaxed);
                    eprintln!("error sending log record: {}", e);
                }
            }
            if let Err(e) = sink.flush().await {
                eprintln!("error flushing log sink: {}", e);
            }
        });

        (Self {
            sender: tx,
            minimum_level,
            origin,
            forwarded_events,
            failed_events,
        }, handle)
    }
}

impl<S> Layer<S> for StackdriverLayer
where
    S: Subscriber + for<'span> LookupSpan<'span>,
{
    fn on_event(&self, event: &Event, _ctx: Context<'_, S>) {
        let meta = event.metadata();
        let level = LogLevel::from(*meta.level());
        if let Some(min) = self.minimum_level {
            if !level.is_at_least(min) {
                return;
            }
        }

        let mut visitor = FieldVisitor::default();
        event.record(&mut visitor);

        let mut fields = visitor.fields;
        fields.insert("target".to_string(), FieldValue::from(meta.target()));
        if let (Some(file), Some(line)) = (meta.file(), meta.line()) {
            let mut src = BTreeMap::new();
            src.insert("file".to_string(), FieldValue::from(file));
            src.insert("line".to_string(), FieldValue::from(u64::from(line)));
            fields.insert("src".to_string(), FieldValue::Object(src));
        }

        let record = LogRecord {
            format_version: 0,
            level,
            name: self.origin.name.clone(),
            hostname: self.origin.hostname.clone(),
            pid: self.origin.pid,
            timestamp: format_timestamp(Utc::now()),
            message: visitor.message.unwrap_or_default(),
            error: visitor.error,
            http_request: visitor.http_request.map(HttpRequest::Info),
            fields,
        };

        self.forwarded_events.fetch_add(1, Ordering::Relaxed);
        if self.sender.send(record).is_err() {
            eprintln!("log sink task has stopped, dropping log record");
        }
    }
}

use tracing::field::{Field, Visit};

/// Collects an event's fields.
///
/// `message` becomes the record message and an `error`/`err` field becomes
/// the record error, whether it was recorded as a `dyn Error` (with its
/// source chain) or as text (`error = %e`). An `http_request` field whose
/// text is an [`HttpRequestInfo`] JSON object becomes the request info.
/// Everything else lands in `fields`.
#[derive(Default)]
pub struct FieldVisitor {
    pub fields: BTreeMap<String, FieldValue>,
    pub message: Option<String>,
    pub error: Option<ErrorInfo>,
    pub http_request: Option<HttpRequestInfo>,
}

impl FieldVisitor {
    fn record_text(&mut self, field: &Field, value: String) {
        match field.name() {
            "message" => self.message = Some(value),
            "error" | "err" => self.error = Some(ErrorInfo::from_text(value)),
            "http_request" => match serde_json::from_str::<HttpRequestInfo>(&value) {
                Ok(req) => self.http_request = Some(req),
                Err(_) => {
                    self.fields.insert(field.name().to_string(), FieldValue::String(value));
                }
            },
            name => {
                self.fields.insert(name.to_string(), FieldValue::String(value));
            }
        }
    }
}

impl Visit for FieldVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        self.record_text(field, value.to_string());
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.fields.insert(field.name().to_string(), FieldValue::from(value));
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.fields.insert(field.name().to_string(), FieldValue::from(value));
    }

    fn record_f64(&mut self, field: &Field, value: f64) {
        self.fields.insert(field.name().to_string(), FieldValue::from(value));
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.fields.insert(field.name().to_string(), FieldValue::from(value));
    }

    fn record_error(&mut self, field: &Field, value: &(dyn std::error::Error + 'static)) {
        match field.name() {
            "error" | "err" => self.error = Some(ErrorInfo::from_error(value)),
            name => {
                self.fields.insert(name.to_string(), FieldValue::String(value.to_string()));
            }
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        self.record_text(field, format!("{:?}", value));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transform::Transformer;
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::Registry;

    async fn capture(minimum_level: Option<LogLevel>, emit: impl FnOnce()) -> Vec<serde_json::Value> {
        let transformer = Arc::new(Transformer::new(Vec::new()));
        let (layer, handle) = StackdriverLayer::new(
            transformer.clone(),
            minimum_level,
            RecordOrigin::new("mylog").with_hostname("h"),
        );

        let subscriber = Registry::default().with(layer);
        tracing::subscriber::with_default(subscriber, emit);
        handle.await.unwrap();

        let out = Arc::try_unwrap(transformer).ok().unwrap().into_inner();
        String::from_utf8(out)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect()
    }

    #[tokio::test]
    async fn events_become_entry_lines_in_order() {
        let lines = capture(None, || {
            tracing::info!("hola que tal");
            tracing::info!(todos = "putos", que = "los", "pario a todos");
        })
        .await;

        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["message"], "hola que tal");
        assert_eq!(lines[0]["severity"], 200);
        assert_eq!(lines[0]["name"], "mylog");
        assert!(lines[0].get("hostname").is_none());
        assert_eq!(lines[1]["message"], "pario a todos");
        assert_eq!(lines[1]["todos"], "putos");
        assert_eq!(lines[1]["que"], "los");
    }

    #[tokio::test]
    async fn error_field_promotes_chain_to_message() {
        let lines = capture(None, || {
            let err = std::io::Error::new(std::io::ErrorKind::Other, "esto esta mal!");
            tracing::error!(error = &err as &(dyn std::error::Error + 'static), "request failed");
        })
        .await;

        assert_eq!(lines[0]["severity"], 500);
        assert_eq!(lines[0]["message"], "Error: esto esta mal!");
        assert_eq!(lines[0]["serviceContext"]["service"], "mylog");
    }

    #[tokio::test]
    async fn events_below_threshold_are_skipped() {
        let lines = capture(Some(LogLevel::Warn), || {
            tracing::debug!("noise");
            tracing::info!("more noise");
            tracing::warn!("careful");
        })
        .await;

        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0]["message"], "careful");
        assert_eq!(lines[0]["severity"], 400);
    }

    #[tokio::test]
    async fn http_request_field_is_attached() {
        let req = HttpRequestInfo::new("GET", "/health", 200, "HTTP/1.1");
        let text = serde_json::to_string(&req).unwrap();
        let lines = capture(None, || {
            tracing::info!(http_request = %text, "served");
        })
        .await;

        assert_eq!(lines[0]["httpRequest"]["requestUrl"], "/health");
        assert!(lines[0].get("http_request").is_none());
    }

    #[tokio::test]
    async fn displayed_error_text_surfaces_as_message() {
        let lines = capture(None, || {
            let err = std::io::Error::new(std::io::ErrorKind::Other, "esto esta mal!");
            tracing::error!(error = %err, "request failed");
            tracing::warn!(err = ?"timeout", "retrying");
        })
        .await;

        assert_eq!(lines[0]["message"], "Error: esto esta mal!");
        assert_eq!(lines[0]["serviceContext"]["service"], "mylog");
        assert_eq!(lines[1]["message"], "Error: \"timeout\"");
        assert!(lines[1].get("err").is_none());
    }

    struct RefusingSink;

    #[async_trait::async_trait]
    impl LogSink for RefusingSink {
        async fn send(&self, _record: &LogRecord) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
            Err("backend unavailable".into())
        }
    }

    #[tokio::test]
    async fn counters_track_forwarded_and_failed_records() {
        let (layer, handle) = StackdriverLayer::new(
            Arc::new(RefusingSink),
            Some(LogLevel::Info),
            RecordOrigin::new("mylog"),
        );
        let forwarded = Arc::clone(&layer.forwarded_events);
        let failed = Arc::clone(&layer.failed_events);

        let subscriber = Registry::default().with(layer);
        tracing::subscriber::with_default(subscriber, || {
            tracing::debug!("filtered out");
            tracing::info!("first");
            tracing::error!("second");
        });
        handle.await.unwrap();

        assert_eq!(forwarded.load(Ordering::Relaxed), 2);
        assert_eq!(failed.load(Ordering::Relaxed), 2);
    }
}
