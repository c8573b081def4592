use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

use crate::error::MapError;
use crate::http_request::HttpRequest;
use crate::level::LogLevel;
use crate::value::FieldValue;

/// A log record as produced by the logging front-end, before it is mapped
/// to the platform's entry schema.
#[derive(Debug, Clone)]
pub struct LogRecord {
    /// Record format version. Opaque here.
    pub format_version: u64,
    pub level: LogLevel,
    /// Logger name, usually the service name.
    pub name: String,
    pub hostname: String,
    pub pid: u32,
    /// ISO-8601 time text, passed through to the entry as is.
    pub timestamp: String,
    pub message: String,
    pub error: Option<ErrorInfo>,
    pub http_request: Option<HttpRequest>,
    /// Free-form fields supplied by the logging call.
    pub fields: BTreeMap<String, FieldValue>,
}

/// Error attached to a logging call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorInfo {
    pub name: String,
    pub message: String,
    /// Full trace text; the first line is conventionally `name: message`.
    pub stack: Option<String>,
}

impl ErrorInfo {
    pub fn new(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self { name: name.into(), message: message.into(), stack: None }
    }

    pub fn with_stack(mut self, stack: impl Into<String>) -> Self {
        self.stack = Some(stack.into());
        self
    }

    /// Capture a Rust error together with its `source()` chain.
    ///
    /// The chain is rendered as the stack text, one cause per line.
    pub fn from_error(err: &(dyn std::error::Error + 'static)) -> Self {
        let message = err.to_string();
        let mut stack = format!("Error: {message}");
        let mut source = err.source();
        while let Some(cause) = source {
            stack.push_str("\n    caused by: ");
            stack.push_str(&cause.to_string());
            source = cause.source();
        }
        Self { name: "Error".to_string(), message, stack: Some(stack) }
    }

    /// Error known only by its rendered text, as in `error = %e`.
    ///
    /// The text stands in for the stack so it still surfaces as the message.
    pub fn from_text(text: impl Into<String>) -> Self {
        let message = text.into();
        let stack = format!("Error: {message}");
        Self { name: "Error".to_string(), message, stack: Some(stack) }
    }

    /// Stack text if there is any usable one.
    pub fn usable_stack(&self) -> Option<&str> {
        self.stack.as_deref().filter(|s| !s.is_empty())
    }
}

impl LogRecord {
    /// New record stamped with the current time and process id.
    pub fn new(level: LogLevel, name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            format_version: 0,
            level,
            name: name.into(),
            hostname: String::new(),
            pid: std::process::id(),
            timestamp: format_timestamp(Utc::now()),
            message: message.into(),
            error: None,
            http_request: None,
            fields: BTreeMap::new(),
        }
    }

    pub fn with_hostname(mut self, hostname: impl Into<String>) -> Self {
        self.hostname = hostname.into();
        self
    }

    pub fn with_pid(mut self, pid: u32) -> Self {
        self.pid = pid;
        self
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = format_timestamp(timestamp);
        self
    }

    pub fn with_error(mut self, error: ErrorInfo) -> Self {
        self.error = Some(error);
        self
    }

    pub fn with_http_request(mut self, req: impl Into<HttpRequest>) -> Self {
        self.http_request = Some(req.into());
        self
    }

    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    /// Read a record from its JSON line shape
    /// (`v`, `level`, `name`, `hostname`, `pid`, `time`, `msg`, `err`, `req`
    /// plus any other keys as free-form fields).
    ///
    /// Only `level` and `msg` can reject a record. `v`, `hostname` and `pid`
    /// never reach the entry, so an unusable value falls back to its default.
    /// `time` and `req` are kept as written; a non-string `name` or `time` is
    /// kept as its JSON text.
    pub fn from_json(value: Value) -> Result<Self, MapError> {
        let mut obj = match value {
            Value::Object(obj) => obj,
            other => return Err(MapError::NotAnObject(json_kind(&other))),
        };

        let level = match obj.remove("level") {
            Some(Value::Number(n)) => {
                let n = n.as_u64().ok_or_else(|| invalid("level", "not a positive integer"))?;
                LogLevel::try_from(n)?
            }
            Some(other) => return Err(invalid("level", format!("expected number, got {}", json_kind(&other)))),
            None => return Err(MapError::MissingField("level")),
        };

        let message = match obj.remove("msg") {
            Some(Value::String(s)) => s,
            Some(other) => return Err(invalid("msg", format!("expected string, got {}", json_kind(&other)))),
            None => return Err(MapError::MissingField("msg")),
        };

        let format_version = lenient_u64(&mut obj, "v").unwrap_or(0);
        let hostname = match obj.remove("hostname") {
            Some(Value::String(s)) => s,
            _ => String::new(),
        };
        let pid = lenient_u64(&mut obj, "pid")
            .and_then(|pid| u32::try_from(pid).ok())
            .unwrap_or(0);
        let name = text_or_json(&mut obj, "name").unwrap_or_default();
        let timestamp = text_or_json(&mut obj, "time")
            .unwrap_or_else(|| format_timestamp(Utc::now()));

        let error = match obj.remove("err") {
            None | Some(Value::Null) => None,
            Some(value) => Some(error_from_json(value)),
        };

        let http_request = match obj.remove("req") {
            None | Some(Value::Null) => None,
            Some(value) => Some(HttpRequest::Raw(value)),
        };

        let fields = obj
            .into_iter()
            .map(|(k, v)| (k, FieldValue::from(v)))
            .collect();

        Ok(Self {
            format_version,
            level,
            name,
            hostname,
            pid,
            timestamp,
            message,
            error,
            http_request,
            fields,
        })
    }
}

impl TryFrom<Value> for LogRecord {
    type Error = MapError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        LogRecord::from_json(value)
    }
}

// Anything that is not an object is kept as an error without a stack, so it
// never replaces the message.
fn error_from_json(value: Value) -> ErrorInfo {
    match value {
        Value::Object(mut obj) => {
            let text = |v: Option<Value>| match v {
                Some(Value::String(s)) => Some(s),
                _ => None,
            };
            ErrorInfo {
                name: text(obj.remove("name")).unwrap_or_else(|| "Error".to_string()),
                message: text(obj.remove("message")).unwrap_or_default(),
                stack: text(obj.remove("stack")),
            }
        }
        Value::String(s) => ErrorInfo::new("Error", s),
        other => ErrorInfo::new("Error", other.to_string()),
    }
}

/// Render a time the way the JSON line shape carries it
/// (milliseconds, `Z` suffix).
pub fn format_timestamp(timestamp: DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn text_or_json(obj: &mut Map<String, Value>, field: &str) -> Option<String> {
    match obj.remove(field) {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s),
        Some(other) => Some(other.to_string()),
    }
}

fn lenient_u64(obj: &mut Map<String, Value>, field: &str) -> Option<u64> {
    obj.remove(field).and_then(|v| v.as_u64())
}

fn invalid(field: &'static str, reason: impl Into<String>) -> MapError {
    MapError::InvalidField { field, reason: reason.into() }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn reads_json_line_shape() {
        let record = LogRecord::from_json(json!({
            "v": 0,
            "level": 30,
            "name": "mylog",
            "hostname": "h",
            "pid": 1,
            "time": "2024-05-01T10:00:00.000Z",
            "msg": "pario a todos",
            "todos": "putos",
        }))
        .unwrap();

        assert_eq!(record.level, LogLevel::Info);
        assert_eq!(record.name, "mylog");
        assert_eq!(record.pid, 1);
        assert_eq!(record.message, "pario a todos");
        assert_eq!(record.fields.get("todos"), Some(&FieldValue::from("putos")));
        assert!(!record.fields.contains_key("msg"));
        assert!(record.error.is_none());
    }

    #[test]
    fn discarded_fields_never_reject_a_record() {
        let record = LogRecord::from_json(json!({
            "level": 30,
            "msg": "hola que tal",
            "v": "zero",
            "hostname": 17,
            "pid": -1,
            "time": "T",
        }))
        .unwrap();

        assert_eq!(record.format_version, 0);
        assert_eq!(record.hostname, "");
        assert_eq!(record.pid, 0);
        assert_eq!(record.timestamp, "T");
    }

    #[test]
    fn time_and_request_are_kept_as_written() {
        let req = json!({"method": "GET", "url": "/", "headers": {}, "custom": "kept"});
        let record = LogRecord::from_json(json!({
            "level": 30,
            "msg": "x",
            "time": "2024-05-01T12:00:00.123456+02:00",
            "req": req.clone(),
        }))
        .unwrap();

        assert_eq!(record.timestamp, "2024-05-01T12:00:00.123456+02:00");
        assert_eq!(record.http_request, Some(HttpRequest::Raw(req)));
    }

    #[test]
    fn rejects_non_objects_and_bad_levels() {
        assert!(matches!(LogRecord::from_json(json!("text")), Err(MapError::NotAnObject("string"))));
        assert!(matches!(
            LogRecord::from_json(json!({"msg": "x"})),
            Err(MapError::MissingField("level"))
        ));
        assert!(matches!(
            LogRecord::from_json(json!({"level": 35, "msg": "x"})),
            Err(MapError::UnknownLevel(_))
        ));
        assert!(matches!(
            LogRecord::from_json(json!({"level": 30, "msg": 5})),
            Err(MapError::InvalidField { field: "msg", .. })
        ));
    }

    #[test]
    fn error_stack_is_only_taken_from_strings() {
        let record = LogRecord::from_json(json!({
            "level": 50, "msg": "x", "err": {"message": "boom", "stack": 12}
        }))
        .unwrap();
        let err = record.error.unwrap();
        assert_eq!(err.message, "boom");
        assert_eq!(err.stack, None);
    }

    #[test]
    fn error_chain_becomes_stack_text() {
        #[derive(Debug, thiserror::Error)]
        #[error("outer failure")]
        struct Outer(#[source] std::io::Error);

        let err = Outer(std::io::Error::new(std::io::ErrorKind::Other, "disk gone"));
        let info = ErrorInfo::from_error(&err);

        assert_eq!(info.message, "outer failure");
        assert_eq!(
            info.usable_stack(),
            Some("Error: outer failure\n    caused by: disk gone")
        );
    }

    #[test]
    fn empty_stack_is_not_usable() {
        let info = ErrorInfo::new("Error", "x").with_stack("");
        assert_eq!(info.usable_stack(), None);
    }
}
