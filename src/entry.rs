use serde::Serialize;
use std::collections::BTreeMap;

use crate::http_request::HttpRequest;
use crate::level::Severity;
use crate::record::LogRecord;
use crate::value::FieldValue;

/// Record field names that never reach the entry as free-form fields,
/// including the upstream wire spellings.
pub const RESERVED_FIELDS: &[&str] = &[
    "message",
    "msg",
    "severityLevel",
    "level",
    "error",
    "err",
    "httpRequest",
    "req",
    "formatVersion",
    "v",
    "hostname",
    "processId",
    "pid",
];

/// Keys the entry itself owns. A free-form field with one of these names is
/// dropped so it cannot shadow the canonical value.
pub const ENTRY_KEYS: &[&str] = &["severity", "message", "httpRequest", "serviceContext", "name", "time"];

/// One entry in the logging platform's structured schema.
#[derive(Debug, Clone, PartialEq)]
pub struct LogEntry {
    pub severity: Severity,
    pub message: String,
    pub http_request: Option<HttpRequest>,
    pub service_context: Option<ServiceContext>,
    /// Passthrough fields, written at the top level of the entry.
    pub extra: BTreeMap<String, FieldValue>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServiceContext {
    pub service: String,
}

/// Map a record to an entry.
///
/// The error's stack text replaces the message, and the logger name becomes
/// the service context, only when the error carries a non-empty stack.
pub fn map_record(record: &LogRecord) -> LogEntry {
    let mut extra: BTreeMap<String, FieldValue> = record
        .fields
        .iter()
        .filter(|(key, _)| !RESERVED_FIELDS.contains(&key.as_str()))
        .filter(|(key, _)| !ENTRY_KEYS.contains(&key.as_str()))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect();

    extra.insert("name".to_string(), FieldValue::String(record.name.clone()));
    extra.insert("time".to_string(), FieldValue::String(record.timestamp.clone()));

    let mut entry = LogEntry {
        severity: record.level.severity(),
        message: record.message.clone(),
        http_request: None,
        service_context: None,
        extra,
    };

    if let Some(stack) = record.error.as_ref().and_then(|e| e.usable_stack()) {
        entry.message = stack.to_string();
        entry.service_context = Some(ServiceContext { service: record.name.clone() });
    }

    if let Some(req) = &record.http_request {
        entry.http_request = Some(req.clone());
    }

    entry
}

impl From<&LogRecord> for LogEntry {
    fn from(record: &LogRecord) -> Self {
        map_record(record)
    }
}
