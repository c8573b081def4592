//! Entry → JSON line encoding that never fails.
//!
//! Encoding is first attempted strictly. If the entry holds a reference
//! cycle or a field whose read fails, it is encoded again in tolerant mode,
//! where those spots are replaced with marker strings. If even that fails
//! the line carries a diagnostic instead of the entry.

use serde_json::{Map, Value};

use crate::entry::LogEntry;
use crate::error::SerializeError;
use crate::value::FieldValue;

/// Deepest value nesting either strategy accepts.
pub const MAX_DEPTH: usize = 128;

/// Replaces a node that is already being encoded further up the path.
pub const CIRCULAR_MARKER: &str = "[Circular]";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Fail on cycles and on failing reads.
    Strict,
    /// Substitute markers for cycles and failing reads.
    Tolerant,
}

/// Serialize an entry to one compact line ending in `\n`.
pub fn to_line(entry: &LogEntry) -> String {
    let encoded = to_json(entry, Strategy::Strict)
        .or_else(|_| to_json(entry, Strategy::Tolerant))
        .and_then(|value| {
            serde_json::to_string(&value).map_err(|e| SerializeError::Encode(e.to_string()))
        });

    let mut line = match encoded {
        Ok(text) => text,
        // Debug formatting escapes the message, so the line stays single.
        Err(e) => format!("(Exception in serializing entry: {:?})", e.to_string()),
    };
    line.push('\n');
    line
}

/// Encode an entry as a JSON object using the given strategy.
pub fn to_json(entry: &LogEntry, strategy: Strategy) -> Result<Value, SerializeError> {
    let mut encoder = Encoder { strategy, path: Vec::new() };
    let mut map = Map::new();

    for (key, value) in &entry.extra {
        map.insert(key.clone(), encoder.encode(key, value, 1)?);
    }

    map.insert("severity".to_string(), to_value(&entry.severity)?);
    map.insert("message".to_string(), Value::String(entry.message.clone()));
    if let Some(req) = &entry.http_request {
        map.insert("httpRequest".to_string(), to_value(req)?);
    }
    if let Some(ctx) = &entry.service_context {
        map.insert("serviceContext".to_string(), to_value(ctx)?);
    }

    Ok(Value::Object(map))
}

fn to_value<T: serde::Serialize>(value: &T) -> Result<Value, SerializeError> {
    serde_json::to_value(value).map_err(|e| SerializeError::Encode(e.to_string()))
}

struct Encoder {
    strategy: Strategy,
    /// Identities of the shared nodes currently being encoded.
    path: Vec<*const ()>,
}

impl Encoder {
    fn encode(&mut self, key: &str, value: &FieldValue, depth: usize) -> Result<Value, SerializeError> {
        if depth > MAX_DEPTH {
            return Err(SerializeError::TooDeep(MAX_DEPTH));
        }

        match value {
            FieldValue::Null => Ok(Value::Null),
            FieldValue::Bool(b) => Ok(Value::Bool(*b)),
            FieldValue::Number(n) => Ok(Value::Number(n.clone())),
            FieldValue::String(s) => Ok(Value::String(s.clone())),
            FieldValue::Array(items) => {
                let mut out = Vec::with_capacity(items.len());
                for (i, item) in items.iter().enumerate() {
                    out.push(self.encode(&i.to_string(), item, depth + 1)?);
                }
                Ok(Value::Array(out))
            }
            FieldValue::Object(fields) => {
                let mut out = Map::new();
                for (k, v) in fields {
                    out.insert(k.clone(), self.encode(k, v, depth + 1)?);
                }
                Ok(Value::Object(out))
            }
            FieldValue::Shared(node) => {
                let id = node.id();
                if self.path.contains(&id) {
                    return match self.strategy {
                        Strategy::Strict => Err(SerializeError::Circular),
                        Strategy::Tolerant => Ok(Value::String(CIRCULAR_MARKER.to_string())),
                    };
                }
                self.path.push(id);
                let result = self.encode(key, &node.get(), depth + 1);
                self.path.pop();
                result
            }
            FieldValue::Lazy(lazy) => match lazy.read() {
                Ok(inner) => self.encode(key, &inner, depth + 1),
                Err(reason) => match self.strategy {
                    Strategy::Strict => Err(SerializeError::Getter { field: key.to_string(), reason }),
                    Strategy::Tolerant => Ok(Value::String(format!("[Throws: {reason}]"))),
                },
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::level::LogLevel;
    use crate::record::{ErrorInfo, LogRecord};
    use crate::entry::map_record;
    use crate::value::SharedValue;
    use std::collections::BTreeMap;

    fn entry_with(key: &str, value: FieldValue) -> LogEntry {
        map_record(&LogRecord::new(LogLevel::Info, "mylog", "hola que tal").with_field(key, value))
    }

    fn parse(line: &str) -> Value {
        assert!(line.ends_with('\n'));
        assert!(!line.ends_with("\n\n"));
        assert_eq!(line.matches('\n').count(), 1);
        serde_json::from_str(line.trim_end()).unwrap()
    }

    #[test]
    fn plain_entry_is_one_compact_line() {
        let line = to_line(&entry_with("todos", "putos".into()));
        let json = parse(&line);
        assert_eq!(json["severity"], 200);
        assert_eq!(json["message"], "hola que tal");
        assert_eq!(json["todos"], "putos");
        assert!(!line.contains(": "));
    }

    #[test]
    fn multi_line_stack_stays_on_one_line() {
        let rec = LogRecord::new(LogLevel::Error, "mylog", "x")
            .with_error(ErrorInfo::new("Error", "bad").with_stack("Error: bad\n    at a\n    at b"));
        let json = parse(&to_line(&map_record(&rec)));
        assert_eq!(json["message"], "Error: bad\n    at a\n    at b");
    }

    #[test]
    fn self_reference_becomes_marker() {
        let node = SharedValue::new(FieldValue::Null);
        let mut fields = BTreeMap::new();
        fields.insert("id".to_string(), FieldValue::from(7i64));
        fields.insert("me".to_string(), FieldValue::Shared(node.clone()));
        node.set(FieldValue::Object(fields));

        let entry = entry_with("node", node.clone().into());
        assert_eq!(to_json(&entry, Strategy::Strict), Err(SerializeError::Circular));

        let json = parse(&to_line(&entry));
        assert_eq!(json["node"]["id"], 7);
        assert_eq!(json["node"]["me"], CIRCULAR_MARKER);
    }

    #[test]
    fn repeated_sibling_reference_is_not_a_cycle() {
        let shared = SharedValue::new("same");
        let value = FieldValue::Array(vec![shared.clone().into(), shared.into()]);
        let json = parse(&to_line(&entry_with("pair", value)));
        assert_eq!(json["pair"], serde_json::json!(["same", "same"]));
    }

    #[test]
    fn failing_read_becomes_placeholder() {
        let mut fields = BTreeMap::new();
        fields.insert("ok".to_string(), FieldValue::from(true));
        fields.insert("bad".to_string(), FieldValue::lazy(|| Err("getter exploded".to_string())));
        let entry = entry_with("obj", FieldValue::Object(fields));

        assert!(matches!(
            to_json(&entry, Strategy::Strict),
            Err(SerializeError::Getter { ref field, .. }) if field == "bad"
        ));

        let json = parse(&to_line(&entry));
        assert_eq!(json["obj"]["ok"], true);
        assert_eq!(json["obj"]["bad"], "[Throws: getter exploded]");
    }

    #[test]
    fn successful_lazy_read_is_inlined() {
        let entry = entry_with("computed", FieldValue::lazy(|| Ok(FieldValue::from(42i64))));
        assert_eq!(parse(&to_line(&entry))["computed"], 42);
    }

    #[test]
    fn unencodable_entry_yields_diagnostic_line() {
        let mut value = FieldValue::from("leaf");
        for _ in 0..MAX_DEPTH + 5 {
            value = FieldValue::Array(vec![value]);
        }
        let line = to_line(&entry_with("deep", value));

        assert!(line.starts_with("(Exception in serializing entry: "));
        assert!(line.ends_with(")\n"));
        assert_eq!(line.matches('\n').count(), 1);
    }
}
