//! Value model for the free-form fields carried by a log record.
//!
//! Besides plain JSON-like data a field may hold a [`SharedValue`], a node
//! with identity that can end up referencing itself, or a [`LazyValue`]
//! whose read can fail. The serializer is the only consumer that has to
//! care about either.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, RwLock};

/// A single field value.
#[derive(Clone)]
pub enum FieldValue {
    Null,
    Bool(bool),
    Number(serde_json::Number),
    String(String),
    Array(Vec<FieldValue>),
    Object(BTreeMap<String, FieldValue>),
    Shared(SharedValue),
    Lazy(Arc<dyn LazyValue>),
}

impl FieldValue {
    /// Wrap a computed property.
    pub fn lazy<F>(read: F) -> Self
    where
        F: Fn() -> Result<FieldValue, String> + Send + Sync + 'static,
    {
        FieldValue::Lazy(Arc::new(read))
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::String(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Debug for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Null => f.write_str("Null"),
            FieldValue::Bool(b) => write!(f, "Bool({b})"),
            FieldValue::Number(n) => write!(f, "Number({n})"),
            FieldValue::String(s) => write!(f, "String({s:?})"),
            FieldValue::Array(items) => f.debug_list().entries(items).finish(),
            FieldValue::Object(map) => f.debug_map().entries(map).finish(),
            // Never follow shared nodes here; they may be cyclic.
            FieldValue::Shared(shared) => write!(f, "Shared({:p})", shared.id()),
            FieldValue::Lazy(_) => f.write_str("Lazy(..)"),
        }
    }
}

impl PartialEq for FieldValue {
    /// Structural equality for plain data, identity for shared and lazy nodes.
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (FieldValue::Null, FieldValue::Null) => true,
            (FieldValue::Bool(a), FieldValue::Bool(b)) => a == b,
            (FieldValue::Number(a), FieldValue::Number(b)) => a == b,
            (FieldValue::String(a), FieldValue::String(b)) => a == b,
            (FieldValue::Array(a), FieldValue::Array(b)) => a == b,
            (FieldValue::Object(a), FieldValue::Object(b)) => a == b,
            (FieldValue::Shared(a), FieldValue::Shared(b)) => a.id() == b.id(),
            (FieldValue::Lazy(a), FieldValue::Lazy(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl From<serde_json::Value> for FieldValue {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => FieldValue::Null,
            serde_json::Value::Bool(b) => FieldValue::Bool(b),
            serde_json::Value::Number(n) => FieldValue::Number(n),
            serde_json::Value::String(s) => FieldValue::String(s),
            serde_json::Value::Array(items) => {
                FieldValue::Array(items.into_iter().map(FieldValue::from).collect())
            }
            serde_json::Value::Object(map) => FieldValue::Object(
                map.into_iter().map(|(k, v)| (k, FieldValue::from(v))).collect(),
            ),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::String(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::String(value)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        FieldValue::Bool(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::Number(value.into())
    }
}

impl From<u64> for FieldValue {
    fn from(value: u64) -> Self {
        FieldValue::Number(value.into())
    }
}

impl From<f64> for FieldValue {
    /// Non-finite numbers have no JSON form and become `Null`.
    fn from(value: f64) -> Self {
        serde_json::Number::from_f64(value)
            .map(FieldValue::Number)
            .unwrap_or(FieldValue::Null)
    }
}

impl From<SharedValue> for FieldValue {
    fn from(value: SharedValue) -> Self {
        FieldValue::Shared(value)
    }
}

/// A computed field. Reading it may fail with a human readable reason.
pub trait LazyValue: Send + Sync {
    fn read(&self) -> Result<FieldValue, String>;
}

impl<F> LazyValue for F
where
    F: Fn() -> Result<FieldValue, String> + Send + Sync,
{
    fn read(&self) -> Result<FieldValue, String> {
        self()
    }
}

/// Reference-counted node with identity.
///
/// Clones point at the same node, so a node may be placed inside itself
/// (directly or through other nodes) to form a cycle.
#[derive(Clone)]
pub struct SharedValue(Arc<RwLock<FieldValue>>);

impl SharedValue {
    pub fn new(value: impl Into<FieldValue>) -> Self {
        SharedValue(Arc::new(RwLock::new(value.into())))
    }

    /// Replace the node contents.
    pub fn set(&self, value: impl Into<FieldValue>) {
        let mut guard = self.0.write().unwrap_or_else(|poisoned| poisoned.into_inner());
        *guard = value.into();
    }

    /// Snapshot of the node contents (shallow: nested shared nodes stay shared).
    pub fn get(&self) -> FieldValue {
        self.0
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Stable identity of the node.
    pub fn id(&self) -> *const () {
        Arc::as_ptr(&self.0) as *const ()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn converts_from_json_values() {
        let value = FieldValue::from(serde_json::json!({"a": [1, "two", null]}));
        let FieldValue::Object(map) = value else {
            panic!("expected object");
        };
        assert_eq!(
            map["a"],
            FieldValue::Array(vec![1i64.into(), "two".into(), FieldValue::Null])
        );
    }

    #[test]
    fn shared_clones_keep_identity() {
        let node = SharedValue::new(FieldValue::Null);
        let other = node.clone();
        other.set("changed");
        assert_eq!(node.get(), FieldValue::from("changed"));
        assert_eq!(node.id(), other.id());
    }

    #[test]
    fn non_finite_float_becomes_null() {
        assert_eq!(FieldValue::from(f64::NAN), FieldValue::Null);
    }
}
