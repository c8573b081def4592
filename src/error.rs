use crate::level::UnknownLevel;

/// Error raised when a structured value cannot be read as a log record.
#[derive(thiserror::Error, Debug)]
pub enum MapError {
    #[error("log record must be a JSON object, got {0}")]
    NotAnObject(&'static str),

    #[error("log record is missing required field `{0}`")]
    MissingField(&'static str),

    #[error("log record field `{field}` is invalid: {reason}")]
    InvalidField { field: &'static str, reason: String },

    #[error(transparent)]
    UnknownLevel(#[from] UnknownLevel),
}

/// Per-record failure surfaced by the transform stage.
///
/// None of these abort the stream; the next chunk is processed normally.
#[derive(thiserror::Error, Debug)]
pub enum TransformError {
    #[error("bad configuration: this stage requires structured records, not raw text")]
    Configuration,

    #[error("failed to map log record: {0}")]
    Mapping(#[from] MapError),

    #[error("failed to write log line: {0}")]
    Io(#[from] std::io::Error),
}

/// Failure of one serialization strategy. Always recovered internally.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum SerializeError {
    #[error("converting circular structure to JSON")]
    Circular,

    #[error("field `{field}` could not be read: {reason}")]
    Getter { field: String, reason: String },

    #[error("value nesting exceeds {0} levels")]
    TooDeep(usize),

    #[error("{0}")]
    Encode(String),
}
