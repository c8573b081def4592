pub mod level;
pub mod value;
pub mod http_request;
pub mod record;
pub mod entry;
pub mod serialize;
pub mod error;
pub mod sink;
pub mod transform;
pub mod layer;

pub mod env;
pub mod init;

pub use entry::{map_record, LogEntry, ServiceContext};
pub use error::{MapError, SerializeError, TransformError};
pub use http_request::{HttpRequest, HttpRequestInfo};
pub use layer::StackdriverLayer;
pub use level::{LogLevel, Severity};
pub use record::{ErrorInfo, LogRecord};
pub use serialize::to_line;
pub use transform::{create_stream, Chunk, StreamConfig, Transformer};
pub use value::{FieldValue, SharedValue};
