use crate::record::LogRecord;
use async_trait::async_trait;
use std::error::Error;

/// Asynchronous destination for [`LogRecord`]s produced by the logging layer.
///
/// Implementations turn records into whatever their destination expects.
/// The layer calls `send` from a background task, one record at a time and
/// in the order the records were produced; it awaits each call before
/// sending the next record, so a slow destination slows the task down
/// instead of losing records.
#[async_trait]
pub trait LogSink: Send + Sync {
    /// Deliver a single log record.
    ///
    /// **Returns**
    /// - `Ok(())` if the record was accepted.
    /// - `Err(..)` if this record could not be delivered. The failure is
    ///   scoped to the record; the caller keeps sending later records.
    async fn send(&self, record: &LogRecord) -> Result<(), Box<dyn Error + Send + Sync>>;

    /// Flush anything the destination holds on to.
    ///
    /// Default implementation is a no-op.
    async fn flush(&self) -> Result<(), Box<dyn Error + Send + Sync>> {
        Ok(())
    }
}
