pub mod entry;
pub mod error;
pub mod logger;
pub mod query;
pub mod sink;

pub use entry::{AuditLogEntry, AuditRecord, AuditStatus};
pub use error::AuditError;
pub use logger::AuditLogger;
pub use query::AuditQuery;
pub use sink::{AuditSink, ChainedFileSink};
