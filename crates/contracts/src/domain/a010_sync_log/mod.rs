pub mod aggregate;

pub use aggregate::{SyncLog, SyncLogId, SyncLogStatus};
