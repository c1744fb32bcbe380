pub mod aggregate;

pub use aggregate::{SyncSchedule, SyncScheduleDto, SyncScheduleId, SyncType};
