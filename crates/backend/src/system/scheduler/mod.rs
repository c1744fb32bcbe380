pub mod job;
pub mod rotation;
pub mod worker;

pub use job::SyncJobRequest;
pub use rotation::RotationWorker;
pub use worker::{ScheduleWorker, SyncJobWorker};
