pub mod aggregate;

pub use aggregate::{Limit, Plan, PlanId, SyncWindowUnit};
