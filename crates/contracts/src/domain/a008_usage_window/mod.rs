pub mod aggregate;

pub use aggregate::{UsagePeriod, UsageWindow, UsageWindowId};
