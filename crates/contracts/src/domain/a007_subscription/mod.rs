pub mod aggregate;

pub use aggregate::{Subscription, SubscriptionId, SubscriptionStatus};
