use crate::domain::common::{AggregateRoot, BaseAggregate, EntityMetadata};
use crate::uuid_aggregate_id;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

uuid_aggregate_id!(SubscriptionId);

/// Explicit subscription state machine. The source system encoded this as
/// a set of nullable timestamps; here every state carries exactly the
/// data it needs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SubscriptionStatus {
    Trialing { ends_at: DateTime<Utc> },
    Active { ends_at: Option<DateTime<Utc>> },
    Cancelled { at: DateTime<Utc> },
    Expired,
}

impl SubscriptionStatus {
    /// Whether the subscription admits billable actions at `now`.
    /// A trial is only valid while its end date is in the future.
    pub fn is_valid(&self, now: DateTime<Utc>) -> bool {
        match self {
            Self::Trialing { ends_at } => *ends_at > now,
            Self::Active { ends_at } => ends_at.map(|e| e > now).unwrap_or(true),
            Self::Cancelled { .. } | Self::Expired => false,
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Trialing { .. } => "trial",
            Self::Active { .. } => "active",
            Self::Cancelled { .. } => "cancelled",
            Self::Expired => "expired",
        }
    }

    /// Rebuild the state from the flat DB columns.
    pub fn from_columns(
        status: &str,
        trial_ends_at: Option<DateTime<Utc>>,
        ends_at: Option<DateTime<Utc>>,
        cancelled_at: Option<DateTime<Utc>>,
    ) -> Self {
        match status {
            "trial" => match trial_ends_at {
                Some(ends_at) => Self::Trialing { ends_at },
                // A trial without an end date never validated; treat as expired.
                None => Self::Expired,
            },
            "active" => Self::Active { ends_at },
            "cancelled" => match cancelled_at {
                Some(at) => Self::Cancelled { at },
                None => Self::Expired,
            },
            _ => Self::Expired,
        }
    }
}

/// A user's subscription to a plan
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subscription {
    pub base: BaseAggregate<SubscriptionId>,

    pub user_id: Uuid,
    pub plan_id: Uuid,
    pub status: SubscriptionStatus,
}

impl Subscription {
    pub fn new_for_insert(
        code: String,
        description: String,
        user_id: Uuid,
        plan_id: Uuid,
        status: SubscriptionStatus,
    ) -> Self {
        Self {
            base: BaseAggregate::new(SubscriptionId::new_v4(), code, description),
            user_id,
            plan_id,
            status,
        }
    }

    pub fn before_write(&mut self) {
        self.base.touch();
    }
}

impl AggregateRoot for Subscription {
    type Id = SubscriptionId;

    fn id(&self) -> Self::Id {
        self.base.id
    }

    fn code(&self) -> &str {
        &self.base.code
    }

    fn description(&self) -> &str {
        &self.base.description
    }

    fn metadata(&self) -> &EntityMetadata {
        &self.base.metadata
    }

    fn metadata_mut(&mut self) -> &mut EntityMetadata {
        &mut self.base.metadata
    }

    fn aggregate_index() -> &'static str {
        "a007"
    }

    fn collection_name() -> &'static str {
        "subscription"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn trial_is_valid_until_its_end_date() {
        let now = Utc::now();
        let live = SubscriptionStatus::Trialing {
            ends_at: now + Duration::days(3),
        };
        let dead = SubscriptionStatus::Trialing {
            ends_at: now - Duration::hours(1),
        };
        assert!(live.is_valid(now));
        assert!(!dead.is_valid(now));
    }

    #[test]
    fn active_without_end_date_is_valid() {
        let now = Utc::now();
        assert!(SubscriptionStatus::Active { ends_at: None }.is_valid(now));
        assert!(!SubscriptionStatus::Expired.is_valid(now));
        assert!(!SubscriptionStatus::Cancelled { at: now }.is_valid(now));
    }

    #[test]
    fn from_columns_rebuilds_trial() {
        let ends = Utc::now() + Duration::days(7);
        let status = SubscriptionStatus::from_columns("trial", Some(ends), None, None);
        assert_eq!(status, SubscriptionStatus::Trialing { ends_at: ends });
        // Missing trial end collapses to expired rather than forever-trial.
        let status = SubscriptionStatus::from_columns("trial", None, None, None);
        assert_eq!(status, SubscriptionStatus::Expired);
    }
}
