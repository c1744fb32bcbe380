use crate::domain::common::{AggregateRoot, BaseAggregate, EntityMetadata};
use crate::uuid_aggregate_id;
use serde::{Deserialize, Serialize};

uuid_aggregate_id!(PlanId);

/// Numeric plan ceiling. On the wire and in the DB the convention is
/// `-1` unlimited, `0` forbidden, `N>0` hard cap; inside the engine the
/// three cases are explicit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Limit {
    Unlimited,
    Forbidden,
    Max(i64),
}

impl Limit {
    pub fn from_raw(raw: i64) -> Self {
        match raw {
            -1 => Self::Unlimited,
            0 => Self::Forbidden,
            n if n > 0 => Self::Max(n),
            // Anything below -1 is treated as forbidden rather than
            // silently unlimited.
            _ => Self::Forbidden,
        }
    }

    pub fn as_raw(&self) -> i64 {
        match self {
            Self::Unlimited => -1,
            Self::Forbidden => 0,
            Self::Max(n) => *n,
        }
    }

    /// Whether one more unit is admissible given the current count.
    /// The boundary is inclusive: count == limit is already rejected.
    pub fn allows(&self, current: i64) -> bool {
        match self {
            Self::Unlimited => true,
            Self::Forbidden => false,
            Self::Max(n) => current < *n,
        }
    }

    /// Same semantics for monetary caps.
    pub fn allows_amount(&self, current: f64) -> bool {
        match self {
            Self::Unlimited => true,
            Self::Forbidden => false,
            Self::Max(n) => current < *n as f64,
        }
    }
}

/// Unit for the rolling "at most once per N" sync restriction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SyncWindowUnit {
    Hours,
    Days,
}

impl SyncWindowUnit {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Hours => "hours",
            Self::Days => "days",
        }
    }

    pub fn from_str_opt(s: &str) -> Option<Self> {
        match s {
            "hours" => Some(Self::Hours),
            "days" => Some(Self::Days),
            _ => None,
        }
    }

    pub fn to_duration(self, size: i64) -> chrono::Duration {
        match self {
            Self::Hours => chrono::Duration::hours(size),
            Self::Days => chrono::Duration::days(size),
        }
    }
}

/// Subscription tier policy. Immutable from the engine's point of view.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Plan {
    pub base: BaseAggregate<PlanId>,

    pub max_networks: Limit,
    pub daily_sync_limit: Limit,
    pub monthly_sync_limit: Limit,
    pub revenue_cap: Limit,
    pub orders_cap: Limit,

    /// Rolling restriction: at most one sync per window_size units
    pub sync_window_unit: Option<SyncWindowUnit>,
    pub sync_window_size: Option<i64>,

    /// Time-of-day window during which syncs may run (UTC)
    pub sync_allowed_from: Option<chrono::NaiveTime>,
    pub sync_allowed_to: Option<chrono::NaiveTime>,
}

impl Plan {
    pub fn new_for_insert(code: String, description: String) -> Self {
        Self {
            base: BaseAggregate::new(PlanId::new_v4(), code, description),
            max_networks: Limit::Unlimited,
            daily_sync_limit: Limit::Unlimited,
            monthly_sync_limit: Limit::Unlimited,
            revenue_cap: Limit::Unlimited,
            orders_cap: Limit::Unlimited,
            sync_window_unit: None,
            sync_window_size: None,
            sync_allowed_from: None,
            sync_allowed_to: None,
        }
    }

    pub fn before_write(&mut self) {
        self.base.touch();
    }
}

impl AggregateRoot for Plan {
    type Id = PlanId;

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
        "a006"
    }

    fn collection_name() -> &'static str {
        "plan"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn limit_raw_round_trip() {
        assert_eq!(Limit::from_raw(-1), Limit::Unlimited);
        assert_eq!(Limit::from_raw(0), Limit::Forbidden);
        assert_eq!(Limit::from_raw(5), Limit::Max(5));
        assert_eq!(Limit::Max(5).as_raw(), 5);
    }

    #[test]
    fn limit_boundary_is_inclusive() {
        let limit = Limit::Max(100);
        assert!(limit.allows(99));
        assert!(!limit.allows(100));
        assert!(!limit.allows(101));
    }

    #[test]
    fn forbidden_rejects_first_call() {
        assert!(!Limit::Forbidden.allows(0));
        assert!(Limit::Unlimited.allows(i64::MAX - 1));
    }
}
