use crate::domain::common::{AggregateRoot, BaseAggregate, EntityMetadata};
use crate::uuid_aggregate_id;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

uuid_aggregate_id!(SyncScheduleId);

/// What a scheduled sync pulls from the network
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncType {
    Coupons,
    Orders,
    Full,
}

impl SyncType {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Coupons => "coupons",
            Self::Orders => "orders",
            Self::Full => "full",
        }
    }

    pub fn from_str_opt(s: &str) -> Option<Self> {
        match s {
            "coupons" => Some(Self::Coupons),
            "orders" => Some(Self::Orders),
            "full" => Some(Self::Full),
            _ => None,
        }
    }
}

/// Recurring sync trigger. The schedule state is implicit in its fields:
/// not due (now < next_run_at), due, or exhausted for today
/// (runs_today has reached daily_run_limit).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncSchedule {
    pub base: BaseAggregate<SyncScheduleId>,

    pub user_id: Uuid,
    /// Networks this schedule fans out to, one job per entry
    pub network_ids: Vec<Uuid>,
    pub sync_type: SyncType,
    /// Cron expression, seconds field included ("0 0 6 * * *")
    pub frequency: String,

    pub next_run_at: Option<DateTime<Utc>>,
    pub runs_today: i32,
    pub daily_run_limit: i32,
    pub is_enabled: bool,
}

impl SyncSchedule {
    pub fn new_for_insert(
        code: String,
        description: String,
        user_id: Uuid,
        network_ids: Vec<Uuid>,
        sync_type: SyncType,
        frequency: String,
        daily_run_limit: i32,
    ) -> Self {
        Self {
            base: BaseAggregate::new(SyncScheduleId::new_v4(), code, description),
            user_id,
            network_ids,
            sync_type,
            frequency,
            next_run_at: None,
            runs_today: 0,
            daily_run_limit,
            is_enabled: true,
        }
    }

    pub fn is_exhausted_today(&self) -> bool {
        self.daily_run_limit > 0 && self.runs_today >= self.daily_run_limit
    }

    /// Due when enabled, the trigger time has passed (or was never
    /// computed), and today's run budget is not spent.
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        if !self.is_enabled || self.is_exhausted_today() {
            return false;
        }
        match self.next_run_at {
            Some(next) => next <= now,
            None => true,
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.network_ids.is_empty() {
            return Err("Schedule must target at least one network".into());
        }
        if self.frequency.trim().is_empty() {
            return Err("Schedule frequency must not be empty".into());
        }
        Ok(())
    }

    pub fn before_write(&mut self) {
        self.base.touch();
    }
}

impl AggregateRoot for SyncSchedule {
    type Id = SyncScheduleId;

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
        "a009"
    }

    fn collection_name() -> &'static str {
        "sync_schedule"
    }
}

/// DTO for schedule CRUD
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SyncScheduleDto {
    pub id: Option<String>,
    pub code: Option<String>,
    pub description: String,
    pub comment: Option<String>,
    pub user_id: Uuid,
    pub network_ids: Vec<Uuid>,
    pub sync_type: Option<SyncType>,
    pub frequency: String,
    pub daily_run_limit: i32,
    pub is_enabled: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn schedule() -> SyncSchedule {
        SyncSchedule::new_for_insert(
            "SCH-1".into(),
            "morning sync".into(),
            Uuid::new_v4(),
            vec![Uuid::new_v4()],
            SyncType::Full,
            "0 0 6 * * *".into(),
            4,
        )
    }

    #[test]
    fn schedule_without_next_run_is_due() {
        let s = schedule();
        assert!(s.is_due(Utc::now()));
    }

    #[test]
    fn future_next_run_is_not_due() {
        let mut s = schedule();
        s.next_run_at = Some(Utc::now() + Duration::hours(1));
        assert!(!s.is_due(Utc::now()));
        s.next_run_at = Some(Utc::now() - Duration::minutes(1));
        assert!(s.is_due(Utc::now()));
    }

    #[test]
    fn exhausted_schedule_is_not_due() {
        let mut s = schedule();
        s.runs_today = 4;
        assert!(s.is_exhausted_today());
        assert!(!s.is_due(Utc::now()));
    }
}
