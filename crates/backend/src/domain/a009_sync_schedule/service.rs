use super::repository;
use chrono::{DateTime, Utc};
use contracts::domain::a009_sync_schedule::aggregate::{
    SyncSchedule, SyncScheduleDto, SyncType,
};
use cron::Schedule;
use std::str::FromStr;
use uuid::Uuid;

/// Next trigger time after `now` for a cron expression
pub fn compute_next_run(frequency: &str, now: DateTime<Utc>) -> anyhow::Result<DateTime<Utc>> {
    let schedule = Schedule::from_str(frequency)
        .map_err(|e| anyhow::anyhow!("Invalid cron expression '{}': {}", frequency, e))?;
    schedule
        .after(&now)
        .next()
        .ok_or_else(|| anyhow::anyhow!("Cron expression '{}' never fires", frequency))
}

pub async fn create(dto: SyncScheduleDto) -> anyhow::Result<Uuid> {
    let code = dto
        .code
        .clone()
        .unwrap_or_else(|| format!("SCH-{}", Uuid::new_v4()));
    let mut aggregate = SyncSchedule::new_for_insert(
        code,
        dto.description,
        dto.user_id,
        dto.network_ids,
        dto.sync_type.unwrap_or(SyncType::Full),
        dto.frequency,
        dto.daily_run_limit,
    );
    aggregate.base.comment = dto.comment;
    aggregate.is_enabled = dto.is_enabled;

    aggregate
        .validate()
        .map_err(|e| anyhow::anyhow!("Validation failed: {}", e))?;

    // Reject bad cron expressions at write time, not in the scheduler
    aggregate.next_run_at = Some(compute_next_run(&aggregate.frequency, Utc::now())?);

    aggregate.before_write();

    repository::insert(&aggregate).await
}

pub async fn update(dto: SyncScheduleDto) -> anyhow::Result<()> {
    let id = dto
        .id
        .as_ref()
        .and_then(|s| Uuid::parse_str(s).ok())
        .ok_or_else(|| anyhow::anyhow!("Invalid ID"))?;

    let mut aggregate = repository::get_by_id(id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("Not found"))?;

    let frequency_changed = aggregate.frequency != dto.frequency;

    aggregate.base.description = dto.description;
    aggregate.base.comment = dto.comment;
    aggregate.network_ids = dto.network_ids;
    if let Some(sync_type) = dto.sync_type {
        aggregate.sync_type = sync_type;
    }
    aggregate.frequency = dto.frequency;
    aggregate.daily_run_limit = dto.daily_run_limit;
    aggregate.is_enabled = dto.is_enabled;

    aggregate
        .validate()
        .map_err(|e| anyhow::anyhow!("Validation failed: {}", e))?;

    if frequency_changed {
        aggregate.next_run_at = Some(compute_next_run(&aggregate.frequency, Utc::now())?);
    }

    aggregate.before_write();

    repository::update(&aggregate).await
}

pub async fn delete(id: Uuid) -> anyhow::Result<bool> {
    repository::soft_delete(id).await
}

pub async fn get_by_id(id: Uuid) -> anyhow::Result<Option<SyncSchedule>> {
    repository::get_by_id(id).await
}

pub async fn list_by_user(user_id: Uuid) -> anyhow::Result<Vec<SyncSchedule>> {
    repository::list_by_user(user_id).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn next_run_follows_cron_expression() {
        let now = Utc.with_ymd_and_hms(2026, 8, 27, 5, 0, 0).unwrap();
        let next = compute_next_run("0 0 6 * * *", now).unwrap();
        assert_eq!(next, Utc.with_ymd_and_hms(2026, 8, 27, 6, 0, 0).unwrap());

        let now = Utc.with_ymd_and_hms(2026, 8, 27, 7, 0, 0).unwrap();
        let next = compute_next_run("0 0 6 * * *", now).unwrap();
        assert_eq!(next, Utc.with_ymd_and_hms(2026, 8, 28, 6, 0, 0).unwrap());
    }

    #[test]
    fn invalid_cron_expression_is_rejected() {
        assert!(compute_next_run("not a cron", Utc::now()).is_err());
    }
}
