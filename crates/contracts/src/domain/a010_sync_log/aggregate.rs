use crate::domain::a009_sync_schedule::SyncType;
use crate::domain::common::{AggregateRoot, BaseAggregate, EntityMetadata};
use crate::uuid_aggregate_id;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

uuid_aggregate_id!(SyncLogId);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncLogStatus {
    Pending,
    Running,
    Success,
    Failed,
}

impl SyncLogStatus {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Success => "success",
            Self::Failed => "failed",
        }
    }

    pub fn from_str_opt(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "running" => Some(Self::Running),
            "success" => Some(Self::Success),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Success | Self::Failed)
    }
}

/// Per-execution audit record for one network of one schedule run.
/// Status only moves Pending -> Running -> Success|Failed; the Running
/// step is observable and may not be skipped.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncLog {
    pub base: BaseAggregate<SyncLogId>,

    pub sync_schedule_id: Option<Uuid>,
    pub user_id: Uuid,
    pub network_id: Uuid,
    pub sync_type: SyncType,

    pub status: SyncLogStatus,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub error_message: Option<String>,
}

impl SyncLog {
    pub fn new_pending(
        sync_schedule_id: Option<Uuid>,
        user_id: Uuid,
        network_id: Uuid,
        sync_type: SyncType,
    ) -> Self {
        let code = format!("LOG-{}", Utc::now().format("%Y%m%d%H%M%S"));
        let description = format!("{} sync", sync_type.as_str());
        Self {
            base: BaseAggregate::new(SyncLogId::new_v4(), code, description),
            sync_schedule_id,
            user_id,
            network_id,
            sync_type,
            status: SyncLogStatus::Pending,
            started_at: None,
            finished_at: None,
            error_message: None,
        }
    }

    pub fn mark_running(&mut self) -> Result<(), String> {
        if self.status != SyncLogStatus::Pending {
            return Err(format!(
                "Cannot start a sync log in status {}",
                self.status.as_str()
            ));
        }
        self.status = SyncLogStatus::Running;
        self.started_at = Some(Utc::now());
        Ok(())
    }

    pub fn mark_success(&mut self) -> Result<(), String> {
        self.finish(SyncLogStatus::Success, None)
    }

    pub fn mark_failed(&mut self, error_message: String) -> Result<(), String> {
        self.finish(SyncLogStatus::Failed, Some(error_message))
    }

    fn finish(&mut self, status: SyncLogStatus, error: Option<String>) -> Result<(), String> {
        if self.status != SyncLogStatus::Running {
            return Err(format!(
                "Cannot finish a sync log in status {}",
                self.status.as_str()
            ));
        }
        self.status = status;
        self.finished_at = Some(Utc::now());
        self.error_message = error;
        Ok(())
    }

    pub fn before_write(&mut self) {
        self.base.touch();
    }
}

impl AggregateRoot for SyncLog {
    type Id = SyncLogId;

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
        "a010"
    }

    fn collection_name() -> &'static str {
        "sync_log"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn log() -> SyncLog {
        SyncLog::new_pending(None, Uuid::new_v4(), Uuid::new_v4(), SyncType::Coupons)
    }

    #[test]
    fn pending_cannot_finish_directly() {
        let mut l = log();
        assert!(l.mark_success().is_err());
        assert!(l.mark_failed("boom".into()).is_err());
        assert_eq!(l.status, SyncLogStatus::Pending);
    }

    #[test]
    fn full_transition_chain() {
        let mut l = log();
        l.mark_running().unwrap();
        assert_eq!(l.status, SyncLogStatus::Running);
        assert!(l.started_at.is_some());
        l.mark_failed("login_failed: no session".into()).unwrap();
        assert_eq!(l.status, SyncLogStatus::Failed);
        assert!(l.status.is_terminal());
        assert_eq!(
            l.error_message.as_deref(),
            Some("login_failed: no session")
        );
    }

    #[test]
    fn terminal_log_cannot_restart() {
        let mut l = log();
        l.mark_running().unwrap();
        l.mark_success().unwrap();
        assert!(l.mark_running().is_err());
    }
}
