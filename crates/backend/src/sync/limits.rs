use async_trait::async_trait;
use chrono::{DateTime, Utc};
use contracts::domain::a006_plan::aggregate::Plan;
use contracts::domain::a007_subscription::aggregate::Subscription;
use contracts::domain::a008_usage_window::aggregate::{UsagePeriod, UsageWindow};
use contracts::sync::SyncError;
use std::sync::Arc;
use uuid::Uuid;

use crate::domain::{
    a002_network_connection, a006_plan, a007_subscription, a008_usage_window, a010_sync_log,
};

/// Persistence the plan gate needs. The production impl reads the
/// repositories; tests use an in-memory store.
#[async_trait]
pub trait LimitsStore: Send + Sync {
    async fn latest_subscription(&self, user_id: Uuid) -> anyhow::Result<Option<Subscription>>;
    async fn plan(&self, plan_id: Uuid) -> anyhow::Result<Option<Plan>>;
    async fn active_network_count(&self, user_id: Uuid) -> anyhow::Result<i64>;
    async fn usage(
        &self,
        user_id: Uuid,
        period: UsagePeriod,
        now: DateTime<Utc>,
    ) -> anyhow::Result<UsageWindow>;
    async fn add_usage(
        &self,
        user_id: Uuid,
        sync_delta: i64,
        revenue_delta: f64,
        orders_delta: i64,
        now: DateTime<Utc>,
    ) -> anyhow::Result<()>;
    async fn last_successful_sync(&self, user_id: Uuid)
        -> anyhow::Result<Option<DateTime<Utc>>>;
}

/// LimitsStore over the sqlite repositories
pub struct DbLimitsStore;

#[async_trait]
impl LimitsStore for DbLimitsStore {
    async fn latest_subscription(&self, user_id: Uuid) -> anyhow::Result<Option<Subscription>> {
        a007_subscription::repository::get_latest_by_user(user_id).await
    }

    async fn plan(&self, plan_id: Uuid) -> anyhow::Result<Option<Plan>> {
        a006_plan::repository::get_by_id(plan_id).await
    }

    async fn active_network_count(&self, user_id: Uuid) -> anyhow::Result<i64> {
        a002_network_connection::repository::count_active_by_user(user_id).await
    }

    async fn usage(
        &self,
        user_id: Uuid,
        period: UsagePeriod,
        now: DateTime<Utc>,
    ) -> anyhow::Result<UsageWindow> {
        a008_usage_window::repository::get_or_open(user_id, period, now).await
    }

    async fn add_usage(
        &self,
        user_id: Uuid,
        sync_delta: i64,
        revenue_delta: f64,
        orders_delta: i64,
        now: DateTime<Utc>,
    ) -> anyhow::Result<()> {
        a008_usage_window::repository::add_counts(
            user_id,
            sync_delta,
            revenue_delta,
            orders_delta,
            now,
        )
        .await
    }

    async fn last_successful_sync(
        &self,
        user_id: Uuid,
    ) -> anyhow::Result<Option<DateTime<Utc>>> {
        a010_sync_log::repository::last_success_finished_at(user_id).await
    }
}

/// Admission control for billable actions. Every check short-circuits on
/// the first violated constraint and names it in the error, so callers
/// can show the user exactly which ceiling was hit.
pub struct PlanLimitService {
    store: Arc<dyn LimitsStore>,
}

impl PlanLimitService {
    pub fn new(store: Arc<dyn LimitsStore>) -> Self {
        Self { store }
    }

    fn store_err(e: anyhow::Error) -> SyncError {
        SyncError::TransportError(format!("limits store: {}", e))
    }

    /// Valid subscription and its plan, or the reason there is none
    async fn subscribed_plan(&self, user_id: Uuid, now: DateTime<Utc>) -> Result<Plan, SyncError> {
        let subscription = self
            .store
            .latest_subscription(user_id)
            .await
            .map_err(Self::store_err)?
            .ok_or(SyncError::SubscriptionRequired)?;
        if !subscription.status.is_valid(now) {
            return Err(SyncError::SubscriptionRequired);
        }
        self.store
            .plan(subscription.plan_id)
            .await
            .map_err(Self::store_err)?
            .ok_or(SyncError::SubscriptionRequired)
    }

    pub async fn assert_subscribed(&self, user_id: Uuid) -> Result<(), SyncError> {
        self.subscribed_plan(user_id, Utc::now()).await.map(|_| ())
    }

    /// Gate for activating one more network connection
    pub async fn assert_can_add_network(&self, user_id: Uuid) -> Result<(), SyncError> {
        let plan = self.subscribed_plan(user_id, Utc::now()).await?;
        let count = self
            .store
            .active_network_count(user_id)
            .await
            .map_err(Self::store_err)?;
        if !plan.max_networks.allows(count) {
            return Err(SyncError::PlanLimitReached(
                "Network connection limit reached".into(),
            ));
        }
        Ok(())
    }

    /// Gate for one more sync run. Checked in order: subscription, daily
    /// count, monthly count, monthly revenue, monthly orders. Raised
    /// before any network I/O happens.
    pub async fn assert_can_sync(&self, user_id: Uuid, now: DateTime<Utc>) -> Result<(), SyncError> {
        let plan = self.subscribed_plan(user_id, now).await?;

        let daily = self
            .store
            .usage(user_id, UsagePeriod::Daily, now)
            .await
            .map_err(Self::store_err)?;
        // A window rotation may lag; a stale window counts as empty
        let daily_count = if daily.contains(now) { daily.sync_count } else { 0 };
        if !plan.daily_sync_limit.allows(daily_count) {
            return Err(SyncError::PlanLimitReached("Daily sync limit reached".into()));
        }

        let monthly = self
            .store
            .usage(user_id, UsagePeriod::Monthly, now)
            .await
            .map_err(Self::store_err)?;
        let fresh = monthly.contains(now);
        let monthly_count = if fresh { monthly.sync_count } else { 0 };
        if !plan.monthly_sync_limit.allows(monthly_count) {
            return Err(SyncError::PlanLimitReached(
                "Monthly sync limit reached".into(),
            ));
        }

        let revenue = if fresh { monthly.revenue_sum } else { 0.0 };
        if !plan.revenue_cap.allows_amount(revenue) {
            return Err(SyncError::PlanLimitReached("Revenue cap reached".into()));
        }

        let orders = if fresh { monthly.orders_count } else { 0 };
        if !plan.orders_cap.allows(orders) {
            return Err(SyncError::PlanLimitReached("Orders cap reached".into()));
        }

        Ok(())
    }

    /// Plan scheduling restrictions: a time-of-day window and a rolling
    /// "at most once per N hours/days" rule anchored on the last
    /// successful sync.
    pub async fn assert_within_sync_window(
        &self,
        user_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<(), SyncError> {
        let plan = self.subscribed_plan(user_id, now).await?;

        if let (Some(from), Some(to)) = (plan.sync_allowed_from, plan.sync_allowed_to) {
            let time = now.time();
            let inside = if from <= to {
                from <= time && time <= to
            } else {
                // Window wraps midnight
                time >= from || time <= to
            };
            if !inside {
                return Err(SyncError::PlanLimitReached(format!(
                    "Sync allowed only between {} and {} UTC",
                    from.format("%H:%M"),
                    to.format("%H:%M")
                )));
            }
        }

        if let (Some(unit), Some(size)) = (plan.sync_window_unit, plan.sync_window_size) {
            let min_gap = unit.to_duration(size);
            let last = self
                .store
                .last_successful_sync(user_id)
                .await
                .map_err(Self::store_err)?;
            if let Some(last) = last {
                if now - last < min_gap {
                    return Err(SyncError::PlanLimitReached(format!(
                        "Sync allowed once per {} {}",
                        size,
                        unit.as_str()
                    )));
                }
            }
        }

        Ok(())
    }

    /// Book one finished sync into both usage windows
    pub async fn record_usage(
        &self,
        user_id: Uuid,
        revenue: f64,
        orders: i64,
    ) -> Result<(), SyncError> {
        self.store
            .add_usage(user_id, 1, revenue, orders, Utc::now())
            .await
            .map_err(Self::store_err)
    }
}

#[cfg(test)]
pub mod testing {
    use super::*;
    use contracts::domain::a007_subscription::aggregate::{SubscriptionId, SubscriptionStatus};
    use contracts::domain::common::BaseAggregate;
    use std::sync::Mutex;

    /// In-memory LimitsStore with directly settable state
    pub struct MemoryLimitsStore {
        pub subscription: Mutex<Option<Subscription>>,
        pub plan: Mutex<Option<Plan>>,
        pub network_count: Mutex<i64>,
        pub daily: Mutex<Option<UsageWindow>>,
        pub monthly: Mutex<Option<UsageWindow>>,
        pub last_success: Mutex<Option<DateTime<Utc>>>,
        pub usage_added: Mutex<Vec<(i64, f64, i64)>>,
    }

    impl MemoryLimitsStore {
        pub fn with_plan(plan: Plan, user_id: Uuid) -> Self {
            let subscription = Subscription {
                base: BaseAggregate::new(
                    SubscriptionId::new_v4(),
                    "SUB-1".into(),
                    "test subscription".into(),
                ),
                user_id,
                plan_id: plan.base.id.value(),
                status: SubscriptionStatus::Active { ends_at: None },
            };
            Self {
                subscription: Mutex::new(Some(subscription)),
                plan: Mutex::new(Some(plan)),
                network_count: Mutex::new(0),
                daily: Mutex::new(None),
                monthly: Mutex::new(None),
                last_success: Mutex::new(None),
                usage_added: Mutex::new(Vec::new()),
            }
        }

        pub fn base_plan() -> Plan {
            Plan::new_for_insert("PLAN-T".into(), "test plan".into())
        }

        pub fn set_counts(&self, period: UsagePeriod, user_id: Uuid, sync_count: i64) {
            let mut window = UsageWindow::new_open(user_id, period, Utc::now());
            window.sync_count = sync_count;
            match period {
                UsagePeriod::Daily => *self.daily.lock().unwrap() = Some(window),
                UsagePeriod::Monthly => *self.monthly.lock().unwrap() = Some(window),
            }
        }
    }

    #[async_trait]
    impl LimitsStore for MemoryLimitsStore {
        async fn latest_subscription(
            &self,
            _user_id: Uuid,
        ) -> anyhow::Result<Option<Subscription>> {
            Ok(self.subscription.lock().unwrap().clone())
        }

        async fn plan(&self, _plan_id: Uuid) -> anyhow::Result<Option<Plan>> {
            Ok(self.plan.lock().unwrap().clone())
        }

        async fn active_network_count(&self, _user_id: Uuid) -> anyhow::Result<i64> {
            Ok(*self.network_count.lock().unwrap())
        }

        async fn usage(
            &self,
            user_id: Uuid,
            period: UsagePeriod,
            now: DateTime<Utc>,
        ) -> anyhow::Result<UsageWindow> {
            let slot = match period {
                UsagePeriod::Daily => &self.daily,
                UsagePeriod::Monthly => &self.monthly,
            };
            let mut guard = slot.lock().unwrap();
            if guard.is_none() {
                *guard = Some(UsageWindow::new_open(user_id, period, now));
            }
            Ok(guard.clone().unwrap())
        }

        async fn add_usage(
            &self,
            _user_id: Uuid,
            sync_delta: i64,
            revenue_delta: f64,
            orders_delta: i64,
            _now: DateTime<Utc>,
        ) -> anyhow::Result<()> {
            self.usage_added
                .lock()
                .unwrap()
                .push((sync_delta, revenue_delta, orders_delta));
            for slot in [&self.daily, &self.monthly] {
                if let Some(window) = slot.lock().unwrap().as_mut() {
                    window.sync_count += sync_delta;
                    window.revenue_sum += revenue_delta;
                    window.orders_count += orders_delta;
                }
            }
            Ok(())
        }

        async fn last_successful_sync(
            &self,
            _user_id: Uuid,
        ) -> anyhow::Result<Option<DateTime<Utc>>> {
            Ok(*self.last_success.lock().unwrap())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::MemoryLimitsStore;
    use super::*;
    use chrono::Duration;
    use contracts::domain::a006_plan::aggregate::{Limit, SyncWindowUnit};
    use contracts::domain::a007_subscription::aggregate::SubscriptionStatus;

    fn service_with(
        configure: impl FnOnce(&mut Plan),
    ) -> (PlanLimitService, Arc<MemoryLimitsStore>, Uuid) {
        let user_id = Uuid::new_v4();
        let mut plan = MemoryLimitsStore::base_plan();
        configure(&mut plan);
        let store = Arc::new(MemoryLimitsStore::with_plan(plan, user_id));
        (PlanLimitService::new(store.clone()), store, user_id)
    }

    #[tokio::test]
    async fn sync_is_rejected_exactly_at_the_daily_ceiling() {
        let (service, store, user_id) = service_with(|p| {
            p.daily_sync_limit = Limit::Max(100);
        });

        store.set_counts(UsagePeriod::Daily, user_id, 99);
        assert!(service.assert_can_sync(user_id, Utc::now()).await.is_ok());

        store.set_counts(UsagePeriod::Daily, user_id, 100);
        let err = service
            .assert_can_sync(user_id, Utc::now())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Daily sync limit"));
    }

    #[tokio::test]
    async fn a_stale_window_does_not_block_the_new_period() {
        let (service, store, user_id) = service_with(|p| {
            p.daily_sync_limit = Limit::Max(100);
        });

        // Window from two days ago that rotation has not touched yet,
        // counter at the ceiling
        let mut window =
            UsageWindow::new_open(user_id, UsagePeriod::Daily, Utc::now() - Duration::days(2));
        window.sync_count = 100;
        *store.daily.lock().unwrap() = Some(window);

        assert!(service.assert_can_sync(user_id, Utc::now()).await.is_ok());
    }

    #[tokio::test]
    async fn forbidden_plan_rejects_the_first_sync() {
        let (service, _store, user_id) = service_with(|p| {
            p.daily_sync_limit = Limit::Forbidden;
        });
        let err = service
            .assert_can_sync(user_id, Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, SyncError::PlanLimitReached(_)));
    }

    #[tokio::test]
    async fn monthly_limit_names_itself() {
        let (service, store, user_id) = service_with(|p| {
            p.daily_sync_limit = Limit::Unlimited;
            p.monthly_sync_limit = Limit::Max(10);
        });
        store.set_counts(UsagePeriod::Monthly, user_id, 10);
        let err = service
            .assert_can_sync(user_id, Utc::now())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Monthly sync limit"));
    }

    #[tokio::test]
    async fn expired_subscription_blocks_before_any_counter() {
        let (service, store, user_id) = service_with(|_| {});
        if let Some(sub) = store.subscription.lock().unwrap().as_mut() {
            sub.status = SubscriptionStatus::Expired;
        }
        let err = service
            .assert_can_sync(user_id, Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, SyncError::SubscriptionRequired));
    }

    #[tokio::test]
    async fn network_cap_boundary_is_inclusive() {
        let (service, store, user_id) = service_with(|p| {
            p.max_networks = Limit::Max(3);
        });
        *store.network_count.lock().unwrap() = 2;
        assert!(service.assert_can_add_network(user_id).await.is_ok());
        *store.network_count.lock().unwrap() = 3;
        assert!(service.assert_can_add_network(user_id).await.is_err());
    }

    #[tokio::test]
    async fn rolling_window_anchors_on_last_successful_sync() {
        let (service, store, user_id) = service_with(|p| {
            p.sync_window_unit = Some(SyncWindowUnit::Hours);
            p.sync_window_size = Some(2);
        });
        let now = Utc::now();

        *store.last_success.lock().unwrap() = Some(now - Duration::hours(1));
        let err = service
            .assert_within_sync_window(user_id, now)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("once per 2 hours"));

        *store.last_success.lock().unwrap() = Some(now - Duration::hours(3));
        assert!(service.assert_within_sync_window(user_id, now).await.is_ok());

        // No successful sync yet: the rule cannot bind
        *store.last_success.lock().unwrap() = None;
        assert!(service.assert_within_sync_window(user_id, now).await.is_ok());
    }

    #[tokio::test]
    async fn time_of_day_window_is_enforced() {
        let (service, _store, user_id) = service_with(|p| {
            p.sync_allowed_from = chrono::NaiveTime::from_hms_opt(6, 0, 0);
            p.sync_allowed_to = chrono::NaiveTime::from_hms_opt(22, 0, 0);
        });
        let inside = Utc::now()
            .date_naive()
            .and_hms_opt(12, 0, 0)
            .unwrap()
            .and_utc();
        let outside = Utc::now()
            .date_naive()
            .and_hms_opt(3, 0, 0)
            .unwrap()
            .and_utc();

        assert!(service
            .assert_within_sync_window(user_id, inside)
            .await
            .is_ok());
        let err = service
            .assert_within_sync_window(user_id, outside)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("between 06:00 and 22:00"));
    }

    #[tokio::test]
    async fn record_usage_books_one_sync() {
        let (service, store, user_id) = service_with(|_| {});
        service.record_usage(user_id, 12.5, 3).await.unwrap();
        let added = store.usage_added.lock().unwrap().clone();
        assert_eq!(added, vec![(1, 12.5, 3)]);
    }
}
