use crate::domain::common::{AggregateRoot, BaseAggregate, EntityMetadata};
use crate::uuid_aggregate_id;
use chrono::{DateTime, Datelike, Duration, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

uuid_aggregate_id!(UsageWindowId);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UsagePeriod {
    Daily,
    Monthly,
}

impl UsagePeriod {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Daily => "daily",
            Self::Monthly => "monthly",
        }
    }

    pub fn from_str_opt(s: &str) -> Option<Self> {
        match s {
            "daily" => Some(Self::Daily),
            "monthly" => Some(Self::Monthly),
            _ => None,
        }
    }

    /// Window bounds containing `now`. Daily windows run midnight to
    /// midnight UTC, monthly from the 1st to the 1st.
    pub fn bounds_for(&self, now: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
        let day = now.date_naive();
        match self {
            Self::Daily => {
                let start = start_of_day(day);
                (start, start + Duration::days(1))
            }
            Self::Monthly => {
                let first = day.with_day(1).unwrap_or(day);
                let next_first = next_month_first(first);
                (start_of_day(first), start_of_day(next_first))
            }
        }
    }
}

fn start_of_day(day: NaiveDate) -> DateTime<Utc> {
    Utc.from_utc_datetime(&day.and_hms_opt(0, 0, 0).unwrap_or_default())
}

fn next_month_first(first: NaiveDate) -> NaiveDate {
    let (year, month) = if first.month() == 12 {
        (first.year() + 1, 1)
    } else {
        (first.year(), first.month() + 1)
    };
    NaiveDate::from_ymd_opt(year, month, 1).unwrap_or(first)
}

/// Rolling usage counter bucket. Exactly one open window exists per
/// (user_id, period); only the rotation job resets it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsageWindow {
    pub base: BaseAggregate<UsageWindowId>,

    pub user_id: Uuid,
    pub period: UsagePeriod,
    pub window_start: DateTime<Utc>,
    pub window_end: DateTime<Utc>,

    pub sync_count: i64,
    pub revenue_sum: f64,
    pub orders_count: i64,
}

impl UsageWindow {
    /// Open a fresh window covering `now`
    pub fn new_open(user_id: Uuid, period: UsagePeriod, now: DateTime<Utc>) -> Self {
        let (window_start, window_end) = period.bounds_for(now);
        let code = format!("USG-{}-{}", period.as_str(), window_start.format("%Y%m%d"));
        let description = format!("{} usage window", period.as_str());
        Self {
            base: BaseAggregate::new(UsageWindowId::new_v4(), code, description),
            user_id,
            period,
            window_start,
            window_end,
            sync_count: 0,
            revenue_sum: 0.0,
            orders_count: 0,
        }
    }

    pub fn contains(&self, now: DateTime<Utc>) -> bool {
        self.window_start <= now && now < self.window_end
    }

    pub fn before_write(&mut self) {
        self.base.touch();
    }
}

impl AggregateRoot for UsageWindow {
    type Id = UsageWindowId;

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
        "a008"
    }

    fn collection_name() -> &'static str {
        "usage_window"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn daily_bounds_cover_one_day() {
        let now = Utc.with_ymd_and_hms(2026, 8, 27, 13, 45, 0).unwrap();
        let (start, end) = UsagePeriod::Daily.bounds_for(now);
        assert_eq!(start, Utc.with_ymd_and_hms(2026, 8, 27, 0, 0, 0).unwrap());
        assert_eq!(end, Utc.with_ymd_and_hms(2026, 8, 28, 0, 0, 0).unwrap());
    }

    #[test]
    fn monthly_bounds_roll_over_december() {
        let now = Utc.with_ymd_and_hms(2026, 12, 15, 8, 0, 0).unwrap();
        let (start, end) = UsagePeriod::Monthly.bounds_for(now);
        assert_eq!(start, Utc.with_ymd_and_hms(2026, 12, 1, 0, 0, 0).unwrap());
        assert_eq!(end, Utc.with_ymd_and_hms(2027, 1, 1, 0, 0, 0).unwrap());
    }

    #[test]
    fn window_contains_is_half_open() {
        let now = Utc.with_ymd_and_hms(2026, 8, 27, 13, 45, 0).unwrap();
        let window = UsageWindow::new_open(Uuid::new_v4(), UsagePeriod::Daily, now);
        assert!(window.contains(now));
        assert!(!window.contains(window.window_end));
        assert!(window.contains(window.window_start));
    }
}
