use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Options bag controlling one sync run. Every field is optional; the
/// date range defaults to the current month.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SyncConfig {
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
    pub currency: Option<String>,
    pub page_size: Option<u32>,
    pub debug: bool,
    /// Persist normalized records as domain aggregates
    pub store: bool,
    pub network_id: Option<Uuid>,
    pub user_id: Option<Uuid>,
}

impl SyncConfig {
    pub const DEFAULT_PAGE_SIZE: u32 = 100;

    /// Effective date range: explicit bounds, else start of the current
    /// month through today.
    pub fn resolved_range(&self, today: NaiveDate) -> (NaiveDate, NaiveDate) {
        let from = self
            .date_from
            .unwrap_or_else(|| today.with_day(1).unwrap_or(today));
        let to = self.date_to.unwrap_or(today);
        (from, to)
    }

    pub fn effective_page_size(&self) -> u32 {
        match self.page_size {
            Some(n) if n > 0 => n,
            _ => Self::DEFAULT_PAGE_SIZE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_range_is_month_to_date() {
        let today = NaiveDate::from_ymd_opt(2026, 8, 27).unwrap();
        let (from, to) = SyncConfig::default().resolved_range(today);
        assert_eq!(from, NaiveDate::from_ymd_opt(2026, 8, 1).unwrap());
        assert_eq!(to, today);
    }

    #[test]
    fn explicit_range_wins() {
        let config = SyncConfig {
            date_from: NaiveDate::from_ymd_opt(2026, 7, 1),
            date_to: NaiveDate::from_ymd_opt(2026, 7, 31),
            ..Default::default()
        };
        let today = NaiveDate::from_ymd_opt(2026, 8, 27).unwrap();
        let (from, to) = config.resolved_range(today);
        assert_eq!(from, NaiveDate::from_ymd_opt(2026, 7, 1).unwrap());
        assert_eq!(to, NaiveDate::from_ymd_opt(2026, 7, 31).unwrap());
    }

    #[test]
    fn zero_page_size_falls_back_to_default() {
        let config = SyncConfig {
            page_size: Some(0),
            ..Default::default()
        };
        assert_eq!(config.effective_page_size(), SyncConfig::DEFAULT_PAGE_SIZE);
    }
}
