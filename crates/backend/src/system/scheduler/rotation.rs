use chrono::{NaiveDate, Utc};
use tokio::time::MissedTickBehavior;

use crate::domain::{a008_usage_window, a009_sync_schedule};

/// Housekeeping loop: re-opens usage windows whose period has ended and
/// zeroes every schedule's daily run counter when the UTC day changes.
pub struct RotationWorker {
    interval_seconds: u64,
    last_reset_day: Option<NaiveDate>,
}

impl RotationWorker {
    pub fn new(interval_seconds: u64) -> Self {
        Self {
            interval_seconds,
            last_reset_day: None,
        }
    }

    pub async fn run(mut self) {
        let mut ticker = tokio::time::interval(std::time::Duration::from_secs(
            self.interval_seconds.max(1),
        ));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        tracing::info!(
            "Rotation worker started, pass every {}s",
            self.interval_seconds
        );

        loop {
            ticker.tick().await;
            if let Err(e) = self.pass().await {
                tracing::error!("Rotation pass failed: {}", e);
            }
        }
    }

    async fn pass(&mut self) -> anyhow::Result<()> {
        let now = Utc::now();

        let rotated = a008_usage_window::repository::rotate_expired(now).await?;
        if rotated > 0 {
            tracing::info!("Rotated {} expired usage window(s)", rotated);
        }

        let today = now.date_naive();
        if day_rolled_over(self.last_reset_day, today) {
            // First pass after startup counts as a rollover on purpose:
            // a counter left over from yesterday must not survive a restart
            let reset = a009_sync_schedule::repository::reset_runs_today().await?;
            if reset > 0 {
                tracing::info!("Reset runs_today on {} schedule(s)", reset);
            }
            self.last_reset_day = Some(today);
        }
        Ok(())
    }
}

fn day_rolled_over(last: Option<NaiveDate>, today: NaiveDate) -> bool {
    match last {
        Some(day) => day != today,
        None => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rollover_fires_on_startup_and_on_day_change() {
        let aug26 = NaiveDate::from_ymd_opt(2026, 8, 26).unwrap();
        let aug27 = NaiveDate::from_ymd_opt(2026, 8, 27).unwrap();
        assert!(day_rolled_over(None, aug27));
        assert!(day_rolled_over(Some(aug26), aug27));
        assert!(!day_rolled_over(Some(aug27), aug27));
    }
}
