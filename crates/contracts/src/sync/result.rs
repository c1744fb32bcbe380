use super::credentials::SessionArtifacts;
use super::error::SyncError;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// One normalized record from a network, campaign/coupon/order fields
/// flattened into the common schema.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CouponRecord {
    pub campaign_id: String,
    pub campaign_name: Option<String>,
    pub code: String,
    pub order_id: Option<String>,
    pub order_date: Option<NaiveDate>,
    /// Commission owed to the affiliate
    pub affiliate_amount: f64,
    /// Gross order value at the merchant
    pub order_amount: f64,
    pub currency: Option<String>,
    pub quantity: i32,
    pub status: Option<String>,
}

/// Aggregated payload of a data sync.
/// `total` stays authoritative even when `data` was truncated by a
/// caller-imposed limit. Affiliate commission and gross order amount are
/// reported as distinct sums, never folded into one figure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CouponData {
    pub data: Vec<CouponRecord>,
    pub total: i64,
    pub campaigns: i64,
    pub coupons: i64,
    pub purchases: i64,
    pub revenue_affiliate: f64,
    pub revenue_order_amount: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session: Option<SessionArtifacts>,
}

impl CouponData {
    /// Build the payload from normalized records, computing the two
    /// revenue sums and distinct campaign/coupon counts.
    pub fn aggregate(records: Vec<CouponRecord>) -> Self {
        let campaigns: BTreeSet<&str> =
            records.iter().map(|r| r.campaign_id.as_str()).collect();
        let coupons: BTreeSet<&str> = records.iter().map(|r| r.code.as_str()).collect();
        let purchases = records.iter().filter(|r| r.order_id.is_some()).count() as i64;
        let revenue_affiliate = records.iter().map(|r| r.affiliate_amount).sum();
        let revenue_order_amount = records.iter().map(|r| r.order_amount).sum();
        Self {
            total: records.len() as i64,
            campaigns: campaigns.len() as i64,
            coupons: coupons.len() as i64,
            purchases,
            revenue_affiliate,
            revenue_order_amount,
            data: records,
            user_id: None,
            session: None,
        }
    }
}

/// Uniform envelope every network service returns
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncResult {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<CouponData>,
}

impl SyncResult {
    pub fn ok(message: impl Into<String>, data: CouponData) -> Self {
        Self {
            success: true,
            message: message.into(),
            data: Some(data),
        }
    }

    pub fn fail(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            data: None,
        }
    }
}

impl From<SyncError> for SyncResult {
    fn from(err: SyncError) -> Self {
        Self::fail(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(affiliate: f64, order: f64) -> CouponRecord {
        CouponRecord {
            campaign_id: "c1".into(),
            campaign_name: None,
            code: "SAVE10".into(),
            order_id: Some("o1".into()),
            order_date: None,
            affiliate_amount: affiliate,
            order_amount: order,
            currency: Some("USD".into()),
            quantity: 1,
            status: None,
        }
    }

    #[test]
    fn affiliate_and_order_revenue_stay_separate() {
        let data = CouponData::aggregate(vec![record(10.0, 100.0), record(5.0, 50.0)]);
        assert_eq!(data.revenue_affiliate, 15.0);
        assert_eq!(data.revenue_order_amount, 150.0);
        assert_eq!(data.total, 2);
    }

    #[test]
    fn distinct_counts() {
        let mut second = record(1.0, 2.0);
        second.campaign_id = "c2".into();
        second.code = "SAVE20".into();
        second.order_id = None;
        let data = CouponData::aggregate(vec![record(1.0, 2.0), record(1.0, 2.0), second]);
        assert_eq!(data.campaigns, 2);
        assert_eq!(data.coupons, 2);
        assert_eq!(data.purchases, 2);
    }

    #[test]
    fn sync_error_maps_to_tagged_failure() {
        let result: SyncResult = SyncError::SessionExpired.into();
        assert!(!result.success);
        assert!(result.message.contains("session_expired"));
        assert!(result.data.is_none());
    }
}
