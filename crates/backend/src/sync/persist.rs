use contracts::domain::a003_campaign::aggregate::Campaign;
use contracts::domain::a004_coupon::aggregate::Coupon;
use contracts::domain::a005_purchase::aggregate::Purchase;
use contracts::sync::CouponData;
use std::collections::BTreeSet;
use uuid::Uuid;

use crate::domain::{a002_network_connection, a003_campaign, a004_coupon, a005_purchase};

/// Persist one sync's normalized records as campaign, coupon and
/// purchase aggregates. Upserts by natural key, so re-running a sync
/// over the same date range never duplicates rows.
pub async fn store_coupon_data(
    data: &CouponData,
    user_id: Uuid,
    network_id: Uuid,
) -> anyhow::Result<()> {
    let connection = a002_network_connection::repository::get_by_user_and_network(
        user_id, network_id,
    )
    .await?
    .ok_or_else(|| anyhow::anyhow!("No connection for user {} on network {}", user_id, network_id))?;
    let connection_id = connection.base.id.value();

    let mut seen_campaigns: BTreeSet<&str> = BTreeSet::new();
    let mut seen_coupons: BTreeSet<(String, String)> = BTreeSet::new();

    for record in &data.data {
        if seen_campaigns.insert(record.campaign_id.as_str()) {
            let mut campaign = Campaign::new_for_insert(
                connection_id,
                user_id,
                network_id,
                record.campaign_id.clone(),
                record
                    .campaign_name
                    .clone()
                    .unwrap_or_else(|| record.campaign_id.clone()),
            );
            a003_campaign::repository::upsert(&mut campaign).await?;
        }

        let coupon_key = (record.campaign_id.clone(), record.code.clone());
        if seen_coupons.insert(coupon_key) {
            let mut coupon = Coupon::new_for_insert(
                connection_id,
                user_id,
                network_id,
                record.campaign_id.clone(),
                record.code.clone(),
            );
            coupon.status = record.status.clone();
            a004_coupon::repository::upsert(&mut coupon).await?;
        }

        if let (Some(order_id), Some(order_date)) = (&record.order_id, record.order_date) {
            let mut purchase = Purchase::new_for_insert(
                connection_id,
                user_id,
                network_id,
                record.campaign_id.clone(),
                record.code.clone(),
                order_id.clone(),
                order_date,
                record.affiliate_amount,
                record.order_amount,
                record.currency.clone().unwrap_or_default(),
                record.quantity,
            );
            a005_purchase::repository::upsert(&mut purchase).await?;
        }
    }

    tracing::info!(
        "Stored sync result: {} records, {} campaigns, {} coupons, {} purchases",
        data.total,
        data.campaigns,
        data.coupons,
        data.purchases
    );
    Ok(())
}
