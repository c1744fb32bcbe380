pub mod common;

pub mod a001_network;
pub mod a002_network_connection;
pub mod a003_campaign;
pub mod a004_coupon;
pub mod a005_purchase;
pub mod a006_plan;
pub mod a007_subscription;
pub mod a008_usage_window;
pub mod a009_sync_schedule;
pub mod a010_sync_log;
