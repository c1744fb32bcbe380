//! Shared request/response types for the network sync contract

pub mod config;
pub mod cookie_jar;
pub mod credentials;
pub mod error;
pub mod result;

pub use config::SyncConfig;
pub use cookie_jar::CookieJar;
pub use credentials::{Credentials, SessionArtifacts};
pub use error::SyncError;
pub use result::{CouponData, CouponRecord, SyncResult};
