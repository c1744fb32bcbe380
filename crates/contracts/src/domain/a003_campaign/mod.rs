pub mod aggregate;

pub use aggregate::{Campaign, CampaignId};
