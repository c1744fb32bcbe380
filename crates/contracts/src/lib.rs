//! Shared contract types for the affiliate network sync engine.
//!
//! Everything the backend exposes across module boundaries lives here:
//! domain aggregates, the sync request/response envelope, and the sync
//! error taxonomy.

pub mod domain;
pub mod sync;
