pub mod aggregate;

pub use aggregate::{Network, NetworkCapabilities, NetworkDto, NetworkId};
