pub mod aggregate;

pub use aggregate::{NetworkConnection, NetworkConnectionDto, NetworkConnectionId};
