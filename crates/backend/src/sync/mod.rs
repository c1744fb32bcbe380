pub mod limits;
pub mod networks;
pub mod persist;
pub mod service;
pub mod transport;
