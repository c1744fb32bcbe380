pub mod domain;
pub mod shared;
pub mod sync;
pub mod system;
