//! Repository implementations for database operations

pub mod signals;
pub mod whales;

pub use signals::*;
pub use whales::*;
