//! Ledger module containing member management and payment tracking

pub mod core;
pub mod members;
pub mod payments;
pub mod roster;

pub use self::core::*;
pub use members::*;
pub use payments::*;
pub use roster::*;
