//! Utilities Module
//!
//! Hashing, hex and address helpers plus the crate's logger.

pub mod crypto;
pub mod logging;

pub use crypto::*;
