//! EIP-712 Typed Data Signing
//!
//! Typed structured data hashing and signing, plus the EIP-5267 domain audit
//! that checks a signer's domain against what the verifying contract hashes.
//!
//! # Reference
//! - <https://eips.ethereum.org/EIPS/eip-712>
//! - <https://eips.ethereum.org/EIPS/eip-5267>
//!
//! # Example
//! ```rust,ignore
//! use typed_signer::eip712::TypedData;
//!
//! let typed_data = TypedData::from_json(json_string)?;
//! let digest = typed_data.hash()?;
//! let signature = typed_data.sign(&private_key)?;
//! ```

pub mod audit;
pub mod domain;
pub mod encoder;
pub mod hasher;
pub mod numeric;
pub mod registry;
pub mod signer;
pub mod typed_data;
pub mod types;
pub mod value;

pub use audit::*;
pub use domain::*;
pub use encoder::*;
pub use hasher::*;
pub use numeric::{I256, U256};
pub use registry::*;
pub use signer::*;
pub use typed_data::*;
pub use types::*;
pub use value::*;

#[cfg(test)]
mod tests;
