//! Typed Signer
//!
//! EIP-712 typed structured data hashing and signing, with an EIP-5267
//! domain audit.
//!
//! # Architecture
//!
//! - **eip712**: type registry, encoding, struct hashing, domain separator,
//!   digest, secp256k1 signing/recovery and the domain field audit
//! - **config**: strictness and logging options
//! - **error**: serializable crate-level error for callers
//! - **utils**: keccak256, hex and EIP-55 helpers, structured logging
//!
//! Every operation is a pure function of its inputs. The only shared state is
//! the per-registry type hash cache and the logger's minimum level.
//!
//! # Example
//!
//! ```rust,ignore
//! use typed_signer::eip712::{audit, TypedData};
//!
//! let typed_data = TypedData::from_json(&json)?;
//! let report = audit(&typed_data.domain, &remote_domain);
//! if report.is_consistent() {
//!     let signature = typed_data.sign(&private_key)?;
//!     println!("{}", signature.to_hex());
//! }
//! ```

pub mod config;
pub mod eip712;
pub mod error;
pub mod serde_bytes;
pub mod utils;

pub use config::SignerConfig;
pub use error::{ErrorCode, SignerError, SignerResult};

// Re-export the crypto helpers used by the binary and integration tests
pub use utils::crypto::{keccak256, to_checksum_address};
