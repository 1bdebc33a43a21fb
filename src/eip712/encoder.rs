//! EIP-712 Atomic Encoding
//!
//! Maps a single atomic or dynamic value to the 32-byte word it contributes
//! to its parent's encoding.

use super::types::*;
use super::value::{Eip712Value, Scalar};
use crate::utils::crypto::keccak256;

/// Encode an atomic value into one word.
///
/// - `address`: left-padded
/// - `bool`: 0 or 1, left-padded
/// - `uintN`/`intN`: big-endian, sign-extended for negative `intN`
/// - `bytesN`: left-aligned, right-padded with zeros
pub fn encode_atomic(atomic: AtomicType, value: &Eip712Value, path: &str) -> Result<[u8; 32], Eip712Error> {
    let mut word = [0u8; 32];

    match (atomic, value) {
        (AtomicType::Address, Eip712Value::Scalar(Scalar::Address(addr))) => {
            word[12..].copy_from_slice(addr.as_bytes());
        }
        (AtomicType::Bool, Eip712Value::Scalar(Scalar::Bool(b))) => {
            word[31] = *b as u8;
        }
        (AtomicType::Uint(bits), Eip712Value::Scalar(Scalar::Integer(n))) => {
            if !n.fits_unsigned(bits as u32) {
                return Err(out_of_range(path, atomic, n));
            }
            word = n.magnitude.to_be_bytes();
        }
        (AtomicType::Int(bits), Eip712Value::Scalar(Scalar::Integer(n))) => {
            if !n.fits_signed(bits as u32) {
                return Err(out_of_range(path, atomic, n));
            }
            word = n.to_twos_complement();
        }
        (AtomicType::FixedBytes(size), Eip712Value::Bytes(bytes)) => {
            if bytes.len() > size as usize {
                return Err(Eip712Error::ValueOutOfRange {
                    path: path.to_string(),
                    type_name: atomic.to_string(),
                    value: format!("{} bytes", bytes.len()),
                });
            }
            word[..bytes.len()].copy_from_slice(bytes);
        }
        (_, other) => return Err(Eip712Error::mismatch(path, atomic, other.kind())),
    }

    Ok(word)
}

/// Dynamic values contribute the keccak256 of their raw content
/// (UTF-8 bytes for `string`).
pub fn encode_dynamic(dynamic: DynamicType, value: &Eip712Value, path: &str) -> Result<[u8; 32], Eip712Error> {
    match (dynamic, value) {
        (DynamicType::String, Eip712Value::Scalar(Scalar::String(s))) => Ok(keccak256(s.as_bytes())),
        (DynamicType::Bytes, Eip712Value::Bytes(bytes)) => Ok(keccak256(bytes)),
        (DynamicType::String, other) => Err(Eip712Error::mismatch(path, "string", other.kind())),
        (DynamicType::Bytes, other) => Err(Eip712Error::mismatch(path, "bytes", other.kind())),
    }
}

/// Encode a value against an atomic or dynamic type tag.
///
/// Struct and array tags need a registry; use `hash_struct` for those.
pub fn encode(type_tag: &str, value: &Eip712Value) -> Result<[u8; 32], Eip712Error> {
    match FieldType::parse(type_tag)? {
        FieldType::Atomic(atomic) => encode_atomic(atomic, value, type_tag),
        FieldType::Dynamic(dynamic) => encode_dynamic(dynamic, value, type_tag),
        _ => Err(Eip712Error::InvalidType(format!(
            "{}: not an atomic or dynamic type",
            type_tag
        ))),
    }
}

fn out_of_range(path: &str, atomic: AtomicType, value: &impl std::fmt::Display) -> Eip712Error {
    Eip712Error::ValueOutOfRange {
        path: path.to_string(),
        type_name: atomic.to_string(),
        value: value.to_string(),
    }
}
