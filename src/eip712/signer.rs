//! EIP-712 Signing
//!
//! Deterministic secp256k1 signing over a 32-byte digest, and recovery of the
//! signing address from `{r, s, v}`.

use super::types::*;
use super::value::Address;
use crate::config::SignerConfig;
use crate::log_debug;
use crate::utils::crypto::keccak256;
use secp256k1::ecdsa::{RecoverableSignature, RecoveryId};
use secp256k1::{Message, PublicKey, Secp256k1, SecretKey};
use serde::Serialize;

/// `v = RECOVERY_ID_OFFSET + parity`
pub const RECOVERY_ID_OFFSET: u8 = 27;

/// secp256k1 group order n, big-endian
const CURVE_ORDER: [u8; 32] = [
    0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xfe,
    0xba, 0xae, 0xdc, 0xe6, 0xaf, 0x48, 0xa0, 0x3b, 0xbf, 0xd2, 0x5e, 0x8c, 0xd0, 0x36, 0x41, 0x41,
];

/// n / 2, the largest accepted `s` under low-s rules
const HALF_CURVE_ORDER: [u8; 32] = [
    0x7f, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff,
    0x5d, 0x57, 0x6e, 0x73, 0x57, 0xa4, 0x50, 0x1d, 0xdf, 0xe9, 0x2f, 0x46, 0x68, 0x1b, 0x20, 0xa0,
];

/// EIP-712 signature
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Eip712Signature {
    /// r component (32 bytes)
    #[serde(with = "crate::serde_bytes::bytes32")]
    pub r: [u8; 32],
    /// s component (32 bytes)
    #[serde(with = "crate::serde_bytes::bytes32")]
    pub s: [u8; 32],
    /// v component, 27 or 28
    pub v: u8,
}

impl Eip712Signature {
    /// Create from raw components
    pub fn new(r: [u8; 32], s: [u8; 32], v: u8) -> Self {
        Self { r, s, v }
    }

    /// Create from 65-byte signature (r || s || v)
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, Eip712Error> {
        if bytes.len() != 65 {
            return Err(Eip712Error::InvalidSignature(format!(
                "expected 65 bytes, got {}",
                bytes.len()
            )));
        }

        let mut r = [0u8; 32];
        let mut s = [0u8; 32];
        r.copy_from_slice(&bytes[0..32]);
        s.copy_from_slice(&bytes[32..64]);
        Ok(Self { r, s, v: bytes[64] })
    }

    /// Parse `0x`-prefixed (or bare) hex of 65 bytes
    pub fn from_hex(s: &str) -> Result<Self, Eip712Error> {
        let bytes = crate::utils::crypto::decode_hex(s)
            .map_err(|e| Eip712Error::InvalidSignature(e.to_string()))?;
        Self::from_bytes(&bytes)
    }

    /// Convert to 65-byte representation (r || s || v)
    pub fn to_bytes(&self) -> [u8; 65] {
        let mut bytes = [0u8; 65];
        bytes[0..32].copy_from_slice(&self.r);
        bytes[32..64].copy_from_slice(&self.s);
        bytes[64] = self.v;
        bytes
    }

    /// Convert to hex string
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.to_bytes()))
    }

    /// Whether `s` lies in the lower half of the curve order
    pub fn is_low_s(&self) -> bool {
        self.s <= HALF_CURVE_ORDER
    }
}

impl std::fmt::Display for Eip712Signature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_hex())
    }
}

fn secret_key(private_key: &[u8]) -> Result<SecretKey, Eip712Error> {
    if private_key.len() != 32 {
        return Err(Eip712Error::SigningError(format!(
            "invalid private key length: expected 32, got {}",
            private_key.len()
        )));
    }
    SecretKey::from_slice(private_key).map_err(|e| Eip712Error::SigningError(e.to_string()))
}

/// Sign a digest.
///
/// The nonce is derived per RFC 6979 and the result is always low-s, so the
/// same digest and key yield the same signature.
pub fn sign_hash(hash: &[u8; 32], private_key: &[u8]) -> Result<Eip712Signature, Eip712Error> {
    let secp = Secp256k1::signing_only();
    let secret_key = secret_key(private_key)?;
    let message = Message::from_digest(*hash);

    let (recovery_id, compact) = secp
        .sign_ecdsa_recoverable(&message, &secret_key)
        .serialize_compact();

    let mut r = [0u8; 32];
    let mut s = [0u8; 32];
    r.copy_from_slice(&compact[0..32]);
    s.copy_from_slice(&compact[32..64]);
    let v = RECOVERY_ID_OFFSET + recovery_id.to_i32() as u8;

    log_debug!("eip712::signer", "signed digest", digest = hex::encode(hash), v = v);
    Ok(Eip712Signature::new(r, s, v))
}

/// Recover the signer's address, accepting either `s` half
pub fn recover_address(hash: &[u8; 32], signature: &Eip712Signature) -> Result<Address, Eip712Error> {
    recover_address_with(hash, signature, &SignerConfig::standard())
}

/// Recover the signer's address under `config`
pub fn recover_address_with(
    hash: &[u8; 32],
    signature: &Eip712Signature,
    config: &SignerConfig,
) -> Result<Address, Eip712Error> {
    if signature.v != RECOVERY_ID_OFFSET && signature.v != RECOVERY_ID_OFFSET + 1 {
        return Err(Eip712Error::InvalidSignature(format!(
            "recovery indicator must be {} or {}, got {}",
            RECOVERY_ID_OFFSET,
            RECOVERY_ID_OFFSET + 1,
            signature.v
        )));
    }
    for (label, scalar) in [("r", &signature.r), ("s", &signature.s)] {
        if scalar.iter().all(|b| *b == 0) || *scalar >= CURVE_ORDER {
            return Err(Eip712Error::InvalidSignature(format!(
                "{} is outside the curve scalar range",
                label
            )));
        }
    }
    if config.require_low_s && !signature.is_low_s() {
        return Err(Eip712Error::InvalidSignature("s is in the upper half of the curve order".to_string()));
    }

    let recovery_id = RecoveryId::from_i32((signature.v - RECOVERY_ID_OFFSET) as i32)
        .map_err(|e| Eip712Error::InvalidSignature(e.to_string()))?;

    let mut compact = [0u8; 64];
    compact[0..32].copy_from_slice(&signature.r);
    compact[32..64].copy_from_slice(&signature.s);

    let recoverable = RecoverableSignature::from_compact(&compact, recovery_id)
        .map_err(|e| Eip712Error::InvalidSignature(e.to_string()))?;

    let public_key = Secp256k1::verification_only()
        .recover_ecdsa(&Message::from_digest(*hash), &recoverable)
        .map_err(|e| Eip712Error::InvalidSignature(e.to_string()))?;

    let address = public_key_to_address(&public_key);
    log_debug!("eip712::signer", "recovered signer", digest = hex::encode(hash), signer = address);
    Ok(address)
}

/// Check that `signature` over `hash` was made by `expected`.
///
/// Addresses compare as bytes; checksum casing was already validated when
/// `expected` was parsed.
pub fn verify_signature(
    hash: &[u8; 32],
    signature: &Eip712Signature,
    expected: &Address,
) -> Result<bool, Eip712Error> {
    Ok(recover_address(hash, signature)? == *expected)
}

/// Same as `verify_signature`, honoring `config.require_low_s`
pub fn verify_signature_with(
    hash: &[u8; 32],
    signature: &Eip712Signature,
    expected: &Address,
    config: &SignerConfig,
) -> Result<bool, Eip712Error> {
    Ok(recover_address_with(hash, signature, config)? == *expected)
}

/// Derive the address controlled by a private key
pub fn address_from_private_key(private_key: &[u8]) -> Result<Address, Eip712Error> {
    let secret_key = secret_key(private_key)?;
    let public_key = PublicKey::from_secret_key(&Secp256k1::signing_only(), &secret_key);
    Ok(public_key_to_address(&public_key))
}

/// Last 20 bytes of keccak256 over the uncompressed point (without the 0x04 tag)
pub fn public_key_to_address(public_key: &PublicKey) -> Address {
    let uncompressed = public_key.serialize_uncompressed();
    let hash = keccak256(&uncompressed[1..]);
    let mut address = [0u8; 20];
    address.copy_from_slice(&hash[12..]);
    Address(address)
}
