//! 256-bit integers for EIP-712 `uintN` / `intN` values
//!
//! Limbs are little-endian `u64`s. Only what the encoder needs is implemented:
//! parsing, bit length, and big-endian two's-complement rendering.

use std::fmt;

/// 256-bit unsigned integer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct U256(pub [u64; 4]);

impl U256 {
    pub const ZERO: U256 = U256([0, 0, 0, 0]);
    pub const MAX: U256 = U256([u64::MAX, u64::MAX, u64::MAX, u64::MAX]);

    pub fn from_u64(value: u64) -> Self {
        U256([value, 0, 0, 0])
    }

    /// Build from up to 32 big-endian bytes. Returns `None` for longer input.
    pub fn from_be_slice(bytes: &[u8]) -> Option<Self> {
        if bytes.len() > 32 {
            return None;
        }
        let mut padded = [0u8; 32];
        padded[32 - bytes.len()..].copy_from_slice(bytes);
        Some(Self::from_be_bytes(&padded))
    }

    pub fn from_be_bytes(bytes: &[u8; 32]) -> Self {
        let mut limbs = [0u64; 4];
        for (i, limb) in limbs.iter_mut().enumerate() {
            let offset = (3 - i) * 8;
            let mut chunk = [0u8; 8];
            chunk.copy_from_slice(&bytes[offset..offset + 8]);
            *limb = u64::from_be_bytes(chunk);
        }
        U256(limbs)
    }

    pub fn to_be_bytes(&self) -> [u8; 32] {
        let mut bytes = [0u8; 32];
        for i in 0..4 {
            let offset = (3 - i) * 8;
            bytes[offset..offset + 8].copy_from_slice(&self.0[i].to_be_bytes());
        }
        bytes
    }

    /// Parse a decimal string. `None` on an empty string, a non-digit, or overflow.
    pub fn from_dec_str(s: &str) -> Option<Self> {
        if s.is_empty() {
            return None;
        }
        let mut result = U256::ZERO;
        for c in s.chars() {
            let digit = c.to_digit(10)?;
            result = result.checked_mul_u64(10)?;
            result = result.checked_add(U256::from_u64(digit as u64))?;
        }
        Some(result)
    }

    /// Parse hex digits (no `0x` prefix). Odd lengths are accepted.
    pub fn from_hex_str(s: &str) -> Option<Self> {
        if s.is_empty() {
            return None;
        }
        let digits = s.trim_start_matches('0');
        if digits.len() > 64 {
            return None;
        }
        let padded = format!("{:0>64}", digits);
        let bytes = hex::decode(padded).ok()?;
        Self::from_be_slice(&bytes)
    }

    pub fn checked_add(&self, other: U256) -> Option<U256> {
        let mut result = [0u64; 4];
        let mut carry = false;
        for (i, out) in result.iter_mut().enumerate() {
            let (sum, c1) = self.0[i].overflowing_add(other.0[i]);
            let (sum, c2) = sum.overflowing_add(carry as u64);
            *out = sum;
            carry = c1 || c2;
        }
        if carry {
            None
        } else {
            Some(U256(result))
        }
    }

    pub fn checked_mul_u64(&self, other: u64) -> Option<U256> {
        let mut result = [0u64; 4];
        let mut carry = 0u128;
        for (i, out) in result.iter_mut().enumerate() {
            let prod = (self.0[i] as u128) * (other as u128) + carry;
            *out = prod as u64;
            carry = prod >> 64;
        }
        if carry != 0 {
            None
        } else {
            Some(U256(result))
        }
    }

    /// Number of significant bits (0 for zero).
    pub fn bits(&self) -> u32 {
        for i in (0..4).rev() {
            if self.0[i] != 0 {
                return (i as u32) * 64 + (64 - self.0[i].leading_zeros());
            }
        }
        0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0, 0, 0, 0]
    }

    /// `2^exp` for `exp < 256`.
    pub fn pow2(exp: u32) -> Option<U256> {
        if exp >= 256 {
            return None;
        }
        let mut limbs = [0u64; 4];
        limbs[(exp / 64) as usize] = 1u64 << (exp % 64);
        Some(U256(limbs))
    }

    /// `0x`-prefixed minimal hex.
    pub fn to_hex(&self) -> String {
        let full = hex::encode(self.to_be_bytes());
        let trimmed = full.trim_start_matches('0');
        if trimmed.is_empty() {
            "0x0".to_string()
        } else {
            format!("0x{}", trimmed)
        }
    }
}

impl From<u64> for U256 {
    fn from(value: u64) -> Self {
        U256::from_u64(value)
    }
}

impl fmt::Display for U256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_zero() {
            return write!(f, "0");
        }
        // repeated division by 10^19 on a copy of the limbs
        const CHUNK: u64 = 10_000_000_000_000_000_000;
        let mut limbs = self.0;
        let mut parts = Vec::new();
        while limbs != [0, 0, 0, 0] {
            let mut rem = 0u128;
            for limb in limbs.iter_mut().rev() {
                let cur = (rem << 64) | (*limb as u128);
                *limb = (cur / CHUNK as u128) as u64;
                rem = cur % CHUNK as u128;
            }
            parts.push(rem as u64);
        }
        let mut out = String::new();
        for (i, part) in parts.iter().rev().enumerate() {
            if i == 0 {
                out.push_str(&part.to_string());
            } else {
                out.push_str(&format!("{:019}", part));
            }
        }
        write!(f, "{}", out)
    }
}

/// 256-bit signed integer stored as sign and magnitude
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct I256 {
    pub negative: bool,
    pub magnitude: U256,
}

impl I256 {

    pub fn new(negative: bool, magnitude: U256) -> Self {
        // normalize -0
        Self { negative: negative && !magnitude.is_zero(), magnitude }
    }

    pub fn from_i64(value: i64) -> Self {
        Self::new(value < 0, U256::from_u64(value.unsigned_abs()))
    }

    pub fn from_unsigned(value: U256) -> Self {
        Self { negative: false, magnitude: value }
    }

    /// Parse `[-]digits` or `[-]0x<hex>`.
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        let (negative, body) = match s.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, s),
        };
        let magnitude = match body.strip_prefix("0x").or_else(|| body.strip_prefix("0X")) {
            Some(hex_digits) => U256::from_hex_str(hex_digits)?,
            None => U256::from_dec_str(body)?,
        };
        Some(Self::new(negative, magnitude))
    }

    /// Does the value fit `uintN`?
    pub fn fits_unsigned(&self, bits: u32) -> bool {
        !self.negative && self.magnitude.bits() <= bits
    }

    /// Does the value fit `intN`? Range is `[-2^(N-1), 2^(N-1) - 1]`.
    pub fn fits_signed(&self, bits: u32) -> bool {
        if bits == 0 {
            return false;
        }
        if !self.negative {
            return self.magnitude.bits() < bits;
        }
        match U256::pow2(bits - 1) {
            Some(limit) => self.magnitude.bits() < bits || self.magnitude == limit,
            None => false,
        }
    }

    /// Big-endian two's complement over the full 32 bytes (sign-extended).
    pub fn to_twos_complement(&self) -> [u8; 32] {
        let mut bytes = self.magnitude.to_be_bytes();
        if !self.negative {
            return bytes;
        }
        for b in bytes.iter_mut() {
            *b = !*b;
        }
        for b in bytes.iter_mut().rev() {
            let (sum, carry) = b.overflowing_add(1);
            *b = sum;
            if !carry {
                break;
            }
        }
        bytes
    }
}

impl fmt::Display for I256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.negative {
            write!(f, "-{}", self.magnitude)
        } else {
            write!(f, "{}", self.magnitude)
        }
    }
}
