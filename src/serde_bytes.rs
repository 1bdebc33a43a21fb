//! Serde helpers for hex byte arrays and integer quantities
//!
//! Used by the domain and EIP-5267 types, whose JSON carries 32-byte values as
//! `0x` hex and integers as either JSON numbers or decimal/hex strings.

use crate::eip712::numeric::U256;
use crate::utils::crypto::decode_hex;
use serde::{Deserialize, Deserializer, Serializer};

fn parse_quantity<E: serde::de::Error>(value: &serde_json::Value) -> Result<U256, E> {
    match value {
        serde_json::Value::Number(n) => n
            .as_u64()
            .map(U256::from_u64)
            .ok_or_else(|| E::custom(format!("expected a non-negative integer, got {}", n))),
        serde_json::Value::String(s) => {
            let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
                Some(digits) => U256::from_hex_str(digits),
                None => U256::from_dec_str(s),
            };
            parsed.ok_or_else(|| E::custom(format!("invalid integer: {}", s)))
        }
        other => Err(E::custom(format!("expected integer, got {}", other))),
    }
}

fn serialize_u256<S: Serializer>(value: &U256, serializer: S) -> Result<S::Ok, S::Error> {
    if value.bits() <= 64 {
        serializer.serialize_u64(value.0[0])
    } else {
        serializer.serialize_str(&value.to_string())
    }
}

/// Right-pad up to 32 bytes of hex into a `bytes32` value
fn parse_bytes32<E: serde::de::Error>(s: &str) -> Result<[u8; 32], E> {
    let bytes = decode_hex(s).map_err(E::custom)?;
    if bytes.len() > 32 {
        return Err(E::custom(format!("expected at most 32 bytes, got {}", bytes.len())));
    }
    let mut out = [0u8; 32];
    out[..bytes.len()].copy_from_slice(&bytes);
    Ok(out)
}

/// `U256` as a JSON number (when it fits u64) or a decimal string
pub mod quantity {
    use super::*;

    pub fn serialize<S: Serializer>(value: &U256, serializer: S) -> Result<S::Ok, S::Error> {
        serialize_u256(value, serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<U256, D::Error> {
        let value = serde_json::Value::deserialize(deserializer)?;
        parse_quantity(&value)
    }
}

/// `Option<U256>`; JSON `null` reads as `None`
pub mod quantity_option {
    use super::*;

    pub fn serialize<S: Serializer>(value: &Option<U256>, serializer: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(v) => serialize_u256(v, serializer),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<U256>, D::Error> {
        match Option::<serde_json::Value>::deserialize(deserializer)? {
            None | Some(serde_json::Value::Null) => Ok(None),
            Some(value) => parse_quantity(&value).map(Some),
        }
    }
}

/// `Vec<U256>`
pub mod quantity_vec {
    use super::*;
    use serde::ser::SerializeSeq;

    pub fn serialize<S: Serializer>(values: &[U256], serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(values.len()))?;
        for v in values {
            if v.bits() <= 64 {
                seq.serialize_element(&v.0[0])?;
            } else {
                seq.serialize_element(&v.to_string())?;
            }
        }
        seq.end()
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<U256>, D::Error> {
        let values = Vec::<serde_json::Value>::deserialize(deserializer)?;
        values.iter().map(|v| parse_quantity::<D::Error>(v)).collect()
    }
}

/// `[u8; 32]` as `0x` hex; shorter input is right-padded
pub mod bytes32 {
    use super::*;

    pub fn serialize<S: Serializer>(bytes: &[u8; 32], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format!("0x{}", hex::encode(bytes)))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<[u8; 32], D::Error> {
        let s = String::deserialize(deserializer)?;
        parse_bytes32(&s)
    }
}

/// `Option<[u8; 32]>`; JSON `null` reads as `None`
pub mod bytes32_option {
    use super::*;

    pub fn serialize<S: Serializer>(bytes: &Option<[u8; 32]>, serializer: S) -> Result<S::Ok, S::Error> {
        match bytes {
            Some(b) => serializer.serialize_str(&format!("0x{}", hex::encode(b))),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<[u8; 32]>, D::Error> {
        match Option::<String>::deserialize(deserializer)? {
            Some(s) => parse_bytes32(&s).map(Some),
            None => Ok(None),
        }
    }
}

/// EIP-5267 `fields` byte: `"0x0f"` or a JSON integer
pub mod fields_byte {
    use super::*;

    pub fn serialize<S: Serializer>(bits: &u8, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format!("0x{:02x}", bits))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u8, D::Error> {
        let value = serde_json::Value::deserialize(deserializer)?;
        let parsed = match &value {
            serde_json::Value::String(s) => {
                let bytes = decode_hex(s).map_err(serde::de::Error::custom)?;
                match bytes.as_slice() {
                    [b] => Some(*b),
                    _ => None,
                }
            }
            serde_json::Value::Number(n) => n.as_u64().and_then(|v| u8::try_from(v).ok()),
            _ => None,
        };
        parsed.ok_or_else(|| serde::de::Error::custom(format!("expected a single byte, got {}", value)))
    }
}

#[cfg(test)]
mod tests {
    use serde::{Deserialize, Serialize};

    #[derive(Serialize, Deserialize)]
    struct Sample {
        #[serde(with = "super::quantity")]
        id: crate::eip712::numeric::U256,
        #[serde(default, with = "super::bytes32_option")]
        salt: Option<[u8; 32]>,
        #[serde(with = "super::fields_byte")]
        fields: u8,
    }

    #[test]
    fn test_quantity_forms() {
        for input in [r#"{"id":137,"fields":"0x0f"}"#, r#"{"id":"137","fields":15}"#, r#"{"id":"0x89","fields":"0f"}"#] {
            let sample: Sample = serde_json::from_str(input).unwrap();
            assert_eq!(sample.id.0[0], 137);
            assert_eq!(sample.fields, 0x0f);
            assert!(sample.salt.is_none());
        }
    }

    #[test]
    fn test_short_salt_is_right_padded() {
        let sample: Sample =
            serde_json::from_str(r#"{"id":1,"fields":1,"salt":"0x646563616662656566"}"#).unwrap();
        let salt = sample.salt.unwrap();
        assert_eq!(&salt[..9], b"decafbeef");
        assert!(salt[9..].iter().all(|b| *b == 0));
    }

    #[test]
    fn test_rejects_bad_values() {
        assert!(serde_json::from_str::<Sample>(r#"{"id":-1,"fields":1}"#).is_err());
        assert!(serde_json::from_str::<Sample>(r#"{"id":1,"fields":256}"#).is_err());
        assert!(serde_json::from_str::<Sample>(r#"{"id":1,"fields":"0x0f0f"}"#).is_err());
        let long = format!(r#"{{"id":1,"fields":1,"salt":"0x{}"}}"#, "00".repeat(33));
        assert!(serde_json::from_str::<Sample>(&long).is_err());
    }

    #[test]
    fn test_serialize_shapes() {
        let sample = Sample {
            id: crate::eip712::numeric::U256::from_u64(5),
            salt: None,
            fields: 0x1f,
        };
        let json = serde_json::to_value(&sample).unwrap();
        assert_eq!(json["id"], 5);
        assert_eq!(json["fields"], "0x1f");
    }
}
