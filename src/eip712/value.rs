//! EIP-712 Values
//!
//! The closed value model the encoder works on, plus schema-directed
//! conversion from the JSON shape wallets exchange.

use super::numeric::{I256, U256};
use super::registry::TypeRegistry;
use super::types::*;
use crate::utils::crypto::{decode_hex, to_checksum_address};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// A 20-byte account address
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
pub struct Address(pub [u8; 20]);

impl Address {
    pub const ZERO: Address = Address([0u8; 20]);

    /// Parse a hex address (with or without `0x`).
    ///
    /// All-lowercase and all-uppercase input is accepted as is; mixed case must
    /// carry a valid EIP-55 checksum.
    pub fn parse(s: &str) -> Result<Self, Eip712Error> {
        let trimmed = s.trim();
        let body = trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
            .unwrap_or(trimmed);

        if body.len() != 40 {
            return Err(Eip712Error::InvalidAddress(format!(
                "invalid length: expected 40 hex chars, got {}",
                body.len()
            )));
        }

        let bytes = hex::decode(body)
            .map_err(|e| Eip712Error::InvalidAddress(format!("invalid hex: {}", e)))?;
        let mut out = [0u8; 20];
        out.copy_from_slice(&bytes);
        let address = Address(out);

        let has_lower = body.chars().any(|c| c.is_ascii_lowercase());
        let has_upper = body.chars().any(|c| c.is_ascii_uppercase());
        if has_lower && has_upper {
            let expected = address.to_checksum();
            if expected[2..] != *body {
                return Err(Eip712Error::InvalidAddress(format!(
                    "checksum mismatch: {} (expected {})",
                    trimmed, expected
                )));
            }
        }

        Ok(address)
    }

    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    /// EIP-55 checksummed form
    pub fn to_checksum(&self) -> String {
        to_checksum_address(&self.0)
    }
}

impl FromStr for Address {
    type Err = Eip712Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Address::parse(s)
    }
}

impl From<[u8; 20]> for Address {
    fn from(bytes: [u8; 20]) -> Self {
        Address(bytes)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_checksum())
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self.to_checksum())
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_checksum())
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Address::parse(&s).map_err(serde::de::Error::custom)
    }
}

/// Single-word values
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scalar {
    Bool(bool),
    /// Any integer; width and sign are checked against the field's type at encode time
    Integer(I256),
    Address(Address),
    String(String),
}

/// A value to be encoded against a field type
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Eip712Value {
    Scalar(Scalar),
    /// Raw bytes for `bytes` and `bytesN`
    Bytes(Vec<u8>),
    Struct(StructValue),
    Array(Vec<Eip712Value>),
}

impl Eip712Value {
    pub fn bool(value: bool) -> Self {
        Eip712Value::Scalar(Scalar::Bool(value))
    }

    pub fn uint(value: u64) -> Self {
        Eip712Value::Scalar(Scalar::Integer(I256::from_unsigned(U256::from_u64(value))))
    }

    pub fn int(value: i64) -> Self {
        Eip712Value::Scalar(Scalar::Integer(I256::from_i64(value)))
    }

    pub fn integer(value: I256) -> Self {
        Eip712Value::Scalar(Scalar::Integer(value))
    }

    pub fn address(value: Address) -> Self {
        Eip712Value::Scalar(Scalar::Address(value))
    }

    pub fn string(value: impl Into<String>) -> Self {
        Eip712Value::Scalar(Scalar::String(value.into()))
    }

    pub fn bytes(value: impl Into<Vec<u8>>) -> Self {
        Eip712Value::Bytes(value.into())
    }

    /// Short shape name used in type-mismatch errors
    pub fn kind(&self) -> &'static str {
        match self {
            Eip712Value::Scalar(Scalar::Bool(_)) => "bool",
            Eip712Value::Scalar(Scalar::Integer(_)) => "integer",
            Eip712Value::Scalar(Scalar::Address(_)) => "address",
            Eip712Value::Scalar(Scalar::String(_)) => "string",
            Eip712Value::Bytes(_) => "bytes",
            Eip712Value::Struct(_) => "struct",
            Eip712Value::Array(_) => "array",
        }
    }

    /// Convert JSON into a value shaped by `field_type`.
    ///
    /// `path` names the value in error messages (e.g. `Mail.from.wallet`).
    pub fn from_json(
        field_type: &FieldType,
        json: &serde_json::Value,
        registry: &TypeRegistry,
        path: &str,
    ) -> Result<Self, Eip712Error> {
        match field_type {
            FieldType::Atomic(atomic) => atomic_from_json(*atomic, json, path),
            FieldType::Dynamic(DynamicType::String) => match json {
                serde_json::Value::String(s) => Ok(Eip712Value::string(s.clone())),
                other => Err(Eip712Error::mismatch(path, "string", json_kind(other))),
            },
            FieldType::Dynamic(DynamicType::Bytes) => {
                bytes_from_json(json, path, "bytes").map(Eip712Value::Bytes)
            }
            FieldType::Struct(name) => {
                StructValue::from_json(name, json, registry, path).map(Eip712Value::Struct)
            }
            FieldType::Array { element, .. } => {
                let items = json
                    .as_array()
                    .ok_or_else(|| Eip712Error::mismatch(path, field_type, json_kind(json)))?;
                items
                    .iter()
                    .enumerate()
                    .map(|(i, item)| Self::from_json(element, item, registry, &format!("{}[{}]", path, i)))
                    .collect::<Result<Vec<_>, _>>()
                    .map(Eip712Value::Array)
            }
        }
    }
}

impl From<StructValue> for Eip712Value {
    fn from(value: StructValue) -> Self {
        Eip712Value::Struct(value)
    }
}

impl From<Address> for Eip712Value {
    fn from(value: Address) -> Self {
        Eip712Value::address(value)
    }
}

impl From<&str> for Eip712Value {
    fn from(value: &str) -> Self {
        Eip712Value::string(value)
    }
}

impl From<bool> for Eip712Value {
    fn from(value: bool) -> Self {
        Eip712Value::bool(value)
    }
}

/// Field name -> value for one struct instance
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StructValue {
    fields: BTreeMap<String, Eip712Value>,
}

impl StructValue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Eip712Value>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Eip712Value>) {
        self.fields.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&Eip712Value> {
        self.fields.get(name)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    /// Convert a JSON object into a value of struct type `type_name`.
    pub fn from_json(
        type_name: &str,
        json: &serde_json::Value,
        registry: &TypeRegistry,
        path: &str,
    ) -> Result<Self, Eip712Error> {
        let schema = registry.schema(type_name).ok_or_else(|| Eip712Error::UnknownReference {
            type_name: path.to_string(),
            referenced: type_name.to_string(),
        })?;
        let obj = json
            .as_object()
            .ok_or_else(|| Eip712Error::mismatch(path, type_name, json_kind(json)))?;

        for key in obj.keys() {
            if schema.field(key).is_none() {
                return Err(Eip712Error::UnexpectedField(format!("{}.{}", path, key)));
            }
        }

        let mut value = StructValue::new();
        for field in &schema.fields {
            let field_path = format!("{}.{}", path, field.name);
            let raw = obj
                .get(&field.name)
                .ok_or_else(|| Eip712Error::MissingField(field_path.clone()))?;
            let converted = Eip712Value::from_json(&field.field_type, raw, registry, &field_path)?;
            value.insert(field.name.clone(), converted);
        }
        Ok(value)
    }
}

fn atomic_from_json(atomic: AtomicType, json: &serde_json::Value, path: &str) -> Result<Eip712Value, Eip712Error> {
    match atomic {
        AtomicType::Address => match json {
            serde_json::Value::String(s) => Address::parse(s)
                .map(Eip712Value::address)
                .map_err(|e| match e {
                    Eip712Error::InvalidAddress(msg) => Eip712Error::InvalidAddress(format!("{}: {}", path, msg)),
                    other => other,
                }),
            other => Err(Eip712Error::mismatch(path, atomic, json_kind(other))),
        },
        AtomicType::Bool => match json {
            serde_json::Value::Bool(b) => Ok(Eip712Value::bool(*b)),
            other => Err(Eip712Error::mismatch(path, atomic, json_kind(other))),
        },
        AtomicType::Uint(_) | AtomicType::Int(_) => integer_from_json(json, path, atomic).map(Eip712Value::integer),
        AtomicType::FixedBytes(_) => bytes_from_json(json, path, &atomic.to_string()).map(Eip712Value::Bytes),
    }
}

/// Integers arrive as JSON numbers, decimal strings or `0x` hex strings.
pub(crate) fn integer_from_json(
    json: &serde_json::Value,
    path: &str,
    expected: impl fmt::Display,
) -> Result<I256, Eip712Error> {
    match json {
        serde_json::Value::Number(n) => {
            if let Some(u) = n.as_u64() {
                Ok(I256::from_unsigned(U256::from_u64(u)))
            } else if let Some(i) = n.as_i64() {
                Ok(I256::from_i64(i))
            } else {
                Err(Eip712Error::mismatch(path, expected, format!("non-integer number {}", n)))
            }
        }
        serde_json::Value::String(s) => match I256::parse(s) {
            Some(value) => Ok(value),
            // well-formed but wider than 256 bits
            None if is_integer_literal(s) => Err(Eip712Error::ValueOutOfRange {
                path: path.to_string(),
                type_name: expected.to_string(),
                value: s.clone(),
            }),
            None => Err(Eip712Error::mismatch(path, expected, format!("non-integer string {:?}", s))),
        },
        other => Err(Eip712Error::mismatch(path, expected, json_kind(other))),
    }
}

/// `[-]digits` or `[-]0x<hex digits>`
fn is_integer_literal(s: &str) -> bool {
    let s = s.trim();
    let body = s.strip_prefix('-').unwrap_or(s);
    match body.strip_prefix("0x").or_else(|| body.strip_prefix("0X")) {
        Some(hex_digits) => !hex_digits.is_empty() && hex_digits.chars().all(|c| c.is_ascii_hexdigit()),
        None => !body.is_empty() && body.chars().all(|c| c.is_ascii_digit()),
    }
}

fn bytes_from_json(json: &serde_json::Value, path: &str, expected: &str) -> Result<Vec<u8>, Eip712Error> {
    let s = json
        .as_str()
        .ok_or_else(|| Eip712Error::mismatch(path, expected, json_kind(json)))?;
    decode_hex(s).map_err(|e| Eip712Error::mismatch(path, expected, format!("invalid hex ({})", e)))
}

fn json_kind(json: &serde_json::Value) -> &'static str {
    match json {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "bool",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod value_tests {
    use super::*;
    use serde_json::json;

    fn mail_registry() -> TypeRegistry {
        let mut registry = TypeRegistry::new();
        registry
            .register("Person", vec![
                TypedDataField::new("name", "string"),
                TypedDataField::new("wallet", "address"),
            ])
            .unwrap();
        registry
            .register("Mail", vec![
                TypedDataField::new("from", "Person"),
                TypedDataField::new("to", "Person"),
                TypedDataField::new("contents", "string"),
            ])
            .unwrap();
        registry
    }

    #[test]
    fn test_address_checksum_validation() {
        assert!(Address::parse("0xCD2a3d9F938E13CD947Ec05AbC7FE734Df8DD826").is_ok());
        assert!(Address::parse("0xcd2a3d9f938e13cd947ec05abc7fe734df8dd826").is_ok());
        assert!(Address::parse("CD2A3D9F938E13CD947EC05ABC7FE734DF8DD826").is_ok());
        // one letter flipped
        assert!(matches!(
            Address::parse("0xCD2a3d9F938E13CD947Ec05AbC7FE734Df8Dd826"),
            Err(Eip712Error::InvalidAddress(_))
        ));
        assert!(Address::parse("0x1234").is_err());
    }

    #[test]
    fn test_address_display_is_checksummed() {
        let addr = Address::parse("0xcccccccccccccccccccccccccccccccccccccccc").unwrap();
        assert_eq!(addr.to_string(), "0xCcCCccccCCCCcCCCCCCcCcCccCcCCCcCcccccccC");
    }

    #[test]
    fn test_struct_from_json() {
        let registry = mail_registry();
        let json = json!({
            "from": {"name": "Cow", "wallet": "0xCD2a3d9F938E13CD947Ec05AbC7FE734Df8DD826"},
            "to": {"name": "Bob", "wallet": "0xbBbBBBBbbBBBbbbBbbBbbbbBBbBbbbbBbBbbBBbB"},
            "contents": "Hello, Bob!"
        });
        let value = StructValue::from_json("Mail", &json, &registry, "Mail").unwrap();
        assert_eq!(value.len(), 3);
        assert_eq!(value.get("contents"), Some(&Eip712Value::string("Hello, Bob!")));
        assert!(matches!(value.get("from"), Some(Eip712Value::Struct(_))));
    }

    #[test]
    fn test_struct_from_json_missing_field() {
        let registry = mail_registry();
        let json = json!({"name": "Cow"});
        let err = StructValue::from_json("Person", &json, &registry, "Person").unwrap_err();
        assert_eq!(err, Eip712Error::MissingField("Person.wallet".to_string()));
    }

    #[test]
    fn test_struct_from_json_unexpected_field() {
        let registry = mail_registry();
        let json = json!({
            "name": "Cow",
            "wallet": "0xCD2a3d9F938E13CD947Ec05AbC7FE734Df8DD826",
            "age": 3
        });
        let err = StructValue::from_json("Person", &json, &registry, "Person").unwrap_err();
        assert_eq!(err, Eip712Error::UnexpectedField("Person.age".to_string()));
    }

    #[test]
    fn test_shape_mismatch_is_not_coerced() {
        let registry = mail_registry();
        let err = Eip712Value::from_json(&FieldType::parse("bool").unwrap(), &json!("true"), &registry, "x")
            .unwrap_err();
        assert!(matches!(err, Eip712Error::TypeMismatch { .. }));

        let err = Eip712Value::from_json(&FieldType::parse("Person").unwrap(), &json!([]), &registry, "x")
            .unwrap_err();
        assert!(matches!(err, Eip712Error::TypeMismatch { .. }));
    }

    #[test]
    fn test_integer_forms() {
        let t = FieldType::parse("int256").unwrap();
        let registry = TypeRegistry::new();
        let from_num = Eip712Value::from_json(&t, &json!(-5), &registry, "n").unwrap();
        let from_str = Eip712Value::from_json(&t, &json!("-5"), &registry, "n").unwrap();
        assert_eq!(from_num, from_str);

        let from_hex = Eip712Value::from_json(&t, &json!("0x89"), &registry, "n").unwrap();
        assert_eq!(from_hex, Eip712Value::uint(137));

        assert!(Eip712Value::from_json(&t, &json!(1.5), &registry, "n").is_err());
    }

    #[test]
    fn test_malformed_integer_string_is_a_shape_error() {
        let t = FieldType::parse("uint256").unwrap();
        let registry = TypeRegistry::new();
        let err = Eip712Value::from_json(&t, &json!("abc"), &registry, "Order.amount").unwrap_err();
        assert!(matches!(err, Eip712Error::TypeMismatch { ref path, .. } if path == "Order.amount"), "{:?}", err);
        assert!(matches!(
            Eip712Value::from_json(&t, &json!("0x"), &registry, "n"),
            Err(Eip712Error::TypeMismatch { .. })
        ));

        // 2^256 is a valid literal that no 256-bit word can hold
        let too_wide = "115792089237316195423570985008687907853269984665640564039457584007913129639936";
        assert!(matches!(
            Eip712Value::from_json(&t, &json!(too_wide), &registry, "n"),
            Err(Eip712Error::ValueOutOfRange { .. })
        ));
        assert!(matches!(
            Eip712Value::from_json(&t, &json!(format!("0x1{}", "0".repeat(64))), &registry, "n"),
            Err(Eip712Error::ValueOutOfRange { .. })
        ));
    }
}
