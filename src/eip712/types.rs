//! EIP-712 Type Definitions
//!
//! Field schemas, the type-tag grammar, and the error type shared by the
//! whole module.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A field in a struct type definition
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TypedDataField {
    /// The name of the field
    pub name: String,
    /// The type of the field (e.g., "address", "uint256", "Person[]")
    #[serde(rename = "type")]
    pub type_name: String,
}

impl TypedDataField {
    pub fn new(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
        }
    }
}

/// Fixed-size types that encode to a single word
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AtomicType {
    Address,
    Bool,
    /// `uintN`, N in 8..=256 step 8
    Uint(u16),
    /// `intN`, N in 8..=256 step 8
    Int(u16),
    /// `bytesN`, N in 1..=32
    FixedBytes(u8),
}

impl AtomicType {
    /// Parse an atomic type tag. Returns `None` for anything else.
    pub fn parse(tag: &str) -> Option<Self> {
        match tag {
            "address" => return Some(AtomicType::Address),
            "bool" => return Some(AtomicType::Bool),
            _ => {}
        }
        if let Some(bits) = tag.strip_prefix("uint") {
            return parse_int_width(bits).map(AtomicType::Uint);
        }
        if let Some(bits) = tag.strip_prefix("int") {
            return parse_int_width(bits).map(AtomicType::Int);
        }
        if let Some(size) = tag.strip_prefix("bytes") {
            if size.is_empty() || size.starts_with('0') {
                return None;
            }
            let n: u8 = size.parse().ok()?;
            if (1..=32).contains(&n) {
                return Some(AtomicType::FixedBytes(n));
            }
        }
        None
    }
}

fn parse_int_width(bits: &str) -> Option<u16> {
    if bits.is_empty() || bits.starts_with('0') {
        return None;
    }
    let n: u16 = bits.parse().ok()?;
    if n > 0 && n <= 256 && n % 8 == 0 {
        Some(n)
    } else {
        None
    }
}

impl fmt::Display for AtomicType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AtomicType::Address => write!(f, "address"),
            AtomicType::Bool => write!(f, "bool"),
            AtomicType::Uint(bits) => write!(f, "uint{}", bits),
            AtomicType::Int(bits) => write!(f, "int{}", bits),
            AtomicType::FixedBytes(n) => write!(f, "bytes{}", n),
        }
    }
}

/// Variable-length types whose word is the keccak of their content
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DynamicType {
    Bytes,
    String,
}

/// Parsed form of a field's type tag
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FieldType {
    Atomic(AtomicType),
    Dynamic(DynamicType),
    /// Reference to a registered struct type
    Struct(String),
    /// `T[]` (len = None) or `T[N]`
    Array { element: Box<FieldType>, len: Option<usize> },
}

impl FieldType {
    /// Parse a type tag such as `uint256`, `Person`, `bytes32[4]`, `Person[][2]`.
    ///
    /// Struct names are not resolved here; see `TypeRegistry`.
    pub fn parse(tag: &str) -> Result<Self, Eip712Error> {
        let tag = tag.trim();
        if tag.is_empty() {
            return Err(Eip712Error::InvalidType(tag.to_string()));
        }

        if tag.ends_with(']') {
            let open = tag
                .rfind('[')
                .ok_or_else(|| Eip712Error::InvalidType(tag.to_string()))?;
            let arity = &tag[open + 1..tag.len() - 1];
            let len = if arity.is_empty() {
                None
            } else if arity.chars().all(|c| c.is_ascii_digit()) {
                Some(arity.parse::<usize>().map_err(|_| {
                    Eip712Error::InvalidType(format!("{}: array size out of range", tag))
                })?)
            } else {
                return Err(Eip712Error::InvalidType(format!(
                    "{}: array size must be a non-negative integer",
                    tag
                )));
            };
            let element = Self::parse(&tag[..open])?;
            return Ok(FieldType::Array {
                element: Box::new(element),
                len,
            });
        }

        if tag.contains('[') || tag.contains(']') {
            return Err(Eip712Error::InvalidType(tag.to_string()));
        }

        match tag {
            "bytes" => return Ok(FieldType::Dynamic(DynamicType::Bytes)),
            "string" => return Ok(FieldType::Dynamic(DynamicType::String)),
            _ => {}
        }

        if let Some(atomic) = AtomicType::parse(tag) {
            return Ok(FieldType::Atomic(atomic));
        }

        if is_sized_builtin_form(tag) {
            return Err(Eip712Error::InvalidType(format!("{}: unsupported width", tag)));
        }
        if !is_valid_struct_name(tag) {
            return Err(Eip712Error::InvalidType(tag.to_string()));
        }
        Ok(FieldType::Struct(tag.to_string()))
    }

    /// The innermost non-array type
    pub fn base(&self) -> &FieldType {
        let mut current = self;
        while let FieldType::Array { element, .. } = current {
            current = element;
        }
        current
    }

    /// The struct name this type refers to, looking through arrays
    pub fn struct_name(&self) -> Option<&str> {
        match self.base() {
            FieldType::Struct(name) => Some(name),
            _ => None,
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldType::Atomic(atomic) => write!(f, "{}", atomic),
            FieldType::Dynamic(DynamicType::Bytes) => write!(f, "bytes"),
            FieldType::Dynamic(DynamicType::String) => write!(f, "string"),
            FieldType::Struct(name) => write!(f, "{}", name),
            FieldType::Array { element, len: None } => write!(f, "{}[]", element),
            FieldType::Array { element, len: Some(n) } => write!(f, "{}[{}]", element, n),
        }
    }
}

/// Struct names are identifiers and may not shadow built-in type tags.
pub fn is_valid_struct_name(name: &str) -> bool {
    let mut chars = name.chars();
    let starts_ok = matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_' || c == '$');
    starts_ok
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
        && !is_atomic_type(name)
        && !is_dynamic_type(name)
        && !is_sized_builtin_form(name)
}

/// `uint<digits>`, `int<digits>` or `bytes<digits>`, whatever the width
fn is_sized_builtin_form(tag: &str) -> bool {
    ["uint", "int", "bytes"].iter().any(|prefix| {
        tag.strip_prefix(prefix)
            .is_some_and(|width| !width.is_empty() && width.chars().all(|c| c.is_ascii_digit()))
    })
}

/// Check if a type is an atomic (fixed-size) type
pub fn is_atomic_type(type_name: &str) -> bool {
    AtomicType::parse(type_name).is_some()
}

/// Check if a type is a dynamic type
pub fn is_dynamic_type(type_name: &str) -> bool {
    type_name == "bytes" || type_name == "string"
}

/// Errors that can occur during EIP-712 operations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Eip712Error {
    #[error("Duplicate type: {0}")]
    DuplicateType(String),

    #[error("Unknown type {referenced} referenced by {type_name}")]
    UnknownReference { type_name: String, referenced: String },

    #[error("Cyclic type: {0}")]
    CyclicType(String),

    #[error("Type mismatch at {path}: expected {expected}, got {found}")]
    TypeMismatch { path: String, expected: String, found: String },

    #[error("Value out of range at {path} for {type_name}: {value}")]
    ValueOutOfRange { path: String, type_name: String, value: String },

    #[error("Invalid signature: {0}")]
    InvalidSignature(String),

    #[error("Invalid type: {0}")]
    InvalidType(String),

    #[error("Invalid primary type: {0}")]
    InvalidPrimaryType(String),

    #[error("Missing field: {0}")]
    MissingField(String),

    #[error("Unexpected field: {0}")]
    UnexpectedField(String),

    #[error("Array length mismatch at {path}: expected {expected}, got {found}")]
    ArityMismatch { path: String, expected: usize, found: usize },

    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("Invalid JSON: {0}")]
    InvalidJson(String),

    #[error("Signing error: {0}")]
    SigningError(String),
}

impl Eip712Error {
    pub(crate) fn mismatch(path: &str, expected: impl fmt::Display, found: impl Into<String>) -> Self {
        Eip712Error::TypeMismatch {
            path: path.to_string(),
            expected: expected.to_string(),
            found: found.into(),
        }
    }
}
