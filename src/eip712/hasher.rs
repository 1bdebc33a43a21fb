//! EIP-712 Hashing
//!
//! Struct hashing and final digest assembly.
//!
//! Nested structs and arrays are walked with an explicit frame stack rather
//! than recursion: each frame accumulates the words of one struct or array,
//! and when it completes its keccak256 becomes one word of the parent frame.

use super::encoder::{encode_atomic, encode_dynamic};
use super::registry::{TypeRegistry, TypeSchema};
use super::types::*;
use super::value::{Eip712Value, StructValue};
use crate::utils::crypto::keccak256;

/// Magic prefix for EIP-712 encoding
pub const EIP712_PREFIX: [u8; 2] = [0x19, 0x01];

enum Frame<'a> {
    Struct {
        schema: &'a TypeSchema,
        value: &'a StructValue,
        path: String,
        next: usize,
        buf: Vec<u8>,
    },
    Array {
        element: &'a FieldType,
        items: &'a [Eip712Value],
        path: String,
        next: usize,
        buf: Vec<u8>,
    },
}

impl<'a> Frame<'a> {
    fn open_struct(
        registry: &'a TypeRegistry,
        type_name: &str,
        value: &'a StructValue,
        path: String,
    ) -> Result<Self, Eip712Error> {
        let schema = registry.schema(type_name).ok_or_else(|| Eip712Error::UnknownReference {
            type_name: path.clone(),
            referenced: type_name.to_string(),
        })?;

        for name in value.field_names() {
            if schema.field(name).is_none() {
                return Err(Eip712Error::UnexpectedField(format!("{}.{}", path, name)));
            }
        }

        let mut buf = Vec::with_capacity(32 * (schema.fields.len() + 1));
        buf.extend_from_slice(&registry.type_hash(type_name)?);
        Ok(Frame::Struct {
            schema,
            value,
            path,
            next: 0,
            buf,
        })
    }

    /// The next (type, value, path) to encode, or `None` when the frame is complete.
    fn next_child(&mut self) -> Option<Result<(&'a FieldType, &'a Eip712Value, String), Eip712Error>> {
        match self {
            Frame::Struct { schema, value, path, next, .. } => {
                let schema: &'a TypeSchema = *schema;
                let value: &'a StructValue = *value;
                let field = schema.fields.get(*next)?;
                *next += 1;
                let field_path = format!("{}.{}", path, field.name);
                Some(match value.get(&field.name) {
                    Some(v) => Ok((&field.field_type, v, field_path)),
                    None => Err(Eip712Error::MissingField(field_path)),
                })
            }
            Frame::Array { element, items, path, next, .. } => {
                let element: &'a FieldType = *element;
                let items: &'a [Eip712Value] = *items;
                let item = items.get(*next)?;
                let item_path = format!("{}[{}]", path, *next);
                *next += 1;
                Some(Ok((element, item, item_path)))
            }
        }
    }

    fn push_word(&mut self, word: &[u8; 32]) {
        match self {
            Frame::Struct { buf, .. } | Frame::Array { buf, .. } => buf.extend_from_slice(word),
        }
    }

    fn into_buf(self) -> Vec<u8> {
        match self {
            Frame::Struct { buf, .. } | Frame::Array { buf, .. } => buf,
        }
    }
}

/// `encodeData` with the type hash prepended: `typeHash || word_1 || ... || word_k`.
///
/// Any field failure aborts the whole encoding.
pub fn encode_data(
    registry: &TypeRegistry,
    type_name: &str,
    value: &StructValue,
) -> Result<Vec<u8>, Eip712Error> {
    let mut stack = vec![Frame::open_struct(registry, type_name, value, type_name.to_string())?];

    loop {
        let Some(top) = stack.last_mut() else {
            // the root frame always returns below before the stack empties
            return Err(Eip712Error::InvalidPrimaryType(type_name.to_string()));
        };

        match top.next_child() {
            None => {
                let Some(done) = stack.pop() else { continue };
                let buf = done.into_buf();
                match stack.last_mut() {
                    Some(parent) => parent.push_word(&keccak256(&buf)),
                    None => return Ok(buf),
                }
            }
            Some(Err(e)) => return Err(e),
            Some(Ok((field_type, child, path))) => match field_type {
                FieldType::Atomic(atomic) => {
                    let word = encode_atomic(*atomic, child, &path)?;
                    top.push_word(&word);
                }
                FieldType::Dynamic(dynamic) => {
                    let word = encode_dynamic(*dynamic, child, &path)?;
                    top.push_word(&word);
                }
                FieldType::Struct(name) => {
                    let Eip712Value::Struct(nested) = child else {
                        return Err(Eip712Error::mismatch(&path, name, child.kind()));
                    };
                    let frame = Frame::open_struct(registry, name, nested, path)?;
                    stack.push(frame);
                }
                FieldType::Array { element, len } => {
                    let Eip712Value::Array(items) = child else {
                        return Err(Eip712Error::mismatch(&path, field_type, child.kind()));
                    };
                    if let Some(expected) = len {
                        if items.len() != *expected {
                            return Err(Eip712Error::ArityMismatch {
                                path,
                                expected: *expected,
                                found: items.len(),
                            });
                        }
                    }
                    stack.push(Frame::Array {
                        element,
                        items,
                        path,
                        next: 0,
                        buf: Vec::with_capacity(32 * items.len()),
                    });
                }
            },
        }
    }
}

/// Hash a struct according to EIP-712
///
/// hashStruct(s) = keccak256(typeHash || encodeData(s))
pub fn hash_struct(
    registry: &TypeRegistry,
    type_name: &str,
    value: &StructValue,
) -> Result<[u8; 32], Eip712Error> {
    let encoded = encode_data(registry, type_name, value)?;
    Ok(keccak256(&encoded))
}

/// Calculate the final EIP-712 hash for signing
///
/// hash = keccak256("\x19\x01" || domainSeparator || hashStruct(message))
pub fn typed_data_digest(domain_separator: &[u8; 32], struct_hash: &[u8; 32]) -> [u8; 32] {
    let mut data = [0u8; 66];
    data[..2].copy_from_slice(&EIP712_PREFIX);
    data[2..34].copy_from_slice(domain_separator);
    data[34..].copy_from_slice(struct_hash);
    keccak256(&data)
}

/// The intermediate hashes behind a digest (for external signers and display)
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Eip712PreImage {
    #[serde(with = "crate::serde_bytes::bytes32")]
    pub domain_separator: [u8; 32],
    #[serde(with = "crate::serde_bytes::bytes32")]
    pub struct_hash: [u8; 32],
    #[serde(with = "crate::serde_bytes::bytes32")]
    pub digest: [u8; 32],
}

impl Eip712PreImage {
    pub fn new(domain_separator: [u8; 32], struct_hash: [u8; 32]) -> Self {
        Self {
            domain_separator,
            struct_hash,
            digest: typed_data_digest(&domain_separator, &struct_hash),
        }
    }
}
