//! EIP-712 Typed Data Bundle
//!
//! The `{types, primaryType, domain, message}` JSON document exchanged by
//! wallets (`eth_signTypedData_v4`), and the pipeline from it to a digest.

use super::domain::{Eip712Domain, DOMAIN_TYPE_NAME};
use super::hasher::{hash_struct, Eip712PreImage};
use super::registry::TypeRegistry;
use super::signer::{recover_address_with, sign_hash, Eip712Signature};
use super::types::*;
use super::value::{Address, StructValue};
use crate::config::SignerConfig;
use crate::log_debug;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Complete EIP-712 typed data structure
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct TypedData {
    /// Type definitions (struct name -> fields), optionally including `EIP712Domain`
    pub types: HashMap<String, Vec<TypedDataField>>,
    /// The name of the primary type being signed
    pub primary_type: String,
    /// The EIP-712 domain
    pub domain: Eip712Domain,
    /// The message, shaped by `primary_type`
    pub message: serde_json::Value,
}

impl TypedData {
    /// Parse typed data from a JSON string
    pub fn from_json(json: &str) -> Result<Self, Eip712Error> {
        serde_json::from_str(json).map_err(|e| Eip712Error::InvalidJson(e.to_string()))
    }

    /// Serialize to JSON string
    pub fn to_json(&self) -> Result<String, Eip712Error> {
        serde_json::to_string(self).map_err(|e| Eip712Error::InvalidJson(e.to_string()))
    }

    /// Check the bundle's shape before hashing.
    ///
    /// The primary type must be declared (and must not be the domain type).
    /// A declared `EIP712Domain` must list exactly the fields present in
    /// `domain`, in canonical order.
    pub fn validate(&self) -> Result<(), Eip712Error> {
        if self.primary_type == DOMAIN_TYPE_NAME || !self.types.contains_key(&self.primary_type) {
            return Err(Eip712Error::InvalidPrimaryType(self.primary_type.clone()));
        }

        if let Some(declared) = self.types.get(DOMAIN_TYPE_NAME) {
            let expected = self.domain.type_fields();
            if *declared != expected {
                let render = |fields: &[TypedDataField]| {
                    let body: Vec<String> = fields.iter().map(|f| format!("{} {}", f.type_name, f.name)).collect();
                    format!("{}({})", DOMAIN_TYPE_NAME, body.join(","))
                };
                log_debug!(
                    "eip712::typed_data",
                    "declared domain type disagrees with domain values",
                    declared = render(declared),
                    present = render(&expected),
                );
                return Err(Eip712Error::mismatch(DOMAIN_TYPE_NAME, render(&expected), render(declared)));
            }
        }
        Ok(())
    }

    /// Build a registry from the message types (the domain type is synthesized separately)
    pub fn registry(&self, strict: bool) -> Result<TypeRegistry, Eip712Error> {
        let message_types: HashMap<String, Vec<TypedDataField>> = self
            .types
            .iter()
            .filter(|(name, _)| name.as_str() != DOMAIN_TYPE_NAME)
            .map(|(name, fields)| (name.clone(), fields.clone()))
            .collect();
        TypeRegistry::from_types(&message_types, strict)
    }

    /// Convert `message` into a value of the primary type
    pub fn message_value(&self, registry: &TypeRegistry) -> Result<StructValue, Eip712Error> {
        StructValue::from_json(&self.primary_type, &self.message, registry, &self.primary_type)
    }

    /// Domain separator, message struct hash and digest
    pub fn pre_image_with(&self, config: &SignerConfig) -> Result<Eip712PreImage, Eip712Error> {
        self.validate()?;
        let registry = self.registry(config.strict_types)?;
        // schema problems (unknown or cyclic types) take precedence over value problems
        registry.type_hash(&self.primary_type)?;
        let message = self.message_value(&registry)?;
        let struct_hash = hash_struct(&registry, &self.primary_type, &message)?;
        let domain_separator = self.domain.separator()?;
        Ok(Eip712PreImage::new(domain_separator, struct_hash))
    }

    pub fn pre_image(&self) -> Result<Eip712PreImage, Eip712Error> {
        self.pre_image_with(&SignerConfig::standard())
    }

    /// The 32-byte digest to sign
    pub fn hash(&self) -> Result<[u8; 32], Eip712Error> {
        Ok(self.pre_image()?.digest)
    }

    /// keccak256 of the primary type's encoded type string
    pub fn type_hash(&self) -> Result<[u8; 32], Eip712Error> {
        self.validate()?;
        self.registry(false)?.type_hash(&self.primary_type)
    }

    pub fn sign(&self, private_key: &[u8]) -> Result<Eip712Signature, Eip712Error> {
        sign_hash(&self.hash()?, private_key)
    }

    /// Whether `signature` over this document was made by `expected`
    pub fn verify(&self, signature: &Eip712Signature, expected: &Address) -> Result<bool, Eip712Error> {
        self.verify_with(signature, expected, &SignerConfig::standard())
    }

    pub fn verify_with(
        &self,
        signature: &Eip712Signature,
        expected: &Address,
        config: &SignerConfig,
    ) -> Result<bool, Eip712Error> {
        let digest = self.pre_image_with(config)?.digest;
        Ok(recover_address_with(&digest, signature, config)? == *expected)
    }
}

/// Hash typed data into the digest to sign
pub fn hash_typed_data(typed_data: &TypedData) -> Result<[u8; 32], Eip712Error> {
    typed_data.hash()
}

/// Get the intermediate hashes for typed data
pub fn get_pre_image(typed_data: &TypedData) -> Result<Eip712PreImage, Eip712Error> {
    typed_data.pre_image()
}

/// Sign EIP-712 typed data
pub fn sign_typed_data(typed_data: &TypedData, private_key: &[u8]) -> Result<Eip712Signature, Eip712Error> {
    typed_data.sign(private_key)
}

/// Verify an EIP-712 signature against the expected signer
pub fn verify_typed_data(
    typed_data: &TypedData,
    signature: &Eip712Signature,
    expected: &Address,
) -> Result<bool, Eip712Error> {
    typed_data.verify(signature, expected)
}
