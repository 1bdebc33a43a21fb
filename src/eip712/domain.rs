//! EIP-712 Domain
//!
//! The signing domain, its EIP-5267 field bitmap, and the domain separator.

use super::hasher::hash_struct;
use super::numeric::{I256, U256};
use super::registry::TypeRegistry;
use super::types::*;
use super::value::{Address, Eip712Value, StructValue};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Name of the synthesized domain struct type
pub const DOMAIN_TYPE_NAME: &str = "EIP712Domain";

/// One of the five standard domain fields, in canonical order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DomainField {
    Name,
    Version,
    ChainId,
    VerifyingContract,
    Salt,
}

impl DomainField {
    pub const ALL: [DomainField; 5] = [
        DomainField::Name,
        DomainField::Version,
        DomainField::ChainId,
        DomainField::VerifyingContract,
        DomainField::Salt,
    ];

    /// Bit position in the EIP-5267 `fields` byte (bit 0 = name)
    pub fn bit(self) -> u8 {
        1 << (self as u8)
    }

    /// Field name as it appears in the domain type
    pub fn name(self) -> &'static str {
        match self {
            DomainField::Name => "name",
            DomainField::Version => "version",
            DomainField::ChainId => "chainId",
            DomainField::VerifyingContract => "verifyingContract",
            DomainField::Salt => "salt",
        }
    }

    pub fn type_tag(self) -> &'static str {
        match self {
            DomainField::Name | DomainField::Version => "string",
            DomainField::ChainId => "uint256",
            DomainField::VerifyingContract => "address",
            DomainField::Salt => "bytes32",
        }
    }
}

impl fmt::Display for DomainField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Presence mask over the five domain fields
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct DomainFields(u8);

impl DomainFields {
    pub const NONE: DomainFields = DomainFields(0);

    /// Keep only the five standard bits
    pub fn from_bits_truncate(bits: u8) -> Self {
        DomainFields(bits & 0x1f)
    }

    pub fn bits(self) -> u8 {
        self.0
    }

    pub fn contains(self, field: DomainField) -> bool {
        self.0 & field.bit() != 0
    }

    pub fn insert(&mut self, field: DomainField) {
        self.0 |= field.bit();
    }

    /// Present fields in canonical order
    pub fn iter(self) -> impl Iterator<Item = DomainField> {
        DomainField::ALL.into_iter().filter(move |f| self.contains(*f))
    }
}

impl fmt::Debug for DomainFields {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DomainFields(0x{:02x})", self.0)
    }
}

impl fmt::Display for DomainFields {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:02x}", self.0)
    }
}

impl Serialize for DomainFields {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        crate::serde_bytes::fields_byte::serialize(&self.0, serializer)
    }
}

/// The EIP-712 domain separator data. Every field is optional.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Eip712Domain {
    /// The human-readable name of the signing domain
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// The current major version of the signing domain
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    /// The EIP-155 chain ID
    #[serde(default, skip_serializing_if = "Option::is_none", with = "crate::serde_bytes::quantity_option")]
    pub chain_id: Option<U256>,

    /// The address of the contract that will verify the signature
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verifying_contract: Option<Address>,

    /// An optional disambiguating salt
    #[serde(default, skip_serializing_if = "Option::is_none", with = "crate::serde_bytes::bytes32_option")]
    pub salt: Option<[u8; 32]>,
}

impl Eip712Domain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    pub fn with_chain_id(mut self, chain_id: u64) -> Self {
        self.chain_id = Some(U256::from_u64(chain_id));
        self
    }

    pub fn with_verifying_contract(mut self, address: Address) -> Self {
        self.verifying_contract = Some(address);
        self
    }

    pub fn with_salt(mut self, salt: [u8; 32]) -> Self {
        self.salt = Some(salt);
        self
    }

    /// Which fields are present
    pub fn fields(&self) -> DomainFields {
        let mut fields = DomainFields::NONE;
        if self.name.is_some() {
            fields.insert(DomainField::Name);
        }
        if self.version.is_some() {
            fields.insert(DomainField::Version);
        }
        if self.chain_id.is_some() {
            fields.insert(DomainField::ChainId);
        }
        if self.verifying_contract.is_some() {
            fields.insert(DomainField::VerifyingContract);
        }
        if self.salt.is_some() {
            fields.insert(DomainField::Salt);
        }
        fields
    }

    /// Get the chain ID as a u64, if present and small enough
    pub fn chain_id_u64(&self) -> Option<u64> {
        self.chain_id.filter(|id| id.bits() <= 64).map(|id| id.0[0])
    }

    /// The domain type: only the present fields, in canonical order
    pub fn type_fields(&self) -> Vec<TypedDataField> {
        self.fields()
            .iter()
            .map(|f| TypedDataField::new(f.name(), f.type_tag()))
            .collect()
    }

    /// The present fields as a struct value matching `type_fields`
    pub fn to_struct_value(&self) -> StructValue {
        let mut value = StructValue::new();
        if let Some(name) = &self.name {
            value.insert(DomainField::Name.name(), Eip712Value::string(name.clone()));
        }
        if let Some(version) = &self.version {
            value.insert(DomainField::Version.name(), Eip712Value::string(version.clone()));
        }
        if let Some(chain_id) = self.chain_id {
            value.insert(DomainField::ChainId.name(), Eip712Value::integer(I256::from_unsigned(chain_id)));
        }
        if let Some(address) = self.verifying_contract {
            value.insert(DomainField::VerifyingContract.name(), Eip712Value::address(address));
        }
        if let Some(salt) = self.salt {
            value.insert(DomainField::Salt.name(), Eip712Value::bytes(salt.to_vec()));
        }
        value
    }

    /// Shorthand for `domain_separator(self)`
    pub fn separator(&self) -> Result<[u8; 32], Eip712Error> {
        domain_separator(self)
    }
}

/// Calculate the domain separator hash
///
/// domainSeparator = hashStruct(eip712Domain), where the `EIP712Domain` type
/// lists only the fields present in `domain`.
pub fn domain_separator(domain: &Eip712Domain) -> Result<[u8; 32], Eip712Error> {
    let mut registry = TypeRegistry::new();
    registry.register(DOMAIN_TYPE_NAME, domain.type_fields())?;
    hash_struct(&registry, DOMAIN_TYPE_NAME, &domain.to_struct_value())
}
