//! EIP-5267 Domain Audit
//!
//! Compares the domain a signer is about to use with the domain a verifying
//! contract advertises through `eip712Domain()`. A signature can recover
//! correctly while still binding a different field subset than the contract
//! checks, so both the presence bitmap and the values are compared.

use super::domain::{DomainField, DomainFields, Eip712Domain};
use super::numeric::U256;
use super::value::Address;
use crate::log_warn;
use serde::{Deserialize, Serialize};

/// Bits of the `fields` byte that do not name a standard domain field
const RESERVED_MASK: u8 = !0x1f;

/// The `eip712Domain()` return tuple.
///
/// Values for fields whose bit is clear carry no meaning (contracts return
/// empty strings and zero words for them). When parsed from JSON, every field
/// whose bit is set must be present.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "RawRemoteDomain")]
pub struct RemoteDomain {
    #[serde(with = "crate::serde_bytes::fields_byte")]
    pub fields: u8,
    pub name: String,
    pub version: String,
    #[serde(with = "crate::serde_bytes::quantity")]
    pub chain_id: U256,
    pub verifying_contract: Address,
    #[serde(with = "crate::serde_bytes::bytes32")]
    pub salt: [u8; 32],
    #[serde(with = "crate::serde_bytes::quantity_vec")]
    pub extensions: Vec<U256>,
}

/// JSON shape of `RemoteDomain` before the bitmap is checked against the values
#[derive(Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct RawRemoteDomain {
    #[serde(with = "crate::serde_bytes::fields_byte")]
    fields: u8,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    version: Option<String>,
    #[serde(default, with = "crate::serde_bytes::quantity_option")]
    chain_id: Option<U256>,
    #[serde(default)]
    verifying_contract: Option<Address>,
    #[serde(default, with = "crate::serde_bytes::bytes32_option")]
    salt: Option<[u8; 32]>,
    #[serde(default, with = "crate::serde_bytes::quantity_vec")]
    extensions: Vec<U256>,
}

impl TryFrom<RawRemoteDomain> for RemoteDomain {
    type Error = String;

    fn try_from(raw: RawRemoteDomain) -> Result<Self, Self::Error> {
        let bits = DomainFields::from_bits_truncate(raw.fields);
        let missing: Vec<&str> = DomainField::ALL
            .into_iter()
            .filter(|field| bits.contains(*field))
            .filter(|field| match field {
                DomainField::Name => raw.name.is_none(),
                DomainField::Version => raw.version.is_none(),
                DomainField::ChainId => raw.chain_id.is_none(),
                DomainField::VerifyingContract => raw.verifying_contract.is_none(),
                DomainField::Salt => raw.salt.is_none(),
            })
            .map(DomainField::name)
            .collect();
        if !missing.is_empty() {
            return Err(format!(
                "fields bitmap 0x{:02x} claims {} but no value was given",
                raw.fields,
                missing.join(", ")
            ));
        }

        Ok(RemoteDomain {
            fields: raw.fields,
            name: raw.name.unwrap_or_default(),
            version: raw.version.unwrap_or_default(),
            chain_id: raw.chain_id.unwrap_or(U256::ZERO),
            verifying_contract: raw.verifying_contract.unwrap_or(Address::ZERO),
            salt: raw.salt.unwrap_or([0u8; 32]),
            extensions: raw.extensions,
        })
    }
}

impl RemoteDomain {
    /// The domain the contract claims to hash: only fields with their bit set
    pub fn to_domain(&self) -> Eip712Domain {
        let bits = DomainFields::from_bits_truncate(self.fields);
        Eip712Domain {
            name: bits.contains(DomainField::Name).then(|| self.name.clone()),
            version: bits.contains(DomainField::Version).then(|| self.version.clone()),
            chain_id: bits.contains(DomainField::ChainId).then_some(self.chain_id),
            verifying_contract: bits.contains(DomainField::VerifyingContract).then_some(self.verifying_contract),
            salt: bits.contains(DomainField::Salt).then_some(self.salt),
        }
    }
}

/// How one domain field disagrees
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MismatchKind {
    /// The contract hashes the field; the signer's domain lacks it
    MissingLocally,
    /// The signer's domain has the field; the contract does not hash it
    MissingRemotely,
    /// Both have the field with different values
    ValueDiffers { local: String, remote: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DomainMismatch {
    pub field: DomainField,
    #[serde(flatten)]
    pub kind: MismatchKind,
}

/// Result of auditing a local domain against a remote one
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DomainFieldReport {
    pub local_bitmap: DomainFields,
    /// Remote bitmap restricted to the five standard bits
    pub claimed_bitmap: DomainFields,
    /// Remote bits above bit 4, passed through as is
    #[serde(with = "crate::serde_bytes::fields_byte")]
    pub reserved_bits: u8,
    pub mismatches: Vec<DomainMismatch>,
    #[serde(with = "crate::serde_bytes::quantity_vec")]
    pub extensions: Vec<U256>,
}

impl DomainFieldReport {
    /// No field disagrees in presence or value
    pub fn is_consistent(&self) -> bool {
        self.mismatches.is_empty()
    }

    /// Names of the mismatching fields, in canonical order
    pub fn mismatched_fields(&self) -> Vec<DomainField> {
        self.mismatches.iter().map(|m| m.field).collect()
    }
}

/// Audit `local` against an already-fetched `eip712Domain()` result
pub fn audit(local: &Eip712Domain, remote: &RemoteDomain) -> DomainFieldReport {
    audit_fields(local, remote.fields, &remote.to_domain(), &remote.extensions)
}

/// Audit `local` against a remote bitmap, the remote values, and its extension ids.
///
/// Extension ids are never interpreted.
pub fn audit_fields(
    local: &Eip712Domain,
    remote_bitmap: u8,
    remote_values: &Eip712Domain,
    extensions: &[U256],
) -> DomainFieldReport {
    let local_bitmap = local.fields();
    let claimed_bitmap = DomainFields::from_bits_truncate(remote_bitmap);

    let mut mismatches = Vec::new();
    for field in DomainField::ALL {
        let kind = match (local_bitmap.contains(field), claimed_bitmap.contains(field)) {
            (false, false) => continue,
            (false, true) => MismatchKind::MissingLocally,
            (true, false) => MismatchKind::MissingRemotely,
            (true, true) => {
                let local_value = field_value(local, field);
                let remote_value = field_value(remote_values, field);
                if local_value == remote_value {
                    continue;
                }
                MismatchKind::ValueDiffers {
                    local: local_value.unwrap_or_default(),
                    remote: remote_value.unwrap_or_default(),
                }
            }
        };
        log_warn!("eip712::audit", "domain field mismatch", field = field, kind = format!("{:?}", kind));
        mismatches.push(DomainMismatch { field, kind });
    }

    DomainFieldReport {
        local_bitmap,
        claimed_bitmap,
        reserved_bits: remote_bitmap & RESERVED_MASK,
        mismatches,
        extensions: extensions.to_vec(),
    }
}

/// Textual form of one domain field, for comparison and reporting
fn field_value(domain: &Eip712Domain, field: DomainField) -> Option<String> {
    match field {
        DomainField::Name => domain.name.clone(),
        DomainField::Version => domain.version.clone(),
        DomainField::ChainId => domain.chain_id.map(|id| id.to_string()),
        DomainField::VerifyingContract => domain.verifying_contract.map(|a| a.to_checksum()),
        DomainField::Salt => domain.salt.map(|s| format!("0x{}", hex::encode(s))),
    }
}
