//! EIP-712 Test Suite
//!
//! End-to-end scenarios with fixed digests and signatures.

use super::*;
use crate::config::SignerConfig;

const MAIL_TYPES: &str = r#"{
    "Person": [
        {"name": "name", "type": "string"},
        {"name": "wallet", "type": "address"}
    ],
    "Mail": [
        {"name": "from", "type": "Person"},
        {"name": "to", "type": "Person"},
        {"name": "contents", "type": "string"}
    ]
}"#;

fn mail_typed_data(salt: Option<&str>) -> TypedData {
    let mut domain = serde_json::json!({
        "name": "Ether Mail",
        "version": "1",
        "chainId": 1,
        "verifyingContract": "0xCcCCccccCCCCcCCCCCCcCcCccCcCCCcCcccccccC"
    });
    if let Some(salt) = salt {
        domain["salt"] = serde_json::json!(salt);
    }
    let json = serde_json::json!({
        "types": serde_json::from_str::<serde_json::Value>(MAIL_TYPES).unwrap(),
        "primaryType": "Mail",
        "domain": domain,
        "message": {
            "from": {"name": "Cow", "wallet": "0xCD2a3d9F938E13CD947Ec05AbC7FE734Df8DD826"},
            "to": {"name": "Bob", "wallet": "0xbBbBBBBbbBBBbbbBbbBbbbbBBbBbbbbBbBbbBBbB"},
            "contents": "Hello, Bob!"
        }
    });
    TypedData::from_json(&json.to_string()).unwrap()
}

fn key(hex_str: &str) -> Vec<u8> {
    crate::utils::crypto::decode_hex(hex_str).unwrap()
}

const AA_KEY: &str = "0xaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa";
const ANVIL_KEY: &str = "0x59c6995e998f97a5a0044966f0945389dc9e86dae88c7a8412f4603b6b78690d";
const DECAFBEEF: &str = "0x646563616662656566";

/// The canonical Mail example from EIP-712
#[test]
fn test_eip712_mail_example() {
    let typed_data = mail_typed_data(None);
    let registry = typed_data.registry(false).unwrap();

    assert_eq!(
        registry.type_hash_input("Mail").unwrap(),
        "Mail(Person from,Person to,string contents)Person(string name,address wallet)"
    );
    assert_eq!(
        hex::encode(registry.type_hash("Person").unwrap()),
        "b9d8c78acf9b987311de6c7b45bb6a9c8e1bf361fa7fd3467a2163f994c79500"
    );
    assert_eq!(
        hex::encode(hash_typed_data(&typed_data).unwrap()),
        "be609aee343fb3c4b28e1df9e632fca64fcfaede20f02e86244efddf30957bd2"
    );
}

/// Mail example with a salt of "decafbeef" right-padded to 32 bytes
#[test]
fn test_salted_mail_golden_vector() {
    let typed_data = mail_typed_data(Some(DECAFBEEF));
    let salt = typed_data.domain.salt.unwrap();
    assert_eq!(
        hex::encode(salt),
        "6465636166626565660000000000000000000000000000000000000000000000"
    );

    let pre_image = get_pre_image(&typed_data).unwrap();
    assert_eq!(
        hex::encode(pre_image.domain_separator),
        "ca88f64aaf2ac10cae958b4dd8c536334ff90fcd3271294a4ef1823dca3acf85"
    );
    assert_eq!(
        hex::encode(pre_image.digest),
        "c5bb16ccc59ae9a3ad1cb8343d4e3351f057c994a97656e1aff8c134e56f7530"
    );

    let signature = sign_typed_data(&typed_data, &key(AA_KEY)).unwrap();
    assert_eq!(
        hex::encode(signature.r),
        "90922098d8890a53f7f13cce809bc1a2caa2fb8a3a651121ef8bd8e7a83b5637"
    );
    assert_eq!(
        hex::encode(signature.s),
        "047fb11c779ca25a05f2590b5f63293e0d52f8b064725296166a2182b67d3630"
    );
    assert_eq!(signature.v, 28);

    let signer = address_from_private_key(&key(AA_KEY)).unwrap();
    assert_eq!(hex::encode(signer.as_bytes()), "8fd379246834eac74b8419ffda202cf8051f7a03");
    assert_eq!(recover_address(&pre_image.digest, &signature).unwrap(), signer);
}

#[test]
fn test_unsalted_signatures() {
    let typed_data = mail_typed_data(None);

    let signature = typed_data.sign(&key(AA_KEY)).unwrap();
    assert_eq!(
        signature.to_hex(),
        "0x8c3530cb2968e87e32385783944650ca09e0e2769b83c6498b8aedfed8fc1054\
         05a1689839caf5d4b1036fe00e4357899aa9b02c8927c05d89a555e288288736\
         1b"
    );

    let signature = typed_data.sign(&key(ANVIL_KEY)).unwrap();
    assert_eq!(
        hex::encode(signature.r),
        "8a7d4af65242789d629fa992574bf8224f51882c9ac7a14bb326607263f9bba7"
    );
    assert_eq!(
        hex::encode(signature.s),
        "5559a6a86b88118c6cbf620c9cb959f94137abf9582ec9102066e85715b41f2c"
    );
    assert_eq!(signature.v, 27);
}

#[test]
fn test_salted_anvil_signature() {
    let typed_data = mail_typed_data(Some(DECAFBEEF));
    let signature = typed_data.sign(&key(ANVIL_KEY)).unwrap();
    assert_eq!(
        hex::encode(signature.r),
        "5059299afafe4ab1326ccb9a0c4786fb0daa23d032fa4bd36342b3883c54d126"
    );
    assert_eq!(
        hex::encode(signature.s),
        "1ae0153dbbbc7dfe6056bf2a5808d41d2896a91617f610987d2be088c2df8af2"
    );
    assert_eq!(signature.v, 27);

    let anvil = Address::parse("0x70997970C51812dc3A010C7d01b50e0d17dc79C8").unwrap();
    assert!(verify_typed_data(&typed_data, &signature, &anvil).unwrap());
}

/// Same message, domains differing only in salt presence
#[test]
fn test_salt_presence_changes_digest() {
    let plain = mail_typed_data(None).hash().unwrap();
    let salted = mail_typed_data(Some(DECAFBEEF)).hash().unwrap();
    let zero = mail_typed_data(Some("0x00")).hash().unwrap();
    assert_ne!(plain, salted);
    assert_ne!(plain, zero);
    assert_ne!(salted, zero);
}

/// A signature over one domain subset does not verify under another
#[test]
fn test_signature_does_not_cross_domains() {
    let signer = address_from_private_key(&key(AA_KEY)).unwrap();
    let signature = mail_typed_data(Some(DECAFBEEF)).sign(&key(AA_KEY)).unwrap();
    assert!(!mail_typed_data(None).verify(&signature, &signer).unwrap());
}

/// Contract advertises salt; signer left it out
/// A misspelled domain key must not silently shrink the domain field set
#[test]
fn test_misspelled_domain_key_is_rejected() {
    let json = serde_json::json!({
        "types": serde_json::from_str::<serde_json::Value>(MAIL_TYPES).unwrap(),
        "primaryType": "Mail",
        "domain": {
            "name": "Ether Mail",
            "chainid": 1,
            "verifyingcontract": "0xCcCCccccCCCCcCCCCCCcCcCccCcCCCcCcccccccC"
        },
        "message": {}
    });
    let err = TypedData::from_json(&json.to_string()).unwrap_err();
    assert!(matches!(err, Eip712Error::InvalidJson(ref msg) if msg.contains("chainid")), "{:?}", err);

    let mut bundle = serde_json::to_value(mail_typed_data(None)).unwrap();
    bundle["primary_type"] = serde_json::json!("Mail");
    assert!(matches!(
        TypedData::from_json(&bundle.to_string()),
        Err(Eip712Error::InvalidJson(_))
    ));
}

#[test]
fn test_audit_flags_salt() {
    let typed_data = mail_typed_data(None);
    let remote = RemoteDomain {
        fields: 0x1f,
        name: "Ether Mail".to_string(),
        version: "1".to_string(),
        chain_id: U256::from_u64(1),
        verifying_contract: typed_data.domain.verifying_contract.unwrap(),
        salt: [0u8; 32],
        extensions: vec![],
    };
    let report = audit(&typed_data.domain, &remote);
    assert_eq!(report.mismatched_fields(), vec![DomainField::Salt]);
    assert_eq!(report.claimed_bitmap.bits(), 0x1f);
    assert_eq!(report.local_bitmap.bits(), 0x0f);

    // Adopting the remote domain resolves the mismatch
    let adopted = remote.to_domain();
    assert!(audit(&adopted, &remote).is_consistent());
}

/// Uniswap-style permit with integers given as numbers, decimal and hex strings
#[test]
fn test_eip712_permit() {
    let json = r#"{
        "types": {
            "EIP712Domain": [
                {"name": "name", "type": "string"},
                {"name": "version", "type": "string"},
                {"name": "chainId", "type": "uint256"},
                {"name": "verifyingContract", "type": "address"}
            ],
            "Permit": [
                {"name": "owner", "type": "address"},
                {"name": "spender", "type": "address"},
                {"name": "value", "type": "uint256"},
                {"name": "nonce", "type": "uint256"},
                {"name": "deadline", "type": "uint256"}
            ]
        },
        "primaryType": "Permit",
        "domain": {
            "name": "Uniswap V2",
            "version": "1",
            "chainId": "0x1",
            "verifyingContract": "0x7a250d5630b4cf539739df2c5dacb4c659f2488d"
        },
        "message": {
            "owner": "0x1234567890123456789012345678901234567890",
            "spender": "0x0987654321098765432109876543210987654321",
            "value": "1000000000000000000",
            "nonce": 0,
            "deadline": "0x70dbd880"
        }
    }"#;

    let typed_data = TypedData::from_json(json).unwrap();
    typed_data.validate().unwrap();

    let registry = typed_data.registry(false).unwrap();
    let message = typed_data.message_value(&registry).unwrap();
    let data = encode_data(&registry, "Permit", &message).unwrap();
    assert_eq!(data.len(), 32 * 6);
    // deadline = 1893456000
    assert_eq!(&data[32 * 5 + 28..], &1_893_456_000u32.to_be_bytes());
}

/// Arrays of atomics, structs, and nested arrays
#[test]
fn test_eip712_struct_arrays() {
    let json = r#"{
        "types": {
            "Item": [
                {"name": "id", "type": "uint256"},
                {"name": "name", "type": "string"},
                {"name": "tags", "type": "bytes4[2]"}
            ],
            "Order": [
                {"name": "items", "type": "Item[]"},
                {"name": "grid", "type": "int8[][]"},
                {"name": "buyer", "type": "address"}
            ]
        },
        "primaryType": "Order",
        "domain": {"name": "Marketplace", "chainId": 1},
        "message": {
            "items": [
                {"id": 1, "name": "Widget", "tags": ["0x01020304", "0x05"]},
                {"id": 2, "name": "Gadget", "tags": ["0x", "0xffffffff"]}
            ],
            "grid": [[-1, 2], [], [127]],
            "buyer": "0x1234567890123456789012345678901234567890"
        }
    }"#;

    let typed_data = TypedData::from_json(json).unwrap();
    let registry = typed_data.registry(true).unwrap();
    assert_eq!(
        registry.type_hash_input("Order").unwrap(),
        "Order(Item[] items,int8[][] grid,address buyer)Item(uint256 id,string name,bytes4[2] tags)"
    );
    let first = typed_data.hash().unwrap();
    assert_eq!(first, typed_data.hash().unwrap());

    // Fixed-size arrays must have exactly their declared length
    let broken = json.replace(r#""tags": ["0x", "0xffffffff"]"#, r#""tags": ["0x"]"#);
    let err = TypedData::from_json(&broken).unwrap().hash().unwrap_err();
    assert!(matches!(err, Eip712Error::ArityMismatch { expected: 2, found: 1, .. }));
}

/// Integers outside the declared width are rejected, never truncated
#[test]
fn test_out_of_range_message_value() {
    let json = r#"{
        "types": {"Vote": [{"name": "weight", "type": "int8"}, {"name": "option", "type": "uint8"}]},
        "primaryType": "Vote",
        "domain": {"name": "Ballot"},
        "message": {"weight": -129, "option": 1}
    }"#;
    let err = TypedData::from_json(json).unwrap().hash().unwrap_err();
    match err {
        Eip712Error::ValueOutOfRange { path, type_name, .. } => {
            assert_eq!(path, "Vote.weight");
            assert_eq!(type_name, "int8");
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

/// Registry errors surface before any hashing
#[test]
fn test_schema_errors() {
    let unknown = r#"{
        "types": {"Mail": [{"name": "from", "type": "Person"}]},
        "primaryType": "Mail",
        "domain": {},
        "message": {"from": {}}
    }"#;
    assert!(matches!(
        TypedData::from_json(unknown).unwrap().hash(),
        Err(Eip712Error::UnknownReference { .. })
    ));

    let cyclic = r#"{
        "types": {"Node": [{"name": "next", "type": "Node"}]},
        "primaryType": "Node",
        "domain": {},
        "message": {"next": {}}
    }"#;
    assert!(matches!(
        TypedData::from_json(cyclic).unwrap().hash(),
        Err(Eip712Error::CyclicType(_))
    ));

    let bad_tag = r#"{
        "types": {"T": [{"name": "x", "type": "uint7"}]},
        "primaryType": "T",
        "domain": {},
        "message": {"x": 1}
    }"#;
    assert!(matches!(
        TypedData::from_json(bad_tag).unwrap().hash(),
        Err(Eip712Error::InvalidType(_))
    ));
}

#[test]
fn test_strict_config_accepts_well_ordered_types() {
    let typed_data = mail_typed_data(Some(DECAFBEEF));
    let strict = typed_data.pre_image_with(&SignerConfig::strict()).unwrap();
    assert_eq!(strict, typed_data.pre_image().unwrap());
}

/// Building the same message through the typed API
#[test]
fn test_programmatic_message_matches_json() {
    let mut registry = TypeRegistry::new();
    registry
        .register(
            "Mail",
            vec![
                TypedDataField::new("from", "Person"),
                TypedDataField::new("to", "Person"),
                TypedDataField::new("contents", "string"),
            ],
        )
        .unwrap();
    registry
        .register(
            "Person",
            vec![TypedDataField::new("name", "string"), TypedDataField::new("wallet", "address")],
        )
        .unwrap();

    let person = |name: &str, wallet: &str| {
        StructValue::new()
            .with("name", name)
            .with("wallet", Address::parse(wallet).unwrap())
    };
    let mail = StructValue::new()
        .with("from", person("Cow", "0xCD2a3d9F938E13CD947Ec05AbC7FE734Df8DD826"))
        .with("to", person("Bob", "0xbBbBBBBbbBBBbbbBbbBbbbbBBbBbbbbBbBbbBBbB"))
        .with("contents", "Hello, Bob!");

    let domain = mail_typed_data(None).domain;
    let digest = typed_data_digest(
        &domain_separator(&domain).unwrap(),
        &hash_struct(&registry, "Mail", &mail).unwrap(),
    );
    assert_eq!(digest, mail_typed_data(None).hash().unwrap());
}
