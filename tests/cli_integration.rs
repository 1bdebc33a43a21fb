use serde_json::Value;
use std::path::PathBuf;
use std::process::{Command, Output};

const AA_KEY: &str = "0xaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa";
const SALTED_SIGNATURE: &str = "0x90922098d8890a53f7f13cce809bc1a2caa2fb8a3a651121ef8bd8e7a83b5637\
                                047fb11c779ca25a05f2590b5f63293e0d52f8b064725296166a2182b67d3630\
                                1c";

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests").join("fixtures").join(name)
}

fn run_cli(args: &[&str]) -> Output {
    let binary_path = assert_cmd::cargo::cargo_bin!("typed-signer");
    Command::new(binary_path)
        .args(args)
        .env_remove("TYPED_SIGNER_PRIVATE_KEY")
        .env_remove("TYPED_SIGNER_STRICT")
        .env_remove("TYPED_SIGNER_LOW_S")
        .env_remove("TYPED_SIGNER_LOG")
        .output()
        .expect("cli runs")
}

fn stdout_json(output: &Output) -> Value {
    let stdout = String::from_utf8(output.stdout.clone()).expect("stdout is utf8");
    serde_json::from_str(&stdout).expect("stdout is valid json")
}

fn stderr_json(output: &Output) -> Value {
    let stderr = String::from_utf8(output.stderr.clone()).expect("stderr is utf8");
    serde_json::from_str(&stderr).expect("stderr is valid json")
}

#[test]
fn cli_prints_type_hash() {
    let mail = fixture("mail.json");
    let output = run_cli(&["type-hash", mail.to_str().unwrap()]);
    assert!(output.status.success(), "cli failed: {:?}", output);

    let json = stdout_json(&output);
    assert_eq!(
        json["encodedType"],
        "Mail(Person from,Person to,string contents)Person(string name,address wallet)"
    );
    assert_eq!(
        json["typeHash"],
        "0xa0cedeb2dc280ba39b857546d74f5549c3a1d7bdc2dd96bf881f76108e23dac2"
    );
}

#[test]
fn cli_hashes_reference_mail() {
    let mail = fixture("mail.json");
    let output = run_cli(&["hash", mail.to_str().unwrap()]);
    assert!(output.status.success(), "cli failed: {:?}", output);

    let json = stdout_json(&output);
    assert_eq!(
        json["domainSeparator"],
        "0xf2cee375fa42b42143804025fc449deafd50cc031ca257e0b194a650a912090f"
    );
    assert_eq!(
        json["structHash"],
        "0xc52c0ee5d84264471806290a3f2c4cecfc5490626bf912d01f240d7a274b371e"
    );
    assert_eq!(
        json["digest"],
        "0xbe609aee343fb3c4b28e1df9e632fca64fcfaede20f02e86244efddf30957bd2"
    );
}

#[test]
fn cli_signs_salted_mail() {
    let mail = fixture("mail_salted.json");
    let output = run_cli(&["sign", mail.to_str().unwrap(), "--private-key", AA_KEY]);
    assert!(output.status.success(), "cli failed: {:?}", output);

    let json = stdout_json(&output);
    assert_eq!(
        json["digest"],
        "0xc5bb16ccc59ae9a3ad1cb8343d4e3351f057c994a97656e1aff8c134e56f7530"
    );
    assert_eq!(json["signature"], SALTED_SIGNATURE);
    assert_eq!(json["v"], 28);
    assert_eq!(json["signer"], "0x8fd379246834eac74B8419FfdA202CF8051F7A03");

    let stderr = String::from_utf8(output.stderr).unwrap();
    assert!(!stderr.contains("aaaaaaaaaaaaaaaa"), "key material leaked to stderr");
}

#[test]
fn cli_reads_private_key_from_env() {
    let mail = fixture("mail_salted.json");
    let binary_path = assert_cmd::cargo::cargo_bin!("typed-signer");
    let output = Command::new(binary_path)
        .args(["sign", mail.to_str().unwrap()])
        .env("TYPED_SIGNER_PRIVATE_KEY", AA_KEY)
        .output()
        .expect("cli runs");
    assert!(output.status.success(), "cli failed: {:?}", output);
    assert_eq!(stdout_json(&output)["signature"], SALTED_SIGNATURE);
}

#[test]
fn cli_recovers_and_verifies() {
    let mail = fixture("mail_salted.json");
    let output = run_cli(&["recover", mail.to_str().unwrap(), "--signature", SALTED_SIGNATURE]);
    assert!(output.status.success(), "cli failed: {:?}", output);
    assert_eq!(stdout_json(&output)["signer"], "0x8fd379246834eac74B8419FfdA202CF8051F7A03");

    let output = run_cli(&[
        "verify",
        mail.to_str().unwrap(),
        "--signature",
        SALTED_SIGNATURE,
        "--address",
        "0x8fd379246834eac74b8419ffda202cf8051f7a03",
    ]);
    assert!(output.status.success(), "cli failed: {:?}", output);
    assert_eq!(stdout_json(&output)["valid"], true);

    // same signature, domain without the salt
    let unsalted = fixture("mail.json");
    let output = run_cli(&[
        "verify",
        unsalted.to_str().unwrap(),
        "--signature",
        SALTED_SIGNATURE,
        "--address",
        "0x8fd379246834eac74b8419ffda202cf8051f7a03",
    ]);
    assert_eq!(output.status.code(), Some(1));
    assert_eq!(stdout_json(&output)["valid"], false);
}

#[test]
fn cli_audit_reports_salt_mismatch() {
    let mail = fixture("mail.json");
    let remote = fixture("remote_domain.json");
    let output = run_cli(&["audit", mail.to_str().unwrap(), "--remote", remote.to_str().unwrap()]);
    assert!(output.status.success(), "cli failed: {:?}", output);
    assert_eq!(stdout_json(&output)["consistent"], true);

    let remote = fixture("remote_domain_salted.json");
    let output = run_cli(&["audit", mail.to_str().unwrap(), "--remote", remote.to_str().unwrap()]);
    assert_eq!(output.status.code(), Some(1));

    let json = stdout_json(&output);
    assert_eq!(json["consistent"], false);
    assert_eq!(json["report"]["claimedBitmap"], "0x1f");
    assert_eq!(json["report"]["mismatches"][0]["field"], "salt");
    assert_eq!(json["report"]["mismatches"][0]["kind"], "missing_locally");
    assert_eq!(json["report"]["extensions"][0], 1);
}

#[test]
fn cli_reports_errors_as_json() {
    let cyclic = fixture("cyclic.json");
    let output = run_cli(&["hash", cyclic.to_str().unwrap()]);
    assert!(!output.status.success());
    assert!(output.stdout.is_empty());
    assert_eq!(stderr_json(&output)["code"], "cyclic_type");

    let missing = fixture("does_not_exist.json");
    let output = run_cli(&["hash", missing.to_str().unwrap()]);
    assert!(!output.status.success());
    assert_eq!(stderr_json(&output)["code"], "io_error");

    let mail = fixture("mail.json");
    let output = run_cli(&["sign", mail.to_str().unwrap(), "--private-key", "0x1234"]);
    assert!(!output.status.success());
    assert_eq!(stderr_json(&output)["code"], "invalid_private_key");

    let mail = fixture("mail.json");
    let output = run_cli(&["recover", mail.to_str().unwrap(), "--signature", "0x1234"]);
    assert_eq!(output.status.code(), Some(2));
    assert_eq!(stderr_json(&output)["code"], "invalid_signature");
}

#[test]
fn cli_declared_domain_mismatch_keeps_stderr_json() {
    // declares a salt field the domain values do not carry
    let mail = fixture("mail_declared_salt.json");
    let output = run_cli(&["hash", mail.to_str().unwrap()]);
    assert_eq!(output.status.code(), Some(2));
    assert!(output.stdout.is_empty());

    let error = stderr_json(&output);
    assert_eq!(error["code"], "type_mismatch");
    let message = error["message"].as_str().unwrap();
    assert!(message.contains("bytes32 salt"), "{}", message);
}

#[test]
fn cli_io_error_names_the_file() {
    let missing = fixture("does_not_exist.json");
    let output = run_cli(&["type-hash", missing.to_str().unwrap()]);
    assert_eq!(output.status.code(), Some(2));
    let error = stderr_json(&output);
    assert_eq!(error["code"], "io_error");
    assert!(error["details"].as_str().unwrap().contains("does_not_exist.json"));
}
