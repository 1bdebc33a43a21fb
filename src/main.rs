use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde_json::{json, Value};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use typed_signer::eip712::{
    address_from_private_key, audit, recover_address_with, Address, Eip712Signature, RemoteDomain, TypedData,
};
use typed_signer::utils::logging::LogLevel;
use typed_signer::{log_info, ErrorCode, SignerConfig, SignerError};
use zeroize::Zeroizing;

/// Hash, sign, recover and audit EIP-712 typed data.
///
/// Results are printed as JSON on stdout. Failures print a JSON error on
/// stderr and exit with a non-zero status.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Require declaration-ordered types and low-s signatures
    #[arg(long, global = true)]
    strict: bool,

    /// Minimum log level written to stderr (debug, info, warn, error)
    #[arg(long, global = true, value_name = "LEVEL")]
    log_level: Option<LogLevel>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the encoded type string and type hash of the primary type
    TypeHash {
        /// Typed data JSON file
        file: PathBuf,
    },
    /// Print the domain separator, struct hash and digest
    Hash {
        file: PathBuf,
    },
    /// Sign the digest with a private key
    Sign {
        file: PathBuf,
        /// Hex private key (32 bytes)
        #[arg(long, env = "TYPED_SIGNER_PRIVATE_KEY", hide_env_values = true)]
        private_key: String,
    },
    /// Recover the signer address from a signature
    Recover {
        file: PathBuf,
        /// 65-byte `r || s || v` signature in hex
        #[arg(long)]
        signature: String,
    },
    /// Check a signature against an expected signer; exits 1 when it does not match
    Verify {
        file: PathBuf,
        #[arg(long)]
        signature: String,
        #[arg(long)]
        address: String,
    },
    /// Compare the domain in FILE with an `eip712Domain()` result; exits 1 on mismatch
    Audit {
        file: PathBuf,
        /// JSON file holding the contract's EIP-5267 domain
        #[arg(long, value_name = "FILE")]
        remote: PathBuf,
    },
}

/// What a command printed, and whether it counts as success
struct Outcome {
    output: Value,
    success: bool,
}

impl Outcome {
    fn ok(output: Value) -> Self {
        Self { output, success: true }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli) {
        Ok(outcome) => {
            println!("{}", render(&outcome.output));
            if outcome.success {
                ExitCode::SUCCESS
            } else {
                ExitCode::from(1)
            }
        }
        Err(err) => {
            let error = to_signer_error(&err);
            let body = serde_json::to_value(&error).unwrap_or_else(|_| json!({ "message": error.message }));
            eprintln!("{}", render(&body));
            ExitCode::from(2)
        }
    }
}

fn run(cli: Cli) -> Result<Outcome> {
    let mut config = SignerConfig::from_env()?;
    if cli.strict {
        config = SignerConfig { log_level: config.log_level, ..SignerConfig::strict() };
    }
    if let Some(level) = cli.log_level {
        config.log_level = level;
    }
    config.apply_logging();

    match cli.command {
        Command::TypeHash { file } => {
            let typed_data = load_typed_data(&file)?;
            typed_data.validate()?;
            let registry = typed_data.registry(config.strict_types)?;
            Ok(Outcome::ok(json!({
                "primaryType": typed_data.primary_type,
                "encodedType": registry.type_hash_input(&typed_data.primary_type)?,
                "typeHash": hex_word(&registry.type_hash(&typed_data.primary_type)?),
            })))
        }
        Command::Hash { file } => {
            let pre_image = load_typed_data(&file)?.pre_image_with(&config)?;
            Ok(Outcome::ok(serde_json::to_value(pre_image)?))
        }
        Command::Sign { file, private_key } => {
            let private_key = Zeroizing::new(private_key);
            let key_bytes = Zeroizing::new(
                typed_signer::utils::crypto::decode_hex(private_key.trim())
                    .map_err(|e| SignerError::new(ErrorCode::InvalidPrivateKey, e.to_string()))?,
            );
            let typed_data = load_typed_data(&file)?;
            let digest = typed_data.pre_image_with(&config)?.digest;
            let signature = typed_signer::eip712::sign_hash(&digest, &key_bytes)?;
            let signer = address_from_private_key(&key_bytes)?;
            log_info!("cli", "signed typed data", primary_type = typed_data.primary_type, signer = signer);
            Ok(Outcome::ok(json!({
                "digest": hex_word(&digest),
                "signature": signature.to_hex(),
                "r": hex_word(&signature.r),
                "s": hex_word(&signature.s),
                "v": signature.v,
                "signer": signer,
            })))
        }
        Command::Recover { file, signature } => {
            let signature = Eip712Signature::from_hex(&signature)?;
            let digest = load_typed_data(&file)?.pre_image_with(&config)?.digest;
            let signer = recover_address_with(&digest, &signature, &config)?;
            Ok(Outcome::ok(json!({ "digest": hex_word(&digest), "signer": signer })))
        }
        Command::Verify { file, signature, address } => {
            let signature = Eip712Signature::from_hex(&signature)?;
            let expected = Address::parse(&address)?;
            let digest = load_typed_data(&file)?.pre_image_with(&config)?.digest;
            let signer = recover_address_with(&digest, &signature, &config)?;
            let valid = signer == expected;
            Ok(Outcome {
                output: json!({
                    "digest": hex_word(&digest),
                    "valid": valid,
                    "signer": signer,
                    "expected": expected,
                }),
                success: valid,
            })
        }
        Command::Audit { file, remote } => {
            let typed_data = load_typed_data(&file)?;
            let raw = fs::read_to_string(&remote).with_context(|| format!("reading {}", remote.display()))?;
            let remote: RemoteDomain = serde_json::from_str(&raw)?;
            let report = audit(&typed_data.domain, &remote);
            Ok(Outcome {
                success: report.is_consistent(),
                output: json!({
                    "consistent": report.is_consistent(),
                    "report": report,
                }),
            })
        }
    }
}

fn load_typed_data(path: &Path) -> Result<TypedData> {
    let raw = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    Ok(TypedData::from_json(&raw)?)
}

fn hex_word(bytes: &[u8; 32]) -> String {
    format!("0x{}", hex::encode(bytes))
}

fn render(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}

/// Flatten any failure into the serializable error shape
fn to_signer_error(err: &anyhow::Error) -> SignerError {
    if let Some(e) = err.downcast_ref::<SignerError>() {
        return e.clone();
    }
    if let Some(e) = err.downcast_ref::<typed_signer::eip712::Eip712Error>() {
        return SignerError::from(e.clone());
    }
    if let Some(e) = err.downcast_ref::<serde_json::Error>() {
        return SignerError::new(ErrorCode::JsonError, e.to_string());
    }
    if let Some(e) = err.downcast_ref::<std::io::Error>() {
        // the outermost context names the file
        return SignerError::new(ErrorCode::IoError, e.to_string()).with_details(err.to_string());
    }
    SignerError::invalid_input(format!("{:#}", err))
}
