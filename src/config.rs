//! Signer Configuration
//!
//! Options that change how strictly input is checked:
//! - `strict_types`: structs must only reference types declared earlier
//!   (or themselves), and cycles are rejected at registration time
//! - `require_low_s`: recovery rejects high-s signatures (EIP-2)
//! - `log_level`: minimum level written by the logger
//!
//! The configuration is a plain value handed to the operations that honor it.

use crate::error::{SignerError, SignerResult};
use crate::utils::logging::{self, LogLevel};

pub const ENV_STRICT: &str = "TYPED_SIGNER_STRICT";
pub const ENV_LOW_S: &str = "TYPED_SIGNER_LOW_S";
pub const ENV_LOG: &str = "TYPED_SIGNER_LOG";

/// Signer settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignerConfig {
    /// Reject forward references when building a type registry
    pub strict_types: bool,
    /// Reject signatures with `s > n/2` on recovery
    pub require_low_s: bool,
    /// Minimum log level
    pub log_level: LogLevel,
}

impl Default for SignerConfig {
    fn default() -> Self {
        Self::standard()
    }
}

impl SignerConfig {
    /// Accept any declaration order and either `s` half
    pub fn standard() -> Self {
        Self {
            strict_types: false,
            require_low_s: false,
            log_level: LogLevel::Warn,
        }
    }

    /// Declaration-ordered types, low-s only
    pub fn strict() -> Self {
        Self {
            strict_types: true,
            require_low_s: true,
            log_level: LogLevel::Warn,
        }
    }

    /// Read overrides from the process environment
    pub fn from_env() -> SignerResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Apply overrides from `lookup` on top of the standard preset.
    ///
    /// Unset variables keep their defaults; unparseable ones are an error.
    pub fn from_lookup<F>(lookup: F) -> SignerResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::standard();
        if let Some(value) = lookup(ENV_STRICT) {
            config.strict_types = parse_flag(ENV_STRICT, &value)?;
        }
        if let Some(value) = lookup(ENV_LOW_S) {
            config.require_low_s = parse_flag(ENV_LOW_S, &value)?;
        }
        if let Some(value) = lookup(ENV_LOG) {
            config.log_level = value
                .parse()
                .map_err(|e: String| SignerError::config(format!("{}: {}", ENV_LOG, e)))?;
        }
        Ok(config)
    }

    /// Warnings for settings that weaken verification
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        if !self.require_low_s {
            warnings.push("high-s signatures are accepted on recovery".to_string());
        }
        if self.log_level == LogLevel::Debug {
            warnings.push("debug logging prints type names and shortened digests".to_string());
        }
        warnings
    }

    /// Install `log_level` as the process-wide minimum
    pub fn apply_logging(&self) {
        logging::set_min_level(self.log_level);
    }
}

fn parse_flag(key: &str, value: &str) -> SignerResult<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        other => Err(SignerError::config(format!("{}: expected a boolean, got {:?}", key, other))),
    }
}
