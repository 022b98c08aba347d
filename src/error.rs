//! Error types for gateway-cache-core

use thiserror::Error;

/// Failures of the backing option store.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Store lock poisoned")]
    Poisoned,
}

/// Rejected constant name or value.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConstantError {
    #[error("Unknown {kind} constant name: {name}")]
    UnknownName { kind: &'static str, name: String },

    #[error("Unknown {kind} constant value: {value}")]
    UnknownValue { kind: &'static str, value: String },
}

/// Rejected CIDR input.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CidrError {
    #[error("Invalid {family} address: {address}")]
    InvalidAddress { family: &'static str, address: String },

    #[error("Prefix length {prefix} out of range (max {max})")]
    InvalidPrefix { prefix: u8, max: u8 },

    #[error("Invalid CIDR notation: {0}")]
    InvalidNotation(String),
}

/// Configuration loading failures.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),
}
