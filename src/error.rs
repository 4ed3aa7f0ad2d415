//! Error types for driftscan.
//!
//! Uses `thiserror` for ergonomic error definitions. Expected negative
//! outcomes (closed port, silent host) are not errors and never appear here.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while probing and scanning.
#[derive(Error, Debug)]
pub enum ScanError {
    /// A probe failed in a way that is not a plain "closed" answer.
    /// Aborts the scan of the affected host only.
    #[error("unrecoverable probe failure on {target}:{port}: {reason}")]
    Unrecoverable {
        target: String,
        port: u16,
        reason: String,
    },

    #[error("liveness probe unavailable: {0}")]
    LivenessUnavailable(String),
}

/// Result type alias for scan operations.
pub type ScanResult<T> = Result<T, ScanError>;

/// Errors raised while enumerating users on a discovered host.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DiscoveryError {
    #[error("no credentials found for {capability} on {address}")]
    CredentialsNotFound { capability: String, address: String },

    #[error("no user discovery strategy supports {0}")]
    NoStrategyAvailable(String),

    #[error("invalid credentials for {address}: {reason}")]
    InvalidCredentials { address: String, reason: String },

    #[error("authentication failed for {address}: {reason}")]
    Authentication { address: String, reason: String },

    #[error("transport error for {address}: {reason}")]
    Transport { address: String, reason: String },
}

/// Result type alias for user discovery.
pub type DiscoveryResult<T> = Result<T, DiscoveryError>;

/// Errors raised by the file-backed inventory and credential stores.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("failed to read {path}: {reason}")]
    LoadFailed { path: PathBuf, reason: String },

    #[error("malformed data in {path}: {reason}")]
    InvalidFormat { path: PathBuf, reason: String },
}

/// Result type alias for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors raised while locating or reading configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("could not determine configuration directory")]
    DirectoryNotFound,

    #[error("failed to read {path}: {reason}")]
    ReadFailed { path: PathBuf, reason: String },

    #[error("invalid settings format: {0}")]
    InvalidFormat(String),
}

/// Result type alias for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Top-level error for command execution.
#[derive(Error, Debug)]
pub enum CliError {
    /// Malformed target or port expression. Raised before any probing.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error(transparent)]
    Scan(#[from] ScanError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Port(#[from] crate::types::PortError),

    #[error(transparent)]
    Target(#[from] crate::types::TargetError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for command execution.
pub type CliResult<T> = Result<T, CliError>;
