//! Unified error handling for dchu
//!
//! This crate provides the single error type shared by the firmware channel,
//! the sensor decoder, the actuator controller and the command-line tool.
//! It uses thiserror for ergonomic error definitions with proper Display and Error trait impls.

use std::io;
use std::path::PathBuf;

/// Result type alias using DchuError
pub type Result<T> = std::result::Result<T, DchuError>;

/// Unified error type for all dchu operations
#[derive(thiserror::Error, Debug)]
pub enum DchuError {
    // ============================================================================
    // Firmware Channel Errors
    // ============================================================================
    #[error("Firmware channel not ready: {0}")]
    NotReady(String),

    #[error("Firmware call {function} failed: {reason}")]
    IoFailure {
        function: u32,
        reason: String,
    },

    // ============================================================================
    // Decode Errors
    // ============================================================================
    #[error("Malformed sensor buffer: {0}")]
    MalformedBuffer(String),

    // ============================================================================
    // Validation Errors
    // ============================================================================
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    // ============================================================================
    // I/O and Configuration Errors
    // ============================================================================
    #[error("Failed to access {path}: {source}")]
    NodeAccess {
        path: PathBuf,
        source: io::Error,
    },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),
}

impl DchuError {
    /// Create a not-ready error from a string
    pub fn not_ready(msg: impl Into<String>) -> Self {
        Self::NotReady(msg.into())
    }

    /// Create a firmware call failure for the given function selector
    pub fn io_failure(function: u32, reason: impl Into<String>) -> Self {
        Self::IoFailure {
            function,
            reason: reason.into(),
        }
    }

    /// Create a malformed buffer error from a string
    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::MalformedBuffer(msg.into())
    }

    /// Create an invalid argument error from a string
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    /// Create a config error from a string
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a node access error
    pub fn node_access(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::NodeAccess {
            path: path.into(),
            source,
        }
    }

    /// True for failures of the firmware round trip itself
    pub fn is_firmware_failure(&self) -> bool {
        matches!(self, Self::NotReady(_) | Self::IoFailure { .. })
    }
}
