//! # Design
//!
//! - Constant error messages; the offending field and value travel as context.
//! - Preserve IO and JSON sources for callers that want the full chain.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Result alias for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Primary error type for configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Field contained an invalid value.
    #[error("invalid configuration field")]
    InvalidField {
        /// Field that failed validation.
        field: &'static str,
        /// Machine-readable reason for the failure.
        reason: &'static str,
        /// Offending value when available.
        value: Option<String>,
    },
    /// Configuration document could not be read.
    #[error("configuration io failure")]
    Io {
        /// Path of the configuration document.
        path: PathBuf,
        /// Underlying IO error.
        source: io::Error,
    },
    /// Configuration document was not valid JSON for the writer model.
    #[error("configuration parse failure")]
    Parse {
        /// Path of the configuration document.
        path: PathBuf,
        /// Underlying JSON error.
        source: serde_json::Error,
    },
}

impl ConfigError {
    pub(crate) const fn invalid(
        field: &'static str,
        reason: &'static str,
        value: Option<String>,
    ) -> Self {
        Self::InvalidField {
            field,
            reason,
            value,
        }
    }
}
