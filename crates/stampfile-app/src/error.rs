//! # Design
//!
//! - Centralize application-level errors for bootstrap and the request loop.
//! - Keep error messages constant while carrying context fields for debugging.
//! - Preserve source errors without re-logging at call sites.

use std::io;

use thiserror::Error;

/// Result alias for application operations.
pub type AppResult<T> = Result<T, AppError>;

/// Application-level error type.
#[derive(Debug, Error)]
pub enum AppError {
    /// Configuration could not be loaded or validated.
    #[error("configuration operation failed")]
    Config {
        /// Operation identifier.
        operation: &'static str,
        /// Source configuration error.
        source: stampfile_config::ConfigError,
    },
    /// Telemetry could not be initialised.
    #[error("telemetry operation failed")]
    Telemetry {
        /// Operation identifier.
        operation: &'static str,
        /// Description of the failure.
        detail: String,
    },
    /// The writer could not be started.
    #[error("writer operation failed")]
    Writer {
        /// Operation identifier.
        operation: &'static str,
        /// Source writer error.
        source: stampfile_writer::WriterError,
    },
    /// Reading requests or printing output failed.
    #[error("io operation failed")]
    Io {
        /// Operation identifier.
        operation: &'static str,
        /// Source IO error.
        source: io::Error,
    },
    /// A background task panicked or was cancelled.
    #[error("background task failed")]
    Task {
        /// Operation identifier.
        operation: &'static str,
        /// Source join error.
        source: tokio::task::JoinError,
    },
}

impl AppError {
    pub(crate) const fn config(
        operation: &'static str,
        source: stampfile_config::ConfigError,
    ) -> Self {
        Self::Config { operation, source }
    }

    pub(crate) fn telemetry(operation: &'static str, detail: impl ToString) -> Self {
        Self::Telemetry {
            operation,
            detail: detail.to_string(),
        }
    }

    pub(crate) const fn writer(
        operation: &'static str,
        source: stampfile_writer::WriterError,
    ) -> Self {
        Self::Writer { operation, source }
    }

    pub(crate) const fn io(operation: &'static str, source: io::Error) -> Self {
        Self::Io { operation, source }
    }

    pub(crate) const fn task(operation: &'static str, source: tokio::task::JoinError) -> Self {
        Self::Task { operation, source }
    }
}
