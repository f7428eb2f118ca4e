//! # Design
//!
//! - Constant error messages; paths and identifiers travel as context fields.
//! - Request-level failures map onto a [`FailureKind`] for reporting.
//! - `report` renders the one human-readable line sent to the status sink.

use std::io;
use std::path::PathBuf;

use stampfile_config::ConfigError;
use stampfile_events::FailureKind;
use thiserror::Error;
use uuid::Uuid;

/// Result type for writer operations.
pub type WriterResult<T> = Result<T, WriterError>;

/// Errors produced by the writer and its handles.
#[derive(Debug, Error)]
pub enum WriterError {
    /// Configuration failed validation at construction.
    #[error("invalid writer configuration")]
    Config {
        /// Underlying configuration error.
        #[from]
        source: ConfigError,
    },
    /// The writer was spawned outside a tokio runtime.
    #[error("writer requires a tokio runtime")]
    MissingRuntime,
    /// Neither the request nor the configuration named a directory.
    #[error("no directory resolved for request")]
    MissingDirectory {
        /// Request that could not be placed.
        request_id: Uuid,
    },
    /// The target directory could not be created.
    #[error("failed to create directory")]
    CreateDirectory {
        /// Directory that was being created.
        path: PathBuf,
        /// Underlying IO error.
        source: io::Error,
    },
    /// The output stream could not be opened.
    #[error("failed to open output stream")]
    Open {
        /// File that was being opened.
        path: PathBuf,
        /// Underlying IO error.
        source: io::Error,
    },
    /// Writing or flushing the payload failed.
    #[error("failed to write payload")]
    Write {
        /// File that was being written.
        path: PathBuf,
        /// Underlying IO error.
        source: io::Error,
    },
    /// Servicing a request failed unexpectedly and the queue was reset.
    #[error("writer fault")]
    Fault {
        /// Description of the fault.
        detail: String,
    },
    /// The request was discarded when the queue was reset after a fault.
    #[error("request aborted by writer fault")]
    Aborted,
    /// The writer has shut down.
    #[error("writer closed")]
    Closed,
}

impl WriterError {
    /// Failure category for request-level errors.
    #[must_use]
    pub const fn failure_kind(&self) -> Option<FailureKind> {
        match self {
            Self::MissingDirectory { .. } => Some(FailureKind::MissingDirectory),
            Self::CreateDirectory { .. } => Some(FailureKind::CreateDirectory),
            Self::Open { .. } => Some(FailureKind::Open),
            Self::Write { .. } => Some(FailureKind::Write),
            Self::Config { .. }
            | Self::MissingRuntime
            | Self::Fault { .. }
            | Self::Aborted
            | Self::Closed => None,
        }
    }

    /// Human-readable report carrying the underlying cause.
    #[must_use]
    pub fn report(&self) -> String {
        match self {
            Self::CreateDirectory { path, source }
            | Self::Open { path, source }
            | Self::Write { path, source } => {
                format!("{self}: {source} ({})", path.display())
            }
            Self::Fault { detail } => format!("{self}: {detail}"),
            _ => self.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn io_failures_keep_source_and_report_cause() {
        let err = WriterError::Open {
            path: PathBuf::from("/out/a.txt"),
            source: io::Error::other("denied"),
        };
        assert_eq!(err.to_string(), "failed to open output stream");
        assert!(err.source().is_some());
        assert_eq!(err.failure_kind(), Some(FailureKind::Open));
        let report = err.report();
        assert!(report.contains("denied"));
        assert!(report.contains("a.txt"));
    }

    #[test]
    fn lifecycle_errors_have_no_failure_kind() {
        assert!(WriterError::Closed.failure_kind().is_none());
        assert!(WriterError::Aborted.failure_kind().is_none());
        let fault = WriterError::Fault {
            detail: "panicked".to_string(),
        };
        assert!(fault.failure_kind().is_none());
        assert_eq!(fault.report(), "writer fault: panicked");
    }
}
