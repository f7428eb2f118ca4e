//! Stream lifecycle decisions for one writer instance.
//!
//! # Design
//! - The manager owns the single stream slot; `take_current` and `install` are
//!   the only places it changes.
//! - Overwrite and dynamic-directory writes use one-shot streams; only
//!   fixed-directory appends keep a stream open between requests.
//! - All IO here is blocking; the worker runs it off the async executor.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use stampfile_config::{WriteMode, WriterConfig};
use stampfile_telemetry::Metrics;
use tracing::{debug, warn};

use crate::directory::DirectoryCreator;
use crate::error::{WriterError, WriterResult};
use crate::identity::FileIdentity;
use crate::model::{Payload, WriteOutcome, WriteRequest, WrittenMessage};
use crate::naming::NameGenerator;
use crate::payload::PayloadEncoder;
use crate::stream::{OpenMode, StreamHandle};

/// Why a stream was opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenReason {
    /// Truncating one-shot stream.
    Overwrite,
    /// Append stream for a writer without a fixed directory.
    Dynamic,
    /// First retained append stream, or after a write failure.
    Fresh,
    /// Replacement for a retained stream whose file moved or vanished.
    Stale,
}

impl OpenReason {
    /// Label used for metrics.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Overwrite => "overwrite",
            Self::Dynamic => "dynamic",
            Self::Fresh => "fresh",
            Self::Stale => "stale",
        }
    }
}

/// Immutable inputs shared by every manager a writer creates.
#[derive(Clone)]
pub struct StreamSettings {
    config: Arc<WriterConfig>,
    names: Arc<dyn NameGenerator>,
    directories: Arc<dyn DirectoryCreator>,
    encoder: PayloadEncoder,
    metrics: Metrics,
}

impl StreamSettings {
    /// Bundle the configuration and collaborators for a manager.
    ///
    /// # Errors
    ///
    /// Returns [`WriterError::Config`] when the configuration is invalid.
    pub fn new(
        config: WriterConfig,
        names: Arc<dyn NameGenerator>,
        directories: Arc<dyn DirectoryCreator>,
        metrics: Metrics,
    ) -> WriterResult<Self> {
        config.validate()?;
        let encoder = PayloadEncoder::from_config(&config)?;
        Ok(Self {
            config: Arc::new(config),
            names,
            directories,
            encoder,
            metrics,
        })
    }

    /// Configuration the settings were built from.
    #[must_use]
    pub fn config(&self) -> &WriterConfig {
        &self.config
    }
}

struct Target {
    shortname: PathBuf,
    fullname: PathBuf,
}

/// Resolves the stream for each request and performs the write.
pub struct StreamManager {
    settings: StreamSettings,
    slot: Option<StreamHandle>,
}

impl StreamManager {
    /// Manager with no open stream.
    #[must_use]
    pub const fn new(settings: StreamSettings) -> Self {
        Self {
            settings,
            slot: None,
        }
    }

    /// Path of the retained stream, if one is open.
    #[must_use]
    pub fn open_path(&self) -> Option<&Path> {
        self.slot.as_ref().map(StreamHandle::path)
    }

    /// Service one request.
    ///
    /// # Errors
    ///
    /// Returns the request-level failure; the manager stays usable.
    pub fn service(
        &mut self,
        request: &WriteRequest,
        now: DateTime<Utc>,
    ) -> WriterResult<WriteOutcome> {
        let base = request
            .directory
            .as_ref()
            .or(self.settings.config.directory.as_ref())
            .ok_or(WriterError::MissingDirectory {
                request_id: request.id,
            })?
            .clone();
        let Some(payload) = request.payload.as_ref() else {
            return Ok(WriteOutcome::Skipped {
                request_id: request.id,
            });
        };

        let target = self.resolve_target(&base, now)?;
        let bytes = self.settings.encoder.encode(payload);

        match self.settings.config.write_mode {
            WriteMode::Overwrite => {
                self.release();
                self.write_once(&target.fullname, &bytes, OpenMode::Truncate, OpenReason::Overwrite)?;
            }
            WriteMode::Append if self.settings.config.is_dynamic() => {
                self.write_once(&target.fullname, &bytes, OpenMode::Append, OpenReason::Dynamic)?;
            }
            WriteMode::Append => self.write_retained(&target.fullname, &bytes)?,
        }

        Ok(WriteOutcome::Written(self.written_message(
            request,
            payload,
            target,
            bytes.len(),
        )))
    }

    /// Flush and close the retained stream, if any.
    pub fn release(&mut self) {
        if let Some(handle) = self.slot.take() {
            close_quietly(handle);
        }
    }

    fn resolve_target(&self, base: &Path, now: DateTime<Utc>) -> WriterResult<Target> {
        let name = self.settings.names.generate(now);
        let directory = base.join(&name.subdirectory);
        if self.settings.config.create_dir {
            self.settings
                .directories
                .ensure(&directory)
                .map_err(|source| WriterError::CreateDirectory {
                    path: directory.clone(),
                    source,
                })?;
        }
        let joined = directory.join(&name.file_name);
        let fullname = std::path::absolute(&joined).map_err(|source| WriterError::Open {
            path: joined.clone(),
            source,
        })?;
        Ok(Target {
            shortname: Path::new(&name.subdirectory).join(&name.file_name),
            fullname,
        })
    }

    fn write_once(
        &self,
        path: &Path,
        bytes: &[u8],
        mode: OpenMode,
        reason: OpenReason,
    ) -> WriterResult<()> {
        let mut handle = self.open(path, mode, reason)?;
        if let Err(source) = handle.write_payload(bytes) {
            close_quietly(handle);
            return Err(write_error(path, source));
        }
        handle.close().map_err(|source| write_error(path, source))
    }

    fn write_retained(&mut self, path: &Path, bytes: &[u8]) -> WriterResult<()> {
        let mut handle = match self.take_current(path) {
            Ok(handle) => handle,
            Err(reason) => self.open(path, OpenMode::Append, reason)?,
        };
        if let Err(source) = handle.write_payload(bytes) {
            close_quietly(handle);
            return Err(write_error(path, source));
        }
        self.install(handle);
        Ok(())
    }

    /// Take the retained stream if it still writes to the file at `path`.
    /// A stale stream is closed; the error carries the reason to reopen.
    fn take_current(&mut self, path: &Path) -> Result<StreamHandle, OpenReason> {
        let Some(mut handle) = self.slot.take() else {
            return Err(OpenReason::Fresh);
        };
        if is_current(&mut handle, path) {
            return Ok(handle);
        }
        debug!(
            previous = %handle.path().display(),
            path = %path.display(),
            "retained stream is stale; reopening"
        );
        close_quietly(handle);
        Err(OpenReason::Stale)
    }

    fn install(&mut self, handle: StreamHandle) {
        debug_assert!(self.slot.is_none(), "stream slot already occupied");
        self.slot = Some(handle);
    }

    fn open(&self, path: &Path, mode: OpenMode, reason: OpenReason) -> WriterResult<StreamHandle> {
        let handle = StreamHandle::open(path, mode).map_err(|source| WriterError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        self.settings.metrics.inc_stream_open(reason.as_str());
        Ok(handle)
    }

    fn written_message(
        &self,
        request: &WriteRequest,
        payload: &Payload,
        target: Target,
        bytes: usize,
    ) -> WrittenMessage {
        let payload = if self.settings.config.clear_payload {
            Payload::cleared()
        } else {
            payload.clone()
        };
        WrittenMessage {
            request_id: request.id,
            fields: request.fields.clone(),
            directory: request.directory.clone(),
            payload,
            shortname: target.shortname,
            fullname: target.fullname,
            bytes: u64::try_from(bytes).unwrap_or(u64::MAX),
        }
    }
}

fn is_current(handle: &mut StreamHandle, path: &Path) -> bool {
    if handle.path() != path {
        return false;
    }
    let Ok(on_disk) = FileIdentity::of_path(path) else {
        return false;
    };
    handle.refresh_identity() == Some(on_disk)
}

fn close_quietly(handle: StreamHandle) {
    let path = handle.path().to_path_buf();
    if let Err(error) = handle.close() {
        warn!(error = %error, path = %path.display(), "failed to flush stream on close");
    }
}

fn write_error(path: &Path, source: std::io::Error) -> WriterError {
    WriterError::Write {
        path: path.to_path_buf(),
        source,
    }
}
