//! One open output stream and the identity of the file behind it.

use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::identity::FileIdentity;

/// How a stream is opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    /// Create or truncate.
    Truncate,
    /// Create or append.
    Append,
}

/// Open output stream bound to one absolute path.
#[derive(Debug)]
pub struct StreamHandle {
    writer: BufWriter<File>,
    path: PathBuf,
    identity: Option<FileIdentity>,
}

impl StreamHandle {
    /// Open `path` and capture the identity of the opened file.
    ///
    /// A failed identity capture leaves the handle usable with no identity.
    ///
    /// # Errors
    ///
    /// Returns the IO error raised while opening the file.
    pub fn open(path: &Path, mode: OpenMode) -> io::Result<Self> {
        let mut options = OpenOptions::new();
        options.create(true);
        match mode {
            OpenMode::Truncate => options.write(true).truncate(true),
            OpenMode::Append => options.append(true),
        };
        let file = options.open(path)?;
        let identity = FileIdentity::of_file(&file).ok();
        Ok(Self {
            writer: BufWriter::new(file),
            path: path.to_path_buf(),
            identity,
        })
    }

    /// Path the stream was opened on.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Identity captured at open time, if any.
    #[must_use]
    pub const fn identity(&self) -> Option<FileIdentity> {
        self.identity
    }

    /// Identity of the open file, retrying the capture if it failed before.
    pub fn refresh_identity(&mut self) -> Option<FileIdentity> {
        if self.identity.is_none() {
            self.identity = FileIdentity::of_file(self.writer.get_ref()).ok();
        }
        self.identity
    }

    #[cfg(test)]
    pub(crate) const fn forget_identity(&mut self) {
        self.identity = None;
    }

    /// Write `bytes` and flush them to the file.
    ///
    /// # Errors
    ///
    /// Returns the IO error raised while writing or flushing.
    pub fn write_payload(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.writer.write_all(bytes)?;
        self.writer.flush()
    }

    /// Flush and close the stream.
    ///
    /// # Errors
    ///
    /// Returns the IO error raised by the final flush.
    pub fn close(mut self) -> io::Result<()> {
        self.writer.flush()
    }
}
