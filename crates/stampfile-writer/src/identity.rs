//! Unique file identity used for staleness detection.
//!
//! On unix the identity is the `(device, inode)` pair. Elsewhere it falls back
//! to the creation timestamp, which detects replacement but not every
//! delete-and-recreate within the timestamp resolution.

use std::fs::{self, File, Metadata};
use std::io;
use std::path::Path;

#[cfg(unix)]
use std::os::unix::fs::MetadataExt;
#[cfg(not(unix))]
use std::time::SystemTime;

/// Identifier of the file a stream is attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileIdentity {
    #[cfg(unix)]
    device: u64,
    #[cfg(unix)]
    inode: u64,
    #[cfg(not(unix))]
    created: Option<SystemTime>,
}

impl FileIdentity {
    /// Identity described by `metadata`.
    #[must_use]
    pub fn from_metadata(metadata: &Metadata) -> Self {
        #[cfg(unix)]
        {
            Self {
                device: metadata.dev(),
                inode: metadata.ino(),
            }
        }
        #[cfg(not(unix))]
        {
            Self {
                created: metadata.created().ok(),
            }
        }
    }

    /// Identity of an open file.
    ///
    /// # Errors
    ///
    /// Returns the IO error raised while reading the descriptor's metadata.
    pub fn of_file(file: &File) -> io::Result<Self> {
        file.metadata().map(|metadata| Self::from_metadata(&metadata))
    }

    /// Identity of whatever currently lives at `path`.
    ///
    /// # Errors
    ///
    /// Returns the IO error raised by `stat`, including `NotFound`.
    pub fn of_path(path: &Path) -> io::Result<Self> {
        fs::metadata(path).map(|metadata| Self::from_metadata(&metadata))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_file_and_path_agree() -> anyhow::Result<()> {
        let temp = stampfile_test_support::fixtures::temp_dir("stampfile-identity-")?;
        let path = temp.path().join("a.txt");
        let file = File::create(&path)?;
        assert_eq!(FileIdentity::of_file(&file)?, FileIdentity::of_path(&path)?);
        Ok(())
    }

    #[cfg(unix)]
    #[test]
    fn replacement_changes_identity() -> anyhow::Result<()> {
        let temp = stampfile_test_support::fixtures::temp_dir("stampfile-identity-")?;
        let path = temp.path().join("a.txt");
        let first = File::create(&path)?;
        let before = FileIdentity::of_file(&first)?;

        let replacement = temp.path().join("b.txt");
        fs::write(&replacement, b"new")?;
        fs::rename(&replacement, &path)?;
        assert_ne!(before, FileIdentity::of_path(&path)?);
        Ok(())
    }

    #[test]
    fn missing_path_is_an_error() -> anyhow::Result<()> {
        let temp = stampfile_test_support::fixtures::temp_dir("stampfile-identity-")?;
        let err = FileIdentity::of_path(&temp.path().join("missing"));
        assert!(matches!(err, Err(ref e) if e.kind() == io::ErrorKind::NotFound));
        Ok(())
    }
}
