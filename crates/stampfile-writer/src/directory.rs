//! Directory creation collaborator.

use std::fs;
use std::io;
use std::path::Path;

/// Ensures a directory exists before a stream is opened inside it.
pub trait DirectoryCreator: Send + Sync {
    /// Create `path` and any missing parents; succeeding if it already exists.
    ///
    /// # Errors
    ///
    /// Returns the underlying IO error when the directory cannot be created.
    fn ensure(&self, path: &Path) -> io::Result<()>;
}

/// Creates directories with [`fs::create_dir_all`].
#[derive(Debug, Clone, Copy, Default)]
pub struct CreateDirAll;

impl DirectoryCreator for CreateDirAll {
    fn ensure(&self, path: &Path) -> io::Result<()> {
        fs::create_dir_all(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_dir_all_is_idempotent() -> anyhow::Result<()> {
        let temp = stampfile_test_support::fixtures::temp_dir("stampfile-dir-")?;
        let nested = temp.path().join("a").join("b");
        CreateDirAll.ensure(&nested)?;
        CreateDirAll.ensure(&nested)?;
        assert!(nested.is_dir());
        Ok(())
    }

    #[test]
    fn create_dir_all_fails_beneath_a_file() -> anyhow::Result<()> {
        let temp = stampfile_test_support::fixtures::temp_dir("stampfile-dir-")?;
        let file = temp.path().join("plain");
        fs::write(&file, b"x")?;
        assert!(CreateDirAll.ensure(&file.join("child")).is_err());
        Ok(())
    }
}
