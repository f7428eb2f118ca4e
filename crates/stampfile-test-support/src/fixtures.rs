//! Temporary directory fixtures.

use std::fs;
use std::path::PathBuf;

use anyhow::Result;
use tempfile::TempDir;

fn workspace_root() -> PathBuf {
    let manifest_dir = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    manifest_dir
        .ancestors()
        .nth(2)
        .map_or(manifest_dir.clone(), PathBuf::from)
}

/// Scratch root shared by every suite, kept inside the workspace `target/`.
///
/// # Errors
///
/// Returns an error if the directory cannot be created.
pub fn scratch_root() -> Result<PathBuf> {
    let root = workspace_root().join("target").join("test-scratch");
    fs::create_dir_all(&root)?;
    Ok(root)
}

/// Create a uniquely named temporary directory removed on drop.
///
/// # Errors
///
/// Returns an error if the scratch root or the directory cannot be created.
pub fn temp_dir(prefix: &str) -> Result<TempDir> {
    Ok(tempfile::Builder::new()
        .prefix(prefix)
        .tempdir_in(scratch_root()?)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn temp_dir_lives_under_scratch_root() -> Result<()> {
        let temp = temp_dir("fixture-")?;
        assert!(temp.path().starts_with(scratch_root()?));
        assert!(temp.path().is_dir());
        Ok(())
    }
}
