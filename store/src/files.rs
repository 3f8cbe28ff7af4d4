//! File access used by the store and the orchestrator.
//!
//! The [`DumpFiles`] trait is the seam between schema loading and the
//! filesystem; [`LocalFiles`] implements it over `std::fs`.

use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;

/// Operations on dump files.
pub trait DumpFiles: Send + Sync {
    fn exists(&self, path: &Path) -> bool;

    /// Opens `path` as a line source.
    fn open(&self, path: &Path) -> io::Result<Box<dyn BufRead + Send>>;

    /// Copies `from` to `to`, replacing `to`.
    fn copy(&self, from: &Path, to: &Path) -> io::Result<()>;

    fn delete(&self, path: &Path) -> io::Result<()>;

    /// Makes sure the folder `path` exists. Does nothing by default.
    fn ensure_dir(&self, _path: &Path) -> io::Result<()> {
        Ok(())
    }
}

/// [`DumpFiles`] over the local filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalFiles;

impl DumpFiles for LocalFiles {
    fn exists(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn open(&self, path: &Path) -> io::Result<Box<dyn BufRead + Send>> {
        Ok(Box::new(BufReader::new(File::open(path)?)))
    }

    /// Creates the parent folder of `to` when it is missing.
    fn copy(&self, from: &Path, to: &Path) -> io::Result<()> {
        if let Some(parent) = to.parent() {
            std::fs::create_dir_all(parent)?;
        }
        if from == to {
            return Ok(());
        }
        std::fs::copy(from, to).map(|_| ())
    }

    fn delete(&self, path: &Path) -> io::Result<()> {
        std::fs::remove_file(path)
    }

    fn ensure_dir(&self, path: &Path) -> io::Result<()> {
        std::fs::create_dir_all(path)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Read;

    use super::*;

    #[test]
    fn test_copy_creates_folder_and_replaces() {
        let dir = tempfile::tempdir().unwrap();
        let from = dir.path().join("fresh.dump");
        let to = dir.path().join("nested").join("managed.dump");
        std::fs::write(&from, "new").unwrap();

        LocalFiles.copy(&from, &to).unwrap();
        assert!(LocalFiles.exists(&to));

        std::fs::write(&from, "newer").unwrap();
        LocalFiles.copy(&from, &to).unwrap();
        let mut content = String::new();
        LocalFiles.open(&to).unwrap().read_to_string(&mut content).unwrap();
        assert_eq!(content, "newer");
    }

    #[test]
    fn test_copy_onto_itself_keeps_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("same.dump");
        std::fs::write(&path, "keep").unwrap();

        LocalFiles.copy(&path, &path).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "keep");
    }

    #[test]
    fn test_delete_and_exists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gone.dump");
        std::fs::write(&path, "x").unwrap();

        LocalFiles.delete(&path).unwrap();
        assert!(!LocalFiles.exists(&path));
        assert!(LocalFiles.delete(&path).is_err());
        assert!(!LocalFiles.exists(dir.path()));
    }
}
