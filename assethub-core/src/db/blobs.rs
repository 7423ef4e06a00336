//! Content blob store
//!
//! Entity payloads live on local disk as `<data_dir>/<uuid>.dat`. A blob
//! is written exactly once on upload and is immutable afterwards; delete
//! is not exposed.

use crate::error::Result;
use std::fs;
use std::path::{Path, PathBuf};

/// Path of the blob file backing an entity.
pub fn blob_path(data_dir: &Path, entity_uuid: &str) -> PathBuf {
    data_dir.join(format!("{}.dat", entity_uuid))
}

/// Write an entity's payload.
pub fn write_blob(data_dir: &Path, entity_uuid: &str, bytes: &[u8]) -> Result<()> {
    fs::create_dir_all(data_dir)?;
    fs::write(blob_path(data_dir, entity_uuid), bytes)?;
    Ok(())
}

/// Read an entity's payload.
pub fn read_blob(data_dir: &Path, entity_uuid: &str) -> Result<Vec<u8>> {
    Ok(fs::read(blob_path(data_dir, entity_uuid))?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_blob_path_shape() {
        let path = blob_path(Path::new("/tmp/data"), "abc");
        assert_eq!(path, PathBuf::from("/tmp/data/abc.dat"));
    }

    #[test]
    fn test_write_then_read() {
        let dir = TempDir::new().unwrap();
        write_blob(dir.path(), "e1", b"hello").unwrap();
        assert_eq!(read_blob(dir.path(), "e1").unwrap(), b"hello");
        assert!(blob_path(dir.path(), "e1").exists());
    }

    #[test]
    fn test_read_missing_blob_fails() {
        let dir = TempDir::new().unwrap();
        assert!(read_blob(dir.path(), "missing").is_err());
    }
}
