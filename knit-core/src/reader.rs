//! Module file reading with content hashing.

use std::io;
use std::path::{Path, PathBuf};

use xxhash_rust::xxh3::xxh3_64;

use crate::error::{BuildError, Result};

/// A module file as read from disk.
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub path: PathBuf,
    pub content: String,
    /// Hash of the raw bytes, see [`content_hash`].
    pub hash: String,
}

/// Read `path` once, hash its bytes and decode them as UTF-8.
pub async fn read_source(path: &Path) -> Result<SourceFile> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| BuildError::io(path, e))?;
    let hash = content_hash(&bytes);
    let content = String::from_utf8(bytes)
        .map_err(|e| BuildError::io(path, io::Error::new(io::ErrorKind::InvalidData, e)))?;

    Ok(SourceFile {
        path: path.to_path_buf(),
        content,
        hash,
    })
}

/// `xxh3:<16 hex digits>` of `bytes`.
pub fn content_hash(bytes: &[u8]) -> String {
    format!("xxh3:{:016x}", xxh3_64(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_content_hash_format() {
        let hash = content_hash(b"module.exports = 1;");
        assert!(hash.starts_with("xxh3:"));
        assert_eq!(hash.len(), "xxh3:".len() + 16);
        assert_eq!(hash, content_hash(b"module.exports = 1;"));
        assert_ne!(hash, content_hash(b"module.exports = 2;"));
    }

    #[tokio::test]
    async fn test_read_source() {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let path = dir.path().join("a.js");
        std::fs::write(&path, "const a = 1;").unwrap();

        let file = read_source(&path).await.unwrap();
        assert_eq!(file.content, "const a = 1;");
        assert_eq!(file.hash, content_hash(b"const a = 1;"));
        assert_eq!(file.path, path);
    }

    #[tokio::test]
    async fn test_read_missing_and_invalid() {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let err = read_source(&dir.path().join("nope.js")).await.unwrap_err();
        assert!(matches!(err, BuildError::Io { .. }));

        let path = dir.path().join("bin.js");
        std::fs::write(&path, [0xff, 0xfe, 0x00]).unwrap();
        let err = read_source(&path).await.unwrap_err();
        assert!(matches!(err, BuildError::Io { .. }));
    }
}
