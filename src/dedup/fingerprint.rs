//! Content fingerprinting
//!
//! Streams a local file through SHA-256 in fixed-size chunks and captures
//! the leading bytes as a structural signature (magic number), in one pass.

use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use crate::config::DEFAULT_HASH_CHUNK_SIZE;

/// Number of leading bytes kept as the structural signature
pub const SIGNATURE_LEN: usize = 8;

/// Identity derived from a file's bytes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fingerprint {
    /// Lowercase hex SHA-256 of the full content (64 chars)
    pub content_hash: String,
    /// Uppercase hex of the first `SIGNATURE_LEN` bytes; empty for an empty file
    pub signature: String,
}

/// Computes fingerprints of files on local disk
#[derive(Debug, Clone, Copy)]
pub struct Fingerprinter {
    chunk_size: usize,
}

impl Default for Fingerprinter {
    fn default() -> Self {
        Self::new(DEFAULT_HASH_CHUNK_SIZE)
    }
}

impl Fingerprinter {
    /// A zero chunk size is raised to one byte
    pub fn new(chunk_size: usize) -> Self {
        Self {
            chunk_size: chunk_size.max(1),
        }
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Fingerprint a file, blocking the calling thread
    pub fn fingerprint_file(&self, path: &Path) -> io::Result<Fingerprint> {
        let metadata = std::fs::metadata(path)?;
        if !metadata.is_file() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("{} is not a regular file", path.display()),
            ));
        }

        let mut file = File::open(path)?;
        let mut hasher = Sha256::new();
        let mut header = Vec::with_capacity(SIGNATURE_LEN);
        let mut buf = vec![0u8; self.chunk_size];

        loop {
            let n = match file.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            };

            if header.len() < SIGNATURE_LEN {
                let take = (SIGNATURE_LEN - header.len()).min(n);
                header.extend_from_slice(&buf[..take]);
            }
            hasher.update(&buf[..n]);
        }

        Ok(Fingerprint {
            content_hash: hex::encode(hasher.finalize()),
            signature: hex::encode_upper(&header),
        })
    }

    /// Fingerprint a file off the async runtime.
    ///
    /// Any failure is logged and yields `None`; callers register the file
    /// without a hash rather than failing.
    pub async fn fingerprint(&self, path: &str) -> Option<Fingerprint> {
        let fingerprinter = *self;
        let owned = PathBuf::from(path);

        let result =
            tokio::task::spawn_blocking(move || fingerprinter.fingerprint_file(&owned)).await;

        match result {
            Ok(Ok(fingerprint)) => {
                tracing::debug!(
                    path = %path,
                    content_hash = %fingerprint.content_hash,
                    signature = %fingerprint.signature,
                    "Fingerprinted local file"
                );
                Some(fingerprint)
            }
            Ok(Err(e)) => {
                tracing::warn!(path = %path, error = %e, "Could not fingerprint local file");
                None
            }
            Err(e) => {
                tracing::warn!(path = %path, error = %e, "Fingerprint task failed");
                None
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    const EMPTY_SHA256: &str = "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855";

    fn write_file(dir: &TempDir, name: &str, data: &[u8]) -> PathBuf {
        let path = dir.path().join(name);
        let mut file = File::create(&path).unwrap();
        file.write_all(data).unwrap();
        path
    }

    #[test]
    fn test_empty_file() {
        let dir = TempDir::new().unwrap();
        let path = write_file(&dir, "empty.bin", b"");

        let fp = Fingerprinter::default().fingerprint_file(&path).unwrap();

        assert_eq!(fp.content_hash, EMPTY_SHA256);
        assert_eq!(fp.signature, "");
    }

    #[test]
    fn test_known_digest_and_signature() {
        let dir = TempDir::new().unwrap();
        let path = write_file(&dir, "abc.txt", b"abc");

        let fp = Fingerprinter::default().fingerprint_file(&path).unwrap();

        assert_eq!(
            fp.content_hash,
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
        assert_eq!(fp.signature, "616263");
    }

    #[test]
    fn test_signature_is_first_eight_bytes() {
        let dir = TempDir::new().unwrap();
        let pdf = b"%PDF-1.7\n%\xE2\xE3\xCF\xD3\nrest of the document";
        let path = write_file(&dir, "doc.pdf", pdf);

        let fp = Fingerprinter::default().fingerprint_file(&path).unwrap();

        assert_eq!(fp.signature, "255044462D312E37");
        assert_eq!(fp.content_hash.len(), 64);
    }

    #[test]
    fn test_chunk_size_does_not_change_result() {
        let dir = TempDir::new().unwrap();
        let data: Vec<u8> = (0..10_000u32).map(|i| (i % 251) as u8).collect();
        let path = write_file(&dir, "data.bin", &data);

        let tiny = Fingerprinter::new(1).fingerprint_file(&path).unwrap();
        let odd = Fingerprinter::new(3).fingerprint_file(&path).unwrap();
        let large = Fingerprinter::new(1 << 20).fingerprint_file(&path).unwrap();

        assert_eq!(tiny, large);
        assert_eq!(odd, large);
        assert_eq!(large.content_hash, hex::encode(Sha256::digest(&data)));
    }

    #[test]
    fn test_zero_chunk_size_is_clamped() {
        assert_eq!(Fingerprinter::new(0).chunk_size(), 1);
    }

    #[tokio::test]
    async fn test_missing_file_is_not_fatal() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("nope.bin");

        let fp = Fingerprinter::default()
            .fingerprint(missing.to_str().unwrap())
            .await;

        assert!(fp.is_none());
    }

    #[tokio::test]
    async fn test_directory_is_not_fatal() {
        let dir = TempDir::new().unwrap();

        let fp = Fingerprinter::default()
            .fingerprint(dir.path().to_str().unwrap())
            .await;

        assert!(fp.is_none());
    }
}
