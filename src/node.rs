//! Filesystem node records and content digesting
//!
//! A [`Node`] is one regular file of interest: its cleaned path, size, and
//! (once computed) hex-encoded SHA-1 digest. A [`Dup`] is a node together
//! with the copy count of its equivalence class, and renders as one report
//! line.
//!
//! Digesting has two modes: full-file, and a fast prefix over at most the
//! first [`FAST_HASH_BLOCK`] bytes. The prefix length is an empirical
//! block size used for cheap early rejection, not a semantic commitment.

use crate::error::HashError;
use sha1::{Digest, Sha1};
use std::fmt;
use std::fs::File;
use std::io::{self, Read};
use std::path::PathBuf;

/// Prefix length for fast hashing
pub const FAST_HASH_BLOCK: u64 = 4096;

/// A single filesystem entry flowing through the pipeline
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    /// Cleaned path, as produced by the walker
    pub path: PathBuf,

    /// File size in bytes, as stat'd at walk time
    pub size: u64,

    /// Hex-encoded SHA-1 (40 chars); empty until computed
    pub hash: String,
}

impl Node {
    /// Create an unhashed node
    pub fn new(path: PathBuf, size: u64) -> Self {
        Self {
            path,
            size,
            hash: String::new(),
        }
    }

    /// Compute the node's SHA-1 digest from file content
    ///
    /// With `fast`, only the first [`FAST_HASH_BLOCK`] bytes are digested.
    /// Reads are capped at the size recorded at walk time, and a read that
    /// comes up short fails: a file that changed underneath us cannot be
    /// asserted to be a duplicate.
    pub fn compute_hash(&mut self, fast: bool) -> Result<(), HashError> {
        let file = File::open(&self.path).map_err(|e| HashError::Open {
            path: self.path.clone(),
            source: e,
        })?;

        let want = if fast {
            self.size.min(FAST_HASH_BLOCK)
        } else {
            self.size
        };

        let mut hasher = Sha1::new();
        let mut limited = file.take(want);
        let copied = io::copy(&mut limited, &mut hasher).map_err(|e| HashError::Read {
            path: self.path.clone(),
            source: e,
        })?;

        if copied != want {
            return Err(HashError::ShortRead {
                path: self.path.clone(),
                expected: want,
                read: copied,
            });
        }

        self.hash = hex::encode(hasher.finalize());
        Ok(())
    }
}

/// A duplicate report record: one member of an equivalence class
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dup {
    pub node: Node,

    /// Number of byte-identical copies in the class, at least 2
    pub count: usize,
}

impl fmt::Display for Dup {
    /// Renders as `HASH:COUNT:SIZE:"PATH"`
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}:{:?}",
            self.node.hash, self.count, self.node.size, self.node.path
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::tempdir;

    const SHA1_EMPTY: &str = "da39a3ee5e6b4b0d3255bfef95601890afd80709";
    const SHA1_10K_ZEROS: &str = "5b00669c480d5cffbdfa8bdba99561160f2d1b77";

    fn write_file(dir: &std::path::Path, name: &str, content: &[u8]) -> PathBuf {
        let path = dir.join(name);
        let mut f = File::create(&path).unwrap();
        f.write_all(content).unwrap();
        path
    }

    #[test]
    fn test_hash_known_vectors() {
        let dir = tempdir().unwrap();

        let empty = write_file(dir.path(), "empty", b"");
        let mut node = Node::new(empty, 0);
        node.compute_hash(false).unwrap();
        assert_eq!(node.hash, SHA1_EMPTY);

        let zeros = write_file(dir.path(), "zeros", &vec![0u8; 10 * 1024]);
        let mut node = Node::new(zeros, 10 * 1024);
        node.compute_hash(false).unwrap();
        assert_eq!(node.hash, SHA1_10K_ZEROS);
        assert_eq!(node.hash.len(), 40);
    }

    #[test]
    fn test_fast_hash_covers_only_prefix() {
        let dir = tempdir().unwrap();

        let mut content = vec![b'a'; FAST_HASH_BLOCK as usize];
        content.extend(vec![b'b'; FAST_HASH_BLOCK as usize]);
        let path = write_file(dir.path(), "two-blocks", &content);

        let mut node = Node::new(path, content.len() as u64);
        node.compute_hash(true).unwrap();

        let expected = hex::encode(Sha1::digest(&content[..FAST_HASH_BLOCK as usize]));
        assert_eq!(node.hash, expected);

        // Full digest replaces the prefix digest.
        let fast = node.hash.clone();
        node.compute_hash(false).unwrap();
        assert_ne!(node.hash, fast);
        assert_eq!(node.hash, hex::encode(Sha1::digest(&content)));
    }

    #[test]
    fn test_fast_hash_of_small_file_is_full_hash() {
        let dir = tempdir().unwrap();
        let path = write_file(dir.path(), "small", b"short payload");

        let mut fast_node = Node::new(path.clone(), 13);
        fast_node.compute_hash(true).unwrap();

        let mut full_node = Node::new(path, 13);
        full_node.compute_hash(false).unwrap();

        assert_eq!(fast_node.hash, full_node.hash);
    }

    #[test]
    fn test_hash_missing_file() {
        let mut node = Node::new(PathBuf::from("/no/such/file"), 10);
        let err = node.compute_hash(false).unwrap_err();
        assert!(matches!(err, HashError::Open { .. }));
        assert!(node.hash.is_empty());
    }

    #[test]
    fn test_hash_short_read() {
        let dir = tempdir().unwrap();
        let path = write_file(dir.path(), "shrunk", b"abc");

        // Size recorded as larger than the file actually is.
        let mut node = Node::new(path, 100);
        let err = node.compute_hash(false).unwrap_err();
        assert!(matches!(err, HashError::ShortRead { read: 3, .. }));
    }

    #[test]
    fn test_dup_display_format() {
        let dup = Dup {
            node: Node {
                path: PathBuf::from("/data/copy one.bin"),
                size: 10240,
                hash: SHA1_10K_ZEROS.to_string(),
            },
            count: 3,
        };
        assert_eq!(
            dup.to_string(),
            format!("{SHA1_10K_ZEROS}:3:10240:\"/data/copy one.bin\"")
        );
    }
}
