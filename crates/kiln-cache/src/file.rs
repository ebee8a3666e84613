//! File-based cache implementation.
//!
//! [`FileCache`] stores cache entries as files on disk, one directory per
//! namespace. The entry file name is the SHA-256 of the document identity, so
//! identities containing path separators or `..` never escape the cache root.
//! Each entry is a binary header followed by the data:
//!
//! ```text
//! [hash_len: u32 LE][content hash bytes][data_len: u64 LE][data bytes]
//! ```
//!
//! On read, only the header is read first to validate the content hash. The
//! full data is read only on a hit, avoiding unnecessary I/O on mismatch. An
//! entry whose data is shorter or longer than `data_len` is a miss.
//!
//! Entries are written to a temporary file in the namespace directory and
//! renamed into place, so a reader never sees a partially written entry.
//!
//! On construction, [`FileCache`] validates a `VERSION` file in the cache root.
//! If the version mismatches or is missing, the entire cache directory is wiped
//! and recreated, so entries written by an incompatible kiln are never read.

use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use crate::{Cache, CacheBucket, content_hash};

/// File-based [`Cache`] rooted at a directory on disk.
///
/// Directory layout:
/// ```text
/// {root}/
/// +-- VERSION            # contains the cache version string
/// +-- markdown/          # namespace "markdown"
/// |   +-- 3f5a...        # entry for one document identity
/// +-- link_hrefs/        # namespace "link_hrefs"
///     +-- ...
/// ```
pub struct FileCache {
    root: PathBuf,
}

impl FileCache {
    /// Create a new file-based cache at `root`, validating the cache version.
    ///
    /// If the `VERSION` file inside `root` does not match `version`, the entire
    /// cache directory is removed and recreated with the new version. Errors
    /// during validation are logged but never fatal.
    #[must_use]
    pub fn new(root: PathBuf, version: &str) -> Self {
        validate_version(&root, version);
        Self { root }
    }

    /// Cache root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl Cache for FileCache {
    fn bucket(&self, namespace: &str) -> Box<dyn CacheBucket> {
        Box::new(FileCacheBucket {
            dir: self.root.join(sanitize_namespace(namespace)),
        })
    }
}

/// Replace anything outside `[A-Za-z0-9_-]` so a namespace is one path segment.
fn sanitize_namespace(namespace: &str) -> String {
    namespace
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// A single namespace backed by a directory on disk.
struct FileCacheBucket {
    dir: PathBuf,
}

impl FileCacheBucket {
    fn entry_path(&self, identity: &str) -> PathBuf {
        self.dir.join(content_hash(identity.as_bytes()))
    }

    /// Write `buf` to a temporary file and atomically rename it over the entry.
    fn write_entry(&self, identity: &str, buf: &[u8]) -> std::io::Result<()> {
        let mut tmp = NamedTempFile::new_in(&self.dir)?;
        tmp.write_all(buf)?;
        tmp.as_file().sync_data()?;
        tmp.persist(self.entry_path(identity)).map_err(|e| e.error)?;
        Ok(())
    }
}

impl CacheBucket for FileCacheBucket {
    fn get(&self, identity: &str, hash: &str) -> Option<Vec<u8>> {
        let mut file = File::open(self.entry_path(identity)).ok()?;

        let mut len_buf = [0u8; 4];
        file.read_exact(&mut len_buf).ok()?;
        let hash_len = u32::from_le_bytes(len_buf) as usize;

        let mut stored_hash = vec![0u8; hash_len];
        file.read_exact(&mut stored_hash).ok()?;

        if stored_hash != hash.as_bytes() {
            tracing::trace!(identity, "cache entry hash mismatch");
            return None;
        }

        let mut data_len_buf = [0u8; 8];
        file.read_exact(&mut data_len_buf).ok()?;
        let data_len = usize::try_from(u64::from_le_bytes(data_len_buf)).ok()?;

        let mut data = Vec::new();
        file.read_to_end(&mut data).ok()?;
        if data.len() != data_len {
            tracing::warn!(
                identity,
                expected = data_len,
                actual = data.len(),
                "cache entry has wrong length, ignoring"
            );
            return None;
        }
        Some(data)
    }

    fn set(&self, identity: &str, hash: &str, value: &[u8]) {
        if let Err(e) = fs::create_dir_all(&self.dir) {
            tracing::warn!("failed to create cache bucket directory: {e}");
            return;
        }

        let hash_bytes = hash.as_bytes();
        let Ok(hash_len) = u32::try_from(hash_bytes.len()) else {
            return;
        };
        let data_len = value.len() as u64;
        let mut buf = Vec::with_capacity(12 + hash_bytes.len() + value.len());
        buf.extend_from_slice(&hash_len.to_le_bytes());
        buf.extend_from_slice(hash_bytes);
        buf.extend_from_slice(&data_len.to_le_bytes());
        buf.extend_from_slice(value);

        if let Err(e) = self.write_entry(identity, &buf) {
            tracing::warn!(identity, "failed to write cache entry: {e}");
        }
    }
}

/// Validate the cache version, wiping the directory on mismatch.
fn validate_version(root: &Path, version: &str) {
    let version_file = root.join("VERSION");

    match fs::read_to_string(&version_file) {
        Ok(stored) if stored == version => {
            tracing::debug!("cache version matches: {version}");
            return;
        }
        Ok(stored) => {
            tracing::info!(
                "cache version mismatch (stored={stored}, current={version}), wiping cache"
            );
        }
        Err(_) => {
            tracing::info!("no cache VERSION file found, initializing cache");
        }
    }

    if root.exists()
        && let Err(e) = fs::remove_dir_all(root)
    {
        tracing::warn!("failed to remove cache directory: {e}");
    }
    if let Err(e) = fs::create_dir_all(root) {
        tracing::warn!("failed to create cache directory: {e}");
        return;
    }
    if let Err(e) = fs::write(&version_file, version) {
        tracing::warn!("failed to write cache VERSION file: {e}");
    }
}
