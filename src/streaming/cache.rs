//! Disk-backed store of encoded segments.
//!
//! Entries live directly under the cache root, one file per [`CacheKey`].
//! Writes go to a uniquely named temporary file in the same directory and are
//! renamed into place, so a reader sees either no entry or the complete one.
//! Nothing is ever deleted.

use std::io::{self, Write};
use std::path::{Path, PathBuf};

use bytes::Bytes;

use super::job::CacheKey;

/// Thread-safe handle to the segment cache directory.
#[derive(Debug, Clone)]
pub struct CacheStore {
    root: PathBuf,
}

impl CacheStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Final location of the entry for `key`.
    pub fn entry_path(&self, key: &CacheKey) -> PathBuf {
        self.root.join(key.as_str())
    }

    /// Read the entry for `key`. A missing entry is `Ok(None)`.
    pub async fn lookup(&self, key: &CacheKey) -> io::Result<Option<Bytes>> {
        match tokio::fs::read(self.entry_path(key)).await {
            Ok(data) => Ok(Some(Bytes::from(data))),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Persist `data` as the entry for `key`, creating the root on demand.
    pub async fn store(&self, key: &CacheKey, data: Bytes) -> io::Result<()> {
        let root = self.root.clone();
        let path = self.entry_path(key);

        tokio::task::spawn_blocking(move || write_atomically(&root, &path, &data))
            .await
            .map_err(io::Error::other)?
    }
}

fn write_atomically(dir: &Path, path: &Path, data: &[u8]) -> io::Result<()> {
    create_cache_dir(dir)?;

    let mut tmp = tempfile::Builder::new()
        .prefix(".segment-")
        .suffix(".tmp")
        .tempfile_in(dir)?;
    tmp.write_all(data)?;
    tmp.flush()?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        tmp.as_file()
            .set_permissions(std::fs::Permissions::from_mode(0o644))?;
    }

    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

fn create_cache_dir(dir: &Path) -> io::Result<()> {
    let mut builder = std::fs::DirBuilder::new();
    builder.recursive(true);

    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        builder.mode(0o777);
    }

    builder.create(dir)
}
