//! # Staging Directories
//!
//! On-disk staging area for chunk files. Every URL maps to one directory
//! named after a SHA-256 of the URL, holding one file per chunk index.
//! A directory that already exists when a transfer starts marks a previous
//! attempt whose chunk files may be reused.

use std::io;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use tokio::fs;
use tracing::debug;

/// Prefix of every directory the engine creates under the staging root
pub const STAGING_PREFIX: &str = "parcel-";

/// Owner and group get read/write/execute access, others nothing
pub const STAGING_MODE: u32 = 0o770;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagingDir {
    path: PathBuf,
}

impl StagingDir {
    /// Deterministic staging directory for `url` under `root`.
    pub fn for_url(root: &Path, url: &str) -> Self {
        Self {
            path: root.join(format!("{STAGING_PREFIX}{}", url_hash(url))),
        }
    }

    /// Fresh, uniquely named directory under `root` for a transfer that can
    /// never be resumed.
    pub fn create_unique(root: &Path) -> io::Result<Self> {
        let dir = tempfile::Builder::new()
            .prefix(STAGING_PREFIX)
            .tempdir_in(root)?;
        Ok(Self { path: dir.keep() })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Path of the staging file for chunk `index`
    pub fn chunk_path(&self, index: usize) -> PathBuf {
        self.path.join(index.to_string())
    }

    /// Make sure the directory exists.
    ///
    /// Returns `true` when it was already there, meaning a previous attempt
    /// left chunk files behind.
    pub async fn prepare(&self) -> io::Result<bool> {
        if fs::try_exists(&self.path).await? {
            debug!(dir = %self.path.display(), "Reusing existing staging directory");
            return Ok(true);
        }

        let mut builder = fs::DirBuilder::new();
        builder.recursive(true);
        #[cfg(unix)]
        builder.mode(STAGING_MODE);
        builder.create(&self.path).await?;

        debug!(dir = %self.path.display(), "Created staging directory");
        Ok(false)
    }
}

/// Remove a staging directory and everything in it. A missing directory is
/// not an error.
pub async fn remove_staging(path: &Path) -> io::Result<()> {
    match fs::remove_dir_all(path).await {
        Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
        _ => Ok(()),
    }
}

fn url_hash(url: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(url.as_bytes());
    hex::encode(hasher.finalize())
}
