//! Static asset copying.
//!
//! Mirrors a source tree into a destination directory byte for byte,
//! skipping hidden entries.

use std::{
    fs,
    path::{Path, PathBuf},
};

use thiserror::Error;
use tracing::{debug, info, warn};
use vro_core::{ErrorPolicy, SourceError, SourceTree, source::is_hidden};

use crate::build::{FileError, local_path};

/// Asset copying errors.
#[derive(Debug, Error)]
pub enum AssetError {
    /// The destination directory could not be created.
    #[error("cannot create {path}: {source}")]
    Dest {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The static tree could not be enumerated.
    #[error("cannot enumerate static tree: {0}")]
    Walk(#[source] SourceError),

    /// A single entry failed under [`ErrorPolicy::Abort`].
    #[error("failed to copy {path}: {source}")]
    Copy {
        path: String,
        #[source]
        source: FileError,
    },
}

/// Result type for asset operations.
pub type Result<T> = std::result::Result<T, AssetError>;

/// Counts from one copy run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CopyStats {
    pub copied: usize,
    pub skipped: usize,
}

/// Copies a static tree to disk.
#[derive(Debug, Clone, Copy)]
pub struct AssetCopier {
    policy: ErrorPolicy,
}

impl Default for AssetCopier {
    fn default() -> Self {
        Self::new(ErrorPolicy::Abort)
    }
}

impl AssetCopier {
    /// Create a copier that handles per-file failures according to `policy`.
    #[must_use]
    pub fn new(policy: ErrorPolicy) -> Self {
        Self { policy }
    }

    /// Copy every non-hidden entry of `tree` beneath `dest`.
    pub fn copy(&self, tree: &dyn SourceTree, dest: &Path) -> Result<CopyStats> {
        info!(dest = %dest.display(), "copying static assets");

        fs::create_dir_all(dest).map_err(|source| AssetError::Dest {
            path: dest.to_path_buf(),
            source,
        })?;
        let entries = tree.walk("").map_err(AssetError::Walk)?;

        let mut stats = CopyStats::default();
        for entry in entries.iter().filter(|e| !is_hidden(&e.path)) {
            let target = local_path(dest, &entry.path);
            let result = if entry.is_dir() {
                fs::create_dir_all(&target).map_err(FileError::from)
            } else {
                copy_file(tree, &entry.path, &target)
            };

            match result {
                Ok(()) if !entry.is_dir() => stats.copied += 1,
                Ok(()) => {}
                Err(source) => match self.policy {
                    ErrorPolicy::Abort => {
                        return Err(AssetError::Copy {
                            path: entry.path.clone(),
                            source,
                        });
                    }
                    ErrorPolicy::Skip => {
                        warn!(path = %entry.path, error = %source, "skipping static asset");
                        stats.skipped += 1;
                    }
                },
            }
        }

        info!(copied = stats.copied, skipped = stats.skipped, "static assets copied");
        Ok(stats)
    }
}

fn copy_file(tree: &dyn SourceTree, path: &str, target: &Path) -> std::result::Result<(), FileError> {
    let data = tree.read(path)?;
    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(target, data)?;
    debug!(path, target = %target.display(), "copied asset");
    Ok(())
}
