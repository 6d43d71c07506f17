//! Read-only source trees.
//!
//! A [`SourceTree`] is a virtual file store addressed by `/`-separated paths
//! relative to its root. `""` names the root itself. Backends:
//!
//! - [`DirTree`] - a directory on disk
//! - [`SubTree`] - a named subdirectory of another tree (`content`, `static`)
//! - [`MemoryTree`](crate::memory::MemoryTree) - an in-memory tree

use std::{
    fmt::Debug,
    path::{Path, PathBuf},
    sync::Arc,
    time::SystemTime,
};

use tracing::trace;
use walkdir::WalkDir;

use crate::error::SourceError;

/// Result type for source tree operations.
pub type Result<T> = std::result::Result<T, SourceError>;

/// Kind of a tree entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    Dir,
    File,
}

/// A single entry produced by [`SourceTree::walk`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    /// Path relative to the tree root.
    pub path: String,
    pub kind: EntryKind,
}

impl Entry {
    /// Final path component.
    pub fn name(&self) -> &str {
        file_name(&self.path)
    }

    pub fn is_dir(&self) -> bool {
        self.kind == EntryKind::Dir
    }
}

/// Metadata for one entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileStat {
    pub name: String,
    pub modified: SystemTime,
    pub len: u64,
    pub is_dir: bool,
}

/// A read-only hierarchical file store.
pub trait SourceTree: Send + Sync + Debug {
    /// List every entry beneath `dir`, excluding `dir` itself.
    ///
    /// Entries come depth first, siblings ordered by name, so a directory is
    /// always listed before its contents.
    fn walk(&self, dir: &str) -> Result<Vec<Entry>>;

    /// Read a file's full contents.
    fn read(&self, path: &str) -> Result<Vec<u8>>;

    /// Stat an entry.
    fn stat(&self, path: &str) -> Result<FileStat>;
}

/// Check a tree path and return it without surrounding slashes.
///
/// Rejects `..`, `.` and empty components so no backend can be asked for
/// anything outside its root.
pub fn clean_path(path: &str) -> Result<&str> {
    let trimmed = path.trim_matches('/');
    if trimmed.is_empty() {
        return Ok(trimmed);
    }
    let bad = trimmed
        .split('/')
        .any(|c| c.is_empty() || c == "." || c == ".." || c.contains('\\'));
    if bad {
        return Err(SourceError::InvalidPath(path.to_string()));
    }
    Ok(trimmed)
}

/// Whether any component of `path` is hidden (starts with a dot).
pub fn is_hidden(path: &str) -> bool {
    path.split('/').any(|c| c.starts_with('.'))
}

/// Join two tree paths.
pub fn join(dir: &str, name: &str) -> String {
    match (dir.is_empty(), name.is_empty()) {
        (true, _) => name.to_string(),
        (false, true) => dir.to_string(),
        (false, false) => format!("{dir}/{name}"),
    }
}

/// Final component of a tree path.
pub fn file_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

/// A source tree backed by a directory on disk.
#[derive(Debug, Clone)]
pub struct DirTree {
    root: PathBuf,
}

impl DirTree {
    /// Create a tree rooted at `root`. The directory is not checked here.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The directory this tree is rooted at.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, path: &str) -> Result<PathBuf> {
        let clean = clean_path(path)?;
        if clean.is_empty() {
            return Ok(self.root.clone());
        }
        Ok(clean.split('/').fold(self.root.clone(), |p, c| p.join(c)))
    }
}

impl SourceTree for DirTree {
    fn walk(&self, dir: &str) -> Result<Vec<Entry>> {
        let base = self.resolve(dir)?;
        let mut entries = Vec::new();

        for item in WalkDir::new(&base).min_depth(1).sort_by_file_name() {
            let item = item.map_err(|e| {
                let at = e.path().map_or_else(|| base.clone(), Path::to_path_buf);
                match e.into_io_error() {
                    Some(io) => SourceError::io(at, io),
                    None => SourceError::io(
                        at,
                        std::io::Error::other("filesystem loop detected"),
                    ),
                }
            })?;

            let relative = item
                .path()
                .strip_prefix(&self.root)
                .map_err(|_| SourceError::InvalidPath(item.path().display().to_string()))?;
            let path = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");

            let kind = if item.file_type().is_dir() {
                EntryKind::Dir
            } else {
                EntryKind::File
            };
            entries.push(Entry { path, kind });
        }

        trace!(root = %base.display(), count = entries.len(), "walked directory");
        Ok(entries)
    }

    fn read(&self, path: &str) -> Result<Vec<u8>> {
        let full = self.resolve(path)?;
        std::fs::read(&full).map_err(|e| SourceError::io(full, e))
    }

    fn stat(&self, path: &str) -> Result<FileStat> {
        let full = self.resolve(path)?;
        let meta = std::fs::metadata(&full).map_err(|e| SourceError::io(&full, e))?;
        let modified = meta.modified().unwrap_or(SystemTime::UNIX_EPOCH);
        Ok(FileStat {
            name: file_name(clean_path(path)?).to_string(),
            modified,
            len: meta.len(),
            is_dir: meta.is_dir(),
        })
    }
}

/// A view of one subdirectory of another tree.
#[derive(Debug, Clone)]
pub struct SubTree {
    inner: Arc<dyn SourceTree>,
    prefix: String,
}

impl SubTree {
    /// Address `dir` inside `inner` as a tree of its own.
    pub fn new(inner: Arc<dyn SourceTree>, dir: &str) -> Result<Self> {
        let prefix = clean_path(dir)?.to_string();
        Ok(Self { inner, prefix })
    }

    fn full(&self, path: &str) -> Result<String> {
        Ok(join(&self.prefix, clean_path(path)?))
    }
}

impl SourceTree for SubTree {
    fn walk(&self, dir: &str) -> Result<Vec<Entry>> {
        let entries = self.inner.walk(&self.full(dir)?)?;
        let strip = if self.prefix.is_empty() {
            0
        } else {
            self.prefix.len() + 1
        };
        Ok(entries
            .into_iter()
            .map(|e| Entry {
                path: e.path[strip..].to_string(),
                kind: e.kind,
            })
            .collect())
    }

    fn read(&self, path: &str) -> Result<Vec<u8>> {
        self.inner.read(&self.full(path)?)
    }

    fn stat(&self, path: &str) -> Result<FileStat> {
        self.inner.stat(&self.full(path)?)
    }
}
