//! In-memory source tree.
//!
//! Provides [`MemoryTree`] for tests and for sites assembled in code.

use std::{
    cmp::Ordering,
    collections::{BTreeMap, BTreeSet},
    time::SystemTime,
};

use crate::{
    error::SourceError,
    source::{Entry, EntryKind, FileStat, Result, SourceTree, clean_path, file_name},
};

#[derive(Debug, Clone)]
struct MemoryFile {
    data: Vec<u8>,
    modified: SystemTime,
}

/// A source tree held entirely in memory.
///
/// # Example
///
/// ```
/// use vro_core::{MemoryTree, SourceTree};
///
/// let tree = MemoryTree::new()
///     .with_file("content/index.md", "# Home")
///     .with_file("static/app.css", "body {}");
///
/// assert_eq!(tree.read("content/index.md").unwrap(), b"# Home");
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemoryTree {
    files: BTreeMap<String, MemoryFile>,
    dirs: BTreeSet<String>,
}

impl MemoryTree {
    /// Create an empty tree.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a file, creating parent directories implicitly.
    ///
    /// # Panics
    ///
    /// Panics if `path` is not a valid tree path.
    #[must_use]
    pub fn with_file(self, path: &str, data: impl Into<Vec<u8>>) -> Self {
        self.with_file_at(path, data, SystemTime::UNIX_EPOCH)
    }

    /// Add a file with an explicit modification time.
    ///
    /// # Panics
    ///
    /// Panics if `path` is not a valid tree path.
    #[must_use]
    pub fn with_file_at(
        mut self,
        path: &str,
        data: impl Into<Vec<u8>>,
        modified: SystemTime,
    ) -> Self {
        let path = clean_path(path).expect("valid tree path").to_string();
        self.add_parents(&path);
        self.files.insert(
            path,
            MemoryFile {
                data: data.into(),
                modified,
            },
        );
        self
    }

    /// Add an empty directory.
    ///
    /// # Panics
    ///
    /// Panics if `path` is not a valid tree path.
    #[must_use]
    pub fn with_dir(mut self, path: &str) -> Self {
        let path = clean_path(path).expect("valid tree path").to_string();
        self.add_parents(&path);
        self.dirs.insert(path);
        self
    }

    fn add_parents(&mut self, path: &str) {
        let mut end = 0;
        while let Some(pos) = path[end..].find('/') {
            end += pos;
            self.dirs.insert(path[..end].to_string());
            end += 1;
        }
    }

    fn is_dir(&self, path: &str) -> bool {
        path.is_empty() || self.dirs.contains(path)
    }
}

/// Order paths depth first with siblings sorted by name.
fn tree_order(a: &str, b: &str) -> Ordering {
    a.split('/').cmp(b.split('/'))
}

impl SourceTree for MemoryTree {
    fn walk(&self, dir: &str) -> Result<Vec<Entry>> {
        let dir = clean_path(dir)?;
        if !self.is_dir(dir) {
            return Err(SourceError::NotFound(dir.to_string()));
        }
        let beneath = |p: &str| dir.is_empty() || p.strip_prefix(dir).is_some_and(|r| r.starts_with('/'));

        let mut entries: Vec<Entry> = self
            .dirs
            .iter()
            .filter(|p| beneath(p))
            .map(|p| Entry {
                path: p.clone(),
                kind: EntryKind::Dir,
            })
            .chain(self.files.keys().filter(|p| beneath(p)).map(|p| Entry {
                path: p.clone(),
                kind: EntryKind::File,
            }))
            .collect();
        entries.sort_by(|a, b| tree_order(&a.path, &b.path));
        Ok(entries)
    }

    fn read(&self, path: &str) -> Result<Vec<u8>> {
        let path = clean_path(path)?;
        self.files
            .get(path)
            .map(|f| f.data.clone())
            .ok_or_else(|| SourceError::NotFound(path.to_string()))
    }

    fn stat(&self, path: &str) -> Result<FileStat> {
        let path = clean_path(path)?;
        if let Some(file) = self.files.get(path) {
            return Ok(FileStat {
                name: file_name(path).to_string(),
                modified: file.modified,
                len: file.data.len() as u64,
                is_dir: false,
            });
        }
        if self.is_dir(path) {
            return Ok(FileStat {
                name: file_name(path).to_string(),
                modified: SystemTime::UNIX_EPOCH,
                len: 0,
                is_dir: true,
            });
        }
        Err(SourceError::NotFound(path.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, time::Duration};

    use super::*;
    use crate::source::SubTree;

    #[test]
    fn test_walk_order_matches_disk() {
        let tree = MemoryTree::new()
            .with_file("posts.txt", "list")
            .with_file("posts/a.md", "# A")
            .with_file("index.md", "# Home");

        let paths: Vec<_> = tree.walk("").unwrap().into_iter().map(|e| e.path).collect();
        assert_eq!(paths, vec!["index.md", "posts", "posts/a.md", "posts.txt"]);
    }

    #[test]
    fn test_walk_subdir() {
        let tree = MemoryTree::new()
            .with_file("content/a/b.md", "b")
            .with_file("content/c.md", "c")
            .with_file("contents.md", "not beneath");

        let entries = tree.walk("content").unwrap();
        let paths: Vec<_> = entries.iter().map(|e| e.path.as_str()).collect();
        assert_eq!(paths, vec!["content/a", "content/a/b.md", "content/c.md"]);
        assert!(entries[0].is_dir());
    }

    #[test]
    fn test_walk_missing_dir() {
        let tree = MemoryTree::new().with_file("content/index.md", "x");
        assert!(tree.walk("static").unwrap_err().is_not_found());
        assert!(tree.walk("content/index.md").is_err());
    }

    #[test]
    fn test_empty_dir() {
        let tree = MemoryTree::new().with_dir("static/img");
        let entries = tree.walk("static").unwrap();
        assert_eq!(entries.len(), 1);
        assert!(tree.stat("static/img").unwrap().is_dir);
    }

    #[test]
    fn test_read_and_stat() {
        let when = SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000);
        let tree = MemoryTree::new().with_file_at("a/b.txt", "hello", when);

        assert_eq!(tree.read("a/b.txt").unwrap(), b"hello");
        let stat = tree.stat("/a/b.txt").unwrap();
        assert_eq!(stat.name, "b.txt");
        assert_eq!(stat.modified, when);
        assert_eq!(stat.len, 5);
        assert!(tree.read("a/c.txt").unwrap_err().is_not_found());
        assert!(tree.read("a").unwrap_err().is_not_found());
    }

    #[test]
    fn test_sub_tree_over_memory() {
        let root: Arc<dyn SourceTree> = Arc::new(
            MemoryTree::new()
                .with_file("static/css/app.css", "body {}")
                .with_file("content/index.md", "# Home"),
        );
        let statics = SubTree::new(root, "static").unwrap();

        let paths: Vec<_> = statics.walk("").unwrap().into_iter().map(|e| e.path).collect();
        assert_eq!(paths, vec!["css", "css/app.css"]);
        assert_eq!(statics.read("css/app.css").unwrap(), b"body {}");
    }
}
