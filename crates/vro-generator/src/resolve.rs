//! Live request resolution.
//!
//! Maps a request path onto the content tree the same way the builder maps
//! files onto the output directory, but in reverse: `/docs/guide` finds
//! `docs/guide.md`, then `docs/guide.body`, then a plain file `docs/guide`.
//! The result is transport neutral; the HTTP layer decides status codes and
//! headers.
//!
//! In debug mode the layout is reloaded for every request, including ones
//! that end up serving a raw file or nothing at all, so a broken layout
//! fails each request until it is fixed.

use std::{sync::Arc, time::SystemTime};

use thiserror::Error;
use vro_core::{
    FileKind, SourceError, SourceTree,
    source::{clean_path, is_hidden},
};

use crate::{layout::TemplateError, pipeline::PipelineError, site::Site};

/// Resolution errors. All map to an internal server error.
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("source error: {0}")]
    Source(#[from] SourceError),

    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    /// The per-request layout reload failed in debug mode.
    #[error(transparent)]
    Layout(#[from] TemplateError),
}

/// A file served as-is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticFile {
    /// Final path component, used to pick a content type.
    pub name: String,
    pub modified: SystemTime,
    pub data: Vec<u8>,
}

/// Outcome of resolving one request path.
#[derive(Debug)]
pub enum Resolution {
    /// A rendered HTML page.
    Page(String),
    /// Raw bytes with enough metadata for conditional requests.
    File(StaticFile),
    NotFound,
    Error(ResolveError),
}

/// Resolves request paths against a [`Site`].
#[derive(Debug, Clone)]
pub struct Resolver {
    site: Arc<Site>,
    serve_source: bool,
}

impl Resolver {
    /// Create a resolver. Raw Markdown is not served.
    pub fn new(site: Arc<Site>) -> Self {
        Self {
            site,
            serve_source: false,
        }
    }

    /// Serve `*.md` request paths as raw source instead of 404.
    #[must_use]
    pub fn with_source_serving(mut self, enabled: bool) -> Self {
        self.serve_source = enabled;
        self
    }

    pub fn site(&self) -> &Site {
        &self.site
    }

    /// Resolve a page request.
    pub fn resolve(&self, request_path: &str) -> Resolution {
        match self.lookup(request_path) {
            // Rendering already went through the layout.
            rendered @ (Resolution::Page(_) | Resolution::Error(ResolveError::Pipeline(_))) => {
                rendered
            }
            other => self.after_reload(other),
        }
    }

    /// Resolve a path under the static tree.
    pub fn static_asset(&self, request_path: &str) -> Resolution {
        let path = request_path.trim_matches('/');
        if path.is_empty() || !servable(path) {
            return self.after_reload(Resolution::NotFound);
        }
        self.after_reload(file(self.site.statics(), path))
    }

    /// In debug mode, reload the layout and fail the request if it is broken.
    fn after_reload(&self, resolution: Resolution) -> Resolution {
        let layout = self.site.pipeline().layout();
        if !layout.is_debug() {
            return resolution;
        }
        match layout.preload() {
            Ok(()) => resolution,
            Err(e) => Resolution::Error(e.into()),
        }
    }

    fn lookup(&self, request_path: &str) -> Resolution {
        let path = normalize(request_path);
        if !servable(&path) {
            return Resolution::NotFound;
        }
        let content = self.site.content();

        if path.ends_with(".md") {
            if !self.serve_source {
                return Resolution::NotFound;
            }
            return file(content, &path);
        }

        for kind in FileKind::RENDERED {
            let Some(ext) = kind.extension() else {
                continue;
            };
            let candidate = format!("{path}.{ext}");
            match probe(content, &candidate) {
                Ok(Some(source)) => return self.render(kind, &source),
                Ok(None) => {}
                Err(e) => return Resolution::Error(e.into()),
            }
        }

        file(content, &path)
    }

    fn render(&self, kind: FileKind, source: &[u8]) -> Resolution {
        let pipeline = self.site.pipeline();
        let rendered = match kind {
            FileKind::Fragment => pipeline.render_fragment(source),
            _ => pipeline.render_markdown(source),
        };
        match rendered {
            Ok(html) => Resolution::Page(html),
            Err(e) => Resolution::Error(e.into()),
        }
    }
}

/// Normalize a request path to a tree path.
///
/// A trailing slash (or an empty path) means the directory's `index`;
/// surrounding slashes are then dropped.
pub fn normalize(request_path: &str) -> String {
    let mut path = request_path.to_string();
    if path.is_empty() || path.ends_with('/') {
        path.push_str("index");
    }
    path.trim_matches('/').to_string()
}

fn servable(path: &str) -> bool {
    clean_path(path).is_ok() && !is_hidden(path)
}

/// Read `path` if it is a file; directories and missing entries are `None`.
fn probe(tree: &dyn SourceTree, path: &str) -> Result<Option<Vec<u8>>, SourceError> {
    match tree.stat(path) {
        Ok(stat) if stat.is_dir => Ok(None),
        Ok(_) => tree.read(path).map(Some),
        Err(e) if e.is_not_found() => Ok(None),
        Err(e) => Err(e),
    }
}

fn file(tree: &dyn SourceTree, path: &str) -> Resolution {
    let stat = match tree.stat(path) {
        Ok(stat) if stat.is_dir => return Resolution::NotFound,
        Ok(stat) => stat,
        Err(e) if e.is_not_found() => return Resolution::NotFound,
        Err(e) => return Resolution::Error(e.into()),
    };
    match tree.read(path) {
        Ok(data) => Resolution::File(StaticFile {
            name: stat.name,
            modified: stat.modified,
            data,
        }),
        Err(e) if e.is_not_found() => Resolution::NotFound,
        Err(e) => Resolution::Error(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use vro_core::MemoryTree;

    use super::*;

    fn resolver(root: MemoryTree) -> Resolver {
        Resolver::new(Arc::new(Site::new(Arc::new(root), false).unwrap()))
    }

    fn sample() -> MemoryTree {
        MemoryTree::new()
            .with_file("content/layout.templ", "<main>{{ content }}</main>")
            .with_file("content/index.md", "# Home\n")
            .with_file("content/about.body", "<p>About</p>")
            .with_file("content/both.md", "# From markdown\n")
            .with_file("content/both.body", "<p>from fragment</p>")
            .with_file("content/docs/index.md", "# Docs\n")
            .with_file("content/docs/guide.md", "# Guide\n")
            .with_file("content/notes.txt", "plain")
            .with_file("content/.secret", "hidden")
            .with_file_at(
                "static/app.css",
                "body {}",
                SystemTime::UNIX_EPOCH + Duration::from_secs(1_000_000),
            )
            .with_file("static/.env", "hidden")
    }

    fn page(resolution: Resolution) -> String {
        match resolution {
            Resolution::Page(html) => html,
            other => panic!("expected page, got {other:?}"),
        }
    }

    #[test]
    fn test_normalize() {
        assert_eq!(normalize("/"), "index");
        assert_eq!(normalize(""), "index");
        assert_eq!(normalize("/docs/"), "docs/index");
        assert_eq!(normalize("/docs/guide"), "docs/guide");
        assert_eq!(normalize("docs/guide/"), "docs/guide/index");
    }

    #[test]
    fn test_root_index() {
        let html = page(resolver(sample()).resolve("/"));
        assert!(html.starts_with("<main><h1 id=\"home\">Home</h1>"));
    }

    #[test]
    fn test_directory_index() {
        let html = page(resolver(sample()).resolve("/docs/"));
        assert!(html.contains("Docs"));
    }

    #[test]
    fn test_nested_page() {
        let html = page(resolver(sample()).resolve("/docs/guide"));
        assert!(html.contains("Guide"));
    }

    #[test]
    fn test_fragment() {
        let html = page(resolver(sample()).resolve("/about"));
        assert_eq!(html, "<main><p>About</p></main>");
    }

    #[test]
    fn test_markdown_wins_over_fragment() {
        let html = page(resolver(sample()).resolve("/both"));
        assert!(html.contains("From markdown"));
    }

    #[test]
    fn test_plain_file() {
        match resolver(sample()).resolve("/notes.txt") {
            Resolution::File(file) => {
                assert_eq!(file.name, "notes.txt");
                assert_eq!(file.data, b"plain");
            }
            other => panic!("expected file, got {other:?}"),
        }
    }

    #[test]
    fn test_directory_without_index_is_not_found() {
        let root = sample().with_dir("content/empty");
        assert!(matches!(
            resolver(root).resolve("/empty"),
            Resolution::NotFound
        ));
    }

    #[test]
    fn test_missing() {
        assert!(matches!(
            resolver(sample()).resolve("/nope"),
            Resolution::NotFound
        ));
    }

    #[test]
    fn test_hidden_and_traversal() {
        let resolver = resolver(sample());
        assert!(matches!(resolver.resolve("/.secret"), Resolution::NotFound));
        assert!(matches!(resolver.resolve("/../static/app.css"), Resolution::NotFound));
        assert!(matches!(resolver.static_asset(".env"), Resolution::NotFound));
    }

    #[test]
    fn test_raw_markdown_gated() {
        assert!(matches!(
            resolver(sample()).resolve("/index.md"),
            Resolution::NotFound
        ));

        let resolver = resolver(sample()).with_source_serving(true);
        match resolver.resolve("/index.md") {
            Resolution::File(file) => assert_eq!(file.data, b"# Home\n"),
            other => panic!("expected file, got {other:?}"),
        }
    }

    #[test]
    fn test_static_asset() {
        match resolver(sample()).static_asset("app.css") {
            Resolution::File(file) => {
                assert_eq!(file.data, b"body {}");
                assert_eq!(
                    file.modified,
                    SystemTime::UNIX_EPOCH + Duration::from_secs(1_000_000)
                );
            }
            other => panic!("expected file, got {other:?}"),
        }
        assert!(matches!(
            resolver(sample()).static_asset(""),
            Resolution::NotFound
        ));
    }

    #[test]
    fn test_render_error() {
        let root = sample().with_file("content/bad.md", vec![0xff, 0xfe]);
        assert!(matches!(
            resolver(root).resolve("/bad"),
            Resolution::Error(ResolveError::Pipeline(_))
        ));
    }

    #[test]
    fn test_debug_reload_fails_unrendered_requests() {
        let root = sample().with_file("content/layout.templ", "{% if %}");
        let resolver = Resolver::new(Arc::new(Site::new(Arc::new(root), true).unwrap()))
            .with_source_serving(true);

        for resolution in [
            resolver.static_asset("app.css"),
            resolver.resolve("/notes.txt"),
            resolver.resolve("/index.md"),
            resolver.resolve("/nope"),
        ] {
            assert!(matches!(
                resolution,
                Resolution::Error(ResolveError::Layout(_))
            ));
        }
    }

    #[test]
    fn test_broken_layout_leaves_files_alone_outside_debug() {
        let root = sample().with_file("content/layout.templ", "{% if %}");
        let resolver = resolver(root);

        assert!(matches!(resolver.static_asset("app.css"), Resolution::File(_)));
        assert!(matches!(resolver.resolve("/notes.txt"), Resolution::File(_)));
    }

    #[test]
    fn test_debug_reload_keeps_good_layout_requests() {
        let resolver = Resolver::new(Arc::new(Site::new(Arc::new(sample()), true).unwrap()));

        assert!(matches!(resolver.static_asset("app.css"), Resolution::File(_)));
        assert!(matches!(resolver.resolve("/nope"), Resolution::NotFound));
        assert!(resolver.site().pipeline().layout().is_loaded());
    }

    #[test]
    fn test_missing_layout_is_error() {
        let root = MemoryTree::new().with_file("content/index.md", "# Home\n");
        assert!(matches!(
            resolver(root).resolve("/"),
            Resolution::Error(ResolveError::Pipeline(PipelineError::Template(_)))
        ));
    }
}
