//! Build orchestration.
//!
//! Copies the static tree to `<out>/static`, then walks the content tree and
//! writes one output per non-hidden file, mirroring directories.

use std::{
    fs,
    path::{Path, PathBuf},
    sync::Arc,
    time::Instant,
};

use thiserror::Error;
use tracing::{debug, info, warn};
use vro_core::{ErrorPolicy, FileKind, SourceError, source::is_hidden};

use crate::{
    assets::{AssetCopier, AssetError},
    pipeline::PipelineError,
    site::{STATIC_DIR, Site},
};

/// Why a single file could not be produced.
#[derive(Debug, Error)]
pub enum FileError {
    #[error("read failed: {0}")]
    Read(#[from] SourceError),

    #[error(transparent)]
    Render(#[from] PipelineError),

    #[error("write failed: {0}")]
    Write(#[from] std::io::Error),
}

/// Build errors.
#[derive(Debug, Error)]
pub enum BuildError {
    /// The output root could not be created.
    #[error("cannot create output directory {path}: {source}")]
    Structure {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The content tree could not be enumerated.
    #[error("cannot enumerate content tree: {0}")]
    Walk(#[source] SourceError),

    /// Static asset copying failed.
    #[error("static assets: {0}")]
    Static(#[from] AssetError),

    /// A content file failed under [`ErrorPolicy::Abort`].
    #[error("failed to build {path}: {source}")]
    Content {
        path: String,
        #[source]
        source: FileError,
    },
}

/// Result type for build operations.
pub type Result<T> = std::result::Result<T, BuildError>;

/// Build statistics.
#[derive(Debug, Clone, Default)]
pub struct BuildStats {
    /// Markdown files rendered.
    pub pages: usize,

    /// HTML fragments wrapped.
    pub fragments: usize,

    /// Content files copied through.
    pub files: usize,

    /// Static assets copied.
    pub assets: usize,

    /// Files skipped after an error, static and content combined.
    pub skipped: usize,

    /// Build duration in milliseconds.
    pub duration_ms: u64,
}

/// Site builder that orchestrates the build process.
#[derive(Debug)]
pub struct Builder {
    site: Arc<Site>,
    output_dir: PathBuf,
    static_errors: ErrorPolicy,
    content_errors: ErrorPolicy,
}

impl Builder {
    /// Create a builder writing to `output_dir`.
    ///
    /// Static failures abort the build; content failures are skipped.
    pub fn new(site: Arc<Site>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            site,
            output_dir: output_dir.into(),
            static_errors: ErrorPolicy::Abort,
            content_errors: ErrorPolicy::Skip,
        }
    }

    #[must_use]
    pub fn with_static_errors(mut self, policy: ErrorPolicy) -> Self {
        self.static_errors = policy;
        self
    }

    #[must_use]
    pub fn with_content_errors(mut self, policy: ErrorPolicy) -> Self {
        self.content_errors = policy;
        self
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Run the full build.
    pub fn build(&self) -> Result<BuildStats> {
        let start = Instant::now();

        info!(
            output = %self.output_dir.display(),
            static_errors = %self.static_errors,
            content_errors = %self.content_errors,
            "starting build"
        );

        fs::create_dir_all(&self.output_dir).map_err(|source| BuildError::Structure {
            path: self.output_dir.clone(),
            source,
        })?;

        let mut stats = BuildStats::default();

        let copied = AssetCopier::new(self.static_errors)
            .copy(self.site.statics(), &self.output_dir.join(STATIC_DIR))?;
        stats.assets = copied.copied;
        stats.skipped = copied.skipped;

        self.build_content(&mut stats)?;

        stats.duration_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);

        info!(
            pages = stats.pages,
            fragments = stats.fragments,
            files = stats.files,
            assets = stats.assets,
            skipped = stats.skipped,
            duration_ms = stats.duration_ms,
            "build complete"
        );

        Ok(stats)
    }

    fn build_content(&self, stats: &mut BuildStats) -> Result<()> {
        let entries = self.site.content().walk("").map_err(BuildError::Walk)?;
        info!(count = entries.len(), "rendering content");

        for entry in entries.iter().filter(|e| !is_hidden(&e.path)) {
            let result = if entry.is_dir() {
                fs::create_dir_all(local_path(&self.output_dir, &entry.path))
                    .map(|()| None)
                    .map_err(FileError::from)
            } else {
                self.build_file(&entry.path).map(Some)
            };

            match result {
                Ok(Some(FileKind::Markdown)) => stats.pages += 1,
                Ok(Some(FileKind::Fragment)) => stats.fragments += 1,
                Ok(Some(FileKind::Passthrough)) => stats.files += 1,
                Ok(None) => {}
                Err(source) => match self.content_errors {
                    ErrorPolicy::Abort => {
                        return Err(BuildError::Content {
                            path: entry.path.clone(),
                            source,
                        });
                    }
                    ErrorPolicy::Skip => {
                        warn!(path = %entry.path, error = %source, "skipping content file");
                        stats.skipped += 1;
                    }
                },
            }
        }

        Ok(())
    }

    fn build_file(&self, path: &str) -> std::result::Result<FileKind, FileError> {
        let source = self.site.content().read(path)?;
        let (dir, name) = match path.rsplit_once('/') {
            Some((dir, name)) => (dir, name),
            None => ("", path),
        };

        let output = self.site.pipeline().render_file(name, source)?;
        let target = local_path(&self.output_dir, dir).join(&output.name);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&target, &output.body)?;

        debug!(path, output = %target.display(), kind = %output.kind, "wrote file");
        Ok(output.kind)
    }
}

/// Map a slash-separated tree path onto `base`.
pub(crate) fn local_path(base: &Path, tree_path: &str) -> PathBuf {
    tree_path
        .split('/')
        .filter(|c| !c.is_empty())
        .fold(base.to_path_buf(), |p, c| p.join(c))
}
