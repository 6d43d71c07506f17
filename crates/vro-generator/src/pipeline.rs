//! Per-file rendering.
//!
//! Markdown goes through the parser and then the layout; fragments skip the
//! parser and are wrapped as-is; everything else passes through untouched.

use thiserror::Error;
use vro_core::{FileKind, classify};
use vro_parser::{MarkdownParser, Metadata, RenderError};

use crate::layout::{Layout, TemplateError};

/// Pipeline errors.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Render(#[from] RenderError),

    #[error(transparent)]
    Template(#[from] TemplateError),

    #[error("fragment is not valid UTF-8: {0}")]
    Encoding(#[from] std::str::Utf8Error),
}

/// Result type for pipeline operations.
pub type Result<T> = std::result::Result<T, PipelineError>;

/// A rendered file, ready to be written or served.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Output {
    /// Output file name, with `.html` for rendered kinds.
    pub name: String,
    pub kind: FileKind,
    pub body: Vec<u8>,
}

/// Markdown parser plus layout.
#[derive(Debug)]
pub struct Pipeline {
    markdown: MarkdownParser,
    layout: Layout,
}

impl Pipeline {
    pub fn new(markdown: MarkdownParser, layout: Layout) -> Self {
        Self { markdown, layout }
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    /// Render a Markdown document to a full page.
    pub fn render_markdown(&self, source: &[u8]) -> Result<String> {
        let document = self.markdown.render(source)?;
        Ok(self.layout.apply(&document.html, &document.metadata)?)
    }

    /// Wrap a pre-rendered HTML fragment in the layout, with empty metadata.
    pub fn render_fragment(&self, source: &[u8]) -> Result<String> {
        let body = std::str::from_utf8(source)?;
        Ok(self.layout.apply(body, &Metadata::new())?)
    }

    /// Classify `filename` and produce its output.
    pub fn render_file(&self, filename: &str, source: Vec<u8>) -> Result<Output> {
        let (kind, name) = classify(filename);
        let body = match kind {
            FileKind::Markdown => self.render_markdown(&source)?.into_bytes(),
            FileKind::Fragment => self.render_fragment(&source)?.into_bytes(),
            FileKind::Passthrough => source,
        };
        Ok(Output { name, kind, body })
    }
}
