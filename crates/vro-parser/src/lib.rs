//! vro parser library
//!
//! Markdown to HTML conversion with front matter, math and syntax
//! highlighting. The parser is configured once and shared by every render.

pub mod markdown;
pub mod syntax;

pub use markdown::{MarkdownParser, Metadata, RenderError, RenderedDocument, slugify};
pub use syntax::SyntaxHighlighter;
