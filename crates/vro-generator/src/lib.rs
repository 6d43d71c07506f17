//! vro generator library
//!
//! Turns a content tree into pages, either all at once into an output
//! directory ([`Builder`]) or one request at a time ([`Resolver`]). Both
//! share a [`Site`] and therefore the same layout and Markdown parser.

pub mod assets;
pub mod build;
pub mod layout;
pub mod pipeline;
pub mod resolve;
pub mod site;

pub use assets::{AssetCopier, AssetError, CopyStats};
pub use build::{BuildError, BuildStats, Builder, FileError};
pub use layout::{LAYOUT_NAME, Layout, TemplateError};
pub use pipeline::{Output, Pipeline, PipelineError};
pub use resolve::{Resolution, ResolveError, Resolver, StaticFile, normalize};
pub use site::{CONTENT_DIR, STATIC_DIR, Site};
