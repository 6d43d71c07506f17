//! A site: its content and static subtrees plus the pipeline that renders them.

use std::sync::Arc;

use vro_core::{Config, DirTree, SourceError, SourceTree, SubTree};
use vro_parser::MarkdownParser;

use crate::{layout::Layout, pipeline::Pipeline};

/// Subtree holding pages, fragments, passthrough files and the layout.
pub const CONTENT_DIR: &str = "content";

/// Subtree holding static assets.
pub const STATIC_DIR: &str = "static";

/// Everything the builder and the resolver share.
#[derive(Debug)]
pub struct Site {
    content: Arc<dyn SourceTree>,
    statics: Arc<dyn SourceTree>,
    pipeline: Pipeline,
}

impl Site {
    /// Open a site rooted at `root`, which must contain `content/` and
    /// `static/`.
    pub fn new(root: Arc<dyn SourceTree>, debug: bool) -> Result<Self, SourceError> {
        Self::with_parser(root, debug, MarkdownParser::new())
    }

    /// Like [`Site::new`] with a custom Markdown parser.
    pub fn with_parser(
        root: Arc<dyn SourceTree>,
        debug: bool,
        markdown: MarkdownParser,
    ) -> Result<Self, SourceError> {
        let content: Arc<dyn SourceTree> = Arc::new(SubTree::new(Arc::clone(&root), CONTENT_DIR)?);
        let statics: Arc<dyn SourceTree> = Arc::new(SubTree::new(root, STATIC_DIR)?);
        let layout = Layout::new(Arc::clone(&content), debug);

        Ok(Self {
            content,
            statics,
            pipeline: Pipeline::new(markdown, layout),
        })
    }

    /// Open the on-disk site named by `config`.
    pub fn from_config(config: &Config) -> Result<Self, SourceError> {
        Self::new(Arc::new(DirTree::new(&config.path)), config.debug)
    }

    pub fn content(&self) -> &dyn SourceTree {
        self.content.as_ref()
    }

    pub fn statics(&self) -> &dyn SourceTree {
        self.statics.as_ref()
    }

    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }
}
