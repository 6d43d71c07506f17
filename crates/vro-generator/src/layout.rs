//! The site layout.
//!
//! A single minijinja template, `layout.templ`, wraps every rendered page.
//! It sees two variables: `content`, the page body (already HTML, never
//! escaped again), and `metadata`, the page's front matter. Missing
//! metadata keys render as empty strings.
//!
//! Outside debug mode the template is parsed on first use and then cached
//! for the life of the process; concurrent first renders wait on one load.
//! In debug mode it is parsed again before every render. Either way the
//! cached handle is swapped only after a successful parse.

use std::{
    fmt,
    sync::{Arc, Mutex, PoisonError},
};

use arc_swap::ArcSwapOption;
use minijinja::{AutoEscape, Environment, UndefinedBehavior, Value, context};
use thiserror::Error;
use tracing::debug;
use vro_core::{SourceError, SourceTree};
use vro_parser::Metadata;

/// File name of the layout, relative to the content root.
pub const LAYOUT_NAME: &str = "layout.templ";

/// Layout errors.
#[derive(Debug, Error)]
pub enum TemplateError {
    /// The layout file could not be read.
    #[error("cannot read layout: {0}")]
    Read(#[from] SourceError),

    /// The layout file is not UTF-8.
    #[error("layout is not valid UTF-8")]
    Encoding,

    /// The layout does not parse.
    #[error("cannot parse layout: {0}")]
    Parse(#[source] minijinja::Error),

    /// The layout failed while rendering a page.
    #[error("cannot render layout: {0}")]
    Render(#[source] minijinja::Error),
}

impl TemplateError {
    /// Whether the layout never loaded, as opposed to failing mid-render.
    pub fn is_load_failure(&self) -> bool {
        !matches!(self, Self::Render(_))
    }
}

/// Result type for layout operations.
pub type Result<T> = std::result::Result<T, TemplateError>;

/// The cached, reloadable layout template.
pub struct Layout {
    tree: Arc<dyn SourceTree>,
    debug: bool,
    current: ArcSwapOption<Environment<'static>>,
    init: Mutex<()>,
}

impl fmt::Debug for Layout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Layout")
            .field("tree", &self.tree)
            .field("debug", &self.debug)
            .field("loaded", &self.current.load().is_some())
            .finish()
    }
}

impl Layout {
    /// Create a layout read from `tree`. Nothing is loaded yet.
    pub fn new(tree: Arc<dyn SourceTree>, debug: bool) -> Self {
        Self {
            tree,
            debug,
            current: ArcSwapOption::empty(),
            init: Mutex::new(()),
        }
    }

    /// Whether the layout is reloaded before every render.
    pub fn is_debug(&self) -> bool {
        self.debug
    }

    /// Whether a parsed layout is currently cached.
    pub fn is_loaded(&self) -> bool {
        self.current.load().is_some()
    }

    /// Load the layout now, replacing any cached copy on success.
    pub fn preload(&self) -> Result<()> {
        self.reload().map(|_| ())
    }

    /// Wrap an HTML body in the layout.
    pub fn apply(&self, content: &str, metadata: &Metadata) -> Result<String> {
        let env = self.environment()?;
        let template = env.get_template(LAYOUT_NAME).map_err(TemplateError::Render)?;
        template
            .render(context! {
                content => Value::from_safe_string(content.to_string()),
                metadata => Value::from_serialize(metadata),
            })
            .map_err(TemplateError::Render)
    }

    fn environment(&self) -> Result<Arc<Environment<'static>>> {
        if self.debug {
            return self.reload();
        }
        if let Some(env) = self.current.load_full() {
            return Ok(env);
        }

        // A failed load leaves the slot empty, so the next caller retries.
        let _guard = self.init.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(env) = self.current.load_full() {
            return Ok(env);
        }
        self.reload()
    }

    fn reload(&self) -> Result<Arc<Environment<'static>>> {
        let env = Arc::new(self.load()?);
        self.current.store(Some(Arc::clone(&env)));
        debug!(name = LAYOUT_NAME, "layout loaded");
        Ok(env)
    }

    fn load(&self) -> Result<Environment<'static>> {
        let bytes = self.tree.read(LAYOUT_NAME)?;
        let source = String::from_utf8(bytes).map_err(|_| TemplateError::Encoding)?;

        let mut env = Environment::new();
        env.set_undefined_behavior(UndefinedBehavior::Chainable);
        env.set_auto_escape_callback(|_| AutoEscape::Html);
        env.add_template_owned(LAYOUT_NAME, source)
            .map_err(TemplateError::Parse)?;
        Ok(env)
    }
}

#[cfg(test)]
mod tests {
    use std::{
        sync::{
            RwLock,
            atomic::{AtomicUsize, Ordering},
        },
        thread,
    };

    use vro_core::{FileStat, MemoryTree, source::Entry};

    use super::*;

    const LAYOUT: &str =
        "<html><title>{{ metadata.title }}</title><body>{{ content }}</body></html>";

    fn layout_with(source: &str, debug: bool) -> Layout {
        let tree = MemoryTree::new().with_file(LAYOUT_NAME, source);
        Layout::new(Arc::new(tree), debug)
    }

    fn metadata(pairs: &[(&str, &str)]) -> Metadata {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), serde_yaml::Value::String((*v).to_string())))
            .collect()
    }

    /// A tree whose layout can be edited and whose reads are counted.
    #[derive(Debug, Default)]
    struct EditableTree {
        layout: RwLock<String>,
        reads: AtomicUsize,
    }

    impl EditableTree {
        fn set(&self, source: &str) {
            *self.layout.write().unwrap() = source.to_string();
        }
    }

    impl SourceTree for EditableTree {
        fn walk(&self, _dir: &str) -> vro_core::source::Result<Vec<Entry>> {
            Ok(Vec::new())
        }

        fn read(&self, path: &str) -> vro_core::source::Result<Vec<u8>> {
            self.reads.fetch_add(1, Ordering::SeqCst);
            if path == LAYOUT_NAME {
                Ok(self.layout.read().unwrap().clone().into_bytes())
            } else {
                Err(SourceError::NotFound(path.to_string()))
            }
        }

        fn stat(&self, path: &str) -> vro_core::source::Result<FileStat> {
            Err(SourceError::NotFound(path.to_string()))
        }
    }

    #[test]
    fn test_apply_wraps_content() {
        let layout = layout_with(LAYOUT, false);
        let html = layout
            .apply("<p>Hi</p>", &metadata(&[("title", "Hello")]))
            .unwrap();

        assert_eq!(
            html,
            "<html><title>Hello</title><body><p>Hi</p></body></html>"
        );
    }

    #[test]
    fn test_metadata_is_escaped_content_is_not() {
        let layout = layout_with(LAYOUT, false);
        let html = layout
            .apply("<b>bold</b>", &metadata(&[("title", "<script>")]))
            .unwrap();

        assert!(html.contains("<b>bold</b>"));
        assert!(html.contains("&lt;script&gt;"));
    }

    #[test]
    fn test_missing_metadata_renders_empty() {
        let layout = layout_with(LAYOUT, false);
        let html = layout.apply("body", &Metadata::new()).unwrap();
        assert!(html.contains("<title></title>"));
    }

    #[test]
    fn test_missing_layout() {
        let layout = Layout::new(Arc::new(MemoryTree::new()), false);
        let err = layout.apply("x", &Metadata::new()).unwrap_err();

        assert!(matches!(err, TemplateError::Read(_)));
        assert!(err.is_load_failure());
        assert!(!layout.is_loaded());
    }

    #[test]
    fn test_parse_error() {
        let layout = layout_with("{% if %}", false);
        let err = layout.preload().unwrap_err();
        assert!(matches!(err, TemplateError::Parse(_)));
    }

    #[test]
    fn test_render_error() {
        let layout = layout_with("{{ no_such_function() }}", false);
        let err = layout.apply("x", &Metadata::new()).unwrap_err();

        assert!(matches!(err, TemplateError::Render(_)));
        assert!(!err.is_load_failure());
    }

    #[test]
    fn test_cached_outside_debug() {
        let tree = Arc::new(EditableTree::default());
        tree.set("v1 {{ content }}");
        let layout = Layout::new(tree.clone(), false);

        assert_eq!(layout.apply("a", &Metadata::new()).unwrap(), "v1 a");
        tree.set("v2 {{ content }}");
        assert_eq!(layout.apply("b", &Metadata::new()).unwrap(), "v1 b");
        assert_eq!(tree.reads.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_reloaded_in_debug() {
        let tree = Arc::new(EditableTree::default());
        tree.set("v1 {{ content }}");
        let layout = Layout::new(tree.clone(), true);

        assert_eq!(layout.apply("a", &Metadata::new()).unwrap(), "v1 a");
        tree.set("v2 {{ content }}");
        assert_eq!(layout.apply("b", &Metadata::new()).unwrap(), "v2 b");
    }

    #[test]
    fn test_failed_load_is_retried() {
        let tree = Arc::new(EditableTree::default());
        tree.set("{% if %}");
        let layout = Layout::new(tree.clone(), false);

        assert!(layout.apply("a", &Metadata::new()).is_err());
        tree.set("ok {{ content }}");
        assert_eq!(layout.apply("a", &Metadata::new()).unwrap(), "ok a");
    }

    #[test]
    fn test_debug_reload_failure_keeps_previous_handle() {
        let tree = Arc::new(EditableTree::default());
        tree.set("v1 {{ content }}");
        let layout = Layout::new(tree.clone(), true);

        layout.preload().unwrap();
        tree.set("{% if %}");
        assert!(layout.apply("a", &Metadata::new()).is_err());
        assert!(layout.is_loaded());
    }

    #[test]
    fn test_concurrent_first_render_loads_once() {
        let tree = Arc::new(EditableTree::default());
        tree.set("{{ content }}");
        let layout = Arc::new(Layout::new(tree.clone(), false));

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let layout = Arc::clone(&layout);
                thread::spawn(move || layout.apply(&i.to_string(), &Metadata::new()).unwrap())
            })
            .collect();
        for (i, handle) in handles.into_iter().enumerate() {
            assert_eq!(handle.join().unwrap(), i.to_string());
        }

        assert_eq!(tree.reads.load(Ordering::SeqCst), 1);
    }
}
