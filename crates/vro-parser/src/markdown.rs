//! Markdown rendering using pulldown-cmark.
//!
//! The parser runs once over the source and rewrites the event stream
//! before handing it to pulldown-cmark's HTML writer:
//!
//! - the YAML front matter block is lifted out and parsed into [`Metadata`]
//! - fenced code is replaced by syntect output
//! - math becomes MathJax-ready spans
//! - soft breaks become hard breaks
//! - bare URLs become links
//! - headings without an explicit id get one derived from their text

use std::{
    collections::{BTreeMap, HashSet},
    sync::LazyLock,
};

use pulldown_cmark::{
    CodeBlockKind, CowStr, Event, Options, Parser, Tag, TagEnd, TextMergeStream, html,
};
use regex::Regex;
use thiserror::Error;

use crate::syntax::{SyntaxHighlighter, html_escape};

/// Front matter values keyed by name.
pub type Metadata = BTreeMap<String, serde_yaml::Value>;

/// Markdown rendering errors.
#[derive(Debug, Error)]
pub enum RenderError {
    /// Source bytes are not UTF-8.
    #[error("markdown is not valid UTF-8: {0}")]
    Encoding(#[from] std::str::Utf8Error),

    /// Front matter is not a YAML mapping.
    #[error("front matter error: {0}")]
    Frontmatter(String),
}

/// Result type for markdown operations.
pub type Result<T> = std::result::Result<T, RenderError>;

/// An HTML fragment with the metadata found in its source.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RenderedDocument {
    pub html: String,
    pub metadata: Metadata,
}

/// Bare URLs eligible for autolinking.
static URL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?:https?://|www\.)[^\s<>"]*[^\s<>".,:;!?'")\]]"#).expect("valid URL regex")
});

/// Markdown parser with syntax highlighting support.
#[derive(Debug)]
pub struct MarkdownParser {
    highlighter: SyntaxHighlighter,
    options: Options,
}

impl Default for MarkdownParser {
    fn default() -> Self {
        Self::new()
    }
}

impl MarkdownParser {
    /// Create a parser with the full extension set and the default theme.
    pub fn new() -> Self {
        Self::with_highlighter(SyntaxHighlighter::default())
    }

    /// Create a parser with a custom syntax theme.
    pub fn with_theme(theme: &str) -> Self {
        Self::with_highlighter(SyntaxHighlighter::new(theme))
    }

    fn with_highlighter(highlighter: SyntaxHighlighter) -> Self {
        let mut options = Options::empty();
        options.insert(Options::ENABLE_TABLES);
        options.insert(Options::ENABLE_FOOTNOTES);
        options.insert(Options::ENABLE_STRIKETHROUGH);
        options.insert(Options::ENABLE_TASKLISTS);
        options.insert(Options::ENABLE_HEADING_ATTRIBUTES);
        options.insert(Options::ENABLE_YAML_STYLE_METADATA_BLOCKS);
        options.insert(Options::ENABLE_MATH);

        Self {
            highlighter,
            options,
        }
    }

    /// Render raw Markdown bytes.
    pub fn render(&self, source: &[u8]) -> Result<RenderedDocument> {
        self.render_str(std::str::from_utf8(source)?)
    }

    /// Render Markdown text to an HTML fragment plus front matter.
    pub fn render_str(&self, source: &str) -> Result<RenderedDocument> {
        let mut events: Vec<Event<'_>> = Vec::new();
        let mut front_matter: Option<String> = None;
        let mut in_metadata = false;
        let mut code_block: Option<(Option<String>, String)> = None;
        let mut heading: Option<(usize, String)> = None;
        let mut headings: Vec<(usize, String)> = Vec::new();
        let mut link_depth = 0usize;

        // Delimiters such as `~` split a text run; merge it back so bare
        // URLs are matched whole.
        for event in TextMergeStream::new(Parser::new_ext(source, self.options)) {
            match event {
                // Front matter
                Event::Start(Tag::MetadataBlock(_)) => {
                    in_metadata = true;
                    front_matter.get_or_insert_with(String::new);
                }
                Event::End(TagEnd::MetadataBlock(_)) => {
                    in_metadata = false;
                }
                Event::Text(text) if in_metadata => {
                    if let Some(fm) = front_matter.as_mut() {
                        fm.push_str(&text);
                    }
                }

                // Fenced and indented code
                Event::Start(Tag::CodeBlock(kind)) => {
                    let lang = match kind {
                        CodeBlockKind::Fenced(info) => info
                            .split(|c: char| c.is_whitespace() || c == ',' || c == '{')
                            .next()
                            .filter(|l| !l.is_empty())
                            .map(str::to_string),
                        CodeBlockKind::Indented => None,
                    };
                    code_block = Some((lang, String::new()));
                }
                Event::End(TagEnd::CodeBlock) => {
                    if let Some((lang, code)) = code_block.take() {
                        let highlighted = self.highlighter.highlight(&code, lang.as_deref());
                        events.push(Event::Html(highlighted.into()));
                    }
                }
                Event::Text(text) if code_block.is_some() => {
                    if let Some((_, code)) = code_block.as_mut() {
                        code.push_str(&text);
                    }
                }

                // Headings
                Event::Start(Tag::Heading { .. }) => {
                    heading = Some((events.len(), String::new()));
                    events.push(event);
                }
                Event::End(TagEnd::Heading(_)) => {
                    if let Some(pending) = heading.take() {
                        headings.push(pending);
                    }
                    events.push(event);
                }

                // Links and images are never autolinked inside
                Event::Start(Tag::Link { .. } | Tag::Image { .. }) => {
                    link_depth += 1;
                    events.push(event);
                }
                Event::End(TagEnd::Link | TagEnd::Image) => {
                    link_depth = link_depth.saturating_sub(1);
                    events.push(event);
                }

                Event::Text(text) => {
                    if let Some((_, heading_text)) = heading.as_mut() {
                        heading_text.push_str(&text);
                    }
                    if link_depth == 0 {
                        autolink(text, &mut events);
                    } else {
                        events.push(Event::Text(text));
                    }
                }
                Event::Code(code) => {
                    if let Some((_, heading_text)) = heading.as_mut() {
                        heading_text.push_str(&code);
                    }
                    events.push(Event::Code(code));
                }

                // Math for client-side MathJax
                Event::InlineMath(math) => {
                    events.push(Event::InlineHtml(
                        format!(
                            "<span class=\"math inline\">\\({}\\)</span>",
                            html_escape(&math)
                        )
                        .into(),
                    ));
                }
                Event::DisplayMath(math) => {
                    events.push(Event::InlineHtml(
                        format!(
                            "<span class=\"math display\">\\[{}\\]</span>",
                            html_escape(&math)
                        )
                        .into(),
                    ));
                }

                // Hard wraps
                Event::SoftBreak => events.push(Event::HardBreak),

                other => events.push(other),
            }
        }

        HeadingIds::assign_all(&mut events, &headings);

        let metadata = match front_matter {
            Some(raw) => parse_metadata(&raw)?,
            None => Metadata::new(),
        };

        let mut out = String::with_capacity(source.len() * 3 / 2);
        html::push_html(&mut out, events.into_iter());

        Ok(RenderedDocument {
            html: out,
            metadata,
        })
    }
}

/// Split bare URLs out of a text event.
fn autolink<'a>(text: CowStr<'a>, events: &mut Vec<Event<'a>>) {
    if !URL_RE.is_match(&text) {
        events.push(Event::Text(text));
        return;
    }

    let mut last = 0;
    for m in URL_RE.find_iter(&text) {
        if m.start() > last {
            events.push(Event::Text(text[last..m.start()].to_string().into()));
        }
        let url = m.as_str();
        let href = if url.starts_with("www.") {
            format!("http://{url}")
        } else {
            url.to_string()
        };
        events.push(Event::InlineHtml(
            format!(
                "<a href=\"{}\">{}</a>",
                html_escape(&href),
                html_escape(url)
            )
            .into(),
        ));
        last = m.end();
    }
    if last < text.len() {
        events.push(Event::Text(text[last..].to_string().into()));
    }
}

/// Tracks heading ids already used in a document.
#[derive(Debug, Default)]
struct HeadingIds {
    used: HashSet<String>,
}

impl HeadingIds {
    /// Give every heading without an explicit id a unique one.
    ///
    /// Explicit ids are reserved first, so a generated id never collides
    /// with one written later in the document.
    fn assign_all(events: &mut [Event<'_>], headings: &[(usize, String)]) {
        let mut ids = Self::default();
        for (index, _) in headings {
            if let Event::Start(Tag::Heading { id: Some(id), .. }) = &events[*index] {
                ids.used.insert(id.to_string());
            }
        }
        for (index, text) in headings {
            if let Event::Start(Tag::Heading { id, .. }) = &mut events[*index]
                && id.is_none()
            {
                *id = Some(ids.generate(text).into());
            }
        }
    }

    fn generate(&mut self, text: &str) -> String {
        let mut base = slugify(text);
        if base.is_empty() {
            base = "heading".to_string();
        }
        let mut candidate = base.clone();
        let mut n = 1;
        while self.used.contains(&candidate) {
            candidate = format!("{base}-{n}");
            n += 1;
        }
        self.used.insert(candidate.clone());
        candidate
    }
}

/// Convert text to a URL-safe slug.
pub fn slugify(text: &str) -> String {
    text.to_lowercase()
        .chars()
        .map(|c| {
            if c.is_alphanumeric() {
                c
            } else if c.is_whitespace() || c == '-' || c == '_' {
                '-'
            } else {
                '\0'
            }
        })
        .filter(|c| *c != '\0')
        .collect::<String>()
        .split('-')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}

/// Parse a front matter block into a mapping.
fn parse_metadata(raw: &str) -> Result<Metadata> {
    let value: serde_yaml::Value =
        serde_yaml::from_str(raw).map_err(|e| RenderError::Frontmatter(e.to_string()))?;

    let mapping = match value {
        serde_yaml::Value::Null => return Ok(Metadata::new()),
        serde_yaml::Value::Mapping(mapping) => mapping,
        other => {
            return Err(RenderError::Frontmatter(format!(
                "expected a mapping, found {}",
                yaml_kind(&other)
            )));
        }
    };

    mapping
        .into_iter()
        .map(|(key, value)| {
            let key = match key {
                serde_yaml::Value::String(s) => s,
                serde_yaml::Value::Number(n) => n.to_string(),
                serde_yaml::Value::Bool(b) => b.to_string(),
                other => {
                    return Err(RenderError::Frontmatter(format!(
                        "unsupported key type {}",
                        yaml_kind(&other)
                    )));
                }
            };
            Ok((key, value))
        })
        .collect()
}

fn yaml_kind(value: &serde_yaml::Value) -> &'static str {
    match value {
        serde_yaml::Value::Null => "null",
        serde_yaml::Value::Bool(_) => "a boolean",
        serde_yaml::Value::Number(_) => "a number",
        serde_yaml::Value::String(_) => "a string",
        serde_yaml::Value::Sequence(_) => "a sequence",
        serde_yaml::Value::Mapping(_) => "a mapping",
        serde_yaml::Value::Tagged(_) => "a tagged value",
    }
}
