//! Syntax highlighting for fenced code blocks.

use std::fmt::Write;

use syntect::{
    easy::HighlightLines,
    highlighting::{Color, Theme, ThemeSet},
    html::{IncludeBackground, styled_line_to_highlighted_html},
    parsing::{SyntaxReference, SyntaxSet},
    util::LinesWithEndings,
};
use tracing::warn;

/// Theme used for every code block.
pub const DEFAULT_THEME: &str = "base16-ocean.dark";

/// Syntax highlighter using syntect, with line numbers.
#[derive(Debug)]
pub struct SyntaxHighlighter {
    syntax_set: SyntaxSet,
    theme_set: ThemeSet,
    theme: String,
}

impl Default for SyntaxHighlighter {
    fn default() -> Self {
        Self::new(DEFAULT_THEME)
    }
}

impl SyntaxHighlighter {
    /// Create a highlighter with the given theme, falling back to
    /// [`DEFAULT_THEME`] when the name is unknown.
    pub fn new(theme: &str) -> Self {
        let theme_set = ThemeSet::load_defaults();
        let theme = if theme_set.themes.contains_key(theme) {
            theme.to_string()
        } else {
            warn!(theme, fallback = DEFAULT_THEME, "unknown syntax theme");
            DEFAULT_THEME.to_string()
        };
        Self {
            syntax_set: SyntaxSet::load_defaults_newlines(),
            theme_set,
            theme,
        }
    }

    /// Name of the active theme.
    pub fn theme(&self) -> &str {
        &self.theme
    }

    /// Highlight code in the given language.
    ///
    /// Unknown languages are highlighted as plain text. If syntect fails the
    /// code is emitted escaped inside a bare `<pre><code>` block.
    pub fn highlight(&self, code: &str, lang: Option<&str>) -> String {
        let syntax = lang
            .and_then(|l| self.syntax_set.find_syntax_by_token(l))
            .unwrap_or_else(|| self.syntax_set.find_syntax_plain_text());

        let Some(theme) = self.theme_set.themes.get(&self.theme) else {
            return fallback_highlight(code, lang);
        };

        match self.highlight_lines(code, lang, syntax, theme) {
            Ok(html) => html,
            Err(_) => fallback_highlight(code, lang),
        }
    }

    fn highlight_lines(
        &self,
        code: &str,
        lang: Option<&str>,
        syntax: &SyntaxReference,
        theme: &Theme,
    ) -> Result<String, syntect::Error> {
        let mut highlighter = HighlightLines::new(syntax, theme);
        let width = code.lines().count().max(1).to_string().len();

        let mut html = String::with_capacity(code.len() * 4);
        let _ = write!(html, "<pre class=\"highlight\"");
        if let Some(bg) = theme.settings.background {
            let _ = write!(html, " style=\"background-color:{};\"", hex(bg));
        }
        html.push('>');
        html.push_str(&code_open_tag(lang));

        for (index, line) in LinesWithEndings::from(code).enumerate() {
            let regions = highlighter.highlight_line(line, &self.syntax_set)?;
            let _ = write!(
                html,
                "<span class=\"ln\" style=\"user-select:none;margin-right:0.8em;opacity:0.5\">{:>width$}</span>",
                index + 1
            );
            html.push_str(&styled_line_to_highlighted_html(
                &regions,
                IncludeBackground::No,
            )?);
        }

        html.push_str("</code></pre>\n");
        Ok(html)
    }
}

fn code_open_tag(lang: Option<&str>) -> String {
    match lang {
        Some(l) => format!("<code class=\"language-{}\">", html_escape(l)),
        None => "<code>".to_string(),
    }
}

fn hex(color: Color) -> String {
    format!("#{:02x}{:02x}{:02x}", color.r, color.g, color.b)
}

/// Fallback when syntect cannot highlight.
fn fallback_highlight(code: &str, lang: Option<&str>) -> String {
    format!("<pre>{}{}</code></pre>\n", code_open_tag(lang), html_escape(code))
}

/// Escape HTML special characters.
pub(crate) fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#x27;")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_highlight_rust() {
        let highlighter = SyntaxHighlighter::default();
        let code = "fn main() {\n    println!(\"Hello\");\n}\n";
        let html = highlighter.highlight(code, Some("rust"));

        assert!(html.starts_with("<pre"));
        assert!(html.contains("language-rust"));
        assert!(html.contains("fn"));
        assert!(html.contains("<span style="));
    }

    #[test]
    fn test_line_numbers() {
        let highlighter = SyntaxHighlighter::default();
        let html = highlighter.highlight("a\nb\nc\n", None);

        assert_eq!(html.matches("class=\"ln\"").count(), 3);
        assert!(html.contains(">1</span>"));
        assert!(html.contains(">3</span>"));
    }

    #[test]
    fn test_line_numbers_padded() {
        let highlighter = SyntaxHighlighter::default();
        let code: String = (0..10).map(|i| format!("line {i}\n")).collect();
        let html = highlighter.highlight(&code, None);

        assert!(html.contains("> 1</span>"));
        assert!(html.contains(">10</span>"));
    }

    #[test]
    fn test_highlight_unknown_language() {
        let highlighter = SyntaxHighlighter::default();
        let html = highlighter.highlight("some code", Some("unknown_lang_xyz"));

        assert!(html.contains("some code"));
        assert!(html.contains("language-unknown_lang_xyz"));
    }

    #[test]
    fn test_highlight_escapes() {
        let highlighter = SyntaxHighlighter::default();
        let html = highlighter.highlight("<script>", None);

        assert!(html.contains("&lt;script&gt;"));
        assert!(!html.contains("<script>"));
    }

    #[test]
    fn test_unknown_theme_falls_back() {
        let highlighter = SyntaxHighlighter::new("no-such-theme");
        assert_eq!(highlighter.theme(), DEFAULT_THEME);
    }

    #[test]
    fn test_html_escape() {
        assert_eq!(html_escape("<script>"), "&lt;script&gt;");
        assert_eq!(html_escape("a & b"), "a &amp; b");
    }
}
