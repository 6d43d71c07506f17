//! File classification.
//!
//! Decides how a source file is treated and what it is called in the output
//! tree. Both the batch generator and the live resolver go through
//! [`classify`], so the two never disagree about a file.

use std::fmt;

/// How a source file is processed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileKind {
    /// Markdown source (`.md`), rendered and wrapped in the layout.
    Markdown,
    /// Pre-rendered HTML fragment (`.body`), wrapped in the layout only.
    Fragment,
    /// Anything else, copied byte for byte.
    Passthrough,
}

impl FileKind {
    /// Renderable kinds in the order the live resolver probes them.
    pub const RENDERED: [FileKind; 2] = [FileKind::Markdown, FileKind::Fragment];

    /// Source extension for renderable kinds, without the dot.
    pub fn extension(self) -> Option<&'static str> {
        match self {
            Self::Markdown => Some("md"),
            Self::Fragment => Some("body"),
            Self::Passthrough => None,
        }
    }

    /// Whether files of this kind go through the layout.
    pub fn is_rendered(self) -> bool {
        !matches!(self, Self::Passthrough)
    }
}

impl fmt::Display for FileKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Markdown => "Markdown",
            Self::Fragment => "Fragment",
            Self::Passthrough => "Passthrough",
        };
        f.write_str(name)
    }
}

/// Extension given to every rendered output file.
pub const OUTPUT_EXTENSION: &str = "html";

/// Classify a filename and compute its output filename.
///
/// Only the final extension is considered: `post.md` becomes `post.html`,
/// while `post.md.bak` passes through untouched.
pub fn classify(filename: &str) -> (FileKind, String) {
    for kind in FileKind::RENDERED {
        let Some(ext) = kind.extension() else {
            continue;
        };
        if let Some(stem) = filename
            .strip_suffix(ext)
            .and_then(|rest| rest.strip_suffix('.'))
        {
            return (kind, format!("{stem}.{OUTPUT_EXTENSION}"));
        }
    }
    (FileKind::Passthrough, filename.to_string())
}
