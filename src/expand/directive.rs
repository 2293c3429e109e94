//! Directive scanning
//!
//! Directives look like `@@kind:id@@`, where `id` is any non-empty run of
//! characters other than `@`. Matches never overlap and are reported left to
//! right with their byte spans.

use std::fmt;
use std::ops::Range;

/// The directive families understood by the expansion passes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DirectiveKind {
    /// `@@include:id@@`, expanded before generation
    Include,
    /// `@@snippet:id@@`, expanded after generation
    Snippet,
    /// `@@reference:id@@`, replaced by a marker after generation
    Reference,
}

impl DirectiveKind {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Include => "include",
            Self::Snippet => "snippet",
            Self::Reference => "reference",
        }
    }

    fn prefix(&self) -> &'static str {
        match self {
            Self::Include => "@@include:",
            Self::Snippet => "@@snippet:",
            Self::Reference => "@@reference:",
        }
    }
}

impl fmt::Display for DirectiveKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// One directive found in a piece of text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Directive {
    pub kind: DirectiveKind,
    pub id: String,
    /// Byte range of the whole `@@kind:id@@` marker
    pub span: Range<usize>,
}

/// Find every directive of `kind` in `content`
pub fn scan(content: &str, kind: DirectiveKind) -> Vec<Directive> {
    let prefix = kind.prefix();
    let mut found = Vec::new();
    let mut pos = 0;

    while let Some(offset) = content[pos..].find(prefix) {
        let start = pos + offset;
        let id_start = start + prefix.len();

        let Some(id_len) = content[id_start..].find('@') else {
            // No terminator anywhere after this point
            break;
        };
        let id_end = id_start + id_len;

        if id_len > 0 && content[id_end..].starts_with("@@") {
            let end = id_end + 2;
            found.push(Directive {
                kind,
                id: content[id_start..id_end].to_string(),
                span: start..end,
            });
            pos = end;
        } else {
            pos = start + 1;
        }
    }

    found
}

/// Whether `content` holds at least one directive of `kind`
pub fn contains(content: &str, kind: DirectiveKind) -> bool {
    !scan(content, kind).is_empty()
}
