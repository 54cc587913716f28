//! Line references embedded in chat text, e.g. `server.rs:L10,4-L12`.
//!
//! The file part is resolved to a document through fuzzy title lookup and
//! kept verbatim when nothing matches. A missing end row means a single-line
//! reference; missing columns are `None`.

use regex::Regex;
use serde::Serialize;
use std::sync::LazyLock;

use crate::model::DocumentId;
use crate::registry::TitleLookup;

static FILE_LINK: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r"^(.+):\s*L(\d+)(?:\s*,\s*(\d+))?(?:\s*-\s*L(\d+)(?:\s*,\s*(\d+))?)?$").ok()
});

/// Row and optional column of a reference endpoint, as written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LinePosition {
    pub row: u32,
    pub column: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileReference {
    /// The token as it appeared in the message.
    pub raw: String,
    /// The file name part of the token.
    pub file: String,
    /// Matching document, if the title lookup found one.
    pub document: Option<DocumentId>,
    pub start: LinePosition,
    pub end: LinePosition,
}

impl FileReference {
    /// Document id if resolved, otherwise the verbatim file name.
    #[must_use]
    pub fn target(&self) -> &str {
        self.document.as_ref().map_or(self.file.as_str(), DocumentId::as_str)
    }
}

/// Parse a single token. Returns `None` if it is not a line reference.
#[must_use]
pub fn parse_reference(token: &str, titles: &dyn TitleLookup) -> Option<FileReference> {
    let captures = FILE_LINK.as_ref()?.captures(token)?;
    let number = |i: usize| captures.get(i).and_then(|m| m.as_str().parse::<u32>().ok());

    let file = captures.get(1)?.as_str().to_owned();
    let start = LinePosition {
        row: number(2)?,
        column: number(3),
    };
    let end = LinePosition {
        row: number(4).unwrap_or(start.row),
        column: number(5),
    };
    let document = titles.find_by_title(&file);

    Some(FileReference {
        raw: token.to_owned(),
        file,
        document,
        start,
        end,
    })
}

/// Every line reference in a message body, in order of appearance.
#[must_use]
pub fn extract_references(body: &str, titles: &dyn TitleLookup) -> Vec<FileReference> {
    body.split_whitespace()
        .map(|token| {
            token
                .trim_start_matches(['(', '[', '<', '`', '"', '\''])
                .trim_end_matches([')', ']', '>', '`', '"', '\'', '.', ',', ';'])
        })
        .filter(|token| !token.is_empty())
        .filter_map(|token| parse_reference(token, titles))
        .collect()
}
