//! Comment data model
//!
//! Everything in here is serialized verbatim into the hidden metadata block,
//! so field names follow the persisted camelCase schema.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Schema tag written into every metadata block
pub const DATA_VERSION: u32 = 1;

/// Zero-based line/character position inside a document.
///
/// `character` counts Unicode scalar values from the start of the line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct Position {
    pub line: usize,
    pub character: usize,
}

impl Position {
    pub fn new(line: usize, character: usize) -> Self {
        Self { line, character }
    }
}

impl std::str::FromStr for Position {
    type Err = String;

    /// Parse `LINE:CHAR`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (line, character) = s
            .split_once(':')
            .ok_or_else(|| format!("Invalid position '{}', expected LINE:CHAR", s))?;
        let line = line
            .trim()
            .parse()
            .map_err(|_| format!("Invalid line in position '{}'", s))?;
        let character = character
            .trim()
            .parse()
            .map_err(|_| format!("Invalid character in position '{}'", s))?;
        Ok(Self { line, character })
    }
}

/// A selected region of a document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Selection {
    pub start: Position,
    pub end: Position,
}

impl Selection {
    pub fn new(start: Position, end: Position) -> Self {
        if end < start {
            Self { start: end, end: start }
        } else {
            Self { start, end }
        }
    }
}

/// Where a comment attaches.
///
/// `text` is authoritative; the positional fields are a cache of where it was
/// last seen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentAnchor {
    pub text: String,
    pub start_line: usize,
    pub start_char: usize,
    pub end_line: usize,
    pub end_char: usize,
}

impl CommentAnchor {
    pub fn new(text: impl Into<String>, start: Position, end: Position) -> Self {
        Self {
            text: text.into(),
            start_line: start.line,
            start_char: start.character,
            end_line: end.line,
            end_char: end.character,
        }
    }

    pub fn start(&self) -> Position {
        Position::new(self.start_line, self.start_char)
    }

    pub fn end(&self) -> Position {
        Position::new(self.end_line, self.end_char)
    }

    /// Same text, new location
    pub fn relocated(&self, start: Position, end: Position) -> Self {
        Self::new(self.text.clone(), start, end)
    }
}

/// A reply in a comment thread
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reply {
    pub id: Uuid,
    pub content: String,
    pub author: String,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Reply {
    pub fn new(content: impl Into<String>, author: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            content: content.into(),
            author: author.into(),
            created_at: Utc::now(),
            updated_at: None,
        }
    }
}

fn is_false(value: &bool) -> bool {
    !*value
}

/// A comment attached to a span of text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: Uuid,
    pub anchor: CommentAnchor,
    pub content: String,
    pub author: String,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,

    /// Display filter only, never consulted when matching
    #[serde(default, skip_serializing_if = "is_false")]
    pub resolved: bool,

    /// The anchor text could not be found in the current document body
    #[serde(default, skip_serializing_if = "is_false")]
    pub orphaned: bool,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub replies: Vec<Reply>,
}

impl Comment {
    pub fn new(anchor: CommentAnchor, content: impl Into<String>, author: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            anchor,
            content: content.into(),
            author: author.into(),
            created_at: Utc::now(),
            updated_at: None,
            resolved: false,
            orphaned: false,
            replies: Vec::new(),
        }
    }

    pub fn reply_mut(&mut self, id: Uuid) -> Option<&mut Reply> {
        self.replies.iter_mut().find(|r| r.id == id)
    }

    pub fn touch(&mut self) {
        self.updated_at = Some(Utc::now());
    }
}

/// The full persisted payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommentData {
    pub version: u32,
    #[serde(default)]
    pub comments: Vec<Comment>,
}

impl CommentData {
    pub fn new(comments: Vec<Comment>) -> Self {
        Self {
            version: DATA_VERSION,
            comments,
        }
    }
}

/// Order comments by anchor position for display.
///
/// Persisted order is insertion order and is left untouched.
pub fn sort_by_position(comments: &mut [Comment]) {
    comments.sort_by(|a, b| {
        a.anchor
            .start()
            .cmp(&b.anchor.start())
            .then_with(|| a.created_at.cmp(&b.created_at))
    });
}
