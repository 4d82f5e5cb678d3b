//! Unified Result Model
//!
//! Every command maps its output to this model before rendering, so comment
//! listings, reconcile summaries and scans share one jsonl/json/md/raw surface.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::core::comment::{Comment, Position, Reply};
use crate::core::util::truncate_string;

/// Maximum excerpt size in bytes; the full text stays in `data`
const EXCERPT_LIMIT: usize = 240;

/// The kind of result item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Kind {
    Document,
    Comment,
    Reply,
    Preview,
    Error,
}

/// Line-based range, end exclusive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RangeLine {
    pub start: usize,
    pub end: usize,
}

/// Line/character range of an anchor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RangeChar {
    pub start: Position,
    pub end: Position,
}

/// Range can be either line-based or character-based
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Range {
    Char(RangeChar),
    Line(RangeLine),
}

impl Range {
    pub fn lines(start: usize, end: usize) -> Self {
        Range::Line(RangeLine { start, end })
    }

    pub fn chars(start: Position, end: Position) -> Self {
        Range::Char(RangeChar { start, end })
    }

    fn start_line(&self) -> usize {
        match self {
            Range::Char(r) => r.start.line,
            Range::Line(r) => r.start,
        }
    }
}

/// Metadata for a result item
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Meta {
    /// File size in bytes
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,

    /// Content hash (XXH3)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hash: Option<String>,

    /// Whether the excerpt was truncated
    #[serde(default)]
    pub truncated: bool,
}

/// Error information for a result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemError {
    pub code: String,
    pub message: String,
}

impl ItemError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }
}

/// The unified result item that all commands produce
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultItem {
    pub kind: Kind,

    /// Path relative to root, using '/' as separator
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,

    /// Comment or reply id
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<Uuid>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub range: Option<Range>,

    /// Short human-readable content (comment text, summary line)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub excerpt: Option<String>,

    /// Structured payload, embedded as JSON rather than a string
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,

    pub meta: Meta,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<ItemError>,
}

impl ResultItem {
    fn empty(kind: Kind) -> Self {
        Self {
            kind,
            path: None,
            id: None,
            range: None,
            excerpt: None,
            data: None,
            meta: Meta::default(),
            errors: Vec::new(),
        }
    }

    /// A whole document
    pub fn document(path: impl Into<String>) -> Self {
        Self {
            path: Some(path.into()),
            ..Self::empty(Kind::Document)
        }
    }

    /// A comment, with its full record as data
    pub fn comment(path: impl Into<String>, comment: &Comment) -> Self {
        Self {
            path: Some(path.into()),
            id: Some(comment.id),
            range: Some(Range::chars(comment.anchor.start(), comment.anchor.end())),
            data: serde_json::to_value(comment).ok(),
            ..Self::empty(Kind::Comment)
        }
        .with_truncated_excerpt(&comment.content)
    }

    /// A reply, with the parent comment id in data
    pub fn reply(path: impl Into<String>, comment_id: Uuid, reply: &Reply) -> Self {
        let mut data = serde_json::to_value(reply).unwrap_or_default();
        if let Some(object) = data.as_object_mut() {
            object.insert("commentId".to_string(), comment_id.to_string().into());
        }
        Self {
            path: Some(path.into()),
            id: Some(reply.id),
            data: Some(data),
            ..Self::empty(Kind::Reply)
        }
        .with_truncated_excerpt(&reply.content)
    }

    /// A rendered preview
    pub fn preview(path: impl Into<String>) -> Self {
        Self {
            path: Some(path.into()),
            ..Self::empty(Kind::Preview)
        }
    }

    pub fn error(error: ItemError) -> Self {
        Self {
            errors: vec![error],
            ..Self::empty(Kind::Error)
        }
    }

    pub fn with_range(mut self, range: Range) -> Self {
        self.range = Some(range);
        self
    }

    pub fn with_excerpt(mut self, excerpt: impl Into<String>) -> Self {
        self.excerpt = Some(excerpt.into());
        self
    }

    fn with_truncated_excerpt(mut self, text: &str) -> Self {
        let (excerpt, truncated) = truncate_string(text, EXCERPT_LIMIT);
        self.excerpt = Some(excerpt);
        self.meta.truncated = truncated;
        self
    }

    pub fn with_meta(mut self, meta: Meta) -> Self {
        self.meta = meta;
        self
    }

    /// Set structured data payload
    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = Some(data);
        self
    }
}

/// Result set containing multiple result items
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResultSet {
    pub items: Vec<ResultItem>,
}

impl ResultSet {
    pub fn new() -> Self {
        Self { items: Vec::new() }
    }

    pub fn push(&mut self, item: ResultItem) {
        self.items.push(item);
    }

    pub fn extend(&mut self, items: impl IntoIterator<Item = ResultItem>) {
        self.items.extend(items);
    }

    /// Sort items by path and range start for stable output
    pub fn sort(&mut self) {
        self.items.sort_by(|a, b| match (&a.path, &b.path) {
            (Some(pa), Some(pb)) => pa.cmp(pb).then_with(|| match (&a.range, &b.range) {
                (Some(ra), Some(rb)) => ra.start_line().cmp(&rb.start_line()),
                (Some(_), None) => std::cmp::Ordering::Less,
                (None, Some(_)) => std::cmp::Ordering::Greater,
                (None, None) => std::cmp::Ordering::Equal,
            }),
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => std::cmp::Ordering::Equal,
        });
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl IntoIterator for ResultSet {
    type Item = ResultItem;
    type IntoIter = std::vec::IntoIter<ResultItem>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

impl FromIterator<ResultItem> for ResultSet {
    fn from_iter<T: IntoIterator<Item = ResultItem>>(iter: T) -> Self {
        Self {
            items: iter.into_iter().collect(),
        }
    }
}
