//! Host document model
//!
//! The store, reconciler and CLI only talk to documents through the
//! [`Document`] trait. Two implementations are provided: an in-memory
//! [`TextDocument`] and a disk-backed [`FileDocument`] that writes every
//! accepted edit straight through to its file.

use std::fs::{self, File};
use std::io::Write;
use std::ops::Range;
use std::path::{Path, PathBuf};

use crate::core::comment::{Position, Selection};
use crate::core::error::DocumentError;
use crate::core::paths::normalize_path;

/// A single edit against a document's text (byte offsets)
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TextEdit {
    Insert { offset: usize, text: String },
    Replace { range: Range<usize>, text: String },
}

impl TextEdit {
    pub fn range(&self) -> Range<usize> {
        match self {
            TextEdit::Insert { offset, .. } => *offset..*offset,
            TextEdit::Replace { range, .. } => range.clone(),
        }
    }

    pub fn new_text(&self) -> &str {
        match self {
            TextEdit::Insert { text, .. } | TextEdit::Replace { text, .. } => text,
        }
    }

    /// Apply this edit to `target`, leaving it untouched on error
    pub fn apply_to(&self, target: &mut String) -> Result<(), DocumentError> {
        let range = self.range();
        if range.start > range.end
            || range.end > target.len()
            || !target.is_char_boundary(range.start)
            || !target.is_char_boundary(range.end)
        {
            return Err(DocumentError::InvalidRange {
                start: range.start,
                end: range.end,
                len: target.len(),
            });
        }
        target.replace_range(range, self.new_text());
        Ok(())
    }
}

/// The document interface the core consumes.
///
/// Only `id`, `text` and `apply_edit` are required; position mapping is
/// derived from the text.
pub trait Document {
    /// Stable identity used to key caches and write queues
    fn id(&self) -> &str;

    fn text(&self) -> &str;

    /// Apply an edit atomically. On error the document is unchanged.
    fn apply_edit(&mut self, edit: &TextEdit) -> Result<(), DocumentError>;

    fn text_in(&self, range: Range<usize>) -> Option<&str> {
        self.text().get(range)
    }

    fn line_count(&self) -> usize {
        self.text().split('\n').count()
    }

    fn line_at(&self, line: usize) -> Option<&str> {
        self.text()
            .split('\n')
            .nth(line)
            .map(|l| l.strip_suffix('\r').unwrap_or(l))
    }

    fn position_at(&self, offset: usize) -> Position {
        position_at(self.text(), offset)
    }

    fn offset_at(&self, position: Position) -> usize {
        offset_at(self.text(), position)
    }

    /// Text covered by a selection
    fn selection_text(&self, selection: Selection) -> &str {
        let start = self.offset_at(selection.start);
        let end = self.offset_at(selection.end);
        self.text_in(start..end).unwrap_or("")
    }
}

/// Convert a byte offset into a line/character position
pub fn position_at(text: &str, offset: usize) -> Position {
    let mut offset = offset.min(text.len());
    while !text.is_char_boundary(offset) {
        offset -= 1;
    }

    let before = &text[..offset];
    let line = before.matches('\n').count();
    let line_start = before.rfind('\n').map(|i| i + 1).unwrap_or(0);
    let character = text[line_start..offset].chars().count();

    Position { line, character }
}

/// Convert a line/character position into a byte offset, clamping to the
/// end of the line (or document)
pub fn offset_at(text: &str, position: Position) -> usize {
    let mut line_start = 0;
    for _ in 0..position.line {
        match text[line_start..].find('\n') {
            Some(i) => line_start += i + 1,
            None => return text.len(),
        }
    }

    let line_end = text[line_start..]
        .find('\n')
        .map(|i| line_start + i)
        .unwrap_or(text.len());
    let line = &text[line_start..line_end];
    let line = line.strip_suffix('\r').unwrap_or(line);

    line.char_indices()
        .nth(position.character)
        .map(|(i, _)| line_start + i)
        .unwrap_or(line_start + line.len())
}

/// In-memory document
#[derive(Debug, Clone)]
pub struct TextDocument {
    id: String,
    text: String,
    closed: bool,
}

impl TextDocument {
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            closed: false,
        }
    }

    /// Refuse all further edits
    #[allow(dead_code)]
    pub fn close(&mut self) {
        self.closed = true;
    }

    /// Replace the whole text, as an external editor would
    #[allow(dead_code)]
    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text = text.into();
    }
}

impl Document for TextDocument {
    fn id(&self) -> &str {
        &self.id
    }

    fn text(&self) -> &str {
        &self.text
    }

    fn apply_edit(&mut self, edit: &TextEdit) -> Result<(), DocumentError> {
        if self.closed {
            return Err(DocumentError::Closed);
        }
        edit.apply_to(&mut self.text)
    }
}

/// Document backed by a file on disk
#[derive(Debug, Clone)]
pub struct FileDocument {
    path: PathBuf,
    inner: TextDocument,
}

impl FileDocument {
    pub fn open(path: &Path) -> std::io::Result<Self> {
        let text = fs::read_to_string(path)?;
        let id = normalize_path(&path.canonicalize().unwrap_or_else(|_| path.to_path_buf()));
        Ok(Self {
            path: path.to_path_buf(),
            inner: TextDocument::new(id, text),
        })
    }
}

impl Document for FileDocument {
    fn id(&self) -> &str {
        self.inner.id()
    }

    fn text(&self) -> &str {
        self.inner.text()
    }

    fn apply_edit(&mut self, edit: &TextEdit) -> Result<(), DocumentError> {
        let mut next = self.inner.text.clone();
        edit.apply_to(&mut next)?;
        write_atomic(&self.path, next.as_bytes())?;
        self.inner.text = next;
        Ok(())
    }
}

/// Write a sibling temp file and rename it over `path`, so readers see
/// either the old or the new content
fn write_atomic(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let name = path
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or("document");
    let tmp = path.with_file_name(format!(".{}.tmp-{}", name, std::process::id()));

    let written = File::create(&tmp).and_then(|mut file| {
        file.write_all(bytes)?;
        file.sync_all()
    });
    let result = written.and_then(|()| fs::rename(&tmp, path));
    if result.is_err() {
        let _ = fs::remove_file(&tmp);
    }
    result
}
