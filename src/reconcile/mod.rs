//! Anchor reconciliation
//!
//! After a document changes, every comment's anchor text is searched for
//! again in the document body. The metadata block is excluded from the
//! search: each anchor's text is also stored verbatim inside it, and
//! matching there would keep deleted anchors alive forever.
//!
//! When the same text occurs more than once the first occurrence wins.

use std::ops::Range;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;
use uuid::Uuid;

use crate::core::comment::{Comment, Selection};
use crate::core::document::{Document, FileDocument};
use crate::core::error::{CommentError, StoreError};
use crate::core::model::{ResultItem, ResultSet};
use crate::core::paths::{display_path, resolve};
use crate::core::render::{RenderConfig, Renderer};
use crate::store::block::block_span;
use crate::store::comments::anchor_for_selection;
use crate::store::AnchorStore;

/// What happened to one comment during reconciliation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Found where the anchor said it was
    Unchanged,
    /// Found elsewhere, or found again after being orphaned
    Relocated,
    /// Newly unmatched
    Orphaned,
    /// Still unmatched
    StillOrphaned,
}

impl Outcome {
    fn is_change(self) -> bool {
        matches!(self, Outcome::Relocated | Outcome::Orphaned)
    }
}

/// Summary of one reconciliation pass
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileReport {
    pub unchanged: usize,
    pub relocated: usize,
    pub orphaned: usize,
    /// Whether updated anchors were written back
    pub saved: bool,
}

/// Document text with the metadata block cut out.
///
/// Offsets found in [`Searchable::text`] map back to document offsets via
/// [`Searchable::to_document`].
#[derive(Debug)]
pub struct Searchable {
    text: String,
    excluded: Option<Range<usize>>,
}

impl Searchable {
    pub fn new(document: &str) -> Self {
        match block_span(document) {
            Some(span) => {
                let mut text = String::with_capacity(document.len() - span.len());
                text.push_str(&document[..span.start]);
                text.push_str(&document[span.end..]);
                Self {
                    text,
                    excluded: Some(span.range()),
                }
            }
            None => Self {
                text: document.to_string(),
                excluded: None,
            },
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn to_document(&self, offset: usize) -> usize {
        match &self.excluded {
            Some(range) if offset >= range.start => offset + (range.end - range.start),
            _ => offset,
        }
    }

    /// First occurrence of `needle` in the body, as a document byte range.
    ///
    /// Matches that would straddle the removed block are skipped.
    pub fn find(&self, needle: &str) -> Option<Range<usize>> {
        if needle.is_empty() {
            return None;
        }

        let mut from = 0;
        while let Some(found) = self.text[from..].find(needle) {
            let start = from + found;
            let end = start + needle.len();
            let straddles = self
                .excluded
                .as_ref()
                .is_some_and(|range| start < range.start && end > range.start);
            if !straddles {
                let start = self.to_document(start);
                return Some(start..start + needle.len());
            }
            from = start + needle.chars().next().map(char::len_utf8).unwrap_or(1);
        }

        None
    }
}

/// Re-validate one comment against the document
pub fn reconcile_comment(
    doc: &impl Document,
    searchable: &Searchable,
    comment: &mut Comment,
) -> Outcome {
    match searchable.find(&comment.anchor.text) {
        Some(range) => {
            let anchor = comment
                .anchor
                .relocated(doc.position_at(range.start), doc.position_at(range.end));
            if anchor == comment.anchor && !comment.orphaned {
                return Outcome::Unchanged;
            }
            comment.anchor = anchor;
            comment.orphaned = false;
            Outcome::Relocated
        }
        None if comment.orphaned => Outcome::StillOrphaned,
        None => {
            comment.orphaned = true;
            Outcome::Orphaned
        }
    }
}

/// Re-validate every comment and persist if anything changed
pub fn reconcile_anchors(
    store: &AnchorStore,
    doc: &mut impl Document,
) -> Result<ReconcileReport, StoreError> {
    let mut comments = store.get_comments(doc);
    let searchable = Searchable::new(doc.text());
    let mut report = ReconcileReport::default();
    let mut dirty = false;

    for comment in &mut comments {
        let outcome = reconcile_comment(doc, &searchable, comment);
        tracing::debug!(id = %comment.id, ?outcome, "reconciled anchor");
        match outcome {
            Outcome::Unchanged => report.unchanged += 1,
            Outcome::Relocated => report.relocated += 1,
            Outcome::Orphaned | Outcome::StillOrphaned => report.orphaned += 1,
        }
        dirty |= outcome.is_change();
    }

    if dirty {
        store.save_comments(doc, &comments)?;
        report.saved = true;
    }

    tracing::info!(
        document = doc.id(),
        relocated = report.relocated,
        orphaned = report.orphaned,
        saved = report.saved,
        "reconciled anchors"
    );
    Ok(report)
}

/// Replace a comment's anchor with the current selection
pub fn re_anchor_comment(
    store: &AnchorStore,
    doc: &mut impl Document,
    id: Uuid,
    selection: Selection,
) -> Result<Comment, CommentError> {
    let anchor = anchor_for_selection(doc, selection)?;
    let mut comments = store.get_comments(doc);
    let comment = comments
        .iter_mut()
        .find(|c| c.id == id)
        .ok_or(CommentError::CommentNotFound(id))?;

    comment.anchor = anchor;
    comment.orphaned = false;
    comment.touch();
    let updated = comment.clone();

    store.save_comments(doc, &comments)?;
    Ok(updated)
}

/// Run the reconcile command
pub fn run_reconcile(root: &Path, path: &Path, config: RenderConfig) -> Result<()> {
    let mut doc = FileDocument::open(&resolve(root, path))
        .with_context(|| format!("Failed to read file: {}", path.display()))?;

    let store = AnchorStore::new();
    let report = reconcile_anchors(&store, &mut doc)
        .with_context(|| format!("Failed to save comments: {}", path.display()))?;

    let mut result_set = ResultSet::new();
    result_set.push(
        ResultItem::document(display_path(root, path))
            .with_excerpt(format!(
                "{} unchanged, {} relocated, {} orphaned",
                report.unchanged, report.relocated, report.orphaned
            ))
            .with_data(serde_json::to_value(&report)?),
    );

    let renderer = Renderer::with_config(config);
    println!("{}", renderer.render(&result_set));

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::comment::{CommentAnchor, Position};
    use crate::core::document::{TextDocument, TextEdit};

    fn doc_with_world() -> (AnchorStore, TextDocument, Comment) {
        let store = AnchorStore::new();
        let mut doc = TextDocument::new("doc", "Hello world");
        let comment = store
            .add_comment(
                &mut doc,
                Selection::new(Position::new(0, 6), Position::new(0, 11)),
                "note",
                "alice",
            )
            .unwrap();
        (store, doc, comment)
    }

    fn replace(doc: &mut TextDocument, from: &str, to: &str) {
        let start = doc.text().find(from).unwrap();
        doc.apply_edit(&TextEdit::Replace {
            range: start..start + from.len(),
            text: to.to_string(),
        })
        .unwrap();
    }

    #[test]
    fn test_unchanged_document_is_not_saved() {
        let (store, mut doc, _) = doc_with_world();
        let before = doc.text().to_string();

        let report = reconcile_anchors(&store, &mut doc).unwrap();
        assert_eq!(report.unchanged, 1);
        assert!(!report.saved);
        assert_eq!(doc.text(), before);
    }

    #[test]
    fn test_deleted_anchor_is_orphaned_despite_stored_copy() {
        let (store, mut doc, _) = doc_with_world();
        replace(&mut doc, "Hello world", "Hello ");
        // the anchor text still exists inside the metadata block
        assert!(doc.text().contains("world"));

        let report = reconcile_anchors(&store, &mut doc).unwrap();
        assert_eq!(report.orphaned, 1);
        assert!(report.saved);

        let parsed = AnchorStore::new().parse_comments(&doc);
        assert!(parsed[0].orphaned);
        assert_eq!(parsed[0].anchor.text, "world");
        assert_eq!(parsed[0].anchor.start(), Position::new(0, 6));
    }

    #[test]
    fn test_orphaning_is_idempotent() {
        let (store, mut doc, _) = doc_with_world();
        replace(&mut doc, "Hello world", "Hello ");
        reconcile_anchors(&store, &mut doc).unwrap();
        let after_first = doc.text().to_string();

        let report = reconcile_anchors(&store, &mut doc).unwrap();
        assert_eq!(report.orphaned, 1);
        assert!(!report.saved);
        assert_eq!(doc.text(), after_first);
    }

    #[test]
    fn test_relocated_anchor_updates_position() {
        let (store, mut doc, _) = doc_with_world();
        replace(&mut doc, "Hello world", "Intro line\n\nSay hello, world");

        let report = reconcile_anchors(&store, &mut doc).unwrap();
        assert_eq!(report.relocated, 1);

        let comment = &store.get_comments(&doc)[0];
        assert_eq!(comment.anchor.text, "world");
        assert_eq!(comment.anchor.start(), Position::new(2, 11));
        assert_eq!(comment.anchor.end(), Position::new(2, 16));
        assert!(!comment.orphaned);
    }

    #[test]
    fn test_restored_text_clears_orphan() {
        let (store, mut doc, _) = doc_with_world();
        replace(&mut doc, "Hello world", "Hello ");
        reconcile_anchors(&store, &mut doc).unwrap();

        replace(&mut doc, "Hello ", "Hello world");
        let report = reconcile_anchors(&store, &mut doc).unwrap();
        assert_eq!(report.relocated, 1);
        assert!(!store.get_comments(&doc)[0].orphaned);
    }

    #[test]
    fn test_duplicate_text_resolves_to_first() {
        let (store, mut doc, _) = doc_with_world();
        replace(&mut doc, "Hello world", "world one\nworld two");

        reconcile_anchors(&store, &mut doc).unwrap();
        assert_eq!(store.get_comments(&doc)[0].anchor.start(), Position::new(0, 0));
    }

    #[test]
    fn test_text_after_block_is_searchable() {
        let (store, mut doc, _) = doc_with_world();
        replace(&mut doc, "Hello world", "Hello");
        let len = doc.text().len();
        doc.apply_edit(&TextEdit::Insert {
            offset: len,
            text: "\ntrailing world".to_string(),
        })
        .unwrap();

        reconcile_anchors(&store, &mut doc).unwrap();
        let comment = &store.get_comments(&doc)[0];
        assert!(!comment.orphaned);
        let start = doc.offset_at(comment.anchor.start());
        let end = doc.offset_at(comment.anchor.end());
        assert_eq!(&doc.text()[start..end], "world");
        assert!(start > doc.text().find("-->").unwrap());
    }

    #[test]
    fn test_searchable_skips_straddling_match() {
        let text = "ab<!-- marginalia:comments\n{}\n-->cd";
        let searchable = Searchable::new(text);
        assert_eq!(searchable.text(), "abcd");
        assert_eq!(searchable.find("bc"), None);
        assert_eq!(searchable.find("cd"), Some(text.len() - 2..text.len()));
    }

    #[test]
    fn test_match_ending_at_block_start() {
        let text = "ab<!-- marginalia:comments\n{}\n-->cd";
        assert_eq!(Searchable::new(text).find("ab"), Some(0..2));
        assert_eq!(Searchable::new(text).find("b"), Some(1..2));
    }

    #[test]
    fn test_anchor_touching_block_keeps_position() {
        let comment = Comment::new(
            CommentAnchor::new("world", Position::new(0, 6), Position::new(0, 11)),
            "note",
            "alice",
        );
        let block = crate::store::codec::encode_block(&[comment]).unwrap();
        let mut doc = TextDocument::new("doc", format!("Hello world{}", block));
        let before = doc.text().to_string();

        let store = AnchorStore::new();
        let report = reconcile_anchors(&store, &mut doc).unwrap();
        assert_eq!(report.unchanged, 1);
        assert!(!report.saved);
        assert_eq!(doc.text(), before);

        let anchor = &store.get_comments(&doc)[0].anchor;
        assert_eq!(anchor.end(), Position::new(0, 11));
    }

    #[test]
    fn test_re_anchor_replaces_anchor() {
        let (store, mut doc, comment) = doc_with_world();
        replace(&mut doc, "Hello world", "Hello planet");
        reconcile_anchors(&store, &mut doc).unwrap();
        assert!(store.get_comments(&doc)[0].orphaned);

        let updated = re_anchor_comment(
            &store,
            &mut doc,
            comment.id,
            Selection::new(Position::new(0, 6), Position::new(0, 12)),
        )
        .unwrap();
        assert_eq!(updated.anchor.text, "planet");
        assert!(!updated.orphaned);
        assert!(updated.updated_at.is_some());

        let parsed = AnchorStore::new().parse_comments(&doc);
        assert_eq!(parsed[0].anchor.text, "planet");
    }
}
