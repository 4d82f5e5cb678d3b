//! Anchor store - owns the hidden metadata block
//!
//! Provides:
//! - block: locating the block while skipping look-alikes inside code
//! - codec: sanitizing, encoding and decoding the block payload
//! - comments: user-facing comment and reply operations
//! - api: CLI handlers for the comment subcommands
//!
//! The store keeps a per-document cache of decoded comments and funnels every
//! write through a per-document FIFO queue.

pub mod api;
pub mod block;
pub mod codec;
pub mod comments;
pub mod queue;

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use crate::core::comment::Comment;
use crate::core::document::{Document, TextEdit};
use crate::core::error::StoreError;
use crate::store::block::block_span;
use crate::store::codec::{decode_payload, encode_block};
use crate::store::queue::WriteQueue;

/// Separates the document body from a newly appended block
const BLOCK_SEPARATOR: &str = "\n\n";

#[derive(Debug, Default)]
pub struct AnchorStore {
    cache: Mutex<HashMap<String, Vec<Comment>>>,
    writes: WriteQueue,
}

impl AnchorStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn cache(&self) -> MutexGuard<'_, HashMap<String, Vec<Comment>>> {
        self.cache.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Re-read the block from the document and refresh the cache
    pub fn parse_comments(&self, doc: &impl Document) -> Vec<Comment> {
        let text = doc.text();
        let comments = match block_span(text) {
            Some(span) => decode_payload(&text[span.payload]),
            None => Vec::new(),
        };

        tracing::debug!(document = doc.id(), count = comments.len(), "parsed comments");
        self.cache()
            .insert(doc.id().to_string(), comments.clone());
        comments
    }

    /// Cached comments, parsing on first access
    pub fn get_comments(&self, doc: &impl Document) -> Vec<Comment> {
        if let Some(cached) = self.cache().get(doc.id()) {
            return cached.clone();
        }
        self.parse_comments(doc)
    }

    /// Write `comments` into the document as a single edit.
    ///
    /// Appends a new block if none exists, otherwise replaces the existing one
    /// marker to marker. The cache is only updated once the edit is accepted.
    pub fn save_comments(
        &self,
        doc: &mut impl Document,
        comments: &[Comment],
    ) -> Result<(), StoreError> {
        let _turn = self.writes.acquire(doc.id());

        let block = encode_block(comments)?;

        let edit = match block_span(doc.text()) {
            Some(span) => TextEdit::Replace {
                range: span.range(),
                text: block,
            },
            None => TextEdit::Insert {
                offset: doc.text().len(),
                text: format!("{}{}", BLOCK_SEPARATOR, block),
            },
        };

        if let Err(source) = doc.apply_edit(&edit) {
            tracing::warn!(document = doc.id(), error = %source, "comment write rejected");
            return Err(StoreError::WriteRejected {
                document: doc.id().to_string(),
                source,
            });
        }

        tracing::info!(document = doc.id(), count = comments.len(), "saved comments");
        self.cache()
            .insert(doc.id().to_string(), comments.to_vec());
        Ok(())
    }

    /// Drop the cached comments for a document (it was replaced or closed)
    #[allow(dead_code)]
    pub fn invalidate(&self, document: &str) {
        self.cache().remove(document);
    }

    /// Whether a document currently has cached comments
    #[allow(dead_code)]
    pub fn is_cached(&self, document: &str) -> bool {
        self.cache().contains_key(document)
    }
}
