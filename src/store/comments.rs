//! Comment and reply operations
//!
//! Every operation reads the current (cached) comments, applies one change
//! and re-serializes the whole list back into the document. Blank input is
//! rejected before anything is touched.

use uuid::Uuid;

use crate::core::comment::{Comment, CommentAnchor, Reply, Selection};
use crate::core::document::Document;
use crate::core::error::CommentError;
use crate::store::AnchorStore;

fn require_content(content: &str) -> Result<&str, CommentError> {
    let trimmed = content.trim();
    if trimmed.is_empty() {
        return Err(CommentError::EmptyContent);
    }
    Ok(trimmed)
}

/// Build an anchor from the document's current text under `selection`
pub fn anchor_for_selection(
    doc: &impl Document,
    selection: Selection,
) -> Result<CommentAnchor, CommentError> {
    let start = doc.offset_at(selection.start);
    let end = doc.offset_at(selection.end);
    let text = doc.text_in(start..end).unwrap_or("");
    if text.trim().is_empty() {
        return Err(CommentError::EmptySelection);
    }

    Ok(CommentAnchor::new(
        text,
        doc.position_at(start),
        doc.position_at(end),
    ))
}

impl AnchorStore {
    /// Apply `f` to the comment with `id` and persist the result
    fn modify_comment<T>(
        &self,
        doc: &mut impl Document,
        id: Uuid,
        f: impl FnOnce(&mut Comment) -> Result<T, CommentError>,
    ) -> Result<T, CommentError> {
        let mut comments = self.get_comments(doc);
        let comment = comments
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or(CommentError::CommentNotFound(id))?;

        let value = f(comment)?;
        self.save_comments(doc, &comments)?;
        Ok(value)
    }

    pub fn add_comment(
        &self,
        doc: &mut impl Document,
        selection: Selection,
        content: &str,
        author: &str,
    ) -> Result<Comment, CommentError> {
        let content = require_content(content)?;
        let anchor = anchor_for_selection(doc, selection)?;

        let comment = Comment::new(anchor, content, author);
        let mut comments = self.get_comments(doc);
        comments.push(comment.clone());
        self.save_comments(doc, &comments)?;

        tracing::info!(document = doc.id(), id = %comment.id, "added comment");
        Ok(comment)
    }

    /// Remove a comment together with all of its replies
    pub fn delete_comment(&self, doc: &mut impl Document, id: Uuid) -> Result<Comment, CommentError> {
        let mut comments = self.get_comments(doc);
        let index = comments
            .iter()
            .position(|c| c.id == id)
            .ok_or(CommentError::CommentNotFound(id))?;

        let removed = comments.remove(index);
        self.save_comments(doc, &comments)?;
        Ok(removed)
    }

    pub fn update_comment(
        &self,
        doc: &mut impl Document,
        id: Uuid,
        content: &str,
    ) -> Result<Comment, CommentError> {
        let content = require_content(content)?;
        self.modify_comment(doc, id, |comment| {
            comment.content = content.to_string();
            comment.touch();
            Ok(comment.clone())
        })
    }

    pub fn resolve_comment(
        &self,
        doc: &mut impl Document,
        id: Uuid,
        resolved: bool,
    ) -> Result<Comment, CommentError> {
        self.modify_comment(doc, id, |comment| {
            comment.resolved = resolved;
            comment.touch();
            Ok(comment.clone())
        })
    }

    pub fn add_reply(
        &self,
        doc: &mut impl Document,
        id: Uuid,
        content: &str,
        author: &str,
    ) -> Result<Reply, CommentError> {
        let content = require_content(content)?;
        self.modify_comment(doc, id, |comment| {
            let reply = Reply::new(content, author);
            comment.replies.push(reply.clone());
            Ok(reply)
        })
    }

    pub fn update_reply(
        &self,
        doc: &mut impl Document,
        id: Uuid,
        reply_id: Uuid,
        content: &str,
    ) -> Result<Reply, CommentError> {
        let content = require_content(content)?;
        self.modify_comment(doc, id, |comment| {
            let reply = comment
                .reply_mut(reply_id)
                .ok_or(CommentError::ReplyNotFound(reply_id))?;
            reply.content = content.to_string();
            reply.updated_at = Some(chrono::Utc::now());
            Ok(reply.clone())
        })
    }

    pub fn delete_reply(
        &self,
        doc: &mut impl Document,
        id: Uuid,
        reply_id: Uuid,
    ) -> Result<Reply, CommentError> {
        self.modify_comment(doc, id, |comment| {
            let index = comment
                .replies
                .iter()
                .position(|r| r.id == reply_id)
                .ok_or(CommentError::ReplyNotFound(reply_id))?;
            Ok(comment.replies.remove(index))
        })
    }
}
