//! Encoding comments into, and out of, the metadata block

use crate::core::comment::{Comment, CommentData};
use crate::store::block::{block_span, END_MARKER, START_MARKER};

/// Inserted into `-->` so stored text cannot close the block early
const ZERO_WIDTH: char = '\u{200B}';

const ESCAPED_END: &str = "--\u{200B}>";

/// Make `text` safe to embed in the block.
///
/// Existing zero-width spaces are doubled first so that the inserted ones
/// stay distinguishable and [`restore_from_storage`] is an exact inverse.
pub fn sanitize_for_storage(text: &str) -> String {
    let doubled = text.replace(ZERO_WIDTH, "\u{200B}\u{200B}");
    doubled.replace(END_MARKER, ESCAPED_END)
}

/// Exact inverse of [`sanitize_for_storage`]
pub fn restore_from_storage(text: &str) -> String {
    let mut restored = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        if c != ZERO_WIDTH {
            restored.push(c);
            continue;
        }
        // a doubled marker was an original character, a lone one was ours
        if chars.peek() == Some(&ZERO_WIDTH) {
            chars.next();
            restored.push(ZERO_WIDTH);
        }
    }

    restored
}

fn map_stored_text(comments: &mut [Comment], f: impl Fn(&str) -> String) {
    for comment in comments {
        comment.content = f(&comment.content);
        comment.anchor.text = f(&comment.anchor.text);
        for reply in &mut comment.replies {
            reply.content = f(&reply.content);
        }
    }
}

/// Serialize comments into a complete block, markers included
pub fn encode_block(comments: &[Comment]) -> Result<String, serde_json::Error> {
    let mut stored = comments.to_vec();
    map_stored_text(&mut stored, sanitize_for_storage);

    let json = serde_json::to_string_pretty(&CommentData::new(stored))?;
    // '<' and '>' only ever appear inside JSON strings, so the escapes are
    // lossless and keep both markers out of the payload, author names included
    let json = json.replace('<', "\\u003c").replace('>', "\\u003e");

    Ok(format!("{}\n{}\n{}", START_MARKER, json, END_MARKER))
}

/// Decode the payload text found between the markers.
///
/// Anything that does not look like a JSON object, or fails to decode,
/// yields an empty list.
pub fn decode_payload(payload: &str) -> Vec<Comment> {
    let trimmed = payload.trim();
    if !trimmed.starts_with('{') {
        tracing::debug!("metadata block payload is not an object, ignoring");
        return Vec::new();
    }

    match serde_json::from_str::<CommentData>(trimmed) {
        Ok(data) => {
            let mut comments = data.comments;
            map_stored_text(&mut comments, restore_from_storage);
            comments
        }
        Err(e) => {
            tracing::warn!(error = %e, "malformed comment metadata, treating as empty");
            Vec::new()
        }
    }
}

/// Locate the block in `text` and decode it
pub fn decode_document(text: &str) -> Vec<Comment> {
    match block_span(text) {
        Some(span) => decode_payload(&text[span.payload]),
        None => Vec::new(),
    }
}
