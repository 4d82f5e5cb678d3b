//! Locating the hidden metadata block
//!
//! The block looks like:
//! <!-- marginalia:comments
//! { "version": 1, "comments": [...] }
//! -->
//!
//! The valid block is always the last one in the document, so the search
//! runs backward and skips marker look-alikes inside fenced code or inline
//! code spans.

use std::ops::Range;

/// Opens the metadata block
pub const START_MARKER: &str = "<!-- marginalia:comments";

/// Closes the metadata block
pub const END_MARKER: &str = "-->";

const FENCE: &str = "```";

/// Byte layout of a located block
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockSpan {
    /// Start of the start marker
    pub start: usize,
    /// One past the end marker
    pub end: usize,
    /// Text between the markers
    pub payload: Range<usize>,
}

impl BlockSpan {
    pub fn range(&self) -> Range<usize> {
        self.start..self.end
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }
}

/// Offset of the right-most start marker that is not inside code
pub fn locate_block(text: &str) -> Option<usize> {
    let mut search_end = text.len();

    while let Some(pos) = text[..search_end].rfind(START_MARKER) {
        if is_inside_fence(text, pos) {
            tracing::debug!(offset = pos, "skipping marker inside fenced code");
        } else if is_inside_inline_code(text, pos) {
            tracing::debug!(offset = pos, "skipping marker inside inline code");
        } else {
            return Some(pos);
        }
        search_end = pos;
    }

    None
}

/// Full extent of the block, start marker through end marker.
///
/// `None` if there is no block or its end marker is missing.
pub fn block_span(text: &str) -> Option<BlockSpan> {
    let start = locate_block(text)?;
    let payload_start = start + START_MARKER.len();
    let payload_end = payload_start + text[payload_start..].find(END_MARKER)?;

    Some(BlockSpan {
        start,
        end: payload_end + END_MARKER.len(),
        payload: payload_start..payload_end,
    })
}

/// An odd number of fences before `offset` means we are inside one
fn is_inside_fence(text: &str, offset: usize) -> bool {
    text[..offset].matches(FENCE).count() % 2 == 1
}

/// An odd number of lone backticks earlier on the same line means we are
/// inside an inline code span. Backticks belonging to a fence do not count.
fn is_inside_inline_code(text: &str, offset: usize) -> bool {
    let line_start = text[..offset].rfind('\n').map(|i| i + 1).unwrap_or(0);
    let line = &text[line_start..offset];
    let fence_ticks = line.matches(FENCE).count() * FENCE.len();
    let ticks = line.matches('`').count() - fence_ticks;
    ticks % 2 == 1
}
