//! Highlight projection onto render tokens
//!
//! Comments are assigned to the leaf tokens whose source lines cover their
//! anchor's start line. For an inline token the text-bearing children are
//! concatenated and the anchor is searched for in that string:
//!
//! 1. exact anchor text
//! 2. anchor text with markdown syntax stripped
//! 3. the whole token, so a highlight is never silently dropped
//!
//! The children are then cut at match boundaries and highlight open/close
//! tokens inserted around each matched piece. Highlights are kept properly
//! nested around markup tokens: an emphasis or link marker inside an active
//! highlight closes and reopens it.
//!
//! Fence tokens are searched literally and rewritten to a `Preformatted`
//! block with `<mark>` elements in place.

use std::collections::BTreeMap;
use std::ops::Range;

use uuid::Uuid;

use crate::core::comment::Comment;
use crate::preview::html::{open_code_block, open_mark, push_escaped};
use crate::preview::normalize::normalize_anchor_text;
use crate::preview::token::{Token, TokenKind};
use crate::store::block::block_span;

pub const DEFAULT_HIGHLIGHT_CLASS: &str = "marginalia-highlight";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectorConfig {
    /// CSS class put on every highlight element
    pub highlight_class: String,
    /// Project resolved comments too
    pub include_resolved: bool,
}

impl Default for ProjectorConfig {
    fn default() -> Self {
        Self {
            highlight_class: DEFAULT_HIGHLIGHT_CLASS.to_string(),
            include_resolved: true,
        }
    }
}

/// How an anchor was located inside a token's text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchKind {
    Exact,
    Normalized,
    WholeToken,
}

#[derive(Debug, Clone)]
struct Highlight {
    comment: Uuid,
    range: Range<usize>,
}

#[derive(Debug, Clone, Default)]
pub struct Projector {
    config: ProjectorConfig,
}

impl Projector {
    pub fn new(config: ProjectorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ProjectorConfig {
        &self.config
    }

    /// Wrap every projectable comment's anchor in highlight tokens, in place
    pub fn project(&self, tokens: &mut [Token], source: &str, comments: &[Comment]) {
        let by_line = self.group_by_line(comments);
        if by_line.is_empty() {
            return;
        }
        let excluded = metadata_lines(source);

        for token in tokens.iter_mut() {
            let Some((start, end)) = token.map else {
                continue;
            };
            if excluded.as_ref().is_some_and(|lines| lines.contains(&start)) {
                continue;
            }

            let candidates: Vec<&Comment> = by_line
                .range(start..end)
                .flat_map(|(_, comments)| comments.iter().copied())
                .collect();
            if candidates.is_empty() {
                continue;
            }

            match token.kind {
                TokenKind::Inline => project_inline(token, &candidates),
                TokenKind::Fence { .. } => self.project_fence(token, &candidates),
                _ => {}
            }
        }
    }

    fn group_by_line<'c>(&self, comments: &'c [Comment]) -> BTreeMap<usize, Vec<&'c Comment>> {
        let mut by_line: BTreeMap<usize, Vec<&Comment>> = BTreeMap::new();
        for comment in comments {
            if comment.orphaned || (comment.resolved && !self.config.include_resolved) {
                continue;
            }
            by_line
                .entry(comment.anchor.start_line)
                .or_default()
                .push(comment);
        }
        by_line
    }

    fn project_fence(&self, token: &mut Token, candidates: &[&Comment]) {
        let TokenKind::Fence { info } = &token.kind else {
            return;
        };

        let mut found: Vec<(Range<usize>, Uuid)> = candidates
            .iter()
            .filter(|c| !c.anchor.text.is_empty())
            .filter_map(|c| {
                let start = token.content.find(&c.anchor.text)?;
                Some((start..start + c.anchor.text.len(), c.id))
            })
            .collect();
        if found.is_empty() {
            return;
        }
        found.sort_by_key(|(range, _)| (range.start, range.end));

        // overlapping matches share one mark
        let mut merged: Vec<(Range<usize>, Vec<Uuid>)> = Vec::new();
        for (range, id) in found {
            match merged.last_mut() {
                Some((last, ids)) if range.start < last.end => {
                    last.end = last.end.max(range.end);
                    ids.push(id);
                }
                _ => merged.push((range, vec![id])),
            }
        }

        let mut html = String::new();
        open_code_block(&mut html, info.as_deref());
        let mut last = 0;
        for (range, ids) in &merged {
            push_escaped(&mut html, &token.content[last..range.start]);
            let ids: Vec<String> = ids.iter().map(Uuid::to_string).collect();
            open_mark(&mut html, &self.config.highlight_class, &ids.join(" "));
            push_escaped(&mut html, &token.content[range.clone()]);
            html.push_str("</mark>");
            last = range.end;
        }
        push_escaped(&mut html, &token.content[last..]);
        html.push_str("</code></pre>\n");

        tracing::debug!(marks = merged.len(), "projected fence highlights");
        token.kind = TokenKind::Preformatted;
        token.content = html;
    }
}

/// Source lines `[start, end)` taken by the metadata block
fn metadata_lines(source: &str) -> Option<Range<usize>> {
    let span = block_span(source)?;
    let start = source[..span.start].matches('\n').count();
    let end = source[..span.end].matches('\n').count() + 1;
    Some(start..end)
}

/// Concatenate the text-bearing children; `None` marks zero-width markup
fn reconstruct(children: &[Token]) -> (String, Vec<Option<Range<usize>>>) {
    let mut combined = String::new();
    let segments = children
        .iter()
        .map(|child| {
            child.rendered_text().map(|text| {
                let start = combined.len();
                combined.push_str(text);
                start..combined.len()
            })
        })
        .collect();
    (combined, segments)
}

/// Find `anchor` in `text`, degrading to the whole text
pub fn locate_in_text(text: &str, anchor: &str) -> Option<(Range<usize>, MatchKind)> {
    if text.is_empty() {
        return None;
    }

    if !anchor.is_empty() {
        if let Some(start) = text.find(anchor) {
            return Some((start..start + anchor.len(), MatchKind::Exact));
        }
    }

    let normalized = normalize_anchor_text(anchor);
    let normalized = normalized.trim();
    if !normalized.is_empty() {
        if let Some(start) = text.find(normalized) {
            return Some((start..start + normalized.len(), MatchKind::Normalized));
        }
    }

    Some((0..text.len(), MatchKind::WholeToken))
}

fn project_inline(token: &mut Token, candidates: &[&Comment]) {
    let Some(children) = token.children.take() else {
        return;
    };
    let (combined, segments) = reconstruct(&children);

    let highlights: Vec<Highlight> = candidates
        .iter()
        .filter_map(|comment| {
            let (range, kind) = locate_in_text(&combined, &comment.anchor.text)?;
            tracing::debug!(id = %comment.id, ?kind, "projected anchor");
            Some(Highlight {
                comment: comment.id,
                range,
            })
        })
        .collect();

    token.children = Some(if highlights.is_empty() {
        children
    } else {
        split_children(children, &segments, &highlights)
    });
}

fn split_children(
    children: Vec<Token>,
    segments: &[Option<Range<usize>>],
    highlights: &[Highlight],
) -> Vec<Token> {
    let mut splitter = Splitter {
        highlights,
        opened: vec![false; highlights.len()],
        stack: Vec::new(),
        out: Vec::with_capacity(children.len() + highlights.len() * 2),
    };

    let mut offset = 0;
    for (child, segment) in children.into_iter().zip(segments) {
        match segment {
            Some(range) => {
                splitter.text(child, range.clone());
                offset = range.end;
            }
            None => splitter.markup(child, offset),
        }
    }
    splitter.close_at(usize::MAX);

    splitter.out
}

struct Splitter<'h> {
    highlights: &'h [Highlight],
    opened: Vec<bool>,
    /// Open highlights, innermost last
    stack: Vec<usize>,
    out: Vec<Token>,
}

impl Splitter<'_> {
    fn open_token(&self, index: usize) -> Token {
        Token::new(TokenKind::HighlightOpen {
            comment: self.highlights[index].comment,
        })
    }

    fn close_token(&self, index: usize) -> Token {
        Token::new(TokenKind::HighlightClose {
            comment: self.highlights[index].comment,
        })
    }

    /// Close `index`, dropping its open token instead if nothing was emitted
    /// since it was opened
    fn push_close(&mut self, index: usize) {
        let comment = self.highlights[index].comment;
        let empty = matches!(
            self.out.last().map(|t| &t.kind),
            Some(TokenKind::HighlightOpen { comment: last }) if *last == comment
        );
        if empty {
            self.out.pop();
            return;
        }
        let token = self.close_token(index);
        self.out.push(token);
    }

    fn open_at(&mut self, offset: usize) {
        let mut starting: Vec<usize> = (0..self.highlights.len())
            .filter(|&i| {
                let range = &self.highlights[i].range;
                !self.opened[i] && range.start <= offset && range.end > offset
            })
            .collect();
        // longer highlights open first so they close last
        starting.sort_by(|&a, &b| {
            self.highlights[b]
                .range
                .end
                .cmp(&self.highlights[a].range.end)
        });

        for index in starting {
            self.opened[index] = true;
            self.stack.push(index);
            let token = self.open_token(index);
            self.out.push(token);
        }
    }

    /// Close highlights ending at or before `offset`, reopening any that
    /// were nested inside them
    fn close_at(&mut self, offset: usize) {
        let mut pending: Vec<usize> = self
            .stack
            .iter()
            .copied()
            .filter(|&i| self.highlights[i].range.end <= offset)
            .collect();
        let mut reopen = Vec::new();

        while !pending.is_empty() {
            let Some(top) = self.stack.pop() else {
                break;
            };
            self.push_close(top);
            match pending.iter().position(|&i| i == top) {
                Some(found) => {
                    pending.swap_remove(found);
                }
                None => reopen.push(top),
            }
        }

        for index in reopen.into_iter().rev() {
            self.stack.push(index);
            let token = self.open_token(index);
            self.out.push(token);
        }
    }

    fn markup(&mut self, token: Token, offset: usize) {
        self.close_at(offset);
        if self.stack.is_empty() {
            self.out.push(token);
            return;
        }

        let active = self.stack.clone();
        for &index in active.iter().rev() {
            self.push_close(index);
        }
        self.out.push(token);
        for &index in &active {
            let open = self.open_token(index);
            self.out.push(open);
        }
    }

    fn text(&mut self, token: Token, range: Range<usize>) {
        let mut cuts: Vec<usize> = self
            .highlights
            .iter()
            .flat_map(|h| [h.range.start, h.range.end])
            .filter(|&cut| cut > range.start && cut < range.end)
            .collect();
        cuts.sort_unstable();
        cuts.dedup();

        if cuts.is_empty() || !token.is_splittable() {
            self.close_at(range.start);
            self.open_at(range.start);
            self.out.push(token);
            return;
        }

        let mut from = range.start;
        for cut in cuts.into_iter().chain(std::iter::once(range.end)) {
            self.close_at(from);
            self.open_at(from);
            let piece = token
                .content
                .get(from - range.start..cut - range.start)
                .unwrap_or_default();
            self.out.push(Token::with_content(token.kind.clone(), piece));
            from = cut;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::comment::{CommentAnchor, Position};
    use crate::preview::parse::tokenize;
    use crate::preview::token::InlineTag;

    fn comment_on(text: &str, line: usize) -> Comment {
        let anchor = CommentAnchor::new(text, Position::new(line, 0), Position::new(line, text.len()));
        Comment::new(anchor, "note", "alice")
    }

    fn project(source: &str, comments: &[Comment]) -> Vec<Token> {
        let mut tokens = tokenize(source);
        Projector::default().project(&mut tokens, source, comments);
        tokens
    }

    fn first_inline(tokens: &[Token]) -> &[Token] {
        tokens
            .iter()
            .find(|t| t.kind == TokenKind::Inline)
            .and_then(|t| t.children.as_deref())
            .unwrap()
    }

    /// Inline children as a compact string: `[` / `]` for highlights
    fn sketch(children: &[Token]) -> String {
        children
            .iter()
            .map(|t| match &t.kind {
                TokenKind::HighlightOpen { .. } => "[".to_string(),
                TokenKind::HighlightClose { .. } => "]".to_string(),
                TokenKind::MarkupOpen(_) => "<".to_string(),
                TokenKind::MarkupClose(_) => ">".to_string(),
                _ => t.rendered_text().unwrap_or_default().to_string(),
            })
            .collect()
    }

    #[test]
    fn test_exact_match_splits_text() {
        let comment = comment_on("world", 0);
        let tokens = project("Hello world again\n", &[comment.clone()]);
        let children = first_inline(&tokens);

        assert_eq!(sketch(children), "Hello [world] again");
        assert_eq!(
            children[1].kind,
            TokenKind::HighlightOpen {
                comment: comment.id
            }
        );
    }

    #[test]
    fn test_backticks_match_via_normalization() {
        let source = "Run the `inline` helper\n";
        let tokens = project(source, &[comment_on("`inline`", 0)]);
        let children = first_inline(&tokens);

        assert_eq!(sketch(children), "Run the [inline] helper");
        assert!(children
            .iter()
            .any(|t| t.kind == TokenKind::CodeInline && t.content == "inline"));
    }

    #[test]
    fn test_unmatched_anchor_highlights_whole_token() {
        let tokens = project("Entirely different\n", &[comment_on("vanished text", 0)]);
        assert_eq!(sketch(first_inline(&tokens)), "[Entirely different]");
    }

    #[test]
    fn test_match_across_emphasis_stays_nested() {
        let tokens = project("Some *emphasised* words\n", &[comment_on("Some *emphasised* words", 0)]);
        let children = first_inline(&tokens);

        assert_eq!(sketch(children), "[Some ]<[emphasised]>[ words]");
        let em = children
            .iter()
            .position(|t| t.kind == TokenKind::MarkupOpen(InlineTag::Emphasis))
            .unwrap();
        assert!(matches!(children[em - 1].kind, TokenKind::HighlightClose { .. }));
    }

    #[test]
    fn test_match_inside_emphasis() {
        let tokens = project("Some *emphasised* words\n", &[comment_on("emphasised", 0)]);
        assert_eq!(sketch(first_inline(&tokens)), "Some <[emphasised]> words");
    }

    #[test]
    fn test_overlapping_comments_get_independent_markers() {
        let first = comment_on("alpha beta", 0);
        let second = comment_on("beta gamma", 0);
        let tokens = project("alpha beta gamma\n", &[first.clone(), second.clone()]);
        let children = first_inline(&tokens);

        assert_eq!(sketch(children), "[alpha [beta]][ gamma]");

        let opens = |id: Uuid| {
            children
                .iter()
                .filter(|t| t.kind == TokenKind::HighlightOpen { comment: id })
                .count()
        };
        let closes = |id: Uuid| {
            children
                .iter()
                .filter(|t| t.kind == TokenKind::HighlightClose { comment: id })
                .count()
        };
        assert_eq!(opens(first.id), closes(first.id));
        assert_eq!(opens(second.id), closes(second.id));
    }

    #[test]
    fn test_overlap_ending_at_markup_leaves_no_empty_marker() {
        let source = "alpha *beta* gamma\n";
        let comments = [comment_on("alpha *beta", 0), comment_on("beta* gamma", 0)];
        let tokens = project(source, &comments);

        assert_eq!(sketch(first_inline(&tokens)), "[alpha ]<[[beta]]>[ gamma]");
        let html = crate::preview::html::render_html(&tokens, "h");
        assert!(!html.contains("\"></mark>"), "empty marker in {html}");
    }

    #[test]
    fn test_multiline_anchor_matches_across_soft_break() {
        let tokens = project("first line\nsecond line\n", &[comment_on("line\nsecond", 0)]);
        assert_eq!(sketch(first_inline(&tokens)), "first [line\nsecond] line");
    }

    #[test]
    fn test_comment_only_projects_onto_its_line() {
        let tokens = project("world\n\nworld\n", &[comment_on("world", 2)]);
        let inlines: Vec<_> = tokens
            .iter()
            .filter(|t| t.kind == TokenKind::Inline)
            .collect();
        assert_eq!(sketch(inlines[0].children.as_deref().unwrap()), "world");
        assert_eq!(sketch(inlines[1].children.as_deref().unwrap()), "[world]");
    }

    #[test]
    fn test_orphaned_and_resolved_filtering() {
        let mut orphan = comment_on("Hello", 0);
        orphan.orphaned = true;
        let tokens = project("Hello\n", &[orphan]);
        assert_eq!(sketch(first_inline(&tokens)), "Hello");

        let mut resolved = comment_on("Hello", 0);
        resolved.resolved = true;
        let source = "Hello\n";
        let mut tokens = tokenize(source);
        let projector = Projector::new(ProjectorConfig {
            include_resolved: false,
            ..ProjectorConfig::default()
        });
        projector.project(&mut tokens, source, &[resolved.clone()]);
        assert_eq!(sketch(first_inline(&tokens)), "Hello");

        let tokens = project(source, &[resolved]);
        assert_eq!(sketch(first_inline(&tokens)), "[Hello]");
    }

    #[test]
    fn test_fence_becomes_preformatted() {
        let source = "```rust\nlet x = a < b;\nlet y = 2;\n```\n";
        let comment = comment_on("a < b", 1);
        let tokens = project(source, &[comment.clone()]);

        assert_eq!(tokens[0].kind, TokenKind::Preformatted);
        assert_eq!(
            tokens[0].content,
            format!(
                "<pre><code class=\"language-rust\">let x = <mark class=\"marginalia-highlight\" data-comment-id=\"{}\">a &lt; b</mark>;\nlet y = 2;\n</code></pre>\n",
                comment.id
            )
        );
    }

    #[test]
    fn test_fence_without_match_is_untouched() {
        let source = "```\ncode\n```\n";
        let tokens = project(source, &[comment_on("`code`", 1)]);
        assert_eq!(tokens[0].kind, TokenKind::Fence { info: None });
    }

    #[test]
    fn test_fence_overlaps_merge() {
        let source = "```\nabcdef\n```\n";
        let tokens = project(source, &[comment_on("abcd", 1), comment_on("cdef", 1)]);
        assert_eq!(tokens[0].content.matches("<mark").count(), 1);
        assert!(tokens[0].content.contains(">abcdef</mark>"));
    }

    #[test]
    fn test_locate_in_text_order() {
        assert_eq!(locate_in_text("a `b` c", "`b`"), Some((2..5, MatchKind::Exact)));
        assert_eq!(locate_in_text("a b c", "`b`"), Some((2..3, MatchKind::Normalized)));
        assert_eq!(locate_in_text("a b c", "zzz"), Some((0..5, MatchKind::WholeToken)));
        assert_eq!(locate_in_text("", "zzz"), None);
    }
}
