//! Render tokens → HTML

use pulldown_cmark_escape::{escape_href, escape_html};

use crate::preview::token::{BlockTag, InlineTag, Token, TokenKind};

/// Append `text` escaped for element content or a quoted attribute
pub fn push_escaped(out: &mut String, text: &str) {
    // a String sink never fails
    let _ = escape_html(out, text);
}

fn push_href(out: &mut String, href: &str) {
    let _ = escape_href(out, href);
}

fn open_block(tag: &BlockTag) -> String {
    match tag {
        BlockTag::Paragraph => "<p>".to_string(),
        BlockTag::Heading(level) => format!("<h{level}>"),
        BlockTag::BlockQuote => "<blockquote>\n".to_string(),
        BlockTag::BulletList => "<ul>\n".to_string(),
        BlockTag::OrderedList(1) => "<ol>\n".to_string(),
        BlockTag::OrderedList(start) => format!("<ol start=\"{start}\">\n"),
        BlockTag::ListItem => "<li>".to_string(),
    }
}

fn close_block(tag: &BlockTag) -> String {
    match tag {
        BlockTag::Paragraph => "</p>\n".to_string(),
        BlockTag::Heading(level) => format!("</h{level}>\n"),
        BlockTag::BlockQuote => "</blockquote>\n".to_string(),
        BlockTag::BulletList => "</ul>\n".to_string(),
        BlockTag::OrderedList(_) => "</ol>\n".to_string(),
        BlockTag::ListItem => "</li>\n".to_string(),
    }
}

fn open_markup(out: &mut String, tag: &InlineTag) {
    match tag {
        InlineTag::Emphasis => out.push_str("<em>"),
        InlineTag::Strong => out.push_str("<strong>"),
        InlineTag::Strikethrough => out.push_str("<del>"),
        InlineTag::Link { href, title } => {
            out.push_str("<a href=\"");
            push_href(out, href);
            if !title.is_empty() {
                out.push_str("\" title=\"");
                push_escaped(out, title);
            }
            out.push_str("\">");
        }
    }
}

fn close_markup(tag: &InlineTag) -> &'static str {
    match tag {
        InlineTag::Emphasis => "</em>",
        InlineTag::Strong => "</strong>",
        InlineTag::Strikethrough => "</del>",
        InlineTag::Link { .. } => "</a>",
    }
}

/// `<pre><code>` with a language class taken from the fence info string
pub fn open_code_block(out: &mut String, info: Option<&str>) {
    match info.and_then(|i| i.split_whitespace().next()) {
        Some(lang) => {
            out.push_str("<pre><code class=\"language-");
            push_escaped(out, lang);
            out.push_str("\">");
        }
        None => out.push_str("<pre><code>"),
    }
}

/// `<mark>` carrying the highlight class and space-separated comment ids
pub fn open_mark(out: &mut String, highlight_class: &str, ids: &str) {
    out.push_str("<mark class=\"");
    push_escaped(out, highlight_class);
    out.push_str("\" data-comment-id=\"");
    push_escaped(out, ids);
    out.push_str("\">");
}

fn render_token(out: &mut String, token: &Token, highlight_class: &str) {
    match &token.kind {
        TokenKind::BlockOpen(tag) => out.push_str(&open_block(tag)),
        TokenKind::BlockClose(tag) => out.push_str(&close_block(tag)),
        TokenKind::Inline => {
            for child in token.children.iter().flatten() {
                render_token(out, child, highlight_class);
            }
        }
        TokenKind::Fence { info } => {
            open_code_block(out, info.as_deref());
            push_escaped(out, &token.content);
            out.push_str("</code></pre>\n");
        }
        TokenKind::Preformatted | TokenKind::HtmlBlock | TokenKind::HtmlInline => {
            out.push_str(&token.content)
        }
        TokenKind::Rule => out.push_str("<hr />\n"),
        TokenKind::Text => push_escaped(out, &token.content),
        TokenKind::CodeInline => {
            out.push_str("<code>");
            push_escaped(out, &token.content);
            out.push_str("</code>");
        }
        TokenKind::SoftBreak => out.push('\n'),
        TokenKind::HardBreak => out.push_str("<br />\n"),
        TokenKind::MarkupOpen(tag) => open_markup(out, tag),
        TokenKind::MarkupClose(tag) => out.push_str(close_markup(tag)),
        TokenKind::Image { src, title } => {
            out.push_str("<img src=\"");
            push_href(out, src);
            out.push_str("\" alt=\"");
            push_escaped(out, &token.content);
            if !title.is_empty() {
                out.push_str("\" title=\"");
                push_escaped(out, title);
            }
            out.push_str("\" />");
        }
        TokenKind::HighlightOpen { comment } => {
            open_mark(out, highlight_class, &comment.to_string())
        }
        TokenKind::HighlightClose { .. } => out.push_str("</mark>"),
    }
}

/// Render a token list to an HTML fragment
pub fn render_html(tokens: &[Token], highlight_class: &str) -> String {
    let mut out = String::new();
    for token in tokens {
        render_token(&mut out, token, highlight_class);
    }
    out
}
