//! Render tokens
//!
//! A flat block-level token list where leaf blocks (paragraphs, headings,
//! tight list items) carry an `Inline` token whose children hold the inline
//! content. Block tokens carry a `[start_line, end_line)` source map.

use uuid::Uuid;

/// Container and leaf block kinds
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockTag {
    Paragraph,
    Heading(u8),
    BlockQuote,
    BulletList,
    OrderedList(u64),
    ListItem,
}

/// Inline markup that wraps other inline tokens
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InlineTag {
    Emphasis,
    Strong,
    Strikethrough,
    Link { href: String, title: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenKind {
    // block level
    BlockOpen(BlockTag),
    BlockClose(BlockTag),
    /// Holds inline children
    Inline,
    /// Fenced (`info` set) or indented code, raw text in `content`
    Fence { info: Option<String> },
    /// Already-rendered `<pre>` block, HTML in `content`
    Preformatted,
    HtmlBlock,
    Rule,

    // inline level
    Text,
    CodeInline,
    SoftBreak,
    HardBreak,
    MarkupOpen(InlineTag),
    MarkupClose(InlineTag),
    HtmlInline,
    Image { src: String, title: String },
    HighlightOpen { comment: Uuid },
    HighlightClose { comment: Uuid },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    /// Source lines covered, end exclusive
    pub map: Option<(usize, usize)>,
    pub content: String,
    pub children: Option<Vec<Token>>,
}

impl Token {
    pub fn new(kind: TokenKind) -> Self {
        Self {
            kind,
            map: None,
            content: String::new(),
            children: None,
        }
    }

    pub fn with_content(kind: TokenKind, content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ..Self::new(kind)
        }
    }

    pub fn with_map(mut self, map: Option<(usize, usize)>) -> Self {
        self.map = map;
        self
    }

    pub fn text(content: impl Into<String>) -> Self {
        Self::with_content(TokenKind::Text, content)
    }

    /// Text this token contributes to the reconstructed inline string
    pub fn rendered_text(&self) -> Option<&str> {
        match self.kind {
            TokenKind::Text | TokenKind::CodeInline => Some(self.content.as_str()),
            TokenKind::SoftBreak | TokenKind::HardBreak => Some("\n"),
            _ => None,
        }
    }

    /// Whether the token's text may be cut at a character boundary
    pub fn is_splittable(&self) -> bool {
        matches!(self.kind, TokenKind::Text | TokenKind::CodeInline)
    }
}
