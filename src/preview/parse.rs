//! Markdown → render tokens
//!
//! Uses pulldown-cmark with offset tracking and folds its event stream into
//! the flat block/inline token list the projector works on:
//!
//! ```text
//! "Some *text*\n"
//!     ↓ pulldown-cmark events
//! Start(Paragraph) Text("Some ") Start(Emphasis) Text("text") End(Emphasis) End(Paragraph)
//!     ↓ tokenize
//! [BlockOpen(Paragraph) map=(0,1),
//!  Inline map=(0,1) children=[Text "Some ", MarkupOpen(Emphasis), Text "text", MarkupClose(Emphasis)],
//!  BlockClose(Paragraph)]
//! ```

use std::ops::Range;

use pulldown_cmark::{CodeBlockKind, Event, HeadingLevel, Options, Parser, Tag, TagEnd};

use crate::preview::token::{BlockTag, InlineTag, Token, TokenKind};

/// Line number lookup for byte offsets
struct LineIndex {
    starts: Vec<usize>,
}

impl LineIndex {
    fn new(source: &str) -> Self {
        let mut starts = vec![0];
        starts.extend(source.match_indices('\n').map(|(i, _)| i + 1));
        Self { starts }
    }

    fn line_of(&self, offset: usize) -> usize {
        self.starts.partition_point(|&s| s <= offset).saturating_sub(1)
    }

    /// `[start_line, end_line)` covered by a byte range
    fn span(&self, range: &Range<usize>) -> (usize, usize) {
        let start = self.line_of(range.start);
        let end = if range.end > range.start {
            self.line_of(range.end - 1) + 1
        } else {
            start + 1
        };
        (start, end)
    }
}

struct InlineRun {
    children: Vec<Token>,
    range: Range<usize>,
}

struct CodeRun {
    info: Option<String>,
    content: String,
    map: (usize, usize),
}

struct ImageRun {
    src: String,
    title: String,
    alt: String,
}

struct Builder<'s> {
    source: &'s str,
    lines: LineIndex,
    tokens: Vec<Token>,
    inline: Option<InlineRun>,
    leaf_map: Option<(usize, usize)>,
    code: Option<CodeRun>,
    html: Option<(String, (usize, usize))>,
    image: Option<ImageRun>,
    lists: Vec<BlockTag>,
    markup: Vec<InlineTag>,
}

fn heading_level(level: HeadingLevel) -> u8 {
    match level {
        HeadingLevel::H1 => 1,
        HeadingLevel::H2 => 2,
        HeadingLevel::H3 => 3,
        HeadingLevel::H4 => 4,
        HeadingLevel::H5 => 5,
        HeadingLevel::H6 => 6,
    }
}

impl<'s> Builder<'s> {
    fn new(source: &'s str) -> Self {
        Self {
            source,
            lines: LineIndex::new(source),
            tokens: Vec::new(),
            inline: None,
            leaf_map: None,
            code: None,
            html: None,
            image: None,
            lists: Vec::new(),
            markup: Vec::new(),
        }
    }

    fn push_inline(&mut self, range: &Range<usize>, token: Token) {
        match &mut self.inline {
            Some(run) => {
                run.range.end = run.range.end.max(range.end);
                run.children.push(token);
            }
            None => {
                self.inline = Some(InlineRun {
                    children: vec![token],
                    range: range.clone(),
                });
            }
        }
    }

    fn flush_inline(&mut self) {
        let Some(run) = self.inline.take() else {
            return;
        };
        let map = self.leaf_map.unwrap_or_else(|| self.lines.span(&run.range));
        let content = self.source.get(run.range.clone()).unwrap_or_default();

        let mut token = Token::with_content(TokenKind::Inline, content).with_map(Some(map));
        token.children = Some(run.children);
        self.tokens.push(token);
    }

    fn open_block(&mut self, tag: BlockTag, range: &Range<usize>) -> (usize, usize) {
        self.flush_inline();
        let map = self.lines.span(range);
        self.tokens
            .push(Token::new(TokenKind::BlockOpen(tag)).with_map(Some(map)));
        map
    }

    fn close_block(&mut self, tag: BlockTag) {
        self.flush_inline();
        self.tokens.push(Token::new(TokenKind::BlockClose(tag)));
    }

    fn start(&mut self, tag: Tag<'_>, range: &Range<usize>) {
        match tag {
            Tag::Paragraph => {
                self.leaf_map = Some(self.open_block(BlockTag::Paragraph, range));
            }
            Tag::Heading { level, .. } => {
                self.leaf_map = Some(self.open_block(BlockTag::Heading(heading_level(level)), range));
            }
            Tag::BlockQuote(_) => {
                self.open_block(BlockTag::BlockQuote, range);
            }
            Tag::List(first) => {
                let tag = match first {
                    Some(n) => BlockTag::OrderedList(n),
                    None => BlockTag::BulletList,
                };
                self.lists.push(tag.clone());
                self.open_block(tag, range);
            }
            Tag::Item => {
                self.open_block(BlockTag::ListItem, range);
            }
            Tag::CodeBlock(kind) => {
                self.flush_inline();
                let info = match kind {
                    CodeBlockKind::Fenced(info) => Some(info.trim().to_string()),
                    CodeBlockKind::Indented => None,
                };
                self.code = Some(CodeRun {
                    info,
                    content: String::new(),
                    map: self.lines.span(range),
                });
            }
            Tag::HtmlBlock => {
                self.flush_inline();
                self.html = Some((String::new(), self.lines.span(range)));
            }
            Tag::Emphasis => self.open_markup(InlineTag::Emphasis, range),
            Tag::Strong => self.open_markup(InlineTag::Strong, range),
            Tag::Strikethrough => self.open_markup(InlineTag::Strikethrough, range),
            Tag::Link {
                dest_url, title, ..
            } => self.open_markup(
                InlineTag::Link {
                    href: dest_url.to_string(),
                    title: title.to_string(),
                },
                range,
            ),
            Tag::Image {
                dest_url, title, ..
            } => {
                self.image = Some(ImageRun {
                    src: dest_url.to_string(),
                    title: title.to_string(),
                    alt: String::new(),
                });
            }
            _ => {}
        }
    }

    fn open_markup(&mut self, tag: InlineTag, range: &Range<usize>) {
        self.markup.push(tag.clone());
        self.push_inline(range, Token::new(TokenKind::MarkupOpen(tag)));
    }

    fn close_markup(&mut self, range: &Range<usize>) {
        if let Some(tag) = self.markup.pop() {
            self.push_inline(range, Token::new(TokenKind::MarkupClose(tag)));
        }
    }

    fn end(&mut self, tag: TagEnd, range: &Range<usize>) {
        match tag {
            TagEnd::Paragraph => {
                self.close_block(BlockTag::Paragraph);
                self.leaf_map = None;
            }
            TagEnd::Heading(level) => {
                self.close_block(BlockTag::Heading(heading_level(level)));
                self.leaf_map = None;
            }
            TagEnd::BlockQuote(_) => self.close_block(BlockTag::BlockQuote),
            TagEnd::List(_) => {
                let tag = self.lists.pop().unwrap_or(BlockTag::BulletList);
                self.close_block(tag);
            }
            TagEnd::Item => self.close_block(BlockTag::ListItem),
            TagEnd::CodeBlock => {
                if let Some(run) = self.code.take() {
                    self.tokens.push(
                        Token::with_content(TokenKind::Fence { info: run.info }, run.content)
                            .with_map(Some(run.map)),
                    );
                }
            }
            TagEnd::HtmlBlock => {
                if let Some((content, map)) = self.html.take() {
                    self.tokens
                        .push(Token::with_content(TokenKind::HtmlBlock, content).with_map(Some(map)));
                }
            }
            TagEnd::Emphasis | TagEnd::Strong | TagEnd::Strikethrough | TagEnd::Link => {
                self.close_markup(range)
            }
            TagEnd::Image => {
                if let Some(image) = self.image.take() {
                    let token = Token::with_content(
                        TokenKind::Image {
                            src: image.src,
                            title: image.title,
                        },
                        image.alt,
                    );
                    self.push_inline(range, token);
                }
            }
            _ => {}
        }
    }

    fn event(&mut self, event: Event<'_>, range: Range<usize>) {
        match event {
            Event::Start(tag) => self.start(tag, &range),
            Event::End(tag) => self.end(tag, &range),
            Event::Text(text) => {
                if let Some(code) = &mut self.code {
                    code.content.push_str(&text);
                } else if let Some(image) = &mut self.image {
                    image.alt.push_str(&text);
                } else {
                    self.push_inline(&range, Token::text(text.to_string()));
                }
            }
            Event::Code(code) => {
                if let Some(image) = &mut self.image {
                    image.alt.push_str(&code);
                } else {
                    self.push_inline(&range, Token::with_content(TokenKind::CodeInline, code.to_string()));
                }
            }
            Event::Html(html) => match &mut self.html {
                Some((content, _)) => content.push_str(&html),
                None => {
                    self.flush_inline();
                    let map = self.lines.span(&range);
                    self.tokens
                        .push(Token::with_content(TokenKind::HtmlBlock, html.to_string()).with_map(Some(map)));
                }
            },
            Event::InlineHtml(html) => {
                self.push_inline(&range, Token::with_content(TokenKind::HtmlInline, html.to_string()));
            }
            Event::SoftBreak => self.push_inline(&range, Token::new(TokenKind::SoftBreak)),
            Event::HardBreak => self.push_inline(&range, Token::new(TokenKind::HardBreak)),
            Event::Rule => {
                self.flush_inline();
                let map = self.lines.span(&range);
                self.tokens.push(Token::new(TokenKind::Rule).with_map(Some(map)));
            }
            _ => {}
        }
    }

    fn finish(mut self) -> Vec<Token> {
        self.flush_inline();
        self.tokens
    }
}

/// Parse markdown source into render tokens
pub fn tokenize(source: &str) -> Vec<Token> {
    let mut builder = Builder::new(source);
    for (event, range) in Parser::new_ext(source, Options::ENABLE_STRIKETHROUGH).into_offset_iter() {
        builder.event(event, range);
    }
    builder.finish()
}
