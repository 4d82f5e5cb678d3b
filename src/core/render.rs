//! Renderer module
//!
//! Renders ResultSet to different output formats: jsonl, json, md, raw

use crate::core::model::{Kind, Range, ResultItem, ResultSet};

/// Output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Jsonl,
    Json,
    Markdown,
    Raw,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "jsonl" => Ok(OutputFormat::Jsonl),
            "json" => Ok(OutputFormat::Json),
            "md" | "markdown" => Ok(OutputFormat::Markdown),
            "raw" => Ok(OutputFormat::Raw),
            _ => Err(format!("Unknown format: {}", s)),
        }
    }
}

/// Render configuration combining format and options
#[derive(Debug, Clone, Copy, Default)]
pub struct RenderConfig {
    pub format: OutputFormat,
    pub pretty: bool,
}

impl RenderConfig {
    pub fn new(format: OutputFormat) -> Self {
        Self {
            format,
            pretty: false,
        }
    }

    pub fn with_pretty(format: OutputFormat, pretty: bool) -> Self {
        Self { format, pretty }
    }
}

/// Renderer for result sets
pub struct Renderer {
    config: RenderConfig,
}

impl Renderer {
    pub fn new(format: OutputFormat) -> Self {
        Self {
            config: RenderConfig::new(format),
        }
    }

    pub fn with_config(config: RenderConfig) -> Self {
        Self { config }
    }

    /// Render a result set to a string
    pub fn render(&self, result_set: &ResultSet) -> String {
        match self.config.format {
            OutputFormat::Jsonl => self.render_jsonl(result_set),
            OutputFormat::Json => self.render_json(result_set),
            OutputFormat::Markdown => self.render_markdown(result_set),
            OutputFormat::Raw => self.render_raw(result_set),
        }
    }

    /// Render as JSON Lines (one JSON object per line)
    fn render_jsonl(&self, result_set: &ResultSet) -> String {
        result_set
            .items
            .iter()
            .filter_map(|item| {
                if self.config.pretty {
                    serde_json::to_string_pretty(item).ok()
                } else {
                    serde_json::to_string(item).ok()
                }
            })
            .collect::<Vec<_>>()
            .join(if self.config.pretty { "\n\n" } else { "\n" })
    }

    /// Render as a single JSON array
    fn render_json(&self, result_set: &ResultSet) -> String {
        if self.config.pretty {
            serde_json::to_string_pretty(&result_set.items).unwrap_or_else(|_| "[]".to_string())
        } else {
            serde_json::to_string(&result_set.items).unwrap_or_else(|_| "[]".to_string())
        }
    }

    /// Render as Markdown
    fn render_markdown(&self, result_set: &ResultSet) -> String {
        let mut output = String::new();

        // Group by kind
        let mut documents = Vec::new();
        let mut comments = Vec::new();
        let mut replies = Vec::new();
        let mut previews = Vec::new();
        let mut errors = Vec::new();

        for item in &result_set.items {
            match item.kind {
                Kind::Document => documents.push(item),
                Kind::Comment => comments.push(item),
                Kind::Reply => replies.push(item),
                Kind::Preview => previews.push(item),
                Kind::Error => errors.push(item),
            }
        }

        if !errors.is_empty() {
            output.push_str("## Errors\n\n");
            for item in errors {
                for error in &item.errors {
                    output.push_str(&format!("- **{}**: {}\n", error.code, error.message));
                }
            }
            output.push('\n');
        }

        if !documents.is_empty() {
            output.push_str("## Documents\n\n");
            for item in documents {
                if let Some(path) = &item.path {
                    output.push_str(&format!("- `{}`", path));
                    if let Some(excerpt) = &item.excerpt {
                        output.push_str(&format!(": {}", excerpt));
                    }
                    output.push('\n');
                }
            }
            output.push('\n');
        }

        if !comments.is_empty() {
            output.push_str("## Comments\n\n");
            for item in comments {
                self.render_item_md(&mut output, item);
            }
        }

        if !replies.is_empty() {
            output.push_str("## Replies\n\n");
            for item in replies {
                self.render_item_md(&mut output, item);
            }
        }

        if !previews.is_empty() {
            output.push_str("## Previews\n\n");
            for item in previews {
                self.render_item_md(&mut output, item);
            }
        }

        output
    }

    fn render_item_md(&self, output: &mut String, item: &ResultItem) {
        if let Some(path) = &item.path {
            output.push_str(&format!("### `{}`", path));
            match &item.range {
                Some(Range::Char(r)) => output.push_str(&format!(
                    " ({}:{}-{}:{})",
                    r.start.line, r.start.character, r.end.line, r.end.character
                )),
                Some(Range::Line(r)) => {
                    output.push_str(&format!(" (lines {}-{})", r.start, r.end))
                }
                None => {}
            }
            output.push('\n');
        }

        if let Some(id) = &item.id {
            output.push_str(&format!("\nid: `{}`\n", id));
        }

        if let Some(data) = &item.data {
            let author = data.get("author").and_then(|a| a.as_str());
            let anchor = data
                .get("anchor")
                .and_then(|a| a.get("text"))
                .and_then(|t| t.as_str());
            if let Some(anchor) = anchor {
                for line in anchor.lines() {
                    output.push_str(&format!("\n> {}", line));
                }
                output.push('\n');
            }
            if let Some(author) = author {
                output.push_str(&format!("\n**{}**", author));
                if data.get("orphaned").and_then(|o| o.as_bool()) == Some(true) {
                    output.push_str(" (orphaned)");
                }
                if data.get("resolved").and_then(|r| r.as_bool()) == Some(true) {
                    output.push_str(" (resolved)");
                }
                output.push('\n');
            }
        }

        if let Some(excerpt) = &item.excerpt {
            output.push('\n');
            output.push_str(excerpt);
            if !excerpt.ends_with('\n') {
                output.push('\n');
            }
        }

        if item.meta.truncated {
            output.push_str("\n> ⚠️ Content was truncated\n");
        }

        output.push('\n');
    }

    /// Render as raw output (excerpts only)
    fn render_raw(&self, result_set: &ResultSet) -> String {
        result_set
            .items
            .iter()
            .filter_map(|item| item.excerpt.clone())
            .collect::<Vec<_>>()
            .join("\n---\n")
    }
}
