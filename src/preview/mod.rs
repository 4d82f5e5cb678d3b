//! Preview rendering with comment highlights
//!
//! Provides:
//! - token: the render token model
//! - parse: markdown to tokens
//! - normalize: stripping markdown syntax from anchor text
//! - project: wrapping anchored text in highlight tokens
//! - html: tokens to HTML
//!
//! The projector only reads comments; it never writes to the document.

pub mod html;
pub mod normalize;
pub mod parse;
pub mod project;
pub mod token;

use anyhow::{Context, Result};
use std::path::Path;

use crate::core::model::{Meta, ResultItem, ResultSet};
use crate::core::paths::{display_path, resolve};
use crate::core::render::{RenderConfig, Renderer};
use crate::core::util::hash_bytes;
use crate::preview::project::{Projector, ProjectorConfig};
use crate::store::codec::decode_document;

/// Render a markdown document to HTML with its comments highlighted
pub fn render_preview(source: &str, config: &ProjectorConfig) -> String {
    let comments = decode_document(source);
    let mut tokens = parse::tokenize(source);

    let projector = Projector::new(config.clone());
    projector.project(&mut tokens, source, &comments);

    html::render_html(&tokens, &projector.config().highlight_class)
}

/// Run the preview command
///
/// Without `output` the HTML goes straight to stdout; with it, the file is
/// written and a result item describing it is printed.
pub fn run_preview(
    root: &Path,
    path: &Path,
    output: Option<&Path>,
    projector_config: &ProjectorConfig,
    render_config: RenderConfig,
) -> Result<()> {
    let full_path = resolve(root, path);
    let source = std::fs::read_to_string(&full_path)
        .with_context(|| format!("Failed to read file: {}", path.display()))?;

    let html = render_preview(&source, projector_config);

    let Some(output) = output else {
        print!("{}", html);
        return Ok(());
    };

    std::fs::write(output, &html)
        .with_context(|| format!("Failed to write preview: {}", output.display()))?;
    tracing::info!(output = %output.display(), bytes = html.len(), "wrote preview");

    let mut result_set = ResultSet::new();
    result_set.push(
        ResultItem::preview(display_path(root, path))
            .with_excerpt(format!("written to {}", output.display()))
            .with_meta(Meta {
                size: Some(html.len() as u64),
                hash: Some(hash_bytes(html.as_bytes())),
                truncated: false,
            })
            .with_data(serde_json::json!({ "output": output.to_string_lossy() })),
    );

    let renderer = Renderer::with_config(render_config);
    println!("{}", renderer.render(&result_set));

    Ok(())
}
