//! Workspace scanning backend
//!
//! Walks the workspace with the ignore crate and reports every markdown
//! document that carries a comment block.

use anyhow::Result;
use ignore::WalkBuilder;
use serde::Serialize;
use std::path::Path;

use crate::core::model::{Meta, Range, ResultItem, ResultSet};
use crate::core::paths::{is_markdown, make_relative};
use crate::core::render::{RenderConfig, Renderer};
use crate::core::util::{get_file_size, hash_bytes};
use crate::store::block::block_span;
use crate::store::codec::decode_payload;

/// Walk options for `scan`
#[derive(Debug, Clone, Copy, Default)]
pub struct ScanOptions<'a> {
    pub scope: Option<&'a Path>,
    pub max_depth: Option<usize>,
    pub hidden: bool,
    pub no_ignore: bool,
}

/// Comment counts of one document
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CommentStats {
    pub comments: usize,
    pub replies: usize,
    pub orphaned: usize,
    pub resolved: usize,
}

impl CommentStats {
    fn summary(&self) -> String {
        format!(
            "{} comments, {} replies, {} orphaned, {} resolved",
            self.comments, self.replies, self.orphaned, self.resolved
        )
    }
}

/// Inspect one document; `None` when it has no comment block
pub fn inspect_document(relative: String, text: &str) -> Option<ResultItem> {
    let span = block_span(text)?;
    let comments = decode_payload(&text[span.payload.clone()]);

    let stats = CommentStats {
        comments: comments.len(),
        replies: comments.iter().map(|c| c.replies.len()).sum(),
        orphaned: comments.iter().filter(|c| c.orphaned).count(),
        resolved: comments.iter().filter(|c| c.resolved).count(),
    };

    let start_line = text[..span.start].matches('\n').count();
    let end_line = text[..span.end].matches('\n').count() + 1;

    Some(
        ResultItem::document(relative)
            .with_range(Range::lines(start_line, end_line))
            .with_excerpt(stats.summary())
            .with_meta(Meta {
                size: Some(text.len() as u64),
                hash: Some(hash_bytes(text[span.range()].as_bytes())),
                truncated: false,
            })
            .with_data(serde_json::to_value(stats).unwrap_or_default()),
    )
}

/// Find documents carrying a comment block
pub fn scan_documents(root: &Path, options: ScanOptions<'_>) -> Result<ResultSet> {
    let scan_path = options.scope.map_or_else(|| root.to_path_buf(), |s| root.join(s));

    let mut builder = WalkBuilder::new(&scan_path);
    builder
        .hidden(!options.hidden)
        .git_ignore(!options.no_ignore)
        .git_global(!options.no_ignore)
        .git_exclude(!options.no_ignore)
        .ignore(!options.no_ignore);

    if let Some(depth) = options.max_depth {
        builder.max_depth(Some(depth));
    }

    let mut result_set = ResultSet::new();

    for entry in builder.build() {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                tracing::debug!(error = %e, "skipping unreadable entry");
                continue;
            }
        };

        let path = entry.path();
        if path.is_dir() || !is_markdown(path) {
            continue;
        }

        let relative = match make_relative(path, root) {
            Some(r) => r,
            None => continue,
        };

        // Non-UTF-8 files cannot hold a block
        let text = match std::fs::read_to_string(path) {
            Ok(t) => t,
            Err(_) => continue,
        };

        if let Some(mut item) = inspect_document(relative, &text) {
            if let Ok(size) = get_file_size(path) {
                item.meta.size = Some(size);
            }
            result_set.push(item);
        }
    }

    result_set.sort();
    tracing::info!(documents = result_set.len(), "scanned workspace");
    Ok(result_set)
}

/// Run the scan command
pub fn run_scan(root: &Path, options: ScanOptions<'_>, config: RenderConfig) -> Result<()> {
    let result_set = scan_documents(root, options)?;

    let renderer = Renderer::with_config(config);
    println!("{}", renderer.render(&result_set));

    Ok(())
}
