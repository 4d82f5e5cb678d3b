//! Comment API - CLI handlers for the comment subcommands

use anyhow::{anyhow, Context, Result};
use std::path::Path;
use uuid::Uuid;

use crate::core::comment::{sort_by_position, Position, Selection};
use crate::core::document::{Document, FileDocument};
use crate::core::model::{ResultItem, ResultSet};
use crate::core::paths::{display_path, resolve};
use crate::core::render::{RenderConfig, Renderer};
use crate::reconcile::{re_anchor_comment, Searchable};
use crate::store::AnchorStore;

/// How the user picks the text a comment attaches to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selector {
    /// First occurrence of the text in the document body
    Match(String),
    /// Explicit positions
    Range { from: Position, to: Position },
}

impl Selector {
    pub fn select(&self, doc: &impl Document) -> Option<Selection> {
        match self {
            Selector::Match(text) => {
                let range = Searchable::new(doc.text()).find(text)?;
                Some(Selection::new(
                    doc.position_at(range.start),
                    doc.position_at(range.end),
                ))
            }
            Selector::Range { from, to } => Some(Selection::new(*from, *to)),
        }
    }
}

/// Filters for `comment list`
#[derive(Debug, Clone, Copy, Default)]
pub struct ListOptions {
    pub sorted: bool,
    pub hide_resolved: bool,
    pub orphaned_only: bool,
}

fn open_document(root: &Path, path: &Path) -> Result<FileDocument> {
    FileDocument::open(&resolve(root, path))
        .with_context(|| format!("Failed to read file: {}", path.display()))
}

fn select(doc: &FileDocument, selector: &Selector) -> Result<Selection> {
    selector.select(doc).ok_or_else(|| match selector {
        Selector::Match(text) => anyhow!("Text not found in document: {:?}", text),
        Selector::Range { .. } => anyhow!("Invalid selection"),
    })
}

fn print(result_set: &ResultSet, config: RenderConfig) {
    let renderer = Renderer::with_config(config);
    println!("{}", renderer.render(result_set));
}

fn print_one(item: ResultItem, config: RenderConfig) {
    print(&ResultSet::from_iter([item]), config);
}

/// List comments of a document
pub fn list_comments(root: &Path, path: &Path, options: ListOptions) -> Result<ResultSet> {
    let doc = open_document(root, path)?;
    let mut comments = AnchorStore::new().get_comments(&doc);

    comments.retain(|c| {
        !(options.hide_resolved && c.resolved) && (!options.orphaned_only || c.orphaned)
    });
    if options.sorted {
        sort_by_position(&mut comments);
    }

    let display = display_path(root, path);
    Ok(comments
        .iter()
        .map(|comment| ResultItem::comment(display.clone(), comment))
        .collect())
}

/// Run comment list command
pub fn run_list(root: &Path, path: &Path, options: ListOptions, config: RenderConfig) -> Result<()> {
    let result_set = list_comments(root, path, options)?;
    print(&result_set, config);
    Ok(())
}

/// Run comment add command
pub fn run_add(
    root: &Path,
    path: &Path,
    selector: &Selector,
    content: &str,
    author: &str,
    config: RenderConfig,
) -> Result<()> {
    let mut doc = open_document(root, path)?;
    let selection = select(&doc, selector)?;

    let comment = AnchorStore::new().add_comment(&mut doc, selection, content, author)?;
    print_one(ResultItem::comment(display_path(root, path), &comment), config);
    Ok(())
}

/// Run comment edit command
pub fn run_edit(root: &Path, path: &Path, id: Uuid, content: &str, config: RenderConfig) -> Result<()> {
    let mut doc = open_document(root, path)?;
    let comment = AnchorStore::new().update_comment(&mut doc, id, content)?;
    print_one(ResultItem::comment(display_path(root, path), &comment), config);
    Ok(())
}

/// Run comment delete command
pub fn run_delete(root: &Path, path: &Path, id: Uuid, config: RenderConfig) -> Result<()> {
    let mut doc = open_document(root, path)?;
    let comment = AnchorStore::new().delete_comment(&mut doc, id)?;
    print_one(ResultItem::comment(display_path(root, path), &comment), config);
    Ok(())
}

/// Run comment resolve / reopen command
pub fn run_resolve(
    root: &Path,
    path: &Path,
    id: Uuid,
    resolved: bool,
    config: RenderConfig,
) -> Result<()> {
    let mut doc = open_document(root, path)?;
    let comment = AnchorStore::new().resolve_comment(&mut doc, id, resolved)?;
    print_one(ResultItem::comment(display_path(root, path), &comment), config);
    Ok(())
}

/// Run comment reanchor command
pub fn run_reanchor(
    root: &Path,
    path: &Path,
    id: Uuid,
    selector: &Selector,
    config: RenderConfig,
) -> Result<()> {
    let mut doc = open_document(root, path)?;
    let selection = select(&doc, selector)?;

    let comment = re_anchor_comment(&AnchorStore::new(), &mut doc, id, selection)?;
    print_one(ResultItem::comment(display_path(root, path), &comment), config);
    Ok(())
}

/// Run comment reply command
pub fn run_reply(
    root: &Path,
    path: &Path,
    id: Uuid,
    content: &str,
    author: &str,
    config: RenderConfig,
) -> Result<()> {
    let mut doc = open_document(root, path)?;
    let reply = AnchorStore::new().add_reply(&mut doc, id, content, author)?;
    print_one(ResultItem::reply(display_path(root, path), id, &reply), config);
    Ok(())
}

/// Run comment edit-reply command
pub fn run_edit_reply(
    root: &Path,
    path: &Path,
    id: Uuid,
    reply_id: Uuid,
    content: &str,
    config: RenderConfig,
) -> Result<()> {
    let mut doc = open_document(root, path)?;
    let reply = AnchorStore::new().update_reply(&mut doc, id, reply_id, content)?;
    print_one(ResultItem::reply(display_path(root, path), id, &reply), config);
    Ok(())
}

/// Run comment delete-reply command
pub fn run_delete_reply(
    root: &Path,
    path: &Path,
    id: Uuid,
    reply_id: Uuid,
    config: RenderConfig,
) -> Result<()> {
    let mut doc = open_document(root, path)?;
    let reply = AnchorStore::new().delete_reply(&mut doc, id, reply_id)?;
    print_one(ResultItem::reply(display_path(root, path), id, &reply), config);
    Ok(())
}
