//! CLI module - Command-line interface definitions and handlers

use anyhow::{bail, Result};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use uuid::Uuid;

use crate::backends::scan::ScanOptions;
use crate::core::author::resolve_author;
use crate::core::comment::Position;
use crate::core::render::{OutputFormat, RenderConfig};
use crate::preview::project::{ProjectorConfig, DEFAULT_HIGHLIGHT_CLASS};
use crate::store::api::{ListOptions, Selector};

/// marginalia - comments anchored inside markdown documents.
#[derive(Parser, Debug)]
#[command(name = "marginalia")]
#[command(
    author,
    version,
    about,
    long_about = r#"marginalia stores review comments inside the markdown document they
refer to, in a hidden HTML comment block at the end of the file. Each comment
is anchored to the text it was written about, and anchors follow that text as
the document is edited.

Each command prints a ResultSet in the selected format (default: jsonl).

Output formats:
- jsonl: one JSON object per line (best for piping into tools)
- json: a single JSON array
- md: human-friendly Markdown
- raw: excerpts only (unstable; intended for debugging)

Examples:
    marginalia comment add README.md --match "install step" -m "Needs a version"
    marginalia comment list README.md --sorted --format md
    marginalia reconcile README.md
    marginalia preview README.md --output preview.html
    marginalia scan
"#
)]
pub struct Cli {
    /// Root directory for all operations.
    #[arg(
        long,
        global = true,
        default_value = ".",
        env = "MARGINALIA_ROOT",
        value_name = "ROOT",
        long_help = "Root directory for all operations (defaults to the current directory).\n\n\
Document paths are interpreted relative to this root, and paths emitted in\n\
results are relative to it."
    )]
    pub root: PathBuf,

    /// Output format (jsonl/json/md/raw).
    #[arg(
        long,
        global = true,
        default_value = "jsonl",
        env = "MARGINALIA_FORMAT",
        value_name = "FORMAT",
        long_help = "Select the output format for ResultSet.\n\n\
Supported values:\n\
- jsonl (default)\n\
- json\n\
- md (markdown)\n\
- raw"
    )]
    pub format: String,

    /// Pretty-print JSON/JSONL output with indentation.
    #[arg(
        long,
        global = true,
        long_help = "Pretty-print JSON and JSONL output with indentation for human readability.\n\n\
Has no effect on md/raw formats."
    )]
    pub pretty: bool,

    /// Author name for new comments and replies.
    #[arg(
        long,
        global = true,
        env = "MARGINALIA_AUTHOR",
        value_name = "NAME",
        long_help = "Author name recorded on new comments and replies.\n\n\
If omitted, `git config user.name` is used, falling back to \"Anonymous\"."
    )]
    pub author: Option<String>,

    /// Quiet mode (errors only on stderr).
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Verbose mode (more diagnostics).
    #[arg(
        short,
        long,
        global = true,
        long_help = "Log progress at info level on stderr.\n\n\
For finer control set MARGINALIA_LOG (e.g. MARGINALIA_LOG=marginalia=debug)."
    )]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Manage comments in a document.
    #[command(
        long_about = "Add, edit, resolve and delete comments and replies.\n\n\
Every change rewrites the comment block of the document in place."
    )]
    Comment {
        #[command(subcommand)]
        action: CommentCommands,
    },

    /// Re-locate every anchor after the document was edited.
    #[command(
        long_about = "Search each comment's anchor text in the current document body.\n\n\
Anchors that moved get new positions; anchors whose text is gone are marked\n\
orphaned. The block is only rewritten when something changed.\n\n\
Example:\n\
  marginalia reconcile docs/guide.md\n"
    )]
    Reconcile {
        /// Document path (relative to ROOT unless absolute).
        #[arg(value_name = "FILE")]
        path: PathBuf,
    },

    /// Render a document to HTML with comments highlighted.
    #[command(
        long_about = "Render the markdown document to HTML and wrap every anchored span in a\n\
<mark> element carrying the comment id. Orphaned comments are never highlighted.\n\n\
Examples:\n\
  marginalia preview README.md > preview.html\n\
  marginalia preview README.md --output preview.html --hide-resolved\n"
    )]
    Preview {
        /// Document path (relative to ROOT unless absolute).
        #[arg(value_name = "FILE")]
        path: PathBuf,

        /// Write HTML to this file instead of stdout.
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,

        /// CSS class for highlight elements.
        #[arg(long, default_value = DEFAULT_HIGHLIGHT_CLASS, value_name = "CLASS")]
        highlight_class: String,

        /// Do not highlight resolved comments.
        #[arg(long)]
        hide_resolved: bool,
    },

    /// List markdown documents that carry comments.
    #[command(
        long_about = "Walk ROOT (or --scope), respecting ignore files, and emit one result per\n\
markdown document with a comment block, with comment/reply/orphan/resolved counts\n\
and a hash of the block.\n\n\
Examples:\n\
  marginalia scan\n\
  marginalia scan --scope docs --max-depth 2\n"
    )]
    Scan {
        /// Limit scanning to a subdirectory under ROOT.
        #[arg(long, value_name = "PATH")]
        scope: Option<PathBuf>,

        /// Maximum directory depth from the scan start.
        #[arg(long, value_name = "N")]
        max_depth: Option<usize>,

        /// Include hidden files/directories (dotfiles).
        #[arg(long)]
        hidden: bool,

        /// Disable .gitignore and other ignore rules.
        #[arg(long)]
        no_ignore: bool,
    },
}

/// Text selection for add / reanchor: `--match TEXT` or `--from L:C --to L:C`
#[derive(Args, Debug, Clone)]
pub struct SelectorArgs {
    /// Anchor on the first occurrence of TEXT in the document body.
    #[arg(long = "match", value_name = "TEXT", conflicts_with_all = ["from", "to"])]
    pub text: Option<String>,

    /// Selection start as LINE:CHAR (zero-based).
    #[arg(long, value_name = "LINE:CHAR", requires = "to")]
    pub from: Option<Position>,

    /// Selection end as LINE:CHAR (zero-based, exclusive).
    #[arg(long, value_name = "LINE:CHAR", requires = "from")]
    pub to: Option<Position>,
}

impl SelectorArgs {
    fn into_selector(self) -> Result<Selector> {
        match (self.text, self.from, self.to) {
            (Some(text), _, _) => Ok(Selector::Match(text)),
            (None, Some(from), Some(to)) => Ok(Selector::Range { from, to }),
            _ => bail!("Select text with --match TEXT or --from LINE:CHAR --to LINE:CHAR"),
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum CommentCommands {
    /// List comments of a document.
    List {
        #[arg(value_name = "FILE")]
        path: PathBuf,

        /// Order by anchor position instead of insertion order.
        #[arg(long)]
        sorted: bool,

        /// Leave out resolved comments.
        #[arg(long)]
        hide_resolved: bool,

        /// Only show orphaned comments.
        #[arg(long)]
        orphaned: bool,
    },

    /// Add a comment on a span of text.
    Add {
        #[arg(value_name = "FILE")]
        path: PathBuf,

        #[command(flatten)]
        selector: SelectorArgs,

        /// Comment text.
        #[arg(short, long, value_name = "TEXT")]
        message: String,
    },

    /// Replace a comment's text.
    Edit {
        #[arg(value_name = "FILE")]
        path: PathBuf,

        #[arg(value_name = "ID")]
        id: Uuid,

        #[arg(short, long, value_name = "TEXT")]
        message: String,
    },

    /// Delete a comment and all of its replies.
    Delete {
        #[arg(value_name = "FILE")]
        path: PathBuf,

        #[arg(value_name = "ID")]
        id: Uuid,
    },

    /// Mark a comment resolved.
    Resolve {
        #[arg(value_name = "FILE")]
        path: PathBuf,

        #[arg(value_name = "ID")]
        id: Uuid,
    },

    /// Mark a resolved comment open again.
    Reopen {
        #[arg(value_name = "FILE")]
        path: PathBuf,

        #[arg(value_name = "ID")]
        id: Uuid,
    },

    /// Move a comment's anchor to a new selection.
    Reanchor {
        #[arg(value_name = "FILE")]
        path: PathBuf,

        #[arg(value_name = "ID")]
        id: Uuid,

        #[command(flatten)]
        selector: SelectorArgs,
    },

    /// Reply to a comment.
    Reply {
        #[arg(value_name = "FILE")]
        path: PathBuf,

        #[arg(value_name = "ID")]
        id: Uuid,

        #[arg(short, long, value_name = "TEXT")]
        message: String,
    },

    /// Replace a reply's text.
    EditReply {
        #[arg(value_name = "FILE")]
        path: PathBuf,

        #[arg(value_name = "ID")]
        id: Uuid,

        #[arg(value_name = "REPLY_ID")]
        reply_id: Uuid,

        #[arg(short, long, value_name = "TEXT")]
        message: String,
    },

    /// Delete a reply.
    DeleteReply {
        #[arg(value_name = "FILE")]
        path: PathBuf,

        #[arg(value_name = "ID")]
        id: Uuid,

        #[arg(value_name = "REPLY_ID")]
        reply_id: Uuid,
    },
}

/// Run the CLI with parsed arguments
pub fn run(cli: Cli) -> Result<()> {
    let format: OutputFormat = cli.format.parse().unwrap_or_default();
    let render_config = RenderConfig::with_pretty(format, cli.pretty);

    // Get absolute root path
    let root = cli.root.canonicalize().unwrap_or(cli.root);
    let author = cli.author;

    match cli.command {
        Commands::Comment { action } => run_comment(&root, author.as_deref(), action, render_config),

        Commands::Reconcile { path } => crate::reconcile::run_reconcile(&root, &path, render_config),

        Commands::Preview {
            path,
            output,
            highlight_class,
            hide_resolved,
        } => {
            let projector_config = ProjectorConfig {
                highlight_class,
                include_resolved: !hide_resolved,
            };
            crate::preview::run_preview(
                &root,
                &path,
                output.as_deref(),
                &projector_config,
                render_config,
            )
        }

        Commands::Scan {
            scope,
            max_depth,
            hidden,
            no_ignore,
        } => crate::backends::scan::run_scan(
            &root,
            ScanOptions {
                scope: scope.as_deref(),
                max_depth,
                hidden,
                no_ignore,
            },
            render_config,
        ),
    }
}

fn run_comment(
    root: &std::path::Path,
    author: Option<&str>,
    action: CommentCommands,
    render_config: RenderConfig,
) -> Result<()> {
    use crate::store::api;

    match action {
        CommentCommands::List {
            path,
            sorted,
            hide_resolved,
            orphaned,
        } => api::run_list(
            root,
            &path,
            ListOptions {
                sorted,
                hide_resolved,
                orphaned_only: orphaned,
            },
            render_config,
        ),

        CommentCommands::Add {
            path,
            selector,
            message,
        } => {
            let selector = selector.into_selector()?;
            let author = resolve_author(author, root);
            api::run_add(root, &path, &selector, &message, &author, render_config)
        }

        CommentCommands::Edit { path, id, message } => {
            api::run_edit(root, &path, id, &message, render_config)
        }

        CommentCommands::Delete { path, id } => api::run_delete(root, &path, id, render_config),

        CommentCommands::Resolve { path, id } => {
            api::run_resolve(root, &path, id, true, render_config)
        }

        CommentCommands::Reopen { path, id } => {
            api::run_resolve(root, &path, id, false, render_config)
        }

        CommentCommands::Reanchor { path, id, selector } => {
            let selector = selector.into_selector()?;
            api::run_reanchor(root, &path, id, &selector, render_config)
        }

        CommentCommands::Reply { path, id, message } => {
            let author = resolve_author(author, root);
            api::run_reply(root, &path, id, &message, &author, render_config)
        }

        CommentCommands::EditReply {
            path,
            id,
            reply_id,
            message,
        } => api::run_edit_reply(root, &path, id, reply_id, &message, render_config),

        CommentCommands::DeleteReply { path, id, reply_id } => {
            api::run_delete_reply(root, &path, id, reply_id, render_config)
        }
    }
}
