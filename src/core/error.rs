//! Error types for document edits and comment operations

use thiserror::Error;
use uuid::Uuid;

/// Failure reported by the host document model
#[derive(Error, Debug)]
pub enum DocumentError {
    /// The document no longer accepts edits
    #[error("document is closed")]
    Closed,

    /// Edit range does not fall on valid boundaries of the current text
    #[error("edit range {start}..{end} is invalid for document of length {len}")]
    InvalidRange { start: usize, end: usize, len: usize },

    #[error("failed to write document: {0}")]
    Io(#[from] std::io::Error),
}

/// Failure persisting the metadata block
#[derive(Error, Debug)]
pub enum StoreError {
    /// The host refused the edit; nothing was committed
    #[error("write to {document} was rejected: {source}")]
    WriteRejected {
        document: String,
        #[source]
        source: DocumentError,
    },

    #[error("failed to encode comments: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Failure of a user-facing comment operation
#[derive(Error, Debug)]
pub enum CommentError {
    #[error("selection is empty")]
    EmptySelection,

    #[error("comment content is empty")]
    EmptyContent,

    #[error("comment not found: {0}")]
    CommentNotFound(Uuid),

    #[error("reply not found: {0}")]
    ReplyNotFound(Uuid),

    #[error(transparent)]
    Store(#[from] StoreError),
}
