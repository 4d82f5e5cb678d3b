//! Backends module - Workspace-level operations
//!
//! Provides:
//! - scan: finding markdown documents that carry comments

pub mod scan;
