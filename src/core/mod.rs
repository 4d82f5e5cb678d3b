//! Core module - Contains the fundamental data structures and utilities
//!
//! This module provides:
//! - Comment data model and the document abstraction it anchors into
//! - Unified result model (ResultItem) and its renderers
//! - Error types for document, store and comment operations
//! - Author lookup, path normalization and common utilities

pub mod author;
pub mod comment;
pub mod document;
pub mod error;
pub mod model;
pub mod paths;
pub mod render;
pub mod util;
