//! wxr-import library interface
//!
//! Rebuilds the content graph of a site export (posts, terms, comments, menu
//! items, authors, attachments) inside a target content store, resolving the
//! export's foreign identifiers to local ones.

pub mod config;
pub mod db;
pub mod error;
pub mod fetcher;
pub mod import;
pub mod models;
pub mod parser;
pub mod store;

pub use crate::error::{AttachmentError, FetchError};
pub use crate::import::{AuthorDecision, ImportOptions, Importer};
