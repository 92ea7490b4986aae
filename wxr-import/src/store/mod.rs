//! Target content store
//!
//! The engine talks to the store only through [`ContentStore`]. Two
//! implementations ship with the crate:
//! - [`SqliteStore`](crate::db::SqliteStore): persistent store on SQLite
//! - [`MemoryStore`]: in-process store for dry runs and tests
//!
//! Store-side validation mirrors what a real content platform rejects
//! (empty term names, empty posts, duplicate logins/emails), so those
//! failures surface as per-entity diagnostics in the engine.

pub mod memory;
pub mod uploads;

pub use memory::MemoryStore;
pub use uploads::{UploadArea, UploadSlot};

use crate::models::{ForeignId, LocalId};
use async_trait::async_trait;
use rand::distributions::Alphanumeric;
use rand::Rng;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::Path;
use wxr_common::Result;

/// Post types every store knows about out of the box
pub const BUILTIN_POST_TYPES: &[&str] = &["post", "page", "attachment", "revision", "nav_menu_item"];

/// Metadata key whose values take part in URL remapping
pub const ENCLOSURE_META_KEY: &str = "enclosure";

/// Metadata keys that describe a navigation menu item
pub mod menu_meta {
    pub const TYPE: &str = "_menu_item_type";
    pub const PARENT: &str = "_menu_item_menu_item_parent";
    pub const OBJECT_ID: &str = "_menu_item_object_id";
    pub const OBJECT: &str = "_menu_item_object";
    pub const TARGET: &str = "_menu_item_target";
    pub const CLASSES: &str = "_menu_item_classes";
    pub const XFN: &str = "_menu_item_xfn";
    pub const URL: &str = "_menu_item_url";
}

/// Metadata keys written for attachments
pub mod attachment_meta {
    pub const ATTACHED_FILE: &str = "_wp_attached_file";
    pub const METADATA: &str = "_wp_attachment_metadata";
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewTerm {
    pub taxonomy: String,
    pub name: String,
    /// Derived from `name` when empty
    pub slug: String,
    pub parent_id: Option<LocalId>,
    pub description: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewPost {
    /// Foreign id the post had in the export, kept for provenance
    pub import_id: Option<ForeignId>,
    pub author_id: LocalId,
    pub post_date: String,
    pub post_date_gmt: String,
    pub content: String,
    pub excerpt: String,
    pub title: String,
    pub status: String,
    pub name: String,
    pub comment_status: String,
    pub ping_status: String,
    pub guid: String,
    pub parent_id: Option<LocalId>,
    pub menu_order: i64,
    pub post_type: String,
    pub password: String,
    pub mime_type: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewComment {
    pub post_id: LocalId,
    pub author: String,
    pub author_email: String,
    pub author_ip: String,
    pub author_url: String,
    pub date: String,
    pub date_gmt: String,
    pub content: String,
    pub approved: String,
    pub comment_type: String,
    pub parent_id: Option<LocalId>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewUser {
    pub login: String,
    /// Plain text; stores keep only a salted hash
    pub password: String,
    pub email: String,
    pub display_name: String,
    pub first_name: String,
    pub last_name: String,
}

/// Resolved fields of a navigation menu item
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewMenuItem {
    /// `taxonomy`, `post_type`, `custom`, ...
    pub item_type: String,
    /// Local id of the referenced term or post (none for custom links)
    pub object_id: Option<LocalId>,
    /// Referenced taxonomy or post type name
    pub object: String,
    pub parent_id: Option<LocalId>,
    pub position: i64,
    pub title: String,
    pub url: String,
    pub description: String,
    pub attr_title: String,
    pub target: String,
    pub classes: String,
    pub xfn: String,
    pub status: String,
}

/// Derived metadata produced for a stored attachment
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachmentMetadata {
    /// Path relative to the upload root
    pub file: String,
    pub file_size: u64,
    pub mime_type: String,
    /// Public URL of the thumbnail variant, when the store produced one
    pub thumbnail_url: Option<String>,
}

/// Primitive operations the import engine needs from the target store
///
/// Every create operation is atomic at single-entity granularity: it either
/// returns the new local id or leaves nothing behind.
#[async_trait]
pub trait ContentStore: Send + Sync {
    async fn post_type_exists(&self, post_type: &str) -> Result<bool>;

    /// Term by slug within a taxonomy
    async fn find_term(&self, slug: &str, taxonomy: &str) -> Result<Option<LocalId>>;

    /// First term with this exact name within a taxonomy
    async fn find_term_by_name(&self, name: &str, taxonomy: &str) -> Result<Option<LocalId>>;

    async fn create_term(&self, term: &NewTerm) -> Result<LocalId>;

    async fn find_post_by_title_and_date(&self, title: &str, date: &str)
        -> Result<Option<LocalId>>;

    async fn create_post(&self, post: &NewPost) -> Result<LocalId>;

    async fn update_post_parent(&self, post_id: LocalId, parent_id: LocalId) -> Result<()>;

    async fn stick_post(&self, post_id: LocalId) -> Result<()>;

    /// Replace the post's terms in `taxonomy` with `term_ids`
    async fn set_post_terms(
        &self,
        post_id: LocalId,
        taxonomy: &str,
        term_ids: &[LocalId],
    ) -> Result<()>;

    async fn comment_exists(&self, author: &str, date: &str) -> Result<bool>;

    async fn insert_comment(&self, comment: &NewComment) -> Result<LocalId>;

    /// Insert or update the value stored under `key`
    async fn set_post_meta(&self, post_id: LocalId, key: &str, value: &str) -> Result<()>;

    async fn find_user_by_login(&self, login: &str) -> Result<Option<LocalId>>;

    async fn user_exists(&self, user_id: LocalId) -> Result<bool>;

    async fn create_user(&self, user: &NewUser) -> Result<LocalId>;

    /// Reserve an empty file in the upload area for a fetched binary
    async fn reserve_upload(&self, file_name: &str, post_date: &str) -> Result<UploadSlot>;

    async fn create_attachment(&self, post: &NewPost, file: &Path) -> Result<LocalId>;

    async fn generate_attachment_metadata(
        &self,
        attachment_id: LocalId,
        file: &Path,
    ) -> Result<AttachmentMetadata>;

    async fn create_menu_item(&self, menu_id: LocalId, item: &NewMenuItem) -> Result<LocalId>;

    async fn set_menu_item_parent(&self, item_id: LocalId, parent_id: LocalId) -> Result<()>;

    /// Substring replacement across all post content; returns rows changed
    async fn replace_in_post_content(&self, from: &str, to: &str) -> Result<u64>;

    /// Substring replacement across metadata values stored under `meta_key`
    async fn replace_in_post_meta(&self, meta_key: &str, from: &str, to: &str) -> Result<u64>;

    /// While on, term and comment counts are not maintained; switching it off
    /// recomputes them once
    async fn set_deferred_counting(&self, defer: bool) -> Result<()>;
}

/// URL-safe slug derived from a display name
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut pending_dash = false;
    for ch in name.trim().chars().flat_map(char::to_lowercase) {
        if ch.is_alphanumeric() || ch == '_' {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(ch);
        } else {
            pending_dash = true;
        }
    }
    slug
}

/// Random alphanumeric password for generated accounts
pub fn generate_password(len: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

/// Salted SHA-256 password hash, stored as `salt$hexdigest`
pub fn hash_password(password: &str) -> String {
    let salt = generate_password(16);
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(password.as_bytes());
    format!("{}${:x}", salt, hasher.finalize())
}

/// Reject posts the platform would refuse to store
pub(crate) fn validate_new_post(post: &NewPost) -> Result<()> {
    if post.post_type.trim().is_empty() {
        return Err(wxr_common::Error::InvalidInput(
            "post type is required".to_string(),
        ));
    }
    let is_empty =
        post.title.trim().is_empty() && post.content.trim().is_empty() && post.excerpt.trim().is_empty();
    if is_empty && !matches!(post.post_type.as_str(), "attachment" | "nav_menu_item") {
        return Err(wxr_common::Error::InvalidInput(
            "Content, title, and excerpt are empty".to_string(),
        ));
    }
    Ok(())
}

/// Reject terms the platform would refuse to store; fills in the slug
pub(crate) fn normalize_new_term(term: &NewTerm) -> Result<NewTerm> {
    if term.name.trim().is_empty() {
        return Err(wxr_common::Error::InvalidInput(
            "A name is required for this term".to_string(),
        ));
    }
    let mut normalized = term.clone();
    if normalized.slug.trim().is_empty() {
        normalized.slug = slugify(&term.name);
    }
    Ok(normalized)
}
