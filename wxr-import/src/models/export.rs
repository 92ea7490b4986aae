//! Export record set
//!
//! Produced by an [`ExportParser`](crate::parser::ExportParser). Every `*_id`
//! and `parent` field holds a foreign identifier; `0` means "none".

use super::ForeignId;
use serde::{Deserialize, Serialize};

/// Post type of navigation menu entries
pub const NAV_MENU_ITEM: &str = "nav_menu_item";

/// Post type of attachments
pub const ATTACHMENT: &str = "attachment";

/// Complete parsed export
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportRecordSet {
    /// Base URL of the originating site, used to absolutize root-relative URLs
    pub base_url: String,
    pub authors: Vec<ExportAuthor>,
    pub terms: Vec<ExportTerm>,
    pub posts: Vec<ExportPost>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportAuthor {
    pub login: String,
    pub email: String,
    pub display_name: String,
    pub first_name: String,
    pub last_name: String,
}

/// Category, tag or generic taxonomy term
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportTerm {
    pub term_id: ForeignId,
    pub taxonomy: String,
    pub slug: String,
    pub name: String,
    /// Parent term by slug or name (exports name parents rather than number them)
    pub parent: Option<String>,
    pub description: String,
}

/// Term attached to a post, by taxonomy (`domain`) and slug
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TermRef {
    pub domain: String,
    pub slug: String,
    pub name: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportComment {
    pub comment_id: ForeignId,
    pub author: String,
    pub author_email: String,
    pub author_ip: String,
    pub author_url: String,
    pub date: String,
    pub date_gmt: String,
    pub content: String,
    pub approved: String,
    pub comment_type: String,
    pub parent: ForeignId,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PostMeta {
    pub key: String,
    pub value: String,
}

impl PostMeta {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Post of any type (posts, pages, attachments and menu items alike)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportPost {
    pub post_id: ForeignId,
    pub post_type: String,
    pub post_parent: ForeignId,
    /// Author login as written in the export (sanitized before lookup)
    pub post_author: String,
    pub status: String,
    pub post_date: String,
    pub post_date_gmt: String,
    pub post_title: String,
    pub post_content: String,
    pub post_excerpt: String,
    pub post_name: String,
    pub post_password: String,
    pub comment_status: String,
    pub ping_status: String,
    pub guid: String,
    pub menu_order: i64,
    pub is_sticky: bool,
    /// Source of the binary for attachments (falls back to `guid`)
    pub attachment_url: Option<String>,
    pub terms: Vec<TermRef>,
    pub comments: Vec<ExportComment>,
    pub postmeta: Vec<PostMeta>,
}

impl Default for ExportPost {
    fn default() -> Self {
        Self {
            post_id: 0,
            post_type: "post".to_string(),
            post_parent: 0,
            post_author: String::new(),
            status: "publish".to_string(),
            post_date: String::new(),
            post_date_gmt: String::new(),
            post_title: String::new(),
            post_content: String::new(),
            post_excerpt: String::new(),
            post_name: String::new(),
            post_password: String::new(),
            comment_status: "open".to_string(),
            ping_status: "open".to_string(),
            guid: String::new(),
            menu_order: 0,
            is_sticky: false,
            attachment_url: None,
            terms: Vec::new(),
            comments: Vec::new(),
            postmeta: Vec::new(),
        }
    }
}

impl ExportPost {
    /// Label used in diagnostics
    pub fn label(&self) -> String {
        if self.post_title.is_empty() {
            format!("{} {}", self.post_type, self.post_id)
        } else {
            format!("{} {} \"{}\"", self.post_type, self.post_id, self.post_title)
        }
    }

    /// Source URL of an attachment binary
    pub fn attachment_source(&self) -> &str {
        match self.attachment_url.as_deref() {
            Some(url) if !url.trim().is_empty() => url,
            _ => &self.guid,
        }
    }
}
