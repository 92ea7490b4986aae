//! Export fixtures and a throwaway target site
//!
//! Builders produce export records with sensible defaults; [`TestSite`] wires
//! a [`MemoryStore`] on a temporary upload area to a [`FakeFetcher`].

use super::fake_fetcher::FakeFetcher;
use std::path::PathBuf;
use tempfile::TempDir;
use wxr_import::import::AuthorDirectory;
use wxr_import::models::{
    ExportAuthor, ExportComment, ExportPost, ExportRecordSet, ExportTerm, ImportReport, LocalId,
    PostMeta, TermRef, ATTACHMENT, NAV_MENU_ITEM,
};
use wxr_import::store::{MemoryStore, NewUser, UploadArea};
use wxr_import::store::memory::StoredPost;
use wxr_import::store::ContentStore;
use wxr_import::{AuthorDecision, ImportOptions, Importer};

pub const OLD_SITE: &str = "http://old.example";
pub const UPLOADS_URL: &str = "http://new.example/uploads";
pub const POST_DATE: &str = "2024-01-15 10:00:00";

/// JPEG magic followed by zero padding, `len` bytes total
pub fn jpeg_bytes(len: usize) -> Vec<u8> {
    let mut bytes = vec![0xFF, 0xD8, 0xFF, 0xE0];
    bytes.resize(len.max(4), 0);
    bytes
}

/// PNG signature followed by zero padding, `len` bytes total
pub fn png_bytes(len: usize) -> Vec<u8> {
    let mut bytes = vec![0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];
    bytes.resize(len.max(8), 0);
    bytes
}

pub fn author(login: &str) -> ExportAuthor {
    ExportAuthor {
        login: login.to_string(),
        email: format!("{}@old.example", login),
        display_name: login.to_string(),
        ..Default::default()
    }
}

pub fn term(id: u64, taxonomy: &str, slug: &str, parent: Option<&str>) -> ExportTerm {
    ExportTerm {
        term_id: id,
        taxonomy: taxonomy.to_string(),
        slug: slug.to_string(),
        name: slug.replace('-', " "),
        parent: parent.map(str::to_string),
        ..Default::default()
    }
}

pub fn post(id: u64, title: &str) -> ExportPost {
    ExportPost {
        post_id: id,
        post_title: title.to_string(),
        post_content: format!("Body of {}", title),
        post_author: "alice".to_string(),
        post_date: POST_DATE.to_string(),
        post_date_gmt: POST_DATE.to_string(),
        guid: format!("{}/?p={}", OLD_SITE, id),
        ..Default::default()
    }
}

pub fn page(id: u64, title: &str, parent: u64) -> ExportPost {
    ExportPost {
        post_type: "page".to_string(),
        post_parent: parent,
        ..post(id, title)
    }
}

pub fn attachment(id: u64, title: &str, url: &str) -> ExportPost {
    ExportPost {
        post_type: ATTACHMENT.to_string(),
        post_content: String::new(),
        status: "inherit".to_string(),
        guid: url.to_string(),
        attachment_url: Some(url.to_string()),
        ..post(id, title)
    }
}

pub fn comment(id: u64, parent: u64, author: &str) -> ExportComment {
    ExportComment {
        comment_id: id,
        parent,
        author: author.to_string(),
        author_email: format!("{}@readers.example", author),
        date: format!("2024-01-16 10:{:02}:00", id),
        date_gmt: format!("2024-01-16 10:{:02}:00", id),
        content: format!("Comment {} by {}", id, author),
        approved: "1".to_string(),
        ..Default::default()
    }
}

/// Menu item in menu `menu_slug` linking to `object_id` of `kind`
pub fn menu_item(id: u64, menu_slug: &str, kind: &str, object_id: u64, parent: u64) -> ExportPost {
    ExportPost {
        post_id: id,
        post_type: NAV_MENU_ITEM.to_string(),
        post_title: format!("Item {}", id),
        post_author: "alice".to_string(),
        post_date: POST_DATE.to_string(),
        menu_order: id as i64,
        terms: vec![TermRef {
            domain: "nav_menu".to_string(),
            slug: menu_slug.to_string(),
            name: menu_slug.to_string(),
        }],
        postmeta: vec![
            PostMeta::new("_menu_item_type", kind),
            PostMeta::new("_menu_item_object_id", object_id.to_string()),
            PostMeta::new("_menu_item_object", if kind == "taxonomy" { "category" } else { "page" }),
            PostMeta::new("_menu_item_menu_item_parent", parent.to_string()),
        ],
        ..Default::default()
    }
}

pub fn export(
    authors: Vec<ExportAuthor>,
    terms: Vec<ExportTerm>,
    posts: Vec<ExportPost>,
) -> ExportRecordSet {
    ExportRecordSet {
        base_url: OLD_SITE.to_string(),
        authors,
        terms,
        posts,
    }
}

/// Target site backed by a [`MemoryStore`] in a temporary directory
pub struct TestSite {
    pub dir: TempDir,
    pub store: MemoryStore,
    pub fetcher: FakeFetcher,
    pub admin: LocalId,
}

impl TestSite {
    pub async fn new() -> Self {
        Self::build(false).await
    }

    /// Site whose store produces thumbnail variants for images
    pub async fn with_thumbnails() -> Self {
        Self::build(true).await
    }

    async fn build(thumbnails: bool) -> Self {
        let dir = TempDir::new().unwrap();
        let uploads = UploadArea::new(dir.path().join("uploads"), UPLOADS_URL);
        let store = MemoryStore::new(uploads).with_thumbnails(thumbnails);
        let admin = store
            .create_user(&NewUser {
                login: "admin".to_string(),
                password: "secret".to_string(),
                email: "admin@new.example".to_string(),
                display_name: "Admin".to_string(),
                ..Default::default()
            })
            .await
            .unwrap();

        Self {
            dir,
            store,
            fetcher: FakeFetcher::new(),
            admin,
        }
    }

    pub fn uploads_root(&self) -> PathBuf {
        self.dir.path().join("uploads")
    }

    /// Attachments fetched, users created when needed, counts deferred
    pub fn options(&self) -> ImportOptions {
        ImportOptions {
            fetch_attachments: true,
            allow_create_users: true,
            max_attachment_size: 0,
            defer_counting: true,
            importing_user: self.admin,
        }
    }

    /// Import with default options and default author decisions
    pub async fn import(&self, export: &ExportRecordSet) -> ImportReport {
        self.import_with(export, self.options()).await
    }

    pub async fn import_with(&self, export: &ExportRecordSet, options: ImportOptions) -> ImportReport {
        let decisions = AuthorDirectory::from_export(export).default_decisions();
        self.import_with_decisions(export, options, &decisions).await
    }

    pub async fn import_with_decisions(
        &self,
        export: &ExportRecordSet,
        options: ImportOptions,
        decisions: &[AuthorDecision],
    ) -> ImportReport {
        Importer::new(&self.store, &self.fetcher, options)
            .import(export, decisions)
            .await
            .unwrap()
    }

    /// Stored post with the given title (panics when absent or ambiguous)
    pub fn post_titled(&self, title: &str) -> StoredPost {
        let matches: Vec<StoredPost> = self
            .store
            .posts()
            .unwrap()
            .into_iter()
            .filter(|p| p.post.title == title)
            .collect();
        assert_eq!(matches.len(), 1, "expected exactly one post titled {:?}", title);
        matches.into_iter().next().unwrap()
    }

    /// Every file currently in the upload area
    pub fn uploaded_files(&self) -> Vec<PathBuf> {
        fn walk(dir: &std::path::Path, out: &mut Vec<PathBuf>) {
            let Ok(entries) = std::fs::read_dir(dir) else {
                return;
            };
            for entry in entries.flatten() {
                let path = entry.path();
                if path.is_dir() {
                    walk(&path, out);
                } else {
                    out.push(path);
                }
            }
        }
        let mut files = Vec::new();
        walk(&self.uploads_root(), &mut files);
        files.sort();
        files
    }
}
