//! SQLite content store
//!
//! Free functions per table live in the submodules; [`SqliteStore`] wires them
//! into the [`ContentStore`] trait the engine consumes.

pub mod comments;
pub mod meta;
pub mod posts;
pub mod schema;
pub mod terms;
pub mod users;

use crate::models::LocalId;
use crate::store::{
    attachment_meta, menu_meta, normalize_new_term, validate_new_post, AttachmentMetadata,
    ContentStore, NewComment, NewMenuItem, NewPost, NewTerm, NewUser, UploadArea, UploadSlot,
};
use async_trait::async_trait;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info};
use wxr_common::{Error, Result};

/// Open (creating if needed) the content database and its tables
pub async fn init_database_pool(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    // mode=rwc: read, write, create
    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    debug!("Connecting to database: {}", db_url);

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect(&db_url)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    configure_connection(&pool).await?;
    schema::init_tables(&pool).await?;

    Ok(pool)
}

/// Private in-memory database (single connection, lives as long as the pool)
pub async fn connect_in_memory() -> Result<SqlitePool> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await?;

    configure_connection(&pool).await?;
    schema::init_tables(&pool).await?;

    Ok(pool)
}

async fn configure_connection(pool: &SqlitePool) -> Result<()> {
    sqlx::query("PRAGMA foreign_keys = ON").execute(pool).await?;
    sqlx::query("PRAGMA busy_timeout = 5000").execute(pool).await?;
    Ok(())
}

/// [`ContentStore`] backed by SQLite
pub struct SqliteStore {
    pool: SqlitePool,
    uploads: UploadArea,
    deferred_counting: AtomicBool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool, uploads: UploadArea) -> Self {
        Self {
            pool,
            uploads,
            deferred_counting: AtomicBool::new(false),
        }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn uploads(&self) -> &UploadArea {
        &self.uploads
    }

    fn counting_deferred(&self) -> bool {
        self.deferred_counting.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ContentStore for SqliteStore {
    async fn post_type_exists(&self, post_type: &str) -> Result<bool> {
        posts::post_type_exists(&self.pool, post_type).await
    }

    async fn find_term(&self, slug: &str, taxonomy: &str) -> Result<Option<LocalId>> {
        terms::find_term_by_slug(&self.pool, slug, taxonomy).await
    }

    async fn find_term_by_name(&self, name: &str, taxonomy: &str) -> Result<Option<LocalId>> {
        terms::find_term_by_name(&self.pool, name, taxonomy).await
    }

    async fn create_term(&self, term: &NewTerm) -> Result<LocalId> {
        let term = normalize_new_term(term)?;
        terms::insert_term(&self.pool, &term).await
    }

    async fn find_post_by_title_and_date(
        &self,
        title: &str,
        date: &str,
    ) -> Result<Option<LocalId>> {
        posts::find_post_by_title_and_date(&self.pool, title, date).await
    }

    async fn create_post(&self, post: &NewPost) -> Result<LocalId> {
        validate_new_post(post)?;
        if !posts::post_type_exists(&self.pool, &post.post_type).await? {
            return Err(Error::InvalidInput(format!(
                "Invalid post type {}",
                post.post_type
            )));
        }
        let mut conn = self.pool.acquire().await?;
        posts::insert_post(&mut conn, post).await
    }

    async fn update_post_parent(&self, post_id: LocalId, parent_id: LocalId) -> Result<()> {
        posts::update_post_parent(&self.pool, post_id, parent_id).await
    }

    async fn stick_post(&self, post_id: LocalId) -> Result<()> {
        posts::mark_sticky(&self.pool, post_id).await
    }

    async fn set_post_terms(
        &self,
        post_id: LocalId,
        taxonomy: &str,
        term_ids: &[LocalId],
    ) -> Result<()> {
        terms::replace_post_terms(&self.pool, post_id, taxonomy, term_ids).await?;
        if !self.counting_deferred() {
            terms::recount_terms(&self.pool, Some(taxonomy)).await?;
        }
        Ok(())
    }

    async fn comment_exists(&self, author: &str, date: &str) -> Result<bool> {
        comments::comment_exists(&self.pool, author, date).await
    }

    async fn insert_comment(&self, comment: &NewComment) -> Result<LocalId> {
        let id = comments::insert_comment(&self.pool, comment).await?;
        if !self.counting_deferred() {
            comments::recount_comments(&self.pool, Some(comment.post_id)).await?;
        }
        Ok(id)
    }

    async fn set_post_meta(&self, post_id: LocalId, key: &str, value: &str) -> Result<()> {
        let mut conn = self.pool.acquire().await?;
        meta::set_meta(&mut conn, post_id, key, value).await
    }

    async fn find_user_by_login(&self, login: &str) -> Result<Option<LocalId>> {
        users::find_user_by_login(&self.pool, login).await
    }

    async fn user_exists(&self, user_id: LocalId) -> Result<bool> {
        users::user_exists(&self.pool, user_id).await
    }

    async fn create_user(&self, user: &NewUser) -> Result<LocalId> {
        users::insert_user(&self.pool, user).await
    }

    async fn reserve_upload(&self, file_name: &str, post_date: &str) -> Result<UploadSlot> {
        self.uploads.reserve(file_name, post_date).await
    }

    async fn create_attachment(&self, post: &NewPost, file: &Path) -> Result<LocalId> {
        validate_new_post(post)?;
        let relative = self.uploads.relative_path(file);

        let mut tx = self.pool.begin().await?;
        let id = posts::insert_post(&mut tx, post).await?;
        meta::set_meta(&mut tx, id, attachment_meta::ATTACHED_FILE, &relative).await?;
        tx.commit().await?;

        Ok(id)
    }

    async fn generate_attachment_metadata(
        &self,
        attachment_id: LocalId,
        file: &Path,
    ) -> Result<AttachmentMetadata> {
        let file_size = tokio::fs::metadata(file).await?.len();
        let mime_type = posts::load_mime_type(&self.pool, attachment_id).await?;

        // No image processing here, so no thumbnail variant is produced
        let metadata = AttachmentMetadata {
            file: self.uploads.relative_path(file),
            file_size,
            mime_type,
            thumbnail_url: None,
        };

        let encoded =
            serde_json::to_string(&metadata).map_err(|e| Error::Internal(e.to_string()))?;
        let mut conn = self.pool.acquire().await?;
        meta::set_meta(&mut conn, attachment_id, attachment_meta::METADATA, &encoded).await?;

        Ok(metadata)
    }

    async fn create_menu_item(&self, menu_id: LocalId, item: &NewMenuItem) -> Result<LocalId> {
        match terms::load_term(&self.pool, menu_id).await? {
            Some(term) if term.taxonomy == "nav_menu" => {}
            _ => return Err(Error::InvalidInput(format!("Invalid menu ID {}", menu_id))),
        }

        let post = NewPost {
            post_type: "nav_menu_item".to_string(),
            title: item.title.clone(),
            content: item.description.clone(),
            excerpt: item.attr_title.clone(),
            status: item.status.clone(),
            menu_order: item.position,
            ..Default::default()
        };

        let mut tx = self.pool.begin().await?;
        let id = posts::insert_post(&mut tx, &post).await?;

        let object_id = item.object_id.unwrap_or(id).to_string();
        let parent = item.parent_id.unwrap_or(0).to_string();
        for (key, value) in [
            (menu_meta::TYPE, item.item_type.as_str()),
            (menu_meta::PARENT, parent.as_str()),
            (menu_meta::OBJECT_ID, object_id.as_str()),
            (menu_meta::OBJECT, item.object.as_str()),
            (menu_meta::TARGET, item.target.as_str()),
            (menu_meta::CLASSES, item.classes.as_str()),
            (menu_meta::XFN, item.xfn.as_str()),
            (menu_meta::URL, item.url.as_str()),
        ] {
            meta::set_meta(&mut tx, id, key, value).await?;
        }

        sqlx::query(
            "INSERT INTO term_relationships (post_id, term_id, taxonomy) VALUES (?, ?, 'nav_menu')",
        )
        .bind(id)
        .bind(menu_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        if !self.counting_deferred() {
            terms::recount_terms(&self.pool, Some("nav_menu")).await?;
        }

        Ok(id)
    }

    async fn set_menu_item_parent(&self, item_id: LocalId, parent_id: LocalId) -> Result<()> {
        if posts::load_post(&self.pool, item_id).await?.is_none() {
            return Err(Error::NotFound(format!("menu item {}", item_id)));
        }
        let mut conn = self.pool.acquire().await?;
        meta::set_meta(&mut conn, item_id, menu_meta::PARENT, &parent_id.to_string()).await
    }

    async fn replace_in_post_content(&self, from: &str, to: &str) -> Result<u64> {
        posts::replace_in_content(&self.pool, from, to).await
    }

    async fn replace_in_post_meta(&self, meta_key: &str, from: &str, to: &str) -> Result<u64> {
        meta::replace_in_meta(&self.pool, meta_key, from, to).await
    }

    async fn set_deferred_counting(&self, defer: bool) -> Result<()> {
        let was_deferred = self.deferred_counting.swap(defer, Ordering::SeqCst);
        if was_deferred && !defer {
            info!("Recomputing term and comment counts");
            terms::recount_terms(&self.pool, None).await?;
            comments::recount_comments(&self.pool, None).await?;
        }
        Ok(())
    }
}
