//! Post persistence (posts, pages, attachments and menu items share one table)

use crate::models::LocalId;
use crate::store::NewPost;
use sqlx::{Row, SqliteConnection, SqlitePool};
use wxr_common::{Error, Result};

/// Stored post row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostRow {
    pub id: LocalId,
    pub post_type: String,
    pub title: String,
    pub content: String,
    pub post_date: String,
    pub author_id: LocalId,
    pub parent_id: Option<LocalId>,
    pub guid: String,
    pub status: String,
    pub sticky: bool,
    pub comment_count: i64,
}

pub async fn post_type_exists(pool: &SqlitePool, post_type: &str) -> Result<bool> {
    let found: Option<String> = sqlx::query_scalar("SELECT name FROM post_types WHERE name = ?")
        .bind(post_type)
        .fetch_optional(pool)
        .await?;
    Ok(found.is_some())
}

pub async fn register_post_type(pool: &SqlitePool, post_type: &str) -> Result<()> {
    sqlx::query("INSERT OR IGNORE INTO post_types (name) VALUES (?)")
        .bind(post_type)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn find_post_by_title_and_date(
    pool: &SqlitePool,
    title: &str,
    date: &str,
) -> Result<Option<LocalId>> {
    let id = sqlx::query_scalar(
        "SELECT id FROM posts WHERE title = ? AND post_date = ? ORDER BY id LIMIT 1",
    )
    .bind(title)
    .bind(date)
    .fetch_optional(pool)
    .await?;
    Ok(id)
}

/// Insert a post row; runs on a bare connection so callers can wrap it in a
/// transaction with its metadata
pub async fn insert_post(conn: &mut SqliteConnection, post: &NewPost) -> Result<LocalId> {
    let result = sqlx::query(
        r#"
        INSERT INTO posts (
            import_id, author_id, post_date, post_date_gmt, content, excerpt, title,
            status, name, comment_status, ping_status, guid, parent_id, menu_order,
            post_type, password, mime_type
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(post.import_id.map(|id| id as i64))
    .bind(post.author_id)
    .bind(&post.post_date)
    .bind(&post.post_date_gmt)
    .bind(&post.content)
    .bind(&post.excerpt)
    .bind(&post.title)
    .bind(&post.status)
    .bind(&post.name)
    .bind(&post.comment_status)
    .bind(&post.ping_status)
    .bind(&post.guid)
    .bind(post.parent_id)
    .bind(post.menu_order)
    .bind(&post.post_type)
    .bind(&post.password)
    .bind(&post.mime_type)
    .execute(&mut *conn)
    .await?;

    Ok(result.last_insert_rowid())
}

pub async fn update_post_parent(
    pool: &SqlitePool,
    post_id: LocalId,
    parent_id: LocalId,
) -> Result<()> {
    let result = sqlx::query("UPDATE posts SET parent_id = ? WHERE id = ?")
        .bind(parent_id)
        .bind(post_id)
        .execute(pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(Error::NotFound(format!("post {}", post_id)));
    }
    Ok(())
}

pub async fn mark_sticky(pool: &SqlitePool, post_id: LocalId) -> Result<()> {
    let result = sqlx::query("UPDATE posts SET sticky = 1 WHERE id = ?")
        .bind(post_id)
        .execute(pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(Error::NotFound(format!("post {}", post_id)));
    }
    Ok(())
}

pub async fn load_post(pool: &SqlitePool, post_id: LocalId) -> Result<Option<PostRow>> {
    let row = sqlx::query(
        r#"
        SELECT id, post_type, title, content, post_date, author_id, parent_id, guid,
               status, sticky, comment_count
        FROM posts
        WHERE id = ?
        "#,
    )
    .bind(post_id)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(|row| {
        let sticky: i64 = row.get("sticky");
        PostRow {
            id: row.get("id"),
            post_type: row.get("post_type"),
            title: row.get("title"),
            content: row.get("content"),
            post_date: row.get("post_date"),
            author_id: row.get("author_id"),
            parent_id: row.get("parent_id"),
            guid: row.get("guid"),
            status: row.get("status"),
            sticky: sticky != 0,
            comment_count: row.get("comment_count"),
        }
    }))
}

pub async fn count_posts(pool: &SqlitePool, post_type: &str) -> Result<i64> {
    let count = sqlx::query_scalar("SELECT COUNT(*) FROM posts WHERE post_type = ?")
        .bind(post_type)
        .fetch_one(pool)
        .await?;
    Ok(count)
}

pub async fn load_mime_type(pool: &SqlitePool, post_id: LocalId) -> Result<String> {
    let mime: Option<Option<String>> =
        sqlx::query_scalar("SELECT mime_type FROM posts WHERE id = ?")
            .bind(post_id)
            .fetch_optional(pool)
            .await?;
    match mime {
        Some(mime) => Ok(mime.unwrap_or_default()),
        None => Err(Error::NotFound(format!("post {}", post_id))),
    }
}

/// Substring replacement across all post bodies; returns rows changed
pub async fn replace_in_content(pool: &SqlitePool, from: &str, to: &str) -> Result<u64> {
    if from.is_empty() {
        return Ok(0);
    }
    let result = sqlx::query(
        "UPDATE posts SET content = REPLACE(content, ?1, ?2) WHERE instr(content, ?1) > 0",
    )
    .bind(from)
    .bind(to)
    .execute(pool)
    .await?;
    Ok(result.rows_affected())
}
