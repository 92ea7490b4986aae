//! Comment persistence

use crate::models::LocalId;
use crate::store::NewComment;
use sqlx::{Row, SqlitePool};
use wxr_common::Result;

/// Stored comment row (subset used by callers and tests)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommentRow {
    pub id: LocalId,
    pub post_id: LocalId,
    pub author: String,
    pub date: String,
    pub parent_id: Option<LocalId>,
    pub comment_type: String,
}

pub async fn comment_exists(pool: &SqlitePool, author: &str, date: &str) -> Result<bool> {
    let found: Option<LocalId> =
        sqlx::query_scalar("SELECT id FROM comments WHERE author = ? AND date = ? LIMIT 1")
            .bind(author)
            .bind(date)
            .fetch_optional(pool)
            .await?;
    Ok(found.is_some())
}

pub async fn insert_comment(pool: &SqlitePool, comment: &NewComment) -> Result<LocalId> {
    let result = sqlx::query(
        r#"
        INSERT INTO comments (
            post_id, author, author_email, author_ip, author_url, date, date_gmt,
            content, approved, comment_type, parent_id
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(comment.post_id)
    .bind(&comment.author)
    .bind(&comment.author_email)
    .bind(&comment.author_ip)
    .bind(&comment.author_url)
    .bind(&comment.date)
    .bind(&comment.date_gmt)
    .bind(&comment.content)
    .bind(&comment.approved)
    .bind(&comment.comment_type)
    .bind(comment.parent_id)
    .execute(pool)
    .await?;

    Ok(result.last_insert_rowid())
}

pub async fn load_comments_for_post(pool: &SqlitePool, post_id: LocalId) -> Result<Vec<CommentRow>> {
    let rows = sqlx::query(
        r#"
        SELECT id, post_id, author, date, parent_id, comment_type
        FROM comments
        WHERE post_id = ?
        ORDER BY id
        "#,
    )
    .bind(post_id)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|row| CommentRow {
            id: row.get("id"),
            post_id: row.get("post_id"),
            author: row.get("author"),
            date: row.get("date"),
            parent_id: row.get("parent_id"),
            comment_type: row.get("comment_type"),
        })
        .collect())
}

/// Recompute approved-comment counts for one post, or every post with `None`
pub async fn recount_comments(pool: &SqlitePool, post_id: Option<LocalId>) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE posts
        SET comment_count = (
            SELECT COUNT(*) FROM comments c WHERE c.post_id = posts.id AND c.approved = '1'
        )
        WHERE ?1 IS NULL OR id = ?1
        "#,
    )
    .bind(post_id)
    .execute(pool)
    .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::connect_in_memory;

    #[tokio::test]
    async fn test_insert_and_dedupe_check() {
        let pool = connect_in_memory().await.unwrap();
        let post_id = sqlx::query("INSERT INTO posts (post_type, title) VALUES ('post', 'x')")
            .execute(&pool)
            .await
            .unwrap()
            .last_insert_rowid();

        let comment = NewComment {
            post_id,
            author: "Ann".to_string(),
            date: "2012-02-02 12:00:00".to_string(),
            content: "Nice".to_string(),
            approved: "1".to_string(),
            comment_type: "comment".to_string(),
            ..Default::default()
        };
        assert!(!comment_exists(&pool, "Ann", "2012-02-02 12:00:00").await.unwrap());

        let first = insert_comment(&pool, &comment).await.unwrap();
        let reply = insert_comment(
            &pool,
            &NewComment {
                parent_id: Some(first),
                date: "2012-02-03 12:00:00".to_string(),
                ..comment.clone()
            },
        )
        .await
        .unwrap();

        assert!(comment_exists(&pool, "Ann", "2012-02-02 12:00:00").await.unwrap());
        let rows = load_comments_for_post(&pool, post_id).await.unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].id, reply);
        assert_eq!(rows[1].parent_id, Some(first));

        recount_comments(&pool, Some(post_id)).await.unwrap();
        let count: i64 = sqlx::query_scalar("SELECT comment_count FROM posts WHERE id = ?")
            .bind(post_id)
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count, 2);
    }
}
