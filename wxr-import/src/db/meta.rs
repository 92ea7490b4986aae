//! Post metadata

use crate::models::LocalId;
use sqlx::{SqliteConnection, SqlitePool};
use wxr_common::Result;

/// Update the first value stored under `key`, or insert one
pub async fn set_meta(
    conn: &mut SqliteConnection,
    post_id: LocalId,
    key: &str,
    value: &str,
) -> Result<()> {
    let updated = sqlx::query(
        r#"
        UPDATE postmeta SET meta_value = ?
        WHERE id = (SELECT id FROM postmeta WHERE post_id = ? AND meta_key = ? ORDER BY id LIMIT 1)
        "#,
    )
    .bind(value)
    .bind(post_id)
    .bind(key)
    .execute(&mut *conn)
    .await?;

    if updated.rows_affected() == 0 {
        sqlx::query("INSERT INTO postmeta (post_id, meta_key, meta_value) VALUES (?, ?, ?)")
            .bind(post_id)
            .bind(key)
            .bind(value)
            .execute(&mut *conn)
            .await?;
    }

    Ok(())
}

pub async fn get_meta(pool: &SqlitePool, post_id: LocalId, key: &str) -> Result<Option<String>> {
    let value = sqlx::query_scalar(
        "SELECT meta_value FROM postmeta WHERE post_id = ? AND meta_key = ? ORDER BY id LIMIT 1",
    )
    .bind(post_id)
    .bind(key)
    .fetch_optional(pool)
    .await?;
    Ok(value)
}

/// Substring replacement across values stored under `meta_key`
pub async fn replace_in_meta(pool: &SqlitePool, meta_key: &str, from: &str, to: &str) -> Result<u64> {
    if from.is_empty() {
        return Ok(0);
    }
    let result = sqlx::query(
        r#"
        UPDATE postmeta SET meta_value = REPLACE(meta_value, ?1, ?2)
        WHERE meta_key = ?3 AND instr(meta_value, ?1) > 0
        "#,
    )
    .bind(from)
    .bind(to)
    .bind(meta_key)
    .execute(pool)
    .await?;
    Ok(result.rows_affected())
}
