//! Term and term-relationship persistence

use crate::models::LocalId;
use crate::store::NewTerm;
use sqlx::{Row, SqlitePool};
use wxr_common::{Error, Result};

/// Stored term row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TermRow {
    pub id: LocalId,
    pub taxonomy: String,
    pub name: String,
    pub slug: String,
    pub parent_id: Option<LocalId>,
    pub count: i64,
}

pub async fn find_term_by_slug(
    pool: &SqlitePool,
    slug: &str,
    taxonomy: &str,
) -> Result<Option<LocalId>> {
    let id = sqlx::query_scalar("SELECT id FROM terms WHERE slug = ? AND taxonomy = ?")
        .bind(slug)
        .bind(taxonomy)
        .fetch_optional(pool)
        .await?;
    Ok(id)
}

pub async fn find_term_by_name(
    pool: &SqlitePool,
    name: &str,
    taxonomy: &str,
) -> Result<Option<LocalId>> {
    let id = sqlx::query_scalar(
        "SELECT id FROM terms WHERE name = ? AND taxonomy = ? ORDER BY id LIMIT 1",
    )
    .bind(name)
    .bind(taxonomy)
    .fetch_optional(pool)
    .await?;
    Ok(id)
}

/// Insert a normalized term; a taxonomy+slug collision is rejected
pub async fn insert_term(pool: &SqlitePool, term: &NewTerm) -> Result<LocalId> {
    if find_term_by_slug(pool, &term.slug, &term.taxonomy)
        .await?
        .is_some()
    {
        return Err(Error::InvalidInput(format!(
            "A term with the slug {} already exists in {}",
            term.slug, term.taxonomy
        )));
    }

    let result = sqlx::query(
        r#"
        INSERT INTO terms (taxonomy, name, slug, parent_id, description)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(&term.taxonomy)
    .bind(&term.name)
    .bind(&term.slug)
    .bind(term.parent_id)
    .bind(&term.description)
    .execute(pool)
    .await?;

    Ok(result.last_insert_rowid())
}

pub async fn load_term(pool: &SqlitePool, term_id: LocalId) -> Result<Option<TermRow>> {
    let row = sqlx::query(
        "SELECT id, taxonomy, name, slug, parent_id, count FROM terms WHERE id = ?",
    )
    .bind(term_id)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(|row| TermRow {
        id: row.get("id"),
        taxonomy: row.get("taxonomy"),
        name: row.get("name"),
        slug: row.get("slug"),
        parent_id: row.get("parent_id"),
        count: row.get("count"),
    }))
}

/// Replace a post's terms within one taxonomy
pub async fn replace_post_terms(
    pool: &SqlitePool,
    post_id: LocalId,
    taxonomy: &str,
    term_ids: &[LocalId],
) -> Result<()> {
    let mut tx = pool.begin().await?;

    sqlx::query("DELETE FROM term_relationships WHERE post_id = ? AND taxonomy = ?")
        .bind(post_id)
        .bind(taxonomy)
        .execute(&mut *tx)
        .await?;

    for term_id in term_ids {
        sqlx::query(
            "INSERT OR IGNORE INTO term_relationships (post_id, term_id, taxonomy) VALUES (?, ?, ?)",
        )
        .bind(post_id)
        .bind(term_id)
        .bind(taxonomy)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;
    Ok(())
}

pub async fn load_post_terms(
    pool: &SqlitePool,
    post_id: LocalId,
    taxonomy: &str,
) -> Result<Vec<LocalId>> {
    let ids = sqlx::query_scalar(
        "SELECT term_id FROM term_relationships WHERE post_id = ? AND taxonomy = ? ORDER BY term_id",
    )
    .bind(post_id)
    .bind(taxonomy)
    .fetch_all(pool)
    .await?;
    Ok(ids)
}

/// Recompute usage counts for one taxonomy, or every taxonomy with `None`
pub async fn recount_terms(pool: &SqlitePool, taxonomy: Option<&str>) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE terms
        SET count = (SELECT COUNT(*) FROM term_relationships r WHERE r.term_id = terms.id)
        WHERE ?1 IS NULL OR taxonomy = ?1
        "#,
    )
    .bind(taxonomy)
    .execute(pool)
    .await?;
    Ok(())
}
