//! Content store schema
//!
//! Every statement is idempotent so opening an existing database is safe.

use crate::store::BUILTIN_POST_TYPES;
use sqlx::SqlitePool;
use wxr_common::Result;

/// Create all tables and seed built-in post types
pub async fn init_tables(pool: &SqlitePool) -> Result<()> {
    create_users_table(pool).await?;
    create_post_types_table(pool).await?;
    create_terms_table(pool).await?;
    create_posts_table(pool).await?;
    create_term_relationships_table(pool).await?;
    create_comments_table(pool).await?;
    create_postmeta_table(pool).await?;

    for post_type in BUILTIN_POST_TYPES {
        sqlx::query("INSERT OR IGNORE INTO post_types (name) VALUES (?)")
            .bind(post_type)
            .execute(pool)
            .await?;
    }

    tracing::info!("Content tables initialized");

    Ok(())
}

async fn create_users_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS users (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            login TEXT NOT NULL UNIQUE,
            email TEXT NOT NULL DEFAULT '',
            display_name TEXT NOT NULL DEFAULT '',
            first_name TEXT NOT NULL DEFAULT '',
            last_name TEXT NOT NULL DEFAULT '',
            password_hash TEXT NOT NULL,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Empty emails may repeat
    sqlx::query(
        "CREATE UNIQUE INDEX IF NOT EXISTS idx_users_email ON users(email) WHERE email <> ''",
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_post_types_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS post_types (
            name TEXT PRIMARY KEY
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_terms_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS terms (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            taxonomy TEXT NOT NULL,
            name TEXT NOT NULL,
            slug TEXT NOT NULL,
            parent_id INTEGER REFERENCES terms(id) ON DELETE SET NULL,
            description TEXT NOT NULL DEFAULT '',
            count INTEGER NOT NULL DEFAULT 0,
            UNIQUE(taxonomy, slug)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_terms_name ON terms(taxonomy, name)")
        .execute(pool)
        .await?;

    Ok(())
}

async fn create_posts_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS posts (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            import_id INTEGER,
            author_id INTEGER NOT NULL DEFAULT 0,
            post_date TEXT NOT NULL DEFAULT '',
            post_date_gmt TEXT NOT NULL DEFAULT '',
            content TEXT NOT NULL DEFAULT '',
            excerpt TEXT NOT NULL DEFAULT '',
            title TEXT NOT NULL DEFAULT '',
            status TEXT NOT NULL DEFAULT 'publish',
            name TEXT NOT NULL DEFAULT '',
            comment_status TEXT NOT NULL DEFAULT 'open',
            ping_status TEXT NOT NULL DEFAULT 'open',
            guid TEXT NOT NULL DEFAULT '',
            parent_id INTEGER,
            menu_order INTEGER NOT NULL DEFAULT 0,
            post_type TEXT NOT NULL REFERENCES post_types(name),
            password TEXT NOT NULL DEFAULT '',
            mime_type TEXT,
            sticky INTEGER NOT NULL DEFAULT 0,
            comment_count INTEGER NOT NULL DEFAULT 0
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_posts_title_date ON posts(title, post_date)")
        .execute(pool)
        .await?;

    Ok(())
}

async fn create_term_relationships_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS term_relationships (
            post_id INTEGER NOT NULL REFERENCES posts(id) ON DELETE CASCADE,
            term_id INTEGER NOT NULL REFERENCES terms(id) ON DELETE CASCADE,
            taxonomy TEXT NOT NULL,
            PRIMARY KEY (post_id, term_id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_comments_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS comments (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            post_id INTEGER NOT NULL REFERENCES posts(id) ON DELETE CASCADE,
            author TEXT NOT NULL DEFAULT '',
            author_email TEXT NOT NULL DEFAULT '',
            author_ip TEXT NOT NULL DEFAULT '',
            author_url TEXT NOT NULL DEFAULT '',
            date TEXT NOT NULL DEFAULT '',
            date_gmt TEXT NOT NULL DEFAULT '',
            content TEXT NOT NULL DEFAULT '',
            approved TEXT NOT NULL DEFAULT '1',
            comment_type TEXT NOT NULL DEFAULT 'comment',
            parent_id INTEGER
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_comments_author_date ON comments(author, date)")
        .execute(pool)
        .await?;

    Ok(())
}

async fn create_postmeta_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS postmeta (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            post_id INTEGER NOT NULL REFERENCES posts(id) ON DELETE CASCADE,
            meta_key TEXT NOT NULL,
            meta_value TEXT NOT NULL DEFAULT ''
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_postmeta_post_key ON postmeta(post_id, meta_key)")
        .execute(pool)
        .await?;

    Ok(())
}
