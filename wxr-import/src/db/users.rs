//! User accounts

use crate::models::LocalId;
use crate::store::{hash_password, NewUser};
use sqlx::SqlitePool;
use wxr_common::{Error, Result};

pub async fn find_user_by_login(pool: &SqlitePool, login: &str) -> Result<Option<LocalId>> {
    let id = sqlx::query_scalar("SELECT id FROM users WHERE login = ?")
        .bind(login)
        .fetch_optional(pool)
        .await?;
    Ok(id)
}

pub async fn user_exists(pool: &SqlitePool, user_id: LocalId) -> Result<bool> {
    let found: Option<LocalId> = sqlx::query_scalar("SELECT id FROM users WHERE id = ?")
        .bind(user_id)
        .fetch_optional(pool)
        .await?;
    Ok(found.is_some())
}

async fn email_in_use(pool: &SqlitePool, email: &str) -> Result<bool> {
    if email.is_empty() {
        return Ok(false);
    }
    let found: Option<LocalId> = sqlx::query_scalar("SELECT id FROM users WHERE email = ?")
        .bind(email)
        .fetch_optional(pool)
        .await?;
    Ok(found.is_some())
}

/// Create an account; the password is stored salted and hashed
pub async fn insert_user(pool: &SqlitePool, user: &NewUser) -> Result<LocalId> {
    if user.login.trim().is_empty() {
        return Err(Error::InvalidInput(
            "Cannot create a user with an empty login name".to_string(),
        ));
    }
    if find_user_by_login(pool, &user.login).await?.is_some() {
        return Err(Error::InvalidInput(format!(
            "Sorry, the username {} already exists",
            user.login
        )));
    }
    if email_in_use(pool, &user.email).await? {
        return Err(Error::InvalidInput(format!(
            "Sorry, the email address {} is already used",
            user.email
        )));
    }

    let result = sqlx::query(
        r#"
        INSERT INTO users (login, email, display_name, first_name, last_name, password_hash)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&user.login)
    .bind(&user.email)
    .bind(&user.display_name)
    .bind(&user.first_name)
    .bind(&user.last_name)
    .bind(hash_password(&user.password))
    .execute(pool)
    .await?;

    Ok(result.last_insert_rowid())
}
