//! User queries.

use photocap_storage::{NewUser, User, UserChanges, UserCredentials};
use sqlx_core::query::query;
use sqlx_core::query_as::query_as;
use sqlx_postgres::PgPool;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::error::Result;

type UserTuple = (Uuid, String, String, OffsetDateTime, OffsetDateTime);

fn user_from_tuple(row: UserTuple) -> User {
    User {
        id: row.0,
        name: row.1,
        email: row.2,
        created_at: row.3,
        updated_at: row.4,
    }
}

pub(crate) async fn list(pool: &PgPool) -> Result<Vec<User>> {
    let rows: Vec<UserTuple> = query_as(
        r#"
        SELECT id, name, email, created_at, updated_at
        FROM users
        ORDER BY created_at DESC
        "#,
    )
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(user_from_tuple).collect())
}

pub(crate) async fn find(pool: &PgPool, id: Uuid) -> Result<Option<User>> {
    let row: Option<UserTuple> = query_as(
        r#"
        SELECT id, name, email, created_at, updated_at
        FROM users
        WHERE id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(user_from_tuple))
}

pub(crate) async fn find_credentials(pool: &PgPool, email: &str) -> Result<Option<UserCredentials>> {
    let row: Option<(Uuid, String, String, OffsetDateTime, OffsetDateTime, String)> = query_as(
        r#"
        SELECT id, name, email, created_at, updated_at, password_hash
        FROM users
        WHERE email = $1
        "#,
    )
    .bind(email)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(|r| UserCredentials {
        user: user_from_tuple((r.0, r.1, r.2, r.3, r.4)),
        password_hash: r.5,
    }))
}

pub(crate) async fn insert(pool: &PgPool, new: NewUser) -> Result<User> {
    let row: UserTuple = query_as(
        r#"
        INSERT INTO users (id, name, email, password_hash)
        VALUES ($1, $2, $3, $4)
        RETURNING id, name, email, created_at, updated_at
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(new.name)
    .bind(new.email)
    .bind(new.password_hash)
    .fetch_one(pool)
    .await?;

    Ok(user_from_tuple(row))
}

pub(crate) async fn update(pool: &PgPool, id: Uuid, changes: UserChanges) -> Result<Option<User>> {
    let row: Option<UserTuple> = query_as(
        r#"
        UPDATE users
        SET name = COALESCE($2, name),
            password_hash = COALESCE($3, password_hash),
            updated_at = now()
        WHERE id = $1
        RETURNING id, name, email, created_at, updated_at
        "#,
    )
    .bind(id)
    .bind(changes.name)
    .bind(changes.password_hash)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(user_from_tuple))
}

/// Captions go with the user through `ON DELETE CASCADE`.
pub(crate) async fn delete(pool: &PgPool, id: Uuid) -> Result<bool> {
    let result = query("DELETE FROM users WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}
