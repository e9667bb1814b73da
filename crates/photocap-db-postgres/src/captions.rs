//! Caption queries.

use photocap_storage::{Caption, NewCaption};
use sqlx_core::query::query;
use sqlx_core::query_as::query_as;
use sqlx_postgres::PgPool;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::error::Result;

type CaptionTuple = (Uuid, Uuid, Uuid, String, OffsetDateTime, OffsetDateTime);

fn caption_from_tuple(row: CaptionTuple) -> Caption {
    Caption {
        id: row.0,
        user_id: row.1,
        photo_id: row.2,
        comment: row.3,
        created_at: row.4,
        updated_at: row.5,
    }
}

pub(crate) async fn find(pool: &PgPool, id: Uuid) -> Result<Option<Caption>> {
    let row: Option<CaptionTuple> = query_as(
        r#"
        SELECT id, user_id, photo_id, comment, created_at, updated_at
        FROM captions
        WHERE id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(caption_from_tuple))
}

pub(crate) async fn by_user(pool: &PgPool, user_id: Uuid) -> Result<Vec<Caption>> {
    let rows: Vec<CaptionTuple> = query_as(
        r#"
        SELECT id, user_id, photo_id, comment, created_at, updated_at
        FROM captions
        WHERE user_id = $1
        ORDER BY created_at DESC
        "#,
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(caption_from_tuple).collect())
}

pub(crate) async fn by_photo(pool: &PgPool, photo_id: Uuid) -> Result<Vec<Caption>> {
    let rows: Vec<CaptionTuple> = query_as(
        r#"
        SELECT id, user_id, photo_id, comment, created_at, updated_at
        FROM captions
        WHERE photo_id = $1
        ORDER BY created_at DESC
        "#,
    )
    .bind(photo_id)
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(caption_from_tuple).collect())
}

pub(crate) async fn insert(pool: &PgPool, new: NewCaption) -> Result<Caption> {
    let row: CaptionTuple = query_as(
        r#"
        INSERT INTO captions (id, user_id, photo_id, comment)
        VALUES ($1, $2, $3, $4)
        RETURNING id, user_id, photo_id, comment, created_at, updated_at
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(new.user_id)
    .bind(new.photo_id)
    .bind(new.comment)
    .fetch_one(pool)
    .await?;

    Ok(caption_from_tuple(row))
}

pub(crate) async fn update(pool: &PgPool, id: Uuid, comment: String) -> Result<Option<Caption>> {
    let row: Option<CaptionTuple> = query_as(
        r#"
        UPDATE captions
        SET comment = $2, updated_at = now()
        WHERE id = $1
        RETURNING id, user_id, photo_id, comment, created_at, updated_at
        "#,
    )
    .bind(id)
    .bind(comment)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(caption_from_tuple))
}

pub(crate) async fn delete(pool: &PgPool, id: Uuid) -> Result<bool> {
    let result = query("DELETE FROM captions WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}
