//! Photo queries.

use photocap_storage::{NewPhoto, Photo, PhotoChanges};
use sqlx_core::query::query;
use sqlx_core::query_as::query_as;
use sqlx_postgres::PgPool;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::error::Result;

type PhotoTuple = (
    Uuid,
    String,
    String,
    Option<String>,
    OffsetDateTime,
    OffsetDateTime,
);

fn photo_from_tuple(row: PhotoTuple) -> Photo {
    Photo {
        id: row.0,
        name: row.1,
        url: row.2,
        citation: row.3,
        created_at: row.4,
        updated_at: row.5,
    }
}

pub(crate) async fn list(pool: &PgPool) -> Result<Vec<Photo>> {
    let rows: Vec<PhotoTuple> = query_as(
        r#"
        SELECT id, name, url, citation, created_at, updated_at
        FROM photos
        ORDER BY created_at DESC
        "#,
    )
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(photo_from_tuple).collect())
}

pub(crate) async fn find(pool: &PgPool, id: Uuid) -> Result<Option<Photo>> {
    let row: Option<PhotoTuple> = query_as(
        r#"
        SELECT id, name, url, citation, created_at, updated_at
        FROM photos
        WHERE id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(photo_from_tuple))
}

pub(crate) async fn insert(pool: &PgPool, new: NewPhoto) -> Result<Photo> {
    let row: PhotoTuple = query_as(
        r#"
        INSERT INTO photos (id, name, url, citation)
        VALUES ($1, $2, $3, $4)
        RETURNING id, name, url, citation, created_at, updated_at
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(new.name)
    .bind(new.url)
    .bind(new.citation)
    .fetch_one(pool)
    .await?;

    Ok(photo_from_tuple(row))
}

pub(crate) async fn update(pool: &PgPool, id: Uuid, changes: PhotoChanges) -> Result<Option<Photo>> {
    let row: Option<PhotoTuple> = query_as(
        r#"
        UPDATE photos
        SET name = COALESCE($2, name),
            url = COALESCE($3, url),
            citation = COALESCE($4, citation),
            updated_at = now()
        WHERE id = $1
        RETURNING id, name, url, citation, created_at, updated_at
        "#,
    )
    .bind(id)
    .bind(changes.name)
    .bind(changes.url)
    .bind(changes.citation)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(photo_from_tuple))
}

pub(crate) async fn delete(pool: &PgPool, id: Uuid) -> Result<bool> {
    let result = query("DELETE FROM photos WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}
