//! Error types for the PostgreSQL primary store.

use photocap_storage::StorageError;
use sqlx_core::error::Error as SqlxError;

/// PostgreSQL error code for unique constraint violations (23505).
pub const PG_UNIQUE_VIOLATION: &str = "23505";

/// PostgreSQL error code for foreign key violations (23503).
pub const PG_FOREIGN_KEY_VIOLATION: &str = "23503";

/// PostgreSQL error code for not-null violations (23502).
pub const PG_NOT_NULL_VIOLATION: &str = "23502";

/// Checks if a sqlx error has a specific PostgreSQL error code.
pub fn has_pg_error_code(err: &SqlxError, code: &str) -> bool {
    if let SqlxError::Database(db_err) = err {
        db_err.code().as_deref() == Some(code)
    } else {
        false
    }
}

fn constraint_name(err: &SqlxError) -> Option<&str> {
    match err {
        SqlxError::Database(db_err) => db_err.constraint(),
        _ => None,
    }
}

/// Errors specific to the PostgreSQL primary store.
#[derive(Debug, thiserror::Error)]
pub enum PostgresError {
    /// Query or connection error reported by sqlx.
    #[error("Database error: {0}")]
    Query(#[from] SqlxError),

    #[error("Migration error: {0}")]
    Migration(String),
}

impl From<PostgresError> for StorageError {
    fn from(err: PostgresError) -> Self {
        match err {
            PostgresError::Query(e) if has_pg_error_code(&e, PG_UNIQUE_VIOLATION) => {
                match constraint_name(&e) {
                    Some("users_email_key") => StorageError::conflict("email must be unique"),
                    Some("photos_url_key") => StorageError::conflict("url must be unique"),
                    _ => StorageError::conflict(e.to_string()),
                }
            }
            PostgresError::Query(e) if has_pg_error_code(&e, PG_FOREIGN_KEY_VIOLATION) => {
                match constraint_name(&e) {
                    Some(name) if name.contains("user_id") => {
                        StorageError::foreign_key("user does not exist")
                    }
                    Some(name) if name.contains("photo_id") => {
                        StorageError::foreign_key("photo does not exist")
                    }
                    _ => StorageError::foreign_key(e.to_string()),
                }
            }
            PostgresError::Query(e) if has_pg_error_code(&e, PG_NOT_NULL_VIOLATION) => {
                StorageError::invalid_input(e.to_string())
            }
            PostgresError::Query(e) => StorageError::database(e.to_string()),
            PostgresError::Migration(e) => StorageError::database(format!("Migration error: {e}")),
        }
    }
}

/// Result type alias for PostgreSQL operations.
pub type Result<T> = std::result::Result<T, PostgresError>;
