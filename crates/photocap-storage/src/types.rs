//! Domain entities and the read views built from them.
//!
//! All types serialize with camelCase keys and RFC 3339 timestamps, which is
//! also the format of cached snapshots.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::error::{StorageError, StorageResult};

// =============================================================================
// Entities
// =============================================================================

/// A registered user. Never carries the password hash.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

/// A user together with the stored password hash, used only by login.
#[derive(Debug, Clone)]
pub struct UserCredentials {
    pub user: User,
    pub password_hash: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Photo {
    pub id: Uuid,
    pub name: String,
    pub url: String,
    pub citation: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Caption {
    pub id: Uuid,
    pub user_id: Uuid,
    pub photo_id: Uuid,
    pub comment: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

// =============================================================================
// Write inputs
// =============================================================================

#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password_hash: String,
}

impl NewUser {
    /// Checks the fields the store requires.
    pub fn validate(&self) -> StorageResult<()> {
        require("name", &self.name)?;
        require("email", &self.email)?;
        require("password", &self.password_hash)
    }
}

#[derive(Debug, Clone, Default)]
pub struct UserChanges {
    pub name: Option<String>,
    pub password_hash: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewPhoto {
    pub name: String,
    pub url: String,
    pub citation: Option<String>,
}

impl NewPhoto {
    pub fn validate(&self) -> StorageResult<()> {
        require("name", &self.name)?;
        require("url", &self.url)
    }
}

#[derive(Debug, Clone, Default)]
pub struct PhotoChanges {
    pub name: Option<String>,
    pub url: Option<String>,
    pub citation: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewCaption {
    pub user_id: Uuid,
    pub photo_id: Uuid,
    pub comment: String,
}

impl NewCaption {
    pub fn validate(&self) -> StorageResult<()> {
        require("comment", &self.comment)
    }
}

fn require(field: &str, value: &str) -> StorageResult<()> {
    if value.trim().is_empty() {
        return Err(StorageError::invalid_input(format!("{field} is required")));
    }
    Ok(())
}

// =============================================================================
// Read views (cached by the server)
// =============================================================================

/// A caption as embedded in a user profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserCaption {
    pub id: Uuid,
    pub photo_id: Uuid,
    pub comment: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl From<&Caption> for UserCaption {
    fn from(c: &Caption) -> Self {
        Self {
            id: c.id,
            photo_id: c.photo_id,
            comment: c.comment.clone(),
            created_at: c.created_at,
            updated_at: c.updated_at,
        }
    }
}

/// `GET /users/{id}`: the user and every caption they wrote.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    #[serde(flatten)]
    pub user: User,
    pub captions: Vec<UserCaption>,
}

/// A caption as embedded in a photo.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhotoCaption {
    pub id: Uuid,
    pub user_id: Uuid,
    pub comment: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl From<&Caption> for PhotoCaption {
    fn from(c: &Caption) -> Self {
        Self {
            id: c.id,
            user_id: c.user_id,
            comment: c.comment.clone(),
            created_at: c.created_at,
            updated_at: c.updated_at,
        }
    }
}

/// `GET /photos/{id}`: the photo and all of its captions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhotoDetail {
    #[serde(flatten)]
    pub photo: Photo,
    pub captions: Vec<PhotoCaption>,
}

/// Caption author as embedded in a caption detail (no id, no password).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptionAuthor {
    pub name: String,
    pub email: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl From<&User> for CaptionAuthor {
    fn from(u: &User) -> Self {
        Self {
            name: u.name.clone(),
            email: u.email.clone(),
            created_at: u.created_at,
            updated_at: u.updated_at,
        }
    }
}

/// Captioned photo as embedded in a caption detail (no id).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptionPhoto {
    pub name: String,
    pub url: String,
    pub citation: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl From<&Photo> for CaptionPhoto {
    fn from(p: &Photo) -> Self {
        Self {
            name: p.name.clone(),
            url: p.url.clone(),
            citation: p.citation.clone(),
            created_at: p.created_at,
            updated_at: p.updated_at,
        }
    }
}

/// `GET /captions/{id}`: the caption with its author and photo.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptionDetail {
    #[serde(flatten)]
    pub caption: Caption,
    pub user: CaptionAuthor,
    pub photo: CaptionPhoto,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_user() -> User {
        User {
            id: Uuid::nil(),
            name: "alice".into(),
            email: "alice@example.com".into(),
            created_at: OffsetDateTime::UNIX_EPOCH,
            updated_at: OffsetDateTime::UNIX_EPOCH,
        }
    }

    #[test]
    fn user_profile_flattens_user_fields() {
        let profile = UserProfile {
            user: sample_user(),
            captions: vec![],
        };
        let value = serde_json::to_value(&profile).unwrap();
        assert_eq!(value["name"], json!("alice"));
        assert_eq!(value["createdAt"], json!("1970-01-01T00:00:00Z"));
        assert_eq!(value["captions"], json!([]));
        assert!(value.get("password").is_none());
        assert!(value.get("passwordHash").is_none());
    }

    #[test]
    fn user_profile_survives_json_snapshot() {
        let profile = UserProfile {
            user: sample_user(),
            captions: vec![UserCaption {
                id: Uuid::new_v4(),
                photo_id: Uuid::new_v4(),
                comment: "nice".into(),
                created_at: OffsetDateTime::UNIX_EPOCH,
                updated_at: OffsetDateTime::UNIX_EPOCH,
            }],
        };
        let text = serde_json::to_string(&profile).unwrap();
        let back: UserProfile = serde_json::from_str(&text).unwrap();
        assert_eq!(back, profile);
    }

    #[test]
    fn validation_rejects_blank_fields() {
        let photo = NewPhoto {
            name: "monkey".into(),
            url: "  ".into(),
            citation: None,
        };
        let err = photo.validate().unwrap_err();
        assert_eq!(err.to_string(), "Invalid input: url is required");

        let caption = NewCaption {
            user_id: Uuid::nil(),
            photo_id: Uuid::nil(),
            comment: "This is a great photo!".into(),
        };
        assert!(caption.validate().is_ok());
    }
}
