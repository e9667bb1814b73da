//! Registration, login/logout and user profiles.

use photocap_api::ApiError;
use photocap_auth::{AuthError, hash_password_async, verify_password_async};
use photocap_storage::{NewUser, User, UserChanges, UserProfile};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{non_blank, required};
use crate::cache::{CacheKey, invalidation};
use crate::server::AppState;

#[derive(Deserialize)]
pub struct CreateUser {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Deserialize, Default)]
pub struct UpdateUser {
    pub name: Option<String>,
    pub password: Option<String>,
}

/// The public fields of a user, as listed and as returned by an update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserSummary {
    pub id: Uuid,
    pub name: String,
    pub email: String,
}

impl From<User> for UserSummary {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub token: String,
}

pub async fn list(state: &AppState) -> Result<Vec<UserSummary>, ApiError> {
    let users = state.store.list_users().await?;
    Ok(users.into_iter().map(UserSummary::from).collect())
}

pub async fn profile(state: &AppState, id: Uuid) -> Result<UserProfile, ApiError> {
    state
        .views
        .get_or_load(CacheKey::User(id), || async {
            Ok::<_, ApiError>(state.store.user_profile(id).await?)
        })
        .await?
        .ok_or_else(|| ApiError::not_found("User Not Found"))
}

pub async fn create(state: &AppState, input: CreateUser) -> Result<User, ApiError> {
    required("name", &input.name)?;
    required("email", &input.email)?;
    required("password", &input.password)?;

    let password_hash = hash_password_async(input.password).await?;
    let user = state
        .store
        .create_user(NewUser {
            name: input.name,
            email: input.email,
            password_hash,
        })
        .await?;

    tracing::info!(user_id = %user.id, "user registered");
    Ok(user)
}

/// Checks the credentials, signs a token and marks it live.
///
/// Fails closed: if the token cannot be recorded the login fails.
pub async fn login(state: &AppState, input: LoginRequest) -> Result<LoginResponse, ApiError> {
    let Some(credentials) = state.store.find_user_by_email(&input.email).await? else {
        return Err(AuthError::InvalidCredentials.into());
    };
    if !verify_password_async(input.password, credentials.password_hash).await? {
        return Err(AuthError::InvalidCredentials.into());
    }

    let user = credentials.user;
    let token = state.jwt.issue(user.id).map_err(AuthError::from)?;
    state.tokens.issue(&token).await?;

    tracing::info!(user_id = %user.id, "user logged in");
    Ok(LoginResponse {
        id: user.id,
        name: user.name,
        email: user.email,
        token,
    })
}

pub async fn logout(state: &AppState, token: &str) -> Result<(), ApiError> {
    state.tokens.revoke(token).await?;
    Ok(())
}

pub async fn update(
    state: &AppState,
    caller: Uuid,
    id: Uuid,
    input: UpdateUser,
) -> Result<UserSummary, ApiError> {
    if caller != id {
        return Err(ApiError::forbidden("Unauthorized to update this user."));
    }
    if state.store.find_user(id).await?.is_none() {
        return Err(ApiError::not_found("User Not Found"));
    }

    let password_hash = match non_blank(input.password) {
        Some(password) => Some(hash_password_async(password).await?),
        None => None,
    };
    let changes = UserChanges {
        name: non_blank(input.name),
        password_hash,
    };
    let user = state
        .store
        .update_user(id, changes)
        .await?
        .ok_or_else(|| ApiError::not_found("User Not Found"))?;

    let captions = state.store.captions_by_user(id).await?;
    state
        .invalidator
        .invalidate(invalidation::user_updated_keys(id, &captions))
        .await;
    Ok(user.into())
}

pub async fn delete(state: &AppState, caller: Uuid, id: Uuid) -> Result<(), ApiError> {
    if caller != id {
        return Err(ApiError::forbidden("Unauthorized to delete this user."));
    }
    if state.store.find_user(id).await?.is_none() {
        return Err(ApiError::not_found("User Not Found"));
    }
    let captions = state.store.captions_by_user(id).await?;

    if !state.store.delete_user(id).await? {
        return Err(ApiError::not_found("User Not Found"));
    }

    state
        .invalidator
        .invalidate(invalidation::user_deleted_keys(id, &captions))
        .await;
    tracing::info!(user_id = %id, captions = captions.len(), "user deleted");
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use photocap_storage::{NewCaption, NewPhoto};

    use super::*;
    use crate::cache::{CacheBackend, ReadThroughCache};
    use crate::config::AppConfig;
    use crate::services::captions;
    use crate::services::test_support::ConcurrentCaption;

    #[tokio::test]
    async fn update_refreshes_captions_added_during_the_write() {
        let cfg = AppConfig::default();
        let cache = CacheBackend::new_local();
        let views = ReadThroughCache::new(cache.clone(), cfg.cache.entity_ttl(), cfg.cache.on_error);
        let store = Arc::new(ConcurrentCaption::new(
            photocap_db_memory::create_primary_store(),
            views,
        ));
        let state = AppState::new(store.clone(), cache, &cfg);

        let user = state
            .store
            .create_user(NewUser {
                name: "Ada".into(),
                email: "ada@example.com".into(),
                password_hash: "hash".into(),
            })
            .await
            .unwrap();
        let photo = state
            .store
            .create_photo(NewPhoto {
                name: "Monkey".into(),
                url: "https://example.com/monkey.jpg".into(),
                citation: None,
            })
            .await
            .unwrap();
        store.arm(NewCaption {
            user_id: user.id,
            photo_id: photo.id,
            comment: "selfie".into(),
        });

        update(
            &state,
            user.id,
            user.id,
            UpdateUser {
                name: Some("Ada L.".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        let caption_id = store.created().unwrap();
        let view = captions::detail(&state, caption_id).await.unwrap();
        assert_eq!(view.user.name, "Ada L.");
    }
}
