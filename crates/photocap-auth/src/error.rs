//! Authentication error types.

use crate::jwt::JwtError;

/// Errors raised while authenticating a caller.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// Email unknown or password mismatch. Deliberately indistinguishable.
    #[error("Incorrect username or password")]
    InvalidCredentials,

    /// Missing, malformed, forged, expired or revoked bearer token.
    #[error("Invalid token")]
    InvalidToken,

    #[error(transparent)]
    Jwt(#[from] JwtError),

    /// Hashing failed or the stored hash is malformed.
    #[error("Password hashing error: {0}")]
    Hashing(String),
}

impl AuthError {
    /// Returns `true` if the caller should see a 401.
    #[must_use]
    pub fn is_unauthorized(&self) -> bool {
        match self {
            Self::InvalidCredentials | Self::InvalidToken => true,
            Self::Jwt(e) => e.is_validation_error(),
            Self::Hashing(_) => false,
        }
    }
}

impl From<argon2::password_hash::Error> for AuthError {
    fn from(err: argon2::password_hash::Error) -> Self {
        Self::Hashing(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unauthorized_classification() {
        assert!(AuthError::InvalidCredentials.is_unauthorized());
        assert!(AuthError::InvalidToken.is_unauthorized());
        assert!(AuthError::Jwt(JwtError::Expired).is_unauthorized());
        assert!(!AuthError::Hashing("bad salt".into()).is_unauthorized());
        assert!(!AuthError::Jwt(JwtError::encoding_error("x")).is_unauthorized());
    }

    #[test]
    fn test_credentials_message_is_uniform() {
        assert_eq!(
            AuthError::InvalidCredentials.to_string(),
            "Incorrect username or password"
        );
    }
}
