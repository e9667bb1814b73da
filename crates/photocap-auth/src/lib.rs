//! Authentication primitives for the Photocap server.
//!
//! - [`jwt`]: HS256 bearer tokens ([`JwtService`])
//! - [`password`]: Argon2id hashing, with async wrappers that run on the
//!   blocking pool
//!
//! Token liveness (login/logout) is tracked by the server's token store, not
//! here.

pub mod error;
pub mod jwt;
pub mod password;

pub use error::AuthError;
pub use jwt::{Claims, JwtError, JwtService};
pub use password::{hash_password, hash_password_async, verify_password, verify_password_async};
