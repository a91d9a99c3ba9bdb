/// Business services composing the models
///
/// Services are explicitly constructed with the connection pool injected, so
/// the HTTP layer and tests build them the same way. No module-level state.
///
/// # Modules
///
/// - [`auth`]: register / login / refresh / logout session lifecycle
/// - [`tasks`]: per-user task CRUD and paginated listing

pub mod auth;
pub mod tasks;

use crate::auth::{jwt::JwtError, password::PasswordError};

/// Errors surfaced by the service layer
///
/// The first four variants map directly to caller-visible HTTP statuses; the
/// rest are internal failures the boundary converts to opaque 500s.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// Registration with an email that is already taken
    #[error("Email already in use")]
    EmailTaken,

    /// Login failure; identical for unknown email and wrong password so
    /// callers cannot enumerate accounts
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// Refresh token failed verification, is unknown, or was revoked
    #[error("Invalid refresh token")]
    InvalidRefreshToken,

    /// Task absent, or owned by a different user (never distinguished)
    #[error("Task not found")]
    TaskNotFound,

    /// Password hashing failure
    #[error(transparent)]
    Password(#[from] PasswordError),

    /// Token signing failure
    #[error(transparent)]
    Jwt(#[from] JwtError),

    /// Datastore failure
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}
