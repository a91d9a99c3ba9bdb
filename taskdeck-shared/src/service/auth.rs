/// Auth orchestration: register, login, refresh, logout
///
/// Session lifecycle per user:
///
/// ```text
/// Anonymous → Registered/LoggedIn (access + refresh pair)
///           → Refreshed (new access, same refresh)
///           → LoggedOut (refresh revoked)
/// ```
///
/// Each successful register/login issues exactly one token pair and writes
/// exactly one refresh-token record. Refresh writes nothing; the refresh
/// token is never rotated and stays valid until expiry or logout.

use chrono::Duration;
use sqlx::PgPool;
use tracing::debug;
use uuid::Uuid;

use crate::auth::jwt::{self, Claims, TokenType};
use crate::auth::password;
use crate::models::refresh_token::{CreateRefreshToken, RefreshToken};
use crate::models::user::{CreateUser, PublicUser, User};

use super::ServiceError;

/// Token signing configuration
///
/// Access and refresh secrets must differ; a token of one type then fails
/// signature verification under the other type's verifier.
#[derive(Debug, Clone)]
pub struct TokenConfig {
    /// Secret for signing access tokens
    pub access_secret: String,

    /// Secret for signing refresh tokens
    pub refresh_secret: String,

    /// Access token lifetime (default 15 minutes)
    pub access_ttl: Duration,

    /// Refresh token lifetime (default 7 days)
    pub refresh_ttl: Duration,
}

/// A freshly established session: the caller-safe user plus the token pair
#[derive(Debug, Clone)]
pub struct AuthSession {
    /// The authenticated user (id and email only)
    pub user: PublicUser,

    /// Short-lived bearer token
    pub access_token: String,

    /// Long-lived token, stored server-side and delivered as a cookie
    pub refresh_token: String,
}

/// Auth service with the datastore connection injected
#[derive(Clone)]
pub struct AuthService {
    db: PgPool,
    tokens: TokenConfig,
}

impl AuthService {
    /// Creates a new auth service
    pub fn new(db: PgPool, tokens: TokenConfig) -> Self {
        Self { db, tokens }
    }

    /// Registers a new user
    ///
    /// # Errors
    ///
    /// - `ServiceError::EmailTaken` if the email already exists
    pub async fn register(&self, email: &str, pw: &str) -> Result<AuthSession, ServiceError> {
        if User::find_by_email(&self.db, email).await?.is_some() {
            return Err(ServiceError::EmailTaken);
        }

        let password_hash = password::hash_password(pw)?;

        // A concurrent registration can still hit the unique constraint here;
        // the boundary maps that to the same response as EmailTaken.
        let user = User::create(
            &self.db,
            CreateUser {
                email: email.to_string(),
                password_hash,
            },
        )
        .await?;

        debug!(user_id = %user.id, "Registered new user");

        self.issue_session(&user).await
    }

    /// Authenticates a user by email and password
    ///
    /// # Errors
    ///
    /// - `ServiceError::InvalidCredentials` for unknown email *and* for a
    ///   wrong password; the two are indistinguishable to the caller
    pub async fn login(&self, email: &str, pw: &str) -> Result<AuthSession, ServiceError> {
        let user = User::find_by_email(&self.db, email)
            .await?
            .ok_or(ServiceError::InvalidCredentials)?;

        let valid = password::verify_password(pw, &user.password_hash)?;
        if !valid {
            return Err(ServiceError::InvalidCredentials);
        }

        self.issue_session(&user).await
    }

    /// Exchanges a refresh token for a new access token
    ///
    /// The token must pass signature + expiry + type verification *and* match
    /// a non-revoked stored record; the store is an additional check, not a
    /// replacement for cryptographic expiry. No store writes happen here.
    ///
    /// # Errors
    ///
    /// - `ServiceError::InvalidRefreshToken` for expired, malformed,
    ///   wrong-type, unknown, or revoked tokens
    pub async fn refresh(&self, refresh_token: &str) -> Result<String, ServiceError> {
        let claims = jwt::verify_refresh_token(refresh_token, &self.tokens.refresh_secret)
            .map_err(|_| ServiceError::InvalidRefreshToken)?;

        let stored = RefreshToken::find_active(&self.db, refresh_token).await?;
        if stored.is_none() {
            return Err(ServiceError::InvalidRefreshToken);
        }

        self.sign_access_token(claims.sub)
    }

    /// Revokes all stored records matching the presented refresh token
    ///
    /// Idempotent and always succeeds from the caller's perspective; revoking
    /// an unknown or already-revoked token is a no-op.
    pub async fn logout(&self, refresh_token: &str) -> Result<(), ServiceError> {
        let revoked = RefreshToken::revoke_matching(&self.db, refresh_token).await?;
        debug!(revoked, "Logout revoked refresh token records");
        Ok(())
    }

    /// Issues an access+refresh pair and persists the refresh token
    async fn issue_session(&self, user: &User) -> Result<AuthSession, ServiceError> {
        let access_token = self.sign_access_token(user.id)?;

        let refresh_claims = Claims::new(user.id, TokenType::Refresh, self.tokens.refresh_ttl);
        let refresh_token = jwt::sign_token(&refresh_claims, &self.tokens.refresh_secret)?;

        // expires_at mirrors the token's own exp claim
        RefreshToken::create(
            &self.db,
            CreateRefreshToken {
                token: refresh_token.clone(),
                user_id: user.id,
                expires_at: refresh_claims.expires_at(),
            },
        )
        .await?;

        Ok(AuthSession {
            user: PublicUser::from(user),
            access_token,
            refresh_token,
        })
    }

    fn sign_access_token(&self, user_id: Uuid) -> Result<String, ServiceError> {
        let claims = Claims::new(user_id, TokenType::Access, self.tokens.access_ttl);
        Ok(jwt::sign_token(&claims, &self.tokens.access_secret)?)
    }
}
