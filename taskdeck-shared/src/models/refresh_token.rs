/// Refresh token records backing session revocation
///
/// Every successful register/login persists one record keyed by the full
/// signed token string. The stored `expires_at` mirrors the token's own `exp`
/// claim; it exists for bookkeeping, while actual expiry is still enforced
/// cryptographically at verification time. Revocation (`is_revoked`) is the
/// only mutation and is what makes logout stick before natural expiry.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE refresh_tokens (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     token TEXT NOT NULL,
///     user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     expires_at TIMESTAMPTZ NOT NULL,
///     is_revoked BOOLEAN NOT NULL DEFAULT FALSE,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

/// Stored refresh token record
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct RefreshToken {
    /// Record ID
    pub id: Uuid,

    /// The full signed JWT, used as the lookup key
    pub token: String,

    /// Owning user
    pub user_id: Uuid,

    /// Expiry taken from the token's own `exp` claim
    pub expires_at: DateTime<Utc>,

    /// Whether logout has revoked this token
    pub is_revoked: bool,

    /// When the record was created
    pub created_at: DateTime<Utc>,
}

/// Input for persisting a freshly issued refresh token
#[derive(Debug, Clone)]
pub struct CreateRefreshToken {
    /// The signed token string
    pub token: String,

    /// Owning user
    pub user_id: Uuid,

    /// Expiry from the token's `exp` claim
    pub expires_at: DateTime<Utc>,
}

impl RefreshToken {
    /// Persists a newly issued refresh token
    pub async fn create(pool: &PgPool, data: CreateRefreshToken) -> Result<Self, sqlx::Error> {
        let record = sqlx::query_as::<_, RefreshToken>(
            r#"
            INSERT INTO refresh_tokens (token, user_id, expires_at)
            VALUES ($1, $2, $3)
            RETURNING id, token, user_id, expires_at, is_revoked, created_at
            "#,
        )
        .bind(data.token)
        .bind(data.user_id)
        .bind(data.expires_at)
        .fetch_one(pool)
        .await?;

        Ok(record)
    }

    /// Finds a non-revoked record matching the exact token string
    ///
    /// Revoked and unknown tokens both come back as `None`; the caller treats
    /// them identically.
    pub async fn find_active(pool: &PgPool, token: &str) -> Result<Option<Self>, sqlx::Error> {
        let record = sqlx::query_as::<_, RefreshToken>(
            r#"
            SELECT id, token, user_id, expires_at, is_revoked, created_at
            FROM refresh_tokens
            WHERE token = $1 AND is_revoked = FALSE
            "#,
        )
        .bind(token)
        .fetch_optional(pool)
        .await?;

        Ok(record)
    }

    /// Revokes all non-revoked records matching the exact token string
    ///
    /// Idempotent: revoking an already-revoked or unknown token touches zero
    /// rows. Returns the number of rows revoked.
    pub async fn revoke_matching(pool: &PgPool, token: &str) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE refresh_tokens
            SET is_revoked = TRUE
            WHERE token = $1 AND is_revoked = FALSE
            "#,
        )
        .bind(token)
        .execute(pool)
        .await?;

        Ok(result.rows_affected())
    }
}
