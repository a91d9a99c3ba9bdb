/// JWT token generation and validation
///
/// Tokens are signed with HS256 and carry a `token_type` claim so that an
/// access token can never be presented where a refresh token is expected.
/// Access and refresh tokens are additionally signed with *distinct* secrets;
/// passing the wrong secret fails signature verification before the type
/// check is ever reached.
///
/// # Token Types
///
/// - **Access Token**: short-lived (config default 15 minutes), sent as a
///   Bearer header on every API call
/// - **Refresh Token**: long-lived (config default 7 days), stored server-side
///   and used solely to mint new access tokens
///
/// # Example
///
/// ```
/// use taskdeck_shared::auth::jwt::{sign_token, verify_access_token, Claims, TokenType};
/// use chrono::Duration;
/// use uuid::Uuid;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let user_id = Uuid::new_v4();
/// let claims = Claims::new(user_id, TokenType::Access, Duration::minutes(15));
/// let token = sign_token(&claims, "access-secret")?;
///
/// let verified = verify_access_token(&token, "access-secret")?;
/// assert_eq!(verified.sub, user_id);
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Error type for JWT operations
#[derive(Debug, thiserror::Error)]
pub enum JwtError {
    /// Failed to create token
    #[error("Failed to create token: {0}")]
    CreateError(String),

    /// Failed to validate token
    #[error("Failed to validate token: {0}")]
    ValidationError(String),

    /// Token has expired
    #[error("Token has expired")]
    Expired,

    /// Token carries the wrong `token_type` claim
    #[error("Wrong token type: expected {expected}, got {actual}")]
    WrongTokenType {
        expected: &'static str,
        actual: &'static str,
    },
}

/// Token type identifier carried in the `token_type` claim
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    /// Access token (short-lived)
    Access,

    /// Refresh token (long-lived)
    Refresh,
}

impl TokenType {
    /// Gets token type as string
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenType::Access => "access",
            TokenType::Refresh => "refresh",
        }
    }
}

/// JWT claims structure
///
/// # Standard Claims
///
/// - `sub`: Subject (user ID)
/// - `iss`: Issuer (always "taskdeck")
/// - `iat`: Issued at timestamp
/// - `exp`: Expiration timestamp
///
/// # Custom Claims
///
/// - `token_type`: Access or refresh token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject - User ID
    pub sub: Uuid,

    /// Issuer - Always "taskdeck"
    pub iss: String,

    /// Issued at (Unix timestamp)
    pub iat: i64,

    /// Expiration time (Unix timestamp)
    pub exp: i64,

    /// Token type (custom claim)
    pub token_type: TokenType,
}

impl Claims {
    /// Creates new claims expiring `expires_in` from now
    pub fn new(user_id: Uuid, token_type: TokenType, expires_in: Duration) -> Self {
        let now = Utc::now();
        let expiration = now + expires_in;

        Self {
            sub: user_id,
            iss: "taskdeck".to_string(),
            iat: now.timestamp(),
            exp: expiration.timestamp(),
            token_type,
        }
    }

    /// Expiration as a UTC timestamp
    ///
    /// Used to persist the refresh token's own expiry alongside the stored
    /// token record, so the session store never disagrees with the token.
    pub fn expires_at(&self) -> DateTime<Utc> {
        DateTime::from_timestamp(self.exp, 0).unwrap_or_else(Utc::now)
    }

    /// Checks if token has expired
    pub fn is_expired(&self) -> bool {
        Utc::now().timestamp() >= self.exp
    }
}

/// Signs a JWT token from claims
///
/// # Arguments
///
/// * `claims` - Token claims
/// * `secret` - Secret key for signing; access and refresh tokens must use
///   different secrets
///
/// # Errors
///
/// Returns `JwtError::CreateError` if token encoding fails
pub fn sign_token(claims: &Claims, secret: &str) -> Result<String, JwtError> {
    let header = Header::new(Algorithm::HS256);
    let key = EncodingKey::from_secret(secret.as_bytes());

    encode(&header, claims, &key)
        .map_err(|e| JwtError::CreateError(format!("Token encoding failed: {}", e)))
}

/// Validates a JWT token and extracts claims
///
/// Verifies:
/// - Signature is valid under `secret`
/// - Token hasn't expired
/// - Issuer is "taskdeck"
///
/// The caller-facing helpers [`verify_access_token`] and
/// [`verify_refresh_token`] additionally check the `token_type` claim.
pub fn verify_token(token: &str, secret: &str) -> Result<Claims, JwtError> {
    let key = DecodingKey::from_secret(secret.as_bytes());

    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_issuer(&["taskdeck"]);
    validation.validate_exp = true;

    let token_data = decode::<Claims>(token, &key, &validation).map_err(|e| match e.kind() {
        jsonwebtoken::errors::ErrorKind::ExpiredSignature => JwtError::Expired,
        _ => JwtError::ValidationError(format!("Token validation failed: {}", e)),
    })?;

    Ok(token_data.claims)
}

/// Validates a token against the access secret and checks it's an access token
pub fn verify_access_token(token: &str, secret: &str) -> Result<Claims, JwtError> {
    let claims = verify_token(token, secret)?;

    if claims.token_type != TokenType::Access {
        return Err(JwtError::WrongTokenType {
            expected: TokenType::Access.as_str(),
            actual: claims.token_type.as_str(),
        });
    }

    Ok(claims)
}

/// Validates a token against the refresh secret and checks it's a refresh token
pub fn verify_refresh_token(token: &str, secret: &str) -> Result<Claims, JwtError> {
    let claims = verify_token(token, secret)?;

    if claims.token_type != TokenType::Refresh {
        return Err(JwtError::WrongTokenType {
            expected: TokenType::Refresh.as_str(),
            actual: claims.token_type.as_str(),
        });
    }

    Ok(claims)
}
