/// Authentication primitives
///
/// This module provides the low-level credential handling for Taskdeck:
///
/// # Modules
///
/// - [`password`]: Argon2id password hashing and verification
/// - [`jwt`]: Access/refresh JWT generation and validation
///
/// # Security Features
///
/// - **Password Hashing**: Argon2id with 64 MB memory, 3 iterations
/// - **JWT Tokens**: HS256 signing, distinct secrets per token type
/// - **Constant-time Comparison**: Verification via the hashing primitive
///
/// # Example
///
/// ```no_run
/// use taskdeck_shared::auth::password::{hash_password, verify_password};
/// use taskdeck_shared::auth::jwt::{sign_token, Claims, TokenType};
/// use chrono::Duration;
/// use uuid::Uuid;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let hash = hash_password("user_password")?;
/// assert!(verify_password("user_password", &hash)?);
///
/// let claims = Claims::new(Uuid::new_v4(), TokenType::Access, Duration::minutes(15));
/// let token = sign_token(&claims, "access-secret")?;
/// # Ok(())
/// # }
/// ```

pub mod jwt;
pub mod password;
