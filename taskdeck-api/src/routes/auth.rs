/// Authentication endpoints
///
/// The access token travels in response bodies and Bearer headers; the
/// refresh token only ever travels in an httpOnly cookie scoped to `/auth`,
/// so browser scripts never see it.
///
/// # Endpoints
///
/// - `POST /auth/register` - Register new user (201, sets refresh cookie)
/// - `POST /auth/login` - Login (200, sets refresh cookie)
/// - `POST /auth/refresh` - Mint a new access token from the cookie
/// - `POST /auth/logout` - Revoke the refresh token and clear the cookie

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
};
use axum::{extract::State, http::StatusCode, Json};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::{Deserialize, Serialize};
use taskdeck_shared::models::user::PublicUser;
use validator::Validate;

/// Name of the refresh-token cookie
pub const REFRESH_COOKIE_NAME: &str = "refreshToken";

/// Register / login request body
#[derive(Debug, Deserialize, Validate)]
pub struct CredentialsRequest {
    /// Email address
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    /// Password
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,
}

/// Login request body
///
/// Unlike registration, no password-length rule: accounts created before a
/// policy change must still be able to log in.
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    /// Email address
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    /// Password
    pub password: String,
}

/// Register / login response body
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    /// The authenticated user (id and email only)
    pub user: PublicUser,

    /// Short-lived access token for the Authorization header
    pub access_token: String,
}

/// Refresh response body
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshResponse {
    /// New access token
    pub access_token: String,
}

/// Logout response body
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    /// Human-readable confirmation
    pub message: String,
}

/// Builds the refresh-token cookie: httpOnly, SameSite=Lax, scoped to
/// `/auth`, Secure in production
fn refresh_cookie(token: String, production: bool) -> Cookie<'static> {
    Cookie::build((REFRESH_COOKIE_NAME, token))
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(production)
        .path("/auth")
        .build()
}

/// Register a new user
///
/// # Endpoint
///
/// ```text
/// POST /auth/register
/// Content-Type: application/json
///
/// { "email": "user@example.com", "password": "password1" }
/// ```
///
/// # Errors
///
/// - `400 Bad Request`: Validation failed, or email already in use
/// - `500 Internal Server Error`: Server error
pub async fn register(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(req): Json<CredentialsRequest>,
) -> ApiResult<(StatusCode, CookieJar, Json<AuthResponse>)> {
    req.validate().map_err(ApiError::from_validation)?;

    let session = state.auth.register(&req.email, &req.password).await?;

    let jar = jar.add(refresh_cookie(
        session.refresh_token,
        state.config.api.production,
    ));

    Ok((
        StatusCode::CREATED,
        jar,
        Json(AuthResponse {
            user: session.user,
            access_token: session.access_token,
        }),
    ))
}

/// Login with email and password
///
/// Unknown email and wrong password both answer the same 401, so the
/// endpoint cannot be used to enumerate accounts.
///
/// # Errors
///
/// - `400 Bad Request`: Validation failed
/// - `401 Unauthorized`: Invalid credentials
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(req): Json<LoginRequest>,
) -> ApiResult<(CookieJar, Json<AuthResponse>)> {
    req.validate().map_err(ApiError::from_validation)?;

    let session = state.auth.login(&req.email, &req.password).await?;

    let jar = jar.add(refresh_cookie(
        session.refresh_token,
        state.config.api.production,
    ));

    Ok((
        jar,
        Json(AuthResponse {
            user: session.user,
            access_token: session.access_token,
        }),
    ))
}

/// Exchange the refresh cookie for a new access token
///
/// The refresh token itself is not rotated; it stays valid until natural
/// expiry or logout.
///
/// # Errors
///
/// - `401 Unauthorized`: Missing, invalid, expired, or revoked refresh token
pub async fn refresh(
    State(state): State<AppState>,
    jar: CookieJar,
) -> ApiResult<Json<RefreshResponse>> {
    let token = jar
        .get(REFRESH_COOKIE_NAME)
        .map(|c| c.value().to_string())
        .ok_or_else(|| ApiError::Unauthorized("Missing refresh token".to_string()))?;

    let access_token = state.auth.refresh(&token).await?;

    Ok(Json(RefreshResponse { access_token }))
}

/// Revoke the refresh token and clear its cookie
///
/// Always succeeds: logging out without a cookie, or with an already-revoked
/// token, is a no-op.
pub async fn logout(
    State(state): State<AppState>,
    jar: CookieJar,
) -> ApiResult<(CookieJar, Json<MessageResponse>)> {
    if let Some(cookie) = jar.get(REFRESH_COOKIE_NAME) {
        state.auth.logout(cookie.value()).await?;
    }

    // Removal cookie must carry the same path the original was set with
    let jar = jar.remove(Cookie::build((REFRESH_COOKIE_NAME, "")).path("/auth").build());

    Ok((
        jar,
        Json(MessageResponse {
            message: "Logged out".to_string(),
        }),
    ))
}
