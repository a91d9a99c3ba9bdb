/// Application state and router builder
///
/// This module defines the shared application state and provides
/// a function to build the Axum router with all routes and middleware.
///
/// # Example
///
/// ```no_run
/// use taskdeck_api::{app::AppState, config::Config};
/// use sqlx::PgPool;
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// let pool = PgPool::connect(&config.database.url).await?;
/// let state = AppState::new(pool, config);
/// let app = taskdeck_api::app::build_router(state);
/// # Ok(())
/// # }
/// ```

use crate::config::Config;
use axum::{
    extract::Request,
    http::{header, HeaderValue, Method},
    middleware::Next,
    response::Response,
    routing::{delete, get, patch, post},
    Router,
};
use chrono::Duration;
use sqlx::PgPool;
use std::sync::Arc;
use taskdeck_shared::auth::jwt;
use taskdeck_shared::service::auth::{AuthService, TokenConfig};
use taskdeck_shared::service::tasks::TaskService;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;
use uuid::Uuid;

/// The authenticated user, injected into request extensions by the JWT layer
#[derive(Debug, Clone, Copy)]
pub struct CurrentUser {
    /// Verified user ID from the access token's `sub` claim
    pub user_id: Uuid,
}

/// Shared application state
///
/// Cloned for each request handler via Axum's `State` extractor. Services
/// hold pool clones internally, so cloning is cheap.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: PgPool,

    /// Application configuration
    pub config: Arc<Config>,

    /// Auth orchestration service
    pub auth: AuthService,

    /// Task query/mutation service
    pub tasks: TaskService,
}

impl AppState {
    /// Creates new application state with services wired to the pool
    pub fn new(db: PgPool, config: Config) -> Self {
        let tokens = TokenConfig {
            access_secret: config.tokens.access_secret.clone(),
            refresh_secret: config.tokens.refresh_secret.clone(),
            access_ttl: Duration::minutes(config.tokens.access_ttl_minutes),
            refresh_ttl: Duration::days(config.tokens.refresh_ttl_days),
        };

        Self {
            auth: AuthService::new(db.clone(), tokens),
            tasks: TaskService::new(db.clone()),
            db,
            config: Arc::new(config),
        }
    }

    /// Gets the access token secret for verification
    pub fn access_secret(&self) -> &str {
        &self.config.tokens.access_secret
    }
}

/// Builds the complete Axum router with all routes and middleware
///
/// # Architecture
///
/// ```text
/// /
/// ├── /health                   # Health check (public)
/// ├── /auth/                    # Authentication (public, cookie-based refresh)
/// │   ├── POST /register
/// │   ├── POST /login
/// │   ├── POST /refresh
/// │   └── POST /logout
/// └── /tasks/                   # Task CRUD (Bearer access token)
///     ├── GET    /              # Paginated, filtered list
///     ├── POST   /
///     ├── GET    /:id
///     ├── PATCH  /:id
///     ├── DELETE /:id
///     └── POST   /:id/toggle
/// ```
///
/// # Middleware Stack
///
/// Applied in order (bottom to top):
/// 1. Request logging (tower-http TraceLayer)
/// 2. CORS restricted to the configured browser origin, with credentials
/// 3. JWT authentication on /tasks only
pub fn build_router(state: AppState) -> Router {
    use crate::routes;

    // Health check (public, no auth)
    let health_routes = Router::new().route("/health", get(routes::health::health_check));

    // Auth routes (public; refresh/logout read the refresh-token cookie)
    let auth_routes = Router::new()
        .route("/register", post(routes::auth::register))
        .route("/login", post(routes::auth::login))
        .route("/refresh", post(routes::auth::refresh))
        .route("/logout", post(routes::auth::logout));

    // Task routes (require a Bearer access token)
    let task_routes = Router::new()
        .route("/", get(routes::tasks::list))
        .route("/", post(routes::tasks::create))
        .route("/:id", get(routes::tasks::get_by_id))
        .route("/:id", patch(routes::tasks::update))
        .route("/:id", delete(routes::tasks::remove))
        .route("/:id/toggle", post(routes::tasks::toggle))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            jwt_auth_layer,
        ));

    // CORS: single configured browser origin, credentials allowed so the
    // refresh cookie survives cross-origin requests
    let origins: Vec<HeaderValue> = [state.config.api.frontend_origin.as_str()]
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .allow_credentials(true)
        .max_age(std::time::Duration::from_secs(3600));

    Router::new()
        .merge(health_routes)
        .nest("/auth", auth_routes)
        .nest("/tasks", task_routes)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors)
        .with_state(state)
}

/// JWT authentication middleware layer
///
/// Extracts and validates the Bearer access token from the Authorization
/// header, then injects [`CurrentUser`] into request extensions.
async fn jwt_auth_layer(
    state: axum::extract::State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, crate::error::ApiError> {
    let auth_header = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| {
            crate::error::ApiError::Unauthorized("Missing Authorization header".to_string())
        })?;

    let token = auth_header.strip_prefix("Bearer ").ok_or_else(|| {
        crate::error::ApiError::Unauthorized("Expected Bearer token".to_string())
    })?;

    // Signature, expiry, and token_type are all checked here
    let claims = jwt::verify_access_token(token, state.access_secret())?;

    req.extensions_mut().insert(CurrentUser {
        user_id: claims.sub,
    });

    Ok(next.run(req).await)
}
