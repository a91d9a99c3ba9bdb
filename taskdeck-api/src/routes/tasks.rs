/// Task CRUD and listing endpoints
///
/// Every handler runs behind the JWT layer, so `CurrentUser` is always
/// present, and every service call is scoped to that user. A task belonging
/// to someone else answers 404, exactly like a task that does not exist.
///
/// # Endpoints
///
/// - `GET /tasks` - Paginated, filtered list
/// - `GET /tasks/:id` - Fetch one task
/// - `POST /tasks` - Create task
/// - `PATCH /tasks/:id` - Partial update
/// - `DELETE /tasks/:id` - Delete task
/// - `POST /tasks/:id/toggle` - Advance the status cycle

use crate::{
    app::{AppState, CurrentUser},
    error::{ApiError, ApiResult},
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use serde::Deserialize;
use taskdeck_shared::models::task::{CreateTask, Task, TaskFilter, TaskStatus, UpdateTask};
use taskdeck_shared::service::tasks::Page;
use uuid::Uuid;
use validator::Validate;

/// Default items per page
const DEFAULT_PAGE_SIZE: i64 = 10;

/// Upper bound on items per page
const MAX_PAGE_SIZE: i64 = 100;

/// Query parameters for `GET /tasks`
///
/// `page` and `pageSize` parse leniently: a non-numeric value falls back to
/// the default instead of rejecting the request.
#[derive(Debug, Deserialize)]
pub struct ListQuery {
    /// 1-based page number (default 1)
    #[serde(default, deserialize_with = "lenient_i64")]
    pub page: Option<i64>,

    /// Items per page (default 10, max 100)
    #[serde(rename = "pageSize", default, deserialize_with = "lenient_i64")]
    pub page_size: Option<i64>,

    /// Optional exact status filter
    pub status: Option<TaskStatus>,

    /// Optional case-insensitive title search
    pub search: Option<String>,
}

/// Deserializes a query value as i64, treating anything non-numeric as absent
fn lenient_i64<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value: Option<String> = Option::deserialize(deserializer)?;
    Ok(value.and_then(|v| v.parse().ok()))
}

/// Clamps the page number to at least 1
fn clamp_page(page: Option<i64>) -> i64 {
    page.unwrap_or(1).max(1)
}

/// Clamps the page size into 1..=100
fn clamp_page_size(page_size: Option<i64>) -> i64 {
    page_size.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE)
}

/// Create task request body
#[derive(Debug, Deserialize, Validate)]
pub struct CreateTaskRequest {
    /// Title (1..=255 chars)
    #[validate(length(min = 1, max = 255, message = "Title must be 1 to 255 characters"))]
    pub title: String,

    /// Optional description (up to 2000 chars)
    #[validate(length(max = 2000, message = "Description must be at most 2000 characters"))]
    pub description: Option<String>,

    /// Initial status (defaults to TODO)
    pub status: Option<TaskStatus>,
}

/// Update task request body; all fields optional
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateTaskRequest {
    /// New title (1..=255 chars)
    #[validate(length(min = 1, max = 255, message = "Title must be 1 to 255 characters"))]
    pub title: Option<String>,

    /// New description (up to 2000 chars)
    #[validate(length(max = 2000, message = "Description must be at most 2000 characters"))]
    pub description: Option<String>,

    /// New status
    pub status: Option<TaskStatus>,
}

/// List the user's tasks with pagination, status filter, and title search
///
/// Page bounds are clamped here; the service assumes valid bounds.
pub async fn list(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Json<Page<Task>>> {
    let filter = TaskFilter {
        page: clamp_page(query.page),
        page_size: clamp_page_size(query.page_size),
        status: query.status,
        search: query.search,
    };

    let page = state.tasks.list(user.user_id, filter).await?;

    Ok(Json(page))
}

/// Fetch a single task
///
/// # Errors
///
/// - `404 Not Found`: No task with that id owned by the caller
pub async fn get_by_id(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Task>> {
    let task = state.tasks.get_by_id(user.user_id, id).await?;

    Ok(Json(task))
}

/// Create a task
///
/// # Errors
///
/// - `400 Bad Request`: Validation failed
pub async fn create(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Json(req): Json<CreateTaskRequest>,
) -> ApiResult<(StatusCode, Json<Task>)> {
    req.validate().map_err(ApiError::from_validation)?;

    let task = state
        .tasks
        .create(
            user.user_id,
            CreateTask {
                title: req.title,
                description: req.description,
                status: req.status,
            },
        )
        .await?;

    Ok((StatusCode::CREATED, Json(task)))
}

/// Apply a partial update to a task
///
/// # Errors
///
/// - `400 Bad Request`: Validation failed
/// - `404 Not Found`: No task with that id owned by the caller
pub async fn update(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateTaskRequest>,
) -> ApiResult<Json<Task>> {
    req.validate().map_err(ApiError::from_validation)?;

    let task = state
        .tasks
        .update(
            user.user_id,
            id,
            UpdateTask {
                title: req.title,
                description: req.description,
                status: req.status,
            },
        )
        .await?;

    Ok(Json(task))
}

/// Delete a task
///
/// Deleting twice yields 404 the second time.
///
/// # Errors
///
/// - `404 Not Found`: No task with that id owned by the caller
pub async fn remove(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    state.tasks.delete(user.user_id, id).await?;

    Ok(StatusCode::NO_CONTENT)
}

/// Advance a task's status along TODO → IN_PROGRESS → DONE → TODO
///
/// # Errors
///
/// - `404 Not Found`: No task with that id owned by the caller
pub async fn toggle(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Task>> {
    let task = state.tasks.toggle(user.user_id, id).await?;

    Ok(Json(task))
}
