/// Task model and database operations
///
/// Tasks are owned exclusively by their creating user: every query filters by
/// `user_id`, so a task belonging to someone else is indistinguishable from a
/// task that does not exist.
///
/// # Status Cycle
///
/// ```text
/// TODO → IN_PROGRESS → DONE → TODO
/// ```
///
/// # Schema
///
/// ```sql
/// CREATE TYPE task_status AS ENUM ('TODO', 'IN_PROGRESS', 'DONE');
///
/// CREATE TABLE tasks (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     title VARCHAR(255) NOT NULL,
///     description VARCHAR(2000),
///     status task_status NOT NULL DEFAULT 'TODO',
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

/// Task status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "task_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    /// Task has not been started
    Todo,

    /// Task is being worked on
    InProgress,

    /// Task is finished
    Done,
}

impl TaskStatus {
    /// Converts status to its wire/database string
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Todo => "TODO",
            TaskStatus::InProgress => "IN_PROGRESS",
            TaskStatus::Done => "DONE",
        }
    }

    /// The next status in the fixed toggle cycle
    ///
    /// Applying this three times returns any status to itself.
    pub fn next(&self) -> TaskStatus {
        match self {
            TaskStatus::Todo => TaskStatus::InProgress,
            TaskStatus::InProgress => TaskStatus::Done,
            TaskStatus::Done => TaskStatus::Todo,
        }
    }
}

/// Task model
///
/// Serialized in camelCase to match the JSON the browser client consumes.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    /// Unique task ID
    pub id: Uuid,

    /// Owning user; immutable after creation
    pub user_id: Uuid,

    /// Title (1..=255 chars, enforced at the validation boundary)
    pub title: String,

    /// Optional description (up to 2000 chars)
    pub description: Option<String>,

    /// Current status
    pub status: TaskStatus,

    /// When the task was created
    pub created_at: DateTime<Utc>,

    /// When the task was last updated
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a new task
#[derive(Debug, Clone)]
pub struct CreateTask {
    /// Task title
    pub title: String,

    /// Optional description
    pub description: Option<String>,

    /// Initial status (defaults to TODO)
    pub status: Option<TaskStatus>,
}

/// Input for updating a task; only provided fields are applied
#[derive(Debug, Clone, Default)]
pub struct UpdateTask {
    /// New title
    pub title: Option<String>,

    /// New description
    pub description: Option<String>,

    /// New status
    pub status: Option<TaskStatus>,
}

/// Filter for listing tasks
///
/// `page` and `page_size` are assumed already clamped by the HTTP boundary
/// (page >= 1, page_size in 1..=100).
#[derive(Debug, Clone)]
pub struct TaskFilter {
    /// 1-based page number
    pub page: i64,

    /// Items per page
    pub page_size: i64,

    /// Optional exact status match
    pub status: Option<TaskStatus>,

    /// Optional case-insensitive substring match on the title
    pub search: Option<String>,
}

/// Escapes ILIKE metacharacters so a search term matches literally
///
/// `%` and `_` in user input must not act as wildcards.
fn escape_like(term: &str) -> String {
    term.replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

impl Task {
    /// Creates a new task for a user
    pub async fn create(
        pool: &PgPool,
        user_id: Uuid,
        data: CreateTask,
    ) -> Result<Self, sqlx::Error> {
        let task = sqlx::query_as::<_, Task>(
            r#"
            INSERT INTO tasks (user_id, title, description, status)
            VALUES ($1, $2, $3, $4)
            RETURNING id, user_id, title, description, status, created_at, updated_at
            "#,
        )
        .bind(user_id)
        .bind(data.title)
        .bind(data.description)
        .bind(data.status.unwrap_or(TaskStatus::Todo))
        .fetch_one(pool)
        .await?;

        Ok(task)
    }

    /// Finds a task by ID with owner isolation
    ///
    /// Returns `None` both when the task is absent and when it belongs to a
    /// different user, so callers cannot learn whether a foreign task exists.
    pub async fn find_by_id_and_user(
        pool: &PgPool,
        id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        let task = sqlx::query_as::<_, Task>(
            r#"
            SELECT id, user_id, title, description, status, created_at, updated_at
            FROM tasks
            WHERE id = $1 AND user_id = $2
            "#,
        )
        .bind(id)
        .bind(user_id)
        .fetch_optional(pool)
        .await?;

        Ok(task)
    }

    /// Lists one page of a user's tasks, newest first
    pub async fn list_page(
        pool: &PgPool,
        user_id: Uuid,
        filter: &TaskFilter,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let offset = (filter.page - 1) * filter.page_size;

        let tasks = sqlx::query_as::<_, Task>(
            r#"
            SELECT id, user_id, title, description, status, created_at, updated_at
            FROM tasks
            WHERE user_id = $1
              AND ($2::task_status IS NULL OR status = $2)
              AND ($3::text IS NULL OR title ILIKE '%' || $3 || '%' ESCAPE '\')
            ORDER BY created_at DESC
            LIMIT $4 OFFSET $5
            "#,
        )
        .bind(user_id)
        .bind(filter.status)
        .bind(filter.search.as_deref().map(escape_like))
        .bind(filter.page_size)
        .bind(offset)
        .fetch_all(pool)
        .await?;

        Ok(tasks)
    }

    /// Counts a user's tasks under the same filter as [`Task::list_page`]
    pub async fn count(
        pool: &PgPool,
        user_id: Uuid,
        filter: &TaskFilter,
    ) -> Result<i64, sqlx::Error> {
        let (count,): (i64,) = sqlx::query_as(
            r#"
            SELECT COUNT(*)
            FROM tasks
            WHERE user_id = $1
              AND ($2::task_status IS NULL OR status = $2)
              AND ($3::text IS NULL OR title ILIKE '%' || $3 || '%' ESCAPE '\')
            "#,
        )
        .bind(user_id)
        .bind(filter.status)
        .bind(filter.search.as_deref().map(escape_like))
        .fetch_one(pool)
        .await?;

        Ok(count)
    }

    /// Updates a task's provided fields, bumping `updated_at`
    ///
    /// Returns `None` when no task with that id is owned by the user.
    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        user_id: Uuid,
        data: UpdateTask,
    ) -> Result<Option<Self>, sqlx::Error> {
        // Build dynamic update query based on which fields are present
        let mut query = String::from("UPDATE tasks SET updated_at = NOW()");
        let mut bind_count = 2;

        if data.title.is_some() {
            bind_count += 1;
            query.push_str(&format!(", title = ${}", bind_count));
        }
        if data.description.is_some() {
            bind_count += 1;
            query.push_str(&format!(", description = ${}", bind_count));
        }
        if data.status.is_some() {
            bind_count += 1;
            query.push_str(&format!(", status = ${}", bind_count));
        }

        query.push_str(
            " WHERE id = $1 AND user_id = $2 \
             RETURNING id, user_id, title, description, status, created_at, updated_at",
        );

        let mut q = sqlx::query_as::<_, Task>(&query).bind(id).bind(user_id);

        if let Some(title) = data.title {
            q = q.bind(title);
        }
        if let Some(description) = data.description {
            q = q.bind(description);
        }
        if let Some(status) = data.status {
            q = q.bind(status);
        }

        let task = q.fetch_optional(pool).await?;

        Ok(task)
    }

    /// Deletes a task owned by the user
    ///
    /// Returns true if a row was removed.
    pub async fn delete(pool: &PgPool, id: Uuid, user_id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM tasks WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Advances a task's status one step along the toggle cycle
    ///
    /// Performed as a single UPDATE so two concurrent toggles cannot read the
    /// same starting status. Returns `None` when no task with that id is
    /// owned by the user.
    pub async fn toggle(
        pool: &PgPool,
        id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        let task = sqlx::query_as::<_, Task>(
            r#"
            UPDATE tasks
            SET status = CASE status
                    WHEN 'TODO'::task_status THEN 'IN_PROGRESS'::task_status
                    WHEN 'IN_PROGRESS'::task_status THEN 'DONE'::task_status
                    ELSE 'TODO'::task_status
                END,
                updated_at = NOW()
            WHERE id = $1 AND user_id = $2
            RETURNING id, user_id, title, description, status, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(user_id)
        .fetch_optional(pool)
        .await?;

        Ok(task)
    }
}
