/// Task query/mutation service
///
/// All operations take the requesting user's id and go through owner-filtered
/// queries, so a foreign task always fails as `TaskNotFound` and never leaks
/// its existence.

use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::task::{CreateTask, Task, TaskFilter, UpdateTask};

use super::ServiceError;

/// One page of results plus pagination totals
///
/// Serialized in camelCase for the browser client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    /// Items on this page
    pub items: Vec<T>,

    /// Total matching items across all pages
    pub total: i64,

    /// 1-based page number
    pub page: i64,

    /// Items per page
    pub page_size: i64,

    /// ceil(total / page_size); 0 when nothing matches
    pub total_pages: i64,
}

/// Computes ceil(total / page_size) for positive page sizes
fn total_pages(total: i64, page_size: i64) -> i64 {
    (total + page_size - 1) / page_size
}

/// Task service with the datastore connection injected
#[derive(Clone)]
pub struct TaskService {
    db: PgPool,
}

impl TaskService {
    /// Creates a new task service
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Lists one page of the user's tasks, newest first
    ///
    /// `filter.page` / `filter.page_size` are assumed already clamped by the
    /// HTTP boundary.
    pub async fn list(
        &self,
        user_id: Uuid,
        filter: TaskFilter,
    ) -> Result<Page<Task>, ServiceError> {
        let items = Task::list_page(&self.db, user_id, &filter).await?;
        let total = Task::count(&self.db, user_id, &filter).await?;

        Ok(Page {
            items,
            total,
            page: filter.page,
            page_size: filter.page_size,
            total_pages: total_pages(total, filter.page_size),
        })
    }

    /// Fetches a single task owned by the user
    ///
    /// # Errors
    ///
    /// - `ServiceError::TaskNotFound` when absent or owned by someone else
    pub async fn get_by_id(&self, user_id: Uuid, id: Uuid) -> Result<Task, ServiceError> {
        Task::find_by_id_and_user(&self.db, id, user_id)
            .await?
            .ok_or(ServiceError::TaskNotFound)
    }

    /// Creates a task for the user; status defaults to TODO
    pub async fn create(&self, user_id: Uuid, data: CreateTask) -> Result<Task, ServiceError> {
        Ok(Task::create(&self.db, user_id, data).await?)
    }

    /// Applies the provided fields to a task owned by the user
    ///
    /// The UPDATE itself is owner-filtered, so "doesn't exist" and "exists
    /// but not owned" produce the same `TaskNotFound`.
    pub async fn update(
        &self,
        user_id: Uuid,
        id: Uuid,
        data: UpdateTask,
    ) -> Result<Task, ServiceError> {
        Task::update(&self.db, id, user_id, data)
            .await?
            .ok_or(ServiceError::TaskNotFound)
    }

    /// Deletes a task owned by the user
    ///
    /// Deleting the same task twice yields `TaskNotFound` the second time.
    pub async fn delete(&self, user_id: Uuid, id: Uuid) -> Result<(), ServiceError> {
        let deleted = Task::delete(&self.db, id, user_id).await?;
        if !deleted {
            return Err(ServiceError::TaskNotFound);
        }
        Ok(())
    }

    /// Advances the task one step along TODO → IN_PROGRESS → DONE → TODO
    ///
    /// Single atomic read-modify-write in the datastore; no skipping or
    /// reverse transitions are exposed.
    pub async fn toggle(&self, user_id: Uuid, id: Uuid) -> Result<Task, ServiceError> {
        Task::toggle(&self.db, id, user_id)
            .await?
            .ok_or(ServiceError::TaskNotFound)
    }
}
