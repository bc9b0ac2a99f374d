use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use std::sync::Arc;

use ob_core::types::CurrentUser;

use super::state::ApiState;
use super::types::{TaskListQuery, TaskOut};
use crate::access::{get_task_checked, require_any_project};
use crate::pagination::{OffsetPaginated, Page, DEFAULT_LIMIT};
use crate::problem::ApiResult;

/// GET /tasks -- paginated; scoped through attack → campaign → project.
/// Filters: `attack_id`, `status`.
pub(crate) async fn list_tasks(
    State(state): State<Arc<ApiState>>,
    Extension(user): Extension<CurrentUser>,
    Query(query): Query<TaskListQuery>,
) -> ApiResult<Json<OffsetPaginated<TaskOut>>> {
    let page = Page::resolve(query.limit, query.offset, DEFAULT_LIMIT)?;
    require_any_project(&user)?;

    let (rows, total) = state
        .db
        .list_tasks(
            user.accessible_projects(),
            query.attack_id,
            query.status,
            page.limit,
            page.offset,
        )
        .await?;
    let items = rows.into_iter().map(TaskOut::from).collect();
    Ok(Json(OffsetPaginated::new(items, total, page)))
}

/// GET /tasks/{id}
pub(crate) async fn get_task(
    State(state): State<Arc<ApiState>>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<i64>,
) -> ApiResult<Json<TaskOut>> {
    let task = get_task_checked(&state.db, &user, id).await?;
    Ok(Json(TaskOut::from(task)))
}
