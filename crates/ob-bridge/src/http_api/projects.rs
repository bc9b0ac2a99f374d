use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use std::sync::Arc;

use ob_core::types::{CurrentUser, Project};
use ob_core::CoreError;

use super::state::ApiState;
use super::types::PageOnlyQuery;
use crate::access::{require_any_project, validate_project_access};
use crate::pagination::{OffsetPaginated, Page, DEFAULT_LIMIT};
use crate::problem::ApiResult;

/// GET /projects -- the caller's accessible projects.
pub(crate) async fn list_projects(
    State(state): State<Arc<ApiState>>,
    Extension(user): Extension<CurrentUser>,
    Query(query): Query<PageOnlyQuery>,
) -> ApiResult<Json<OffsetPaginated<Project>>> {
    let page = Page::resolve(query.limit, query.offset, DEFAULT_LIMIT)?;
    require_any_project(&user)?;

    let (items, total) = state
        .db
        .list_projects(user.accessible_projects(), page.limit, page.offset)
        .await?;
    Ok(Json(OffsetPaginated::new(items, total, page)))
}

/// GET /projects/{id} -- membership required.
pub(crate) async fn get_project(
    State(state): State<Arc<ApiState>>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<i64>,
) -> ApiResult<Json<Project>> {
    let project = state
        .db
        .get_project(id)
        .await?
        .ok_or_else(|| CoreError::ProjectNotFound(format!("Project with ID {id} not found")))?;
    validate_project_access(&user, project.id)?;
    Ok(Json(project))
}
