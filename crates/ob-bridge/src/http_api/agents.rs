use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use std::sync::Arc;

use ob_core::types::{Agent, CurrentUser};

use super::state::ApiState;
use super::types::{AgentListQuery, AgentUpdate};
use crate::access::{get_agent_checked, require_any_project};
use crate::pagination::{OffsetPaginated, Page, DEFAULT_LIMIT};
use crate::problem::ApiResult;

/// GET /agents -- paginated; agents are visible when bound to no project or
/// to one of the caller's projects.
pub(crate) async fn list_agents(
    State(state): State<Arc<ApiState>>,
    Extension(user): Extension<CurrentUser>,
    Query(query): Query<AgentListQuery>,
) -> ApiResult<Json<OffsetPaginated<Agent>>> {
    let page = Page::resolve(query.limit, query.offset, DEFAULT_LIMIT)?;
    require_any_project(&user)?;

    let (items, total) = state
        .db
        .list_agents(
            user.accessible_projects(),
            query.state,
            page.limit,
            page.offset,
        )
        .await?;
    Ok(Json(OffsetPaginated::new(items, total, page)))
}

/// GET /agents/{id}
pub(crate) async fn get_agent(
    State(state): State<Arc<ApiState>>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<i64>,
) -> ApiResult<Json<Agent>> {
    let agent = get_agent_checked(&state.db, &user, id).await?;
    Ok(Json(agent))
}

/// PATCH /agents/{id} -- toggle the enabled flag.
pub(crate) async fn update_agent(
    State(state): State<Arc<ApiState>>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<i64>,
    Json(body): Json<AgentUpdate>,
) -> ApiResult<Json<Agent>> {
    let agent = get_agent_checked(&state.db, &user, id).await?;
    let updated = match body.enabled {
        Some(enabled) => {
            let updated = state.db.set_agent_enabled(id, enabled).await?;
            tracing::info!(agent_id = id, enabled, "agent enabled flag changed");
            updated
        }
        None => agent,
    };
    Ok(Json(updated))
}

/// GET /agents/{id}/benchmarks
pub(crate) async fn get_agent_benchmarks(
    State(state): State<Arc<ApiState>>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<i64>,
) -> ApiResult<Json<serde_json::Value>> {
    let agent = get_agent_checked(&state.db, &user, id).await?;
    Ok(Json(agent.benchmarks))
}

/// GET /agents/{id}/capabilities
pub(crate) async fn get_agent_capabilities(
    State(state): State<Arc<ApiState>>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<i64>,
) -> ApiResult<Json<serde_json::Value>> {
    let agent = get_agent_checked(&state.db, &user, id).await?;
    Ok(Json(agent.capabilities))
}

/// GET /agents/{id}/errors
pub(crate) async fn get_agent_errors(
    State(state): State<Arc<ApiState>>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<i64>,
) -> ApiResult<Json<serde_json::Value>> {
    let agent = get_agent_checked(&state.db, &user, id).await?;
    Ok(Json(agent.error_log))
}
