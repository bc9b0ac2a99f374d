use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use serde_json::json;
use std::sync::Arc;

use ob_core::events::topics;
use ob_core::state_machine::CampaignStateMachine;
use ob_core::types::{Campaign, CampaignState, CurrentUser};
use ob_core::CoreError;
use ob_db::campaigns::CampaignFilter;
use ob_db::attacks::ReorderOutcome;

use super::state::ApiState;
use super::types::{
    CampaignCreate, CampaignListQuery, CampaignMetrics, CampaignProgress, CampaignUpdate,
    CampaignValidateResponse, ReorderRequest,
};
use crate::access::{get_campaign_checked, require_any_project, validate_project_access};
use crate::pagination::{OffsetPaginated, Page, DEFAULT_LIMIT_CAMPAIGNS};
use crate::problem::{ApiResult, Problem};

/// GET /campaigns -- offset-paginated listing scoped to the caller's
/// projects. Filters: `name` (case-insensitive substring), `project_id`
/// (membership required).
pub(crate) async fn list_campaigns(
    State(state): State<Arc<ApiState>>,
    Extension(user): Extension<CurrentUser>,
    Query(query): Query<CampaignListQuery>,
) -> ApiResult<Json<OffsetPaginated<Campaign>>> {
    let page = Page::resolve(query.limit, query.offset, DEFAULT_LIMIT_CAMPAIGNS)?;
    require_any_project(&user)?;
    if let Some(project_id) = query.project_id {
        validate_project_access(&user, project_id)?;
    }

    let filter = CampaignFilter {
        project_ids: user.accessible_projects(),
        project_id: query.project_id,
        name: query.name.as_deref(),
    };
    let (items, total) = state.db.list_campaigns(&filter, page.limit, page.offset).await?;
    Ok(Json(OffsetPaginated::new(items, total, page)))
}

/// POST /campaigns -- create a campaign in DRAFT.
///
/// Validates project membership, hash-list existence, and that a
/// project-bound hash list belongs to the campaign's project.
pub(crate) async fn create_campaign(
    State(state): State<Arc<ApiState>>,
    Extension(user): Extension<CurrentUser>,
    Json(body): Json<CampaignCreate>,
) -> ApiResult<impl IntoResponse> {
    validate_project_access(&user, body.project_id)?;

    let hash_list = state
        .db
        .get_hash_list(body.hash_list_id)
        .await?
        .ok_or_else(|| CoreError::HashListNotFound(format!(
            "Hash list with ID {} not found",
            body.hash_list_id
        )))?;
    if let Some(list_project) = hash_list.project_id {
        if list_project != body.project_id {
            return Err(CoreError::ProjectAccessDenied(format!(
                "Hash list {} belongs to a different project",
                hash_list.id
            ))
            .into());
        }
    }

    let campaign = state
        .db
        .create_campaign(
            body.project_id,
            body.hash_list_id,
            &body.name,
            body.description.as_deref(),
            body.priority,
        )
        .await?;

    state
        .bus
        .publish(
            topics::CAMPAIGN_CREATED,
            json!({"campaign_id": campaign.id, "project_id": campaign.project_id}),
        )
        .await;
    tracing::info!(campaign_id = campaign.id, "campaign created");

    Ok((StatusCode::CREATED, Json(campaign)))
}

/// GET /campaigns/{id}
pub(crate) async fn get_campaign(
    State(state): State<Arc<ApiState>>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<i64>,
) -> ApiResult<Json<Campaign>> {
    let campaign = get_campaign_checked(&state.db, &user, id).await?;
    Ok(Json(campaign))
}

/// PATCH /campaigns/{id} -- update name, description, priority.
pub(crate) async fn update_campaign(
    State(state): State<Arc<ApiState>>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<i64>,
    Json(body): Json<CampaignUpdate>,
) -> ApiResult<Json<Campaign>> {
    get_campaign_checked(&state.db, &user, id).await?;
    let campaign = state
        .db
        .update_campaign(id, body.name.as_deref(), body.description.as_deref(), body.priority)
        .await?;
    state
        .bus
        .publish(topics::CAMPAIGN_UPDATED, json!({"campaign_id": id}))
        .await;
    Ok(Json(campaign))
}

/// DELETE /campaigns/{id} -- only from DRAFT, COMPLETED, ARCHIVED, or ERROR.
pub(crate) async fn delete_campaign(
    State(state): State<Arc<ApiState>>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<i64>,
) -> ApiResult<StatusCode> {
    let campaign = get_campaign_checked(&state.db, &user, id).await?;
    let deletable = matches!(
        campaign.state,
        CampaignState::Draft
            | CampaignState::Completed
            | CampaignState::Archived
            | CampaignState::Error
    );
    if !deletable {
        return Err(CoreError::InvalidResourceState(format!(
            "Cannot delete campaign in state '{}'",
            campaign.state
        ))
        .into());
    }

    state.db.delete_campaign(id).await?;
    state
        .bus
        .publish(topics::CAMPAIGN_DELETED, json!({"campaign_id": id}))
        .await;
    tracing::info!(campaign_id = id, "campaign deleted");
    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Lifecycle actions
// ---------------------------------------------------------------------------

/// Shared lifecycle driver. Campaign actions are idempotent at the service
/// layer: a campaign already in the action's target state is a 200 with the
/// current row, not a conflict.
async fn lifecycle(
    state: &ApiState,
    user: &CurrentUser,
    id: i64,
    action: &str,
) -> ApiResult<Json<Campaign>> {
    let campaign = get_campaign_checked(&state.db, user, id).await?;

    if let Some(target) = CampaignStateMachine::action_target(action) {
        if campaign.state == target {
            return Ok(Json(campaign));
        }
    }

    let to = CampaignStateMachine::validate_action(campaign.state, action).map_err(|err| {
        let valid = CampaignStateMachine::get_valid_transitions(campaign.state)
            .iter()
            .map(|s| s.as_str().to_string())
            .collect();
        Problem::from(CoreError::invalid_transition("campaign", &err, valid))
    })?;

    let updated = state.db.set_campaign_state(id, to).await?;
    let topic = match action {
        "start" | "resume" => topics::CAMPAIGN_STARTED,
        "pause" => topics::CAMPAIGN_PAUSED,
        _ => topics::CAMPAIGN_UPDATED,
    };
    state
        .bus
        .publish(topic, json!({"campaign_id": id, "state": to.as_str()}))
        .await;
    tracing::info!(campaign_id = id, action, state = %to, "campaign state changed");
    Ok(Json(updated))
}

pub(crate) async fn start_campaign(
    State(state): State<Arc<ApiState>>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<i64>,
) -> ApiResult<Json<Campaign>> {
    lifecycle(&state, &user, id, "start").await
}

pub(crate) async fn stop_campaign(
    State(state): State<Arc<ApiState>>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<i64>,
) -> ApiResult<Json<Campaign>> {
    lifecycle(&state, &user, id, "stop").await
}

pub(crate) async fn pause_campaign(
    State(state): State<Arc<ApiState>>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<i64>,
) -> ApiResult<Json<Campaign>> {
    lifecycle(&state, &user, id, "pause").await
}

pub(crate) async fn resume_campaign(
    State(state): State<Arc<ApiState>>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<i64>,
) -> ApiResult<Json<Campaign>> {
    lifecycle(&state, &user, id, "resume").await
}

pub(crate) async fn archive_campaign(
    State(state): State<Arc<ApiState>>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<i64>,
) -> ApiResult<Json<Campaign>> {
    lifecycle(&state, &user, id, "archive").await
}

pub(crate) async fn unarchive_campaign(
    State(state): State<Arc<ApiState>>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<i64>,
) -> ApiResult<Json<Campaign>> {
    lifecycle(&state, &user, id, "unarchive").await
}

// ---------------------------------------------------------------------------
// Pre-flight validation, reorder, progress, metrics
// ---------------------------------------------------------------------------

/// POST /campaigns/{id}/validate -- readiness report.
///
/// Never fails just because the campaign is not ready; problems are
/// communicated in the body as errors (blockers) and warnings (advisory).
pub(crate) async fn validate_campaign(
    State(state): State<Arc<ApiState>>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<i64>,
) -> ApiResult<Json<CampaignValidateResponse>> {
    let campaign = get_campaign_checked(&state.db, &user, id).await?;

    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    match state.db.get_hash_list(campaign.hash_list_id).await? {
        None => errors.push(format!("Hash list {} not found", campaign.hash_list_id)),
        Some(hash_list) if hash_list.is_unavailable => {
            errors.push(format!("Hash list '{}' is unavailable", hash_list.name));
        }
        Some(_) => {}
    }

    if state.db.count_attacks_for_campaign(id).await? == 0 {
        errors.push("Campaign has no attacks".into());
    }

    match campaign.state {
        CampaignState::Archived | CampaignState::Completed | CampaignState::Error => {
            errors.push(format!(
                "Campaign in state '{}' cannot be started",
                campaign.state
            ));
        }
        CampaignState::Active => warnings.push("Campaign is already active".into()),
        CampaignState::Paused => warnings.push("Campaign is paused and can be resumed".into()),
        CampaignState::Draft => {}
    }

    if state.db.count_active_agents().await? == 0 {
        warnings.push("No active agents available".into());
    }

    Ok(Json(CampaignValidateResponse {
        valid: errors.is_empty(),
        errors,
        warnings,
    }))
}

/// POST /campaigns/{id}/attacks/reorder -- rewrite attack positions in one
/// transaction. An unknown attack id rolls everything back.
pub(crate) async fn reorder_attacks(
    State(state): State<Arc<ApiState>>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<i64>,
    Json(body): Json<ReorderRequest>,
) -> ApiResult<Json<Vec<ob_core::types::Attack>>> {
    get_campaign_checked(&state.db, &user, id).await?;

    let order: Vec<(i64, i32)> = body
        .attack_order
        .iter()
        .map(|entry| (entry.attack_id, entry.priority))
        .collect();
    match state.db.reorder_attacks(id, &order).await? {
        ReorderOutcome::Done => {}
        ReorderOutcome::UnknownAttack(attack_id) => {
            return Err(CoreError::AttackNotFound(format!(
                "Attack with ID {attack_id} not found"
            ))
            .into());
        }
    }

    state
        .bus
        .publish(topics::CAMPAIGN_UPDATED, json!({"campaign_id": id}))
        .await;
    let attacks = state.db.attacks_for_campaign(id).await?;
    Ok(Json(attacks))
}

/// GET /campaigns/{id}/progress -- task counts and active agents.
pub(crate) async fn campaign_progress(
    State(state): State<Arc<ApiState>>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<i64>,
) -> ApiResult<Json<CampaignProgress>> {
    get_campaign_checked(&state.db, &user, id).await?;
    let counts = state.db.campaign_task_counts(id).await?;
    Ok(Json(CampaignProgress {
        active_agents: counts.active_agents,
        total_tasks: counts.total_tasks,
        pending_tasks: counts.pending_tasks,
        running_tasks: counts.running_tasks,
        completed_tasks: counts.completed_tasks,
        failed_tasks: counts.failed_tasks,
    }))
}

/// GET /campaigns/{id}/metrics -- crack statistics for the hash list plus
/// overall task progress.
pub(crate) async fn campaign_metrics(
    State(state): State<Arc<ApiState>>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<i64>,
) -> ApiResult<Json<CampaignMetrics>> {
    let campaign = get_campaign_checked(&state.db, &user, id).await?;
    let (total_hashes, cracked_hashes) = state.db.hash_list_counts(campaign.hash_list_id).await?;
    let counts = state.db.campaign_task_counts(id).await?;

    let percent_cracked = if total_hashes > 0 {
        cracked_hashes as f64 / total_hashes as f64 * 100.0
    } else {
        0.0
    };
    let progress_percent = if counts.total_tasks > 0 {
        counts.completed_tasks as f64 / counts.total_tasks as f64 * 100.0
    } else {
        0.0
    };

    Ok(Json(CampaignMetrics {
        total_hashes,
        cracked_hashes,
        uncracked_hashes: total_hashes - cracked_hashes,
        percent_cracked,
        progress_percent,
    }))
}
