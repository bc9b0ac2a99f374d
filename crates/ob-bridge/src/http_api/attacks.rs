use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

use ob_core::events::topics;
use ob_core::keyspace::{self, KeyspaceEstimate};
use ob_core::state_machine::AttackStateMachine;
use ob_core::types::{Attack, AttackMode, AttackState, CurrentUser};
use ob_core::CoreError;
use ob_db::attacks::{AttackPatch, NewAttack};
use ob_db::Db;

use super::state::ApiState;
use super::types::{
    AttackCreate, AttackListQuery, AttackPerformanceSummary, AttackUpdate,
    AttackValidateRequest, AttackValidateResponse, AvailabilityStatus, EstimateAttackRequest,
    ResourceAvailability,
};
use crate::access::{get_attack_checked, get_campaign_checked, require_any_project};
use crate::pagination::{OffsetPaginated, Page, DEFAULT_LIMIT};
use crate::problem::{ApiResult, Problem};

/// GET /attacks -- offset-paginated, join-scoped to accessible projects,
/// ordered by `(position, id)`.
pub(crate) async fn list_attacks(
    State(state): State<Arc<ApiState>>,
    Extension(user): Extension<CurrentUser>,
    Query(query): Query<AttackListQuery>,
) -> ApiResult<Json<OffsetPaginated<Attack>>> {
    let page = Page::resolve(query.limit, query.offset, DEFAULT_LIMIT)?;
    require_any_project(&user)?;

    let (items, total) = state
        .db
        .list_attacks(
            user.accessible_projects(),
            query.campaign_id,
            query.state,
            page.limit,
            page.offset,
        )
        .await?;
    Ok(Json(OffsetPaginated::new(items, total, page)))
}

/// Missing-by-ID resource references are mutation failures (404), unlike the
/// advisory classification in validate.
async fn require_resource(db: &Db, label: &str, id: Option<Uuid>) -> ApiResult<()> {
    if let Some(id) = id {
        if db.get_resource(id).await?.is_none() {
            return Err(CoreError::ResourceNotFound(format!("{label} {id} not found")).into());
        }
    }
    Ok(())
}

/// POST /attacks -- create an attack in PENDING at the end of the
/// campaign's ordering.
pub(crate) async fn create_attack(
    State(state): State<Arc<ApiState>>,
    Extension(user): Extension<CurrentUser>,
    Json(body): Json<AttackCreate>,
) -> ApiResult<impl IntoResponse> {
    get_campaign_checked(&state.db, &user, body.campaign_id).await?;

    require_resource(&state.db, "Wordlist", body.word_list_id).await?;
    require_resource(&state.db, "Rule list", body.rule_list_id).await?;
    require_resource(&state.db, "Mask list", body.mask_list_id).await?;
    if let Some(mask) = body.mask.as_deref() {
        keyspace::mask_keyspace(mask)?;
    }

    let attack = state
        .db
        .create_attack(&NewAttack {
            campaign_id: body.campaign_id,
            name: &body.name,
            attack_mode: body.attack_mode,
            word_list_id: body.word_list_id,
            rule_list_id: body.rule_list_id,
            mask_list_id: body.mask_list_id,
            mask: body.mask.as_deref(),
            left_rule: body.left_rule.as_deref(),
        })
        .await?;

    state
        .bus
        .publish(
            topics::ATTACK_CREATED,
            json!({"attack_id": attack.id, "campaign_id": attack.campaign_id}),
        )
        .await;
    tracing::info!(attack_id = attack.id, campaign_id = attack.campaign_id, "attack created");

    Ok((StatusCode::CREATED, Json(attack)))
}

/// GET /attacks/{id}
pub(crate) async fn get_attack(
    State(state): State<Arc<ApiState>>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<i64>,
) -> ApiResult<Json<Attack>> {
    let (attack, _) = get_attack_checked(&state.db, &user, id).await?;
    Ok(Json(attack))
}

/// PATCH /attacks/{id} -- rejected while the attack is RUNNING.
pub(crate) async fn update_attack(
    State(state): State<Arc<ApiState>>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<i64>,
    Json(body): Json<AttackUpdate>,
) -> ApiResult<Json<Attack>> {
    let (attack, _) = get_attack_checked(&state.db, &user, id).await?;
    if attack.state == AttackState::Running {
        return Err(CoreError::InvalidResourceState(
            "Cannot modify an attack while it is running".into(),
        )
        .into());
    }

    require_resource(&state.db, "Wordlist", body.word_list_id).await?;
    require_resource(&state.db, "Rule list", body.rule_list_id).await?;
    require_resource(&state.db, "Mask list", body.mask_list_id).await?;

    let updated = state
        .db
        .update_attack(
            id,
            &AttackPatch {
                name: body.name.as_deref(),
                word_list_id: body.word_list_id,
                rule_list_id: body.rule_list_id,
                mask_list_id: body.mask_list_id,
                mask: body.mask.as_deref(),
                left_rule: body.left_rule.as_deref(),
            },
        )
        .await?;
    state
        .bus
        .publish(topics::ATTACK_UPDATED, json!({"attack_id": id}))
        .await;
    Ok(Json(updated))
}

/// DELETE /attacks/{id} -- rejected while the attack is RUNNING.
pub(crate) async fn delete_attack(
    State(state): State<Arc<ApiState>>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<i64>,
) -> ApiResult<StatusCode> {
    let (attack, _) = get_attack_checked(&state.db, &user, id).await?;
    if attack.state == AttackState::Running {
        return Err(CoreError::InvalidResourceState(
            "Cannot delete an attack while it is running".into(),
        )
        .into());
    }

    state.db.delete_attack(id).await?;
    state
        .bus
        .publish(topics::ATTACK_DELETED, json!({"attack_id": id}))
        .await;
    tracing::info!(attack_id = id, "attack deleted");
    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Validation & estimation
// ---------------------------------------------------------------------------

/// Classify one referenced resource for the validation report.
async fn classify_resource(
    db: &Db,
    label: &str,
    id: Uuid,
    errors: &mut Vec<String>,
    warnings: &mut Vec<String>,
    availability: &mut Vec<ResourceAvailability>,
) -> ApiResult<()> {
    match db.get_resource(id).await? {
        None => {
            errors.push(format!("{label} {id} not found"));
            availability.push(ResourceAvailability {
                resource_id: id,
                status: AvailabilityStatus::NotFound,
                name: None,
            });
        }
        Some(resource) if !resource.is_uploaded => {
            warnings.push(format!(
                "{label} '{}' is not yet uploaded",
                resource.file_name
            ));
            availability.push(ResourceAvailability {
                resource_id: id,
                status: AvailabilityStatus::Unavailable,
                name: Some(resource.file_name),
            });
        }
        Some(resource) => {
            availability.push(ResourceAvailability {
                resource_id: id,
                status: AvailabilityStatus::Available,
                name: Some(resource.file_name),
            });
        }
    }
    Ok(())
}

/// POST /attacks/validate -- advisory validation of an attack config.
///
/// Resource problems never fail the request; they are classified into the
/// response: missing ⇒ error + `not_found`, present-but-pending ⇒ warning +
/// `unavailable`, else `available`.
pub(crate) async fn validate_attack(
    State(state): State<Arc<ApiState>>,
    Extension(user): Extension<CurrentUser>,
    Json(body): Json<AttackValidateRequest>,
) -> ApiResult<Json<AttackValidateResponse>> {
    if let Some(campaign_id) = body.campaign_id {
        get_campaign_checked(&state.db, &user, campaign_id).await?;
    }

    let mut errors = Vec::new();
    let mut warnings = Vec::new();
    let mut availability = Vec::new();

    if let Some(id) = body.word_list_id {
        classify_resource(&state.db, "Wordlist", id, &mut errors, &mut warnings, &mut availability)
            .await?;
    }
    if let Some(id) = body.rule_list_id {
        classify_resource(
            &state.db,
            "Rule list",
            id,
            &mut errors,
            &mut warnings,
            &mut availability,
        )
        .await?;
    }
    if let Some(id) = body.mask_list_id {
        classify_resource(
            &state.db,
            "Mask list",
            id,
            &mut errors,
            &mut warnings,
            &mut availability,
        )
        .await?;
    }

    match body.attack_mode {
        AttackMode::Dictionary => {
            if body.word_list_id.is_none() {
                errors.push("Dictionary attack requires a word list".into());
            }
        }
        AttackMode::Mask => {
            if body.mask.is_none() && body.mask_list_id.is_none() {
                errors.push("Mask attack requires a mask or mask list".into());
            }
        }
        AttackMode::HybridDictMask | AttackMode::HybridMaskDict => {
            if body.word_list_id.is_none() {
                errors.push("Hybrid attack requires a word list".into());
            }
            if body.mask.is_none() && body.mask_list_id.is_none() {
                errors.push("Hybrid attack requires a mask or mask list".into());
            }
        }
    }

    if let Some(mask) = body.mask.as_deref() {
        if let Err(err) = keyspace::mask_keyspace(mask) {
            errors.push(err.detail().to_string());
        }
    }

    Ok(Json(AttackValidateResponse {
        valid: errors.is_empty(),
        errors,
        warnings,
        resource_availability: availability,
    }))
}

/// POST /attacks/estimate -- keyspace and complexity for an attack config.
pub(crate) async fn estimate_attack(
    State(state): State<Arc<ApiState>>,
    Extension(_user): Extension<CurrentUser>,
    Json(body): Json<EstimateAttackRequest>,
) -> ApiResult<Json<KeyspaceEstimate>> {
    let wordlist_lines = match body.word_list_id {
        Some(id) => state
            .db
            .get_resource(id)
            .await?
            .map(|r| r.line_count.max(0) as u64)
            .unwrap_or(0),
        None => 0,
    };
    let rule_lines = match body.rule_list_id {
        Some(id) => state
            .db
            .get_resource(id)
            .await?
            .map(|r| r.line_count.max(0) as u64)
            .unwrap_or(0),
        None => 0,
    };

    let estimate = keyspace::estimate(
        body.attack_mode,
        body.mask.as_deref(),
        wordlist_lines,
        rule_lines,
    )?;
    Ok(Json(estimate))
}

// ---------------------------------------------------------------------------
// Lifecycle actions (strict)
// ---------------------------------------------------------------------------

/// Shared lifecycle driver. Attack lifecycle is strict: no-op transitions
/// are 409 conflicts, unlike campaigns.
async fn lifecycle(
    state: &ApiState,
    user: &CurrentUser,
    id: i64,
    action: &str,
) -> ApiResult<Json<Attack>> {
    let (attack, _) = get_attack_checked(&state.db, user, id).await?;

    let to = AttackStateMachine::validate_action(attack.state, action).map_err(|err| {
        let valid = AttackStateMachine::get_valid_transitions(attack.state)
            .iter()
            .map(|s| s.as_str().to_string())
            .collect();
        Problem::from(CoreError::invalid_transition("attack", &err, valid))
    })?;

    let updated = state.db.set_attack_state(id, to).await?;
    let topic = match action {
        "start" => topics::ATTACK_STARTED,
        _ => topics::ATTACK_UPDATED,
    };
    state
        .bus
        .publish(topic, json!({"attack_id": id, "state": to.as_str()}))
        .await;
    tracing::info!(attack_id = id, action, state = %to, "attack state changed");
    Ok(Json(updated))
}

pub(crate) async fn start_attack(
    State(state): State<Arc<ApiState>>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<i64>,
) -> ApiResult<Json<Attack>> {
    lifecycle(&state, &user, id, "start").await
}

/// Stop maps onto `abort`: RUNNING or PAUSED → ABANDONED.
pub(crate) async fn stop_attack(
    State(state): State<Arc<ApiState>>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<i64>,
) -> ApiResult<Json<Attack>> {
    lifecycle(&state, &user, id, "abort").await
}

pub(crate) async fn pause_attack(
    State(state): State<Arc<ApiState>>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<i64>,
) -> ApiResult<Json<Attack>> {
    lifecycle(&state, &user, id, "pause").await
}

pub(crate) async fn resume_attack(
    State(state): State<Arc<ApiState>>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<i64>,
) -> ApiResult<Json<Attack>> {
    lifecycle(&state, &user, id, "resume").await
}

// ---------------------------------------------------------------------------
// Metrics
// ---------------------------------------------------------------------------

/// GET /attacks/{id}/metrics -- rough performance summary derived from the
/// attack's tasks and its campaign's hash list.
pub(crate) async fn attack_metrics(
    State(state): State<Arc<ApiState>>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<i64>,
) -> ApiResult<Json<AttackPerformanceSummary>> {
    let (attack, campaign) = get_attack_checked(&state.db, &user, id).await?;

    let tasks = state.db.tasks_for_attack(attack.id).await?;
    let agent_count = state.db.agent_count_for_attack(attack.id).await?;
    let (total_hashes, _) = state.db.hash_list_counts(campaign.hash_list_id).await?;

    let now = chrono::Utc::now();
    let mut hashes_per_sec = 0.0;
    let mut progress_sum = 0.0;
    for task in &tasks {
        let elapsed = (now - task.created_at).num_seconds().max(1) as f64;
        hashes_per_sec += task.keyspace_processed() as f64 / elapsed;
        progress_sum += task.progress_percent();
    }
    let progress_percent = if tasks.is_empty() {
        0.0
    } else {
        progress_sum / tasks.len() as f64
    };

    Ok(Json(AttackPerformanceSummary {
        attack_id: attack.id,
        hashes_per_sec,
        total_hashes,
        agent_count,
        progress_percent,
    }))
}
