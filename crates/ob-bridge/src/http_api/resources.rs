use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use ob_core::events::topics;
use ob_core::types::CurrentUser;
use ob_core::CoreError;
use ob_db::resources::{NewResource, ResourcePatch, ResourceScope};
use ob_storage::StorageError;

use super::state::ApiState;
use super::types::{
    AttackBasic, InitiateUploadRequest, InitiateUploadResponse, PreviewQuery, ResourceDetail,
    ResourceListQuery, ResourceOut, ResourceOutBase, ResourcePreview, ResourceUpdateRequest,
};
use crate::access::{get_resource_checked, validate_project_access};
use crate::pagination::{OffsetPaginated, Page, DEFAULT_LIMIT};
use crate::problem::ApiResult;
use crate::workers;

const MAX_PREVIEW_LINES: i64 = 500;
/// Byte budget per requested preview line when streaming from storage.
const PREVIEW_BYTES_PER_LINE: u64 = 200;

/// GET /resources -- paginated listing.
///
/// Superusers see everything; everyone else sees unrestricted resources
/// plus those of their projects. Ephemeral types never appear. Every item
/// carries its attack usage count.
pub(crate) async fn list_resources(
    State(state): State<Arc<ApiState>>,
    Extension(user): Extension<CurrentUser>,
    Query(query): Query<ResourceListQuery>,
) -> ApiResult<Json<OffsetPaginated<ResourceOut>>> {
    let page = Page::resolve(query.limit, query.offset, DEFAULT_LIMIT)?;

    if let Some(project_id) = query.project_id {
        if !user.is_superuser() {
            validate_project_access(&user, project_id)?;
        }
    }

    let scope = if user.is_superuser() {
        ResourceScope::All
    } else {
        ResourceScope::Projects(user.accessible_projects())
    };
    let (rows, total) = state
        .db
        .list_resources(
            &scope,
            query.project_id,
            query.resource_type,
            query.search.as_deref(),
            page.limit,
            page.offset,
        )
        .await?;

    let mut items = Vec::with_capacity(rows.len());
    for resource in rows {
        let usage_count = state
            .db
            .resource_usage_count(resource.id, resource.guid)
            .await?;
        items.push(ResourceOut::from_resource(resource, usage_count));
    }
    Ok(Json(OffsetPaginated::new(items, total, page)))
}

/// GET /resources/{id} -- detail with the deduplicated referencing attacks.
pub(crate) async fn get_resource(
    State(state): State<Arc<ApiState>>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<ResourceDetail>> {
    let resource = get_resource_checked(&state.db, &user, id).await?;
    let referencing = state
        .db
        .attacks_using_resource(resource.id, resource.guid)
        .await?;

    let mut attacks: Vec<AttackBasic> = Vec::new();
    let mut seen = std::collections::HashSet::new();
    for attack in &referencing {
        if seen.insert(attack.id) {
            attacks.push(AttackBasic::from(attack));
        }
    }

    Ok(Json(ResourceDetail {
        resource: ResourceOutBase::from(resource),
        attacks,
    }))
}

/// Decode preview bytes with the resource's line encoding, replacing
/// undecodable sequences.
fn decode_preview(bytes: &[u8], encoding: Option<&str>) -> String {
    match encoding.map(str::to_ascii_lowercase).as_deref() {
        Some("latin-1") | Some("iso-8859-1") => bytes.iter().map(|&b| b as char).collect(),
        _ => String::from_utf8_lossy(bytes).into_owned(),
    }
}

/// GET /resources/{id}/preview -- first N lines of the resource.
///
/// Ephemeral and pending resources read their inline content; file-backed
/// resources stream a bounded prefix from storage. Storage trouble is not a
/// request failure: the response carries `preview_error` instead.
pub(crate) async fn preview_resource(
    State(state): State<Arc<ApiState>>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
    Query(query): Query<PreviewQuery>,
) -> ApiResult<Json<ResourcePreview>> {
    let lines = query.lines.unwrap_or(100);
    if !(1..=MAX_PREVIEW_LINES).contains(&lines) {
        return Err(crate::problem::Problem::http(
            422,
            format!("lines must be between 1 and {MAX_PREVIEW_LINES}, got {lines}"),
        ));
    }
    let resource = get_resource_checked(&state.db, &user, id).await?;

    let mut preview_lines: Vec<String> = Vec::new();
    let mut preview_error: Option<String> = None;

    if resource.resource_type.is_ephemeral() || !resource.is_uploaded {
        match resource.content_lines() {
            Some(content) => {
                preview_lines = content.into_iter().take(lines as usize).collect();
            }
            None => preview_error = Some("Resource has no content available for preview".into()),
        }
    } else {
        let budget = lines as u64 * PREVIEW_BYTES_PER_LINE;
        match state
            .storage
            .get_object(&resource.id.to_string(), Some(budget))
            .await
        {
            Ok(bytes) => {
                let text = decode_preview(&bytes, resource.line_encoding.as_deref());
                preview_lines = text
                    .lines()
                    .take(lines as usize)
                    .map(str::to_string)
                    .collect();
            }
            Err(err) => {
                preview_error = Some(format!("Failed to read file from storage: {err}"));
            }
        }
    }

    Ok(Json(ResourcePreview {
        resource: ResourceOutBase::from(resource),
        preview_lines,
        preview_error,
        max_preview_lines: lines,
    }))
}

/// PATCH /resources/{id} -- metadata only. Moving a resource to another
/// project requires membership of the target project (superusers bypass).
pub(crate) async fn update_resource(
    State(state): State<Arc<ApiState>>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
    Json(body): Json<ResourceUpdateRequest>,
) -> ApiResult<Json<ResourceOut>> {
    let resource = get_resource_checked(&state.db, &user, id).await?;

    if let Some(new_project) = body.project_id {
        if Some(new_project) != resource.project_id && !user.is_superuser() {
            validate_project_access(&user, new_project)?;
        }
    }

    let tags = body.tags.as_deref();
    let updated = state
        .db
        .update_resource_metadata(
            id,
            &ResourcePatch {
                file_name: body.file_name.as_deref(),
                file_label: body.file_label.as_deref(),
                line_format: body.line_format.as_deref(),
                line_encoding: body.line_encoding.as_deref(),
                tags,
                project_id: body.project_id,
            },
        )
        .await?;
    let usage_count = state.db.resource_usage_count(updated.id, updated.guid).await?;
    Ok(Json(ResourceOut::from_resource(updated, usage_count)))
}

/// DELETE /resources/{id} -- blocked while any attack references the
/// resource. Removes the object first, then the row.
pub(crate) async fn delete_resource(
    State(state): State<Arc<ApiState>>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    let resource = get_resource_checked(&state.db, &user, id).await?;

    let usage = state
        .db
        .resource_usage_count(resource.id, resource.guid)
        .await?;
    if usage > 0 {
        return Err(CoreError::InvalidResourceState(
            "Cannot delete resource: it is used by one or more attacks".into(),
        )
        .into());
    }

    if resource.is_uploaded {
        state.storage.remove_object(&resource.id.to_string()).await?;
    }
    state.db.delete_resource(id).await?;
    state
        .bus
        .publish(topics::RESOURCE_DELETED, json!({"resource_id": id}))
        .await;
    tracing::info!(resource_id = %id, "resource deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// DELETE /resources/{id}/cancel -- abort a pending upload: delete the
/// object (when any) and drop the row. Uploaded resources must use the
/// standard delete.
pub(crate) async fn cancel_resource_upload(
    State(state): State<Arc<ApiState>>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    let resource = get_resource_checked(&state.db, &user, id).await?;
    if resource.is_uploaded {
        return Err(CoreError::InvalidResourceState(
            "Cannot cancel resource that is already uploaded. Use DELETE to remove uploaded resources."
                .into(),
        )
        .into());
    }

    match state.storage.remove_object(&resource.id.to_string()).await {
        Ok(()) | Err(StorageError::NotFound(_)) => {}
        Err(err) => return Err(err.into()),
    }
    state.db.delete_resource(id).await?;
    tracing::info!(resource_id = %id, "pending resource cancelled");
    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Two-phase upload
// ---------------------------------------------------------------------------

/// POST /resources/initiate-upload -- phase one.
///
/// Creates the provisional row (`is_uploaded = false`), presigns a PUT URL
/// keyed by the resource id, and schedules the deferred verification task.
pub(crate) async fn initiate_upload(
    State(state): State<Arc<ApiState>>,
    Extension(user): Extension<CurrentUser>,
    Json(body): Json<InitiateUploadRequest>,
) -> ApiResult<impl IntoResponse> {
    if let Some(project_id) = body.project_id {
        validate_project_access(&user, project_id)?;
    }

    let resource_id = Uuid::new_v4();
    let tags = body.tags.unwrap_or_default();
    let resource = state
        .db
        .create_resource(&NewResource {
            id: resource_id,
            project_id: body.project_id,
            file_name: &body.file_name,
            file_label: body.file_label.as_deref(),
            resource_type: body.resource_type,
            line_format: body.line_format.as_deref(),
            line_encoding: body.line_encoding.as_deref(),
            tags: &tags,
        })
        .await?;

    let expires = state.settings.presign_expiry_seconds;
    let upload_url = state
        .storage
        .presign_put(&resource.id.to_string(), Duration::from_secs(expires))
        .await?;

    // Deferred verification: takes the id by value and its own handles, so
    // the request can finish independently.
    tokio::spawn(workers::verify_upload(
        state.db.clone(),
        state.storage.clone(),
        resource.id,
        state.settings.resource_upload_timeout_seconds,
    ));

    tracing::info!(resource_id = %resource.id, file_name = %body.file_name, "upload initiated");
    Ok((
        StatusCode::CREATED,
        Json(InitiateUploadResponse {
            resource_id: resource.id,
            upload_url,
            expires_in_seconds: expires,
        }),
    ))
}

/// POST /resources/{id}/confirm-upload -- phase two.
///
/// Confirms the object landed, enforces the size limit, and flips the row
/// to uploaded.
pub(crate) async fn confirm_upload(
    State(state): State<Arc<ApiState>>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<ResourceOut>> {
    let resource = get_resource_checked(&state.db, &user, id).await?;
    if resource.is_uploaded {
        let usage = state
            .db
            .resource_usage_count(resource.id, resource.guid)
            .await?;
        return Ok(Json(ResourceOut::from_resource(resource, usage)));
    }

    let stat = match state.storage.stat_object(&resource.id.to_string()).await {
        Ok(stat) => stat,
        Err(StorageError::NotFound(_)) => {
            return Err(CoreError::InvalidResourceState(
                "Object has not been uploaded to storage".into(),
            )
            .into());
        }
        Err(err) => return Err(err.into()),
    };

    if stat.size > state.settings.upload_max_size {
        return Err(CoreError::InvalidResourceFormat(format!(
            "Uploaded object is {} bytes, above the {} byte limit",
            stat.size, state.settings.upload_max_size
        ))
        .into());
    }

    let updated = state
        .db
        .mark_resource_uploaded(id, stat.size as i64, None)
        .await?;
    state
        .bus
        .publish(
            topics::RESOURCE_UPLOADED,
            json!({"resource_id": id, "byte_size": stat.size}),
        )
        .await;
    tracing::info!(resource_id = %id, byte_size = stat.size, "upload confirmed");

    let usage = state.db.resource_usage_count(updated.id, updated.guid).await?;
    Ok(Json(ResourceOut::from_resource(updated, usage)))
}
