use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use serde_json::json;
use std::sync::Arc;

use ob_core::events::topics;
use ob_core::types::{CurrentUser, HashItem, HashList};
use ob_core::CoreError;
use ob_db::hash_lists::ItemStatusFilter;

use super::state::ApiState;
use super::types::{
    CsvExportQuery, HashItemListQuery, HashItemStatus, HashItemsCreate, HashListCreate,
    HashListExport, HashListListQuery, HashListUpdate,
};
use crate::access::{get_hash_list_checked, require_any_project, validate_project_access};
use crate::pagination::{OffsetPaginated, Page, DEFAULT_LIMIT};
use crate::problem::{ApiResult, Problem};

/// POST /hash-lists -- create a hash list in the given project.
pub(crate) async fn create_hash_list(
    State(state): State<Arc<ApiState>>,
    Extension(user): Extension<CurrentUser>,
    Json(body): Json<HashListCreate>,
) -> ApiResult<impl IntoResponse> {
    validate_project_access(&user, body.project_id)?;

    let hash_list = state
        .db
        .create_hash_list(
            Some(body.project_id),
            &body.name,
            body.description.as_deref(),
            body.hash_type_id,
            body.is_unavailable,
        )
        .await?;
    state
        .bus
        .publish(
            topics::HASH_LIST_CREATED,
            json!({"hash_list_id": hash_list.id, "project_id": body.project_id}),
        )
        .await;
    tracing::info!(hash_list_id = hash_list.id, "hash list created");
    Ok((StatusCode::CREATED, Json(hash_list)))
}

/// GET /hash-lists -- paginated listing over the caller's projects plus
/// global lists.
pub(crate) async fn list_hash_lists(
    State(state): State<Arc<ApiState>>,
    Extension(user): Extension<CurrentUser>,
    Query(query): Query<HashListListQuery>,
) -> ApiResult<Json<OffsetPaginated<HashList>>> {
    let page = Page::resolve(query.limit, query.offset, DEFAULT_LIMIT)?;
    require_any_project(&user)?;
    if let Some(project_id) = query.project_id {
        validate_project_access(&user, project_id)?;
    }

    let (items, total) = state
        .db
        .list_hash_lists(
            user.accessible_projects(),
            query.project_id,
            query.name.as_deref(),
            page.limit,
            page.offset,
        )
        .await?;
    Ok(Json(OffsetPaginated::new(items, total, page)))
}

/// GET /hash-lists/{id}
pub(crate) async fn get_hash_list(
    State(state): State<Arc<ApiState>>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<i64>,
) -> ApiResult<Json<HashList>> {
    let hash_list = get_hash_list_checked(&state.db, &user, id).await?;
    Ok(Json(hash_list))
}

/// PATCH /hash-lists/{id} -- name, description, availability flag.
pub(crate) async fn update_hash_list(
    State(state): State<Arc<ApiState>>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<i64>,
    Json(body): Json<HashListUpdate>,
) -> ApiResult<Json<HashList>> {
    get_hash_list_checked(&state.db, &user, id).await?;
    let updated = state
        .db
        .update_hash_list(
            id,
            body.name.as_deref(),
            body.description.as_deref(),
            body.is_unavailable,
        )
        .await?;
    state
        .bus
        .publish(topics::HASH_LIST_UPDATED, json!({"hash_list_id": id}))
        .await;
    Ok(Json(updated))
}

/// DELETE /hash-lists/{id} -- blocked while any campaign references the
/// list.
pub(crate) async fn delete_hash_list(
    State(state): State<Arc<ApiState>>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<i64>,
) -> ApiResult<StatusCode> {
    get_hash_list_checked(&state.db, &user, id).await?;

    if let Some(campaign) = state.db.campaign_referencing_hash_list(id).await? {
        return Err(CoreError::InvalidResourceState(format!(
            "Cannot delete hash list: it is used by campaign '{}' (ID: {})",
            campaign.name, campaign.id
        ))
        .into());
    }

    state.db.delete_hash_list(id).await?;
    tracing::info!(hash_list_id = id, "hash list deleted");
    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Items
// ---------------------------------------------------------------------------

/// GET /hash-lists/{id}/items -- paginated; `search` matches hash or
/// plaintext, `status` filters cracked/uncracked.
pub(crate) async fn list_hash_items(
    State(state): State<Arc<ApiState>>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<i64>,
    Query(query): Query<HashItemListQuery>,
) -> ApiResult<Json<OffsetPaginated<HashItem>>> {
    let page = Page::resolve(query.limit, query.offset, DEFAULT_LIMIT)?;
    get_hash_list_checked(&state.db, &user, id).await?;

    let status = query.status.map(|s| match s {
        HashItemStatus::Cracked => ItemStatusFilter::Cracked,
        HashItemStatus::Uncracked => ItemStatusFilter::Uncracked,
    });
    let (items, total) = state
        .db
        .list_hash_items(id, query.search.as_deref(), status, page.limit, page.offset)
        .await?;
    Ok(Json(OffsetPaginated::new(items, total, page)))
}

/// GET /hash-lists/{id}/items/{item_id}
pub(crate) async fn get_hash_item(
    State(state): State<Arc<ApiState>>,
    Extension(user): Extension<CurrentUser>,
    Path((id, item_id)): Path<(i64, i64)>,
) -> ApiResult<Json<HashItem>> {
    get_hash_list_checked(&state.db, &user, id).await?;
    let item = state
        .db
        .get_hash_item(id, item_id)
        .await?
        .ok_or_else(|| CoreError::HashItemNotFound(format!(
            "Hash item with ID {item_id} not found in hash list {id}"
        )))?;
    Ok(Json(item))
}

/// POST /hash-lists/{id}/items -- append hashes to the list.
pub(crate) async fn add_hash_items(
    State(state): State<Arc<ApiState>>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<i64>,
    Json(body): Json<HashItemsCreate>,
) -> ApiResult<impl IntoResponse> {
    get_hash_list_checked(&state.db, &user, id).await?;

    for item in &body.items {
        let hash = item.hash.trim();
        if hash.is_empty() || !hash.chars().all(|c| c.is_ascii_graphic()) {
            return Err(CoreError::InvalidHashFormat(format!(
                "Hash value '{}' is not a printable ASCII string",
                item.hash
            ))
            .into());
        }
    }

    let rows: Vec<(String, Option<String>)> = body
        .items
        .iter()
        .map(|item| (item.hash.trim().to_string(), item.salt.clone()))
        .collect();
    let created = state.db.add_hash_items(id, &rows).await?;
    state
        .bus
        .publish(
            topics::HASH_LIST_UPDATED,
            json!({"hash_list_id": id, "added": created.len()}),
        )
        .await;
    Ok((StatusCode::CREATED, Json(created)))
}

// ---------------------------------------------------------------------------
// Exports
// ---------------------------------------------------------------------------

async fn export_context(
    state: &ApiState,
    user: &CurrentUser,
    id: i64,
) -> ApiResult<(HashList, Vec<HashItem>, i64, i64)> {
    let hash_list = get_hash_list_checked(&state.db, user, id).await?;
    let items = state.db.all_hash_items(id).await?;
    let (total, cracked) = state.db.hash_list_counts(id).await?;
    Ok((hash_list, items, total, cracked))
}

/// GET /hash-lists/{id}/export/plaintext -- newline-joined plaintexts of
/// cracked items.
pub(crate) async fn export_plaintext(
    State(state): State<Arc<ApiState>>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<i64>,
) -> ApiResult<Json<HashListExport>> {
    let (hash_list, items, total, cracked) = export_context(&state, &user, id).await?;
    let content = items
        .iter()
        .filter_map(|item| item.plain_text.as_deref())
        .collect::<Vec<_>>()
        .join("\n");
    Ok(Json(HashListExport {
        hash_list_id: hash_list.id,
        hash_list_name: hash_list.name,
        format: "plaintext",
        total_items: total,
        cracked_count: cracked,
        content,
    }))
}

/// GET /hash-lists/{id}/export/potfile -- `hash:plain` lines
/// (`hash:salt:plain` when salted), cracked items only.
pub(crate) async fn export_potfile(
    State(state): State<Arc<ApiState>>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<i64>,
) -> ApiResult<Json<HashListExport>> {
    let (hash_list, items, total, cracked) = export_context(&state, &user, id).await?;
    let content = items
        .iter()
        .filter_map(|item| {
            let plain = item.plain_text.as_deref()?;
            Some(match item.salt.as_deref() {
                Some(salt) => format!("{}:{}:{}", item.hash, salt, plain),
                None => format!("{}:{}", item.hash, plain),
            })
        })
        .collect::<Vec<_>>()
        .join("\n");
    Ok(Json(HashListExport {
        hash_list_id: hash_list.id,
        hash_list_name: hash_list.name,
        format: "potfile",
        total_items: total,
        cracked_count: cracked,
        content,
    }))
}

/// GET /hash-lists/{id}/export/csv -- header `id,hash,salt,plaintext,status`;
/// `include_uncracked=false` keeps cracked rows only.
pub(crate) async fn export_csv(
    State(state): State<Arc<ApiState>>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<i64>,
    Query(query): Query<CsvExportQuery>,
) -> ApiResult<Json<HashListExport>> {
    let (hash_list, items, total, cracked) = export_context(&state, &user, id).await?;
    let include_uncracked = query.include_uncracked.unwrap_or(true);

    let mut writer = csv::Writer::from_writer(Vec::new());
    writer
        .write_record(["id", "hash", "salt", "plaintext", "status"])
        .map_err(|e| Problem::from(CoreError::Internal(format!("csv export failed: {e}"))))?;
    for item in &items {
        if !include_uncracked && !item.is_cracked() {
            continue;
        }
        let status = if item.is_cracked() { "cracked" } else { "uncracked" };
        writer
            .write_record([
                item.id.to_string().as_str(),
                item.hash.as_str(),
                item.salt.as_deref().unwrap_or(""),
                item.plain_text.as_deref().unwrap_or(""),
                status,
            ])
            .map_err(|e| Problem::from(CoreError::Internal(format!("csv export failed: {e}"))))?;
    }
    let content = String::from_utf8(
        writer
            .into_inner()
            .map_err(|e| Problem::from(CoreError::Internal(format!("csv export failed: {e}"))))?,
    )
    .map_err(|e| Problem::from(CoreError::Internal(format!("csv export failed: {e}"))))?;

    Ok(Json(HashListExport {
        hash_list_id: hash_list.id,
        hash_list_name: hash_list.name,
        format: "csv",
        total_items: total,
        cracked_count: cracked,
        content,
    }))
}
