use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use std::sync::Arc;
use uuid::Uuid;

use ob_core::types::{CurrentUser, User};
use ob_core::CoreError;

use super::state::ApiState;
use super::types::{PageOnlyQuery, UserCreate};
use crate::pagination::{OffsetPaginated, Page, DEFAULT_LIMIT};
use crate::problem::ApiResult;

fn require_superuser(user: &CurrentUser) -> ApiResult<()> {
    if user.is_superuser() {
        Ok(())
    } else {
        Err(CoreError::InsufficientPermissions(
            "This operation requires superuser privileges".into(),
        )
        .into())
    }
}

/// GET /users -- superuser only.
pub(crate) async fn list_users(
    State(state): State<Arc<ApiState>>,
    Extension(user): Extension<CurrentUser>,
    Query(query): Query<PageOnlyQuery>,
) -> ApiResult<Json<OffsetPaginated<User>>> {
    let page = Page::resolve(query.limit, query.offset, DEFAULT_LIMIT)?;
    require_superuser(&user)?;

    let (items, total) = state.db.list_users(page.limit, page.offset).await?;
    Ok(Json(OffsetPaginated::new(items, total, page)))
}

/// POST /users -- superuser only; duplicate email is a 409 conflict.
pub(crate) async fn create_user(
    State(state): State<Arc<ApiState>>,
    Extension(user): Extension<CurrentUser>,
    Json(body): Json<UserCreate>,
) -> ApiResult<impl IntoResponse> {
    require_superuser(&user)?;

    if state.db.get_user_by_email(&body.email).await?.is_some() {
        return Err(CoreError::UserConflict(format!(
            "A user with email '{}' already exists",
            body.email
        ))
        .into());
    }

    let api_key = body
        .api_key
        .unwrap_or_else(|| Uuid::new_v4().as_simple().to_string());
    let created = state
        .db
        .create_user(&body.email, &body.name, &api_key, body.is_superuser)
        .await?;
    tracing::info!(user_id = created.id, "user created");
    Ok((StatusCode::CREATED, Json(created)))
}

/// GET /users/{id} -- superuser or self.
pub(crate) async fn get_user(
    State(state): State<Arc<ApiState>>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<i64>,
) -> ApiResult<Json<User>> {
    if !user.is_superuser() && user.user.id != id {
        return Err(CoreError::InsufficientPermissions(
            "Users may only view their own account".into(),
        )
        .into());
    }
    let found = state
        .db
        .get_user(id)
        .await?
        .ok_or_else(|| CoreError::UserNotFound(format!("User with ID {id} not found")))?;
    Ok(Json(found))
}
