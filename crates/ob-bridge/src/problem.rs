//! RFC 9457 Problem Details for the Control API.
//!
//! Handlers return [`Problem`] as their error type; its `IntoResponse`
//! renders `application/problem+json` and stashes a copy of the document in
//! the response extensions. [`problem_instance_middleware`], mounted only on
//! the `/api/v1/control` router, re-renders the body with `instance` set to
//! the request path. Paths outside the control family never pass through the
//! middleware and keep whatever envelope their own layer produces.

use axum::{
    body::Body,
    extract::{OriginalUri, Request},
    http::{header, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use ob_core::CoreError;
use serde_json::{json, Map, Value};

/// Reason phrases for generic HTTP errors converted to problem documents.
const STATUS_TITLES: &[(u16, &str)] = &[
    (400, "Bad Request"),
    (401, "Unauthorized"),
    (403, "Forbidden"),
    (404, "Not Found"),
    (409, "Conflict"),
    (422, "Unprocessable Entity"),
    (500, "Internal Server Error"),
];

fn status_title(status: u16) -> &'static str {
    STATUS_TITLES
        .iter()
        .find(|(code, _)| *code == status)
        .map(|(_, title)| *title)
        .unwrap_or("HTTP Error")
}

/// Members of the problem document that extensions may never overwrite.
const RESERVED_KEYS: &[&str] = &["type", "title", "status", "instance"];

// ---------------------------------------------------------------------------
// Problem
// ---------------------------------------------------------------------------

/// A problem document minus `instance`, which is stamped by the middleware.
#[derive(Debug, Clone)]
pub struct Problem {
    pub status: u16,
    /// The `type` member: a stable kebab-case tag or `about:blank`.
    pub kind: String,
    pub title: String,
    pub detail: String,
    /// Extension members, serialized alongside the reserved fields.
    pub extensions: Map<String, Value>,
}

impl Problem {
    /// Generic HTTP error with a plain string detail (`type = about:blank`).
    pub fn http(status: u16, detail: impl Into<String>) -> Self {
        Self {
            status,
            kind: "about:blank".into(),
            title: status_title(status).into(),
            detail: detail.into(),
            extensions: Map::new(),
        }
    }

    /// Generic HTTP error with a mapping detail: the `detail` key becomes
    /// the problem detail (falling back to the title) and every other key is
    /// merged as an extension, never overwriting reserved members.
    pub fn http_with_fields(status: u16, fields: Map<String, Value>) -> Self {
        let title = status_title(status).to_string();
        let detail = fields
            .get("detail")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| title.clone());
        let extensions = fields
            .into_iter()
            .filter(|(key, _)| key != "detail" && !RESERVED_KEYS.contains(&key.as_str()))
            .collect();
        Self {
            status,
            kind: "about:blank".into(),
            title,
            detail,
            extensions,
        }
    }

    /// Serialize the full document, with `instance` when known.
    pub fn to_json(&self, instance: Option<&str>) -> Value {
        let mut doc = Map::new();
        doc.insert("type".into(), json!(self.kind));
        doc.insert("title".into(), json!(self.title));
        doc.insert("status".into(), json!(self.status));
        doc.insert("detail".into(), json!(self.detail));
        if let Some(instance) = instance {
            doc.insert("instance".into(), json!(instance));
        }
        for (key, value) in &self.extensions {
            if !RESERVED_KEYS.contains(&key.as_str()) && key != "detail" {
                doc.insert(key.clone(), value.clone());
            }
        }
        Value::Object(doc)
    }

    fn render(&self, instance: Option<&str>) -> Response {
        let body = self.to_json(instance).to_string();
        let status =
            StatusCode::from_u16(self.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let mut response = Response::new(Body::from(body));
        *response.status_mut() = status;
        response.headers_mut().insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/problem+json"),
        );
        response
    }
}

impl From<CoreError> for Problem {
    fn from(err: CoreError) -> Self {
        let mut extensions = Map::new();
        if let CoreError::InvalidStateTransition {
            current_state,
            attempted_state,
            action,
            entity_type,
            valid_transitions,
            ..
        } = &err
        {
            // Always present on state-transition conflicts, null included.
            extensions.insert("current_state".into(), json!(current_state));
            extensions.insert("attempted_state".into(), json!(attempted_state));
            extensions.insert("action".into(), json!(action));
            extensions.insert("entity_type".into(), json!(entity_type));
            extensions.insert("valid_transitions".into(), json!(valid_transitions));
        }
        Self {
            status: err.status(),
            kind: err.kind().into(),
            title: err.title().into(),
            detail: err.detail().into(),
            extensions,
        }
    }
}

impl From<sqlx::Error> for Problem {
    fn from(err: sqlx::Error) -> Self {
        CoreError::Internal(format!("database error: {err}")).into()
    }
}

impl From<ob_storage::StorageError> for Problem {
    fn from(err: ob_storage::StorageError) -> Self {
        CoreError::Internal(format!("storage error: {err}")).into()
    }
}

impl IntoResponse for Problem {
    fn into_response(self) -> Response {
        let mut response = self.render(None);
        response.extensions_mut().insert(self);
        response
    }
}

/// Handler result alias used across the Control API.
pub type ApiResult<T> = Result<T, Problem>;

// ---------------------------------------------------------------------------
// Middleware
// ---------------------------------------------------------------------------

/// Stamp `instance` onto problem responses. Mounted on the control router
/// only; everything else is a pure pass-through by construction.
///
/// Uses `OriginalUri` so the instance path keeps the `/api/v1/control`
/// prefix that nesting strips from the routed URI.
pub async fn problem_instance_middleware(request: Request<Body>, next: Next) -> Response {
    let path = request
        .extensions()
        .get::<OriginalUri>()
        .map(|uri| uri.path().to_string())
        .unwrap_or_else(|| request.uri().path().to_string());
    let response = next.run(request).await;
    match response.extensions().get::<Problem>() {
        Some(problem) => problem.render(Some(&path)),
        None => response,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{routing::get, Router};
    use tower::ServiceExt;

    async fn body_json(response: Response) -> Value {
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            "application/problem+json"
        );
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn control_router() -> Router {
        Router::new()
            .route(
                "/api/v1/control/test/campaign-not-found",
                get(|| async {
                    Err::<(), Problem>(
                        CoreError::CampaignNotFound("Campaign with ID 'test-123' not found".into())
                            .into(),
                    )
                }),
            )
            .route(
                "/api/v1/control/test/invalid-state-transition",
                get(|| async {
                    Err::<(), Problem>(
                        CoreError::InvalidStateTransition {
                            detail: "Cannot perform action 'start' on campaign: transition from 'archived' to 'active' is not allowed.".into(),
                            current_state: "archived".into(),
                            attempted_state: "active".into(),
                            action: Some("start".into()),
                            entity_type: "campaign".into(),
                            valid_transitions: vec!["draft".into()],
                        }
                        .into(),
                    )
                }),
            )
            .route(
                "/api/v1/control/test/http-422",
                get(|| async { Err::<(), Problem>(Problem::http(422, "Validation failed")) }),
            )
            .route(
                "/api/v1/control/test/http-dict-detail",
                get(|| async {
                    let mut fields = Map::new();
                    fields.insert("field".into(), json!("name"));
                    fields.insert("error".into(), json!("required"));
                    Err::<(), Problem>(Problem::http_with_fields(422, fields))
                }),
            )
            .layer(axum::middleware::from_fn(problem_instance_middleware))
    }

    #[tokio::test]
    async fn core_error_renders_rfc9457_document() {
        let response = control_router()
            .oneshot(
                Request::builder()
                    .uri("/api/v1/control/test/campaign-not-found")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let doc = body_json(response).await;
        assert_eq!(doc["type"], "campaign-not-found");
        assert_eq!(doc["title"], "Campaign Not Found");
        assert_eq!(doc["status"], 404);
        assert_eq!(doc["detail"], "Campaign with ID 'test-123' not found");
        assert_eq!(doc["instance"], "/api/v1/control/test/campaign-not-found");
    }

    #[tokio::test]
    async fn state_transition_problem_carries_extension_fields() {
        let response = control_router()
            .oneshot(
                Request::builder()
                    .uri("/api/v1/control/test/invalid-state-transition")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CONFLICT);

        let doc = body_json(response).await;
        assert_eq!(doc["title"], "Invalid State Transition");
        assert_eq!(doc["current_state"], "archived");
        assert_eq!(doc["attempted_state"], "active");
        assert_eq!(doc["action"], "start");
        assert_eq!(doc["entity_type"], "campaign");
        assert_eq!(doc["valid_transitions"], json!(["draft"]));
    }

    #[tokio::test]
    async fn generic_http_error_maps_through_title_table() {
        let response = control_router()
            .oneshot(
                Request::builder()
                    .uri("/api/v1/control/test/http-422")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let doc = body_json(response).await;
        assert_eq!(doc["type"], "about:blank");
        assert_eq!(doc["title"], "Unprocessable Entity");
        assert_eq!(doc["detail"], "Validation failed");
    }

    #[tokio::test]
    async fn mapping_detail_merges_extensions() {
        let response = control_router()
            .oneshot(
                Request::builder()
                    .uri("/api/v1/control/test/http-dict-detail")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        let doc = body_json(response).await;
        assert_eq!(doc["type"], "about:blank");
        assert_eq!(doc["title"], "Unprocessable Entity");
        // detail falls back to the title when the mapping has none
        assert_eq!(doc["detail"], "Unprocessable Entity");
        assert_eq!(doc["field"], "name");
        assert_eq!(doc["error"], "required");
    }

    #[tokio::test]
    async fn unknown_status_uses_default_title() {
        let problem = Problem::http(418, "I'm a teapot");
        assert_eq!(problem.title, "HTTP Error");
        let doc = problem.to_json(Some("/x"));
        assert_eq!(doc["status"], 418);
        assert_eq!(doc["detail"], "I'm a teapot");
    }

    #[tokio::test]
    async fn extensions_cannot_overwrite_reserved_fields() {
        let mut fields = Map::new();
        fields.insert("type".into(), json!("evil"));
        fields.insert("status".into(), json!(999));
        fields.insert("title".into(), json!("Evil"));
        fields.insert("instance".into(), json!("/evil"));
        fields.insert("detail".into(), json!("shaped detail"));
        fields.insert("extra".into(), json!("kept"));
        let problem = Problem::http_with_fields(400, fields);
        let doc = problem.to_json(Some("/real"));
        assert_eq!(doc["type"], "about:blank");
        assert_eq!(doc["status"], 400);
        assert_eq!(doc["title"], "Bad Request");
        assert_eq!(doc["instance"], "/real");
        assert_eq!(doc["detail"], "shaped detail");
        assert_eq!(doc["extra"], "kept");
    }

    #[tokio::test]
    async fn non_problem_responses_pass_through() {
        let router = Router::new()
            .route("/api/v1/control/ok", get(|| async { "fine" }))
            .layer(axum::middleware::from_fn(problem_instance_middleware));
        let response = router
            .oneshot(
                Request::builder()
                    .uri("/api/v1/control/ok")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&bytes[..], b"fine");
    }

    #[tokio::test]
    async fn every_error_kind_has_matching_status_and_body() {
        for (err, status) in [
            (CoreError::AttackNotFound("x".into()), 404),
            (CoreError::HashItemNotFound("x".into()), 404),
            (CoreError::InvalidAttackConfig("x".into()), 400),
            (CoreError::InsufficientPermissions("x".into()), 403),
            (CoreError::UserConflict("x".into()), 409),
            (CoreError::Internal("x".into()), 500),
        ] {
            let problem = Problem::from(err);
            assert_eq!(problem.status, status);
            let doc = problem.to_json(Some("/p"));
            assert_eq!(doc["status"], status);
            for key in ["type", "title", "status", "detail", "instance"] {
                assert!(doc.get(key).is_some(), "missing {key}");
            }
        }
    }
}
