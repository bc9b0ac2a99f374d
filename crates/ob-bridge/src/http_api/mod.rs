//! Control API router.
//!
//! Handlers are split by domain; this module wires them together and owns
//! the layer stack: request-id and CORS on the outside, then (control paths
//! only) the RFC 9457 problem boundary wrapping bearer-key authentication.

mod agents;
mod attacks;
mod campaigns;
mod hash_lists;
mod projects;
mod resources;
pub mod state;
mod tasks;
#[cfg(test)]
mod tests;
pub mod types;
mod users;

use std::sync::Arc;

use axum::{
    http::HeaderValue,
    middleware,
    routing::{delete, get, post},
    Router,
};
use tower_http::cors::{AllowOrigin, CorsLayer};

use crate::{auth, problem};
use state::ApiState;

/// The `/api/v1/control` route table with auth and problem layers applied.
pub fn control_router(state: Arc<ApiState>) -> Router {
    Router::new()
        // ── Campaigns ─────────────────────────────────────────────
        .route(
            "/campaigns",
            get(campaigns::list_campaigns).post(campaigns::create_campaign),
        )
        .route(
            "/campaigns/{id}",
            get(campaigns::get_campaign)
                .patch(campaigns::update_campaign)
                .delete(campaigns::delete_campaign),
        )
        .route("/campaigns/{id}/validate", post(campaigns::validate_campaign))
        .route("/campaigns/{id}/start", post(campaigns::start_campaign))
        .route("/campaigns/{id}/stop", post(campaigns::stop_campaign))
        .route("/campaigns/{id}/pause", post(campaigns::pause_campaign))
        .route("/campaigns/{id}/resume", post(campaigns::resume_campaign))
        .route("/campaigns/{id}/archive", post(campaigns::archive_campaign))
        .route("/campaigns/{id}/unarchive", post(campaigns::unarchive_campaign))
        .route(
            "/campaigns/{id}/attacks/reorder",
            post(campaigns::reorder_attacks),
        )
        .route("/campaigns/{id}/progress", get(campaigns::campaign_progress))
        .route("/campaigns/{id}/metrics", get(campaigns::campaign_metrics))
        // ── Attacks ───────────────────────────────────────────────
        .route("/attacks", get(attacks::list_attacks).post(attacks::create_attack))
        .route(
            "/attacks/{id}",
            get(attacks::get_attack)
                .patch(attacks::update_attack)
                .delete(attacks::delete_attack),
        )
        .route("/attacks/validate", post(attacks::validate_attack))
        .route("/attacks/estimate", post(attacks::estimate_attack))
        .route("/attacks/{id}/start", post(attacks::start_attack))
        .route("/attacks/{id}/stop", post(attacks::stop_attack))
        .route("/attacks/{id}/pause", post(attacks::pause_attack))
        .route("/attacks/{id}/resume", post(attacks::resume_attack))
        .route("/attacks/{id}/metrics", get(attacks::attack_metrics))
        // ── Hash lists ────────────────────────────────────────────
        .route(
            "/hash-lists",
            get(hash_lists::list_hash_lists).post(hash_lists::create_hash_list),
        )
        .route(
            "/hash-lists/{id}",
            get(hash_lists::get_hash_list)
                .patch(hash_lists::update_hash_list)
                .delete(hash_lists::delete_hash_list),
        )
        .route(
            "/hash-lists/{id}/items",
            get(hash_lists::list_hash_items).post(hash_lists::add_hash_items),
        )
        .route(
            "/hash-lists/{id}/items/{item_id}",
            get(hash_lists::get_hash_item),
        )
        .route(
            "/hash-lists/{id}/export/plaintext",
            get(hash_lists::export_plaintext),
        )
        .route(
            "/hash-lists/{id}/export/potfile",
            get(hash_lists::export_potfile),
        )
        .route("/hash-lists/{id}/export/csv", get(hash_lists::export_csv))
        // ── Resources ─────────────────────────────────────────────
        .route("/resources", get(resources::list_resources))
        .route("/resources/initiate-upload", post(resources::initiate_upload))
        .route(
            "/resources/{id}",
            get(resources::get_resource)
                .patch(resources::update_resource)
                .delete(resources::delete_resource),
        )
        .route("/resources/{id}/preview", get(resources::preview_resource))
        .route("/resources/{id}/cancel", delete(resources::cancel_resource_upload))
        .route(
            "/resources/{id}/confirm-upload",
            post(resources::confirm_upload),
        )
        // ── Agents ────────────────────────────────────────────────
        .route("/agents", get(agents::list_agents))
        .route("/agents/{id}", get(agents::get_agent).patch(agents::update_agent))
        .route("/agents/{id}/benchmarks", get(agents::get_agent_benchmarks))
        .route(
            "/agents/{id}/capabilities",
            get(agents::get_agent_capabilities),
        )
        .route("/agents/{id}/errors", get(agents::get_agent_errors))
        // ── Tasks ─────────────────────────────────────────────────
        .route("/tasks", get(tasks::list_tasks))
        .route("/tasks/{id}", get(tasks::get_task))
        // ── Projects & users ──────────────────────────────────────
        .route("/projects", get(projects::list_projects))
        .route("/projects/{id}", get(projects::get_project))
        .route("/users", get(users::list_users).post(users::create_user))
        .route("/users/{id}", get(users::get_user))
        // Auth resolves the caller; the problem layer wraps it so 401s and
        // handler errors alike come out as problem documents with instance.
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_api_key,
        ))
        .layer(middleware::from_fn(problem::problem_instance_middleware))
        .with_state(state)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.is_empty() {
        return CorsLayer::permissive();
    }
    let parsed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();
    CorsLayer::new().allow_origin(AllowOrigin::list(parsed))
}

/// Full application router: the control family plus outer middleware.
/// Non-control path families mount beside `/api/v1/control` and are never
/// touched by the problem boundary.
pub fn api_router(state: Arc<ApiState>) -> Router {
    let cors = cors_layer(&state.settings.cors_origins);
    Router::new()
        .nest("/api/v1/control", control_router(state))
        .layer(middleware::from_fn(
            ob_telemetry::middleware::request_id_middleware,
        ))
        .layer(cors)
}
