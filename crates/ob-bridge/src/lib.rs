//! HTTP layer for the Ouroboros control plane.
//!
//! Exposes the Control API over Axum:
//! - [`http_api`] — REST handlers for campaigns, attacks, hash lists,
//!   resources, agents, tasks, projects, and users
//! - [`auth`] — bearer API-key authentication resolving the calling user
//! - [`problem`] — RFC 9457 problem responses, applied to `/api/v1/control`
//!   paths only
//! - [`access`] — project-membership authorization helpers
//! - [`pagination`] — offset pagination envelope and constraints
//! - [`workers`] — upload verification and the stale-resource reaper
//!   (spawned by the daemon)

pub mod access;
pub mod auth;
pub mod http_api;
pub mod pagination;
pub mod problem;
pub mod workers;

pub use http_api::state::ApiState;
