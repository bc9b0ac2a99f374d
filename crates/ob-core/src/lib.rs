//! Core domain layer for the Ouroboros control plane.
//!
//! This crate holds everything the transport and persistence layers agree on:
//! - [`types`] — entities and their state enums
//! - [`state_machine`] — declarative campaign/attack lifecycle tables
//! - [`error`] — the closed control-plane error taxonomy
//! - [`keyspace`] — attack keyspace and complexity estimation
//! - [`events`] — the in-process event bus
//! - [`config`] — environment-driven settings

pub mod config;
pub mod error;
pub mod events;
pub mod keyspace;
pub mod state_machine;
pub mod types;

pub use error::CoreError;
