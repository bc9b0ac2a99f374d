//! Telemetry for the Ouroboros control plane: logging setup and request-id
//! propagation.

pub mod logging;
pub mod middleware;
