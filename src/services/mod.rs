//! Orchestration services.

mod forward_service;

pub use forward_service::{ForwardError, ForwardService, RunReport};
