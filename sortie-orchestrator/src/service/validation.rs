//! Request validation
//!
//! Runs synchronously on submit, before any record exists.

use sortie_core::dto::execution::ExecutionRequest;
use sortie_core::modules;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("module is required")]
    MissingModule,

    #[error("hosts is required")]
    MissingHosts,

    #[error("invalid hosts: {0}")]
    InvalidHosts(String),

    #[error("unsupported module: {0}")]
    UnsupportedModule(String),
}

/// Checks the request's module and target selector
pub fn validate_request(req: &ExecutionRequest) -> Result<(), ValidationError> {
    if req.module.trim().is_empty() {
        return Err(ValidationError::MissingModule);
    }

    if req.hosts.trim().is_empty() {
        return Err(ValidationError::MissingHosts);
    }

    // the selector is the first argument, it must never parse as an option
    if req.hosts.trim_start().starts_with('-') || req.hosts.chars().any(char::is_control) {
        return Err(ValidationError::InvalidHosts(req.hosts.clone()));
    }

    if !modules::is_supported(&req.module) {
        return Err(ValidationError::UnsupportedModule(req.module.clone()));
    }

    Ok(())
}
