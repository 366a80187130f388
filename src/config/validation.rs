//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate addresses, the mount path and header names
//! - Validate value ranges (chunk size bounds)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ProxyConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use axum::http::HeaderName;
use thiserror::Error;

use crate::config::schema::ProxyConfig;

/// Largest chunk the relay will hand to the transport in one piece.
pub const MAX_CHUNK_SIZE: usize = 1024 * 1024;

/// A single semantic problem found in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field}: '{value}' is not a valid socket address")]
    InvalidAddress { field: &'static str, value: String },

    #[error("proxy.chunk_size must be between 1 and {max} bytes, got {0}", max = MAX_CHUNK_SIZE)]
    ChunkSize(usize),

    #[error("proxy.mount_path '{0}' must start with '/' and contain no '{{', '}}' or '*'")]
    MountPath(String),

    #[error("{field}: '{value}' is not a valid header name")]
    HeaderName { field: &'static str, value: String },
}

/// Check a configuration, collecting every error found.
pub fn validate_config(config: &ProxyConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    check_address(
        "listener.bind_address",
        &config.listener.bind_address,
        &mut errors,
    );
    if config.observability.metrics_enabled {
        check_address(
            "observability.metrics_address",
            &config.observability.metrics_address,
            &mut errors,
        );
    }

    let chunk_size = config.proxy.chunk_size;
    if chunk_size == 0 || chunk_size > MAX_CHUNK_SIZE {
        errors.push(ValidationError::ChunkSize(chunk_size));
    }

    let mount = &config.proxy.mount_path;
    if !mount.starts_with('/') || mount.contains(['{', '}', '*']) {
        errors.push(ValidationError::MountPath(mount.clone()));
    }

    check_header_names(
        "proxy.strip_request_headers",
        &config.proxy.strip_request_headers,
        &mut errors,
    );
    check_header_names(
        "proxy.strip_response_headers",
        &config.proxy.strip_response_headers,
        &mut errors,
    );

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_address(field: &'static str, value: &str, errors: &mut Vec<ValidationError>) {
    if value.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidAddress {
            field,
            value: value.to_string(),
        });
    }
}

fn check_header_names(field: &'static str, names: &[String], errors: &mut Vec<ValidationError>) {
    for name in names {
        if HeaderName::from_bytes(name.as_bytes()).is_err() {
            errors.push(ValidationError::HeaderName {
                field,
                value: name.clone(),
            });
        }
    }
}
