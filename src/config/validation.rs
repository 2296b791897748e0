//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Share paths are absolute and agree with their `pathMaps` key
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Unknown mapping types are left to `process_config`, which owns that error
//! - Runs before a loaded file is handed to the server

use thiserror::Error;

use crate::config::schema::Configuration;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("pathMaps key `{key}` must start with '/'")]
    RelativeKey { key: String },

    #[error("pathMaps key `{key}` has mismatched sharePath `{share_path}`")]
    SharePathMismatch { key: String, share_path: String },
}

/// Validate a configuration, collecting every error.
pub fn validate_config(config: &Configuration) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    for (key, entry) in &config.path_maps {
        if !key.starts_with('/') {
            errors.push(ValidationError::RelativeKey { key: key.clone() });
        }
        if let Some(share_path) = &entry.share_path {
            if share_path != key {
                errors.push(ValidationError::SharePathMismatch {
                    key: key.clone(),
                    share_path: share_path.clone(),
                });
            }
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
