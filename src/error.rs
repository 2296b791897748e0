//! Construction-time errors raised while building the route table or binding.
//!
//! Request-time failures never surface here; they are turned into HTTP
//! responses by [`crate::http::response::RouteError`].

use thiserror::Error;

/// Identifier carried by a static mapping that has no `localPath`.
pub const MISSING_LOCALPATH: &str = "MISSING_LOCALPATH";
/// Identifier carried by a mapping whose `type` is not mock, proxy or static.
pub const UNKNOWN_MAPPING_TYPE: &str = "UNKNOWN_MAPPING_TYPE";
/// Identifier carried by a mapping that lacks a field its strategy needs.
pub const MISSING_FIELD: &str = "MISSING_FIELD";
/// Identifier carried by a failed listener bind.
pub const BIND_FAILED: &str = "BIND_FAILED";

/// Errors surfaced synchronously to the caller of `process_config`,
/// `reload`, `map_static` or `set_port`.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("unknown mapping type `{kind}` for share path `{share_path}`")]
    UnknownMappingType { kind: String, share_path: String },

    #[error("MISSING_LOCALPATH: static mapping `{share_path}` has no localPath")]
    MissingLocalPath { share_path: String },

    #[error("{kind} mapping `{share_path}` is missing `{field}`")]
    MissingField {
        kind: &'static str,
        field: &'static str,
        share_path: String,
    },

    #[error("failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },
}

impl DispatchError {
    /// Stable identifier for the error kind.
    pub fn code(&self) -> &'static str {
        match self {
            DispatchError::UnknownMappingType { .. } => UNKNOWN_MAPPING_TYPE,
            DispatchError::MissingLocalPath { .. } => MISSING_LOCALPATH,
            DispatchError::MissingField { .. } => MISSING_FIELD,
            DispatchError::Bind { .. } => BIND_FAILED,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_local_path_code() {
        let err = DispatchError::MissingLocalPath {
            share_path: "/static".into(),
        };
        assert_eq!(err.code(), MISSING_LOCALPATH);
        assert!(err.to_string().starts_with(MISSING_LOCALPATH));
    }

    #[test]
    fn unknown_type_names_offender() {
        let err = DispatchError::UnknownMappingType {
            kind: "ftp".into(),
            share_path: "/files".into(),
        };
        let message = err.to_string();
        assert!(message.contains("ftp"));
        assert!(message.contains("/files"));
        assert_eq!(err.code(), UNKNOWN_MAPPING_TYPE);
    }
}
