//! Configuration schema definitions.
//!
//! Keys are camelCase in both TOML and JSON files. `pathMaps` keeps the order
//! entries appear in the file; that order is the route registration order.

use std::net::{IpAddr, Ipv4Addr};
use std::path::PathBuf;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::DispatchError;

/// Root configuration for the dispatcher.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Configuration {
    /// Upstream host used by proxy mappings that omit `serverPath`.
    pub default_api_address: String,

    /// Port the single listener binds to.
    pub listen_port: u16,

    /// Address the listener binds on.
    pub bind_host: IpAddr,

    /// Share path → mapping, in registration order.
    pub path_maps: IndexMap<String, PathMap>,

    /// Upper bound on waiting for closed listeners to drain at shutdown.
    pub drain_timeout_secs: u64,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            default_api_address: String::new(),
            listen_port: 8080,
            bind_host: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            path_maps: IndexMap::new(),
            drain_timeout_secs: 30,
            observability: ObservabilityConfig::default(),
        }
    }
}

/// A `pathMaps` entry as written in the file.
///
/// Which fields matter depends on `type`; [`PathMap::resolve`] turns it into
/// a typed [`RouteMapping`].
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default, rename_all = "camelCase")]
pub struct PathMap {
    #[serde(rename = "type")]
    pub kind: String,
    pub share_path: Option<String>,
    pub mock_file: Option<PathBuf>,
    pub server_path: Option<String>,
    pub local_path: Option<PathBuf>,
    pub forward_method: bool,
}

impl PathMap {
    /// Classify the entry by its `type` tag.
    ///
    /// `key` is the entry's `pathMaps` key and stands in for a missing
    /// `sharePath`. `default_api_address` stands in for a missing `serverPath`.
    pub fn resolve(&self, key: &str, default_api_address: &str) -> Result<RouteMapping, DispatchError> {
        let share_path = self
            .share_path
            .clone()
            .unwrap_or_else(|| key.to_string());

        match self.kind.as_str() {
            "mock" => {
                let mock_file = self.mock_file.clone().ok_or(DispatchError::MissingField {
                    kind: "mock",
                    field: "mockFile",
                    share_path: share_path.clone(),
                })?;
                Ok(RouteMapping::Mock(MockMapping { share_path, mock_file }))
            }
            "proxy" => {
                let server_path = self
                    .server_path
                    .clone()
                    .filter(|s| !s.is_empty())
                    .or_else(|| Some(default_api_address.to_string()).filter(|s| !s.is_empty()))
                    .ok_or(DispatchError::MissingField {
                        kind: "proxy",
                        field: "serverPath",
                        share_path: share_path.clone(),
                    })?;
                Ok(RouteMapping::Proxy(ProxyMapping {
                    share_path,
                    server_path,
                    forward_method: self.forward_method,
                }))
            }
            "static" => Ok(RouteMapping::Static(StaticMapping {
                share_path,
                local_path: self.local_path.clone(),
            })),
            other => Err(DispatchError::UnknownMappingType {
                kind: other.to_string(),
                share_path,
            }),
        }
    }
}

/// Serve a fixed file for every method.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockMapping {
    pub share_path: String,
    pub mock_file: PathBuf,
}

/// Relay requests to an upstream host over HTTPS.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyMapping {
    pub share_path: String,
    /// Upstream authority, `host` or `host:port`.
    pub server_path: String,
    /// Send the inbound method and body instead of a bare GET.
    pub forward_method: bool,
}

/// Serve a directory tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticMapping {
    pub share_path: String,
    /// Required when the mapping is applied.
    pub local_path: Option<PathBuf>,
}

/// A classified mapping, one variant per strategy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteMapping {
    Mock(MockMapping),
    Proxy(ProxyMapping),
    Static(StaticMapping),
}

impl RouteMapping {
    pub fn share_path(&self) -> &str {
        match self {
            RouteMapping::Mock(m) => &m.share_path,
            RouteMapping::Proxy(m) => &m.share_path,
            RouteMapping::Static(m) => &m.share_path,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            RouteMapping::Mock(_) => "mock",
            RouteMapping::Proxy(_) => "proxy",
            RouteMapping::Static(_) => "static",
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable the Prometheus endpoint.
    pub metrics_enabled: bool,

    /// Prometheus endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
