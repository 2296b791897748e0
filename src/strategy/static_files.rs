//! Static strategy: mount a directory tree at a share path.

use crate::config::StaticMapping;
use crate::error::DispatchError;
use crate::routing::Application;

pub const STRATEGY: &str = "static";

/// Validates a static mapping and hands the directory to the application's
/// static serving.
pub struct StaticHandler;

impl StaticHandler {
    /// Mount `mapping.local_path` at `mapping.share_path`.
    ///
    /// Fails with [`DispatchError::MissingLocalPath`] before anything is
    /// registered when the mapping has no local path.
    pub fn map(app: &Application, mapping: StaticMapping) -> Result<(), DispatchError> {
        let Some(local_path) = mapping.local_path else {
            return Err(DispatchError::MissingLocalPath {
                share_path: mapping.share_path,
            });
        };

        tracing::info!(
            share_path = %mapping.share_path,
            local_path = %local_path.display(),
            "Mounting static directory"
        );
        app.mount_static(&mapping.share_path, local_path);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MISSING_LOCALPATH;
    use crate::routing::RouteKind;

    #[test]
    fn missing_local_path_registers_nothing() {
        let app = Application::new();
        let err = StaticHandler::map(
            &app,
            StaticMapping {
                share_path: "/proxy".into(),
                local_path: None,
            },
        )
        .unwrap_err();

        assert_eq!(err.code(), MISSING_LOCALPATH);
        assert_eq!(app.route_count(), 0);
    }

    #[test]
    fn mounts_directory() {
        let app = Application::new();
        StaticHandler::map(
            &app,
            StaticMapping {
                share_path: "/proxy".into(),
                local_path: Some("/local".into()),
            },
        )
        .unwrap();

        let table = app.snapshot();
        assert_eq!(table.len(), 1);
        let route = table.iter().next().unwrap();
        assert_eq!(route.share_path(), "/proxy");
        assert_eq!(route.kind(), RouteKind::Mount);
        assert_eq!(route.strategy(), STRATEGY);
    }
}
