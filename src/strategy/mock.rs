//! Mock strategy: answer every method with the bytes of a fixed file.

use std::io;
use std::path::Path;
use std::sync::Arc;

use axum::body::Body;
use axum::http::Request;
use axum::response::{IntoResponse, Response};
use tokio_util::io::ReaderStream;

use crate::config::MockMapping;
use crate::http::response::RouteError;
use crate::routing::{Application, Handler, HandlerFuture};

pub const STRATEGY: &str = "mock";

/// Streams `mock_file` as the response body. The file is checked and opened
/// on every request, so edits to it show up without a reload.
#[derive(Debug, Clone)]
pub struct MockHandler {
    mapping: MockMapping,
}

impl MockHandler {
    pub fn new(mapping: MockMapping) -> Self {
        Self { mapping }
    }

    /// Register a mock route for every method at `mapping.share_path`.
    pub fn map(app: &Application, mapping: MockMapping) {
        tracing::info!(
            share_path = %mapping.share_path,
            mock_file = %mapping.mock_file.display(),
            "Mapping mock route"
        );
        let share_path = mapping.share_path.clone();
        app.register_all(&share_path, STRATEGY, Arc::new(Self::new(mapping)));
    }
}

impl Handler for MockHandler {
    fn call(&self, request: Request<Body>) -> HandlerFuture {
        let mock_file = self.mapping.mock_file.clone();
        let method = request.method().clone();

        Box::pin(async move {
            match open_mock(&mock_file).await {
                Ok(body) => Response::new(body),
                Err(e) => {
                    tracing::warn!(method = %method, error = %e, "Mock file unavailable");
                    e.into_response()
                }
            }
        })
    }
}

async fn open_mock(path: &Path) -> Result<Body, RouteError> {
    let access = |source| RouteError::FileAccess {
        path: path.to_path_buf(),
        source,
    };

    let metadata = tokio::fs::metadata(path).await.map_err(access)?;
    if !metadata.is_file() {
        return Err(access(io::Error::new(io::ErrorKind::NotFound, "not a regular file")));
    }

    let file = tokio::fs::File::open(path).await.map_err(access)?;
    Ok(Body::from_stream(ReaderStream::new(file)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{header, Method, StatusCode};
    use std::io::Write;

    fn request(method: Method, uri: &str) -> Request<Body> {
        Request::builder().method(method).uri(uri).body(Body::empty()).unwrap()
    }

    async fn body_bytes(response: Response) -> Vec<u8> {
        axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap()
            .to_vec()
    }

    #[tokio::test]
    async fn pipes_file_bytes_unmodified() {
        let contents: &[u8] = b"{\"ok\":true}\n\xff\x00tail";
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents).unwrap();

        let handler = MockHandler::new(MockMapping {
            share_path: "/mock".into(),
            mock_file: file.path().to_path_buf(),
        });

        for method in [Method::GET, Method::POST, Method::DELETE] {
            let response = handler.call(request(method, "/mock")).await;
            assert_eq!(response.status(), StatusCode::OK);
            assert!(response.headers().get(header::CONTENT_TYPE).is_none());
            assert_eq!(body_bytes(response).await, contents);
        }
    }

    #[tokio::test]
    async fn map_registers_one_route() {
        let app = Application::new();
        MockHandler::map(
            &app,
            MockMapping {
                share_path: "/mock".into(),
                mock_file: "mock.json".into(),
            },
        );

        let table = app.snapshot();
        assert_eq!(table.len(), 1);
        let route = table.iter().next().unwrap();
        assert_eq!(route.share_path(), "/mock");
        assert_eq!(route.strategy(), STRATEGY);
    }

    #[tokio::test]
    async fn missing_file_resolves_with_not_found() {
        let handler = MockHandler::new(MockMapping {
            share_path: "/mock".into(),
            mock_file: "/nonexistent/mock.json".into(),
        });
        let response = handler.call(request(Method::GET, "/mock")).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn directory_is_not_served() {
        let dir = tempfile::tempdir().unwrap();
        let handler = MockHandler::new(MockMapping {
            share_path: "/mock".into(),
            mock_file: dir.path().to_path_buf(),
        });
        let response = handler.call(request(Method::GET, "/mock")).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
