//! Test application factory for middleware tests.

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    response::IntoResponse,
    routing::get,
    Router,
};
use http_body_util::BodyExt;
use std::sync::Arc;
use tower::ServiceExt;

use secure_media::api::{protect_media, with_secure_media};
use secure_media::models::MediaConfig;

use super::fixtures;

/// Test application: a small site whose responses pass through the
/// link-signing middleware
pub struct TestApp {
    router: Router,
}

impl TestApp {
    /// Create a test application signing with the fixture configuration
    pub fn new() -> Self {
        let signer = Arc::new(fixtures::signer());
        Self {
            router: with_secure_media(site_router(), signer),
        }
    }

    /// Create a test application from an arbitrary configuration
    pub fn with_config(config: &MediaConfig) -> Self {
        Self {
            router: protect_media(site_router(), config),
        }
    }

    /// Make a GET request to the given path
    pub async fn get(&self, path: &str) -> TestResponse {
        self.request(Request::get(path).body(Body::empty()).unwrap())
            .await
    }

    /// Send a request to the router
    async fn request(&self, request: Request<Body>) -> TestResponse {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Request failed");

        let status = response.status();
        let headers = response.headers().clone();
        let body = response
            .into_body()
            .collect()
            .await
            .expect("Failed to collect body")
            .to_bytes()
            .to_vec();

        TestResponse {
            status,
            headers,
            body,
        }
    }
}

impl Default for TestApp {
    fn default() -> Self {
        Self::new()
    }
}

/// Routes standing in for a rendered site
fn site_router() -> Router {
    Router::new()
        .route("/post", get(|| async { html(fixtures::POST_HTML) }))
        .route("/plain", get(|| async { html(fixtures::PLAIN_HTML) }))
        .route(
            "/feed.json",
            get(|| async {
                (
                    [(header::CONTENT_TYPE, "application/json")],
                    r#"{"image":"/wp-content/uploads/a.png"}"#,
                )
            }),
        )
        .route(
            "/raw.bin",
            get(|| async {
                (
                    [(header::CONTENT_TYPE, "application/octet-stream")],
                    "'/wp-content/uploads/a.png'",
                )
            }),
        )
        .route(
            "/gzip",
            get(|| async {
                (
                    [
                        (header::CONTENT_TYPE, "text/html"),
                        (header::CONTENT_ENCODING, "gzip"),
                    ],
                    "'/wp-content/uploads/a.png'",
                )
            }),
        )
        .route(
            "/latin1",
            get(|| async {
                (
                    [(header::CONTENT_TYPE, "text/html; charset=iso-8859-1")],
                    b"\xe9 '/wp-content/uploads/a.png'".to_vec(),
                )
            }),
        )
        .route(
            "/large-stream",
            get(|| async {
                let chunks = (0..fixtures::LARGE_CHUNKS)
                    .map(|i| Ok::<_, std::io::Error>(fixtures::large_chunk(i)));
                (
                    [(header::CONTENT_TYPE, "text/plain")],
                    Body::from_stream(futures_util::stream::iter(chunks)),
                )
            }),
        )
        .route(
            "/small-stream",
            get(|| async {
                let chunks = ["<img src='/wp-content/", "uploads/a.png'>"]
                    .map(|chunk| Ok::<_, std::io::Error>(chunk));
                (
                    [(header::CONTENT_TYPE, "text/html")],
                    Body::from_stream(futures_util::stream::iter(chunks)),
                )
            }),
        )
        .route(
            "/missing",
            get(|| async { (StatusCode::NOT_FOUND, html("<img src='/wp-content/uploads/gone.png'>")) }),
        )
}

fn html(body: &'static str) -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "text/html; charset=utf-8")], body)
}

/// Test response with convenience methods
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: axum::http::HeaderMap,
    pub body: Vec<u8>,
}

impl TestResponse {
    /// Get body as string
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).to_string()
    }

    /// Get raw body bytes
    pub fn bytes(&self) -> &[u8] {
        &self.body
    }

    /// Content-Length header, if present
    pub fn content_length(&self) -> Option<usize> {
        self.headers
            .get(header::CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse().ok())
    }
}
