//! Axum router construction.

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use tower_http::{compression::CompressionLayer, timeout::TimeoutLayer, trace::TraceLayer};

use super::{handlers, middleware};

/// Build the application [`Router`] with all routes and middleware attached.
pub fn build(max_upload_bytes: usize) -> Router {
    Router::new()
        .route("/convert/txt-to-json", post(handlers::txt_to_json))
        .route("/convert/txt-to-xml", post(handlers::txt_to_xml))
        .route("/convert/to-txt", post(handlers::to_txt))
        .route("/health", get(handlers::health))
        .fallback(handlers::not_found)
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(middleware::REQUEST_TIMEOUT))
        .layer(CompressionLayer::new())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use tower::ServiceExt;

    const MAX_UPLOAD: usize = 1024 * 1024;
    const BOUNDARY: &str = "test-boundary";

    fn multipart_request(uri: &str, parts: &[(&str, Option<&str>, &str)]) -> Request<Body> {
        let mut body = String::new();
        for (name, file_name, value) in parts {
            body.push_str(&format!("--{BOUNDARY}\r\n"));
            match file_name {
                Some(f) => body.push_str(&format!(
                    "Content-Disposition: form-data; name=\"{name}\"; filename=\"{f}\"\r\nContent-Type: text/plain\r\n\r\n"
                )),
                None => body.push_str(&format!(
                    "Content-Disposition: form-data; name=\"{name}\"\r\n\r\n"
                )),
            }
            body.push_str(value);
            body.push_str("\r\n");
        }
        body.push_str(&format!("--{BOUNDARY}--\r\n"));

        Request::builder()
            .method("POST")
            .uri(uri)
            .header(
                "content-type",
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap()
    }

    #[tokio::test]
    async fn health_route_returns_ok() {
        let app = build(MAX_UPLOAD);
        let req = Request::builder()
            .uri("/health")
            .body(Body::empty())
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn unknown_route_returns_404() {
        let app = build(MAX_UPLOAD);
        let req = Request::builder()
            .uri("/unknown")
            .body(Body::empty())
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), 404);
    }

    #[tokio::test]
    async fn txt_to_json_converts_an_upload() {
        let app = build(MAX_UPLOAD);
        let req = multipart_request(
            "/convert/txt-to-json",
            &[
                ("file", Some("clients.txt"), "DOC1;Juan;Perez;1234;A;555-0001"),
                ("delimiter", None, ";"),
                ("key", None, "mypassword123"),
            ],
        );
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let doc: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(doc["clientes"][0]["documento"], "DOC1");
    }

    #[tokio::test]
    async fn missing_form_fields_is_bad_request() {
        let app = build(MAX_UPLOAD);
        let req = multipart_request(
            "/convert/txt-to-json",
            &[("file", Some("clients.txt"), "DOC1;Juan;Perez;1234;A;555-0001")],
        );
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn unparseable_upload_is_unprocessable() {
        let app = build(MAX_UPLOAD);
        let req = multipart_request(
            "/convert/txt-to-xml",
            &[
                ("file", Some("clients.txt"), "only;three;fields"),
                ("delimiter", None, ";"),
                ("key", None, "mypassword123"),
            ],
        );
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn unsupported_upload_type_is_415() {
        let app = build(MAX_UPLOAD);
        let req = multipart_request(
            "/convert/to-txt",
            &[
                ("file", Some("photo.png"), "binaryish"),
                ("delimiter", None, ";"),
                ("key", None, "mypassword123"),
            ],
        );
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
    }
}
