//! Axum request handlers for all gateway endpoints.
//!
//! Every conversion route accepts a `multipart/form-data` upload with a
//! `file` part plus `delimiter` and `key` text parts, mirroring the form
//! contract of the service this one replaces.

use axum::{
    extract::Multipart,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use common::protocol::{ErrorResponse, HealthResponse};
use common::ServiceError;
use tracing::warn;

use codec::ConvertError;

/// A decoded conversion upload.
struct UploadForm {
    content: String,
    file_name: Option<String>,
    content_type: Option<String>,
    delimiter: String,
    key: String,
}

/// Which document format an upload carries, for the `to-txt` route.
#[derive(Debug)]
enum UploadKind {
    Json,
    Xml,
}

impl UploadForm {
    /// Read the multipart stream into an [`UploadForm`].
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::BadRequest`] when a part cannot be read
    /// (oversized or non-UTF-8 upload) or a required part is absent.
    async fn read(mut multipart: Multipart) -> Result<Self, ServiceError> {
        let mut content = None;
        let mut file_name = None;
        let mut content_type = None;
        let mut delimiter = None;
        let mut key = None;

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| ServiceError::BadRequest(format!("unreadable multipart body: {e}")))?
        {
            match field.name() {
                Some("file") => {
                    file_name = field.file_name().map(str::to_owned);
                    content_type = field.content_type().map(str::to_owned);
                    content = Some(field.text().await.map_err(|e| {
                        ServiceError::BadRequest(format!("file part must be UTF-8 text: {e}"))
                    })?);
                }
                Some("delimiter") => {
                    delimiter = Some(field.text().await.map_err(|e| {
                        ServiceError::BadRequest(format!("unreadable delimiter part: {e}"))
                    })?);
                }
                Some("key") => {
                    key = Some(field.text().await.map_err(|e| {
                        ServiceError::BadRequest(format!("unreadable key part: {e}"))
                    })?);
                }
                _ => {}
            }
        }

        match (content, delimiter, key) {
            (Some(content), Some(delimiter), Some(key)) if !delimiter.is_empty() && !key.is_empty() => {
                Ok(Self {
                    content,
                    file_name,
                    content_type,
                    delimiter,
                    key,
                })
            }
            _ => Err(ServiceError::BadRequest(
                "missing file, delimiter, or key field".into(),
            )),
        }
    }

    /// Decide whether the uploaded document is JSON or XML, from the
    /// part's content type first and the file extension second.
    fn kind(&self) -> Result<UploadKind, ServiceError> {
        let content_type = self.content_type.as_deref().unwrap_or("");
        let file_name = self.file_name.as_deref().unwrap_or("");

        if content_type == "application/json" || file_name.ends_with(".json") {
            Ok(UploadKind::Json)
        } else if content_type == "application/xml"
            || content_type == "text/xml"
            || file_name.ends_with(".xml")
        {
            Ok(UploadKind::Xml)
        } else {
            Err(ServiceError::UnsupportedFileType(format!(
                "{}; supported types: JSON, XML",
                if content_type.is_empty() { file_name } else { content_type }
            )))
        }
    }
}

/// `POST /convert/txt-to-json` — delimited text upload → JSON document.
pub async fn txt_to_json(multipart: Multipart) -> Response {
    let form = match UploadForm::read(multipart).await {
        Ok(form) => form,
        Err(e) => return service_error_response(e),
    };
    match codec::generate_json(&form.content, &form.delimiter, &form.key) {
        Ok(json) => ([(header::CONTENT_TYPE, "application/json")], json).into_response(),
        Err(e) => convert_error_response(e),
    }
}

/// `POST /convert/txt-to-xml` — delimited text upload → XML document.
pub async fn txt_to_xml(multipart: Multipart) -> Response {
    let form = match UploadForm::read(multipart).await {
        Ok(form) => form,
        Err(e) => return service_error_response(e),
    };
    match codec::generate_xml(&form.content, &form.delimiter, &form.key) {
        Ok(xml) => ([(header::CONTENT_TYPE, "application/xml")], xml).into_response(),
        Err(e) => convert_error_response(e),
    }
}

/// `POST /convert/to-txt` — JSON or XML upload → delimited text.
///
/// The input format is chosen from the uploaded part's content type or
/// file extension; anything else is rejected with 415.
pub async fn to_txt(multipart: Multipart) -> Response {
    let form = match UploadForm::read(multipart).await {
        Ok(form) => form,
        Err(e) => return service_error_response(e),
    };
    let result = match form.kind() {
        Ok(UploadKind::Json) => codec::json_to_text(&form.content, &form.key, &form.delimiter),
        Ok(UploadKind::Xml) => codec::xml_to_text(&form.content, &form.key, &form.delimiter).await,
        Err(e) => return service_error_response(e),
    };
    match result {
        Ok(text) => ([(header::CONTENT_TYPE, "text/plain")], text).into_response(),
        Err(e) => convert_error_response(e),
    }
}

/// `GET /health` — liveness check.
pub async fn health() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok".into(),
        version: env!("CARGO_PKG_VERSION").into(),
    })
}

/// Catch-all 404 handler.
pub async fn not_found() -> impl IntoResponse {
    let err = ErrorResponse::new("not_found", "the requested resource does not exist");
    (StatusCode::NOT_FOUND, Json(err))
}

// ---------------------------------------------------------------------------
// Error mapping
// ---------------------------------------------------------------------------

fn convert_error_response(err: ConvertError) -> Response {
    warn!(error = %err, "conversion failed");
    let svc = match &err {
        ConvertError::InvalidInput(_) => ServiceError::BadRequest(err.to_string()),
        ConvertError::Internal(_) => ServiceError::Internal(err.to_string()),
        _ => ServiceError::ConversionFailure(err.to_string()),
    };
    service_error_response(svc)
}

fn service_error_response(err: ServiceError) -> Response {
    let status = StatusCode::from_u16(err.http_status())
        .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let body = ErrorResponse::new(err.code(), err.to_string());
    (status, Json(body)).into_response()
}
