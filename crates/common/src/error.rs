//! Common error types shared across crates.

use thiserror::Error;

/// Top-level service error type.
///
/// Variants map to HTTP status codes returned to callers:
/// - [`ServiceError::BadRequest`] → 400
/// - [`ServiceError::UnsupportedFileType`] → 415
/// - [`ServiceError::ConversionFailure`] → 422
/// - [`ServiceError::Internal`] → 500
#[derive(Debug, Error)]
pub enum ServiceError {
    /// The request was malformed — missing upload field, blank delimiter or key.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// The uploaded file is neither JSON nor XML.
    #[error("unsupported file type: {0}")]
    UnsupportedFileType(String),

    /// The upload was well-formed but the document could not be converted.
    #[error("conversion failure: {0}")]
    ConversionFailure(String),

    /// An unexpected internal error occurred.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ServiceError {
    /// Returns the HTTP status code that should be sent for this error.
    pub fn http_status(&self) -> u16 {
        match self {
            ServiceError::BadRequest(_) => 400,
            ServiceError::UnsupportedFileType(_) => 415,
            ServiceError::ConversionFailure(_) => 422,
            ServiceError::Internal(_) => 500,
        }
    }

    /// Short machine-readable code used in the wire-level error body.
    pub fn code(&self) -> &'static str {
        match self {
            ServiceError::BadRequest(_) => "bad_request",
            ServiceError::UnsupportedFileType(_) => "unsupported_file_type",
            ServiceError::ConversionFailure(_) => "conversion_failure",
            ServiceError::Internal(_) => "internal_error",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_status_codes() {
        assert_eq!(ServiceError::BadRequest("x".into()).http_status(), 400);
        assert_eq!(
            ServiceError::UnsupportedFileType("x".into()).http_status(),
            415
        );
        assert_eq!(
            ServiceError::ConversionFailure("x".into()).http_status(),
            422
        );
        assert_eq!(ServiceError::Internal("x".into()).http_status(), 500);
    }

    #[test]
    fn display_includes_message() {
        let e = ServiceError::BadRequest("missing file field".into());
        assert!(e.to_string().contains("missing file field"));
    }

    #[test]
    fn codes_are_stable() {
        assert_eq!(ServiceError::UnsupportedFileType("x".into()).code(), "unsupported_file_type");
        assert_eq!(ServiceError::ConversionFailure("x".into()).code(), "conversion_failure");
    }
}
