//! Axum middleware layers applied to the router.
//!
//! Includes request tracing, timeout enforcement, response compression,
//! and the multipart body size limit.

use std::time::Duration;

/// Default per-request timeout applied to all routes.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
