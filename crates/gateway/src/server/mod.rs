//! Axum HTTP server, routing, and middleware.
//!
//! # Responsibilities
//! - Define the Axum router with the conversion routes and shared layers.
//! - Decode multipart uploads and hand their contents to the codec crate.
//! - Map codec errors onto the wire-level error envelope.

pub mod handlers;
pub mod middleware;
pub mod router;
