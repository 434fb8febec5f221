//! HTTP API layer for rhythme.
//!
//! This crate provides the REST API and real-time streaming:
//!
//! - **Endpoints**: JSON REST API under `/api/v1`
//! - **Extractors**: Authentication
//! - **Middleware**: Token auth, application state
//! - **Streaming**: WebSocket push for messages, notifications, and post events
//!
//! Built on Axum 0.8 with Tower middleware stack.

pub mod endpoints;
pub mod extractors;
pub mod middleware;
pub mod response;
pub mod streaming;

pub use endpoints::router;
pub use streaming::{BroadcastEventPublisher, StreamingState, streaming_handler};
