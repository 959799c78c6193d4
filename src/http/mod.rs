//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! Inbound request
//!     → server.rs (Axum catch-all route, per-exchange span)
//!     → body.rs (capture body, substitute a fresh copy)
//!     → request.rs (log request record)
//!     → forward.rs (single attempt to the upstream)
//!     → response.rs (log outcome, or 502 on failure)
//!     → Stream upstream body back to caller
//! ```

pub mod body;
pub mod forward;
pub mod request;
pub mod response;
pub mod server;

pub use body::{capture, BodySnapshot, CapturedBody, MAX_BODY_LOG};
pub use forward::{ForwardError, Forwarder};
pub use server::HttpServer;
