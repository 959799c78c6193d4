//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! ListenerConfig.bind_address
//!     → listener.rs (resolve ":port", bind dual-stack or IPv4)
//!     → Hand off to HTTP layer (axum::serve)
//! ```

pub mod listener;

pub use listener::bind;
