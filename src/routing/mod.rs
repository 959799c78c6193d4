//! Request routing subsystem.
//!
//! # Data Flow
//! ```text
//! Inbound URI (path + query)
//!     → upstream.rs (join onto the single configured target)
//!     → absolute upstream URI handed to the forwarding engine
//! ```
//!
//! # Design Decisions
//! - Exactly one static upstream; no selection policy
//! - Target parsed once at startup and shared read-only via Arc

pub mod upstream;

pub use upstream::{TargetError, UpstreamTarget};
