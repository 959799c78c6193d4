//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! request / response / failure records
//!     → tracing events (one event per record)
//!     → logging.rs subscriber (EnvFilter + fmt layer)
//!     → stdout
//! ```
//!
//! # Design Decisions
//! - Every record is a single event, so the fmt layer writes it in one call
//!   and concurrent records never interleave mid-record
//! - `RUST_LOG` wins over the configured level

pub mod logging;

pub use logging::init;
