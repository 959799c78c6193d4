//! Transparent logging proxy for a single upstream HTTP service.
//!
//! Every request is logged (method, path, headers, a bounded body snippet),
//! relayed unchanged to the upstream, and its response streamed back. When
//! the upstream cannot be reached the caller gets a plain `502 Bad Gateway`.

pub mod config;
pub mod error;
pub mod http;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod routing;

pub use config::schema::ProxyConfig;
pub use error::ProxyError;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
