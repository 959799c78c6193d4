//! TCP listener binding.
//!
//! # Responsibilities
//! - Bind to the configured address
//! - Turn a bare `:port` into an all-interfaces bind
//!
//! # Design Decisions
//! - A bare port tries the IPv6 wildcard first, which also accepts IPv4
//!   callers on dual-stack hosts, then falls back to the IPv4 wildcard
//! - Explicit addresses are bound exactly as written

use std::io;
use tokio::net::TcpListener;

use crate::config::ListenerConfig;

/// Bind a listener for `config`, trying each candidate address in order.
pub async fn bind(config: &ListenerConfig) -> io::Result<TcpListener> {
    let mut last_err = None;

    for addr in config.bind_candidates() {
        match TcpListener::bind(addr.as_str()).await {
            Ok(listener) => {
                if let Ok(local) = listener.local_addr() {
                    tracing::debug!(address = %local, "Listener bound");
                }
                return Ok(listener);
            }
            Err(e) => {
                tracing::debug!(address = %addr, error = %e, "Bind attempt failed");
                last_err = Some(e);
            }
        }
    }

    Err(last_err.unwrap_or_else(|| {
        io::Error::new(io::ErrorKind::InvalidInput, "no address to bind")
    }))
}
