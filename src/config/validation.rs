//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check the upstream URL is a usable forwarding target
//! - Validate value ranges (timeouts > 0, ports valid)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ProxyConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use thiserror::Error;

use crate::config::schema::ProxyConfig;
use crate::routing::UpstreamTarget;

/// A single semantic problem with a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("invalid upstream URL {url:?}: {reason}")]
    Upstream { url: String, reason: String },

    #[error("invalid bind address {0:?}: expected [host]:port")]
    BindAddress(String),

    #[error("invalid log level {0:?}")]
    LogLevel(String),

    #[error("timeouts.{0} must be greater than zero")]
    ZeroTimeout(&'static str),
}

/// Check a configuration, collecting every problem found.
pub fn validate_config(config: &ProxyConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if let Err(e) = UpstreamTarget::parse(&config.upstream.url) {
        errors.push(ValidationError::Upstream {
            url: config.upstream.url.clone(),
            reason: e.to_string(),
        });
    }

    let bind = &config.listener.bind_address;
    let port_ok = bind
        .rsplit_once(':')
        .is_some_and(|(_, port)| port.parse::<u16>().is_ok());
    if !port_ok {
        errors.push(ValidationError::BindAddress(bind.clone()));
    }

    if tracing_subscriber::EnvFilter::try_new(&config.observability.log_level).is_err() {
        errors.push(ValidationError::LogLevel(config.observability.log_level.clone()));
    }

    if config.timeouts.connect_secs == Some(0) {
        errors.push(ValidationError::ZeroTimeout("connect_secs"));
    }
    if config.timeouts.response_header_secs == Some(0) {
        errors.push(ValidationError::ZeroTimeout("response_header_secs"));
    }
    if config.timeouts.pool_idle_secs == 0 {
        errors.push(ValidationError::ZeroTimeout("pool_idle_secs"));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
