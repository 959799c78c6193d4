//! Crate-level error types.

use thiserror::Error;

use crate::config::ConfigError;
use crate::routing::TargetError;

/// Errors that stop the proxy from starting or serving.
#[derive(Debug, Error)]
pub enum ProxyError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("invalid upstream: {0}")]
    Target(#[from] TargetError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Render an error and all of its sources on one line, `outer: inner: root`.
///
/// A source whose text already ends the rendered chain is skipped, so wrappers
/// that repeat their inner message do not print it twice.
pub fn error_chain(err: &(dyn std::error::Error + 'static)) -> String {
    let mut rendered = err.to_string();
    let mut source = err.source();
    while let Some(inner) = source {
        let text = inner.to_string();
        if !rendered.ends_with(&text) {
            rendered.push_str(": ");
            rendered.push_str(&text);
        }
        source = inner.source();
    }
    rendered
}
