//! Structured logging setup.

use std::io::IsTerminal;
use tracing::Subscriber;
use tracing_subscriber::{fmt::MakeWriter, layer::SubscriberExt, EnvFilter};

use crate::config::{LogFormat, ObservabilityConfig};

/// Build the filter: `RUST_LOG` if set, otherwise the configured level for this crate.
pub fn env_filter(config: &ObservabilityConfig) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "ollama_proxy={level},tower_http={level}",
            level = config.log_level
        ))
    })
}

/// Build a subscriber writing records to `writer` in the configured format.
pub fn subscriber<W>(
    config: &ObservabilityConfig,
    writer: W,
    ansi: bool,
) -> Box<dyn Subscriber + Send + Sync>
where
    W: for<'a> MakeWriter<'a> + Send + Sync + 'static,
{
    let registry = tracing_subscriber::registry().with(env_filter(config));

    match config.log_format {
        LogFormat::Text => Box::new(
            registry.with(
                tracing_subscriber::fmt::layer()
                    .with_ansi(ansi)
                    .with_writer(writer),
            ),
        ),
        LogFormat::Json => Box::new(
            registry.with(tracing_subscriber::fmt::layer().json().with_writer(writer)),
        ),
    }
}

/// Install the global subscriber on stdout. Call once, before anything logs.
pub fn init(config: &ObservabilityConfig) {
    let ansi = std::io::stdout().is_terminal();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber(config, std::io::stdout, ansi)) {
        eprintln!("Failed to install log subscriber: {}", e);
    }
}
