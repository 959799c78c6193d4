//! Configuration loading from disk and the environment.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::ProxyConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Environment variable holding the listen address.
pub const PROXY_PORT_VAR: &str = "PROXY_PORT";
/// Environment variable holding the upstream base URL.
pub const UPSTREAM_URL_VAR: &str = "OLLAMA_URL";

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Values that take precedence over both the config file and the environment.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub listen: Option<String>,
    pub upstream: Option<String>,
}

/// Parse a TOML file without validating it.
pub fn read_config(path: &Path) -> Result<ProxyConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    Ok(toml::from_str(&content)?)
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<ProxyConfig, ConfigError> {
    let config = read_config(path)?;
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

/// Overlay `PROXY_PORT` / `OLLAMA_URL` from `lookup`. Empty values count as unset.
pub fn apply_env<F>(config: &mut ProxyConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let non_empty = |name: &str| lookup(name).filter(|v| !v.is_empty());

    if let Some(listen) = non_empty(PROXY_PORT_VAR) {
        config.listener.bind_address = listen;
    }
    if let Some(url) = non_empty(UPSTREAM_URL_VAR) {
        config.upstream.url = url;
    }
}

/// Build the effective configuration: defaults, optional file, environment, then overrides.
pub fn resolve_config(
    path: Option<&Path>,
    overrides: &Overrides,
) -> Result<ProxyConfig, ConfigError> {
    let mut config = match path {
        Some(path) => read_config(path)?,
        None => ProxyConfig::default(),
    };

    apply_env(&mut config, |name| std::env::var(name).ok());

    if let Some(listen) = &overrides.listen {
        config.listener.bind_address = listen.clone();
    }
    if let Some(upstream) = &overrides.upstream {
        config.upstream.url = upstream.clone();
    }

    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn env_overrides_defaults() {
        let mut config = ProxyConfig::default();
        apply_env(
            &mut config,
            env(&[(PROXY_PORT_VAR, ":9999"), (UPSTREAM_URL_VAR, "http://gpu-box:11434")]),
        );
        assert_eq!(config.listener.bind_address, ":9999");
        assert_eq!(config.upstream.url, "http://gpu-box:11434");
    }

    #[test]
    fn empty_env_values_are_ignored() {
        let mut config = ProxyConfig::default();
        apply_env(&mut config, env(&[(PROXY_PORT_VAR, ""), (UPSTREAM_URL_VAR, "")]));
        assert_eq!(config.listener.bind_address, ":8080");
        assert_eq!(config.upstream.url, "http://localhost:11434");
    }

    #[test]
    fn load_config_validates_file() {
        let dir = std::env::temp_dir().join(format!("ollama-proxy-cfg-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();

        let good = dir.join("good.toml");
        fs::write(&good, "[listener]\nbind_address = \"127.0.0.1:7000\"\n").unwrap();
        let config = load_config(&good).unwrap();
        assert_eq!(config.listener.bind_address, "127.0.0.1:7000");

        let bad = dir.join("bad.toml");
        fs::write(&bad, "[upstream]\nurl = \"::nope::\"\n").unwrap();
        assert!(matches!(load_config(&bad), Err(ConfigError::Validation(_))));

        let garbled = dir.join("garbled.toml");
        fs::write(&garbled, "[upstream\n").unwrap();
        assert!(matches!(load_config(&garbled), Err(ConfigError::Parse(_))));

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = load_config(Path::new("/definitely/not/here.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
