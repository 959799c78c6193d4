//! The single upstream forwarding target.
//!
//! # Responsibilities
//! - Validate the upstream base URL once at startup
//! - Rewrite inbound request URIs onto the upstream
//!
//! # Design Decisions
//! - Paths are joined with exactly one slash between base and request path
//! - Base query and request query are both kept, base first
//! - Both http and https upstreams are accepted; the scheme is carried through

use axum::http::uri::{Authority, PathAndQuery, Scheme};
use axum::http::{HeaderValue, Uri};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use url::Url;

/// Why an upstream URL was rejected.
#[derive(Debug, Error)]
pub enum TargetError {
    #[error(transparent)]
    Parse(#[from] url::ParseError),

    #[error("unsupported scheme {0:?} (expected http or https)")]
    UnsupportedScheme(String),

    #[error("missing host")]
    MissingHost,

    #[error("invalid authority: {0}")]
    Authority(#[from] axum::http::uri::InvalidUri),
}

/// A parsed, immutable upstream base URL.
#[derive(Debug, Clone)]
pub struct UpstreamTarget {
    url: Url,
    scheme: Scheme,
    authority: Authority,
    host_header: HeaderValue,
}

impl UpstreamTarget {
    /// Parse and validate an upstream base URL.
    pub fn parse(raw: &str) -> Result<Self, TargetError> {
        let url = Url::parse(raw)?;

        let scheme = match url.scheme() {
            "http" => Scheme::HTTP,
            "https" => Scheme::HTTPS,
            other => return Err(TargetError::UnsupportedScheme(other.to_string())),
        };

        let host = url.host_str().ok_or(TargetError::MissingHost)?;
        let authority = match url.port() {
            Some(port) => format!("{}:{}", host, port),
            None => host.to_string(),
        };
        let authority = Authority::from_str(&authority)?;
        let host_header = HeaderValue::from_str(authority.as_str())
            .map_err(|_| TargetError::MissingHost)?;

        Ok(Self {
            url,
            scheme,
            authority,
            host_header,
        })
    }

    /// Value for the outbound `Host` header.
    pub fn host_header(&self) -> &HeaderValue {
        &self.host_header
    }

    /// Rewrite an inbound URI so it targets this upstream.
    pub fn uri_for(&self, inbound: &Uri) -> Result<Uri, axum::http::Error> {
        let path = join_paths(self.url.path(), inbound.path());

        let query = match (self.url.query(), inbound.query()) {
            (Some(base), Some(req)) if !base.is_empty() && !req.is_empty() => {
                Some(format!("{}&{}", base, req))
            }
            (Some(base), _) if !base.is_empty() => Some(base.to_string()),
            (_, Some(req)) if !req.is_empty() => Some(req.to_string()),
            _ => None,
        };

        let path_and_query = match query {
            Some(q) => PathAndQuery::from_str(&format!("{}?{}", path, q))?,
            None => PathAndQuery::from_str(&path)?,
        };

        Uri::builder()
            .scheme(self.scheme.clone())
            .authority(self.authority.clone())
            .path_and_query(path_and_query)
            .build()
    }
}

impl fmt::Display for UpstreamTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.url)
    }
}

fn join_paths(base: &str, path: &str) -> String {
    match (base.ends_with('/'), path.starts_with('/')) {
        (true, true) => format!("{}{}", base, &path[1..]),
        (false, false) => format!("{}/{}", base, path),
        _ => format!("{}{}", base, path),
    }
}
