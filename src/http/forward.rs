//! Forwarding engine.
//!
//! # Responsibilities
//! - Rewrite inbound requests onto the upstream target
//! - Apply standard proxy header adjustments (Host, hop-by-hop, X-Forwarded-For)
//! - Send exactly one attempt through the pooled client (http or https)
//! - Hand back the upstream response with its body still streaming
//! - Tunnel `101 Switching Protocols` exchanges between caller and upstream
//!
//! # Design Decisions
//! - No retries, no failover: a failed attempt is reported as-is
//! - Response bodies are never buffered; frames flow as they arrive
//! - The only optional deadline covers waiting for response headers, so
//!   long-lived streaming responses are never cut short

use axum::body::Body;
use axum::http::{
    header, HeaderMap, HeaderName, HeaderValue, Request, Response, StatusCode, Version,
};
use hyper::body::Incoming;
use hyper::upgrade::OnUpgrade;
use hyper_rustls::{HttpsConnector, HttpsConnectorBuilder};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::{TokioExecutor, TokioIo},
};
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::Instrument;

use crate::config::TimeoutConfig;
use crate::routing::UpstreamTarget;

/// Pooled HTTP(S) client used for every upstream exchange.
pub type UpstreamClient = Client<HttpsConnector<HttpConnector>, Body>;

const X_FORWARDED_FOR: &str = "x-forwarded-for";

/// Headers that describe a single connection and must not be relayed.
///
/// `Connection` and `Upgrade` are put back for protocol upgrades; see
/// [`Forwarder::forward`].
const HOP_BY_HOP: &[&str] = &[
    "connection",
    "proxy-connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

/// A failed attempt to exchange with the upstream.
#[derive(Debug, Error)]
pub enum ForwardError {
    #[error("invalid upstream URI")]
    Uri(#[from] axum::http::Error),

    #[error("upstream request failed")]
    Upstream(#[from] hyper_util::client::legacy::Error),

    #[error("no response headers from upstream within {0:?}")]
    HeaderTimeout(Duration),

    #[error("upstream switched protocols to {got:?} when {requested:?} was requested")]
    UpgradeMismatch {
        requested: Option<String>,
        got: Option<String>,
    },
}

/// Build the upstream client from the timeout settings.
///
/// Root certificates come from the platform store, falling back to the
/// bundled webpki roots when none can be loaded.
pub fn build_client(timeouts: &TimeoutConfig) -> UpstreamClient {
    let mut connector = HttpConnector::new();
    connector.enforce_http(false);
    connector.set_connect_timeout(timeouts.connect());
    connector.set_nodelay(true);

    let roots = match HttpsConnectorBuilder::new().with_native_roots() {
        Ok(builder) => builder,
        Err(e) => {
            tracing::warn!(error = %e, "No native root certificates, using bundled webpki roots");
            HttpsConnectorBuilder::new().with_webpki_roots()
        }
    };
    let tls = roots.https_or_http().enable_http1().wrap_connector(connector);

    Client::builder(TokioExecutor::new())
        .pool_idle_timeout(timeouts.pool_idle())
        .build(tls)
}

/// Relays requests to the single upstream.
#[derive(Clone)]
pub struct Forwarder {
    client: UpstreamClient,
    target: Arc<UpstreamTarget>,
    header_timeout: Option<Duration>,
}

impl Forwarder {
    pub fn new(target: Arc<UpstreamTarget>, timeouts: &TimeoutConfig) -> Self {
        Self {
            client: build_client(timeouts),
            target,
            header_timeout: timeouts.response_header(),
        }
    }

    /// Forward `request` and return the upstream response once its headers arrive.
    ///
    /// `client_ip` is appended to `X-Forwarded-For` when known. When the
    /// caller asks for a protocol upgrade and the upstream answers `101`, both
    /// upgraded connections are joined by a background tunnel.
    pub async fn forward(
        &self,
        request: Request<Body>,
        client_ip: Option<IpAddr>,
    ) -> Result<Response<Incoming>, ForwardError> {
        let (mut parts, body) = request.into_parts();

        let requested = upgrade_protocol(&parts.headers);
        let caller_upgrade = parts.extensions.remove::<OnUpgrade>();

        parts.uri = self.target.uri_for(&parts.uri)?;
        parts.version = Version::HTTP_11;

        strip_hop_by_hop(&mut parts.headers);
        if let Some(protocol) = &requested {
            set_upgrade(&mut parts.headers, protocol.clone());
        }
        // Framing follows the replacement body, not what the caller declared.
        parts.headers.remove(header::CONTENT_LENGTH);
        parts
            .headers
            .insert(header::HOST, self.target.host_header().clone());
        if let Some(ip) = client_ip {
            append_forwarded_for(&mut parts.headers, ip);
        }

        let pending = self.client.request(Request::from_parts(parts, body));
        let response = match self.header_timeout {
            Some(limit) => tokio::time::timeout(limit, pending)
                .await
                .map_err(|_| ForwardError::HeaderTimeout(limit))??,
            None => pending.await?,
        };

        let (mut parts, body) = response.into_parts();
        let switched = upgrade_protocol(&parts.headers);
        strip_hop_by_hop(&mut parts.headers);

        if parts.status == StatusCode::SWITCHING_PROTOCOLS {
            let upstream_upgrade = parts.extensions.remove::<OnUpgrade>();
            match (requested, switched, caller_upgrade, upstream_upgrade) {
                (Some(asked), Some(got), Some(caller), Some(upstream))
                    if asked.as_bytes().eq_ignore_ascii_case(got.as_bytes()) =>
                {
                    set_upgrade(&mut parts.headers, got);
                    tokio::spawn(tunnel(caller, upstream).in_current_span());
                }
                (asked, got, _, _) => {
                    let text = |v: Option<HeaderValue>| {
                        v.map(|v| String::from_utf8_lossy(v.as_bytes()).into_owned())
                    };
                    return Err(ForwardError::UpgradeMismatch {
                        requested: text(asked),
                        got: text(got),
                    });
                }
            }
        }

        Ok(Response::from_parts(parts, body))
    }
}

/// The `Upgrade` value when `Connection` lists `upgrade`.
fn upgrade_protocol(headers: &HeaderMap) -> Option<HeaderValue> {
    let wants_upgrade = headers
        .get_all(header::CONNECTION)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .any(|token| token.trim().eq_ignore_ascii_case("upgrade"));

    if wants_upgrade {
        headers.get(header::UPGRADE).cloned()
    } else {
        None
    }
}

fn set_upgrade(headers: &mut HeaderMap, protocol: HeaderValue) {
    headers.insert(header::CONNECTION, HeaderValue::from_static("upgrade"));
    headers.insert(header::UPGRADE, protocol);
}

/// Copy bytes both ways between the upgraded caller and upstream connections.
async fn tunnel(caller: OnUpgrade, upstream: OnUpgrade) {
    let (caller, upstream) = match tokio::try_join!(caller, upstream) {
        Ok(pair) => pair,
        Err(e) => {
            tracing::warn!(error = %e, "Protocol upgrade failed");
            return;
        }
    };

    let mut caller = TokioIo::new(caller);
    let mut upstream = TokioIo::new(upstream);
    match tokio::io::copy_bidirectional(&mut caller, &mut upstream).await {
        Ok((sent, received)) => {
            tracing::debug!(sent, received, "Upgraded connection closed")
        }
        Err(e) => tracing::debug!(error = %e, "Upgraded connection ended"),
    }
}

/// Remove connection-scoped headers, including any named by `Connection`.
pub fn strip_hop_by_hop(headers: &mut HeaderMap) {
    let named: Vec<HeaderName> = headers
        .get_all(header::CONNECTION)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .filter_map(|name| HeaderName::from_bytes(name.trim().as_bytes()).ok())
        .collect();

    for name in named {
        headers.remove(name);
    }
    for name in HOP_BY_HOP {
        headers.remove(*name);
    }
}

/// Append the caller's address to any existing `X-Forwarded-For` chain.
pub fn append_forwarded_for(headers: &mut HeaderMap, ip: IpAddr) {
    let prior: Vec<&str> = headers
        .get_all(X_FORWARDED_FOR)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .collect();

    let chain = if prior.is_empty() {
        ip.to_string()
    } else {
        format!("{}, {}", prior.join(", "), ip)
    };

    if let Ok(value) = HeaderValue::from_str(&chain) {
        headers.insert(X_FORWARDED_FOR, value);
    }
}
