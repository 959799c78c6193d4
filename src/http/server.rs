//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with the catch-all proxy handler
//! - Wire up middleware (per-exchange tracing span)
//! - Bind server to listener with graceful shutdown
//! - Log each request, forward it, then log the outcome

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::Request,
    response::Response,
    routing::any,
    Router,
};
use http_body_util::BodyExt;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use crate::config::ProxyConfig;
use crate::error::{error_chain, ProxyError};
use crate::http::body;
use crate::http::forward::Forwarder;
use crate::http::request::log_request;
use crate::http::response::{bad_gateway, format_failure, log_failure, log_response};
use crate::routing::UpstreamTarget;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub forwarder: Forwarder,
}

/// HTTP server for the proxy.
pub struct HttpServer {
    router: Router,
    target: Arc<UpstreamTarget>,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new(config: &ProxyConfig) -> Result<Self, ProxyError> {
        let target = Arc::new(UpstreamTarget::parse(&config.upstream.url)?);
        let state = AppState {
            forwarder: Forwarder::new(target.clone(), &config.timeouts),
        };

        let router = Self::build_router(state);
        Ok(Self { router, target })
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(state: AppState) -> Router {
        let trace = TraceLayer::new_for_http()
            .make_span_with(|_: &Request<Body>| {
                tracing::info_span!("exchange", id = %Uuid::new_v4())
            })
            .on_request(())
            .on_response(())
            .on_body_chunk(())
            .on_eos(())
            .on_failure(());

        Router::new()
            .route("/{*path}", any(proxy_handler))
            .route("/", any(proxy_handler))
            .with_state(state)
            .layer(trace)
    }

    /// Run the server until `shutdown` fires, accepting connections on `listener`.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            "Ollama proxy listening on {}, forwarding to {}",
            addr,
            self.target
        );

        let app = self
            .router
            .into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Consume the server and return its router (useful for in-process tests).
    pub fn into_router(self) -> Router {
        self.router
    }
}

/// Main proxy handler: log the request, forward it, log the outcome.
async fn proxy_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let client_ip = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip());

    let (parts, inbound) = request.into_parts();
    let (captured, replacement) = body::capture(inbound).await;
    log_request(&parts, &captured);
    drop(captured);

    let request = Request::from_parts(parts, replacement);
    match state.forwarder.forward(request, client_ip).await {
        Ok(response) => {
            log_response(&method, &path, response.status());

            let (parts, upstream_body) = response.into_parts();
            let body = upstream_body.map_err(move |err| {
                let detail = format!("response body: {}", error_chain(&err));
                tracing::warn!("{}", format_failure(&method, &path, &detail));
                err
            });
            Response::from_parts(parts, Body::new(body))
        }
        Err(err) => {
            log_failure(&method, &path, &error_chain(&err));
            bad_gateway()
        }
    }
}
