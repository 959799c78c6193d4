//! Shared utilities for integration testing.

#![allow(dead_code)]

use axum::{
    body::Bytes,
    http::{HeaderMap, HeaderValue, Method, StatusCode, Uri},
    response::IntoResponse,
    Router,
};
use ollama_proxy::config::ProxyConfig;
use ollama_proxy::http::HttpServer;
use ollama_proxy::lifecycle::Shutdown;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{oneshot, Notify};

/// A local address nothing is listening on.
pub fn unused_addr() -> SocketAddr {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap()
}

/// Client that never goes through a system proxy.
pub fn client() -> reqwest::Client {
    reqwest::Client::builder().no_proxy().build().unwrap()
}

/// Start the proxy in front of `upstream` on an ephemeral port.
///
/// Keep the returned `Shutdown` alive for as long as the proxy should run.
pub async fn start_proxy(upstream: &str) -> (SocketAddr, Shutdown) {
    let mut config = ProxyConfig::default();
    config.upstream.url = upstream.to_string();
    start_proxy_with(config).await
}

/// Start the proxy with a custom config, always on an ephemeral loopback port.
pub async fn start_proxy_with(mut config: ProxyConfig) -> (SocketAddr, Shutdown) {
    config.listener.bind_address = "127.0.0.1:0".into();

    let listener = ollama_proxy::net::bind(&config.listener).await.unwrap();
    let addr = listener.local_addr().unwrap();

    let server = HttpServer::new(&config).unwrap();
    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    tokio::spawn(async move {
        let _ = server.run(listener, server_shutdown).await;
    });

    (addr, shutdown)
}

async fn echo(method: Method, uri: Uri, headers: HeaderMap, body: Bytes) -> impl IntoResponse {
    let joined = |name: &str| {
        headers
            .get_all(name)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .collect::<Vec<_>>()
            .join(", ")
    };

    let mut out = HeaderMap::new();
    let mut put = |name: &'static str, value: String| {
        if let Ok(v) = HeaderValue::from_str(&value) {
            out.insert(name, v);
        }
    };
    put("x-echo-method", method.to_string());
    put("x-echo-uri", uri.to_string());
    put("x-echo-host", joined("host"));
    put("x-echo-forwarded-for", joined("x-forwarded-for"));
    put("x-echo-custom", joined("x-custom"));
    put("x-echo-connection", joined("connection"));

    (StatusCode::OK, out, body)
}

/// Start an upstream that echoes the request body and reports what it received in headers.
pub async fn start_echo_backend() -> SocketAddr {
    start_router_backend(Router::new().fallback(echo)).await
}

/// Start an upstream that answers every request with `status` and `body`.
pub async fn start_status_backend(status: StatusCode, body: &'static str) -> SocketAddr {
    start_router_backend(Router::new().fallback(move || async move { (status, body) })).await
}

async fn start_router_backend(router: Router) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, router).await;
    });
    addr
}

pub async fn read_request_head(socket: &mut TcpStream) {
    let mut head = Vec::new();
    let mut buf = [0u8; 1024];
    while !head.windows(4).any(|w| w == b"\r\n\r\n") {
        match socket.read(&mut buf).await {
            Ok(0) | Err(_) => return,
            Ok(n) => head.extend_from_slice(&buf[..n]),
        }
    }
}

/// Start a raw chunked upstream: sends `first`, waits for `release`, then sends `rest`.
pub async fn start_streaming_backend(
    first: &'static str,
    rest: &'static str,
    release: Arc<Notify>,
) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            let release = release.clone();
            tokio::spawn(async move {
                read_request_head(&mut socket).await;

                let head = "HTTP/1.1 200 OK\r\nContent-Type: application/x-ndjson\r\nTransfer-Encoding: chunked\r\n\r\n";
                let _ = socket.write_all(head.as_bytes()).await;
                let _ = socket
                    .write_all(format!("{:x}\r\n{}\r\n", first.len(), first).as_bytes())
                    .await;
                let _ = socket.flush().await;

                release.notified().await;

                let _ = socket
                    .write_all(format!("{:x}\r\n{}\r\n0\r\n\r\n", rest.len(), rest).as_bytes())
                    .await;
                let _ = socket.shutdown().await;
            });
        }
    });

    addr
}

/// Start a raw upstream that waits `delay` before sending its response head.
pub async fn start_slow_headers_backend(delay: Duration) -> SocketAddr {
    spawn_raw_backend(move |mut socket| async move {
        read_request_head(&mut socket).await;
        tokio::time::sleep(delay).await;
        let _ = socket
            .write_all(b"HTTP/1.1 200 OK\r\nContent-Length: 4\r\n\r\nlate")
            .await;
    })
    .await
}

/// Start a raw upstream that promises 100 body bytes, sends 7, then closes.
pub async fn start_truncating_backend() -> SocketAddr {
    spawn_raw_backend(|mut socket| async move {
        read_request_head(&mut socket).await;
        let _ = socket
            .write_all(b"HTTP/1.1 200 OK\r\nContent-Length: 100\r\n\r\npartial")
            .await;
        let _ = socket.flush().await;
    })
    .await
}

/// Start a raw chunked upstream that streams a line every 50ms until a write fails.
///
/// The first connection's failure is reported on the returned receiver.
pub async fn start_endless_backend() -> (SocketAddr, oneshot::Receiver<std::io::Error>) {
    let (tx, rx) = oneshot::channel();
    let tx = Arc::new(std::sync::Mutex::new(Some(tx)));

    let addr = spawn_raw_backend(move |mut socket| {
        let tx = tx.clone();
        async move {
            read_request_head(&mut socket).await;

            let head = "HTTP/1.1 200 OK\r\nContent-Type: application/x-ndjson\r\nTransfer-Encoding: chunked\r\n\r\n";
            let mut result = socket.write_all(head.as_bytes()).await;
            while result.is_ok() {
                result = socket.write_all(b"11\r\n{\"response\":\"x\"}\n\r\n").await;
                tokio::time::sleep(Duration::from_millis(50)).await;
            }

            if let (Err(e), Some(tx)) = (result, tx.lock().unwrap().take()) {
                let _ = tx.send(e);
            }
        }
    })
    .await;

    (addr, rx)
}

/// Start a raw upstream that switches to `protocol` and then echoes every byte.
///
/// Requests are answered with `101` whether or not they asked to upgrade.
pub async fn start_upgrade_echo_backend(protocol: &'static str) -> SocketAddr {
    spawn_raw_backend(move |mut socket| async move {
        read_request_head(&mut socket).await;
        let head = format!(
            "HTTP/1.1 101 Switching Protocols\r\nConnection: Upgrade\r\nUpgrade: {}\r\n\r\n",
            protocol
        );
        if socket.write_all(head.as_bytes()).await.is_err() {
            return;
        }

        let (mut reader, mut writer) = socket.split();
        let _ = tokio::io::copy(&mut reader, &mut writer).await;
    })
    .await
}

async fn spawn_raw_backend<F, Fut>(serve: F) -> SocketAddr
where
    F: Fn(TcpStream) -> Fut + Send + Sync + 'static,
    Fut: std::future::Future<Output = ()> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        while let Ok((socket, _)) = listener.accept().await {
            tokio::spawn(serve(socket));
        }
    });
    addr
}
