//! Browser VNC viewer served from the noVNC assets.
//!
//! The HTTP server runs on its own `tokio` runtime while the foreground
//! thread waits for the operator. [`AssetServer::shutdown`] returns only after
//! the serving task has stopped accepting connections.

use std::io::{self, BufRead};
use std::net::SocketAddr;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use axum::Router;
use axum::extract::{Path as UrlPath, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::runtime::Runtime;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use url::Url;

const INDEX_PAGE: &str = "vnc_lite.html";

#[derive(Debug, Error)]
pub(crate) enum VncError {
    #[error("failed to start the HTTP runtime: {0}")]
    Runtime(io::Error),
    #[error("failed to listen on {address}: {source}")]
    Bind { address: String, source: io::Error },
    #[error("invalid HTTP host '{host}': {source}")]
    HttpHost {
        host: String,
        source: url::ParseError,
    },
    #[error("HTTP server task failed: {0}")]
    Join(tokio::task::JoinError),
    #[error("HTTP server failed: {0}")]
    Serve(io::Error),
    #[error("failed to wait for input: {0}")]
    Stdin(io::Error),
}

/// Blocks until the operator asks the viewer to stop.
pub(crate) trait StopSignal {
    fn wait(&self) -> io::Result<()>;
}

/// Waits for a line on stdin.
pub(crate) struct EnterKey;

impl StopSignal for EnterKey {
    fn wait(&self) -> io::Result<()> {
        let mut line = String::new();
        io::stdin().lock().read_line(&mut line).map(|_| ())
    }
}

/// Expands a bare `:port` to `localhost:port`.
pub(crate) fn normalise_http_host(http_host: &str) -> String {
    if http_host.starts_with(':') {
        format!("localhost{http_host}")
    } else {
        http_host.to_owned()
    }
}

/// The viewer page URL pointing noVNC at the machine's WebSocket.
pub(crate) fn viewer_url(http_host: &str, target_host: &str, port: u32) -> Result<Url, VncError> {
    let mut url = Url::parse(&format!("http://{http_host}/")).map_err(|source| {
        VncError::HttpHost {
            host: http_host.to_owned(),
            source,
        }
    })?;
    url.query_pairs_mut()
        .append_pair("host", target_host)
        .append_pair("port", &port.to_string())
        .append_pair("path", "");
    Ok(url)
}

/// A running asset server.
pub(crate) struct AssetServer {
    runtime: Runtime,
    shutdown: oneshot::Sender<()>,
    task: JoinHandle<io::Result<()>>,
    local_addr: SocketAddr,
}

impl AssetServer {
    /// Binds `http_host` and starts serving `assets` in the background.
    pub(crate) fn start(http_host: &str, assets: PathBuf) -> Result<Self, VncError> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .enable_all()
            .build()
            .map_err(VncError::Runtime)?;
        let bind_error = |source| VncError::Bind {
            address: http_host.to_owned(),
            source,
        };
        let listener = runtime
            .block_on(TcpListener::bind(http_host))
            .map_err(bind_error)?;
        let local_addr = listener.local_addr().map_err(bind_error)?;

        let (shutdown, stopped) = oneshot::channel::<()>();
        let app = router(assets);
        let task = runtime.spawn(async move {
            axum::serve(listener, app)
                // A dropped sender also stops the server.
                .with_graceful_shutdown(async { stopped.await.unwrap_or_default() })
                .await
        });
        tracing::debug!(target: "kitsh::vnc", %local_addr, "serving noVNC assets");
        Ok(Self {
            runtime,
            shutdown,
            task,
            local_addr,
        })
    }

    pub(crate) const fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Stops accepting connections and waits for the serving task to end.
    pub(crate) fn shutdown(self) -> Result<(), VncError> {
        let Self {
            runtime,
            shutdown,
            task,
            local_addr,
        } = self;
        if shutdown.send(()).is_err() {
            tracing::debug!(target: "kitsh::vnc", %local_addr, "server already stopped");
        }
        let served = runtime.block_on(task).map_err(VncError::Join)?;
        tracing::debug!(target: "kitsh::vnc", %local_addr, "viewer stopped");
        served.map_err(VncError::Serve)
    }
}

fn router(assets: PathBuf) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/core/*path", get(core_asset))
        .route("/vendor/*path", get(vendor_asset))
        .with_state(Arc::new(assets))
}

async fn index(State(assets): State<Arc<PathBuf>>) -> Response {
    serve_asset(&assets, INDEX_PAGE).await
}

async fn core_asset(
    State(assets): State<Arc<PathBuf>>,
    UrlPath(path): UrlPath<String>,
) -> Response {
    serve_asset(&assets, &format!("core/{path}")).await
}

async fn vendor_asset(
    State(assets): State<Arc<PathBuf>>,
    UrlPath(path): UrlPath<String>,
) -> Response {
    serve_asset(&assets, &format!("vendor/{path}")).await
}

async fn serve_asset(root: &Path, relative: &str) -> Response {
    let Some(path) = resolve_asset(root, relative) else {
        return StatusCode::NOT_FOUND.into_response();
    };
    match tokio::fs::read(&path).await {
        Ok(body) => ([(header::CONTENT_TYPE, content_type(&path))], body).into_response(),
        Err(error) => {
            tracing::debug!(target: "kitsh::vnc", path = %path.display(), %error, "asset unavailable");
            StatusCode::NOT_FOUND.into_response()
        }
    }
}

/// Joins `relative` onto `root`, refusing anything but plain path segments.
fn resolve_asset(root: &Path, relative: &str) -> Option<PathBuf> {
    let relative = Path::new(relative);
    relative
        .components()
        .all(|component| matches!(component, Component::Normal(_)))
        .then(|| root.join(relative))
}

fn content_type(path: &Path) -> &'static str {
    match path.extension().and_then(|extension| extension.to_str()) {
        Some("html") => "text/html; charset=utf-8",
        Some("js" | "mjs") => "text/javascript",
        Some("css") => "text/css",
        Some("json") => "application/json",
        Some("svg") => "image/svg+xml",
        Some("png") => "image/png",
        Some("ico") => "image/x-icon",
        Some("wasm") => "application/wasm",
        _ => "application/octet-stream",
    }
}
