//! Local static file server.
//!
//! Serves one root directory over HTTP. Every request path is resolved and
//! canonicalized, and anything that does not land inside the canonical root
//! is answered with 404, whether or not it exists on disk.

pub mod mime;

use crate::error::{BentoError, Result};
use crate::path::{self, Resolved};
use axum::{
    Router,
    body::Body,
    extract::State,
    http::{HeaderValue, StatusCode, Uri, header},
    response::{IntoResponse, Response},
};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_util::io::ReaderStream;

const DIRECTORY_INDEX: &str = "index.html";

/// Static server bound to one root directory
///
/// `start` and `stop` are idempotent. A stopped server can be pointed at a
/// different root with [`StaticServer::set_root`] and started again.
#[derive(Debug)]
pub struct StaticServer {
    root: PathBuf,
    addr: SocketAddr,
    running: Option<RunningServer>,
}

#[derive(Debug)]
struct RunningServer {
    local_addr: SocketAddr,
    task: JoinHandle<()>,
}

impl StaticServer {
    pub fn new(root: impl Into<PathBuf>, addr: SocketAddr) -> Self {
        Self {
            root: root.into(),
            addr,
            running: None,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Change the served directory. Only allowed while stopped.
    pub fn set_root(&mut self, root: impl Into<PathBuf>) -> Result<()> {
        if self.is_running() {
            return Err(BentoError::validation(
                "Cannot change the root of a running server",
            ));
        }
        self.root = root.into();
        Ok(())
    }

    pub fn is_running(&self) -> bool {
        self.running
            .as_ref()
            .is_some_and(|running| !running.task.is_finished())
    }

    /// Address actually bound (differs from the configured one for port 0)
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.running.as_ref().map(|running| running.local_addr)
    }

    /// Bind and start serving in a background task. Calling it on a running
    /// server returns the existing address without binding again.
    pub async fn start(&mut self) -> Result<SocketAddr> {
        if let Some(running) = &self.running {
            if !running.task.is_finished() {
                return Ok(running.local_addr);
            }
        }

        if !self.root.is_dir() {
            return Err(BentoError::NotFound(self.root.clone()));
        }

        let listener = TcpListener::bind(self.addr)
            .await
            .map_err(|e| BentoError::Server(format!("Failed to bind to {}: {}", self.addr, e)))?;
        let local_addr = listener
            .local_addr()
            .map_err(|e| BentoError::Server(format!("Failed to read bound address: {}", e)))?;

        let app = router(self.root.clone());
        let task = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                tracing::error!("static server stopped: {}", e);
            }
        });

        tracing::info!("serving {} on http://{}", self.root.display(), local_addr);
        self.running = Some(RunningServer { local_addr, task });
        Ok(local_addr)
    }

    /// Stop accepting connections. The listener is closed once this returns.
    pub async fn stop(&mut self) {
        if let Some(running) = self.running.take() {
            running.task.abort();
            let _ = running.task.await;
            tracing::info!("static server on {} stopped", running.local_addr);
        }
    }
}

/// Router answering every method and path from `root`
pub fn router(root: PathBuf) -> Router {
    Router::new()
        .fallback(handle_request)
        .with_state(Arc::new(root))
}

#[derive(Debug, PartialEq, Eq)]
enum Lookup {
    File(PathBuf),
    Forbidden,
    NotFound,
}

/// Map a request path to a file inside `root`
fn lookup(root: &Path, request_path: &str) -> Lookup {
    let request_path = if request_path == "/" {
        "/index.html"
    } else {
        request_path
    };

    match path::resolve_within(root, request_path) {
        Resolved::Missing => Lookup::NotFound,
        Resolved::File(file) => Lookup::File(file),
        Resolved::Directory(dir) => match path::resolve_within(&dir, DIRECTORY_INDEX) {
            Resolved::File(index) => Lookup::File(index),
            _ => Lookup::Forbidden,
        },
    }
}

async fn handle_request(State(root): State<Arc<PathBuf>>, uri: Uri) -> Response {
    let request_path = uri.path().to_string();
    let found = {
        let request_path = request_path.clone();
        tokio::task::spawn_blocking(move || lookup(&root, &request_path))
            .await
            .unwrap_or(Lookup::NotFound)
    };

    match found {
        Lookup::File(file) => serve_file(&file).await,
        Lookup::Forbidden => {
            tracing::debug!("403 {}", request_path);
            text_response(StatusCode::FORBIDDEN, "Directory listing not allowed")
        }
        Lookup::NotFound => {
            tracing::debug!("404 {}", request_path);
            text_response(StatusCode::NOT_FOUND, "File not found")
        }
    }
}

async fn serve_file(file: &Path) -> Response {
    let opened = match tokio::fs::File::open(file).await {
        Ok(opened) => opened,
        Err(e) => {
            tracing::warn!("failed to open {}: {}", file.display(), e);
            return text_response(StatusCode::NOT_FOUND, "File not found");
        }
    };

    let length = opened.metadata().await.ok().map(|m| m.len());

    let mut response = Body::from_stream(ReaderStream::new(opened)).into_response();
    let headers = response.headers_mut();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static(mime::content_type(file)),
    );
    if let Some(length) = length {
        headers.insert(header::CONTENT_LENGTH, HeaderValue::from(length));
    }
    response
}

fn text_response(status: StatusCode, message: &'static str) -> Response {
    (status, [(header::CONTENT_TYPE, "text/plain")], message).into_response()
}
