// Local web UI.
//
// Serves the prebuilt front-end bundle and a small JSON API that mirrors
// the domain services:
//
//   GET   /api/user                    : profile of the logged-in user
//   GET   /api/dashboard               : cluster-wide metrics
//   GET   /api/nodes                   : the user's nodes
//   GET   /api/nodes/rank              : today's leaderboard
//   PATCH /api/nodes/{id}              : rename or change bandwidth
//   PATCH /api/nodes/{id}/sponsor      : change sponsor details
//   PATCH /api/nodes/{id}/reset-secret : issue a new secret
//
// Every JSON response is wrapped as `{code, msg, data, time}`; any other
// method on these routes yields 405. The services use the blocking HTTP
// client, so handlers run them on the blocking pool.

use crate::api::ApiClient;
use crate::auth::AuthService;
use crate::config::Config;
use crate::cookie::CookieStore;
use crate::dashboard::DashboardService;
use crate::error::ApiError;
use crate::models::{Envelope, NodeUpdate, SponsorUpdate};
use crate::node::NodeService;
use anyhow::{Context, Result};
use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, patch},
    Json, Router,
};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::net::{SocketAddr, TcpListener};
use std::path::Path as FsPath;
use std::thread::{self, JoinHandle};
use std::time::Instant;
use tokio::sync::oneshot;
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;

#[derive(Clone)]
pub struct AppState {
    pub api: ApiClient,
    pub store: CookieStore,
}

impl AppState {
    fn nodes(&self) -> NodeService {
        NodeService::new(self.api.clone(), self.store.clone())
    }
}

pub fn status_for(err: &ApiError) -> StatusCode {
    match err {
        ApiError::NotAuthenticated(_) | ApiError::CorruptState(_) => StatusCode::UNAUTHORIZED,
        ApiError::RequestTimeout(_) => StatusCode::GATEWAY_TIMEOUT,
        ApiError::RemoteError { .. } | ApiError::NetworkError(_) | ApiError::DecodeError(_) => {
            StatusCode::BAD_GATEWAY
        }
        ApiError::PersistenceError(_) | ApiError::SerializationError(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

fn error_response(status: StatusCode, msg: impl Into<String>) -> Response {
    (status, Json(Envelope::<()>::error(status.as_u16(), msg))).into_response()
}

async fn method_not_allowed() -> Response {
    error_response(StatusCode::METHOD_NOT_ALLOWED, "Method not allowed")
}

/// Run a blocking service call and wrap its outcome in an envelope.
async fn respond<T, F>(state: AppState, route: &'static str, call: F) -> Response
where
    F: FnOnce(AppState) -> crate::error::Result<T> + Send + 'static,
    T: Serialize + Send + 'static,
{
    tracing::info!("[Web API] {}", route);
    let start = Instant::now();

    match tokio::task::spawn_blocking(move || call(state)).await {
        Ok(Ok(data)) => {
            tracing::info!("[Web API] {} ok ({:?})", route, start.elapsed());
            (StatusCode::OK, Json(Envelope::success(data))).into_response()
        }
        Ok(Err(e)) => {
            tracing::info!("[Web API] {} failed: {}", route, e);
            error_response(status_for(&e), e.to_string())
        }
        Err(e) => {
            tracing::error!("[Web API] {} handler panicked: {}", route, e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "internal error")
        }
    }
}

fn parse_body<T: DeserializeOwned>(body: &Bytes) -> std::result::Result<T, Response> {
    serde_json::from_slice(body)
        .map_err(|_| error_response(StatusCode::BAD_REQUEST, "Invalid request data"))
}

async fn get_user(State(state): State<AppState>) -> Response {
    respond(state, "GET /api/user", |s| {
        AuthService::new(s.api, s.store).user_profile()
    })
    .await
}

async fn get_dashboard(State(state): State<AppState>) -> Response {
    respond(state, "GET /api/dashboard", |s| {
        DashboardService::new(s.api).dashboard()
    })
    .await
}

async fn get_nodes(State(state): State<AppState>) -> Response {
    respond(state, "GET /api/nodes", |s| s.nodes().list()).await
}

async fn get_rank(State(state): State<AppState>) -> Response {
    respond(state, "GET /api/nodes/rank", |s| s.nodes().rank()).await
}

async fn update_node(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Bytes,
) -> Response {
    let update: NodeUpdate = match parse_body(&body) {
        Ok(u) => u,
        Err(resp) => return resp,
    };
    respond(state, "PATCH /api/nodes/{id}", move |s| {
        s.nodes().update(&id, &update)
    })
    .await
}

async fn update_sponsor(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Bytes,
) -> Response {
    let update: SponsorUpdate = match parse_body(&body) {
        Ok(u) => u,
        Err(resp) => return resp,
    };
    respond(state, "PATCH /api/nodes/{id}/sponsor", move |s| {
        s.nodes().update_sponsor(&id, update.sponsor)
    })
    .await
}

async fn reset_secret(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    respond(state, "PATCH /api/nodes/{id}/reset-secret", move |s| {
        let secret = s.nodes().reset_secret(&id)?;
        Ok(serde_json::json!({ "secret": secret }))
    })
    .await
}

pub fn router(state: AppState, web_root: &FsPath) -> Router {
    let index = web_root.join("index.html");
    let assets = ServeDir::new(web_root).fallback(ServeFile::new(index));

    Router::new()
        .route("/api/user", get(get_user).fallback(method_not_allowed))
        .route("/api/dashboard", get(get_dashboard).fallback(method_not_allowed))
        .route("/api/nodes", get(get_nodes).fallback(method_not_allowed))
        .route("/api/nodes/rank", get(get_rank).fallback(method_not_allowed))
        .route("/api/nodes/:id", patch(update_node).fallback(method_not_allowed))
        .route(
            "/api/nodes/:id/sponsor",
            patch(update_sponsor).fallback(method_not_allowed),
        )
        .route(
            "/api/nodes/:id/reset-secret",
            patch(reset_secret).fallback(method_not_allowed),
        )
        .fallback_service(assets)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// A running local server. Dropping it shuts the server down.
pub struct WebServer {
    addr: SocketAddr,
    shutdown_tx: Option<oneshot::Sender<()>>,
    handle: Option<JoinHandle<Result<()>>>,
}

impl WebServer {
    /// Bind `127.0.0.1:<web_port>` and serve on a dedicated runtime thread.
    pub fn start(config: &Config, api: ApiClient) -> Result<Self> {
        let listener = TcpListener::bind(("127.0.0.1", config.web_port))
            .with_context(|| format!("Failed to bind port {}", config.web_port))?;
        listener
            .set_nonblocking(true)
            .context("Failed to configure listener")?;
        let addr = listener.local_addr()?;

        let state = AppState {
            api,
            store: CookieStore::new(&config.cookie_path),
        };
        let app = router(state, &config.web_root);
        let (tx, rx) = oneshot::channel::<()>();

        let handle = thread::spawn(move || -> Result<()> {
            let runtime = tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()
                .context("Failed to start async runtime")?;
            runtime.block_on(async move {
                let listener = tokio::net::TcpListener::from_std(listener)?;
                tracing::info!(%addr, "web UI listening");
                axum::serve(listener, app)
                    .with_graceful_shutdown(async {
                        let _ = rx.await;
                    })
                    .await
                    .context("Web server error")?;
                Ok::<(), anyhow::Error>(())
            })
        });

        Ok(WebServer {
            addr,
            shutdown_tx: Some(tx),
            handle: Some(handle),
        })
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn url(&self) -> String {
        format!("http://localhost:{}", self.addr.port())
    }

    /// Signal graceful shutdown and wait for the server thread.
    pub fn stop(mut self) -> Result<()> {
        self.shutdown()
    }

    fn shutdown(&mut self) -> Result<()> {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        match self.handle.take() {
            Some(handle) => handle
                .join()
                .map_err(|_| anyhow::anyhow!("web server thread panicked"))?,
            None => Ok(()),
        }
    }
}

impl Drop for WebServer {
    fn drop(&mut self) {
        if let Err(e) = self.shutdown() {
            tracing::warn!("web server stopped with error: {}", e);
        }
    }
}
