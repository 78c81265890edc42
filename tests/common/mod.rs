//! Fake remote management API for integration tests.
//!
//! Runs an axum router on its own runtime thread so the blocking client
//! under test can be driven from plain `#[test]` functions.

#![allow(dead_code)]

use std::collections::HashMap;
use std::io::{self, Read, Write};
use std::net::TcpListener;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use axum::body::Bytes;
use axum::extract::{Path as UrlPath, Query, State};
use axum::http::header::{LOCATION, SET_COOKIE};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, patch, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use tokio::sync::oneshot;
use tracing_subscriber::EnvFilter;

use bmclapi_cli::api::ApiClient;
use bmclapi_cli::config::{Config, Verbosity};

/// Requests the fake recorded: `(method path, body)`.
pub type Recorded = Arc<Mutex<Vec<(String, Value)>>>;

pub struct FakeRemote {
    pub base_url: String,
    pub recorded: Recorded,
    shutdown: Option<oneshot::Sender<()>>,
}

impl Drop for FakeRemote {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
    }
}

impl FakeRemote {
    pub fn start() -> Self {
        let recorded: Recorded = Arc::new(Mutex::new(Vec::new()));
        let app = routes(recorded.clone());

        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        listener.set_nonblocking(true).unwrap();
        let port = listener.local_addr().unwrap().port();
        let (tx, rx) = oneshot::channel::<()>();

        thread::spawn(move || {
            let runtime = tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()
                .unwrap();
            runtime.block_on(async move {
                let listener = tokio::net::TcpListener::from_std(listener).unwrap();
                axum::serve(listener, app)
                    .with_graceful_shutdown(async {
                        let _ = rx.await;
                    })
                    .await
                    .unwrap();
            });
        });

        FakeRemote {
            base_url: format!("http://127.0.0.1:{}/openbmclapi", port),
            recorded,
            shutdown: Some(tx),
        }
    }

    pub fn recorded(&self) -> Vec<(String, Value)> {
        self.recorded.lock().unwrap().clone()
    }
}

/// Config pointing at `remote`, with cookies kept under `dir`.
pub fn config_for(remote: &FakeRemote, dir: &Path) -> Config {
    Config {
        base_url: remote.base_url.clone(),
        cookie_path: dir.join("cookie.json"),
        web_port: 0,
        web_root: dir.join("dist"),
        request_timeout: Duration::from_secs(1),
        verbosity: Verbosity::Verbose,
    }
}

pub fn client_for(config: &Config) -> ApiClient {
    ApiClient::new(config).unwrap()
}

/// One-shot raw HTTP server: the status line and headers are written after
/// `header_delay`, half of the four-byte body right away and the rest after
/// `body_delay`. Returns the base URL.
pub fn start_trickle_server(header_delay: Duration, body_delay: Duration) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    thread::spawn(move || {
        if let Ok((mut stream, _)) = listener.accept() {
            let mut buf = [0u8; 4096];
            let _ = stream.read(&mut buf);
            thread::sleep(header_delay);
            let _ = stream.write_all(
                b"HTTP/1.1 200 OK\r\nContent-Type: text/plain\r\nContent-Length: 4\r\n\r\nab",
            );
            let _ = stream.flush();
            thread::sleep(body_delay);
            let _ = stream.write_all(b"cd");
            let _ = stream.flush();
        }
    });
    format!("http://{}", addr)
}

/// Formatted log output collected in memory.
#[derive(Clone, Default)]
pub struct LogCapture(Arc<Mutex<Vec<u8>>>);

impl LogCapture {
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl Write for LogCapture {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Run `f` on this thread with the subscriber `main` would install for
/// `verbosity`, returning its result and everything it logged.
pub fn capture_logs<R>(verbosity: Verbosity, f: impl FnOnce() -> R) -> (R, String) {
    let capture = LogCapture::default();
    let writer = capture.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(verbosity.filter_directive()))
        .with_writer(move || writer.clone())
        .with_ansi(false)
        .finish();
    let result = tracing::subscriber::with_default(subscriber, f);
    (result, capture.contents())
}

fn routes(recorded: Recorded) -> Router {
    Router::new()
        .route("/openbmclapi/echo", get(echo_headers))
        .route("/openbmclapi/echo-body", post(echo_body))
        .route("/openbmclapi/missing", get(missing))
        .route("/openbmclapi/slow", get(slow))
        .route("/openbmclapi/user", get(user))
        .route("/openbmclapi/user/auth/github", get(github))
        .route("/openbmclapi/metric/dashboard", get(dashboard))
        .route("/openbmclapi/metric/rank", get(rank))
        .route("/openbmclapi/mgmt/cluster/my", get(my_nodes))
        .route(
            "/openbmclapi/mgmt/cluster/:id",
            get(node_detail).patch(record_patch),
        )
        .route(
            "/openbmclapi/mgmt/cluster/:id/reset-secret",
            patch(reset_secret),
        )
        .with_state(recorded)
}

fn header(headers: &HeaderMap, name: &str) -> String {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

fn has_session(headers: &HeaderMap) -> bool {
    header(headers, "cookie").contains("session=")
}

fn unauthorized() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({"code": 401, "msg": "login required"})),
    )
        .into_response()
}

async fn echo_headers(headers: HeaderMap) -> Json<Value> {
    Json(json!({
        "cookie": header(&headers, "cookie"),
        "xsrf": header(&headers, "x-xsrf-token"),
        "content_type": header(&headers, "content-type"),
        "user_agent": header(&headers, "user-agent"),
    }))
}

async fn echo_body(body: Bytes) -> Bytes {
    body
}

async fn missing() -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(json!({"code": 404, "msg": "not found"})),
    )
        .into_response()
}

async fn slow() -> &'static str {
    tokio::time::sleep(Duration::from_secs(3)).await;
    "too late"
}

async fn user(headers: HeaderMap) -> Response {
    if !has_session(&headers) {
        return unauthorized();
    }
    Json(json!({
        "_id": "u1",
        "profileId": "42",
        "avatar": "https://avatars.example/42.png",
        "name": "Alice",
        "username": "alice",
        "_json": {"login": "alice", "id": 42, "avatar_url": "https://avatars.example/42.png",
                  "name": "Alice", "blog": "https://alice.dev", "bio": null}
    }))
    .into_response()
}

async fn github(Query(query): Query<HashMap<String, String>>) -> Response {
    match query.get("code").map(String::as_str) {
        None => Response::builder()
            .status(StatusCode::FOUND)
            .header(
                LOCATION,
                "https://github.com/login/oauth/authorize?client_id=abc&redirect_uri=cb",
            )
            .body(axum::body::Body::empty())
            .unwrap(),
        Some("good") => Response::builder()
            .status(StatusCode::FOUND)
            .header(LOCATION, "/")
            .header(SET_COOKIE, "session=s1; Path=/; HttpOnly")
            .header(SET_COOKIE, "broken-segment")
            .header(SET_COOKIE, "XSRF-TOKEN=x1; Path=/; Secure")
            .body(axum::body::Body::empty())
            .unwrap(),
        Some(_) => (
            StatusCode::BAD_REQUEST,
            Json(json!({"code": 400, "msg": "invalid code"})),
        )
            .into_response(),
    }
}

async fn dashboard() -> Json<Value> {
    let hourly: Vec<Value> = (0..24)
        .rev()
        .map(|h| json!({"_id": h, "bytes": h * 1024, "hits": h * 100, "bandwidth": 1500.0, "nodes": 300 + h}))
        .collect();
    Json(json!({
        "bytes": 1099511627776_i64,
        "hits": 123456,
        "hourly": hourly,
        "bandwidth": 50000.0,
        "currentBandwidth": 12000.5,
        "load": 0.24,
        "currentNodes": 512
    }))
}

fn node_json(id: &str, name: &str, enabled: bool) -> Value {
    json!({
        "_id": id,
        "name": name,
        "isEnabled": enabled,
        "bandwidth": 100,
        "measureBandwidth": 95,
        "trust": 10,
        "createdAt": "2024-01-01T00:00:00.000Z",
        "sponsor": {"name": "acme", "url": "https://acme.example", "banner": ""},
        "endpoint": {"host": "n.example", "port": 4000, "proto": "https", "byoc": false},
        "flavor": {"runtime": "rust", "storage": "file"},
        "version": "1.0.0"
    })
}

async fn my_nodes(headers: HeaderMap) -> Response {
    if !has_session(&headers) {
        return unauthorized();
    }
    Json(json!([node_json("n1", "edge-1", true), node_json("n2", "edge-2", false)])).into_response()
}

async fn node_detail(headers: HeaderMap, UrlPath(id): UrlPath<String>) -> Response {
    if !has_session(&headers) {
        return unauthorized();
    }
    Json(node_json(&id, "edge-detail", true)).into_response()
}

async fn record_patch(
    State(recorded): State<Recorded>,
    headers: HeaderMap,
    UrlPath(id): UrlPath<String>,
    body: Bytes,
) -> Response {
    if !has_session(&headers) {
        return unauthorized();
    }
    let value: Value = serde_json::from_slice(&body).unwrap_or(Value::Null);
    recorded
        .lock()
        .unwrap()
        .push((format!("PATCH /mgmt/cluster/{}", id), value));
    Json(json!({})).into_response()
}

async fn reset_secret(headers: HeaderMap, UrlPath(id): UrlPath<String>) -> Response {
    if !has_session(&headers) {
        return unauthorized();
    }
    Json(json!({"secret": format!("secret-for-{}", id)})).into_response()
}

async fn rank(headers: HeaderMap) -> Json<Value> {
    let viewer = if has_session(&headers) { "member" } else { "anonymous" };
    Json(json!([
        {"_id": "r1", "name": "top", "isEnabled": true,
         "sponsor": {"name": viewer, "url": "", "banner": ""},
         "metric": {"_id": "m1", "clusterId": "r1", "bytes": 2048, "hits": 900}},
        {"_id": "r2", "name": "second", "isEnabled": false, "user": {"name": "bob"},
         "sponsor": {"name": "", "url": "", "banner": ""},
         "metric": {"bytes": 1024, "hits": 400}}
    ]))
}
