// HTTP client wrapper: every call to the remote API goes through
// `ApiClient::request`. It attaches cookies (mirroring the XSRF token into
// its header), enforces the configured timeout, classifies failures into
// `ApiError` and writes tiered diagnostics. Decoding bodies is left to the
// domain services.

use crate::config::{Config, Verbosity};
use crate::cookie::{self, Cookie};
use crate::error::{ApiError, Result};
use crate::progress::{ProgressReporter, ProgressTarget, ReporterTally, RequestStatus};
use reqwest::blocking::{Client, RequestBuilder};
use reqwest::header::{HeaderMap, CONTENT_TYPE, COOKIE};
use reqwest::redirect::Policy;
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

pub const USER_AGENT: &str = "OpenBMCLAPI-Client/1.0";
pub const XSRF_COOKIE: &str = "XSRF-TOKEN";
pub const XSRF_HEADER: &str = "X-XSRF-TOKEN";

/// Raw outcome of a call. Any status code is a successful call at this
/// layer; use `error_for_status` to reject 4xx/5xx.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

/// `{code, msg}` error body returned by the remote API.
#[derive(Deserialize, Debug)]
struct ErrorEnvelope {
    #[serde(default)]
    msg: String,
}

fn envelope_message(body: &[u8]) -> Option<String> {
    serde_json::from_slice::<ErrorEnvelope>(body)
        .ok()
        .map(|e| e.msg)
        .filter(|m| !m.is_empty())
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        self.status < 400
    }

    pub fn error_for_status(self) -> Result<Self> {
        if self.is_success() {
            return Ok(self);
        }
        let message = envelope_message(&self.body)
            .or_else(|| {
                let text = String::from_utf8_lossy(&self.body).trim().to_string();
                (!text.is_empty()).then_some(text)
            })
            .or_else(|| {
                reqwest::StatusCode::from_u16(self.status)
                    .ok()
                    .and_then(|s| s.canonical_reason())
                    .map(str::to_string)
            })
            .unwrap_or_default();
        Err(ApiError::remote(self.status, message))
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_slice(&self.body).map_err(|e| ApiError::DecodeError(e.to_string()))
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Every `Set-Cookie` header value, in order.
    pub fn set_cookie_headers(&self) -> Vec<&str> {
        self.headers
            .get_all(reqwest::header::SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .collect()
    }
}

/// Human-readable description of an endpoint, used only in log lines.
/// Patterns are checked in order and the first match wins.
pub fn endpoint_label(url: &str) -> String {
    let label = if url.contains("/user") {
        "获取用户信息"
    } else if url.contains("/metric/dashboard") {
        "获取仪表盘数据"
    } else if url.contains("/mgmt/cluster/my") {
        "获取节点列表"
    } else if url.contains("/reset-secret") {
        "重置节点密钥"
    } else if url.contains("/mgmt/cluster/") {
        if url.contains("/sponsor") {
            "更新节点赞助商信息"
        } else {
            "节点管理"
        }
    } else {
        return url.to_string();
    };
    label.to_string()
}

fn pretty_json(body: &[u8]) -> String {
    serde_json::from_slice::<serde_json::Value>(body)
        .and_then(|v| serde_json::to_string_pretty(&v))
        .unwrap_or_else(|_| String::from_utf8_lossy(body).into_owned())
}

fn format_headers(headers: &HeaderMap) -> String {
    headers
        .iter()
        .map(|(k, v)| format!("  {}: {}", k, v.to_str().unwrap_or("<binary>")))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Blocking client for the management API.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    timeout: Duration,
    verbosity: Verbosity,
    progress: Option<ProgressTarget>,
    reporters: Arc<ReporterTally>,
}

/// Why a call produced no response.
enum Failure {
    Timeout,
    Network(String),
}

impl ApiClient {
    pub fn new(config: &Config) -> Result<Self> {
        // Redirects are not followed: the OAuth start endpoint answers with
        // the authorization URL in its `Location` header.
        let client = Client::builder()
            .timeout(config.request_timeout)
            .redirect(Policy::none())
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| ApiError::NetworkError(format!("failed to build HTTP client: {}", e)))?;

        Ok(ApiClient {
            client,
            base_url: config.base_url.clone(),
            timeout: config.request_timeout,
            verbosity: config.verbosity,
            progress: None,
            reporters: Arc::default(),
        })
    }

    /// Draw a spinner on stderr while each call is in flight.
    pub fn with_progress(mut self, enabled: bool) -> Self {
        self.progress = enabled.then_some(ProgressTarget::Stderr);
        self
    }

    /// Run a progress reporter for each call, drawing to `target`.
    pub fn with_progress_target(mut self, target: ProgressTarget) -> Self {
        self.progress = Some(target);
        self
    }

    /// Reporters started by this client and its clones.
    pub fn reporters(&self) -> &ReporterTally {
        &self.reporters
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub fn get(&self, url: &str, cookies: &[Cookie]) -> Result<HttpResponse> {
        self.request(Method::GET, url, None::<&()>, cookies)
    }

    pub fn post<B: Serialize + ?Sized>(
        &self,
        url: &str,
        body: Option<&B>,
        cookies: &[Cookie],
    ) -> Result<HttpResponse> {
        self.request(Method::POST, url, body, cookies)
    }

    pub fn patch<B: Serialize + ?Sized>(
        &self,
        url: &str,
        body: Option<&B>,
        cookies: &[Cookie],
    ) -> Result<HttpResponse> {
        self.request(Method::PATCH, url, body, cookies)
    }

    fn request<B: Serialize + ?Sized>(
        &self,
        method: Method,
        url: &str,
        body: Option<&B>,
        cookies: &[Cookie],
    ) -> Result<HttpResponse> {
        let payload = body
            .map(serde_json::to_vec)
            .transpose()
            .map_err(|e| ApiError::SerializationError(e.to_string()))?;

        let label = endpoint_label(url);
        let mut req = self
            .client
            .request(method.clone(), url)
            .header(CONTENT_TYPE, "application/json");

        if !cookies.is_empty() {
            req = req.header(COOKIE, cookie::header_value(cookies));
            if let Some(xsrf) = cookies.iter().find(|c| c.name == XSRF_COOKIE) {
                req = req.header(XSRF_HEADER, xsrf.value.as_str());
            }
        }

        tracing::info!("[HTTP] {} {}", method, label);
        if let Some(payload) = &payload {
            if self.verbosity >= Verbosity::Verbose {
                tracing::debug!("[HTTP] request body:\n{}", pretty_json(payload));
            }
            req = req.body(payload.clone());
        }

        let progress = self.progress.map(|target| {
            ProgressReporter::start(
                format!("{} {}", method, label),
                target,
                self.reporters.clone(),
            )
        });

        let start = Instant::now();
        let outcome = self.send_within_deadline(req);
        let elapsed = start.elapsed();

        let response = match outcome {
            Ok(response) => {
                drop(progress);
                response
            }
            Err(Failure::Timeout) => {
                if let Some(p) = progress {
                    p.finish(RequestStatus::Timeout);
                }
                tracing::warn!("[HTTP] {} {} timed out after {:?}", method, label, elapsed);
                return Err(ApiError::RequestTimeout(self.timeout.as_secs()));
            }
            Err(Failure::Network(e)) => {
                drop(progress);
                tracing::warn!("[HTTP] {} {} failed: {}", method, label, e);
                return Err(ApiError::NetworkError(e));
            }
        };

        tracing::info!(
            "[HTTP] {} {} [{}] ({:?})",
            method,
            label,
            response.status,
            elapsed
        );

        if !response.is_success() {
            match envelope_message(&response.body) {
                Some(msg) => tracing::info!("[HTTP] error message: {}", msg),
                None => tracing::debug!("[HTTP] error body is not a {{code, msg}} envelope"),
            }
        }

        if self.verbosity >= Verbosity::Verbose {
            tracing::debug!("[HTTP] response headers:\n{}", format_headers(&response.headers));
            if !response.body.is_empty() {
                tracing::debug!("[HTTP] response body:\n{}", pretty_json(&response.body));
            }
        }

        Ok(response)
    }

    /// Send on a worker thread and wait at most `timeout` for the status,
    /// headers and full body. The client's own timeout restarts between
    /// sending and reading the body, so it only bounds the worker.
    fn send_within_deadline(&self, req: RequestBuilder) -> std::result::Result<HttpResponse, Failure> {
        let (tx, rx) = mpsc::channel();
        thread::spawn(move || {
            let outcome = req.send().and_then(|resp| {
                let status = resp.status().as_u16();
                let headers = resp.headers().clone();
                resp.bytes().map(|b| HttpResponse {
                    status,
                    headers,
                    body: b.to_vec(),
                })
            });
            let _ = tx.send(outcome);
        });

        match rx.recv_timeout(self.timeout) {
            Ok(Ok(response)) => Ok(response),
            Ok(Err(e)) if e.is_timeout() => Err(Failure::Timeout),
            Ok(Err(e)) => Err(Failure::Network(e.to_string())),
            Err(RecvTimeoutError::Timeout) => Err(Failure::Timeout),
            Err(RecvTimeoutError::Disconnected) => Err(Failure::Network(
                "request worker exited without a response".to_string(),
            )),
        }
    }
}
