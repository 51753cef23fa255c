//! HttpClient middleware used by CarlogClient
//!
//! Responsible for
//!  - handing all HTTP api requests
//!  - logging/tracing
//!  - retries and backoff (for timeouts and connection errors)
//!  - mapping backend error bodies into `CarlogError`

use std::{
    fmt,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::{Duration, SystemTime, UNIX_EPOCH},
};

use bytes::Bytes;
use reqwest::{
    ClientBuilder, Method, StatusCode,
    header::CONTENT_TYPE,
    multipart::{Form, Part},
};
use serde::{Serialize, de::DeserializeOwned};
use snafu::prelude::*;
use tracing::{debug, error, trace, warn};

use crate::{
    Result,
    error::{CarlogError, HttpSnafu, SerializationSnafu, parse_error_detail},
};

/// HTTP metrics tracked using atomic counters for thread-safe access.
/// These counters are cumulative and never reset during the client's lifetime.
#[derive(Debug, Default)]
pub struct HttpMetrics {
    /// Total number of HTTP requests sent to the server (excludes cached responses)
    total_requests: AtomicU64,
    /// Total number of successful responses (2xx status codes)
    successful_responses: AtomicU64,
    /// Total number of error responses (non-2xx status codes)
    errors: AtomicU64,
    /// Total number of retry attempts (connection failures, timeouts, busy server)
    retries: AtomicU64,
    /// Total bytes sent in request bodies
    bytes_sent: AtomicU64,
    /// Total bytes received in response bodies
    bytes_received: AtomicU64,
}

impl HttpMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a snapshot of current metrics as plain u64 values
    pub fn snapshot(&self) -> HttpMetricsSnapshot {
        HttpMetricsSnapshot {
            total_requests: self.total_requests.load(Ordering::Relaxed),
            successful_responses: self.successful_responses.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
            retries: self.retries.load(Ordering::Relaxed),
            bytes_sent: self.bytes_sent.load(Ordering::Relaxed),
            bytes_received: self.bytes_received.load(Ordering::Relaxed),
        }
    }

    fn increment_requests(&self) {
        self.total_requests.fetch_add(1, Ordering::Relaxed);
    }

    fn increment_success(&self) {
        self.successful_responses.fetch_add(1, Ordering::Relaxed);
    }

    fn increment_errors(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
    }

    fn increment_retries(&self) {
        self.retries.fetch_add(1, Ordering::Relaxed);
    }

    fn add_bytes_sent(&self, bytes: u64) {
        self.bytes_sent.fetch_add(bytes, Ordering::Relaxed);
    }

    fn add_bytes_received(&self, bytes: u64) {
        self.bytes_received.fetch_add(bytes, Ordering::Relaxed);
    }
}

/// A point-in-time snapshot of HTTP metrics with plain u64 values.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HttpMetricsSnapshot {
    /// Total number of HTTP requests sent to the server
    pub total_requests: u64,
    /// Total number of successful responses (2xx status codes)
    pub successful_responses: u64,
    /// Total number of error responses (non-2xx status codes)
    pub errors: u64,
    /// Total number of retry attempts
    pub retries: u64,
    /// Total bytes sent in request bodies
    pub bytes_sent: u64,
    /// Total bytes received in response bodies
    pub bytes_received: u64,
}

impl std::fmt::Display for HttpMetricsSnapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "requests={} success={} errors={} retries={} sent={} recv={}",
            self.total_requests,
            self.successful_responses,
            self.errors,
            self.retries,
            format_bytes(self.bytes_sent),
            format_bytes(self.bytes_received),
        )
    }
}

fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{bytes}B")
    } else if bytes < 1024 * 1024 {
        format!("{:.1}KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1}MB", bytes as f64 / (1024.0 * 1024.0))
    }
}

/// status codes where it's ok to retry and backoff
fn retry_for_status(code: StatusCode) -> bool {
    match code {
      StatusCode::SERVICE_UNAVAILABLE /* 503 */ |
      StatusCode::GATEWAY_TIMEOUT /* 504 */ |
      StatusCode::REQUEST_TIMEOUT /* 408 */ => true,
      _ => false,
    }
}

/// Request body variants supported by the backend api
#[derive(Clone, Default)]
pub(crate) enum RequestBody {
    #[default]
    Empty,
    Json(Bytes),
    /// single-file multipart upload
    Upload {
        field: String,
        file_name: String,
        data: Bytes,
    },
}

impl RequestBody {
    fn len(&self) -> usize {
        match self {
            Self::Empty => 0,
            Self::Json(data) | Self::Upload { data, .. } => data.len(),
        }
    }

    pub(crate) fn json<B: Serialize>(body: &B) -> Result<Self> {
        Ok(Self::Json(Bytes::from(
            serde_json::to_vec(body).context(SerializationSnafu)?,
        )))
    }
}

#[derive(Clone, Default)]
pub(crate) struct HttpRequest {
    pub method: Method,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: RequestBody,
}

impl fmt::Debug for HttpRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpRequest")
            .field("method", &self.method)
            .field("path", &self.path)
            .field("query", &self.query)
            .field("body", &self.body.len())
            .finish()
    }
}

#[derive(Debug, Clone)]
pub(crate) struct HttpClient {
    pub client: reqwest::Client,

    /// Base URL for API requests (e.g., "http://localhost:8000")
    pub base_url: String,

    max_retries: u32,

    /// first retry delay; doubles on each attempt
    retry_base_delay: Duration,

    /// HTTP request/response metrics
    pub metrics: Arc<HttpMetrics>,
}

impl HttpClient {
    pub fn new(
        builder: ClientBuilder,
        base_url: String,
        max_retries: u32,
        retry_base_delay: Duration,
    ) -> Result<Self> {
        let client = builder.build().context(HttpSnafu {
            method: "client-init",
            url: "",
        })?;
        Ok(HttpClient {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            max_retries,
            retry_base_delay,
            metrics: Arc::new(HttpMetrics::new()),
        })
    }

    /// Returns a snapshot of current HTTP metrics
    pub fn metrics_snapshot(&self) -> HttpMetricsSnapshot {
        self.metrics.snapshot()
    }

    pub(crate) async fn get_request<T: DeserializeOwned>(
        &self,
        path: &str,
        query: Vec<(String, String)>,
    ) -> Result<T> {
        let req = HttpRequest {
            method: Method::GET,
            path: path.into(),
            query,
            body: RequestBody::Empty,
        };
        self.send(req).await
    }

    pub(crate) async fn post_request<T: DeserializeOwned, B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T> {
        let req = HttpRequest {
            method: Method::POST,
            path: path.into(),
            query: Vec::new(),
            body: RequestBody::json(body)?,
        };
        self.send(req).await
    }

    pub(crate) async fn put_request<T: DeserializeOwned, B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T> {
        let req = HttpRequest {
            method: Method::PUT,
            path: path.into(),
            query: Vec::new(),
            body: RequestBody::json(body)?,
        };
        self.send(req).await
    }

    /// Makes a DELETE request. Any response body is discarded.
    pub(crate) async fn delete_request(&self, path: &str) -> Result<()> {
        let req = HttpRequest {
            method: Method::DELETE,
            path: path.into(),
            query: Vec::new(),
            body: RequestBody::Empty,
        };
        self.send_raw(req).await.map(|_| ())
    }

    /// POST with json body, returning the raw response body.
    pub(crate) async fn post_for_bytes<B: Serialize>(&self, path: &str, body: &B) -> Result<Bytes> {
        let req = HttpRequest {
            method: Method::POST,
            path: path.into(),
            query: Vec::new(),
            body: RequestBody::json(body)?,
        };
        self.send_raw(req).await
    }

    /// POST without expecting a meaningful response body.
    pub(crate) async fn post_no_content<B: Serialize>(&self, path: &str, body: &B) -> Result<()> {
        let req = HttpRequest {
            method: Method::POST,
            path: path.into(),
            query: Vec::new(),
            body: RequestBody::json(body)?,
        };
        self.send_raw(req).await.map(|_| ())
    }

    /// POST a single file as multipart/form-data.
    pub(crate) async fn post_upload<T: DeserializeOwned>(
        &self,
        path: &str,
        field: &str,
        file_name: &str,
        data: Bytes,
    ) -> Result<T> {
        let req = HttpRequest {
            method: Method::POST,
            path: path.into(),
            query: Vec::new(),
            body: RequestBody::Upload {
                field: field.to_string(),
                file_name: file_name.to_string(),
                data,
            },
        };
        self.send(req).await
    }

    /// Single liveness check: GET on the base url, no retries.
    pub(crate) async fn probe(&self, timeout: Duration) -> Result<()> {
        let url = format!("{}/", self.base_url);
        trace!(%url, "probe");
        let response = self
            .client
            .get(&url)
            .timeout(timeout)
            .send()
            .await
            .context(HttpSnafu {
                method: "GET",
                url: &url,
            })?;
        let code = response.status();
        if code.is_success() {
            return Ok(());
        }
        Err(CarlogError::ApiError {
            code: code.as_u16(),
            method: "GET".into(),
            url,
            message: response.text().await.unwrap_or_default(),
        })
    }

    pub(crate) async fn send<T: DeserializeOwned>(&self, req: HttpRequest) -> Result<T> {
        let path = req.path.clone();
        let body = self.send_raw(req).await?;
        log_response(&path, &body);
        deserialize_json(&body)
    }

    fn build_request(&self, req: &HttpRequest, full_url: &str) -> Result<reqwest::RequestBuilder> {
        let builder = self
            .client
            .request(req.method.clone(), full_url)
            .query(&req.query);
        Ok(match &req.body {
            RequestBody::Empty => builder,
            RequestBody::Json(data) => builder
                .header(CONTENT_TYPE, "application/json")
                .body(data.clone()),
            RequestBody::Upload {
                field,
                file_name,
                data,
            } => {
                // Form is not Clone, so it is rebuilt for every attempt
                let part = Part::bytes(data.to_vec())
                    .file_name(file_name.clone())
                    .mime_str("application/json")
                    .context(HttpSnafu {
                        method: req.method.to_string(),
                        url: full_url,
                    })?;
                builder.multipart(Form::new().part(field.clone(), part))
            }
        })
    }

    /// This function handles all backend rest api requests (http: get,post,put,delete)
    /// - retries up to N(=3) times for connection failures or server timeout
    /// - maps http error codes into CarlogErrors
    /// - returns the raw response body
    pub(crate) async fn send_raw(&self, req: HttpRequest) -> Result<Bytes> {
        let mut attempt = 0u32;
        let full_url = format!("{}{}", self.base_url, req.path);

        // debug log (if tracing enabled)
        log_request(&req, &full_url);

        let body_size = req.body.len() as u64;

        loop {
            let request = self.build_request(&req, &full_url)?;

            // Track request metrics
            self.metrics.increment_requests();
            self.metrics.add_bytes_sent(body_size);

            match request.send().await {
                Ok(response) => {
                    let code = response.status();
                    match code {
                        // 2xx
                        // 201 (Created), 204 (No Content)
                        ok if ok.is_success() => {
                            // If we fail to fully read the response, don't retry. The server might
                            // believe the request succeeded, and the request may not be idempotent.
                            let body = response.bytes().await
                                .context(HttpSnafu{
                                    method: req.method.to_string(),
                                    url: req.path.clone(),
                                })?;
                            self.metrics.increment_success();
                            self.metrics.add_bytes_received(body.len() as u64);
                            return Ok(body)
                        },
                        StatusCode::NOT_FOUND /* 404 */ |
                        StatusCode::GONE /* 410 */ => {
                            self.metrics.increment_errors();
                            let body = response.bytes().await.unwrap_or_default();
                            let detail = parse_error_detail(&body);
                            debug!(?code, message=?detail.message, ?req, "http");
                            return Err(CarlogError::NotFound {
                                obj_type: resource_kind(&req.path).into(),
                                key: req.path,
                            })
                        }
                        StatusCode::BAD_REQUEST /* 400 */ |
                        StatusCode::UNPROCESSABLE_ENTITY /* 422 */ => {
                            self.metrics.increment_errors();
                            let body = response.bytes().await.unwrap_or_default();
                            let detail = parse_error_detail(&body);
                            let message = detail
                                .message
                                .unwrap_or_else(|| String::from_utf8_lossy(&body).to_string());
                            error!(?code, ?message, ?req, "http");
                            return Err(CarlogError::Validation {
                                message,
                                fields: detail.fields,
                            })
                        }
                        _ => {
                            let body = response.bytes().await.unwrap_or_default();
                            let message = parse_error_detail(&body)
                                .message
                                .unwrap_or_else(|| String::from_utf8_lossy(&body).to_string());
                            error!(?code, ?req, message, attempt, "http");
                            self.metrics.increment_errors();
                            if retry_for_status(code) && is_idempotent_method(&req.method) {
                                if attempt < self.max_retries {
                                    self.log_and_backoff(attempt, code.to_string()).await;
                                    self.metrics.increment_retries();
                                    attempt += 1;
                                    continue;
                                }
                                return Err(CarlogError::TooManyRetries { n: attempt + 1 });
                            }
                            return Err(CarlogError::ApiError {
                                code: code.as_u16(),
                                method: req.method.to_string(),
                                url: req.path,
                                message,
                            });
                        }
                    };
                }
                Err(e) => {
                    error!(source=?e, ?req, "http");
                    // Check for connection or timeout errors
                    if (e.is_connect() || e.is_timeout())
                        && is_idempotent_method(&req.method)
                        && attempt < self.max_retries
                    {
                        self.log_and_backoff(attempt, e.to_string()).await;
                        self.metrics.increment_retries();
                        attempt += 1;
                        continue;
                    }
                    // Other non-recoverable errors (e.g., DNS error, invalid URL, etc.)
                    self.metrics.increment_errors();
                    return Err(CarlogError::Http {
                        method: req.method.to_string(),
                        url: req.path,
                        source: e,
                    });
                }
            }
        }
    }

    // log attempt and sleep for exponential backoff
    async fn log_and_backoff(&self, attempt: u32, err: String) {
        let delay = backoff_delay(self.retry_base_delay, attempt);
        warn!(
            "Recoverable error {err}. Attempt {attempt}. Waiting {}ms before retry",
            delay.as_millis()
        );
        tokio::time::sleep(delay).await;
    }
}

/// exponential backoff: base, 2*base, 4*base, with jitter in [0.5, 1.5)
fn backoff_delay(base: Duration, attempt: u32) -> Duration {
    let jitter = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .subsec_nanos() as f64
        / 1_000_000_000.0;
    base.mul_f64(f64::from(2u32.saturating_pow(attempt)) * (0.5 + jitter))
}

// first path segment, used to label NotFound errors
fn resource_kind(path: &str) -> &'static str {
    let mut segments = path.trim_start_matches('/').split('/');
    match (segments.next(), segments.nth(1)) {
        (Some("vehicles"), Some("interval_overrides")) => "IntervalOverride",
        (Some("vehicles"), Some("logs")) => "MaintenanceLog",
        (Some("vehicles"), _) => "Vehicle",
        (Some("service_types"), _) => "ServiceType",
        (Some("maintenance_logs"), _) => "MaintenanceLog",
        (Some("vehicle-definitions"), _) => "VehicleDefinition",
        (Some("backup"), _) => "Backup",
        _ => "Resource",
    }
}

// dump request
// requires RUST_LOG=carlog::http_json=trace
fn log_request(req: &HttpRequest, url: &str) {
    debug!(method = %req.method, url, "request");
    if tracing::enabled!(target: "carlog::http_json", tracing::Level::TRACE) {
        let body = match &req.body {
            RequestBody::Empty => String::new(),
            RequestBody::Json(data) => String::from_utf8_lossy(data).to_string(),
            RequestBody::Upload {
                field, file_name, data,
            } => format!("<multipart {field}={file_name} {} bytes>", data.len()),
        };
        trace!(target: "carlog::http_json", "{} url={url} query={:?} body={body}", req.method, req.query);
    }
}

// dump json response, for debugging
fn log_response(path: &str, body: &Bytes) {
    if tracing::enabled!(target: "carlog::http_json", tracing::Level::TRACE) {
        trace!(target: "carlog::http_json", "Response path={path} body={}",
            String::from_utf8_lossy(body)
        );
    }
}

// deserialize, reporting errors with 'serde_path_to_error', which provides
// detailed json path to the error
pub(crate) fn deserialize_json<T: DeserializeOwned>(body: &[u8]) -> Result<T> {
    let mut deserializer = serde_json::Deserializer::from_slice(body);
    match serde_path_to_error::deserialize(&mut deserializer) {
        Ok(value) => Ok(value),
        Err(err) => {
            error!("Deserialization failed at {}: {}", err.path(), err);
            Err(CarlogError::Deserialization {
                source: err.into_inner(),
            })
        }
    }
}

fn is_idempotent_method(method: &Method) -> bool {
    matches!(
        *method,
        Method::GET | Method::HEAD | Method::PUT | Method::DELETE | Method::OPTIONS
    )
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use reqwest::{Method, StatusCode};

    #[test]
    fn test_retry_for_status() {
        assert!(super::retry_for_status(StatusCode::SERVICE_UNAVAILABLE));
        assert!(super::retry_for_status(StatusCode::REQUEST_TIMEOUT));
        assert!(super::retry_for_status(StatusCode::GATEWAY_TIMEOUT));
        assert!(!super::retry_for_status(StatusCode::INTERNAL_SERVER_ERROR));
        assert!(!super::retry_for_status(StatusCode::UNPROCESSABLE_ENTITY));
    }

    #[test]
    fn test_idempotent_methods() {
        assert!(super::is_idempotent_method(&Method::GET));
        assert!(super::is_idempotent_method(&Method::PUT));
        assert!(super::is_idempotent_method(&Method::DELETE));
        assert!(!super::is_idempotent_method(&Method::POST));
    }

    #[test]
    fn test_backoff_delay_grows() {
        let base = Duration::from_millis(100);
        let first = super::backoff_delay(base, 0);
        let third = super::backoff_delay(base, 2);
        assert!(first >= Duration::from_millis(50) && first < Duration::from_millis(150));
        assert!(third >= Duration::from_millis(200) && third < Duration::from_millis(600));
    }

    #[test]
    fn test_resource_kind() {
        assert_eq!(super::resource_kind("/vehicles/3"), "Vehicle");
        assert_eq!(
            super::resource_kind("/vehicles/3/interval_overrides/7"),
            "IntervalOverride"
        );
        assert_eq!(super::resource_kind("/vehicles/3/logs"), "MaintenanceLog");
        assert_eq!(super::resource_kind("/service_types/2"), "ServiceType");
        assert_eq!(super::resource_kind("/maintenance_logs/9"), "MaintenanceLog");
        assert_eq!(super::resource_kind("/other"), "Resource");
    }

    #[test]
    fn test_format_bytes() {
        assert_eq!(super::format_bytes(12), "12B");
        assert_eq!(super::format_bytes(2048), "2.0KB");
    }
}
