//! Carlog Rust API Client
//!
//! # Creating new api client
//!
//! - [new](CarlogClient::new) - create new client with default configuration
//! - [with_config](CarlogClient::with_config) - create client with custom configuration
//! - [with_client](CarlogClient::with_client) - create client with configuration and custom reqwest client
//!
//! # Configuration
//!
//! - [get_config](CarlogClient::get_config) - returns configuration
//! - [base_url](CarlogClient::base_url) - returns the backend url in use
//!

use std::{sync::Arc, time::Duration};

use tracing::debug;

use crate::{
    CARLOG_DEFAULT_URL, Result,
    cache::CarlogCache,
    config::{CARLOG_URL_ENV, DEFAULT_REQUEST_TIMEOUT_SECS, MAX_RETRIES},
    http_client::{HttpClient, HttpMetricsSnapshot},
    validation::ValidationLimits,
};

/// Configuration for the carlog client. Defines endpoint url, retry policy, and cache behavior.
///
/// ```rust,no_run
/// use carlog::prelude::*;
/// # fn create_client() -> Result<CarlogClient, CarlogError> {
/// let config = ClientConfig::default()
///     .base_url("http://127.0.0.1:8000")
///     .max_retries(5);
/// let client = CarlogClient::with_config(config)?;
/// # Ok(client)
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base url for all backend requests.
    /// If not provided in config, url is determined by:
    /// * The environment variable `CARLOG_URL`, if defined, or
    /// * "http://localhost:8000" `carlog::CARLOG_DEFAULT_URL`
    pub base_url: String,

    /// Retries for connection failures, timeouts, and busy-server responses.
    /// Only idempotent requests (GET, PUT, DELETE) are retried.
    pub max_retries: u32,

    /// Delay before the first retry. Doubles with each further attempt.
    pub retry_base_delay: Duration,

    /// Timeout for each http request.
    pub request_timeout: Duration,

    /// Limits for local parameter checks.
    pub limits: ValidationLimits,

    /// Disable in-memory caches for vehicles, service types, and summaries.
    pub disable_cache: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        ClientConfig {
            base_url: std::env::var(CARLOG_URL_ENV).unwrap_or(CARLOG_DEFAULT_URL.to_string()),
            max_retries: MAX_RETRIES,
            retry_base_delay: Duration::from_secs(1),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            limits: ValidationLimits::default(),
            disable_cache: false,
        }
    }
}

impl ClientConfig {
    /// Sets the backend url.
    pub fn base_url(self, base_url: impl Into<String>) -> Self {
        ClientConfig {
            base_url: base_url.into(),
            ..self
        }
    }

    pub fn max_retries(self, max_retries: u32) -> Self {
        ClientConfig {
            max_retries,
            ..self
        }
    }

    pub fn retry_base_delay(self, retry_base_delay: Duration) -> Self {
        ClientConfig {
            retry_base_delay,
            ..self
        }
    }

    pub fn request_timeout(self, request_timeout: Duration) -> Self {
        ClientConfig {
            request_timeout,
            ..self
        }
    }

    pub fn limits(self, limits: ValidationLimits) -> Self {
        ClientConfig { limits, ..self }
    }

    pub fn disable_cache(self, disable_cache: bool) -> Self {
        ClientConfig {
            disable_cache,
            ..self
        }
    }

    pub fn get_limits(&self) -> &ValidationLimits {
        &self.limits
    }
}

/// Typed client for the carlog maintenance backend.
#[derive(Clone)]
pub struct CarlogClient {
    pub(crate) client: Arc<HttpClient>,
    pub(crate) config: ClientConfig,
    pub(crate) cache: Arc<CarlogCache>,
}

impl std::fmt::Debug for CarlogClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CarlogClient")
            .field("config", &self.config)
            .field("cache", &self.cache)
            .finish()
    }
}

impl CarlogClient {
    /// Creates a new client with default configuration.
    ///
    /// # Example
    /// ```rust,no_run
    /// use carlog::prelude::*;
    /// # fn create_client() -> Result<CarlogClient, CarlogError> {
    /// let client = CarlogClient::new()?;
    /// # Ok(client)
    /// # }
    /// ```
    pub fn new() -> Result<Self> {
        Self::with_config(ClientConfig::default())
    }

    /// Creates a new client with the provided configuration.
    pub fn with_config(config: ClientConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .no_proxy()
            .timeout(config.request_timeout);
        Self::with_client(client, config)
    }

    /// Creates a client from a `reqwest::ClientBuilder` and configuration.
    /// ClientBuilder can be customized with timeouts, proxies, dns servers, user_agent, etc.
    /// `config.request_timeout` is not applied to a caller-provided builder.
    ///
    /// # Example
    /// ```rust,no_run
    /// use carlog::prelude::*;
    /// # fn create_client() -> Result<CarlogClient, CarlogError> {
    /// let builder = reqwest::Client::builder().timeout(std::time::Duration::from_secs(10));
    /// let client = CarlogClient::with_client(builder, ClientConfig::default())?;
    /// # Ok(client)
    /// # }
    /// ```
    pub fn with_client(client: reqwest::ClientBuilder, config: ClientConfig) -> Result<Self> {
        debug!(url=?config.base_url, "new client");
        let client = HttpClient::new(
            client,
            config.base_url.clone(),
            config.max_retries,
            config.retry_base_delay,
        )?;
        let cache = Arc::new(CarlogCache::default());
        if config.disable_cache {
            cache.disable();
        }
        Ok(Self {
            client: Arc::new(client),
            config,
            cache,
        })
    }

    /// Returns the configuration.
    pub fn get_config(&self) -> &ClientConfig {
        &self.config
    }

    /// Returns the backend url, without trailing slash.
    pub fn base_url(&self) -> &str {
        &self.client.base_url
    }

    /// Returns a snapshot of current HTTP metrics.
    ///
    /// Note: Cached responses do not increment request counters.
    pub fn http_metrics(&self) -> HttpMetricsSnapshot {
        self.client.metrics_snapshot()
    }

    /// Enables cache.
    /// Cache is always cleared if disabled and re-enabled, to ensure it's not stale
    pub fn enable_cache(&self) {
        self.cache.enable();
    }

    /// Disables cache
    pub fn disable_cache(&self) {
        self.cache.disable();
    }

    /// Returns true if the cache is enabled
    pub fn cache_is_enabled(&self) -> bool {
        self.cache.is_enabled()
    }

    /// Drops every cached list. Call after changes made outside this client.
    pub fn invalidate_all(&self) {
        self.cache.clear();
    }

    // accessor to support cache tests
    #[doc(hidden)]
    pub fn cache(&self) -> Arc<CarlogCache> {
        self.cache.clone()
    }

    pub(crate) fn limits(&self) -> &ValidationLimits {
        &self.config.limits
    }
}
