//! Backend liveness probing.
//!
//! The backend may still be starting when the client comes up. [`wait_for_backend`]
//! polls the base url until it answers, backing off between attempts, and can be
//! cancelled from another task through a `tokio::sync::watch` channel.

use std::time::{Duration, Instant};

use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::{Result, client::CarlogClient, error::CarlogError};

/// Configuration for waiting on the backend.
#[derive(Debug, Clone)]
pub struct ProbeConfig {
    /// Timeout for a single probe request.
    pub attempt_timeout: Duration,
    /// Delay after the first failed attempt.
    pub initial_delay: Duration,
    /// Maximum delay between attempts.
    pub max_delay: Duration,
    /// Upper bound for total wait time (wall clock).
    pub timeout: Duration,
    /// Maximum number of attempts (0 disables the cap).
    pub max_attempts: usize,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            attempt_timeout: Duration::from_secs(1),
            initial_delay: Duration::from_millis(250),
            max_delay: Duration::from_secs(2),
            timeout: Duration::from_secs(30),
            max_attempts: 0,
        }
    }
}

impl ProbeConfig {
    pub fn timeout(self, timeout: Duration) -> Self {
        Self { timeout, ..self }
    }

    pub fn max_attempts(self, max_attempts: usize) -> Self {
        Self {
            max_attempts,
            ..self
        }
    }

    pub fn initial_delay(self, initial_delay: Duration) -> Self {
        Self {
            initial_delay,
            ..self
        }
    }

    pub fn max_delay(self, max_delay: Duration) -> Self {
        Self { max_delay, ..self }
    }

    pub fn attempt_timeout(self, attempt_timeout: Duration) -> Self {
        Self {
            attempt_timeout,
            ..self
        }
    }

    fn next_delay(&self, delay: Duration) -> Duration {
        delay.saturating_mul(2).min(self.max_delay)
    }
}

impl CarlogClient {
    /// Single probe of the backend base url. Returns false on any error.
    pub async fn is_backend_online(&self) -> bool {
        self.client
            .probe(ProbeConfig::default().attempt_timeout)
            .await
            .is_ok()
    }
}

/// Polls the backend until it responds.
///
/// Returns the number of attempts used.
///
/// # Errors
/// - [`CarlogError::BackendUnavailable`] after `timeout` or `max_attempts` is exhausted
/// - [`CarlogError::ProbeCancelled`] as soon as `cancel` becomes true
pub async fn wait_for_backend(
    client: &CarlogClient,
    config: &ProbeConfig,
    mut cancel: watch::Receiver<bool>,
) -> Result<usize> {
    let start = Instant::now();
    let mut attempt = 0usize;
    let mut delay = config.initial_delay;

    loop {
        if *cancel.borrow() {
            return Err(CarlogError::ProbeCancelled);
        }
        attempt += 1;
        let err = tokio::select! {
            res = client.client.probe(config.attempt_timeout) => match res {
                Ok(()) => {
                    info!(attempt, elapsed_ms = start.elapsed().as_millis(), "backend online");
                    return Ok(attempt);
                }
                Err(err) => err,
            },
            _ = cancelled(&mut cancel) => return Err(CarlogError::ProbeCancelled),
        };

        let elapsed = start.elapsed();
        let attempts_exhausted = config.max_attempts > 0 && attempt >= config.max_attempts;
        if attempts_exhausted || elapsed + delay > config.timeout {
            warn!(attempt, elapsed_ms = elapsed.as_millis(), "backend probe giving up");
            return Err(CarlogError::BackendUnavailable {
                url: client.base_url().to_string(),
                attempts: attempt,
                elapsed,
                last_error: Some(err.to_string()),
            });
        }
        debug!(attempt, delay_ms = delay.as_millis(), error = %err, "backend not ready");

        tokio::select! {
            () = tokio::time::sleep(delay) => {}
            _ = cancelled(&mut cancel) => return Err(CarlogError::ProbeCancelled),
        }
        delay = config.next_delay(delay);
    }
}

// Resolves when the flag flips to true. If the sender is dropped, never resolves.
async fn cancelled(cancel: &mut watch::Receiver<bool>) {
    if cancel.wait_for(|flag| *flag).await.is_err() {
        std::future::pending::<()>().await;
    }
}
