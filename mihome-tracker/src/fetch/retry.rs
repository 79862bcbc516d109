//! Bounded retries for transport failures.

use std::thread;
use std::time::Duration;

use tracing::{debug, warn};

use super::http::{HttpClient, HttpResponse, Method};

/// Default number of attempts per request, including the first.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Default fixed delay between attempts.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(1);

/// Retry policy for transport failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first (minimum 1).
    pub max_attempts: u32,
    /// Fixed delay between attempts.
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            delay: DEFAULT_RETRY_DELAY,
        }
    }
}

impl RetryPolicy {
    /// Create a policy, clamping attempts to at least one.
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
        }
    }
}

/// An HTTP client wrapped with a retry policy.
///
/// Only transport failures are retried. Any HTTP response, whatever its
/// status, is handed back to the caller on the first attempt that produced
/// it. The delay sleeps the calling worker only.
#[derive(Debug)]
pub struct ResilientFetcher<C> {
    client: C,
    policy: RetryPolicy,
}

impl<C: HttpClient> ResilientFetcher<C> {
    /// Wrap a client.
    pub fn new(client: C, policy: RetryPolicy) -> Self {
        Self { client, policy }
    }

    /// Issue a request, retrying transport failures.
    ///
    /// Returns `None` once every attempt has failed at the transport level.
    pub fn request(&self, method: Method, url: &str, timeout: Duration) -> Option<HttpResponse> {
        let attempts = self.policy.max_attempts.max(1);

        for attempt in 1..=attempts {
            match self.client.request(method, url, timeout) {
                Ok(response) => return Some(response),
                Err(e) if attempt < attempts => {
                    debug!(%method, url, attempt, error = %e, "request failed, retrying");
                    if !self.policy.delay.is_zero() {
                        thread::sleep(self.policy.delay);
                    }
                }
                Err(e) => {
                    warn!(%method, url, attempts, error = %e, "request failed, giving up");
                }
            }
        }

        None
    }

    /// GET with retries.
    pub fn get(&self, url: &str, timeout: Duration) -> Option<HttpResponse> {
        self.request(Method::Get, url, timeout)
    }

    /// HEAD with retries.
    pub fn head(&self, url: &str, timeout: Duration) -> Option<HttpResponse> {
        self.request(Method::Head, url, timeout)
    }
}
