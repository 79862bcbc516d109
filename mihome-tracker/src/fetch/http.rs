//! HTTP client abstraction for testability

use std::fmt;
use std::time::Duration;

use thiserror::Error;

/// Transport-level failure. Never produced for a well-formed HTTP response,
/// whatever its status.
#[derive(Debug, Clone, Error)]
pub enum FetchError {
    /// The client could not be constructed.
    #[error("failed to create HTTP client: {0}")]
    ClientBuild(String),

    /// The request did not complete within its timeout.
    #[error("request to {url} timed out after {timeout_secs}s")]
    Timeout { url: String, timeout_secs: u64 },

    /// Connection refused, DNS failure, reset, or body read failure.
    #[error("request to {url} failed: {reason}")]
    Transport { url: String, reason: String },
}

/// HTTP methods used by the prober.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Head,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Method::Get => f.write_str("GET"),
            Method::Head => f.write_str("HEAD"),
        }
    }
}

/// A completed HTTP exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl HttpResponse {
    /// Create a response with the given status and body.
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// Whether the status is in the 2xx range.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Trait for HTTP client operations.
///
/// This abstraction allows for dependency injection and easier testing
/// by enabling mock HTTP clients in tests.
pub trait HttpClient: Send {
    /// Performs a single HTTP request with a per-call timeout.
    ///
    /// Returns `Ok` for any response the server produced, including 4xx and
    /// 5xx. `Err` is reserved for transport failures.
    fn request(
        &self,
        method: Method,
        url: &str,
        timeout: Duration,
    ) -> Result<HttpResponse, FetchError>;
}

/// Creates one client per scan worker.
pub trait ClientFactory: Sync {
    type Client: HttpClient;

    /// Build a fresh client. Called at most once per worker.
    fn create(&self) -> Result<Self::Client, FetchError>;
}

impl<F, C> ClientFactory for F
where
    F: Fn() -> Result<C, FetchError> + Sync,
    C: HttpClient,
{
    type Client = C;

    fn create(&self) -> Result<C, FetchError> {
        self()
    }
}

/// Real HTTP client implementation using reqwest.
///
/// Wraps a blocking client so connections are pooled and reused for every
/// request the owning worker makes.
#[derive(Debug)]
pub struct ReqwestClient {
    client: reqwest::blocking::Client,
}

impl ReqwestClient {
    /// Creates a new ReqwestClient with default configuration.
    pub fn new() -> Result<Self, FetchError> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(concat!("mihome-tracker/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| FetchError::ClientBuild(e.to_string()))?;

        Ok(Self { client })
    }
}

impl HttpClient for ReqwestClient {
    fn request(
        &self,
        method: Method,
        url: &str,
        timeout: Duration,
    ) -> Result<HttpResponse, FetchError> {
        let builder = match method {
            Method::Get => self.client.get(url),
            Method::Head => self.client.head(url),
        };

        let transport_error = |e: reqwest::Error| {
            if e.is_timeout() {
                FetchError::Timeout {
                    url: url.to_string(),
                    timeout_secs: timeout.as_secs(),
                }
            } else {
                FetchError::Transport {
                    url: url.to_string(),
                    reason: e.to_string(),
                }
            }
        };

        let response = builder.timeout(timeout).send().map_err(transport_error)?;
        let status = response.status().as_u16();

        // Body reads are part of the transport: a reset mid-body is retried.
        let body = match method {
            Method::Head => Vec::new(),
            Method::Get => response.bytes().map_err(transport_error)?.to_vec(),
        };

        Ok(HttpResponse { status, body })
    }
}

/// Factory producing [`ReqwestClient`]s.
#[derive(Debug, Default, Clone, Copy)]
pub struct ReqwestClientFactory;

impl ClientFactory for ReqwestClientFactory {
    type Client = ReqwestClient;

    fn create(&self) -> Result<ReqwestClient, FetchError> {
        ReqwestClient::new()
    }
}
