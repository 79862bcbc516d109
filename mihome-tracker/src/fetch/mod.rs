//! Resilient HTTP fetching.
//!
//! - `http`: the [`HttpClient`] seam and its blocking `reqwest` implementation
//! - `retry`: [`ResilientFetcher`], which retries transport failures
//!
//! Each scan worker owns exactly one client, created lazily through a
//! [`ClientFactory`] the first time the worker picks up a build number.
//! Clients are never shared between workers.

mod http;
mod retry;

pub use http::{
    ClientFactory, FetchError, HttpClient, HttpResponse, Method, ReqwestClient,
    ReqwestClientFactory,
};
pub use retry::{ResilientFetcher, RetryPolicy, DEFAULT_MAX_ATTEMPTS, DEFAULT_RETRY_DELAY};
