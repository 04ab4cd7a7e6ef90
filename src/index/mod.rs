//! Clients for the external annotation and search indexes.
//!
//! Both indexes answer the same question for the audit: how many hits does a
//! piece of text produce within one ontology. The HTTP clients are async
//! (`reqwest`) underneath and expose a blocking [`IndexClient`] by driving a
//! shared tokio runtime, so audit workers can call them from plain threads.

mod annotator;
mod search;

pub use annotator::AnnotatorClient;
pub use search::SearchClient;

use std::sync::Arc;
use thiserror::Error;

/// Errors that can occur during an index query.
#[derive(Error, Debug)]
pub enum IndexError {
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("request timed out")]
    Timeout,
    #[error("index unavailable: {0}")]
    Unavailable(String),
    #[error("unexpected response: {0}")]
    Decode(String),
    #[error("runtime error: {0}")]
    Runtime(#[from] std::io::Error),
}

impl IndexError {
    /// Short classification used in check failure findings.
    pub fn kind(&self) -> &'static str {
        match self {
            IndexError::Network(_) => "network",
            IndexError::Timeout => "timeout",
            IndexError::Unavailable(_) => "unavailable",
            IndexError::Decode(_) => "decode",
            IndexError::Runtime(_) => "runtime",
        }
    }

    fn from_request(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            IndexError::Timeout
        } else if e.is_decode() {
            IndexError::Decode(e.to_string())
        } else {
            IndexError::Network(e)
        }
    }
}

/// A queryable index.
///
/// One call is one try: implementations do not retry.
pub trait IndexClient: Send + Sync {
    /// Name used in logs and failure findings.
    fn name(&self) -> &'static str;

    /// Number of hits for `text` within the ontology `scope`.
    fn query(&self, text: &str, scope: &str) -> Result<u64, IndexError>;
}

/// HTTP client and runtime shared by the index clients.
#[derive(Clone)]
pub struct HttpContext {
    http: reqwest::Client,
    runtime: Arc<tokio::runtime::Runtime>,
}

impl HttpContext {
    pub fn new() -> Result<Self, IndexError> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("ontocheck/", env!("CARGO_PKG_VERSION")))
            .build()?;
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .enable_all()
            .build()?;

        Ok(Self {
            http,
            runtime: Arc::new(runtime),
        })
    }

    pub(crate) fn http(&self) -> &reqwest::Client {
        &self.http
    }

    pub(crate) fn block_on<F: std::future::Future>(&self, future: F) -> F::Output {
        self.runtime.block_on(future)
    }
}

/// Fail on any non-2xx status.
fn ensure_success(response: &reqwest::Response) -> Result<(), IndexError> {
    let status = response.status();
    if status.is_success() {
        Ok(())
    } else {
        Err(IndexError::Unavailable(format!("HTTP {}", status.as_u16())))
    }
}
