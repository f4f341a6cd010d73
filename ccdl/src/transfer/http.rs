//! HTTP transport abstraction.
//!
//! The engine talks to the network through the `Transport` trait so retry,
//! resume and integrity logic can be exercised against scripted transports.
//! `HttpTransport` is the production implementation on top of
//! `reqwest::blocking`.

use std::io::Read;
use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::CONTENT_LENGTH;

use super::headers::HeaderSet;
use crate::error::{FetchError, FetchResult};

/// Failure of a single request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// Connection or timeout failure; the request may be retried.
    Transient(String),
    /// Anything else; retrying will not help.
    Fatal(String),
}

impl std::fmt::Display for TransportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Transient(msg) => write!(f, "transient: {}", msg),
            Self::Fatal(msg) => write!(f, "{}", msg),
        }
    }
}

/// Response to a GET request with a streaming body.
pub struct TransportResponse {
    /// HTTP status code.
    pub status: u16,
    /// Declared `Content-Length`, if any.
    pub content_length: Option<u64>,
    /// Response body.
    pub body: Box<dyn Read + Send>,
}

impl std::fmt::Debug for TransportResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransportResponse")
            .field("status", &self.status)
            .field("content_length", &self.content_length)
            .finish_non_exhaustive()
    }
}

/// Trait for the outbound HTTP operations the engine needs.
pub trait Transport: Send + Sync {
    /// Performs a HEAD request and returns the declared content length.
    fn head(&self, url: &str, headers: &HeaderSet) -> Result<Option<u64>, TransportError>;

    /// Performs a GET request and returns the streaming response.
    fn get(&self, url: &str, headers: &HeaderSet) -> Result<TransportResponse, TransportError>;
}

/// Real transport using a blocking reqwest client.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    timeout: Duration,
}

impl HttpTransport {
    /// Creates a transport whose requests time out after `timeout`.
    pub fn new(timeout: Duration) -> FetchResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| FetchError::Config(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self { client, timeout })
    }

    /// The per-request timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

fn classify(e: reqwest::Error) -> TransportError {
    if e.is_timeout() || e.is_connect() || e.is_request() || e.is_body() {
        TransportError::Transient(e.to_string())
    } else {
        TransportError::Fatal(e.to_string())
    }
}

fn declared_length(headers: &reqwest::header::HeaderMap) -> Option<u64> {
    headers
        .get(CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.parse::<u64>().ok())
}

impl Transport for HttpTransport {
    fn head(&self, url: &str, headers: &HeaderSet) -> Result<Option<u64>, TransportError> {
        let response = self
            .client
            .head(url)
            .headers(headers.as_map().clone())
            .send()
            .map_err(classify)?;
        Ok(declared_length(response.headers()))
    }

    fn get(&self, url: &str, headers: &HeaderSet) -> Result<TransportResponse, TransportError> {
        let response = self
            .client
            .get(url)
            .headers(headers.as_map().clone())
            .send()
            .map_err(classify)?;
        Ok(TransportResponse {
            status: response.status().as_u16(),
            content_length: declared_length(response.headers()),
            body: Box::new(response),
        })
    }
}
