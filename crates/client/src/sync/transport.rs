// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Transport abstraction for HTTP communication with the orchestrator.
//!
//! Provides a trait-based transport layer that enables:
//! - Real HTTP(S) requests for production
//! - Mock transports for unit testing
//!
//! Every network call in the crate goes through [`Transport`], and every
//! outcome is judged by [`Delivery::classify`], so there is exactly one
//! definition of "the orchestrator has this scan".

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, CONTENT_TYPE};
use reqwest::Url;
use scan_core::protocol::{BATCH_PATH, HEALTH_PATH, SCAN_PATH, STATUS_DUPLICATE};

const USER_AGENT: &str = concat!("scansync/", env!("CARGO_PKG_VERSION"));

/// Error type for transport operations.
#[derive(Debug, Clone, thiserror::Error)]
pub enum TransportError {
    /// No complete response within the timeout.
    #[error("request timed out")]
    Timeout,

    /// Connection refused, DNS failure or TLS handshake failure.
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// Any other failure while sending or reading the response.
    #[error("request failed: {0}")]
    Request(String),

    /// The orchestrator URL could not be parsed.
    #[error("invalid URL '{0}'")]
    InvalidUrl(String),
}

/// Result type for transport operations.
pub type TransportResult<T> = Result<T, TransportError>;

/// Boxed future returned by [`Transport`] methods.
pub type TransportFuture<'a> =
    Pin<Box<dyn Future<Output = TransportResult<HttpResponse>> + Send + 'a>>;

/// Status code and body of a completed request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub code: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn new(code: u16, body: impl Into<String>) -> Self {
        HttpResponse {
            code,
            body: body.into(),
        }
    }

    /// True for 2xx.
    pub fn success(&self) -> bool {
        (200..300).contains(&self.code)
    }
}

/// Transport trait for request/response communication.
///
/// This trait abstracts over the actual HTTP client, allowing for easy
/// testing with mock implementations. Implementations must enforce the
/// timeout themselves: it is the only cancellation an in-flight call has.
pub trait Transport: Send + Sync {
    /// Send a GET request.
    fn get(&self, url: &str, timeout: Duration) -> TransportFuture<'_>;

    /// Send a POST request with a JSON body.
    fn post(&self, url: &str, body: String, timeout: Duration) -> TransportFuture<'_>;
}

/// How the orchestrator answered a delivery attempt.
#[derive(Debug, Clone)]
pub enum Delivery {
    /// 2xx, or 409 for a scan the orchestrator already has.
    Acknowledged { code: u16 },
    /// Any other non-5xx status. The scans stay queued.
    Rejected { code: u16, body: String },
    /// 5xx. The scans stay queued.
    ServerError { code: u16 },
    /// No response at all.
    NetworkError(TransportError),
}

impl Delivery {
    pub fn classify(result: TransportResult<HttpResponse>) -> Self {
        match result {
            Ok(resp) if resp.success() || resp.code == STATUS_DUPLICATE => {
                Delivery::Acknowledged { code: resp.code }
            }
            Ok(resp) if resp.code >= 500 => Delivery::ServerError { code: resp.code },
            Ok(resp) => Delivery::Rejected {
                code: resp.code,
                body: resp.body,
            },
            Err(e) => Delivery::NetworkError(e),
        }
    }

    pub fn is_acknowledged(&self) -> bool {
        matches!(self, Delivery::Acknowledged { .. })
    }

    /// True when the failure says something about reachability.
    ///
    /// Rejections are application errors: the service answered.
    pub fn is_unreachable(&self) -> bool {
        matches!(self, Delivery::ServerError { .. } | Delivery::NetworkError(_))
    }
}

impl std::fmt::Display for Delivery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Delivery::Acknowledged { code } => write!(f, "acknowledged ({code})"),
            Delivery::Rejected { code, .. } => write!(f, "rejected ({code})"),
            Delivery::ServerError { code } => write!(f, "server error ({code})"),
            Delivery::NetworkError(e) => write!(f, "{e}"),
        }
    }
}

/// Fully-resolved orchestrator URLs for one device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    health: String,
    scan: String,
    batch: String,
}

impl Endpoints {
    /// Resolve endpoint URLs against `base`, ignoring trailing slashes.
    pub fn new(base: &str, device_id: &str) -> TransportResult<Self> {
        let base = base.trim_end_matches('/');
        let mut health = Url::parse(&format!("{base}{HEALTH_PATH}"))
            .map_err(|_| TransportError::InvalidUrl(base.to_string()))?;
        health.query_pairs_mut().append_pair("deviceId", device_id);

        Ok(Endpoints {
            health: health.into(),
            scan: format!("{base}{SCAN_PATH}"),
            batch: format!("{base}{BATCH_PATH}"),
        })
    }

    /// `GET /health?deviceId=<id>`
    pub fn health(&self) -> &str {
        &self.health
    }

    /// `POST /api/scan`
    pub fn scan(&self) -> &str {
        &self.scan
    }

    /// `POST /api/scan/batch`
    pub fn batch(&self) -> &str {
        &self.batch
    }
}

/// HTTP(S) transport built on reqwest.
///
/// Holds one connection pool and one set of default headers for every
/// call site.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    /// Create a transport. `accept_invalid_certs` disables certificate
    /// validation for orchestrators with self-signed certificates.
    pub fn new(accept_invalid_certs: bool) -> TransportResult<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        if accept_invalid_certs {
            tracing::warn!("TLS certificate validation disabled");
        }

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .user_agent(USER_AGENT)
            .danger_accept_invalid_certs(accept_invalid_certs)
            .build()
            .map_err(|e| TransportError::Request(e.to_string()))?;

        Ok(HttpTransport { client })
    }

    fn send(&self, request: reqwest::RequestBuilder, timeout: Duration) -> TransportFuture<'_> {
        Box::pin(async move {
            let response = request.timeout(timeout).send().await.map_err(map_error)?;
            let code = response.status().as_u16();
            let body = response.text().await.map_err(map_error)?;
            Ok(HttpResponse { code, body })
        })
    }
}

impl Transport for HttpTransport {
    fn get(&self, url: &str, timeout: Duration) -> TransportFuture<'_> {
        tracing::trace!(url, "GET");
        self.send(self.client.get(url), timeout)
    }

    fn post(&self, url: &str, body: String, timeout: Duration) -> TransportFuture<'_> {
        tracing::trace!(url, bytes = body.len(), "POST");
        self.send(self.client.post(url).body(body), timeout)
    }
}

fn map_error(e: reqwest::Error) -> TransportError {
    if e.is_timeout() {
        TransportError::Timeout
    } else if e.is_connect() {
        TransportError::ConnectionFailed(e.to_string())
    } else if e.is_builder() {
        TransportError::InvalidUrl(e.url().map(|u| u.to_string()).unwrap_or_default())
    } else {
        TransportError::Request(e.to_string())
    }
}
