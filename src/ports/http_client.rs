use async_trait::async_trait;
use axum::body::Body as AxumBody;
use hyper::{Request, Response};
use thiserror::Error;

/// Custom error type for forwarding client operations
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum HttpClientError {
    /// Error when connection to the upstream fails
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// Error when the outgoing request is invalid
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

/// Result type alias for HTTP client operations
pub type HttpClientResult<T> = Result<T, HttpClientError>;

/// HttpClient defines the port (interface) for forwarding requests to upstreams.
///
/// One client is shared by every reverse-proxy route, so implementations are
/// expected to pool connections internally.
#[async_trait]
pub trait HttpClient: Send + Sync + 'static {
    /// Send an already rewritten HTTP request to its upstream
    ///
    /// # Arguments
    /// * `req` - The request, whose URI is absolute and points at the upstream
    ///
    /// # Returns
    /// A future that resolves to the upstream's response (any status) or a
    /// transport error
    async fn send_request(&self, req: Request<AxumBody>) -> HttpClientResult<Response<AxumBody>>;
}
