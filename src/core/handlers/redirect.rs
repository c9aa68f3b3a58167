use axum::body::Body as AxumBody;
use eyre::{Result, WrapErr};
use hyper::{Response, StatusCode, Uri, header};

/// Permanent redirect to `destination_prefix` followed by the request URI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Redirect {
    destination_prefix: String,
}

impl Redirect {
    /// The prefix is kept verbatim; it is not checked as a URL.
    pub fn new(destination_prefix: impl Into<String>) -> Self {
        Self {
            destination_prefix: destination_prefix.into(),
        }
    }

    pub fn destination_prefix(&self) -> &str {
        &self.destination_prefix
    }

    /// Literal concatenation of the prefix and the request's path and query.
    pub fn location_for(&self, uri: &Uri) -> String {
        let request_uri = uri.path_and_query().map_or("/", |pq| pq.as_str());
        format!("{}{}", self.destination_prefix, request_uri)
    }

    pub fn respond(&self, uri: &Uri) -> Result<Response<AxumBody>> {
        let location = self.location_for(uri);
        tracing::info!("Redirecting to {}", location);

        Response::builder()
            .status(StatusCode::MOVED_PERMANENTLY)
            .header(header::LOCATION, &location)
            .body(AxumBody::empty())
            .wrap_err_with(|| format!("Failed to build redirect response to {location:?}"))
    }
}
