use axum::body::Body as AxumBody;
use eyre::{Result, WrapErr};
use hyper::{Response, StatusCode, header};

const NOT_FOUND_BODY: &str = "404 page not found\n";

/// Plain-text 404 shared by explicit not-found hosts and unregistered hosts.
pub fn not_found_response() -> Result<Response<AxumBody>> {
    Response::builder()
        .status(StatusCode::NOT_FOUND)
        .header(header::CONTENT_TYPE, "text/plain; charset=utf-8")
        .header(header::X_CONTENT_TYPE_OPTIONS, "nosniff")
        .body(AxumBody::from(NOT_FOUND_BODY))
        .wrap_err("Failed to build 404 response")
}
