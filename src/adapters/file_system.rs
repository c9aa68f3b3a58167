use std::path::Path;

use axum::body::Body as AxumBody;
use http_body_util::BodyExt;
use hyper::{Request, Response, StatusCode, Uri, header};
use tower::ServiceExt;
use tower_http::services::{ServeDir, ServeFile};

use crate::ports::file_system::{FileSystem, FileSystemError, FileSystemResult};

/// Static-file primitive backed by tower-http.
///
/// Files go through `ServeFile`, which handles content-type inference,
/// `If-Modified-Since` / `If-None-Match` and byte ranges. Directories are
/// served through their `index.html` with `ServeDir`; a directory request
/// without a trailing slash is redirected to the slash form first so relative
/// links inside the index resolve.
#[derive(Debug, Default, Clone)]
pub struct FileSystemAdapter;

impl FileSystemAdapter {
    pub fn new() -> Self {
        Self
    }

    /// Whether the request path, raw or percent-decoded, contains a `..` segment.
    fn has_dot_dot_segment(path: &str) -> bool {
        let is_dot_dot = |p: &str| p.split(['/', '\\']).any(|segment| segment == "..");
        is_dot_dot(path) || urlencoding::decode(path).is_ok_and(|decoded| is_dot_dot(&decoded))
    }

    fn plain_response(
        status: StatusCode,
        body: &'static str,
    ) -> FileSystemResult<Response<AxumBody>> {
        Response::builder()
            .status(status)
            .header(header::CONTENT_TYPE, "text/plain; charset=utf-8")
            .body(AxumBody::from(body))
            .map_err(|e| FileSystemError::InvalidPath(e.to_string()))
    }

    fn directory_redirect(uri: &Uri) -> FileSystemResult<Response<AxumBody>> {
        let location = match uri.query() {
            Some(query) => format!("{}/?{query}", uri.path()),
            None => format!("{}/", uri.path()),
        };

        Response::builder()
            .status(StatusCode::MOVED_PERMANENTLY)
            .header(header::LOCATION, location)
            .body(AxumBody::empty())
            .map_err(|e| FileSystemError::InvalidPath(e.to_string()))
    }
}

impl FileSystem for FileSystemAdapter {
    async fn serve_file(
        &self,
        path: &Path,
        req: Request<AxumBody>,
    ) -> FileSystemResult<Response<AxumBody>> {
        if Self::has_dot_dot_segment(req.uri().path()) {
            tracing::warn!("Rejecting static request with '..' segment: {}", req.uri());
            return Self::plain_response(StatusCode::BAD_REQUEST, "invalid URL path\n");
        }

        let is_dir = tokio::fs::metadata(path)
            .await
            .map(|metadata| metadata.is_dir())
            .unwrap_or(false);

        let response = if is_dir {
            if !req.uri().path().ends_with('/') {
                return Self::directory_redirect(req.uri());
            }

            let (mut parts, body) = req.into_parts();
            parts.uri = Uri::from_static("/");
            ServeDir::new(path)
                .append_index_html_on_directories(true)
                .oneshot(Request::from_parts(parts, body))
                .await
        } else {
            ServeFile::new(path).oneshot(req).await
        };

        // Both services are infallible; IO failures surface as status codes
        let response = match response {
            Ok(response) => response,
            Err(never) => match never {},
        };

        let (parts, tower_body) = response.into_parts();
        let axum_body = AxumBody::new(tower_body.map_err(|e| {
            tracing::error!("Error reading static file body: {}", e);
            axum::Error::new(e)
        }));

        Ok(Response::from_parts(parts, axum_body))
    }
}
