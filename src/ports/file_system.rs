use std::path::Path;

use axum::body::Body as AxumBody;
use hyper::{Request, Response};
use thiserror::Error;

/// Error type for file system operations
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum FileSystemError {
    /// Error when encountering an IO issue
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Error when path is invalid
    #[error("Invalid path: {0}")]
    InvalidPath(String),
}

/// Result type for file system operations
pub type FileSystemResult<T> = Result<T, FileSystemError>;

/// FileSystem defines the port (interface) for the static-file primitive
pub trait FileSystem: Send + Sync + 'static {
    /// Serve the file (or directory index) at an already resolved path
    ///
    /// # Arguments
    /// * `path` - The file system path computed by the static site route
    /// * `req` - The original HTTP request (conditional and range headers)
    ///
    /// # Returns
    /// A future that resolves to the file response or an error. A missing
    /// file is a `404` response, not an error.
    fn serve_file(
        &self,
        path: &Path,
        req: Request<AxumBody>,
    ) -> impl std::future::Future<Output = FileSystemResult<Response<AxumBody>>> + Send;
}
