use std::path::PathBuf;

use axum::body::Body as AxumBody;
use eyre::{Result, WrapErr};
use hyper::{Request, Response};

use crate::ports::file_system::FileSystem;

/// Serves files found under `root_directory`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticSite {
    root_directory: String,
}

impl StaticSite {
    /// The directory is kept verbatim and not checked for existence.
    pub fn new(root_directory: impl Into<String>) -> Self {
        Self {
            root_directory: root_directory.into(),
        }
    }

    pub fn root_directory(&self) -> &str {
        &self.root_directory
    }

    /// File system path for a request path: the percent-decoded path without
    /// its leading `/`, appended to the root as a plain string. A root without
    /// a trailing separator is therefore joined without one.
    pub fn resolve(&self, request_path: &str) -> PathBuf {
        let decoded = urlencoding::decode(request_path)
            .map(|decoded| decoded.into_owned())
            .unwrap_or_else(|_| request_path.to_string());
        let relative = decoded.strip_prefix('/').unwrap_or(&decoded);

        PathBuf::from(format!("{}{}", self.root_directory, relative))
    }

    /// Hand the resolved path to the static-file primitive. Traversal checks,
    /// index files, ranges and conditional requests all live there.
    pub async fn serve<F: FileSystem>(
        &self,
        file_system: &F,
        req: Request<AxumBody>,
    ) -> Result<Response<AxumBody>> {
        let path = self.resolve(req.uri().path());
        tracing::info!("Serving {}", path.display());

        file_system
            .serve_file(&path, req)
            .await
            .wrap_err_with(|| format!("Failed to serve static file {}", path.display()))
    }
}
