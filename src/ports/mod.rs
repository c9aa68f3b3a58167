pub mod file_system;
pub mod http_client;

pub use file_system::{FileSystem, FileSystemError, FileSystemResult};
pub use http_client::{HttpClient, HttpClientError, HttpClientResult};
