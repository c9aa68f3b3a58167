pub mod file_system;
pub mod http_client;

pub use file_system::FileSystemAdapter;
pub use http_client::HttpClientAdapter;
