//! zproxy - a virtual-host request router.
//!
//! Every incoming request is routed by its `Host` header alone to one of four
//! handlers:
//! - **Redirect**: `301` to a destination prefix followed by the request URI
//! - **ReverseProxy**: forward to an upstream base URL and relay the answer
//! - **NotFound**: a plain `404`
//! - **StaticSite**: serve files from a root directory
//!
//! # Architecture
//! The crate keeps a **hexagonal** layout: `ports` holds the traits for the
//! outbound HTTP client and the static-file primitive, `adapters` their
//! hyper / tower-http implementations, and `core` the routing table, the
//! handlers and the dispatcher.
//!
//! The routing table has two phases. Sites are registered on a
//! [`RoutingTableBuilder`] during startup; [`RoutingTableBuilder::build`]
//! freezes it into a [`RoutingTable`] that the [`Dispatcher`] shares across
//! all requests without locking.
//!
//! # Quick Example
//! ```no_run
//! use std::sync::Arc;
//!
//! use zproxy::{Dispatcher, FileSystemAdapter, HttpClientAdapter, RoutingTableBuilder};
//!
//! # #[tokio::main] async fn main() -> eyre::Result<()> {
//! let mut builder = RoutingTableBuilder::new(Arc::new(HttpClientAdapter::new()?));
//! builder.register_redirect("old.example.com", "https://new.example.com")?;
//! builder.register_static_site("www.example.com", "/srv/www/")?;
//!
//! let dispatcher = Dispatcher::new(Arc::new(builder.build()), Arc::new(FileSystemAdapter::new()));
//! let listener = tokio::net::TcpListener::bind("127.0.0.1:8080").await?;
//! zproxy::server::serve(listener, dispatcher, Arc::new(zproxy::GracefulShutdown::new())).await?;
//! # Ok(()) }
//! ```
//!
//! # Error Handling
//! Registration and site-file problems are typed errors
//! ([`RegistrationError`], [`config::ValidationError`]) and are fatal at
//! startup. Request-time plumbing returns `eyre::Result`.
pub mod config;
pub mod ports;
pub mod server;
pub mod tracing_setup;
pub mod utils;

pub mod adapters;
pub mod core;

pub use crate::{
    adapters::{FileSystemAdapter, HttpClientAdapter},
    core::{Dispatcher, RegistrationError, RouteEntry, RouteKind, RoutingTable, RoutingTableBuilder},
    ports::http_client::HttpClient,
    utils::GracefulShutdown,
};
