use std::{net::SocketAddr, sync::Arc};

use axum::body::Body as AxumBody;
use eyre::Result;
use hyper::{Request, Response, header};
use tracing::Instrument;

use crate::{
    core::{
        handlers::{RouteEntry, not_found_response},
        routing_table::RoutingTable,
    },
    ports::file_system::FileSystem,
    tracing_setup::create_request_span,
};

/// Per-request entry point: one table lookup, one handler call.
pub struct Dispatcher<F> {
    table: Arc<RoutingTable>,
    file_system: Arc<F>,
}

impl<F: FileSystem> Dispatcher<F> {
    pub fn new(table: Arc<RoutingTable>, file_system: Arc<F>) -> Self {
        Self { table, file_system }
    }

    pub fn table(&self) -> &RoutingTable {
        &self.table
    }

    /// Route a request by its host. Unregistered hosts (and requests without
    /// any host) get the generic 404.
    pub async fn dispatch(
        &self,
        req: Request<AxumBody>,
        client_addr: Option<SocketAddr>,
    ) -> Result<Response<AxumBody>> {
        let host = request_host(&req).unwrap_or_default();
        let request_id = uuid::Uuid::new_v4().to_string();
        let span = create_request_span(req.method().as_str(), &host, req.uri().path(), &request_id);

        async {
            let response = match self.table.lookup(&host) {
                Some(RouteEntry::Redirect(redirect)) => redirect.respond(req.uri()),
                Some(RouteEntry::ReverseProxy(proxy)) => proxy.forward(req, client_addr).await,
                Some(RouteEntry::NotFound) => {
                    tracing::info!("Not found {}", req.uri());
                    not_found_response()
                }
                Some(RouteEntry::StaticSite(site)) => site.serve(&*self.file_system, req).await,
                None => {
                    tracing::info!("Host not found: {:?}", host);
                    not_found_response()
                }
            }?;

            tracing::Span::current().record("http.status_code", response.status().as_u16());
            Ok(response)
        }
        .instrument(span)
        .await
    }
}

impl<F> Clone for Dispatcher<F> {
    fn clone(&self) -> Self {
        Self {
            table: self.table.clone(),
            file_system: self.file_system.clone(),
        }
    }
}

/// The routing key: the `Host` header, or the URI authority when the header
/// is absent (HTTP/2). Returned as sent, without case or port normalization.
pub fn request_host<B>(req: &Request<B>) -> Option<String> {
    req.headers()
        .get(header::HOST)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
        .or_else(|| req.uri().authority().map(|a| a.as_str().to_string()))
}
