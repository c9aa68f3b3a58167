//! HTTP glue between axum and the [`Dispatcher`].
use std::{convert::Infallible, net::SocketAddr, sync::Arc};

use axum::{
    Router,
    body::Body,
    extract::{ConnectInfo, Request},
    http::StatusCode,
    response::Response,
};
use eyre::{Result, WrapErr};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use crate::{core::Dispatcher, ports::file_system::FileSystem, utils::GracefulShutdown};

/// Build a router sending every method and path to `dispatcher`.
pub fn router<F: FileSystem>(dispatcher: Dispatcher<F>) -> Router {
    let dispatcher = Arc::new(dispatcher);
    let handler = move |req: Request| {
        let dispatcher = dispatcher.clone();
        async move {
            let client_addr = req
                .extensions()
                .get::<ConnectInfo<SocketAddr>>()
                .map(|ConnectInfo(addr)| *addr);

            match dispatcher.dispatch(req, client_addr).await {
                Ok(response) => Ok::<Response<Body>, Infallible>(response),
                Err(e) => {
                    tracing::error!("Request handling error: {:?}", e);
                    let mut response = Response::new(Body::from("Internal Server Error"));
                    *response.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
                    Ok(response)
                }
            }
        }
    };

    Router::new()
        .fallback(handler)
        .layer(TraceLayer::new_for_http())
}

/// Serve `dispatcher` on `listener` until `shutdown` fires, then drain
/// in-flight connections.
pub async fn serve<F: FileSystem>(
    listener: TcpListener,
    dispatcher: Dispatcher<F>,
    shutdown: Arc<GracefulShutdown>,
) -> Result<()> {
    let local_addr = listener
        .local_addr()
        .wrap_err("Failed to get local addr")?;
    tracing::info!("zproxy listening on {}", local_addr);

    let app = router(dispatcher);
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async move {
        let reason = shutdown.wait_for_shutdown_signal().await;
        tracing::info!("Shutdown signal received: {:?}", reason);
    })
    .await
    .wrap_err("Server error")?;

    tracing::info!("Graceful shutdown completed");
    Ok(())
}
