use async_trait::async_trait;
use axum::body::Body as AxumBody;
use eyre::Result;
use hyper::{Request, Response, Version};
use hyper_rustls::HttpsConnector;
use hyper_util::{
    client::legacy::{Client, connect::HttpConnector},
    rt::TokioExecutor,
};
use rustls_native_certs::load_native_certs;
use tracing::Instrument;

use crate::ports::http_client::{HttpClient, HttpClientError, HttpClientResult};

/// Forwarding client using Hyper with Rustls, HTTP/1.1 only.
///
/// Responsibilities:
/// * Keeps one pooled connection set shared by every proxied host
/// * Speaks HTTP/1.1 to every upstream (ALPN offers only `http/1.1`), which
///   keeps `Upgrade` requests usable end to end
/// * Converts between Hyper body and Axum body types
///
/// The adapter does not touch request headers: the original `Host` header and
/// everything else the caller sent reach the upstream as-is. There are no
/// retries and no timeout beyond the connector defaults.
pub struct HttpClientAdapter {
    client: Client<HttpsConnector<HttpConnector>, AxumBody>,
}

impl HttpClientAdapter {
    /// Create a new forwarding client.
    pub fn new() -> Result<Self> {
        // Install default crypto provider for rustls if not already set
        let _ = rustls::crypto::aws_lc_rs::default_provider().install_default();

        let mut http_connector = HttpConnector::new();
        http_connector.enforce_http(false); // Allow HTTPS URLs

        let mut root_cert_store = rustls::RootCertStore::empty();
        let native_certs = load_native_certs();

        if !native_certs.certs.is_empty() {
            for cert in native_certs.certs {
                if root_cert_store.add(cert).is_err() {
                    tracing::warn!("Failed to add native certificate to rustls RootCertStore");
                }
            }
            tracing::debug!("Loaded {} native root certificates.", root_cert_store.len());
        }

        if !native_certs.errors.is_empty() {
            tracing::warn!(
                "Some native certificates failed to load: {:?}",
                native_certs.errors
            );
        }

        let tls_config = rustls::ClientConfig::builder()
            .with_root_certificates(root_cert_store)
            .with_no_client_auth();

        let https_connector = hyper_rustls::HttpsConnectorBuilder::new()
            .with_tls_config(tls_config)
            .https_or_http()
            .enable_http1()
            .wrap_connector(http_connector);

        let client = Client::builder(TokioExecutor::new()).build::<_, AxumBody>(https_connector);

        tracing::info!("Created forwarding client");
        Ok(Self { client })
    }
}

#[async_trait]
impl HttpClient for HttpClientAdapter {
    async fn send_request(&self, req: Request<AxumBody>) -> HttpClientResult<Response<AxumBody>> {
        let upstream = match (req.uri().scheme_str(), req.uri().authority()) {
            (Some(scheme), Some(authority)) => format!("{scheme}://{authority}"),
            _ => {
                tracing::error!("Outgoing URI is not absolute: {}", req.uri());
                return Err(HttpClientError::InvalidRequest(format!(
                    "outgoing URI is not absolute: {}",
                    req.uri()
                )));
            }
        };

        let span = tracing::info_span!(
            "upstream_request",
            upstream.url = %upstream,
            http.method = %req.method(),
            http.path = %req.uri().path(),
            http.status_code = tracing::field::Empty,
        );

        let (mut parts, axum_body) = req.into_parts();
        parts.version = Version::HTTP_11;

        tracing::debug!("Outgoing request headers: {:?}", parts.headers);

        let outgoing_request = Request::from_parts(parts, axum_body);
        let method_for_error_log = outgoing_request.method().clone();
        let uri_for_error_log = outgoing_request.uri().clone();

        match self
            .client
            .request(outgoing_request)
            .instrument(span.clone())
            .await
        {
            Ok(response) => {
                span.record("http.status_code", response.status().as_u16());

                let (parts, hyper_body) = response.into_parts();
                Ok(Response::from_parts(parts, AxumBody::new(hyper_body)))
            }
            Err(e) => {
                span.record("http.status_code", 599u16);

                Err(HttpClientError::ConnectionError(format!(
                    "Request to {method_for_error_log} {uri_for_error_log} failed: {e}"
                )))
            }
        }
    }
}
