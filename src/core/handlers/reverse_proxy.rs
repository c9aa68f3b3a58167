use std::{fmt, net::SocketAddr, sync::Arc};

use axum::body::Body as AxumBody;
use eyre::{Result, WrapErr};
use hyper::{
    HeaderMap, Request, Response, StatusCode, Uri,
    header::{self, HeaderValue},
};
use hyper_util::rt::TokioIo;
use thiserror::Error;
use tracing::Instrument;
use url::{Position, Url};

use crate::ports::http_client::HttpClient;

/// Headers that describe one connection and never travel through a proxy.
const HOP_BY_HOP_HEADERS: &[&str] = &[
    "connection",
    "keep-alive",
    "proxy-connection",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

const X_FORWARDED_FOR: &str = "x-forwarded-for";

/// Why an upstream base URL was rejected at registration time.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum UpstreamUrlError {
    #[error("upstream URL {0:?} contains a control character")]
    ControlCharacter(String),

    #[error("upstream URL {url:?} could not be parsed: {source}")]
    Parse {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("upstream URL {0:?} must use http or https")]
    UnsupportedScheme(String),

    #[error("upstream URL {0:?} has no host")]
    MissingHost(String),
}

/// Forwards every request to a single upstream.
#[derive(Clone)]
pub struct ReverseProxy {
    upstream: Url,
    client: Arc<dyn HttpClient>,
}

impl ReverseProxy {
    /// Parse `upstream_base_url` and bind it to the shared forwarding client.
    pub fn new(
        upstream_base_url: &str,
        client: Arc<dyn HttpClient>,
    ) -> Result<Self, UpstreamUrlError> {
        // The WHATWG parser silently strips tabs and newlines, so reject them up front
        if upstream_base_url.chars().any(|c| c.is_ascii_control()) {
            return Err(UpstreamUrlError::ControlCharacter(
                upstream_base_url.to_string(),
            ));
        }

        let upstream = Url::parse(upstream_base_url).map_err(|source| UpstreamUrlError::Parse {
            url: upstream_base_url.to_string(),
            source,
        })?;

        if !matches!(upstream.scheme(), "http" | "https") {
            return Err(UpstreamUrlError::UnsupportedScheme(
                upstream_base_url.to_string(),
            ));
        }
        if upstream.host_str().is_none_or(str::is_empty) {
            return Err(UpstreamUrlError::MissingHost(upstream_base_url.to_string()));
        }

        Ok(Self { upstream, client })
    }

    pub fn upstream(&self) -> &Url {
        &self.upstream
    }

    /// Rewrite an inbound URI onto the upstream: scheme and authority are
    /// replaced, paths are joined with exactly one slash and queries with `&`.
    pub fn target_uri(&self, original: &Uri) -> Result<Uri> {
        let mut target = self.upstream[..Position::BeforePath].to_string();
        target.push_str(&join_paths(self.upstream.path(), original.path()));

        let upstream_query = self.upstream.query().filter(|q| !q.is_empty());
        let request_query = original.query().filter(|q| !q.is_empty());
        match (upstream_query, request_query) {
            (Some(a), Some(b)) => {
                target.push('?');
                target.push_str(a);
                target.push('&');
                target.push_str(b);
            }
            (Some(q), None) | (None, Some(q)) => {
                target.push('?');
                target.push_str(q);
            }
            (None, None) => {}
        }

        target
            .parse()
            .wrap_err_with(|| format!("Failed to build upstream URI from {target:?}"))
    }

    /// Forward the request and stream the upstream response back. A transport
    /// failure becomes an empty `502 Bad Gateway`; nothing is retried.
    ///
    /// A protocol upgrade (`Connection: upgrade` plus `Upgrade`) is passed
    /// through: when the upstream answers `101` with the same protocol, both
    /// upgraded connections are spliced together in a background task.
    pub async fn forward(
        &self,
        mut req: Request<AxumBody>,
        client_addr: Option<SocketAddr>,
    ) -> Result<Response<AxumBody>> {
        let requested_protocol = upgrade_protocol(req.headers());
        let client_upgrade = requested_protocol
            .is_some()
            .then(|| hyper::upgrade::on(&mut req));

        let (mut parts, body) = req.into_parts();
        let target = self.target_uri(&parts.uri)?;
        tracing::info!("Proxying to {}", target);

        // HTTP/2 clients send :authority instead of Host; keep it for the upstream
        if !parts.headers.contains_key(header::HOST) {
            if let Some(authority) = parts.uri.authority() {
                let value = HeaderValue::from_str(authority.as_str())
                    .wrap_err("Failed to copy request authority into Host header")?;
                parts.headers.insert(header::HOST, value);
            }
        }

        parts.uri = target;
        remove_hop_by_hop_headers(&mut parts.headers);
        if let Some(protocol) = &requested_protocol {
            restore_upgrade_headers(&mut parts.headers, protocol.clone());
        }
        append_forwarded_for(&mut parts.headers, client_addr)?;

        let mut response = match self
            .client
            .send_request(Request::from_parts(parts, body))
            .await
        {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!("Upstream {} failed: {}", self.upstream, e);
                return bad_gateway();
            }
        };

        if response.status() != StatusCode::SWITCHING_PROTOCOLS {
            remove_hop_by_hop_headers(response.headers_mut());
            return Ok(response);
        }

        let offered_protocol = response.headers().get(header::UPGRADE).cloned();
        let (Some(requested), Some(offered), Some(client_upgrade)) =
            (requested_protocol, offered_protocol, client_upgrade)
        else {
            tracing::warn!(
                "Upstream {} switched protocols without a matching upgrade request",
                self.upstream
            );
            return bad_gateway();
        };
        if !requested.as_bytes().eq_ignore_ascii_case(offered.as_bytes()) {
            tracing::warn!(
                "Upstream {} switched to {:?} when {:?} was requested",
                self.upstream,
                offered,
                requested
            );
            return bad_gateway();
        }

        let upstream_upgrade = hyper::upgrade::on(&mut response);
        tokio::spawn(tunnel(client_upgrade, upstream_upgrade).in_current_span());

        remove_hop_by_hop_headers(response.headers_mut());
        restore_upgrade_headers(response.headers_mut(), offered);
        Ok(response)
    }
}

fn bad_gateway() -> Result<Response<AxumBody>> {
    Response::builder()
        .status(StatusCode::BAD_GATEWAY)
        .body(AxumBody::empty())
        .wrap_err("Failed to build bad gateway response")
}

/// Copy bytes both ways between the client and upstream connections once
/// both sides have switched protocols.
async fn tunnel(client: hyper::upgrade::OnUpgrade, upstream: hyper::upgrade::OnUpgrade) {
    let (client, upstream) = match tokio::try_join!(client, upstream) {
        Ok(upgraded) => upgraded,
        Err(e) => {
            tracing::warn!("Protocol upgrade failed: {}", e);
            return;
        }
    };

    let mut client = TokioIo::new(client);
    let mut upstream = TokioIo::new(upstream);
    match tokio::io::copy_bidirectional(&mut client, &mut upstream).await {
        Ok((sent, received)) => tracing::debug!(
            "Upgraded connection closed ({} bytes up, {} bytes down)",
            sent,
            received
        ),
        Err(e) => tracing::debug!("Upgraded connection ended: {}", e),
    }
}

impl fmt::Debug for ReverseProxy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReverseProxy")
            .field("upstream", &self.upstream.as_str())
            .finish_non_exhaustive()
    }
}

fn join_paths(base: &str, path: &str) -> String {
    match (base.ends_with('/'), path.starts_with('/')) {
        (true, true) => format!("{base}{}", &path[1..]),
        (false, false) => format!("{base}/{path}"),
        _ => format!("{base}{path}"),
    }
}

fn remove_hop_by_hop_headers(headers: &mut HeaderMap) {
    let named_by_connection: Vec<String> = headers
        .get_all(header::CONNECTION)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(','))
        .map(|name| name.trim().to_ascii_lowercase())
        .filter(|name| !name.is_empty())
        .collect();

    for name in &named_by_connection {
        headers.remove(name.as_str());
    }
    for name in HOP_BY_HOP_HEADERS {
        headers.remove(*name);
    }
}

/// The `Upgrade` value when `Connection` carries the `upgrade` token.
fn upgrade_protocol(headers: &HeaderMap) -> Option<HeaderValue> {
    let wants_upgrade = headers
        .get_all(header::CONNECTION)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(','))
        .any(|token| token.trim().eq_ignore_ascii_case("upgrade"));

    if wants_upgrade {
        headers.get(header::UPGRADE).cloned()
    } else {
        None
    }
}

fn restore_upgrade_headers(headers: &mut HeaderMap, protocol: HeaderValue) {
    headers.insert(header::CONNECTION, HeaderValue::from_static("upgrade"));
    headers.insert(header::UPGRADE, protocol);
}

fn append_forwarded_for(headers: &mut HeaderMap, client_addr: Option<SocketAddr>) -> Result<()> {
    let Some(client_addr) = client_addr else {
        return Ok(());
    };

    let prior: Vec<&str> = headers
        .get_all(X_FORWARDED_FOR)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .collect();
    let client_ip = client_addr.ip().to_string();
    let value = if prior.is_empty() {
        client_ip
    } else {
        format!("{}, {client_ip}", prior.join(", "))
    };

    headers.insert(
        X_FORWARDED_FOR,
        HeaderValue::from_str(&value).wrap_err("Failed to build X-Forwarded-For header")?,
    );
    Ok(())
}
