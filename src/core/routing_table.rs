//! Host → handler table.
//!
//! The table has two lifecycle types:
//! * [`RoutingTableBuilder`] owns the only mutating API (`register_*`) and is
//!   used during startup, before any listener exists.
//! * [`RoutingTable`] is the frozen result of [`RoutingTableBuilder::build`].
//!   It has no mutating methods, so once it is wrapped in an `Arc` and handed
//!   to the dispatcher every request reads it without synchronization.
//!
//! Each handler kind has its own host map. Registering a host twice under the
//! same kind replaces the earlier entry; registering it under two kinds keeps
//! both and [`RoutingTable::lookup`] picks one by [`RouteKind::PRECEDENCE`].
use std::{collections::HashMap, sync::Arc};

use thiserror::Error;

use crate::{
    config::models::{SiteConfig, SiteRoute},
    core::handlers::{Redirect, ReverseProxy, RouteEntry, RouteKind, StaticSite, UpstreamUrlError},
    ports::http_client::HttpClient,
};

/// Fatal error raised while registering a host.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum RegistrationError {
    #[error("host must not be empty")]
    EmptyHost,

    #[error("invalid reverse proxy for host '{host}': {source}")]
    InvalidUpstream {
        host: String,
        #[source]
        source: UpstreamUrlError,
    },
}

type HostMaps = [HashMap<String, RouteEntry>; 4];

/// Mutable registration phase of the routing table.
pub struct RoutingTableBuilder {
    maps: HostMaps,
    http_client: Arc<dyn HttpClient>,
}

impl RoutingTableBuilder {
    /// `http_client` is shared by every reverse proxy registered through this builder.
    pub fn new(http_client: Arc<dyn HttpClient>) -> Self {
        Self {
            maps: Default::default(),
            http_client,
        }
    }

    pub fn register_not_found(&mut self, host: &str) -> Result<(), RegistrationError> {
        tracing::info!("Adding host to not found: {}", host);
        self.insert(host, RouteEntry::NotFound)
    }

    pub fn register_redirect(
        &mut self,
        host: &str,
        destination_prefix: &str,
    ) -> Result<(), RegistrationError> {
        tracing::info!("Adding redirect: {} -> {}", host, destination_prefix);
        self.insert(host, RouteEntry::Redirect(Redirect::new(destination_prefix)))
    }

    /// Fails if `upstream_base_url` is not a usable absolute http(s) URL. The
    /// caller is expected to abort startup on that error.
    pub fn register_reverse_proxy(
        &mut self,
        host: &str,
        upstream_base_url: &str,
    ) -> Result<(), RegistrationError> {
        tracing::info!("Adding reverse proxy: {} -> {}", host, upstream_base_url);
        let proxy =
            ReverseProxy::new(upstream_base_url, self.http_client.clone()).map_err(|source| {
                RegistrationError::InvalidUpstream {
                    host: host.to_string(),
                    source,
                }
            })?;
        self.insert(host, RouteEntry::ReverseProxy(proxy))
    }

    pub fn register_static_site(
        &mut self,
        host: &str,
        root_directory: &str,
    ) -> Result<(), RegistrationError> {
        tracing::info!("Adding static site: {} -> {}", host, root_directory);
        self.insert(host, RouteEntry::StaticSite(StaticSite::new(root_directory)))
    }

    /// Register one loaded site file.
    pub fn register_site(&mut self, site: &SiteConfig) -> Result<(), RegistrationError> {
        match &site.route {
            SiteRoute::NotFound => self.register_not_found(&site.host),
            SiteRoute::Redirect { to } => self.register_redirect(&site.host, to),
            SiteRoute::Proxy { to } => self.register_reverse_proxy(&site.host, to),
            SiteRoute::Static { dir } => self.register_static_site(&site.host, dir),
        }
    }

    fn insert(&mut self, host: &str, entry: RouteEntry) -> Result<(), RegistrationError> {
        if host.is_empty() {
            return Err(RegistrationError::EmptyHost);
        }

        let kind = entry.kind();
        if self.maps[kind.index()]
            .insert(host.to_string(), entry)
            .is_some()
        {
            tracing::warn!("Host '{}' registered twice as {}; keeping the last", host, kind);
        }
        Ok(())
    }

    /// Freeze the table. Hosts registered under more than one kind are
    /// reported here; they are served by the highest-precedence kind.
    pub fn build(self) -> RoutingTable {
        let table = RoutingTable { maps: self.maps };

        for (host, kinds) in table.overlapping_hosts() {
            let kinds: Vec<String> = kinds.iter().map(ToString::to_string).collect();
            tracing::warn!(
                "Host '{}' is registered as {}; only {} will be used",
                host,
                kinds.join(", "),
                kinds[0]
            );
        }

        tracing::info!("Routing table built with {} hosts", table.len());
        table
    }
}

/// Frozen host → handler mapping.
#[derive(Debug, Default)]
pub struct RoutingTable {
    maps: HostMaps,
}

impl RoutingTable {
    /// Exact, case-sensitive host lookup following [`RouteKind::PRECEDENCE`].
    pub fn lookup(&self, host: &str) -> Option<&RouteEntry> {
        RouteKind::PRECEDENCE
            .iter()
            .find_map(|kind| self.maps[kind.index()].get(host))
    }

    /// Number of distinct hosts.
    pub fn len(&self) -> usize {
        self.hosts().len()
    }

    pub fn is_empty(&self) -> bool {
        self.maps.iter().all(HashMap::is_empty)
    }

    /// Distinct registered hosts, sorted.
    pub fn hosts(&self) -> Vec<&str> {
        let mut hosts: Vec<&str> = self
            .maps
            .iter()
            .flat_map(|map| map.keys().map(String::as_str))
            .collect();
        hosts.sort_unstable();
        hosts.dedup();
        hosts
    }

    /// Hosts present in more than one kind map, with their kinds in precedence order.
    pub fn overlapping_hosts(&self) -> Vec<(&str, Vec<RouteKind>)> {
        self.hosts()
            .into_iter()
            .filter_map(|host| {
                let kinds: Vec<RouteKind> = RouteKind::PRECEDENCE
                    .into_iter()
                    .filter(|kind| self.maps[kind.index()].contains_key(host))
                    .collect();
                (kinds.len() > 1).then_some((host, kinds))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use axum::body::Body as AxumBody;
    use hyper::{Request, Response};

    use super::*;
    use crate::ports::http_client::{HttpClientError, HttpClientResult};

    struct UnusedClient;

    #[async_trait]
    impl HttpClient for UnusedClient {
        async fn send_request(
            &self,
            _req: Request<AxumBody>,
        ) -> HttpClientResult<Response<AxumBody>> {
            Err(HttpClientError::ConnectionError("not used".to_string()))
        }
    }

    fn builder() -> RoutingTableBuilder {
        RoutingTableBuilder::new(Arc::new(UnusedClient))
    }

    #[test]
    fn test_each_kind_is_found() {
        let mut builder = builder();
        builder.register_not_found("gone.example.com").unwrap();
        builder
            .register_redirect("old.example.com", "https://new.example.com")
            .unwrap();
        builder
            .register_reverse_proxy("api.example.com", "http://127.0.0.1:9000")
            .unwrap();
        builder
            .register_static_site("www.example.com", "/srv/www/")
            .unwrap();
        let table = builder.build();

        assert_eq!(table.len(), 4);
        assert_eq!(
            table.lookup("gone.example.com").map(RouteEntry::kind),
            Some(RouteKind::NotFound)
        );
        assert_eq!(
            table.lookup("old.example.com").map(RouteEntry::kind),
            Some(RouteKind::Redirect)
        );
        assert_eq!(
            table.lookup("api.example.com").map(RouteEntry::kind),
            Some(RouteKind::ReverseProxy)
        );
        assert_eq!(
            table.lookup("www.example.com").map(RouteEntry::kind),
            Some(RouteKind::StaticSite)
        );
        assert!(table.lookup("unknown.example.com").is_none());
    }

    #[test]
    fn test_lookup_is_exact_and_case_sensitive() {
        let mut builder = builder();
        builder.register_not_found("example.com:8080").unwrap();
        let table = builder.build();

        assert!(table.lookup("example.com:8080").is_some());
        assert!(table.lookup("example.com").is_none());
        assert!(table.lookup("Example.com:8080").is_none());
    }

    #[test]
    fn test_last_registration_wins_within_kind() {
        let mut builder = builder();
        builder
            .register_redirect("old.example.com", "https://first.example.com")
            .unwrap();
        builder
            .register_redirect("old.example.com", "https://second.example.com")
            .unwrap();
        let table = builder.build();

        match table.lookup("old.example.com") {
            Some(RouteEntry::Redirect(redirect)) => {
                assert_eq!(redirect.destination_prefix(), "https://second.example.com")
            }
            other => panic!("Expected redirect, got {other:?}"),
        }
        assert!(table.overlapping_hosts().is_empty());
    }

    #[test]
    fn test_precedence_across_kinds() {
        let mut builder = builder();
        // Registered in reverse precedence order on purpose
        builder.register_static_site("a.example.com", "/srv/a/").unwrap();
        builder.register_not_found("a.example.com").unwrap();
        builder
            .register_reverse_proxy("a.example.com", "http://127.0.0.1:9000")
            .unwrap();
        builder
            .register_redirect("a.example.com", "https://b.example.com")
            .unwrap();

        builder.register_static_site("c.example.com", "/srv/c/").unwrap();
        builder.register_not_found("c.example.com").unwrap();

        builder.register_static_site("d.example.com", "/srv/d/").unwrap();
        builder
            .register_reverse_proxy("d.example.com", "http://127.0.0.1:9001")
            .unwrap();
        let table = builder.build();

        assert_eq!(
            table.lookup("a.example.com").map(RouteEntry::kind),
            Some(RouteKind::Redirect)
        );
        assert_eq!(
            table.lookup("c.example.com").map(RouteEntry::kind),
            Some(RouteKind::NotFound)
        );
        assert_eq!(
            table.lookup("d.example.com").map(RouteEntry::kind),
            Some(RouteKind::ReverseProxy)
        );

        let overlaps = table.overlapping_hosts();
        assert_eq!(overlaps.len(), 3);
        assert_eq!(overlaps[0].0, "a.example.com");
        assert_eq!(overlaps[0].1, RouteKind::PRECEDENCE.to_vec());
        assert_eq!(
            overlaps[1],
            ("c.example.com", vec![RouteKind::NotFound, RouteKind::StaticSite])
        );
        assert_eq!(table.len(), 3);
    }

    #[test]
    fn test_empty_host_is_rejected() {
        let mut builder = builder();
        assert_eq!(
            builder.register_not_found(""),
            Err(RegistrationError::EmptyHost)
        );
        assert_eq!(
            builder.register_static_site("", "/srv/www/"),
            Err(RegistrationError::EmptyHost)
        );
        assert!(builder.build().is_empty());
    }

    #[test]
    fn test_malformed_upstream_is_fatal() {
        let mut builder = builder();
        let result = builder.register_reverse_proxy("api.example.com", "http://127.0.0.1:9000\x01");

        match result {
            Err(RegistrationError::InvalidUpstream { host, source }) => {
                assert_eq!(host, "api.example.com");
                assert!(matches!(source, UpstreamUrlError::ControlCharacter(_)));
            }
            other => panic!("Expected InvalidUpstream, got {other:?}"),
        }
        assert!(builder.build().lookup("api.example.com").is_none());
    }

    #[test]
    fn test_register_site() {
        let mut builder = builder();
        let site = SiteConfig {
            host: "www.example.com".to_string(),
            route: SiteRoute::Static {
                dir: "/srv/www/".to_string(),
            },
            source: None,
        };
        builder.register_site(&site).unwrap();
        let table = builder.build();

        match table.lookup("www.example.com") {
            Some(RouteEntry::StaticSite(site)) => assert_eq!(site.root_directory(), "/srv/www/"),
            other => panic!("Expected static site, got {other:?}"),
        }
    }
}
