//! The four per-host behaviors.
//!
//! A host resolves to exactly one [`RouteEntry`]. The variant set is closed, so
//! dispatch is a single `match` in [`crate::core::Dispatcher`] rather than a
//! trait object call.
pub mod not_found;
pub mod redirect;
pub mod reverse_proxy;
pub mod static_site;

use std::fmt;

pub use not_found::not_found_response;
pub use redirect::Redirect;
pub use reverse_proxy::{ReverseProxy, UpstreamUrlError};
pub use static_site::StaticSite;

/// Discriminant of a [`RouteEntry`], ordered by dispatch precedence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RouteKind {
    Redirect,
    ReverseProxy,
    NotFound,
    StaticSite,
}

impl RouteKind {
    /// Lookup order used when a host is registered under more than one kind.
    pub const PRECEDENCE: [RouteKind; 4] = [
        RouteKind::Redirect,
        RouteKind::ReverseProxy,
        RouteKind::NotFound,
        RouteKind::StaticSite,
    ];

    pub(crate) fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for RouteKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RouteKind::Redirect => write!(f, "redirect"),
            RouteKind::ReverseProxy => write!(f, "reverse_proxy"),
            RouteKind::NotFound => write!(f, "not_found"),
            RouteKind::StaticSite => write!(f, "static_site"),
        }
    }
}

/// Handler registered for a host.
#[derive(Debug, Clone)]
pub enum RouteEntry {
    Redirect(Redirect),
    StaticSite(StaticSite),
    ReverseProxy(ReverseProxy),
    /// Explicit, host-specific not-found.
    NotFound,
}

impl RouteEntry {
    pub fn kind(&self) -> RouteKind {
        match self {
            RouteEntry::Redirect(_) => RouteKind::Redirect,
            RouteEntry::StaticSite(_) => RouteKind::StaticSite,
            RouteEntry::ReverseProxy(_) => RouteKind::ReverseProxy,
            RouteEntry::NotFound => RouteKind::NotFound,
        }
    }
}
