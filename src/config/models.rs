//! Configuration data structures for zproxy.
//!
//! Two kinds of configuration exist:
//! * [`ServerConfig`]: process settings (listen address, site directory, logging),
//!   filled from command line arguments and environment variables.
//! * [`SiteConfig`]: one per file in the site directory, describing how a single
//!   host is served. Files are read into the raw [`SiteFields`] first and turned
//!   into a `SiteConfig` by [`crate::config::SiteValidator`].
use std::path::PathBuf;

use serde::Deserialize;

/// Default directory scanned for site files.
pub const DEFAULT_CONFIG_DIR: &str = "/etc/zproxy.d";

/// Default listen address.
pub const DEFAULT_LISTEN_ADDR: &str = "localhost:80";

/// Output format of the log subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum LogFormat {
    Json,
    Pretty,
}

/// Process-level settings.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address handed to the TCP listener, `host:port`
    pub listen_addr: String,
    /// Directory holding one site file per host
    pub config_dir: PathBuf,
    pub log_format: LogFormat,
    /// `EnvFilter` directive, e.g. `info` or `zproxy=debug`
    pub log_level: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: DEFAULT_LISTEN_ADDR.to_string(),
            config_dir: PathBuf::from(DEFAULT_CONFIG_DIR),
            log_format: LogFormat::Json,
            log_level: "info".to_string(),
        }
    }
}

/// Value of the `type` key of a site file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SiteType {
    NotFound,
    Redirect,
    Proxy,
    Static,
}

impl SiteType {
    /// Accepts the canonical spelling (`NotFound`) and the snake case one (`not_found`).
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "NotFound" | "not_found" | "notfound" => Some(Self::NotFound),
            "Redirect" | "redirect" => Some(Self::Redirect),
            "Proxy" | "proxy" => Some(Self::Proxy),
            "Static" | "static" => Some(Self::Static),
            _ => None,
        }
    }
}

/// Keys of a site file as read from disk, before validation.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SiteFields {
    pub host: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub to: Option<String>,
    pub dir: Option<String>,
}

impl SiteFields {
    /// Fill keys missing here from `fallback`.
    pub fn or(self, fallback: SiteFields) -> SiteFields {
        SiteFields {
            host: self.host.or(fallback.host),
            kind: self.kind.or(fallback.kind),
            to: self.to.or(fallback.to),
            dir: self.dir.or(fallback.dir),
        }
    }
}

/// How a single host is served.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SiteRoute {
    NotFound,
    Redirect { to: String },
    Proxy { to: String },
    Static { dir: String },
}

/// A validated site file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteConfig {
    pub host: String,
    pub route: SiteRoute,
    /// File the site was loaded from, if any
    pub source: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_site_type_spellings() {
        assert_eq!(SiteType::parse("NotFound"), Some(SiteType::NotFound));
        assert_eq!(SiteType::parse("not_found"), Some(SiteType::NotFound));
        assert_eq!(SiteType::parse("Proxy"), Some(SiteType::Proxy));
        assert_eq!(SiteType::parse("static"), Some(SiteType::Static));
        assert_eq!(SiteType::parse("Redirect"), Some(SiteType::Redirect));
        assert_eq!(SiteType::parse("PROXY"), None);
        assert_eq!(SiteType::parse(""), None);
    }

    #[test]
    fn test_fields_fallback() {
        let top = SiteFields {
            host: Some("top.example.com".to_string()),
            ..Default::default()
        };
        let section = SiteFields {
            host: Some("section.example.com".to_string()),
            kind: Some("Static".to_string()),
            dir: Some("/srv/www/".to_string()),
            ..Default::default()
        };

        let merged = top.or(section);
        assert_eq!(merged.host.as_deref(), Some("top.example.com"));
        assert_eq!(merged.kind.as_deref(), Some("Static"));
        assert_eq!(merged.dir.as_deref(), Some("/srv/www/"));
        assert!(merged.to.is_none());
    }

    #[test]
    fn test_server_config_defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.listen_addr, "localhost:80");
        assert_eq!(config.config_dir, PathBuf::from("/etc/zproxy.d"));
        assert_eq!(config.log_format, LogFormat::Json);
    }

    #[test]
    fn test_log_format_command_line_values() {
        use clap::ValueEnum;

        assert_eq!(LogFormat::from_str("json", false), Ok(LogFormat::Json));
        assert_eq!(LogFormat::from_str("pretty", false), Ok(LogFormat::Pretty));
        assert!(LogFormat::from_str("yaml", false).is_err());
    }
}
