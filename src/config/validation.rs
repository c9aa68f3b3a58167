use std::path::Path;

use crate::config::models::{SiteConfig, SiteFields, SiteRoute, SiteType};

/// Validation result type alias
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Site file validation errors. All of them abort startup.
#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{file}: missing required field '{field}'")]
    MissingField { file: String, field: &'static str },

    #[error("{file}: host must not be empty")]
    EmptyHost { file: String },

    #[error("{file}: unknown site type '{value}' (expected NotFound, Redirect, Proxy or Static)")]
    UnknownType { file: String, value: String },
}

/// Turns raw site file keys into a [`SiteConfig`].
pub struct SiteValidator;

impl SiteValidator {
    /// Check required keys for the declared type. Values are kept verbatim;
    /// URL checks happen when the site is registered.
    pub fn validate(fields: SiteFields, file: &Path) -> ValidationResult<SiteConfig> {
        let file_name = file.display().to_string();
        let required = |value: Option<String>, field: &'static str| {
            value.ok_or_else(|| ValidationError::MissingField {
                file: file_name.clone(),
                field,
            })
        };

        let host = required(fields.host, "host")?;
        if host.trim().is_empty() {
            return Err(ValidationError::EmptyHost { file: file_name });
        }

        let kind = required(fields.kind, "type")?;
        let route = match SiteType::parse(kind.trim()) {
            Some(SiteType::NotFound) => SiteRoute::NotFound,
            Some(SiteType::Redirect) => SiteRoute::Redirect {
                to: required(fields.to, "to")?,
            },
            Some(SiteType::Proxy) => SiteRoute::Proxy {
                to: required(fields.to, "to")?,
            },
            Some(SiteType::Static) => SiteRoute::Static {
                dir: required(fields.dir, "dir")?,
            },
            None => {
                return Err(ValidationError::UnknownType {
                    file: file_name,
                    value: kind,
                });
            }
        };

        Ok(SiteConfig {
            host,
            route,
            source: Some(file.to_path_buf()),
        })
    }
}
