use std::path::{Path, PathBuf};

use config::{Config, File, FileFormat};
use eyre::{Context, Result};
use serde::Deserialize;

use crate::config::{
    models::{SiteConfig, SiteFields},
    validation::SiteValidator,
};

/// On-disk layout of a site file: keys at the top level, in a `[DEFAULT]`
/// section, or both. Top-level keys win.
#[derive(Debug, Default, Deserialize)]
struct SiteFile {
    #[serde(flatten)]
    fields: SiteFields,
    #[serde(default, alias = "DEFAULT")]
    default: Option<SiteFields>,
}

/// Pick a parser from the file extension. Anything unknown is read as INI.
fn file_format(path: &Path) -> FileFormat {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("yaml") | Some("yml") => FileFormat::Yaml,
        Some("json") => FileFormat::Json,
        Some("toml") => FileFormat::Toml,
        _ => FileFormat::Ini,
    }
}

/// Load and validate a single site file.
pub fn load_site_file(path: &Path) -> Result<SiteConfig> {
    let settings = Config::builder()
        .add_source(File::new(
            path.to_str()
                .ok_or_else(|| eyre::eyre!("Invalid UTF-8 path: {}", path.display()))?,
            file_format(path),
        ))
        .build()
        .with_context(|| format!("Failed to read site file {}", path.display()))?;

    let file: SiteFile = settings
        .try_deserialize()
        .with_context(|| format!("Failed to parse site file {}", path.display()))?;

    let fields = match file.default {
        Some(section) => file.fields.or(section),
        None => file.fields,
    };

    Ok(SiteValidator::validate(fields, path)?)
}

/// Load every site file in `dir`, in file name order. Subdirectories and
/// dotfiles are skipped. A missing directory or any invalid file is an error.
pub fn load_sites(dir: &Path) -> Result<Vec<SiteConfig>> {
    let entries = std::fs::read_dir(dir)
        .with_context(|| format!("Failed to read site directory {}", dir.display()))?;

    let mut paths: Vec<PathBuf> = Vec::new();
    for entry in entries {
        let entry =
            entry.with_context(|| format!("Failed to list site directory {}", dir.display()))?;
        let path = entry.path();
        let hidden = entry.file_name().to_string_lossy().starts_with('.');
        if hidden || path.is_dir() {
            tracing::debug!("Skipping {}", path.display());
            continue;
        }
        paths.push(path);
    }
    paths.sort();

    paths
        .iter()
        .map(|path| {
            tracing::info!("Loading {}", path.display());
            load_site_file(path)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;

    use super::*;
    use crate::config::{models::SiteRoute, validation::ValidationError};

    fn write(dir: &TempDir, name: &str, content: &str) -> PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_load_ini_with_default_section() {
        let dir = TempDir::new().unwrap();
        let path = write(
            &dir,
            "www.conf",
            "[DEFAULT]\nhost = www.example.com\ntype = Static\ndir = /srv/www/\n",
        );

        let site = load_site_file(&path).unwrap();
        assert_eq!(site.host, "www.example.com");
        assert_eq!(
            site.route,
            SiteRoute::Static {
                dir: "/srv/www/".to_string()
            }
        );
        assert_eq!(site.source, Some(path));
    }

    #[test]
    fn test_load_ini_without_section() {
        let dir = TempDir::new().unwrap();
        let path = write(
            &dir,
            "api",
            "host = api.example.com\ntype = Proxy\nto = http://127.0.0.1:9000\n",
        );

        let site = load_site_file(&path).unwrap();
        assert_eq!(
            site.route,
            SiteRoute::Proxy {
                to: "http://127.0.0.1:9000".to_string()
            }
        );
    }

    #[test]
    fn test_load_toml_site() {
        let dir = TempDir::new().unwrap();
        let path = write(
            &dir,
            "old.toml",
            "host = \"old.example.com\"\ntype = \"Redirect\"\nto = \"https://new.example.com\"\n",
        );

        let site = load_site_file(&path).unwrap();
        assert_eq!(site.host, "old.example.com");
        assert_eq!(
            site.route,
            SiteRoute::Redirect {
                to: "https://new.example.com".to_string()
            }
        );
    }

    #[test]
    fn test_missing_key_is_reported() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "broken.conf", "host = x.example.com\ntype = Proxy\n");

        let err = load_site_file(&path).unwrap_err();
        match err.downcast_ref::<ValidationError>() {
            Some(ValidationError::MissingField { field, .. }) => assert_eq!(*field, "to"),
            other => panic!("Expected MissingField, got {other:?}"),
        }
    }

    #[test]
    fn test_load_sites_sorted_and_filtered() {
        let dir = TempDir::new().unwrap();
        write(&dir, "b.conf", "host = b.example.com\ntype = NotFound\n");
        write(&dir, "a.conf", "host = a.example.com\ntype = NotFound\n");
        write(&dir, ".hidden", "this is not a site file");
        fs::create_dir(dir.path().join("nested")).unwrap();

        let sites = load_sites(dir.path()).unwrap();
        let hosts: Vec<&str> = sites.iter().map(|s| s.host.as_str()).collect();
        assert_eq!(hosts, vec!["a.example.com", "b.example.com"]);
    }

    #[test]
    fn test_load_sites_empty_dir() {
        let dir = TempDir::new().unwrap();
        assert!(load_sites(dir.path()).unwrap().is_empty());
    }

    #[test]
    fn test_load_sites_missing_dir_fails() {
        let dir = TempDir::new().unwrap();
        assert!(load_sites(&dir.path().join("absent")).is_err());
    }

    #[test]
    fn test_load_sites_stops_on_invalid_file() {
        let dir = TempDir::new().unwrap();
        write(&dir, "a.conf", "host = a.example.com\ntype = NotFound\n");
        write(&dir, "b.conf", "host = b.example.com\ntype = Mirror\n");

        let err = load_sites(dir.path()).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ValidationError>(),
            Some(ValidationError::UnknownType { .. })
        ));
    }
}
