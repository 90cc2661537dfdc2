/*============================================================
  Synavera Project: Syn-Gate
  Module: syngate_core::config
  Etiquette: Synavera Script Etiquette — Rust Profile v1.1.1
  ------------------------------------------------------------
  Purpose:
    Load process-wide gateway configuration: persona, backend
    endpoints, key-value tables, and object-store settings.

  Security / Safety Notes:
    Portal tokens and role ARNs are held in memory only and are
    never echoed by Debug output of the logger.

  Dependencies:
    serde + toml for parsing, dirs for the default location.

  Operational Scope:
    Read once at startup; immutable for the life of the process.

  Revision History:
    2024-11-04 COD  Introduced TOML configuration loader.
    2025-11-12 COD  Gateway sections for catalog backends.
  ------------------------------------------------------------
  SSE Principles Observed:
    - Explicit defaults for every optional field
    - Fail fast on malformed or incomplete configuration
============================================================*/

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{GatewayError, Result};
use crate::strategy::mode::Persona;

const CONFIG_DIR: &str = "syn-gate";
const CONFIG_FILE: &str = "config.toml";

/// Root configuration document.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    pub gateway: GatewaySection,
    pub upstream: UpstreamConfig,
    pub license: LicenseConfig,
    pub portal: PortalConfig,
    pub store: StoreConfig,
    pub object_store: ObjectStoreConfig,
    pub products: ProductsConfig,
}

/// Deployment identity.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GatewaySection {
    pub persona: Persona,
    /// Public base url of this gateway; download links are rewritten onto it.
    pub base_url: String,
    pub log_dir: Option<PathBuf>,
}

impl Default for GatewaySection {
    fn default() -> Self {
        Self {
            persona: Persona::Commercial,
            base_url: "http://localhost:3000".to_string(),
            log_dir: None,
        }
    }
}

/// Upstream catalog HTTP API.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UpstreamConfig {
    pub base_url: String,
    pub timeout: u64,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: "https://omnitruck.chef.io".to_string(),
            timeout: 10,
        }
    }
}

/// Billing / license service.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LicenseConfig {
    pub base_url: String,
    pub timeout: u64,
}

impl Default for LicenseConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            timeout: 10,
        }
    }
}

/// Customer portal (billing CRM) used by the license-gated download.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PortalConfig {
    pub base_url: String,
    pub app_id: String,
    pub token: String,
    pub download_url: String,
    pub timeout: u64,
}

impl Default for PortalConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.replicated.com/vendor/v3".to_string(),
            app_id: String::new(),
            token: String::new(),
            download_url: "https://replicated.app/embedded".to_string(),
            timeout: 30,
        }
    }
}

/// Key-value store tables.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// JSON snapshot backing the local key-value store.
    pub snapshot: Option<PathBuf>,
    pub metadata_table: String,
    pub package_details_current_table: String,
    pub package_details_stable_table: String,
    pub package_managers_table: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            snapshot: None,
            metadata_table: "metadata-details".to_string(),
            package_details_current_table: "package-details-current".to_string(),
            package_details_stable_table: "package-details-stable".to_string(),
            package_managers_table: "package-managers".to_string(),
        }
    }
}

/// Object store holding enterprise artifacts.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ObjectStoreConfig {
    pub region: String,
    pub bucket: String,
    pub role_arn: String,
    pub current_path: String,
    pub stable_path: String,
    /// Filesystem root for the local object store.
    pub root: Option<PathBuf>,
    pub credential_ttl_secs: i64,
}

impl Default for ObjectStoreConfig {
    fn default() -> Self {
        Self {
            region: String::new(),
            bucket: String::new(),
            role_arn: String::new(),
            current_path: "current".to_string(),
            stable_path: "stable".to_string(),
            root: None,
            credential_ttl_secs: 900,
        }
    }
}

impl ObjectStoreConfig {
    /// Region, bucket and role must all be present before any network call.
    pub fn validate(&self) -> Result<()> {
        let missing: Vec<&str> = [
            ("region", self.region.as_str()),
            ("bucket", self.bucket.as_str()),
            ("role_arn", self.role_arn.as_str()),
        ]
        .iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| *name)
        .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(GatewayError::Config(format!(
                "object store configuration is incomplete for download (missing {})",
                missing.join(", ")
            )))
        }
    }
}

/// Product routing knobs.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ProductsConfig {
    /// Products served from the object store per package manager.
    pub enterprise: Vec<String>,
    /// Whether enterprise products are listed by `products`.
    pub enterprise_enabled: bool,
    /// Root of the fixed download url template for key-value products.
    pub download_root: String,
}

impl Default for ProductsConfig {
    fn default() -> Self {
        Self {
            enterprise: vec!["chef-ice".to_string(), "migrate-ice".to_string()],
            enterprise_enabled: true,
            download_root: "https://packages.chef.io/files".to_string(),
        }
    }
}

impl ProductsConfig {
    pub fn is_enterprise(&self, product: &str) -> bool {
        self.enterprise.iter().any(|id| id == product)
    }
}

impl GatewayConfig {
    /// Load configuration from an explicit path, or the default location.
    ///
    /// An explicit path must exist; a missing default file yields defaults.
    pub fn load_from_optional_path(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(explicit) => Self::load_from_path(explicit),
            None => match default_config_path() {
                Some(default) if default.exists() => Self::load_from_path(&default),
                _ => Ok(Self::default()),
            },
        }
    }

    fn load_from_path(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|err| {
            GatewayError::Config(format!("Failed to read config {}: {err}", path.display()))
        })?;
        Self::from_toml(&raw).map_err(|err| match err {
            GatewayError::Config(msg) => {
                GatewayError::Config(format!("{}: {msg}", path.display()))
            }
            other => other,
        })
    }

    pub fn from_toml(raw: &str) -> Result<Self> {
        let config: GatewayConfig =
            toml::from_str(raw).map_err(|err| GatewayError::Config(err.to_string()))?;
        if config.gateway.base_url.trim().is_empty() {
            return Err(GatewayError::Config("gateway.base_url cannot be empty".into()));
        }
        Ok(config)
    }

    /// Directory receiving session logs.
    pub fn log_dir(&self) -> PathBuf {
        self.gateway.log_dir.clone().unwrap_or_else(|| {
            dirs::state_dir()
                .or_else(dirs::data_local_dir)
                .unwrap_or_else(std::env::temp_dir)
                .join(CONFIG_DIR)
                .join("logs")
        })
    }
}

fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(CONFIG_DIR).join(CONFIG_FILE))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_document_keeps_defaults() {
        let config = GatewayConfig::from_toml(
            r#"
            [gateway]
            persona = "opensource"
            base_url = "https://gate.example"

            [object_store]
            bucket = "artifacts"
            "#,
        )
        .unwrap();

        assert_eq!(config.gateway.persona, Persona::Opensource);
        assert_eq!(config.object_store.bucket, "artifacts");
        assert_eq!(config.object_store.current_path, "current");
        assert!(config.products.is_enterprise("chef-ice"));
        assert_eq!(config.upstream.timeout, 10);
    }

    #[test]
    fn incomplete_object_store_names_missing_fields() {
        let config = ObjectStoreConfig {
            region: "us-east-2".into(),
            ..ObjectStoreConfig::default()
        };
        let err = config.validate().unwrap_err();
        assert!(matches!(err, GatewayError::Config(_)));
        assert!(err.to_string().contains("bucket, role_arn"));
    }

    #[test]
    fn explicit_missing_file_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = GatewayConfig::load_from_optional_path(Some(&dir.path().join("nope.toml")))
            .unwrap_err();
        assert!(matches!(err, GatewayError::Config(_)));
    }

    #[test]
    fn empty_base_url_rejected() {
        let err = GatewayConfig::from_toml("[gateway]\nbase_url = \"\"\n").unwrap_err();
        assert!(err.to_string().contains("base_url"));
    }
}
