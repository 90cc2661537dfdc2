/*============================================================
  Synavera Project: Syn-Gate
  Module: syngate_core::strategy
  Etiquette: Synavera Script Etiquette — Rust Profile v1.1.1
  ------------------------------------------------------------
  Purpose:
    Product strategy contract and the selector mapping a
    (product, channel) pair onto the backend that serves it.

  Security / Safety Notes:
    Strategies hold shared collaborator handles only; no
    request state survives between calls.

  Dependencies:
    async-trait for the strategy contract.

  Operational Scope:
    Chosen per request by the orchestrator.

  Revision History:
    2025-11-12 COD  Introduced product strategy family.
  ------------------------------------------------------------
  SSE Principles Observed:
    - Closed set of strategies behind one trait
    - Selection is pure over configuration
============================================================*/

pub mod infra;
pub mod kv;
pub mod mode;
pub mod platform;
pub mod proxy;

use std::sync::Arc;

use async_trait::async_trait;

use crate::catalog::{PackageCatalog, PackageMetadataRecord};
use crate::config::GatewayConfig;
use crate::download::DownloadOutcome;
use crate::error::{GatewayError, Result, STATUS_INTERNAL};
use crate::kv::{KeyValueStore, Table};
use crate::license::LicenseService;
use crate::logger::RequestLog;
use crate::object_store::{CredentialFederation, ObjectStore};
use crate::portal::CustomerPortal;
use crate::request::{Channel, RequestDescriptor};
use crate::upstream::CatalogApi;

pub use infra::ObjectStoreStrategy;
pub use kv::KeyValueStrategy;
pub use mode::{select_mode_strategy, ModeStrategy, Persona, PLATFORM_SERVICE_PRODUCT};
pub use platform::PlatformServiceStrategy;
pub use proxy::UpstreamProxyStrategy;

pub const AUTOMATE_PRODUCT: &str = "automate";
pub const HABITAT_PRODUCT: &str = "habitat";
/// Products whose records live in the key-value metadata table.
pub const KEY_VALUE_PRODUCTS: [&str; 2] = [AUTOMATE_PRODUCT, HABITAT_PRODUCT];

pub const PRODUCT_NOT_FOUND: &str = "Product information not found. Please check the input parameters";
pub const EMPTY_FILENAME: &str = "Download filename is empty";

/// Backend-specific implementation of the catalog operations.
#[async_trait]
pub trait ProductStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    async fn latest_version(&self, request: &RequestDescriptor, log: RequestLog<'_>) -> Result<String>;

    /// All versions known to the backend, ascending.
    async fn all_versions(&self, request: &RequestDescriptor, log: RequestLog<'_>) -> Result<Vec<String>>;

    async fn packages(&self, request: &RequestDescriptor, log: RequestLog<'_>) -> Result<PackageCatalog>;

    async fn metadata(
        &self,
        request: &RequestDescriptor,
        log: RequestLog<'_>,
    ) -> Result<PackageMetadataRecord>;

    async fn file_name(&self, request: &RequestDescriptor, log: RequestLog<'_>) -> Result<String>;

    async fn download(&self, request: &RequestDescriptor, log: RequestLog<'_>) -> Result<DownloadOutcome>;

    /// Point every record of `catalog` at this gateway's download endpoint.
    fn update_package_urls(&self, catalog: &mut PackageCatalog, request: &RequestDescriptor, base_url: &str) {
        rewrite_package_urls(catalog, request, base_url);
    }
}

/// Rewrite record urls so a follow-up download names the same target.
pub fn rewrite_package_urls(catalog: &mut PackageCatalog, request: &RequestDescriptor, base_url: &str) {
    catalog.update_records(|coords, record| {
        let mut target = request.clone();
        if !record.version.is_empty() {
            target.version = record.version.clone();
        }
        target.platform = coords.platform.to_string();
        target.architecture = coords.architecture.to_string();
        if let Some(platform_version) = coords.platform_version {
            target.platform_version = platform_version.to_string();
        }
        if let Some(package_manager) = coords.package_manager {
            target.package_manager = package_manager.to_string();
        }
        record.url = target.download_url(base_url);
    });
}

/// Failure used when a backend record names no file.
pub(crate) fn empty_filename() -> GatewayError {
    GatewayError::NotFound {
        status: STATUS_INTERNAL,
        message: EMPTY_FILENAME.to_string(),
    }
}

/// Shared collaborators handed to every strategy.
#[derive(Clone)]
pub struct ProductStrategyDeps {
    pub config: Arc<GatewayConfig>,
    pub store: Arc<dyn KeyValueStore>,
    pub catalog: Arc<dyn CatalogApi>,
    pub license: Arc<dyn LicenseService>,
    pub portal: Arc<dyn CustomerPortal>,
    pub federation: Arc<dyn CredentialFederation>,
    pub objects: Arc<dyn ObjectStore>,
}

/// Map a product and channel onto the strategy serving it.
pub fn select_product_strategy(
    product: &str,
    channel: Channel,
    deps: &ProductStrategyDeps,
) -> Box<dyn ProductStrategy> {
    let config = &deps.config;
    if KEY_VALUE_PRODUCTS.contains(&product) {
        return Box::new(KeyValueStrategy::new(
            deps.store.clone(),
            Table::new(config.store.metadata_table.clone()),
            config.products.download_root.clone(),
        ));
    }
    if product == PLATFORM_SERVICE_PRODUCT {
        return Box::new(PlatformServiceStrategy::new(
            config.gateway.persona,
            deps.license.clone(),
            deps.portal.clone(),
        ));
    }
    if config.products.is_enterprise(product) {
        let table = match channel {
            Channel::Current => &config.store.package_details_current_table,
            Channel::Stable => &config.store.package_details_stable_table,
        };
        return Box::new(ObjectStoreStrategy::new(
            deps.store.clone(),
            Table::new(table.clone()),
            config.object_store.clone(),
            deps.federation.clone(),
            deps.objects.clone(),
        ));
    }
    Box::new(UpstreamProxyStrategy::new(deps.catalog.clone()))
}

#[cfg(test)]
pub(crate) mod testing {
    //! Collaborator doubles shared by strategy and orchestrator tests.

    use std::collections::BTreeMap;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use bytes::Bytes;
    use futures::{stream, StreamExt};

    use super::*;
    use crate::catalog::PlatformVersionTree;
    use crate::download::ArtifactStream;
    use crate::kv::MemoryStore;
    use crate::object_store::{LocalObjectStore, StaticFederation};
    use crate::portal::Customer;
    use crate::upstream::{MetadataQuery, PlatformList};

    #[derive(Default)]
    pub struct FakeCatalog {
        pub versions: Vec<String>,
        pub packages: PlatformVersionTree,
        pub metadata_url: String,
        pub calls: Mutex<Vec<String>>,
    }

    impl FakeCatalog {
        fn record(&self, call: String) {
            if let Ok(mut calls) = self.calls.lock() {
                calls.push(call);
            }
        }
    }

    #[async_trait]
    impl CatalogApi for FakeCatalog {
        async fn products(&self, _eol: bool) -> Result<Vec<String>> {
            Ok(vec!["chef".into(), "inspec".into(), "manage".into()])
        }

        async fn platforms(&self) -> Result<PlatformList> {
            Ok(BTreeMap::from([("ubuntu".to_string(), "Ubuntu Linux".to_string())]))
        }

        async fn architectures(&self) -> Result<Vec<String>> {
            Ok(vec!["x86_64".into(), "aarch64".into()])
        }

        async fn latest_version(&self, _channel: Channel, _product: &str) -> Result<String> {
            self.versions.last().cloned().ok_or(GatewayError::NoCandidates)
        }

        async fn versions(&self, channel: Channel, product: &str) -> Result<Vec<String>> {
            self.record(format!("versions {channel} {product}"));
            Ok(self.versions.clone())
        }

        async fn packages(&self, _channel: Channel, _product: &str, version: &str) -> Result<PlatformVersionTree> {
            self.record(format!("packages {version}"));
            Ok(self.packages.clone())
        }

        async fn metadata(&self, query: MetadataQuery<'_>) -> Result<PackageMetadataRecord> {
            self.record(format!("metadata {}", query.version));
            Ok(PackageMetadataRecord {
                url: self.metadata_url.clone(),
                ..PackageMetadataRecord::new("s1", "s256", query.version)
            })
        }
    }

    pub struct FakeLicense {
        pub email: Result<String>,
        pub valid: bool,
    }

    #[async_trait]
    impl LicenseService for FakeLicense {
        async fn validate(&self, _license_id: &str) -> Result<bool> {
            Ok(self.valid)
        }

        async fn customer_email(&self, _license_id: &str) -> Result<String> {
            match &self.email {
                Ok(email) => Ok(email.clone()),
                Err(_) => Err(GatewayError::backend("license service", "status 500 for tmns-secret")),
            }
        }
    }

    #[derive(Default)]
    pub struct FakePortal {
        pub customers: Vec<Customer>,
        pub headers: Vec<(String, String)>,
        pub downloads: Mutex<Vec<(String, String)>>,
        /// Fail the customer search as an unreachable portal would.
        pub search_fails: bool,
        /// Fail the artifact request with a portal error status.
        pub download_fails: bool,
    }

    #[async_trait]
    impl CustomerPortal for FakePortal {
        async fn search_by_email(&self, _email: &str) -> Result<Vec<Customer>> {
            if self.search_fails {
                return Err(GatewayError::backend(
                    "customer portal",
                    "customer search failed: connection refused",
                ));
            }
            Ok(self.customers.clone())
        }

        async fn download(&self, url: &str, installation_id: &str) -> Result<ArtifactStream> {
            if let Ok(mut downloads) = self.downloads.lock() {
                downloads.push((url.to_string(), installation_id.to_string()));
            }
            if self.download_fails {
                return Err(GatewayError::Upstream {
                    status: 403,
                    message: "installation not entitled".into(),
                });
            }
            let mut artifact = ArtifactStream::new(
                200,
                stream::iter(vec![Ok(Bytes::from_static(b"bundle"))]).boxed(),
            );
            for (name, value) in &self.headers {
                artifact.set_header(name, value.clone());
            }
            Ok(artifact)
        }

        fn download_root(&self) -> &str {
            "https://portal.example/embedded"
        }
    }

    pub fn deps(config: GatewayConfig, store: MemoryStore, catalog: FakeCatalog) -> ProductStrategyDeps {
        let root = config
            .object_store
            .root
            .clone()
            .unwrap_or_else(std::env::temp_dir);
        let ttl = config.object_store.credential_ttl_secs;
        ProductStrategyDeps {
            config: Arc::new(config),
            store: Arc::new(store),
            catalog: Arc::new(catalog),
            license: Arc::new(FakeLicense {
                email: Ok("ops@example.com".into()),
                valid: true,
            }),
            portal: Arc::new(FakePortal::default()),
            federation: Arc::new(StaticFederation::new(ttl)),
            objects: Arc::new(LocalObjectStore::new(root)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::{deps, FakeCatalog};
    use super::*;
    use crate::kv::MemoryStore;

    fn selected(product: &str, channel: Channel) -> &'static str {
        let deps = deps(GatewayConfig::default(), MemoryStore::new(), FakeCatalog::default());
        select_product_strategy(product, channel, &deps).name()
    }

    #[test]
    fn selector_routes_each_family() {
        assert_eq!(selected("automate", Channel::Stable), "key-value");
        assert_eq!(selected("habitat", Channel::Current), "key-value");
        assert_eq!(selected("chef-360", Channel::Stable), "platform-service");
        assert_eq!(selected("chef-ice", Channel::Current), "object-store");
        assert_eq!(selected("migrate-ice", Channel::Stable), "object-store");
        assert_eq!(selected("chef", Channel::Stable), "upstream-proxy");
    }

    #[test]
    fn rewrite_carries_leaf_coordinates() {
        let mut tree = crate::catalog::PlatformVersionTree::new();
        PackageCatalog::insert_platform_version(
            &mut tree,
            "ubuntu",
            "22.04",
            "x86_64",
            PackageMetadataRecord::new("a", "b", "18.2.7"),
        );
        let mut catalog = PackageCatalog::ByPlatformVersion(tree);
        let request = RequestDescriptor::new(Channel::Stable, "chef").with_license("free-1");
        rewrite_package_urls(&mut catalog, &request, "https://gate.example");
        assert_eq!(
            catalog.records()[0].url,
            "https://gate.example/stable/chef/download?v=18.2.7&p=ubuntu&pv=22.04&m=x86_64&license_id=free-1"
        );
    }
}
