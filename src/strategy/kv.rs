/*============================================================
  Synavera Project: Syn-Gate
  Module: syngate_core::strategy::kv
  Etiquette: Synavera Script Etiquette — Rust Profile v1.1.1
  ------------------------------------------------------------
  Purpose:
    Serve first-party products recorded in the key-value
    metadata table; downloads redirect to the package mirror.

  Security / Safety Notes:
    Read-only store access; redirect urls carry no credentials.

  Dependencies:
    kv table bindings, resolver ordering.

  Operational Scope:
    automate and habitat.

  Revision History:
    2025-11-12 COD  Introduced key-value product strategy.
  ------------------------------------------------------------
  SSE Principles Observed:
    - Pinned automate coordinates applied in one place
    - Missing records reported with the product not-found message
============================================================*/

use std::sync::Arc;

use async_trait::async_trait;

use super::{empty_filename, ProductStrategy, AUTOMATE_PRODUCT, PRODUCT_NOT_FOUND};
use crate::catalog::{PackageCatalog, PackageMetadataRecord, PlatformVersionTree};
use crate::download::DownloadOutcome;
use crate::error::{GatewayError, Result};
use crate::kv::{KeyValueStore, MetadataEntry, ProductDetails, Table};
use crate::logger::RequestLog;
use crate::request::{Channel, Field, RequestDescriptor, LATEST};
use crate::resolver::sort_versions;

const AUTOMATE_CLI_ARTIFACT: &str = "chef-automate-cli";

/// Strategy over the key-value metadata table.
pub struct KeyValueStrategy {
    store: Arc<dyn KeyValueStore>,
    table: Table<ProductDetails>,
    download_root: String,
}

/// Coordinates actually looked up after product pinning.
struct Lookup {
    channel: Channel,
    version: String,
    artifact: String,
    match_platform_version: bool,
}

impl KeyValueStrategy {
    pub fn new(store: Arc<dyn KeyValueStore>, table: Table<ProductDetails>, download_root: String) -> Self {
        Self {
            store,
            table,
            download_root: download_root.trim_end_matches('/').to_string(),
        }
    }

    /// automate always serves the current `latest` CLI build.
    fn lookup(request: &RequestDescriptor) -> Lookup {
        if request.product == AUTOMATE_PRODUCT {
            Lookup {
                channel: Channel::Current,
                version: LATEST.to_string(),
                artifact: AUTOMATE_CLI_ARTIFACT.to_string(),
                match_platform_version: false,
            }
        } else {
            Lookup {
                channel: request.channel,
                version: request.version.clone(),
                artifact: request.product.clone(),
                match_platform_version: true,
            }
        }
    }

    async fn record(&self, product: &str, version: &str) -> Result<ProductDetails> {
        self.table
            .get(self.store.as_ref(), product, version)
            .await?
            .ok_or_else(|| GatewayError::not_found(PRODUCT_NOT_FOUND))
    }

    /// Entry for the requested platform and architecture.
    ///
    /// An exact platform-version match wins over a platform-only match.
    async fn entry(&self, request: &RequestDescriptor, lookup: &Lookup) -> Result<MetadataEntry> {
        request.require(&[Field::Platform, Field::Architecture])?;
        let record = self.record(&request.product, &lookup.version).await?;
        let candidates: Vec<&MetadataEntry> = record
            .metadata
            .iter()
            .filter(|entry| entry.platform == request.platform && entry.architecture == request.architecture)
            .collect();
        let exact = candidates.iter().rev().find(|entry| {
            lookup.match_platform_version && entry.platform_version == request.platform_version
        });
        exact
            .or_else(|| candidates.last())
            .map(|entry| (*entry).clone())
            .ok_or_else(|| GatewayError::not_found(PRODUCT_NOT_FOUND))
    }
}

#[async_trait]
impl ProductStrategy for KeyValueStrategy {
    fn name(&self) -> &'static str {
        "key-value"
    }

    async fn latest_version(&self, request: &RequestDescriptor, log: RequestLog<'_>) -> Result<String> {
        let latest = self.table.latest(self.store.as_ref(), &request.product).await;
        if let Err(err) = &latest {
            log.error("KV_LATEST", format!("latest version for {} failed: {err}", request.product));
        }
        latest
    }

    async fn all_versions(&self, request: &RequestDescriptor, _log: RequestLog<'_>) -> Result<Vec<String>> {
        let mut versions = self.table.versions(self.store.as_ref(), &request.product).await?;
        sort_versions(&mut versions);
        Ok(versions)
    }

    async fn packages(&self, request: &RequestDescriptor, _log: RequestLog<'_>) -> Result<PackageCatalog> {
        let lookup = Self::lookup(request);
        let record = self.record(&request.product, &lookup.version).await?;
        let mut tree = PlatformVersionTree::new();
        for entry in &record.metadata {
            PackageCatalog::insert_platform_version(
                &mut tree,
                &entry.platform,
                &entry.platform_version,
                &entry.architecture,
                PackageMetadataRecord::new(&entry.sha1, &entry.sha256, &record.version),
            );
        }
        Ok(PackageCatalog::ByPlatformVersion(tree))
    }

    async fn metadata(
        &self,
        request: &RequestDescriptor,
        _log: RequestLog<'_>,
    ) -> Result<PackageMetadataRecord> {
        let lookup = Self::lookup(request);
        let entry = self.entry(request, &lookup).await?;
        Ok(PackageMetadataRecord::new(entry.sha1, entry.sha256, lookup.version))
    }

    async fn file_name(&self, request: &RequestDescriptor, _log: RequestLog<'_>) -> Result<String> {
        let entry = self.entry(request, &Self::lookup(request)).await?;
        if entry.filename.is_empty() {
            return Err(empty_filename());
        }
        Ok(entry.filename)
    }

    async fn download(&self, request: &RequestDescriptor, log: RequestLog<'_>) -> Result<DownloadOutcome> {
        let lookup = Self::lookup(request);
        let entry = self.entry(request, &lookup).await?;
        if entry.filename.is_empty() {
            return Err(empty_filename());
        }
        let url = format!(
            "{}/{}/{}/{}/{}",
            self.download_root, lookup.channel, lookup.version, lookup.artifact, entry.filename
        );
        log.info("KV_DOWNLOAD", format!("redirecting {} to {url}", request.product));
        Ok(DownloadOutcome::Redirect(url))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kv::MemoryStore;
    use crate::logger::Logger;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn strategy() -> KeyValueStrategy {
        let mut store = MemoryStore::new();
        store.insert(
            "metadata",
            json!({
                "product": "automate",
                "version": "latest",
                "metadata": [
                    {"architecture": "amd64", "filename": "chef-automate_linux_amd64.zip",
                     "platform": "linux", "platform_version": "", "sha1": "a1", "sha256": "a256"}
                ]
            }),
        );
        for version in ["1.6.652", "1.6.1243", "0.90.6"] {
            store.insert(
                "metadata",
                json!({
                    "product": "habitat",
                    "version": version,
                    "metadata": [
                        {"architecture": "x86_64", "filename": format!("hab-{version}-x86_64-linux.tar.gz"),
                         "platform": "linux", "platform_version": "", "sha1": "h1", "sha256": "h256"},
                        {"architecture": "x86_64", "filename": format!("hab-{version}-x86_64-linux-kernel2.tar.gz"),
                         "platform": "linux-kernel2", "platform_version": "", "sha1": "k1", "sha256": "k256"}
                    ]
                }),
            );
        }
        KeyValueStrategy::new(
            Arc::new(store),
            Table::new("metadata"),
            "https://packages.example/files/".into(),
        )
    }

    #[tokio::test]
    async fn versions_sorted_semantically() {
        let logger = Logger::quiet();
        let request = RequestDescriptor::new(Channel::Stable, "habitat");
        let versions = strategy().all_versions(&request, logger.scope("t")).await.unwrap();
        assert_eq!(versions, vec!["0.90.6", "1.6.652", "1.6.1243"]);
    }

    #[tokio::test]
    async fn latest_keeps_reverse_lexicographic_rule() {
        let logger = Logger::quiet();
        let request = RequestDescriptor::new(Channel::Stable, "habitat");
        let latest = strategy().latest_version(&request, logger.scope("t")).await.unwrap();
        assert_eq!(latest, "1.6.652");
    }

    #[tokio::test]
    async fn automate_download_uses_pinned_cli_coordinates() {
        let logger = Logger::quiet();
        let request = RequestDescriptor::new(Channel::Stable, "automate")
            .with_version("4.10.1")
            .with_target("linux", "", "amd64");
        let outcome = strategy().download(&request, logger.scope("t")).await.unwrap();
        match outcome {
            DownloadOutcome::Redirect(url) => assert_eq!(
                url,
                "https://packages.example/files/current/latest/chef-automate-cli/chef-automate_linux_amd64.zip"
            ),
            other => panic!("unexpected outcome {other:?}"),
        }
    }

    #[tokio::test]
    async fn habitat_packages_tree_by_platform() {
        let logger = Logger::quiet();
        let request = RequestDescriptor::new(Channel::Stable, "habitat").with_version("1.6.652");
        let catalog = strategy().packages(&request, logger.scope("t")).await.unwrap();
        assert_eq!(catalog.len(), 2);
        assert!(catalog.records().iter().all(|record| record.version == "1.6.652"));
    }

    #[tokio::test]
    async fn unknown_target_is_product_not_found() {
        let logger = Logger::quiet();
        let request = RequestDescriptor::new(Channel::Stable, "habitat")
            .with_version("1.6.652")
            .with_target("windows", "", "x86_64");
        let err = strategy().metadata(&request, logger.scope("t")).await.unwrap_err();
        assert_eq!(err.failure().message, PRODUCT_NOT_FOUND);
        assert_eq!(err.status(), 400);
    }

    #[tokio::test]
    async fn metadata_requires_platform() {
        let logger = Logger::quiet();
        let request = RequestDescriptor::new(Channel::Stable, "habitat").with_version("1.6.652");
        let err = strategy().file_name(&request, logger.scope("t")).await.unwrap_err();
        assert!(matches!(err, GatewayError::Validation { field: "p", .. }));
    }
}
