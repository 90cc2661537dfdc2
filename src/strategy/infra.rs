/*============================================================
  Synavera Project: Syn-Gate
  Module: syngate_core::strategy::infra
  Etiquette: Synavera Script Etiquette — Rust Profile v1.1.1
  ------------------------------------------------------------
  Purpose:
    Serve enterprise products distributed per package manager:
    catalog data from the channel's package-details table and
    artifacts streamed from the object store under scoped,
    role-assumed credentials.

  Security / Safety Notes:
    Object-store configuration is validated before any I/O.
    Credentials live only for the duration of one download and
    never appear in logs or errors.

  Dependencies:
    kv table bindings, object store and federation contracts.

  Operational Scope:
    Products listed in products.enterprise.

  Revision History:
    2025-11-12 COD  Introduced object-store product strategy.
  ------------------------------------------------------------
  SSE Principles Observed:
    - Validate, session, assume, fetch as separate fallible steps
    - Content headers surfaced with a filename fallback
============================================================*/

use std::sync::Arc;

use async_trait::async_trait;

use super::{empty_filename, ProductStrategy, PRODUCT_NOT_FOUND};
use crate::catalog::{PackageCatalog, PackageManagerTree, PackageMetadataRecord};
use crate::config::ObjectStoreConfig;
use crate::download::{
    ArtifactStream, DownloadOutcome, CONTENT_DISPOSITION, CONTENT_LENGTH, CONTENT_TYPE,
};
use crate::error::{GatewayError, Result, STATUS_OK};
use crate::kv::{KeyValueStore, PackageDetails, PackageFile, Table};
use crate::logger::RequestLog;
use crate::object_store::{CredentialFederation, ObjectStore};
use crate::request::{Channel, Field, RequestDescriptor};
use crate::resolver::sort_versions;

const REQUIRED: [Field; 3] = [Field::Platform, Field::Architecture, Field::PackageManager];

pub struct ObjectStoreStrategy {
    store: Arc<dyn KeyValueStore>,
    table: Table<PackageDetails>,
    config: ObjectStoreConfig,
    federation: Arc<dyn CredentialFederation>,
    objects: Arc<dyn ObjectStore>,
}

impl ObjectStoreStrategy {
    pub fn new(
        store: Arc<dyn KeyValueStore>,
        table: Table<PackageDetails>,
        config: ObjectStoreConfig,
        federation: Arc<dyn CredentialFederation>,
        objects: Arc<dyn ObjectStore>,
    ) -> Self {
        Self {
            store,
            table,
            config,
            federation,
            objects,
        }
    }

    async fn record(&self, request: &RequestDescriptor) -> Result<PackageDetails> {
        self.table
            .get(self.store.as_ref(), &request.product, &request.version)
            .await?
            .ok_or_else(|| GatewayError::not_found(PRODUCT_NOT_FOUND))
    }

    async fn package_file(&self, request: &RequestDescriptor) -> Result<PackageFile> {
        request.require(&REQUIRED)?;
        let record = self.record(request).await?;
        record
            .metadata
            .get(&request.platform)
            .and_then(|arches| arches.get(&request.architecture))
            .and_then(|managers| managers.get(&request.package_manager))
            .filter(|file| **file != PackageFile::default())
            .cloned()
            .ok_or_else(|| GatewayError::not_found(PRODUCT_NOT_FOUND))
    }

    /// `{path}/{product}/{version}/{platform}/{arch}/{file}`
    ///
    /// Empty segments are skipped so an unset channel path never yields
    /// a leading `/`.
    fn object_key(&self, request: &RequestDescriptor, file_name: &str) -> String {
        let path = match request.channel {
            Channel::Current => &self.config.current_path,
            Channel::Stable => &self.config.stable_path,
        };
        [
            path.as_str(),
            request.product.as_str(),
            request.version.as_str(),
            request.platform.as_str(),
            request.architecture.as_str(),
            file_name,
        ]
        .iter()
        .map(|segment| segment.trim_matches('/'))
        .filter(|segment| !segment.is_empty())
        .collect::<Vec<_>>()
        .join("/")
    }

    async fn stream_object(
        &self,
        request: &RequestDescriptor,
        file_name: &str,
        log: RequestLog<'_>,
    ) -> Result<ArtifactStream> {
        let key = self.object_key(request, file_name);
        log.debug("OBJECT_DOWNLOAD", format!("object key {key}"));

        let session = self.federation.session(&self.config.region).await.map_err(|err| {
            log.error("OBJECT_DOWNLOAD", format!("session creation failed: {err}"));
            err
        })?;
        let credentials = self
            .federation
            .assume_role(&session, &self.config.role_arn)
            .await
            .map_err(|err| {
                log.error("OBJECT_DOWNLOAD", format!("role assumption failed: {err}"));
                err
            })?;
        let object = self
            .objects
            .get_object(&session, &credentials, &self.config.bucket, &key)
            .await
            .map_err(|err| {
                log.error("OBJECT_DOWNLOAD", format!("object fetch failed: {err}"));
                err
            })?;

        let mut artifact = ArtifactStream::new(STATUS_OK, object.body);
        if let Some(content_type) = object.content_type {
            artifact.set_header(CONTENT_TYPE, content_type);
        }
        if let Some(length) = object.content_length {
            artifact.set_header(CONTENT_LENGTH, length.to_string());
        }
        match object.content_disposition {
            Some(disposition) => artifact.set_header(CONTENT_DISPOSITION, disposition),
            None => artifact.set_header(CONTENT_DISPOSITION, format!("attachment; filename={file_name}")),
        }
        Ok(artifact)
    }
}

#[async_trait]
impl ProductStrategy for ObjectStoreStrategy {
    fn name(&self) -> &'static str {
        "object-store"
    }

    async fn latest_version(&self, request: &RequestDescriptor, log: RequestLog<'_>) -> Result<String> {
        let latest = self.table.latest(self.store.as_ref(), &request.product).await;
        if let Err(err) = &latest {
            log.error(
                "OBJECT_LATEST",
                format!("latest version for {} from {} failed: {err}", request.product, self.table.name()),
            );
        }
        latest
    }

    async fn all_versions(&self, request: &RequestDescriptor, _log: RequestLog<'_>) -> Result<Vec<String>> {
        let mut versions = self.table.versions(self.store.as_ref(), &request.product).await?;
        sort_versions(&mut versions);
        Ok(versions)
    }

    async fn packages(&self, request: &RequestDescriptor, _log: RequestLog<'_>) -> Result<PackageCatalog> {
        let record = self.record(request).await?;
        let mut tree = PackageManagerTree::new();
        for (platform, arches) in &record.metadata {
            for (architecture, managers) in arches {
                for (package_manager, file) in managers {
                    tree.entry(platform.clone())
                        .or_default()
                        .entry(architecture.clone())
                        .or_default()
                        .insert(
                            package_manager.clone(),
                            PackageMetadataRecord::new(&file.sha1, &file.sha256, &record.version),
                        );
                }
            }
        }
        Ok(PackageCatalog::ByPackageManager(tree))
    }

    async fn metadata(
        &self,
        request: &RequestDescriptor,
        _log: RequestLog<'_>,
    ) -> Result<PackageMetadataRecord> {
        let file = self.package_file(request).await?;
        Ok(PackageMetadataRecord::new(file.sha1, file.sha256, &request.version))
    }

    async fn file_name(&self, request: &RequestDescriptor, _log: RequestLog<'_>) -> Result<String> {
        let file = self.package_file(request).await?;
        if file.filename.is_empty() {
            return Err(empty_filename());
        }
        Ok(file.filename)
    }

    async fn download(&self, request: &RequestDescriptor, log: RequestLog<'_>) -> Result<DownloadOutcome> {
        self.config.validate().map_err(|err| {
            log.error("OBJECT_DOWNLOAD", format!("invalid object store config: {err}"));
            err
        })?;
        let file_name = self.file_name(request, log).await?;
        log.info(
            "OBJECT_DOWNLOAD",
            format!(
                "downloading {file_name} from bucket {} in region {}",
                self.config.bucket, self.config.region
            ),
        );
        self.stream_object(request, &file_name, log)
            .await
            .map(DownloadOutcome::Stream)
    }
}
