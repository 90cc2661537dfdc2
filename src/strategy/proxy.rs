/*============================================================
  Synavera Project: Syn-Gate
  Module: syngate_core::strategy::proxy
  Etiquette: Synavera Script Etiquette — Rust Profile v1.1.1
  ------------------------------------------------------------
  Purpose:
    Forward catalog operations for every remaining product to
    the upstream catalog API; downloads redirect to the url the
    upstream metadata names.

  Security / Safety Notes:
    License ids are appended to redirect targets only, never
    logged unredacted.

  Dependencies:
    upstream catalog contract, urlencoding.

  Operational Scope:
    Default strategy.

  Revision History:
    2025-11-12 COD  Introduced upstream proxy strategy.
  ------------------------------------------------------------
  SSE Principles Observed:
    - Upstream status codes passed through unchanged
    - Metadata operations validate p, pv and m up front
============================================================*/

use std::sync::Arc;

use async_trait::async_trait;
use urlencoding::encode;

use super::{empty_filename, ProductStrategy};
use crate::catalog::{PackageCatalog, PackageMetadataRecord};
use crate::download::DownloadOutcome;
use crate::error::Result;
use crate::logger::{redact, RequestLog};
use crate::request::{Field, RequestDescriptor};
use crate::upstream::{CatalogApi, MetadataQuery};

const UPSTREAM_LICENSE_PARAM: &str = "licenseId";
const REQUIRED: [Field; 3] = [Field::Platform, Field::PlatformVersion, Field::Architecture];

pub struct UpstreamProxyStrategy {
    catalog: Arc<dyn CatalogApi>,
}

impl UpstreamProxyStrategy {
    pub fn new(catalog: Arc<dyn CatalogApi>) -> Self {
        Self { catalog }
    }

    fn query(request: &RequestDescriptor) -> MetadataQuery<'_> {
        MetadataQuery {
            channel: request.channel,
            product: &request.product,
            version: &request.version,
            platform: &request.platform,
            platform_version: &request.platform_version,
            architecture: &request.architecture,
        }
    }
}

/// Last path segment of `url`, ignoring any query or fragment.
fn file_name_of(url: &str) -> &str {
    let path = url.split(['?', '#']).next().unwrap_or_default();
    path.rsplit('/').next().unwrap_or_default()
}

/// Append the license to an upstream redirect in the package host's own
/// parameter name, which differs from the gateway's `license_id`.
fn with_license(url: String, license_id: &str) -> String {
    if license_id.is_empty() {
        return url;
    }
    let separator = if url.contains('?') { '&' } else { '?' };
    format!("{url}{separator}{UPSTREAM_LICENSE_PARAM}={}", encode(license_id))
}

#[async_trait]
impl ProductStrategy for UpstreamProxyStrategy {
    fn name(&self) -> &'static str {
        "upstream-proxy"
    }

    async fn latest_version(&self, request: &RequestDescriptor, _log: RequestLog<'_>) -> Result<String> {
        self.catalog.latest_version(request.channel, &request.product).await
    }

    async fn all_versions(&self, request: &RequestDescriptor, log: RequestLog<'_>) -> Result<Vec<String>> {
        log.debug(
            "UPSTREAM",
            format!("fetching versions for {} on {}", request.product, request.channel),
        );
        self.catalog.versions(request.channel, &request.product).await
    }

    async fn packages(&self, request: &RequestDescriptor, _log: RequestLog<'_>) -> Result<PackageCatalog> {
        self.catalog
            .packages(request.channel, &request.product, &request.version)
            .await
            .map(PackageCatalog::ByPlatformVersion)
    }

    async fn metadata(
        &self,
        request: &RequestDescriptor,
        _log: RequestLog<'_>,
    ) -> Result<PackageMetadataRecord> {
        request.require(&REQUIRED)?;
        self.catalog.metadata(Self::query(request)).await
    }

    async fn file_name(&self, request: &RequestDescriptor, log: RequestLog<'_>) -> Result<String> {
        let record = self.metadata(request, log).await?;
        let name = file_name_of(&record.url);
        if name.is_empty() {
            return Err(empty_filename());
        }
        Ok(name.to_string())
    }

    async fn download(&self, request: &RequestDescriptor, log: RequestLog<'_>) -> Result<DownloadOutcome> {
        let record = self.metadata(request, log).await?;
        if record.url.is_empty() {
            return Err(empty_filename());
        }
        if !request.license_id.is_empty() {
            log.debug(
                "UPSTREAM",
                format!("redirect carries license {}", redact(&request.license_id)),
            );
        }
        Ok(DownloadOutcome::Redirect(with_license(record.url, &request.license_id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GatewayError;
    use crate::logger::Logger;
    use crate::request::Channel;
    use crate::strategy::testing::FakeCatalog;
    use pretty_assertions::assert_eq;

    fn strategy(metadata_url: &str) -> UpstreamProxyStrategy {
        UpstreamProxyStrategy::new(Arc::new(FakeCatalog {
            metadata_url: metadata_url.into(),
            ..FakeCatalog::default()
        }))
    }

    fn request() -> RequestDescriptor {
        RequestDescriptor::new(Channel::Stable, "chef")
            .with_version("18.2.7")
            .with_target("ubuntu", "22.04", "x86_64")
    }

    #[test]
    fn file_name_ignores_query() {
        assert_eq!(file_name_of("https://up/files/chef_18.2.7-1_amd64.deb?x=1"), "chef_18.2.7-1_amd64.deb");
        assert_eq!(file_name_of("https://up/files/"), "");
    }

    #[tokio::test]
    async fn download_redirects_with_license() {
        let logger = Logger::quiet();
        let request = request().with_license("free-42");
        let outcome = strategy("https://up/files/chef.deb")
            .download(&request, logger.scope("t"))
            .await
            .unwrap();
        match outcome {
            DownloadOutcome::Redirect(url) => {
                assert_eq!(url, "https://up/files/chef.deb?licenseId=free-42")
            }
            other => panic!("unexpected outcome {other:?}"),
        }
    }

    #[test]
    fn license_joins_existing_query() {
        assert_eq!(
            with_license("https://up/f.deb?arch=x86_64".into(), "free 42"),
            "https://up/f.deb?arch=x86_64&licenseId=free%2042"
        );
        assert_eq!(with_license("https://up/f.deb".into(), ""), "https://up/f.deb");
    }

    #[tokio::test]
    async fn metadata_requires_platform_version() {
        let logger = Logger::quiet();
        let request = RequestDescriptor::new(Channel::Stable, "chef").with_target("ubuntu", "", "x86_64");
        let err = strategy("https://up/x")
            .metadata(&request, logger.scope("t"))
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::Validation { field: "pv", .. }));
    }

    #[tokio::test]
    async fn empty_metadata_url_is_empty_filename() {
        let logger = Logger::quiet();
        let err = strategy("").file_name(&request(), logger.scope("t")).await.unwrap_err();
        assert_eq!(err.failure().message, "Download filename is empty");
    }
}
