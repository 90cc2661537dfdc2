/*============================================================
  Synavera Project: Syn-Gate
  Module: syngate_core::gateway
  Etiquette: Synavera Script Etiquette — Rust Profile v1.1.1
  ------------------------------------------------------------
  Purpose:
    Request-level use cases: pick the product and persona
    strategies, fetch and filter versions, resolve the requested
    version, delegate to the backend, and rewrite returned urls
    onto this gateway.

  Security / Safety Notes:
    Failures are logged with their detail under the request id;
    callers receive only the status and message pair.

  Dependencies:
    strategy family, resolver, registry, logger.

  Operational Scope:
    Invoked by the CLI or a routing layer, once per request.

  Revision History:
    2025-11-12 COD  Introduced catalog resolution use cases.
  ------------------------------------------------------------
  SSE Principles Observed:
    - Short-circuit on first failure, no partial results
    - Request context passed explicitly, no ambient state
============================================================*/

use std::sync::Arc;

use crate::catalog::{PackageCatalog, PackageMetadataRecord};
use crate::download::DownloadOutcome;
use crate::error::{GatewayError, Result};
use crate::kv;
use crate::logger::{redact, Logger, RequestLog};
use crate::registry;
use crate::request::{RequestContext, RequestDescriptor};
use crate::resolver::resolve;
use crate::strategy::{
    select_mode_strategy, select_product_strategy, ModeStrategy, Persona, ProductStrategy,
    ProductStrategyDeps, KEY_VALUE_PRODUCTS, PLATFORM_SERVICE_PRODUCT,
};
use crate::upstream::PlatformList;

const LEGACY_AUTOMATE: &str = "automate-1";
const KEY_VALUE_PLATFORMS: [(&str, &str); 3] = [
    ("linux", "Linux"),
    ("linux-kernel2", "Linux Kernel 2"),
    ("darwin", "Darwin"),
];

/// Resolution orchestrator shared by every request.
pub struct Gateway {
    deps: ProductStrategyDeps,
    persona: Persona,
    logger: Arc<Logger>,
}

impl Gateway {
    pub fn new(deps: ProductStrategyDeps, logger: Arc<Logger>) -> Self {
        let persona = deps.config.gateway.persona;
        Self {
            deps,
            persona,
            logger,
        }
    }

    pub fn persona(&self) -> Persona {
        self.persona
    }

    fn mode(&self) -> &'static dyn ModeStrategy {
        select_mode_strategy(self.persona)
    }

    fn product_strategy(&self, request: &RequestDescriptor) -> Box<dyn ProductStrategy> {
        select_product_strategy(&request.product, request.channel, &self.deps)
    }

    /// Log a failed operation with its detail before it reaches the caller.
    fn finish<T>(log: RequestLog<'_>, operation: &str, result: Result<T>) -> Result<T> {
        if let Err(err) = &result {
            let failure = err.failure();
            log.error(
                "GATEWAY",
                format!("{operation} failed ({}): {err}", failure.status),
            );
        }
        result
    }

    /// Explicit requests for an EOL version need the eol override.
    fn check_end_of_life(&self, request: &RequestDescriptor) -> Result<()> {
        if self.persona == Persona::Opensource || request.eol || request.wants_latest() {
            return Ok(());
        }
        if registry::is_end_of_life(&request.product, &request.version) {
            return Err(GatewayError::validation(
                "v",
                format!(
                    "{} version {} is EOL, must be {}",
                    request.product,
                    request.version,
                    registry::supported_range_description(&request.product)
                ),
            ));
        }
        Ok(())
    }

    /// Steps two through four: fetch, filter, resolve.
    async fn resolve_version(
        &self,
        strategy: &dyn ProductStrategy,
        request: &RequestDescriptor,
        log: RequestLog<'_>,
    ) -> Result<String> {
        self.check_end_of_life(request)?;
        let versions = strategy.all_versions(request, log).await?;
        if versions.is_empty() {
            return Err(GatewayError::NoCandidates);
        }
        let filtered = self.mode().filter_versions(versions, &request.product, request.eol);
        if filtered.is_empty() {
            return Err(GatewayError::NoVersionsForPersona);
        }
        let resolved = resolve(&request.version, &filtered)?;
        log.debug(
            "RESOLVE",
            format!(
                "{} {:?} resolved to {resolved} via {}",
                request.product,
                request.version,
                strategy.name()
            ),
        );
        Ok(resolved)
    }

    /// Descriptor with the version pinned to what the caller is allowed.
    async fn resolved_request(
        &self,
        strategy: &dyn ProductStrategy,
        request: &RequestDescriptor,
        log: RequestLog<'_>,
    ) -> Result<RequestDescriptor> {
        let version = self.resolve_version(strategy, request, log).await?;
        Ok(request.clone().with_version(version))
    }

    pub async fn latest_version(&self, ctx: &RequestContext, request: &RequestDescriptor) -> Result<String> {
        let log = self.logger.scope(&ctx.request_id);
        let result: Result<String> = async {
            let strategy = self.product_strategy(request);
            let latest = strategy.latest_version(request, log).await?;
            let visible = self
                .mode()
                .filter_versions(vec![latest.clone()], &request.product, request.eol);
            if visible.contains(&latest) {
                return Ok(latest);
            }
            let newest_allowed = RequestDescriptor {
                version: String::new(),
                ..request.clone()
            };
            self.resolve_version(strategy.as_ref(), &newest_allowed, log).await
        }
        .await;
        Self::finish(log, "latest_version", result)
    }

    pub async fn all_versions(
        &self,
        ctx: &RequestContext,
        request: &RequestDescriptor,
    ) -> Result<Vec<String>> {
        let log = self.logger.scope(&ctx.request_id);
        let result: Result<Vec<String>> = async {
            let strategy = self.product_strategy(request);
            let versions = strategy.all_versions(request, log).await?;
            let filtered = self.mode().filter_versions(versions, &request.product, request.eol);
            if filtered.is_empty() {
                return Err(GatewayError::NoVersionsForPersona);
            }
            Ok(filtered)
        }
        .await;
        Self::finish(log, "all_versions", result)
    }

    pub async fn packages(&self, ctx: &RequestContext, request: &RequestDescriptor) -> Result<PackageCatalog> {
        let log = self.logger.scope(&ctx.request_id);
        let result: Result<PackageCatalog> = async {
            let strategy = self.product_strategy(request);
            let resolved = self.resolved_request(strategy.as_ref(), request, log).await?;
            let mut catalog = strategy.packages(&resolved, log).await?;
            strategy.update_package_urls(&mut catalog, &resolved, &ctx.base_url);
            log.info(
                "PACKAGES",
                format!("{} {} -> {} packages", resolved.product, resolved.version, catalog.len()),
            );
            Ok(catalog)
        }
        .await;
        Self::finish(log, "packages", result)
    }

    pub async fn metadata(
        &self,
        ctx: &RequestContext,
        request: &RequestDescriptor,
    ) -> Result<PackageMetadataRecord> {
        let log = self.logger.scope(&ctx.request_id);
        let result = self.metadata_scoped(ctx, request, log).await;
        Self::finish(log, "metadata", result)
    }

    async fn metadata_scoped(
        &self,
        ctx: &RequestContext,
        request: &RequestDescriptor,
        log: RequestLog<'_>,
    ) -> Result<PackageMetadataRecord> {
        let strategy = self.product_strategy(request);
        let resolved = self.resolved_request(strategy.as_ref(), request, log).await?;
        let mut record = strategy.metadata(&resolved, log).await?;
        if record.version.is_empty() {
            record.version = resolved.version.clone();
        }
        let link = RequestDescriptor {
            version: record.version.clone(),
            ..resolved
        };
        record.url = link.download_url(&ctx.base_url);
        Ok(record)
    }

    pub async fn file_name(&self, ctx: &RequestContext, request: &RequestDescriptor) -> Result<String> {
        let log = self.logger.scope(&ctx.request_id);
        let result: Result<String> = async {
            let strategy = self.product_strategy(request);
            let resolved = self.resolved_request(strategy.as_ref(), request, log).await?;
            strategy.file_name(&resolved, log).await
        }
        .await;
        Self::finish(log, "file_name", result)
    }

    /// Redirect target, streamed artifact, or metadata document.
    ///
    /// A `.metadata.json` suffix on any target field asks for the
    /// metadata of the download instead of the artifact.
    pub async fn download(&self, ctx: &RequestContext, request: &RequestDescriptor) -> Result<DownloadOutcome> {
        let log = self.logger.scope(&ctx.request_id);
        let result: Result<DownloadOutcome> = async {
            let mut request = request.clone();
            if request.take_metadata_suffix() {
                return self
                    .metadata_scoped(ctx, &request, log)
                    .await
                    .map(DownloadOutcome::Metadata);
            }
            if self.persona == Persona::Commercial
                && request.product == PLATFORM_SERVICE_PRODUCT
                && !request.license_id.is_empty()
            {
                self.check_license(&request, log).await?;
            }
            let strategy = self.product_strategy(&request);
            let resolved = self.resolved_request(strategy.as_ref(), &request, log).await?;
            let outcome = strategy.download(&resolved, log).await?;
            if let DownloadOutcome::Redirect(url) = &outcome {
                log.info("DOWNLOAD", format!("{} {} redirect {url}", resolved.product, resolved.version));
            }
            Ok(outcome)
        }
        .await;
        Self::finish(log, "download", result)
    }

    async fn check_license(&self, request: &RequestDescriptor, log: RequestLog<'_>) -> Result<()> {
        let valid = self.deps.license.validate(&request.license_id).await?;
        if valid {
            log.debug("LICENSE", format!("license {} valid", redact(&request.license_id)));
            Ok(())
        } else {
            log.warn("LICENSE", format!("license {} rejected", redact(&request.license_id)));
            Err(GatewayError::validation("license_id", "License id is not valid"))
        }
    }

    /// Product ids visible to this persona.
    pub async fn products(&self, ctx: &RequestContext, eol: bool) -> Result<Vec<String>> {
        let log = self.logger.scope(&ctx.request_id);
        let result: Result<Vec<String>> = async {
            let mut products = self.deps.catalog.products(eol).await?;
            products.extend(KEY_VALUE_PRODUCTS.iter().map(|product| product.to_string()));
            if eol {
                products.push(LEGACY_AUTOMATE.to_string());
            }
            let products_config = &self.deps.config.products;
            if products_config.enterprise_enabled {
                products.extend(products_config.enterprise.iter().cloned());
            } else {
                products.retain(|product| !products_config.is_enterprise(product));
            }
            products.sort();
            products.dedup();
            Ok(self.mode().filter_products(products, eol))
        }
        .await;
        Self::finish(log, "products", result)
    }

    pub async fn platforms(&self, ctx: &RequestContext) -> Result<PlatformList> {
        let log = self.logger.scope(&ctx.request_id);
        let result = self.deps.catalog.platforms().await.map(|mut platforms| {
            for (id, name) in KEY_VALUE_PLATFORMS {
                platforms.insert(id.to_string(), name.to_string());
            }
            platforms
        });
        Self::finish(log, "platforms", result)
    }

    pub async fn architectures(&self, ctx: &RequestContext) -> Result<Vec<String>> {
        let log = self.logger.scope(&ctx.request_id);
        let result = self.deps.catalog.architectures().await;
        Self::finish(log, "architectures", result)
    }

    pub async fn package_managers(&self, ctx: &RequestContext) -> Result<Vec<String>> {
        let log = self.logger.scope(&ctx.request_id);
        let table = &self.deps.config.store.package_managers_table;
        let result = kv::package_managers(self.deps.store.as_ref(), table).await;
        Self::finish(log, "package_managers", result)
    }
}
