/*============================================================
  Synavera Project: Syn-Gate
  Module: syngate_core::strategy::platform
  Etiquette: Synavera Script Etiquette — Rust Profile v1.1.1
  ------------------------------------------------------------
  Purpose:
    Serve the platform pseudo-product: canned catalog answers in
    commercial deployments and a license-gated streaming
    download through the customer portal.

  Security / Safety Notes:
    Every entitlement failure is logged with its detail and
    returned as a fixed message. License ids are redacted in
    log lines; installation ids are never logged.

  Dependencies:
    license and portal collaborators.

  Operational Scope:
    chef-360 only.

  Revision History:
    2025-11-12 COD  Introduced platform service strategy.
  ------------------------------------------------------------
  SSE Principles Observed:
    - Linear pipeline of fallible steps, no retries
    - Commercial-only gate checked before any work
============================================================*/

use std::sync::Arc;

use async_trait::async_trait;

use super::mode::{Persona, PLATFORM_SERVICE_PRODUCT};
use super::ProductStrategy;
use crate::catalog::{PackageCatalog, PackageMetadataRecord, PlatformVersionTree};
use crate::download::{ArtifactStream, DownloadOutcome, CONTENT_DISPOSITION};
use crate::error::{EntitlementStep, GatewayError, Result};
use crate::license::LicenseService;
use crate::logger::{redact, RequestLog};
use crate::portal::CustomerPortal;
use crate::request::{RequestDescriptor, LATEST};

pub const PLATFORM_ERROR: &str = "chef-360 not available for the trial and opensource";
pub const PLATFORM_CONTENT_DISPOSITION: &str = "attachment;filename=chef-360.tar.gz";
const PLATFORM: &str = "linux";
const PLATFORM_VERSION: &str = "pv";
const ARCHITECTURE: &str = "amd64";

pub struct PlatformServiceStrategy {
    persona: Persona,
    license: Arc<dyn LicenseService>,
    portal: Arc<dyn CustomerPortal>,
}

impl PlatformServiceStrategy {
    pub fn new(persona: Persona, license: Arc<dyn LicenseService>, portal: Arc<dyn CustomerPortal>) -> Self {
        Self {
            persona,
            license,
            portal,
        }
    }

    fn ensure_commercial(&self) -> Result<()> {
        if self.persona == Persona::Commercial {
            Ok(())
        } else {
            Err(GatewayError::Unsupported(PLATFORM_ERROR.to_string()))
        }
    }

    fn version_of(request: &RequestDescriptor) -> String {
        if request.version.is_empty() {
            LATEST.to_string()
        } else {
            request.version.clone()
        }
    }

    /// License id → customer email → customer → channel url → artifact.
    async fn entitled_download(&self, license_id: &str, log: RequestLog<'_>) -> Result<ArtifactStream> {
        let fail = |step: EntitlementStep| {
            move |err: GatewayError| {
                log.error("PLATFORM_DOWNLOAD", format!("{step:?} failed: {err}"));
                GatewayError::Entitlement(step)
            }
        };

        let email = self
            .license
            .customer_email(license_id)
            .await
            .map_err(fail(EntitlementStep::LicenseLookup))?;
        log.debug("PLATFORM_DOWNLOAD", "customer email resolved");

        let customer = self
            .portal
            .search_by_email(&email)
            .await
            .map_err(fail(EntitlementStep::CustomerSearch))?
            .into_iter()
            .next()
            .ok_or_else(|| {
                log.error("PLATFORM_DOWNLOAD", "no customer matches the license email");
                GatewayError::Entitlement(EntitlementStep::CustomerNotFound)
            })?;

        let url = customer
            .download_url(self.portal.download_root())
            .ok_or_else(|| {
                log.error("PLATFORM_DOWNLOAD", format!("customer {} has no channel slugs", customer.id));
                GatewayError::Entitlement(EntitlementStep::ChannelMissing)
            })?;
        log.info("PLATFORM_DOWNLOAD", format!("download url formulated for customer {}", customer.id));

        let mut artifact = self
            .portal
            .download(&url, &customer.installation_id)
            .await
            .map_err(fail(EntitlementStep::ArtifactFetch))?;
        artifact.default_header(CONTENT_DISPOSITION, PLATFORM_CONTENT_DISPOSITION);
        Ok(artifact)
    }
}

#[async_trait]
impl ProductStrategy for PlatformServiceStrategy {
    fn name(&self) -> &'static str {
        "platform-service"
    }

    async fn latest_version(&self, _request: &RequestDescriptor, _log: RequestLog<'_>) -> Result<String> {
        self.ensure_commercial()?;
        Ok(LATEST.to_string())
    }

    async fn all_versions(&self, _request: &RequestDescriptor, _log: RequestLog<'_>) -> Result<Vec<String>> {
        self.ensure_commercial()?;
        Ok(vec![LATEST.to_string()])
    }

    async fn packages(&self, request: &RequestDescriptor, _log: RequestLog<'_>) -> Result<PackageCatalog> {
        self.ensure_commercial()?;
        let mut tree = PlatformVersionTree::new();
        PackageCatalog::insert_platform_version(
            &mut tree,
            PLATFORM,
            PLATFORM_VERSION,
            ARCHITECTURE,
            PackageMetadataRecord::new("", "", Self::version_of(request)),
        );
        Ok(PackageCatalog::ByPlatformVersion(tree))
    }

    async fn metadata(
        &self,
        request: &RequestDescriptor,
        _log: RequestLog<'_>,
    ) -> Result<PackageMetadataRecord> {
        self.ensure_commercial()?;
        Ok(PackageMetadataRecord::new("", "", Self::version_of(request)))
    }

    async fn file_name(&self, _request: &RequestDescriptor, _log: RequestLog<'_>) -> Result<String> {
        self.ensure_commercial()?;
        Ok(format!("{PLATFORM_SERVICE_PRODUCT}.zip"))
    }

    async fn download(&self, request: &RequestDescriptor, log: RequestLog<'_>) -> Result<DownloadOutcome> {
        self.ensure_commercial()?;
        if request.license_id.is_empty() {
            return Err(GatewayError::validation(
                "license_id",
                "License id (license_id) params cannot be empty",
            ));
        }
        log.info(
            "PLATFORM_DOWNLOAD",
            format!("starting entitled download for license {}", redact(&request.license_id)),
        );
        self.entitled_download(&request.license_id, log)
            .await
            .map(DownloadOutcome::Stream)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logger::Logger;
    use crate::portal::{Customer, CustomerChannel};
    use crate::request::Channel;
    use crate::strategy::testing::{FakeLicense, FakePortal};

    fn customer() -> Customer {
        Customer {
            id: "c-1".into(),
            email: "ops@example.com".into(),
            airgap: false,
            installation_id: "inst-9".into(),
            channels: vec![CustomerChannel {
                id: "ch".into(),
                app_slug: "chef-360".into(),
                channel_slug: "stable".into(),
            }],
        }
    }

    fn strategy(persona: Persona, license_ok: bool, customers: Vec<Customer>) -> (PlatformServiceStrategy, Arc<FakePortal>) {
        with_portal(
            persona,
            license_ok,
            FakePortal {
                customers,
                ..FakePortal::default()
            },
        )
    }

    fn with_portal(persona: Persona, license_ok: bool, portal: FakePortal) -> (PlatformServiceStrategy, Arc<FakePortal>) {
        let portal = Arc::new(FakePortal {
            headers: vec![("content-type".into(), "application/gzip".into())],
            ..portal
        });
        let license = Arc::new(FakeLicense {
            email: if license_ok {
                Ok("ops@example.com".into())
            } else {
                Err(GatewayError::NoCandidates)
            },
            valid: license_ok,
        });
        (PlatformServiceStrategy::new(persona, license, portal.clone()), portal)
    }

    fn request() -> RequestDescriptor {
        RequestDescriptor::new(Channel::Stable, PLATFORM_SERVICE_PRODUCT).with_license("tmns-1234-abcd")
    }

    #[tokio::test]
    async fn non_commercial_personas_are_refused() {
        let logger = Logger::quiet();
        for persona in [Persona::Trial, Persona::Opensource] {
            let (strategy, _) = strategy(persona, true, vec![customer()]);
            let err = strategy.all_versions(&request(), logger.scope("t")).await.unwrap_err();
            assert_eq!(err.failure().message, PLATFORM_ERROR);
            assert_eq!(err.status(), 400);
            assert!(strategy.download(&request(), logger.scope("t")).await.is_err());
        }
    }

    #[tokio::test]
    async fn canned_answers_in_commercial_mode() {
        let logger = Logger::quiet();
        let (strategy, _) = strategy(Persona::Commercial, true, vec![]);
        let scope = logger.scope("t");
        assert_eq!(strategy.all_versions(&request(), scope).await.unwrap(), vec!["latest"]);
        assert_eq!(strategy.file_name(&request(), scope).await.unwrap(), "chef-360.zip");
        let catalog = strategy.packages(&request(), scope).await.unwrap();
        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog.records()[0].version, "latest");
    }

    #[tokio::test]
    async fn entitled_download_streams_with_disposition() {
        let logger = Logger::quiet();
        let (strategy, portal) = strategy(Persona::Commercial, true, vec![customer()]);
        let outcome = strategy.download(&request(), logger.scope("t")).await.unwrap();
        let DownloadOutcome::Stream(artifact) = outcome else {
            panic!("expected stream");
        };
        assert_eq!(artifact.header(CONTENT_DISPOSITION), Some(PLATFORM_CONTENT_DISPOSITION));
        assert_eq!(artifact.header("content-type"), Some("application/gzip"));
        let downloads = portal.downloads.lock().unwrap();
        assert_eq!(
            downloads.as_slice(),
            &[(
                "https://portal.example/embedded/chef-360/stable".to_string(),
                "inst-9".to_string()
            )]
        );
    }

    #[tokio::test]
    async fn each_step_fails_distinctly() {
        let logger = Logger::quiet();

        let (lookup_fails, _) = strategy(Persona::Commercial, false, vec![customer()]);
        let err = lookup_fails.download(&request(), logger.scope("t")).await.unwrap_err();
        assert!(matches!(err, GatewayError::Entitlement(EntitlementStep::LicenseLookup)));
        assert!(!err.failure().message.contains("tmns"));

        let (no_customer, _) = strategy(Persona::Commercial, true, vec![]);
        let err = no_customer.download(&request(), logger.scope("t")).await.unwrap_err();
        assert!(matches!(err, GatewayError::Entitlement(EntitlementStep::CustomerNotFound)));

        let mut slugless = customer();
        slugless.channels[0].app_slug.clear();
        let (no_channel, portal) = strategy(Persona::Commercial, true, vec![slugless]);
        let err = no_channel.download(&request(), logger.scope("t")).await.unwrap_err();
        assert!(matches!(err, GatewayError::Entitlement(EntitlementStep::ChannelMissing)));
        assert!(portal.downloads.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn search_transport_failure_differs_from_no_customer() {
        let logger = Logger::quiet();
        let (search_fails, portal) = with_portal(
            Persona::Commercial,
            true,
            FakePortal {
                customers: vec![customer()],
                search_fails: true,
                ..FakePortal::default()
            },
        );
        let err = search_fails.download(&request(), logger.scope("t")).await.unwrap_err();
        assert!(matches!(err, GatewayError::Entitlement(EntitlementStep::CustomerSearch)));
        assert!(!err.failure().message.contains("connection refused"));
        assert!(portal.downloads.lock().unwrap().is_empty());

        let (no_customer, _) = strategy(Persona::Commercial, true, vec![]);
        let err = no_customer.download(&request(), logger.scope("t")).await.unwrap_err();
        assert!(matches!(err, GatewayError::Entitlement(EntitlementStep::CustomerNotFound)));
    }

    #[tokio::test]
    async fn artifact_fetch_failure_is_its_own_step() {
        let logger = Logger::quiet();
        let (fetch_fails, portal) = with_portal(
            Persona::Commercial,
            true,
            FakePortal {
                customers: vec![customer()],
                download_fails: true,
                ..FakePortal::default()
            },
        );
        let err = fetch_fails.download(&request(), logger.scope("t")).await.unwrap_err();
        assert!(matches!(err, GatewayError::Entitlement(EntitlementStep::ArtifactFetch)));
        assert_eq!(err.status(), 500);
        assert!(!err.failure().message.contains("installation not entitled"));
        assert_eq!(portal.downloads.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn step_detail_reaches_the_log() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gate.log");
        let logger = Logger::new(Some(path.clone()), false).unwrap();
        let (fetch_fails, _) = with_portal(
            Persona::Commercial,
            true,
            FakePortal {
                customers: vec![customer()],
                download_fails: true,
                ..FakePortal::default()
            },
        );
        assert!(fetch_fails.download(&request(), logger.scope("req-7")).await.is_err());
        logger.finalize().unwrap();
        let log = std::fs::read_to_string(&path).unwrap();
        assert!(log.contains("req=req-7"));
        assert!(log.contains("ArtifactFetch failed"));
        assert!(log.contains("installation not entitled"));
    }

    #[tokio::test]
    async fn download_needs_license_id() {
        let logger = Logger::quiet();
        let (strategy, _) = strategy(Persona::Commercial, true, vec![customer()]);
        let request = RequestDescriptor::new(Channel::Stable, PLATFORM_SERVICE_PRODUCT);
        let err = strategy.download(&request, logger.scope("t")).await.unwrap_err();
        assert!(matches!(err, GatewayError::Validation { field: "license_id", .. }));
    }
}
