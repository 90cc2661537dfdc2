/*============================================================
  Synavera Project: Syn-Gate
  Module: syngate_core::portal
  Etiquette: Synavera Script Etiquette — Rust Profile v1.1.1
  ------------------------------------------------------------
  Purpose:
    Customer portal client: customer search by email and the
    authenticated artifact download for a customer channel.

  Security / Safety Notes:
    The vendor token and installation ids are sent as auth
    headers only; neither is logged or returned to callers.

  Dependencies:
    reqwest (stream feature) for HTTP, serde for payloads.

  Operational Scope:
    Steps two through four of the license-gated download.

  Revision History:
    2025-11-12 COD  Introduced customer portal client.
  ------------------------------------------------------------
  SSE Principles Observed:
    - Artifact bodies streamed, never buffered
    - Each failure mode maps to its own entitlement step
============================================================*/

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use serde::{Deserialize, Serialize};

use crate::config::PortalConfig;
use crate::download::ArtifactStream;
use crate::error::{GatewayError, Result};

pub const BACKEND: &str = "customer portal";
const AIRGAP_MARKER: &str = "airgap";

/// Release channel a customer is entitled to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct CustomerChannel {
    #[serde(default)]
    pub id: String,
    #[serde(default, rename = "appSlug")]
    pub app_slug: String,
    #[serde(default, rename = "channelSlug")]
    pub channel_slug: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Customer {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub airgap: bool,
    #[serde(default, rename = "installationId")]
    pub installation_id: String,
    #[serde(default)]
    pub channels: Vec<CustomerChannel>,
}

impl Customer {
    /// Download url for the customer's first channel.
    ///
    /// None when the channel or either slug is missing.
    pub fn download_url(&self, base_url: &str) -> Option<String> {
        let channel = self.channels.first()?;
        if channel.app_slug.is_empty() || channel.channel_slug.is_empty() {
            return None;
        }
        let mut url = format!(
            "{}/{}/{}",
            base_url.trim_end_matches('/'),
            channel.app_slug,
            channel.channel_slug
        );
        if self.airgap {
            url.push('/');
            url.push_str(AIRGAP_MARKER);
        }
        Some(url)
    }
}

#[derive(Debug, Serialize)]
struct SearchRequest<'a> {
    app_id: &'a str,
    include_trial: bool,
    include_community: bool,
    include_paid: bool,
    include_dev: bool,
    include_active: bool,
    include_inactive: bool,
    query: String,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    customers: Vec<Customer>,
}

/// Customer portal contract.
#[async_trait]
pub trait CustomerPortal: Send + Sync {
    async fn search_by_email(&self, email: &str) -> Result<Vec<Customer>>;

    /// Stream the artifact at `url` authenticated as `installation_id`.
    async fn download(&self, url: &str, installation_id: &str) -> Result<ArtifactStream>;

    /// Root url that customer download paths hang off.
    fn download_root(&self) -> &str;
}

/// HTTP client for the customer portal.
#[derive(Clone)]
pub struct PortalClient {
    client: reqwest::Client,
    config: PortalConfig,
}

impl PortalClient {
    pub fn new(config: &PortalConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout))
            .user_agent(concat!("Syn-Gate-Core/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|err| GatewayError::Config(format!("Failed to build HTTP client: {err}")))?;
        Ok(Self {
            client,
            config: config.clone(),
        })
    }
}

/// Non-2xx responses become `Upstream` errors carrying the portal's body.
async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let message = response.text().await.unwrap_or_default();
    Err(GatewayError::Upstream {
        status: status.as_u16(),
        message,
    })
}

#[async_trait]
impl CustomerPortal for PortalClient {
    async fn search_by_email(&self, email: &str) -> Result<Vec<Customer>> {
        let url = format!("{}/customers/search", self.config.base_url.trim_end_matches('/'));
        let payload = SearchRequest {
            app_id: &self.config.app_id,
            include_trial: true,
            include_community: true,
            include_paid: true,
            include_dev: true,
            include_active: true,
            include_inactive: true,
            query: format!("email:{email}"),
        };
        let response = self
            .client
            .post(url)
            .header(ACCEPT, "application/json")
            .header(CONTENT_TYPE, "application/json")
            .header(AUTHORIZATION, &self.config.token)
            .json(&payload)
            .send()
            .await
            .map_err(|err| GatewayError::backend(BACKEND, format!("customer search failed: {err}")))?;
        let response = ensure_success(response).await?;
        let body: SearchResponse = response.json().await.map_err(|err| {
            GatewayError::Serialization(format!("Failed to decode customer search: {err}"))
        })?;
        Ok(body.customers)
    }

    async fn download(&self, url: &str, installation_id: &str) -> Result<ArtifactStream> {
        let response = self
            .client
            .get(url)
            .bearer_auth(installation_id)
            .send()
            .await
            .map_err(|err| GatewayError::backend(BACKEND, format!("artifact request failed: {err}")))?;
        let response = ensure_success(response).await?;
        Ok(ArtifactStream::from_response(response, BACKEND))
    }

    fn download_root(&self) -> &str {
        &self.config.download_url
    }
}
