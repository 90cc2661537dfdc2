/*============================================================
  Synavera Project: Syn-Gate
  Module: syngate_core::upstream
  Etiquette: Synavera Script Etiquette — Rust Profile v1.1.1
  ------------------------------------------------------------
  Purpose:
    Query the upstream catalog HTTP API for products, platforms,
    versions, packages and package metadata.

  Security / Safety Notes:
    Performs read-only HTTPS requests. No credentials are
    transmitted to the catalog.

  Dependencies:
    reqwest for HTTP, serde for response parsing, urlencoding
    for query values.

  Operational Scope:
    Backs the default proxy strategy and the product, platform
    and architecture listings.

  Revision History:
    2024-11-04 COD  Implemented asynchronous AUR client.
    2025-11-12 COD  Repointed at the upstream catalog API.
  ------------------------------------------------------------
  SSE Principles Observed:
    - Structured response parsing with explicit error paths
    - Upstream status codes preserved for callers
    - Configurable timeouts
============================================================*/

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::ACCEPT;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;

use crate::catalog::{PackageMetadataRecord, PlatformVersionTree};
use crate::config::UpstreamConfig;
use crate::error::{GatewayError, Result, STATUS_BAD_REQUEST};
use crate::request::{encode_query, Channel};

pub const BACKEND: &str = "upstream catalog";
pub const DATA_NOT_FOUND: &str = "Requested data is not found. Please check the input parameters";

/// Platform id → display name.
pub type PlatformList = BTreeMap<String, String>;

/// Target tuple for a metadata lookup.
#[derive(Debug, Clone, Copy)]
pub struct MetadataQuery<'a> {
    pub channel: Channel,
    pub product: &'a str,
    pub version: &'a str,
    pub platform: &'a str,
    pub platform_version: &'a str,
    pub architecture: &'a str,
}

/// Upstream catalog contract.
#[async_trait]
pub trait CatalogApi: Send + Sync {
    async fn products(&self, eol: bool) -> Result<Vec<String>>;
    async fn platforms(&self) -> Result<PlatformList>;
    async fn architectures(&self) -> Result<Vec<String>>;
    async fn latest_version(&self, channel: Channel, product: &str) -> Result<String>;
    async fn versions(&self, channel: Channel, product: &str) -> Result<Vec<String>>;
    async fn packages(&self, channel: Channel, product: &str, version: &str) -> Result<PlatformVersionTree>;
    async fn metadata(&self, query: MetadataQuery<'_>) -> Result<PackageMetadataRecord>;
}

/// Client for the upstream catalog API.
#[derive(Clone)]
pub struct UpstreamCatalogClient {
    client: reqwest::Client,
    base_url: String,
}

impl UpstreamCatalogClient {
    /// Construct a new client from configuration.
    pub fn new(config: &UpstreamConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout))
            .user_agent(concat!("Syn-Gate-Core/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|err| GatewayError::Config(format!("Failed to build HTTP client: {err}")))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = format!("{}{path}", self.base_url);
        let response = self
            .client
            .get(&url)
            .header(ACCEPT, "application/json")
            .send()
            .await
            .map_err(|err| GatewayError::backend(BACKEND, format!("request to {url} failed: {err}")))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(GatewayError::NotFound {
                status: STATUS_BAD_REQUEST,
                message: DATA_NOT_FOUND.to_string(),
            });
        }
        if status.is_client_error() || status.is_server_error() {
            let message = response.text().await.unwrap_or_default();
            return Err(GatewayError::Upstream {
                status: status.as_u16(),
                message,
            });
        }

        response.json::<T>().await.map_err(|err| {
            GatewayError::Serialization(format!("Failed to decode catalog response from {url}: {err}"))
        })
    }
}

#[async_trait]
impl CatalogApi for UpstreamCatalogClient {
    async fn products(&self, eol: bool) -> Result<Vec<String>> {
        let path = if eol { "/products?eol=true" } else { "/products" };
        self.get_json(path).await
    }

    async fn platforms(&self) -> Result<PlatformList> {
        self.get_json("/platforms").await
    }

    async fn architectures(&self) -> Result<Vec<String>> {
        self.get_json("/architectures").await
    }

    async fn latest_version(&self, channel: Channel, product: &str) -> Result<String> {
        self.get_json(&format!("/{channel}/{product}/versions/latest")).await
    }

    async fn versions(&self, channel: Channel, product: &str) -> Result<Vec<String>> {
        self.get_json(&format!("/{channel}/{product}/versions/all")).await
    }

    async fn packages(&self, channel: Channel, product: &str, version: &str) -> Result<PlatformVersionTree> {
        let query = encode_query(&[("v", version)]);
        self.get_json(&format!("/{channel}/{product}/packages?{query}")).await
    }

    async fn metadata(&self, query: MetadataQuery<'_>) -> Result<PackageMetadataRecord> {
        let params = encode_query(&[
            ("v", query.version),
            ("p", query.platform),
            ("pv", query.platform_version),
            ("m", query.architecture),
        ]);
        self.get_json(&format!("/{}/{}/metadata?{params}", query.channel, query.product))
            .await
    }
}
