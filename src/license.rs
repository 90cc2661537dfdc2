/*============================================================
  Synavera Project: Syn-Gate
  Module: syngate_core::license
  Etiquette: Synavera Script Etiquette — Rust Profile v1.1.1
  ------------------------------------------------------------
  Purpose:
    Client for the license service: license validation and the
    license id → customer email exchange.

  Security / Safety Notes:
    License ids travel only in the request query to the license
    service; error details never include them.

  Dependencies:
    reqwest for HTTP, serde for response parsing.

  Operational Scope:
    Gates platform service downloads.

  Revision History:
    2025-11-12 COD  Introduced license service client.
  ------------------------------------------------------------
  SSE Principles Observed:
    - Non-2xx and undecodable responses are immediate failures
    - Response status embedded in the body is honoured
============================================================*/

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::ACCEPT;
use serde::Deserialize;
use serde_json::Value;

use crate::config::LicenseConfig;
use crate::error::{GatewayError, Result, STATUS_OK};
use crate::request::encode_query;

pub const BACKEND: &str = "license service";

/// License service contract.
#[async_trait]
pub trait LicenseService: Send + Sync {
    /// Whether the license id is currently valid.
    async fn validate(&self, license_id: &str) -> Result<bool>;

    /// Customer email registered for the license id.
    async fn customer_email(&self, license_id: &str) -> Result<String>;
}

#[derive(Debug, Deserialize)]
struct ValidateResponse {
    #[serde(default)]
    data: bool,
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
struct CustomerEmailResponse {
    #[serde(default, rename = "replicatedEmail")]
    email: String,
    #[serde(default)]
    message: String,
    #[serde(default)]
    status_code: Option<Value>,
}

impl CustomerEmailResponse {
    /// Embedded status, accepted as a number or a numeric string.
    fn status(&self) -> Option<u16> {
        match self.status_code.as_ref()? {
            Value::Number(number) => number.as_u64().and_then(|n| u16::try_from(n).ok()),
            Value::String(text) => text.trim().parse().ok(),
            _ => None,
        }
    }
}

/// HTTP client for the license service.
#[derive(Clone)]
pub struct LicenseClient {
    client: reqwest::Client,
    base_url: String,
}

impl LicenseClient {
    pub fn new(config: &LicenseConfig) -> Result<Self> {
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

    async fn get(&self, path: &str, license_id: &str) -> Result<reqwest::Response> {
        let url = format!(
            "{}{path}?{}",
            self.base_url,
            encode_query(&[("licenseId", license_id)])
        );
        self.client
            .get(url)
            .header(ACCEPT, "application/json")
            .send()
            .await
            .map_err(|err| GatewayError::backend(BACKEND, format!("request to {path} failed: {err}")))
    }
}

#[async_trait]
impl LicenseService for LicenseClient {
    async fn validate(&self, license_id: &str) -> Result<bool> {
        let response = self.get("/v1/validate", license_id).await?;
        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(GatewayError::Upstream {
                status: status.as_u16(),
                message,
            });
        }
        let body: ValidateResponse = response.json().await.map_err(|err| {
            GatewayError::Serialization(format!("Failed to decode license validation: {err}"))
        })?;
        if !body.data && !body.message.is_empty() {
            return Err(GatewayError::Unsupported(body.message));
        }
        Ok(body.data)
    }

    async fn customer_email(&self, license_id: &str) -> Result<String> {
        let response = self.get("/v1/getReplicatedCustomer", license_id).await?;
        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(GatewayError::Upstream {
                status: status.as_u16(),
                message,
            });
        }
        let body: CustomerEmailResponse = response.json().await.map_err(|err| {
            GatewayError::Serialization(format!("Failed to decode customer email response: {err}"))
        })?;
        interpret_customer_email(body)
    }
}

/// Email from a lookup body; embedded failures keep their status and message.
fn interpret_customer_email(body: CustomerEmailResponse) -> Result<String> {
    if let Some(status) = body.status().filter(|status| *status != STATUS_OK) {
        return Err(GatewayError::backend(
            BACKEND,
            format!("customer lookup returned status {status}: {}", body.message),
        ));
    }
    if body.email.trim().is_empty() {
        return Err(GatewayError::backend(BACKEND, "customer lookup returned no email"));
    }
    Ok(body.email)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(raw: &str) -> CustomerEmailResponse {
        serde_json::from_str(raw).unwrap()
    }

    #[test]
    fn email_response_accepts_string_status() {
        let body = parse(r#"{"replicatedEmail": "ops@example.com", "status_code": "200"}"#);
        assert_eq!(interpret_customer_email(body).unwrap(), "ops@example.com");
    }

    #[test]
    fn embedded_failure_status_is_lookup_error() {
        let body = parse(r#"{"replicatedEmail": "", "message": "no such license", "status_code": 404}"#);
        let err = interpret_customer_email(body).unwrap_err();
        assert!(err.to_string().contains("status 404: no such license"));
        assert!(!err.failure().message.contains("no such license"));
    }

    #[test]
    fn missing_email_is_lookup_error() {
        let body = parse(r#"{"status_code": 200}"#);
        assert!(interpret_customer_email(body).is_err());
    }

    #[tokio::test]
    async fn unreachable_service_keeps_transport_detail() {
        let config = LicenseConfig {
            base_url: "http://127.0.0.1:9".into(),
            timeout: 2,
        };
        let client = LicenseClient::new(&config).unwrap();
        let err = client.customer_email("tmns-1").await.unwrap_err();
        assert!(matches!(err, GatewayError::Backend { backend: BACKEND, .. }));
        assert!(err.to_string().contains("/v1/getReplicatedCustomer"));
    }
}
