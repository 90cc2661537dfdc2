/*============================================================
  Synavera Project: Syn-Gate
  Module: syngate_core::request
  Etiquette: Synavera Script Etiquette — Rust Profile v1.1.1
  ------------------------------------------------------------
  Purpose:
    Describe a single catalog request: the product tuple the
    caller asked for and the request-scoped context (request id,
    gateway base url, license) threaded through every call.

  Security / Safety Notes:
    License ids are carried verbatim for upstream calls but are
    redacted by the logger before being written anywhere.

  Dependencies:
    urlencoding for query construction.

  Operational Scope:
    Built by the routing layer or CLI; consumed by the
    orchestrator and every product strategy.

  Revision History:
    2025-11-12 COD  Introduced request descriptor and context.
  ------------------------------------------------------------
  SSE Principles Observed:
    - Explicit context passing instead of ambient state
    - Validation errors name the offending field
============================================================*/

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use urlencoding::encode;

use crate::error::{GatewayError, Result};

pub const LATEST: &str = "latest";
const METADATA_SUFFIX: &str = ".metadata.json";

/// Release track.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    Stable,
    Current,
}

impl Channel {
    pub fn as_str(self) -> &'static str {
        match self {
            Channel::Stable => "stable",
            Channel::Current => "current",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Channel {
    type Err = GatewayError;

    fn from_str(value: &str) -> Result<Self> {
        match value {
            "stable" => Ok(Channel::Stable),
            "current" => Ok(Channel::Current),
            _ => Err(GatewayError::validation(
                "channel",
                "Channel can only be stable or current",
            )),
        }
    }
}

/// Request field that an operation may require.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Platform,
    PlatformVersion,
    Architecture,
    PackageManager,
}

impl Field {
    fn check(self, request: &RequestDescriptor) -> Result<()> {
        let (value, field, message) = match self {
            Field::Platform => (&request.platform, "p", "Platform (p) params cannot be empty"),
            Field::PlatformVersion => (
                &request.platform_version,
                "pv",
                "Platform Version (pv) params cannot be empty",
            ),
            Field::Architecture => (
                &request.architecture,
                "m",
                "Architecture (m) params cannot be empty",
            ),
            Field::PackageManager => (
                &request.package_manager,
                "pm",
                "Package Manager (pm) params cannot be empty",
            ),
        };
        if value.is_empty() {
            Err(GatewayError::validation(field, message))
        } else {
            Ok(())
        }
    }
}

/// The product tuple a caller asked about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestDescriptor {
    pub channel: Channel,
    pub product: String,
    /// Empty, `latest`, a full version, or a dotted prefix.
    pub version: String,
    pub platform: String,
    pub platform_version: String,
    pub architecture: String,
    pub package_manager: String,
    pub license_id: String,
    pub eol: bool,
}

impl RequestDescriptor {
    pub fn new(channel: Channel, product: impl Into<String>) -> Self {
        Self {
            channel,
            product: product.into(),
            version: String::new(),
            platform: String::new(),
            platform_version: String::new(),
            architecture: String::new(),
            package_manager: String::new(),
            license_id: String::new(),
            eol: false,
        }
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    pub fn with_target(
        mut self,
        platform: impl Into<String>,
        platform_version: impl Into<String>,
        architecture: impl Into<String>,
    ) -> Self {
        self.platform = platform.into();
        self.platform_version = platform_version.into();
        self.architecture = architecture.into();
        self
    }

    pub fn with_package_manager(mut self, package_manager: impl Into<String>) -> Self {
        self.package_manager = package_manager.into();
        self
    }

    pub fn with_license(mut self, license_id: impl Into<String>) -> Self {
        self.license_id = license_id.into();
        self
    }

    pub fn with_eol(mut self, eol: bool) -> Self {
        self.eol = eol;
        self
    }

    /// True when the caller did not pin a version.
    pub fn wants_latest(&self) -> bool {
        is_latest(&self.version)
    }

    /// Ensure every listed field is present.
    pub fn require(&self, fields: &[Field]) -> Result<()> {
        fields.iter().try_for_each(|field| field.check(self))
    }

    /// Strip a `.metadata.json` suffix from the first field carrying one.
    ///
    /// Returns true when the caller asked for the metadata document of a
    /// download link rather than the artifact itself.
    pub fn take_metadata_suffix(&mut self) -> bool {
        for value in [
            &mut self.architecture,
            &mut self.platform,
            &mut self.platform_version,
            &mut self.version,
        ] {
            if let Some(idx) = value.find(METADATA_SUFFIX) {
                value.replace_range(idx..idx + METADATA_SUFFIX.len(), "");
                return true;
            }
        }
        false
    }

    /// Query pairs in the gateway's own parameter vocabulary.
    pub fn query_pairs(&self) -> Vec<(&'static str, &str)> {
        let mut pairs = Vec::new();
        for (key, value) in [
            ("v", self.version.as_str()),
            ("p", self.platform.as_str()),
            ("pv", self.platform_version.as_str()),
            ("m", self.architecture.as_str()),
            ("pm", self.package_manager.as_str()),
        ] {
            if !value.is_empty() {
                pairs.push((key, value));
            }
        }
        if self.eol {
            pairs.push(("eol", "true"));
        }
        if !self.license_id.is_empty() {
            pairs.push(("license_id", self.license_id.as_str()));
        }
        pairs
    }

    /// Gateway `/download` url for this descriptor.
    pub fn download_url(&self, base_url: &str) -> String {
        let mut url = format!(
            "{}/{}/{}/download",
            base_url.trim_end_matches('/'),
            self.channel,
            encode(&self.product)
        );
        let query = encode_query(&self.query_pairs());
        if !query.is_empty() {
            url.push('?');
            url.push_str(&query);
        }
        url
    }
}

/// Request-scoped values that used to travel as ambient state.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub request_id: String,
    /// Public base url callers reach this gateway on.
    pub base_url: String,
}

impl RequestContext {
    pub fn new(request_id: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            request_id: request_id.into(),
            base_url: base_url.into(),
        }
    }
}

pub fn is_latest(version: &str) -> bool {
    version.is_empty() || version == LATEST
}

pub fn encode_query(pairs: &[(&str, &str)]) -> String {
    pairs
        .iter()
        .map(|(key, value)| format!("{key}={}", encode(value)))
        .collect::<Vec<_>>()
        .join("&")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_rejects_unknown_track() {
        assert_eq!("current".parse::<Channel>().unwrap(), Channel::Current);
        let err = "nightly".parse::<Channel>().unwrap_err();
        assert!(matches!(err, GatewayError::Validation { field: "channel", .. }));
    }

    #[test]
    fn require_names_first_missing_field() {
        let request = RequestDescriptor::new(Channel::Stable, "chef").with_target("ubuntu", "", "x86_64");
        let err = request
            .require(&[Field::Platform, Field::PlatformVersion, Field::Architecture])
            .unwrap_err();
        assert!(matches!(err, GatewayError::Validation { field: "pv", .. }));
    }

    #[test]
    fn download_url_carries_descriptor() {
        let request = RequestDescriptor::new(Channel::Stable, "chef")
            .with_version("16.2.5")
            .with_target("ubuntu", "20.04", "x86_64")
            .with_license("free-abc");
        assert_eq!(
            request.download_url("https://gate.example/"),
            "https://gate.example/stable/chef/download?v=16.2.5&p=ubuntu&pv=20.04&m=x86_64&license_id=free-abc"
        );
    }

    #[test]
    fn metadata_suffix_is_stripped_once() {
        let mut request = RequestDescriptor::new(Channel::Current, "inspec")
            .with_target("el", "8", "x86_64.metadata.json");
        assert!(request.take_metadata_suffix());
        assert_eq!(request.architecture, "x86_64");
        assert!(!request.take_metadata_suffix());
    }

    #[test]
    fn latest_detection() {
        assert!(is_latest(""));
        assert!(is_latest("latest"));
        assert!(!is_latest("16"));
    }
}
