/*============================================================
  Synavera Project: Syn-Gate
  Module: syngate_core::registry
  Etiquette: Synavera Script Etiquette — Rust Profile v1.1.1
  ------------------------------------------------------------
  Purpose:
    Static classification of product versions: supported
    (non end-of-life) ranges and open-source eligibility ranges.

  Security / Safety Notes:
    Read-only table built once on first access; no writers.

  Dependencies:
    semver for range expressions, once_cell for the table.

  Operational Scope:
    Consulted by persona strategies and the orchestrator.

  Revision History:
    2025-11-12 COD  Introduced version classification registry.
  ------------------------------------------------------------
  SSE Principles Observed:
    - Unknown products fail open for EOL, closed for open source
    - Pure functions of (product, version, table)
============================================================*/

use std::collections::HashMap;

use once_cell::sync::Lazy;
use semver::VersionReq;

use crate::request::is_latest;
use crate::resolver::{core_version, parse_lenient};

/// Eligibility rules for one product id.
#[derive(Debug)]
pub struct VersionClassification {
    pub display_name: &'static str,
    pub supported: Option<VersionReq>,
    supported_raw: &'static str,
    pub open_source: Option<VersionReq>,
    pub excluded_from_trial: bool,
}

fn entry(
    display_name: &'static str,
    supported: &'static str,
    open_source: Option<&'static str>,
    excluded_from_trial: bool,
) -> VersionClassification {
    VersionClassification {
        display_name,
        supported: parse_range(supported),
        supported_raw: supported,
        open_source: open_source.and_then(parse_range),
        excluded_from_trial,
    }
}

fn parse_range(raw: &str) -> Option<VersionReq> {
    VersionReq::parse(&raw.replace(' ', "")).ok()
}

static CLASSIFICATIONS: Lazy<HashMap<&'static str, VersionClassification>> = Lazy::new(|| {
    HashMap::from([
        ("automate", entry("Chef Automate", ">= 0", Some(">= 0"), false)),
        ("chef", entry("Chef Infra Client", ">= 16.0.0", Some("<= 14.15.6"), false)),
        ("chef-backend", entry("Chef Backend", ">= 3.0.0", None, true)),
        ("chef-server", entry("Chef Infra Server", ">= 14.0.0", Some("<= 12.19.31"), false)),
        ("chef-workstation", entry("Chef Workstation", ">= 21.0.0", Some("<= 0.4.2"), false)),
        ("habitat", entry("Chef Habitat", ">= 0", Some("< 0.79.0"), false)),
        ("inspec", entry("InSpec", ">= 4.0.0", Some("<= 4.3.2"), false)),
        ("manage", entry("Chef Manage", ">= 2.5.0", None, true)),
        ("supermarket", entry("Chef Supermarket", ">= 5.0.0", Some("<= 5.1.63"), true)),
        ("desktop", entry("", ">= 0", Some("<= 14.15.6"), false)),
        ("chef-ice", entry("Chef Infra Client Enterprise", ">= 0", None, false)),
        ("migrate-ice", entry("Migration Tool", ">= 0", None, false)),
    ])
});

pub fn lookup(product: &str) -> Option<&'static VersionClassification> {
    CLASSIFICATIONS.get(product)
}

/// True when the product is registered with a supported range.
pub fn is_supported_product(product: &str) -> bool {
    lookup(product).is_some_and(|entry| entry.supported.is_some())
}

/// True when the product has an open-source edition.
pub fn has_open_source_edition(product: &str) -> bool {
    lookup(product).is_some_and(|entry| entry.open_source.is_some())
}

/// Whether `version` of `product` falls below its supported range.
///
/// `latest`, empty, unknown products and unparsable versions are never EOL.
pub fn is_end_of_life(product: &str, version: &str) -> bool {
    if is_latest(version) {
        return false;
    }
    let Some(entry) = lookup(product) else {
        return false;
    };
    let Some(parsed) = parse_lenient(version) else {
        return false;
    };
    entry
        .supported
        .as_ref()
        .is_some_and(|range| !range.matches(&core_version(&parsed)))
}

/// Whether `version` of `product` lies inside its open-source range.
pub fn is_open_source(product: &str, version: &str) -> bool {
    let Some(range) = lookup(product).and_then(|entry| entry.open_source.as_ref()) else {
        return false;
    };
    parse_lenient(version).is_some_and(|parsed| range.matches(&core_version(&parsed)))
}

/// Human readable supported range, empty for unknown products.
pub fn supported_range_description(product: &str) -> String {
    lookup(product)
        .map(|entry| entry.supported_raw.to_string())
        .unwrap_or_default()
}

/// `id:Display Name` for registered products, the bare id otherwise.
pub fn labelled(product: &str) -> String {
    match lookup(product) {
        Some(entry) => format!("{product}:{}", entry.display_name),
        None => product.to_string(),
    }
}

pub fn excluded_from_trial(product: &str) -> bool {
    lookup(product).is_some_and(|entry| entry.excluded_from_trial)
}
