/*============================================================
  Synavera Project: Syn-Gate
  Module: syngate_core::strategy::mode
  Etiquette: Synavera Script Etiquette — Rust Profile v1.1.1
  ------------------------------------------------------------
  Purpose:
    Persona filtering of product and version lists for the
    commercial, trial and opensource deployments.

  Security / Safety Notes:
    Stateless; instances are shared process-wide.

  Dependencies:
    registry for end-of-life and open-source classification.

  Operational Scope:
    Selected once from configuration; applied by the
    orchestrator before version resolution.

  Revision History:
    2025-11-12 COD  Introduced persona strategies.
  ------------------------------------------------------------
  SSE Principles Observed:
    - Pure list transformations, input order preserved
    - Selection is a plain match with no side effects
============================================================*/

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

use crate::error::GatewayError;
use crate::registry;

/// Pseudo-product served by the platform service strategy.
pub const PLATFORM_SERVICE_PRODUCT: &str = "chef-360";
/// Product whose opensource boundary is enforced upstream.
///
/// Its version list passes the opensource filter untouched. The earlier
/// gateway did the opposite and range-checked habitat alone; this
/// deployment leaves habitat's cut-off to its own release channel.
pub const OPENSOURCE_PASSTHROUGH_PRODUCT: &str = "habitat";

/// Deployment-wide caller classification.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Persona {
    #[default]
    Commercial,
    Trial,
    Opensource,
}

impl Persona {
    pub fn as_str(self) -> &'static str {
        match self {
            Persona::Commercial => "commercial",
            Persona::Trial => "trial",
            Persona::Opensource => "opensource",
        }
    }
}

impl fmt::Display for Persona {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Persona {
    type Err = GatewayError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "commercial" => Ok(Persona::Commercial),
            "trial" => Ok(Persona::Trial),
            "opensource" => Ok(Persona::Opensource),
            other => Err(GatewayError::Config(format!("unknown persona '{other}'"))),
        }
    }
}

/// Persona-specific visibility rules.
pub trait ModeStrategy: Send + Sync {
    fn filter_products(&self, products: Vec<String>, eol: bool) -> Vec<String>;

    /// Filter an ascending version list; order of survivors is kept.
    fn filter_versions(&self, versions: Vec<String>, product: &str, eol: bool) -> Vec<String>;
}

#[derive(Debug)]
pub struct CommercialMode;

#[derive(Debug)]
pub struct TrialMode;

#[derive(Debug)]
pub struct OpensourceMode;

fn drop_end_of_life_products(products: Vec<String>, eol: bool) -> Vec<String> {
    if eol {
        return products;
    }
    products
        .into_iter()
        .filter(|product| registry::is_supported_product(product))
        .collect()
}

impl ModeStrategy for CommercialMode {
    fn filter_products(&self, products: Vec<String>, eol: bool) -> Vec<String> {
        let mut products = drop_end_of_life_products(products, eol);
        products.push(PLATFORM_SERVICE_PRODUCT.to_string());
        products
    }

    fn filter_versions(&self, versions: Vec<String>, product: &str, eol: bool) -> Vec<String> {
        if eol {
            return versions;
        }
        versions
            .into_iter()
            .filter(|version| !registry::is_end_of_life(product, version))
            .collect()
    }
}

impl ModeStrategy for TrialMode {
    /// Trial listings are rendered as `id:Display Name`.
    fn filter_products(&self, products: Vec<String>, eol: bool) -> Vec<String> {
        drop_end_of_life_products(products, eol)
            .into_iter()
            .filter(|product| !registry::excluded_from_trial(product))
            .map(|product| registry::labelled(&product))
            .collect()
    }

    fn filter_versions(&self, mut versions: Vec<String>, _product: &str, _eol: bool) -> Vec<String> {
        match versions.pop() {
            Some(latest) => vec![latest],
            None => versions,
        }
    }
}

impl ModeStrategy for OpensourceMode {
    fn filter_products(&self, products: Vec<String>, _eol: bool) -> Vec<String> {
        products
            .into_iter()
            .filter(|product| registry::has_open_source_edition(product))
            .collect()
    }

    fn filter_versions(&self, versions: Vec<String>, product: &str, _eol: bool) -> Vec<String> {
        if product == OPENSOURCE_PASSTHROUGH_PRODUCT {
            return versions;
        }
        versions
            .into_iter()
            .filter(|version| registry::is_open_source(product, version))
            .collect()
    }
}

static COMMERCIAL: CommercialMode = CommercialMode;
static TRIAL: TrialMode = TrialMode;
static OPENSOURCE: OpensourceMode = OpensourceMode;

pub fn select_mode_strategy(persona: Persona) -> &'static dyn ModeStrategy {
    match persona {
        Persona::Commercial => &COMMERCIAL,
        Persona::Trial => &TRIAL,
        Persona::Opensource => &OPENSOURCE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn list(items: &[&str]) -> Vec<String> {
        items.iter().map(|item| item.to_string()).collect()
    }

    #[test]
    fn commercial_always_lists_platform_service() {
        let strategy = select_mode_strategy(Persona::Commercial);
        for input in [list(&[]), list(&["chef", "inspec"]), list(&["unknown"])] {
            for eol in [false, true] {
                let out = strategy.filter_products(input.clone(), eol);
                assert!(out.iter().any(|p| p == PLATFORM_SERVICE_PRODUCT));
            }
        }
    }

    #[test]
    fn commercial_drops_unregistered_without_override() {
        let strategy = select_mode_strategy(Persona::Commercial);
        assert_eq!(
            strategy.filter_products(list(&["chef", "angrychef"]), false),
            list(&["chef", PLATFORM_SERVICE_PRODUCT])
        );
        assert_eq!(
            strategy.filter_products(list(&["chef", "angrychef"]), true),
            list(&["chef", "angrychef", PLATFORM_SERVICE_PRODUCT])
        );
    }

    #[test]
    fn commercial_versions_drop_eol_unless_overridden() {
        let strategy = select_mode_strategy(Persona::Commercial);
        let versions = list(&["14.15.6", "15.17.4", "16.0.0", "18.2.7"]);
        assert_eq!(
            strategy.filter_versions(versions.clone(), "chef", false),
            list(&["16.0.0", "18.2.7"])
        );
        assert_eq!(strategy.filter_versions(versions.clone(), "chef", true), versions);
    }

    #[test]
    fn trial_keeps_only_latest() {
        let strategy = select_mode_strategy(Persona::Trial);
        assert_eq!(
            strategy.filter_versions(list(&["1.0.0", "2.0.0", "3.0.0"]), "chef", false),
            list(&["3.0.0"])
        );
        assert!(strategy.filter_versions(Vec::new(), "chef", false).is_empty());
    }

    #[test]
    fn trial_hides_excluded_products_without_platform_service() {
        let strategy = select_mode_strategy(Persona::Trial);
        assert_eq!(
            strategy.filter_products(list(&["chef", "manage", "supermarket", "inspec"]), false),
            list(&["chef:Chef Infra Client", "inspec:InSpec"])
        );
        assert_eq!(
            strategy.filter_products(list(&["angrychef"]), true),
            list(&["angrychef"])
        );
    }

    #[test]
    fn opensource_products_need_open_edition() {
        let strategy = select_mode_strategy(Persona::Opensource);
        assert_eq!(
            strategy.filter_products(list(&["chef", "manage", "habitat", "terraform"]), false),
            list(&["chef", "habitat"])
        );
    }

    #[test]
    fn opensource_versions_follow_range_with_carve_out() {
        let strategy = select_mode_strategy(Persona::Opensource);
        let habitat = list(&["0.78.0", "0.79.0", "1.6.0"]);
        assert_eq!(strategy.filter_versions(habitat.clone(), "habitat", false), habitat);
        assert_eq!(
            strategy.filter_versions(list(&["4.3.2", "4.3.3", "5.0.0"]), "inspec", false),
            list(&["4.3.2"])
        );
    }

    #[test]
    fn persona_parses_from_config_names() {
        assert_eq!("trial".parse::<Persona>().unwrap(), Persona::Trial);
        assert!("enterprise".parse::<Persona>().is_err());
    }
}
