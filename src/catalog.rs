/*============================================================
  Synavera Project: Syn-Gate
  Module: syngate_core::catalog
  Etiquette: Synavera Script Etiquette — Rust Profile v1.1.1
  ------------------------------------------------------------
  Purpose:
    Shared structures describing package metadata and the
    nested package catalog returned for a product version.

  Security / Safety Notes:
    Pure data container; no I/O performed in this module.

  Dependencies:
    serde for JSON (de)serialization.

  Operational Scope:
    Produced by product strategies, rewritten by the
    orchestrator, serialized for callers.

  Revision History:
    2024-11-04 COD  Introduced shared VersionInfo type.
    2025-11-12 COD  Replaced with package catalog shapes.
  ------------------------------------------------------------
  SSE Principles Observed:
    - Clear data contracts between modules
    - Serializable structures for gateway output
============================================================*/

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Version string as stored by a backend.
pub type ProductVersion = String;

/// Checksums and location of one downloadable package.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageMetadataRecord {
    #[serde(default)]
    pub sha1: String,
    #[serde(default)]
    pub sha256: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub version: String,
}

impl PackageMetadataRecord {
    pub fn new(sha1: impl Into<String>, sha256: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            sha1: sha1.into(),
            sha256: sha256.into(),
            url: String::new(),
            version: version.into(),
        }
    }
}

type Level<T> = BTreeMap<String, T>;

/// platform → platform-version → architecture → record
pub type PlatformVersionTree = Level<Level<Level<PackageMetadataRecord>>>;
/// platform → architecture → package-manager → record
pub type PackageManagerTree = Level<Level<Level<PackageMetadataRecord>>>;

/// Keys identifying one leaf of a catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PackageCoordinates<'a> {
    pub platform: &'a str,
    pub platform_version: Option<&'a str>,
    pub architecture: &'a str,
    pub package_manager: Option<&'a str>,
}

/// Nested package listing for one resolved version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PackageCatalog {
    ByPlatformVersion(PlatformVersionTree),
    ByPackageManager(PackageManagerTree),
}

impl Default for PackageCatalog {
    fn default() -> Self {
        PackageCatalog::ByPlatformVersion(BTreeMap::new())
    }
}

impl PackageCatalog {
    /// Insert a record keyed by platform version.
    pub fn insert_platform_version(
        tree: &mut PlatformVersionTree,
        platform: &str,
        platform_version: &str,
        architecture: &str,
        record: PackageMetadataRecord,
    ) {
        tree.entry(platform.to_string())
            .or_default()
            .entry(platform_version.to_string())
            .or_default()
            .insert(architecture.to_string(), record);
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of leaf records.
    pub fn len(&self) -> usize {
        let tree = match self {
            PackageCatalog::ByPlatformVersion(tree) | PackageCatalog::ByPackageManager(tree) => tree,
        };
        tree.values()
            .flat_map(|middle| middle.values())
            .map(|leaves| leaves.len())
            .sum()
    }

    /// Rewrite every record in place.
    pub fn update_records<F>(&mut self, mut update: F)
    where
        F: FnMut(PackageCoordinates<'_>, &mut PackageMetadataRecord),
    {
        match self {
            PackageCatalog::ByPlatformVersion(tree) => {
                for (platform, versions) in tree.iter_mut() {
                    for (platform_version, arches) in versions.iter_mut() {
                        for (architecture, record) in arches.iter_mut() {
                            update(
                                PackageCoordinates {
                                    platform: platform.as_str(),
                                    platform_version: Some(platform_version.as_str()),
                                    architecture: architecture.as_str(),
                                    package_manager: None,
                                },
                                record,
                            );
                        }
                    }
                }
            }
            PackageCatalog::ByPackageManager(tree) => {
                for (platform, arches) in tree.iter_mut() {
                    for (architecture, managers) in arches.iter_mut() {
                        for (package_manager, record) in managers.iter_mut() {
                            update(
                                PackageCoordinates {
                                    platform: platform.as_str(),
                                    platform_version: None,
                                    architecture: architecture.as_str(),
                                    package_manager: Some(package_manager.as_str()),
                                },
                                record,
                            );
                        }
                    }
                }
            }
        }
    }

    /// Iterate all records (read-only).
    pub fn records(&self) -> Vec<&PackageMetadataRecord> {
        let tree = match self {
            PackageCatalog::ByPlatformVersion(tree) | PackageCatalog::ByPackageManager(tree) => tree,
        };
        tree.values()
            .flat_map(|middle| middle.values())
            .flat_map(|leaves| leaves.values())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn upstream_json_parses_as_platform_version_tree() {
        let raw = r#"{
            "ubuntu": {"20.04": {"x86_64": {"sha1": "a", "sha256": "b", "url": "https://up/x.deb", "version": "16.2.5"}}},
            "el": {"8": {"x86_64": {"sha1": "c", "sha256": "d", "url": "https://up/x.rpm", "version": "16.2.5"}}}
        }"#;
        let catalog: PackageCatalog = serde_json::from_str(raw).unwrap();
        assert!(matches!(catalog, PackageCatalog::ByPlatformVersion(_)));
        assert_eq!(catalog.len(), 2);
    }

    #[test]
    fn update_records_visits_package_manager_leaves() {
        let mut tree = PackageManagerTree::new();
        tree.entry("linux".into())
            .or_default()
            .entry("x86_64".into())
            .or_default()
            .insert("deb".into(), PackageMetadataRecord::new("s1", "s256", "19.0.1"));
        let mut catalog = PackageCatalog::ByPackageManager(tree);

        let mut seen = Vec::new();
        catalog.update_records(|coords, record| {
            seen.push((
                coords.platform.to_string(),
                coords.architecture.to_string(),
                coords.package_manager.map(str::to_string),
            ));
            record.url = "rewritten".into();
        });

        assert_eq!(
            seen,
            vec![("linux".to_string(), "x86_64".to_string(), Some("deb".to_string()))]
        );
        assert_eq!(catalog.records()[0].url, "rewritten");
    }
}
