/*============================================================
  Synavera Project: Syn-Gate
  Module: syngate_core::kv
  Etiquette: Synavera Script Etiquette — Rust Profile v1.1.1
  ------------------------------------------------------------
  Purpose:
    Key-value store contract for product version records, the
    typed table bindings strategies read through, and a local
    snapshot-backed store.

  Security / Safety Notes:
    Read-only access; the snapshot file is never written.

  Dependencies:
    async-trait for the collaborator trait, serde_json for
    record decoding.

  Operational Scope:
    Backs the key-value and object-store product strategies and
    the package-manager listing.

  Revision History:
    2025-11-12 COD  Introduced key-value store contract.
  ------------------------------------------------------------
  SSE Principles Observed:
    - Records decoded into explicit models per table
    - Store failures carry backend identity
============================================================*/

use std::collections::{BTreeMap, HashMap};
use std::marker::PhantomData;
use std::path::Path;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

use crate::error::{GatewayError, Result};

pub const BACKEND: &str = "key-value store";
pub const PARTITION_KEY: &str = "product";
pub const SORT_KEY: &str = "version";

/// Equality filter applied by `scan`.
#[derive(Debug, Clone, Copy)]
pub struct ScanFilter<'a> {
    pub key: &'a str,
    pub value: &'a str,
}

/// Key-value store holding catalog records.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Fetch the item keyed by (product, version).
    async fn get_item(&self, table: &str, product: &str, version: &str) -> Result<Option<Value>>;

    /// Return every item of `table` matching `filter`.
    async fn scan(&self, table: &str, filter: Option<ScanFilter<'_>>) -> Result<Vec<Value>>;
}

/// Record carrying its own version key.
pub trait VersionedRecord {
    fn version(&self) -> &str;
}

/// One package file of a first-party product release.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct MetadataEntry {
    #[serde(default)]
    pub architecture: String,
    #[serde(default)]
    pub filename: String,
    #[serde(default)]
    pub platform: String,
    #[serde(default)]
    pub platform_version: String,
    #[serde(default)]
    pub sha1: String,
    #[serde(default)]
    pub sha256: String,
}

/// Release record of the metadata-details table.
#[derive(Debug, Clone, Deserialize)]
pub struct ProductDetails {
    pub product: String,
    pub version: String,
    #[serde(default)]
    pub metadata: Vec<MetadataEntry>,
}

impl VersionedRecord for ProductDetails {
    fn version(&self) -> &str {
        &self.version
    }
}

/// Per package-manager file of an enterprise release.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct PackageFile {
    #[serde(default)]
    pub filename: String,
    #[serde(default)]
    pub sha1: String,
    #[serde(default)]
    pub sha256: String,
}

/// Release record of the package-details tables.
///
/// `metadata` is keyed platform → architecture → package manager.
#[derive(Debug, Clone, Deserialize)]
pub struct PackageDetails {
    pub product: String,
    pub version: String,
    #[serde(default)]
    pub metadata: BTreeMap<String, BTreeMap<String, BTreeMap<String, PackageFile>>>,
}

impl VersionedRecord for PackageDetails {
    fn version(&self) -> &str {
        &self.version
    }
}

#[derive(Debug, Deserialize)]
struct PackageManagerItem {
    packages: String,
}

/// Table name bound to the model its records decode into.
#[derive(Debug)]
pub struct Table<M> {
    name: String,
    model: PhantomData<fn() -> M>,
}

impl<M> Clone for Table<M> {
    fn clone(&self) -> Self {
        Self::new(self.name.clone())
    }
}

impl<M> Table<M> {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            model: PhantomData,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl<M: DeserializeOwned + VersionedRecord> Table<M> {
    /// Fetch and decode the record for (product, version).
    pub async fn get(&self, store: &dyn KeyValueStore, product: &str, version: &str) -> Result<Option<M>> {
        store
            .get_item(&self.name, product, version)
            .await?
            .map(|item| decode(&self.name, item))
            .transpose()
    }

    /// All stored versions of `product`, in storage order.
    pub async fn versions(&self, store: &dyn KeyValueStore, product: &str) -> Result<Vec<String>> {
        let filter = ScanFilter {
            key: PARTITION_KEY,
            value: product,
        };
        store
            .scan(&self.name, Some(filter))
            .await?
            .into_iter()
            .map(|item| decode::<M>(&self.name, item).map(|record| record.version().to_string()))
            .collect()
    }

    /// Newest version by reverse lexicographic order of the stored keys.
    pub async fn latest(&self, store: &dyn KeyValueStore, product: &str) -> Result<String> {
        let mut versions = self.versions(store, product).await?;
        versions.sort_by(|a, b| b.cmp(a));
        let newest = versions.into_iter().next().ok_or_else(|| {
            GatewayError::not_found(format!("No versions recorded for {product}"))
        })?;
        let record = self.get(store, product, &newest).await?.ok_or_else(|| {
            GatewayError::backend(BACKEND, format!("{product} {newest} listed but not readable"))
        })?;
        Ok(record.version().to_string())
    }
}

/// List the package managers recorded in `table`.
pub async fn package_managers(store: &dyn KeyValueStore, table: &str) -> Result<Vec<String>> {
    let mut managers = store
        .scan(table, None)
        .await?
        .into_iter()
        .map(|item| decode::<PackageManagerItem>(table, item).map(|entry| entry.packages))
        .collect::<Result<Vec<_>>>()?;
    managers.sort();
    managers.dedup();
    Ok(managers)
}

fn decode<M: DeserializeOwned>(table: &str, item: Value) -> Result<M> {
    serde_json::from_value(item).map_err(|err| {
        GatewayError::backend(BACKEND, format!("Failed to decode item of {table}: {err}"))
    })
}

/// Store backed by an in-memory copy of a JSON snapshot.
///
/// Snapshot layout: `{ "<table>": [ { ...item... }, ... ] }`.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    tables: HashMap<String, Vec<Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|err| {
            GatewayError::Config(format!("Failed to read store snapshot {}: {err}", path.display()))
        })?;
        let tables: HashMap<String, Vec<Value>> = serde_json::from_str(&raw).map_err(|err| {
            GatewayError::Config(format!("Malformed store snapshot {}: {err}", path.display()))
        })?;
        Ok(Self { tables })
    }

    pub fn insert(&mut self, table: &str, item: Value) {
        self.tables.entry(table.to_string()).or_default().push(item);
    }

    fn field<'a>(item: &'a Value, key: &str) -> Option<&'a str> {
        item.get(key).and_then(Value::as_str)
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get_item(&self, table: &str, product: &str, version: &str) -> Result<Option<Value>> {
        Ok(self.tables.get(table).and_then(|items| {
            items
                .iter()
                .find(|item| {
                    Self::field(item, PARTITION_KEY) == Some(product)
                        && Self::field(item, SORT_KEY) == Some(version)
                })
                .cloned()
        }))
    }

    async fn scan(&self, table: &str, filter: Option<ScanFilter<'_>>) -> Result<Vec<Value>> {
        let items = self.tables.get(table).map(Vec::as_slice).unwrap_or_default();
        Ok(items
            .iter()
            .filter(|item| filter.map_or(true, |f| Self::field(item, f.key) == Some(f.value)))
            .cloned()
            .collect())
    }
}
