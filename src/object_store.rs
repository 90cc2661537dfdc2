/*============================================================
  Synavera Project: Syn-Gate
  Module: syngate_core::object_store
  Etiquette: Synavera Script Etiquette — Rust Profile v1.1.1
  ------------------------------------------------------------
  Purpose:
    Object store and credential federation contracts used to
    stream enterprise artifacts, plus filesystem-rooted local
    implementations.

  Security / Safety Notes:
    Scoped credentials redact their secret parts in Debug
    output and expire after a fixed lifetime. Object keys with
    parent components are rejected before touching the disk.

  Dependencies:
    async-trait, chrono for expiry, sha2 for local key ids,
    tokio + tokio-util for streamed file reads.

  Operational Scope:
    Download path of the object-store product strategy.

  Revision History:
    2025-11-12 COD  Introduced object store contracts.
  ------------------------------------------------------------
  SSE Principles Observed:
    - Session, role assumption and fetch are separate fallible steps
    - Credential material never reaches a log line or error
============================================================*/

use std::fmt;
use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use futures::{StreamExt, TryStreamExt};
use sha2::{Digest, Sha256};
use tokio_util::io::ReaderStream;

use crate::download::ByteStream;
use crate::error::{GatewayError, Result};

pub const BACKEND: &str = "object store";
pub const FEDERATION: &str = "credential federation";

/// Client session bound to one region.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub region: String,
}

/// Short-lived credentials obtained by assuming a role.
#[derive(Clone)]
pub struct ScopedCredentials {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub session_token: String,
    pub expires_at: DateTime<Utc>,
}

impl ScopedCredentials {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

impl fmt::Debug for ScopedCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScopedCredentials")
            .field("access_key_id", &crate::logger::redact(&self.access_key_id))
            .field("secret_access_key", &"****")
            .field("session_token", &"****")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Object body with the content headers the store reported.
pub struct StoredObject {
    pub content_type: Option<String>,
    pub content_length: Option<u64>,
    pub content_disposition: Option<String>,
    pub body: ByteStream,
}

impl fmt::Debug for StoredObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoredObject")
            .field("content_type", &self.content_type)
            .field("content_length", &self.content_length)
            .field("content_disposition", &self.content_disposition)
            .finish_non_exhaustive()
    }
}

/// Session creation and role assumption.
#[async_trait]
pub trait CredentialFederation: Send + Sync {
    async fn session(&self, region: &str) -> Result<Session>;
    async fn assume_role(&self, session: &Session, role_arn: &str) -> Result<ScopedCredentials>;
}

#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn get_object(
        &self,
        session: &Session,
        credentials: &ScopedCredentials,
        bucket: &str,
        key: &str,
    ) -> Result<StoredObject>;
}

/// Federation issuing locally derived credentials with a fixed lifetime.
#[derive(Debug, Clone)]
pub struct StaticFederation {
    ttl: Duration,
}

impl StaticFederation {
    pub fn new(ttl_secs: i64) -> Self {
        Self {
            ttl: Duration::seconds(ttl_secs.max(1)),
        }
    }
}

#[async_trait]
impl CredentialFederation for StaticFederation {
    async fn session(&self, region: &str) -> Result<Session> {
        if region.trim().is_empty() {
            return Err(GatewayError::backend(FEDERATION, "session requires a region"));
        }
        Ok(Session {
            region: region.to_string(),
        })
    }

    async fn assume_role(&self, session: &Session, role_arn: &str) -> Result<ScopedCredentials> {
        if !role_arn.starts_with("arn:") {
            return Err(GatewayError::backend(FEDERATION, "role identifier is not an ARN"));
        }
        let issued_at = Utc::now();
        let nanos = issued_at.timestamp_nanos_opt().unwrap_or_default();
        let digest = Sha256::digest(format!("{}|{role_arn}|{nanos}", session.region));
        let hex: String = digest.iter().map(|byte| format!("{byte:02x}")).collect();
        Ok(ScopedCredentials {
            access_key_id: format!("LSIA{}", hex[..16].to_uppercase()),
            secret_access_key: hex[16..56].to_string(),
            session_token: hex,
            expires_at: issued_at + self.ttl,
        })
    }
}

/// Object store where each bucket is a directory under `root`.
#[derive(Debug, Clone)]
pub struct LocalObjectStore {
    root: PathBuf,
}

impl LocalObjectStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn object_path(&self, bucket: &str, key: &str) -> Result<PathBuf> {
        let relative = Path::new(bucket).join(key);
        if relative
            .components()
            .any(|part| !matches!(part, Component::Normal(_)))
        {
            return Err(GatewayError::validation("key", format!("invalid object key {key}")));
        }
        Ok(self.root.join(relative))
    }
}

fn content_type_for(key: &str) -> &'static str {
    let lower = key.to_ascii_lowercase();
    match lower.rsplit('.').next() {
        Some("zip") => "application/zip",
        Some("gz") | Some("tgz") => "application/gzip",
        Some("rpm") => "application/x-rpm",
        Some("deb") => "application/vnd.debian.binary-package",
        Some("msi") => "application/x-msi",
        Some("json") => "application/json",
        _ => "application/octet-stream",
    }
}

#[async_trait]
impl ObjectStore for LocalObjectStore {
    async fn get_object(
        &self,
        _session: &Session,
        credentials: &ScopedCredentials,
        bucket: &str,
        key: &str,
    ) -> Result<StoredObject> {
        if credentials.is_expired(Utc::now()) {
            return Err(GatewayError::backend(BACKEND, "credentials expired"));
        }
        let path = self.object_path(bucket, key)?;
        let file = tokio::fs::File::open(&path).await.map_err(|err| {
            if err.kind() == std::io::ErrorKind::NotFound {
                GatewayError::not_found(format!("object {key} not found in {bucket}"))
            } else {
                GatewayError::backend(BACKEND, format!("failed to open {key}: {err}"))
            }
        })?;
        let length = file
            .metadata()
            .await
            .map_err(|err| GatewayError::backend(BACKEND, format!("failed to stat {key}: {err}")))?
            .len();
        let body = ReaderStream::new(file).map_err(GatewayError::from).boxed();
        Ok(StoredObject {
            content_type: Some(content_type_for(key).to_string()),
            content_length: Some(length),
            content_disposition: None,
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    async fn credentials() -> (Session, ScopedCredentials) {
        let federation = StaticFederation::new(60);
        let session = federation.session("us-east-2").await.unwrap();
        let creds = federation
            .assume_role(&session, "arn:aws:iam::123456789012:role/artifacts")
            .await
            .unwrap();
        (session, creds)
    }

    #[tokio::test]
    async fn debug_output_hides_secrets() {
        let (_, creds) = credentials().await;
        let rendered = format!("{creds:?}");
        assert!(!rendered.contains(&creds.secret_access_key));
        assert!(!rendered.contains(&creds.session_token));
    }

    #[tokio::test]
    async fn federation_rejects_missing_region_and_bad_role() {
        let federation = StaticFederation::new(60);
        assert!(federation.session("").await.is_err());
        let session = federation.session("eu-west-1").await.unwrap();
        assert!(federation.assume_role(&session, "artifacts").await.is_err());
    }

    #[tokio::test]
    async fn local_object_streams_with_headers() {
        let dir = tempfile::tempdir().unwrap();
        let object_dir = dir.path().join("artifacts/current/chef-ice/19.0.1");
        std::fs::create_dir_all(&object_dir).unwrap();
        std::fs::write(object_dir.join("chef-ice.rpm"), b"payload").unwrap();

        let store = LocalObjectStore::new(dir.path());
        let (session, creds) = credentials().await;
        let object = store
            .get_object(&session, &creds, "artifacts", "current/chef-ice/19.0.1/chef-ice.rpm")
            .await
            .unwrap();
        assert_eq!(object.content_type.as_deref(), Some("application/x-rpm"));
        assert_eq!(object.content_length, Some(7));
        let chunks: Vec<Bytes> = object.body.try_collect().await.unwrap();
        assert_eq!(chunks.concat(), b"payload");
    }

    #[tokio::test]
    async fn parent_components_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalObjectStore::new(dir.path());
        let (session, creds) = credentials().await;
        let err = store
            .get_object(&session, &creds, "artifacts", "../secrets")
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::Validation { field: "key", .. }));
    }

    #[tokio::test]
    async fn expired_credentials_refused() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalObjectStore::new(dir.path());
        let (session, mut creds) = credentials().await;
        creds.expires_at = Utc::now() - Duration::seconds(1);
        let err = store.get_object(&session, &creds, "b", "k").await.unwrap_err();
        assert!(matches!(err, GatewayError::Backend { backend: BACKEND, .. }));
    }
}
