/*============================================================
  Synavera Project: Syn-Gate
  Module: syngate_core::download
  Etiquette: Synavera Script Etiquette — Rust Profile v1.1.1
  ------------------------------------------------------------
  Purpose:
    Shapes returned by download operations: a redirect target or
    an artifact stream with the headers to forward.

  Security / Safety Notes:
    Bodies are forwarded chunk by chunk; nothing buffers a whole
    artifact in memory.

  Dependencies:
    futures + bytes for the boxed body stream.

  Operational Scope:
    Produced by product strategies, consumed by the CLI or a
    routing layer writing the response.

  Revision History:
    2025-11-12 COD  Introduced download outcome types.
  ------------------------------------------------------------
  SSE Principles Observed:
    - Streaming by default
    - Header names normalised to lowercase
============================================================*/

use std::fmt;

use bytes::Bytes;
use futures::stream::BoxStream;
use futures::{StreamExt, TryStreamExt};

use crate::catalog::PackageMetadataRecord;
use crate::error::{GatewayError, Result};

pub const CONTENT_TYPE: &str = "content-type";
pub const CONTENT_LENGTH: &str = "content-length";
pub const CONTENT_DISPOSITION: &str = "content-disposition";

/// Chunked artifact body.
pub type ByteStream = BoxStream<'static, Result<Bytes>>;

/// Artifact body plus the response headers to forward.
pub struct ArtifactStream {
    pub status: u16,
    headers: Vec<(String, String)>,
    pub body: ByteStream,
}

impl ArtifactStream {
    pub fn new(status: u16, body: ByteStream) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body,
        }
    }

    /// Wrap a `reqwest` response, forwarding every header verbatim.
    pub fn from_response(response: reqwest::Response, backend: &'static str) -> Self {
        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|value| (name.as_str().to_string(), value.to_string()))
            })
            .collect();
        let body = response
            .bytes_stream()
            .map_err(move |err| GatewayError::backend(backend, format!("stream interrupted: {err}")))
            .boxed();
        Self {
            status,
            headers,
            body,
        }
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        let name = name.to_ascii_lowercase();
        self.headers
            .iter()
            .find(|(key, _)| *key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    /// Set a header, replacing any existing value.
    pub fn set_header(&mut self, name: &str, value: impl Into<String>) {
        let name = name.to_ascii_lowercase();
        self.headers.retain(|(key, _)| *key != name);
        self.headers.push((name, value.into()));
    }

    /// Set a header only when the source did not provide one.
    pub fn default_header(&mut self, name: &str, value: impl Into<String>) {
        if self.header(name).map_or(true, str::is_empty) {
            self.set_header(name, value);
        }
    }
}

impl fmt::Debug for ArtifactStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArtifactStream")
            .field("status", &self.status)
            .field("headers", &self.headers)
            .finish_non_exhaustive()
    }
}

/// Result of a download operation.
#[derive(Debug)]
pub enum DownloadOutcome {
    /// Caller should be redirected to this url.
    Redirect(String),
    /// Artifact streamed through the gateway.
    Stream(ArtifactStream),
    /// Metadata document requested with a `.metadata.json` suffix.
    Metadata(PackageMetadataRecord),
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;

    #[test]
    fn default_header_respects_existing_value() {
        let mut artifact = ArtifactStream::new(200, stream::empty().boxed());
        artifact.set_header("Content-Disposition", "attachment; filename=a.zip");
        artifact.default_header(CONTENT_DISPOSITION, "attachment; filename=b.zip");
        assert_eq!(
            artifact.header(CONTENT_DISPOSITION),
            Some("attachment; filename=a.zip")
        );

        artifact.default_header(CONTENT_TYPE, "application/zip");
        assert_eq!(artifact.header("Content-Type"), Some("application/zip"));
    }

    #[tokio::test]
    async fn body_chunks_are_forwarded() {
        let chunks = vec![Ok(Bytes::from_static(b"ab")), Ok(Bytes::from_static(b"cd"))];
        let artifact = ArtifactStream::new(200, stream::iter(chunks).boxed());
        let collected: Vec<Bytes> = artifact.body.try_collect().await.unwrap();
        assert_eq!(collected.concat(), b"abcd");
    }
}
