/*============================================================
  Synavera Project: Syn-Gate
  Module: syngate_core::error
  Etiquette: Synavera Script Etiquette — Rust Profile v1.1.1
  ------------------------------------------------------------
  Purpose:
    Centralise Syn-Gate-Core error types so every strategy and
    collaborator failure maps to one caller-visible status and
    message pair.

  Security / Safety Notes:
    Entitlement and backend failures expose fixed messages to
    callers; underlying detail is only written to the log.

  Dependencies:
    thiserror for ergonomic error definitions.

  Operational Scope:
    Used across modules to propagate failures and consolidate
    status codes for the gateway and exit codes for the CLI.

  Revision History:
    2024-11-04 COD  Established shared error definitions.
    2025-11-12 COD  Reworked taxonomy for catalog resolution.
  ------------------------------------------------------------
  SSE Principles Observed:
    - Explicit error taxonomy with actionable context
    - No silent failure paths
    - Stable status and exit codes for operational tooling
============================================================*/

use std::fmt;
use std::io;
use std::process::ExitCode;

use serde::Serialize;
use thiserror::Error;

/// Result alias for Syn-Gate-Core operations.
pub type Result<T> = std::result::Result<T, GatewayError>;

pub const STATUS_OK: u16 = 200;
pub const STATUS_BAD_REQUEST: u16 = 400;
pub const STATUS_INTERNAL: u16 = 500;

/// Step of the license-gated download that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntitlementStep {
    LicenseLookup,
    CustomerSearch,
    CustomerNotFound,
    ChannelMissing,
    ArtifactFetch,
}

impl EntitlementStep {
    /// Fixed message returned to callers for this step.
    pub fn public_message(self) -> &'static str {
        match self {
            EntitlementStep::LicenseLookup => "error while fetching customer email for license",
            EntitlementStep::CustomerSearch | EntitlementStep::CustomerNotFound => {
                "error while searching customer in customer portal"
            }
            EntitlementStep::ChannelMissing => "error while building download url from customer portal",
            EntitlementStep::ArtifactFetch => "error while downloading from customer portal",
        }
    }
}

impl fmt::Display for EntitlementStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.public_message())
    }
}

/// Enumerates high-level error domains surfaced by Syn-Gate-Core.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("Configuration: {0}")]
    Config(String),
    #[error("Backend {backend}: {detail}")]
    Backend { backend: &'static str, detail: String },
    #[error("Upstream responded {status}: {message}")]
    Upstream { status: u16, message: String },
    #[error("{message}")]
    NotFound { status: u16, message: String },
    #[error("{message}")]
    Validation { field: &'static str, message: String },
    #[error("No versions available to resolve against")]
    NoCandidates,
    #[error("No versions found for this product/mode")]
    NoVersionsForPersona,
    #[error("the requested version {0} is not supported on the selected persona or channel")]
    VersionNotSupported(String),
    #[error("{0}")]
    Unsupported(String),
    #[error("Entitlement: {0}")]
    Entitlement(EntitlementStep),
    #[error("Serialization: {0}")]
    Serialization(String),
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Caller-visible failure pair handed to the routing layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Failure {
    pub status: u16,
    pub message: String,
}

impl GatewayError {
    pub fn backend(backend: &'static str, detail: impl Into<String>) -> Self {
        GatewayError::Backend {
            backend,
            detail: detail.into(),
        }
    }

    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        GatewayError::Validation {
            field,
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        GatewayError::NotFound {
            status: STATUS_BAD_REQUEST,
            message: message.into(),
        }
    }

    /// Http-like status code for this failure.
    pub fn status(&self) -> u16 {
        match self {
            GatewayError::Upstream { status, .. } | GatewayError::NotFound { status, .. } => *status,
            GatewayError::Validation { .. }
            | GatewayError::NoCandidates
            | GatewayError::NoVersionsForPersona
            | GatewayError::VersionNotSupported(_)
            | GatewayError::Unsupported(_) => STATUS_BAD_REQUEST,
            GatewayError::Config(_)
            | GatewayError::Backend { .. }
            | GatewayError::Entitlement(_)
            | GatewayError::Serialization(_)
            | GatewayError::Io(_) => STATUS_INTERNAL,
        }
    }

    /// Status and message safe to return to the caller.
    pub fn failure(&self) -> Failure {
        let message = match self {
            GatewayError::Backend { backend, .. } => {
                format!("Error while fetching data from {backend}")
            }
            GatewayError::Entitlement(step) => step.public_message().to_string(),
            GatewayError::Io(_) => "Internal I/O failure".to_string(),
            other => other.to_string(),
        };
        Failure {
            status: self.status(),
            message,
        }
    }

    /// Map error category to a deterministic exit code.
    pub fn exit_code(&self) -> ExitCode {
        match self {
            GatewayError::Config(_) => ExitCode::from(20),
            GatewayError::Backend { .. } => ExitCode::from(30),
            GatewayError::Upstream { .. } => ExitCode::from(32),
            GatewayError::Serialization(_) => ExitCode::from(31),
            GatewayError::Io(_) => ExitCode::from(41),
            GatewayError::Entitlement(_) => ExitCode::from(33),
            GatewayError::NotFound { .. } => ExitCode::from(44),
            GatewayError::Validation { .. }
            | GatewayError::NoCandidates
            | GatewayError::NoVersionsForPersona
            | GatewayError::VersionNotSupported(_)
            | GatewayError::Unsupported(_) => ExitCode::from(40),
        }
    }
}
