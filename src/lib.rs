/*============================================================
  Synavera Project: Syn-Gate
  Module: syngate_core
  Etiquette: Synavera Script Etiquette — Rust Profile v1.1.1
  ------------------------------------------------------------
  Purpose:
    Library surface of Syn-Gate Core: package catalog
    resolution across upstream, key-value, object store and
    platform service backends.

  Security / Safety Notes:
    No unsafe code. Credentials and license ids stay out of
    caller-visible errors.

  Dependencies:
    See individual modules.

  Operational Scope:
    Linked by the Syn-Gate-Core binary and integration tests.

  Revision History:
    2025-11-12 COD  Split library from the CLI entry point.
  ------------------------------------------------------------
  SSE Principles Observed:
    - One module per concern
    - Collaborators injected, never global
============================================================*/

pub mod catalog;
pub mod config;
pub mod download;
pub mod error;
pub mod gateway;
pub mod kv;
pub mod license;
pub mod logger;
pub mod object_store;
pub mod portal;
pub mod registry;
pub mod request;
pub mod resolver;
pub mod strategy;
pub mod upstream;

pub use error::{GatewayError, Result};
pub use gateway::Gateway;
