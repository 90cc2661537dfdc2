/*============================================================
  Synavera Project: Syn-Gate
  Module: syngate_core::resolver
  Etiquette: Synavera Script Etiquette — Rust Profile v1.1.1
  ------------------------------------------------------------
  Purpose:
    Turn a possibly partial or absent requested version into
    one concrete version from an ascending candidate list, and
    provide the lenient semantic-version parsing and ordering
    the rest of the gateway relies on.

  Security / Safety Notes:
    Pure computation over caller-supplied strings.

  Dependencies:
    semver for version parsing and ordering.

  Operational Scope:
    Invoked by the orchestrator after persona filtering and by
    the classification registry.

  Revision History:
    2024-11-04 COD  Crafted vercmp integration layer.
    2025-11-12 COD  Replaced with in-process version resolution.
  ------------------------------------------------------------
  SSE Principles Observed:
    - Deterministic resolution with no hidden re-sorting
    - Explicit error variants for empty and unmatched input
============================================================*/

use std::cmp::Ordering;

use semver::Version;

use crate::error::{GatewayError, Result};
use crate::request::is_latest;

/// Resolve `requested` against ascending `candidates`.
///
/// Empty or `latest` picks the last candidate. Anything else picks the
/// newest candidate equal to `requested` or extending it past a `.`
/// boundary, so `16` matches `16.2.5` but never `160.0.0`.
/// Candidates must already be in ascending order.
pub fn resolve<S: AsRef<str>>(requested: &str, candidates: &[S]) -> Result<String> {
    if is_latest(requested) {
        return candidates
            .last()
            .map(|latest| latest.as_ref().to_string())
            .ok_or(GatewayError::NoCandidates);
    }

    candidates
        .iter()
        .rev()
        .map(|candidate| candidate.as_ref())
        .find(|candidate| matches_prefix(candidate, requested))
        .map(str::to_string)
        .ok_or_else(|| GatewayError::VersionNotSupported(requested.to_string()))
}

fn matches_prefix(candidate: &str, requested: &str) -> bool {
    candidate.starts_with(requested)
        && (candidate.len() == requested.len()
            || candidate.as_bytes()[requested.len()] == b'.')
}

/// Parse `1`, `1.2`, `v1.2.3`, `1.2.3-rc.1` into a semantic version.
///
/// Missing minor/patch components are zero-filled.
pub fn parse_lenient(raw: &str) -> Option<Version> {
    let trimmed = raw.trim();
    let trimmed = trimmed.strip_prefix('v').unwrap_or(trimmed);
    if let Ok(version) = Version::parse(trimmed) {
        return Some(version);
    }

    let split_at = trimmed.find(['-', '+']).unwrap_or(trimmed.len());
    let (core, suffix) = trimmed.split_at(split_at);
    let parts: Vec<&str> = core.split('.').collect();
    if parts.is_empty()
        || parts.len() > 3
        || parts
            .iter()
            .any(|part| part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()))
    {
        return None;
    }

    let mut padded: Vec<String> = parts
        .iter()
        .map(|part| part.trim_start_matches('0'))
        .map(|part| if part.is_empty() { "0".to_string() } else { part.to_string() })
        .collect();
    while padded.len() < 3 {
        padded.push("0".to_string());
    }
    Version::parse(&format!("{}{suffix}", padded.join("."))).ok()
}

/// Version with pre-release and build metadata removed.
pub fn core_version(version: &Version) -> Version {
    Version::new(version.major, version.minor, version.patch)
}

/// Sort ascending by semantic version.
///
/// Unparsable entries sort lexicographically ahead of parsable ones.
pub fn sort_versions(versions: &mut [String]) {
    versions.sort_by(|a, b| match (parse_lenient(a), parse_lenient(b)) {
        (Some(left), Some(right)) => left.cmp(&right).then_with(|| a.cmp(b)),
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (None, None) => a.cmp(b),
    });
}
