use std::path::PathBuf;

use http::{Method, StatusCode};

use crate::error::{CacheError, CacheResult};
use crate::options::ResolvedOptions;
use crate::request::RequestDescriptor;

const REPLACEMENT: char = '-';

/// Context handed to a custom directory-building function.
pub struct KeyParts<'a> {
    pub hostname: &'a str,
    pub path: &'a str,
    pub method: &'a Method,
    pub extra: &'a [String],
    pub status: Option<StatusCode>,
    pub request: &'a RequestDescriptor,
}

/// Default segment order: hostname, path, method, extra segments, then
/// the status filter when one is configured.
pub fn default_segments(parts: &KeyParts<'_>) -> Vec<String> {
    let mut segments = vec![
        parts.hostname.to_owned(),
        parts.path.to_owned(),
        parts.method.to_string(),
    ];
    segments.extend(parts.extra.iter().cloned());
    if let Some(status) = parts.status {
        segments.push(status.as_u16().to_string());
    }
    segments
}

/// Derive the on-disk directory for one request. Pure given the
/// request and options, so repeated derivation is idempotent.
pub(crate) fn build_entry_dir(
    request: &RequestDescriptor,
    options: &ResolvedOptions,
) -> CacheResult<PathBuf> {
    let extra = options
        .extra_dir
        .as_ref()
        .map(|e| e.resolve(request).into_vec())
        .unwrap_or_default();
    let parts = KeyParts {
        hostname: request.hostname(),
        path: request.path(),
        method: request.method(),
        extra: &extra,
        status: options.match_status,
        request,
    };
    let raw = match &options.dir_fn {
        Some(dir_fn) => dir_fn.call(&parts),
        None => default_segments(&parts),
    };

    let segments = sanitize_segments(&raw);
    if segments.is_empty() {
        return Err(CacheError::EmptyCacheKey {
            url: request.url().to_string(),
        });
    }

    let mut dir = options.base_dir.clone();
    for segment in &segments {
        dir.push(segment);
    }
    Ok(dir)
}

/// Raw segments may nest (`api/cats` becomes two directories); each
/// token is then made filesystem-safe independently.
fn sanitize_segments(raw: &[String]) -> Vec<String> {
    raw.iter()
        .flat_map(|segment| segment.trim_start_matches('/').split('/'))
        .map(sanitize_token)
        .filter(|token| !token.is_empty())
        .collect()
}

fn sanitize_token(token: &str) -> String {
    let collapsed = collapse_whitespace(token);
    let stripped = strip_relative_prefix(&collapsed);
    stripped
        .chars()
        .map(|c| if is_reserved(c) { REPLACEMENT } else { c })
        .collect()
}

fn collapse_whitespace(token: &str) -> String {
    token.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// A token of only dots, or a leading dot run followed by a separator,
/// is a traversal attempt and collapses to the replacement character.
fn strip_relative_prefix(token: &str) -> String {
    let dots = token.len() - token.trim_start_matches('.').len();
    if dots == 0 {
        return token.to_owned();
    }
    let rest = &token[dots..];
    if rest.is_empty() {
        return REPLACEMENT.to_string();
    }
    if rest.starts_with('\\') || rest.starts_with('/') {
        return format!("{REPLACEMENT}{}", &rest[1..]);
    }
    token.to_owned()
}

fn is_reserved(c: char) -> bool {
    matches!(c, '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*') || c.is_control()
}

#[cfg(feature = "fuzzing")]
pub mod fuzzing {
    /// Runs raw segments through the same sanitization as
    /// `build_entry_dir`.
    pub fn sanitize(raw: &[String]) -> Vec<String> {
        super::sanitize_segments(raw)
    }
}
