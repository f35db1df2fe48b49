use bytes::Bytes;
use http::{HeaderMap, StatusCode};
use serde_json::Value;

use crate::error::CacheResult;

/// Capability surface shared by live responses and responses replayed
/// from disk. Callers downstream of the handler cannot tell the two
/// apart, which is the point.
pub trait ApiResponse: Send + Sync {
    fn url(&self) -> &str;
    fn status(&self) -> StatusCode;
    fn status_text(&self) -> &str;
    fn headers(&self) -> &HeaderMap;
    fn body(&self) -> &Bytes;

    fn ok(&self) -> bool {
        self.status().is_success()
    }

    /// Headers as enumerable pairs, repeated names preserved.
    fn header_pairs(&self) -> Vec<(String, String)> {
        self.headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_owned(), v.to_owned()))
            })
            .collect()
    }

    fn text(&self) -> CacheResult<String> {
        Ok(std::str::from_utf8(self.body())?.to_owned())
    }

    fn json(&self) -> CacheResult<Value> {
        Ok(serde_json::from_slice(self.body())?)
    }

    /// No-op; the capability contract of some interception facilities
    /// requires an explicit release hook.
    fn dispose(&self) {}
}

/// Response obtained from a live fetch through the interception facility.
#[derive(Debug, Clone)]
pub struct FetchedResponse {
    url: String,
    status: StatusCode,
    status_text: String,
    headers: HeaderMap,
    body: Bytes,
}

impl FetchedResponse {
    pub fn new(
        url: impl Into<String>,
        status: StatusCode,
        headers: HeaderMap,
        body: impl Into<Bytes>,
    ) -> Self {
        Self {
            url: url.into(),
            status,
            status_text: status.canonical_reason().unwrap_or_default().to_owned(),
            headers,
            body: body.into(),
        }
    }

    /// Replace the reason phrase when the facility reports one that
    /// differs from the canonical text.
    pub fn with_status_text(mut self, status_text: impl Into<String>) -> Self {
        self.status_text = status_text.into();
        self
    }
}

impl ApiResponse for FetchedResponse {
    fn url(&self) -> &str {
        &self.url
    }

    fn status(&self) -> StatusCode {
        self.status
    }

    fn status_text(&self) -> &str {
        &self.status_text
    }

    fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    fn body(&self) -> &Bytes {
        &self.body
    }
}
