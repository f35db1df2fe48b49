use http::header::SET_COOKIE;
use http::{HeaderMap, HeaderValue, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::request::RequestDescriptor;
use crate::response::ApiResponse;

/// Metadata half of a stored entry, persisted as `headers.json`.
/// Header insertion order is kept for readability of the file on disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseRecord {
    pub url: String,
    pub status: u16,
    pub status_text: String,
    pub headers: Map<String, Value>,
}

impl ResponseRecord {
    pub fn from_response(response: &dyn ApiResponse) -> Self {
        Self {
            url: response.url().to_owned(),
            status: response.status().as_u16(),
            status_text: response.status_text().to_owned(),
            headers: headers_to_map(response.headers()),
        }
    }

    pub fn status_code(&self) -> StatusCode {
        StatusCode::from_u16(self.status).unwrap_or(StatusCode::OK)
    }

    pub fn content_type(&self) -> Option<&str> {
        self.headers
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case("content-type"))
            .and_then(|(_, value)| value.as_str())
    }

    /// Rebuild a header map, unfolding multi-line cookie values. Names
    /// or values that are not valid on the wire are dropped.
    pub fn header_map(&self) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in &self.headers {
            let Some(value) = value.as_str() else {
                continue;
            };
            let Ok(name) = http::header::HeaderName::try_from(name.as_str()) else {
                continue;
            };
            if name == SET_COOKIE {
                for line in value.split('\n') {
                    if let Ok(value) = HeaderValue::from_str(line) {
                        map.append(name.clone(), value);
                    }
                }
            } else if let Ok(value) = HeaderValue::from_str(value) {
                map.append(name, value);
            }
        }
        map
    }
}

/// Optional third artifact, persisted as `request.json` when the
/// registration asks for it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestRecord {
    pub method: String,
    pub url: String,
    pub headers: Map<String, Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
}

impl RequestRecord {
    pub fn from_request(request: &RequestDescriptor) -> Self {
        Self {
            method: request.method().to_string(),
            url: request.url().to_string(),
            headers: headers_to_map(request.headers()),
            body: request
                .body()
                .map(|b| String::from_utf8_lossy(b).into_owned()),
        }
    }
}

/// Fold a header map into a JSON object: one key per name, repeated
/// values comma-joined, cookies newline-joined so they survive the trip
/// back through `header_map`.
fn headers_to_map(headers: &HeaderMap) -> Map<String, Value> {
    let mut map = Map::new();
    for name in headers.keys() {
        let separator = if name == &SET_COOKIE { "\n" } else { ", " };
        let joined = headers
            .get_all(name)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .collect::<Vec<_>>()
            .join(separator);
        map.insert(name.as_str().to_owned(), Value::String(joined));
    }
    map
}
