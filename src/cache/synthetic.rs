use bytes::Bytes;
use http::{HeaderMap, StatusCode};

use super::entry::ResponseRecord;
use crate::response::ApiResponse;

/// A stored entry replayed behind the live-response capability surface.
/// Construction touches neither network nor disk.
#[derive(Debug, Clone)]
pub struct SyntheticResponse {
    record: ResponseRecord,
    headers: HeaderMap,
    body: Bytes,
}

impl SyntheticResponse {
    pub fn new(record: ResponseRecord, body: impl Into<Bytes>) -> Self {
        let headers = record.header_map();
        Self {
            record,
            headers,
            body: body.into(),
        }
    }

    pub fn record(&self) -> &ResponseRecord {
        &self.record
    }
}

impl ApiResponse for SyntheticResponse {
    fn url(&self) -> &str {
        &self.record.url
    }

    fn status(&self) -> StatusCode {
        self.record.status_code()
    }

    fn status_text(&self) -> &str {
        &self.record.status_text
    }

    fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    fn body(&self) -> &Bytes {
        &self.body
    }
}
