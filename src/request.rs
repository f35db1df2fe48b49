use bytes::Bytes;
use http::{HeaderMap, Method, Uri};

/// Immutable view of one intercepted request: everything the cache needs
/// to derive a key and replay the call against the live server.
#[derive(Debug, Clone)]
pub struct RequestDescriptor {
    method: Method,
    url: Uri,
    headers: HeaderMap,
    body: Option<Bytes>,
}

impl RequestDescriptor {
    pub fn new(method: Method, url: Uri) -> Self {
        Self {
            method,
            url,
            headers: HeaderMap::new(),
            body: None,
        }
    }

    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn url(&self) -> &Uri {
        &self.url
    }

    /// Host component of the URL, empty for scheme-relative inputs.
    pub fn hostname(&self) -> &str {
        self.url.host().unwrap_or_default()
    }

    /// Path component, always starting with `/` for absolute URLs.
    pub fn path(&self) -> &str {
        self.url.path()
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn body(&self) -> Option<&Bytes> {
        self.body.as_ref()
    }
}
