use async_trait::async_trait;
use bytes::Bytes;
use http::HeaderMap;

use crate::error::CacheResult;
use crate::request::RequestDescriptor;
use crate::response::{ApiResponse, FetchedResponse};

/// Substitutions applied to the live fetch while leaving the cache key
/// untouched; the key is always derived from the original request.
#[derive(Debug, Clone, Default)]
pub struct FetchOverrides {
    pub headers: Option<HeaderMap>,
    pub body: Option<Bytes>,
}

impl FetchOverrides {
    pub fn is_empty(&self) -> bool {
        self.headers.is_none() && self.body.is_none()
    }
}

/// One intercepted request held open by the interception facility.
///
/// The handler drives exactly one of three terminal calls per request:
/// `fetch` followed by `fulfill`, `fulfill` alone (cache hit), or
/// `fallthrough`. Implementations own wire concerns such as recomputing
/// content-length for a fulfilled body.
#[async_trait]
pub trait RouteHandle: Send {
    fn request(&self) -> &RequestDescriptor;

    /// Perform the live network call, optionally with header/body
    /// substitutions.
    async fn fetch(&mut self, overrides: Option<FetchOverrides>) -> CacheResult<FetchedResponse>;

    /// Answer the intercepted request with the given response.
    async fn fulfill(&mut self, response: &dyn ApiResponse) -> CacheResult<()>;

    /// Hand the request back to the facility untouched.
    async fn fallthrough(&mut self) -> CacheResult<()>;
}
