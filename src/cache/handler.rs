use std::time::{Duration, SystemTime};

use bytes::Bytes;
use http::header::CONTENT_TYPE;
use http::{HeaderMap, HeaderValue, Method, StatusCode};
use tracing::{debug, trace};

use super::entry::{RequestRecord, ResponseRecord};
use super::key;
use super::store::EntryStore;
use super::synthetic::SyntheticResponse;
use crate::error::CacheResult;
use crate::options::{ResolvedOptions, ResponseTransform};
use crate::request::RequestDescriptor;
use crate::response::{ApiResponse, FetchedResponse};
use crate::route::RouteHandle;

/// Which HTTP methods a registration handles; everything else falls
/// through to the interception facility untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MethodScope {
    All,
    Only(Method),
}

impl MethodScope {
    pub fn accepts(&self, method: &Method) -> bool {
        match self {
            Self::All => true,
            Self::Only(scoped) => scoped == method,
        }
    }
}

/// What the handler did with one intercepted request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandlerOutcome {
    /// Method scope, request predicate, or the global disable switch
    /// handed the request back untouched.
    FellThrough,
    ServedFromCache,
    ServedLive { stored: bool },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CacheDecision {
    Hit,
    Miss(MissReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum MissReason {
    NoEntry,
    Expired,
    Forced,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum WritePlan {
    Store,
    Skip(WriteSkipReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum WriteSkipReason {
    StatusRejected,
    AlreadyFresh,
}

/// Drives one registration's requests through the cache state machine:
/// bypass, hit, or miss with an optional store. The handler keeps no
/// mutable state; workers sharing a cache tree coordinate only through
/// file existence and modification times.
#[derive(Debug)]
pub struct CacheHandler {
    scope: MethodScope,
    options: ResolvedOptions,
}

impl CacheHandler {
    pub fn new(scope: MethodScope, options: ResolvedOptions) -> Self {
        Self { scope, options }
    }

    pub fn options(&self) -> &ResolvedOptions {
        &self.options
    }

    pub async fn handle(&self, route: &mut dyn RouteHandle) -> CacheResult<HandlerOutcome> {
        let request = route.request().clone();

        if self.options.disabled {
            trace!(url = %request.url(), "caching disabled, falling through");
            route.fallthrough().await?;
            return Ok(HandlerOutcome::FellThrough);
        }
        if !self.scope.accepts(request.method()) || !self.options.matches_request(&request) {
            route.fallthrough().await?;
            return Ok(HandlerOutcome::FellThrough);
        }
        if self.options.no_cache {
            let response = self.fetch_live(route, &request).await?;
            self.fulfill_with(route, &request, &response).await?;
            return Ok(HandlerOutcome::ServedLive { stored: false });
        }

        let store = EntryStore::new(key::build_entry_dir(&request, &self.options)?);
        match self.decide(&store).await? {
            CacheDecision::Hit => {
                let (record, body) = store.read().await?;
                trace!(dir = %store.dir().display(), "serving cached response");
                let cached = SyntheticResponse::new(record, body);
                self.fulfill_with(route, &request, &cached).await?;
                Ok(HandlerOutcome::ServedFromCache)
            }
            CacheDecision::Miss(reason) => {
                debug!(dir = %store.dir().display(), reason = ?reason, "cache miss, fetching live");
                let response = self.fetch_live(route, &request).await?;
                let stored = match self.plan_write(&store, response.status()).await? {
                    WritePlan::Store => {
                        let record = ResponseRecord::from_response(&response);
                        store.write(&record, response.body()).await?;
                        if self.options.save_request {
                            store
                                .write_request(&RequestRecord::from_request(&request))
                                .await?;
                        }
                        trace!(dir = %store.dir().display(), "stored response");
                        true
                    }
                    WritePlan::Skip(reason) => {
                        debug!(dir = %store.dir().display(), reason = ?reason, "response not stored");
                        false
                    }
                };
                self.fulfill_with(route, &request, &response).await?;
                Ok(HandlerOutcome::ServedLive { stored })
            }
        }
    }

    pub(crate) async fn decide(&self, store: &EntryStore) -> CacheResult<CacheDecision> {
        if self.options.force_update {
            return Ok(CacheDecision::Miss(MissReason::Forced));
        }
        match store.last_modified().await? {
            None => Ok(CacheDecision::Miss(MissReason::NoEntry)),
            Some(modified) if is_expired(modified, self.options.ttl, SystemTime::now()) => {
                Ok(CacheDecision::Miss(MissReason::Expired))
            }
            Some(_) => Ok(CacheDecision::Hit),
        }
    }

    /// Re-checks staleness right before writing: another worker may have
    /// refreshed the entry while the live fetch was in flight, and that
    /// skip is the one deliberately silent branch in the design.
    pub(crate) async fn plan_write(
        &self,
        store: &EntryStore,
        status: StatusCode,
    ) -> CacheResult<WritePlan> {
        if self.options.force_update {
            return Ok(WritePlan::Store);
        }
        if !self.options.status_accepted(status) {
            return Ok(WritePlan::Skip(WriteSkipReason::StatusRejected));
        }
        let stale = match store.last_modified().await? {
            None => true,
            Some(modified) => is_expired(modified, self.options.ttl, SystemTime::now()),
        };
        if stale {
            Ok(WritePlan::Store)
        } else {
            Ok(WritePlan::Skip(WriteSkipReason::AlreadyFresh))
        }
    }

    async fn fetch_live(
        &self,
        route: &mut dyn RouteHandle,
        request: &RequestDescriptor,
    ) -> CacheResult<FetchedResponse> {
        let overrides = self.options.overrides.as_ref().map(|o| o.resolve(request));
        route.fetch(overrides).await
    }

    async fn fulfill_with(
        &self,
        route: &mut dyn RouteHandle,
        request: &RequestDescriptor,
        response: &dyn ApiResponse,
    ) -> CacheResult<()> {
        match &self.options.transform {
            ResponseTransform::PassThrough => route.fulfill(response).await,
            ResponseTransform::Json(mutate) => {
                let mut value = response.json()?;
                mutate(&mut value)?;
                let body = serde_json::to_vec(&value)?;
                let mut headers = response.headers().clone();
                headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
                let patched = PatchedResponse {
                    url: response.url().to_owned(),
                    status: response.status(),
                    status_text: response.status_text().to_owned(),
                    headers,
                    body: body.into(),
                };
                route.fulfill(&patched).await
            }
            ResponseTransform::Full(edit) => {
                let patch = edit(request, response)?;
                let status_text = match patch.status {
                    Some(status) => status.canonical_reason().unwrap_or_default().to_owned(),
                    None => response.status_text().to_owned(),
                };
                let patched = PatchedResponse {
                    url: response.url().to_owned(),
                    status: patch.status.unwrap_or(response.status()),
                    status_text,
                    headers: patch.headers.unwrap_or_else(|| response.headers().clone()),
                    body: patch.body.unwrap_or_else(|| response.body().clone()),
                };
                route.fulfill(&patched).await
            }
        }
    }
}

/// No TTL means an existing entry never expires. A modification time in
/// the future counts as fresh.
fn is_expired(modified: SystemTime, ttl: Option<Duration>, now: SystemTime) -> bool {
    match ttl {
        None => false,
        Some(ttl) => now.duration_since(modified).is_ok_and(|age| age > ttl),
    }
}

/// Response with the transform applied; what the facility receives.
struct PatchedResponse {
    url: String,
    status: StatusCode,
    status_text: String,
    headers: HeaderMap,
    body: Bytes,
}

impl ApiResponse for PatchedResponse {
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
