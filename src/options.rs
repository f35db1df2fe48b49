use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use http::StatusCode;
use serde_json::Value;

use crate::cache::key::KeyParts;
use crate::error::CacheResult;
use crate::request::RequestDescriptor;
use crate::response::ApiResponse;
use crate::route::FetchOverrides;
use crate::settings::Settings;

pub const DEFAULT_BASE_DIR: &str = ".network-cache";

/// Option that is either a fixed value or computed per request.
#[derive(Clone)]
pub enum ValueOrFn<T> {
    Literal(T),
    Computed(Arc<dyn Fn(&RequestDescriptor) -> T + Send + Sync>),
}

impl<T: Clone> ValueOrFn<T> {
    pub fn computed(f: impl Fn(&RequestDescriptor) -> T + Send + Sync + 'static) -> Self {
        Self::Computed(Arc::new(f))
    }

    pub fn resolve(&self, request: &RequestDescriptor) -> T {
        match self {
            Self::Literal(value) => value.clone(),
            Self::Computed(f) => f(request),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for ValueOrFn<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Literal(value) => f.debug_tuple("Literal").field(value).finish(),
            Self::Computed(_) => f.write_str("Computed(..)"),
        }
    }
}

/// Extra key segments appended after the HTTP method segment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Segments(Vec<String>);

impl Segments {
    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    pub fn into_vec(self) -> Vec<String> {
        self.0
    }
}

impl From<&str> for Segments {
    fn from(segment: &str) -> Self {
        Self(vec![segment.to_owned()])
    }
}

impl From<String> for Segments {
    fn from(segment: String) -> Self {
        Self(vec![segment])
    }
}

impl From<Vec<String>> for Segments {
    fn from(segments: Vec<String>) -> Self {
        Self(segments)
    }
}

impl From<&[&str]> for Segments {
    fn from(segments: &[&str]) -> Self {
        Self(segments.iter().map(|s| (*s).to_owned()).collect())
    }
}

impl<const N: usize> From<[&str; N]> for Segments {
    fn from(segments: [&str; N]) -> Self {
        Self(segments.iter().map(|s| (*s).to_owned()).collect())
    }
}

/// Replaces the default segment ordering wholesale; the returned raw
/// segments still go through sanitization.
#[derive(Clone)]
pub struct DirFn(Arc<dyn Fn(&KeyParts<'_>) -> Vec<String> + Send + Sync>);

impl DirFn {
    pub fn new(f: impl Fn(&KeyParts<'_>) -> Vec<String> + Send + Sync + 'static) -> Self {
        Self(Arc::new(f))
    }

    pub fn call(&self, parts: &KeyParts<'_>) -> Vec<String> {
        (self.0)(parts)
    }
}

impl fmt::Debug for DirFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("DirFn(..)")
    }
}

/// Narrows which requests a registration handles beyond the method scope.
#[derive(Clone)]
pub struct RequestPredicate(Arc<dyn Fn(&RequestDescriptor) -> bool + Send + Sync>);

impl RequestPredicate {
    pub fn new(f: impl Fn(&RequestDescriptor) -> bool + Send + Sync + 'static) -> Self {
        Self(Arc::new(f))
    }

    pub fn matches(&self, request: &RequestDescriptor) -> bool {
        (self.0)(request)
    }
}

impl fmt::Debug for RequestPredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("RequestPredicate(..)")
    }
}

/// Partial replacement for the response about to be fulfilled. Unset
/// fields keep the values of the underlying response.
#[derive(Debug, Clone, Default)]
pub struct ResponseOverride {
    pub status: Option<StatusCode>,
    pub headers: Option<http::HeaderMap>,
    pub body: Option<bytes::Bytes>,
}

/// Applied to the chosen response (live or replayed) right before it is
/// handed back to the interception facility. The store always keeps the
/// untransformed response.
#[derive(Clone, Default)]
pub enum ResponseTransform {
    #[default]
    PassThrough,
    /// Parse the body as JSON, mutate it in place, re-serialize.
    Json(Arc<dyn Fn(&mut Value) -> CacheResult<()> + Send + Sync>),
    /// Arbitrary rewrite of status, headers, and body.
    Full(Arc<dyn Fn(&RequestDescriptor, &dyn ApiResponse) -> CacheResult<ResponseOverride> + Send + Sync>),
}

impl ResponseTransform {
    pub fn json(f: impl Fn(&mut Value) -> CacheResult<()> + Send + Sync + 'static) -> Self {
        Self::Json(Arc::new(f))
    }

    pub fn full(
        f: impl Fn(&RequestDescriptor, &dyn ApiResponse) -> CacheResult<ResponseOverride>
        + Send
        + Sync
        + 'static,
    ) -> Self {
        Self::Full(Arc::new(f))
    }
}

impl fmt::Debug for ResponseTransform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PassThrough => f.write_str("PassThrough"),
            Self::Json(_) => f.write_str("Json(..)"),
            Self::Full(_) => f.write_str("Full(..)"),
        }
    }
}

/// Process-wide defaults; the only place the global disable switch lives.
#[derive(Debug, Clone)]
pub struct GlobalConfig {
    pub base_dir: PathBuf,
    pub ttl_minutes: Option<u64>,
    pub disabled: bool,
    pub dir_fn: Option<DirFn>,
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            base_dir: PathBuf::from(DEFAULT_BASE_DIR),
            ttl_minutes: None,
            disabled: false,
            dir_fn: None,
        }
    }
}

impl GlobalConfig {
    /// Defaults overlaid with the `NETWORK_CACHE_*` environment variables.
    pub fn from_env() -> CacheResult<Self> {
        Ok(Settings::load()?.apply(Self::default()))
    }
}

/// One layer of optional knobs. Unset fields defer to the layer below;
/// see [`resolve_options`] for precedence.
#[derive(Debug, Clone, Default)]
pub struct CacheOptions {
    pub base_dir: Option<PathBuf>,
    pub extra_dir: Option<ValueOrFn<Segments>>,
    pub dir_fn: Option<DirFn>,
    pub ttl_minutes: Option<u64>,
    pub match_status: Option<StatusCode>,
    pub no_cache: Option<bool>,
    pub force_update: Option<bool>,
    pub save_request: Option<bool>,
    pub overrides: Option<ValueOrFn<FetchOverrides>>,
    pub transform: Option<ResponseTransform>,
    pub matches: Option<RequestPredicate>,
}

impl CacheOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn base_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.base_dir = Some(dir.into());
        self
    }

    pub fn extra_dir(mut self, segments: impl Into<Segments>) -> Self {
        self.extra_dir = Some(ValueOrFn::Literal(segments.into()));
        self
    }

    pub fn extra_dir_fn(
        mut self,
        f: impl Fn(&RequestDescriptor) -> Segments + Send + Sync + 'static,
    ) -> Self {
        self.extra_dir = Some(ValueOrFn::computed(f));
        self
    }

    pub fn dir_fn(mut self, f: impl Fn(&KeyParts<'_>) -> Vec<String> + Send + Sync + 'static) -> Self {
        self.dir_fn = Some(DirFn::new(f));
        self
    }

    pub fn ttl_minutes(mut self, minutes: u64) -> Self {
        self.ttl_minutes = Some(minutes);
        self
    }

    pub fn match_status(mut self, status: StatusCode) -> Self {
        self.match_status = Some(status);
        self
    }

    pub fn no_cache(mut self, value: bool) -> Self {
        self.no_cache = Some(value);
        self
    }

    pub fn force_update(mut self, value: bool) -> Self {
        self.force_update = Some(value);
        self
    }

    pub fn save_request(mut self, value: bool) -> Self {
        self.save_request = Some(value);
        self
    }

    pub fn overrides(mut self, overrides: FetchOverrides) -> Self {
        self.overrides = Some(ValueOrFn::Literal(overrides));
        self
    }

    pub fn overrides_fn(
        mut self,
        f: impl Fn(&RequestDescriptor) -> FetchOverrides + Send + Sync + 'static,
    ) -> Self {
        self.overrides = Some(ValueOrFn::computed(f));
        self
    }

    pub fn transform(mut self, transform: ResponseTransform) -> Self {
        self.transform = Some(transform);
        self
    }

    pub fn match_request(
        mut self,
        f: impl Fn(&RequestDescriptor) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.matches = Some(RequestPredicate::new(f));
        self
    }
}

/// Effective configuration for one registration, every field settled.
#[derive(Debug, Clone)]
pub struct ResolvedOptions {
    pub base_dir: PathBuf,
    pub disabled: bool,
    pub extra_dir: Option<ValueOrFn<Segments>>,
    pub dir_fn: Option<DirFn>,
    pub ttl: Option<Duration>,
    pub match_status: Option<StatusCode>,
    pub no_cache: bool,
    pub force_update: bool,
    pub save_request: bool,
    pub overrides: Option<ValueOrFn<FetchOverrides>>,
    pub transform: ResponseTransform,
    pub matches: Option<RequestPredicate>,
}

/// Merge precedence: per-call options over registration options over
/// global defaults. A later layer wins only where it sets a field, so
/// `Some(false)` on a flag deliberately switches it back off.
pub fn resolve_options(
    global: &GlobalConfig,
    registration: Option<&CacheOptions>,
    call: Option<&CacheOptions>,
) -> ResolvedOptions {
    let mut resolved = ResolvedOptions {
        base_dir: global.base_dir.clone(),
        disabled: global.disabled,
        extra_dir: None,
        dir_fn: global.dir_fn.clone(),
        ttl: global.ttl_minutes.map(ttl_from_minutes),
        match_status: None,
        no_cache: false,
        force_update: false,
        save_request: false,
        overrides: None,
        transform: ResponseTransform::PassThrough,
        matches: None,
    };
    for layer in [registration, call].into_iter().flatten() {
        resolved.apply(layer);
    }
    resolved
}

impl ResolvedOptions {
    fn apply(&mut self, layer: &CacheOptions) {
        if let Some(dir) = &layer.base_dir {
            self.base_dir = dir.clone();
        }
        if let Some(extra) = &layer.extra_dir {
            self.extra_dir = Some(extra.clone());
        }
        if let Some(dir_fn) = &layer.dir_fn {
            self.dir_fn = Some(dir_fn.clone());
        }
        if let Some(minutes) = layer.ttl_minutes {
            self.ttl = Some(ttl_from_minutes(minutes));
        }
        if let Some(status) = layer.match_status {
            self.match_status = Some(status);
        }
        if let Some(no_cache) = layer.no_cache {
            self.no_cache = no_cache;
        }
        if let Some(force_update) = layer.force_update {
            self.force_update = force_update;
        }
        if let Some(save_request) = layer.save_request {
            self.save_request = save_request;
        }
        if let Some(overrides) = &layer.overrides {
            self.overrides = Some(overrides.clone());
        }
        if let Some(transform) = &layer.transform {
            self.transform = transform.clone();
        }
        if let Some(matches) = &layer.matches {
            self.matches = Some(matches.clone());
        }
    }

    pub fn matches_request(&self, request: &RequestDescriptor) -> bool {
        self.matches.as_ref().is_none_or(|p| p.matches(request))
    }

    /// Default filter accepts any 2xx; an explicit filter requires an
    /// exact status match.
    pub fn status_accepted(&self, status: StatusCode) -> bool {
        match self.match_status {
            Some(want) => status == want,
            None => status.is_success(),
        }
    }
}

fn ttl_from_minutes(minutes: u64) -> Duration {
    Duration::from_secs(minutes.saturating_mul(60))
}
