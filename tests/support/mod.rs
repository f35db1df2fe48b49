#![allow(dead_code)]

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, SystemTime};

use async_trait::async_trait;
use bytes::Bytes;
use http::{HeaderMap, Method, StatusCode, Uri};
use tempfile::TempDir;

use netstash::{
    ApiResponse, CacheHandler, CacheOptions, CacheResult, FetchOverrides, FetchedResponse,
    GlobalConfig, MethodScope, RequestDescriptor, RouteHandle, resolve_options,
};

pub type Responder =
    Arc<dyn Fn(&RequestDescriptor, Option<&FetchOverrides>) -> FetchedResponse + Send + Sync>;

/// Scripted stand-in for an interception facility holding one request.
/// Counts live fetches and captures whatever gets fulfilled.
pub struct StubRoute {
    request: RequestDescriptor,
    responder: Responder,
    fetch_delay: Option<Duration>,
    live_calls: Arc<AtomicUsize>,
    pub fulfilled: Option<CapturedResponse>,
    pub fell_through: bool,
}

/// Owned copy of the response handed to `fulfill`.
#[derive(Debug, Clone)]
pub struct CapturedResponse {
    pub url: String,
    pub status: StatusCode,
    pub status_text: String,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl CapturedResponse {
    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    pub fn json(&self) -> serde_json::Value {
        serde_json::from_slice(&self.body).expect("fulfilled body is json")
    }
}

impl StubRoute {
    pub fn new(
        request: RequestDescriptor,
        responder: impl Fn(&RequestDescriptor, Option<&FetchOverrides>) -> FetchedResponse
        + Send
        + Sync
        + 'static,
    ) -> Self {
        Self {
            request,
            responder: Arc::new(responder),
            fetch_delay: None,
            live_calls: Arc::new(AtomicUsize::new(0)),
            fulfilled: None,
            fell_through: false,
        }
    }

    /// Serve a fixed JSON body for every live fetch.
    pub fn json(url: &str, body: &str) -> Self {
        let body = body.to_owned();
        let url_owned = url.to_owned();
        Self::new(get(url), move |_, _| {
            json_response(&url_owned, &body)
        })
    }

    /// Serve a fixed status with an empty JSON body.
    pub fn with_status(url: &str, status: StatusCode) -> Self {
        let url_owned = url.to_owned();
        Self::new(get(url), move |_, _| {
            let mut headers = HeaderMap::new();
            headers.insert(
                http::header::CONTENT_TYPE,
                "application/json".parse().expect("header"),
            );
            FetchedResponse::new(url_owned.clone(), status, headers, &b"{}"[..])
        })
    }

    pub fn with_fetch_delay(mut self, delay: Duration) -> Self {
        self.fetch_delay = Some(delay);
        self
    }

    pub fn live_calls(&self) -> usize {
        self.live_calls.load(Ordering::SeqCst)
    }

    pub fn captured(&self) -> &CapturedResponse {
        self.fulfilled.as_ref().expect("route was fulfilled")
    }
}

#[async_trait]
impl RouteHandle for StubRoute {
    fn request(&self) -> &RequestDescriptor {
        &self.request
    }

    async fn fetch(&mut self, overrides: Option<FetchOverrides>) -> CacheResult<FetchedResponse> {
        if let Some(delay) = self.fetch_delay {
            tokio::time::sleep(delay).await;
        }
        self.live_calls.fetch_add(1, Ordering::SeqCst);
        Ok((self.responder)(&self.request, overrides.as_ref()))
    }

    async fn fulfill(&mut self, response: &dyn ApiResponse) -> CacheResult<()> {
        self.fulfilled = Some(CapturedResponse {
            url: response.url().to_owned(),
            status: response.status(),
            status_text: response.status_text().to_owned(),
            headers: response.headers().clone(),
            body: response.body().clone(),
        });
        Ok(())
    }

    async fn fallthrough(&mut self) -> CacheResult<()> {
        self.fell_through = true;
        Ok(())
    }
}

pub fn get(url: &str) -> RequestDescriptor {
    let uri: Uri = url.parse().expect("parse url");
    RequestDescriptor::new(Method::GET, uri)
}

pub fn json_response(url: &str, body: &str) -> FetchedResponse {
    let mut headers = HeaderMap::new();
    headers.insert(
        http::header::CONTENT_TYPE,
        "application/json".parse().expect("header"),
    );
    FetchedResponse::new(url.to_owned(), StatusCode::OK, headers, body.as_bytes().to_vec())
}

/// Handler rooted at `base` with every method in scope.
pub fn handler_in(base: &Path, options: CacheOptions) -> CacheHandler {
    let global = GlobalConfig {
        base_dir: base.to_path_buf(),
        ..GlobalConfig::default()
    };
    CacheHandler::new(
        MethodScope::All,
        resolve_options(&global, Some(&options), None),
    )
}

pub fn handler_with_scope(base: &Path, scope: MethodScope, options: CacheOptions) -> CacheHandler {
    let global = GlobalConfig {
        base_dir: base.to_path_buf(),
        ..GlobalConfig::default()
    };
    CacheHandler::new(scope, resolve_options(&global, Some(&options), None))
}

pub fn setup() -> TempDir {
    init_tracing();
    TempDir::new().expect("tempdir")
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("netstash=trace")),
        )
        .with_test_writer()
        .try_init();
}

/// Rewind a file's modification time, for exercising TTL expiry.
pub fn backdate(path: &Path, age: Duration) {
    let file = std::fs::File::options()
        .write(true)
        .open(path)
        .expect("open file for backdating");
    file.set_modified(SystemTime::now() - age)
        .expect("set mtime");
}

pub fn mtime(path: &Path) -> SystemTime {
    std::fs::metadata(path)
        .expect("stat file")
        .modified()
        .expect("mtime")
}
