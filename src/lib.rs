//! Disk-backed cache for HTTP responses observed during automated tests.
//!
//! An interception facility (a browser automation framework, a proxy, a
//! test harness) hands each intercepted request to a [`CacheHandler`];
//! the handler either replays a response recorded on disk or performs
//! the live call and records it. Subsequent runs then work offline and
//! deterministically. Entries live in a human-readable directory tree
//! keyed by hostname, path, and method, one `headers.json` plus one
//! body file per entry.

pub mod cache;
pub mod error;
pub mod options;
pub mod request;
pub mod response;
pub mod route;
pub mod settings;

pub use cache::{
    CacheHandler, EntryStore, HandlerOutcome, KeyParts, MethodScope, RequestRecord,
    ResponseRecord, SyntheticResponse, default_segments,
};
pub use error::{CacheError, CacheResult};
pub use options::{
    CacheOptions, DirFn, GlobalConfig, RequestPredicate, ResolvedOptions, ResponseOverride,
    ResponseTransform, Segments, ValueOrFn, resolve_options,
};
pub use request::RequestDescriptor;
pub use response::{ApiResponse, FetchedResponse};
pub use route::{FetchOverrides, RouteHandle};
pub use settings::{CacheStrategy, Settings};
