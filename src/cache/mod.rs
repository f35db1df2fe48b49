pub mod entry;
pub mod handler;
pub mod key;
pub mod store;
pub mod synthetic;

pub use entry::{RequestRecord, ResponseRecord};
pub use handler::{CacheHandler, HandlerOutcome, MethodScope};
pub use key::{KeyParts, default_segments};
pub use store::EntryStore;
pub use synthetic::SyntheticResponse;
