use std::path::PathBuf;

use thiserror::Error;

pub type CacheResult<T> = Result<T, CacheError>;

/// Failures surfaced by cache operations. I/O errors pass through
/// unwrapped; retry policy belongs to the caller.
#[derive(Debug, Error)]
pub enum CacheError {
    /// Every key segment sanitized away to nothing, so the entry would
    /// land directly in the base directory. Always a misconfiguration.
    #[error("cache key for {url} has no usable path segments")]
    EmptyCacheKey { url: String },

    /// A read was issued without a prior existence check.
    #[error("no cache entry at {}", dir.display())]
    EntryNotFound { dir: PathBuf },

    #[error("cached body is not valid UTF-8")]
    InvalidUtf8(#[from] std::str::Utf8Error),

    #[error("body is not valid JSON")]
    InvalidJson(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl CacheError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, CacheError::EntryNotFound { .. })
    }
}
