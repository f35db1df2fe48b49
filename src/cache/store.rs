use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use bytes::Bytes;
use mime_guess::mime::{self, Mime};
use serde_json::Value;
use tokio::fs as async_fs;
use uuid::Uuid;

use super::entry::{RequestRecord, ResponseRecord};
use crate::error::{CacheError, CacheResult};

const METADATA_FILE: &str = "headers.json";
const REQUEST_FILE: &str = "request.json";

/// Reads and writes the artifacts of a single cache directory. All
/// filesystem mutation stays inside that directory.
#[derive(Debug, Clone)]
pub struct EntryStore {
    dir: PathBuf,
}

impl EntryStore {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn metadata_path(&self) -> PathBuf {
        self.dir.join(METADATA_FILE)
    }

    pub fn request_path(&self) -> PathBuf {
        self.dir.join(REQUEST_FILE)
    }

    /// Body file location depends on the recorded content type, so the
    /// metadata record must be read first.
    pub fn body_path(&self, record: &ResponseRecord) -> PathBuf {
        self.dir
            .join(format!("body.{}", body_extension(record.content_type())))
    }

    /// True iff the metadata file is present.
    pub async fn exists(&self) -> bool {
        async_fs::try_exists(self.metadata_path()).await.unwrap_or(false)
    }

    /// Modification time of the metadata file, `None` when absent.
    pub async fn last_modified(&self) -> CacheResult<Option<SystemTime>> {
        match async_fs::metadata(self.metadata_path()).await {
            Ok(meta) => Ok(Some(meta.modified()?)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    /// Callers check existence and freshness before reading; a missing
    /// entry here is a precondition violation, not a cache miss.
    pub async fn read(&self) -> CacheResult<(ResponseRecord, Bytes)> {
        let metadata = match async_fs::read(self.metadata_path()).await {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                return Err(CacheError::EntryNotFound {
                    dir: self.dir.clone(),
                });
            }
            Err(err) => return Err(err.into()),
        };
        let record: ResponseRecord = serde_json::from_slice(&metadata)?;
        let body = async_fs::read(self.body_path(&record)).await?;
        Ok((record, body.into()))
    }

    /// Persist metadata then body. Each file is published through a
    /// temp-file rename so readers never observe a half-written file;
    /// the metadata/body pair itself is not transactional.
    pub async fn write(&self, record: &ResponseRecord, body: &[u8]) -> CacheResult<()> {
        let extension = body_extension(record.content_type());
        let canonical;
        let payload = if extension == "json" {
            let value: Value = serde_json::from_slice(body)?;
            canonical = serde_json::to_vec_pretty(&value)?;
            canonical.as_slice()
        } else {
            body
        };

        async_fs::create_dir_all(&self.dir).await?;
        let metadata = serde_json::to_vec_pretty(record)?;
        self.publish(METADATA_FILE, &metadata).await?;
        self.publish(&format!("body.{extension}"), payload).await
    }

    pub async fn write_request(&self, record: &RequestRecord) -> CacheResult<()> {
        async_fs::create_dir_all(&self.dir).await?;
        let data = serde_json::to_vec_pretty(record)?;
        self.publish(REQUEST_FILE, &data).await
    }

    async fn publish(&self, filename: &str, data: &[u8]) -> CacheResult<()> {
        let temp = self.dir.join(format!("tmp_{}", Uuid::new_v4()));
        if let Err(err) = async_fs::write(&temp, data).await {
            let _ = async_fs::remove_file(&temp).await;
            return Err(err.into());
        }
        if let Err(err) = async_fs::rename(&temp, self.dir.join(filename)).await {
            let _ = async_fs::remove_file(&temp).await;
            return Err(err.into());
        }
        Ok(())
    }
}

/// File extension for the body blob: `json` for any JSON-ish content
/// type, the first known extension for the mime type otherwise, `bin`
/// when nothing matches.
pub(crate) fn body_extension(content_type: Option<&str>) -> String {
    let Some(content_type) = content_type else {
        return "bin".to_owned();
    };
    let Ok(parsed) = content_type.parse::<Mime>() else {
        return "bin".to_owned();
    };
    if parsed.subtype() == mime::JSON || parsed.suffix() == Some(mime::JSON) {
        return "json".to_owned();
    }
    mime_guess::get_mime_extensions(&parsed)
        .and_then(|extensions| extensions.first())
        .map(|ext| (*ext).to_owned())
        .unwrap_or_else(|| "bin".to_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::{HeaderMap, StatusCode};
    use serde_json::json;
    use tempfile::TempDir;

    use crate::response::FetchedResponse;

    fn store_in(dir: &TempDir) -> EntryStore {
        EntryStore::new(dir.path().join("example.com").join("api").join("GET"))
    }

    fn json_record() -> ResponseRecord {
        let mut headers = HeaderMap::new();
        headers.insert(
            http::header::CONTENT_TYPE,
            "application/json; charset=utf-8".parse().expect("header"),
        );
        let response = FetchedResponse::new(
            "https://example.com/api",
            StatusCode::OK,
            headers,
            &b"{}"[..],
        );
        ResponseRecord::from_response(&response)
    }

    fn record_with_content_type(content_type: &str) -> ResponseRecord {
        let mut record = json_record();
        record.headers.insert(
            "content-type".to_owned(),
            Value::String(content_type.to_owned()),
        );
        record
    }

    #[test]
    fn body_extension_from_content_type() {
        assert_eq!(body_extension(Some("application/json")), "json");
        assert_eq!(body_extension(Some("application/json; charset=utf-8")), "json");
        assert_eq!(body_extension(Some("application/vnd.api+json")), "json");
        assert_eq!(body_extension(Some("image/png")), "png");
        assert_eq!(body_extension(Some("not a mime")), "bin");
        assert_eq!(body_extension(None), "bin");
    }

    #[tokio::test]
    async fn round_trips_json_bodies_in_pretty_form() {
        let dir = TempDir::new().expect("tempdir");
        let store = store_in(&dir);
        let record = json_record();

        store
            .write(&record, br#"{"name":"Tom","paws":4}"#)
            .await
            .expect("write");

        let (read_record, body) = store.read().await.expect("read");
        assert_eq!(read_record.url, record.url);
        assert_eq!(read_record.status, 200);
        assert_eq!(read_record.status_text, "OK");

        let text = std::str::from_utf8(&body).expect("utf8");
        assert!(text.contains('\n'));
        let value: Value = serde_json::from_str(text).expect("json");
        assert_eq!(value, json!({"name": "Tom", "paws": 4}));

        assert!(store.metadata_path().is_file());
        assert!(store.dir().join("body.json").is_file());
    }

    #[tokio::test]
    async fn metadata_is_pretty_printed() {
        let dir = TempDir::new().expect("tempdir");
        let store = store_in(&dir);
        store.write(&json_record(), b"{}").await.expect("write");

        let text = std::fs::read_to_string(store.metadata_path()).expect("read");
        assert!(text.starts_with("{\n"));
        assert!(text.contains(r#""statusText": "OK""#));
    }

    #[tokio::test]
    async fn binary_bodies_are_stored_verbatim() {
        let dir = TempDir::new().expect("tempdir");
        let store = store_in(&dir);
        let record = record_with_content_type("image/png");
        let payload = [0x89u8, b'P', b'N', b'G', 0x00, 0xff];

        store.write(&record, &payload).await.expect("write");

        let (_, body) = store.read().await.expect("read");
        assert_eq!(body.as_ref(), payload);
        assert!(store.dir().join("body.png").is_file());
    }

    #[tokio::test]
    async fn unknown_content_type_falls_back_to_bin() {
        let dir = TempDir::new().expect("tempdir");
        let store = store_in(&dir);
        let record = record_with_content_type("application/x-very-custom");

        store.write(&record, b"opaque").await.expect("write");
        assert!(store.dir().join("body.bin").is_file());
    }

    #[tokio::test]
    async fn read_without_entry_is_not_found() {
        let dir = TempDir::new().expect("tempdir");
        let store = store_in(&dir);
        let err = store.read().await.expect_err("missing entry");
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn last_modified_reflects_metadata_file() {
        let dir = TempDir::new().expect("tempdir");
        let store = store_in(&dir);
        assert!(store.last_modified().await.expect("stat").is_none());
        assert!(!store.exists().await);

        store.write(&json_record(), b"{}").await.expect("write");
        assert!(store.last_modified().await.expect("stat").is_some());
        assert!(store.exists().await);
    }

    #[tokio::test]
    async fn invalid_json_body_rejected_before_anything_is_written() {
        let dir = TempDir::new().expect("tempdir");
        let store = store_in(&dir);
        let err = store
            .write(&json_record(), b"not json at all")
            .await
            .expect_err("invalid body");
        assert!(matches!(err, CacheError::InvalidJson(_)));
        assert!(!store.exists().await);
    }

    #[tokio::test]
    async fn corrupt_metadata_surfaces_parse_error() {
        let dir = TempDir::new().expect("tempdir");
        let store = store_in(&dir);
        std::fs::create_dir_all(store.dir()).expect("mkdir");
        std::fs::write(store.metadata_path(), b"{broken").expect("write");

        let err = store.read().await.expect_err("corrupt metadata");
        assert!(matches!(err, CacheError::InvalidJson(_)));
    }

    #[tokio::test]
    async fn no_temp_files_left_behind() {
        let dir = TempDir::new().expect("tempdir");
        let store = store_in(&dir);
        store.write(&json_record(), b"{}").await.expect("write");
        store
            .write_request(&RequestRecord {
                method: "GET".to_owned(),
                url: "https://example.com/api".to_owned(),
                headers: serde_json::Map::new(),
                body: None,
            })
            .await
            .expect("write request");

        let leftovers: Vec<_> = std::fs::read_dir(store.dir())
            .expect("read dir")
            .filter_map(|entry| entry.ok())
            .filter(|entry| {
                entry
                    .file_name()
                    .to_str()
                    .map(|name| name.starts_with("tmp_"))
                    .unwrap_or(false)
            })
            .collect();
        assert!(leftovers.is_empty());
        assert!(store.request_path().is_file());
    }
}
