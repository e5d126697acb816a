//! HTTP blob store speaking the Supabase storage REST API.
//!
//! Objects are downloaded with `GET /storage/v1/object/<bucket>/<object>` and
//! buckets are listed with `POST /storage/v1/object/list/<bucket>`. The API
//! key is sent both as a bearer token and as the `apikey` header.

use std::time::Duration;

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use url::Url;

use crate::error::{StoreError, StoreResult};
use crate::store::{BlobStore, BoxFuture};

const BACKEND: &str = "http";

/// Page size used when listing a bucket.
const LIST_PAGE_SIZE: usize = 1000;

/// Connection settings for [`HttpBlobStore`].
#[derive(Debug, Clone)]
pub struct HttpStoreConfig {
    /// Project base URL (e.g., `https://xyz.supabase.co`).
    pub base_url: Url,
    /// API key, already resolved from any secret reference.
    pub api_key: String,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl HttpStoreConfig {
    /// Creates a configuration, validating the base URL.
    pub fn new(base_url: &str, api_key: impl Into<String>) -> StoreResult<Self> {
        let base_url = Url::parse(base_url).map_err(|e| {
            StoreError::configuration(format!("invalid store URL `{}`", base_url)).with_source(e)
        })?;
        if !matches!(base_url.scheme(), "http" | "https") {
            return Err(StoreError::configuration(format!(
                "store URL must be http or https, got `{}`",
                base_url.scheme()
            )));
        }

        let api_key = api_key.into();
        if api_key.is_empty() {
            return Err(StoreError::configuration("store API key is empty"));
        }

        Ok(Self {
            base_url,
            api_key,
            timeout: Duration::from_secs(30),
        })
    }

    /// Builder: set the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[derive(Debug, Serialize)]
struct ListBody<'a> {
    prefix: &'a str,
    limit: usize,
    offset: usize,
    #[serde(rename = "sortBy")]
    sort_by: SortBy,
}

#[derive(Debug, Serialize)]
struct SortBy {
    column: &'static str,
    order: &'static str,
}

#[derive(Debug, Deserialize)]
struct ListEntry {
    name: String,
    /// Folders are returned with a null id.
    #[serde(default)]
    id: Option<String>,
}

/// A [`BlobStore`] backed by a remote storage REST service.
#[derive(Debug)]
pub struct HttpBlobStore {
    http_client: reqwest::Client,
    config: HttpStoreConfig,
}

impl HttpBlobStore {
    /// Creates a new HTTP store.
    pub fn new(config: HttpStoreConfig) -> StoreResult<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| StoreError::configuration("failed to create HTTP client").with_source(e))?;

        Ok(Self {
            http_client,
            config,
        })
    }

    /// Builds `<base>/storage/v1/object/<segments...>` with each segment
    /// percent-encoded.
    fn object_url(&self, segments: &[&str]) -> String {
        let base = self.config.base_url.as_str().trim_end_matches('/');
        let path = segments
            .iter()
            .map(|s| urlencoding::encode(s).into_owned())
            .collect::<Vec<_>>()
            .join("/");
        format!("{}/storage/v1/object/{}", base, path)
    }

    fn map_send_error(e: reqwest::Error) -> StoreError {
        if e.is_timeout() {
            StoreError::network("request timeout")
        } else if e.is_connect() {
            StoreError::network(format!("connection failed: {}", e))
        } else {
            StoreError::network(format!("request failed: {}", e))
        }
    }

    async fn download(&self, bucket: &str, object: &str) -> StoreResult<Bytes> {
        if bucket.is_empty() || object.is_empty() {
            return Err(StoreError::invalid_name("bucket and object must not be empty"));
        }

        let url = self.object_url(&[bucket, object]);
        let start = std::time::Instant::now();

        let response = self
            .http_client
            .get(&url)
            .bearer_auth(&self.config.api_key)
            .header("apikey", &self.config.api_key)
            .send()
            .await
            .map_err(Self::map_send_error)?;

        let status = response.status();

        // Storage reports a missing object as 404, or as 400 with a not_found body.
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(StoreError::not_found(format!("object `{}/{}`", bucket, object)));
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            if status == reqwest::StatusCode::BAD_REQUEST && body.contains("not_found") {
                return Err(StoreError::not_found(format!("object `{}/{}`", bucket, object)));
            }
            return Err(StoreError::backend(format!("API error ({}): {}", status, body)));
        }

        let data = response
            .bytes()
            .await
            .map_err(|e| StoreError::network(format!("failed to read response: {}", e)))?;

        debug!(
            bucket,
            object,
            size_bytes = data.len(),
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "HTTP store fetch"
        );

        Ok(data)
    }

    async fn list_page(&self, bucket: &str, offset: usize) -> StoreResult<Vec<ListEntry>> {
        let url = self.object_url(&["list", bucket]);
        let body = ListBody {
            prefix: "",
            limit: LIST_PAGE_SIZE,
            offset,
            sort_by: SortBy {
                column: "name",
                order: "asc",
            },
        };

        let response = self
            .http_client
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .header("apikey", &self.config.api_key)
            .json(&body)
            .send()
            .await
            .map_err(Self::map_send_error)?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(StoreError::not_found(format!("bucket `{}`", bucket)));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StoreError::backend(format!("API error ({}): {}", status, body)));
        }

        let text = response
            .text()
            .await
            .map_err(|e| StoreError::network(format!("failed to read response: {}", e)))?;

        serde_json::from_str(&text)
            .map_err(|e| StoreError::backend("failed to parse list response").with_source(e))
    }

    async fn list_all(&self, bucket: &str) -> StoreResult<Vec<String>> {
        if bucket.is_empty() {
            return Err(StoreError::invalid_name("bucket must not be empty"));
        }

        let mut names = Vec::new();
        let mut offset = 0;
        loop {
            let page = self.list_page(bucket, offset).await?;
            let count = page.len();
            names.extend(files_only(page));

            if count < LIST_PAGE_SIZE {
                break;
            }
            offset += count;
        }

        if names.is_empty() {
            warn!(bucket, "Bucket listing is empty; the bucket may be private or misnamed");
        }

        names.sort();
        Ok(names)
    }
}

/// Keeps file entries, dropping folders and placeholder objects.
fn files_only(entries: Vec<ListEntry>) -> impl Iterator<Item = String> {
    entries
        .into_iter()
        .filter(|e| e.id.is_some() && !e.name.starts_with('.'))
        .map(|e| e.name)
}

impl BlobStore for HttpBlobStore {
    fn name(&self) -> &str {
        BACKEND
    }

    fn fetch<'a>(&'a self, bucket: &'a str, object: &'a str) -> BoxFuture<'a, StoreResult<Bytes>> {
        Box::pin(async move {
            self.download(bucket, object)
                .await
                .map_err(|e| e.with_backend(BACKEND))
        })
    }

    fn list<'a>(&'a self, bucket: &'a str) -> BoxFuture<'a, StoreResult<Vec<String>>> {
        Box::pin(async move { self.list_all(bucket).await.map_err(|e| e.with_backend(BACKEND)) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreErrorCode;

    fn store() -> HttpBlobStore {
        let config = HttpStoreConfig::new("https://project.supabase.co/", "key").unwrap();
        HttpBlobStore::new(config).unwrap()
    }

    #[test]
    fn config_rejects_bad_urls() {
        let err = HttpStoreConfig::new("not a url", "key").unwrap_err();
        assert_eq!(err.code(), StoreErrorCode::ConfigurationError);

        let err = HttpStoreConfig::new("ftp://example.com", "key").unwrap_err();
        assert_eq!(err.code(), StoreErrorCode::ConfigurationError);

        let err = HttpStoreConfig::new("https://example.com", "").unwrap_err();
        assert_eq!(err.code(), StoreErrorCode::ConfigurationError);
    }

    #[test]
    fn config_timeout_builder() {
        let config = HttpStoreConfig::new("https://example.com", "key")
            .unwrap()
            .with_timeout(Duration::from_secs(5));
        assert_eq!(config.timeout, Duration::from_secs(5));
    }

    #[test]
    fn object_url_encodes_segments() {
        let store = store();
        assert_eq!(
            store.object_url(&["A_Server", "my video.mp4"]),
            "https://project.supabase.co/storage/v1/object/A_Server/my%20video.mp4"
        );
        assert_eq!(
            store.object_url(&["list", "demo"]),
            "https://project.supabase.co/storage/v1/object/list/demo"
        );
    }

    #[test]
    fn list_response_filters_folders() {
        let json = r#"[
            {"name": "a.mp4", "id": "1"},
            {"name": "folder", "id": null},
            {"name": ".emptyFolderPlaceholder", "id": "2"},
            {"name": "b.mp4", "id": "3", "metadata": {"size": 10}}
        ]"#;
        let entries: Vec<ListEntry> = serde_json::from_str(json).unwrap();
        let names: Vec<String> = files_only(entries).collect();
        assert_eq!(names, vec!["a.mp4", "b.mp4"]);
    }

    #[test]
    fn list_body_shape() {
        let body = ListBody {
            prefix: "",
            limit: 10,
            offset: 20,
            sort_by: SortBy {
                column: "name",
                order: "asc",
            },
        };
        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(value["sortBy"]["column"], "name");
        assert_eq!(value["offset"], 20);
    }

    #[tokio::test]
    async fn fetch_rejects_empty_names() {
        let err = store().fetch("", "x").await.unwrap_err();
        assert_eq!(err.code(), StoreErrorCode::InvalidName);
        assert_eq!(err.backend_name(), Some("http"));
    }
}
