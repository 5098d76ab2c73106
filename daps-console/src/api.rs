//! HTTP client for the DAPS web backend.
//!
//! [`ApiClient`] implements the collaborator traits the form engine consumes
//! ([`ConfigApi`], [`DirectoryService`], [`PlexLibraries`]) plus the console's
//! own [`RunControl`] and [`InstanceTester`]. A backend that answers
//! `{"error": "..."}` is treated as a failure whatever the HTTP status.

use std::time::Duration;

use async_trait::async_trait;
use dapsconfig::{
    FormError,
    data::value::value_to_text,
    services::{ConfigApi, DirectoryService, PlexLibraries},
};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::{Map, Value, json};
use tokio::sync::OnceCell;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} returned HTTP {status}: {body}")]
    Status {
        url: String,
        status: u16,
        body: String,
    },

    /// `{"error": ...}` body.
    #[error("{0}")]
    Backend(String),

    #[error("unexpected response from {url}: {reason}")]
    Decode { url: String, reason: String },
}

impl From<ApiError> for FormError {
    fn from(e: ApiError) -> Self {
        FormError::Collaborator(e.to_string())
    }
}

/// Body of `POST /api/test-instance`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InstanceTest {
    /// Instance type, e.g. `radarr`.
    pub service: String,
    pub name: String,
    pub url: String,
    pub api: String,
}

/// One row of `GET /api/run_state`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RunState {
    pub module_name: String,
    #[serde(default)]
    pub last_run: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
struct RunStates {
    #[serde(default)]
    run_states: Vec<RunState>,
}

/// `POST /api/poster-search-stats` result.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct PosterStats {
    #[serde(default)]
    pub file_count: u64,
    #[serde(default)]
    pub size_bytes: u64,
    #[serde(default)]
    pub files: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct Directories {
    #[serde(default)]
    directories: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct Status {
    #[serde(default)]
    running: bool,
}

/// Scheduler controls.
#[async_trait]
pub trait RunControl: Send + Sync {
    async fn run(&self, module: &str) -> Result<(), ApiError>;

    async fn cancel(&self, module: &str) -> Result<(), ApiError>;

    /// Whether the module is running right now.
    async fn status(&self, module: &str) -> Result<bool, ApiError>;
}

/// Connectivity check run before an instance entry is saved.
#[async_trait]
pub trait InstanceTester: Send + Sync {
    async fn test_instance(&self, test: &InstanceTest) -> Result<(), ApiError>;
}

fn backend_error(value: &Value) -> Option<String> {
    value.as_object()?.get("error").map(value_to_text)
}

#[derive(Debug, Clone)]
pub struct ApiClient {
    client: reqwest::Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: &str, timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("daps-console/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| anyhow!("Failed to create HTTP client: {e}"))?;
        Ok(ApiClient {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    async fn send(&self, url: &str, req: reqwest::RequestBuilder) -> Result<(u16, String), ApiError> {
        debug!("{url}");
        let resp = req.send().await.map_err(|source| ApiError::Transport {
            url: url.to_string(),
            source,
        })?;
        let status = resp.status().as_u16();
        let body = resp.text().await.map_err(|source| ApiError::Transport {
            url: url.to_string(),
            source,
        })?;
        Ok((status, body))
    }

    /// Check status and `{error}`; return the parsed body (`null` if empty
    /// or not JSON).
    fn check(url: &str, status: u16, body: &str) -> Result<Value, ApiError> {
        let value: Value = serde_json::from_str(body).unwrap_or(Value::Null);
        if let Some(msg) = backend_error(&value) {
            return Err(ApiError::Backend(msg));
        }
        if !(200..300).contains(&status) {
            return Err(ApiError::Status {
                url: url.to_string(),
                status,
                body: body.chars().take(200).collect(),
            });
        }
        Ok(value)
    }

    fn decode<T: DeserializeOwned>(url: &str, value: Value) -> Result<T, ApiError> {
        serde_json::from_value(value).map_err(|e| ApiError::Decode {
            url: url.to_string(),
            reason: e.to_string(),
        })
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T, ApiError> {
        let url = self.url(path);
        let (status, body) = self.send(&url, self.client.get(&url).query(query)).await?;
        let value = Self::check(&url, status, &body)?;
        Self::decode(&url, value)
    }

    async fn post_json(&self, path: &str, query: &[(&str, &str)], payload: &Value) -> Result<Value, ApiError> {
        let url = self.url(path);
        let req = self.client.post(&url).query(query).json(payload);
        let (status, body) = self.send(&url, req).await?;
        Self::check(&url, status, &body)
    }

    pub async fn get_config(&self) -> Result<Value, ApiError> {
        self.get_json("/api/config", &[]).await
    }

    pub async fn post_config(&self, payload: &Value) -> Result<Value, ApiError> {
        self.post_json("/api/config", &[], payload).await
    }

    pub async fn list(&self, path: &str) -> Result<Vec<String>, ApiError> {
        let dirs: Directories = self.get_json("/api/list", &[("path", path)]).await?;
        Ok(dirs.directories)
    }

    pub async fn create_folder(&self, path: &str) -> Result<(), ApiError> {
        self.post_json("/api/create-folder", &[("path", path)], &Value::Null)
            .await
            .map(|_| ())
    }

    pub async fn plex_libraries(&self, instance: &str) -> Result<Vec<String>, ApiError> {
        self.get_json("/api/plex/libraries", &[("instance", instance)])
            .await
    }

    pub async fn run_states(&self) -> Result<Vec<RunState>, ApiError> {
        let states: RunStates = self.get_json("/api/run_state", &[]).await?;
        Ok(states.run_states)
    }

    pub async fn poster_search_stats(&self, location: &str) -> Result<PosterStats, ApiError> {
        let url = self.url("/api/poster-search-stats");
        let value = self
            .post_json("/api/poster-search-stats", &[], &json!({ "location": location }))
            .await?;
        Self::decode(&url, value)
    }

    pub async fn poster_assets(&self) -> Result<Vec<String>, ApiError> {
        self.get_json("/api/poster_assets", &[]).await
    }

    /// Fetch a document from outside the backend (preset catalogs).
    pub async fn fetch_remote(&self, url: &str) -> Result<Value, ApiError> {
        let (status, body) = self.send(url, self.client.get(url)).await?;
        let value = Self::check(url, status, &body)?;
        if value.is_null() {
            return Err(ApiError::Decode {
                url: url.to_string(),
                reason: "not JSON".into(),
            });
        }
        Ok(value)
    }
}

#[async_trait]
impl RunControl for ApiClient {
    async fn run(&self, module: &str) -> Result<(), ApiError> {
        self.post_json("/api/run", &[], &json!({ "module": module }))
            .await
            .map(|_| ())
    }

    async fn cancel(&self, module: &str) -> Result<(), ApiError> {
        self.post_json("/api/cancel", &[], &json!({ "module": module }))
            .await
            .map(|_| ())
    }

    async fn status(&self, module: &str) -> Result<bool, ApiError> {
        let s: Status = self.get_json("/api/status", &[("module", module)]).await?;
        Ok(s.running)
    }
}

#[async_trait]
impl InstanceTester for ApiClient {
    async fn test_instance(&self, test: &InstanceTest) -> Result<(), ApiError> {
        let payload = serde_json::to_value(test).map_err(|e| ApiError::Decode {
            url: self.url("/api/test-instance"),
            reason: e.to_string(),
        })?;
        self.post_json("/api/test-instance", &[], &payload)
            .await
            .map(|_| ())
    }
}

#[async_trait]
impl ConfigApi for ApiClient {
    async fn fetch_config(&self) -> dapsconfig::Result<Value> {
        Ok(self.get_config().await?)
    }

    async fn save_config(&self, payload: Value) -> dapsconfig::Result<Value> {
        Ok(self.post_config(&payload).await?)
    }
}

#[async_trait]
impl DirectoryService for ApiClient {
    async fn list_directories(&self, path: &str) -> dapsconfig::Result<Vec<String>> {
        Ok(self.list(path).await?)
    }

    async fn create_directory(&self, path: &str) -> dapsconfig::Result<()> {
        Ok(self.create_folder(path).await?)
    }
}

#[async_trait]
impl PlexLibraries for ApiClient {
    async fn libraries(&self, instance: &str) -> dapsconfig::Result<Vec<String>> {
        Ok(self.plex_libraries(instance).await?)
    }
}

/// One Google Drive preset: a named folder id.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct GdrivePreset {
    pub name: String,
    pub id: String,
    #[serde(default)]
    pub content: Option<String>,
}

/// Google Drive preset list, fetched once per session.
#[derive(Debug)]
pub struct PresetCatalog {
    url: Option<String>,
    cache: OnceCell<Vec<GdrivePreset>>,
}

impl PresetCatalog {
    pub fn new(url: Option<String>) -> Self {
        PresetCatalog {
            url,
            cache: OnceCell::new(),
        }
    }

    /// Presets, fetching on first use. Without a configured URL the list is
    /// empty.
    pub async fn presets(&self, api: &ApiClient) -> Result<&[GdrivePreset], ApiError> {
        let Some(url) = &self.url else {
            return Ok(&[][..]);
        };
        let presets = self
            .cache
            .get_or_try_init(|| async {
                let value = api.fetch_remote(url).await?;
                let presets = parse_presets(url, value)?;
                info!("loaded {} Google Drive presets", presets.len());
                Ok::<_, ApiError>(presets)
            })
            .await?;
        Ok(presets.as_slice())
    }
}

/// Accepts either a list of presets or `{"presets": [...]}`.
fn parse_presets(url: &str, value: Value) -> Result<Vec<GdrivePreset>, ApiError> {
    let list = match value {
        Value::Object(mut obj) => obj.remove("presets").unwrap_or(Value::Null),
        other => other,
    };
    ApiClient::decode(url, list)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_error_body_wins() {
        let err = ApiClient::check("u", 200, r#"{"error": "bad config"}"#).unwrap_err();
        assert!(matches!(err, ApiError::Backend(m) if m == "bad config"));
        let err = ApiClient::check("u", 500, "oops").unwrap_err();
        assert!(matches!(err, ApiError::Status { status: 500, .. }));
        assert_eq!(ApiClient::check("u", 200, "ok").unwrap(), Value::Null);
        assert_eq!(
            ApiClient::check("u", 200, r#"{"a": 1}"#).unwrap(),
            json!({"a": 1})
        );
    }

    #[test]
    fn test_decode_shapes() {
        let states: RunStates = ApiClient::decode(
            "u",
            json!({"run_states": [{"module_name": "nohl", "last_run": "2024-01-01", "ok": true}]}),
        )
        .unwrap();
        assert_eq!(states.run_states[0].module_name, "nohl");
        assert_eq!(states.run_states[0].extra["ok"], true);

        let stats: PosterStats =
            ApiClient::decode("u", json!({"file_count": 2, "files": ["a.jpg", "b.jpg"]})).unwrap();
        assert_eq!(stats.file_count, 2);
        assert_eq!(stats.size_bytes, 0);
    }

    #[test]
    fn test_parse_presets() {
        let wrapped = json!({"presets": [{"name": "MM2K", "id": "1abc"}]});
        let bare = json!([{"name": "MM2K", "id": "1abc"}]);
        assert_eq!(
            parse_presets("u", wrapped).unwrap(),
            parse_presets("u", bare).unwrap()
        );
    }

    #[test]
    fn test_base_url_trailing_slash() {
        let api = ApiClient::new("http://nas:8000/", Duration::from_secs(1)).unwrap();
        assert_eq!(api.url("/api/config"), "http://nas:8000/api/config");
    }

    #[tokio::test]
    async fn test_catalog_without_url_is_empty() {
        let api = ApiClient::new("http://localhost:1", Duration::from_secs(1)).unwrap();
        let catalog = PresetCatalog::new(None);
        assert!(catalog.presets(&api).await.unwrap().is_empty());
    }
}
