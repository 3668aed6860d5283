use crate::cache::{CacheConfig, RequestCache};
use crate::error::ApiError;
use crate::access::{BearerToken, Origins};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use simlog_indexer::{canonical_key, resolve_within, DirectoryScanner, LoadLimiter};
use simlog_pack::{DataPackRequest, PackAggregator};
use simlog_protocol::{DirectoryTree, SimDataPack};
use simlog_tabular::{is_http_url, LoadOptions, ResourceLocation, TabularLoader};
use std::path::PathBuf;
use std::sync::Arc;

/// URL prefix under which the data root is also served verbatim.
pub const STATIC_PREFIX: &str = "data_dev";

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub data_root: PathBuf,
    pub cache: CacheConfig,
    pub load: LoadOptions,
    pub load_concurrency: usize,
    /// Browser origins granted CORS access.
    pub cors_origins: Origins,
    /// Origins `/data-pack` may fetch remote bases from.
    pub remote_origins: Origins,
}

impl ServerConfig {
    pub fn new(data_root: impl Into<PathBuf>) -> Self {
        Self {
            data_root: data_root.into(),
            cache: CacheConfig::default(),
            load: LoadOptions::default(),
            load_concurrency: simlog_indexer::default_load_concurrency(),
            cors_origins: Origins::Any,
            remote_origins: Origins::Any,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct HealthReport {
    pub status: String,
    pub cache_entries: usize,
    pub cache_loads: u64,
    pub load_limit: usize,
    pub loads_in_flight: usize,
}

/// Everything a request handler needs; shared behind an `Arc`.
pub struct AppState {
    data_root: PathBuf,
    scanner: DirectoryScanner,
    aggregator: PackAggregator,
    limiter: LoadLimiter,
    cache: RequestCache<SimDataPack>,
    auth_token: Option<BearerToken>,
    cors_origins: Origins,
    remote_origins: Origins,
}

impl AppState {
    pub fn new(config: ServerConfig) -> Self {
        let limiter = LoadLimiter::new(config.load_concurrency);
        let scanner = DirectoryScanner::new(&config.data_root).with_limiter(limiter.clone());
        let aggregator = PackAggregator::new(TabularLoader::new(config.load), limiter.clone());
        Self {
            data_root: config.data_root,
            scanner,
            aggregator,
            limiter,
            cache: RequestCache::new(config.cache),
            auth_token: None,
            cors_origins: config.cors_origins,
            remote_origins: config.remote_origins,
        }
    }

    /// Requires `Authorization: Bearer <token>` on every route when set.
    pub fn with_auth_token(mut self, token: Option<BearerToken>) -> Self {
        self.auth_token = token;
        self
    }

    pub(crate) fn auth_token(&self) -> Option<&BearerToken> {
        self.auth_token.as_ref()
    }

    pub(crate) fn cors_origins(&self) -> &Origins {
        &self.cors_origins
    }

    pub fn cache(&self) -> &RequestCache<SimDataPack> {
        &self.cache
    }

    pub async fn dir_tree(&self, path: &str) -> Result<DirectoryTree, ApiError> {
        Ok(self.scanner.scan(path).await?)
    }

    /// Validates a `/data-pack` body, then loads every referenced file.
    pub async fn data_pack(&self, body: &Value) -> Result<SimDataPack, ApiError> {
        let request = DataPackRequest::from_json(body)?;
        let base = self.resolve_base(&request.url)?;
        log::debug!("Data pack for {} runs from {base}", request.sim_tree.len());
        Ok(self.aggregator.aggregate(&request.sim_tree, &base).await?)
    }

    /// Discovers and aggregates every run under a config directory, memoized per path.
    pub async fn read_sim(&self, path: &str) -> Result<Arc<SimDataPack>, ApiError> {
        let key = canonical_key(path)?;
        let key = key.as_str();
        self.cache
            .get_or_load(key, move || async move {
                let runs = self.scanner.scan_runs(key).await?;
                let base = ResourceLocation::local(self.scanner.resolve_dir(key)?);
                Ok::<_, ApiError>(self.aggregator.aggregate(&runs, &base).await?)
            })
            .await
    }

    /// http(s) bases are fetched remotely from allowed origins; anything else
    /// is relative to the data root.
    pub fn resolve_base(&self, url: &str) -> Result<ResourceLocation, ApiError> {
        if !is_http_url(url.trim()) {
            let relative = strip_static_prefix(url);
            return Ok(ResourceLocation::local(resolve_within(&self.data_root, relative)?));
        }
        let location = ResourceLocation::parse(url)?;
        match location.origin() {
            Some(origin) if self.remote_origins.allows(&origin) => Ok(location),
            Some(origin) => Err(ApiError::BadRequest(format!(
                "Remote origin {origin} is not allowed for data packs"
            ))),
            None => Err(ApiError::BadRequest(format!("Not a remote base: {url}"))),
        }
    }

    pub async fn read_file(&self, path: &str) -> Result<Vec<u8>, ApiError> {
        let file = resolve_within(&self.data_root, path)?;
        if !file.is_file() {
            return Err(ApiError::NotFound(format!("File not found: {path}")));
        }
        tokio::fs::read(&file)
            .await
            .map_err(|err| ApiError::Internal(format!("Failed to read {path}: {err}")))
    }

    pub fn health(&self) -> HealthReport {
        let loads = self.limiter.snapshot();
        HealthReport {
            status: "ok".to_string(),
            cache_entries: self.cache.len(),
            cache_loads: self.cache.loads(),
            load_limit: loads.limit,
            loads_in_flight: loads.in_flight,
        }
    }
}

fn strip_static_prefix(url: &str) -> &str {
    let relative = url.trim().trim_start_matches('/');
    match relative.strip_prefix(STATIC_PREFIX) {
        Some("") => "",
        Some(rest) if rest.starts_with('/') => rest.trim_start_matches('/'),
        _ => relative,
    }
}
