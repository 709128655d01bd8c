use std::env;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{GracliError, Result};
use crate::time::parse_seconds_or_duration;

pub const DEFAULT_ENDPOINT: &str = "http://127.0.0.1:8080/";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClientConfig {
    pub endpoint: String,
    /// Floor applied to every render query window. Narrow windows on busy
    /// backends intermittently come back empty; too wide a floor can cross
    /// into a coarser retention archive and return aggregated points.
    pub minimum_query_range: Duration,
    pub metric_prefix: Option<String>,
    pub connect_timeout: Duration,
    pub read_timeout: Duration,
    pub max_retries: u32,
    pub backoff_factor: f64,
    pub headers: Vec<(String, String)>,
    /// Send render parameters as a POST form body instead of a GET query
    /// string, for target expressions too long for a URL. POST requests are
    /// not retried.
    pub post_render: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            minimum_query_range: Duration::from_secs(60 * 10),
            metric_prefix: None,
            connect_timeout: Duration::from_secs(5),
            read_timeout: Duration::from_millis(2500),
            max_retries: 3,
            backoff_factor: 1.0,
            headers: Vec::new(),
            post_render: false,
        }
    }
}

impl ClientConfig {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            ..Self::default()
        }
    }

    pub fn load() -> Result<Self> {
        let mut cfg = Self::default();
        let config_path = config_file_path();
        if let Some(file_overrides) = load_file_overrides(&config_path)? {
            apply_overrides(&mut cfg, file_overrides, "config file")?;
        }
        let env_overrides = load_env_overrides()?;
        apply_overrides(&mut cfg, env_overrides, "environment")?;
        Ok(cfg)
    }

    pub fn from_env() -> Result<Self> {
        let mut cfg = Self::default();
        let env_overrides = load_env_overrides()?;
        apply_overrides(&mut cfg, env_overrides, "environment")?;
        Ok(cfg)
    }

    pub fn minimum_query_range_secs(&self) -> u64 {
        self.minimum_query_range.as_secs()
    }
}

#[derive(Debug, Default, Deserialize)]
struct ConfigOverrides {
    endpoint: Option<String>,
    minimum_query_range: Option<String>,
    metric_prefix: Option<String>,
    connect_timeout: Option<String>,
    read_timeout: Option<String>,
    max_retries: Option<u32>,
    backoff_factor: Option<f64>,
    headers: Option<String>,
    post_render: Option<bool>,
}

fn config_file_path() -> PathBuf {
    if let Ok(path) = env::var("GRACLI_CONFIG") {
        return PathBuf::from(path);
    }

    let home = env::var("HOME").unwrap_or_else(|_| ".".to_string());
    let config_home = env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(home).join(".config"));
    config_home.join("gracli/config.toml")
}

fn load_file_overrides(path: &PathBuf) -> Result<Option<ConfigOverrides>> {
    if !path.exists() {
        return Ok(None);
    }

    let raw = fs::read_to_string(path)
        .map_err(|e| GracliError::Config(format!("failed reading {}: {e}", path.display())))?;
    let parsed: ConfigOverrides = toml::from_str(&raw)
        .map_err(|e| GracliError::Config(format!("failed parsing {}: {e}", path.display())))?;
    Ok(Some(parsed))
}

fn load_env_overrides() -> Result<ConfigOverrides> {
    let max_retries = match env::var("GRACLI_MAX_RETRIES") {
        Ok(v) => Some(v.parse::<u32>().map_err(|e| {
            GracliError::Config(format!("bad GRACLI_MAX_RETRIES in environment: {e}"))
        })?),
        Err(_) => None,
    };
    let backoff_factor = match env::var("GRACLI_BACKOFF_FACTOR") {
        Ok(v) => Some(v.parse::<f64>().map_err(|e| {
            GracliError::Config(format!("bad GRACLI_BACKOFF_FACTOR in environment: {e}"))
        })?),
        Err(_) => None,
    };
    let post_render = match env::var("GRACLI_POST_RENDER") {
        Ok(v) => Some(v.parse::<bool>().map_err(|e| {
            GracliError::Config(format!("bad GRACLI_POST_RENDER in environment: {e}"))
        })?),
        Err(_) => None,
    };

    Ok(ConfigOverrides {
        endpoint: env::var("GRACLI_ENDPOINT").ok(),
        minimum_query_range: env::var("GRACLI_MIN_QUERY_RANGE").ok(),
        metric_prefix: env::var("GRACLI_METRIC_PREFIX").ok(),
        connect_timeout: env::var("GRACLI_CONNECT_TIMEOUT").ok(),
        read_timeout: env::var("GRACLI_READ_TIMEOUT").ok(),
        max_retries,
        backoff_factor,
        headers: env::var("GRACLI_HEADERS").ok(),
        post_render,
    })
}

fn apply_overrides(
    cfg: &mut ClientConfig,
    overrides: ConfigOverrides,
    source: &str,
) -> Result<()> {
    if let Some(v) = overrides.endpoint {
        cfg.endpoint = v;
    }
    if let Some(v) = overrides.minimum_query_range {
        cfg.minimum_query_range = parse_seconds_or_duration(&v).map_err(|e| {
            GracliError::Config(format!(
                "bad minimum_query_range in {source}: {e} (value={v})"
            ))
        })?;
    }
    if let Some(v) = overrides.metric_prefix {
        cfg.metric_prefix = if v.is_empty() { None } else { Some(v) };
    }
    if let Some(v) = overrides.connect_timeout {
        cfg.connect_timeout = parse_seconds_or_duration(&v).map_err(|e| {
            GracliError::Config(format!("bad connect_timeout in {source}: {e} (value={v})"))
        })?;
    }
    if let Some(v) = overrides.read_timeout {
        cfg.read_timeout = parse_seconds_or_duration(&v).map_err(|e| {
            GracliError::Config(format!("bad read_timeout in {source}: {e} (value={v})"))
        })?;
    }
    if let Some(v) = overrides.max_retries {
        cfg.max_retries = v;
    }
    if let Some(v) = overrides.backoff_factor {
        if !v.is_finite() || v < 0.0 {
            return Err(GracliError::Config(format!(
                "bad backoff_factor in {source}: must be a non-negative number (value={v})"
            )));
        }
        cfg.backoff_factor = v;
    }
    if let Some(v) = overrides.headers {
        cfg.headers = parse_headers(&v).map_err(|e| {
            GracliError::Config(format!("bad headers in {source}: {e} (value={v})"))
        })?;
    }
    if let Some(v) = overrides.post_render {
        cfg.post_render = v;
    }
    Ok(())
}

pub fn parse_headers(raw: &str) -> Result<Vec<(String, String)>> {
    let mut out = Vec::new();
    for entry in raw.split(',') {
        let trimmed = entry.trim();
        if trimmed.is_empty() {
            continue;
        }
        let Some((key, value)) = trimmed.split_once('=') else {
            return Err(GracliError::Config(
                "header entries must use key=value syntax".to_string(),
            ));
        };
        let key = key.trim();
        if key.is_empty() {
            return Err(GracliError::Config("header key cannot be empty".to_string()));
        }
        out.push((key.to_string(), value.trim().to_string()));
    }
    Ok(out)
}
