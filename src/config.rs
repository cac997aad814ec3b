use std::{path::PathBuf, time::Duration};

use url::Url;

use crate::{error::ConfigError, messages::Locale};

const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8000";
const DEFAULT_DOWNLOAD_DIR: &str = "web";
const DEFAULT_STATIC_DIR: &str = "static";
const DEFAULT_YT_DLP_BIN: &str = "yt-dlp";
const DEFAULT_MAX_CONCURRENT_JOBS: usize = 1;

/// Runtime settings, read from the environment once at start-up.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: String,
    pub download_dir: PathBuf,
    pub static_dir: PathBuf,
    pub yt_dlp_bin: PathBuf,
    pub locale: Locale,
    /// Engine calls allowed to run at once. One keeps requests strictly serialized.
    pub max_concurrent_jobs: usize,
    pub engine_timeout: Option<Duration>,
    /// Normalized origins allowed through CORS; empty disables the CORS layer.
    pub allowed_origins: Vec<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            download_dir: PathBuf::from(DEFAULT_DOWNLOAD_DIR),
            static_dir: PathBuf::from(DEFAULT_STATIC_DIR),
            yt_dlp_bin: PathBuf::from(DEFAULT_YT_DLP_BIN),
            locale: Locale::default(),
            max_concurrent_jobs: DEFAULT_MAX_CONCURRENT_JOBS,
            engine_timeout: None,
            allowed_origins: Vec::new(),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let read = |name: &str| lookup(name).and_then(|value| non_empty(&value).map(str::to_string));
        let defaults = Self::default();

        let locale = match read("APP_LOCALE") {
            Some(value) => value.parse().map_err(|reason| ConfigError::InvalidValue {
                name: "APP_LOCALE",
                value,
                reason,
            })?,
            None => defaults.locale,
        };

        let max_concurrent_jobs = match read("MAX_CONCURRENT_JOBS") {
            Some(value) => match value.parse::<usize>() {
                Ok(jobs) if jobs > 0 => jobs,
                _ => {
                    return Err(ConfigError::InvalidValue {
                        name: "MAX_CONCURRENT_JOBS",
                        value,
                        reason: "expected a positive integer".to_string(),
                    });
                }
            },
            None => defaults.max_concurrent_jobs,
        };

        let engine_timeout = match read("YT_DLP_TIMEOUT_SECONDS") {
            Some(value) => {
                let seconds = value.parse::<u64>().map_err(|error| ConfigError::InvalidValue {
                    name: "YT_DLP_TIMEOUT_SECONDS",
                    value: value.clone(),
                    reason: error.to_string(),
                })?;
                (seconds > 0).then(|| Duration::from_secs(seconds))
            }
            None => None,
        };

        let allowed_origins = read("ALLOWED_ORIGINS")
            .map(|value| {
                value
                    .split(',')
                    .map(str::trim)
                    .filter(|origin| !origin.is_empty())
                    .map(|origin| {
                        normalize_origin(origin)
                            .ok_or_else(|| ConfigError::InvalidOrigin(origin.to_string()))
                    })
                    .collect::<Result<Vec<_>, _>>()
            })
            .transpose()?
            .unwrap_or_default();

        Ok(Self {
            bind_addr: resolve_bind_addr(&read),
            download_dir: read("DOWNLOAD_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.download_dir),
            static_dir: read("STATIC_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.static_dir),
            yt_dlp_bin: read("YT_DLP_BIN")
                .map(PathBuf::from)
                .unwrap_or(defaults.yt_dlp_bin),
            locale,
            max_concurrent_jobs,
            engine_timeout,
            allowed_origins,
        })
    }
}

fn resolve_bind_addr(read: &impl Fn(&str) -> Option<String>) -> String {
    if let Some(configured) = read("APP_ADDR") {
        return configured;
    }

    if let Some(port) = read("PORT").and_then(|value| value.parse::<u16>().ok()) {
        return format!("0.0.0.0:{port}");
    }

    DEFAULT_BIND_ADDR.to_string()
}

/// Reduces an origin to `scheme://host[:port]`, dropping default ports.
pub fn normalize_origin(value: &str) -> Option<String> {
    let parsed = Url::parse(value).ok()?;
    let host = parsed.host_str()?.to_ascii_lowercase();
    let scheme = parsed.scheme();
    let default_port = match scheme {
        "http" => 80,
        "https" => 443,
        _ => return None,
    };

    if parsed.path() != "/" || parsed.query().is_some() || parsed.fragment().is_some() {
        return None;
    }

    match parsed.port() {
        Some(port) if port != default_port => Some(format!("{scheme}://{host}:{port}")),
        _ => Some(format!("{scheme}://{host}")),
    }
}

fn non_empty(value: &str) -> Option<&str> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed)
    }
}
