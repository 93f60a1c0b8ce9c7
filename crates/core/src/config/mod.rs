//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (SWCACHE_*)
//! 2. TOML config file (if SWCACHE_CONFIG_FILE set)
//! 3. Built-in defaults

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

mod validation;

pub use validation::ConfigError;

/// Install-time assets of the site the worker is registered for.
const DEFAULT_CORE_ASSETS: &[&str] = &[
    "/",
    "/index.html",
    "/assets/css/main.css",
    "/assets/js/main.js",
    "/assets/js/jquery.min.js",
    "/assets/js/browser.min.js",
    "/assets/js/breakpoints.min.js",
    "/assets/js/util.js",
    "/images/SB_Icon_Small.png",
    "/images/logo.png",
    "/images/bg.jpg",
    "/images/banner.png",
    "/manifest.json",
];

const DEFAULT_EXTERNAL_PREFIXES: &[&str] = &[
    "https://fonts.googleapis.com/css2?family=Inter:wght@300;400;500;600;700&family=JetBrains+Mono:wght@400;500&display=swap",
    "https://fonts.gstatic.com",
    "https://cdn.jsdelivr.net/gh/devicons/devicon",
];

const DEFAULT_EXTERNAL_HOSTS: &[&str] = &["fonts.googleapis.com", "fonts.gstatic.com", "cdn.jsdelivr.net"];

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (SWCACHE_*)
/// 2. TOML config file (if SWCACHE_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Origin the worker is registered for; the only origin served cache-first.
    ///
    /// Set via SWCACHE_ORIGIN environment variable.
    #[serde(default = "default_origin")]
    pub origin: String,

    /// Prefix shared by every store name.
    #[serde(default = "default_cache_prefix")]
    pub cache_prefix: String,

    /// Version token embedded in store names. Bump it to invalidate every
    /// previously cached entry at the next activation.
    ///
    /// Set via SWCACHE_VERSION environment variable.
    #[serde(default = "default_version")]
    pub version: String,

    /// Same-origin paths that must all be fetchable at install time.
    #[serde(default = "default_core_assets")]
    pub core_assets: Vec<String>,

    /// URL prefixes served with the freshness-windowed strategy.
    #[serde(default = "default_external_prefixes")]
    pub external_prefixes: Vec<String>,

    /// Hosts served with the freshness-windowed strategy.
    #[serde(default = "default_external_hosts")]
    pub external_hosts: Vec<String>,

    /// Document served when a navigation fails and has no cached copy.
    #[serde(default = "default_fallback_document")]
    pub fallback_document: String,

    /// How long a cached external resource is trusted without revalidation.
    #[serde(default = "default_freshness_secs")]
    pub freshness_secs: u64,

    /// Path to the SQLite cache storage.
    ///
    /// Set via SWCACHE_DB_PATH environment variable.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// User-Agent string for network requests.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Host timeout for network requests in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Maximum response body size accepted from the network.
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,

    /// Requests slower than this are logged as slow.
    #[serde(default = "default_slow_request_ms")]
    pub slow_request_ms: u64,

    /// Delay before retrying a failed install.
    #[serde(default = "default_install_retry_secs")]
    pub install_retry_secs: u64,

    /// Install attempts before the host gives up.
    #[serde(default = "default_install_max_attempts")]
    pub install_max_attempts: u32,

    /// Site name shown on the offline page.
    #[serde(default = "default_site_name")]
    pub site_name: String,
}

fn default_origin() -> String {
    "http://localhost:8080".into()
}

fn default_cache_prefix() -> String {
    "sudobotz".into()
}

fn default_version() -> String {
    "v2.1.0".into()
}

fn default_core_assets() -> Vec<String> {
    DEFAULT_CORE_ASSETS.iter().map(|s| s.to_string()).collect()
}

fn default_external_prefixes() -> Vec<String> {
    DEFAULT_EXTERNAL_PREFIXES.iter().map(|s| s.to_string()).collect()
}

fn default_external_hosts() -> Vec<String> {
    DEFAULT_EXTERNAL_HOSTS.iter().map(|s| s.to_string()).collect()
}

fn default_fallback_document() -> String {
    "/index.html".into()
}

fn default_freshness_secs() -> u64 {
    24 * 60 * 60
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./swcache.sqlite")
}

fn default_user_agent() -> String {
    "swcache/0.1".into()
}

fn default_timeout_ms() -> u64 {
    20_000
}

fn default_max_bytes() -> usize {
    10_485_760 // 10MB
}

fn default_slow_request_ms() -> u64 {
    1_000
}

fn default_install_retry_secs() -> u64 {
    30
}

fn default_install_max_attempts() -> u32 {
    5
}

fn default_site_name() -> String {
    "SudoBotz".into()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            origin: default_origin(),
            cache_prefix: default_cache_prefix(),
            version: default_version(),
            core_assets: default_core_assets(),
            external_prefixes: default_external_prefixes(),
            external_hosts: default_external_hosts(),
            fallback_document: default_fallback_document(),
            freshness_secs: default_freshness_secs(),
            db_path: default_db_path(),
            user_agent: default_user_agent(),
            timeout_ms: default_timeout_ms(),
            max_bytes: default_max_bytes(),
            slow_request_ms: default_slow_request_ms(),
            install_retry_secs: default_install_retry_secs(),
            install_max_attempts: default_install_max_attempts(),
            site_name: default_site_name(),
        }
    }
}

impl AppConfig {
    /// Name of the current core store, e.g. `sudobotz-v2.1.0`.
    pub fn core_cache_name(&self) -> String {
        format!("{}-{}", self.cache_prefix, self.version)
    }

    /// Name of the current runtime store, e.g. `sudobotz-runtime-v2.1.0`.
    pub fn runtime_cache_name(&self) -> String {
        format!("{}-runtime-{}", self.cache_prefix, self.version)
    }

    /// Freshness window as Duration.
    pub fn freshness(&self) -> Duration {
        Duration::from_secs(self.freshness_secs)
    }

    /// Timeout as Duration for use with reqwest/tokio.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn slow_request_threshold(&self) -> Duration {
        Duration::from_millis(self.slow_request_ms)
    }

    pub fn install_retry_delay(&self) -> Duration {
        Duration::from_secs(self.install_retry_secs)
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `SWCACHE_`
    /// 2. TOML file from `SWCACHE_CONFIG_FILE` (if set)
    /// 3. Built-in defaults via `Default::default()`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the file or environment cannot be parsed, or
    /// validation fails after loading.
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("SWCACHE_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("SWCACHE_")
                .ignore(&["config_file"])
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }
}
