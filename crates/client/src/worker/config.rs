//! Explicit worker configuration, resolved once from [`AppConfig`].

use std::time::Duration;

use swcache_core::{AppConfig, Error};
use url::Url;

use crate::fetch::{canonicalize, resolve};

/// Everything the strategies and lifecycle need, with URLs already resolved
/// against the registration origin.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub origin: Url,
    pub core_cache: String,
    pub runtime_cache: String,
    pub core_assets: Vec<Url>,
    pub external_prefixes: Vec<String>,
    pub external_hosts: Vec<String>,
    pub fallback_document: Url,
    pub freshness: Duration,
    pub slow_request: Duration,
    pub site_name: String,
}

/// Resolve `path` against `origin`, refusing anything that lands on another origin.
fn resolve_on_origin(origin: &Url, path: &str) -> Result<Url, Error> {
    let url = resolve(origin, path).map_err(|e| Error::InvalidUrl(format!("{path}: {e}")))?;
    if url.origin() != origin.origin() {
        return Err(Error::InvalidUrl(format!("{path}: resolves outside {}", origin.origin().ascii_serialization())));
    }
    Ok(url)
}

impl WorkerConfig {
    /// Resolve asset paths and store names from the application config.
    pub fn from_app(config: &AppConfig) -> Result<Self, Error> {
        let origin = canonicalize(&config.origin).map_err(|e| Error::InvalidUrl(format!("origin: {e}")))?;

        let core_assets = config
            .core_assets
            .iter()
            .map(|path| resolve_on_origin(&origin, path))
            .collect::<Result<Vec<_>, _>>()?;

        let fallback_document = resolve_on_origin(&origin, &config.fallback_document)?;

        Ok(Self {
            origin,
            core_cache: config.core_cache_name(),
            runtime_cache: config.runtime_cache_name(),
            core_assets,
            external_prefixes: config.external_prefixes.clone(),
            external_hosts: config.external_hosts.iter().map(|h| h.to_lowercase()).collect(),
            fallback_document,
            freshness: config.freshness(),
            slow_request: config.slow_request_threshold(),
            site_name: config.site_name.clone(),
        })
    }

    /// Whether `name` is one of the two stores of the current version.
    pub fn is_current_cache(&self, name: &str) -> bool {
        name == self.core_cache || name == self.runtime_cache
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_default_app_config() {
        let config = WorkerConfig::from_app(&AppConfig::default()).unwrap();
        assert_eq!(config.origin.as_str(), "http://localhost:8080/");
        assert_eq!(config.core_assets.len(), 13);
        assert_eq!(config.core_assets[0].as_str(), "http://localhost:8080/");
        assert_eq!(config.fallback_document.as_str(), "http://localhost:8080/index.html");
        assert_eq!(config.freshness, Duration::from_secs(86_400));
    }

    #[test]
    fn test_current_cache_names() {
        let config = WorkerConfig::from_app(&AppConfig::default()).unwrap();
        assert!(config.is_current_cache("sudobotz-v2.1.0"));
        assert!(config.is_current_cache("sudobotz-runtime-v2.1.0"));
        assert!(!config.is_current_cache("sudobotz-v2.0.0"));
    }

    #[test]
    fn test_invalid_origin() {
        let app = AppConfig { origin: "localhost".into(), ..Default::default() };
        assert!(matches!(WorkerConfig::from_app(&app), Err(Error::InvalidUrl(_))));
    }

    #[test]
    fn test_hosts_are_lowercased() {
        let app = AppConfig { external_hosts: vec!["Fonts.GStatic.com".into()], ..Default::default() };
        let config = WorkerConfig::from_app(&app).unwrap();
        assert_eq!(config.external_hosts, vec!["fonts.gstatic.com".to_string()]);
    }

    #[test]
    fn test_assets_must_stay_on_origin() {
        for asset in ["//cdn.example.net/app.js", "/\\cdn.example.net/app.js", "https://cdn.example.net/app.js"] {
            let app = AppConfig { core_assets: vec!["/".into(), asset.into()], ..Default::default() };
            assert!(matches!(WorkerConfig::from_app(&app), Err(Error::InvalidUrl(_))), "{asset}");
        }

        let app = AppConfig { fallback_document: "//evil.example/index.html".into(), ..Default::default() };
        assert!(matches!(WorkerConfig::from_app(&app), Err(Error::InvalidUrl(_))));
    }
}
