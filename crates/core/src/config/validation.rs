//! Configuration validation rules.
//!
//! This module provides validation logic for `AppConfig` values
//! after they have been loaded from environment, files, or defaults.

use crate::config::AppConfig;
use thiserror::Error;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("invalid configuration: {field} - {reason}")]
    Invalid { field: String, reason: String },

    #[error("missing required configuration: {field} ({hint})")]
    Missing { field: String, hint: String },
}

fn invalid(field: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid { field: field.into(), reason: reason.into() }
}

/// A path on the origin. `//host/x` and `/\host/x` are network-path
/// references and resolve to another host.
fn is_origin_path(path: &str) -> bool {
    let mut chars = path.chars();
    chars.next() == Some('/') && !matches!(chars.next(), Some('/' | '\\'))
}

impl AppConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - `origin` is not an absolute http(s) URL
    /// - `cache_prefix` or `version` is empty
    /// - a core asset or the fallback document is not a path on the origin
    /// - `freshness_secs`, `max_bytes` or `install_max_attempts` is 0
    /// - `timeout_ms` is less than 100ms or exceeds 5 minutes
    ///
    /// Returns `ConfigError::Missing` if no core asset is configured.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let origin = url::Url::parse(&self.origin).map_err(|e| invalid("origin", e.to_string()))?;
        if !matches!(origin.scheme(), "http" | "https") {
            return Err(invalid("origin", format!("unsupported scheme: {}", origin.scheme())));
        }
        if origin.host_str().is_none() {
            return Err(invalid("origin", "must include a host"));
        }

        if self.cache_prefix.is_empty() {
            return Err(invalid("cache_prefix", "must not be empty"));
        }
        if self.version.is_empty() {
            return Err(invalid("version", "must not be empty"));
        }

        if self.core_assets.is_empty() {
            return Err(ConfigError::Missing {
                field: "core_assets".into(),
                hint: "list at least the document root in the config file".into(),
            });
        }
        if let Some(asset) = self.core_assets.iter().find(|a| !is_origin_path(a)) {
            return Err(invalid("core_assets", format!("'{asset}' must be a path starting with a single '/'")));
        }

        if !is_origin_path(&self.fallback_document) {
            return Err(invalid("fallback_document", "must be a path starting with a single '/'"));
        }

        if self.freshness_secs == 0 {
            return Err(invalid("freshness_secs", "must be greater than 0"));
        }

        if self.max_bytes == 0 {
            return Err(invalid("max_bytes", "must be greater than 0"));
        }

        if self.timeout_ms < 100 {
            return Err(invalid("timeout_ms", "must be at least 100ms"));
        }
        if self.timeout_ms > 300_000 {
            return Err(invalid("timeout_ms", "must not exceed 5 minutes (300000ms)"));
        }

        if self.install_max_attempts == 0 {
            return Err(invalid("install_max_attempts", "must be greater than 0"));
        }

        if self.external_prefixes.is_empty() && self.external_hosts.is_empty() {
            tracing::warn!("no external resources configured; every cross-origin request uses the network-first strategy");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_default_config() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_bad_origin() {
        let config = AppConfig { origin: "not a url".into(), ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "origin"));
    }

    #[test]
    fn test_validate_origin_scheme() {
        let config = AppConfig { origin: "ftp://example.com".into(), ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "origin"));
    }

    #[test]
    fn test_validate_empty_version() {
        let config = AppConfig { version: String::new(), ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "version"));
    }

    #[test]
    fn test_validate_no_core_assets() {
        let config = AppConfig { core_assets: Vec::new(), ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Missing { field, .. }) if field == "core_assets"));
    }

    #[test]
    fn test_validate_relative_core_asset() {
        let config = AppConfig { core_assets: vec!["/".into(), "style.css".into()], ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "core_assets"));
    }

    #[test]
    fn test_validate_network_path_core_asset() {
        for asset in ["//cdn.example.net/app.js", "/\\cdn.example.net/app.js"] {
            let config = AppConfig { core_assets: vec!["/".into(), asset.into()], ..Default::default() };
            let result = config.validate();
            assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "core_assets"), "{asset}");
        }

        let fallback = AppConfig { fallback_document: "//evil.example/index.html".into(), ..Default::default() };
        assert!(matches!(fallback.validate(), Err(ConfigError::Invalid { field, .. }) if field == "fallback_document"));
    }

    #[test]
    fn test_validate_fallback_document() {
        let config = AppConfig { fallback_document: "index.html".into(), ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "fallback_document"));
    }

    #[test]
    fn test_validate_zero_freshness() {
        let config = AppConfig { freshness_secs: 0, ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "freshness_secs"));
    }

    #[test]
    fn test_validate_timeout_bounds() {
        let low = AppConfig { timeout_ms: 50, ..Default::default() };
        assert!(matches!(low.validate(), Err(ConfigError::Invalid { field, .. }) if field == "timeout_ms"));

        let high = AppConfig { timeout_ms: 301_000, ..Default::default() };
        assert!(matches!(high.validate(), Err(ConfigError::Invalid { field, .. }) if field == "timeout_ms"));

        let edge = AppConfig { timeout_ms: 100, ..Default::default() };
        assert!(edge.validate().is_ok());
    }
}
