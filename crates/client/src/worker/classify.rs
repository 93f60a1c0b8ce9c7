//! Request classification.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use swcache_core::Request;
use url::{Origin, Url};

use super::config::WorkerConfig;

/// Which caching strategy a request is served with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum RequestClass {
    /// Top-level document load: network first, offline page last.
    Navigation,
    /// Asset from the worker's own origin: cache first, refreshed in the background.
    SameOrigin,
    /// Allow-listed font/icon CDN: cached for the freshness window.
    ExternalAllowed,
    /// Anything else: network first, GET responses cached opportunistically.
    Other,
}

/// Assigns every request exactly one [`RequestClass`].
///
/// Checks run in priority order: navigation, origin, allow-list.
#[derive(Debug, Clone)]
pub struct Classifier {
    origin: Origin,
    prefixes: Vec<String>,
    hosts: Vec<String>,
}

impl Classifier {
    pub fn new(origin: &Url, prefixes: Vec<String>, hosts: Vec<String>) -> Self {
        Self { origin: origin.origin(), prefixes, hosts }
    }

    pub fn from_config(config: &WorkerConfig) -> Self {
        Self::new(&config.origin, config.external_prefixes.clone(), config.external_hosts.clone())
    }

    pub fn classify(&self, request: &Request) -> RequestClass {
        if request.is_navigation() {
            RequestClass::Navigation
        } else if request.url.origin() == self.origin {
            RequestClass::SameOrigin
        } else if self.is_external_allowed(&request.url) {
            RequestClass::ExternalAllowed
        } else {
            RequestClass::Other
        }
    }

    /// URL starts with an allow-listed prefix or is served by an allow-listed host.
    pub fn is_external_allowed(&self, url: &Url) -> bool {
        let href = url.as_str();
        self.prefixes.iter().any(|prefix| href.starts_with(prefix.as_str()))
            || url
                .host_str()
                .is_some_and(|host| self.hosts.iter().any(|allowed| allowed == host))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::Method;
    use swcache_core::{AppConfig, RequestMode};

    fn classifier() -> Classifier {
        let app = AppConfig { origin: "https://example.com".into(), ..Default::default() };
        Classifier::from_config(&WorkerConfig::from_app(&app).unwrap())
    }

    fn get(url: &str) -> Request {
        Request::get(Url::parse(url).unwrap())
    }

    #[test]
    fn test_navigation_wins_over_origin() {
        let request = Request::navigate(Url::parse("https://example.com/").unwrap());
        assert_eq!(classifier().classify(&request), RequestClass::Navigation);
    }

    #[test]
    fn test_cross_origin_navigation_is_still_navigation() {
        let request = Request::navigate(Url::parse("https://fonts.googleapis.com/").unwrap());
        assert_eq!(classifier().classify(&request), RequestClass::Navigation);
    }

    #[test]
    fn test_same_origin_asset() {
        assert_eq!(classifier().classify(&get("https://example.com/assets/js/util.js")), RequestClass::SameOrigin);
    }

    #[test]
    fn test_same_host_other_scheme_is_not_same_origin() {
        assert_eq!(classifier().classify(&get("http://example.com/assets/js/util.js")), RequestClass::Other);
    }

    #[test]
    fn test_same_origin_post() {
        let request =
            Request::new(Method::POST, Url::parse("https://example.com/contact").unwrap(), RequestMode::SameOrigin);
        assert_eq!(classifier().classify(&request), RequestClass::SameOrigin);
    }

    #[test]
    fn test_allow_listed_hosts() {
        let c = classifier();
        assert_eq!(c.classify(&get("https://fonts.gstatic.com/s/inter/v12/a.woff2")), RequestClass::ExternalAllowed);
        assert_eq!(c.classify(&get("https://fonts.googleapis.com/css2?family=Roboto")), RequestClass::ExternalAllowed);
        assert_eq!(c.classify(&get("https://cdn.jsdelivr.net/npm/x.js")), RequestClass::ExternalAllowed);
    }

    #[test]
    fn test_allow_listed_prefix() {
        let c = Classifier::new(
            &Url::parse("https://example.com").unwrap(),
            vec!["https://icons.example.net/set/".into()],
            Vec::new(),
        );
        assert_eq!(c.classify(&get("https://icons.example.net/set/a.svg")), RequestClass::ExternalAllowed);
        assert_eq!(c.classify(&get("https://icons.example.net/other/a.svg")), RequestClass::Other);
    }

    #[test]
    fn test_other_cross_origin_api() {
        assert_eq!(classifier().classify(&get("https://api.example.org/v1/stats")), RequestClass::Other);
    }
}
