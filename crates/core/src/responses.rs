//! Locally generated responses returned when every fallback is exhausted.

use http::header::{self, HeaderMap, HeaderValue};
use http::StatusCode;

use crate::model::Response;

/// Synthetic header recording when an external response was captured.
pub const CACHE_DATE_HEADER: &str = "sw-cache-date";

const SERVICE_UNAVAILABLE_BODY: &str = "Service Unavailable";

/// Offline document served for a failed navigation with nothing cached.
///
/// Status 200 with `Cache-Control: no-cache` so the page is never stored.
pub fn offline_page(site_name: &str) -> Response {
    let mut headers = HeaderMap::new();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("text/html"));
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));

    let name = escape_html(site_name);
    let body = format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="utf-8">
  <meta name="viewport" content="width=device-width, initial-scale=1">
  <title>{name} - Offline</title>
  <style>
    body {{ font-family: sans-serif; background: #111; color: #fff; display: flex;
           justify-content: center; align-items: center; min-height: 100vh; margin: 0; text-align: center; }}
    .offline {{ max-width: 400px; padding: 2rem; border-radius: 16px; background: rgba(255, 255, 255, 0.05); }}
    .offline h1 {{ color: #ff6b35; }}
    .offline p {{ color: #b3b3b3; line-height: 1.6; }}
    .offline button {{ border: none; border-radius: 8px; padding: 12px 24px; cursor: pointer; font-size: 1rem; }}
  </style>
</head>
<body>
  <div class="offline">
    <h1>You're Offline</h1>
    <p>{name} could not be reached. Check your connection and try again.</p>
    <button onclick="window.location.reload()">Try Again</button>
  </div>
</body>
</html>
"#
    );

    Response::new(StatusCode::OK, headers, body)
}

/// Plain-text 503 used when a sub-resource strategy has no fallback left.
pub fn service_unavailable() -> Response {
    let mut headers = HeaderMap::new();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("text/plain"));
    Response::new(StatusCode::SERVICE_UNAVAILABLE, headers, SERVICE_UNAVAILABLE_BODY)
}

fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offline_page_headers() {
        let page = offline_page("Example");
        assert_eq!(page.status, StatusCode::OK);
        assert_eq!(page.content_type(), Some("text/html"));
        assert_eq!(page.header("cache-control"), Some("no-cache"));
    }

    #[test]
    fn test_offline_page_has_reload_button() {
        let page = offline_page("Example");
        let html = String::from_utf8_lossy(&page.body);
        assert!(html.contains("window.location.reload()"));
        assert!(html.contains("<title>Example - Offline</title>"));
    }

    #[test]
    fn test_offline_page_escapes_site_name() {
        let page = offline_page("<b>&</b>");
        let html = String::from_utf8_lossy(&page.body);
        assert!(html.contains("&lt;b&gt;&amp;&lt;/b&gt;"));
    }

    #[test]
    fn test_service_unavailable() {
        let response = service_unavailable();
        assert_eq!(response.status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(response.status_text, "Service Unavailable");
        assert_eq!(response.content_type(), Some("text/plain"));
        assert_eq!(&response.body[..], b"Service Unavailable");
    }
}
