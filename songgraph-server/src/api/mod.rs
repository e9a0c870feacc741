//! HTTP API handlers for songgraph-server

pub mod features;
pub mod health;
pub mod playlist;
pub mod progress;

pub use features::feature_routes;
pub use health::health_routes;
pub use playlist::playlist_routes;
pub use progress::progress_routes;

use axum::http::{request::Parts, HeaderValue, Method};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};

/// CORS layer for the configured origins.
///
/// An entry may use a leading wildcard host label, e.g.
/// `https://*.vercel.app`.
pub fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let patterns = allowed_origins.to_vec();
    CorsLayer::new()
        .allow_origin(AllowOrigin::predicate(
            move |origin: &HeaderValue, _request: &Parts| {
                origin
                    .to_str()
                    .map(|origin| origin_allowed(origin, &patterns))
                    .unwrap_or(false)
            },
        ))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any)
}

/// Match an `Origin` header against exact and `scheme://*.domain` patterns
pub fn origin_allowed(origin: &str, patterns: &[String]) -> bool {
    let origin = origin.trim_end_matches('/');
    patterns.iter().any(|pattern| {
        let pattern = pattern.trim_end_matches('/');
        match pattern.split_once("://*.") {
            Some((scheme, domain)) => origin
                .strip_prefix(scheme)
                .and_then(|rest| rest.strip_prefix("://"))
                .and_then(|host| host.strip_suffix(domain))
                .is_some_and(|sub| sub.len() > 1 && sub.ends_with('.')),
            None => origin == pattern,
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_origin_matching() {
        let patterns = vec![
            "http://localhost:5173".to_string(),
            "https://*.vercel.app".to_string(),
        ];
        assert!(origin_allowed("http://localhost:5173", &patterns));
        assert!(origin_allowed("https://songgraph-git-main.vercel.app", &patterns));
        assert!(!origin_allowed("https://vercel.app", &patterns));
        assert!(!origin_allowed("http://evil.vercel.app", &patterns));
        assert!(!origin_allowed("https://evil.example.com", &patterns));
        assert!(!origin_allowed("http://localhost:3000", &patterns));
    }
}
