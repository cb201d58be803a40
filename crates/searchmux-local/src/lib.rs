//! reqwest-backed provider adapters for searchmux.
//!
//! Each adapter implements a core trait (`BasicSearchProvider` or
//! `AnswerSearchProvider`) over one upstream API. Construction fails with
//! `Error::NotConfigured` when credentials are missing; the registry simply
//! leaves such providers out, and the router treats them as absent.

use searchmux_core::config::Config;
use searchmux_core::{AnswerSearchProvider, BasicSearchProvider, Error, Result};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

pub mod brave;
pub mod perplexity;
pub mod searxng;
pub mod tavily;

/// Shared HTTP client for all adapters.
///
/// Per-request timeouts (from the routing engine) override the overall
/// timeout set here; the connect timeout guards against DNS/TLS stalls.
pub fn http_client() -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent("searchmux/0.1")
        .redirect(reqwest::redirect::Policy::limited(10))
        .connect_timeout(Duration::from_secs(10))
        .timeout(Duration::from_secs(30))
        .build()
        .map_err(|e| Error::Search(e.to_string()))
}

#[derive(Default)]
pub struct ProviderRegistry {
    pub basic: BTreeMap<String, Arc<dyn BasicSearchProvider>>,
    pub ai: BTreeMap<String, Arc<dyn AnswerSearchProvider>>,
}

/// Build adapters for every provider the configuration has credentials for.
pub fn registry_from_config(config: &Config, client: reqwest::Client) -> ProviderRegistry {
    let mut registry = ProviderRegistry::default();

    match brave::BraveProvider::from_config(&config.providers.brave, client.clone()) {
        Ok(p) => {
            registry
                .basic
                .insert("brave".to_string(), Arc::new(p) as Arc<dyn BasicSearchProvider>);
        }
        Err(e) => tracing::debug!(provider = "brave", reason = %e, "provider not registered"),
    }
    match searxng::SearxngProvider::from_config(&config.providers.searxng, client.clone()) {
        Ok(p) => {
            registry
                .basic
                .insert("searxng".to_string(), Arc::new(p) as Arc<dyn BasicSearchProvider>);
        }
        Err(e) => tracing::debug!(provider = "searxng", reason = %e, "provider not registered"),
    }
    match perplexity::PerplexityProvider::from_config(&config.providers.perplexity, client.clone())
    {
        Ok(p) => {
            registry
                .ai
                .insert("perplexity".to_string(), Arc::new(p) as Arc<dyn AnswerSearchProvider>);
        }
        Err(e) => tracing::debug!(provider = "perplexity", reason = %e, "provider not registered"),
    }
    match tavily::TavilyProvider::from_config(&config.providers.tavily, client) {
        Ok(p) => {
            registry
                .ai
                .insert("tavily".to_string(), Arc::new(p) as Arc<dyn AnswerSearchProvider>);
        }
        Err(e) => tracing::debug!(provider = "tavily", reason = %e, "provider not registered"),
    }

    registry
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{http::StatusCode, routing::get, routing::post, Json, Router};
    use searchmux_core::config::ProviderConfig;
    use searchmux_core::{AnswerSearchInput, BasicSearchInput};
    use std::net::SocketAddr;

    async fn serve(app: Router) -> SocketAddr {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        addr
    }

    fn basic_input(timeout_ms: u64) -> BasicSearchInput {
        BasicSearchInput {
            query: "rust".to_string(),
            max_results: 5,
            language: None,
            region: None,
            freshness: None,
            category: None,
            safesearch: None,
            timeout_ms,
        }
    }

    #[test]
    fn registry_only_contains_configured_providers() {
        let mut config = Config::default();
        config.providers.brave.api_key = Some("k".to_string());
        config.providers.tavily.api_key = Some("k".to_string());
        let registry = registry_from_config(&config, reqwest::Client::new());
        assert!(registry.basic.contains_key("brave"));
        assert!(!registry.basic.contains_key("searxng"));
        assert!(registry.ai.contains_key("tavily"));
        assert!(!registry.ai.contains_key("perplexity"));
    }

    #[tokio::test]
    async fn brave_adapter_drops_records_missing_title_or_url() {
        let app = Router::new().route(
            "/",
            get(|| async {
                Json(serde_json::json!({
                    "web": {
                        "results": [
                            {"url": "https://example.com/a", "title": "A", "description": "ok"},
                            {"url": "https://example.com/b", "description": "no title"},
                            {"title": "no url", "description": "dropped"}
                        ]
                    }
                }))
            }),
        );
        let addr = serve(app).await;

        let cfg = ProviderConfig {
            api_key: Some("k".to_string()),
            endpoint: Some(format!("http://{addr}/")),
            ..Default::default()
        };
        let p = brave::BraveProvider::from_config(&cfg, reqwest::Client::new()).unwrap();
        let got = p.search(&basic_input(2_000)).await.unwrap();
        assert_eq!(got.len(), 1);
        assert_eq!(got[0].title, "A");
        assert_eq!(got[0].url, "https://example.com/a");
        assert_eq!(got[0].source.as_deref(), Some("brave"));
    }

    #[tokio::test]
    async fn brave_adapter_surfaces_non_2xx_as_an_error() {
        let app = Router::new().route(
            "/",
            get(|| async { (StatusCode::TOO_MANY_REQUESTS, "slow down") }),
        );
        let addr = serve(app).await;

        let cfg = ProviderConfig {
            api_key: Some("k".to_string()),
            endpoint: Some(format!("http://{addr}/")),
            ..Default::default()
        };
        let p = brave::BraveProvider::from_config(&cfg, reqwest::Client::new()).unwrap();
        let err = p.search(&basic_input(2_000)).await.unwrap_err();
        assert!(err.to_string().contains("429"));
    }

    #[tokio::test]
    async fn brave_adapter_respects_the_supplied_timeout() {
        let app = Router::new().route(
            "/",
            get(|| async {
                tokio::time::sleep(std::time::Duration::from_secs(5)).await;
                Json(serde_json::json!({"web": {"results": []}}))
            }),
        );
        let addr = serve(app).await;

        let cfg = ProviderConfig {
            api_key: Some("k".to_string()),
            endpoint: Some(format!("http://{addr}/")),
            ..Default::default()
        };
        let p = brave::BraveProvider::from_config(&cfg, reqwest::Client::new()).unwrap();
        let t0 = std::time::Instant::now();
        let err = p.search(&basic_input(300)).await.unwrap_err();
        assert!(matches!(err, Error::Search(_)));
        assert!(t0.elapsed() < std::time::Duration::from_secs(4));
    }

    #[tokio::test]
    async fn searxng_adapter_parses_instance_json() {
        let app = Router::new().route(
            "/search",
            get(|| async {
                Json(serde_json::json!({
                    "results": [
                        {"url": "https://example.com/a", "title": "A", "content": "snippet"},
                        {"title": "no url"}
                    ]
                }))
            }),
        );
        let addr = serve(app).await;

        let cfg = ProviderConfig {
            endpoint: Some(format!("http://{addr}")),
            ..Default::default()
        };
        let p = searxng::SearxngProvider::from_config(&cfg, reqwest::Client::new()).unwrap();
        let got = p.search(&basic_input(2_000)).await.unwrap();
        assert_eq!(got.len(), 1);
        assert_eq!(got[0].snippet, "snippet");
    }

    #[tokio::test]
    async fn tavily_adapter_returns_answer_with_citations() {
        let app = Router::new().route(
            "/",
            post(|| async {
                Json(serde_json::json!({
                    "answer": "Because photons scatter.",
                    "results": [
                        {"url": "https://example.com/sky", "title": "Sky", "content": "rayleigh"},
                        {"content": "malformed, dropped"}
                    ]
                }))
            }),
        );
        let addr = serve(app).await;

        let cfg = ProviderConfig {
            api_key: Some("k".to_string()),
            endpoint: Some(format!("http://{addr}/")),
            ..Default::default()
        };
        let p = tavily::TavilyProvider::from_config(&cfg, reqwest::Client::new()).unwrap();
        let input = AnswerSearchInput {
            query: "why is the sky blue".to_string(),
            max_results: 5,
            language: None,
            region: None,
            timeout_ms: 2_000,
        };
        let got = p.answer(&input).await.unwrap();
        assert_eq!(got.answer, "Because photons scatter.");
        assert_eq!(got.citations, vec!["https://example.com/sky".to_string()]);
        assert_eq!(got.results.len(), 1);
    }

    #[tokio::test]
    async fn perplexity_adapter_extracts_answer_and_citations() {
        let app = Router::new().route(
            "/",
            post(|| async {
                Json(serde_json::json!({
                    "choices": [
                        {"message": {"role": "assistant", "content": "Because physics."}}
                    ],
                    "citations": ["https://example.com/a", "https://example.com/b"]
                }))
            }),
        );
        let addr = serve(app).await;

        let cfg = ProviderConfig {
            api_key: Some("k".to_string()),
            endpoint: Some(format!("http://{addr}/")),
            ..Default::default()
        };
        let p = perplexity::PerplexityProvider::from_config(&cfg, reqwest::Client::new()).unwrap();
        let input = AnswerSearchInput {
            query: "why".to_string(),
            max_results: 5,
            language: None,
            region: None,
            timeout_ms: 2_000,
        };
        let got = p.answer(&input).await.unwrap();
        assert_eq!(got.answer, "Because physics.");
        assert_eq!(got.citations.len(), 2);
        assert!(got.results.is_empty());
    }
}
