use searchmux_core::config::ProviderConfig;
use searchmux_core::{BasicResult, BasicSearchInput, BasicSearchProvider, Error, Result};
use serde::Deserialize;

#[derive(Debug, Clone)]
pub struct SearxngProvider {
    client: reqwest::Client,
    endpoint: String,
}

impl SearxngProvider {
    pub fn from_config(cfg: &ProviderConfig, client: reqwest::Client) -> Result<Self> {
        let endpoint = cfg
            .endpoint
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| Error::NotConfigured("missing searxng endpoint".to_string()))?;
        Ok(Self {
            client,
            endpoint: Self::endpoint_search_for(endpoint),
        })
    }

    /// Accept either a base URL or a full `/search` endpoint.
    fn endpoint_search_for(base_endpoint: &str) -> String {
        let mut base = base_endpoint.trim().trim_end_matches('/').to_string();
        if !base.ends_with("/search") {
            base.push_str("/search");
        }
        base
    }
}

#[derive(Debug, Deserialize)]
struct SearxngSearchResponse {
    results: Option<Vec<SearxngResult>>,
}

#[derive(Debug, Deserialize)]
struct SearxngResult {
    url: Option<String>,
    title: Option<String>,
    // SearXNG uses `content` for snippets in JSON format.
    content: Option<String>,
}

#[async_trait::async_trait]
impl BasicSearchProvider for SearxngProvider {
    fn name(&self) -> &'static str {
        "searxng"
    }

    async fn search(&self, input: &BasicSearchInput) -> Result<Vec<BasicResult>> {
        let mut req = self
            .client
            .get(&self.endpoint)
            .query(&[("q", input.query.as_str()), ("format", "json")]);

        // Best-effort hints: support varies per instance.
        if let Some(lang) = input.language.as_deref() {
            req = req.query(&[("language", lang)]);
        }
        if let Some(category) = input.category.as_deref() {
            req = req.query(&[("categories", category)]);
        }
        if let Some(freshness) = input.freshness.as_deref() {
            req = req.query(&[("time_range", freshness)]);
        }
        if let Some(safe) = input.safesearch.as_deref() {
            req = req.query(&[("safesearch", safe)]);
        }

        let resp = req
            .timeout(std::time::Duration::from_millis(input.timeout_ms))
            .send()
            .await
            .map_err(|e| Error::Search(e.to_string()))?;
        let status = resp.status();
        if !status.is_success() {
            return Err(Error::Search(format!("searxng search HTTP {status}")));
        }

        let parsed: SearxngSearchResponse = resp
            .json()
            .await
            .map_err(|e| Error::Search(e.to_string()))?;

        let mut out = Vec::new();
        if let Some(rs) = parsed.results {
            for r in rs.into_iter().take(input.max_results) {
                let Some(url) = r.url.filter(|u| !u.trim().is_empty()) else {
                    continue;
                };
                let Some(title) = r.title.filter(|t| !t.trim().is_empty()) else {
                    continue;
                };
                out.push(BasicResult {
                    title,
                    url,
                    snippet: r.content.unwrap_or_default(),
                    source: Some("searxng".to_string()),
                });
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_minimal_searxng_shape() {
        let js = r#"
        {
          "results": [
            {"url":"https://example.com","title":"Example","content":"Hello"}
          ]
        }
        "#;
        let parsed: SearxngSearchResponse = serde_json::from_str(js).unwrap();
        assert_eq!(parsed.results.unwrap().len(), 1);
    }

    #[test]
    fn endpoint_accepts_base_url_or_full_search_path() {
        assert_eq!(
            SearxngProvider::endpoint_search_for("http://localhost:8080"),
            "http://localhost:8080/search"
        );
        assert_eq!(
            SearxngProvider::endpoint_search_for("http://localhost:8080/"),
            "http://localhost:8080/search"
        );
        assert_eq!(
            SearxngProvider::endpoint_search_for("http://localhost:8080/search"),
            "http://localhost:8080/search"
        );
    }

    #[test]
    fn missing_endpoint_is_not_configured() {
        let cfg = ProviderConfig::default();
        assert!(SearxngProvider::from_config(&cfg, reqwest::Client::new()).is_err());
    }
}
