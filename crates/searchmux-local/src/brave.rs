use searchmux_core::config::ProviderConfig;
use searchmux_core::{BasicResult, BasicSearchInput, BasicSearchProvider, Error, Result};
use serde::Deserialize;

// Docs: https://api.search.brave.com/res/v1/web/search
const DEFAULT_ENDPOINT: &str = "https://api.search.brave.com/res/v1/web/search";

#[derive(Debug, Clone)]
pub struct BraveProvider {
    client: reqwest::Client,
    api_key: String,
    endpoint: String,
}

impl BraveProvider {
    pub fn from_config(cfg: &ProviderConfig, client: reqwest::Client) -> Result<Self> {
        let api_key = cfg
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| Error::NotConfigured("missing brave api key".to_string()))?
            .to_string();
        let endpoint = cfg
            .endpoint
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or(DEFAULT_ENDPOINT)
            .to_string();
        Ok(Self {
            client,
            api_key,
            endpoint,
        })
    }
}

#[derive(Debug, Deserialize)]
struct BraveWebSearchResponse {
    web: Option<BraveWeb>,
}

#[derive(Debug, Deserialize)]
struct BraveWeb {
    results: Option<Vec<BraveWebResult>>,
}

#[derive(Debug, Deserialize)]
struct BraveWebResult {
    url: Option<String>,
    title: Option<String>,
    description: Option<String>,
}

#[async_trait::async_trait]
impl BasicSearchProvider for BraveProvider {
    fn name(&self) -> &'static str {
        "brave"
    }

    async fn search(&self, input: &BasicSearchInput) -> Result<Vec<BasicResult>> {
        let count = input.max_results.to_string();
        let mut req = self
            .client
            .get(&self.endpoint)
            .header("X-Subscription-Token", &self.api_key)
            .query(&[("q", input.query.as_str()), ("count", count.as_str())]);

        // Best-effort hints; Brave treats these as optional knobs.
        if let Some(lang) = input.language.as_deref() {
            req = req.query(&[("search_lang", lang)]);
        }
        if let Some(country) = input.region.as_deref() {
            req = req.query(&[("country", country)]);
        }
        if let Some(freshness) = input.freshness.as_deref() {
            req = req.query(&[("freshness", freshness)]);
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
            return Err(Error::Search(format!("brave search HTTP {status}")));
        }

        let parsed: BraveWebSearchResponse = resp
            .json()
            .await
            .map_err(|e| Error::Search(e.to_string()))?;

        let mut out = Vec::new();
        if let Some(results) = parsed.web.and_then(|w| w.results) {
            for r in results.into_iter().take(input.max_results) {
                // Records without a title or URL are dropped, not propagated.
                let Some(url) = r.url.filter(|u| !u.trim().is_empty()) else {
                    continue;
                };
                let Some(title) = r.title.filter(|t| !t.trim().is_empty()) else {
                    continue;
                };
                out.push(BasicResult {
                    title,
                    url,
                    snippet: r.description.unwrap_or_default(),
                    source: Some("brave".to_string()),
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
    fn parses_minimal_brave_shape() {
        let js = r#"
        {
          "web": {
            "results": [
              {"url":"https://example.com","title":"Example","description":"Hello"}
            ]
          }
        }
        "#;
        let parsed: BraveWebSearchResponse = serde_json::from_str(js).unwrap();
        let rs = parsed.web.unwrap().results.unwrap();
        assert_eq!(rs.len(), 1);
        assert_eq!(rs[0].url.as_deref(), Some("https://example.com"));
        assert_eq!(rs[0].title.as_deref(), Some("Example"));
        assert_eq!(rs[0].description.as_deref(), Some("Hello"));
    }

    #[test]
    fn blank_api_key_is_treated_as_missing() {
        let cfg = ProviderConfig {
            api_key: Some("   ".to_string()),
            ..Default::default()
        };
        assert!(BraveProvider::from_config(&cfg, reqwest::Client::new()).is_err());
    }
}
