use searchmux_core::config::ProviderConfig;
use searchmux_core::{
    AiAnswer, AnswerSearchInput, AnswerSearchProvider, BasicResult, Error, Result,
};
use serde::Deserialize;

const DEFAULT_ENDPOINT: &str = "https://api.tavily.com/search";

#[derive(Debug, Clone)]
pub struct TavilyProvider {
    client: reqwest::Client,
    api_key: String,
    endpoint: String,
}

impl TavilyProvider {
    pub fn from_config(cfg: &ProviderConfig, client: reqwest::Client) -> Result<Self> {
        let api_key = cfg
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| Error::NotConfigured("missing tavily api key".to_string()))?
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
struct TavilySearchResponse {
    answer: Option<String>,
    #[serde(default)]
    results: Vec<TavilyResult>,
}

#[derive(Debug, Deserialize)]
struct TavilyResult {
    url: Option<String>,
    title: Option<String>,
    content: Option<String>,
}

#[async_trait::async_trait]
impl AnswerSearchProvider for TavilyProvider {
    fn name(&self) -> &'static str {
        "tavily"
    }

    async fn answer(&self, input: &AnswerSearchInput) -> Result<AiAnswer> {
        let body = serde_json::json!({
            "query": input.query,
            "max_results": input.max_results,
            "include_answer": true,
            "include_raw_content": false,
            "search_depth": "advanced",
            // Tavily accepts country only for some topics; safe to send.
            "country": input.region,
        });

        let resp = self
            .client
            .post(&self.endpoint)
            .header(
                reqwest::header::AUTHORIZATION,
                format!("Bearer {}", self.api_key),
            )
            .json(&body)
            .timeout(std::time::Duration::from_millis(input.timeout_ms))
            .send()
            .await
            .map_err(|e| Error::Answer(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(Error::Answer(format!("tavily search HTTP {status}")));
        }

        let parsed: TavilySearchResponse = resp
            .json()
            .await
            .map_err(|e| Error::Answer(e.to_string()))?;

        let answer = parsed
            .answer
            .map(|a| a.trim().to_string())
            .filter(|a| !a.is_empty())
            .ok_or_else(|| Error::Answer("tavily response had no answer".to_string()))?;

        let mut results = Vec::new();
        for r in parsed.results.into_iter().take(input.max_results) {
            let Some(url) = r.url.filter(|u| !u.trim().is_empty()) else {
                continue;
            };
            let Some(title) = r.title.filter(|t| !t.trim().is_empty()) else {
                continue;
            };
            results.push(BasicResult {
                title,
                url,
                snippet: r.content.unwrap_or_default(),
                source: Some("tavily".to_string()),
            });
        }
        let citations = results.iter().map(|r| r.url.clone()).collect();

        Ok(AiAnswer {
            answer,
            citations,
            results,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_minimal_tavily_shape() {
        let js = r#"
        {
          "answer": "Because photons scatter.",
          "results": [
            {"url":"https://example.com","title":"Example","content":"Hello"}
          ]
        }
        "#;
        let parsed: TavilySearchResponse = serde_json::from_str(js).unwrap();
        assert_eq!(parsed.answer.as_deref(), Some("Because photons scatter."));
        assert_eq!(parsed.results.len(), 1);
    }

    #[test]
    fn results_field_is_optional() {
        let parsed: TavilySearchResponse = serde_json::from_str(r#"{"answer":"x"}"#).unwrap();
        assert!(parsed.results.is_empty());
    }

    #[test]
    fn blank_api_key_is_treated_as_missing() {
        let cfg = ProviderConfig {
            api_key: Some(String::new()),
            ..Default::default()
        };
        assert!(TavilyProvider::from_config(&cfg, reqwest::Client::new()).is_err());
    }
}
