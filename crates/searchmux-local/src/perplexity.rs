use searchmux_core::config::ProviderConfig;
use searchmux_core::{
    AiAnswer, AnswerSearchInput, AnswerSearchProvider, BasicResult, Error, Result,
};
use serde::{Deserialize, Serialize};

// Docs: https://docs.perplexity.ai/api-reference/chat-completions-post
const DEFAULT_ENDPOINT: &str = "https://api.perplexity.ai/chat/completions";
const DEFAULT_MODEL: &str = "sonar";

#[derive(Debug, Clone)]
pub struct PerplexityProvider {
    client: reqwest::Client,
    api_key: String,
    endpoint: String,
    model: String,
}

impl PerplexityProvider {
    pub fn from_config(cfg: &ProviderConfig, client: reqwest::Client) -> Result<Self> {
        let api_key = cfg
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| Error::NotConfigured("missing perplexity api key".to_string()))?
            .to_string();
        let endpoint = cfg
            .endpoint
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or(DEFAULT_ENDPOINT)
            .to_string();
        let model = cfg
            .model
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or(DEFAULT_MODEL)
            .to_string();
        Ok(Self {
            client,
            api_key,
            endpoint,
            model,
        })
    }
}

#[derive(Debug, Clone, Serialize)]
struct ChatCompletionsRequest {
    model: String,
    messages: Vec<Message>,
}

#[derive(Debug, Clone, Serialize)]
struct Message {
    role: String,
    content: String,
}

#[derive(Debug, Clone, Deserialize)]
struct ChatCompletionsResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    #[serde(default)]
    citations: Option<Vec<String>>,
    #[serde(default)]
    search_results: Option<Vec<PerplexitySearchResult>>,
}

#[derive(Debug, Clone, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Clone, Deserialize)]
struct ChoiceMessage {
    content: String,
}

#[derive(Debug, Clone, Deserialize)]
struct PerplexitySearchResult {
    url: Option<String>,
    title: Option<String>,
    #[serde(default)]
    snippet: Option<String>,
}

#[async_trait::async_trait]
impl AnswerSearchProvider for PerplexityProvider {
    fn name(&self) -> &'static str {
        "perplexity"
    }

    async fn answer(&self, input: &AnswerSearchInput) -> Result<AiAnswer> {
        let body = ChatCompletionsRequest {
            model: self.model.clone(),
            messages: vec![Message {
                role: "user".to_string(),
                content: input.query.clone(),
            }],
        };

        let resp = self
            .client
            .post(&self.endpoint)
            .header(
                reqwest::header::AUTHORIZATION,
                format!("Bearer {}", self.api_key),
            )
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .json(&body)
            .timeout(std::time::Duration::from_millis(input.timeout_ms))
            .send()
            .await
            .map_err(|e| Error::Answer(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(Error::Answer(format!(
                "perplexity chat.completions HTTP {status}"
            )));
        }

        let parsed: ChatCompletionsResponse = resp
            .json()
            .await
            .map_err(|e| Error::Answer(e.to_string()))?;

        let answer = parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .filter(|a| !a.trim().is_empty())
            .ok_or_else(|| Error::Answer("perplexity response had no choices".to_string()))?;

        let citations = parsed.citations.unwrap_or_default();

        let mut results = Vec::new();
        for r in parsed
            .search_results
            .unwrap_or_default()
            .into_iter()
            .take(input.max_results)
        {
            let Some(url) = r.url.filter(|u| !u.trim().is_empty()) else {
                continue;
            };
            let Some(title) = r.title.filter(|t| !t.trim().is_empty()) else {
                continue;
            };
            results.push(BasicResult {
                title,
                url,
                snippet: r.snippet.unwrap_or_default(),
                source: Some("perplexity".to_string()),
            });
        }

        Ok(AiAnswer {
            answer,
            citations,
            results,
        })
    }
}
