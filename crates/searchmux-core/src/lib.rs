use serde::{Deserialize, Serialize};

pub mod breaker;
pub mod cache;
pub mod clock;
pub mod config;
pub mod normalize;
pub mod privacy;
pub mod router;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    #[error("invalid config: {0}")]
    InvalidConfig(String),
    #[error("not configured: {0}")]
    NotConfigured(String),
    #[error("daily budget exhausted: {0}")]
    Budget(String),
    #[error("search failed: {0}")]
    Search(String),
    #[error("answer failed: {0}")]
    Answer(String),
    #[error("{tier} tier exhausted: {message}")]
    Exhausted { tier: Tier, message: String },
}

impl Error {
    /// Transient failures are retried across providers, and an exhausted
    /// tier may recover later; configuration and input errors are not
    /// retryable without changing something.
    pub fn retryable(&self) -> bool {
        matches!(
            self,
            Self::Search(_) | Self::Answer(_) | Self::Exhausted { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// Search category: lexical engine results vs. synthesized answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Basic,
    Ai,
}

impl Tier {
    pub fn as_str(self) -> &'static str {
        match self {
            Tier::Basic => "basic",
            Tier::Ai => "ai",
        }
    }

    /// The closed set of provider ids this tier can route to.
    pub fn known_providers(self) -> &'static [&'static str] {
        match self {
            Tier::Basic => &["brave", "searxng"],
            Tier::Ai => &["perplexity", "tavily"],
        }
    }
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Basic,
    Ai,
    #[default]
    Auto,
}

impl std::str::FromStr for Mode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "basic" => Ok(Mode::Basic),
            "ai" => Ok(Mode::Ai),
            "auto" => Ok(Mode::Auto),
            other => Err(Error::InvalidRequest(format!(
                "unknown mode: {other} (expected basic|ai|auto)"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Preset {
    #[default]
    Free,
    Quality,
    Custom,
}

impl std::str::FromStr for Preset {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "free" => Ok(Preset::Free),
            "quality" => Ok(Preset::Quality),
            "custom" => Ok(Preset::Custom),
            other => Err(Error::InvalidConfig(format!(
                "unknown preset: {other} (expected free|quality|custom)"
            ))),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchRequest {
    pub query: String,
    /// Pin a specific provider instead of walking the priority order.
    #[serde(default)]
    pub provider: Option<String>,
    /// Override the configured default mode.
    #[serde(default)]
    pub mode: Option<Mode>,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub freshness: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub safesearch: Option<String>,
    /// Clamped into 1..=20 before use.
    #[serde(default)]
    pub max_results: Option<i64>,
    /// Keep the routing trace in the returned envelope.
    #[serde(default)]
    pub debug: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BasicResult {
    pub title: String,
    pub url: String,
    pub snippet: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AiAnswer {
    pub answer: String,
    /// Citation URLs in the order the provider reported them.
    pub citations: Vec<String>,
    pub results: Vec<BasicResult>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "kind")]
pub enum SearchPayload {
    Results { results: Vec<BasicResult> },
    Answer { answer: AiAnswer },
}

impl SearchPayload {
    pub fn result_count(&self) -> usize {
        match self {
            SearchPayload::Results { results } => results.len(),
            SearchPayload::Answer { answer } => answer.results.len(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraceEvent {
    pub at_epoch_ms: u64,
    pub event: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<serde_json::Value>,
}

/// Uniform result wrapper: which tier/provider answered, plus the routing
/// trace. The trace is always accumulated internally and cleared at the
/// output boundary unless the request asked for debug output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope {
    pub tier: Tier,
    pub provider: String,
    pub query: String,
    pub payload: SearchPayload,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub trace: Vec<TraceEvent>,
}

impl Envelope {
    pub fn without_trace(mut self) -> Self {
        self.trace.clear();
        self
    }
}

#[derive(Debug, Clone)]
pub struct BasicSearchInput {
    pub query: String,
    pub max_results: usize,
    pub language: Option<String>,
    pub region: Option<String>,
    pub freshness: Option<String>,
    pub category: Option<String>,
    pub safesearch: Option<String>,
    pub timeout_ms: u64,
}

#[derive(Debug, Clone)]
pub struct AnswerSearchInput {
    pub query: String,
    pub max_results: usize,
    pub language: Option<String>,
    pub region: Option<String>,
    pub timeout_ms: u64,
}

#[async_trait::async_trait]
pub trait BasicSearchProvider: Send + Sync {
    fn name(&self) -> &'static str;
    async fn search(&self, input: &BasicSearchInput) -> Result<Vec<BasicResult>>;
}

#[async_trait::async_trait]
pub trait AnswerSearchProvider: Send + Sync {
    fn name(&self) -> &'static str;
    async fn answer(&self, input: &AnswerSearchInput) -> Result<AiAnswer>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tier_and_mode_serialize_lowercase() {
        assert_eq!(serde_json::to_string(&Tier::Basic).unwrap(), "\"basic\"");
        assert_eq!(serde_json::to_string(&Tier::Ai).unwrap(), "\"ai\"");
        assert_eq!(serde_json::to_string(&Mode::Auto).unwrap(), "\"auto\"");
    }

    #[test]
    fn mode_parses_case_insensitively() {
        assert_eq!("AI".parse::<Mode>().unwrap(), Mode::Ai);
        assert_eq!(" basic ".parse::<Mode>().unwrap(), Mode::Basic);
        assert!("fancy".parse::<Mode>().is_err());
    }

    #[test]
    fn known_providers_are_disjoint_across_tiers() {
        for p in Tier::Basic.known_providers() {
            assert!(!Tier::Ai.known_providers().contains(p));
        }
    }

    #[test]
    fn envelope_without_trace_clears_only_the_trace() {
        let env = Envelope {
            tier: Tier::Basic,
            provider: "brave".to_string(),
            query: "q".to_string(),
            payload: SearchPayload::Results { results: Vec::new() },
            trace: vec![TraceEvent {
                at_epoch_ms: 1,
                event: "provider_ok".to_string(),
                detail: None,
            }],
        };
        let stripped = env.without_trace();
        assert!(stripped.trace.is_empty());
        assert_eq!(stripped.provider, "brave");
    }
}
