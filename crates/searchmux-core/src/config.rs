//! Configuration model.
//!
//! File/env loading lives in the binary crate; this module only defines the
//! serde shape, the defaults, and validation.

use crate::{Error, Mode, Preset, Result, Tier};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub providers: ProvidersConfig,
    #[serde(default)]
    pub router: RouterConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub breaker: BreakerConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProvidersConfig {
    #[serde(default)]
    pub brave: ProviderConfig,
    #[serde(default)]
    pub searxng: ProviderConfig,
    #[serde(default)]
    pub perplexity: ProviderConfig,
    #[serde(default)]
    pub tavily: ProviderConfig,
}

impl ProvidersConfig {
    pub fn get(&self, id: &str) -> Option<&ProviderConfig> {
        match id {
            "brave" => Some(&self.brave),
            "searxng" => Some(&self.searxng),
            "perplexity" => Some(&self.perplexity),
            "tavily" => Some(&self.tavily),
            _ => None,
        }
    }

    /// Whether the provider has the credentials/endpoint it needs to be
    /// called at all. searxng is endpoint-configured; the rest are keyed.
    pub fn is_configured(&self, id: &str) -> bool {
        fn present(v: &Option<String>) -> bool {
            v.as_deref().map(str::trim).filter(|s| !s.is_empty()).is_some()
        }
        match id {
            "brave" => present(&self.brave.api_key),
            "searxng" => present(&self.searxng.endpoint),
            "perplexity" => present(&self.perplexity.api_key),
            "tavily" => present(&self.tavily.api_key),
            _ => false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default)]
    pub api_key: Option<String>,
    /// Endpoint override; each adapter has its own default.
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// Model name for chat-completions providers (perplexity).
    #[serde(default)]
    pub model: Option<String>,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            endpoint: None,
            timeout_ms: default_timeout_ms(),
            model: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouterConfig {
    #[serde(default)]
    pub default_mode: Mode,
    #[serde(default)]
    pub preset: Preset,
    /// Explicit basic-tier priority order; only read under the custom preset.
    #[serde(default)]
    pub basic_priority: Vec<String>,
    /// Explicit ai-tier priority order; only read under the custom preset.
    #[serde(default)]
    pub ai_priority: Vec<String>,
    /// Escalate to the ai tier when the basic tier returned fewer results.
    #[serde(default = "default_escalation_min_results")]
    pub escalation_min_results: usize,
    /// Case-insensitive substrings of the query that signal analytic intent.
    #[serde(default = "default_escalation_keywords")]
    pub escalation_keywords: Vec<String>,
    /// Calls per day per provider; providers without an entry are uncapped.
    #[serde(default = "default_daily_caps")]
    pub daily_caps: BTreeMap<String, u32>,
    /// Tier-wide cap on successful ai calls per day.
    #[serde(default = "default_ai_daily_cap")]
    pub ai_daily_cap: u32,
    /// Suppress automatic escalation for privacy-sensitive queries.
    #[serde(default = "default_true")]
    pub privacy_guard: bool,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            default_mode: Mode::default(),
            preset: Preset::default(),
            basic_priority: Vec::new(),
            ai_priority: Vec::new(),
            escalation_min_results: default_escalation_min_results(),
            escalation_keywords: default_escalation_keywords(),
            daily_caps: default_daily_caps(),
            ai_daily_cap: default_ai_daily_cap(),
            privacy_guard: true,
        }
    }
}

impl RouterConfig {
    /// Candidate order for a tier before the configured-providers filter.
    pub fn base_order(&self, tier: Tier) -> Vec<String> {
        let fixed: &[&str] = match (self.preset, tier) {
            (Preset::Free, Tier::Basic) => &["searxng", "brave"],
            (Preset::Free, Tier::Ai) => &["tavily", "perplexity"],
            (Preset::Quality, Tier::Basic) => &["brave", "searxng"],
            (Preset::Quality, Tier::Ai) => &["perplexity", "tavily"],
            (Preset::Custom, Tier::Basic) => return self.basic_priority.clone(),
            (Preset::Custom, Tier::Ai) => return self.ai_priority.clone(),
        };
        fixed.iter().map(|s| s.to_string()).collect()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_max_entries")]
    pub max_entries: usize,
    #[serde(default = "default_basic_ttl_s")]
    pub basic_ttl_s: u64,
    #[serde(default = "default_ai_ttl_s")]
    pub ai_ttl_s: u64,
    /// Per-provider TTL override (seconds); falls back to the tier default.
    #[serde(default)]
    pub provider_ttl_s: BTreeMap<String, u64>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_entries: default_max_entries(),
            basic_ttl_s: default_basic_ttl_s(),
            ai_ttl_s: default_ai_ttl_s(),
            provider_ttl_s: BTreeMap::new(),
        }
    }
}

impl CacheConfig {
    pub fn ttl_for(&self, tier: Tier, provider: &str) -> u64 {
        if let Some(ttl) = self.provider_ttl_s.get(provider) {
            return *ttl;
        }
        match tier {
            Tier::Basic => self.basic_ttl_s,
            Tier::Ai => self.ai_ttl_s,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BreakerConfig {
    #[serde(default = "default_failure_threshold")]
    pub failure_threshold: u32,
    #[serde(default = "default_cooldown_ms")]
    pub cooldown_ms: u64,
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: default_failure_threshold(),
            cooldown_ms: default_cooldown_ms(),
        }
    }
}

fn default_timeout_ms() -> u64 {
    20_000
}

fn default_escalation_min_results() -> usize {
    3
}

fn default_escalation_keywords() -> Vec<String> {
    [
        "why", "how", "explain", "compare", "versus", "analyze", "research",
        "best", "difference", "in depth", "latest",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_daily_caps() -> BTreeMap<String, u32> {
    // Brave's free plan is metered; the others are uncapped by default.
    let mut caps = BTreeMap::new();
    caps.insert("brave".to_string(), 2_000);
    caps
}

fn default_ai_daily_cap() -> u32 {
    50
}

fn default_true() -> bool {
    true
}

fn default_max_entries() -> usize {
    256
}

fn default_basic_ttl_s() -> u64 {
    900
}

fn default_ai_ttl_s() -> u64 {
    3_600
}

fn default_failure_threshold() -> u32 {
    3
}

fn default_cooldown_ms() -> u64 {
    60_000
}

impl Config {
    pub fn validate(&self) -> Result<()> {
        for (tier, list) in [
            (Tier::Basic, &self.router.basic_priority),
            (Tier::Ai, &self.router.ai_priority),
        ] {
            let known = tier.known_providers();
            let mut seen = std::collections::BTreeSet::new();
            for id in list {
                if !known.contains(&id.as_str()) {
                    return Err(Error::InvalidConfig(format!(
                        "unknown {tier} provider in priority list: {id}"
                    )));
                }
                if !seen.insert(id.as_str()) {
                    return Err(Error::InvalidConfig(format!(
                        "duplicate provider in {tier} priority list: {id}"
                    )));
                }
            }
        }
        if self.cache.max_entries == 0 {
            return Err(Error::InvalidConfig(
                "cache.max_entries must be at least 1".to_string(),
            ));
        }
        if self.cache.basic_ttl_s == 0 || self.cache.ai_ttl_s == 0 {
            return Err(Error::InvalidConfig(
                "cache TTLs must be positive".to_string(),
            ));
        }
        for (id, ttl) in &self.cache.provider_ttl_s {
            if *ttl == 0 {
                return Err(Error::InvalidConfig(format!(
                    "cache.provider_ttl_s.{id} must be positive"
                )));
            }
        }
        for (id, cap) in &self.router.daily_caps {
            if *cap == 0 {
                return Err(Error::InvalidConfig(format!(
                    "router.daily_caps.{id} must be positive"
                )));
            }
        }
        if self.router.ai_daily_cap == 0 {
            return Err(Error::InvalidConfig(
                "router.ai_daily_cap must be positive".to_string(),
            ));
        }
        if self.breaker.failure_threshold == 0 {
            return Err(Error::InvalidConfig(
                "breaker.failure_threshold must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_config_uses_defaults_and_validates() {
        let cfg: Config = serde_json::from_str("{}").unwrap();
        assert!(cfg.cache.enabled);
        assert_eq!(cfg.cache.max_entries, 256);
        assert_eq!(cfg.breaker.failure_threshold, 3);
        assert_eq!(cfg.router.daily_caps.get("brave"), Some(&2_000));
        assert!(cfg.router.privacy_guard);
        cfg.validate().unwrap();
    }

    #[test]
    fn preset_orders_are_two_providers_per_tier() {
        let mut router = RouterConfig::default();
        router.preset = Preset::Free;
        assert_eq!(router.base_order(Tier::Basic), vec!["searxng", "brave"]);
        assert_eq!(router.base_order(Tier::Ai), vec!["tavily", "perplexity"]);
        router.preset = Preset::Quality;
        assert_eq!(router.base_order(Tier::Basic), vec!["brave", "searxng"]);
        assert_eq!(router.base_order(Tier::Ai), vec!["perplexity", "tavily"]);
    }

    #[test]
    fn custom_preset_reads_configured_priority() {
        let mut router = RouterConfig::default();
        router.preset = Preset::Custom;
        router.basic_priority = vec!["brave".to_string()];
        assert_eq!(router.base_order(Tier::Basic), vec!["brave"]);
        assert!(router.base_order(Tier::Ai).is_empty());
    }

    #[test]
    fn validate_rejects_unknown_and_duplicate_priority_entries() {
        let mut cfg = Config::default();
        cfg.router.basic_priority = vec!["brave".to_string(), "altavista".to_string()];
        assert!(cfg.validate().is_err());

        let mut cfg = Config::default();
        cfg.router.ai_priority = vec!["tavily".to_string(), "tavily".to_string()];
        assert!(cfg.validate().is_err());

        // ai providers do not belong in the basic list.
        let mut cfg = Config::default();
        cfg.router.basic_priority = vec!["perplexity".to_string()];
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn validate_rejects_non_positive_ttls_and_caps() {
        let mut cfg = Config::default();
        cfg.cache.basic_ttl_s = 0;
        assert!(cfg.validate().is_err());

        let mut cfg = Config::default();
        cfg.router.daily_caps.insert("brave".to_string(), 0);
        assert!(cfg.validate().is_err());

        let mut cfg = Config::default();
        cfg.cache.max_entries = 0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn ttl_lookup_prefers_provider_override() {
        let mut cache = CacheConfig::default();
        cache.provider_ttl_s.insert("brave".to_string(), 60);
        assert_eq!(cache.ttl_for(Tier::Basic, "brave"), 60);
        assert_eq!(cache.ttl_for(Tier::Basic, "searxng"), cache.basic_ttl_s);
        assert_eq!(cache.ttl_for(Tier::Ai, "perplexity"), cache.ai_ttl_s);
    }

    #[test]
    fn configured_check_ignores_blank_credentials() {
        let mut providers = ProvidersConfig::default();
        providers.brave.api_key = Some("   ".to_string());
        assert!(!providers.is_configured("brave"));
        providers.brave.api_key = Some("k".to_string());
        assert!(providers.is_configured("brave"));
        providers.searxng.endpoint = Some("http://localhost:8080".to_string());
        assert!(providers.is_configured("searxng"));
        assert!(!providers.is_configured("altavista"));
    }
}
