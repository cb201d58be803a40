//! The routing engine: candidate selection, ordered fallback with breaker
//! and budget gates, cache write-through, and the automatic basic-to-ai
//! escalation policy.

use crate::breaker::BreakerRegistry;
use crate::cache::TtlCache;
use crate::clock::{day_key, Clock, SystemClock};
use crate::config::Config;
use crate::{normalize, privacy};
use crate::{
    AnswerSearchInput, AnswerSearchProvider, BasicSearchInput, BasicSearchProvider, Envelope,
    Error, Mode, Result, SearchPayload, SearchRequest, Tier, TraceEvent,
};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

const CACHE_KEY_SEP: &str = "|";
const DEFAULT_MAX_RESULTS: usize = 10;

/// Per-day call counts; reset in place when the observed day key changes.
#[derive(Debug, Clone, Default)]
struct DailyCounters {
    day: u64,
    per_provider: BTreeMap<String, u32>,
    ai_calls: u32,
}

impl DailyCounters {
    fn roll(&mut self, today: u64) {
        if self.day != today {
            self.day = today;
            self.per_provider.clear();
            self.ai_calls = 0;
        }
    }
}

/// One router instance serves many concurrent requests. The mutable shared
/// state (cache, breakers, counters) sits behind per-structure mutexes with
/// short critical sections; no guard is held across an adapter call.
pub struct Router {
    config: Config,
    basic: BTreeMap<String, Arc<dyn BasicSearchProvider>>,
    ai: BTreeMap<String, Arc<dyn AnswerSearchProvider>>,
    cache: Mutex<TtlCache<Envelope>>,
    breakers: Mutex<BreakerRegistry>,
    counters: Mutex<DailyCounters>,
    clock: Arc<dyn Clock>,
}

impl Router {
    pub fn new(
        config: Config,
        basic: BTreeMap<String, Arc<dyn BasicSearchProvider>>,
        ai: BTreeMap<String, Arc<dyn AnswerSearchProvider>>,
    ) -> Self {
        Self::with_clock(config, basic, ai, Arc::new(SystemClock))
    }

    pub fn with_clock(
        config: Config,
        basic: BTreeMap<String, Arc<dyn BasicSearchProvider>>,
        ai: BTreeMap<String, Arc<dyn AnswerSearchProvider>>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let cache = Mutex::new(TtlCache::new(config.cache.max_entries, clock.clone()));
        let breakers = Mutex::new(BreakerRegistry::new(
            config.breaker.failure_threshold,
            config.breaker.cooldown_ms,
            clock.clone(),
        ));
        Self {
            config,
            basic,
            ai,
            cache,
            breakers,
            counters: Mutex::new(DailyCounters::default()),
            clock,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Execute one search. Mode comes from the request override, else the
    /// configured default. The trace is always accumulated and cleared at
    /// this boundary unless the request asked for debug output.
    pub async fn execute(&self, req: &SearchRequest) -> Result<Envelope> {
        if req.query.trim().is_empty() {
            return Err(Error::InvalidRequest("query must be non-empty".to_string()));
        }
        let mode = req.mode.unwrap_or(self.config.router.default_mode);
        let over = req
            .provider
            .as_deref()
            .map(|s| s.trim().to_ascii_lowercase())
            .filter(|s| !s.is_empty());
        let mut trace = Vec::new();
        let mut env = match mode {
            Mode::Basic => {
                self.run_tier(Tier::Basic, req, over.as_deref(), &mut trace)
                    .await?
            }
            Mode::Ai => {
                self.run_tier(Tier::Ai, req, over.as_deref(), &mut trace)
                    .await?
            }
            Mode::Auto => self.run_auto(req, over.as_deref(), &mut trace).await?,
        };
        env.trace = if req.debug { trace } else { Vec::new() };
        Ok(env)
    }

    fn push(&self, trace: &mut Vec<TraceEvent>, event: &str, detail: Option<serde_json::Value>) {
        trace.push(TraceEvent {
            at_epoch_ms: self.clock.now_ms(),
            event: event.to_string(),
            detail,
        });
    }

    fn is_registered(&self, tier: Tier, id: &str) -> bool {
        match tier {
            Tier::Basic => self.basic.contains_key(id),
            Tier::Ai => self.ai.contains_key(id),
        }
    }

    /// Candidate list for a tier: a single explicitly named provider, or the
    /// preset order filtered to registered providers.
    fn candidates(&self, tier: Tier, override_id: Option<&str>) -> Result<Vec<String>> {
        if let Some(p) = override_id {
            if !tier.known_providers().contains(&p) {
                let other = match tier {
                    Tier::Basic => Tier::Ai,
                    Tier::Ai => Tier::Basic,
                };
                if other.known_providers().contains(&p) {
                    return Err(Error::InvalidRequest(format!(
                        "provider {p} is not a {tier} provider"
                    )));
                }
                return Err(Error::InvalidRequest(format!("unknown provider: {p}")));
            }
            if !self.is_registered(tier, p) {
                return Err(Error::NotConfigured(format!(
                    "provider {p} is not configured"
                )));
            }
            return Ok(vec![p.to_string()]);
        }
        let out: Vec<String> = self
            .config
            .router
            .base_order(tier)
            .into_iter()
            .filter(|id| self.is_registered(tier, id))
            .collect();
        if out.is_empty() {
            return Err(Error::NotConfigured(format!(
                "no provider configured for {tier} tier"
            )));
        }
        Ok(out)
    }

    fn cache_key(&self, tier: Tier, provider: &str, req: &SearchRequest, max_results: usize) -> String {
        let query = req.query.trim().to_lowercase();
        let count = max_results.to_string();
        [
            tier.as_str(),
            provider,
            query.as_str(),
            req.language.as_deref().unwrap_or(""),
            req.region.as_deref().unwrap_or(""),
            req.freshness.as_deref().unwrap_or(""),
            req.category.as_deref().unwrap_or(""),
            count.as_str(),
        ]
        .join(CACHE_KEY_SEP)
    }

    fn timeout_for(&self, provider: &str) -> u64 {
        self.config
            .providers
            .get(provider)
            .map(|p| p.timeout_ms)
            .unwrap_or(20_000)
            .clamp(1_000, 60_000)
    }

    fn cap_reached(&self, provider: &str) -> Option<u32> {
        let cap = *self.config.router.daily_caps.get(provider)?;
        let today = day_key(self.clock.now_ms());
        let mut c = self.counters_lock();
        c.roll(today);
        let used = c.per_provider.get(provider).copied().unwrap_or(0);
        (used >= cap).then_some(cap)
    }

    fn count_success(&self, tier: Tier, provider: &str) {
        let today = day_key(self.clock.now_ms());
        let mut c = self.counters_lock();
        c.roll(today);
        if self.config.router.daily_caps.contains_key(provider) {
            *c.per_provider.entry(provider.to_string()).or_insert(0) += 1;
        }
        if tier == Tier::Ai {
            c.ai_calls += 1;
        }
    }

    /// Ordered fallback over the tier's candidates.
    async fn run_tier(
        &self,
        tier: Tier,
        req: &SearchRequest,
        override_id: Option<&str>,
        trace: &mut Vec<TraceEvent>,
    ) -> Result<Envelope> {
        let list = self.candidates(tier, override_id)?;
        let max_results = normalize::clamp_result_count(req.max_results, DEFAULT_MAX_RESULTS);

        if tier == Tier::Ai {
            let today = day_key(self.clock.now_ms());
            let cap = self.config.router.ai_daily_cap;
            let mut c = self.counters_lock();
            c.roll(today);
            if c.ai_calls >= cap {
                return Err(Error::Budget(format!("ai tier daily cap reached ({cap})")));
            }
        }

        let mut last_error: Option<String> = None;
        for id in &list {
            if !self.breakers_lock().is_available(id) {
                self.push(
                    trace,
                    "breaker_open_skip",
                    Some(serde_json::json!({ "provider": id })),
                );
                continue;
            }
            if let Some(cap) = self.cap_reached(id) {
                self.push(
                    trace,
                    "daily_cap_skip",
                    Some(serde_json::json!({ "provider": id, "cap": cap })),
                );
                continue;
            }

            let key = self.cache_key(tier, id, req, max_results);
            if self.config.cache.enabled {
                if let Some(hit) = self.cache_lock().get(&key) {
                    self.push(
                        trace,
                        "cache_hit",
                        Some(serde_json::json!({ "provider": id })),
                    );
                    return Ok(hit);
                }
            }

            match self.attempt(tier, id, req, max_results).await {
                Ok(payload) => {
                    self.count_success(tier, id);
                    self.breakers_lock().record_success(id);
                    self.push(
                        trace,
                        "provider_ok",
                        Some(serde_json::json!({ "provider": id })),
                    );
                    let env = Envelope {
                        tier,
                        provider: id.clone(),
                        query: req.query.clone(),
                        payload,
                        trace: Vec::new(),
                    };
                    if self.config.cache.enabled {
                        let ttl = self.config.cache.ttl_for(tier, id);
                        self.cache_lock().set(&key, env.clone(), ttl);
                    }
                    return Ok(env);
                }
                Err(e) => {
                    let msg = e.to_string();
                    self.breakers_lock().record_failure(id);
                    tracing::debug!(provider = %id, error = %msg, "provider attempt failed");
                    self.push(
                        trace,
                        "provider_failed",
                        Some(serde_json::json!({ "provider": id, "error": msg })),
                    );
                    last_error = Some(msg);
                }
            }
        }
        Err(Error::Exhausted {
            tier,
            message: last_error.unwrap_or_else(|| "no provider attempted".to_string()),
        })
    }

    async fn attempt(
        &self,
        tier: Tier,
        id: &str,
        req: &SearchRequest,
        max_results: usize,
    ) -> Result<SearchPayload> {
        match tier {
            Tier::Basic => {
                let p = self
                    .basic
                    .get(id)
                    .ok_or_else(|| Error::NotConfigured(format!("provider {id} is not configured")))?;
                let input = BasicSearchInput {
                    query: req.query.clone(),
                    max_results,
                    language: req.language.clone(),
                    region: req.region.clone(),
                    freshness: req.freshness.clone(),
                    category: req.category.clone(),
                    safesearch: req.safesearch.clone(),
                    timeout_ms: self.timeout_for(id),
                };
                let results = p.search(&input).await?;
                Ok(SearchPayload::Results {
                    results: normalize::dedupe(results),
                })
            }
            Tier::Ai => {
                let p = self
                    .ai
                    .get(id)
                    .ok_or_else(|| Error::NotConfigured(format!("provider {id} is not configured")))?;
                let input = AnswerSearchInput {
                    query: req.query.clone(),
                    max_results,
                    language: req.language.clone(),
                    region: req.region.clone(),
                    timeout_ms: self.timeout_for(id),
                };
                let mut answer = p.answer(&input).await?;
                answer.results = normalize::dedupe(answer.results);
                Ok(SearchPayload::Answer { answer })
            }
        }
    }

    /// Basic first; escalate to ai only when the basic answer looks thin or
    /// the query signals analytic intent, and never for privacy-sensitive
    /// queries. Escalation failure degrades back to the basic envelope.
    async fn run_auto(
        &self,
        req: &SearchRequest,
        over: Option<&str>,
        trace: &mut Vec<TraceEvent>,
    ) -> Result<Envelope> {
        let (basic_over, ai_over) = match over {
            Some(p) if Tier::Basic.known_providers().contains(&p) => (Some(p), None),
            Some(p) if Tier::Ai.known_providers().contains(&p) => (None, Some(p)),
            Some(p) => return Err(Error::InvalidRequest(format!("unknown provider: {p}"))),
            None => (None, None),
        };

        let basic_env = self.run_tier(Tier::Basic, req, basic_over, trace).await?;

        let insufficient =
            basic_env.payload.result_count() < self.config.router.escalation_min_results;
        let query = req.query.to_lowercase();
        let keyword = self
            .config
            .router
            .escalation_keywords
            .iter()
            .any(|k| !k.is_empty() && query.contains(&k.to_lowercase()));
        if !insufficient && !keyword {
            return Ok(basic_env);
        }

        if self.config.router.privacy_guard && privacy::looks_sensitive(&req.query) {
            self.push(trace, "escalation_blocked_privacy", None);
            return Ok(basic_env);
        }

        self.push(
            trace,
            "escalation_triggered",
            Some(serde_json::json!({ "insufficient": insufficient, "keyword": keyword })),
        );
        match self.run_tier(Tier::Ai, req, ai_over, trace).await {
            Ok(env) => Ok(env),
            Err(e) => {
                tracing::debug!(error = %e, "escalation failed; keeping basic result");
                self.push(
                    trace,
                    "escalation_failed",
                    Some(serde_json::json!({ "error": e.to_string() })),
                );
                Ok(basic_env)
            }
        }
    }

    fn cache_lock(&self) -> std::sync::MutexGuard<'_, TtlCache<Envelope>> {
        self.cache.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn breakers_lock(&self) -> std::sync::MutexGuard<'_, BreakerRegistry> {
        self.breakers.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn counters_lock(&self) -> std::sync::MutexGuard<'_, DailyCounters> {
        self.counters.lock().unwrap_or_else(|e| e.into_inner())
    }
}
