//! Configuration loading for the searchmux binary.
//!
//! Precedence: a file named by `SEARCHMUX_CONFIG`, else the per-user config
//! file (`<config dir>/searchmux/config.toml`), else defaults; environment
//! overrides apply on top in all cases.

use anyhow::{Context, Result};
use searchmux_core::config::Config;
use std::path::PathBuf;

pub fn load() -> Result<Config> {
    let mut config = match config_path() {
        Some(p) if p.exists() => {
            let text = std::fs::read_to_string(&p)
                .with_context(|| format!("read config {}", p.display()))?;
            toml::from_str(&text).with_context(|| format!("parse config {}", p.display()))?
        }
        _ => Config::default(),
    };
    apply_env_overrides(&mut config);
    Ok(config)
}

fn config_path() -> Option<PathBuf> {
    if let Ok(p) = std::env::var("SEARCHMUX_CONFIG") {
        let p = p.trim();
        if !p.is_empty() {
            return Some(PathBuf::from(p));
        }
    }
    dirs::config_dir().map(|d| d.join("searchmux").join("config.toml"))
}

fn env_value(primary: &str, fallback: Option<&str>) -> Option<String> {
    let read = |k: &str| {
        std::env::var(k)
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    };
    read(primary).or_else(|| fallback.and_then(read))
}

pub fn apply_env_overrides(config: &mut Config) {
    if let Some(v) = env_value("SEARCHMUX_BRAVE_API_KEY", Some("BRAVE_SEARCH_API_KEY")) {
        config.providers.brave.api_key = Some(v);
    }
    if let Some(v) = env_value("SEARCHMUX_SEARXNG_ENDPOINT", None) {
        config.providers.searxng.endpoint = Some(v);
    }
    if let Some(v) = env_value("SEARCHMUX_PERPLEXITY_API_KEY", Some("PERPLEXITY_API_KEY")) {
        config.providers.perplexity.api_key = Some(v);
    }
    if let Some(v) = env_value("SEARCHMUX_TAVILY_API_KEY", Some("TAVILY_API_KEY")) {
        config.providers.tavily.api_key = Some(v);
    }
    if let Some(v) = env_value("SEARCHMUX_PRESET", None) {
        match v.parse() {
            Ok(p) => config.router.preset = p,
            Err(e) => tracing::warn!(value = %v, error = %e, "ignoring SEARCHMUX_PRESET"),
        }
    }
    if let Some(v) = env_value("SEARCHMUX_MODE", None) {
        match v.parse() {
            Ok(m) => config.router.default_mode = m,
            Err(e) => tracing::warn!(value = %v, error = %e, "ignoring SEARCHMUX_MODE"),
        }
    }
}
