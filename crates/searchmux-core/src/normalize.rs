//! Result-count clamping, URL canonicalization, and duplicate removal.

use crate::BasicResult;
use std::collections::BTreeSet;
use url::Url;

/// Query parameters stripped during canonicalization.
const TRACKING_PARAMS: &[&str] = &[
    "utm_source",
    "utm_medium",
    "utm_campaign",
    "utm_term",
    "utm_content",
    "ref",
];

/// Clamp a requested result count into 1..=20, falling back when absent.
pub fn clamp_result_count(requested: Option<i64>, fallback: usize) -> usize {
    match requested {
        Some(n) => n.clamp(1, 20) as usize,
        None => fallback,
    }
}

/// Strip tracking parameters and re-serialize. Unparseable input is returned
/// unchanged. Idempotent.
pub fn canonicalize_url(raw: &str) -> String {
    let Ok(mut u) = Url::parse(raw) else {
        return raw.to_string();
    };
    let kept: Vec<(String, String)> = u
        .query_pairs()
        .filter(|(k, _)| !TRACKING_PARAMS.contains(&k.as_ref()))
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    if kept.is_empty() {
        u.set_query(None);
    } else {
        let mut pairs = u.query_pairs_mut();
        pairs.clear();
        for (k, v) in &kept {
            pairs.append_pair(k, v);
        }
        drop(pairs);
    }
    u.to_string()
}

/// Keep the first occurrence of each canonical URL, in original order; kept
/// results carry the canonical URL.
pub fn dedupe(results: Vec<BasicResult>) -> Vec<BasicResult> {
    let mut seen = BTreeSet::new();
    let mut out = Vec::with_capacity(results.len());
    for mut r in results {
        let canonical = canonicalize_url(&r.url);
        if seen.insert(canonical.clone()) {
            r.url = canonical;
            out.push(r);
        }
    }
    out
}
