//! Sensitive-query heuristic for the automatic-mode privacy guard.
//!
//! Matching queries are kept on the basic tier: they are not forwarded to
//! answer-synthesis providers. The checks are deliberately cheap and
//! conservative: credential words, email shapes, phone-number-like digit
//! groups, and credential-shaped tokens.

const SENSITIVE_WORDS: &[&str] = &["password", "secret", "token", "apikey", "api key", "api_key"];

pub fn looks_sensitive(query: &str) -> bool {
    let q = query.to_lowercase();
    SENSITIVE_WORDS.iter().any(|w| q.contains(w))
        || contains_email(&q)
        || contains_long_digit_group(&q)
        || contains_credential_shaped_token(query)
}

fn contains_email(q: &str) -> bool {
    let bytes = q.as_bytes();
    for (i, &b) in bytes.iter().enumerate() {
        if b != b'@' || i == 0 {
            continue;
        }
        let before = bytes[i - 1];
        if !(before.is_ascii_alphanumeric() || matches!(before, b'.' | b'_' | b'-' | b'+')) {
            continue;
        }
        let rest = &q[i + 1..];
        let end = rest
            .find(|c: char| !(c.is_ascii_alphanumeric() || c == '.' || c == '-'))
            .unwrap_or(rest.len());
        let domain = &rest[..end];
        if domain.len() >= 3
            && domain.contains('.')
            && !domain.starts_with('.')
            && !domain.ends_with('.')
        {
            return true;
        }
    }
    false
}

/// Seven or more digits in one separator-joined run.
fn contains_long_digit_group(q: &str) -> bool {
    let mut digits = 0usize;
    for c in q.chars() {
        if c.is_ascii_digit() {
            digits += 1;
            if digits >= 7 {
                return true;
            }
        } else if !matches!(c, ' ' | '-' | '(' | ')' | '+' | '.') {
            digits = 0;
        }
    }
    false
}

/// A long mixed letter/digit token, e.g. a pasted API key.
fn contains_credential_shaped_token(q: &str) -> bool {
    for tok in q.split_whitespace() {
        let t = tok.trim_matches(|c: char| !(c.is_ascii_alphanumeric() || c == '_' || c == '-'));
        if t.len() >= 20
            && t.chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
            && t.chars().any(|c| c.is_ascii_digit())
            && t.chars().any(|c| c.is_ascii_alphabetic())
        {
            return true;
        }
    }
    false
}
