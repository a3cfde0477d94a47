//! Diff scanner that flags likely secrets before commit
//!
//! Only added lines of a unified diff are inspected. A line containing
//! `pragma: allowlist secret` is skipped.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

/// Marker that exempts a line from scanning
pub const ALLOWLIST_TOKEN: &str = "pragma: allowlist secret";

/// Rule name reported for entropy-based findings
pub const HIGH_ENTROPY_RULE: &str = "High entropy string";

/// Default minimum Shannon entropy in bits per character
pub const DEFAULT_ENTROPY_THRESHOLD: f64 = 4.0;

/// Default minimum candidate length for entropy checks
pub const DEFAULT_MIN_LENGTH: usize = 32;

/// Named patterns, checked in order; the first match wins
static PATTERNS: LazyLock<Vec<(&'static str, Regex)>> = LazyLock::new(|| {
    [
        ("AWS access key", r"AKIA[0-9A-Z]{16}"),
        ("AWS session key", r"ASIA[0-9A-Z]{16}"),
        ("GitHub token", r"ghp_[A-Za-z0-9]{36}"),
        ("GitLab token", r"glpat-[A-Za-z0-9\-_]{20,}"),
        ("Slack token", r"xox[baprs]-[A-Za-z0-9\-]{10,}"),
        ("Stripe secret key", r"sk_(live|test)_[A-Za-z0-9]{24,}"),
        ("Google API key", r"AIza[0-9A-Za-z\-_]{35}"),
        ("OpenAI key", r"sk-[A-Za-z0-9]{20,}"),
        ("Private key block", r"-----BEGIN [A-Z ]+-----"),
        (
            "Generic secret assignment",
            r#"(?i)(?:api[_-]?key|secret|token|password)\s*[:=]\s*["']?[A-Za-z0-9\-_/+=]{12,}"#,
        ),
    ]
    .into_iter()
    .map(|(rule, pattern)| (rule, Regex::new(pattern).expect("valid regex")))
    .collect()
});

static HIGH_ENTROPY_CANDIDATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[A-Za-z0-9+/=_\-]{20,}").expect("valid regex"));

/// A suspicious added line
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Finding {
    /// 1-based line number within the diff
    pub line_no: usize,
    /// Name of the rule that fired
    pub rule: String,
    /// Matched text
    pub value: String,
    /// The added line, trimmed
    pub line: String,
}

/// Scanner thresholds
#[derive(Debug, Clone, Copy)]
pub struct ScanOptions {
    pub entropy_threshold: f64,
    pub min_length: usize,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            entropy_threshold: DEFAULT_ENTROPY_THRESHOLD,
            min_length: DEFAULT_MIN_LENGTH,
        }
    }
}

/// Shannon entropy of `value` in bits per character
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn shannon_entropy(value: &str) -> f64 {
    let mut counts: HashMap<char, usize> = HashMap::new();
    let mut length = 0usize;
    for ch in value.chars() {
        *counts.entry(ch).or_default() += 1;
        length += 1;
    }
    if length == 0 {
        return 0.0;
    }

    let length = length as f64;
    counts
        .values()
        .map(|&count| {
            let probability = count as f64 / length;
            -probability * probability.log2()
        })
        .sum()
}

fn high_entropy_value<'a>(line: &'a str, options: &ScanOptions) -> Option<&'a str> {
    HIGH_ENTROPY_CANDIDATE
        .find_iter(line)
        .map(|m| m.as_str())
        .filter(|value| value.chars().count() >= options.min_length)
        .find(|value| shannon_entropy(value) >= options.entropy_threshold)
}

/// Scan the added lines of a unified diff
#[must_use]
pub fn scan_diff(diff: &str, options: &ScanOptions) -> Vec<Finding> {
    let mut findings = Vec::new();

    for (index, raw_line) in diff.lines().enumerate() {
        let Some(line) = raw_line.strip_prefix('+') else {
            continue;
        };
        if raw_line.starts_with("+++") || line.contains(ALLOWLIST_TOKEN) {
            continue;
        }

        let named = PATTERNS
            .iter()
            .find_map(|(rule, pattern)| pattern.find(line).map(|m| (*rule, m.as_str())));
        let hit = named.or_else(|| high_entropy_value(line, options).map(|v| (HIGH_ENTROPY_RULE, v)));

        if let Some((rule, value)) = hit {
            tracing::debug!(line_no = index + 1, rule, "potential secret");
            findings.push(Finding {
                line_no: index + 1,
                rule: rule.to_string(),
                value: value.to_string(),
                line: line.trim().to_string(),
            });
        }
    }

    findings
}
