//! LLM endpoint registry parsed from `llms.txt`
//!
//! Endpoints are listed as Markdown links under an `## LLM Endpoints`
//! heading:
//!
//! ```text
//! ## LLM Endpoints
//! - [token.place](https://github.com/futuroptimist/token.place)
//! - [OpenRouter](https://openrouter.ai/)
//! ```

use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use crate::config::expand_path;
use crate::{Error, Result};

/// Environment variable naming the preferred endpoint
pub const DEFAULT_LLM_ENV: &str = "SIGMA_DEFAULT_LLM";

/// Registry shipped with the binary, used when no path is given
const BUNDLED_LLMS: &str = include_str!("../llms.txt");

/// Section title that holds endpoint entries
const SECTION_TITLE: &str = "llm endpoints";

static HEADING_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(#+)\s*(.*?)\s*#*\s*$").expect("valid regex"));

/// A named LLM endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Endpoint {
    /// Display name as written in the registry
    pub name: String,
    /// HTTP(S) URL, trimmed
    pub url: String,
}

impl Endpoint {
    /// Create an endpoint from a name and URL
    #[must_use]
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
        }
    }
}

/// Parse a `[text](url)` link, allowing balanced parentheses in the URL
fn parse_markdown_link(text: &str) -> Option<(&str, &str)> {
    let open = text.find('[')?;
    let close = open + 1 + text[open + 1..].find(']')?;
    let name = &text[open + 1..close];

    let rest = text[close + 1..].trim_start();
    let rest = rest.strip_prefix('(')?;

    let mut depth = 1usize;
    for (index, ch) in rest.char_indices() {
        match ch {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    return Some((name, &rest[..index]));
                }
            }
            _ => {}
        }
    }
    None
}

/// Strip trailing `#`/`:` markers and collapse whitespace
fn normalize_heading_title(raw: &str) -> String {
    let mut title = raw.trim();
    while let Some(stripped) = title.strip_suffix(['#', ':']) {
        title = stripped.trim_end();
    }
    title.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn is_http_url(url: &str) -> bool {
    let lowered = url.to_lowercase();
    lowered.starts_with("http://") || lowered.starts_with("https://")
}

/// Parse endpoint entries from registry Markdown
#[must_use]
pub fn parse_endpoints(content: &str) -> Vec<Endpoint> {
    let mut endpoints = Vec::new();
    let mut in_section = false;
    let mut section_has_entry = false;

    for line in content.lines() {
        let stripped = line.trim();

        // Top-level headings only end a section that already has entries
        if stripped.starts_with('#') && !stripped.starts_with("##") {
            if in_section && section_has_entry {
                in_section = false;
                section_has_entry = false;
            }
            continue;
        }

        if let Some(caps) = HEADING_REGEX.captures(stripped) {
            if caps[1].len() <= 2 {
                in_section = normalize_heading_title(&caps[2]).to_lowercase() == SECTION_TITLE;
                section_has_entry = false;
            }
            continue;
        }

        if !in_section {
            continue;
        }

        let Some(content) = stripped.strip_prefix(['-', '*', '+']) else {
            continue;
        };
        let Some((name, url)) = parse_markdown_link(content.trim_start()) else {
            continue;
        };

        let url = url.trim();
        if url.is_empty() || !is_http_url(url) {
            continue;
        }

        endpoints.push(Endpoint::new(name, url));
        section_has_entry = true;
    }

    endpoints
}

/// Return the endpoints listed in a registry file
///
/// `None` reads the bundled registry. Paths expand `~` and `$VAR`. A missing
/// file yields an empty list.
///
/// # Errors
///
/// Returns error if the file exists but cannot be read
pub fn get_llm_endpoints(path: Option<&Path>) -> Result<Vec<Endpoint>> {
    let Some(path) = path else {
        return Ok(parse_endpoints(BUNDLED_LLMS));
    };

    let path = expand_path(&path.to_string_lossy());
    match std::fs::read_to_string(&path) {
        Ok(content) => {
            let endpoints = parse_endpoints(&content);
            tracing::debug!(path = %path.display(), count = endpoints.len(), "loaded llm registry");
            Ok(endpoints)
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!(path = %path.display(), "llm registry not found");
            Ok(Vec::new())
        }
        Err(e) => Err(e.into()),
    }
}

fn format_available(endpoints: &[Endpoint]) -> String {
    endpoints
        .iter()
        .map(|e| e.name.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Case-insensitive lookup; later entries shadow earlier ones
fn lookup<'a>(endpoints: &'a [Endpoint], name: &str) -> Option<&'a Endpoint> {
    let key = name.to_lowercase();
    endpoints.iter().rfind(|e| e.name.to_lowercase() == key)
}

/// Pick one endpoint from a parsed list
///
/// Preference order: explicit `name`, then `env_default` (the value of
/// `SIGMA_DEFAULT_LLM`), then the first entry.
///
/// # Errors
///
/// Returns error if the list is empty, the name is blank, or a requested
/// name does not match any entry
pub fn resolve_from(
    endpoints: &[Endpoint],
    name: Option<&str>,
    env_default: Option<&str>,
) -> Result<Endpoint> {
    let Some(first) = endpoints.first() else {
        return Err(Error::Registry(
            "llms.txt does not define any LLM endpoints".to_string(),
        ));
    };

    if let Some(name) = name {
        let normalized = name.trim();
        if normalized.is_empty() {
            return Err(Error::InvalidInput(
                "Endpoint name must be a non-empty string".to_string(),
            ));
        }
        if let Some(endpoint) = lookup(endpoints, normalized) {
            return Ok(endpoint.clone());
        }

        let detail = if normalized == name {
            format!("Unknown LLM endpoint '{name}'.")
        } else {
            format!("Unknown LLM endpoint '{name}' (normalized to '{normalized}').")
        };
        return Err(Error::Registry(format!(
            "{detail} Available endpoints: {}",
            format_available(endpoints)
        )));
    }

    if let Some(raw) = env_default {
        let normalized = raw.trim();
        if normalized.is_empty() {
            return Err(Error::Config(format!(
                "Environment variable {DEFAULT_LLM_ENV} is set but empty."
            )));
        }
        return lookup(endpoints, normalized).cloned().ok_or_else(|| {
            Error::Config(format!(
                "Environment variable {DEFAULT_LLM_ENV} is set to '{raw}' (normalized to \
                 '{normalized}'), but no matching endpoint was found. Available endpoints: {}",
                format_available(endpoints)
            ))
        });
    }

    Ok(first.clone())
}

/// Resolve a single endpoint from a registry file
///
/// Honours `SIGMA_DEFAULT_LLM` when no explicit name is given.
///
/// # Errors
///
/// Returns error if the registry cannot be read or no endpoint matches
pub fn resolve_llm_endpoint(name: Option<&str>, path: Option<&Path>) -> Result<Endpoint> {
    let endpoints = get_llm_endpoints(path)?;
    let env_default = std::env::var(DEFAULT_LLM_ENV).ok();
    resolve_from(&endpoints, name, env_default.as_deref())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_link_with_nested_parens() {
        let link = parse_markdown_link("[Wiki](https://example.com/a_(b)) trailing");
        assert_eq!(link, Some(("Wiki", "https://example.com/a_(b)")));
    }

    #[test]
    fn test_parse_link_allows_space_before_url() {
        assert_eq!(
            parse_markdown_link("[A] (https://a.example)"),
            Some(("A", "https://a.example"))
        );
    }

    #[test]
    fn test_parse_link_unbalanced() {
        assert_eq!(parse_markdown_link("[A](https://a.example"), None);
        assert_eq!(parse_markdown_link("no link"), None);
    }

    #[test]
    fn test_normalize_heading_title() {
        assert_eq!(normalize_heading_title("  LLM   Endpoints ##"), "LLM Endpoints");
        assert_eq!(normalize_heading_title("LLM Endpoints:"), "LLM Endpoints");
    }

    #[test]
    fn test_bundled_registry() {
        let endpoints = get_llm_endpoints(None).unwrap();
        assert!(endpoints.iter().any(|e| e.name == "token.place"));
        assert!(endpoints
            .iter()
            .any(|e| e.name == "OpenRouter" && e.url == "https://openrouter.ai/"));
        assert!(!endpoints.iter().any(|e| e.name == "GitHub repo"));
    }

    #[test]
    fn test_bullets_and_spacing() {
        for bullet in ["-", "*", "+", "  -", "-   ", "-"] {
            let content = format!("## LLM Endpoints\n{bullet}[Example](https://example.com)");
            assert_eq!(
                parse_endpoints(&content),
                vec![Endpoint::new("Example", "https://example.com")],
                "bullet {bullet:?}"
            );
        }
    }

    #[test]
    fn test_heading_variants() {
        for heading in ["## llm endpoints", "## LLM Endpoints ##", "##LLM Endpoints:"] {
            let content = format!("{heading}\n- [Example](https://example.com)");
            assert_eq!(parse_endpoints(&content).len(), 1, "heading {heading:?}");
        }
    }

    #[test]
    fn test_rejects_non_http_urls() {
        let content = "## LLM Endpoints\n- [Ws](ws://example.com)\n- [Up](HTTPS://example.com)\n- [Blank](   )";
        assert_eq!(
            parse_endpoints(content),
            vec![Endpoint::new("Up", "HTTPS://example.com")]
        );
    }

    #[test]
    fn test_trims_url_whitespace() {
        let content = "## LLM Endpoints\n- [Local](   http://127.0.0.1:8000   )";
        assert_eq!(parse_endpoints(content)[0].url, "http://127.0.0.1:8000");
    }

    #[test]
    fn test_stops_at_top_level_heading() {
        let content = "# Title\n## LLM Endpoints\n# Comment about the list\n- [Example](https://example.com)\n# Another Section\n- [Ignored](https://ignored.example.com)\n";
        assert_eq!(
            parse_endpoints(content),
            vec![Endpoint::new("Example", "https://example.com")]
        );
    }

    #[test]
    fn test_top_level_heading_never_opens_section() {
        let content = "# LLM Endpoints\n- [A](https://a.example)\n";
        assert!(parse_endpoints(content).is_empty());
    }

    #[test]
    fn test_other_section_closes() {
        let content = "## LLM Endpoints\n- [A](https://a.example)\n## Optional\n- [B](https://b.example)\n### Nested\n";
        assert_eq!(parse_endpoints(content).len(), 1);
    }

    fn sample() -> Vec<Endpoint> {
        vec![
            Endpoint::new("Alpha", "https://alpha.example.com"),
            Endpoint::new("Beta", "https://beta.example.com"),
        ]
    }

    #[test]
    fn test_resolve_defaults_to_first() {
        assert_eq!(resolve_from(&sample(), None, None).unwrap().name, "Alpha");
    }

    #[test]
    fn test_resolve_explicit_name_case_insensitive() {
        let endpoint = resolve_from(&sample(), Some("  beta "), None).unwrap();
        assert_eq!(endpoint, Endpoint::new("Beta", "https://beta.example.com"));
    }

    #[test]
    fn test_resolve_explicit_name_beats_env() {
        let endpoint = resolve_from(&sample(), Some("alpha"), Some("beta")).unwrap();
        assert_eq!(endpoint.name, "Alpha");
    }

    #[test]
    fn test_resolve_env_default() {
        assert_eq!(resolve_from(&sample(), None, Some("BETA")).unwrap().name, "Beta");
    }

    #[test]
    fn test_resolve_unknown_name() {
        let err = resolve_from(&sample(), Some("gamma"), None).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("Unknown LLM endpoint 'gamma'."));
        assert!(message.contains("Available endpoints: Alpha, Beta"));
    }

    #[test]
    fn test_resolve_unknown_name_mentions_normalization() {
        let err = resolve_from(&sample(), Some(" gamma "), None).unwrap_err();
        assert!(err.to_string().contains("(normalized to 'gamma')"));
    }

    #[test]
    fn test_resolve_blank_name() {
        assert!(matches!(
            resolve_from(&sample(), Some("  "), None),
            Err(Error::InvalidInput(_))
        ));
    }

    #[test]
    fn test_resolve_bad_env() {
        let err = resolve_from(&sample(), None, Some("missing")).unwrap_err();
        assert!(err.to_string().contains(DEFAULT_LLM_ENV));

        let err = resolve_from(&sample(), None, Some("   ")).unwrap_err();
        assert!(err.to_string().contains("set but empty"));
    }

    #[test]
    fn test_resolve_empty_registry() {
        let err = resolve_from(&[], None, None).unwrap_err();
        assert!(err.to_string().contains("does not define any LLM endpoints"));
    }
}
