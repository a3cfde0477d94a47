//! Text extraction from decoded LLM response bodies
//!
//! Providers disagree on where the answer lives: `OpenAI` nests it under
//! `choices[].message.content`, streaming chunks use `choices[].delta`,
//! Gemini uses `candidates[].content.parts`, Cohere returns `generations`,
//! Hugging Face returns `generated_text`, and the Responses API wraps rich
//! text as `{"value": .., "segments": [..]}`. The functions here fold all of
//! those shapes into a single string.
//!
//! Fragments are always concatenated without a separator. Within one object
//! the primary fragment leads, followed by `segments`/`parts`, then the
//! remaining candidate fields, and trailing-only fields last. A `value`
//! nested inside a `value` object is appended after all of those.

use serde_json::{Map, Value};

/// Keys that may carry text and are collected as candidates
const CANDIDATE_KEYS: &[&str] = &[
    "text",
    "content",
    "response",
    "output",
    "outputs",
    "output_text",
    "result",
    "results",
    "completion",
    "completions",
    "candidates",
    "generations",
    "generation",
    "generated_text",
];

/// Candidate keys that are only ever appended after the primary fragment
const TRAILING_ONLY_KEYS: &[&str] = &[
    "outputs",
    "result",
    "results",
    "completion",
    "completions",
    "candidates",
    "generations",
    "generation",
    "output_text",
];

/// Base string of a rich-text object
const VALUE_KEY: &str = "value";

/// Continuations spliced directly after the primary fragment
const SEGMENT_KEYS: &[&str] = &["segments", "parts"];

/// Candidate that outranks every other non-trailing candidate
const PRIORITY_KEY: &str = "output";

/// Wrappers probed when an object has no text fields of its own
const WRAPPER_KEYS: &[&str] = &["message", "messages", "delta", "data"];

/// Top-level keys that are treated as provider envelopes, not text fields
const ENVELOPE_KEYS: &[&str] = &["choices", "messages"];

/// Top-level wrappers probed when nothing else matched
const NESTED_RESPONSE_KEYS: &[&str] = &[
    "data",
    "response",
    "output",
    "outputs",
    "result",
    "results",
    "completion",
    "completions",
    "candidates",
];

fn is_trailing_only(key: &str) -> bool {
    TRAILING_ONLY_KEYS.contains(&key)
}

/// Concatenate fragments, returning `None` when there are none at all
///
/// An empty fragment still counts as present.
fn concat_fragments<I>(fragments: I) -> Option<String>
where
    I: IntoIterator<Item = String>,
{
    fragments.into_iter().fold(None, |acc: Option<String>, fragment| {
        let mut out = acc.unwrap_or_default();
        out.push_str(&fragment);
        Some(out)
    })
}

/// Extract text from any JSON value
///
/// Strings are returned unchanged (including the empty string), arrays are
/// concatenated element by element, and objects are resolved by field
/// precedence. Numbers, booleans and null never carry text.
#[must_use]
pub fn extract_text_value(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Array(items) => concat_fragments(items.iter().filter_map(extract_text_value)),
        Value::Object(map) => extract_from_entries(&map.iter().collect::<Vec<_>>()),
        Value::Null | Value::Bool(_) | Value::Number(_) => None,
    }
}

/// A candidate field that produced a fragment
struct Candidate<'a> {
    key: &'a str,
    fragment: String,
}

/// Pick the candidate that leads the result when no `value` is present
fn primary_index(candidates: &[Candidate<'_>]) -> Option<usize> {
    candidates
        .iter()
        .position(|c| c.key == PRIORITY_KEY)
        .or_else(|| candidates.iter().position(|c| !is_trailing_only(c.key)))
        .or_else(|| (!candidates.is_empty()).then_some(0))
}

/// Split a `value` entry into its own fragment and a post fragment
///
/// A `value` nested directly inside the value's text object is held back
/// and appended after every other fragment of the enclosing object.
fn split_value(entry: &Value) -> (Option<String>, Option<String>) {
    match entry {
        Value::Object(map) if map.contains_key(VALUE_KEY) => {
            let rest: Vec<_> = map
                .iter()
                .filter(|(key, _)| key.as_str() != VALUE_KEY)
                .collect();
            let post = map.get(VALUE_KEY).and_then(extract_text_value);
            (extract_from_entries(&rest), post)
        }
        other => (extract_text_value(other), None),
    }
}

/// Resolve the fields of one object in received order
fn extract_from_entries(entries: &[(&String, &Value)]) -> Option<String> {
    let mut value_fragment = None;
    let mut post_fragment = None;
    let mut segments = Vec::new();
    let mut candidates = Vec::new();

    for &(key, entry) in entries {
        let key = key.as_str();
        if key == VALUE_KEY {
            (value_fragment, post_fragment) = split_value(entry);
        } else if SEGMENT_KEYS.contains(&key) {
            segments.extend(extract_text_value(entry));
        } else if CANDIDATE_KEYS.contains(&key) {
            if let Some(fragment) = extract_text_value(entry) {
                candidates.push(Candidate { key, fragment });
            }
        }
    }

    let chosen = if value_fragment.is_some() {
        None
    } else {
        primary_index(&candidates)
    };
    let primary = value_fragment.or_else(|| chosen.map(|i| candidates[i].fragment.clone()));

    let (trailing, leading): (Vec<_>, Vec<_>) = candidates
        .iter()
        .enumerate()
        .filter(|(i, _)| Some(*i) != chosen)
        .map(|(_, c)| c)
        .partition(|c| is_trailing_only(c.key));

    let ordered = primary
        .into_iter()
        .chain(segments)
        .chain(leading.into_iter().map(|c| c.fragment.clone()))
        .chain(trailing.into_iter().map(|c| c.fragment.clone()))
        .chain(post_fragment);

    if let Some(text) = concat_fragments(ordered) {
        return Some(text);
    }

    WRAPPER_KEYS.iter().find_map(|wrapper| {
        entries
            .iter()
            .find(|(key, _)| key.as_str() == *wrapper)
            .and_then(|&(_, entry)| extract_text_value(entry))
    })
}

/// Extract the answer from `OpenAI`-style `choices`
///
/// Streaming chunks (any choice carrying `delta`) are reassembled by
/// concatenating every choice; otherwise choices are alternatives and only
/// the first one with non-empty text is used.
fn extract_choices(choices: &Value) -> Option<String> {
    let Value::Array(choices) = choices else {
        return None;
    };

    let streaming = choices.iter().any(|choice| choice.get("delta").is_some());
    if streaming {
        concat_fragments(choices.iter().filter_map(extract_text_value))
    } else {
        choices
            .iter()
            .filter_map(extract_text_value)
            .find(|text| !text.is_empty())
    }
}

/// Whether a chat message should contribute to the answer
fn is_assistant_or_untagged(message: &Value) -> bool {
    match message.get("role") {
        None | Some(Value::Null) => true,
        Some(role) => role.as_str() == Some("assistant"),
    }
}

/// Extract assistant turns from a chat transcript
fn extract_messages(messages: &Value) -> Option<String> {
    let Value::Array(entries) = messages else {
        return None;
    };

    concat_fragments(
        entries
            .iter()
            .filter(|m| is_assistant_or_untagged(m))
            .filter_map(extract_text_value),
    )
    .or_else(|| extract_text_value(messages))
}

/// Extract the response text from a full decoded response body
///
/// Provider envelopes are resolved first (`choices`, then `messages`, then a
/// Responses API `output` list), falling back to generic field precedence.
/// Top-level trailing-only fields such as `outputs` or `output_text` are
/// appended to whichever base result was found. When nothing matches, well
/// known wrapper fields (`data`, `response`, ...) are unwrapped recursively.
///
/// Returns `None` when the body carries no recognisable text.
#[must_use]
pub fn extract_text(body: &Value) -> Option<String> {
    match body {
        Value::Object(map) => extract_from_envelope(map),
        other => extract_text_value(other),
    }
}

fn extract_from_envelope(map: &Map<String, Value>) -> Option<String> {
    let base = map
        .get("choices")
        .and_then(extract_choices)
        .or_else(|| map.get("messages").and_then(extract_messages))
        .or_else(|| match map.get("output") {
            Some(output @ Value::Array(_)) => extract_text_value(output),
            _ => None,
        })
        .or_else(|| {
            let entries: Vec<_> = map
                .iter()
                .filter(|(key, _)| {
                    !ENVELOPE_KEYS.contains(&key.as_str()) && !is_trailing_only(key)
                })
                .collect();
            extract_from_entries(&entries)
        });

    let extras = concat_fragments(
        map.iter()
            .filter(|(key, _)| is_trailing_only(key))
            .filter_map(|(_, entry)| extract_text_value(entry)),
    );

    if let Some(text) = concat_fragments(base.into_iter().chain(extras)) {
        return Some(text);
    }

    NESTED_RESPONSE_KEYS
        .iter()
        .filter_map(|key| map.get(*key))
        .find_map(extract_text)
}
