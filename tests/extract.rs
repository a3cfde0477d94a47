//! Response-shape matrix for LLM text extraction

use serde_json::{Value, json};
use sigma::extract_text;

fn text(body: &Value) -> Option<String> {
    extract_text(body)
}

fn assert_text(body: &Value, expected: &str) {
    assert_eq!(text(body).as_deref(), Some(expected), "body: {body}");
}

#[test]
fn test_plain_response_field() {
    assert_text(&json!({"response": "Hello"}), "Hello");
}

#[test]
fn test_openai_message_uses_first_choice() {
    assert_text(
        &json!({"choices": [
            {"message": {"content": "Sigma rocks!"}},
            {"message": {"content": "Ignored"}}
        ]}),
        "Sigma rocks!",
    );
}

#[test]
fn test_choices_beat_messages() {
    assert_text(
        &json!({
            "choices": [{"message": {"content": "From choices"}}],
            "messages": [
                {"role": "user", "content": "User question"},
                {"role": "assistant", "content": "From messages"}
            ]
        }),
        "From choices",
    );
}

#[test]
fn test_choices_text() {
    assert_text(&json!({"choices": [{"text": "Choice text"}]}), "Choice text");
}

#[test]
fn test_openai_content_list() {
    assert_text(
        &json!({"choices": [{"message": {"content": [
            {"type": "text", "text": "Hello"},
            {"type": "text", "text": " world"}
        ]}}]}),
        "Hello world",
    );
}

#[test]
fn test_non_assistant_messages_filtered() {
    assert_text(
        &json!({"messages": [
            {"role": "system", "content": "You are helpful"},
            {"role": "user", "content": "Hi"},
            {"role": "assistant", "content": "Hello"},
            {"role": "assistant", "content": [
                {"type": "text", "text": " there"},
                {"type": "text", "text": "!"}
            ]}
        ]}),
        "Hello there!",
    );
}

#[test]
fn test_content_value_objects() {
    assert_text(
        &json!({"choices": [{"message": {"content": [
            {"type": "output_text", "text": {"value": "Hello"}},
            {"type": "output_text", "text": {"value": " world"}}
        ]}}]}),
        "Hello world",
    );
}

#[test]
fn test_value_and_segments() {
    let segments = json!([{"text": " "}, {"text": {"value": "world"}}]);
    assert_text(
        &json!({"choices": [{"message": {"content": [
            {"type": "output_text", "text": {"value": "Hello", "segments": segments}}
        ]}}]}),
        "Hello world",
    );
}

#[test]
fn test_segments_before_trailing_fields() {
    assert_text(
        &json!({"choices": [{"message": {"content": [
            {"type": "output_text", "text": {
                "segments": [{"text": " world"}],
                "value": "Hello",
                "outputs": [{"text": "!"}]
            }}
        ]}}]}),
        "Hello world!",
    );
}

#[test]
fn test_extras_after_value_even_if_listed_first() {
    assert_text(
        &json!({"choices": [{"message": {"content": [
            {"type": "output_text", "text": {
                "outputs": [{"text": "!"}],
                "value": "Hello",
                "segments": [{"text": " world"}]
            }}
        ]}}]}),
        "Hello world!",
    );
}

#[test]
fn test_extras_after_value_without_segments() {
    assert_text(
        &json!({"choices": [{"message": {"content": [
            {"type": "output_text", "text": {"outputs": [{"text": "!"}], "value": "Hello"}}
        ]}}]}),
        "Hello!",
    );
}

#[test]
fn test_extras_after_text_without_value() {
    assert_text(
        &json!({"choices": [{"message": {"content": [
            {"type": "output_text", "text": {"outputs": [{"text": "!"}], "text": "Hello"}}
        ]}}]}),
        "Hello!",
    );
}

#[test]
fn test_choices_with_top_level_outputs() {
    assert_text(
        &json!({
            "choices": [{"message": {"content": "Primary"}}],
            "outputs": [{"text": " extra"}]
        }),
        "Primary extra",
    );
}

#[test]
fn test_value_and_nested_parts() {
    let nested_parts = json!([{"text": " "}, {"text": {"value": "world"}}]);
    assert_text(
        &json!({"choices": [{"message": {"content": [
            {"type": "output_text", "text": {"value": "Hello", "parts": [{"text": nested_parts}]}}
        ]}}]}),
        "Hello world",
    );
}

#[test]
fn test_responses_api_output() {
    assert_text(
        &json!({"output": [{"content": [
            {"type": "output_text", "text": {"value": "Hello"}},
            {"type": "output_text", "text": {"value": " world"}}
        ]}]}),
        "Hello world",
    );
}

#[test]
fn test_responses_output_text() {
    assert_text(&json!({"output_text": ["Hello", " world"]}), "Hello world");
}

#[test]
fn test_structured_output_before_output_text() {
    assert_text(
        &json!({
            "output": [{"content": [
                {"text": {"value": "Hello", "segments": [{"text": " world"}]}}
            ]}],
            "output_text": ["!"]
        }),
        "Hello world!",
    );
}

#[test]
fn test_delta_content_list() {
    assert_text(
        &json!({"choices": [{"delta": {"content": [
            {"type": "text", "text": "Hello"},
            {"type": "text", "text": " world"}
        ]}}]}),
        "Hello world",
    );
}

#[test]
fn test_multiple_delta_choices_concatenate() {
    assert_text(
        &json!({"choices": [
            {"delta": {"content": "Hello"}},
            {"delta": {"content": " world"}},
            {"delta": {"content": [{"type": "text", "text": "!"}]}}
        ]}),
        "Hello world!",
    );
}

#[test]
fn test_delta_value_segments() {
    assert_text(
        &json!({"choices": [{"delta": {"content": [
            {"type": "output_text", "text": {"value": {"segments": [{"text": "Hello"}]}}},
            {"type": "output_text", "text": {"value": {"segments": [{"text": " world"}]}}}
        ]}}]}),
        "Hello world",
    );
}

#[test]
fn test_nested_response_payload() {
    assert_text(
        &json!({"response": {"choices": [{"message": {"content": [
            {"type": "text", "text": {"value": "Nested"}}
        ]}}]}}),
        "Nested",
    );
}

#[test]
fn test_outputs_array() {
    assert_text(
        &json!({"outputs": [{"content": [
            {"type": "text", "text": "Segment A"},
            {"type": "text", "text": " & Segment B"}
        ]}]}),
        "Segment A & Segment B",
    );
}

#[test]
fn test_gemini_candidates_parts() {
    assert_text(
        &json!({"candidates": [{"content": {
            "role": "model",
            "parts": [{"text": "Hello"}, {"text": " Gemini"}]
        }}]}),
        "Hello Gemini",
    );
}

#[test]
fn test_gemini_candidates_content_list() {
    assert_text(
        &json!({"candidates": [{"content": [{
            "role": "model",
            "parts": [
                {"text": "Hello"},
                {"text": {"value": {"segments": [{"text": " world"}]}}}
            ]
        }]}]}),
        "Hello world",
    );
}

#[test]
fn test_messages_content() {
    assert_text(
        &json!({"messages": [{"role": "assistant", "content": [
            {"type": "text", "text": "Hello"},
            {"type": "text", "text": {"value": " world"}}
        ]}]}),
        "Hello world",
    );
}

#[test]
fn test_cohere_generations() {
    assert_text(
        &json!({"generations": [{"text": "Hello"}, {"text": " world"}]}),
        "Hello world",
    );
}

#[test]
fn test_hugging_face_generated_text() {
    assert_text(
        &json!([{"generated_text": "Hello"}, {"generated_text": " world"}]),
        "Hello world",
    );
    assert_text(&json!({"generated_text": "Standalone"}), "Standalone");
}

#[test]
fn test_nested_response_messages() {
    assert_text(
        &json!({"response": {"messages": [{"role": "assistant", "content": [
            {"type": "output_text", "text": {"value": {"segments": [
                {"text": "Nested"},
                {"text": {"value": " reply"}}
            ]}}}
        ]}]}}),
        "Nested reply",
    );
}

#[test]
fn test_data_wrapper() {
    assert_text(&json!({"data": {"choices": [{"text": "Wrapped"}]}}), "Wrapped");
}

#[test]
fn test_no_text_fields() {
    assert_eq!(text(&json!({"unexpected": 1})), None);
    assert_eq!(text(&json!({"choices": []})), None);
    assert_eq!(text(&json!({"id": "abc", "usage": {"tokens": 3}})), None);
    assert_eq!(text(&json!(null)), None);
    assert_eq!(text(&json!(42)), None);
}

#[test]
fn test_extraction_is_deterministic() {
    let body = json!({
        "choices": [{"delta": {"content": "a"}}, {"delta": {"content": "b"}}],
        "outputs": ["c"]
    });
    let first = text(&body);
    assert_eq!(first.as_deref(), Some("abc"));
    for _ in 0..5 {
        assert_eq!(text(&body), first);
    }
}
