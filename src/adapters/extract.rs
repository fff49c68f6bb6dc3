//! Pulls text and image payloads out of generation API responses.
//!
//! The API has shipped a few response shapes over its versions, so each shape
//! gets a named strategy and the first one that yields something wins.

use serde_json::Value;

/// A named extraction attempt.
pub type Strategy<T> = (&'static str, fn(&Value) -> Option<T>);

const TEXT_FIELDS: [&str; 3] = ["content", "output", "text"];
const TOP_LEVEL_TEXT_FIELDS: [&str; 3] = ["output", "text", "content"];
const B64_FIELDS: [&str; 4] = ["b64_json", "b64", "b64String", "b64Data"];

/// Text strategies, in the order they're tried.
pub const TEXT_STRATEGIES: [Strategy<String>; 5] = [
    ("candidate_parts", candidate_parts_text),
    ("candidate_field", candidate_field_text),
    ("candidate_string", candidate_string_text),
    ("top_level_field", top_level_field_text),
    ("any_long_string", any_long_string_text),
];

/// Base64 image strategies, in the order they're tried.
pub const IMAGE_STRATEGIES: [Strategy<Vec<String>>; 3] = [
    ("predictions", prediction_images),
    ("data", data_images),
    ("inline_data", inline_data_images),
];

/// Returns the first strategy name and text that matched.
pub fn extract_text(payload: &Value) -> Option<(&'static str, String)> {
    TEXT_STRATEGIES.iter().find_map(|(name, strategy)| {
        strategy(payload)
            .filter(|text| !text.trim().is_empty())
            .map(|text| (*name, text))
    })
}

/// Returns the first strategy name and base64 payloads that matched.
pub fn extract_images(payload: &Value) -> Option<(&'static str, Vec<String>)> {
    IMAGE_STRATEGIES.iter().find_map(|(name, strategy)| {
        strategy(payload)
            .filter(|images| !images.is_empty())
            .map(|images| (*name, images))
    })
}

fn first_candidate(payload: &Value) -> Option<&Value> {
    payload.get("candidates")?.as_array()?.first()
}

fn string_field(value: &Value, fields: &[&str]) -> Option<String> {
    fields
        .iter()
        .find_map(|field| value.get(*field).and_then(Value::as_str))
        .map(str::to_string)
}

/// `candidates[0].content.parts[].text`, joined with newlines
fn candidate_parts_text(payload: &Value) -> Option<String> {
    let parts = first_candidate(payload)?
        .get("content")?
        .get("parts")?
        .as_array()?;
    let texts: Vec<&str> = parts
        .iter()
        .filter_map(|part| part.get("text").and_then(Value::as_str))
        .collect();
    if texts.is_empty() {
        None
    } else {
        Some(texts.join("\n"))
    }
}

fn candidate_field_text(payload: &Value) -> Option<String> {
    string_field(first_candidate(payload)?, &TEXT_FIELDS)
}

fn candidate_string_text(payload: &Value) -> Option<String> {
    first_candidate(payload)?.as_str().map(str::to_string)
}

fn top_level_field_text(payload: &Value) -> Option<String> {
    string_field(payload, &TOP_LEVEL_TEXT_FIELDS)
}

fn any_long_string_text(payload: &Value) -> Option<String> {
    payload
        .as_object()?
        .values()
        .filter_map(Value::as_str)
        .find(|text| text.chars().count() > 10)
        .map(str::to_string)
}

/// Imagen: `predictions[].bytesBase64Encoded`
fn prediction_images(payload: &Value) -> Option<Vec<String>> {
    let items = payload.get("predictions")?.as_array()?;
    Some(
        items
            .iter()
            .filter_map(|item| item.get("bytesBase64Encoded").and_then(Value::as_str))
            .map(str::to_string)
            .collect(),
    )
}

/// `data[]` with one of the b64 fields, or a nested `image.b64_json`
fn data_images(payload: &Value) -> Option<Vec<String>> {
    let items = payload.get("data")?.as_array()?;
    Some(
        items
            .iter()
            .filter_map(|item| {
                string_field(item, &B64_FIELDS).or_else(|| {
                    item.get("image")
                        .and_then(|image| image.get("b64_json"))
                        .and_then(Value::as_str)
                        .map(str::to_string)
                })
            })
            .collect(),
    )
}

/// `candidates[].content.parts[].inlineData.data`
fn inline_data_images(payload: &Value) -> Option<Vec<String>> {
    let candidates = payload.get("candidates")?.as_array()?;
    Some(
        candidates
            .iter()
            .filter_map(|candidate| candidate.get("content")?.get("parts")?.as_array())
            .flatten()
            .filter_map(|part| {
                part.get("inlineData")
                    .and_then(|inline| inline.get("data"))
                    .and_then(Value::as_str)
            })
            .map(str::to_string)
            .collect(),
    )
}
