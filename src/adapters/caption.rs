//! Caption generation through the text model, with the template pool behind it.

use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use super::extract::extract_text;
use super::{build_client, model_url, post_json};
use crate::captions::{fallback_captions, fit_captions, split_caption_lines};
use crate::config::GenAiSettings;
use crate::error::MorpherError;

const MAX_OUTPUT_TOKENS: u32 = 200;
const TEMPERATURE: f32 = 0.8;

/// Request body for POST models/<model>:generateContent
#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: [Content<'a>; 1],
    generation_config: GenerationConfig,
}

#[derive(Serialize, Debug)]
struct Content<'a> {
    parts: [Part<'a>; 1],
}

#[derive(Serialize, Debug)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    max_output_tokens: u32,
    temperature: f32,
}

/// Asks the text model for captions. Never fails outward.
#[derive(Clone, Debug)]
pub struct CaptionAdapter {
    client: reqwest::Client,
    settings: GenAiSettings,
}

impl CaptionAdapter {
    /// Builds the HTTP client with the configured timeout.
    pub fn new(settings: &GenAiSettings) -> Result<Self, MorpherError> {
        Ok(Self {
            client: build_client(settings)?,
            settings: settings.clone(),
        })
    }

    /// Exactly `n` captions.
    ///
    /// Without a credential, or when the call fails or yields no usable text, the
    /// result is [`fallback_captions`]. A short answer is padded from the
    /// template cycle where the answer stopped.
    #[instrument(level = "debug", skip(self))]
    pub async fn generate_captions(&self, brand: &str, product: &str, n: usize) -> Vec<String> {
        if n == 0 {
            return Vec::new();
        }
        let Some(api_key) = self.settings.api_key.as_deref() else {
            debug!("No API credential, using template captions");
            return fallback_captions(brand, product, n);
        };
        match self.request_captions(api_key, brand, product, n).await {
            Ok(lines) => {
                info!("Caption API returned {} usable lines", lines.len());
                fit_captions(lines, brand, product, n)
            }
            Err(err) => {
                warn!("Caption API failed, using template captions: {err}");
                fallback_captions(brand, product, n)
            }
        }
    }

    async fn request_captions(
        &self,
        api_key: &str,
        brand: &str,
        product: &str,
        n: usize,
    ) -> Result<Vec<String>, MorpherError> {
        let prompt = caption_prompt(brand, product, n);
        let body = GenerateContentRequest {
            contents: [Content {
                parts: [Part { text: &prompt }],
            }],
            generation_config: GenerationConfig {
                max_output_tokens: MAX_OUTPUT_TOKENS,
                temperature: TEMPERATURE,
            },
        };
        let url = model_url(&self.settings, &self.settings.text_model, "generateContent");
        let payload = post_json(&self.client, &url, api_key, &body).await?;

        let (strategy, text) = extract_text(&payload)
            .ok_or_else(|| MorpherError::Adapter("no text in caption response".to_string()))?;
        debug!("Caption text found via {strategy}");
        let lines = split_caption_lines(&text);
        if lines.is_empty() {
            return Err(MorpherError::Adapter(
                "caption response had no usable lines".to_string(),
            ));
        }
        Ok(lines)
    }
}

fn caption_prompt(brand: &str, product: &str, n: usize) -> String {
    format!(
        "You are a senior performance marketer and copywriter. \
         Generate {n} short, punchy marketing captions (4-12 words) for this product. \
         Brand: {brand}. Product: {product}. Use active voice, include a short CTA, \
         and return each caption on a new line."
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::API_KEY_HEADER;
    use crate::adapters::testserver::serve;
    use axum::http::{HeaderMap, StatusCode};
    use axum::{Json, Router};
    use serde_json::{Value, json};

    fn settings(base_url: String, key: Option<&str>) -> GenAiSettings {
        GenAiSettings {
            base_url,
            ..GenAiSettings::default()
        }
        .with_api_key(&[key])
    }

    fn gemini_reply(text: &str) -> Value {
        json!({"candidates": [{"content": {"parts": [{"text": text}]}}]})
    }

    #[tokio::test]
    async fn no_credential_is_the_template_cycle() {
        let adapter = CaptionAdapter::new(&GenAiSettings::default()).expect("adapter");
        let captions = adapter.generate_captions("Acme", "Boots", 7).await;
        assert_eq!(captions, fallback_captions("Acme", "Boots", 7));
    }

    #[tokio::test]
    async fn first_n_lines_of_a_good_answer() {
        let reply = gemini_reply(
            "- Walk taller in Acme Boots\n\n• Boots built for rain\n* Step up today\n\
             A fourth line",
        );
        let app = Router::new().fallback(move || {
            let reply = reply.clone();
            async move { Json(reply) }
        });
        let base = serve(app).await;
        let adapter = CaptionAdapter::new(&settings(base, Some("k"))).expect("adapter");

        let captions = adapter.generate_captions("Acme", "Boots", 3).await;
        assert_eq!(
            captions,
            vec![
                "Walk taller in Acme Boots".to_string(),
                "Boots built for rain".to_string(),
                "Step up today".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn short_answer_is_padded_from_the_cycle() {
        let app = Router::new().fallback(|headers: HeaderMap| async move {
            let key = headers
                .get(API_KEY_HEADER)
                .and_then(|value| value.to_str().ok())
                .unwrap_or("missing")
                .to_string();
            Json(gemini_reply(&format!("Sent key {key}")))
        });
        let base = serve(app).await;
        let adapter = CaptionAdapter::new(&settings(base, Some("secret"))).expect("adapter");

        let captions = adapter.generate_captions("Acme", "Boots", 3).await;
        let templates = fallback_captions("Acme", "Boots", 3);
        assert_eq!(captions[0], "Sent key secret");
        assert_eq!(captions[1..], templates[1..]);
    }

    #[tokio::test]
    async fn server_error_falls_back() {
        let app = Router::new()
            .fallback(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "model overloaded") });
        let base = serve(app).await;
        let adapter = CaptionAdapter::new(&settings(base, Some("k"))).expect("adapter");
        assert_eq!(
            adapter.generate_captions("Acme", "Boots", 4).await,
            fallback_captions("Acme", "Boots", 4)
        );
    }

    #[tokio::test]
    async fn unreadable_payload_falls_back() {
        let app = Router::new().fallback(|| async { Json(json!({"candidates": []})) });
        let base = serve(app).await;
        let adapter = CaptionAdapter::new(&settings(base, Some("k"))).expect("adapter");
        assert_eq!(
            adapter.generate_captions("Acme", "Boots", 2).await,
            fallback_captions("Acme", "Boots", 2)
        );
    }

    #[tokio::test]
    async fn unreachable_api_falls_back() {
        let adapter = CaptionAdapter::new(&settings("http://127.0.0.1:9".to_string(), Some("k")))
            .expect("adapter");
        assert_eq!(
            adapter.generate_captions("Acme", "Boots", 5).await,
            fallback_captions("Acme", "Boots", 5)
        );
    }

    #[test]
    fn request_body_uses_api_field_names() {
        let body = GenerateContentRequest {
            contents: [Content {
                parts: [Part { text: "hi" }],
            }],
            generation_config: GenerationConfig {
                max_output_tokens: MAX_OUTPUT_TOKENS,
                temperature: 0.5,
            },
        };
        assert_eq!(
            serde_json::to_value(&body).expect("serialise"),
            json!({
                "contents": [{"parts": [{"text": "hi"}]}],
                "generationConfig": {"maxOutputTokens": 200, "temperature": 0.5}
            })
        );
    }
}
