//! Reference images from the image model, or local placeholders.

use std::path::{Path, PathBuf};

use base64::Engine;
use base64::engine::general_purpose;
use image::imageops::{self, FilterType};
use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use super::extract::extract_images;
use super::{build_client, model_url, post_json};
use crate::compose::TextRenderer;
use crate::config::GenAiSettings;
use crate::constants::PLACEHOLDER_PROMPT_CHARS;
use crate::error::MorpherError;

const PLACEHOLDER_BACKGROUND: Rgba<u8> = Rgba([240, 240, 245, 255]);
const PLACEHOLDER_INK: Rgba<u8> = Rgba([30, 30, 30, 255]);
const PLACEHOLDER_TEXT_PX: f32 = 28.0;
const PLACEHOLDER_MARGIN: i32 = 30;

/// Most samples the image model returns for one `predict` call.
pub const MAX_SAMPLES_PER_REQUEST: usize = 4;

/// Request body for POST models/<model>:predict
#[derive(Serialize, Debug)]
struct PredictRequest<'a> {
    instances: [Instance<'a>; 1],
    parameters: PredictParameters,
}

#[derive(Serialize, Debug)]
struct Instance<'a> {
    prompt: &'a str,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
struct PredictParameters {
    sample_count: usize,
    aspect_ratio: &'static str,
}

/// Generates square reference images.
#[derive(Clone, Debug)]
pub struct ImageAdapter {
    client: reqwest::Client,
    settings: GenAiSettings,
    text: TextRenderer,
}

impl ImageAdapter {
    /// `text` renders the prompt onto placeholders.
    pub fn new(settings: &GenAiSettings, text: TextRenderer) -> Result<Self, MorpherError> {
        Ok(Self {
            client: build_client(settings)?,
            settings: settings.clone(),
            text,
        })
    }

    /// Writes `count` images of `size`×`size` into `out_dir` and returns their paths.
    ///
    /// API images are saved as `generated_NN.png`. Without a credential, on any
    /// API failure, or when nothing decodes, `count` placeholders are written
    /// as `placeholder_NN.png` instead. Only local I/O errors are returned.
    #[instrument(level = "debug", skip(self, out_dir))]
    pub async fn generate_images(
        &self,
        prompt: &str,
        count: usize,
        size: u32,
        out_dir: &Path,
    ) -> Result<Vec<PathBuf>, MorpherError> {
        tokio::fs::create_dir_all(out_dir).await?;

        match self.settings.api_key.as_deref() {
            None => debug!("No API credential, writing placeholders"),
            Some(api_key) => match self.request_images(api_key, prompt, count).await {
                Ok(encoded) => {
                    let saved = save_generated(encoded, size, out_dir.to_path_buf()).await?;
                    if !saved.is_empty() {
                        info!("Saved {} generated images", saved.len());
                        return Ok(saved);
                    }
                    warn!("Image API payloads did not decode, writing placeholders");
                }
                Err(err) => warn!("Image API failed, writing placeholders: {err}"),
            },
        }

        let renderer = self.text.clone();
        let prompt = prompt.to_string();
        let out_dir = out_dir.to_path_buf();
        tokio::task::spawn_blocking(move || {
            write_placeholders(&renderer, &prompt, count, size, &out_dir)
        })
        .await
        .map_err(|err| MorpherError::InternalServerError(err.to_string()))?
    }

    /// Asks for `count` images in batches of at most [`MAX_SAMPLES_PER_REQUEST`].
    ///
    /// A failing batch ends the loop; whatever earlier batches returned is kept.
    async fn request_images(
        &self,
        api_key: &str,
        prompt: &str,
        count: usize,
    ) -> Result<Vec<String>, MorpherError> {
        let url = model_url(&self.settings, &self.settings.image_model, "predict");
        let mut encoded = Vec::with_capacity(count);
        while encoded.len() < count {
            let wanted = (count - encoded.len()).min(MAX_SAMPLES_PER_REQUEST);
            match self.request_batch(&url, api_key, prompt, wanted).await {
                Ok(batch) if batch.is_empty() => break,
                Ok(batch) => encoded.extend(batch.into_iter().take(wanted)),
                Err(err) if encoded.is_empty() => return Err(err),
                Err(err) => {
                    warn!("Image batch failed after {} images: {err}", encoded.len());
                    break;
                }
            }
        }
        Ok(encoded)
    }

    async fn request_batch(
        &self,
        url: &str,
        api_key: &str,
        prompt: &str,
        sample_count: usize,
    ) -> Result<Vec<String>, MorpherError> {
        let body = PredictRequest {
            instances: [Instance { prompt }],
            parameters: PredictParameters {
                sample_count,
                aspect_ratio: "1:1",
            },
        };
        let payload = post_json(&self.client, url, api_key, &body).await?;
        let (strategy, encoded) = extract_images(&payload)
            .ok_or_else(|| MorpherError::Adapter("no images in response".to_string()))?;
        debug!("Found {} images via {strategy}", encoded.len());
        Ok(encoded)
    }
}

/// Decodes each payload and saves the ones that are real images.
async fn save_generated(
    encoded: Vec<String>,
    size: u32,
    out_dir: PathBuf,
) -> Result<Vec<PathBuf>, MorpherError> {
    tokio::task::spawn_blocking(move || -> Result<Vec<PathBuf>, MorpherError> {
        let mut saved = Vec::new();
        for (index, b64) in encoded.iter().enumerate() {
            let img = match decode_payload(b64) {
                Ok(img) => img,
                Err(err) => {
                    warn!("Skipping generated image {}: {err}", index + 1);
                    continue;
                }
            };
            let img = if img.width() == size && img.height() == size {
                img
            } else {
                DynamicImage::ImageRgba8(imageops::resize(
                    &img,
                    size,
                    size,
                    FilterType::Lanczos3,
                ))
            };
            let path = out_dir.join(format!("generated_{:02}.png", saved.len() + 1));
            img.save_with_format(&path, ImageFormat::Png)?;
            saved.push(path);
        }
        Ok(saved)
    })
    .await
    .map_err(|err| MorpherError::InternalServerError(err.to_string()))?
}

fn decode_payload(b64: &str) -> Result<DynamicImage, MorpherError> {
    let bytes = general_purpose::STANDARD
        .decode(b64.trim())
        .map_err(|err| MorpherError::Adapter(format!("bad base64: {err}")))?;
    image::load_from_memory(&bytes)
        .map_err(|err| MorpherError::Adapter(format!("undecodable image: {err}")))
}

/// One flat placeholder with the prompt written on it.
pub fn render_placeholder(renderer: &TextRenderer, prompt: &str, size: u32) -> RgbaImage {
    let mut img = RgbaImage::from_pixel(size, size, PLACEHOLDER_BACKGROUND);
    let short: String = prompt.chars().take(PLACEHOLDER_PROMPT_CHARS).collect();
    renderer.draw(
        &mut img,
        PLACEHOLDER_TEXT_PX,
        PLACEHOLDER_MARGIN,
        PLACEHOLDER_MARGIN,
        PLACEHOLDER_INK,
        &format!("[Placeholder]\n{short}"),
    );
    img
}

fn write_placeholders(
    renderer: &TextRenderer,
    prompt: &str,
    count: usize,
    size: u32,
    out_dir: &Path,
) -> Result<Vec<PathBuf>, MorpherError> {
    let placeholder =
        DynamicImage::ImageRgba8(render_placeholder(renderer, prompt, size)).to_rgb8();
    let mut saved = Vec::with_capacity(count);
    for index in 1..=count {
        let path = out_dir.join(format!("placeholder_{index:02}.png"));
        placeholder.save_with_format(&path, ImageFormat::Png)?;
        saved.push(path);
    }
    Ok(saved)
}
