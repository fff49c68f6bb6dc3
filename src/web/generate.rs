use std::path::{Path, PathBuf};

use axum::body::Body;
use axum::extract::Multipart;
use axum::extract::multipart::Field;
use axum::http::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Redirect, Response};
use tracing::instrument;

use super::flash::{
    self, FLASH_BAD_EXTENSION, FLASH_GENERATION_FAILED, FLASH_MISSING_UPLOADS,
    FLASH_PACKAGING_FAILED, FLASH_UNREADABLE_UPLOAD,
};
use super::prelude::*;
use crate::captions::{merge_captions, read_caption_file, write_caption_file};
use crate::compose::{ComposeJob, Creative};
use crate::constants::{GENERATED_IMAGE_COUNT, GENERATED_IMAGE_SIZE};
use crate::packaging::{check_upload_name, download_name, secure_filename, zip_directory};
use crate::runs::{Run, sweep_expired};

const DEFAULT_BRAND: &str = "Brand";
const DEFAULT_PRODUCT: &str = "Product";

#[derive(Debug)]
struct Upload {
    filename: String,
    bytes: Vec<u8>,
}

#[derive(Debug, Default)]
struct GenerateForm {
    brand: Option<String>,
    product_name: Option<String>,
    logo: Option<Upload>,
    product: Option<Upload>,
}

impl GenerateForm {
    async fn from_multipart(mut multipart: Multipart) -> Result<Self, MorpherError> {
        let mut form = Self::default();
        while let Some(field) = multipart.next_field().await.map_err(|err| {
            info!("Rejecting malformed upload: {err}");
            MorpherError::BadRequest
        })? {
            let field_name = field.name().unwrap_or_default().to_string();
            match field_name.as_str() {
                "brand" => form.brand = Some(field_text(field).await?),
                "product_name" => form.product_name = Some(field_text(field).await?),
                "logo" => form.logo = field_upload(field).await?,
                // older forms post the product name and the product photo under one name
                "product" if field.file_name().is_none() => {
                    form.product_name = Some(field_text(field).await?)
                }
                "product" => form.product = field_upload(field).await?,
                other => debug!("Ignoring form field {other:?}"),
            }
        }
        Ok(form)
    }

    fn brand(&self) -> &str {
        non_blank(self.brand.as_deref()).unwrap_or(DEFAULT_BRAND)
    }

    fn product_name(&self) -> &str {
        non_blank(self.product_name.as_deref()).unwrap_or(DEFAULT_PRODUCT)
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}

async fn field_text(field: Field<'_>) -> Result<String, MorpherError> {
    field.text().await.map_err(|err| {
        info!("Unreadable form field: {err}");
        MorpherError::BadRequest
    })
}

/// A file field, `None` when the browser sent the field without choosing a file.
async fn field_upload(field: Field<'_>) -> Result<Option<Upload>, MorpherError> {
    let filename = field.file_name().unwrap_or_default().to_string();
    let bytes = field.bytes().await.map_err(|err| {
        info!("Unreadable upload: {err}");
        MorpherError::BadRequest
    })?;
    if filename.is_empty() && bytes.is_empty() {
        return Ok(None);
    }
    Ok(Some(Upload {
        filename,
        bytes: bytes.to_vec(),
    }))
}

async fn redirect_with_flash(session: &Session, flag: u16) -> Result<Response, MorpherError> {
    flash::set_flash(session, flag).await?;
    Ok(Redirect::to("/").into_response())
}

async fn save_upload(dir: &Path, prefix: &str, upload: &Upload) -> Result<PathBuf, MorpherError> {
    let path = dir.join(format!("{prefix}_{}", secure_filename(&upload.filename)));
    tokio::fs::write(&path, &upload.bytes).await?;
    Ok(path)
}

/// handles the /generate POST
#[instrument(skip_all)]
pub(crate) async fn generate_handler(
    State(state): State<AppState>,
    session: Session,
    multipart: Multipart,
) -> Result<Response, MorpherError> {
    if let Some(ttl) = state.config.run_ttl {
        sweep_expired(&state.config.runs_dir, ttl).await;
    }

    let form = GenerateForm::from_multipart(multipart).await?;
    let (Some(logo), Some(product)) = (&form.logo, &form.product) else {
        return redirect_with_flash(&session, FLASH_MISSING_UPLOADS).await;
    };
    if let Err(err) = check_upload_name(&logo.filename)
        .and_then(|_| check_upload_name(&product.filename))
    {
        info!("{err}");
        return redirect_with_flash(&session, FLASH_BAD_EXTENSION).await;
    }
    let brand = form.brand().to_string();
    let product_name = form.product_name().to_string();

    let run = Run::create(&state.config.runs_dir).await?;
    info!("Run {} for {brand} / {product_name}", run.id);
    let logo_path = save_upload(&run.dir, "logo", logo).await?;
    let product_path = save_upload(&run.dir, "product", product).await?;

    if state.config.use_image_api {
        let prompt = format!("Product photo of {product_name} by {brand}");
        match state
            .images
            .generate_images(
                &prompt,
                GENERATED_IMAGE_COUNT,
                GENERATED_IMAGE_SIZE,
                &run.generated_dir(),
            )
            .await
        {
            Ok(paths) => info!("Reference images: {paths:?}"),
            Err(err) => warn!("Reference image batch failed, continuing: {err}"),
        }
    }

    let api_captions = if state.config.use_llm {
        let captions = state
            .captions
            .generate_captions(&brand, &product_name, state.config.creative_count)
            .await;
        debug!("Caption sample: {:?}", captions.iter().take(3).collect::<Vec<_>>());
        Some(captions)
    } else {
        None
    };

    let composed =
        compose_run(&state, &run, logo_path, product_path, &brand, &product_name).await;
    let creatives = match composed {
        Ok(creatives) => creatives,
        Err(MorpherError::MissingInput(what)) => {
            info!("Run {}: {what}", run.id);
            return redirect_with_flash(&session, FLASH_UNREADABLE_UPLOAD).await;
        }
        Err(err) => {
            error!("Run {}: generation failed: {err}", run.id);
            return redirect_with_flash(&session, FLASH_GENERATION_FAILED).await;
        }
    };

    if let Some(captions) = api_captions
        && let Err(err) = apply_captions(&run.dir, &captions)
    {
        warn!("Run {}: failed to write API captions: {err}", run.id);
    }

    let run_dir = run.dir.clone();
    let zip_path = run.zip_path();
    let packed = tokio::task::spawn_blocking(move || zip_directory(&run_dir, &zip_path))
        .await
        .map_err(|err| MorpherError::InternalServerError(err.to_string()))?;
    if let Err(err) = packed {
        error!("Run {}: {err}", run.id);
        return redirect_with_flash(&session, FLASH_PACKAGING_FAILED).await;
    }

    let bytes = tokio::fs::read(run.zip_path()).await?;
    info!(
        "Run {} finished with {} creatives, {} byte archive",
        run.id,
        creatives.len(),
        bytes.len()
    );
    zip_response(&download_name(&brand, &product_name), bytes)
}

async fn compose_run(
    state: &AppState,
    run: &Run,
    logo_path: PathBuf,
    product_path: PathBuf,
    brand: &str,
    product_name: &str,
) -> Result<Vec<Creative>, MorpherError> {
    let compositor = Arc::clone(&state.compositor);
    let output_dir = run.dir.clone();
    let brand = brand.to_string();
    let product_name = product_name.to_string();
    let count = state.config.creative_count;
    let canvas_size = state.config.canvas_size;
    tokio::task::spawn_blocking(move || {
        compositor.compose(&ComposeJob {
            logo_path: &logo_path,
            product_path: &product_path,
            count,
            canvas_size,
            brand_name: &brand,
            product_name: &product_name,
            output_dir: &output_dir,
        })
    })
    .await
    .map_err(|err| MorpherError::Composition(err.to_string()))?
}

fn apply_captions(dir: &Path, captions: &[String]) -> std::io::Result<()> {
    let mut entries = read_caption_file(dir)?;
    merge_captions(&mut entries, captions);
    write_caption_file(dir, &entries)
}

fn zip_response(download_name: &str, bytes: Vec<u8>) -> Result<Response, MorpherError> {
    let disposition = HeaderValue::from_str(&format!("attachment; filename=\"{download_name}\""))
        .unwrap_or_else(|_| HeaderValue::from_static("attachment; filename=\"creatives.zip\""));
    let response = Response::builder()
        .status(StatusCode::OK)
        .header(CONTENT_TYPE, "application/zip")
        .header(CONTENT_DISPOSITION, disposition)
        .body(Body::from(bytes))?;
    Ok(response)
}
