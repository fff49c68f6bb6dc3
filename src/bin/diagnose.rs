use anyhow::{Context, Result, anyhow};
use brandmorpher::adapters::{CaptionAdapter, ImageAdapter};
use brandmorpher::captions::fallback_captions;
use brandmorpher::cli::CliOptions;
use brandmorpher::compose::TextRenderer;
use brandmorpher::config::{AppConfig, setup_logging};
use clap::Parser;

/// Checks the generation API setup end to end.
///
/// Takes the same options and environment as the server, reports what is
/// configured, then makes one caption request and one image request.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = CliOptions::parse();
    setup_logging(cli.debug).map_err(|err| anyhow!("Failed to set up logging: {err}"))?;
    let config = AppConfig::from(&cli);
    let genai = &config.genai;

    println!("=== BrandMorpher generation API diagnostic ===");
    println!("Credential configured: {}", genai.has_credential());
    println!("Base URL:     {}", genai.base_url);
    println!("Text model:   {}", genai.text_model);
    println!("Image model:  {}", genai.image_model);
    println!("Timeout:      {}s", genai.timeout.as_secs());
    println!("USE_LLM={} USE_IMAGE_API={}", config.use_llm, config.use_image_api);

    let (brand, product) = ("Acme", "Boots");
    let captions = CaptionAdapter::new(genai)?
        .generate_captions(brand, product, 3)
        .await;
    let source = if captions == fallback_captions(brand, product, 3) {
        "template fallback"
    } else {
        "remote API"
    };
    println!("\nCaptions ({source}):");
    for caption in &captions {
        println!("  {caption}");
    }

    let scratch = tempfile_dir()?;
    let text = TextRenderer::load(config.font_path.as_deref());
    let paths = ImageAdapter::new(genai, text)?
        .generate_images(&format!("Product photo of {product} by {brand}"), 1, 256, &scratch)
        .await
        .context("Image adapter failed writing locally")?;
    let source = if paths.iter().any(|path| {
        path.file_name()
            .and_then(|name| name.to_str())
            .is_some_and(|name| name.starts_with("generated_"))
    }) {
        "remote API"
    } else {
        "placeholder fallback"
    };
    println!("\nImages ({source}):");
    for path in &paths {
        println!("  {}", path.display());
    }

    println!("\n=== end diagnostic ===");
    Ok(())
}

fn tempfile_dir() -> Result<std::path::PathBuf> {
    let dir = std::env::temp_dir().join(format!(
        "brandmorpher-diagnose-{}",
        brandmorpher::runs::new_run_id()
    ));
    std::fs::create_dir_all(&dir).with_context(|| format!("Failed to create {}", dir.display()))?;
    Ok(dir)
}
