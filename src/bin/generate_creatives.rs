use anyhow::{Context, Result, anyhow};
use brandmorpher::compose::{ComposeJob, Compositor, TextRenderer};
use brandmorpher::config::setup_logging;
use brandmorpher::constants::{DEFAULT_CANVAS_SIZE, DEFAULT_CREATIVE_COUNT};
use clap::Parser;
use std::path::PathBuf;

/// Compose creatives from a logo and a product photo without the web app.
///
/// Minimal UX:
///   generate_creatives logo.png product.png ./out
#[derive(Parser, Debug)]
#[command(name = "generate_creatives")]
#[command(about = "Render a set of marketing creatives and captions.txt into a directory")]
struct Args {
    /// Logo image (png, jpg, jpeg)
    logo: PathBuf,

    /// Product photo (png, jpg, jpeg)
    product: PathBuf,

    /// Output directory
    #[arg(default_value = "./out")]
    out_dir: PathBuf,

    /// Number of creatives
    #[arg(long, default_value_t = DEFAULT_CREATIVE_COUNT)]
    count: usize,

    /// Creative edge length in pixels
    #[arg(long, default_value_t = DEFAULT_CANVAS_SIZE)]
    size: u32,

    /// Brand name used in headlines and captions
    #[arg(long, default_value = "Brand")]
    brand: String,

    /// Product name used in headlines and captions
    #[arg(long, default_value = "Product")]
    product_name: String,

    /// TrueType font for text overlays
    #[arg(long, env = "BRANDMORPHER_FONT_PATH")]
    font_path: Option<PathBuf>,

    /// Debug logging
    #[arg(long)]
    debug: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    setup_logging(args.debug).map_err(|err| anyhow!("Failed to set up logging: {err}"))?;

    if args.count == 0 {
        return Err(anyhow!("--count must be at least 1"));
    }

    let compositor = Compositor::new(TextRenderer::load(args.font_path.as_deref()));
    let creatives = compositor
        .compose(&ComposeJob {
            logo_path: &args.logo,
            product_path: &args.product,
            count: args.count,
            canvas_size: args.size,
            brand_name: &args.brand,
            product_name: &args.product_name,
            output_dir: &args.out_dir,
        })
        .with_context(|| format!("Failed to compose into {}", args.out_dir.display()))?;

    for creative in &creatives {
        eprintln!("{}\t{}", creative.stem, creative.caption);
    }
    println!("{}", args.out_dir.display());
    Ok(())
}
