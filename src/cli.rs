//! CLI parser
use clap::Parser;
use std::num::NonZeroU16;
use std::path::PathBuf;

use crate::constants::{
    DEFAULT_API_BASE_URL, DEFAULT_CANVAS_SIZE, DEFAULT_CREATIVE_COUNT, DEFAULT_IMAGE_MODEL,
    DEFAULT_MAX_UPLOAD_BYTES, DEFAULT_TEXT_MODEL,
};

#[derive(Parser, Debug)]
/// CLI Options
pub struct CliOptions {
    #[clap(long, help = "Enable debug logging", env = "BRANDMORPHER_DEBUG")]
    /// Enable debug logging. Env: BRANDMORPHER_DEBUG
    pub debug: bool,
    #[clap(long, short, default_value = "5000", env = "PORT")]
    /// http listener, defaults to `5000`.
    /// Env: PORT
    pub port: NonZeroU16,
    #[clap(
        long,
        short,
        default_value = "127.0.0.1",
        env = "BRANDMORPHER_LISTEN_ADDRESS"
    )]
    /// Listen address, defaults to `127.0.0.1`.
    /// Env: BRANDMORPHER_LISTEN_ADDRESS
    pub listen_address: String,

    #[clap(long, default_value = "./runs", env = "BRANDMORPHER_RUNS_DIR")]
    /// Where run directories and archives are written.
    /// Env: BRANDMORPHER_RUNS_DIR
    pub runs_dir: PathBuf,

    #[clap(long, env = "GEMINI_API_KEY", hide_env_values = true)]
    /// Credential for the generation API. Env: GEMINI_API_KEY
    pub gemini_api_key: Option<String>,

    #[clap(long, env = "GOOGLE_API_KEY", hide_env_values = true)]
    /// Used when no Gemini key is set. Env: GOOGLE_API_KEY
    pub google_api_key: Option<String>,

    #[clap(long, env = "USE_IMAGE_API")]
    /// Ask the image API for reference images. Env: USE_IMAGE_API
    pub use_image_api: bool,

    #[clap(long, env = "USE_LLM")]
    /// Ask the text API for captions. Env: USE_LLM
    pub use_llm: bool,

    #[clap(long, default_value = DEFAULT_API_BASE_URL, env = "BRANDMORPHER_API_BASE_URL")]
    /// Base URL of the generation API. Env: BRANDMORPHER_API_BASE_URL
    pub api_base_url: String,

    #[clap(long, default_value = DEFAULT_TEXT_MODEL, env = "BRANDMORPHER_TEXT_MODEL")]
    /// Caption model. Env: BRANDMORPHER_TEXT_MODEL
    pub text_model: String,

    #[clap(long, default_value = DEFAULT_IMAGE_MODEL, env = "BRANDMORPHER_IMAGE_MODEL")]
    /// Reference image model. Env: BRANDMORPHER_IMAGE_MODEL
    pub image_model: String,

    #[clap(long, default_value_t = DEFAULT_CREATIVE_COUNT, env = "BRANDMORPHER_CREATIVES")]
    /// Creatives per run. Env: BRANDMORPHER_CREATIVES
    pub creatives: usize,

    #[clap(long, default_value_t = DEFAULT_CANVAS_SIZE, env = "BRANDMORPHER_CANVAS_SIZE")]
    /// Creative edge length in pixels. Env: BRANDMORPHER_CANVAS_SIZE
    pub canvas_size: u32,

    #[clap(long, env = "BRANDMORPHER_FONT_PATH")]
    /// TrueType font for overlays, eg `/usr/share/fonts/truetype/dejavu/DejaVuSans-Bold.ttf`.
    /// Env: BRANDMORPHER_FONT_PATH
    pub font_path: Option<PathBuf>,

    #[clap(long, env = "BRANDMORPHER_RUN_TTL_SECS")]
    /// Delete runs older than this many seconds. Unset keeps everything.
    /// Env: BRANDMORPHER_RUN_TTL_SECS
    pub run_ttl_secs: Option<u64>,

    #[clap(long, default_value_t = DEFAULT_MAX_UPLOAD_BYTES, env = "BRANDMORPHER_MAX_UPLOAD_BYTES")]
    /// Upload body limit. Env: BRANDMORPHER_MAX_UPLOAD_BYTES
    pub max_upload_bytes: usize,
}
