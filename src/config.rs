//! Config handling

use std::path::PathBuf;
use std::time::Duration;

use tracing::log::LevelFilter;

use crate::cli::CliOptions;
use crate::constants::{
    ADAPTER_TIMEOUT_SECONDS, DEFAULT_API_BASE_URL, DEFAULT_CANVAS_SIZE, DEFAULT_CREATIVE_COUNT,
    DEFAULT_IMAGE_MODEL, DEFAULT_MAX_UPLOAD_BYTES, DEFAULT_TEXT_MODEL,
};

/// Sets up logging based on the debug flag
pub fn setup_logging(debug: bool) -> Result<(), Box<std::io::Error>> {
    let level = if debug {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };

    let mut logger = simple_logger::SimpleLogger::new().with_level(level);
    if !debug {
        logger = logger
            .with_module_level("tracing", LevelFilter::Warn)
            .with_module_level("rustls", LevelFilter::Info)
            .with_module_level("reqwest", LevelFilter::Info)
            .with_module_level("hyper_util", LevelFilter::Info)
            .with_module_level("h2", LevelFilter::Info);
    }
    logger.init().map_err(|err| {
        eprintln!("Failed to initialize logger: {}", err);
        Box::new(std::io::Error::other(err))
    })
}

/// Settings shared by the external generation adapters.
#[derive(Clone, Debug)]
pub struct GenAiSettings {
    /// Credential, `None` forces the local fallbacks
    pub api_key: Option<String>,
    /// eg `https://generativelanguage.googleapis.com/v1beta`
    pub base_url: String,
    /// Model used for captions
    pub text_model: String,
    /// Model used for reference images
    pub image_model: String,
    /// Per-call timeout
    pub timeout: Duration,
}

impl Default for GenAiSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_API_BASE_URL.to_string(),
            text_model: DEFAULT_TEXT_MODEL.to_string(),
            image_model: DEFAULT_IMAGE_MODEL.to_string(),
            timeout: Duration::from_secs(ADAPTER_TIMEOUT_SECONDS),
        }
    }
}

impl GenAiSettings {
    /// Picks the first non-blank credential.
    pub fn with_api_key(mut self, candidates: &[Option<&str>]) -> Self {
        self.api_key = candidates
            .iter()
            .flatten()
            .map(|key| key.trim())
            .find(|key| !key.is_empty())
            .map(str::to_string);
        self
    }

    /// True when a credential is configured.
    pub fn has_credential(&self) -> bool {
        self.api_key.is_some()
    }
}

/// Application configuration, built once at startup and handed to whatever needs it.
#[derive(Clone, Debug)]
pub struct AppConfig {
    /// Listen address
    pub listen_address: String,
    /// Listen port
    pub port: u16,
    /// Parent of all run directories
    pub runs_dir: PathBuf,
    /// Whether to request reference images
    pub use_image_api: bool,
    /// Whether to request captions
    pub use_llm: bool,
    /// Adapter settings
    pub genai: GenAiSettings,
    /// Creatives per run
    pub creative_count: usize,
    /// Creative edge length
    pub canvas_size: u32,
    /// Optional font override
    pub font_path: Option<PathBuf>,
    /// Retention window for runs, `None` keeps them forever
    pub run_ttl: Option<Duration>,
    /// Upload body limit
    pub max_upload_bytes: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            listen_address: "127.0.0.1".to_string(),
            port: 5000,
            runs_dir: PathBuf::from("./runs"),
            use_image_api: false,
            use_llm: false,
            genai: GenAiSettings::default(),
            creative_count: DEFAULT_CREATIVE_COUNT,
            canvas_size: DEFAULT_CANVAS_SIZE,
            font_path: None,
            run_ttl: None,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }
}

impl From<&CliOptions> for AppConfig {
    fn from(cli: &CliOptions) -> Self {
        let genai = GenAiSettings {
            base_url: cli.api_base_url.trim_end_matches('/').to_string(),
            text_model: cli.text_model.clone(),
            image_model: cli.image_model.clone(),
            ..GenAiSettings::default()
        }
        .with_api_key(&[cli.gemini_api_key.as_deref(), cli.google_api_key.as_deref()]);

        Self {
            listen_address: cli.listen_address.clone(),
            port: cli.port.get(),
            runs_dir: cli.runs_dir.clone(),
            use_image_api: cli.use_image_api,
            use_llm: cli.use_llm,
            genai,
            creative_count: cli.creatives.max(1),
            canvas_size: cli.canvas_size.max(64),
            font_path: cli.font_path.clone(),
            run_ttl: cli.run_ttl_secs.map(Duration::from_secs),
            max_upload_bytes: cli.max_upload_bytes,
        }
    }
}
