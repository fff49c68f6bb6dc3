//! Shared constants/defaults for things
//!

/// Name of the caption mapping file written next to the creatives.
pub const CAPTIONS_FILENAME: &str = "captions.txt";

/// Filename stem prefix for creatives, eg `creative_01`.
pub const CREATIVE_PREFIX: &str = "creative";

/// Upload extensions we accept, compared case-insensitively.
pub const ALLOWED_EXTENSIONS: [&str; 3] = ["png", "jpg", "jpeg"];

/// Number of creatives produced per run unless configured otherwise.
pub const DEFAULT_CREATIVE_COUNT: usize = 12;

/// Canvas edge length (pixels) unless configured otherwise.
pub const DEFAULT_CANVAS_SIZE: u32 = 1200;

/// Number of reference images requested from the image API per run.
pub const GENERATED_IMAGE_COUNT: usize = 6;

/// Edge length of the reference images.
pub const GENERATED_IMAGE_SIZE: u32 = 1024;

/// Subdirectory of a run holding the reference images.
pub const GENERATED_IMAGE_DIR: &str = "generated";

/// JPEG quality for the photographic encoding of a creative.
pub const JPEG_QUALITY: u8 = 94;

/// Per-call timeout for the external generation API.
pub const ADAPTER_TIMEOUT_SECONDS: u64 = 20;

/// Default base URL of the generation API.
pub const DEFAULT_API_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Default text model for captions.
pub const DEFAULT_TEXT_MODEL: &str = "gemini-2.0-flash";

/// Default image model for reference images.
pub const DEFAULT_IMAGE_MODEL: &str = "imagen-3.0-generate-002";

/// Upper bound for the upload request body.
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 25 * 1024 * 1024;

/// Max characters of the prompt shown on a placeholder image.
pub const PLACEHOLDER_PROMPT_CHARS: usize = 80;

/// Font files probed when no font path is configured.
pub const FONT_CANDIDATES: [&str; 6] = [
    "DejaVuSans-Bold.ttf",
    "DejaVuSans.ttf",
    "/usr/share/fonts/truetype/dejavu/DejaVuSans-Bold.ttf",
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans-Bold.ttf",
    "/Library/Fonts/Arial.ttf",
];
