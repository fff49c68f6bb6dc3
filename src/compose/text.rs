//! TrueType text overlays.
//!
//! A configured font wins, then the system candidates, then the DejaVu Sans Bold
//! copy built into the binary. [`TextRenderer::without_font`] draws nothing and
//! measures zero, which keeps pixel assertions in tests simple.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use image::{Rgba, RgbaImage};
use rusttype::{Font, Scale, point};
use tracing::{debug, info, warn};

use crate::constants::FONT_CANDIDATES;

static BUNDLED_FONT: &[u8] = include_bytes!(concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/fonts/DejaVuSans-Bold.ttf"
));

/// Draws and measures text with one loaded font.
#[derive(Clone, Default)]
pub struct TextRenderer {
    font: Option<Arc<Font<'static>>>,
}

impl std::fmt::Debug for TextRenderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TextRenderer")
            .field("has_font", &self.font.is_some())
            .finish()
    }
}

impl TextRenderer {
    /// A renderer that skips all text.
    pub fn without_font() -> Self {
        Self { font: None }
    }

    /// Loads `configured` if given and usable, else the first system candidate
    /// that parses, else the bundled font.
    pub fn load(configured: Option<&Path>) -> Self {
        let candidates = configured
            .map(Path::to_path_buf)
            .into_iter()
            .chain(FONT_CANDIDATES.iter().map(PathBuf::from));
        for path in candidates {
            match load_font(&path) {
                Some(font) => {
                    info!("Using font {}", path.display());
                    return Self {
                        font: Some(Arc::new(font)),
                    };
                }
                None => debug!("Font not usable: {}", path.display()),
            }
        }
        Self::bundled()
    }

    /// The DejaVu Sans Bold copy compiled into the crate.
    pub fn bundled() -> Self {
        match Font::try_from_bytes(BUNDLED_FONT) {
            Some(font) => {
                info!("Using bundled DejaVu Sans Bold");
                Self {
                    font: Some(Arc::new(font)),
                }
            }
            None => {
                warn!("Bundled font failed to parse, creatives will be rendered without text");
                Self::without_font()
            }
        }
    }

    /// True when a font is loaded.
    pub fn has_font(&self) -> bool {
        self.font.is_some()
    }

    /// Width and height in pixels of a single line at `px`.
    pub fn measure(&self, px: f32, text: &str) -> (u32, u32) {
        let Some(font) = self.font.as_deref() else {
            return (0, 0);
        };
        let scale = Scale::uniform(px);
        let v_metrics = font.v_metrics(scale);
        let width = font
            .layout(text, scale, point(0.0, v_metrics.ascent))
            .map(|glyph| glyph.position().x + glyph.unpositioned().h_metrics().advance_width)
            .fold(0.0_f32, f32::max);
        let height = v_metrics.ascent - v_metrics.descent;
        (width.ceil() as u32, height.ceil() as u32)
    }

    /// Draws `text` with its top-left corner at (x, y), blending by `color`'s alpha.
    /// `\n` starts a new line.
    pub fn draw(
        &self,
        img: &mut RgbaImage,
        px: f32,
        x: i32,
        y: i32,
        color: Rgba<u8>,
        text: &str,
    ) {
        let Some(font) = self.font.as_deref() else {
            return;
        };
        let scale = Scale::uniform(px);
        let v_metrics = font.v_metrics(scale);
        let line_height = v_metrics.ascent - v_metrics.descent + v_metrics.line_gap;

        for (line_no, line) in text.lines().enumerate() {
            let baseline = y as f32 + v_metrics.ascent + line_height * line_no as f32;
            for glyph in font.layout(line, scale, point(x as f32, baseline)) {
                let Some(bb) = glyph.pixel_bounding_box() else {
                    continue;
                };
                glyph.draw(|gx, gy, coverage| {
                    let tx = gx as i32 + bb.min.x;
                    let ty = gy as i32 + bb.min.y;
                    if tx < 0 || ty < 0 || tx >= img.width() as i32 || ty >= img.height() as i32 {
                        return;
                    }
                    let alpha = coverage * f32::from(color[3]) / 255.0;
                    if alpha <= 0.0 {
                        return;
                    }
                    blend_over(img.get_pixel_mut(tx as u32, ty as u32), color, alpha);
                });
            }
        }
    }
}

fn load_font(path: &Path) -> Option<Font<'static>> {
    let bytes = std::fs::read(path).ok()?;
    Font::try_from_vec(bytes)
}

/// Source-over blend of `color` at `alpha` (0..=1) onto `dst`.
pub(crate) fn blend_over(dst: &mut Rgba<u8>, color: Rgba<u8>, alpha: f32) {
    let alpha = alpha.clamp(0.0, 1.0);
    let dst_alpha = f32::from(dst[3]) / 255.0;
    let out_alpha = alpha + dst_alpha * (1.0 - alpha);
    if out_alpha <= 0.0 {
        *dst = Rgba([0, 0, 0, 0]);
        return;
    }
    for channel in 0..3 {
        let src = f32::from(color[channel]) * alpha;
        let under = f32::from(dst[channel]) * dst_alpha * (1.0 - alpha);
        dst[channel] = ((src + under) / out_alpha).round().clamp(0.0, 255.0) as u8;
    }
    dst[3] = (out_alpha * 255.0).round() as u8;
}
