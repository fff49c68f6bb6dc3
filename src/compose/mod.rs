//! The creative compositor.
//!
//! Every creative is a square canvas built in a fixed order: gradient
//! background with blooms, the product subject with a soft shadow, the logo
//! pill, headline and subheadline, an optional promo badge, then a vignette.
//! Cosmetic choices (colours, jitter, copy) are drawn from the caller's RNG.
//! Layout numbers are tuned for a 1200px canvas and scaled for other sizes.

pub(crate) mod draw;
pub mod subject;
pub mod text;

use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use image::codecs::jpeg::JpegEncoder;
use image::imageops::{self, FilterType};
use image::{DynamicImage, ImageFormat, ImageReader, Rgba, RgbImage, RgbaImage};
use rand::Rng;
use rand::seq::IndexedRandom;
use tracing::{debug, info};

use crate::captions::{CaptionEntry, random_caption, write_caption_file};
use crate::constants::{CREATIVE_PREFIX, JPEG_QUALITY};
use crate::error::MorpherError;
use draw::{
    ShadowStyle, apply_vignette, fill_circle, paste_with_soft_shadow, rounded_rect,
    vertical_gradient,
};
use subject::{ENHANCE_UPSCALE, Enhancement, LUMA_THRESHOLD};
pub use text::TextRenderer;

/// Canvas size the layout numbers below are written for.
const REFERENCE_SIZE: f32 = 1200.0;

const BASE_COLORS: [[u8; 3]; 4] = [
    [250, 250, 250],
    [245, 248, 255],
    [255, 250, 245],
    [250, 255, 250],
];
const BADGE_TEXTS: [&str; 4] = ["20% OFF", "NEW", "BESTSELLER", "LIMITED"];
const BADGE_COLOR: Rgba<u8> = Rgba([255, 80, 60, 230]);
const PILL_COLOR: Rgba<u8> = Rgba([255, 255, 255, 220]);
const HEADLINE_SHADOW: Rgba<u8> = Rgba([0, 0, 0, 90]);
const HEADLINE_COLOR: Rgba<u8> = Rgba([255, 255, 255, 255]);
const SUBHEADLINE_COLOR: Rgba<u8> = Rgba([245, 245, 245, 255]);
const BLOOMS: [(u32, u8); 3] = [(2, 18), (3, 12), (6, 8)];

/// Everything needed to produce one set of creatives.
#[derive(Clone, Debug)]
pub struct ComposeJob<'a> {
    /// Logo image path
    pub logo_path: &'a Path,
    /// Product photo path
    pub product_path: &'a Path,
    /// Number of creatives
    pub count: usize,
    /// Edge length of each creative
    pub canvas_size: u32,
    /// Brand name used in copy
    pub brand_name: &'a str,
    /// Product name used in copy
    pub product_name: &'a str,
    /// Where creatives and `captions.txt` go
    pub output_dir: &'a Path,
}

/// One generated creative, on disk in two encodings.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Creative {
    /// Shared filename stem, eg `creative_01`
    pub stem: String,
    /// Lossless encoding filename
    pub png: String,
    /// Photographic encoding filename
    pub jpg: String,
    /// Caption written to the mapping file
    pub caption: String,
}

impl Creative {
    fn new(index: usize, caption: String) -> Self {
        let stem = format!("{CREATIVE_PREFIX}_{:02}", index + 1);
        Self {
            png: format!("{stem}.png"),
            jpg: format!("{stem}.jpg"),
            stem,
            caption,
        }
    }
}

/// Scales reference-canvas numbers to the actual canvas.
#[derive(Clone, Copy, Debug)]
struct Layout {
    size: u32,
    scale: f32,
}

impl Layout {
    fn new(size: u32) -> Self {
        Self {
            size,
            scale: size as f32 / REFERENCE_SIZE,
        }
    }

    fn f(self, reference: f32) -> f32 {
        reference * self.scale
    }

    fn i(self, reference: f32) -> i64 {
        self.f(reference).round() as i64
    }

    fn u(self, reference: f32) -> u32 {
        (self.f(reference).round() as u32).max(1)
    }

    fn of_size(self, fraction: f32) -> u32 {
        ((self.size as f32 * fraction).round() as u32).max(1)
    }
}

/// Produces creatives from a logo and a product photo.
#[derive(Clone, Debug, Default)]
pub struct Compositor {
    text: TextRenderer,
    enhancement: Enhancement,
}

impl Compositor {
    /// A compositor drawing its copy with `text`.
    pub fn new(text: TextRenderer) -> Self {
        Self {
            text,
            enhancement: Enhancement::default(),
        }
    }

    /// Runs `job` with the thread RNG.
    pub fn compose(&self, job: &ComposeJob<'_>) -> Result<Vec<Creative>, MorpherError> {
        self.compose_with_rng(job, &mut rand::rng())
    }

    /// Writes `job.count` creatives plus `captions.txt` into `job.output_dir`.
    ///
    /// Any failure aborts the whole batch.
    pub fn compose_with_rng<R: Rng + ?Sized>(
        &self,
        job: &ComposeJob<'_>,
        rng: &mut R,
    ) -> Result<Vec<Creative>, MorpherError> {
        std::fs::create_dir_all(job.output_dir).map_err(|err| {
            MorpherError::Composition(format!(
                "Failed to create {}: {err}",
                job.output_dir.display()
            ))
        })?;
        let logo = load_input(job.logo_path, "Logo")?;
        let product = load_input(job.product_path, "Product image")?;

        let layout = Layout::new(job.canvas_size);
        let subject = self.prepare_subject(&product, layout);
        debug!(
            "Prepared subject {}x{} for {} creatives",
            subject.width(),
            subject.height(),
            job.count
        );

        let mut creatives = Vec::with_capacity(job.count);
        for index in 0..job.count {
            let canvas = self.render_creative(
                &logo,
                &subject,
                layout,
                job.brand_name,
                job.product_name,
                rng,
            );
            let caption = random_caption(rng, job.brand_name, job.product_name);
            let creative = Creative::new(index, caption);
            export(canvas, job.output_dir, &creative)?;
            creatives.push(creative);
        }

        let entries: Vec<CaptionEntry> = creatives
            .iter()
            .map(|creative| CaptionEntry::new(creative.jpg.clone(), &creative.caption))
            .collect();
        write_caption_file(job.output_dir, &entries).map_err(|err| {
            MorpherError::Composition(format!("Failed to write captions: {err}"))
        })?;

        info!(
            "Wrote {} creatives to {}",
            creatives.len(),
            job.output_dir.display()
        );
        Ok(creatives)
    }

    /// Crop, minimum size, enhance, then fit into 62% of the canvas.
    fn prepare_subject(&self, product: &RgbaImage, layout: Layout) -> RgbaImage {
        let cropped = subject::autocrop_to_subject(product, LUMA_THRESHOLD);
        let cropped = subject::ensure_min_side(cropped, layout.u(240.0));
        let enhanced = subject::enhance(&cropped, ENHANCE_UPSCALE, self.enhancement);
        let (w, h) = subject::fit_dimensions(
            enhanced.width(),
            enhanced.height(),
            layout.of_size(0.62),
            layout.u(120.0),
        );
        imageops::resize(&enhanced, w, h, FilterType::Lanczos3)
    }

    fn render_creative<R: Rng + ?Sized>(
        &self,
        logo: &RgbaImage,
        subject: &RgbaImage,
        layout: Layout,
        brand: &str,
        product: &str,
        rng: &mut R,
    ) -> RgbaImage {
        let mut canvas = background(layout, rng);

        let size = i64::from(layout.size);
        let px = (size - i64::from(subject.width())) / 2
            + layout.i(rng.random_range(-20..=20) as f32);
        let py = (size as f32 * 0.36) as i64 - i64::from(subject.height()) / 2
            + layout.i(rng.random_range(-20..=20) as f32);
        let shadow = ShadowStyle {
            blur: layout.f(18.0),
            spread: layout.u(4.0),
            offset: (layout.i(12.0), layout.i(18.0)),
            alpha: 150,
        };
        paste_with_soft_shadow(&mut canvas, subject, px, py, shadow);

        self.draw_logo_pill(&mut canvas, logo, layout);
        self.draw_headline(&mut canvas, layout, brand, product, rng);
        if rng.random_bool(0.5) {
            self.draw_badge(&mut canvas, layout, rng);
        }
        apply_vignette(&mut canvas, 80, layout.f(200.0));
        canvas
    }

    fn draw_logo_pill(&self, canvas: &mut RgbaImage, logo: &RgbaImage, layout: Layout) {
        let logo_w = layout.of_size(0.12);
        let ratio = logo.width() as f32 / logo.height().max(1) as f32;
        let logo_h = ((logo_w as f32 / ratio) as u32).max(1);
        let small = imageops::resize(logo, logo_w, logo_h, FilterType::Lanczos3);

        let (lx, ly) = (layout.i(36.0), layout.i(36.0));
        let pill = rounded_rect(
            logo_w + layout.u(18.0),
            logo_h + layout.u(12.0),
            layout.u(12.0),
            PILL_COLOR,
        );
        imageops::overlay(canvas, &pill, lx - layout.i(8.0), ly - layout.i(6.0));
        imageops::overlay(canvas, &small, lx, ly);
    }

    fn draw_headline<R: Rng + ?Sized>(
        &self,
        canvas: &mut RgbaImage,
        layout: Layout,
        brand: &str,
        product: &str,
        rng: &mut R,
    ) {
        let headlines = [
            format!("Introducing {product}"),
            format!("{brand} presents {product}"),
            format!("{product} — Now available"),
            format!("Meet the new {product}"),
        ];
        let subheadlines = [
            format!("Shop now • {brand}"),
            format!("Limited offer • {brand}"),
            format!("Free shipping • {brand}"),
        ];
        let headline = headlines.choose(rng).map(String::as_str).unwrap_or_default();
        let subheadline = subheadlines.choose(rng).map(String::as_str).unwrap_or_default();

        let x = layout.i(52.0) as i32;
        let y = (i64::from(layout.size) - layout.i(200.0)) as i32;
        let headline_px = layout.f(58.0);
        let offset = layout.i(1.0).max(1) as i32;
        self.text.draw(
            canvas,
            headline_px,
            x + offset,
            y + offset,
            HEADLINE_SHADOW,
            headline,
        );
        self.text.draw(canvas, headline_px, x, y, HEADLINE_COLOR, headline);
        self.text.draw(
            canvas,
            layout.f(30.0),
            x,
            y + layout.i(62.0) as i32,
            SUBHEADLINE_COLOR,
            subheadline,
        );
    }

    fn draw_badge<R: Rng + ?Sized>(&self, canvas: &mut RgbaImage, layout: Layout, rng: &mut R) {
        let label = BADGE_TEXTS.choose(rng).copied().unwrap_or("NEW");
        let (badge_w, badge_h) = (layout.u(150.0), layout.u(56.0));
        let mut badge = rounded_rect(badge_w, badge_h, layout.u(12.0), BADGE_COLOR);

        let badge_px = layout.f(18.0);
        let (text_w, text_h) = self.text.measure(badge_px, label);
        let tx = (i64::from(badge_w) - i64::from(text_w)) / 2;
        let ty = (i64::from(badge_h) - i64::from(text_h)) / 2;
        self.text
            .draw(&mut badge, badge_px, tx as i32, ty as i32, HEADLINE_COLOR, label);

        let bx = i64::from(layout.size) - i64::from(badge_w) - layout.i(44.0);
        imageops::overlay(canvas, &badge, bx, layout.i(44.0));
    }
}

/// Pastel gradient with one to three white blooms.
fn background<R: Rng + ?Sized>(layout: Layout, rng: &mut R) -> RgbaImage {
    let top = BASE_COLORS.choose(rng).copied().unwrap_or(BASE_COLORS[0]);
    let bottom = top.map(|c| (i16::from(c) + rng.random_range(-18..=30)).clamp(0, 255) as u8);
    let mut canvas = vertical_gradient(layout.size, top, bottom);

    let size = layout.size as f32;
    let cx = (size * 0.6) as i64 + layout.i(rng.random_range(-60..=60) as f32);
    let cy = (size * 0.28) as i64 + layout.i(rng.random_range(-40..=40) as f32);
    let blooms = rng.random_range(1..=BLOOMS.len());
    for (divisor, alpha) in BLOOMS.iter().take(blooms) {
        fill_circle(
            &mut canvas,
            cx,
            cy,
            layout.size / divisor,
            Rgba([255, 255, 255, *alpha]),
        );
    }
    canvas
}

fn load_input(path: &Path, what: &str) -> Result<RgbaImage, MorpherError> {
    if !path.exists() {
        return Err(MorpherError::MissingInput(format!(
            "{what} not found: {}",
            path.display()
        )));
    }
    let unreadable = |err: &dyn std::fmt::Display| {
        MorpherError::MissingInput(format!("{what} unreadable: {}: {err}", path.display()))
    };
    // sanitised upload names can lose their extension, so sniff the format
    ImageReader::open(path)
        .and_then(ImageReader::with_guessed_format)
        .map_err(|err| unreadable(&err))?
        .decode()
        .map(|img| img.to_rgba8())
        .map_err(|err| unreadable(&err))
}

fn export(canvas: RgbaImage, dir: &Path, creative: &Creative) -> Result<(), MorpherError> {
    let flat: RgbImage = DynamicImage::ImageRgba8(canvas).to_rgb8();
    let png_path = dir.join(&creative.png);
    flat.save_with_format(&png_path, ImageFormat::Png)?;

    let jpg_path: PathBuf = dir.join(&creative.jpg);
    let file = std::fs::File::create(&jpg_path).map_err(|err| {
        MorpherError::Composition(format!("Failed to create {}: {err}", jpg_path.display()))
    })?;
    let mut writer = BufWriter::new(file);
    JpegEncoder::new_with_quality(&mut writer, JPEG_QUALITY).encode_image(&flat)?;
    writer.flush().map_err(|err| {
        MorpherError::Composition(format!("Failed to write {}: {err}", jpg_path.display()))
    })?;
    Ok(())
}
