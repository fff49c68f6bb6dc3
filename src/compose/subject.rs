//! Product subject preparation: crop to the subject, enhance, fit to the canvas.

use image::imageops::{self, FilterType};
use image::{Rgba, RgbaImage};

use super::draw::bounding_box;

/// Luminance margin below white that counts as subject on opaque photos.
pub const LUMA_THRESHOLD: u8 = 10;

/// Upscale factor applied before enhancement.
pub const ENHANCE_UPSCALE: f32 = 1.25;

/// Colour/contrast/brightness/sharpness factors, 1.0 meaning unchanged.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Enhancement {
    /// Saturation factor
    pub color: f32,
    /// Contrast factor
    pub contrast: f32,
    /// Brightness factor
    pub brightness: f32,
    /// Sharpness factor
    pub sharpness: f32,
}

impl Default for Enhancement {
    fn default() -> Self {
        Self {
            color: 1.05,
            contrast: 1.08,
            brightness: 1.02,
            sharpness: 1.2,
        }
    }
}

fn luma(pixel: &Rgba<u8>) -> f32 {
    // ITU-R 601-2
    0.299 * f32::from(pixel[0]) + 0.587 * f32::from(pixel[1]) + 0.114 * f32::from(pixel[2])
}

fn clamp_u8(value: f32) -> u8 {
    value.round().clamp(0.0, 255.0) as u8
}

/// Crop rectangle `(x, y, w, h)` around the subject.
///
/// Uses the alpha channel when the image has any transparency, otherwise treats
/// near-white pixels as background. With nothing found, a centred square.
pub fn subject_bounds(img: &RgbaImage, threshold: u8) -> (u32, u32, u32, u32) {
    let has_transparency = img.pixels().any(|p| p[3] < 255);
    let found = if has_transparency {
        bounding_box(img, |p| p[3] > 0)
    } else {
        let cutoff = f32::from(255 - threshold);
        bounding_box(img, |p| luma(p) < cutoff)
    };
    found.unwrap_or_else(|| {
        let (w, h) = img.dimensions();
        let side = w.min(h);
        ((w - side) / 2, (h - side) / 2, side, side)
    })
}

/// Crops `img` to [`subject_bounds`].
pub fn autocrop_to_subject(img: &RgbaImage, threshold: u8) -> RgbaImage {
    let (x, y, w, h) = subject_bounds(img, threshold);
    imageops::crop_imm(img, x, y, w, h).to_image()
}

/// Scales up so the shorter side is at least `min_side`, keeping the aspect ratio.
pub fn ensure_min_side(img: RgbaImage, min_side: u32) -> RgbaImage {
    let (w, h) = img.dimensions();
    let shorter = w.min(h).max(1);
    if shorter >= min_side {
        return img;
    }
    let factor = min_side as f32 / shorter as f32;
    let new_w = ((w as f32 * factor).round() as u32).max(1);
    let new_h = ((h as f32 * factor).round() as u32).max(1);
    imageops::resize(&img, new_w, new_h, FilterType::Lanczos3)
}

/// Upscales, applies `enhancement`, then resamples back to the original size.
pub fn enhance(img: &RgbaImage, upscale: f32, enhancement: Enhancement) -> RgbaImage {
    let (w, h) = img.dimensions();
    let up_w = ((w as f32 * upscale) as u32).max(1);
    let up_h = ((h as f32 * upscale) as u32).max(1);
    let mut work = imageops::resize(img, up_w, up_h, FilterType::Lanczos3);

    adjust_color(&mut work, enhancement.color);
    adjust_contrast(&mut work, enhancement.contrast);
    adjust_brightness(&mut work, enhancement.brightness);
    let work = adjust_sharpness(&work, enhancement.sharpness);

    imageops::resize(&work, w, h, FilterType::Lanczos3)
}

/// Blend away from greyscale.
fn adjust_color(img: &mut RgbaImage, factor: f32) {
    for pixel in img.pixels_mut() {
        let grey = luma(pixel);
        for channel in 0..3 {
            pixel[channel] = clamp_u8(grey + (f32::from(pixel[channel]) - grey) * factor);
        }
    }
}

/// Blend away from the mean grey level.
fn adjust_contrast(img: &mut RgbaImage, factor: f32) {
    let count = (img.width() as f64 * img.height() as f64).max(1.0);
    let mean = (img.pixels().map(|p| f64::from(luma(p))).sum::<f64>() / count) as f32;
    let mean = mean.round();
    for pixel in img.pixels_mut() {
        for channel in 0..3 {
            pixel[channel] = clamp_u8(mean + (f32::from(pixel[channel]) - mean) * factor);
        }
    }
}

/// Blend away from black.
fn adjust_brightness(img: &mut RgbaImage, factor: f32) {
    for pixel in img.pixels_mut() {
        for channel in 0..3 {
            pixel[channel] = clamp_u8(f32::from(pixel[channel]) * factor);
        }
    }
}

/// Blend away from a smoothed copy. Border pixels are left alone.
fn adjust_sharpness(img: &RgbaImage, factor: f32) -> RgbaImage {
    const KERNEL: [[f32; 3]; 3] = [[1.0, 1.0, 1.0], [1.0, 5.0, 1.0], [1.0, 1.0, 1.0]];
    const KERNEL_SUM: f32 = 13.0;

    let (w, h) = img.dimensions();
    if w < 3 || h < 3 {
        return img.clone();
    }
    let mut out = img.clone();
    for y in 1..h - 1 {
        for x in 1..w - 1 {
            let mut smooth = [0.0_f32; 3];
            for (ky, row) in KERNEL.iter().enumerate() {
                for (kx, weight) in row.iter().enumerate() {
                    let sample = img.get_pixel(x + kx as u32 - 1, y + ky as u32 - 1);
                    for (channel, acc) in smooth.iter_mut().enumerate() {
                        *acc += f32::from(sample[channel]) * weight;
                    }
                }
            }
            let original = img.get_pixel(x, y);
            let target = out.get_pixel_mut(x, y);
            for (channel, sum) in smooth.iter().enumerate() {
                let blurred = sum / KERNEL_SUM;
                target[channel] =
                    clamp_u8(blurred + (f32::from(original[channel]) - blurred) * factor);
            }
        }
    }
    out
}

/// Target size when fitting a `w`×`h` subject into a `max_side` box; the longer
/// side becomes `max_side`, the other is kept at or above `min_side`.
pub fn fit_dimensions(w: u32, h: u32, max_side: u32, min_side: u32) -> (u32, u32) {
    let ratio = w as f32 / h.max(1) as f32;
    let min_side = min_side.min(max_side);
    if w >= h {
        let new_h = ((max_side as f32 / ratio) as u32).max(min_side);
        (max_side, new_h)
    } else {
        let new_w = ((max_side as f32 * ratio) as u32).max(min_side);
        (new_w, max_side)
    }
}
