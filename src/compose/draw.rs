//! Raster primitives the compositor is built from.

use image::imageops;
use image::{GrayImage, Luma, Rgba, RgbaImage};

use super::text::blend_over;

/// Vertical linear gradient from `top` to `bottom`, fully opaque.
pub(crate) fn vertical_gradient(size: u32, top: [u8; 3], bottom: [u8; 3]) -> RgbaImage {
    let span = size.saturating_sub(1).max(1) as f32;
    RgbaImage::from_fn(size, size, |_, y| {
        let ratio = y as f32 / span;
        let mix = |a: u8, b: u8| (f32::from(a) * (1.0 - ratio) + f32::from(b) * ratio) as u8;
        Rgba([
            mix(top[0], bottom[0]),
            mix(top[1], bottom[1]),
            mix(top[2], bottom[2]),
            255,
        ])
    })
}

/// Blends a filled circle with a one pixel feathered rim.
pub(crate) fn fill_circle(img: &mut RgbaImage, cx: i64, cy: i64, radius: u32, color: Rgba<u8>) {
    let r = radius as f32;
    let (w, h) = (img.width() as i64, img.height() as i64);
    let reach = i64::from(radius) + 1;
    let alpha = f32::from(color[3]) / 255.0;
    for y in (cy - reach).max(0)..(cy + reach).min(h) {
        for x in (cx - reach).max(0)..(cx + reach).min(w) {
            let dx = (x - cx) as f32;
            let dy = (y - cy) as f32;
            let coverage = (r + 0.5 - (dx * dx + dy * dy).sqrt()).clamp(0.0, 1.0);
            if coverage > 0.0 {
                blend_over(img.get_pixel_mut(x as u32, y as u32), color, alpha * coverage);
            }
        }
    }
}

fn rounded_rect_contains(x: i64, y: i64, w: i64, h: i64, r: i64) -> bool {
    if r <= 0 || (x >= r && x < w - r) || (y >= r && y < h - r) {
        return true;
    }
    let cx = if x < r { r - 1 } else { w - r };
    let cy = if y < r { r - 1 } else { h - r };
    let (dx, dy) = (x - cx, y - cy);
    dx * dx + dy * dy <= r * r
}

/// A `w`×`h` tile of `color` with rounded corners, transparent outside.
pub(crate) fn rounded_rect(w: u32, h: u32, radius: u32, color: Rgba<u8>) -> RgbaImage {
    let r = i64::from(radius.min(w / 2).min(h / 2));
    RgbaImage::from_fn(w, h, |x, y| {
        if rounded_rect_contains(i64::from(x), i64::from(y), i64::from(w), i64::from(h), r) {
            color
        } else {
            Rgba([0, 0, 0, 0])
        }
    })
}

/// Grows a mask by `radius` pixels (separable max filter).
pub(crate) fn dilate(mask: &GrayImage, radius: u32) -> GrayImage {
    if radius == 0 {
        return mask.clone();
    }
    let (w, h) = mask.dimensions();
    let r = radius as i64;
    let horizontal = GrayImage::from_fn(w, h, |x, y| {
        let lo = (x as i64 - r).max(0) as u32;
        let hi = (x as i64 + r).min(w as i64 - 1) as u32;
        Luma([(lo..=hi).map(|sx| mask.get_pixel(sx, y)[0]).max().unwrap_or(0)])
    });
    GrayImage::from_fn(w, h, |x, y| {
        let lo = (y as i64 - r).max(0) as u32;
        let hi = (y as i64 + r).min(h as i64 - 1) as u32;
        Luma([(lo..=hi).map(|sy| horizontal.get_pixel(x, sy)[0]).max().unwrap_or(0)])
    })
}

/// How the drop shadow under a pasted subject looks.
#[derive(Clone, Copy, Debug)]
pub(crate) struct ShadowStyle {
    pub(crate) blur: f32,
    pub(crate) spread: u32,
    pub(crate) offset: (i64, i64),
    pub(crate) alpha: u8,
}

/// Pastes `fg` at (x, y) over a blurred, offset shadow cut from its alpha mask.
pub(crate) fn paste_with_soft_shadow(
    canvas: &mut RgbaImage,
    fg: &RgbaImage,
    x: i64,
    y: i64,
    style: ShadowStyle,
) {
    let pad = (style.blur * 3.0).ceil() as u32 + style.spread;
    let alpha_mask = GrayImage::from_fn(fg.width(), fg.height(), |px, py| {
        Luma([fg.get_pixel(px, py)[3]])
    });
    let grown = dilate(&alpha_mask, style.spread);

    let mut padded = GrayImage::new(fg.width() + pad * 2, fg.height() + pad * 2);
    imageops::replace(&mut padded, &grown, i64::from(pad), i64::from(pad));
    let blurred = if style.blur > 0.0 {
        imageops::fast_blur(&padded, style.blur)
    } else {
        padded
    };

    let shadow = RgbaImage::from_fn(blurred.width(), blurred.height(), |px, py| {
        let coverage = u16::from(blurred.get_pixel(px, py)[0]);
        Rgba([0, 0, 0, (coverage * u16::from(style.alpha) / 255) as u8])
    });
    let (ox, oy) = style.offset;
    imageops::overlay(canvas, &shadow, x + ox - i64::from(pad), y + oy - i64::from(pad));
    imageops::overlay(canvas, fg, x, y);
}

/// Darkens the canvas through a blurred elliptical mask filled at `strength`.
///
/// The ellipse spans -15%..115% of the canvas, so after blurring the middle is
/// darkened most and the corners least.
pub(crate) fn apply_vignette(canvas: &mut RgbaImage, strength: u8, blur: f32) {
    let (w, h) = canvas.dimensions();
    let (cx, cy) = (w as f32 / 2.0, h as f32 / 2.0);
    let (rx, ry) = (w as f32 * 0.65, h as f32 * 0.65);
    let mask = GrayImage::from_fn(w, h, |x, y| {
        let nx = (x as f32 + 0.5 - cx) / rx;
        let ny = (y as f32 + 0.5 - cy) / ry;
        if nx * nx + ny * ny <= 1.0 {
            Luma([strength])
        } else {
            Luma([0])
        }
    });
    let mask = if blur > 0.0 {
        imageops::fast_blur(&mask, blur)
    } else {
        mask
    };
    for (x, y, pixel) in canvas.enumerate_pixels_mut() {
        let darken = f32::from(mask.get_pixel(x, y)[0]) / 255.0;
        if darken > 0.0 {
            blend_over(pixel, Rgba([0, 0, 0, 255]), darken);
        }
    }
}

/// Bounding box `(x, y, w, h)` of pixels accepted by `keep`.
pub(crate) fn bounding_box<F>(img: &RgbaImage, keep: F) -> Option<(u32, u32, u32, u32)>
where
    F: Fn(&Rgba<u8>) -> bool,
{
    let mut bounds: Option<(u32, u32, u32, u32)> = None;
    for (x, y, pixel) in img.enumerate_pixels() {
        if !keep(pixel) {
            continue;
        }
        bounds = Some(match bounds {
            None => (x, y, x, y),
            Some((x0, y0, x1, y1)) => (x0.min(x), y0.min(y), x1.max(x), y1.max(y)),
        });
    }
    bounds.map(|(x0, y0, x1, y1)| (x0, y0, x1 - x0 + 1, y1 - y0 + 1))
}
