//! Raster primitives used by the compositing engine

use image::imageops::{self, FilterType};
use image::{Pixel, Rgba, RgbaImage};

use crate::config::Size;
use crate::errors::{CompositeError, CompositeResult};

/// Resample `src` to exactly `width` x `height`
pub fn scale_to(src: &RgbaImage, width: u32, height: u32) -> RgbaImage {
    if src.dimensions() == (width, height) {
        return src.clone();
    }
    imageops::resize(src, width, height, FilterType::Triangle)
}

/// Draw `background` stretched over the whole canvas
pub fn draw_background(canvas: &mut RgbaImage, background: &RgbaImage) -> CompositeResult<()> {
    if background.width() == 0 || background.height() == 0 {
        return Err(CompositeError::draw(
            "background",
            format!(
                "background raster is {}x{}",
                background.width(),
                background.height()
            ),
        ));
    }
    let scaled = scale_to(background, canvas.width(), canvas.height());
    imageops::overlay(canvas, &scaled, 0, 0);
    Ok(())
}

/// Side length an icon is drawn at: never larger than its native size
pub fn icon_draw_size(icon: &RgbaImage, slot: u32) -> u32 {
    slot.min(icon.width()).min(icon.height())
}

fn prepared_icon(icon: &RgbaImage, slot: u32) -> CompositeResult<RgbaImage> {
    let size = icon_draw_size(icon, slot);
    if size == 0 {
        return Err(CompositeError::draw(
            "icon",
            format!("icon raster is {}x{}", icon.width(), icon.height()),
        ));
    }
    Ok(scale_to(icon, size, size))
}

/// Square icon with its left edge at `x`, vertically centred on `center_y`
pub fn draw_square_icon(
    canvas: &mut RgbaImage,
    icon: &RgbaImage,
    x: f32,
    center_y: f32,
    slot: u32,
) -> CompositeResult<()> {
    let scaled = prepared_icon(icon, slot)?;
    let top = (center_y - scaled.height() as f32 / 2.0).round() as i64;
    imageops::overlay(canvas, &scaled, x.round() as i64, top);
    Ok(())
}

/// Icon clipped to a circle of diameter `slot` centred on (`center_x`, `center_y`)
pub fn draw_round_icon(
    canvas: &mut RgbaImage,
    icon: &RgbaImage,
    center_x: f32,
    center_y: f32,
    slot: u32,
) -> CompositeResult<()> {
    let scaled = prepared_icon(icon, slot)?;
    let radius = slot as f32 / 2.0;
    let left = center_x - scaled.width() as f32 / 2.0;
    let top = center_y - scaled.height() as f32 / 2.0;
    let (canvas_w, canvas_h) = canvas.dimensions();

    for (px, py, pixel) in scaled.enumerate_pixels() {
        let cx = left.round() as i64 + i64::from(px);
        let cy = top.round() as i64 + i64::from(py);
        if cx < 0 || cy < 0 || cx >= i64::from(canvas_w) || cy >= i64::from(canvas_h) {
            continue;
        }
        let dx = cx as f32 + 0.5 - center_x;
        let dy = cy as f32 + 0.5 - center_y;
        if dx * dx + dy * dy > radius * radius {
            continue;
        }
        canvas.get_pixel_mut(cx as u32, cy as u32).blend(pixel);
    }
    Ok(())
}

/// Paint `color` over the opaque parts of `raster` (source-atop), keeping alpha
pub fn tint_source_atop(raster: &RgbaImage, color: Rgba<u8>, strength: f32) -> RgbaImage {
    let strength = strength.clamp(0.0, 1.0);
    let mut out = raster.clone();
    for pixel in out.pixels_mut() {
        if pixel[3] == 0 {
            continue;
        }
        for channel in 0..3 {
            let base = f32::from(pixel[channel]);
            let tint = f32::from(color[channel]);
            pixel[channel] = (base + (tint - base) * strength).round() as u8;
        }
    }
    out
}

/// Solid square, used as the last-resort icon
pub fn solid_square(size: u32, color: Rgba<u8>) -> RgbaImage {
    RgbaImage::from_pixel(size, size, color)
}

/// Rounded pill shape (corner radius = half the height)
pub fn pill_shape(size: Size, color: Rgba<u8>) -> RgbaImage {
    let mut out = RgbaImage::new(size.width, size.height);
    let radius = size.height as f32 / 2.0;
    let left_center = radius;
    let right_center = size.width as f32 - radius;

    for (x, y, pixel) in out.enumerate_pixels_mut() {
        let fx = x as f32 + 0.5;
        let fy = y as f32 + 0.5;
        let nearest_x = fx.clamp(left_center, right_center.max(left_center));
        let dx = fx - nearest_x;
        let dy = fy - radius;
        if dx * dx + dy * dy <= radius * radius {
            *pixel = color;
        }
    }
    out
}
