use eframe::egui::{Color32, ColorImage};
use image::DynamicImage;

use crate::{config::DiscConfig, metadata::VisualAssets};

#[derive(Debug, Clone)]
pub struct OverlayOptions {
    pub output_size: usize,
    pub hole_radius: f32,
    pub alpha: u8,
    pub thumbnail_size: u32,
}

impl OverlayOptions {
    pub fn from_config(config: &DiscConfig) -> Self {
        Self {
            output_size: config.overlay_size,
            hole_radius: config.hole_radius,
            alpha: config.overlay_alpha,
            thumbnail_size: config.thumbnail_size,
        }
    }
}

pub fn decode_cover(bytes: &[u8]) -> Result<DynamicImage, image::ImageError> {
    image::load_from_memory(bytes)
}

pub fn color_image_from(image: &DynamicImage) -> ColorImage {
    let rgba = image.to_rgba8();
    let size = [rgba.width() as usize, rgba.height() as usize];
    ColorImage::from_rgba_unmultiplied(size, rgba.as_raw())
}

pub fn build_visual_assets(cover: &DynamicImage, options: &OverlayOptions) -> VisualAssets {
    let side = options.thumbnail_size;
    let thumbnail = color_image_from(&cover.thumbnail(side, side));
    let overlay = render_overlay(&color_image_from(cover), options);
    VisualAssets { thumbnail, overlay }
}

/// Stretches the cover onto a disc of `output_size` pixels, punches the
/// spindle hole through the middle and scales every channel by `alpha`.
pub fn render_overlay(image: &ColorImage, options: &OverlayOptions) -> ColorImage {
    let size = options.output_size.max(1);
    let mut output = ColorImage::new([size, size], vec![Color32::TRANSPARENT; size * size]);

    let radius = size as f32 / 2.0;
    let hole = options.hole_radius.clamp(0.0, radius);
    let factor = options.alpha as f32 / 255.0;
    let scale_x = image.size[0] as f32 / size as f32;
    let scale_y = image.size[1] as f32 / size as f32;

    for y in 0..size {
        for x in 0..size {
            let fx = x as f32 + 0.5;
            let fy = y as f32 + 0.5;
            let r = ((fx - radius).powi(2) + (fy - radius).powi(2)).sqrt();
            if r > radius || r <= hole {
                continue;
            }

            let color = sample_bilinear(image, fx * scale_x - 0.5, fy * scale_y - 0.5);
            output.pixels[y * size + x] = Color32::from_rgba_unmultiplied(
                attenuate(color.r(), factor),
                attenuate(color.g(), factor),
                attenuate(color.b(), factor),
                attenuate(color.a(), factor),
            );
        }
    }

    output
}

fn attenuate(channel: u8, factor: f32) -> u8 {
    (channel as f32 * factor).round().clamp(0.0, 255.0) as u8
}

fn sample_bilinear(image: &ColorImage, x: f32, y: f32) -> Color32 {
    let width = image.size[0] as i32;
    let height = image.size[1] as i32;
    if width == 0 || height == 0 {
        return Color32::BLACK;
    }

    let clamped_x = x.clamp(0.0, (width - 1) as f32);
    let clamped_y = y.clamp(0.0, (height - 1) as f32);

    let x0 = clamped_x.floor() as i32;
    let y0 = clamped_y.floor() as i32;
    let x1 = (x0 + 1).min(width - 1);
    let y1 = (y0 + 1).min(height - 1);

    let tx = clamped_x - x0 as f32;
    let ty = clamped_y - y0 as f32;

    let at = |px: i32, py: i32| image.pixels[(py as usize) * image.size[0] + px as usize];

    let top = lerp_color(at(x0, y0), at(x1, y0), tx);
    let bottom = lerp_color(at(x0, y1), at(x1, y1), tx);
    lerp_color(top, bottom, ty)
}

fn lerp_color(a: Color32, b: Color32, t: f32) -> Color32 {
    let t = t.clamp(0.0, 1.0);
    let mix = |from: u8, to: u8| (from as f32 * (1.0 - t) + to as f32 * t).round() as u8;
    Color32::from_rgba_unmultiplied(
        mix(a.r(), b.r()),
        mix(a.g(), b.g()),
        mix(a.b(), b.b()),
        mix(a.a(), b.a()),
    )
}
