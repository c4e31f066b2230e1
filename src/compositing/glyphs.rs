//! Label text shaped with parley and rasterized with swash
//!
//! Font discovery, shaping and glyph scaling need mutable scratch contexts, so
//! they sit behind one lock shared by every composite.

use image::{Pixel, Rgba, RgbaImage};
use parley::layout::{Alignment, GlyphRun, Layout};
use parley::style::{FontStack, FontWeight, StyleProperty};
use parley::{FontContext, LayoutContext};
use std::sync::{Mutex, PoisonError};
use swash::scale::image::{Content, Image as GlyphImage};
use swash::scale::{Render, ScaleContext, Source, StrikeWith};
use swash::zeno::{Format, Vector};
use swash::{FontRef, GlyphId, NormalizedCoord};
use tracing::trace;

use super::text::TextPainter;
use crate::config::LayoutConfig;
use crate::errors::CompositeResult;

type Brush = [u8; 4];

struct Contexts {
    fonts: FontContext,
    layouts: LayoutContext<Brush>,
    scaler: ScaleContext,
}

/// Text painter backed by the system font collection
pub struct ParleyTextPainter {
    family: String,
    weight: f32,
    contexts: Mutex<Contexts>,
}

impl ParleyTextPainter {
    /// `family` is a CSS-style font stack such as `"Inter, system-ui"`
    pub fn new(family: impl Into<String>, weight: f32) -> Self {
        Self {
            family: family.into(),
            weight,
            contexts: Mutex::new(Contexts {
                fonts: FontContext::default(),
                layouts: LayoutContext::new(),
                scaler: ScaleContext::new(),
            }),
        }
    }

    pub fn from_layout(layout: &LayoutConfig) -> Self {
        Self::new(layout.font_family.clone(), layout.font_weight)
    }

    /// Shape `text` as a single unwrapped line
    fn shape(&self, cx: &mut Contexts, text: &str, font_size: f32, color: Brush) -> Layout<Brush> {
        let mut builder = cx.layouts.ranged_builder(&mut cx.fonts, text, 1.0);
        builder.push_default(&StyleProperty::Brush(color));
        builder.push_default(&StyleProperty::FontStack(FontStack::Source(&self.family)));
        builder.push_default(&StyleProperty::FontWeight(FontWeight::new(self.weight)));
        builder.push_default(&StyleProperty::FontSize(font_size));
        builder.push_default(&StyleProperty::LineHeight(1.0));

        let mut layout: Layout<Brush> = builder.build();
        layout.break_all_lines(None, Alignment::Start);
        layout
    }
}

impl TextPainter for ParleyTextPainter {
    fn measure(&self, text: &str, font_size: f32) -> f32 {
        if text.is_empty() {
            return 0.0;
        }
        let mut cx = self.contexts.lock().unwrap_or_else(PoisonError::into_inner);
        self.shape(&mut cx, text, font_size, Brush::default()).width()
    }

    fn fill_text(
        &self,
        canvas: &mut RgbaImage,
        text: &str,
        x: f32,
        y: f32,
        font_size: f32,
        color: Rgba<u8>,
    ) -> CompositeResult<()> {
        if text.is_empty() {
            return Ok(());
        }
        let mut cx = self.contexts.lock().unwrap_or_else(PoisonError::into_inner);
        let layout = self.shape(&mut cx, text, font_size, color.0);

        let mut drawn = 0;
        for line in layout.lines() {
            for glyph_run in line.glyph_runs() {
                drawn += render_glyph_run(&mut cx.scaler, &glyph_run, canvas, x, y);
            }
        }
        trace!("Painted {} glyphs for '{}'", drawn, text);
        Ok(())
    }
}

/// Rasterize one run with its layout origin at (`origin_x`, `origin_y`)
fn render_glyph_run(
    scaler: &mut ScaleContext,
    glyph_run: &GlyphRun<'_, Brush>,
    canvas: &mut RgbaImage,
    origin_x: f32,
    origin_y: f32,
) -> usize {
    let mut run_x = origin_x + glyph_run.offset();
    let run_y = origin_y + glyph_run.baseline();
    let color = glyph_run.style().brush;

    let run = glyph_run.run();
    let font = run.font();
    let font_size = run.font_size();
    let normalized_coords = run.normalized_coords();
    let Some(font_ref) = FontRef::from_index(font.data.as_ref(), font.index as usize) else {
        return 0;
    };

    let mut drawn = 0;
    for glyph in glyph_run.glyphs() {
        let glyph_x = run_x + glyph.x;
        let glyph_y = run_y - glyph.y;
        run_x += glyph.advance;

        let Some(rendered) = render_glyph(
            scaler,
            &font_ref,
            font_size,
            normalized_coords,
            glyph.id,
            glyph_x,
            glyph_y,
        ) else {
            continue;
        };

        let left = glyph_x.floor() as i32 + rendered.placement.left;
        let top = glyph_y.floor() as i32 - rendered.placement.top;
        blit_glyph(canvas, &rendered, left, top, color);
        drawn += 1;
    }
    drawn
}

fn render_glyph(
    scaler: &mut ScaleContext,
    font: &FontRef<'_>,
    font_size: f32,
    normalized_coords: &[NormalizedCoord],
    glyph_id: GlyphId,
    x: f32,
    y: f32,
) -> Option<GlyphImage> {
    let mut scaler = scaler
        .builder(*font)
        .size(font_size)
        .hint(true)
        .normalized_coords(normalized_coords)
        .build();

    Render::new(&[
        Source::ColorOutline(0),
        Source::ColorBitmap(StrikeWith::BestFit),
        Source::Outline,
    ])
    .format(Format::Alpha)
    .offset(Vector::new(x.fract(), y.fract()))
    .render(&mut scaler, glyph_id)
}

/// Blend a rasterized glyph into the canvas, clipping at the edges
fn blit_glyph(canvas: &mut RgbaImage, glyph: &GlyphImage, left: i32, top: i32, color: Brush) {
    let width = glyph.placement.width as usize;
    if width == 0 {
        return;
    }
    let (canvas_w, canvas_h) = canvas.dimensions();
    let mut put = |off_x: usize, off_y: usize, pixel: Rgba<u8>| {
        let px = left + off_x as i32;
        let py = top + off_y as i32;
        if px >= 0 && py >= 0 && (px as u32) < canvas_w && (py as u32) < canvas_h {
            canvas.get_pixel_mut(px as u32, py as u32).blend(&pixel);
        }
    };

    match glyph.content {
        Content::Mask => {
            for (off_y, row) in glyph.data.chunks_exact(width).enumerate() {
                for (off_x, &coverage) in row.iter().enumerate() {
                    if coverage == 0 {
                        continue;
                    }
                    let alpha = (u16::from(coverage) * u16::from(color[3]) / 255) as u8;
                    put(off_x, off_y, Rgba([color[0], color[1], color[2], alpha]));
                }
            }
        }
        Content::Color => {
            for (off_y, row) in glyph.data.chunks_exact(width * 4).enumerate() {
                for (off_x, rgba) in row.chunks_exact(4).enumerate() {
                    put(off_x, off_y, Rgba([rgba[0], rgba[1], rgba[2], rgba[3]]));
                }
            }
        }
        // Alpha format never yields subpixel masks
        Content::SubpixelMask => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use swash::scale::image::Image;
    use swash::zeno::Placement;

    fn mask(width: u32, height: u32, coverage: u8) -> Image {
        let mut glyph = Image::new();
        glyph.placement = Placement {
            left: 0,
            top: 0,
            width,
            height,
        };
        glyph.content = Content::Mask;
        glyph.data = vec![coverage; (width * height) as usize];
        glyph
    }

    #[test]
    fn test_blit_glyph_tints_mask_with_text_color() {
        let mut canvas = RgbaImage::new(4, 4);
        blit_glyph(&mut canvas, &mask(2, 2, 255), 1, 1, [255, 255, 255, 255]);

        assert_eq!(*canvas.get_pixel(1, 1), Rgba([255, 255, 255, 255]));
        assert_eq!(*canvas.get_pixel(2, 2), Rgba([255, 255, 255, 255]));
        assert_eq!(canvas.get_pixel(0, 0)[3], 0);
        assert_eq!(canvas.get_pixel(3, 3)[3], 0);
    }

    #[test]
    fn test_blit_glyph_clips_at_canvas_edges() {
        let mut canvas = RgbaImage::new(3, 3);
        blit_glyph(&mut canvas, &mask(4, 4, 255), -2, 1, [255, 0, 0, 255]);

        assert_eq!(canvas.get_pixel(0, 1)[0], 255);
        assert_eq!(canvas.get_pixel(1, 2)[0], 255);
        assert_eq!(canvas.get_pixel(2, 0)[3], 0);
    }

    #[test]
    fn test_blit_glyph_skips_empty_coverage() {
        let mut canvas = RgbaImage::from_pixel(2, 2, Rgba([0, 0, 0, 255]));
        blit_glyph(&mut canvas, &mask(2, 2, 0), 0, 0, [255, 255, 255, 255]);
        assert!(canvas.pixels().all(|p| *p == Rgba([0, 0, 0, 255])));
    }

    #[test]
    fn test_empty_text_measures_zero_and_paints_nothing() {
        let painter = ParleyTextPainter::new("system-ui", 600.0);
        assert_eq!(painter.measure("", 12.0), 0.0);

        let mut canvas = RgbaImage::new(10, 10);
        painter
            .fill_text(&mut canvas, "", 0.0, 0.0, 12.0, Rgba([255, 255, 255, 255]))
            .unwrap();
        assert!(canvas.pixels().all(|p| p[3] == 0));
    }

    // Hosts without any installed font shape to zero-width layouts; the
    // comparisons below only apply when a face was found.
    #[test]
    fn test_measure_reflects_glyph_advances() {
        let painter = ParleyTextPainter::new("system-ui", 600.0);
        let wide = painter.measure("WWWW", 12.0);
        if wide == 0.0 {
            return;
        }
        assert!(painter.measure("iiii", 12.0) < wide);
        assert!(painter.measure("WWWW", 24.0) > wide);
    }

    #[test]
    fn test_different_labels_paint_different_rasters() {
        let painter = ParleyTextPainter::new("system-ui", 600.0);
        if painter.measure("Farmers Market", 12.0) == 0.0 {
            return;
        }
        let white = Rgba([255, 255, 255, 255]);
        let mut first = RgbaImage::new(150, 40);
        let mut second = RgbaImage::new(150, 40);
        painter
            .fill_text(&mut first, "Farmers Market", 4.0, 6.0, 12.0, white)
            .unwrap();
        painter
            .fill_text(&mut second, "Xxxxxxx Qqqqqq", 4.0, 6.0, 12.0, white)
            .unwrap();

        assert!(first.pixels().any(|p| p[3] > 0));
        assert_ne!(first, second);
    }
}
