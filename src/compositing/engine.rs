//! Background + icon + label compositing onto an offscreen raster

use image::{Rgba, RgbaImage};
use std::sync::Arc;
use tracing::warn;

use super::draw;
use super::layout::CompositeLayout;
use super::text::{fit_line, label_lines, TextPainter};
use crate::config::LayoutConfig;
use crate::errors::{CompositeError, CompositeResult};
use crate::sprites::key::SpriteVariant;

/// Draws composites according to the configured size-class layouts
#[derive(Clone)]
pub struct Compositor {
    layout: LayoutConfig,
    painter: Arc<dyn TextPainter>,
}

impl std::fmt::Debug for Compositor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Compositor")
            .field("layout", &self.layout)
            .finish_non_exhaustive()
    }
}

impl Compositor {
    pub fn new(layout: LayoutConfig, painter: Arc<dyn TextPainter>) -> Self {
        Self { layout, painter }
    }

    pub fn layout_for(&self, variant: SpriteVariant) -> CompositeLayout {
        CompositeLayout::for_class(variant.size_class(), &self.layout)
    }

    /// Build one composite
    ///
    /// The background is mandatory; a failing icon or label step is logged and
    /// skipped. Output dimensions depend only on the variant's size class.
    pub fn composite(
        &self,
        variant: SpriteVariant,
        background: Option<&RgbaImage>,
        label_text: &str,
        icon: Option<&RgbaImage>,
    ) -> CompositeResult<RgbaImage> {
        let layout = self.layout_for(variant);
        let background = background.ok_or_else(|| CompositeError::MissingBackground {
            variant: variant.to_string(),
        })?;

        let mut canvas = RgbaImage::new(layout.width, layout.height);
        draw::draw_background(&mut canvas, background)?;

        if let Some(icon) = icon {
            let drawn = if layout.round_icon {
                draw::draw_round_icon(
                    &mut canvas,
                    icon,
                    layout.icon_center_x(),
                    layout.icon_center_y,
                    layout.icon_size,
                )
            } else {
                draw::draw_square_icon(
                    &mut canvas,
                    icon,
                    layout.icon_x,
                    layout.icon_center_y,
                    layout.icon_size,
                )
            };
            if let Err(e) = drawn {
                warn!(variant = %variant, error = %e, "Skipping icon in composite");
            }
        }

        if !label_text.is_empty() {
            if let Err(e) = self.draw_label(&mut canvas, &layout, label_text) {
                warn!(variant = %variant, error = %e, "Skipping label in composite");
            }
        }

        Ok(canvas)
    }

    fn draw_label(
        &self,
        canvas: &mut RgbaImage,
        layout: &CompositeLayout,
        label_text: &str,
    ) -> CompositeResult<()> {
        let font_size = self.layout.font_size;
        let line_height = self.layout.line_height();
        let color = Rgba(self.layout.text_color);
        let mut y = layout.label_y;

        for line in label_lines(label_text, self.layout.max_lines) {
            let fitted = fit_line(
                self.painter.as_ref(),
                line,
                layout.label_max_width,
                font_size,
                &self.layout.ellipsis_glyph,
            );
            self.painter
                .fill_text(canvas, &fitted, layout.label_x, y, font_size, color)?;
            y += line_height;
        }
        Ok(())
    }
}
