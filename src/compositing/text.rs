//! Label fitting and the text painting seam
//!
//! The compositing engine only needs to measure strings and ask for them to be
//! painted at a position. Shaping and rasterization live in `glyphs`.

use image::{Rgba, RgbaImage};

use crate::errors::CompositeResult;

/// Measures and paints single lines of text
pub trait TextPainter: Send + Sync {
    /// Advance width of `text` in pixels
    fn measure(&self, text: &str, font_size: f32) -> f32;

    /// Paint `text` with its top-left corner at (`x`, `y`)
    fn fill_text(
        &self,
        canvas: &mut RgbaImage,
        text: &str,
        x: f32,
        y: f32,
        font_size: f32,
        color: Rgba<u8>,
    ) -> CompositeResult<()>;
}

/// Split a label on embedded line breaks, keeping at most `max_lines` lines
///
/// Lines are trimmed; a blank line still uses up one of the `max_lines`
/// slots but produces no output.
pub fn label_lines(text: &str, max_lines: usize) -> Vec<&str> {
    text.split('\n')
        .take(max_lines)
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect()
}

/// Truncate `line` with `ellipsis` until it fits `max_width`
///
/// Characters are dropped from the end one at a time and the candidate is
/// re-measured after each drop.
pub fn fit_line(
    painter: &dyn TextPainter,
    line: &str,
    max_width: f32,
    font_size: f32,
    ellipsis: &str,
) -> String {
    if painter.measure(line, font_size) <= max_width {
        return line.to_string();
    }

    let mut kept: Vec<char> = line.chars().collect();
    loop {
        let mut candidate: String = kept.iter().collect();
        candidate.push_str(ellipsis);
        if kept.is_empty() || painter.measure(&candidate, font_size) <= max_width {
            return candidate;
        }
        kept.pop();
    }
}

/// Test double with fixed advances
#[cfg(test)]
pub(crate) mod block {
    use image::{Pixel, Rgba, RgbaImage};

    use super::TextPainter;
    use crate::errors::CompositeResult;

    /// Fixed-advance painter that draws each glyph as a solid block
    #[derive(Debug, Clone, Copy)]
    pub struct BlockTextPainter {
        /// Advance per character as a fraction of the font size
        pub advance_ratio: f32,
    }

    impl Default for BlockTextPainter {
        fn default() -> Self {
            Self { advance_ratio: 0.6 }
        }
    }

    impl BlockTextPainter {
        fn advance(&self, font_size: f32) -> f32 {
            font_size * self.advance_ratio
        }
    }

    impl TextPainter for BlockTextPainter {
        fn measure(&self, text: &str, font_size: f32) -> f32 {
            text.chars().count() as f32 * self.advance(font_size)
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
            let advance = self.advance(font_size);
            let (width, height) = canvas.dimensions();
            let top = (y + font_size * 0.2).round().max(0.0) as u32;
            let bottom = ((y + font_size * 0.9).round().max(0.0) as u32).min(height);

            for (i, ch) in text.chars().enumerate() {
                if ch.is_whitespace() {
                    continue;
                }
                let left = x + i as f32 * advance;
                let x0 = (left + 1.0).round().max(0.0) as u32;
                let x1 = ((left + advance - 1.0).round().max(0.0) as u32).min(width);
                for py in top..bottom {
                    for px in x0..x1.max(x0 + 1).min(width) {
                        canvas.get_pixel_mut(px, py).blend(&color);
                    }
                }
            }
            Ok(())
        }
    }
}

#[cfg(test)]
pub(crate) use block::BlockTextPainter;
