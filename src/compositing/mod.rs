//! Compositing engine
//!
//! Draws a background pill, an icon and up to two label lines onto a canvas
//! whose size is fixed by the variant's size class.

pub mod draw;
pub mod engine;
pub mod glyphs;
pub mod layout;
pub mod renderer;
pub mod text;

pub use engine::Compositor;
pub use glyphs::ParleyTextPainter;
pub use layout::CompositeLayout;
pub use renderer::{AssetCompositor, SpriteRenderer};
pub use text::{fit_line, label_lines, TextPainter};
