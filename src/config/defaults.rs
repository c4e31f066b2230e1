/// Configuration default values
///
/// This module contains all the default values for configuration options,
/// making them easily changeable in one central location.
// Sprite budget defaults
// The host atlas holds roughly 1000 images shared with other layers, so the
// cache's own ceiling sits below that.
pub const DEFAULT_SPRITE_CAPACITY: usize = 900;
pub const DEFAULT_SPRITE_RESERVE: usize = 1;
pub const DEFAULT_SPRITE_ID_PREFIX: &str = "marker-label-composite-";
pub const DEFAULT_MIN_ZOOM: f64 = 8.0;
pub const DEFAULT_MAX_AWAITED_PER_BATCH: usize = 600;
pub const DEFAULT_FALLBACK_ICON_KEY: &str = "multi-post-icon";

// Layout defaults
pub const DEFAULT_COMPACT_WIDTH: u32 = 150;
pub const DEFAULT_COMPACT_HEIGHT: u32 = 40;
pub const DEFAULT_EMPHASIZED_WIDTH: u32 = 225;
pub const DEFAULT_EMPHASIZED_HEIGHT: u32 = 60;
pub const DEFAULT_COMPACT_ICON_SIZE: u32 = 30;
pub const DEFAULT_EMPHASIZED_ICON_SIZE: u32 = 50;
pub const DEFAULT_FONT_FAMILY: &str = "system-ui";
pub const DEFAULT_FONT_WEIGHT: f32 = 600.0;
pub const DEFAULT_FONT_SIZE: f32 = 12.0;
pub const DEFAULT_LINE_HEIGHT_MULTIPLIER: f32 = 1.2;
pub const DEFAULT_ELLIPSIS_GLYPH: &str = "\u{2026}";
pub const DEFAULT_MAX_LINES: usize = 2;
pub const DEFAULT_TEXT_COLOR: [u8; 4] = [255, 255, 255, 255];
pub const DEFAULT_PLACEHOLDER_COLOR: [u8; 4] = [102, 102, 102, 255];

// Asset defaults
pub const DEFAULT_ASSET_REQUEST_TIMEOUT: &str = "10s";
