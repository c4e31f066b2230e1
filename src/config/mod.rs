use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use tracing::info;

pub mod defaults;

use defaults::*;

/// Width and height in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Size {
    pub width: u32,
    pub height: u32,
}

impl Size {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub sprites: SpriteConfig,
    #[serde(default)]
    pub layout: LayoutConfig,
    #[serde(default)]
    pub assets: AssetConfig,
}

/// Slot budget and batch behaviour
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpriteConfig {
    /// Maximum number of composites this cache keeps registered in the atlas
    #[serde(default = "default_capacity")]
    pub capacity: usize,
    /// Slots held back before eviction when a new composite is about to be added
    #[serde(default = "default_reserve")]
    pub reserve: usize,
    /// Namespace tag prepended to every sprite identifier
    #[serde(default = "default_id_prefix")]
    pub id_prefix: String,
    /// Below this zoom level no composites are built and existing ones are dropped
    #[serde(default = "default_min_zoom")]
    pub min_zoom: f64,
    /// Upper bound on variant handles a single batch waits for
    #[serde(default = "default_max_awaited_per_batch")]
    pub max_awaited_per_batch: usize,
    /// Icon key used for features without a subcategory
    #[serde(default = "default_fallback_icon_key")]
    pub fallback_icon_key: String,
}

/// Geometry and typography of composites
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayoutConfig {
    #[serde(default = "default_compact_size")]
    pub compact_size: Size,
    #[serde(default = "default_emphasized_size")]
    pub emphasized_size: Size,
    #[serde(default = "default_compact_icon_size")]
    pub compact_icon_size: u32,
    #[serde(default = "default_emphasized_icon_size")]
    pub emphasized_icon_size: u32,
    #[serde(default = "default_font_family")]
    pub font_family: String,
    #[serde(default = "default_font_weight")]
    pub font_weight: f32,
    #[serde(default = "default_font_size")]
    pub font_size: f32,
    #[serde(default = "default_line_height_multiplier")]
    pub line_height_multiplier: f32,
    #[serde(default = "default_ellipsis_glyph")]
    pub ellipsis_glyph: String,
    #[serde(default = "default_max_lines")]
    pub max_lines: usize,
    #[serde(default = "default_text_color")]
    pub text_color: [u8; 4],
    #[serde(default = "default_placeholder_color")]
    pub placeholder_color: [u8; 4],
}

/// Where backgrounds and icons come from
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetConfig {
    /// Background for the plain bucket (tinted before use)
    pub base_background: Option<String>,
    /// Background for the emphasized bucket; base tinted blue when absent
    pub emphasized_background: Option<String>,
    /// Background for the hover bucket; emphasized is reused when absent
    pub hover_background: Option<String>,
    /// Icon key -> URL or path
    #[serde(default)]
    pub icons: HashMap<String, String>,
    #[serde(default = "default_request_timeout")]
    pub request_timeout: String,
}

fn default_capacity() -> usize {
    DEFAULT_SPRITE_CAPACITY
}

fn default_reserve() -> usize {
    DEFAULT_SPRITE_RESERVE
}

fn default_id_prefix() -> String {
    DEFAULT_SPRITE_ID_PREFIX.to_string()
}

fn default_min_zoom() -> f64 {
    DEFAULT_MIN_ZOOM
}

fn default_max_awaited_per_batch() -> usize {
    DEFAULT_MAX_AWAITED_PER_BATCH
}

fn default_fallback_icon_key() -> String {
    DEFAULT_FALLBACK_ICON_KEY.to_string()
}

fn default_compact_size() -> Size {
    Size::new(DEFAULT_COMPACT_WIDTH, DEFAULT_COMPACT_HEIGHT)
}

fn default_emphasized_size() -> Size {
    Size::new(DEFAULT_EMPHASIZED_WIDTH, DEFAULT_EMPHASIZED_HEIGHT)
}

fn default_compact_icon_size() -> u32 {
    DEFAULT_COMPACT_ICON_SIZE
}

fn default_emphasized_icon_size() -> u32 {
    DEFAULT_EMPHASIZED_ICON_SIZE
}

fn default_font_family() -> String {
    DEFAULT_FONT_FAMILY.to_string()
}

fn default_font_weight() -> f32 {
    DEFAULT_FONT_WEIGHT
}

fn default_font_size() -> f32 {
    DEFAULT_FONT_SIZE
}

fn default_line_height_multiplier() -> f32 {
    DEFAULT_LINE_HEIGHT_MULTIPLIER
}

fn default_ellipsis_glyph() -> String {
    DEFAULT_ELLIPSIS_GLYPH.to_string()
}

fn default_max_lines() -> usize {
    DEFAULT_MAX_LINES
}

fn default_text_color() -> [u8; 4] {
    DEFAULT_TEXT_COLOR
}

fn default_placeholder_color() -> [u8; 4] {
    DEFAULT_PLACEHOLDER_COLOR
}

fn default_request_timeout() -> String {
    DEFAULT_ASSET_REQUEST_TIMEOUT.to_string()
}

impl Default for SpriteConfig {
    fn default() -> Self {
        Self {
            capacity: default_capacity(),
            reserve: default_reserve(),
            id_prefix: default_id_prefix(),
            min_zoom: default_min_zoom(),
            max_awaited_per_batch: default_max_awaited_per_batch(),
            fallback_icon_key: default_fallback_icon_key(),
        }
    }
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            compact_size: default_compact_size(),
            emphasized_size: default_emphasized_size(),
            compact_icon_size: default_compact_icon_size(),
            emphasized_icon_size: default_emphasized_icon_size(),
            font_family: default_font_family(),
            font_weight: default_font_weight(),
            font_size: default_font_size(),
            line_height_multiplier: default_line_height_multiplier(),
            ellipsis_glyph: default_ellipsis_glyph(),
            max_lines: default_max_lines(),
            text_color: default_text_color(),
            placeholder_color: default_placeholder_color(),
        }
    }
}

impl Default for AssetConfig {
    fn default() -> Self {
        Self {
            base_background: None,
            emphasized_background: None,
            hover_background: None,
            icons: HashMap::new(),
            request_timeout: default_request_timeout(),
        }
    }
}

impl LayoutConfig {
    /// Height of one label line in pixels
    pub fn line_height(&self) -> f32 {
        self.font_size * self.line_height_multiplier
    }
}

impl AssetConfig {
    /// Parsed request timeout, falling back to the default on bad input
    pub fn request_timeout(&self) -> Duration {
        humantime::parse_duration(&self.request_timeout).unwrap_or_else(|_| {
            humantime::parse_duration(DEFAULT_ASSET_REQUEST_TIMEOUT)
                .unwrap_or(Duration::from_secs(10))
        })
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let config_file =
            std::env::var("CONFIG_FILE").unwrap_or_else(|_| "config.toml".to_string());
        Self::load_from_file(&config_file)
    }

    pub fn load_from_file(config_file: &str) -> Result<Self> {
        let config = if std::path::Path::new(&config_file).exists() {
            let contents = std::fs::read_to_string(config_file)?;
            toml::from_str::<Self>(&contents)?
        } else {
            let default_config = Self::default();
            let contents = toml::to_string_pretty(&default_config)?;
            std::fs::write(config_file, contents)?;
            info!("Created default config file: {}", config_file);
            default_config
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.sprites.capacity == 0 {
            bail!("sprites.capacity must be greater than zero");
        }
        for (name, size) in [
            ("compact_size", self.layout.compact_size),
            ("emphasized_size", self.layout.emphasized_size),
        ] {
            if size.width == 0 || size.height == 0 {
                bail!("layout.{} must have non-zero width and height", name);
            }
        }
        if self.layout.compact_icon_size == 0 || self.layout.emphasized_icon_size == 0 {
            bail!("layout icon sizes must be greater than zero");
        }
        if self.layout.font_size.is_nan() || self.layout.font_size <= 0.0 {
            bail!("layout.font_size must be positive");
        }
        if !(1.0..=1000.0).contains(&self.layout.font_weight) {
            bail!("layout.font_weight must be between 1 and 1000");
        }
        humantime::parse_duration(&self.assets.request_timeout).map_err(|e| {
            anyhow::anyhow!(
                "assets.request_timeout '{}' is not a duration: {}",
                self.assets.request_timeout,
                e
            )
        })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.sprites.capacity, 900);
        assert_eq!(config.sprites.reserve, 1);
        assert_eq!(config.layout.compact_size, Size::new(150, 40));
        assert_eq!(config.layout.emphasized_size, Size::new(225, 60));
        assert!((config.layout.line_height() - 14.4).abs() < 1e-4);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: Config = toml::from_str(
            r#"
            [sprites]
            capacity = 50

            [layout]
            font_size = 14.0
            "#,
        )
        .unwrap();

        assert_eq!(config.sprites.capacity, 50);
        assert_eq!(config.sprites.reserve, DEFAULT_SPRITE_RESERVE);
        assert_eq!(config.layout.font_size, 14.0);
        assert_eq!(config.layout.ellipsis_glyph, "\u{2026}");
        assert_eq!(config.layout.font_family, "system-ui");
        assert_eq!(config.assets.request_timeout(), Duration::from_secs(10));
    }

    #[test]
    fn test_validate_rejects_zero_capacity_and_sizes() {
        let mut config = Config::default();
        config.sprites.capacity = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.layout.emphasized_size = Size::new(0, 60);
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.assets.request_timeout = "soon".to_string();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.layout.font_weight = 0.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_from_file_writes_default_when_missing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sprites.toml");
        let path_str = path.to_str().unwrap();

        let config = Config::load_from_file(path_str).unwrap();
        assert!(path.exists());
        assert_eq!(config.sprites.capacity, DEFAULT_SPRITE_CAPACITY);

        let reloaded = Config::load_from_file(path_str).unwrap();
        assert_eq!(reloaded.sprites.id_prefix, config.sprites.id_prefix);
    }
}
