//! Size-class geometry

use crate::config::LayoutConfig;
use crate::sprites::key::SizeClass;

/// Gap between the left canvas edge and a compact icon
const COMPACT_ICON_INSET: f32 = 5.0;
/// Gap between a compact icon and its label
const COMPACT_TEXT_GAP: f32 = 5.0;
/// Right padding after a compact label
const COMPACT_TEXT_RIGHT_PADDING: f32 = 5.0;
const COMPACT_LABEL_TOP: f32 = 6.0;

/// Gap between an emphasized icon and the right canvas edge
const EMPHASIZED_ICON_INSET: f32 = 5.0;
const EMPHASIZED_LABEL_LEFT: f32 = 10.0;
const EMPHASIZED_LABEL_TOP: f32 = 8.0;
/// Horizontal space reserved around the icon when sizing the label
const EMPHASIZED_LABEL_RESERVE: f32 = 20.0;

/// Where everything goes on one canvas
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompositeLayout {
    pub size_class: SizeClass,
    pub width: u32,
    pub height: u32,
    pub icon_size: u32,
    /// Left edge of the icon slot
    pub icon_x: f32,
    pub icon_center_y: f32,
    pub label_x: f32,
    pub label_y: f32,
    pub label_max_width: f32,
    pub round_icon: bool,
}

impl CompositeLayout {
    pub fn for_class(size_class: SizeClass, config: &LayoutConfig) -> Self {
        match size_class {
            SizeClass::Compact => {
                let size = config.compact_size;
                let icon_size = config.compact_icon_size;
                let icon_x = COMPACT_ICON_INSET;
                let label_x = icon_x + icon_size as f32 + COMPACT_TEXT_GAP;
                Self {
                    size_class,
                    width: size.width,
                    height: size.height,
                    icon_size,
                    icon_x,
                    icon_center_y: size.height as f32 / 2.0,
                    label_x,
                    label_y: COMPACT_LABEL_TOP,
                    label_max_width: (size.width as f32 - label_x - COMPACT_TEXT_RIGHT_PADDING)
                        .max(0.0),
                    round_icon: false,
                }
            }
            SizeClass::Emphasized => {
                let size = config.emphasized_size;
                let icon_size = config.emphasized_icon_size;
                Self {
                    size_class,
                    width: size.width,
                    height: size.height,
                    icon_size,
                    icon_x: size.width as f32 - icon_size as f32 - EMPHASIZED_ICON_INSET,
                    icon_center_y: size.height as f32 / 2.0,
                    label_x: EMPHASIZED_LABEL_LEFT,
                    label_y: EMPHASIZED_LABEL_TOP,
                    label_max_width: (size.width as f32
                        - icon_size as f32
                        - EMPHASIZED_LABEL_RESERVE)
                        .max(0.0),
                    round_icon: true,
                }
            }
        }
    }

    /// Centre of the icon slot on the x axis
    pub fn icon_center_x(&self) -> f32 {
        self.icon_x + self.icon_size as f32 / 2.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compact_layout() {
        let layout = CompositeLayout::for_class(SizeClass::Compact, &LayoutConfig::default());
        assert_eq!((layout.width, layout.height), (150, 40));
        assert_eq!(layout.icon_size, 30);
        assert_eq!(layout.icon_x, 5.0);
        assert_eq!(layout.label_x, 40.0);
        assert_eq!(layout.label_y, 6.0);
        assert_eq!(layout.label_max_width, 105.0);
        assert!(!layout.round_icon);
    }

    #[test]
    fn test_emphasized_layout() {
        let layout =
            CompositeLayout::for_class(SizeClass::Emphasized, &LayoutConfig::default());
        assert_eq!((layout.width, layout.height), (225, 60));
        assert_eq!(layout.icon_size, 50);
        assert_eq!(layout.icon_x, 170.0);
        assert_eq!(layout.icon_center_x(), 195.0);
        assert_eq!(layout.label_x, 10.0);
        assert_eq!(layout.label_max_width, 155.0);
        assert!(layout.round_icon);
    }
}
