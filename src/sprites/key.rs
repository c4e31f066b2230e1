//! Sprite variants, composite requests and deterministic identifier derivation

use serde::{Deserialize, Serialize};
use std::fmt;

pub const VARIANT_PLAIN: &str = "plain";
pub const VARIANT_PLAIN_MULTI: &str = "plain-multi";
pub const VARIANT_HOVER: &str = "hover";
pub const VARIANT_HOVER_MULTI: &str = "hover-multi";
pub const VARIANT_EMPHASIZED: &str = "emphasized";
pub const VARIANT_EMPHASIZED_MULTI: &str = "emphasized-multi";

/// Separator between identifier fields; does not occur in labels, keys or URLs
const FIELD_SEPARATOR: char = '|';

/// Visual state a label + icon pair is rendered in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SpriteVariant {
    Plain,
    PlainMulti,
    Hover,
    HoverMulti,
    Emphasized,
    EmphasizedMulti,
}

/// Canvas geometry family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SizeClass {
    Compact,
    Emphasized,
}

/// Which background shape a variant is drawn on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackgroundBucket {
    Plain,
    Hover,
    Emphasized,
}

/// The three roles a feature needs sprites for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VariantRole {
    Plain,
    Hover,
    Emphasized,
}

impl SpriteVariant {
    pub const ALL: [SpriteVariant; 6] = [
        Self::Plain,
        Self::PlainMulti,
        Self::Hover,
        Self::HoverMulti,
        Self::Emphasized,
        Self::EmphasizedMulti,
    ];

    pub fn for_role(role: VariantRole, multi: bool) -> Self {
        match (role, multi) {
            (VariantRole::Plain, false) => Self::Plain,
            (VariantRole::Plain, true) => Self::PlainMulti,
            (VariantRole::Hover, false) => Self::Hover,
            (VariantRole::Hover, true) => Self::HoverMulti,
            (VariantRole::Emphasized, false) => Self::Emphasized,
            (VariantRole::Emphasized, true) => Self::EmphasizedMulti,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Plain => VARIANT_PLAIN,
            Self::PlainMulti => VARIANT_PLAIN_MULTI,
            Self::Hover => VARIANT_HOVER,
            Self::HoverMulti => VARIANT_HOVER_MULTI,
            Self::Emphasized => VARIANT_EMPHASIZED,
            Self::EmphasizedMulti => VARIANT_EMPHASIZED_MULTI,
        }
    }

    pub fn size_class(&self) -> SizeClass {
        match self {
            Self::Emphasized | Self::EmphasizedMulti => SizeClass::Emphasized,
            _ => SizeClass::Compact,
        }
    }

    pub fn background_bucket(&self) -> BackgroundBucket {
        match self {
            Self::Plain | Self::PlainMulti => BackgroundBucket::Plain,
            Self::Hover | Self::HoverMulti => BackgroundBucket::Hover,
            Self::Emphasized | Self::EmphasizedMulti => BackgroundBucket::Emphasized,
        }
    }

    pub fn is_multi(&self) -> bool {
        matches!(
            self,
            Self::PlainMulti | Self::HoverMulti | Self::EmphasizedMulti
        )
    }

    pub fn is_emphasized(&self) -> bool {
        self.size_class() == SizeClass::Emphasized
    }
}

impl fmt::Display for SpriteVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SpriteVariant {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|v| v.as_str() == s)
            .ok_or_else(|| format!("Unknown sprite variant: {}", s))
    }
}

/// Everything that defines one composite
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CompositeRequest {
    pub variant: SpriteVariant,
    /// May embed `\n` to ask for two lines
    pub label_text: String,
    pub icon_key: String,
    pub thumbnail_url: Option<String>,
}

impl CompositeRequest {
    pub fn new<L: Into<String>, I: Into<String>>(
        variant: SpriteVariant,
        label_text: L,
        icon_key: I,
    ) -> Self {
        Self {
            variant,
            label_text: label_text.into(),
            icon_key: icon_key.into(),
            thumbnail_url: None,
        }
    }

    pub fn with_thumbnail<U: Into<String>>(mut self, url: U) -> Self {
        self.thumbnail_url = Some(url.into());
        self
    }
}

/// Java-style 31-multiplier string hash over UTF-16 code units, wrapped to i32
pub fn rolling_hash(input: &str) -> i32 {
    input
        .encode_utf16()
        .fold(0i32, |h, c| h.wrapping_mul(31).wrapping_add(c as i32))
}

/// Lowercase base-36 rendering of an unsigned value
pub fn to_base36(mut value: u64) -> String {
    const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    if value == 0 {
        return "0".to_string();
    }
    let mut out = Vec::new();
    while value > 0 {
        out.push(DIGITS[(value % 36) as usize]);
        value /= 36;
    }
    out.reverse();
    String::from_utf8(out).unwrap_or_default()
}

/// Stable identifier for a composite: `<prefix><variant>-<base36 hash>`
pub fn derive_id(
    prefix: &str,
    variant: SpriteVariant,
    label_text: &str,
    icon_key: &str,
    thumbnail_url: Option<&str>,
) -> String {
    let mut joined = String::with_capacity(
        variant.as_str().len() + label_text.len() + icon_key.len() + 8,
    );
    joined.push_str(variant.as_str());
    joined.push(FIELD_SEPARATOR);
    joined.push_str(label_text);
    joined.push(FIELD_SEPARATOR);
    joined.push_str(icon_key);
    joined.push(FIELD_SEPARATOR);
    joined.push_str(thumbnail_url.unwrap_or(""));

    let hash = rolling_hash(&joined);
    format!(
        "{}{}-{}",
        prefix,
        variant.as_str(),
        to_base36(i64::from(hash).unsigned_abs())
    )
}

/// Derives identifiers under one namespace prefix
#[derive(Debug, Clone)]
pub struct SpriteKeyDeriver {
    prefix: String,
}

impl SpriteKeyDeriver {
    pub fn new<S: Into<String>>(prefix: S) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    pub fn derive(&self, request: &CompositeRequest) -> String {
        derive_id(
            &self.prefix,
            request.variant,
            &request.label_text,
            &request.icon_key,
            request.thumbnail_url.as_deref(),
        )
    }
}
