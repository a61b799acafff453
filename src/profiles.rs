//! Quality tiers and the viewport profile each one maps to
//!
//! A tier is a named preset controlling output resolution and pixel density.
//! Lookups never fail: anything unrecognised resolves to [`QualityTier::Standard`].

use serde::{Deserialize, Serialize};
use std::fmt;

/// Named quality preset requested by the caller
///
/// Deserializes leniently: unknown names, `null` and non-string values all
/// become `Standard` instead of rejecting the whole request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize, Serialize)]
#[serde(from = "serde_json::Value", rename_all = "lowercase")]
pub enum QualityTier {
    /// 1280x720 at density 1 (default)
    #[default]
    Standard,
    /// 1920x1080 at density 1
    High,
    /// 2560x1440 at density 2
    Retina,
    /// 375x667 at density 2
    Mobile,
}

impl QualityTier {
    pub const ALL: [QualityTier; 4] = [
        QualityTier::Standard,
        QualityTier::High,
        QualityTier::Retina,
        QualityTier::Mobile,
    ];

    /// Parse a tier name, falling back to `Standard` for anything unknown
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "high" => QualityTier::High,
            "retina" => QualityTier::Retina,
            "mobile" => QualityTier::Mobile,
            _ => QualityTier::Standard,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            QualityTier::Standard => "standard",
            QualityTier::High => "high",
            QualityTier::Retina => "retina",
            QualityTier::Mobile => "mobile",
        }
    }
}

impl From<String> for QualityTier {
    fn from(name: String) -> Self {
        QualityTier::from_name(&name)
    }
}

impl From<serde_json::Value> for QualityTier {
    fn from(value: serde_json::Value) -> Self {
        value.as_str().map(QualityTier::from_name).unwrap_or_default()
    }
}

impl From<Option<&str>> for QualityTier {
    fn from(name: Option<&str>) -> Self {
        name.map(QualityTier::from_name).unwrap_or_default()
    }
}

impl fmt::Display for QualityTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Viewport dimensions and pixel density for one tier
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct QualityProfile {
    /// CSS viewport width in pixels
    pub width_px: u32,
    /// CSS viewport height in pixels
    pub height_px: u32,
    /// Device pixel ratio; 2.0 emulates a high-density display
    pub pixel_density: f64,
}

impl QualityProfile {
    pub const fn new(width_px: u32, height_px: u32, pixel_density: f64) -> Self {
        Self {
            width_px,
            height_px,
            pixel_density,
        }
    }

    /// Width of the captured image in device pixels
    pub fn output_width(&self) -> u32 {
        scale(self.width_px, self.pixel_density)
    }

    /// Height of a viewport capture in device pixels
    pub fn output_height(&self) -> u32 {
        scale(self.height_px, self.pixel_density)
    }
}

fn scale(px: u32, density: f64) -> u32 {
    (f64::from(px) * density).round() as u32
}

/// The four fixed tier profiles
///
/// Built once (usually as part of [`crate::Config`]) and passed by reference;
/// nothing mutates it after startup. Tiers missing from a config file keep
/// their default profile.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ProfileTable {
    pub standard: QualityProfile,
    pub high: QualityProfile,
    pub retina: QualityProfile,
    pub mobile: QualityProfile,
}

impl Default for ProfileTable {
    fn default() -> Self {
        Self {
            standard: QualityProfile::new(1280, 720, 1.0),
            high: QualityProfile::new(1920, 1080, 1.0),
            retina: QualityProfile::new(2560, 1440, 2.0),
            mobile: QualityProfile::new(375, 667, 2.0),
        }
    }
}

impl ProfileTable {
    pub fn resolve(&self, tier: QualityTier) -> QualityProfile {
        match tier {
            QualityTier::Standard => self.standard,
            QualityTier::High => self.high,
            QualityTier::Retina => self.retina,
            QualityTier::Mobile => self.mobile,
        }
    }

    /// Resolve a raw tier name; missing or unknown names give the standard profile
    pub fn resolve_name(&self, name: Option<&str>) -> QualityProfile {
        self.resolve(QualityTier::from(name))
    }
}
