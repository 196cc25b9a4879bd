//! Runtime configuration.
//!
//! Every knob has a compiled-in default matching the stock animation, so an
//! empty (or absent) config file gives the standard 1024x768 white canvas
//! with 200 px squares. Files are TOML.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::media::BackgroundSource;

/// Top-level config file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub window: WindowConfig,
    pub animation: AnimationConfig,
    pub backgrounds: Vec<BackgroundSource>,
}

impl AppConfig {
    pub fn load(path: &Path) -> Result<Self, Error> {
        let contents = std::fs::read_to_string(path).map_err(|e| Error::Io {
            path: path.display().to_string(),
            source: e,
        })?;
        Self::from_toml(&contents)
    }

    pub fn from_toml(contents: &str) -> Result<Self, Error> {
        toml::from_str(contents).map_err(|e| Error::Config(e.to_string()))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    pub title: String,
    pub width: usize,
    pub height: usize,
    /// Frame pacing for the host loop (minifb sleeps to hit it).
    pub target_fps: usize,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: "Reveal Canvas".to_string(),
            width: 1024,
            height: 768,
            target_fps: 60,
        }
    }
}

/// Tunables of the reveal animation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnimationConfig {
    /// Side of every reveal square in pixels.
    pub square_size: usize,
    /// Pointer travel needed before another square appears.
    pub min_distance: f32,
    pub square_lifetime_ms: u64,
    pub random_square_interval_ms: u64,
    pub image_rotation_interval_ms: u64,
    pub fill_color: Color,
}

impl Default for AnimationConfig {
    fn default() -> Self {
        Self {
            square_size: 200,
            min_distance: 50.0,
            square_lifetime_ms: 3000,
            random_square_interval_ms: 600,
            image_rotation_interval_ms: 3000,
            fill_color: Color::WHITE,
        }
    }
}

impl AnimationConfig {
    pub fn square_lifetime(&self) -> Duration {
        Duration::from_millis(self.square_lifetime_ms)
    }

    pub fn random_square_interval(&self) -> Duration {
        Duration::from_millis(self.random_square_interval_ms)
    }

    pub fn image_rotation_interval(&self) -> Duration {
        Duration::from_millis(self.image_rotation_interval_ms)
    }
}

/// 0x00RRGGBB color written as "#RRGGBB" in config files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Color(pub u32);

impl Color {
    pub const WHITE: Color = Color(0x00FF_FFFF);
}

impl TryFrom<String> for Color {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        let hex = s
            .strip_prefix('#')
            .ok_or_else(|| format!("color {s:?} must start with '#'"))?;
        if hex.len() != 6 || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(format!("color {s:?} must be #RRGGBB"));
        }
        u32::from_str_radix(hex, 16)
            .map(Color)
            .map_err(|_| format!("color {s:?} is not hex"))
    }
}

impl From<Color> for String {
    fn from(c: Color) -> Self {
        format!("#{:06X}", c.0)
    }
}
