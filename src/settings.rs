use crate::overlay::composite::{Rgba, DEFAULT_BORDER_COLOR, DEFAULT_KEY_COLOR};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const SETTINGS_FILE: &str = "focus_overlay.json";

/// Tuning knobs read at startup. The file is never written back; hotkeys are
/// fixed and not part of it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub double_tap_interval_ms: u64,
    pub capture_interval_ms: u64,
    pub frame_interval_ms: u64,
    /// Fraction of the way toward black the background is pulled.
    pub dim_factor: f32,
    pub blur_downscale: u32,
    pub default_focus_width: i32,
    pub default_focus_height: i32,
    pub min_focus_size: i32,
    pub resize_step: i32,
    pub smart_focus_padding: i32,
    pub border_width: u32,
    pub key_color: Rgba,
    pub border_color: Rgba,
    pub debug: bool,
    pub log_file: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            double_tap_interval_ms: 400,
            capture_interval_ms: 300,
            frame_interval_ms: 16,
            dim_factor: 0.35,
            blur_downscale: 16,
            default_focus_width: 800,
            default_focus_height: 600,
            min_focus_size: 50,
            resize_step: 10,
            smart_focus_padding: 20,
            border_width: 2,
            key_color: DEFAULT_KEY_COLOR,
            border_color: DEFAULT_BORDER_COLOR,
            debug: false,
            log_file: None,
        }
    }
}

impl Settings {
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path).unwrap_or_default();
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        let settings: Self = serde_json::from_str(&content)?;
        Ok(settings.sanitized())
    }

    /// Clamp values that would break the engine back into a usable range.
    pub fn sanitized(mut self) -> Self {
        let defaults = Self::default();
        if self.double_tap_interval_ms == 0 {
            tracing::warn!("double_tap_interval_ms must be positive; using default");
            self.double_tap_interval_ms = defaults.double_tap_interval_ms;
        }
        if self.capture_interval_ms == 0 {
            tracing::warn!("capture_interval_ms must be positive; using default");
            self.capture_interval_ms = defaults.capture_interval_ms;
        }
        self.frame_interval_ms = self.frame_interval_ms.max(1);
        self.dim_factor = if self.dim_factor.is_finite() {
            self.dim_factor.clamp(0.0, 1.0)
        } else {
            defaults.dim_factor
        };
        self.blur_downscale = self.blur_downscale.max(1);
        self.min_focus_size = self.min_focus_size.max(1);
        self.resize_step = self.resize_step.max(1);
        self.smart_focus_padding = self.smart_focus_padding.max(0);
        self.default_focus_width = self.default_focus_width.max(self.min_focus_size);
        self.default_focus_height = self.default_focus_height.max(self.min_focus_size);
        // The dark-mode layer is all zero, so a black key would make it see-through.
        if self.key_color.same_rgb(Rgba::rgb(0, 0, 0)) {
            tracing::warn!("key_color must not be black; using default");
            self.key_color = defaults.key_color;
        }
        if self.border_color.same_rgb(self.key_color) {
            tracing::warn!("border_color equals key_color; adjusting border");
            self.border_color = self.border_color.avoiding_key(self.key_color);
        }
        self
    }

    pub fn double_tap_interval(&self) -> Duration {
        Duration::from_millis(self.double_tap_interval_ms)
    }

    pub fn capture_interval(&self) -> Duration {
        Duration::from_millis(self.capture_interval_ms)
    }

    pub fn frame_interval(&self) -> Duration {
        Duration::from_millis(self.frame_interval_ms)
    }
}
