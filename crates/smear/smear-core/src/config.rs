//! Bake configuration.

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Minimum bone length, and minimum ribbon-normal length, below which a
/// contribution is skipped.
pub const BONE_EPSILON: f64 = 1e-5;
/// Velocities shorter than this are left un-normalized.
pub const VELOCITY_EPSILON: f64 = 1e-8;
/// Arc angle (radians) below which SLERP falls back to a normalized lerp.
pub const SLERP_ANGLE_THRESHOLD: f64 = 1e-4;
/// Default smoothing half-width (5 taps).
pub const DEFAULT_SMOOTH_WINDOW: usize = 2;
/// Largest smoothing half-width the host exposes.
pub const MAX_SMOOTH_WINDOW: usize = 5;

/// Tuning knobs for a bake. Every field has a default so partial JSON is accepted.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub bone_epsilon: f64,
    pub velocity_epsilon: f64,
    pub slerp_angle_threshold: f64,
    pub smoothing: SmoothingConfig,
    /// Solve and smooth vertices on the rayon pool. Output is identical either way.
    pub parallel: bool,
    /// Emit a "frames sampled" progress event every this many percent.
    pub progress_step_percent: u32,
}

/// Temporal smoothing settings.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SmoothingConfig {
    pub enabled: bool,
    /// Kernel half-width; the kernel has `2 * window + 1` taps.
    pub window: usize,
}

impl Default for SmoothingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            window: DEFAULT_SMOOTH_WINDOW,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bone_epsilon: BONE_EPSILON,
            velocity_epsilon: VELOCITY_EPSILON,
            slerp_angle_threshold: SLERP_ANGLE_THRESHOLD,
            smoothing: SmoothingConfig::default(),
            parallel: true,
            progress_step_percent: 10,
        }
    }
}

impl Config {
    pub fn from_json_str(s: &str) -> Result<Self> {
        Ok(serde_json::from_str(s)?)
    }

    /// Half-width actually applied: 0 when smoothing is disabled, clamped to
    /// [`MAX_SMOOTH_WINDOW`] otherwise.
    pub fn effective_window(&self) -> usize {
        if !self.smoothing.enabled {
            return 0;
        }
        if self.smoothing.window > MAX_SMOOTH_WINDOW {
            log::warn!(
                "smoothing window {} exceeds maximum {}; clamping",
                self.smoothing.window,
                MAX_SMOOTH_WINDOW
            );
            return MAX_SMOOTH_WINDOW;
        }
        self.smoothing.window
    }
}
