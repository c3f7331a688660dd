//! Top-level configuration, loadable from JSON.

use std::path::Path;

use glam::Vec3;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::controller::{SafetyConfig, TelemetryConfig};
use crate::engine::ControlLoopConfig;
use crate::error::{HapticError, Result};
use crate::haptics::HapticShape;
use crate::link::BufferConfig;
use crate::transform::FrameTransform;

/// Everything needed to build a controller and its loop.
///
/// Missing sections fall back to their defaults, so a file holding only
/// `{ "shapes": [...] }` is valid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HapticsConfig {
    pub control: ControlLoopConfig,
    pub telemetry: TelemetryConfig,
    pub safety: SafetyConfig,
    pub link: BufferConfig,
    /// Robot to simulation mapping. Default: [`FrameTransform::barrett`].
    pub frame: FrameTransform,
    pub shapes: Vec<HapticShape>,
}

impl Default for HapticsConfig {
    fn default() -> Self {
        Self {
            control: ControlLoopConfig::default(),
            telemetry: TelemetryConfig::default(),
            safety: SafetyConfig::default(),
            link: BufferConfig::default(),
            frame: FrameTransform::barrett(),
            shapes: Vec::new(),
        }
    }
}

impl HapticsConfig {
    /// Default configuration with a sphere and a box side by side in front
    /// of the arm's home position.
    pub fn demo() -> Result<Self> {
        let sphere = HapticShape::sphere(Vec3::new(-1.5, 0.0, 6.0), 1.0)?.with_name("sphere");
        let cube = HapticShape::cuboid(Vec3::new(1.5, 0.0, 6.0), Vec3::ONE)?.with_name("box");
        Ok(Self {
            shapes: vec![sphere, cube],
            ..Self::default()
        })
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read and validate a JSON config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| HapticError::ConfigIo {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_json_str(&json)?;
        debug!(?path, shapes = config.shapes.len(), "loaded haptics config");
        Ok(config)
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<()> {
        self.control.validate()?;
        for shape in &self.shapes {
            shape.validate()?;
        }
        self.telemetry.validate()?;
        self.safety.validate()?;
        Ok(())
    }
}
