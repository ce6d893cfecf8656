use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::blip::BlipConfig;
use crate::post_process::{DepthEffectSource, DepthFogParams};
use crate::texture_generator::{RefreshPolicy, TextureGeneratorConfig};
use crate::transform_utils::RotatorConfig;

const DEFAULT_WINDOW_WIDTH: u32 = 1280;
const DEFAULT_WINDOW_HEIGHT: u32 = 720;

#[derive(Debug)]
pub enum SettingsError {
    Io { path: PathBuf, source: io::Error },
    Parse { path: PathBuf, source: serde_json::Error },
}

impl fmt::Display for SettingsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "failed to read settings {}: {source}", path.display())
            }
            Self::Parse { path, source } => {
                write!(f, "failed to parse settings {}: {source}", path.display())
            }
        }
    }
}

impl std::error::Error for SettingsError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Parse { source, .. } => Some(source),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorSettings {
    #[serde(flatten)]
    pub config: TextureGeneratorConfig,
    /// WGSL file replacing the built-in kernel.
    pub shader: Option<PathBuf>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DemoSettings {
    pub window_width: u32,
    pub window_height: u32,
    /// Seeded generator refreshed by the trigger key.
    pub noise: GeneratorSettings,
    /// Unseeded generator refreshed every frame.
    pub pattern: GeneratorSettings,
    pub blip: BlipConfig,
    pub rotator: RotatorConfig,
    pub depth_effect: DepthEffectSource,
    /// Start with the depth effect enabled.
    pub depth_effect_enabled: bool,
    pub depth_fog: DepthFogParams,
}

impl Default for DemoSettings {
    fn default() -> Self {
        Self {
            window_width: DEFAULT_WINDOW_WIDTH,
            window_height: DEFAULT_WINDOW_HEIGHT,
            noise: GeneratorSettings::default(),
            pattern: GeneratorSettings {
                config: TextureGeneratorConfig {
                    resolution: 128,
                    policy: RefreshPolicy::EveryFrame,
                },
                shader: None,
            },
            blip: BlipConfig::default(),
            rotator: RotatorConfig::default(),
            depth_effect: DepthEffectSource::default(),
            depth_effect_enabled: true,
            depth_fog: DepthFogParams::default(),
        }
    }
}

impl DemoSettings {
    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        let raw = std::fs::read_to_string(path).map_err(|source| SettingsError::Io {
            path: path.to_owned(),
            source,
        })?;
        let settings: Self = serde_json::from_str(&raw).map_err(|source| SettingsError::Parse {
            path: path.to_owned(),
            source,
        })?;
        log::info!("Loaded settings from {}", path.display());
        Ok(settings.sanitized())
    }

    pub fn save(&self, path: &Path) -> io::Result<()> {
        let bytes = serde_json::to_vec_pretty(self)
            .map_err(|error| io::Error::new(io::ErrorKind::Other, error))?;
        std::fs::write(path, bytes)
    }

    /// Clamps values that would break the demo. Generator resolutions are
    /// left alone; they are validated when the generator activates.
    pub fn sanitized(mut self) -> Self {
        self.window_width = self.window_width.clamp(64, 7680);
        self.window_height = self.window_height.clamp(64, 4320);
        self.blip = self.blip.sanitized();
        if !self.rotator.rotate_speed.is_finite() {
            log::warn!("Rotation speed {} is not finite, using 0", self.rotator.rotate_speed);
            self.rotator.rotate_speed = 0.0;
        }
        self
    }
}
