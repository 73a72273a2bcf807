//! Configuration system
//!
//! Configuration files are TOML or RON, picked by file extension. Every
//! configuration type implements [`Config`] and gets loading and saving for
//! free.

use std::path::{Path, PathBuf};

pub use serde::{Deserialize, Serialize};

use crate::compiler::RotationConvention;
use crate::ir::VertexFormat;

/// Configuration trait
pub trait Config: Serialize + for<'de> Deserialize<'de> + Default {
    /// Load configuration from file
    fn load_from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(ConfigError::Io)?;

        match ConfigFormat::from_path(path)? {
            ConfigFormat::Toml => toml::from_str(&contents).map_err(|e| ConfigError::Parse(e.to_string())),
            ConfigFormat::Ron => ron::from_str(&contents).map_err(|e| ConfigError::Parse(e.to_string())),
        }
    }

    /// Save configuration to file
    fn save_to_file(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let contents = match ConfigFormat::from_path(path)? {
            ConfigFormat::Toml => {
                toml::to_string_pretty(self).map_err(|e| ConfigError::Serialize(e.to_string()))?
            }
            ConfigFormat::Ron => ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
                .map_err(|e| ConfigError::Serialize(e.to_string()))?,
        };

        std::fs::write(path, contents).map_err(ConfigError::Io)
    }
}

/// Supported configuration file formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    /// `.toml`
    Toml,
    /// `.ron`
    Ron,
}

impl ConfigFormat {
    /// Pick a format from a file extension
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => Ok(Self::Toml),
            Some("ron") => Ok(Self::Ron),
            _ => Err(ConfigError::UnsupportedFormat(path.display().to_string())),
        }
    }
}

/// Configuration errors
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Parse error
    #[error("Parse error: {0}")]
    Parse(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialize(String),

    /// Unsupported format
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    /// A value is outside its accepted range
    #[error("Invalid value for '{field}': {reason}")]
    InvalidValue {
        /// Offending field
        field: &'static str,
        /// Why it was rejected
        reason: String,
    },
}

/// Bound on how many IR nodes a scene may create per source object
///
/// Classification is one node per object. A graph holding more than
/// `threshold` nodes with more than `ceil(ratio * objects)` of them means the
/// classifier is fanning out.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CreationLimits {
    /// Maximum nodes per source object
    pub ratio: f32,
    /// Node count below which the ratio is not enforced
    pub threshold: usize,
}

impl CreationLimits {
    /// Largest node count allowed for `objects` source objects
    pub fn limit_for(&self, objects: usize) -> usize {
        (self.ratio * objects as f32).ceil() as usize
    }

    /// Whether `created` nodes for `objects` source objects violates the bound
    pub fn is_exceeded(&self, created: usize, objects: usize) -> bool {
        created > self.threshold && created > self.limit_for(objects)
    }
}

impl Default for CreationLimits {
    fn default() -> Self {
        Self {
            ratio: 1.25,
            threshold: 20,
        }
    }
}

/// # Export Configuration
///
/// Controls where exported scenes are written and how the transform compiler
/// and scene graph behave.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// Directory receiving `<scene>.scene` and `<scene>.resources`
    pub output_dir: PathBuf,
    /// Whether valid scenes are written to disk after export
    pub save_files: bool,
    /// Rotation direction of the target engine's single-axis rotations
    pub rotation_convention: RotationConvention,
    /// Node creation sanity bound
    pub creation_limits: CreationLimits,
    /// Attribute names used by meshes without a custom shader config
    pub vertex_format: VertexFormat,
}

impl ExportConfig {
    /// Create a configuration writing into `output_dir`
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            ..Self::default()
        }
    }

    /// Set whether scenes are saved
    pub fn with_save_files(mut self, save_files: bool) -> Self {
        self.save_files = save_files;
        self
    }

    /// Set the rotation convention
    pub fn with_rotation_convention(mut self, convention: RotationConvention) -> Self {
        self.rotation_convention = convention;
        self
    }

    /// Set the node creation bound
    pub fn with_creation_limits(mut self, limits: CreationLimits) -> Self {
        self.creation_limits = limits;
        self
    }

    /// Check values that serde cannot check
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.creation_limits.ratio >= 1.0) {
            return Err(ConfigError::InvalidValue {
                field: "creation_limits.ratio",
                reason: format!("must be at least 1.0, got {}", self.creation_limits.ratio),
            });
        }
        if self.vertex_format.position.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "vertex_format.position",
                reason: "position attribute name must not be empty".to_string(),
            });
        }
        Ok(())
    }

    /// Paths of the scene and resource files for a scene called `scene_name`
    pub fn output_paths(&self, scene_name: &str) -> (PathBuf, PathBuf) {
        (
            self.output_dir.join(format!("{scene_name}.scene")),
            self.output_dir.join(format!("{scene_name}.resources")),
        )
    }
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("."),
            save_files: true,
            rotation_convention: RotationConvention::default(),
            creation_limits: CreationLimits::default(),
            vertex_format: VertexFormat::default(),
        }
    }
}

impl Config for ExportConfig {}
