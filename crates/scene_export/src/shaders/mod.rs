//! Shader library
//!
//! Meshes render with a built-in GLSL pair unless the object's custom
//! parameters point at a shader directory. Such a directory holds exactly one
//! `*config.toml` or `*config.ron` file naming the GLSL files per technique:
//!
//! ```toml
//! [techniques.default.shaders]
//! vertex = "cube"      # cube.vert
//! fragment = "cube"    # cube.frag
//!
//! [vertex_format]
//! position = "a_position"
//! normal = "a_normal"
//! ```
//!
//! Loaded directories are cached per technique so objects sharing a shader
//! directory read it once.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::{Config, ConfigError};
use crate::ir::VertexFormat;

/// Technique used when custom parameters do not name one
pub const DEFAULT_TECHNIQUE: &str = "default";

/// Built-in vertex shader
pub const DEFAULT_VERTEX_SHADER: &str = r"#version 300 es

in vec3 a_position;
uniform highp mat4 u_ModelMatrix;
uniform highp mat4 u_ViewMatrix;
uniform highp mat4 u_ProjectionMatrix;

void main()
{
    gl_Position = u_ProjectionMatrix * u_ViewMatrix * u_ModelMatrix * vec4(a_position.xyz, 1.0);
}
";

/// Built-in fragment shader, flat white
pub const DEFAULT_FRAGMENT_SHADER: &str = r"#version 300 es

precision mediump float;
out vec4 FragColor;

void main(void)
{
    FragColor = vec4(1.0, 1.0, 1.0, 1.0);
}
";

/// Shader loading errors
#[derive(Error, Debug)]
pub enum ShaderError {
    /// The directory has no shader config
    #[error("No shader config found in {0}")]
    MissingConfig(PathBuf),

    /// The directory has more than one shader config
    #[error("Found {count} shader configs in {dir}, expected one")]
    AmbiguousConfig {
        /// Shader directory
        dir: PathBuf,
        /// Number of config files
        count: usize,
    },

    /// The config file could not be read or has unknown keys
    #[error("Invalid shader config: {0}")]
    Config(#[from] ConfigError),

    /// The requested technique is not declared
    #[error("Technique '{technique}' not declared in {dir}")]
    UnknownTechnique {
        /// Requested technique
        technique: String,
        /// Shader directory
        dir: PathBuf,
    },

    /// A GLSL file could not be read
    #[error("Failed to read {path}: {source}")]
    Io {
        /// GLSL file
        path: PathBuf,
        /// Underlying error
        source: std::io::Error,
    },

    /// A GLSL file is empty
    #[error("Shader source {0} is empty")]
    EmptySource(PathBuf),
}

/// File stems of one technique's shader stages
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ShaderStages {
    /// Vertex shader file stem, read from `<stem>.vert`
    pub vertex: String,
    /// Fragment shader file stem, read from `<stem>.frag`
    pub fragment: String,
}

/// One named technique
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Technique {
    /// Shader stages of this technique
    pub shaders: ShaderStages,
}

/// Contents of a shader directory's config file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ShaderConfig {
    /// Techniques by name
    pub techniques: BTreeMap<String, Technique>,
    /// Attribute names the shaders declare
    pub vertex_format: VertexFormat,
}

impl Config for ShaderConfig {}

impl ShaderConfig {
    /// Find and load the single config file in `dir`
    pub fn load_from_dir(dir: &Path) -> Result<(Self, PathBuf), ShaderError> {
        let entries = std::fs::read_dir(dir).map_err(|source| ShaderError::Io {
            path: dir.to_path_buf(),
            source,
        })?;

        let mut candidates: Vec<PathBuf> = entries
            .filter_map(Result::ok)
            .map(|entry| entry.path())
            .filter(|path| is_config_file(path))
            .collect();

        match candidates.len() {
            0 => Err(ShaderError::MissingConfig(dir.to_path_buf())),
            1 => {
                let path = candidates.remove(0);
                let config = Self::load_from_file(&path)?;
                Ok((config, path))
            }
            count => Err(ShaderError::AmbiguousConfig {
                dir: dir.to_path_buf(),
                count,
            }),
        }
    }
}

fn is_config_file(path: &Path) -> bool {
    path.is_file()
        && path
            .file_name()
            .and_then(|name| name.to_str())
            .is_some_and(|name| name.ends_with("config.toml") || name.ends_with("config.ron"))
}

/// GLSL sources of one technique together with their attribute names
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderProgram {
    /// Vertex shader source
    pub vertex: String,
    /// Fragment shader source
    pub fragment: String,
    /// Attribute names
    pub vertex_format: VertexFormat,
}

/// Cache of loaded shader directories
#[derive(Debug, Default)]
pub struct ShaderLibrary {
    programs: HashMap<(PathBuf, String), Arc<ShaderProgram>>,
}

impl ShaderLibrary {
    /// Create an empty library
    pub fn new() -> Self {
        Self::default()
    }

    /// Built-in shaders bound with `vertex_format`
    pub fn default_program(vertex_format: VertexFormat) -> ShaderProgram {
        ShaderProgram {
            vertex: DEFAULT_VERTEX_SHADER.to_string(),
            fragment: DEFAULT_FRAGMENT_SHADER.to_string(),
            vertex_format,
        }
    }

    /// Load `technique` from the shader directory `dir`, using the cache if available
    pub fn load(&mut self, dir: impl AsRef<Path>, technique: Option<&str>) -> Result<Arc<ShaderProgram>, ShaderError> {
        let dir = dir.as_ref();
        let technique = technique.unwrap_or(DEFAULT_TECHNIQUE);
        let key = (dir.to_path_buf(), technique.to_string());

        if let Some(program) = self.programs.get(&key) {
            return Ok(Arc::clone(program));
        }

        let (config, config_path) = ShaderConfig::load_from_dir(dir)?;
        log::debug!("Loaded shader config {}", config_path.display());

        let stages = &config
            .techniques
            .get(technique)
            .ok_or_else(|| ShaderError::UnknownTechnique {
                technique: technique.to_string(),
                dir: dir.to_path_buf(),
            })?
            .shaders;

        let program = Arc::new(ShaderProgram {
            vertex: read_source(&dir.join(format!("{}.vert", stages.vertex)))?,
            fragment: read_source(&dir.join(format!("{}.frag", stages.fragment)))?,
            vertex_format: config.vertex_format.clone(),
        });

        self.programs.insert(key, Arc::clone(&program));
        Ok(program)
    }

    /// Number of cached programs
    pub fn len(&self) -> usize {
        self.programs.len()
    }

    /// Whether nothing has been loaded yet
    pub fn is_empty(&self) -> bool {
        self.programs.is_empty()
    }
}

fn read_source(path: &Path) -> Result<String, ShaderError> {
    let source = std::fs::read_to_string(path).map_err(|source| ShaderError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    if source.trim().is_empty() {
        return Err(ShaderError::EmptySource(path.to_path_buf()));
    }
    log::debug!("Read GLSL from {}", path.display());
    Ok(source)
}
