//! Export pipeline
//!
//! ## Architecture
//!
//! ```text
//! SourceScene
//!     │  SceneRepresentation::build   (IR graph, custom shaders, view layer groups)
//!     ▼
//! GraphEmitter                         (transform chains and content per node)
//!     │
//!     ▼
//! PassBinder                           (render groups and render passes)
//!     │
//!     ▼
//! ExportableScene                      (validation, <name>.scene + <name>.resources)
//! ```
//!
//! Each scene is exported independently. A failing scene does not stop its
//! siblings in [`SceneExporter::export_all`].

mod binder;
mod emitter;
mod exporter;

#[cfg(test)]
mod tests;

pub use binder::{BindingSummary, PassBinder};
pub use emitter::{camera_setup, EmittedScene, GraphEmitter};
pub use exporter::{ExportReport, ExportableScene, SceneExporter, SceneRepresentation};

use thiserror::Error;

use crate::backend::BackendError;
use crate::compiler::TransformError;
use crate::config::ConfigError;
use crate::ir::GraphError;
use crate::shaders::ShaderError;

/// Errors aborting the export of one scene
#[derive(Error, Debug)]
pub enum ExportError {
    /// Transform compilation failed
    #[error("Transform error: {0}")]
    Transform(#[from] TransformError),

    /// The IR could not be built or queried
    #[error("Scene graph error: {0}")]
    Graph(#[from] GraphError),

    /// The target engine rejected a call
    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),

    /// Custom shaders could not be loaded
    #[error("Shader error: {0}")]
    Shader(#[from] ShaderError),

    /// The export configuration is invalid
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The output directory could not be prepared
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The target engine reported problems; nothing was saved
    #[error("Scene '{scene}' failed validation:\n{report}")]
    ValidationFailed {
        /// Scene name
        scene: String,
        /// Validation report of the engine
        report: String,
    },
}
