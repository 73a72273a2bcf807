//! # Scene Export
//!
//! Compiles authoring-tool scene descriptions into render-engine scene graphs.
//!
//! ## Features
//!
//! - **Typed IR**: Mesh, camera, light and generic nodes in one arena-backed tree
//! - **Transform Compiler**: Euler rotations decomposed into single-axis engine nodes
//! - **Render Binding**: View layers and collections become render groups and passes
//! - **Custom Shaders**: Per-object GLSL loaded from shader directories
//! - **Reference Engine**: In-memory target scene with validation and file output
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use scene_export::prelude::*;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     scene_export::foundation::logging::init();
//!
//!     let scene = SourceScene::load_from_file("scene.ron")?;
//!     let config = ExportConfig::load_from_file("export.toml")?;
//!
//!     let mut exporter = SceneExporter::new(config)?;
//!     for (name, result) in exporter.export_all(&[scene]) {
//!         match result {
//!             Ok(report) => println!("{report}"),
//!             Err(err) => eprintln!("{name}: {err}"),
//!         }
//!     }
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::similar_names, clippy::too_many_arguments)]

pub mod foundation;
pub mod config;
pub mod source;
pub mod ir;
pub mod compiler;
pub mod shaders;
pub mod backend;
pub mod export;

/// Common imports for exporter users
pub mod prelude {
    pub use crate::{
        backend::{BackendError, EngineHandle, RecordingScene, TargetScene},
        compiler::{RotationConvention, RotationOrder, TransformCompiler},
        config::{Config, ConfigError, CreationLimits, ExportConfig},
        export::{ExportError, ExportReport, ExportableScene, SceneExporter},
        foundation::math::{Axis, Mat4, Vec3},
        ir::{GraphError, GroupNode, Node, NodeId, NodeKind, SceneGraph},
        shaders::{ShaderLibrary, ShaderProgram},
        source::{
            CameraData, Collection, CustomParameters, LightData, ObjectId, ObjectType, PolygonMesh,
            RenderSettings, SourceObject, SourceScene, ViewLayer,
        },
    };
}
