//! Per-scene export orchestration

use std::collections::HashSet;
use std::fmt;
use std::path::PathBuf;

use crate::backend::{RecordingScene, TargetScene};
use crate::compiler::TransformCompiler;
use crate::config::ExportConfig;
use crate::ir::{GroupNode, NodeKind, SceneGraph};
use crate::shaders::ShaderLibrary;
use crate::source::{ObjectId, SourceObject, SourceScene};

use super::binder::PassBinder;
use super::emitter::GraphEmitter;
use super::ExportError;

/// What happened while exporting one scene
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExportReport {
    /// Scene name
    pub scene: String,
    /// Source objects read
    pub objects: usize,
    /// IR nodes built, root included
    pub nodes: usize,
    /// Objects replaced by placeholders
    pub placeholders: usize,
    /// Meshes using custom shaders
    pub custom_shaders: usize,
    /// Primitive transform nodes emitted
    pub transform_nodes: usize,
    /// Render groups kept
    pub render_groups: usize,
    /// Render passes created
    pub render_passes: usize,
    /// Empty render groups destroyed
    pub destroyed_groups: usize,
    /// Geometry handles released at teardown
    pub released_geometry: usize,
    /// Scene and resource files, when saved
    pub saved_to: Option<(PathBuf, PathBuf)>,
}

impl fmt::Display for ExportReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Scene '{}': {} objects, {} IR nodes ({} placeholders), {} transform nodes, {} render groups, {} render passes",
            self.scene,
            self.objects,
            self.nodes,
            self.placeholders,
            self.transform_nodes,
            self.render_groups,
            self.render_passes
        )
    }
}

/// IR of one source scene, ready for emission
#[derive(Debug)]
pub struct SceneRepresentation {
    /// Scene name
    pub name: String,
    /// Node tree
    pub graph: SceneGraph,
    /// One group per enabled view layer
    pub groups: Vec<GroupNode>,
    /// Meshes given custom shaders
    pub custom_shaders: usize,
}

impl SceneRepresentation {
    /// Build the IR of `source`
    ///
    /// Objects are translated parents first so that declared parents are
    /// always found. Custom shaders are attached before grouping. The graph
    /// is torn down before any error is returned; on success the caller owns
    /// its teardown.
    pub fn build(source: &SourceScene, config: &ExportConfig, shaders: &mut ShaderLibrary) -> Result<Self, ExportError> {
        let mut graph = SceneGraph::new(source.render, config.creation_limits)
            .with_vertex_format(config.vertex_format.clone());

        match populate(&mut graph, source, shaders) {
            Ok((custom_shaders, groups)) => {
                log::debug!("IR of scene '{}':\n{}", source.name, graph);
                Ok(Self {
                    name: source.name.clone(),
                    graph,
                    groups,
                    custom_shaders,
                })
            }
            Err(err) => {
                graph.teardown();
                Err(err)
            }
        }
    }
}

fn populate(
    graph: &mut SceneGraph,
    source: &SourceScene,
    shaders: &mut ShaderLibrary,
) -> Result<(usize, Vec<GroupNode>), ExportError> {
    for object in parents_first(&source.objects) {
        graph.add_node(object)?;
    }
    let custom_shaders = apply_custom_params(graph, source, shaders)?;
    let groups = graph.as_groups(&source.view_layers)?;
    Ok((custom_shaders, groups))
}

/// Order objects so that every parent present in the scene precedes its children
fn parents_first(objects: &[SourceObject]) -> Vec<&SourceObject> {
    let present: HashSet<ObjectId> = objects.iter().map(|o| o.id).collect();
    let mut placed: HashSet<ObjectId> = HashSet::with_capacity(objects.len());
    let mut ordered = Vec::with_capacity(objects.len());
    let mut pending: Vec<&SourceObject> = objects.iter().collect();

    while !pending.is_empty() {
        let before = pending.len();
        pending.retain(|object| {
            let ready = object.parent.map_or(true, |p| !present.contains(&p) || placed.contains(&p));
            if ready {
                placed.insert(object.id);
                ordered.push(*object);
            }
            !ready
        });
        if pending.len() == before {
            log::warn!("{} objects have cyclic parents, translating them in declaration order", pending.len());
            ordered.append(&mut pending);
        }
    }
    ordered
}

fn apply_custom_params(
    graph: &mut SceneGraph,
    source: &SourceScene,
    shaders: &mut ShaderLibrary,
) -> Result<usize, ExportError> {
    let mut applied = 0;
    for (name, params) in &source.custom_params {
        let Some(dir) = &params.shader_dir else {
            continue;
        };
        let Some(&id) = graph.find(|node| node.name == *name, 1)?.first() else {
            log::warn!("Custom parameters given for '{}' but no such node exists", name);
            continue;
        };
        if graph.node(id)?.as_mesh().is_none() {
            log::warn!("Custom shaders for '{}' ignored, it is not a mesh", name);
            continue;
        }

        let program = shaders.load(dir, params.technique.as_deref())?;
        if let NodeKind::Mesh(mesh) = graph.node_mut(id)?.kind_mut() {
            mesh.vertex_shader = Some(program.vertex.clone());
            mesh.fragment_shader = Some(program.fragment.clone());
            mesh.vertex_format = program.vertex_format.clone();
            applied += 1;
            log::debug!("Using custom shaders from {} for '{}'", dir.display(), name);
        }
    }
    Ok(applied)
}

/// An emitted scene that can be validated and saved
#[derive(Debug)]
pub struct ExportableScene<S: TargetScene = RecordingScene> {
    name: String,
    scene: S,
    report: ExportReport,
}

impl<S: TargetScene> ExportableScene<S> {
    /// Scene name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Target scene holding the result
    pub const fn scene(&self) -> &S {
        &self.scene
    }

    /// Consume into the target scene
    pub fn into_scene(self) -> S {
        self.scene
    }

    /// Export statistics
    pub const fn report(&self) -> &ExportReport {
        &self.report
    }

    /// Engine validation report; empty when valid
    pub fn validation_report(&self) -> String {
        self.scene.validation_report()
    }

    /// Whether the engine reports no problems
    pub fn is_valid(&self) -> bool {
        self.validation_report().is_empty()
    }

    /// Write `<name>.scene` and `<name>.resources` into the output directory
    pub fn save(&mut self, config: &ExportConfig) -> Result<(PathBuf, PathBuf), ExportError> {
        let report = self.validation_report();
        if !report.is_empty() {
            return Err(ExportError::ValidationFailed {
                scene: self.name.clone(),
                report,
            });
        }

        std::fs::create_dir_all(&config.output_dir)?;
        let (scene_path, resources_path) = config.output_paths(&self.name);
        self.scene.serialize_to_files(&scene_path, &resources_path)?;
        self.report.saved_to = Some((scene_path.clone(), resources_path.clone()));
        Ok((scene_path, resources_path))
    }
}

/// Drives scenes through the whole pipeline
#[derive(Debug)]
pub struct SceneExporter {
    config: ExportConfig,
    shaders: ShaderLibrary,
}

impl SceneExporter {
    /// Create an exporter after checking `config`
    pub fn new(config: ExportConfig) -> Result<Self, ExportError> {
        config.validate()?;
        Ok(Self {
            config,
            shaders: ShaderLibrary::new(),
        })
    }

    /// Active configuration
    pub const fn config(&self) -> &ExportConfig {
        &self.config
    }

    /// Export `source` into a fresh [`RecordingScene`]
    pub fn export_scene(&mut self, source: &SourceScene) -> Result<ExportableScene, ExportError> {
        let target = RecordingScene::new(source.name.clone(), self.config.rotation_convention);
        self.export_into(source, target)
    }

    /// Export `source` into `target`
    ///
    /// The IR is torn down whether or not emission succeeds. A scene the
    /// engine reports as invalid fails with [`ExportError::ValidationFailed`]
    /// and is never saved.
    pub fn export_into<S: TargetScene>(&mut self, source: &SourceScene, mut target: S) -> Result<ExportableScene<S>, ExportError> {
        log::info!("Exporting scene '{}' ({} objects)", source.name, source.objects.len());

        let mut representation = SceneRepresentation::build(source, &self.config, &mut self.shaders)?;
        let mut report = ExportReport {
            scene: source.name.clone(),
            objects: source.objects.len(),
            nodes: representation.graph.node_count(),
            placeholders: representation.graph.placeholder_count(),
            custom_shaders: representation.custom_shaders,
            ..ExportReport::default()
        };

        let outcome = emit_and_bind(&representation, &mut target, TransformCompiler::new(self.config.rotation_convention));
        report.released_geometry = representation.graph.teardown();
        let (transform_nodes, binding) = outcome?;

        report.transform_nodes = transform_nodes;
        report.render_groups = binding.render_groups;
        report.render_passes = binding.render_passes;
        report.destroyed_groups = binding.destroyed_groups;

        let problems = target.validation_report();
        if !problems.is_empty() {
            return Err(ExportError::ValidationFailed {
                scene: source.name.clone(),
                report: problems,
            });
        }

        let mut exportable = ExportableScene {
            name: source.name.clone(),
            scene: target,
            report,
        };
        if self.config.save_files {
            exportable.save(&self.config)?;
        }

        log::info!("{}", exportable.report);
        Ok(exportable)
    }

    /// Export every scene, isolating failures per scene
    pub fn export_all(&mut self, sources: &[SourceScene]) -> Vec<(String, Result<ExportReport, ExportError>)> {
        sources
            .iter()
            .map(|source| {
                let result = self.export_scene(source).map(|exported| exported.report().clone());
                if let Err(err) = &result {
                    log::error!("Export of scene '{}' failed: {}", source.name, err);
                }
                (source.name.clone(), result)
            })
            .collect()
    }
}

fn emit_and_bind<S: TargetScene>(
    representation: &SceneRepresentation,
    target: &mut S,
    compiler: TransformCompiler,
) -> Result<(usize, super::BindingSummary), ExportError> {
    let emitted = GraphEmitter::new(target, compiler).emit(&representation.graph)?;
    let binding = PassBinder::new(target).bind(&representation.graph, &representation.groups, &emitted)?;
    Ok((emitted.chain_nodes(), binding))
}
