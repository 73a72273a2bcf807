//! Whole-scene export tests driven through the recording engine

use std::path::PathBuf;

use approx::assert_relative_eq;

use super::*;
use crate::backend::{EngineHandle, EngineObjectKind, Frustum, RecordingScene};
use crate::config::ExportConfig;
use crate::foundation::math::utils::{deg_to_rad, derive_fov, rad_to_deg};
use crate::foundation::math::{Mat4, Mat4Ext, Point3, Vec3};
use crate::source::{
    CameraData, Collection, CustomParameters, LightData, ObjectId, PolygonMesh, RenderSettings, SourceObject,
    SourceScene, ViewLayer,
};

fn temp_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join("scene_export_tests").join(name);
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

fn exporter() -> SceneExporter {
    SceneExporter::new(ExportConfig::default().with_save_files(false)).unwrap()
}

/// Camera and a cube rotated 30 degrees about X, both in one view layer
fn cube_scene(name: &str) -> SourceScene {
    SourceScene::new(name)
        .with_render(RenderSettings::new(1920, 1080))
        .with_object(SourceObject::camera(1, "Camera", CameraData::default()))
        .with_object(
            SourceObject::mesh(2, "Cube", PolygonMesh::cube(2.0))
                .with_rotation(Vec3::new(deg_to_rad(30.0), 0.0, 0.0), "XYZ"),
        )
        .with_view_layer(ViewLayer::new("View Layer").with_objects([ObjectId(1), ObjectId(2)]))
}

fn render_group(scene: &RecordingScene, name: &str) -> (Vec<(EngineHandle, i32)>, Vec<(EngineHandle, i32)>) {
    let handle = scene.find_by_name(name).unwrap();
    match &scene.object(handle).unwrap().kind {
        EngineObjectKind::RenderGroup { meshes, groups } => (meshes.clone(), groups.clone()),
        other => panic!("expected render group, got {other:?}"),
    }
}

#[test]
fn test_rotated_cube_model_matrix_matches_source() {
    let exported = exporter().export_scene(&cube_scene("Rotated")).unwrap();
    let scene = exported.scene();

    let rotate_x = scene.find_by_name("Cube_rotate_x").unwrap();
    assert_relative_eq!(scene.object(rotate_x).unwrap().node.as_ref().unwrap().rotation[0], -30.0, epsilon = 1e-4);

    let cube = scene.find_by_name("Cube").unwrap();
    assert_relative_eq!(
        scene.model_matrix(cube).unwrap(),
        Mat4::rotation_x(deg_to_rad(30.0)),
        epsilon = 1e-5
    );
    assert!(exported.is_valid(), "{}", exported.validation_report());
}

#[test]
fn test_parent_transform_is_applied_once() {
    let source = SourceScene::new("Parented")
        .with_object(SourceObject::mesh(1, "Parent", PolygonMesh::plane(1.0)).with_location(Vec3::new(1.0, 0.0, 0.0)))
        .with_object(
            SourceObject::mesh(2, "Child", PolygonMesh::plane(1.0))
                .with_parent(ObjectId(1))
                .with_location(Vec3::new(0.0, 2.0, 0.0)),
        );

    let exported = exporter().export_scene(&source).unwrap();
    let scene = exported.scene();
    let child = scene.find_by_name("Child").unwrap();

    let origin = scene.model_matrix(child).unwrap().transform_point(&Point3::origin());
    assert_relative_eq!(origin.coords, Vec3::new(1.0, 2.0, 0.0), epsilon = 1e-6);
}

#[test]
fn test_children_declared_before_parents_are_still_nested() {
    let source = SourceScene::new("Reversed")
        .with_object(SourceObject::mesh(2, "Child", PolygonMesh::plane(1.0)).with_parent(ObjectId(1)))
        .with_object(SourceObject::mesh(1, "Parent", PolygonMesh::plane(1.0)));

    let exported = exporter().export_scene(&source).unwrap();
    let scene = exported.scene();

    let parent = scene.find_by_name("Parent").unwrap();
    let child_translate = scene.find_by_name("Child_translate").unwrap();
    assert_eq!(scene.object(child_translate).unwrap().node.as_ref().unwrap().parent, Some(parent));
}

#[test]
fn test_disabled_view_layer_has_no_pass() {
    let source = cube_scene("Layers").with_view_layer(
        ViewLayer::new("Hidden")
            .with_enabled(false)
            .with_objects([ObjectId(1), ObjectId(2)]),
    );

    let exported = exporter().export_scene(&source).unwrap();

    assert_eq!(exported.report().render_passes, 1);
    assert_eq!(exported.report().render_groups, 1);
    assert!(exported.scene().find_by_name("View Layer_Camera_pass").is_some());
    assert!(exported.scene().find_by_name("Hidden_Camera_pass").is_none());
    assert!(exported.scene().find_by_name("Hidden").is_none());
}

#[test]
fn test_pass_draws_layer_group_through_camera() {
    let exported = exporter().export_scene(&cube_scene("Pass")).unwrap();
    let scene = exported.scene();

    let pass = scene.find_by_name("View Layer_Camera_pass").unwrap();
    let camera = scene.find_by_name("Camera").unwrap();
    let group = scene.find_by_name("View Layer").unwrap();
    match &scene.object(pass).unwrap().kind {
        EngineObjectKind::RenderPass { camera: bound, groups } => {
            assert_eq!(*bound, Some(camera));
            assert_eq!(groups, &vec![(group, 0)]);
        }
        other => panic!("expected render pass, got {other:?}"),
    }
}

#[test]
fn test_nested_collections_become_nested_groups() {
    let source = SourceScene::new("Nested")
        .with_object(SourceObject::camera(1, "Camera", CameraData::default()))
        .with_object(SourceObject::mesh(2, "Outer", PolygonMesh::plane(1.0)))
        .with_object(SourceObject::mesh(3, "Inner", PolygonMesh::plane(1.0)))
        .with_view_layer(
            ViewLayer::new("View Layer").with_objects([ObjectId(1)]).with_collection(
                Collection::new("Props")
                    .with_objects([ObjectId(2)])
                    .with_child(Collection::new("Small").with_objects([ObjectId(3)])),
            ),
        );

    let exported = exporter().export_scene(&source).unwrap();
    let scene = exported.scene();

    assert_eq!(exported.report().render_groups, 3);
    let (layer_meshes, layer_groups) = render_group(scene, "View Layer");
    let props = scene.find_by_name("Props").unwrap();
    assert!(layer_meshes.is_empty());
    assert_eq!(layer_groups, vec![(props, 0)]);

    let (props_meshes, props_groups) = render_group(scene, "Props");
    assert_eq!(props_meshes, vec![(scene.find_by_name("Outer").unwrap(), 0)]);
    assert_eq!(props_groups, vec![(scene.find_by_name("Small").unwrap(), 0)]);
    assert!(exported.is_valid(), "{}", exported.validation_report());
}

#[test]
fn test_layer_without_meshes_destroys_its_group() {
    let source = SourceScene::new("Lights only")
        .with_object(SourceObject::camera(1, "Camera", CameraData::default()))
        .with_object(SourceObject::light(2, "Lamp", LightData::default()))
        .with_view_layer(ViewLayer::new("View Layer").with_objects([ObjectId(1), ObjectId(2)]));

    let exported = exporter().export_scene(&source).unwrap();

    assert_eq!(exported.report().destroyed_groups, 1);
    assert_eq!(exported.report().render_groups, 0);
    assert_eq!(exported.report().render_passes, 1);
    assert!(exported.scene().handles_of_kind("RenderGroup").is_empty());
    assert!(exported.is_valid(), "{}", exported.validation_report());
}

#[test]
fn test_camera_viewport_and_derived_vertical_fov() {
    let exported = exporter().export_scene(&cube_scene("Camera")).unwrap();
    let scene = exported.scene();
    let camera = scene.find_by_name("Camera").unwrap();

    let EngineObjectKind::Camera(setup) = &scene.object(camera).unwrap().kind else {
        panic!("expected camera");
    };
    assert_eq!((setup.viewport.width, setup.viewport.height), (1920, 1080));
    match setup.frustum {
        Frustum::Perspective { fov_y, aspect, .. } => {
            let expected = rad_to_deg(derive_fov(CameraData::default().angle, 1920.0 / 1080.0));
            assert_relative_eq!(fov_y, expected, epsilon = 1e-4);
            assert_relative_eq!(aspect, 16.0 / 9.0, epsilon = 1e-6);
        }
        other => panic!("expected perspective frustum, got {other:?}"),
    }
}

#[test]
fn test_malformed_mesh_is_exported_as_placeholder() {
    let source = cube_scene("Malformed")
        .with_object(SourceObject::mesh(3, "Broken", PolygonMesh::new(vec![Vec3::zeros()], Vec::new())));

    let exported = exporter().export_scene(&source).unwrap();
    let scene = exported.scene();
    let broken = scene.find_by_name("Broken").unwrap();

    assert_eq!(exported.report().placeholders, 1);
    assert_eq!(scene.object(broken).unwrap().kind, EngineObjectKind::Node);
    assert!(scene.find_by_name("Broken_indices").is_none());
    assert_eq!(exported.report().released_geometry, 1);
}

#[test]
fn test_custom_shader_directory_is_used() {
    let dir = temp_dir("custom_shaders");
    std::fs::write(
        dir.join("shader_config.toml"),
        "[techniques.default.shaders]\nvertex = \"cube\"\nfragment = \"cube\"\n\n[vertex_format]\nposition = \"a_pos\"\n",
    )
    .unwrap();
    std::fs::write(dir.join("cube.vert"), "#version 300 es\nin vec3 a_pos;\nvoid main() {}\n").unwrap();
    std::fs::write(dir.join("cube.frag"), "#version 300 es\nvoid main() {}\n").unwrap();

    let source = cube_scene("Shaded").with_custom_params("Cube", CustomParameters::with_shader_dir(&dir));
    let exported = exporter().export_scene(&source).unwrap();
    let scene = exported.scene();

    assert_eq!(exported.report().custom_shaders, 1);
    let effect = scene.find_by_name("Cube_effect").unwrap();
    match &scene.object(effect).unwrap().kind {
        EngineObjectKind::Effect { vertex_shader, .. } => assert!(vertex_shader.contains("a_pos")),
        other => panic!("expected effect, got {other:?}"),
    }
    let geometry = scene.find_by_name("Cube_geometry").unwrap();
    match &scene.object(geometry).unwrap().kind {
        EngineObjectKind::Geometry { inputs, .. } => assert!(inputs.contains_key("a_pos")),
        other => panic!("expected geometry binding, got {other:?}"),
    }
}

#[test]
fn test_custom_params_for_missing_object_are_ignored() {
    let source = cube_scene("Missing").with_custom_params("Ghost", CustomParameters::with_shader_dir("/nonexistent"));

    let exported = exporter().export_scene(&source).unwrap();
    assert_eq!(exported.report().custom_shaders, 0);
}

#[test]
fn test_failing_scene_does_not_affect_sibling() {
    let bad_rotation = SourceScene::new("Bad rotation")
        .with_object(SourceObject::mesh(1, "Cube", PolygonMesh::cube(1.0)).with_rotation(Vec3::zeros(), "XYW"));
    let bad_shaders = cube_scene("Bad shaders")
        .with_custom_params("Cube", CustomParameters::with_shader_dir(temp_dir("no_config")));
    let good = cube_scene("Good");

    let results = exporter().export_all(&[bad_rotation, good, bad_shaders]);

    let names: Vec<&str> = results.iter().map(|(name, _)| name.as_str()).collect();
    assert_eq!(names, vec!["Bad rotation", "Good", "Bad shaders"]);
    assert!(matches!(results[0].1, Err(ExportError::Transform(_))));
    assert!(matches!(results[2].1, Err(ExportError::Shader(_))));

    let report = results[1].1.as_ref().unwrap();
    assert_eq!(report.render_passes, 1);
    assert_eq!(report.released_geometry, 1);
}

#[test]
fn test_save_writes_sibling_files() {
    let output = temp_dir("saved");
    let config = ExportConfig::new(&output).with_save_files(true);

    let exported = SceneExporter::new(config).unwrap().export_scene(&cube_scene("Saved")).unwrap();

    let (scene_path, resources_path) = exported.report().saved_to.clone().unwrap();
    assert_eq!(scene_path, output.join("Saved.scene"));
    assert_eq!(resources_path, output.join("Saved.resources"));
    assert!(resources_path.is_file());

    let file = RecordingScene::read_scene_file(&scene_path).unwrap();
    assert_eq!(file.name, "Saved");
    assert_eq!(file.objects.len(), exported.scene().len());
}

#[test]
fn test_export_into_custom_target() {
    let mut exporter = exporter();
    let target = RecordingScene::new("Target", exporter.config().rotation_convention);

    let exported = exporter.export_into(&cube_scene("Into"), target).unwrap();

    assert_eq!(exported.name(), "Into");
    assert_eq!(exported.report().transform_nodes, 10);
    assert_eq!(exported.into_scene().name(), "Target");
}

#[test]
fn test_invalid_scene_fails_without_saving() {
    let output = temp_dir("invalid");
    let config = ExportConfig::new(&output).with_save_files(true);
    let source = SourceScene::new("Bad clip")
        .with_render(RenderSettings::new(1920, 1080))
        .with_object(SourceObject::camera(
            1,
            "Camera",
            CameraData {
                clip_start: 0.0,
                ..CameraData::default()
            },
        ))
        .with_view_layer(ViewLayer::new("View Layer").with_objects([ObjectId(1)]));

    let results = SceneExporter::new(config).unwrap().export_all(&[source]);

    match &results[0].1 {
        Err(ExportError::ValidationFailed { scene, report }) => {
            assert_eq!(scene, "Bad clip");
            assert!(report.contains("invalid clip planes"), "{report}");
        }
        other => panic!("expected validation failure, got {other:?}"),
    }
    assert!(!output.join("Bad clip.scene").exists());
}

#[test]
fn test_invalid_scene_fails_when_not_saving() {
    let source = SourceScene::new("Bad clip").with_object(SourceObject::camera(
        1,
        "Camera",
        CameraData {
            clip_start: 0.0,
            ..CameraData::default()
        },
    ));

    let result = exporter().export_scene(&source);

    assert!(matches!(result, Err(ExportError::ValidationFailed { .. })));
}

#[test]
fn test_lowercase_rotation_mode_is_rejected() {
    let source = SourceScene::new("Lowercase").with_object(
        SourceObject::mesh(1, "Cube", PolygonMesh::cube(1.0)).with_rotation(Vec3::new(0.1, 0.2, 0.3), "xyz"),
    );

    let result = exporter().export_scene(&source);

    assert!(matches!(result, Err(ExportError::Transform(_))));
}
