//! Source scene description
//!
//! These types are the input contract of the exporter: what the authoring-tool
//! access layer hands over for each scene. They are plain data, serde-enabled
//! so a scene description can also be written as RON and loaded with
//! [`SourceScene::load_from_file`].
//!
//! Rotations are Euler angles in radians with an explicit axis order string
//! (e.g. `"XYZ"`). The order is kept verbatim; validating it is the transform
//! compiler's job.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::config::ConfigError;
use crate::foundation::math::{Mat4, Vec3};

/// Stable identity of a source object, used for parent lookup
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObjectId(pub u32);

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Type tag of a source object
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ObjectType {
    /// Polygon mesh
    Mesh,
    /// Camera
    Camera,
    /// Light
    Light,
    /// Anything else, carrying the authoring tool's own tag (e.g. "EMPTY")
    Other(String),
}

impl fmt::Display for ObjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Mesh => f.write_str("MESH"),
            Self::Camera => f.write_str("CAMERA"),
            Self::Light => f.write_str("LIGHT"),
            Self::Other(tag) => f.write_str(tag),
        }
    }
}

/// Polygon mesh as stored by the authoring tool
///
/// Faces are lists of vertex indices of any length. `normals` holds one normal
/// per vertex and may be empty when the tool does not provide them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PolygonMesh {
    /// Vertex positions
    pub vertices: Vec<Vec3>,
    /// Per-vertex normals, empty or one per vertex
    #[serde(default)]
    pub normals: Vec<Vec3>,
    /// Faces as vertex index lists
    pub faces: Vec<Vec<u32>>,
}

impl PolygonMesh {
    /// Create a mesh without normals
    pub fn new(vertices: Vec<Vec3>, faces: Vec<Vec<u32>>) -> Self {
        Self {
            vertices,
            normals: Vec::new(),
            faces,
        }
    }

    /// A single quad in the XY plane, `size` wide, facing +Z
    pub fn plane(size: f32) -> Self {
        let h = size * 0.5;
        Self::new(
            vec![
                Vec3::new(-h, -h, 0.0),
                Vec3::new(h, -h, 0.0),
                Vec3::new(h, h, 0.0),
                Vec3::new(-h, h, 0.0),
            ],
            vec![vec![0, 1, 2, 3]],
        )
    }

    /// An axis-aligned cube centered at the origin made of six quads
    ///
    /// 8 vertices at ±`size / 2`, outward counter-clockwise winding.
    pub fn cube(size: f32) -> Self {
        let h = size * 0.5;
        Self::new(
            vec![
                Vec3::new(-h, -h, h),
                Vec3::new(h, -h, h),
                Vec3::new(h, h, h),
                Vec3::new(-h, h, h),
                Vec3::new(-h, -h, -h),
                Vec3::new(-h, h, -h),
                Vec3::new(h, h, -h),
                Vec3::new(h, -h, -h),
            ],
            vec![
                // Front
                vec![0, 1, 2, 3],
                // Back
                vec![4, 5, 6, 7],
                // Left
                vec![4, 0, 3, 5],
                // Right
                vec![1, 7, 6, 2],
                // Top
                vec![3, 2, 6, 5],
                // Bottom
                vec![4, 7, 1, 0],
            ],
        )
    }
}

/// Camera projection type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ProjectionType {
    /// Perspective projection
    #[default]
    Perspective,
    /// Orthographic projection
    Orthographic,
    /// Panoramic projection; not supported by the target engine
    Panoramic,
}

/// How the image is fit inside the camera sensor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SensorFit {
    /// Fit to the larger of width and height
    #[default]
    Auto,
    /// Fit to the sensor width
    Horizontal,
    /// Fit to the sensor height
    Vertical,
}

/// Raw camera attributes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraData {
    /// Projection type
    pub projection: ProjectionType,
    /// Field of view along the fitted axis, radians
    pub angle: f32,
    /// Horizontal field of view, radians
    pub angle_x: f32,
    /// Vertical field of view, radians
    pub angle_y: f32,
    /// Near clip distance
    pub clip_start: f32,
    /// Far clip distance
    pub clip_end: f32,
    /// Sensor fit mode
    pub sensor_fit: SensorFit,
    /// Sensor width in millimeters
    pub sensor_width: f32,
    /// Sensor height in millimeters
    pub sensor_height: f32,
    /// Horizontal lens shift
    pub shift_x: f32,
    /// Vertical lens shift
    pub shift_y: f32,
    /// Extent of the orthographic view volume
    pub ortho_scale: f32,
}

impl Default for CameraData {
    // Values of a freshly added camera in the authoring tool (50mm lens, 36mm sensor)
    fn default() -> Self {
        Self {
            projection: ProjectionType::Perspective,
            angle: 0.691_150_4,
            angle_x: 0.691_150_4,
            angle_y: 0.471_238_9,
            clip_start: 0.1,
            clip_end: 100.0,
            sensor_fit: SensorFit::Auto,
            sensor_width: 36.0,
            sensor_height: 24.0,
            shift_x: 0.0,
            shift_y: 0.0,
            ortho_scale: 6.0,
        }
    }
}

/// Light subtype
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LightType {
    /// Omnidirectional point light
    #[default]
    Point,
    /// Parallel rays from a constant direction
    Sun,
    /// Directional cone light
    Spot,
    /// Directional area light
    Area,
}

/// Shape of an area light
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AreaShape {
    /// Square, `size` wide
    #[default]
    Square,
    /// Rectangle, `size` by `size_y`
    Rectangle,
    /// Disk, `size` in diameter
    Disk,
    /// Ellipse, `size` by `size_y`
    Ellipse,
}

/// Raw light attributes
///
/// Fields that do not apply to a light's subtype are ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LightData {
    /// Light subtype
    pub light_type: LightType,
    /// Linear RGB color
    pub color: Vec3,
    /// Emitted power (watts, or irradiance for sun lights)
    pub energy: f32,
    /// Distance after which the light has no influence
    pub cutoff_distance: f32,
    /// Specular multiplier
    pub specular_factor: f32,
    /// Soft shadow radius
    pub shadow_soft_size: f32,
    /// Whether the light casts shadows
    pub use_shadow: bool,
    /// Constant attenuation term
    pub constant_coefficient: f32,
    /// Linear attenuation term
    pub linear_coefficient: f32,
    /// Quadratic attenuation term
    pub quadratic_coefficient: f32,
    /// Angular diameter of the sun, radians
    pub angle: f32,
    /// Spot cone angle, radians
    pub spot_size: f32,
    /// Spot edge softness, 0..1
    pub spot_blend: f32,
    /// Whether the spot cone is drawn in the viewport
    pub show_cone: bool,
    /// Area light shape
    pub shape: AreaShape,
    /// Area light size along X
    pub size: f32,
    /// Area light size along Y (rectangle and ellipse only)
    pub size_y: f32,
}

impl Default for LightData {
    fn default() -> Self {
        Self {
            light_type: LightType::Point,
            color: Vec3::new(1.0, 1.0, 1.0),
            energy: 10.0,
            cutoff_distance: 40.0,
            specular_factor: 1.0,
            shadow_soft_size: 0.25,
            use_shadow: true,
            constant_coefficient: 1.0,
            linear_coefficient: 0.0,
            quadratic_coefficient: 1.0,
            angle: 0.009_180_43,
            spot_size: 0.785_398,
            spot_blend: 0.15,
            show_cone: false,
            shape: AreaShape::Square,
            size: 0.25,
            size_y: 0.25,
        }
    }
}

/// Output resolution of a scene
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderSettings {
    /// Horizontal resolution in pixels
    pub resolution_x: u32,
    /// Vertical resolution in pixels
    pub resolution_y: u32,
    /// Horizontal pixel aspect
    pub pixel_aspect_x: f32,
    /// Vertical pixel aspect
    pub pixel_aspect_y: f32,
}

impl RenderSettings {
    /// Settings with square pixels
    pub fn new(resolution_x: u32, resolution_y: u32) -> Self {
        Self {
            resolution_x,
            resolution_y,
            pixel_aspect_x: 1.0,
            pixel_aspect_y: 1.0,
        }
    }

    /// Viewport width in pixels after pixel aspect correction
    pub fn width(&self) -> f32 {
        self.pixel_aspect_x * self.resolution_x as f32
    }

    /// Viewport height in pixels after pixel aspect correction
    pub fn height(&self) -> f32 {
        self.pixel_aspect_y * self.resolution_y as f32
    }
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self::new(1920, 1080)
    }
}

/// One object of a source scene
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceObject {
    /// Stable identity
    pub id: ObjectId,
    /// Display name, used for custom parameter lookup
    pub name: String,
    /// Type tag
    pub object_type: ObjectType,
    /// Declared parent, if any
    #[serde(default)]
    pub parent: Option<ObjectId>,
    /// Local translation
    #[serde(default = "zero_vector")]
    pub location: Vec3,
    /// Local Euler rotation, radians
    #[serde(default = "zero_vector")]
    pub rotation_euler: Vec3,
    /// Euler axis order, e.g. "XYZ"
    #[serde(default = "default_rotation_mode")]
    pub rotation_mode: String,
    /// Local scale
    #[serde(default = "unit_vector")]
    pub scale: Vec3,
    /// World transform as computed by the tool; informational only
    #[serde(default)]
    pub matrix_world: Option<Mat4>,
    /// Geometry of mesh objects
    #[serde(default)]
    pub mesh: Option<PolygonMesh>,
    /// Attributes of camera objects
    #[serde(default)]
    pub camera: Option<CameraData>,
    /// Attributes of light objects
    #[serde(default)]
    pub light: Option<LightData>,
}

fn zero_vector() -> Vec3 {
    Vec3::zeros()
}

fn unit_vector() -> Vec3 {
    Vec3::new(1.0, 1.0, 1.0)
}

fn default_rotation_mode() -> String {
    "XYZ".to_string()
}

impl SourceObject {
    /// Create an object at the origin with identity transform
    pub fn new(id: u32, name: impl Into<String>, object_type: ObjectType) -> Self {
        Self {
            id: ObjectId(id),
            name: name.into(),
            object_type,
            parent: None,
            location: zero_vector(),
            rotation_euler: zero_vector(),
            rotation_mode: default_rotation_mode(),
            scale: unit_vector(),
            matrix_world: None,
            mesh: None,
            camera: None,
            light: None,
        }
    }

    /// Create a mesh object
    pub fn mesh(id: u32, name: impl Into<String>, mesh: PolygonMesh) -> Self {
        Self {
            mesh: Some(mesh),
            ..Self::new(id, name, ObjectType::Mesh)
        }
    }

    /// Create a camera object
    pub fn camera(id: u32, name: impl Into<String>, camera: CameraData) -> Self {
        Self {
            camera: Some(camera),
            ..Self::new(id, name, ObjectType::Camera)
        }
    }

    /// Create a light object
    pub fn light(id: u32, name: impl Into<String>, light: LightData) -> Self {
        Self {
            light: Some(light),
            ..Self::new(id, name, ObjectType::Light)
        }
    }

    /// Set the declared parent
    pub fn with_parent(mut self, parent: ObjectId) -> Self {
        self.parent = Some(parent);
        self
    }

    /// Set the local translation
    pub fn with_location(mut self, location: Vec3) -> Self {
        self.location = location;
        self
    }

    /// Set the local rotation and its axis order
    pub fn with_rotation(mut self, rotation_euler: Vec3, rotation_mode: impl Into<String>) -> Self {
        self.rotation_euler = rotation_euler;
        self.rotation_mode = rotation_mode.into();
        self
    }

    /// Set the local scale
    pub fn with_scale(mut self, scale: Vec3) -> Self {
        self.scale = scale;
        self
    }
}

/// A collection nested in a view layer
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Collection {
    /// Collection name
    pub name: String,
    /// Objects linked directly into this collection
    pub objects: Vec<ObjectId>,
    /// Nested collections
    pub children: Vec<Collection>,
    /// Excluded from the view layer, contents included
    pub excluded: bool,
}

impl Collection {
    /// Create an empty collection
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Link objects into this collection
    pub fn with_objects(mut self, objects: impl IntoIterator<Item = ObjectId>) -> Self {
        self.objects.extend(objects);
        self
    }

    /// Nest a collection
    pub fn with_child(mut self, child: Collection) -> Self {
        self.children.push(child);
        self
    }
}

/// A named, independently toggleable subset of the scene
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewLayer {
    /// Layer name
    pub name: String,
    /// Whether the layer is used for rendering
    #[serde(default = "enabled")]
    pub enabled: bool,
    /// Objects linked directly into the layer's top collection
    #[serde(default)]
    pub objects: Vec<ObjectId>,
    /// Collections of the layer
    #[serde(default)]
    pub collections: Vec<Collection>,
}

fn enabled() -> bool {
    true
}

impl ViewLayer {
    /// Create an enabled, empty view layer
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            enabled: true,
            objects: Vec::new(),
            collections: Vec::new(),
        }
    }

    /// Enable or disable the layer
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Link objects into the layer
    pub fn with_objects(mut self, objects: impl IntoIterator<Item = ObjectId>) -> Self {
        self.objects.extend(objects);
        self
    }

    /// Add a collection
    pub fn with_collection(mut self, collection: Collection) -> Self {
        self.collections.push(collection);
        self
    }
}

/// Extra per-object parameters that are not part of the scene itself
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CustomParameters {
    /// Directory holding custom GLSL and its shader config
    pub shader_dir: Option<PathBuf>,
    /// Technique to pick from the shader config, "default" when unset
    pub technique: Option<String>,
}

impl CustomParameters {
    /// Parameters selecting the shaders in `shader_dir`
    pub fn with_shader_dir(shader_dir: impl Into<PathBuf>) -> Self {
        Self {
            shader_dir: Some(shader_dir.into()),
            technique: None,
        }
    }
}

/// Everything the exporter reads from one source scene
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceScene {
    /// Scene name; output files are named after it
    pub name: String,
    /// Objects in authoring order
    #[serde(default)]
    pub objects: Vec<SourceObject>,
    /// Output resolution
    #[serde(default)]
    pub render: RenderSettings,
    /// View layers
    #[serde(default)]
    pub view_layers: Vec<ViewLayer>,
    /// Custom parameters keyed by object name
    #[serde(default)]
    pub custom_params: BTreeMap<String, CustomParameters>,
}

impl SourceScene {
    /// Create an empty scene
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            objects: Vec::new(),
            render: RenderSettings::default(),
            view_layers: Vec::new(),
            custom_params: BTreeMap::new(),
        }
    }

    /// Append an object
    pub fn with_object(mut self, object: SourceObject) -> Self {
        self.objects.push(object);
        self
    }

    /// Set the output resolution
    pub fn with_render(mut self, render: RenderSettings) -> Self {
        self.render = render;
        self
    }

    /// Append a view layer
    pub fn with_view_layer(mut self, layer: ViewLayer) -> Self {
        self.view_layers.push(layer);
        self
    }

    /// Attach custom parameters to the object called `object_name`
    pub fn with_custom_params(mut self, object_name: impl Into<String>, params: CustomParameters) -> Self {
        self.custom_params.insert(object_name.into(), params);
        self
    }

    /// Look an object up by identity
    pub fn object(&self, id: ObjectId) -> Option<&SourceObject> {
        self.objects.iter().find(|o| o.id == id)
    }

    /// Look an object up by name
    pub fn object_by_name(&self, name: &str) -> Option<&SourceObject> {
        self.objects.iter().find(|o| o.name == name)
    }

    /// Parse a scene from RON text
    pub fn from_ron_str(text: &str) -> Result<Self, ConfigError> {
        ron::from_str(text).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Load a scene description from a `.ron` file
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_ron_str(&text)
    }
}
