//! Camera payload
//!
//! The authoring tool stores one field of view plus a sensor fit mode. The
//! target engine wants both axes, so the axis the fit mode does not pin is
//! derived from the output aspect ratio.

use crate::foundation::math::utils::derive_fov;
use crate::source::{CameraData, ProjectionType, RenderSettings, SensorFit};

use super::GraphError;

/// Projection of a camera node
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CameraProjection {
    /// Perspective projection using the node's field of view
    Perspective,
    /// Orthographic projection with the given magnification
    Orthographic {
        /// Horizontal view volume extent
        x_mag: f32,
        /// Vertical view volume extent
        y_mag: f32,
    },
}

/// Camera payload of a node
#[derive(Debug, Clone, PartialEq)]
pub struct CameraNode {
    /// Projection kind
    pub projection: CameraProjection,
    /// Field of view along the fitted axis, radians
    pub fov: f32,
    /// Horizontal field of view, radians
    pub horizontal_fov: f32,
    /// Vertical field of view, radians
    pub vertical_fov: f32,
    /// Near clip distance
    pub z_near: f32,
    /// Far clip distance
    pub z_far: f32,
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
    /// Viewport width in pixels
    pub width: u32,
    /// Viewport height in pixels
    pub height: u32,
}

impl CameraNode {
    /// Build the payload for camera `name`
    ///
    /// Fails for projections the engine cannot express and for empty
    /// viewports.
    pub fn from_source(name: &str, data: &CameraData, render: &RenderSettings) -> Result<Self, GraphError> {
        let projection = match data.projection {
            ProjectionType::Perspective => CameraProjection::Perspective,
            ProjectionType::Orthographic => CameraProjection::Orthographic {
                x_mag: data.ortho_scale,
                y_mag: data.ortho_scale,
            },
            ProjectionType::Panoramic => {
                return Err(GraphError::UnsupportedObjectType {
                    name: name.to_string(),
                    object_type: "CAMERA (PANO)".to_string(),
                })
            }
        };

        let width = render.width();
        let height = render.height();
        if !(width >= 1.0 && height >= 1.0) {
            return Err(GraphError::UnsupportedObjectType {
                name: name.to_string(),
                object_type: format!("CAMERA ({width}x{height} viewport)"),
            });
        }
        let aspect = width / height;

        let (horizontal_fov, vertical_fov) = if width >= height {
            if data.sensor_fit == SensorFit::Vertical {
                (derive_fov(data.angle_y, 1.0 / aspect), data.angle_y)
            } else {
                (data.angle, derive_fov(data.angle, aspect))
            }
        } else if data.sensor_fit == SensorFit::Horizontal {
            (data.angle, derive_fov(data.angle, aspect))
        } else {
            (derive_fov(data.angle_y, 1.0 / aspect), data.angle_y)
        };

        Ok(Self {
            projection,
            fov: data.angle,
            horizontal_fov,
            vertical_fov,
            z_near: data.clip_start,
            z_far: data.clip_end,
            sensor_fit: data.sensor_fit,
            sensor_width: data.sensor_width,
            sensor_height: data.sensor_height,
            shift_x: data.shift_x,
            shift_y: data.shift_y,
            width: width.round() as u32,
            height: height.round() as u32,
        })
    }

    /// Viewport aspect ratio, width over height
    pub fn aspect_ratio(&self) -> f32 {
        self.width as f32 / self.height as f32
    }

    /// Whether this is a perspective camera
    pub const fn is_perspective(&self) -> bool {
        matches!(self.projection, CameraProjection::Perspective)
    }

    /// Short label used in logs
    pub fn label(&self) -> &'static str {
        match self.projection {
            CameraProjection::Perspective => "PerspectiveCamera",
            CameraProjection::Orthographic { .. } => "OrthographicCamera",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_landscape_auto_fit_derives_vertical_fov() {
        let camera = CameraNode::from_source("Camera", &CameraData::default(), &RenderSettings::new(1920, 1080)).unwrap();

        let expected = 2.0 * ((0.691_150_4_f32 / 2.0).tan() * 1080.0 / 1920.0).atan();
        assert_relative_eq!(camera.horizontal_fov, 0.691_150_4, epsilon = 1e-6);
        assert_relative_eq!(camera.vertical_fov, expected, epsilon = 1e-6);
        assert!(camera.vertical_fov < camera.horizontal_fov);
        assert_eq!((camera.width, camera.height), (1920, 1080));
        assert_relative_eq!(camera.aspect_ratio(), 16.0 / 9.0, epsilon = 1e-6);
    }

    #[test]
    fn test_landscape_vertical_fit_keeps_vertical_fov() {
        let data = CameraData {
            sensor_fit: SensorFit::Vertical,
            ..CameraData::default()
        };
        let camera = CameraNode::from_source("Camera", &data, &RenderSettings::new(1920, 1080)).unwrap();

        assert_relative_eq!(camera.vertical_fov, data.angle_y, epsilon = 1e-6);
        assert!(camera.horizontal_fov > camera.vertical_fov);
    }

    #[test]
    fn test_portrait_auto_fit_keeps_vertical_fov() {
        let data = CameraData::default();
        let camera = CameraNode::from_source("Camera", &data, &RenderSettings::new(1080, 1920)).unwrap();

        assert_relative_eq!(camera.vertical_fov, data.angle_y, epsilon = 1e-6);
        assert!(camera.horizontal_fov < camera.vertical_fov);
    }

    #[test]
    fn test_portrait_horizontal_fit_derives_vertical_fov() {
        let data = CameraData {
            sensor_fit: SensorFit::Horizontal,
            ..CameraData::default()
        };
        let camera = CameraNode::from_source("Camera", &data, &RenderSettings::new(1080, 1920)).unwrap();

        assert_relative_eq!(camera.horizontal_fov, data.angle, epsilon = 1e-6);
        assert!(camera.vertical_fov > camera.horizontal_fov);
    }

    #[test]
    fn test_orthographic_uses_ortho_scale() {
        let data = CameraData {
            projection: ProjectionType::Orthographic,
            ortho_scale: 4.0,
            ..CameraData::default()
        };
        let camera = CameraNode::from_source("Ortho", &data, &RenderSettings::default()).unwrap();

        assert_eq!(camera.projection, CameraProjection::Orthographic { x_mag: 4.0, y_mag: 4.0 });
        assert_eq!(camera.label(), "OrthographicCamera");
    }

    #[test]
    fn test_panoramic_is_unsupported() {
        let data = CameraData {
            projection: ProjectionType::Panoramic,
            ..CameraData::default()
        };
        let err = CameraNode::from_source("Pano", &data, &RenderSettings::default()).unwrap_err();
        assert!(matches!(err, GraphError::UnsupportedObjectType { .. }));
    }
}
