//! Light payload

use crate::foundation::math::Vec3;
use crate::source::{AreaShape, LightData, LightType};

/// Subtype specific light attributes
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LightSubtype {
    /// Omnidirectional light with distance attenuation
    Point {
        /// Constant attenuation term
        constant: f32,
        /// Linear attenuation term
        linear: f32,
        /// Quadratic attenuation term
        quadratic: f32,
    },
    /// Directional light at infinite distance
    Sun {
        /// Angular diameter, radians
        angle: f32,
    },
    /// Cone light
    Spot {
        /// Cone angle, radians
        size: f32,
        /// Edge softness, 0..1
        blend: f32,
        /// Whether the cone is drawn
        show_cone: bool,
    },
    /// Emitting surface
    Area {
        /// Surface shape
        shape: AreaShape,
        /// Extent along X
        size: f32,
        /// Extent along Y, equal to `size` for square and disk shapes
        size_y: f32,
    },
}

/// Light payload of a node
#[derive(Debug, Clone, PartialEq)]
pub struct LightNode {
    /// Linear RGB color
    pub color: Vec3,
    /// Emitted power
    pub energy: f32,
    /// Influence radius
    pub cutoff_distance: f32,
    /// Specular multiplier
    pub specular_factor: f32,
    /// Soft shadow radius
    pub shadow_soft_size: f32,
    /// Whether the light casts shadows
    pub use_shadow: bool,
    /// Subtype attributes
    pub subtype: LightSubtype,
}

impl LightNode {
    /// Build the payload from raw light attributes
    pub fn from_source(data: &LightData) -> Self {
        let subtype = match data.light_type {
            LightType::Point => LightSubtype::Point {
                constant: data.constant_coefficient,
                linear: data.linear_coefficient,
                quadratic: data.quadratic_coefficient,
            },
            LightType::Sun => LightSubtype::Sun { angle: data.angle },
            LightType::Spot => LightSubtype::Spot {
                size: data.spot_size,
                blend: data.spot_blend,
                show_cone: data.show_cone,
            },
            LightType::Area => {
                let size_y = match data.shape {
                    AreaShape::Square | AreaShape::Disk => data.size,
                    AreaShape::Rectangle | AreaShape::Ellipse => data.size_y,
                };
                LightSubtype::Area {
                    shape: data.shape,
                    size: data.size,
                    size_y,
                }
            }
        };

        Self {
            color: data.color,
            energy: data.energy,
            cutoff_distance: data.cutoff_distance,
            specular_factor: data.specular_factor,
            shadow_soft_size: data.shadow_soft_size,
            use_shadow: data.use_shadow,
            subtype,
        }
    }

    /// Short label used in logs
    pub fn label(&self) -> &'static str {
        match self.subtype {
            LightSubtype::Point { .. } => "PointLight",
            LightSubtype::Sun { .. } => "SunLight",
            LightSubtype::Spot { .. } => "SpotLight",
            LightSubtype::Area { .. } => "AreaLight",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_point_light_keeps_attenuation() {
        let light = LightNode::from_source(&LightData::default());

        assert_eq!(
            light.subtype,
            LightSubtype::Point {
                constant: 1.0,
                linear: 0.0,
                quadratic: 1.0
            }
        );
        assert_eq!(light.label(), "PointLight");
    }

    #[test]
    fn test_square_area_light_ignores_size_y() {
        let data = LightData {
            light_type: LightType::Area,
            shape: AreaShape::Square,
            size: 2.0,
            size_y: 5.0,
            ..LightData::default()
        };

        match LightNode::from_source(&data).subtype {
            LightSubtype::Area { size, size_y, .. } => assert_eq!((size, size_y), (2.0, 2.0)),
            other => panic!("expected area light, got {other:?}"),
        }
    }

    #[test]
    fn test_spot_light_label() {
        let data = LightData {
            light_type: LightType::Spot,
            ..LightData::default()
        };
        assert_eq!(LightNode::from_source(&data).label(), "SpotLight");
    }
}
