use std::fmt;

use serde::{Deserialize, Serialize};

use crate::foundation::math::utils::{deg_to_rad, rad_to_deg};
use crate::foundation::math::{Axis, Mat4, Mat4Ext, Vec3};
use crate::ir::Node;

use super::TransformError;

/// Euler axis order, first axis applied first
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RotationOrder([Axis; 3]);

impl RotationOrder {
    /// Parse a three letter permutation of `XYZ`
    pub fn parse(order: &str) -> Option<Self> {
        let mut axes = [Axis::X; 3];
        let mut chars = order.chars();
        for slot in &mut axes {
            *slot = Axis::from_letter(chars.next()?)?;
        }
        if chars.next().is_some() || axes[0] == axes[1] || axes[1] == axes[2] || axes[0] == axes[2] {
            return None;
        }
        Some(Self(axes))
    }

    /// Axes in application order
    pub const fn axes(&self) -> &[Axis; 3] {
        &self.0
    }
}

impl Default for RotationOrder {
    fn default() -> Self {
        Self([Axis::X, Axis::Y, Axis::Z])
    }
}

impl fmt::Display for RotationOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for axis in &self.0 {
            write!(f, "{axis}")?;
        }
        Ok(())
    }
}

/// Direction in which the target engine turns for a positive angle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RotationConvention {
    /// Positive angles turn clockwise; source angles are negated
    #[default]
    Clockwise,
    /// Positive angles turn counter-clockwise; source angles pass through
    CounterClockwise,
}

impl RotationConvention {
    /// Factor mapping a right-handed angle to the engine's angle
    pub const fn sign(self) -> f32 {
        match self {
            Self::Clockwise => -1.0,
            Self::CounterClockwise => 1.0,
        }
    }

    /// Matrix the engine builds for a rotation of `degrees` about `axis`
    pub fn rotation_matrix(self, axis: Axis, degrees: f32) -> Mat4 {
        Mat4::rotation_about(axis, self.sign() * deg_to_rad(degrees))
    }
}

/// One primitive transform node
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TransformOp {
    /// Translation
    Translate(Vec3),
    /// Single-axis rotation in engine degrees
    Rotate {
        /// Rotation axis
        axis: Axis,
        /// Angle as passed to the engine
        degrees: f32,
    },
    /// Non-uniform scale
    Scale(Vec3),
}

impl TransformOp {
    /// Matrix of this op under `convention`
    pub fn to_matrix(&self, convention: RotationConvention) -> Mat4 {
        match *self {
            Self::Translate(offset) => Mat4::new_translation(&offset),
            Self::Rotate { axis, degrees } => convention.rotation_matrix(axis, degrees),
            Self::Scale(factors) => Mat4::new_nonuniform_scaling(&factors),
        }
    }
}

/// Ordered primitive transforms, root to leaf
#[derive(Debug, Clone, PartialEq)]
pub struct TransformChain {
    ops: Vec<TransformOp>,
}

impl TransformChain {
    /// Ops from the outermost (attached to the parent) to the innermost
    pub fn ops(&self) -> &[TransformOp] {
        &self.ops
    }

    /// Number of primitive nodes
    pub fn len(&self) -> usize {
        self.ops.len()
    }

    /// Whether the chain has no ops
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Rotation ops, outermost first
    pub fn rotations(&self) -> impl Iterator<Item = (Axis, f32)> + '_ {
        self.ops.iter().filter_map(|op| match *op {
            TransformOp::Rotate { axis, degrees } => Some((axis, degrees)),
            _ => None,
        })
    }

    /// Whether every op leaves points where they are
    pub fn is_identity(&self) -> bool {
        self.ops.iter().all(|op| match *op {
            TransformOp::Translate(offset) => offset == Vec3::zeros(),
            TransformOp::Rotate { degrees, .. } => degrees == 0.0,
            TransformOp::Scale(factors) => factors == Vec3::new(1.0, 1.0, 1.0),
        })
    }

    /// Compose the chain into one matrix the way the engine evaluates it
    pub fn to_matrix(&self, convention: RotationConvention) -> Mat4 {
        self.ops
            .iter()
            .fold(Mat4::identity(), |acc, op| acc * op.to_matrix(convention))
    }
}

/// Lowers node transforms into [`TransformChain`]s
#[derive(Debug, Clone, Copy, Default)]
pub struct TransformCompiler {
    convention: RotationConvention,
}

impl TransformCompiler {
    /// Compiler targeting an engine with the given rotation convention
    pub const fn new(convention: RotationConvention) -> Self {
        Self { convention }
    }

    /// Rotation convention in use
    pub const fn convention(&self) -> RotationConvention {
        self.convention
    }

    /// Chain for `node`, or `None` for the root
    ///
    /// Reads only the local transform; the world matrix snapshot is ignored
    /// so parent transforms are never applied twice.
    pub fn compile(&self, node: &Node) -> Result<Option<TransformChain>, TransformError> {
        if node.is_root() {
            return Ok(None);
        }

        let order = RotationOrder::parse(&node.rotation_order).ok_or_else(|| TransformError::InvalidRotationOrder {
            node: node.name.clone(),
            order: node.rotation_order.clone(),
        })?;

        let mut ops = Vec::with_capacity(5);
        ops.push(TransformOp::Translate(node.location));
        for &axis in order.axes().iter().rev() {
            ops.push(TransformOp::Rotate {
                axis,
                degrees: self.convention.sign() * rad_to_deg(node.rotation[axis.index()]),
            });
        }
        ops.push(TransformOp::Scale(node.scale));

        log::trace!("Compiled {} rotation order {} into {} ops", node.name, order, ops.len());
        Ok(Some(TransformChain { ops }))
    }
}
