//! Transform compiler
//!
//! The target engine has no Euler rotation with a configurable order. It only
//! offers single-axis rotations, a scale and a translation per node. A local
//! transform is therefore lowered into a chain of primitive nodes:
//!
//! ```text
//! parent ── Translate ── Rotate(last axis) ── Rotate ── Rotate(first axis) ── Scale ── content
//! ```
//!
//! which yields `P_world = T · R_last · R_mid · R_first · S · P_local`.

mod transform;

pub use transform::{RotationConvention, RotationOrder, TransformChain, TransformCompiler, TransformOp};

use thiserror::Error;

/// Transform compilation errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransformError {
    /// The rotation order is not a permutation of `XYZ`
    #[error("Node '{node}' has invalid rotation order '{order}', expected a permutation of XYZ")]
    InvalidRotationOrder {
        /// Node name
        node: String,
        /// Declared order
        order: String,
    },
}
