//! Binary floating-point intrinsic nodes.
//!
//! Calls to recognized two-argument math builtins are represented as
//! `FPBinaryIntrinsic` nodes. Construction goes through `create`, which
//! folds the operation to a constant when both operands are compile-time
//! constants of the stated precision and the operation has a defined
//! closed form; the `fold-intrinsics` pass re-attempts the same fold after
//! operand substitution. Operations outside the folding set always
//! produce a live node, which code generation later lowers to exactly one
//! backend builtin call.

use std::fmt;

use super::{BlockId, ConstantKind, FloatKind, Graph, NodeId, NodeKind};

/// The recognized two-argument floating-point builtins.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FPBinaryOp {
    Atan2,
    Copysign,
    Fdim,
    Fma,
    Fmax,
    Fmin,
    Fmod,
    Hypot,
    Maxmag,
    Minmag,
    Nextafter,
    Pow,
    Remainder,
}

impl FPBinaryOp {
    pub fn name(&self) -> &'static str {
        use self::FPBinaryOp::*;
        match *self {
            Atan2 => "atan2",
            Copysign => "copysign",
            Fdim => "fdim",
            Fma => "fma",
            Fmax => "fmax",
            Fmin => "fmin",
            Fmod => "fmod",
            Hypot => "hypot",
            Maxmag => "maxmag",
            Minmag => "minmag",
            Nextafter => "nextafter",
            Pow => "pow",
            Remainder => "remainder",
        }
    }
}

impl fmt::Display for FPBinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Creates an intrinsic node for `op` over `x` and `y`, or a constant node
/// if the operation folds.
pub fn create(
    graph: &mut Graph,
    block: BlockId,
    x: NodeId,
    y: NodeId,
    op: FPBinaryOp,
    kind: FloatKind,
) -> NodeId {
    if let Some(c) = try_constant_fold(graph, x, y, op, kind) {
        return graph.add_node(block, NodeKind::Constant(c), vec![]);
    }
    graph.add_node(block, NodeKind::FPBinaryIntrinsic { op, kind }, vec![x, y])
}

/// Evaluates `op` over constant operands at the given precision, if both
/// operands are constants of that precision and `op` has a folding rule.
pub fn try_constant_fold(
    graph: &Graph,
    x: NodeId,
    y: NodeId,
    op: FPBinaryOp,
    kind: FloatKind,
) -> Option<ConstantKind> {
    let cx = graph.constant(x)?;
    let cy = graph.constant(y)?;
    match kind {
        FloatKind::F64 => {
            let result = compute_f64(cx.as_f64()?, cy.as_f64()?, op)?;
            Some(ConstantKind::for_f64(result))
        }
        FloatKind::F32 => {
            let result = compute_f32(cx.as_f32()?, cy.as_f32()?, op)?;
            Some(ConstantKind::for_f32(result))
        }
    }
}

fn compute_f64(x: f64, y: f64, op: FPBinaryOp) -> Option<f64> {
    use self::FPBinaryOp::*;
    match op {
        Atan2 => Some(x.atan2(y)),
        Fmin => Some(x.min(y)),
        Fmax => Some(x.max(y)),
        Pow => Some(x.powf(y)),
        _ => None,
    }
}

fn compute_f32(x: f32, y: f32, op: FPBinaryOp) -> Option<f32> {
    use self::FPBinaryOp::*;
    match op {
        Atan2 => Some(x.atan2(y)),
        Fmin => Some(x.min(y)),
        Fmax => Some(x.max(y)),
        Pow => Some(x.powf(y)),
        _ => None,
    }
}
