//! Backend builtin lowering for intrinsic nodes.
//!
//! Each supported device target carries a table mapping intrinsic
//! operations to backend builtin symbols. Lowering a live intrinsic node
//! emits exactly one builtin call; an operation missing from a target's
//! table is a backend capability gap and lowering it is a fatal
//! unsupported-operation error, surfaced to the caller rather than
//! silently downgraded. The actual binary emitters behind the builtin
//! symbols (OpenCL, PTX, SPIR-V) are external collaborators.

use std::fmt;

use crate::code_builder::CodeBuilder;
use crate::error::*;
use crate::ir::intrinsics::FPBinaryOp;
use crate::ir::{FloatKind, Graph, NodeId, NodeKind};

/// A device backend target.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Target {
    OpenCl,
    Ptx,
    Spirv,
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let text = match *self {
            Target::OpenCl => "opencl",
            Target::Ptx => "ptx",
            Target::Spirv => "spirv",
        };
        f.write_str(text)
    }
}

/// Returns the builtin symbol `target` uses for `op` at `kind`, if the
/// target's table has an entry for it.
pub fn fp_binary_builtin(target: Target, op: FPBinaryOp, kind: FloatKind) -> Option<String> {
    match target {
        // OpenCL builtins are overloaded over float widths.
        Target::OpenCl => opencl_builtin(op).map(str::to_string),
        Target::Spirv => spirv_builtin(op).map(str::to_string),
        // libdevice names are suffixed for the 32-bit variants.
        Target::Ptx => ptx_builtin(op).map(|s| match kind {
            FloatKind::F32 => format!("{}f", s),
            FloatKind::F64 => s.to_string(),
        }),
    }
}

fn opencl_builtin(op: FPBinaryOp) -> Option<&'static str> {
    use crate::ir::intrinsics::FPBinaryOp::*;
    match op {
        Atan2 => Some("atan2"),
        Copysign => Some("copysign"),
        Fdim => Some("fdim"),
        Fmax => Some("fmax"),
        Fmin => Some("fmin"),
        Fmod => Some("fmod"),
        Hypot => Some("hypot"),
        Maxmag => Some("maxmag"),
        Minmag => Some("minmag"),
        Nextafter => Some("nextafter"),
        Pow => Some("pow"),
        Remainder => Some("remainder"),
        Fma => None,
    }
}

fn ptx_builtin(op: FPBinaryOp) -> Option<&'static str> {
    use crate::ir::intrinsics::FPBinaryOp::*;
    match op {
        Atan2 => Some("__nv_atan2"),
        Copysign => Some("__nv_copysign"),
        Fdim => Some("__nv_fdim"),
        Fmax => Some("__nv_fmax"),
        Fmin => Some("__nv_fmin"),
        Fmod => Some("__nv_fmod"),
        Hypot => Some("__nv_hypot"),
        Nextafter => Some("__nv_nextafter"),
        Pow => Some("__nv_pow"),
        Remainder => Some("__nv_remainder"),
        // libdevice has no magnitude comparisons and no binary fma form.
        Maxmag | Minmag | Fma => None,
    }
}

fn spirv_builtin(op: FPBinaryOp) -> Option<&'static str> {
    use crate::ir::intrinsics::FPBinaryOp::*;
    // The SPIR-V backend only wires up the OpenCL extended-set entries for
    // the four folding-set operations.
    match op {
        Atan2 => Some("atan2"),
        Fmax => Some("fmax"),
        Fmin => Some("fmin"),
        Pow => Some("pow"),
        _ => None,
    }
}

/// Lowers one live intrinsic node into a single backend builtin call.
pub fn lower_fp_binary(graph: &Graph, node: NodeId, target: Target) -> SpindleResult<String> {
    let (op, kind) = match graph.node(node).kind {
        NodeKind::FPBinaryIntrinsic { op, kind } => (op, kind),
        ref other => {
            return compile_err!(
                "Cannot lower v{} as an intrinsic: unexpected {} node",
                node,
                other.name()
            );
        }
    };
    match fp_binary_builtin(target, op, kind) {
        Some(builtin) => {
            let x = operand(graph, graph.node(node).inputs[0]);
            let y = operand(graph, graph.node(node).inputs[1]);
            Ok(format!("{}({}, {})", builtin, x, y))
        }
        None => unsupported_err!(
            "Math operation {} not supported yet on the {} target",
            op,
            target
        ),
    }
}

fn operand(graph: &Graph, id: NodeId) -> String {
    match graph.constant(id) {
        Some(c) => format!("{}", c),
        None => format!("v{}", id),
    }
}

fn value_type(kind: FloatKind) -> &'static str {
    match kind {
        FloatKind::F32 => "float",
        FloatKind::F64 => "double",
    }
}

/// Walks the graph schedule and emits one assignment per live intrinsic
/// node. Fails on the first operation the target cannot lower.
pub fn lower_intrinsics(graph: &Graph, target: Target) -> SpindleResult<String> {
    let mut code = CodeBuilder::new();
    for block in graph.blocks() {
        for &id in block.nodes.iter() {
            if let NodeKind::FPBinaryIntrinsic { kind, .. } = graph.node(id).kind {
                let call = lower_fp_binary(graph, id, target)?;
                code.add_line(&format!("{} v{} = {};", value_type(kind), id, call));
            }
        }
    }
    Ok(code.result().to_string())
}
