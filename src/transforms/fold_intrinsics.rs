//! Re-attempts constant folding of floating-point intrinsic nodes.
//!
//! Intrinsic construction already folds when both operands are constant;
//! this pass catches nodes whose operands only became constant later
//! (e.g., after the loop rewrite and constant propagation substituted
//! them). A successful fold replaces the node in place, so its id and
//! every use of it are preserved. Operations without a folding rule are
//! left live for backend lowering.

use crate::context::CompilationContext;
use crate::error::*;
use crate::ir::intrinsics;
use crate::ir::{Graph, NodeKind};

pub fn fold_intrinsics(graph: &mut Graph, _ctx: &CompilationContext) -> SpindleResult<()> {
    let mut folded = 0;
    for id in graph.node_ids() {
        let (x, y, op, kind) = match graph.node(id).kind {
            NodeKind::FPBinaryIntrinsic { op, kind } => {
                let inputs = &graph.node(id).inputs;
                (inputs[0], inputs[1], op, kind)
            }
            _ => continue,
        };
        if let Some(constant) = intrinsics::try_constant_fold(graph, x, y, op, kind) {
            graph.replace_with_constant(id, constant);
            folded += 1;
        }
    }
    if folded > 0 {
        debug!("Folded {} intrinsic node(s)", folded);
    }
    Ok(())
}
