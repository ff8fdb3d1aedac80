//! Rewrites declared-parallel loops into explicit parallel-range primitives.
//!
//! For every loop induction variable whose value was marked by a parallel
//! annotation, the loop's scalar iteration arithmetic is replaced with a
//! per-dimension `ParallelOffset`/`ParallelStride`/`ParallelRange` triple.
//! The downstream scheduler substitutes an external per-work-item
//! coordinate (`offset + work_item * stride`, bounded by the range) for
//! the rewritten induction variable at dispatch time.
//!
//! The rewrite requires a constant initial value and a constant stride;
//! anything else bails out, and the procedure falls back to unmodified
//! sequential compilation. A bailout from one loop does not roll back
//! rewrites already applied to loops processed earlier in the same pass.

use crate::analysis::{InductionVariable, LoopsData};
use crate::annotations;
use crate::context::CompilationContext;
use crate::error::*;
use crate::ir::{Graph, NodeId, NodeKind};

/// Parallel-loop rewriting pass. Processes loops outer-first, or
/// inner-first when the loop-order configuration flag is reversed, and
/// assigns dense dimension indices in processing order.
pub fn parallelize(graph: &mut Graph, ctx: &CompilationContext) -> SpindleResult<()> {
    let parallel_nodes = annotations::resolve(graph, ctx.annotation_provider());

    if !graph.has_loops() {
        return Ok(());
    }

    let data = LoopsData::analyze(graph);
    let mut loops = data.loops;
    if ctx.conf().reverse_loop_order {
        loops.reverse();
    }

    let mut loop_index: u32 = 0;
    for l in loops.iter() {
        for iv in l.induction_variables.iter() {
            if !parallel_nodes.contains_key(&iv.value) {
                continue;
            }

            let conditions: Vec<NodeId> = graph
                .unique_usages(iv.value)
                .into_iter()
                .filter(|&user| graph.node(user).kind == NodeKind::IntegerLessThan)
                .collect();
            if conditions.is_empty() {
                return bailout_err!(
                    "Failed to parallelize {}: annotated induction variable has no bounding \
                     comparison. Sequential code will run on the device!",
                    graph.function_name(graph.root_function())
                );
            }

            // The first bounding comparison is authoritative; its right
            // operand becomes the parallel range's bound.
            let less_than = conditions[0];
            let max_iterations = graph.node(less_than).inputs[1];

            parallelization_replacement(graph, iv, loop_index, max_iterations, less_than)?;

            loop_index += 1;
        }
    }

    if loop_index > 0 {
        info!(
            "Parallelized {} loop dimension(s) in {}",
            loop_index,
            graph.function_name(graph.root_function())
        );
    }
    Ok(())
}

fn parallelization_replacement(
    graph: &mut Graph,
    iv: &InductionVariable,
    loop_index: u32,
    max_iterations: NodeId,
    condition: NodeId,
) -> SpindleResult<()> {
    let init = match iv.constant_init(graph) {
        Some(v) => v,
        None => {
            return bailout_err!(
                "Failed to parallelize {} because of a non-constant loop initial value. \
                 Sequential code will run on the device!",
                graph.function_name(graph.root_function())
            );
        }
    };
    let stride = match iv.constant_stride(graph) {
        Some(v) => v,
        None => {
            return bailout_err!(
                "Failed to parallelize {} because of non-constant loop strides. \
                 Sequential code will run on the device!",
                graph.function_name(graph.root_function())
            );
        }
    };

    let phi = iv.value;
    let block = graph.node(phi).block;

    let new_init = graph.const_i32(block, init as i32);
    let new_stride = graph.const_i32(block, stride as i32);
    let offset = graph.add_node(
        block,
        NodeKind::ParallelOffset { index: loop_index },
        vec![new_init],
    );
    let stride_node = graph.add_node(
        block,
        NodeKind::ParallelStride { index: loop_index },
        vec![new_stride],
    );
    let range = graph.add_node(
        block,
        NodeKind::ParallelRange { index: loop_index },
        vec![max_iterations, offset, stride_node],
    );

    // The value flowing along the back edge. If something other than the
    // phi also consumes it, move those consumers onto a duplicate so the
    // rewrite below only changes what the phi observes.
    let old_stride = iv.back_value;
    if graph.usages(old_stride).len() > 1 {
        let duplicate = graph.duplicate_with_inputs(old_stride);
        graph.replace_at_matching_usages(old_stride, duplicate, |usage| usage != phi);
    }

    graph.replace_at_matching_usages(iv.init, offset, |node| node == phi);
    graph.replace_at_matching_usages(iv.stride, stride_node, |node| node == old_stride);
    // Only replace this node in the loop condition.
    graph.replace_at_matching_usages(max_iterations, range, |node| node == condition);

    debug!(
        "Rewrote induction variable v{} as parallel dimension {} (init {}, stride {})",
        phi, loop_index, init, stride
    );
    Ok(())
}
