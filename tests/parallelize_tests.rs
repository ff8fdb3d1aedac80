//! End-to-end tests for the parallel-loop rewrite.

mod common;

use common::*;

use spindle::annotations::{ParallelAnnotation, StaticAnnotationProvider};
use spindle::ir::{BlockId, Graph, NodeId, NodeKind};
use spindle::CompilationStats;

/// Builds `for (i = init; i < bound; i += stride)` with a frame-capture
/// site binding the induction variable to local slot `slot` at bytecode
/// offset `bci`, and returns the loop handles.
fn annotated_loop(
    graph: &mut Graph,
    pred: BlockId,
    init: NodeId,
    stride: NodeId,
    bound: NodeId,
    bci: u32,
    slot: u32,
) -> spindle::ir::builder::CountedLoop {
    let lp = graph.counted_loop(pred, init, stride, bound);
    let root = graph.root_function();
    graph.frame_state(lp.header, root, bci, &[(slot, lp.phi)]);
    lp
}

fn annotation(bci: u32, slot: u32) -> ParallelAnnotation {
    ParallelAnnotation::new(bci.saturating_sub(2), 8, slot)
}

fn offset_index(graph: &Graph, node: NodeId) -> u32 {
    match graph.node(node).kind {
        NodeKind::ParallelOffset { index } => index,
        ref other => panic!("expected a parallel offset, got {:?}", other),
    }
}

fn count_kind<F: Fn(&NodeKind) -> bool>(graph: &Graph, pred: F) -> usize {
    graph
        .node_ids()
        .filter(|&id| pred(&graph.node(id).kind))
        .count()
}

#[test]
fn rewrites_constant_counted_loop() {
    init_logging();
    let mut graph = Graph::new("kernel");
    let entry = graph.entry();
    let init = graph.const_i32(entry, 0);
    let stride = graph.const_i32(entry, 1);
    let bound = graph.parameter(entry, 0);
    let lp = annotated_loop(&mut graph, entry, init, stride, bound, 10, 2);

    let mut provider = StaticAnnotationProvider::new();
    provider.insert("kernel", vec![annotation(10, 2)]);
    let ctx = context(provider, false);

    ctx.compile_graph(&mut graph, &mut CompilationStats::new())
        .unwrap();

    // The phi's loop-entry input is now the parallel offset over a fresh
    // constant, not the original init node.
    let offset = graph.node(lp.phi).inputs[0];
    assert_eq!(offset_index(&graph, offset), 0);
    assert_ne!(graph.node(offset).inputs[0], init);

    // The increment now steps by the parallel stride.
    let stride_input = graph.node(lp.increment).inputs[1];
    match graph.node(stride_input).kind {
        NodeKind::ParallelStride { index } => assert_eq!(index, 0),
        ref other => panic!("expected a parallel stride, got {:?}", other),
    }

    // The bound test now compares against the range, which still holds the
    // original bound as its own input.
    let range = graph.node(lp.condition).inputs[1];
    match graph.node(range).kind {
        NodeKind::ParallelRange { index } => assert_eq!(index, 0),
        ref other => panic!("expected a parallel range, got {:?}", other),
    }
    assert_eq!(graph.node(range).inputs, vec![bound, offset, stride_input]);
}

#[test]
fn exposes_scheduler_trip_count() {
    init_logging();
    let mut graph = Graph::new("kernel");
    let entry = graph.entry();
    let init = graph.const_i32(entry, 3);
    let stride = graph.const_i32(entry, 2);
    let bound = graph.const_i32(entry, 10);
    let lp = annotated_loop(&mut graph, entry, init, stride, bound, 10, 2);

    let mut provider = StaticAnnotationProvider::new();
    provider.insert("kernel", vec![annotation(10, 2)]);
    let ctx = context(provider, false);
    ctx.compile_graph(&mut graph, &mut CompilationStats::new())
        .unwrap();

    // i = 3, 5, 7, 9 under i < 10: four work items.
    let range = graph.node(lp.condition).inputs[1];
    assert_eq!(graph.dimension_size(range), Some(4));
}

#[test]
fn dimension_indices_follow_declared_order() {
    init_logging();
    let mut graph = Graph::new("kernel");
    let entry = graph.entry();
    let init = graph.const_i32(entry, 0);
    let stride = graph.const_i32(entry, 1);
    let bound = graph.parameter(entry, 0);
    let first = annotated_loop(&mut graph, entry, init, stride, bound, 10, 2);
    let second = annotated_loop(&mut graph, first.exit, init, stride, bound, 30, 3);

    let mut provider = StaticAnnotationProvider::new();
    provider.insert("kernel", vec![annotation(10, 2), annotation(30, 3)]);
    let ctx = context(provider, false);
    ctx.compile_graph(&mut graph, &mut CompilationStats::new())
        .unwrap();

    assert_eq!(offset_index(&graph, graph.node(first.phi).inputs[0]), 0);
    assert_eq!(offset_index(&graph, graph.node(second.phi).inputs[0]), 1);
}

#[test]
fn reversed_order_flips_dimension_assignment() {
    init_logging();
    let mut graph = Graph::new("kernel");
    let entry = graph.entry();
    let init = graph.const_i32(entry, 0);
    let stride = graph.const_i32(entry, 1);
    let bound = graph.parameter(entry, 0);
    let first = annotated_loop(&mut graph, entry, init, stride, bound, 10, 2);
    let second = annotated_loop(&mut graph, first.exit, init, stride, bound, 30, 3);

    let mut provider = StaticAnnotationProvider::new();
    provider.insert("kernel", vec![annotation(10, 2), annotation(30, 3)]);
    let ctx = context(provider, true);
    ctx.compile_graph(&mut graph, &mut CompilationStats::new())
        .unwrap();

    // Same dense indices, assigned in the opposite processing order.
    assert_eq!(offset_index(&graph, graph.node(first.phi).inputs[0]), 1);
    assert_eq!(offset_index(&graph, graph.node(second.phi).inputs[0]), 0);
}

#[test]
fn shared_back_value_keeps_other_consumer_intact() {
    init_logging();
    let mut graph = Graph::new("kernel");
    let entry = graph.entry();
    let init = graph.const_i32(entry, 0);
    let stride = graph.const_i32(entry, 1);
    let bound = graph.parameter(entry, 0);
    let array = graph.parameter(entry, 1);
    let lp = annotated_loop(&mut graph, entry, init, stride, bound, 10, 2);
    // A second consumer of the increment, besides the phi.
    let store = graph.add_node(
        lp.body,
        NodeKind::ArrayStore,
        vec![array, lp.phi, lp.increment],
    );

    let mut provider = StaticAnnotationProvider::new();
    provider.insert("kernel", vec![annotation(10, 2)]);
    let ctx = context(provider, false);
    ctx.compile_graph(&mut graph, &mut CompilationStats::new())
        .unwrap();

    // The store observes a duplicate that still adds the original constant
    // stride; only the phi-facing increment was redirected.
    let store_value = graph.node(store).inputs[2];
    assert_ne!(store_value, lp.increment);
    assert_eq!(graph.node(store_value).inputs[0], lp.phi);
    assert_eq!(graph.node(store_value).inputs[1], stride);

    assert_eq!(graph.node(lp.phi).inputs[1], lp.increment);
    let redirected = graph.node(lp.increment).inputs[1];
    match graph.node(redirected).kind {
        NodeKind::ParallelStride { .. } => {}
        ref other => panic!("expected a parallel stride, got {:?}", other),
    }
}

#[test]
fn non_constant_stride_bails_out_without_partial_nodes() {
    init_logging();
    let mut graph = Graph::new("kernel");
    let entry = graph.entry();
    let init = graph.const_i32(entry, 0);
    let stride = graph.parameter(entry, 0);
    let bound = graph.parameter(entry, 1);
    annotated_loop(&mut graph, entry, init, stride, bound, 10, 2);

    let mut provider = StaticAnnotationProvider::new();
    provider.insert("kernel", vec![annotation(10, 2)]);
    let ctx = context(provider, false);

    let err = ctx
        .compile_graph(&mut graph, &mut CompilationStats::new())
        .unwrap_err();
    assert!(err.is_bailout());
    assert!(err.message().contains("non-constant loop strides"));
    assert!(err.message().contains("kernel"));

    let parallel = |kind: &NodeKind| match *kind {
        NodeKind::ParallelOffset { .. }
        | NodeKind::ParallelStride { .. }
        | NodeKind::ParallelRange { .. } => true,
        _ => false,
    };
    assert_eq!(count_kind(&graph, parallel), 0);
}

#[test]
fn non_constant_init_names_the_reason() {
    init_logging();
    let mut graph = Graph::new("kernel");
    let entry = graph.entry();
    let init = graph.parameter(entry, 0);
    let stride = graph.const_i32(entry, 1);
    let bound = graph.parameter(entry, 1);
    annotated_loop(&mut graph, entry, init, stride, bound, 10, 2);

    let mut provider = StaticAnnotationProvider::new();
    provider.insert("kernel", vec![annotation(10, 2)]);
    let ctx = context(provider, false);

    let err = ctx
        .compile_graph(&mut graph, &mut CompilationStats::new())
        .unwrap_err();
    assert!(err.is_bailout());
    assert!(err.message().contains("non-constant loop initial value"));
}

#[test]
fn bailout_preserves_earlier_rewrites() {
    init_logging();
    let mut graph = Graph::new("kernel");
    let entry = graph.entry();
    let init = graph.const_i32(entry, 0);
    let stride = graph.const_i32(entry, 1);
    let bad_stride = graph.parameter(entry, 0);
    let bound = graph.parameter(entry, 1);
    let first = annotated_loop(&mut graph, entry, init, stride, bound, 10, 2);
    annotated_loop(&mut graph, first.exit, init, bad_stride, bound, 30, 3);

    let mut provider = StaticAnnotationProvider::new();
    provider.insert("kernel", vec![annotation(10, 2), annotation(30, 3)]);
    let ctx = context(provider, false);

    let err = ctx
        .compile_graph(&mut graph, &mut CompilationStats::new())
        .unwrap_err();
    assert!(err.is_bailout());

    // No rollback: the first loop's rewrite is still in the graph.
    let ranges = |kind: &NodeKind| match *kind {
        NodeKind::ParallelRange { .. } => true,
        _ => false,
    };
    assert_eq!(count_kind(&graph, ranges), 1);
    assert_eq!(offset_index(&graph, graph.node(first.phi).inputs[0]), 0);
}

#[test]
fn annotated_variable_without_bound_test_bails_out() {
    init_logging();
    let mut graph = Graph::new("kernel");
    let entry = graph.entry();
    let header = graph.add_block();
    let body = graph.add_block();
    let exit = graph.add_block();
    graph.add_edge(entry, header);
    graph.add_edge(header, body);
    graph.add_edge(header, exit);
    graph.add_edge(body, header);

    let init = graph.const_i32(entry, 0);
    let stride = graph.const_i32(entry, 1);
    let flag = graph.parameter(entry, 0);
    let limit = graph.parameter(entry, 1);
    let phi = graph.add_node(header, NodeKind::Phi, vec![init]);
    // The loop exit tests something other than the induction variable.
    graph.less_than(header, flag, limit);
    let inc = graph.binop(body, spindle::ir::BinOpKind::Add, phi, stride);
    graph.add_phi_input(phi, inc);
    let root = graph.root_function();
    graph.frame_state(header, root, 10, &[(2, phi)]);

    let mut provider = StaticAnnotationProvider::new();
    provider.insert("kernel", vec![annotation(10, 2)]);
    let ctx = context(provider, false);

    let err = ctx
        .compile_graph(&mut graph, &mut CompilationStats::new())
        .unwrap_err();
    assert!(err.is_bailout());
    assert!(err.message().contains("bounding comparison"));
}

#[test]
fn only_first_bound_comparison_is_redirected() {
    init_logging();
    let mut graph = Graph::new("kernel");
    let entry = graph.entry();
    let init = graph.const_i32(entry, 0);
    let stride = graph.const_i32(entry, 1);
    let bound = graph.parameter(entry, 0);
    let lp = annotated_loop(&mut graph, entry, init, stride, bound, 10, 2);
    // A second comparison against the same bound, deeper in the body.
    let extra = graph.less_than(lp.body, lp.phi, bound);

    let mut provider = StaticAnnotationProvider::new();
    provider.insert("kernel", vec![annotation(10, 2)]);
    let ctx = context(provider, false);
    ctx.compile_graph(&mut graph, &mut CompilationStats::new())
        .unwrap();

    // The first discovered comparison is the authoritative one; the other
    // still tests the raw bound.
    let range = graph.node(lp.condition).inputs[1];
    match graph.node(range).kind {
        NodeKind::ParallelRange { .. } => {}
        ref other => panic!("expected a parallel range, got {:?}", other),
    }
    assert_eq!(graph.node(extra).inputs[1], bound);
}

#[test]
fn unannotated_loops_are_untouched() {
    init_logging();
    let mut graph = Graph::new("kernel");
    let entry = graph.entry();
    let init = graph.const_i32(entry, 0);
    let stride = graph.const_i32(entry, 1);
    let bound = graph.parameter(entry, 0);
    let lp = graph.counted_loop(entry, init, stride, bound);

    let ctx = context(StaticAnnotationProvider::new(), false);
    ctx.compile_graph(&mut graph, &mut CompilationStats::new())
        .unwrap();

    assert_eq!(graph.node(lp.phi).inputs, vec![init, lp.increment]);
    let parallel = |kind: &NodeKind| match *kind {
        NodeKind::ParallelOffset { .. }
        | NodeKind::ParallelStride { .. }
        | NodeKind::ParallelRange { .. } => true,
        _ => false,
    };
    assert_eq!(count_kind(&graph, parallel), 0);
}
