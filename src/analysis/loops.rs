//! Natural-loop and basic induction-variable analysis.
//!
//! Loops are discovered structurally: a back edge is a CFG edge whose
//! target dominates its source, and the loop it closes is the target
//! (header) plus every block that reaches the source without passing the
//! header. Dominators come from petgraph. Basic induction variables are
//! header phis matching the recurrence `phi = merge(init, phi ± stride)`.
//!
//! The returned loop sequence is deterministic and outer-first (headers in
//! reverse postorder from entry); callers reverse it for the configured
//! inner-first processing order.

use fnv::FnvHashSet;

use petgraph::algo::dominators::{self, Dominators};
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::DfsPostOrder;

use crate::ir::{BinOpKind, BlockId, Graph, NodeId, NodeKind};

/// A basic induction variable: a header phi merging a loop-entry value
/// with a fixed-stride update of itself.
#[derive(Clone, Debug)]
pub struct InductionVariable {
    /// The phi carrying the variable across iterations.
    pub value: NodeId,
    /// The loop-entry value.
    pub init: NodeId,
    /// The stride operand of the update.
    pub stride: NodeId,
    /// The value flowing along the back edge (the update itself).
    pub back_value: NodeId,
    /// Whether the update adds or subtracts the stride.
    pub op: BinOpKind,
}

impl InductionVariable {
    pub fn is_constant_init(&self, graph: &Graph) -> bool {
        self.constant_init(graph).is_some()
    }

    pub fn constant_init(&self, graph: &Graph) -> Option<i64> {
        graph.constant(self.init)?.as_i64()
    }

    pub fn is_constant_stride(&self, graph: &Graph) -> bool {
        self.constant_stride(graph).is_some()
    }

    /// The signed per-iteration step (negated for a subtracting update).
    pub fn constant_stride(&self, graph: &Graph) -> Option<i64> {
        let step = graph.constant(self.stride)?.as_i64()?;
        match self.op {
            BinOpKind::Subtract => Some(-step),
            _ => Some(step),
        }
    }
}

/// A natural loop: a maximal single-entry block set with one back edge.
#[derive(Debug)]
pub struct Loop {
    pub header: BlockId,
    /// All blocks in the loop, ascending.
    pub blocks: Vec<BlockId>,
    /// The back edge `(source, header)` closing the loop.
    pub back_edge: (BlockId, BlockId),
    pub induction_variables: Vec<InductionVariable>,
    /// Whether some induction variable is bounded by a less-than test,
    /// making the trip structure statically determinable.
    pub counted: bool,
}

/// The loops of a graph, outer-first.
pub struct LoopsData {
    pub loops: Vec<Loop>,
}

impl LoopsData {
    /// Discovers natural loops, their basic induction variables, and
    /// counted-loop facts for `graph`.
    pub fn analyze(graph: &Graph) -> LoopsData {
        let mut cfg = DiGraph::<(), ()>::new();
        for _ in 0..graph.num_blocks() {
            cfg.add_node(());
        }
        for block in graph.blocks() {
            for &succ in block.succs.iter() {
                cfg.add_edge(NodeIndex::new(block.id), NodeIndex::new(succ), ());
            }
        }
        let entry = NodeIndex::new(graph.entry());
        let dom = dominators::simple_fast(&cfg, entry);

        // Reverse postorder over blocks; back edges are discovered in this
        // order, so headers of outer loops come first.
        let mut postorder = Vec::with_capacity(graph.num_blocks());
        let mut dfs = DfsPostOrder::new(&cfg, entry);
        while let Some(ix) = dfs.next(&cfg) {
            postorder.push(ix.index());
        }
        postorder.reverse();

        let mut loops = Vec::new();
        for &block in postorder.iter() {
            for &succ in graph.block(block).succs.iter() {
                if dominates(&dom, NodeIndex::new(succ), NodeIndex::new(block)) {
                    loops.push(build_loop(graph, succ, block));
                }
            }
        }
        // Headers in reverse postorder: outer loops before the loops they
        // contain. Back edges of the same header keep discovery order.
        let position = |b: BlockId| postorder.iter().position(|&p| p == b).unwrap_or(usize::MAX);
        loops.sort_by_key(|l| position(l.header));
        LoopsData { loops }
    }
}

/// Whether `a` dominates `b` (including `a == b`).
fn dominates(dom: &Dominators<NodeIndex>, a: NodeIndex, b: NodeIndex) -> bool {
    let mut cursor = Some(b);
    while let Some(ix) = cursor {
        if ix == a {
            return true;
        }
        cursor = dom.immediate_dominator(ix);
    }
    false
}

/// Collects the natural loop of the back edge `source -> header` and
/// derives its induction variables.
fn build_loop(graph: &Graph, header: BlockId, source: BlockId) -> Loop {
    let mut members: FnvHashSet<BlockId> = FnvHashSet::default();
    members.insert(header);
    members.insert(source);
    let mut stack = vec![source];
    while let Some(block) = stack.pop() {
        if block == header {
            continue;
        }
        for &pred in graph.block(block).preds.iter() {
            if members.insert(pred) {
                stack.push(pred);
            }
        }
    }
    let mut blocks: Vec<BlockId> = members.iter().cloned().collect();
    blocks.sort();

    let induction_variables = detect_induction_variables(graph, header, source);
    let counted = induction_variables.iter().any(|iv| {
        graph
            .usages(iv.value)
            .iter()
            .any(|&user| graph.node(user).kind == NodeKind::IntegerLessThan)
    });

    Loop {
        header,
        blocks,
        back_edge: (source, header),
        induction_variables,
        counted,
    }
}

/// Matches header phis against the basic recurrence
/// `phi = merge(init, phi ± stride)`.
fn detect_induction_variables(
    graph: &Graph,
    header: BlockId,
    back_source: BlockId,
) -> Vec<InductionVariable> {
    let preds = &graph.block(header).preds;
    let back_position = match preds.iter().position(|&p| p == back_source) {
        Some(p) => p,
        None => return vec![],
    };

    let mut ivs = Vec::new();
    for &id in graph.block(header).nodes.iter() {
        if graph.node(id).kind != NodeKind::Phi {
            continue;
        }
        let inputs = &graph.node(id).inputs;
        if inputs.len() != 2 || back_position >= 2 {
            continue;
        }
        let back_value = inputs[back_position];
        let init = inputs[1 - back_position];
        if back_value == id {
            continue;
        }
        let (op, operands) = match graph.node(back_value).kind {
            NodeKind::BinOp(op @ BinOpKind::Add) | NodeKind::BinOp(op @ BinOpKind::Subtract) => {
                (op, &graph.node(back_value).inputs)
            }
            _ => continue,
        };
        let stride = if operands[0] == id {
            operands[1]
        } else if operands[1] == id && op == BinOpKind::Add {
            operands[0]
        } else {
            continue;
        };
        ivs.push(InductionVariable {
            value: id,
            init,
            stride,
            back_value,
            op,
        });
    }
    ivs
}
