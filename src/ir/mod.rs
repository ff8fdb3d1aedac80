//! SSA graph IR for spindle.
//!
//! The IR is a control-flow graph of basic blocks whose values live in a
//! single node arena keyed by dense `usize` ids. Nodes reference their
//! inputs by id, and the graph maintains an explicit def-use index
//! alongside the arena: "replace every use of X matching a predicate"
//! is an index-guided rewrite rather than object-graph aliasing, so a
//! replacement is visible to every referrer by construction.
//!
//! Value merges at control-flow joins are `Phi` nodes whose inputs
//! correspond positionally to the merge block's predecessors. Loop
//! structure is not stored here; it is recomputed on demand by the
//! `analysis` module.

use std::fmt;

use crate::util::join;

pub mod builder;
pub mod intrinsics;

use self::intrinsics::FPBinaryOp;

// TODO: make these wrapper types so that you can't pass in the wrong id by mistake
pub type NodeId = usize;
pub type BlockId = usize;
pub type FunctionId = usize;

/// Floating-point precision of an intrinsic result. No intrinsic node
/// exists without one.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FloatKind {
    F32,
    F64,
}

impl fmt::Display for FloatKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            FloatKind::F32 => f.write_str("f32"),
            FloatKind::F64 => f.write_str("f64"),
        }
    }
}

/// A compile-time constant. Float payloads are stored as bits so that
/// constants stay equatable and hashable.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ConstantKind {
    I32Constant(i32),
    I64Constant(i64),
    F32Constant(u32),
    F64Constant(u64),
}

impl ConstantKind {
    pub fn for_f32(v: f32) -> ConstantKind {
        ConstantKind::F32Constant(v.to_bits())
    }

    pub fn for_f64(v: f64) -> ConstantKind {
        ConstantKind::F64Constant(v.to_bits())
    }

    /// The integer value of this constant, if it is an integer constant.
    pub fn as_i64(&self) -> Option<i64> {
        match *self {
            ConstantKind::I32Constant(v) => Some(v as i64),
            ConstantKind::I64Constant(v) => Some(v as i64),
            _ => None,
        }
    }

    pub fn as_f32(&self) -> Option<f32> {
        match *self {
            ConstantKind::F32Constant(bits) => Some(f32::from_bits(bits)),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match *self {
            ConstantKind::F64Constant(bits) => Some(f64::from_bits(bits)),
            _ => None,
        }
    }
}

impl fmt::Display for ConstantKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        use self::ConstantKind::*;
        match *self {
            I32Constant(v) => write!(f, "{}i32", v),
            I64Constant(v) => write!(f, "{}i64", v),
            F32Constant(bits) => write!(f, "{}f32", f32::from_bits(bits)),
            F64Constant(bits) => write!(f, "{}f64", f64::from_bits(bits)),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BinOpKind {
    Add,
    Subtract,
    Multiply,
    Divide,
}

impl fmt::Display for BinOpKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        use self::BinOpKind::*;
        let text = match *self {
            Add => "+",
            Subtract => "-",
            Multiply => "*",
            Divide => "/",
        };
        f.write_str(text)
    }
}

/// The operation a node performs. Input arities and meanings:
///
/// * `Phi` - one input per predecessor of the node's block.
/// * `BinOp` - `[left, right]`.
/// * `IntegerLessThan` - `[x, y]`, the strictly-less-than bound test.
/// * `FrameState` - input `i` is the live value of local slot
///   `local_slots[i]` of `function` at bytecode offset `bci`.
/// * `ParallelOffset`/`ParallelStride` - `[value]`, the constant initial
///   value or stride of parallel dimension `index`.
/// * `ParallelRange` - `[bound, offset, stride]`.
/// * `FPBinaryIntrinsic` - `[x, y]`.
/// * `ArrayLoad` - `[array, index]`; `ArrayStore` - `[array, index, value]`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Constant(ConstantKind),
    Parameter(u32),
    Phi,
    BinOp(BinOpKind),
    IntegerLessThan,
    FrameState {
        function: FunctionId,
        bci: u32,
        local_slots: Vec<u32>,
    },
    ParallelOffset {
        index: u32,
    },
    ParallelStride {
        index: u32,
    },
    ParallelRange {
        index: u32,
    },
    FPBinaryIntrinsic {
        op: FPBinaryOp,
        kind: FloatKind,
    },
    ArrayLoad,
    ArrayStore,
}

impl NodeKind {
    pub fn name(&self) -> &'static str {
        use self::NodeKind::*;
        match *self {
            Constant(_) => "const",
            Parameter(_) => "param",
            Phi => "phi",
            BinOp(_) => "binop",
            IntegerLessThan => "lessthan",
            FrameState { .. } => "framestate",
            ParallelOffset { .. } => "offset",
            ParallelStride { .. } => "stride",
            ParallelRange { .. } => "range",
            FPBinaryIntrinsic { .. } => "intrinsic",
            ArrayLoad => "load",
            ArrayStore => "store",
        }
    }
}

/// A value node anchored in a basic block.
#[derive(Clone, Debug)]
pub struct Node {
    pub kind: NodeKind,
    pub inputs: Vec<NodeId>,
    pub block: BlockId,
}

/// A basic block: control-flow edges plus the schedule of nodes anchored
/// in it, in insertion order.
#[derive(Clone, Debug)]
pub struct BasicBlock {
    pub id: BlockId,
    pub preds: Vec<BlockId>,
    pub succs: Vec<BlockId>,
    pub nodes: Vec<NodeId>,
}

/// An SSA graph for one root procedure and its inlined callees.
pub struct Graph {
    /// Procedure names; index 0 is the root, the rest are inlinees.
    functions: Vec<String>,
    nodes: Vec<Node>,
    /// Def-use index: `uses[n]` holds one entry per input occurrence of `n`.
    uses: Vec<Vec<NodeId>>,
    blocks: Vec<BasicBlock>,
    entry: BlockId,
}

impl Graph {
    /// Returns a new graph for the procedure `root` with a single entry block.
    pub fn new(root: &str) -> Graph {
        let entry = BasicBlock {
            id: 0,
            preds: vec![],
            succs: vec![],
            nodes: vec![],
        };
        Graph {
            functions: vec![root.to_string()],
            nodes: vec![],
            uses: vec![],
            blocks: vec![entry],
            entry: 0,
        }
    }

    pub fn root_function(&self) -> FunctionId {
        0
    }

    /// Registers an inlined callee and returns its id.
    pub fn add_function(&mut self, name: &str) -> FunctionId {
        self.functions.push(name.to_string());
        self.functions.len() - 1
    }

    pub fn function_name(&self, function: FunctionId) -> &str {
        &self.functions[function]
    }

    /// Ids of all procedures inlined into the root.
    pub fn inlined_functions(&self) -> impl Iterator<Item = FunctionId> {
        1..self.functions.len()
    }

    pub fn entry(&self) -> BlockId {
        self.entry
    }

    pub fn add_block(&mut self) -> BlockId {
        let id = self.blocks.len();
        self.blocks.push(BasicBlock {
            id,
            preds: vec![],
            succs: vec![],
            nodes: vec![],
        });
        id
    }

    pub fn add_edge(&mut self, from: BlockId, to: BlockId) {
        self.blocks[from].succs.push(to);
        self.blocks[to].preds.push(from);
    }

    pub fn block(&self, id: BlockId) -> &BasicBlock {
        &self.blocks[id]
    }

    pub fn blocks(&self) -> &[BasicBlock] {
        &self.blocks
    }

    pub fn num_blocks(&self) -> usize {
        self.blocks.len()
    }

    /// Adds a node to `block`'s schedule and indexes its input uses.
    pub fn add_node(&mut self, block: BlockId, kind: NodeKind, inputs: Vec<NodeId>) -> NodeId {
        let id = self.nodes.len();
        for &input in inputs.iter() {
            debug_assert!(input < id);
            self.uses[input].push(id);
        }
        self.nodes.push(Node {
            kind,
            inputs,
            block,
        });
        self.uses.push(vec![]);
        self.blocks[block].nodes.push(id);
        id
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id]
    }

    pub fn num_nodes(&self) -> usize {
        self.nodes.len()
    }

    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> {
        0..self.nodes.len()
    }

    /// The users of `id`, one entry per input occurrence.
    pub fn usages(&self, id: NodeId) -> &[NodeId] {
        &self.uses[id]
    }

    /// The distinct users of `id`, in first-use order.
    pub fn unique_usages(&self, id: NodeId) -> Vec<NodeId> {
        let mut seen = Vec::new();
        for &user in self.uses[id].iter() {
            if !seen.contains(&user) {
                seen.push(user);
            }
        }
        seen
    }

    pub fn is_constant(&self, id: NodeId) -> bool {
        self.constant(id).is_some()
    }

    pub fn constant(&self, id: NodeId) -> Option<ConstantKind> {
        match self.nodes[id].kind {
            NodeKind::Constant(c) => Some(c),
            _ => None,
        }
    }

    /// Appends an input to a phi. Phis are built incrementally because a
    /// back-edge value is defined after the phi it feeds.
    pub fn add_phi_input(&mut self, phi: NodeId, value: NodeId) {
        debug_assert!(self.nodes[phi].kind == NodeKind::Phi);
        self.nodes[phi].inputs.push(value);
        self.uses[value].push(phi);
    }

    /// Redirects every use of `old` by a user matching `predicate` to `new`.
    /// A matching user has all of its `old` input occurrences replaced.
    pub fn replace_at_matching_usages<F>(&mut self, old: NodeId, new: NodeId, predicate: F)
    where
        F: Fn(NodeId) -> bool,
    {
        let users = self.unique_usages(old);
        for user in users {
            if !predicate(user) {
                continue;
            }
            let mut replaced = 0;
            for input in self.nodes[user].inputs.iter_mut() {
                if *input == old {
                    *input = new;
                    replaced += 1;
                }
            }
            if replaced > 0 {
                self.uses[old].retain(|&u| u != user);
                for _ in 0..replaced {
                    self.uses[new].push(user);
                }
            }
        }
    }

    /// Redirects every use of `old` to `new`.
    pub fn replace_all_usages(&mut self, old: NodeId, new: NodeId) {
        self.replace_at_matching_usages(old, new, |_| true);
    }

    /// Clones `id` with identical inputs into the same block.
    pub fn duplicate_with_inputs(&mut self, id: NodeId) -> NodeId {
        let kind = self.nodes[id].kind.clone();
        let inputs = self.nodes[id].inputs.clone();
        let block = self.nodes[id].block;
        self.add_node(block, kind, inputs)
    }

    /// Replaces `id` in place with a constant, preserving its id (and so
    /// every use of it) and releasing its input uses.
    pub fn replace_with_constant(&mut self, id: NodeId, constant: ConstantKind) {
        let inputs = std::mem::replace(&mut self.nodes[id].inputs, vec![]);
        for input in inputs {
            // Drop one use entry per released occurrence.
            if let Some(pos) = self.uses[input].iter().position(|&u| u == id) {
                self.uses[input].remove(pos);
            }
        }
        self.nodes[id].kind = NodeKind::Constant(constant);
    }

    /// The live value of local `slot` at a frame-capture site, if bound there.
    pub fn local_at(&self, frame_state: NodeId, slot: u32) -> Option<NodeId> {
        if let NodeKind::FrameState { ref local_slots, .. } = self.nodes[frame_state].kind {
            local_slots
                .iter()
                .position(|&s| s == slot)
                .map(|i| self.nodes[frame_state].inputs[i])
        } else {
            None
        }
    }

    /// Whether the control-flow graph contains a cycle reachable from entry.
    pub fn has_loops(&self) -> bool {
        #[derive(Clone, Copy, PartialEq)]
        enum Mark {
            White,
            Gray,
            Black,
        }
        fn visit(graph: &Graph, block: BlockId, marks: &mut Vec<Mark>) -> bool {
            marks[block] = Mark::Gray;
            for &succ in graph.blocks[block].succs.iter() {
                match marks[succ] {
                    Mark::Gray => return true,
                    Mark::White => {
                        if visit(graph, succ, marks) {
                            return true;
                        }
                    }
                    Mark::Black => {}
                }
            }
            marks[block] = Mark::Black;
            false
        }
        let mut marks = vec![Mark::White; self.blocks.len()];
        visit(self, self.entry, &mut marks)
    }

    /// The trip count a `ParallelRange` describes to the downstream
    /// scheduler: `ceil((bound - init) / stride)`, when bound, offset
    /// value, and stride value are all constant and the stride is positive.
    pub fn dimension_size(&self, range: NodeId) -> Option<i64> {
        match self.nodes[range].kind {
            NodeKind::ParallelRange { .. } => {}
            _ => return None,
        }
        let bound = self.constant(self.nodes[range].inputs[0])?.as_i64()?;
        let offset = self.nodes[range].inputs[1];
        let stride = self.nodes[range].inputs[2];
        let init = self.constant(self.nodes[offset].inputs[0])?.as_i64()?;
        let step = self.constant(self.nodes[stride].inputs[0])?.as_i64()?;
        if step <= 0 {
            return None;
        }
        Some(std::cmp::max(0, (bound - init + step - 1) / step))
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        use self::NodeKind::*;
        match self.kind {
            Constant(ref c) => write!(f, "const {}", c),
            Parameter(i) => write!(f, "param {}", i),
            BinOp(ref op) => write!(f, "v{} {} v{}", self.inputs[0], op, self.inputs[1]),
            FrameState {
                function,
                bci,
                ref local_slots,
            } => {
                let locals = local_slots
                    .iter()
                    .zip(self.inputs.iter())
                    .map(|(slot, value)| format!("{}:v{}", slot, value));
                write!(f, "framestate f{}@{} {}", function, bci, join("[", ", ", "]", locals))
            }
            ParallelOffset { index } => write!(f, "offset({}, v{})", index, self.inputs[0]),
            ParallelStride { index } => write!(f, "stride({}, v{})", index, self.inputs[0]),
            ParallelRange { index } => write!(
                f,
                "range({}, v{}, v{}, v{})",
                index, self.inputs[0], self.inputs[1], self.inputs[2]
            ),
            FPBinaryIntrinsic { ref op, ref kind } => {
                write!(f, "{}.{}(v{}, v{})", op, kind, self.inputs[0], self.inputs[1])
            }
            _ => {
                let inputs = self.inputs.iter().map(|i| format!("v{}", i));
                write!(f, "{}{}", self.kind.name(), join("(", ", ", ")", inputs))
            }
        }
    }
}

impl fmt::Display for Graph {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "graph {}:", self.functions[0])?;
        for block in self.blocks.iter() {
            let preds = block.preds.iter().map(|b| format!("B{}", b));
            writeln!(f, "B{} {}:", block.id, join("<- [", ", ", "]", preds))?;
            for &id in block.nodes.iter() {
                writeln!(f, "  v{} = {}", id, self.nodes[id])?;
            }
        }
        Ok(())
    }
}
