//! Convenience constructors for building spindle graphs.
//!
//! Embedders and tests assemble graphs through these helpers rather than
//! spelling out `NodeKind` values. `counted_loop` builds the canonical
//! `for (i = init; i < bound; i += stride)` shape: a header holding the
//! phi and its bound test, a body holding the increment, and an exit.

use super::*;

/// Handles to the pieces of a counted loop built by `Graph::counted_loop`.
pub struct CountedLoop {
    pub header: BlockId,
    pub body: BlockId,
    pub exit: BlockId,
    /// The induction variable's value merge.
    pub phi: NodeId,
    /// The back-edge increment `phi + stride`.
    pub increment: NodeId,
    /// The `phi < bound` test in the header.
    pub condition: NodeId,
}

impl Graph {
    pub fn const_i32(&mut self, block: BlockId, value: i32) -> NodeId {
        self.add_node(block, NodeKind::Constant(ConstantKind::I32Constant(value)), vec![])
    }

    pub fn const_f32(&mut self, block: BlockId, value: f32) -> NodeId {
        self.add_node(block, NodeKind::Constant(ConstantKind::for_f32(value)), vec![])
    }

    pub fn const_f64(&mut self, block: BlockId, value: f64) -> NodeId {
        self.add_node(block, NodeKind::Constant(ConstantKind::for_f64(value)), vec![])
    }

    pub fn parameter(&mut self, block: BlockId, index: u32) -> NodeId {
        self.add_node(block, NodeKind::Parameter(index), vec![])
    }

    pub fn binop(&mut self, block: BlockId, op: BinOpKind, left: NodeId, right: NodeId) -> NodeId {
        self.add_node(block, NodeKind::BinOp(op), vec![left, right])
    }

    pub fn less_than(&mut self, block: BlockId, x: NodeId, y: NodeId) -> NodeId {
        self.add_node(block, NodeKind::IntegerLessThan, vec![x, y])
    }

    /// Records a frame-capture site for `function` at bytecode offset
    /// `bci`; `locals` maps local slot indices to their live values.
    pub fn frame_state(
        &mut self,
        block: BlockId,
        function: FunctionId,
        bci: u32,
        locals: &[(u32, NodeId)],
    ) -> NodeId {
        let local_slots = locals.iter().map(|&(slot, _)| slot).collect();
        let inputs = locals.iter().map(|&(_, value)| value).collect();
        self.add_node(
            block,
            NodeKind::FrameState {
                function,
                bci,
                local_slots,
            },
            inputs,
        )
    }

    /// Builds a counted loop hanging off `pred`. The caller supplies the
    /// initial value, stride, and bound nodes (typically defined in
    /// `pred` or earlier).
    pub fn counted_loop(
        &mut self,
        pred: BlockId,
        init: NodeId,
        stride: NodeId,
        bound: NodeId,
    ) -> CountedLoop {
        let header = self.add_block();
        let body = self.add_block();
        let exit = self.add_block();
        self.add_edge(pred, header);
        self.add_edge(header, body);
        self.add_edge(header, exit);
        self.add_edge(body, header);

        // Phi inputs are positional per predecessor: [pred, body].
        let phi = self.add_node(header, NodeKind::Phi, vec![init]);
        let condition = self.less_than(header, phi, bound);
        let increment = self.binop(body, BinOpKind::Add, phi, stride);
        self.add_phi_input(phi, increment);

        CountedLoop {
            header,
            body,
            exit,
            phi,
            increment,
            condition,
        }
    }
}
