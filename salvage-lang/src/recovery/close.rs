//! Closing nodes when the grammar engine reports the end of a construct, and
//! unwinding after input it could not parse.
//!
//! Every operation walks parent links from the current node, records end
//! offsets that are still unknown, finalizes what it closes and returns the
//! node that becomes current.
use super::node::NodeKind;
use super::{NodeId, RecoveryTree};

impl RecoveryTree {
    fn is_container(&self, id: NodeId) -> bool {
        self.nodes.get(id).is_some_and(|n| n.kind.is_container())
    }

    fn is_unit(&self, id: NodeId) -> bool {
        self.nodes
            .get(id)
            .is_some_and(|n| matches!(n.kind, NodeKind::Unit(_)))
    }

    fn close(&mut self, id: NodeId, offset: usize) {
        self.update_source_end_if_necessary(id, offset);
        self.update_parse_tree(id);
    }

    /// A closing brace spanning `brace_start..brace_end` at `bracket_balance`.
    ///
    /// Open statements inside the block end where the brace starts. The
    /// innermost block-like node whose balance is at most `bracket_balance` is
    /// closed at `brace_end`, along with deeper blocks whose own brace never
    /// came. The unit is never closed.
    pub fn close_block(
        &mut self,
        current: NodeId,
        brace_start: usize,
        brace_end: usize,
        bracket_balance: usize,
    ) -> NodeId {
        let mut id = current;
        loop {
            if !self.contains(id) {
                return self.root;
            }
            if self.is_unit(id) {
                log::debug!("closing brace at {brace_start} has no block to close");
                return id;
            }
            let container = self.is_container(id);
            self.close(id, if container { brace_end } else { brace_start });
            let Some(parent) = self.parent(id) else {
                return id;
            };
            let balance = self.nodes[id].bracket_balance;
            if container && balance <= bracket_balance {
                return parent;
            }
            if container {
                log::debug!("block at balance {balance} implicitly closed at {brace_start}");
            }
            id = parent;
        }
    }

    /// End of a statement at `offset`. Closes the statement-like nodes from
    /// `current` up to the nearest block-like node, which becomes current.
    pub fn close_statement(&mut self, current: NodeId, offset: usize) -> NodeId {
        let mut id = current;
        loop {
            if !self.contains(id) {
                return self.root;
            }
            if self.is_container(id) {
                return id;
            }
            self.close(id, offset);
            match self.parent(id) {
                Some(parent) => id = parent,
                None => return id,
            }
        }
    }

    /// End of an expression-bodied lambda at `offset`. Closes the nearest
    /// lambda and whatever is still open inside it, and returns its parent.
    pub fn close_lambda(&mut self, current: NodeId, offset: usize) -> NodeId {
        let mut id = current;
        loop {
            let Some(node) = self.nodes.get(id) else {
                return self.root;
            };
            if node.kind.is_container() {
                log::debug!("end of lambda at {offset} found no open lambda");
                return id;
            }
            let is_lambda = matches!(node.kind, NodeKind::Lambda(_));
            self.close(id, offset);
            let Some(parent) = self.parent(id) else {
                return id;
            };
            if is_lambda {
                return parent;
            }
            id = parent;
        }
    }

    /// Unwinds after invalid input at `offset`. Statement-like nodes are closed
    /// unconditionally. Block-like nodes deeper than `bracket_balance` are
    /// closed as well; the first block-like node at or above it stays open and
    /// becomes current.
    pub fn unwind(&mut self, current: NodeId, offset: usize, bracket_balance: usize) -> NodeId {
        let mut id = current;
        loop {
            let Some(node) = self.nodes.get(id) else {
                return self.root;
            };
            if matches!(node.kind, NodeKind::Unit(_))
                || (node.kind.is_container() && node.bracket_balance <= bracket_balance)
            {
                return id;
            }
            log::trace!(
                "unwinding {} at balance {} to {bracket_balance}",
                node.kind.variant(),
                node.bracket_balance
            );
            self.close(id, offset);
            match self.parent(id) {
                Some(parent) => id = parent,
                None => return id,
            }
        }
    }

    /// Closes `current` and every ancestor, the root included. Used at the
    /// end of input.
    pub fn close_all(&mut self, current: NodeId, offset: usize) -> NodeId {
        let mut id = if self.contains(current) {
            current
        } else {
            self.root
        };
        loop {
            self.close(id, offset);
            match self.parent(id) {
                Some(parent) => id = parent,
                None => return id,
            }
        }
    }
}
