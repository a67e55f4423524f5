//! Lambda body disambiguation.
//!
//! A lambda node starts out not knowing whether `->` is followed by a block or
//! by an expression. The first construct it receives settles the question:
//! a block becomes the body and the node then behaves like a block, a
//! statement or nested lambda becomes an expression body and the node takes
//! no further children.
use std::collections::HashSet;

use crate::ast::{
    Expr, ExprKind, Extent, LambdaBody, LambdaExpr, Statement, StmtKind, SyntaxNode,
};

use super::node::{LambdaState, NodeKind, NodeVariant};
use super::{Construct, NodeId, RecoveryTree};

impl RecoveryTree {
    pub(super) fn add_to_lambda(
        &mut self,
        id: NodeId,
        construct: Construct,
        bracket_balance: usize,
    ) -> NodeId {
        let node = &self.nodes[id];
        let NodeKind::Lambda(state) = &node.kind else {
            return self.delegate(id, construct, bracket_balance);
        };
        if state.have_expression_body {
            return self.delegate(id, construct, bracket_balance);
        }
        if state.have_block_body {
            return self.add_to_block(id, construct, bracket_balance);
        }
        if bracket_balance < node.bracket_balance {
            return self.delegate(id, construct, bracket_balance);
        }
        match construct {
            Construct::Block(block) => {
                log::trace!("lambda at {} takes a block body", block.extent.start);
                let state = self.lambda_state_mut(id);
                state.lambda.body = LambdaBody::Block(block);
                state.have_block_body = true;
                id
            }
            Construct::Lambda(_) | Construct::Statement(_) => {
                // the body node stays current even when complete, so that the
                // end of the lambda is closed through it
                self.lambda_state_mut(id).have_expression_body = true;
                self.attach(id, NodeKind::from_construct(construct), bracket_balance)
            }
            Construct::TypeReference(_) | Construct::Import(_) | Construct::ModuleStatement(_) => {
                self.delegate(id, construct, bracket_balance)
            }
        }
    }

    /// The expression body of the lambda `id` as it currently stands, read
    /// from the body node without resolving anything.
    pub(super) fn expression_body_snapshot(&self, id: NodeId) -> Option<Statement> {
        let body = *self.children(id).last()?;
        match self.parse_tree(body)? {
            SyntaxNode::Statement(stmt) => Some(stmt),
            SyntaxNode::Lambda(inner) => {
                let extent = inner.extent;
                Some(Statement::new(StmtKind::Expression(Expr::lambda(inner)), extent))
            }
            _ => None,
        }
    }

    /// Source text read after the last lambda argument of the statement `id`,
    /// such as `, 3)` in `f(x -> x, 3)`. It is kept on that lambda and lands
    /// behind it when the statement is resolved.
    pub fn append_trailing_text(&mut self, id: NodeId, text: &str, extent: Extent) {
        if self.variant(id) != Some(NodeVariant::Statement) {
            log::debug!("text at {} follows no statement, dropped", extent.start);
            return;
        }
        let last_lambda = self
            .children(id)
            .iter()
            .rev()
            .copied()
            .find(|c| self.variant(*c) == Some(NodeVariant::LambdaExpression));
        let Some(lambda) = last_lambda else {
            log::debug!("text at {} follows no lambda, dropped", extent.start);
            return;
        };
        match &mut self.lambda_state_mut(lambda).trailing {
            Some(Expr {
                kind: ExprKind::Text(text_so_far),
                extent: so_far,
            }) => {
                text_so_far.push_str(text);
                so_far.end = extent.end;
            }
            slot => *slot = Some(Expr::text(text, extent)),
        }
    }

    fn lambda_state_mut(&mut self, id: NodeId) -> &mut LambdaState {
        match &mut self.nodes[id].kind {
            NodeKind::Lambda(state) => state,
            other => unreachable!("{:?} is not a lambda node", other.variant()),
        }
    }

    /// Resolves the lambda below `id` and returns a copy of it. Both the
    /// statement view and the syntax view of a lambda node are derived from
    /// this.
    pub fn updated_lambda_expression(
        &mut self,
        id: NodeId,
        depth: usize,
        seen: &mut HashSet<NodeId>,
    ) -> Option<LambdaExpr> {
        self.finalize(id, depth, seen);
        match &self.nodes.get(id)?.kind {
            NodeKind::Lambda(state) => Some(state.lambda.clone()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{Block, ExprKind, Extent};
    use crate::recovery::Config;
    use crate::recovery::node::{NodeState, NodeVariant};
    use crate::recovery::tests::{assert_well_formed, local_decl, stmt_text};

    fn lambda_root() -> RecoveryTree {
        RecoveryTree::with_root(
            Construct::Lambda(LambdaExpr::new(vec!["x".into()], Extent::open(0))),
            0,
            Config::default(),
        )
    }

    #[test]
    fn block_makes_a_block_body() {
        let mut tree = lambda_root();
        let root = tree.root();
        let current = tree.add(root, Construct::Block(Block::new(Extent::open(5))), 0);
        assert_eq!(current, root);
        let flags = tree.lambda_flags(root).unwrap();
        assert!(flags.have_block_body);
        assert!(!flags.have_expression_body);
        assert_eq!(tree.state(root), Some(NodeState::BodyResolved));

        tree.add(root, Construct::Statement(stmt_text("a()", 7, Some(11))), 1);
        tree.add(root, Construct::Statement(stmt_text("b()", 12, Some(16))), 1);
        tree.update_source_end_if_necessary(root, 18);
        let lambda = tree
            .updated_lambda_expression(root, 0, &mut HashSet::new())
            .unwrap();
        let body = lambda.block_body().unwrap();
        assert_eq!(body.statements.len(), 2);
        assert_eq!(body.extent, Extent::new(5, 18));
        assert_eq!(lambda.extent, Extent::new(0, 18));
    }

    #[test]
    fn statement_makes_an_expression_body() {
        let mut tree = lambda_root();
        let root = tree.root();
        let body = stmt_text("x + 1", 5, Some(10));
        let current = tree.add(root, Construct::Statement(body.clone()), 0);
        assert_ne!(current, root);
        assert_eq!(tree.parent(current), Some(root));
        let flags = tree.lambda_flags(root).unwrap();
        assert!(flags.have_expression_body && !flags.have_block_body);

        // the body is visible before anything is resolved
        let lambda = match tree.parse_tree(root) {
            Some(crate::ast::SyntaxNode::Lambda(l)) => l,
            other => panic!("unexpected {other:?}"),
        };
        assert_eq!(lambda.expression_body(), Some(&body));

        // only the body node holds the statement until the lambda is resolved
        let NodeKind::Lambda(state) = &tree.nodes[root].kind else {
            panic!("root is a lambda");
        };
        assert!(state.lambda.block_body().is_some_and(|b| b.statements.is_empty()));
        let lambda = tree
            .updated_lambda_expression(root, 0, &mut HashSet::new())
            .unwrap();
        assert_eq!(lambda.expression_body(), Some(&body));
        assert_eq!(tree.len(), 1);
    }

    #[test]
    fn trailing_text_lands_on_the_last_lambda() {
        let mut tree = RecoveryTree::new(Config::default());
        let unit = tree.root();
        let call = tree.add(unit, Construct::Statement(stmt_text("f(", 0, None)), 0);
        let lambda = tree.add(
            call,
            Construct::Lambda(LambdaExpr::new(vec!["x".into()], Extent::open(2))),
            1,
        );
        tree.add(lambda, Construct::Statement(stmt_text("x", 7, Some(8))), 1);
        let current = tree.close_lambda(lambda, 8);
        assert_eq!(current, call);
        tree.append_trailing_text(call, ", ", Extent::new(8, 10));
        tree.append_trailing_text(call, "3)", Extent::new(10, 12));
        // text for a node that is not a statement goes nowhere
        tree.append_trailing_text(unit, "?", Extent::new(12, 13));
        tree.update_source_end_if_necessary(call, 13);
        let stmt = tree.update_statement(call).unwrap();
        assert_eq!(stmt.to_string(), "f(x -> x, 3);");
        let StmtKind::Expression(Expr {
            kind: ExprKind::Partial(parts),
            ..
        }) = &stmt.kind
        else {
            panic!("expected a partial call");
        };
        assert_eq!(parts[2].extent, Extent::new(8, 12));
    }

    #[test]
    fn expression_body_rejects_further_children() {
        let mut tree = lambda_root();
        let root = tree.root();
        tree.add(root, Construct::Statement(stmt_text("x", 5, Some(6))), 0);
        let next = tree.add(root, Construct::Statement(stmt_text("y", 8, Some(9))), 0);
        // no parent to delegate to: dropped, the root stays current
        assert_eq!(next, root);
        assert_eq!(tree.children(root).len(), 1);
        assert!(tree.lambda_flags(root).unwrap().have_expression_body);
        assert!(!tree.lambda_flags(root).unwrap().have_block_body);
    }

    #[test]
    fn nested_lambda_is_an_expression_body() {
        let mut tree = lambda_root();
        let root = tree.root();
        let inner = tree.add(
            root,
            Construct::Lambda(LambdaExpr::new(vec!["y".into()], Extent::open(5))),
            0,
        );
        assert_eq!(tree.variant(inner), Some(NodeVariant::LambdaExpression));
        tree.add(inner, Construct::Statement(stmt_text("x + y", 10, Some(15))), 0);
        tree.update_source_end_if_necessary(inner, 15);
        tree.update_source_end_if_necessary(root, 15);
        let lambda = tree
            .updated_lambda_expression(root, 0, &mut HashSet::new())
            .unwrap();
        let StmtKind::Expression(Expr {
            kind: ExprKind::Lambda(inner),
            ..
        }) = &lambda.expression_body().unwrap().kind
        else {
            panic!("expected a lambda body");
        };
        assert_eq!(inner.to_string(), "y -> x + y");
        assert_eq!(lambda.to_string(), "x -> y -> x + y");
    }

    #[test]
    fn lambda_in_declaration_becomes_initializer() {
        let mut tree = RecoveryTree::new(Config::default());
        let unit = tree.root();
        let decl = tree.add(unit, Construct::Statement(local_decl("Runnable", "r", 0)), 0);
        let lambda = tree.add(
            decl,
            Construct::Lambda(LambdaExpr::new(vec![], Extent::open(13))),
            0,
        );
        assert_eq!(tree.parent(lambda), Some(decl));
        tree.add(lambda, Construct::Block(Block::new(Extent::open(19))), 0);
        assert_well_formed(&tree);

        // a second lambda does not replace the first initializer
        let other = tree.add(
            decl,
            Construct::Lambda(LambdaExpr::new(vec![], Extent::open(30))),
            0,
        );
        assert_eq!(tree.parent(other), Some(unit));

        tree.update_source_end_if_necessary(lambda, 22);
        tree.update_source_end_if_necessary(decl, 23);
        let stmt = tree.update_statement(decl).unwrap();
        assert_eq!(tree.already_completed_local_initialization(decl), Some(true));
        assert_eq!(stmt.to_string(), "Runnable r = () -> {};");
        assert_eq!(stmt.extent, Extent::new(0, 23));
    }

    #[test]
    fn shallower_construct_leaves_the_lambda() {
        let mut tree = RecoveryTree::new(Config::default());
        let unit = tree.root();
        let b = tree.add(unit, Construct::Block(Block::new(Extent::open(0))), 0);
        let lambda = tree.add(
            b,
            Construct::Lambda(LambdaExpr::new(vec!["x".into()], Extent::open(2))),
            2,
        );
        let next = tree.add(lambda, Construct::Statement(stmt_text("z", 9, Some(11))), 1);
        assert_eq!(next, b);
        let flags = tree.lambda_flags(lambda).unwrap();
        assert!(!flags.have_block_body && !flags.have_expression_body);
    }
}
