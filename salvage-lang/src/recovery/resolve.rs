//! Folding shadow nodes back into syntax values.
//!
//! Finalizing a node resolves its children depth first, moves each child's
//! syntax value into the node's own value and removes the child from the
//! arena. A finalized node is never resolved again.
use std::collections::HashSet;

use crate::ast::{
    Block, CompilationUnit, Expr, ImportDecl, LambdaBody, ModuleDecl, ModuleDirective,
    RequiresDirective, Statement, StmtKind, TypeRef,
};

use super::node::{NodeKind, RecoveryNode};
use super::{NodeId, RecoveryTree};

impl RecoveryTree {
    /// Finalizes `id` and everything below it. Calling this again is a no-op.
    pub fn update_parse_tree(&mut self, id: NodeId) {
        let depth = self.depth_of(id);
        self.finalize(id, depth, &mut HashSet::new());
    }

    fn depth_of(&self, id: NodeId) -> usize {
        let mut depth = 0;
        let mut cursor = id;
        while let Some(parent) = self.parent(cursor) {
            depth += 1;
            cursor = parent;
            if depth > self.nodes.len() {
                break;
            }
        }
        depth
    }

    pub(crate) fn finalize(&mut self, id: NodeId, depth: usize, seen: &mut HashSet<NodeId>) {
        let Some(node) = self.nodes.get(id) else {
            return;
        };
        if node.finalized {
            return;
        }
        if !seen.insert(id) {
            log::warn!("node reached twice while resolving, skipped");
            return;
        }
        let children = std::mem::take(&mut self.nodes[id].children);
        if depth >= self.config.max_depth {
            log::warn!(
                "recovery nesting exceeds {}, dropping {} node(s)",
                self.config.max_depth,
                children.len()
            );
            for child in children {
                self.discard(child);
            }
        } else {
            self.fill_unknown_ends(id, &children);
            for child in children {
                self.finalize(child, depth + 1, seen);
                if let Some(child_node) = self.nodes.remove(child) {
                    self.fold(id, child_node);
                }
            }
        }
        self.nodes[id].finalized = true;
    }

    /// Children that were never closed end where the next sibling starts, the
    /// last one where `parent` ends.
    fn fill_unknown_ends(&mut self, parent: NodeId, children: &[NodeId]) {
        let parent_end = self.source_end(parent);
        for (pos, &child) in children.iter().enumerate() {
            let next_start = children
                .get(pos + 1)
                .and_then(|next| self.nodes.get(*next))
                .map(|next| next.kind.extent().start);
            if let Some(end) = next_start.or(parent_end) {
                if self.update_source_end_if_necessary(child, end) {
                    log::trace!("{:?} never closed, ends at {end}", self.variant(child));
                }
            }
        }
    }

    fn discard(&mut self, id: NodeId) {
        if let Some(node) = self.nodes.remove(id) {
            for child in node.children {
                self.discard(child);
            }
        }
    }

    fn fold(&mut self, parent: NodeId, child: RecoveryNode) {
        let child = child.kind;
        match &mut self.nodes[parent].kind {
            NodeKind::Unit(unit) => fold_into_unit(unit, child),
            NodeKind::Block(block) => push_statement(block, child),
            NodeKind::Lambda(state) => {
                if state.have_expression_body {
                    if let Some(body) = child.into_statement() {
                        state.lambda.body = LambdaBody::Expression(Box::new(body));
                    }
                } else if let LambdaBody::Block(block) = &mut state.lambda.body {
                    push_statement(block, child);
                }
            }
            NodeKind::Statement {
                stmt,
                already_completed_local_initialization,
            } => fold_into_statement(stmt, already_completed_local_initialization, child),
            leaf => log::debug!("{:?} node cannot hold children", leaf.variant()),
        }
    }

    pub fn updated_statement(
        &mut self,
        id: NodeId,
        depth: usize,
        seen: &mut HashSet<NodeId>,
    ) -> Option<Statement> {
        self.finalize(id, depth, seen);
        self.nodes.get(id)?.kind.clone().into_statement()
    }

    /// [`RecoveryTree::updated_statement`] starting from the node's depth in
    /// the tree.
    pub fn update_statement(&mut self, id: NodeId) -> Option<Statement> {
        let depth = self.depth_of(id);
        self.updated_statement(id, depth, &mut HashSet::new())
    }

    pub fn updated_block(
        &mut self,
        id: NodeId,
        depth: usize,
        seen: &mut HashSet<NodeId>,
    ) -> Option<Block> {
        self.finalize(id, depth, seen);
        match &self.nodes.get(id)?.kind {
            NodeKind::Block(b) => Some(b.clone()),
            NodeKind::Lambda(state) if state.have_block_body => {
                state.lambda.block_body().cloned()
            }
            _ => None,
        }
    }

    pub fn updated_import(&mut self, id: NodeId) -> Option<ImportDecl> {
        self.update_parse_tree(id);
        match &self.nodes.get(id)?.kind {
            NodeKind::Import(i) => Some(i.clone()),
            _ => None,
        }
    }

    pub fn updated_type_reference(&mut self, id: NodeId) -> Option<TypeRef> {
        self.update_parse_tree(id);
        match &self.nodes.get(id)?.kind {
            NodeKind::TypeRef(t) => Some(t.clone()),
            _ => None,
        }
    }

    pub fn updated_module_statement(&mut self, id: NodeId) -> Option<ModuleDirective> {
        self.update_parse_tree(id);
        match &self.nodes.get(id)?.kind {
            NodeKind::ModuleStatement(d) | NodeKind::Requires(d) => Some(d.clone()),
            _ => None,
        }
    }

    pub fn updated_requires_statement(&mut self, id: NodeId) -> Option<RequiresDirective> {
        self.update_parse_tree(id);
        match &self.nodes.get(id)?.kind {
            NodeKind::Requires(d) => d.as_requires(),
            _ => None,
        }
    }

    /// Resolves the whole tree and returns the unit at its root. A tree that
    /// is rooted somewhere else yields a unit holding that root's statement.
    pub fn updated_unit(&mut self) -> CompilationUnit {
        let root = self.root;
        self.update_parse_tree(root);
        let kind = self.nodes[root].kind.clone();
        match kind {
            NodeKind::Unit(unit) => unit,
            other => {
                let extent = other.extent();
                let mut unit = CompilationUnit {
                    extent,
                    ..Default::default()
                };
                fold_into_unit(&mut unit, other);
                unit
            }
        }
    }
}

fn push_statement(block: &mut Block, child: NodeKind) {
    let variant = child.variant();
    match child.into_statement() {
        Some(stmt) => block.statements.push(stmt),
        None => log::debug!("{variant:?} has no place inside a block, dropped"),
    }
}

fn fold_into_unit(unit: &mut CompilationUnit, child: NodeKind) {
    match child {
        NodeKind::Import(i) => unit.imports.push(i),
        NodeKind::ModuleStatement(d) | NodeKind::Requires(d) => {
            let extent = d.extent;
            let module = unit.module.get_or_insert_with(|| {
                log::debug!("module directive without a module header at {}", extent.start);
                ModuleDecl {
                    name: String::new(),
                    open: false,
                    directives: vec![],
                    extent,
                }
            });
            module.extent.end = module.extent.end.max(extent.end);
            module.directives.push(d);
        }
        other => {
            if let Some(stmt) = other.into_statement() {
                unit.statements.push(stmt);
            }
        }
    }
}

fn fold_into_statement(stmt: &mut Statement, completed: &mut bool, child: NodeKind) {
    let variant = child.variant();
    let child = match child {
        NodeKind::Lambda(state) => {
            if *completed {
                log::debug!("initializer already completed, lambda dropped");
                return;
            }
            let initializes = stmt.is_local_declaration() && stmt.value_missing();
            if !stmt.absorb(Expr::lambda(state.lambda), state.trailing) {
                log::debug!("value is already complete, lambda dropped");
            } else if initializes {
                *completed = true;
            }
            return;
        }
        NodeKind::TypeRef(t) => match &mut stmt.kind {
            StmtKind::LocalDecl { ty: ty @ None, .. } => {
                *ty = Some(t);
                return;
            }
            _ => NodeKind::TypeRef(t),
        },
        other => other,
    };
    match stmt.body_slot() {
        Some(slot) => *slot = child.into_statement().map(Box::new),
        None => log::debug!("{variant:?} does not fit into the statement, dropped"),
    }
}
