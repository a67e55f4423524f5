//! Recovery tree.
//!
//! While the grammar engine walks broken input it hands every construct that
//! starts to the recovery tree. The tree keeps a shadow node per construct in
//! an arena, decides where each one belongs from its bracket balance, and on
//! demand folds the shadow nodes back into plain [`crate::ast`] values with
//! best-guess end offsets.
//!
//! The entry point that does everything for a source file is
//! [`crate::recover`]. [`driver::RecoveryDriver`] drives a tree from a stream
//! of events, and [`RecoveryTree`] can also be used directly.
pub mod close;
pub mod driver;
mod lambda;
pub mod node;
mod resolve;

use slotmap::{SlotMap, new_key_type};

use crate::ast::{
    Block, CompilationUnit, Extent, ImportDecl, LambdaBody, LambdaExpr, ModuleDecl,
    ModuleDirective, Statement, SyntaxNode, TypeRef,
};
use node::{LambdaFlags, NodeKind, NodeState, NodeVariant, RecoveryNode};

new_key_type! {
    /// Handle to a node in a [`RecoveryTree`].
    pub struct NodeId;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Config {
    /// Nesting below this depth is dropped rather than resolved.
    pub max_depth: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self { max_depth: 128 }
    }
}

/// A construct the grammar engine has started.
#[derive(Clone, Debug, PartialEq)]
pub enum Construct {
    Import(ImportDecl),
    Statement(Statement),
    TypeReference(TypeRef),
    ModuleStatement(ModuleDirective),
    Lambda(LambdaExpr),
    Block(Block),
}

impl Construct {
    /// Whether the construct is still being parsed when it is handed over.
    /// Blocks and lambdas always are: their content follows.
    pub fn is_open(&self) -> bool {
        match self {
            Construct::Import(i) => i.extent.is_open(),
            Construct::Statement(s) => s.extent.is_open(),
            Construct::TypeReference(t) => t.extent.is_open(),
            Construct::ModuleStatement(d) => d.extent.is_open(),
            Construct::Lambda(_) | Construct::Block(_) => true,
        }
    }

    pub fn extent(&self) -> Extent {
        match self {
            Construct::Import(i) => i.extent,
            Construct::Statement(s) => s.extent,
            Construct::TypeReference(t) => t.extent,
            Construct::ModuleStatement(d) => d.extent,
            Construct::Lambda(l) => l.extent,
            Construct::Block(b) => b.extent,
        }
    }
}

/// Arena of recovery nodes with a single root.
///
/// Parent links are handles into the same arena, so a node can delegate a
/// construct upwards without owning its parent. When a node is finalized its
/// children are folded into its syntax value and removed from the arena.
#[derive(Clone, Debug)]
pub struct RecoveryTree {
    nodes: SlotMap<NodeId, RecoveryNode>,
    root: NodeId,
    config: Config,
}

impl RecoveryTree {
    /// A tree rooted at an empty compilation unit.
    pub fn new(config: Config) -> Self {
        let mut nodes = SlotMap::with_key();
        let root = nodes.insert(RecoveryNode::new(
            None,
            0,
            NodeKind::Unit(CompilationUnit {
                extent: Extent::open(0),
                ..Default::default()
            }),
        ));
        Self {
            nodes,
            root,
            config,
        }
    }

    /// A tree rooted at an arbitrary construct, for recovering a fragment.
    pub fn with_root(construct: Construct, bracket_balance: usize, config: Config) -> Self {
        let mut nodes = SlotMap::with_key();
        let root = nodes.insert(RecoveryNode::new(
            None,
            bracket_balance,
            NodeKind::from_construct(construct),
        ));
        Self {
            nodes,
            root,
            config,
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }
    pub fn config(&self) -> Config {
        self.config
    }
    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(id)
    }
    pub fn len(&self) -> usize {
        self.nodes.len()
    }
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes.keys()
    }
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes.get(id).and_then(|n| n.parent)
    }
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.nodes
            .get(id)
            .map(|n| n.children.as_slice())
            .unwrap_or_default()
    }
    pub fn bracket_balance(&self, id: NodeId) -> Option<usize> {
        self.nodes.get(id).map(|n| n.bracket_balance)
    }
    pub fn variant(&self, id: NodeId) -> Option<NodeVariant> {
        self.nodes.get(id).map(|n| n.kind.variant())
    }
    pub fn state(&self, id: NodeId) -> Option<NodeState> {
        self.nodes.get(id).map(RecoveryNode::state)
    }
    pub fn is_finalized(&self, id: NodeId) -> bool {
        self.nodes.get(id).is_some_and(|n| n.finalized)
    }
    pub fn lambda_flags(&self, id: NodeId) -> Option<LambdaFlags> {
        match &self.nodes.get(id)?.kind {
            NodeKind::Lambda(state) => Some(LambdaFlags {
                have_block_body: state.have_block_body,
                have_expression_body: state.have_expression_body,
            }),
            _ => None,
        }
    }
    pub fn already_completed_local_initialization(&self, id: NodeId) -> Option<bool> {
        match &self.nodes.get(id)?.kind {
            NodeKind::Statement {
                already_completed_local_initialization,
                ..
            } => Some(*already_completed_local_initialization),
            _ => None,
        }
    }

    /// Snapshot of the syntax value a node currently wraps. Nothing is
    /// resolved; see [`RecoveryTree::update_parse_tree`].
    pub fn parse_tree(&self, id: NodeId) -> Option<SyntaxNode> {
        let node = self.nodes.get(id)?;
        match &node.kind {
            NodeKind::Lambda(state) if state.have_expression_body && !node.finalized => {
                let mut lambda = state.lambda.clone();
                if let Some(body) = self.expression_body_snapshot(id) {
                    lambda.body = LambdaBody::Expression(Box::new(body));
                }
                Some(SyntaxNode::Lambda(lambda))
            }
            kind => Some(kind.to_syntax()),
        }
    }

    /// End offset of the wrapped node, `None` while unknown.
    pub fn source_end(&self, id: NodeId) -> Option<usize> {
        self.nodes.get(id).and_then(|n| n.kind.extent().end)
    }

    /// Records `offset` as the end of the wrapped node unless an end is
    /// already known. Returns whether anything changed.
    pub fn update_source_end_if_necessary(&mut self, id: NodeId, offset: usize) -> bool {
        match self.nodes.get_mut(id) {
            Some(node) if !node.finalized => node.kind.set_end_if_unknown(offset),
            _ => false,
        }
    }

    pub fn set_package(&mut self, name: impl Into<String>) {
        if let NodeKind::Unit(unit) = &mut self.nodes[self.root].kind {
            unit.package = Some(name.into());
        }
    }

    pub fn begin_module(&mut self, name: impl Into<String>, open: bool, extent: Extent) {
        if let NodeKind::Unit(unit) = &mut self.nodes[self.root].kind {
            unit.module = Some(ModuleDecl {
                name: name.into(),
                open,
                directives: vec![],
                extent,
            });
        }
    }

    pub fn end_module(&mut self, offset: usize) {
        if let NodeKind::Unit(unit) = &mut self.nodes[self.root].kind {
            if let Some(module) = &mut unit.module {
                module.extent.set_end_if_unknown(offset);
            }
        }
    }

    /// Hands a newly started construct to `id`. The node either keeps it as
    /// a child or passes it up to its parent. Returns the node that should
    /// receive the next construct.
    pub fn add(&mut self, id: NodeId, construct: Construct, bracket_balance: usize) -> NodeId {
        let Some(node) = self.nodes.get(id) else {
            log::warn!("construct handed to a node that is gone, attaching it to the root");
            return self.add(self.root, construct, bracket_balance);
        };
        if node.finalized {
            return self.delegate(id, construct, bracket_balance);
        }
        match node.kind.variant() {
            NodeVariant::Unit => self.add_to_unit(id, construct, bracket_balance),
            NodeVariant::Block => self.add_to_block(id, construct, bracket_balance),
            NodeVariant::Statement => self.add_to_statement(id, construct, bracket_balance),
            NodeVariant::LambdaExpression => self.add_to_lambda(id, construct, bracket_balance),
            NodeVariant::Import
            | NodeVariant::TypeReference
            | NodeVariant::ModuleStatement
            | NodeVariant::RequiresStatement => self.delegate(id, construct, bracket_balance),
        }
    }

    fn delegate(&mut self, id: NodeId, construct: Construct, bracket_balance: usize) -> NodeId {
        match self.parent(id) {
            Some(parent) => {
                log::trace!(
                    "{} at balance {bracket_balance} passed up from {:?}",
                    construct_name(&construct),
                    self.variant(id)
                );
                self.add(parent, construct, bracket_balance)
            }
            None => {
                log::debug!(
                    "root cannot take {} at balance {bracket_balance}, dropped",
                    construct_name(&construct)
                );
                id
            }
        }
    }

    fn attach(&mut self, parent: NodeId, kind: NodeKind, bracket_balance: usize) -> NodeId {
        // a child never sits shallower than its parent
        let balance = bracket_balance.max(self.nodes[parent].bracket_balance);
        let child = self
            .nodes
            .insert(RecoveryNode::new(Some(parent), balance, kind));
        self.nodes[parent].children.push(child);
        child
    }

    /// Attaches a construct as a child and picks the next current node:
    /// the child while it is open, `parent` otherwise.
    fn adopt(&mut self, parent: NodeId, construct: Construct, bracket_balance: usize) -> NodeId {
        let open = construct.is_open();
        let child = self.attach(parent, NodeKind::from_construct(construct), bracket_balance);
        if open { child } else { parent }
    }

    fn add_to_unit(&mut self, id: NodeId, construct: Construct, bracket_balance: usize) -> NodeId {
        self.adopt(id, construct, bracket_balance)
    }

    pub(crate) fn add_to_block(
        &mut self,
        id: NodeId,
        construct: Construct,
        bracket_balance: usize,
    ) -> NodeId {
        let own = self.nodes[id].bracket_balance;
        if bracket_balance <= own {
            return self.delegate(id, construct, bracket_balance);
        }
        match construct {
            Construct::Import(_) | Construct::ModuleStatement(_) => {
                self.delegate(id, construct, bracket_balance)
            }
            _ => self.adopt(id, construct, bracket_balance),
        }
    }

    fn add_to_statement(
        &mut self,
        id: NodeId,
        construct: Construct,
        bracket_balance: usize,
    ) -> NodeId {
        let node = &self.nodes[id];
        if bracket_balance < node.bracket_balance {
            return self.delegate(id, construct, bracket_balance);
        }
        let NodeKind::Statement {
            stmt,
            already_completed_local_initialization,
        } = &node.kind
        else {
            return self.delegate(id, construct, bracket_balance);
        };
        let open = stmt.extent.is_open();
        let children = &node.children;
        let accepts = match &construct {
            Construct::Lambda(_) => {
                // a lambda that is the whole value leaves no room for another
                let value_taken = stmt.value_missing()
                    && children
                        .iter()
                        .any(|c| self.nodes[*c].kind.variant() == NodeVariant::LambdaExpression);
                open && stmt.awaits_expression()
                    && !*already_completed_local_initialization
                    && !value_taken
            }
            Construct::Block(_) | Construct::Statement(_) => {
                open && stmt.awaits_body() && children.is_empty()
            }
            Construct::TypeReference(_) => {
                open && matches!(
                    stmt.kind,
                    crate::ast::StmtKind::LocalDecl { ty: None, .. }
                ) && children.is_empty()
            }
            Construct::Import(_) | Construct::ModuleStatement(_) => false,
        };
        if accepts {
            self.adopt(id, construct, bracket_balance)
        } else {
            self.delegate(id, construct, bracket_balance)
        }
    }

    /// Indented listing of the shadow tree below `id`.
    pub fn dump(&self, id: NodeId, indent: usize) -> String {
        let Some(node) = self.nodes.get(id) else {
            return String::new();
        };
        let tab = "    ".repeat(indent);
        let end = node
            .kind
            .extent()
            .end
            .map_or_else(|| "?".to_string(), |e| e.to_string());
        let mut out = format!(
            "{tab}Recovered {} [balance {}, {}..{end}{}]: {}\n",
            node.kind.variant(),
            node.bracket_balance,
            node.kind.extent().start,
            if node.finalized { ", finalized" } else { "" },
            node.kind.summary()
        );
        for child in &node.children {
            out.push_str(&self.dump(*child, indent + 1));
        }
        out
    }
}

fn construct_name(construct: &Construct) -> &'static str {
    match construct {
        Construct::Import(_) => "import",
        Construct::Statement(_) => "statement",
        Construct::TypeReference(_) => "type reference",
        Construct::ModuleStatement(_) => "module statement",
        Construct::Lambda(_) => "lambda",
        Construct::Block(_) => "block",
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::ast::{Expr, ExprKind, StmtKind};

    pub fn stmt_text(text: &str, start: usize, end: Option<usize>) -> Statement {
        let expr = Expr::new(
            ExprKind::Text(text.to_string()),
            Extent::new(start, start + text.len()),
        );
        Statement::new(StmtKind::Expression(expr), Extent { start, end })
    }

    pub fn local_decl(ty: &str, name: &str, start: usize) -> Statement {
        Statement::new(
            StmtKind::LocalDecl {
                ty: Some(TypeRef::new(ty, Extent::new(start, start + ty.len()))),
                name: Some(name.to_string()),
                init: None,
            },
            Extent::open(start),
        )
    }

    pub fn control(keyword: &str, start: usize) -> Statement {
        Statement::new(
            StmtKind::Control {
                keyword: keyword.to_string(),
                header: Some("(x)".to_string()),
                body: None,
            },
            Extent::open(start),
        )
    }

    pub fn block(start: usize) -> Construct {
        Construct::Block(Block::new(Extent::open(start)))
    }

    /// Walks parent links and checks the structural invariants of every node.
    pub fn assert_well_formed(tree: &RecoveryTree) {
        for id in tree.node_ids() {
            let mut steps = 0;
            let mut cursor = id;
            while let Some(parent) = tree.parent(cursor) {
                assert!(
                    tree.bracket_balance(cursor) >= tree.bracket_balance(parent),
                    "child shallower than its parent"
                );
                cursor = parent;
                steps += 1;
                assert!(steps <= tree.len(), "parent chain does not terminate");
            }
            assert_eq!(cursor, tree.root());
        }
    }

    #[test]
    fn complete_constructs_are_absorbed() {
        let mut tree = RecoveryTree::new(Config::default());
        let root = tree.root();
        let current = tree.add(
            root,
            Construct::Statement(stmt_text("a()", 0, Some(4))),
            0,
        );
        assert_eq!(current, root);
        assert_eq!(tree.children(root).len(), 1);
    }

    #[test]
    fn open_constructs_become_current() {
        let mut tree = RecoveryTree::new(Config::default());
        let root = tree.root();
        let current = tree.add(root, Construct::Statement(local_decl("int", "x", 0)), 0);
        assert_ne!(current, root);
        assert_eq!(tree.parent(current), Some(root));
        assert_eq!(tree.variant(current), Some(NodeVariant::Statement));
    }

    #[test]
    fn block_passes_shallower_constructs_up() {
        let mut tree = RecoveryTree::new(Config::default());
        let root = tree.root();
        let b = tree.add(root, block(0), 1);
        assert_eq!(tree.bracket_balance(b), Some(1));
        // balance 1 is the block's own level, so this belongs to the unit
        let current = tree.add(b, Construct::Statement(stmt_text("x", 10, Some(12))), 1);
        assert_eq!(current, root);
        assert_eq!(tree.children(root).len(), 2);
        assert!(tree.children(b).is_empty());
    }

    #[test]
    fn imports_inside_blocks_go_to_the_unit() {
        let mut tree = RecoveryTree::new(Config::default());
        let root = tree.root();
        let b = tree.add(root, block(0), 0);
        let import = ImportDecl {
            path: vec!["a".into()],
            on_demand: false,
            is_static: false,
            extent: Extent::new(2, 11),
        };
        tree.add(b, Construct::Import(import), 1);
        assert!(tree.children(b).is_empty());
        assert_eq!(tree.children(root).len(), 2);
    }

    #[test]
    fn leaves_never_keep_children() {
        let mut tree = RecoveryTree::new(Config::default());
        let root = tree.root();
        let import = ImportDecl {
            path: vec!["a".into(), "b".into()],
            on_demand: true,
            is_static: false,
            extent: Extent::open(0),
        };
        let i = tree.add(root, Construct::Import(import), 0);
        assert_eq!(tree.variant(i), Some(NodeVariant::Import));
        let next = tree.add(i, Construct::Statement(stmt_text("x", 20, Some(22))), 0);
        assert_eq!(next, root);
        assert!(tree.children(i).is_empty());
    }

    #[test]
    fn control_statement_takes_its_body() {
        let mut tree = RecoveryTree::new(Config::default());
        let root = tree.root();
        let s = tree.add(root, Construct::Statement(control("while", 0)), 0);
        let b = tree.add(s, block(10), 0);
        assert_eq!(tree.parent(b), Some(s));
        // a second block is not a body any more
        let b2 = tree.add(s, block(20), 0);
        assert_eq!(tree.parent(b2), Some(root));
    }

    #[test]
    fn cut_short_values_take_lambdas() {
        let mut tree = RecoveryTree::new(Config::default());
        let root = tree.root();
        let lambda = |start| Construct::Lambda(LambdaExpr::new(vec!["x".into()], Extent::open(start)));

        // long n = xs.map(x -> ...
        let mut decl = local_decl("long", "n", 0);
        if let StmtKind::LocalDecl { init, .. } = &mut decl.kind {
            *init = Some(Expr::new(ExprKind::Text("xs.map(".into()), Extent::new(9, 16)));
        }
        let decl = tree.add(root, Construct::Statement(decl), 0);
        let l = tree.add(decl, lambda(16), 1);
        assert_eq!(tree.parent(l), Some(decl));

        // return x -> ... takes one lambda as its whole value
        let ret = Statement::new(StmtKind::Return(None), Extent::open(30));
        let ret = tree.add(root, Construct::Statement(ret), 0);
        let first = tree.add(ret, lambda(37), 0);
        assert_eq!(tree.parent(first), Some(ret));
        let second = tree.add(ret, lambda(45), 0);
        assert_eq!(tree.parent(second), Some(root));

        // if (c) run(x -> ...
        let mut guarded = control("if", 60);
        if let StmtKind::Control { body, .. } = &mut guarded.kind {
            *body = Some(Box::new(stmt_text("run(", 67, None)));
        }
        let guarded = tree.add(root, Construct::Statement(guarded), 0);
        let l = tree.add(guarded, lambda(71), 1);
        assert_eq!(tree.parent(l), Some(guarded));
        assert_well_formed(&tree);
    }

    #[test]
    fn adds_keep_the_tree_well_formed() {
        let mut tree = RecoveryTree::new(Config::default());
        let mut current = tree.root();
        let constructs = [
            (Construct::Statement(control("if", 0)), 0),
            (block(8), 0),
            (Construct::Statement(local_decl("Runnable", "r", 10)), 1),
            (Construct::Lambda(LambdaExpr::new(vec![], Extent::open(23))), 1),
            (block(29), 1),
            (Construct::Statement(stmt_text("go()", 31, Some(36))), 2),
            (Construct::Statement(stmt_text("late", 40, Some(45))), 0),
            (block(50), 3),
        ];
        for (construct, balance) in constructs {
            current = tree.add(current, construct, balance);
            assert_well_formed(&tree);
        }
    }

    #[test]
    fn dump_lists_every_node() {
        let mut tree = RecoveryTree::new(Config::default());
        let root = tree.root();
        let b = tree.add(root, block(0), 0);
        tree.add(b, Construct::Statement(stmt_text("a()", 2, Some(6))), 1);
        let dump = tree.dump(root, 0);
        assert_eq!(dump.lines().count(), 3);
        assert!(dump.lines().nth(2).unwrap().starts_with("        Recovered statement"));
    }
}
