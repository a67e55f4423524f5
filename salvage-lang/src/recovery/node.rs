use crate::ast::{
    Block, CompilationUnit, Expr, Extent, ImportDecl, LambdaBody, LambdaExpr, ModuleDirective,
    Statement, StmtKind, SyntaxNode, TypeRef,
};

use super::{Construct, NodeId};

/// The lambda being recovered plus which body form it committed to.
///
/// An expression body lives in the node's only child until the node is
/// finalized; `lambda.body` keeps the placeholder block until then.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct LambdaState {
    pub lambda: LambdaExpr,
    pub have_block_body: bool,
    pub have_expression_body: bool,
    /// source text after the lambda when it is an argument, as `, 3)` in
    /// `f(x -> x, 3)`
    pub trailing: Option<Expr>,
}

impl LambdaState {
    pub fn new(mut lambda: LambdaExpr) -> Self {
        lambda.body = LambdaBody::Block(Block::new(Extent::open(lambda.extent.start)));
        Self {
            lambda,
            have_block_body: false,
            have_expression_body: false,
            trailing: None,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub(crate) enum NodeKind {
    Unit(CompilationUnit),
    Block(Block),
    Statement {
        stmt: Statement,
        already_completed_local_initialization: bool,
    },
    Import(ImportDecl),
    TypeRef(TypeRef),
    ModuleStatement(ModuleDirective),
    Requires(ModuleDirective),
    Lambda(LambdaState),
}

/// Which recovery node variant a [`NodeId`] refers to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NodeVariant {
    Unit,
    Block,
    Statement,
    Import,
    TypeReference,
    ModuleStatement,
    RequiresStatement,
    LambdaExpression,
}

impl std::fmt::Display for NodeVariant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            NodeVariant::Unit => "unit",
            NodeVariant::Block => "block",
            NodeVariant::Statement => "statement",
            NodeVariant::Import => "import",
            NodeVariant::TypeReference => "type reference",
            NodeVariant::ModuleStatement => "module statement",
            NodeVariant::RequiresStatement => "requires statement",
            NodeVariant::LambdaExpression => "lambda expression",
        };
        write!(f, "{s}")
    }
}

/// Protocol state of a node.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NodeState {
    /// Accepting constructs.
    Open,
    /// A lambda that has committed to a block or expression body.
    BodyResolved,
    /// Children folded in; no further mutation.
    Finalized,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LambdaFlags {
    pub have_block_body: bool,
    pub have_expression_body: bool,
}

impl NodeKind {
    pub fn from_construct(construct: Construct) -> Self {
        match construct {
            Construct::Import(i) => NodeKind::Import(i),
            Construct::Statement(stmt) => NodeKind::Statement {
                stmt,
                already_completed_local_initialization: false,
            },
            Construct::TypeReference(t) => NodeKind::TypeRef(t),
            Construct::ModuleStatement(d) if d.is_requires() => NodeKind::Requires(d),
            Construct::ModuleStatement(d) => NodeKind::ModuleStatement(d),
            Construct::Lambda(l) => NodeKind::Lambda(LambdaState::new(l)),
            Construct::Block(b) => NodeKind::Block(b),
        }
    }

    pub fn variant(&self) -> NodeVariant {
        match self {
            NodeKind::Unit(_) => NodeVariant::Unit,
            NodeKind::Block(_) => NodeVariant::Block,
            NodeKind::Statement { .. } => NodeVariant::Statement,
            NodeKind::Import(_) => NodeVariant::Import,
            NodeKind::TypeRef(_) => NodeVariant::TypeReference,
            NodeKind::ModuleStatement(_) => NodeVariant::ModuleStatement,
            NodeKind::Requires(_) => NodeVariant::RequiresStatement,
            NodeKind::Lambda(_) => NodeVariant::LambdaExpression,
        }
    }

    /// Unit, blocks and block-bodied lambdas hold a sequence of statements and
    /// are only closed by a closing brace.
    pub fn is_container(&self) -> bool {
        match self {
            NodeKind::Unit(_) | NodeKind::Block(_) => true,
            NodeKind::Lambda(state) => state.have_block_body,
            _ => false,
        }
    }

    pub fn extent(&self) -> Extent {
        match self {
            NodeKind::Unit(u) => u.extent,
            NodeKind::Block(b) => b.extent,
            NodeKind::Statement { stmt, .. } => stmt.extent,
            NodeKind::Import(i) => i.extent,
            NodeKind::TypeRef(t) => t.extent,
            NodeKind::ModuleStatement(d) | NodeKind::Requires(d) => d.extent,
            NodeKind::Lambda(state) => state.lambda.extent,
        }
    }

    pub fn set_end_if_unknown(&mut self, offset: usize) -> bool {
        match self {
            NodeKind::Unit(u) => {
                // a module body left open ends with the unit
                if let Some(module) = &mut u.module {
                    module.extent.set_end_if_unknown(offset);
                }
                u.extent.set_end_if_unknown(offset)
            }
            NodeKind::Block(b) => b.extent.set_end_if_unknown(offset),
            NodeKind::Statement { stmt, .. } => stmt.set_end_if_unknown(offset),
            NodeKind::Import(i) => i.extent.set_end_if_unknown(offset),
            NodeKind::TypeRef(t) => t.extent.set_end_if_unknown(offset),
            NodeKind::ModuleStatement(d) | NodeKind::Requires(d) => {
                d.extent.set_end_if_unknown(offset)
            }
            NodeKind::Lambda(state) => {
                // a block body, or the placeholder, ends where the lambda ends
                if let LambdaBody::Block(b) = &mut state.lambda.body {
                    b.extent.set_end_if_unknown(offset);
                }
                state.lambda.extent.set_end_if_unknown(offset)
            }
        }
    }

    pub fn to_syntax(&self) -> SyntaxNode {
        match self {
            NodeKind::Unit(u) => SyntaxNode::Unit(u.clone()),
            NodeKind::Block(b) => SyntaxNode::Block(b.clone()),
            NodeKind::Statement { stmt, .. } => SyntaxNode::Statement(stmt.clone()),
            NodeKind::Import(i) => SyntaxNode::Import(i.clone()),
            NodeKind::TypeRef(t) => SyntaxNode::TypeRef(t.clone()),
            NodeKind::ModuleStatement(d) | NodeKind::Requires(d) => {
                SyntaxNode::Directive(d.clone())
            }
            NodeKind::Lambda(state) => SyntaxNode::Lambda(state.lambda.clone()),
        }
    }

    /// What this node contributes when it is folded into a sequence of
    /// statements. Imports, directives and the unit have no statement form.
    pub fn into_statement(self) -> Option<Statement> {
        match self {
            NodeKind::Block(b) => {
                let extent = b.extent;
                Some(Statement::new(StmtKind::Block(b), extent))
            }
            NodeKind::Statement { stmt, .. } => Some(stmt),
            NodeKind::Lambda(state) => {
                let extent = state.lambda.extent;
                Some(Statement::new(
                    StmtKind::Expression(Expr::lambda(state.lambda)),
                    extent,
                ))
            }
            NodeKind::TypeRef(t) => {
                // a type with nothing after it reads as the start of a declaration
                let extent = t.extent;
                Some(Statement::new(
                    StmtKind::LocalDecl {
                        ty: Some(t),
                        name: None,
                        init: None,
                    },
                    extent,
                ))
            }
            NodeKind::Unit(_)
            | NodeKind::Import(_)
            | NodeKind::ModuleStatement(_)
            | NodeKind::Requires(_) => None,
        }
    }

    pub fn summary(&self) -> String {
        match self {
            NodeKind::Unit(u) => u
                .module
                .as_ref()
                .map(|m| format!("module {}", m.name))
                .or_else(|| u.package.as_ref().map(|p| format!("package {p}")))
                .unwrap_or_default(),
            NodeKind::Block(b) => format!("{} statement(s)", b.statements.len()),
            NodeKind::Statement { stmt, .. } => stmt.to_string(),
            NodeKind::Import(i) => i.to_string(),
            NodeKind::TypeRef(t) => t.to_string(),
            NodeKind::ModuleStatement(d) | NodeKind::Requires(d) => d.to_string(),
            NodeKind::Lambda(state) => {
                let body = if state.have_block_body {
                    "block body"
                } else if state.have_expression_body {
                    "expression body"
                } else {
                    "body pending"
                };
                format!("({}) -> [{body}]", state.lambda.params.join(", "))
            }
        }
    }
}

/// One node of the shadow tree.
#[derive(Clone, Debug)]
pub struct RecoveryNode {
    pub(crate) parent: Option<NodeId>,
    pub(crate) bracket_balance: usize,
    pub(crate) children: Vec<NodeId>,
    pub(crate) kind: NodeKind,
    pub(crate) finalized: bool,
}

impl RecoveryNode {
    pub(crate) fn new(parent: Option<NodeId>, bracket_balance: usize, kind: NodeKind) -> Self {
        Self {
            parent,
            bracket_balance,
            children: vec![],
            kind,
            finalized: false,
        }
    }

    pub fn state(&self) -> NodeState {
        match &self.kind {
            _ if self.finalized => NodeState::Finalized,
            NodeKind::Lambda(s) if s.have_block_body || s.have_expression_body => {
                NodeState::BodyResolved
            }
            _ => NodeState::Open,
        }
    }
}
