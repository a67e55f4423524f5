//! Partial syntax nodes.
//!
//! These are the plain data values the grammar engine hands to the recovery
//! tree. While recovery is in progress they are owned and patched by recovery
//! nodes; afterwards they are ordinary syntax trees.
pub mod program;
pub mod statement;

use std::fmt;

use itertools::Itertools;

pub use crate::utils::metadata::Extent;
pub use program::{
    CompilationUnit, DirectiveKind, ImportDecl, ModuleDecl, ModuleDirective, RequiresDirective,
};
pub use statement::{Block, Statement, StmtKind};

#[derive(Clone, Debug, PartialEq)]
pub enum ExprKind {
    Name(String),
    Literal(String),
    Lambda(Box<LambdaExpr>),
    /// Source text the grammar engine did not break down any further.
    Text(String),
    /// Source text interleaved with sub-expressions that were recovered on
    /// their own, typically lambda arguments: `foo(`, `x -> x`, `, 3)`.
    Partial(Vec<Expr>),
}

#[derive(Clone, Debug, PartialEq)]
pub struct Expr {
    pub kind: ExprKind,
    pub extent: Extent,
}

impl Expr {
    pub fn new(kind: ExprKind, extent: Extent) -> Self {
        Self { kind, extent }
    }
    pub fn lambda(lambda: LambdaExpr) -> Self {
        let extent = lambda.extent;
        Self::new(ExprKind::Lambda(Box::new(lambda)), extent)
    }
    pub fn text(text: impl Into<String>, extent: Extent) -> Self {
        Self::new(ExprKind::Text(text.into()), extent)
    }

    /// Unparsed text, possibly already holding recovered parts, is cut short
    /// and can take more of them.
    pub fn is_cut_short(&self) -> bool {
        matches!(self.kind, ExprKind::Text(_) | ExprKind::Partial(_))
    }

    /// `self` followed by the source text after it, if there is any.
    pub fn followed_by(self, trailing: Option<Expr>) -> Expr {
        match trailing {
            Some(trailing) => {
                let extent = Extent {
                    start: self.extent.start,
                    end: trailing.extent.end,
                };
                Self::new(ExprKind::Partial(vec![self, trailing]), extent)
            }
            None => self,
        }
    }

    /// Appends a separately recovered `part` and the text that followed it.
    /// Returns false, leaving `self` untouched, unless it is cut short.
    pub fn extend(&mut self, part: Expr, trailing: Option<Expr>) -> bool {
        if let ExprKind::Text(head) = &mut self.kind {
            let head = Expr::text(std::mem::take(head), self.extent);
            self.kind = ExprKind::Partial(vec![head]);
        }
        let ExprKind::Partial(parts) = &mut self.kind else {
            return false;
        };
        // blanks between the cut and the part, as in `f = x -> x`
        match parts.last().and_then(|last| last.extent.end) {
            Some(end) if end < part.extent.start => {
                parts.push(Expr::text(" ", Extent::new(end, part.extent.start)));
            }
            _ => {}
        }
        parts.push(part);
        parts.extend(trailing);
        if let Some(end) = parts.last().and_then(|p| p.extent.end) {
            self.extent.end = self.extent.end.max(Some(end));
        }
        true
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ExprKind::Name(s) | ExprKind::Literal(s) | ExprKind::Text(s) => write!(f, "{s}"),
            ExprKind::Lambda(l) => write!(f, "{l}"),
            ExprKind::Partial(parts) => write!(f, "{}", parts.iter().join("")),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TypeRef {
    pub name: String,
    /// number of trailing `[]`
    pub dims: usize,
    pub extent: Extent,
}

impl TypeRef {
    pub fn new(name: impl Into<String>, extent: Extent) -> Self {
        Self {
            name: name.into(),
            dims: 0,
            extent,
        }
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.name, "[]".repeat(self.dims))
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum LambdaBody {
    Block(Block),
    /// A single expression, carried as the statement the grammar engine built
    /// around it.
    Expression(Box<Statement>),
}

#[derive(Clone, Debug, PartialEq)]
pub struct LambdaExpr {
    pub params: Vec<String>,
    pub body: LambdaBody,
    pub extent: Extent,
}

impl LambdaExpr {
    /// A lambda whose body has not been seen yet. The body starts out as an
    /// empty block, which is what most broken lambdas turn out to have.
    pub fn new(params: Vec<String>, extent: Extent) -> Self {
        Self {
            params,
            body: LambdaBody::Block(Block::new(Extent::open(extent.start))),
            extent,
        }
    }
    pub fn block_body(&self) -> Option<&Block> {
        match &self.body {
            LambdaBody::Block(b) => Some(b),
            LambdaBody::Expression(_) => None,
        }
    }
    pub fn expression_body(&self) -> Option<&Statement> {
        match &self.body {
            LambdaBody::Block(_) => None,
            LambdaBody::Expression(s) => Some(s),
        }
    }
}

impl fmt::Display for LambdaExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.params.as_slice() {
            [single] => write!(f, "{single} -> ")?,
            params => write!(f, "({}) -> ", params.iter().join(", "))?,
        }
        match &self.body {
            LambdaBody::Block(b) => write!(f, "{b}"),
            LambdaBody::Expression(s) => match &s.kind {
                StmtKind::Expression(e) => write!(f, "{e}"),
                _ => write!(f, "{s}"),
            },
        }
    }
}

/// Any node a recovery node can wrap.
#[derive(Clone, Debug, PartialEq)]
pub enum SyntaxNode {
    Unit(CompilationUnit),
    Block(Block),
    Statement(Statement),
    Import(ImportDecl),
    TypeRef(TypeRef),
    Directive(ModuleDirective),
    Lambda(LambdaExpr),
}

impl SyntaxNode {
    pub fn extent(&self) -> Extent {
        match self {
            SyntaxNode::Unit(u) => u.extent,
            SyntaxNode::Block(b) => b.extent,
            SyntaxNode::Statement(s) => s.extent,
            SyntaxNode::Import(i) => i.extent,
            SyntaxNode::TypeRef(t) => t.extent,
            SyntaxNode::Directive(d) => d.extent,
            SyntaxNode::Lambda(l) => l.extent,
        }
    }
}

impl fmt::Display for SyntaxNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyntaxNode::Unit(u) => write!(f, "{u}"),
            SyntaxNode::Block(b) => write!(f, "{b}"),
            SyntaxNode::Statement(s) => write!(f, "{s}"),
            SyntaxNode::Import(i) => write!(f, "{i}"),
            SyntaxNode::TypeRef(t) => write!(f, "{t}"),
            SyntaxNode::Directive(d) => write!(f, "{d}"),
            SyntaxNode::Lambda(l) => write!(f, "{l}"),
        }
    }
}
