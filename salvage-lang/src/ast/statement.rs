use std::fmt;

use super::{Expr, Extent, TypeRef};

#[derive(Clone, Debug, PartialEq)]
pub enum StmtKind {
    /// `Type name = init;`. Every part may be missing in broken input.
    LocalDecl {
        ty: Option<TypeRef>,
        name: Option<String>,
        init: Option<Expr>,
    },
    Return(Option<Expr>),
    Expression(Expr),
    Block(Block),
    /// `if (..) body`, `while (..) body` and friends.
    Control {
        keyword: String,
        header: Option<String>,
        body: Option<Box<Statement>>,
    },
    /// A class, method or other member header such as `void run()`, followed
    /// by its body.
    Member {
        header: String,
        body: Option<Box<Statement>>,
    },
}

#[derive(Clone, Debug, PartialEq)]
pub struct Statement {
    pub kind: StmtKind,
    pub extent: Extent,
}

impl Statement {
    pub fn new(kind: StmtKind, extent: Extent) -> Self {
        Self { kind, extent }
    }
    pub fn is_local_declaration(&self) -> bool {
        matches!(self.kind, StmtKind::LocalDecl { .. })
    }
    /// True when the statement still expects an expression to its right, as in
    /// `Runnable r =`, `return xs.map(` or `if (c) run(`.
    pub fn awaits_expression(&self) -> bool {
        match &self.kind {
            StmtKind::LocalDecl { init: value, .. } | StmtKind::Return(value) => {
                value.as_ref().is_none_or(Expr::is_cut_short)
            }
            StmtKind::Expression(e) => e.is_cut_short(),
            StmtKind::Control { body, .. } | StmtKind::Member { body, .. } => {
                body.as_ref().is_some_and(|inner| inner.awaits_expression())
            }
            StmtKind::Block(_) => false,
        }
    }

    /// True when the value of a declaration or `return` is missing entirely,
    /// so that a lambda would be the whole value.
    pub fn value_missing(&self) -> bool {
        match &self.kind {
            StmtKind::LocalDecl { init: None, .. } | StmtKind::Return(None) => true,
            StmtKind::Control { body, .. } | StmtKind::Member { body, .. } => {
                body.as_ref().is_some_and(|inner| inner.value_missing())
            }
            _ => false,
        }
    }

    /// Puts a recovered lambda, and the source text that followed it, into
    /// the expression this statement is waiting for. Returns false when
    /// nothing is waiting.
    pub fn absorb(&mut self, lambda: Expr, trailing: Option<Expr>) -> bool {
        match &mut self.kind {
            StmtKind::LocalDecl { init: value, .. } | StmtKind::Return(value) => match value {
                Some(e) => e.extend(lambda, trailing),
                None => {
                    *value = Some(lambda.followed_by(trailing));
                    true
                }
            },
            StmtKind::Expression(e) => e.extend(lambda, trailing),
            StmtKind::Control { body, .. } | StmtKind::Member { body, .. } => body
                .as_mut()
                .is_some_and(|inner| inner.absorb(lambda, trailing)),
            StmtKind::Block(_) => false,
        }
    }

    /// Records `offset` as the end of this statement, and of a body statement
    /// read along with it, unless those ends are known.
    pub fn set_end_if_unknown(&mut self, offset: usize) -> bool {
        if let StmtKind::Control {
            body: Some(inner), ..
        }
        | StmtKind::Member {
            body: Some(inner), ..
        } = &mut self.kind
        {
            inner.set_end_if_unknown(offset);
        }
        self.extent.set_end_if_unknown(offset)
    }
    pub fn awaits_body(&self) -> bool {
        match &self.kind {
            StmtKind::Control { body, .. } | StmtKind::Member { body, .. } => {
                body.as_ref().is_none_or(|inner| inner.awaits_body())
            }
            _ => false,
        }
    }
    /// The empty body slot of this statement or of the statement it wraps,
    /// as in `else if (x)`.
    pub fn body_slot(&mut self) -> Option<&mut Option<Box<Statement>>> {
        match &mut self.kind {
            StmtKind::Control { body, .. } | StmtKind::Member { body, .. } => match body {
                Some(inner) => inner.body_slot(),
                None => Some(body),
            },
            _ => None,
        }
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            StmtKind::LocalDecl { ty, name, init } => {
                let mut parts = vec![];
                if let Some(ty) = ty {
                    parts.push(ty.to_string());
                }
                if let Some(name) = name {
                    parts.push(name.clone());
                }
                write!(f, "{}", parts.join(" "))?;
                if let Some(init) = init {
                    write!(f, " = {init}")?;
                }
                write!(f, ";")
            }
            StmtKind::Return(Some(e)) => write!(f, "return {e};"),
            StmtKind::Return(None) => write!(f, "return;"),
            StmtKind::Expression(e) => write!(f, "{e};"),
            StmtKind::Block(b) => write!(f, "{b}"),
            StmtKind::Control {
                keyword,
                header,
                body,
            } => {
                write!(f, "{keyword}")?;
                if let Some(h) = header {
                    write!(f, " {h}")?;
                }
                match body {
                    Some(b) => write!(f, " {b}"),
                    None => write!(f, ";"),
                }
            }
            StmtKind::Member { header, body } => match body {
                Some(b) => write!(f, "{header} {b}"),
                None => write!(f, "{header};"),
            },
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Block {
    pub statements: Vec<Statement>,
    pub extent: Extent,
}

impl Block {
    pub fn new(extent: Extent) -> Self {
        Self {
            statements: vec![],
            extent,
        }
    }
}

impl fmt::Display for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.statements.is_empty() {
            return write!(f, "{{}}");
        }
        write!(f, "{{ ")?;
        for s in &self.statements {
            write!(f, "{s} ")?;
        }
        write!(f, "}}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_declaration_awaits_initializer() {
        let s = Statement::new(
            StmtKind::LocalDecl {
                ty: Some(TypeRef::new("Runnable", Extent::new(0, 8))),
                name: Some("r".into()),
                init: None,
            },
            Extent::open(0),
        );
        assert!(s.awaits_expression());
        assert!(!s.awaits_body());
        assert_eq!(s.to_string(), "Runnable r;");
    }

    #[test]
    fn cut_short_values_await_lambdas() {
        let text = |s: &str, start: usize| Expr::text(s, Extent::new(start, start + s.len()));
        let decl = Statement::new(
            StmtKind::LocalDecl {
                ty: Some(TypeRef::new("long", Extent::new(0, 4))),
                name: Some("n".into()),
                init: Some(text("xs.map(", 9)),
            },
            Extent::open(0),
        );
        assert!(decl.awaits_expression());
        assert!(!decl.value_missing());

        let ret = Statement::new(StmtKind::Return(Some(text("f(", 7))), Extent::open(0));
        assert!(ret.awaits_expression());

        let mut guarded = Statement::new(
            StmtKind::Control {
                keyword: "if".into(),
                header: Some("(c)".into()),
                body: Some(Box::new(Statement::new(
                    StmtKind::Expression(text("run(", 7)),
                    Extent::open(7),
                ))),
            },
            Extent::open(0),
        );
        assert!(guarded.awaits_expression());
        assert!(guarded.absorb(text("a", 11), Some(text(")", 12))));
        assert_eq!(guarded.to_string(), "if (c) run(a);");

        guarded.set_end_if_unknown(14);
        let StmtKind::Control { body: Some(inner), .. } = &guarded.kind else {
            panic!("expected a body");
        };
        assert_eq!(inner.extent, Extent::new(7, 14));
        assert_eq!(guarded.extent, Extent::new(0, 14));

        let complete = Statement::new(
            StmtKind::Return(Some(Expr::new(
                crate::ast::ExprKind::Name("x".into()),
                Extent::new(7, 8),
            ))),
            Extent::new(0, 9),
        );
        assert!(!complete.awaits_expression());
    }

    #[test]
    fn block_display() {
        let mut b = Block::new(Extent::new(0, 12));
        b.statements.push(Statement::new(StmtKind::Return(None), Extent::new(2, 9)));
        assert_eq!(b.to_string(), "{ return; }");
        assert_eq!(Block::new(Extent::new(0, 2)).to_string(), "{}");
    }

    #[test]
    fn control_without_body() {
        let s = Statement::new(
            StmtKind::Control {
                keyword: "while".into(),
                header: Some("(x)".into()),
                body: None,
            },
            Extent::open(0),
        );
        assert!(s.awaits_body());
        assert_eq!(s.to_string(), "while (x);");
    }

    #[test]
    fn body_slot_reaches_through_else_if() {
        let inner = Statement::new(
            StmtKind::Control {
                keyword: "if".into(),
                header: Some("(y)".into()),
                body: None,
            },
            Extent::open(5),
        );
        let mut s = Statement::new(
            StmtKind::Control {
                keyword: "else".into(),
                header: None,
                body: Some(Box::new(inner)),
            },
            Extent::open(0),
        );
        assert!(s.awaits_body());
        let slot = s.body_slot().expect("inner if has no body yet");
        *slot = Some(Box::new(Statement::new(
            StmtKind::Block(Block::new(Extent::new(12, 14))),
            Extent::new(12, 14),
        )));
        assert!(!s.awaits_body());
        assert_eq!(s.to_string(), "else if (y) {}");
    }
}
