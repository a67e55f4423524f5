//! A light grammar engine.
//!
//! [`EventSource`] reads the token stream once, keeps track of bracket depth
//! and of the braces it is inside, and reports constructs to the recovery
//! driver as they start and end. It does not build a full syntax tree: a
//! statement is classified from its tokens when it ends, or when a lambda or
//! a block begins in the middle of it, in which case it is reported as open.
use std::path::PathBuf;

use crate::ast::{
    Block, DirectiveKind, Expr, ExprKind, Extent, ImportDecl, LambdaExpr, ModuleDirective,
    Statement, StmtKind, TypeRef,
};
use crate::recovery::Construct;
use crate::recovery::driver::Event;
use crate::utils::metadata::Span;

use super::error::InvalidInput;
use super::token::Token;

/// Words that start a declaration or a statement but never a local variable
/// type.
const NOT_A_TYPE: &[&str] = &[
    "abstract",
    "assert",
    "break",
    "case",
    "class",
    "continue",
    "default",
    "enum",
    "interface",
    "native",
    "new",
    "private",
    "protected",
    "public",
    "strictfp",
    "super",
    "this",
    "throw",
    "transient",
    "void",
    "volatile",
];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum FrameKind {
    Unit,
    Block,
    Module,
}

#[derive(Clone, Copy, Debug)]
struct OpenLambda {
    depth: usize,
    /// whether the enclosing statement had been reported as open
    announced: bool,
}

/// Per-brace state.
#[derive(Debug)]
struct Frame {
    kind: FrameKind,
    /// bracket depth in front of the opening brace
    depth: usize,
    /// bracket depth of statements directly inside
    content_depth: usize,
    /// tokens of the statement being read
    pending: Vec<usize>,
    /// an open statement has been reported and not ended yet
    announced: bool,
    /// the closing brace also ends the statement that introduced the block
    closes_owner: bool,
    /// the block is the body of a lambda
    lambda_body: bool,
    lambdas: Vec<OpenLambda>,
    /// end of the last lambda inside the announced statement; the source
    /// from here on is reported as trailing text
    trailing_from: Option<usize>,
}

impl Frame {
    fn new(kind: FrameKind, depth: usize, content_depth: usize, closes_owner: bool) -> Self {
        Self {
            kind,
            depth,
            content_depth,
            pending: vec![],
            announced: false,
            closes_owner,
            lambda_body: false,
            lambdas: vec![],
            trailing_from: None,
        }
    }
}

enum Classified {
    Construct(Construct),
    Package(String),
}

pub struct EventSource<'a> {
    src: &'a str,
    path: PathBuf,
    tokens: Vec<(Token, Span)>,
    depth: usize,
    /// never empty, the unit frame stays at the bottom
    frames: Vec<Frame>,
    /// the next `{` opens a lambda body
    lambda_block: bool,
    events: Vec<Event>,
}

impl<'a> EventSource<'a> {
    pub fn new(src: &'a str, path: impl Into<PathBuf>, tokens: Vec<(Token, Span)>) -> Self {
        Self {
            src,
            path: path.into(),
            tokens,
            depth: 0,
            frames: vec![Frame::new(FrameKind::Unit, 0, 0, false)],
            lambda_block: false,
            events: vec![],
        }
    }

    pub fn run(mut self) -> Vec<Event> {
        for idx in 0..self.tokens.len() {
            self.step(idx);
        }
        self.finish_input();
        log::debug!("{} event(s) from {} token(s)", self.events.len(), self.tokens.len());
        self.events
    }

    fn top(&self) -> &Frame {
        &self.frames[self.frames.len() - 1]
    }

    fn frame(&mut self) -> &mut Frame {
        let last = self.frames.len() - 1;
        &mut self.frames[last]
    }

    fn token(&self, id: usize) -> &Token {
        &self.tokens[id].0
    }

    fn token_at(&self, ids: &[usize], pos: usize) -> Option<&Token> {
        ids.get(pos).map(|&id| self.token(id))
    }

    fn span(&self, idx: usize) -> Span {
        self.tokens[idx].1.clone()
    }

    /// End of the token in front of `idx`.
    fn prev_end(&self, idx: usize) -> usize {
        idx.checked_sub(1)
            .map_or(self.tokens[idx].1.start, |prev| self.tokens[prev].1.end)
    }

    fn pending_end(&self) -> Option<usize> {
        self.top().pending.last().map(|&id| self.tokens[id].1.end)
    }

    fn text(&self, ids: &[usize]) -> String {
        match (ids.first(), ids.last()) {
            (Some(&first), Some(&last)) => {
                self.src[self.tokens[first].1.start..self.tokens[last].1.end].to_string()
            }
            _ => String::new(),
        }
    }

    fn extent(&self, ids: &[usize], end: Option<usize>) -> Extent {
        let start = ids.first().map_or(0, |&id| self.tokens[id].1.start);
        Extent { start, end }
    }

    fn step(&mut self, idx: usize) {
        match self.tokens[idx].0 {
            Token::Unknown(c) => self.invalid(idx, format!("unexpected character `{c}`")),
            Token::SemiColon => self.semicolon(idx),
            Token::BlockBegin => self.open_brace(idx),
            Token::BlockEnd => self.close_brace(idx),
            Token::ParenBegin | Token::ArrayBegin => {
                self.frame().pending.push(idx);
                self.depth += 1;
            }
            Token::ParenEnd | Token::ArrayEnd => self.close_bracket(idx),
            Token::Comma => {
                self.end_expression_lambdas(Some(self.depth), self.prev_end(idx));
                self.frame().pending.push(idx);
            }
            Token::Arrow => self.arrow(idx),
            _ => self.frame().pending.push(idx),
        }
    }

    fn invalid(&mut self, idx: usize, message: String) {
        self.announce_pending();
        let error = InvalidInput::new(Some(message), self.span(idx), self.path.clone());
        self.events.push(Event::Invalid {
            error,
            depth: self.depth,
        });
        // the driver unwinds everything that is open in this frame
        let frame = self.frame();
        frame.announced = false;
        frame.trailing_from = None;
        frame.lambdas.clear();
    }

    fn semicolon(&mut self, idx: usize) {
        if self.depth > self.top().content_depth {
            // `for (init; cond; step)`
            self.frame().pending.push(idx);
            return;
        }
        let end = self.span(idx).end;
        self.end_expression_lambdas(None, self.prev_end(idx));
        if self.top().announced {
            self.report_trailing(self.pending_end());
            let frame = self.frame();
            frame.announced = false;
            frame.pending.clear();
            self.events.push(Event::EndStatement { offset: end });
        } else {
            let ids = std::mem::take(&mut self.frame().pending);
            self.emit_statement(&ids, Some(end));
        }
    }

    fn open_brace(&mut self, idx: usize) {
        let span = self.span(idx);
        let lambda_body = std::mem::take(&mut self.lambda_block);
        if self.top().announced {
            self.report_trailing(self.pending_end());
        }
        let pending = std::mem::take(&mut self.frame().pending);
        if self.top().kind == FrameKind::Unit {
            if let Some((name, open, start)) = self.module_header(&pending) {
                self.events.push(Event::Module {
                    name,
                    open,
                    extent: Extent::open(start),
                });
                let depth = self.depth;
                self.frames
                    .push(Frame::new(FrameKind::Module, depth, depth + 1, false));
                self.depth += 1;
                return;
            }
        }
        let frame = self.frame();
        let owner = !pending.is_empty() && !frame.announced;
        let closes_owner = owner && frame.lambdas.is_empty();
        if owner {
            let stmt = self.header_statement(&pending);
            let bracket_balance = self.statement_balance();
            self.events.push(Event::Begin {
                construct: Construct::Statement(stmt),
                bracket_balance,
            });
            self.frame().announced = true;
        }
        self.events.push(Event::Begin {
            construct: Construct::Block(Block::new(Extent::open(span.start))),
            bracket_balance: self.depth,
        });
        let depth = self.depth;
        let mut frame = Frame::new(FrameKind::Block, depth, depth + 1, closes_owner);
        frame.lambda_body = lambda_body;
        self.frames.push(frame);
        self.depth += 1;
    }

    fn close_brace(&mut self, idx: usize) {
        if self.frames.len() == 1 {
            self.invalid(idx, "unbalanced `}`".to_string());
            return;
        }
        let span = self.span(idx);
        self.end_expression_lambdas(None, self.prev_end(idx));
        // a statement missing its semicolon ends at the brace
        self.announce_pending();
        let Some(frame) = self.frames.pop() else {
            return;
        };
        self.depth = frame.depth;
        self.events.push(match frame.kind {
            FrameKind::Module => Event::EndModule {
                brace_start: span.start,
                brace_end: span.end,
            },
            FrameKind::Block | FrameKind::Unit => Event::CloseBlock {
                brace_start: span.start,
                brace_end: span.end,
                bracket_balance: frame.depth,
            },
        });
        if frame.closes_owner {
            self.events.push(Event::EndStatement { offset: span.end });
            self.frame().announced = false;
        }
        if frame.lambda_body && self.top().announced {
            self.frame().trailing_from = Some(span.end);
        }
    }

    fn close_bracket(&mut self, idx: usize) {
        if self.depth <= self.top().content_depth {
            let message = format!("unbalanced `{}`", self.token(idx));
            self.invalid(idx, message);
            return;
        }
        self.end_expression_lambdas(Some(self.depth), self.prev_end(idx));
        self.frame().pending.push(idx);
        self.depth -= 1;
    }

    fn arrow(&mut self, idx: usize) {
        let arrow_start = self.span(idx).start;
        let (params, start) = self.take_params();
        let start = start.unwrap_or(arrow_start);
        if self.top().announced {
            // `, ` in `f(a -> a, b -> b)`
            self.report_trailing(Some(start));
        }
        // whatever precedes the parameters is the statement the lambda sits in
        self.announce_pending();
        let lambda = LambdaExpr::new(params, Extent::open(start));
        self.events.push(Event::Begin {
            construct: Construct::Lambda(lambda),
            bracket_balance: self.depth,
        });
        let block_body = matches!(self.tokens.get(idx + 1), Some((Token::BlockBegin, _)));
        self.lambda_block = block_body;
        if !block_body {
            let depth = self.depth;
            let frame = self.frame();
            frame.lambdas.push(OpenLambda {
                depth,
                announced: frame.announced,
            });
            frame.announced = false;
        }
    }

    /// Removes the lambda parameters from the end of the pending tokens:
    /// either a single identifier or a parenthesised list.
    fn take_params(&mut self) -> (Vec<String>, Option<usize>) {
        let pending = self.top().pending.clone();
        match pending.last().map(|&id| self.token(id)) {
            Some(Token::Ident(name)) => {
                let name = name.clone();
                let start = self.tokens[pending[pending.len() - 1]].1.start;
                self.frame().pending.pop();
                (vec![name], Some(start))
            }
            Some(Token::ParenEnd) => {
                let Some(open) = self.matching_open_paren(&pending) else {
                    return (vec![], None);
                };
                let group = pending[open..].to_vec();
                let params = self.param_names(&group);
                let start = self.tokens[group[0]].1.start;
                self.frame().pending.truncate(open);
                (params, Some(start))
            }
            _ => (vec![], None),
        }
    }

    fn matching_open_paren(&self, ids: &[usize]) -> Option<usize> {
        let mut nesting = 0usize;
        for (pos, &id) in ids.iter().enumerate().rev() {
            match self.token(id) {
                Token::ParenEnd => nesting += 1,
                Token::ParenBegin => {
                    nesting -= 1;
                    if nesting == 0 {
                        return Some(pos);
                    }
                }
                _ => {}
            }
        }
        None
    }

    /// The last identifier of every comma separated entry, so that both
    /// `(a, b)` and `(String a, int b)` give `a` and `b`.
    fn param_names(&self, group: &[usize]) -> Vec<String> {
        let inner = &group[1..group.len().saturating_sub(1)];
        inner
            .split(|&id| *self.token(id) == Token::Comma)
            .filter_map(|entry| {
                entry.iter().rev().find_map(|&id| match self.token(id) {
                    Token::Ident(name) => Some(name.clone()),
                    _ => None,
                })
            })
            .collect()
    }

    fn matching_close_paren(&self, ids: &[usize], open: usize) -> usize {
        let mut nesting = 0usize;
        for (pos, &id) in ids.iter().enumerate().skip(open) {
            match self.token(id) {
                Token::ParenBegin => nesting += 1,
                Token::ParenEnd => {
                    nesting = nesting.saturating_sub(1);
                    if nesting == 0 {
                        return pos;
                    }
                }
                _ => {}
            }
        }
        ids.len() - 1
    }

    /// Ends the expression-bodied lambdas of the current frame, innermost
    /// first. With `at`, only the lambdas that started at that bracket depth.
    fn end_expression_lambdas(&mut self, at: Option<usize>, fallback_end: usize) {
        let mut offset = fallback_end;
        loop {
            let frame = self.frame();
            let Some(lambda) = frame.lambdas.last().copied() else {
                break;
            };
            if at.is_some_and(|depth| depth != lambda.depth) {
                break;
            }
            frame.lambdas.pop();
            let body = std::mem::take(&mut frame.pending);
            let body_announced = std::mem::replace(&mut frame.announced, lambda.announced);
            let body_end = body.last().map(|&last| self.tokens[last].1.end);
            if body_announced {
                self.report_trailing(body_end);
            } else if let Some(end) = body_end {
                offset = end;
                let stmt = self.statement(&body, Some(offset));
                self.events.push(Event::Begin {
                    construct: Construct::Statement(stmt),
                    bracket_balance: lambda.depth,
                });
            }
            self.events.push(Event::EndLambda { offset });
            self.frame().trailing_from = lambda.announced.then_some(offset);
        }
    }

    /// Bracket balance for a statement starting now: the frame's own depth,
    /// or the depth of the expression-bodied lambda it is the body of.
    fn statement_balance(&self) -> usize {
        let frame = self.top();
        frame
            .lambdas
            .last()
            .map_or(frame.content_depth, |lambda| lambda.depth)
    }

    /// Reports the pending tokens as an open statement, unless one has been
    /// reported already, in which case they are its continuation.
    fn announce_pending(&mut self) {
        if self.top().announced {
            self.report_trailing(self.pending_end());
            self.frame().pending.clear();
            return;
        }
        let ids = std::mem::take(&mut self.frame().pending);
        if self.emit_statement(&ids, None) {
            self.frame().announced = true;
        }
    }

    /// Reports the source between the end of the last lambda of the
    /// announced statement and `end`.
    fn report_trailing(&mut self, end: Option<usize>) {
        let Some(from) = self.frame().trailing_from.take() else {
            return;
        };
        match end {
            Some(end) if end > from => {
                let text = self.src[from..end].to_string();
                self.events.push(Event::Text {
                    text,
                    extent: Extent::new(from, end),
                });
            }
            _ => {}
        }
    }

    /// Returns whether a node was started.
    fn emit_statement(&mut self, ids: &[usize], end: Option<usize>) -> bool {
        if ids.is_empty() {
            return false;
        }
        let kind = self.top().kind;
        let bracket_balance = self.statement_balance();
        match self.classify(kind, ids, end) {
            Classified::Construct(construct) => {
                self.events.push(Event::Begin {
                    construct,
                    bracket_balance,
                });
                true
            }
            Classified::Package(name) => {
                self.events.push(Event::Package { name });
                false
            }
        }
    }

    fn finish_input(&mut self) {
        let end = self.tokens.last().map_or(0, |(_, span)| span.end);
        self.end_expression_lambdas(None, end);
        self.announce_pending();
        self.events.push(Event::Eof { offset: end });
    }

    fn classify(&self, kind: FrameKind, ids: &[usize], end: Option<usize>) -> Classified {
        match self.token(ids[0]) {
            Token::Import => Classified::Construct(Construct::Import(self.import(ids, end))),
            Token::Package if kind == FrameKind::Unit => Classified::Package(self.text(&ids[1..])),
            _ if kind == FrameKind::Module => match self.directive(ids, end) {
                Some(d) => Classified::Construct(Construct::ModuleStatement(d)),
                None => Classified::Construct(Construct::Statement(self.statement(ids, end))),
            },
            _ => Classified::Construct(Construct::Statement(self.statement(ids, end))),
        }
    }

    fn module_header(&self, ids: &[usize]) -> Option<(String, bool, usize)> {
        let open = self.token_at(ids, 0)?.is_ident("open");
        let at = usize::from(open);
        if !self.token_at(ids, at)?.is_ident("module") || ids.len() <= at + 1 {
            return None;
        }
        Some((self.text(&ids[at + 1..]), open, self.tokens[ids[0]].1.start))
    }

    fn import(&self, ids: &[usize], end: Option<usize>) -> ImportDecl {
        let mut decl = ImportDecl {
            path: vec![],
            on_demand: false,
            is_static: false,
            extent: self.extent(ids, end),
        };
        for &id in &ids[1..] {
            match self.token(id) {
                Token::Static => decl.is_static = true,
                Token::Ident(s) => decl.path.push(s.clone()),
                Token::Star => decl.on_demand = true,
                _ => {}
            }
        }
        decl
    }

    fn directive(&self, ids: &[usize], end: Option<usize>) -> Option<ModuleDirective> {
        let Token::Ident(word) = self.token(ids[0]) else {
            return None;
        };
        let rest = &ids[1..];
        let extent = self.extent(ids, end);
        let (kind, separator) = match word.as_str() {
            "requires" => {
                let (mut transitive, mut is_static) = (false, false);
                let mut used = 0;
                // the last word is always the module name
                while used + 1 < rest.len() {
                    match self.token(rest[used]) {
                        Token::Ident(s) if s == "transitive" => transitive = true,
                        Token::Static => is_static = true,
                        _ => break,
                    }
                    used += 1;
                }
                return Some(ModuleDirective {
                    kind: DirectiveKind::Requires {
                        transitive,
                        is_static,
                    },
                    name: self.text(&rest[used..]),
                    targets: vec![],
                    extent,
                });
            }
            "exports" => (DirectiveKind::Exports, "to"),
            "opens" => (DirectiveKind::Opens, "to"),
            "uses" => (DirectiveKind::Uses, ""),
            "provides" => (DirectiveKind::Provides, "with"),
            _ => return None,
        };
        let split = rest
            .iter()
            .position(|&id| self.token(id).is_ident(separator))
            .unwrap_or(rest.len());
        let targets = rest
            .get(split + 1..)
            .unwrap_or_default()
            .split(|&id| *self.token(id) == Token::Comma)
            .filter(|entry| !entry.is_empty())
            .map(|entry| self.text(entry))
            .collect();
        Some(ModuleDirective {
            kind,
            name: self.text(&rest[..split]),
            targets,
            extent,
        })
    }

    /// The statement in front of a block. Control keywords and declarations
    /// take the block as their body; anything else is taken as a member
    /// header.
    fn header_statement(&self, ids: &[usize]) -> Statement {
        let plain = matches!(self.token(ids[0]), Token::Control(_) | Token::Return)
            || ids.iter().any(|&id| *self.token(id) == Token::Assign);
        if plain {
            return self.statement(ids, None);
        }
        Statement::new(
            StmtKind::Member {
                header: self.text(ids),
                body: None,
            },
            self.extent(ids, None),
        )
    }

    fn statement(&self, ids: &[usize], end: Option<usize>) -> Statement {
        let extent = self.extent(ids, end);
        let kind = match self.token(ids[0]) {
            Token::Return => StmtKind::Return(self.expr(&ids[1..])),
            Token::Control(keyword) => {
                let (header, rest) = match self.token_at(ids, 1) {
                    Some(Token::ParenBegin) => {
                        let close = self.matching_close_paren(ids, 1);
                        (Some(self.text(&ids[1..=close])), &ids[close + 1..])
                    }
                    _ => (None, &ids[1..]),
                };
                let body = (!rest.is_empty()).then(|| Box::new(self.statement(rest, end)));
                StmtKind::Control {
                    keyword: keyword.clone(),
                    header,
                    body,
                }
            }
            _ => match self.local_decl(ids) {
                Some(decl) => decl,
                None => StmtKind::Expression(self.expr_of(ids)),
            },
        };
        Statement::new(kind, extent)
    }

    fn local_decl(&self, ids: &[usize]) -> Option<StmtKind> {
        let modifiers = ids
            .iter()
            .take_while(|&&id| self.token(id).is_ident("final"))
            .count();
        let ids = &ids[modifiers..];
        let (ty, used) = self.type_ref(ids)?;
        let Some(Token::Ident(name)) = self.token_at(ids, used) else {
            return None;
        };
        let init = match self.token_at(ids, used + 1) {
            None => None,
            Some(Token::Assign) => self.expr(&ids[used + 2..]),
            Some(_) => return None,
        };
        Some(StmtKind::LocalDecl {
            ty: Some(ty),
            name: Some(name.clone()),
            init,
        })
    }

    /// A type at the start of `ids` and the number of tokens it covers.
    fn type_ref(&self, ids: &[usize]) -> Option<(TypeRef, usize)> {
        let Some(Token::Ident(first)) = self.token_at(ids, 0) else {
            return None;
        };
        if NOT_A_TYPE.contains(&first.as_str()) {
            return None;
        }
        let mut used = 1;
        while let (Some(Token::Dot), Some(Token::Ident(_))) =
            (self.token_at(ids, used), self.token_at(ids, used + 1))
        {
            used += 2;
        }
        if matches!(self.token_at(ids, used), Some(Token::Op(op)) if op.starts_with('<')) {
            let mut angle = 0i32;
            loop {
                match self.token_at(ids, used)? {
                    Token::Op(op) => {
                        for c in op.chars() {
                            match c {
                                '<' => angle += 1,
                                '>' => angle -= 1,
                                '?' | '&' => {}
                                _ => return None,
                            }
                        }
                    }
                    Token::Ident(_) | Token::Comma | Token::Dot => {}
                    Token::ArrayBegin | Token::ArrayEnd => {}
                    _ => return None,
                }
                used += 1;
                if angle <= 0 {
                    break;
                }
            }
        }
        let name_end = used;
        let mut dims = 0;
        while let (Some(Token::ArrayBegin), Some(Token::ArrayEnd)) =
            (self.token_at(ids, used), self.token_at(ids, used + 1))
        {
            dims += 1;
            used += 2;
        }
        let extent = Extent::new(self.tokens[ids[0]].1.start, self.tokens[ids[used - 1]].1.end);
        let ty = TypeRef {
            name: self.text(&ids[..name_end]),
            dims,
            extent,
        };
        Some((ty, used))
    }

    fn expr(&self, ids: &[usize]) -> Option<Expr> {
        (!ids.is_empty()).then(|| self.expr_of(ids))
    }

    fn expr_of(&self, ids: &[usize]) -> Expr {
        let extent = match (ids.first(), ids.last()) {
            (Some(&first), Some(&last)) => {
                Extent::new(self.tokens[first].1.start, self.tokens[last].1.end)
            }
            _ => Extent::default(),
        };
        let kind = match ids {
            [id] => match self.token(*id) {
                Token::Ident(s) => ExprKind::Name(s.clone()),
                Token::Number(_) | Token::Str(_) | Token::Char(_) => {
                    ExprKind::Literal(self.text(ids))
                }
                _ => ExprKind::Text(self.text(ids)),
            },
            _ => ExprKind::Text(self.text(ids)),
        };
        Expr::new(kind, extent)
    }
}
