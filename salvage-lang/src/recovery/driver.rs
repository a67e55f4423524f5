use std::path::PathBuf;

use crate::ast::{CompilationUnit, Extent};
use crate::syntax::error::InvalidInput;
use crate::utils::error::ReportableError;

use super::{Config, Construct, NodeId, RecoveryTree};

/// What the grammar engine reports while it walks the input.
#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    /// A construct starts at the given bracket balance.
    Begin {
        construct: Construct,
        bracket_balance: usize,
    },
    Package {
        name: String,
    },
    Module {
        name: String,
        open: bool,
        extent: Extent,
    },
    EndModule {
        brace_start: usize,
        brace_end: usize,
    },
    CloseBlock {
        brace_start: usize,
        brace_end: usize,
        bracket_balance: usize,
    },
    EndStatement {
        offset: usize,
    },
    EndLambda {
        offset: usize,
    },
    /// Source text after a lambda argument of the open statement, up to the
    /// next lambda or the end of the statement.
    Text {
        text: String,
        extent: Extent,
    },
    /// Input the grammar engine could not make sense of, found at `depth`
    /// open brackets.
    Invalid {
        error: InvalidInput,
        depth: usize,
    },
    Eof {
        offset: usize,
    },
}

/// Result of recovering one source file.
#[derive(Clone, Debug)]
pub struct Recovered {
    pub unit: CompilationUnit,
    pub errors: Vec<InvalidInput>,
    /// Listing of the recovery tree just before it was collapsed.
    pub tree_dump: String,
}

impl Recovered {
    pub fn reportable_errors(&self) -> Vec<Box<dyn ReportableError>> {
        self.errors
            .iter()
            .cloned()
            .map(|e| Box::new(e) as Box<dyn ReportableError>)
            .collect()
    }
}

/// Owns a [`RecoveryTree`] and the node that receives the next construct.
#[derive(Debug)]
pub struct RecoveryDriver {
    tree: RecoveryTree,
    current: NodeId,
    errors: Vec<InvalidInput>,
    eof: Option<usize>,
    path: PathBuf,
}

impl RecoveryDriver {
    pub fn new(config: Config, path: PathBuf) -> Self {
        let tree = RecoveryTree::new(config);
        let current = tree.root();
        Self {
            tree,
            current,
            errors: vec![],
            eof: None,
            path,
        }
    }

    pub fn tree(&self) -> &RecoveryTree {
        &self.tree
    }
    pub fn current(&self) -> NodeId {
        self.current
    }
    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    pub fn begin(&mut self, construct: Construct, bracket_balance: usize) {
        self.current = self.tree.add(self.current, construct, bracket_balance);
    }

    pub fn set_package(&mut self, name: String) {
        self.tree.set_package(name);
    }

    pub fn begin_module(&mut self, name: String, open: bool, extent: Extent) {
        self.tree.begin_module(name, open, extent);
    }

    pub fn end_module(&mut self, brace_start: usize, brace_end: usize) {
        self.current = self.tree.close_statement(self.current, brace_start);
        self.tree.end_module(brace_end);
    }

    pub fn close_block(&mut self, brace_start: usize, brace_end: usize, bracket_balance: usize) {
        self.current = self
            .tree
            .close_block(self.current, brace_start, brace_end, bracket_balance);
    }

    pub fn end_statement(&mut self, offset: usize) {
        self.current = self.tree.close_statement(self.current, offset);
    }

    pub fn end_lambda(&mut self, offset: usize) {
        self.current = self.tree.close_lambda(self.current, offset);
    }

    pub fn trailing_text(&mut self, text: &str, extent: Extent) {
        self.tree.append_trailing_text(self.current, text, extent);
    }

    /// Records the error and unwinds to the block enclosing `depth`.
    pub fn invalid_input(&mut self, error: InvalidInput, depth: usize) {
        log::debug!("{error}, unwinding from depth {depth}");
        let offset = error.span.start;
        self.errors.push(error);
        self.current = self
            .tree
            .unwind(self.current, offset, depth.saturating_sub(1));
    }

    /// Records an error that does not affect the tree.
    pub fn record_error(&mut self, error: InvalidInput) {
        self.errors.push(error);
    }

    pub fn feed(&mut self, event: Event) {
        log::trace!("{event:?}");
        match event {
            Event::Begin {
                construct,
                bracket_balance,
            } => self.begin(construct, bracket_balance),
            Event::Package { name } => self.set_package(name),
            Event::Module { name, open, extent } => self.begin_module(name, open, extent),
            Event::EndModule {
                brace_start,
                brace_end,
            } => self.end_module(brace_start, brace_end),
            Event::CloseBlock {
                brace_start,
                brace_end,
                bracket_balance,
            } => self.close_block(brace_start, brace_end, bracket_balance),
            Event::EndStatement { offset } => self.end_statement(offset),
            Event::EndLambda { offset } => self.end_lambda(offset),
            Event::Text { text, extent } => self.trailing_text(&text, extent),
            Event::Invalid { error, depth } => self.invalid_input(error, depth),
            Event::Eof { offset } => self.eof = Some(offset),
        }
    }

    /// Closes whatever is still open at the end of input and collapses the
    /// tree into a compilation unit.
    pub fn finish(mut self) -> Recovered {
        let tree_dump = self.tree.dump(self.tree.root(), 0);
        match self.eof {
            Some(offset) => {
                self.tree.close_all(self.current, offset);
            }
            None => log::debug!("no end of input reported, open ends stay unknown"),
        }
        let unit = self.tree.updated_unit();
        Recovered {
            unit,
            errors: self.errors,
            tree_dump,
        }
    }
}
