//! Error recovery for brace-structured, Java-like source.
//!
//! A grammar engine that gives up half way through a construct leaves behind
//! partial syntax nodes. The [`recovery`] module keeps those nodes in a
//! recovery tree that mirrors the bracket nesting of the input, decides where
//! each newly started construct belongs, and finally collapses the tree into
//! ordinary syntax nodes with every unknown end offset filled in.
//!
//! [`recover`] runs the whole pipeline on a source string: the [`syntax`]
//! lexer and event source stand in for the grammar engine, and
//! [`recovery::driver::RecoveryDriver`] applies the events to the tree.

pub mod ast;
pub mod recovery;
pub mod syntax;
pub mod utils;

use std::path::PathBuf;

pub use log;
pub use recovery::driver::Recovered;

/// Configuration for the whole pipeline.
#[derive(Debug, Clone, Copy, Default)]
pub struct Config {
    pub recovery: recovery::Config,
}

/// Recovers a syntax tree from `src`, however broken it is.
pub fn recover(src: &str, path: Option<PathBuf>, config: Config) -> Recovered {
    let path = path.unwrap_or_default();
    let (events, lexer_errs) = syntax::events(src, &path);
    let mut driver = recovery::driver::RecoveryDriver::new(config.recovery, path);
    lexer_errs.into_iter().for_each(|e| driver.record_error(e));
    events.into_iter().for_each(|ev| driver.feed(ev));
    driver.finish()
}
