//! Tokens, the chumsky lexer and the event source that feeds the recovery
//! driver.
pub mod error;
pub mod events;
pub mod lexer;
pub mod token;

use std::path::Path;

use crate::recovery::driver::Event;

/// Lexes `src` and turns it into driver events. Lexer failures are returned
/// separately, they do not show up in the event stream.
pub fn events(src: &str, path: &Path) -> (Vec<Event>, Vec<error::InvalidInput>) {
    let (tokens, errs) = lexer::tokenize(src, path);
    let events = events::EventSource::new(src, path, tokens).run();
    (events, errs)
}
