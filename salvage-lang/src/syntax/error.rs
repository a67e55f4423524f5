use std::path::PathBuf;

use thiserror::Error;

use crate::utils::error::ReportableError;
use crate::utils::metadata::{Location, Span};

/// Input the grammar engine could not make sense of. Handing one to the
/// recovery driver unwinds the tree.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("invalid input{}", describe(.message))]
pub struct InvalidInput {
    pub message: Option<String>,
    pub span: Span,
    pub path: PathBuf,
}

fn describe(message: &Option<String>) -> String {
    message.as_ref().map(|m| format!(": {m}")).unwrap_or_default()
}

impl InvalidInput {
    pub fn new(message: Option<String>, span: Span, path: impl Into<PathBuf>) -> Self {
        Self {
            message,
            span,
            path: path.into(),
        }
    }
}

impl ReportableError for InvalidInput {
    fn get_labels(&self) -> Vec<(Location, String)> {
        let label = self
            .message
            .clone()
            .unwrap_or_else(|| "cannot be parsed".to_string());
        vec![(Location::new(self.span.clone(), self.path.clone()), label)]
    }
}
