// ABOUTME: Error types for preprocessing failures, each carrying a source span

use crate::diagnostics::Span;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PreprocessError {
    /// Integer literal outside the evaluator's signed 32-bit range
    #[error("Number '{literal}' not in [-2147483648, 2147483648)")]
    NumericOutOfRange { literal: String, span: Span },

    /// `N` arguments passed to a macro whose arity does not admit `N`
    #[error("Macro `{name}` expected {expected} argument{}, received {actual}", if *.expected == "1" { "" } else { "s" })]
    BadMacroArity {
        name: String,
        expected: String, // "2", "2-3", "at least 1"
        actual: usize,
        span: Span,
    },

    /// `include!` used while no origin file is on the context stack
    #[error("include! needs an origin file to resolve against")]
    ImportWithoutFile { span: Span },

    /// Import argument was not a double-quoted string literal
    #[error("import path must be a double-quoted string, received `{received}`")]
    ImportPathMalformed { received: String, span: Span },

    /// Imported file missing or unreadable
    #[error("cannot read '{}': {source}", .path.display())]
    IoFailure {
        path: PathBuf,
        span: Span,
        source: std::io::Error,
    },

    /// Range shorthand with an elided stop whose start is not an integer
    #[error("range start '{literal}' does not canonicalize to an integer")]
    RangeBoundNotNumeric { literal: String, span: Span },
}

impl PreprocessError {
    /// Stable error code shown in the diagnostic header.
    pub fn code(&self) -> &'static str {
        match self {
            PreprocessError::NumericOutOfRange { .. } => "E001",
            PreprocessError::BadMacroArity { .. } => "E002",
            PreprocessError::ImportWithoutFile { .. } => "E003",
            PreprocessError::ImportPathMalformed { .. } => "E004",
            PreprocessError::IoFailure { .. } => "E005",
            PreprocessError::RangeBoundNotNumeric { .. } => "E006",
        }
    }

    /// Byte range in the current source buffer this error points at.
    pub fn span(&self) -> Span {
        match self {
            PreprocessError::NumericOutOfRange { span, .. }
            | PreprocessError::BadMacroArity { span, .. }
            | PreprocessError::ImportWithoutFile { span, .. }
            | PreprocessError::ImportPathMalformed { span, .. }
            | PreprocessError::IoFailure { span, .. }
            | PreprocessError::RangeBoundNotNumeric { span, .. } => *span,
        }
    }

    /// One-line expected/received hint rendered under the underline.
    pub fn hint(&self) -> Option<String> {
        match self {
            PreprocessError::BadMacroArity {
                expected, actual, ..
            } => Some(format!(
                "expected {} arguments, received {}",
                expected, actual
            )),
            _ => None,
        }
    }

    /// Optional `help:` trailer.
    pub fn help(&self) -> Option<&'static str> {
        match self {
            PreprocessError::ImportWithoutFile { .. } => {
                Some("run from a file, or import from the standard library with use!")
            }
            PreprocessError::ImportPathMalformed { .. } => {
                Some("surround the filename with ASCII double quotes")
            }
            _ => None,
        }
    }
}
