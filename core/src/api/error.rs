//! Public error types for the Cinder back end.
//!
//! Stage functions return [`CompileError`](crate::error::CompileError); the
//! driver converts those into [`Error`] at the API boundary, attaching the
//! name of the method that failed.

use crate::String;
use crate::Vec;
use crate::syntax::Span;

#[cfg(feature = "std")]
use std::fmt;

#[cfg(not(feature = "std"))]
use core::fmt;

/// Public error type for all driver operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Invalid API usage (e.g., a method id the symbol table never issued).
    Api(String),

    /// An internal invariant failed while compiling `method`. The method was
    /// abandoned and its symbol and token additions rolled back.
    Internal { method: String, diagnostic: Diagnostic },

    /// The module image could not be serialized.
    Encoding(String),
}

impl Error {
    /// Name of the method that failed, if the error is tied to one.
    pub fn method(&self) -> Option<&str> {
        match self {
            Error::Internal { method, .. } => Some(method),
            _ => None,
        }
    }

    pub fn diagnostic(&self) -> Option<&Diagnostic> {
        match self {
            Error::Internal { diagnostic, .. } => Some(diagnostic),
            _ => None,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Api(msg) => write!(f, "API error: {}", msg),
            Error::Internal { method, diagnostic } => {
                write!(f, "internal compiler error in `{}`: {}", method, diagnostic.message)
            }
            Error::Encoding(msg) => write!(f, "encoding failed: {}", msg),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Error {}

impl From<postcard::Error> for Error {
    fn from(err: postcard::Error) -> Self {
        Error::Encoding(crate::format!("{}", err))
    }
}

/// A diagnostic message with source location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    /// Severity level (error, warning, info).
    pub severity: Severity,

    /// Primary diagnostic message.
    pub message: String,

    /// Source location of the offending node; empty when the failure is not
    /// tied to one.
    pub span: Span,

    /// Related locations that provide additional context.
    pub related: Vec<RelatedInfo>,

    /// Help messages suggesting how to fix the issue.
    pub help: Vec<String>,

    /// Optional error code (e.g., "C0001") for documentation lookup.
    pub code: Option<String>,
}

/// Severity level for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Error - compilation cannot succeed.
    Error,
    /// Warning - suspicious input that was still compiled.
    Warning,
    /// Info - informational message.
    Info,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
            Severity::Info => write!(f, "info"),
        }
    }
}

/// Related information for a diagnostic (e.g., "resumed here").
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelatedInfo {
    /// Source location of the related information.
    pub span: Span,

    /// Message explaining the relevance.
    pub message: String,
}
