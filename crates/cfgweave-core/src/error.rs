//! Error taxonomy for the directive-evaluation engine.

use thiserror::Error;

/// Result alias used throughout this crate.
pub type Result<T> = std::result::Result<T, Error>;

/// The closed set of failure categories a caller can match on.
///
/// Messages are informational; the variant is the stable part of the contract.
#[derive(Debug, Error)]
pub enum ErrorKind {
    #[error("syntax error: {0}")]
    Syntax(String),

    #[error("scope error: {0}")]
    Scope(String),

    #[error("path error: {0}")]
    Path(String),

    #[error("cycle detected at '{0}'")]
    Cycle(String),

    #[error("max evaluation depth ({limit}) exceeded")]
    Depth { limit: usize },

    #[error("structure error: {0}")]
    Structure(String),

    #[error("strategy error: {0}")]
    Strategy(String),

    #[error("conflict error: duplicate key '{0}'")]
    Conflict(String),

    #[error("hook error: {0}")]
    Hook(String),
}

/// A [`ErrorKind`] with a breadcrumb of directive/scope/path context accumulated
/// as the error bubbles up through nested evaluation frames.
#[derive(Debug, Error)]
#[error("{kind}{}", format_context(.context))]
pub struct Error {
    pub kind: ErrorKind,
    context: Vec<String>,
}

fn format_context(context: &[String]) -> String {
    if context.is_empty() {
        String::new()
    } else {
        format!(" (while evaluating {})", context.join(" -> "))
    }
}

impl Error {
    pub fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            context: Vec::new(),
        }
    }

    /// Attach a breadcrumb frame (e.g. `"$ref local::db.host"`) as the error propagates.
    pub fn with_context(mut self, frame: impl Into<String>) -> Self {
        self.context.push(frame.into());
        self
    }

    pub fn syntax(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::Syntax(msg.into()))
    }

    pub fn scope(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::Scope(msg.into()))
    }

    pub fn path(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::Path(msg.into()))
    }

    pub fn cycle(key: impl Into<String>) -> Self {
        Self::new(ErrorKind::Cycle(key.into()))
    }

    pub fn depth(limit: usize) -> Self {
        Self::new(ErrorKind::Depth { limit })
    }

    pub fn structure(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::Structure(msg.into()))
    }

    pub fn strategy(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::Strategy(msg.into()))
    }

    pub fn conflict(key: impl Into<String>) -> Self {
        Self::new(ErrorKind::Conflict(key.into()))
    }

    pub fn hook(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::Hook(msg.into()))
    }
}
