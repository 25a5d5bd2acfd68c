//! # Diagnostics Module
//!
//! Warnings raised while processing shaders are handed to a [`Diagnostics`] sink passed in by
//! the caller. [`LogSink`] forwards them to the [`log`] facade, [`CollectingSink`] keeps them in
//! memory so they can be inspected afterwards.

use std::{cell::RefCell, fmt, path::PathBuf};

/// A recoverable condition met while resolving, classifying or compiling a shader.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
    /// A file could not be opened or decoded. Nested includes are replaced by empty text.
    UnreadableSource { path: PathBuf, reason: String },

    /// A file is already being expanded further up the include chain.
    CircularInclude { path: PathBuf },

    /// An `#include` token without a well-formed `<path>` on the same line.
    MalformedInclude { path: PathBuf, line: usize },

    /// The include chain went deeper than the configured ceiling.
    IncludeDepthExceeded { path: PathBuf, depth: usize },

    /// No shader stage is known for this extension.
    UnknownStageExtension { path: PathBuf, extension: String },

    /// The compiler rejected a source file.
    CompileFailure { path: PathBuf, message: String },

    /// The compiler succeeded but had something to say.
    CompilerWarnings { path: PathBuf, messages: String },
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnreadableSource { path, reason } => {
                write!(f, "Failed to open shader file {}: {reason}", path.display())
            }
            Self::CircularInclude { path } => {
                write!(f, "Circular include detected: {}", path.display())
            }
            Self::MalformedInclude { path, line } => {
                write!(f, "Malformed #include directive in {}:{line}", path.display())
            }
            Self::IncludeDepthExceeded { path, depth } => write!(
                f,
                "Include depth {depth} exceeded while including {}",
                path.display()
            ),
            Self::UnknownStageExtension { path, extension } => write!(
                f,
                "Unknown shader extension '{extension}' for {}, assuming vertex stage",
                path.display()
            ),
            Self::CompileFailure { path, message } => {
                write!(f, "Shader compilation failed: {}: {message}", path.display())
            }
            Self::CompilerWarnings { path, messages } => {
                write!(f, "{}: {messages}", path.display())
            }
        }
    }
}

/// Receives diagnostics as they happen.
pub trait Diagnostics {
    fn emit(&self, diagnostic: Diagnostic);
}

/// Forwards every diagnostic to `log::warn!`.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl Diagnostics for LogSink {
    fn emit(&self, diagnostic: Diagnostic) {
        log::warn!("{diagnostic}");
    }
}

/// Records diagnostics in emission order.
#[derive(Debug, Default)]
pub struct CollectingSink {
    inner: RefCell<Vec<Diagnostic>>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of everything emitted so far.
    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        self.inner.borrow().clone()
    }

    /// Removes and returns everything emitted so far.
    pub fn take(&self) -> Vec<Diagnostic> {
        self.inner.take()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.borrow().is_empty()
    }
}

impl Diagnostics for CollectingSink {
    fn emit(&self, diagnostic: Diagnostic) {
        self.inner.borrow_mut().push(diagnostic);
    }
}
