//! # Error Module
//!
//! Request-level failures of the shader tools. Anything the tools can recover from is reported
//! through [`crate::diagnostics`] instead and never shows up here.

use std::{io, path::PathBuf};

use thiserror::Error;

use crate::config::ConfigError;

/// Custom error types for resolving, compiling and loading shaders.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum ShaderError {
    /// The top-level shader file could not be opened or read.
    #[error("Failed to read shader source '{}': {source}", path.display())]
    UnreadableSource {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The shader file is not valid UTF-8 once the byte-order marker is removed.
    #[error("Shader source '{}' is not valid UTF-8.", path.display())]
    InvalidEncoding { path: PathBuf },

    /// The shader expanded to no text at all.
    #[error("Shader source '{}' is empty.", path.display())]
    EmptySource { path: PathBuf },

    /// The compiler rejected the expanded source.
    #[error("Shader compilation failed for '{}': {message}", path.display())]
    Compile { path: PathBuf, message: String },

    /// The compiler reported success but produced no bytes.
    #[error("Shader compilation of '{}' produced an empty artifact.", path.display())]
    EmptyArtifact { path: PathBuf },

    /// The compiled artifact could not be written to its destination.
    #[error("Failed to write artifact '{}': {source}", path.display())]
    WriteArtifact {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The compiler backend could not be set up.
    #[error("Shader compiler backend error: {0}")]
    Backend(String),

    /// The graphics context refused to create a shader module.
    #[error("Failed to create {label}: {message}")]
    Module { label: String, message: String },

    /// Invalid configuration.
    #[error(transparent)]
    Config(#[from] ConfigError),
}
