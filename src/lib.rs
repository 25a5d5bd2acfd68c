//! # Vulkan-RS Shader Tools
//!
//! GLSL preprocessing and compilation for the Vulkan-RS samples. Shader sources may pull in other
//! files with `#include <path>`; the [`resolver`] expands those directives, the [`stage`] module
//! picks the pipeline stage from the file name, and the result is either compiled to SPIR-V on
//! disk through the [`cache`] or handed to a live device through [`module::load`].
//!
//! Problems that do not stop a request, like a circular include, are reported to a
//! [`Diagnostics`] sink chosen by the caller rather than to a global logger.
//!
//! ```no_run
//! use vulkanrs_shader::{ArtifactCache, LogSink, Resolver, ShaderConfig, ShadercBackend};
//!
//! let config = ShaderConfig::from_env()?;
//! let resolver = Resolver::new(config.include.clone(), &LogSink);
//! let cache = ArtifactCache::new(resolver, ShadercBackend::new(config)?);
//!
//! cache.compile("shaders/00-Triangle/main.vert", "cache/o.vert.bin")?;
//! # Ok::<(), vulkanrs_shader::ShaderError>(())
//! ```

pub mod cache;
pub mod compiler;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod module;
pub mod resolver;
pub mod stage;

pub use cache::ArtifactCache;
pub use compiler::{CompileBackend, CompiledArtifact, ShadercBackend};
pub use config::{IncludeConfig, MalformedIncludePolicy, Optimization, ShaderConfig};
pub use diagnostics::{CollectingSink, Diagnostic, Diagnostics, LogSink};
pub use error::ShaderError;
pub use module::{ModuleDesc, ModuleFactory, VulkanModuleFactory, load};
pub use resolver::{ExpandedSource, Resolver};
pub use stage::{ShaderStage, classify};
