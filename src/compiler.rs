//! # Compiler Module
//!
//! The boundary to the GLSL compiler. [`CompileBackend`] is what the rest of the crate talks to;
//! [`ShadercBackend`] implements it with [`shaderc`], targeting Vulkan SPIR-V with the compiler's
//! default resource limits.

use shaderc::{CompileOptions, Compiler, EnvVersion, TargetEnv};

use crate::{
    config::ShaderConfig,
    error::ShaderError,
    stage::ShaderStage,
};

/// The binary output of one compilation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledArtifact {
    pub stage: ShaderStage,
    /// SPIR-V bytecode.
    pub bytes: Vec<u8>,
    /// Non-fatal compiler messages, if any.
    pub warnings: Option<String>,
}

/// Turns source text into a binary artifact.
pub trait CompileBackend {
    /// Compiles `source` as a `stage` shader. `name` identifies the source in messages.
    ///
    /// # Errors
    ///
    /// - [`ShaderError::Compile`] when the source is rejected.
    fn compile(
        &self,
        source: &str,
        stage: ShaderStage,
        name: &str,
    ) -> Result<CompiledArtifact, ShaderError>;
}

/// [`CompileBackend`] on top of a [`shaderc::Compiler`].
pub struct ShadercBackend {
    compiler: Compiler,
    config: ShaderConfig,
}

impl ShadercBackend {
    /// Creates a ShaderC compiler instance.
    ///
    /// # Errors
    ///
    /// - [`ShaderError::Backend`]
    pub fn new(config: ShaderConfig) -> Result<Self, ShaderError> {
        let compiler = Compiler::new()
            .map_err(|e| ShaderError::Backend(format!("Failed to initialize shader compiler: {e}")))?;

        Ok(Self { compiler, config })
    }

    pub fn config(&self) -> &ShaderConfig {
        &self.config
    }

    fn options(&self) -> Result<CompileOptions, ShaderError> {
        let mut options = CompileOptions::new()
            .map_err(|e| ShaderError::Backend(format!("Failed to create compile options: {e}")))?;

        // Includes are already spliced in, the compiler only sees flat GLSL.
        options.set_target_env(TargetEnv::Vulkan, EnvVersion::Vulkan1_0 as u32);
        options.set_optimization_level(self.config.optimization.into());

        if self.config.debug_info {
            options.set_generate_debug_info();
        }
        if self.config.warnings_as_errors {
            options.set_warnings_as_errors();
        }

        Ok(options)
    }
}

impl CompileBackend for ShadercBackend {
    fn compile(
        &self,
        source: &str,
        stage: ShaderStage,
        name: &str,
    ) -> Result<CompiledArtifact, ShaderError> {
        let options = self.options()?;

        let artifact = self
            .compiler
            .compile_into_spirv(
                source,
                stage.into(),
                name,
                &self.config.entry_point,
                Some(&options),
            )
            .map_err(|e| ShaderError::Compile {
                path: name.into(),
                message: e.to_string(),
            })?;

        let warnings = (artifact.get_num_warnings() > 0).then(|| artifact.get_warning_messages());

        Ok(CompiledArtifact {
            stage,
            bytes: artifact.as_binary_u8().to_vec(),
            warnings,
        })
    }
}
