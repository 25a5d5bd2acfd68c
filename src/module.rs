//! # Module Module
//!
//! Loads shader files straight into a live graphics context without touching the on-disk
//! artifact cache. The context is anything implementing [`ModuleFactory`];
//! [`VulkanModuleFactory`] creates [`vk::ShaderModule`]s on a [`vulkanalia`] device.

use std::path::Path;

use vulkanalia::{bytecode::Bytecode, prelude::v1_0::*};

use crate::{
    compiler::{CompileBackend, ShadercBackend},
    error::ShaderError,
    resolver::Resolver,
    stage::{self, ShaderStage},
};

/// What a graphics context needs to build a shader module.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModuleDesc<'a> {
    /// Fully expanded GLSL.
    pub source: &'a str,
    pub stage: ShaderStage,
    /// Debug name for the module.
    pub label: &'a str,
}

/// A graphics context able to turn GLSL into shader modules.
pub trait ModuleFactory {
    type Handle;

    /// # Errors
    ///
    /// - [`ShaderError::Module`] or [`ShaderError::Compile`] when the context refuses.
    fn create_module(&self, desc: &ModuleDesc<'_>) -> Result<Self::Handle, ShaderError>;
}

/// Resolves and classifies `path`, then hands the source to `factory`.
///
/// # Errors
///
/// - [`ShaderError::UnreadableSource`] / [`ShaderError::InvalidEncoding`] from the resolver.
/// - [`ShaderError::EmptySource`] if the source expands to nothing.
/// - Whatever `factory` reports.
pub fn load<F: ModuleFactory>(
    factory: &F,
    resolver: &Resolver<'_>,
    path: impl AsRef<Path>,
) -> Result<F::Handle, ShaderError> {
    let path = path.as_ref();

    let expanded = resolver.resolve(path)?;
    let stage = stage::classify(path, resolver.diagnostics());

    if expanded.is_empty() {
        return Err(ShaderError::EmptySource {
            path: path.to_path_buf(),
        });
    }

    let label = format!("Shader module : {}", path.display());
    let handle = factory.create_module(&ModuleDesc {
        source: &expanded.text,
        stage,
        label: &label,
    })?;

    log::info!("Loaded {label}");
    Ok(handle)
}

/// A [`vk::ShaderModule`] that is destroyed when dropped.
pub struct OwnedShaderModule<'a> {
    device: &'a Device,
    module: vk::ShaderModule,
    stage: ShaderStage,
}

impl OwnedShaderModule<'_> {
    pub fn handle(&self) -> vk::ShaderModule {
        self.module
    }

    pub fn stage(&self) -> ShaderStage {
        self.stage
    }
}

impl Drop for OwnedShaderModule<'_> {
    fn drop(&mut self) {
        unsafe { self.device.destroy_shader_module(self.module, None) };
    }
}

/// Compiles with [`ShadercBackend`] and creates the module on a Vulkan device.
pub struct VulkanModuleFactory<'a> {
    device: &'a Device,
    backend: ShadercBackend,
}

impl<'a> VulkanModuleFactory<'a> {
    pub fn new(device: &'a Device, backend: ShadercBackend) -> Self {
        Self { device, backend }
    }
}

impl<'a> ModuleFactory for VulkanModuleFactory<'a> {
    type Handle = OwnedShaderModule<'a>;

    fn create_module(&self, desc: &ModuleDesc<'_>) -> Result<Self::Handle, ShaderError> {
        let artifact = self.backend.compile(desc.source, desc.stage, desc.label)?;
        let module_error = |message: String| ShaderError::Module {
            label: desc.label.to_string(),
            message,
        };

        // SPIR-V has to be handed over as aligned words.
        let bytecode = Bytecode::new(&artifact.bytes).map_err(|e| module_error(format!("{e:?}")))?;

        let info = vk::ShaderModuleCreateInfo::builder()
            .code_size(bytecode.code_size())
            .code(bytecode.code());

        let module = unsafe { self.device.create_shader_module(&info, None) }
            .map_err(|e| module_error(e.to_string()))?;

        log::debug!("Created {} ({} bytes of SPIR-V)", desc.label, artifact.bytes.len());

        Ok(OwnedShaderModule {
            device: self.device,
            module,
            stage: desc.stage,
        })
    }
}
