//! # Cache Module
//!
//! Compiles shader files and writes the SPIR-V next to wherever the caller wants it. There is
//! no staleness check: every call recompiles and overwrites the destination. Nothing is written
//! unless the compiler succeeded with a non-empty artifact.

use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::{
    compiler::{CompileBackend, CompiledArtifact},
    diagnostics::Diagnostic,
    error::ShaderError,
    resolver::Resolver,
    stage::{self, ShaderStage},
};

/// Extension of written artifacts.
pub const ARTIFACT_EXTENSION: &str = "spv";

/// Resolves, compiles and persists shaders.
pub struct ArtifactCache<'d, B> {
    resolver: Resolver<'d>,
    backend: B,
}

impl<'d, B: CompileBackend> ArtifactCache<'d, B> {
    pub fn new(resolver: Resolver<'d>, backend: B) -> Self {
        Self { resolver, backend }
    }

    pub fn resolver(&self) -> &Resolver<'d> {
        &self.resolver
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Compiles `source` and writes the bytecode to `dest`, replacing any existing file.
    ///
    /// # Errors
    ///
    /// - [`ShaderError::UnreadableSource`] / [`ShaderError::InvalidEncoding`] from the resolver.
    /// - [`ShaderError::EmptySource`] if the source expands to nothing.
    /// - [`ShaderError::Compile`] / [`ShaderError::EmptyArtifact`] when compilation fails.
    /// - [`ShaderError::WriteArtifact`] if `dest` cannot be written.
    pub fn compile(
        &self,
        source: impl AsRef<Path>,
        dest: impl AsRef<Path>,
    ) -> Result<CompiledArtifact, ShaderError> {
        let (source, dest) = (source.as_ref(), dest.as_ref());
        let diagnostics = self.resolver.diagnostics();

        let expanded = self.resolver.resolve(source)?;
        if expanded.is_empty() {
            return Err(ShaderError::EmptySource {
                path: source.to_path_buf(),
            });
        }

        let stage = stage::classify(source, diagnostics);
        let name = source.to_string_lossy();

        let artifact = match self.backend.compile(&expanded.text, stage, &name) {
            Ok(artifact) if artifact.bytes.is_empty() => {
                diagnostics.emit(Diagnostic::CompileFailure {
                    path: source.to_path_buf(),
                    message: String::from("empty artifact"),
                });
                return Err(ShaderError::EmptyArtifact {
                    path: source.to_path_buf(),
                });
            }
            Ok(artifact) => artifact,
            Err(err) => {
                diagnostics.emit(Diagnostic::CompileFailure {
                    path: source.to_path_buf(),
                    message: err.to_string(),
                });
                return Err(err);
            }
        };

        if let Some(messages) = &artifact.warnings {
            diagnostics.emit(Diagnostic::CompilerWarnings {
                path: source.to_path_buf(),
                messages: messages.clone(),
            });
        }

        write_artifact(dest, &artifact.bytes)?;
        log::info!(
            "Compiled {} ({stage}) -> {} ({} bytes)",
            source.display(),
            dest.display(),
            artifact.bytes.len()
        );

        Ok(artifact)
    }

    /// Compiles every shader under `src_dir` whose stage is recognised into `out_dir`, in path
    /// order. Subdirectories are walked and mirrored under `out_dir`. Other files, such as shared
    /// `.glsl` headers, are left alone.
    ///
    /// # Errors
    ///
    /// Stops at the first failure, see [`ArtifactCache::compile`]. A directory that cannot be
    /// listed is reported as [`ShaderError::UnreadableSource`].
    pub fn compile_dir(
        &self,
        src_dir: impl AsRef<Path>,
        out_dir: impl AsRef<Path>,
    ) -> Result<Vec<(PathBuf, CompiledArtifact)>, ShaderError> {
        let (src_dir, out_dir) = (src_dir.as_ref(), out_dir.as_ref());

        let mut sources = Vec::new();
        collect_sources(src_dir, &mut sources)?;
        sources.sort();

        if sources.is_empty() {
            log::warn!("No shader sources found under {}", src_dir.display());
        }

        let mut compiled = Vec::with_capacity(sources.len());
        for source in sources {
            let relative = source
                .parent()
                .and_then(|parent| parent.strip_prefix(src_dir).ok())
                .unwrap_or_else(|| Path::new(""));
            let dest = out_dir.join(relative).join(artifact_name(&source));

            let artifact = self.compile(&source, &dest)?;
            compiled.push((dest, artifact));
        }

        Ok(compiled)
    }
}

/// Gathers every file under `dir` with a recognised stage.
fn collect_sources(dir: &Path, sources: &mut Vec<PathBuf>) -> Result<(), ShaderError> {
    let unreadable = |source| ShaderError::UnreadableSource {
        path: dir.to_path_buf(),
        source,
    };

    for entry in fs::read_dir(dir).map_err(unreadable)? {
        let path = entry.map_err(unreadable)?.path();
        if path.is_dir() {
            collect_sources(&path, sources)?;
        } else if path.is_file() && ShaderStage::from_path(&path).is_some() {
            sources.push(path);
        }
    }

    Ok(())
}

/// `main.vert` and `main.vert.glsl` both become `main.vert.spv`.
pub fn artifact_name(source: &Path) -> String {
    let file_name = source
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    let base = file_name.strip_suffix(".glsl").unwrap_or(&file_name);

    format!("{base}.{ARTIFACT_EXTENSION}")
}

/// Writes `bytes` verbatim, creating missing parent directories.
fn write_artifact(dest: &Path, bytes: &[u8]) -> Result<(), ShaderError> {
    let write_error = |source| ShaderError::WriteArtifact {
        path: dest.to_path_buf(),
        source,
    };

    if let Some(parent) = dest.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(write_error)?;
    }

    fs::write(dest, bytes).map_err(write_error)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        compiler::{ShadercBackend, fake::FakeBackend},
        config::{IncludeConfig, ShaderConfig},
        diagnostics::CollectingSink,
        testing::TempDir,
    };

    const SPIRV: &[u8] = &[0x03, 0x02, 0x23, 0x07, 0x00, 0x00, 0x01, 0x00];
    const SPIRV_MAGIC: [u8; 4] = [0x03, 0x02, 0x23, 0x07];

    fn cache<'d>(sink: &'d CollectingSink, backend: FakeBackend) -> ArtifactCache<'d, FakeBackend> {
        ArtifactCache::new(Resolver::new(IncludeConfig::default(), sink), backend)
    }

    #[test]
    fn writes_the_blob_verbatim() {
        let dir = TempDir::new("cache_verbatim");
        let source = dir.write("main.vert", "#version 450\nvoid main() {}\n");
        let dest = dir.path().join("cache/o.vert.bin");
        let sink = CollectingSink::new();

        let cache = cache(&sink, FakeBackend::returning(SPIRV));
        let artifact = cache.compile(&source, &dest).unwrap();

        assert_eq!(artifact.stage, ShaderStage::Vertex);
        assert_eq!(fs::read(&dest).unwrap(), SPIRV);
        assert!(sink.is_empty());

        let calls = cache.backend().calls.borrow();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, "#version 450\nvoid main() {}\n");
        assert_eq!(calls[0].1, ShaderStage::Vertex);
    }

    #[test]
    fn compiler_sees_expanded_source_and_stage() {
        let dir = TempDir::new("cache_expanded");
        dir.write("light.glsl", "vec3 light;");
        let source = dir.write("main.frag", "#include <light.glsl>\nvoid main() {}");
        let sink = CollectingSink::new();

        let cache = cache(&sink, FakeBackend::returning(SPIRV));
        cache.compile(&source, dir.path().join("main.frag.spv")).unwrap();

        let calls = cache.backend().calls.borrow();
        assert_eq!(calls[0].0, "vec3 light;\nvoid main() {}");
        assert_eq!(calls[0].1, ShaderStage::Fragment);
    }

    #[test]
    fn overwrites_existing_artifact() {
        let dir = TempDir::new("cache_overwrite");
        let source = dir.write("main.comp", "void main() {}");
        let dest = dir.write("main.comp.spv", "stale contents that are longer than the blob");
        let sink = CollectingSink::new();

        cache(&sink, FakeBackend::returning(SPIRV))
            .compile(&source, &dest)
            .unwrap();
        assert_eq!(fs::read(&dest).unwrap(), SPIRV);
    }

    #[test]
    fn failed_compile_leaves_destination_untouched() {
        let dir = TempDir::new("cache_failure");
        let source = dir.write("main.vert", "FAIL");
        let dest = dir.write("main.vert.spv", "previous");
        let sink = CollectingSink::new();

        let err = cache(&sink, FakeBackend::returning(SPIRV))
            .compile(&source, &dest)
            .unwrap_err();

        assert!(matches!(err, ShaderError::Compile { .. }));
        assert_eq!(fs::read_to_string(&dest).unwrap(), "previous");
        assert!(matches!(
            sink.take().as_slice(),
            [Diagnostic::CompileFailure { .. }]
        ));
    }

    #[test]
    fn empty_artifact_is_a_failure() {
        let dir = TempDir::new("cache_empty_artifact");
        let source = dir.write("main.vert", "void main() {}");
        let dest = dir.path().join("main.vert.spv");
        let sink = CollectingSink::new();

        let err = cache(&sink, FakeBackend::returning(&[]))
            .compile(&source, &dest)
            .unwrap_err();

        assert!(matches!(err, ShaderError::EmptyArtifact { .. }));
        assert!(!dest.exists());
    }

    #[test]
    fn missing_and_empty_sources_are_told_apart() {
        let dir = TempDir::new("cache_missing");
        let empty = dir.write("empty.vert", "");
        let dest = dir.path().join("out.spv");
        let sink = CollectingSink::new();
        let cache = cache(&sink, FakeBackend::returning(SPIRV));

        let err = cache.compile(dir.path().join("gone.vert"), &dest).unwrap_err();
        assert!(matches!(err, ShaderError::UnreadableSource { .. }));

        let err = cache.compile(&empty, &dest).unwrap_err();
        assert!(matches!(err, ShaderError::EmptySource { .. }));

        assert!(cache.backend().calls.borrow().is_empty());
        assert!(!dest.exists());
    }

    #[test]
    fn unknown_extension_compiles_as_vertex_with_warning() {
        let dir = TempDir::new("cache_unknown_ext");
        let source = dir.write("shader.weird", "void main() {}");
        let sink = CollectingSink::new();

        let artifact = cache(&sink, FakeBackend::returning(SPIRV))
            .compile(&source, dir.path().join("shader.spv"))
            .unwrap();

        assert_eq!(artifact.stage, ShaderStage::Vertex);
        assert!(matches!(
            sink.take().as_slice(),
            [Diagnostic::UnknownStageExtension { .. }]
        ));
    }

    #[test]
    fn compiler_warnings_are_reported() {
        let dir = TempDir::new("cache_warnings");
        let source = dir.write("main.vert", "void main() {}");
        let sink = CollectingSink::new();
        let backend = FakeBackend {
            warnings: Some(String::from("unused variable")),
            ..FakeBackend::returning(SPIRV)
        };

        cache(&sink, backend)
            .compile(&source, dir.path().join("main.vert.spv"))
            .unwrap();

        assert!(matches!(
            sink.take().as_slice(),
            [Diagnostic::CompilerWarnings { .. }]
        ));
    }

    #[test]
    fn compiles_a_directory() {
        let dir = TempDir::new("cache_dir");
        dir.mkdir("shaders");
        dir.write("shaders/common.glsl", "float shared;");
        dir.write("shaders/main.vert", "#include <common.glsl>");
        dir.write("shaders/sky.frag.glsl", "void main() {}");
        dir.write("shaders/notes.txt", "not a shader");
        let out = dir.path().join("out");
        let sink = CollectingSink::new();

        let cache = cache(&sink, FakeBackend::returning(SPIRV));
        let compiled = cache.compile_dir(dir.path().join("shaders"), &out).unwrap();

        let names: Vec<_> = compiled
            .iter()
            .map(|(dest, _)| dest.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, ["main.vert.spv", "sky.frag.spv"]);
        assert_eq!(compiled[1].1.stage, ShaderStage::Fragment);
        assert_eq!(fs::read(out.join("main.vert.spv")).unwrap(), SPIRV);
        assert!(!out.join("common.glsl.spv").exists());
    }

    #[test]
    fn compiles_nested_directories_into_a_mirrored_tree() {
        let dir = TempDir::new("cache_dir_nested");
        dir.mkdir("shaders/00-Triangle/common");
        dir.mkdir("shaders/01-Model");
        dir.write("shaders/00-Triangle/common/input.glsl", "vec2 pos;");
        dir.write("shaders/00-Triangle/main.vert", "#include <common/input.glsl>");
        dir.write("shaders/00-Triangle/main.frag", "void main() {}");
        dir.write("shaders/01-Model/main.vert", "void main() {}");
        let out = dir.path().join("out");
        let sink = CollectingSink::new();

        let cache = cache(&sink, FakeBackend::returning(SPIRV));
        let compiled = cache.compile_dir(dir.path().join("shaders"), &out).unwrap();

        let dests: Vec<_> = compiled.iter().map(|(dest, _)| dest.clone()).collect();
        assert_eq!(
            dests,
            [
                out.join("00-Triangle/main.frag.spv"),
                out.join("00-Triangle/main.vert.spv"),
                out.join("01-Model/main.vert.spv"),
            ]
        );
        for dest in &dests {
            assert_eq!(fs::read(dest).unwrap(), SPIRV);
        }
        assert!(!out.join("00-Triangle/common").exists());
        assert_eq!(cache.backend().calls.borrow()[1].0, "vec2 pos;");
    }

    #[test]
    fn empty_directory_compiles_nothing() {
        let dir = TempDir::new("cache_dir_empty");
        dir.mkdir("shaders");
        let sink = CollectingSink::new();

        let compiled = cache(&sink, FakeBackend::returning(SPIRV))
            .compile_dir(dir.path().join("shaders"), dir.path().join("out"))
            .unwrap();
        assert!(compiled.is_empty());
    }

    /// Runs the shipped triangle shaders through the real compiler.
    #[test]
    fn shaderc_compiles_the_triangle_shaders() {
        let shaders = Path::new(env!("CARGO_MANIFEST_DIR")).join("shaders/00-Triangle");
        let dir = TempDir::new("cache_shaderc");
        let sink = CollectingSink::new();

        let backend = ShadercBackend::new(ShaderConfig::default()).unwrap();
        let cache = ArtifactCache::new(Resolver::new(IncludeConfig::default(), &sink), backend);

        for (name, stage) in [("main.vert", ShaderStage::Vertex), ("main.frag", ShaderStage::Fragment)] {
            let dest = dir.path().join(artifact_name(Path::new(name)));
            let artifact = cache.compile(shaders.join(name), &dest).unwrap();

            assert_eq!(artifact.stage, stage);
            assert!(artifact.bytes.starts_with(&SPIRV_MAGIC));
            assert_eq!(artifact.bytes.len() % 4, 0);
            assert_eq!(fs::read(&dest).unwrap(), artifact.bytes);
        }

        assert!(sink.is_empty(), "{:?}", sink.diagnostics());
    }

    #[test]
    fn shaderc_rejects_invalid_glsl_without_writing() {
        let dir = TempDir::new("cache_shaderc_invalid");
        let source = dir.write("broken.frag", "#version 450\nvoid main() { undeclared = 1.0; }\n");
        let dest = dir.write("broken.frag.spv", "previous");
        let sink = CollectingSink::new();

        let backend = ShadercBackend::new(ShaderConfig::default()).unwrap();
        let cache = ArtifactCache::new(Resolver::new(IncludeConfig::default(), &sink), backend);

        let err = cache.compile(&source, &dest).unwrap_err();
        assert!(matches!(err, ShaderError::Compile { .. }));
        assert_eq!(fs::read_to_string(&dest).unwrap(), "previous");
    }

    #[test]
    fn artifact_names() {
        assert_eq!(artifact_name(Path::new("a/main.vert")), "main.vert.spv");
        assert_eq!(artifact_name(Path::new("a/main.vert.glsl")), "main.vert.spv");
    }
}
