//! # Stage Module
//!
//! Maps shader file names to pipeline stages. Both `main.vert` and the `main.vert.glsl` naming
//! convention are understood; matching is case-sensitive.

use std::{fmt, path::Path};

use shaderc::ShaderKind;

use crate::diagnostics::{Diagnostic, Diagnostics};

/// The pipeline phase a shader targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    Vertex,
    Fragment,
    Geometry,
    Compute,
    TessControl,
    TessEval,
}

impl ShaderStage {
    /// Every stage, in extension table order.
    pub const ALL: [ShaderStage; 6] = [
        ShaderStage::Vertex,
        ShaderStage::Fragment,
        ShaderStage::Geometry,
        ShaderStage::Compute,
        ShaderStage::TessControl,
        ShaderStage::TessEval,
    ];

    /// The file extension for this stage, without the leading dot.
    pub fn extension(self) -> &'static str {
        match self {
            ShaderStage::Vertex => "vert",
            ShaderStage::Fragment => "frag",
            ShaderStage::Geometry => "geom",
            ShaderStage::Compute => "comp",
            ShaderStage::TessControl => "tesc",
            ShaderStage::TessEval => "tese",
        }
    }

    /// Looks up a stage from an extension without the leading dot.
    pub fn from_extension(extension: &str) -> Option<ShaderStage> {
        ShaderStage::ALL
            .into_iter()
            .find(|stage| stage.extension() == extension)
    }

    /// Looks up the stage of a shader file. `None` means the extension is not recognised.
    pub fn from_path(path: impl AsRef<Path>) -> Option<ShaderStage> {
        let path = path.as_ref();
        let extension = path.extension()?.to_str()?;

        if extension == "glsl" {
            // `name.frag.glsl`
            let stem = Path::new(path.file_stem()?);
            return ShaderStage::from_extension(stem.extension()?.to_str()?);
        }

        ShaderStage::from_extension(extension)
    }
}

impl fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl From<ShaderStage> for ShaderKind {
    fn from(stage: ShaderStage) -> ShaderKind {
        match stage {
            ShaderStage::Vertex => ShaderKind::Vertex,
            ShaderStage::Fragment => ShaderKind::Fragment,
            ShaderStage::Geometry => ShaderKind::Geometry,
            ShaderStage::Compute => ShaderKind::Compute,
            ShaderStage::TessControl => ShaderKind::TessControl,
            ShaderStage::TessEval => ShaderKind::TessEvaluation,
        }
    }
}

/// Picks the stage for `path`, falling back to [`ShaderStage::Vertex`] with a
/// [`Diagnostic::UnknownStageExtension`] when the extension is unknown. Callers that would rather
/// reject such files should use [`ShaderStage::from_path`].
///
/// Besides the plain `.vert`/`.frag`/... table, the `name.<stage>.glsl` convention is accepted,
/// so `sky.frag.glsl` is a fragment shader rather than an unknown extension defaulting to vertex.
/// Any other `.glsl` file still falls back to vertex with a diagnostic.
pub fn classify(path: impl AsRef<Path>, diagnostics: &dyn Diagnostics) -> ShaderStage {
    let path = path.as_ref();

    ShaderStage::from_path(path).unwrap_or_else(|| {
        let extension = path
            .extension()
            .map(|ext| format!(".{}", ext.to_string_lossy()))
            .unwrap_or_default();

        diagnostics.emit(Diagnostic::UnknownStageExtension {
            path: path.to_path_buf(),
            extension,
        });

        ShaderStage::Vertex
    })
}
