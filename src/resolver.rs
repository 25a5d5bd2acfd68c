//! # Resolver Module
//!
//! Expands `#include <path>` directives in GLSL sources. Include paths are relative to the
//! directory of the file that contains the directive, so nesting works level by level. Every
//! top-level [`Resolver::resolve`] call tracks its own include chain; nothing is shared between
//! calls.

use std::{
    collections::HashSet,
    fs,
    path::{Path, PathBuf},
};

use crate::{
    config::{IncludeConfig, MalformedIncludePolicy},
    diagnostics::{Diagnostic, Diagnostics},
    error::ShaderError,
};

const DIRECTIVE: &str = "#include";
const UTF8_BOM: [u8; 3] = [0xEF, 0xBB, 0xBF];

/// The fully spliced text of one top-level shader file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpandedSource {
    /// The file the expansion started from.
    pub path: PathBuf,
    /// Source text with every include directive replaced.
    pub text: String,
    /// Files spliced in, in the order they were first included. Includes that could not be
    /// read are left out.
    pub includes: Vec<PathBuf>,
}

impl ExpandedSource {
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

/// Canonical paths of the files currently being expanded along the active include chain.
#[derive(Debug, Default)]
struct IncludeGuard {
    active: HashSet<PathBuf>,
    seen: Vec<PathBuf>,
}

impl IncludeGuard {
    /// Returns `false` if `key` is already on the chain.
    fn enter(&mut self, key: &Path) -> bool {
        self.active.insert(key.to_path_buf())
    }

    /// Adds `key` to the include list, returns `false` if it was already there.
    fn record(&mut self, key: &Path) -> bool {
        if self.seen.iter().any(|seen| seen == key) {
            return false;
        }
        self.seen.push(key.to_path_buf());
        true
    }

    fn forget(&mut self, key: &Path) {
        self.seen.retain(|seen| seen != key);
    }

    fn leave(&mut self, key: &Path) {
        self.active.remove(key);
    }
}

/// Expands include directives, reporting recoverable problems to a [`Diagnostics`] sink.
pub struct Resolver<'d> {
    config: IncludeConfig,
    diagnostics: &'d dyn Diagnostics,
}

impl<'d> Resolver<'d> {
    pub fn new(config: IncludeConfig, diagnostics: &'d dyn Diagnostics) -> Self {
        Self {
            config,
            diagnostics,
        }
    }

    pub fn diagnostics(&self) -> &'d dyn Diagnostics {
        self.diagnostics
    }

    /// Reads `path` and splices in everything it includes.
    ///
    /// Nested files that cannot be read, circular includes and includes past the depth ceiling
    /// are replaced with empty text and reported as diagnostics.
    ///
    /// # Errors
    ///
    /// - [`ShaderError::UnreadableSource`] if `path` itself cannot be read.
    /// - [`ShaderError::InvalidEncoding`] if `path` itself is not UTF-8.
    pub fn resolve(&self, path: impl AsRef<Path>) -> Result<ExpandedSource, ShaderError> {
        let path = path.as_ref();
        let mut guard = IncludeGuard::default();

        let key = canonical_key(path);
        guard.enter(&key);

        let text = self.expand(path, &mut guard, 0).inspect_err(|err| {
            self.diagnostics.emit(Diagnostic::UnreadableSource {
                path: path.to_path_buf(),
                reason: err.to_string(),
            });
        })?;

        Ok(ExpandedSource {
            path: path.to_path_buf(),
            text,
            includes: guard.seen,
        })
    }

    fn expand(
        &self,
        path: &Path,
        guard: &mut IncludeGuard,
        depth: usize,
    ) -> Result<String, ShaderError> {
        let code = read_source(path)?;

        let mut out = String::with_capacity(code.len());
        let mut cursor = 0;

        while let Some(found) = code[cursor..].find(DIRECTIVE) {
            let start = cursor + found;
            let after = start + DIRECTIVE.len();

            match parse_target(&code[after..]) {
                Some((target, consumed)) => {
                    out.push_str(&code[cursor..start]);
                    out.push_str(&self.include(path, target, guard, depth));
                    cursor = after + consumed;
                }
                None => {
                    self.diagnostics.emit(Diagnostic::MalformedInclude {
                        path: path.to_path_buf(),
                        line: line_of(&code, start),
                    });

                    out.push_str(&code[cursor..after]);
                    cursor = after;

                    if self.config.malformed == MalformedIncludePolicy::StopScanning {
                        break;
                    }
                }
            }
        }

        out.push_str(&code[cursor..]);
        Ok(out)
    }

    /// Expands one include, always yielding text to splice in.
    fn include(
        &self,
        parent: &Path,
        target: &str,
        guard: &mut IncludeGuard,
        depth: usize,
    ) -> String {
        let dir = parent.parent().unwrap_or_else(|| Path::new(""));
        let include_path = dir.join(target);

        let depth = depth + 1;
        if depth > self.config.max_depth {
            self.diagnostics.emit(Diagnostic::IncludeDepthExceeded {
                path: include_path,
                depth,
            });
            return String::new();
        }

        let key = canonical_key(&include_path);
        if !guard.enter(&key) {
            self.diagnostics
                .emit(Diagnostic::CircularInclude { path: include_path });
            return String::new();
        }

        // Recorded before expanding to keep include order.
        let recorded = guard.record(&key);
        let text = match self.expand(&include_path, guard, depth) {
            Ok(text) => text,
            Err(err) => {
                if recorded {
                    guard.forget(&key);
                }
                self.diagnostics.emit(Diagnostic::UnreadableSource {
                    path: include_path,
                    reason: err.to_string(),
                });
                String::new()
            }
        };

        guard.leave(&key);
        text
    }
}

/// Reads a file as text, dropping a leading UTF-8 byte-order marker.
fn read_source(path: &Path) -> Result<String, ShaderError> {
    let mut bytes = fs::read(path).map_err(|source| ShaderError::UnreadableSource {
        path: path.to_path_buf(),
        source,
    })?;

    if bytes.starts_with(&UTF8_BOM) {
        bytes.drain(..UTF8_BOM.len());
    }

    String::from_utf8(bytes).map_err(|_| ShaderError::InvalidEncoding {
        path: path.to_path_buf(),
    })
}

/// Parses ` <path>` right after an `#include` token. Returns the path and the number of bytes
/// up to and including the closing bracket.
fn parse_target(rest: &str) -> Option<(&str, usize)> {
    let trimmed = rest.trim_start_matches([' ', '\t']);
    let skipped = rest.len() - trimmed.len();

    let inner = trimmed.strip_prefix('<')?;
    let line = inner.split(['\n', '\r']).next().unwrap_or(inner);
    let end = line.find('>')?;

    let target = line[..end].trim();
    if target.is_empty() {
        return None;
    }

    // leading whitespace + '<' + path + '>'
    Some((target, skipped + 1 + end + 1))
}

fn line_of(code: &str, offset: usize) -> usize {
    code[..offset].matches('\n').count() + 1
}

/// The include guard key: canonical when the file exists, absolute otherwise.
fn canonical_key(path: &Path) -> PathBuf {
    fs::canonicalize(path)
        .or_else(|_| std::path::absolute(path))
        .unwrap_or_else(|_| path.to_path_buf())
}
