//! Per-file stylesheet compilation.
//!
//! Wraps the `grass` compiler behind a result type: one call per source
//! file, success carries the compiled CSS text, failure carries the file's
//! base name and the compiler's message.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Source stylesheet extension.
pub const SOURCE_EXT: &str = "scss";

/// Compiled stylesheet extension.
pub const OUTPUT_EXT: &str = "css";

// ============================================================================
// Output style
// ============================================================================

/// CSS output formatting style.
///
/// `nested` and `compact` are legacy formatter names kept for config
/// compatibility; they map to the nearest style the compiler still supports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputStyle {
    /// Whitespace stripped, one line (default).
    #[default]
    Compressed,
    /// One declaration per line, indented blocks.
    Expanded,
    /// Legacy alias, compiles like `expanded`.
    Nested,
    /// Legacy alias, compiles like `compressed`.
    Compact,
}

impl From<OutputStyle> for grass::OutputStyle {
    fn from(style: OutputStyle) -> Self {
        match style {
            OutputStyle::Expanded | OutputStyle::Nested => grass::OutputStyle::Expanded,
            OutputStyle::Compressed | OutputStyle::Compact => grass::OutputStyle::Compressed,
        }
    }
}

// ============================================================================
// Compile result
// ============================================================================

/// A single source file's compile failure.
///
/// Collected by the build pass, never thrown: one entry per failed file.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{file}: {message}")]
pub struct CompileError {
    /// Base name of the source file (no directory components).
    pub file: String,
    /// Human-readable message from the compiler.
    pub message: String,
}

/// Compile one stylesheet's source text.
///
/// `file` is the source's base name, used only for error reporting.
/// Import resolution follows the load paths configured on `options`.
pub fn compile_source(
    file: &str,
    source: String,
    options: &grass::Options,
) -> Result<String, CompileError> {
    grass::from_string(source, options).map_err(|err| CompileError {
        file: file.to_string(),
        message: err.to_string(),
    })
}

/// Map a source file name to its output name: extension replaced, basename kept.
///
/// `style.scss` → `style.css`
pub fn output_name(source: &Path) -> String {
    let stem = source
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or_default();
    format!("{stem}.{OUTPUT_EXT}")
}

/// Base name of a path as a `String`, for error records.
pub fn base_name(path: &Path) -> String {
    path.file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default()
        .to_string()
}

// ============================================================================
// Tests
// ============================================================================
