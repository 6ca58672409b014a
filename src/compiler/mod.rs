//! Stylesheet compilation and staleness tracking.
//!
//! This module owns the build pass:
//!
//! - **stylesheet**: per-file compilation behind a result type
//! - [`BuildManager`]: directory scan, staging, all-or-nothing publish
//!
//! # Build Flow
//!
//! ```text
//! eligible_sources() ──► compile_source() ──► staging dir ──► publish()
//!        │                     │                                 │
//!        ▼                     ▼                                 ▼
//!   *.scss (no "_")      CSS text / error          output dir (errors == 0)
//! ```
//!
//! A failed file never aborts the pass: its error is recorded and the rest
//! of the directory is still compiled. The output directory is only touched
//! when the whole pass succeeded, so a broken edit leaves the last good
//! artifacts in place.

pub mod stylesheet;

pub use stylesheet::{CompileError, OutputStyle};

use crate::config::ToolConfig;
use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::SystemTime;
use stylesheet::{OUTPUT_EXT, SOURCE_EXT};

/// Per-process staging sequence, so two managers never share a staging dir.
static STAGING_SEQ: AtomicU64 = AtomicU64::new(0);

// ============================================================================
// Shared utilities
// ============================================================================

/// Collect files with the given extension from a directory, non-recursive.
///
/// Results are sorted by name so passes are deterministic regardless of
/// directory iteration order.
pub fn files_with_extension(dir: &Path, ext: &str) -> std::io::Result<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_ok_and(|t| t.is_file()))
        .map(|e| e.path())
        .filter(|p| p.extension().is_some_and(|e| e == ext))
        .collect();
    files.sort();
    Ok(files)
}

/// Newest modification time among files with `ext` in `dir`.
///
/// A missing or empty directory yields `None`.
pub fn latest_mtime(dir: &Path, ext: &str) -> Option<SystemTime> {
    files_with_extension(dir, ext)
        .ok()?
        .iter()
        .filter_map(|p| p.metadata().ok())
        .filter_map(|m| m.modified().ok())
        .max()
}

/// True iff the newest source strictly post-dates the newest output.
///
/// No sources at all means nothing to build; equal timestamps count as
/// up to date.
fn is_stale(source: Option<SystemTime>, output: Option<SystemTime>) -> bool {
    match source {
        Some(src) => output.is_none_or(|out| src > out),
        None => false,
    }
}

/// Eligible compilation inputs: `.scss` files whose name does not start
/// with `_`. Underscore-prefixed files are partials, meant only to be
/// imported.
fn eligible_sources(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let files = files_with_extension(dir, SOURCE_EXT)?
        .into_iter()
        .filter(|p| {
            p.file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| !n.starts_with('_'))
        })
        .collect();
    Ok(files)
}

// ============================================================================
// BuildManager
// ============================================================================

/// Drives one build pass over a source directory.
///
/// Holds the directories, the configured output style, and the errors
/// collected during [`compile`](Self::compile). The error list is reset at
/// construction and on every pass; callers inspect it afterwards via
/// [`compile_errors`](Self::compile_errors).
pub struct BuildManager {
    source_dir: PathBuf,
    output_dir: PathBuf,
    style: OutputStyle,
    staging_dir: PathBuf,
    compile_errors: Vec<CompileError>,
}

impl BuildManager {
    /// Create a manager for one source/output directory pair.
    ///
    /// The staging directory lives under the system temp directory and is
    /// unique per manager, so concurrent processes (or managers) never
    /// interleave staged writes.
    pub fn new(
        source_dir: impl Into<PathBuf>,
        output_dir: impl Into<PathBuf>,
        style: OutputStyle,
    ) -> Self {
        let staging_dir = std::env::temp_dir().join(format!(
            "sassbuild-{}-{}",
            std::process::id(),
            STAGING_SEQ.fetch_add(1, Ordering::Relaxed)
        ));

        Self {
            source_dir: source_dir.into(),
            output_dir: output_dir.into(),
            style,
            staging_dir,
            compile_errors: Vec::new(),
        }
    }

    /// Create a manager from loaded configuration.
    pub fn from_config(config: &ToolConfig) -> Self {
        Self::new(
            &config.build.source,
            &config.build.output,
            config.build.style,
        )
    }

    /// Errors collected by the most recent [`compile`](Self::compile) pass,
    /// in source-name order.
    pub fn compile_errors(&self) -> &[CompileError] {
        &self.compile_errors
    }

    /// Compile every eligible source file into the output directory.
    ///
    /// Compiled CSS is first written to the staging directory; the output
    /// directory is only updated (files overwritten by name) when zero
    /// files failed. Per-file compiler failures land in the error list and
    /// never abort the pass. Filesystem failures do: a missing source
    /// directory or an unwritable staging path is returned as `Err`.
    pub fn compile(&mut self) -> Result<()> {
        self.compile_errors.clear();

        if self.staging_dir.exists() {
            fs::remove_dir_all(&self.staging_dir).with_context(|| {
                format!("Failed to clear staging: {}", self.staging_dir.display())
            })?;
        }
        fs::create_dir_all(&self.staging_dir)
            .with_context(|| format!("Failed to create staging: {}", self.staging_dir.display()))?;

        // Options are owned here and handed to each per-file call; imports
        // resolve against the source directory.
        let options = grass::Options::default()
            .style(grass::OutputStyle::from(self.style))
            .load_path(&self.source_dir);

        let sources = eligible_sources(&self.source_dir).with_context(|| {
            format!("Failed to scan source directory: {}", self.source_dir.display())
        })?;

        for path in sources {
            let source = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read {}", path.display()))?;

            match stylesheet::compile_source(&stylesheet::base_name(&path), source, &options) {
                Ok(css) => {
                    let dest = self.staging_dir.join(stylesheet::output_name(&path));
                    fs::write(&dest, css)
                        .with_context(|| format!("Failed to write {}", dest.display()))?;
                }
                Err(err) => self.compile_errors.push(err),
            }
        }

        if self.compile_errors.is_empty() {
            self.publish()?;
        }

        // Staging is per-pass scratch space; errors live in memory.
        fs::remove_dir_all(&self.staging_dir).ok();

        Ok(())
    }

    /// True when the newest source file is strictly newer than the newest
    /// output file. Read-only; partials count as sources here, since
    /// editing one invalidates whatever imports it.
    pub fn needs_compiling(&self) -> bool {
        is_stale(
            latest_mtime(&self.source_dir, SOURCE_EXT),
            latest_mtime(&self.output_dir, OUTPUT_EXT),
        )
    }

    /// Register every compiled stylesheet in the output directory with the
    /// given registry. See [`crate::enqueue`].
    pub fn enqueue_files(
        &self,
        registry: &mut dyn crate::enqueue::StyleRegistry,
        path_prefix: &str,
    ) -> Result<()> {
        crate::enqueue::enqueue_files(&self.output_dir, registry, path_prefix)
    }

    /// Copy every staged file into the output directory, overwriting files
    /// of the same name.
    fn publish(&self) -> Result<()> {
        fs::create_dir_all(&self.output_dir)
            .with_context(|| format!("Failed to create output: {}", self.output_dir.display()))?;

        for entry in fs::read_dir(&self.staging_dir)? {
            let entry = entry?;
            let dest = self.output_dir.join(entry.file_name());
            fs::copy(entry.path(), &dest)
                .with_context(|| format!("Failed to publish {}", dest.display()))?;
        }

        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, UNIX_EPOCH};
    use tempfile::tempdir;

    fn manager(source: &Path, output: &Path) -> BuildManager {
        BuildManager::new(source, output, OutputStyle::Expanded)
    }

    // ------------------------------------------------------------------------
    // is_stale
    // ------------------------------------------------------------------------

    #[test]
    fn test_is_stale_source_newer() {
        let old = UNIX_EPOCH + Duration::from_secs(100);
        let new = UNIX_EPOCH + Duration::from_secs(200);
        assert!(is_stale(Some(new), Some(old)));
    }

    #[test]
    fn test_is_stale_output_newer() {
        let old = UNIX_EPOCH + Duration::from_secs(100);
        let new = UNIX_EPOCH + Duration::from_secs(200);
        assert!(!is_stale(Some(old), Some(new)));
    }

    #[test]
    fn test_is_stale_equal_timestamps_up_to_date() {
        let t = UNIX_EPOCH + Duration::from_secs(100);
        assert!(!is_stale(Some(t), Some(t)));
    }

    #[test]
    fn test_is_stale_no_sources_never_stale() {
        let t = UNIX_EPOCH + Duration::from_secs(100);
        assert!(!is_stale(None, Some(t)));
        assert!(!is_stale(None, None));
    }

    #[test]
    fn test_is_stale_sources_without_outputs() {
        let t = UNIX_EPOCH + Duration::from_secs(100);
        assert!(is_stale(Some(t), None));
    }

    // ------------------------------------------------------------------------
    // Directory scanning
    // ------------------------------------------------------------------------

    #[test]
    fn test_latest_mtime_missing_or_empty_dir() {
        let dir = tempdir().unwrap();
        assert_eq!(latest_mtime(dir.path(), "scss"), None);
        assert_eq!(latest_mtime(Path::new("/nonexistent/sassbuild"), "scss"), None);
    }

    #[test]
    fn test_latest_mtime_finds_matching_files() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("a.scss"), "").unwrap();
        fs::write(dir.path().join("b.css"), "").unwrap();
        assert!(latest_mtime(dir.path(), "scss").is_some());
        assert!(latest_mtime(dir.path(), "sass").is_none());
    }

    #[test]
    fn test_eligible_sources_skips_partials_and_foreign_files() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("main.scss"), "").unwrap();
        fs::write(dir.path().join("_vars.scss"), "").unwrap();
        fs::write(dir.path().join("notes.txt"), "").unwrap();
        fs::write(dir.path().join("print.scss"), "").unwrap();

        let names: Vec<String> = eligible_sources(dir.path())
            .unwrap()
            .iter()
            .map(|p| stylesheet::base_name(p))
            .collect();
        assert_eq!(names, vec!["main.scss", "print.scss"]);
    }

    // ------------------------------------------------------------------------
    // compile
    // ------------------------------------------------------------------------

    #[test]
    fn test_compile_writes_one_output_per_eligible_source() {
        let source = tempdir().unwrap();
        let output = tempdir().unwrap();
        fs::write(
            source.path().join("main.scss"),
            "$c: red;\nbody { color: $c; }",
        )
        .unwrap();
        fs::write(source.path().join("print.scss"), "a { display: none; }").unwrap();
        fs::write(source.path().join("_vars.scss"), "$unused: 1;").unwrap();

        let mut mgr = manager(source.path(), output.path());
        mgr.compile().unwrap();

        assert!(mgr.compile_errors().is_empty());
        assert!(output.path().join("main.css").exists());
        assert!(output.path().join("print.css").exists());
        assert!(!output.path().join("_vars.css").exists());

        // Published content is exactly what the compiler produced.
        let options = grass::Options::default()
            .style(grass::OutputStyle::Expanded)
            .load_path(source.path());
        let expected =
            grass::from_string("$c: red;\nbody { color: $c; }".to_string(), &options).unwrap();
        assert_eq!(
            fs::read_to_string(output.path().join("main.css")).unwrap(),
            expected
        );
    }

    #[test]
    fn test_compile_resolves_imports_from_source_dir() {
        let source = tempdir().unwrap();
        let output = tempdir().unwrap();
        fs::write(source.path().join("_vars.scss"), "$accent: #336699;").unwrap();
        fs::write(
            source.path().join("theme.scss"),
            "@import \"vars\";\na { color: $accent; }",
        )
        .unwrap();

        let mut mgr = manager(source.path(), output.path());
        mgr.compile().unwrap();

        assert!(mgr.compile_errors().is_empty());
        let css = fs::read_to_string(output.path().join("theme.css")).unwrap();
        assert!(css.contains("#336699"));
    }

    #[test]
    fn test_compile_partials_only_is_a_clean_no_op() {
        let source = tempdir().unwrap();
        let output = tempdir().unwrap();
        fs::write(source.path().join("_vars.scss"), "$c: red;").unwrap();
        fs::write(output.path().join("stale.css"), "a{}").unwrap();

        let mut mgr = manager(source.path(), output.path());
        mgr.compile().unwrap();

        assert!(mgr.compile_errors().is_empty());
        assert_eq!(
            fs::read_to_string(output.path().join("stale.css")).unwrap(),
            "a{}"
        );
        assert_eq!(files_with_extension(output.path(), "css").unwrap().len(), 1);
    }

    #[test]
    fn test_compile_failure_records_base_name_and_preserves_output() {
        let source = tempdir().unwrap();
        let output = tempdir().unwrap();
        fs::write(source.path().join("good.scss"), "a { color: red; }").unwrap();
        fs::write(source.path().join("broken.scss"), "a { color: $undefined; }").unwrap();
        fs::write(output.path().join("good.css"), "/* last good */").unwrap();

        let mut mgr = manager(source.path(), output.path());
        mgr.compile().unwrap();

        assert_eq!(mgr.compile_errors().len(), 1);
        assert_eq!(mgr.compile_errors()[0].file, "broken.scss");

        // All-or-nothing: even the file that compiled fine is withheld.
        assert_eq!(
            fs::read_to_string(output.path().join("good.css")).unwrap(),
            "/* last good */"
        );
        assert!(!output.path().join("broken.css").exists());
    }

    #[test]
    fn test_compile_overwrites_previous_outputs() {
        let source = tempdir().unwrap();
        let output = tempdir().unwrap();
        fs::write(source.path().join("main.scss"), "a { color: red; }").unwrap();

        let mut mgr = manager(source.path(), output.path());
        mgr.compile().unwrap();
        let first = fs::read_to_string(output.path().join("main.css")).unwrap();
        assert!(first.contains("red"));

        fs::write(source.path().join("main.scss"), "a { color: blue; }").unwrap();
        mgr.compile().unwrap();
        let second = fs::read_to_string(output.path().join("main.css")).unwrap();
        assert!(second.contains("blue"));
    }

    #[test]
    fn test_compile_missing_source_dir_is_fatal() {
        let output = tempdir().unwrap();
        let mut mgr = manager(Path::new("/nonexistent/sassbuild-src"), output.path());
        assert!(mgr.compile().is_err());
    }

    #[test]
    fn test_error_list_resets_between_passes() {
        let source = tempdir().unwrap();
        let output = tempdir().unwrap();
        fs::write(source.path().join("main.scss"), "a { color: $undefined; }").unwrap();

        let mut mgr = manager(source.path(), output.path());
        mgr.compile().unwrap();
        assert_eq!(mgr.compile_errors().len(), 1);

        fs::write(source.path().join("main.scss"), "a { color: red; }").unwrap();
        mgr.compile().unwrap();
        assert!(mgr.compile_errors().is_empty());
        assert!(output.path().join("main.css").exists());
    }

    // ------------------------------------------------------------------------
    // needs_compiling
    // ------------------------------------------------------------------------

    #[test]
    fn test_needs_compiling_before_and_after_build() {
        let source = tempdir().unwrap();
        let output = tempdir().unwrap();
        fs::write(source.path().join("main.scss"), "a { color: red; }").unwrap();

        let mut mgr = manager(source.path(), output.path());
        assert!(mgr.needs_compiling());

        mgr.compile().unwrap();
        assert!(!mgr.needs_compiling());
    }

    #[test]
    fn test_needs_compiling_empty_source_dir() {
        let source = tempdir().unwrap();
        let output = tempdir().unwrap();
        fs::write(output.path().join("old.css"), "a{}").unwrap();

        let mgr = manager(source.path(), output.path());
        assert!(!mgr.needs_compiling());
    }
}
