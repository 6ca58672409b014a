//! Stylesheet registration with a host theme.
//!
//! The host's asset pipeline is an external collaborator, modeled as the
//! [`StyleRegistry`] trait: register a stylesheet under a handle, then
//! enqueue that handle for emission. [`ManifestRegistry`] is the shipped
//! implementation: it records registrations in order and renders them as
//! HTML `<link>` tags or a JSON manifest for the host to consume.

use crate::compiler::files_with_extension;
use crate::compiler::stylesheet::OUTPUT_EXT;
use anyhow::{Context, Result};
use serde::Serialize;
use std::path::Path;
use std::time::UNIX_EPOCH;

/// Handle suffix appended to each stylesheet's base name.
const HANDLE_SUFFIX: &str = "-style";

/// Every stylesheet applies to all media types.
const MEDIA_ALL: &str = "all";

// ============================================================================
// Registration records
// ============================================================================

/// One stylesheet registration, as handed to the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StyleAsset {
    /// Registration handle: `<basename>-style`.
    pub handle: String,
    /// Public URL: base URI + path prefix + file name.
    pub uri: String,
    /// Declared dependencies; always empty for compiled stylesheets.
    pub dependencies: Vec<String>,
    /// Cache-busting token: the file's modification time, unix seconds.
    pub version: String,
    /// Media applicability.
    pub media: String,
}

impl StyleAsset {
    /// Build a registration record for a compiled stylesheet on disk.
    pub fn from_output(path: &Path, base_uri: &str, path_prefix: &str) -> Result<Self> {
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default();
        let stem = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or_default();

        let mtime = path
            .metadata()
            .and_then(|m| m.modified())
            .with_context(|| format!("Failed to stat {}", path.display()))?;
        let version = mtime
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs()
            .to_string();

        Ok(Self {
            handle: format!("{stem}{HANDLE_SUFFIX}"),
            uri: format!("{base_uri}{path_prefix}{name}"),
            dependencies: Vec::new(),
            version,
            media: MEDIA_ALL.to_string(),
        })
    }
}

// ============================================================================
// Registry seam
// ============================================================================

/// The host framework's style pipeline.
///
/// `register_style` declares an asset under its handle; `enqueue_style`
/// marks a registered handle for emission. De-duplication across repeated
/// calls is the registry's concern, not the caller's.
pub trait StyleRegistry {
    /// The host theme's stylesheet base URI, used to build public URLs.
    fn stylesheet_base_uri(&self) -> &str;

    fn register_style(&mut self, asset: StyleAsset);

    fn enqueue_style(&mut self, handle: &str);
}

/// Register and enqueue every compiled stylesheet in `output_dir`.
///
/// Non-recursive; one registration per `.css` file, in name order.
pub fn enqueue_files(
    output_dir: &Path,
    registry: &mut dyn StyleRegistry,
    path_prefix: &str,
) -> Result<()> {
    let sheets = files_with_extension(output_dir, OUTPUT_EXT)
        .with_context(|| format!("Failed to scan output directory: {}", output_dir.display()))?;

    for path in sheets {
        let asset = StyleAsset::from_output(&path, registry.stylesheet_base_uri(), path_prefix)?;
        let handle = asset.handle.clone();
        registry.register_style(asset);
        registry.enqueue_style(&handle);
    }

    Ok(())
}

// ============================================================================
// Manifest registry
// ============================================================================

/// Recording registry that renders what a host would emit.
///
/// Registration is first-write-wins per handle and enqueueing is
/// idempotent, matching the usual host behavior for repeated calls.
pub struct ManifestRegistry {
    base_uri: String,
    registered: Vec<StyleAsset>,
    enqueued: Vec<String>,
}

impl ManifestRegistry {
    pub fn new(base_uri: impl Into<String>) -> Self {
        Self {
            base_uri: base_uri.into(),
            registered: Vec::new(),
            enqueued: Vec::new(),
        }
    }

    /// Enqueued assets in enqueue order.
    pub fn assets(&self) -> Vec<&StyleAsset> {
        self.enqueued
            .iter()
            .filter_map(|handle| self.registered.iter().find(|a| &a.handle == handle))
            .collect()
    }

    /// Render enqueued stylesheets as HTML `<link>` tags, one per line.
    pub fn to_html(&self) -> String {
        self.assets()
            .iter()
            .map(|a| {
                format!(
                    "<link rel=\"stylesheet\" id=\"{}-css\" href=\"{}?ver={}\" media=\"{}\">",
                    a.handle, a.uri, a.version, a.media
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Render enqueued stylesheets as a JSON manifest.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(&self.assets()).context("Failed to serialize manifest")
    }
}

impl StyleRegistry for ManifestRegistry {
    fn stylesheet_base_uri(&self) -> &str {
        &self.base_uri
    }

    fn register_style(&mut self, asset: StyleAsset) {
        if !self.registered.iter().any(|a| a.handle == asset.handle) {
            self.registered.push(asset);
        }
    }

    fn enqueue_style(&mut self, handle: &str) {
        let known = self.registered.iter().any(|a| a.handle == handle);
        if known && !self.enqueued.iter().any(|h| h == handle) {
            self.enqueued.push(handle.to_string());
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn asset(handle: &str) -> StyleAsset {
        StyleAsset {
            handle: handle.to_string(),
            uri: format!("https://example.com/css/{handle}.css"),
            dependencies: Vec::new(),
            version: "1700000000".to_string(),
            media: MEDIA_ALL.to_string(),
        }
    }

    #[test]
    fn test_from_output_builds_handle_and_uri() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("main.css");
        fs::write(&path, "a{}").unwrap();

        let asset =
            StyleAsset::from_output(&path, "https://example.com/themes/demo", "/css/").unwrap();
        assert_eq!(asset.handle, "main-style");
        assert_eq!(asset.uri, "https://example.com/themes/demo/css/main.css");
        assert!(asset.dependencies.is_empty());
        assert_eq!(asset.media, "all");
    }

    #[test]
    fn test_from_output_version_is_file_mtime_seconds() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("main.css");
        fs::write(&path, "a{}").unwrap();

        let expected = path
            .metadata()
            .unwrap()
            .modified()
            .unwrap()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_secs()
            .to_string();

        let asset = StyleAsset::from_output(&path, "", "").unwrap();
        assert_eq!(asset.version, expected);
    }

    #[test]
    fn test_enqueue_files_one_asset_per_css() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("main.css"), "a{}").unwrap();
        fs::write(dir.path().join("print.css"), "a{}").unwrap();
        fs::write(dir.path().join("main.css.map"), "{}").unwrap();

        let mut registry = ManifestRegistry::new("https://example.com/theme");
        enqueue_files(dir.path(), &mut registry, "/css/").unwrap();

        let handles: Vec<&str> = registry.assets().iter().map(|a| a.handle.as_str()).collect();
        assert_eq!(handles, vec!["main-style", "print-style"]);
    }

    #[test]
    fn test_enqueue_files_missing_output_dir_is_fatal() {
        let mut registry = ManifestRegistry::new("");
        assert!(enqueue_files(Path::new("/nonexistent/sassbuild-out"), &mut registry, "/").is_err());
    }

    #[test]
    fn test_registration_is_first_write_wins() {
        let mut registry = ManifestRegistry::new("");
        let mut second = asset("main-style");
        second.version = "2".to_string();

        registry.register_style(asset("main-style"));
        registry.register_style(second);
        registry.enqueue_style("main-style");
        registry.enqueue_style("main-style");

        let assets = registry.assets();
        assert_eq!(assets.len(), 1);
        assert_eq!(assets[0].version, "1700000000");
    }

    #[test]
    fn test_enqueue_of_unregistered_handle_is_ignored() {
        let mut registry = ManifestRegistry::new("");
        registry.enqueue_style("ghost-style");
        assert!(registry.assets().is_empty());
    }

    #[test]
    fn test_to_html_renders_link_tags() {
        let mut registry = ManifestRegistry::new("");
        registry.register_style(asset("main-style"));
        registry.enqueue_style("main-style");

        let html = registry.to_html();
        assert_eq!(
            html,
            "<link rel=\"stylesheet\" id=\"main-style-css\" \
             href=\"https://example.com/css/main-style.css?ver=1700000000\" media=\"all\">"
        );
    }

    #[test]
    fn test_to_json_manifest_round_trips() {
        let mut registry = ManifestRegistry::new("");
        registry.register_style(asset("main-style"));
        registry.enqueue_style("main-style");

        let json = registry.to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value.as_array().unwrap().len(), 1);
        assert_eq!(value[0]["handle"], "main-style");
        assert_eq!(value[0]["version"], "1700000000");
    }
}
