//! Tool configuration management for `sassbuild.toml`.
//!
//! # Sections
//!
//! | Section     | Purpose                                        |
//! |-------------|------------------------------------------------|
//! | `[build]`   | Source/output directories, output style        |
//! | `[enqueue]` | Public URL construction for compiled sheets    |
//! | `[watch]`   | Debounce window for continuous compilation     |
//!
//! # Example
//!
//! ```toml
//! [build]
//! source = "scss"
//! output = "css"
//! style = "compressed"
//!
//! [enqueue]
//! base_uri = "https://example.com/themes/demo"
//! path_prefix = "/css/"
//!
//! [watch]
//! debounce_ms = 300
//! ```

pub mod defaults;
mod error;

pub use error::ConfigError;

use crate::cli::{Cli, Commands};
use crate::compiler::OutputStyle;
use anyhow::{Result, bail};
use educe::Educe;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

// ============================================================================
// Sections
// ============================================================================

/// `[build]` section - compilation directories and style.
#[derive(Debug, Clone, Educe, Serialize, Deserialize)]
#[educe(Default)]
#[serde(default, deny_unknown_fields)]
pub struct BuildConfig {
    /// Source stylesheet directory.
    #[serde(default = "defaults::build::source")]
    #[educe(Default = defaults::build::source())]
    pub source: PathBuf,

    /// Compiled output directory.
    #[serde(default = "defaults::build::output")]
    #[educe(Default = defaults::build::output())]
    pub output: PathBuf,

    /// CSS output formatting style.
    #[serde(default)]
    pub style: OutputStyle,
}

/// `[enqueue]` section - how public URLs are built for registration.
#[derive(Debug, Clone, Educe, Serialize, Deserialize)]
#[educe(Default)]
#[serde(default, deny_unknown_fields)]
pub struct EnqueueConfig {
    /// The host theme's stylesheet base URI. Required by `enqueue`.
    pub base_uri: Option<String>,

    /// Path segment between the base URI and the file name.
    #[serde(default = "defaults::enqueue::path_prefix")]
    #[educe(Default = defaults::enqueue::path_prefix())]
    pub path_prefix: String,
}

/// `[watch]` section - continuous compilation settings.
#[derive(Debug, Clone, Educe, Serialize, Deserialize)]
#[educe(Default)]
#[serde(default, deny_unknown_fields)]
pub struct WatchConfig {
    /// Quiet window after the last file event before recompiling.
    #[serde(default = "defaults::watch::debounce_ms")]
    #[educe(Default = defaults::watch::debounce_ms())]
    pub debounce_ms: u64,
}

// ============================================================================
// Root Configuration
// ============================================================================

/// Root configuration structure representing sassbuild.toml
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ToolConfig {
    /// Compilation settings
    #[serde(default)]
    pub build: BuildConfig,

    /// Registration settings
    #[serde(default)]
    pub enqueue: EnqueueConfig,

    /// Watch mode settings
    #[serde(default)]
    pub watch: WatchConfig,
}

impl ToolConfig {
    /// Parse configuration from TOML string
    pub fn from_str(content: &str) -> Result<Self> {
        let config: ToolConfig = toml::from_str(content).map_err(ConfigError::Toml)?;
        Ok(config)
    }

    /// Load configuration from file path
    pub fn from_path(path: &Path) -> Result<Self> {
        let content =
            fs::read_to_string(path).map_err(|err| ConfigError::Io(path.to_path_buf(), err))?;
        Self::from_str(&content)
    }

    /// Fold CLI arguments into the loaded configuration.
    ///
    /// Directory overrides are applied first, then every path is resolved
    /// relative to the project root and normalized to absolute form.
    pub fn update_with_cli(&mut self, cli: &Cli) {
        if let Some(source) = &cli.source {
            self.build.source = source.clone();
        }
        if let Some(output) = &cli.output {
            self.build.output = output.clone();
        }
        if let Commands::Build {
            style: Some(style), ..
        } = &cli.command
        {
            self.build.style = *style;
        }

        let root = Self::normalize_path(cli.root.as_deref().unwrap_or(Path::new("./")));
        self.build.source = Self::normalize_path(&root.join(&self.build.source));
        self.build.output = Self::normalize_path(&root.join(&self.build.output));
    }

    /// Validate configuration for the current command
    pub fn validate(&self, command: &Commands) -> Result<()> {
        match command {
            Commands::Enqueue { .. } => match &self.enqueue.base_uri {
                None => bail!("[enqueue.base_uri] is required to build public URLs"),
                Some(uri) if !uri.starts_with("http") => {
                    bail!(ConfigError::Validation(
                        "[enqueue.base_uri] must start with http:// or https://".into()
                    ))
                }
                _ => {}
            },
            _ => {
                if !self.build.source.is_dir() {
                    bail!(ConfigError::Validation(format!(
                        "[build.source] is not a directory: {}",
                        self.build.source.display()
                    )));
                }
            }
        }

        Ok(())
    }

    /// Normalize a path to absolute, using canonicalize if the path exists
    fn normalize_path(path: &Path) -> PathBuf {
        path.canonicalize().unwrap_or_else(|_| {
            // For non-existent paths, manually make them absolute
            if path.is_absolute() {
                path.to_path_buf()
            } else {
                std::env::current_dir()
                    .map(|cwd| cwd.join(path))
                    .unwrap_or_else(|_| path.to_path_buf())
            }
        })
    }
}

// ============================================================================
// Tests
// ============================================================================
