//! sassbuild - compile SCSS sources into published stylesheets and
//! register them for a host theme.

mod cli;
mod compiler;
mod config;
mod enqueue;
mod logger;
mod watch;

use anyhow::{Context, Result, bail};
use clap::Parser;
use cli::{Cli, Commands, ManifestFormat};
use compiler::BuildManager;
use config::ToolConfig;
use enqueue::ManifestRegistry;
use std::fs;
use std::path::Path;
use watch::watch_for_changes_blocking;

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli)?;

    match &cli.command {
        Commands::Build { force, .. } => run_build(&config, *force),
        Commands::Status => run_status(&config),
        Commands::Watch => {
            run_build(&config, false)?;
            watch_for_changes_blocking(&config)
        }
        Commands::Enqueue { format, out } => run_enqueue(&config, *format, out.as_deref()),
    }
}

/// Load and validate configuration from CLI arguments
fn load_config(cli: &Cli) -> Result<ToolConfig> {
    let root = cli.root.as_deref().unwrap_or(Path::new("./"));
    let config_path = root.join(&cli.config);

    if !config_path.exists() {
        bail!("Config file not found: {}", config_path.display());
    }

    let mut config = ToolConfig::from_path(&config_path)?;
    config.update_with_cli(cli);
    config.validate(&cli.command)?;

    Ok(config)
}

/// Compile when sources are stale (or unconditionally with `force`).
///
/// Exits non-zero when any stylesheet failed to compile; the output
/// directory keeps its previous contents in that case.
fn run_build(config: &ToolConfig, force: bool) -> Result<()> {
    let mut manager = BuildManager::from_config(config);

    if !force && !manager.needs_compiling() {
        log!("build"; "stylesheets are up to date");
        return Ok(());
    }

    manager.compile()?;

    if manager.compile_errors().is_empty() {
        log!("build"; "done");
        return Ok(());
    }

    for err in manager.compile_errors() {
        log!("error"; "{err}");
    }
    bail!(
        "{} stylesheet(s) failed to compile, output left unchanged",
        manager.compile_errors().len()
    )
}

/// Report whether a rebuild is warranted.
fn run_status(config: &ToolConfig) -> Result<()> {
    let manager = BuildManager::from_config(config);

    if manager.needs_compiling() {
        log!("status"; "sources are newer than outputs, rebuild needed");
    } else {
        log!("status"; "up to date");
    }

    Ok(())
}

/// Register every compiled stylesheet and render the manifest.
fn run_enqueue(config: &ToolConfig, format: ManifestFormat, out: Option<&Path>) -> Result<()> {
    // validate() has already required base_uri for this command.
    let base_uri = config.enqueue.base_uri.clone().unwrap_or_default();
    let mut registry = ManifestRegistry::new(base_uri);

    let manager = BuildManager::from_config(config);
    manager.enqueue_files(&mut registry, &config.enqueue.path_prefix)?;

    let manifest = match format {
        ManifestFormat::Html => registry.to_html(),
        ManifestFormat::Json => registry.to_json()?,
    };

    match out {
        Some(path) => fs::write(path, manifest + "\n")
            .with_context(|| format!("Failed to write manifest: {}", path.display()))?,
        None => println!("{manifest}"),
    }

    Ok(())
}
