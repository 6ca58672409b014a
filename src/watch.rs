//! File system watcher for continuous compilation.
//!
//! Monitors the source directory and recompiles when stylesheets change.
//!
//! # Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────┐
//! │                     Event Loop                         │
//! │                                                        │
//! │  ┌──────────┐    ┌──────────┐    ┌─────────────────┐   │
//! │  │ notify   │───▶│ Debouncer│───▶│ try_rebuild()   │   │
//! │  │ events   │    │          │    │ (full pass)     │   │
//! │  └──────────┘    └──────────┘    └─────────────────┘   │
//! └────────────────────────────────────────────────────────┘
//! ```
//!
//! A rebuild is always a full pass over the source directory: stylesheets
//! import each other, so a single changed partial can invalidate every
//! compiled file.

use crate::{
    compiler::{BuildManager, stylesheet::SOURCE_EXT},
    config::ToolConfig,
    log,
};
use anyhow::{Context, Result};
use notify::{Event, EventKind, RecursiveMode, Watcher};
use rustc_hash::FxHashSet;
use std::{
    path::{Path, PathBuf},
    time::{Duration, Instant},
};

const REBUILD_COOLDOWN_MS: u64 = 800;

// =============================================================================
// Path Utilities
// =============================================================================

/// Check if path is a temp/backup file (editor artifacts).
fn is_temp_file(path: &Path) -> bool {
    let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");

    matches!(ext, "bck" | "bak" | "backup" | "swp" | "swo" | "tmp")
        || name.ends_with('~')
        || name.starts_with('.')
}

/// Check if path is a source stylesheet (partials included).
fn is_source_file(path: &Path) -> bool {
    path.extension().is_some_and(|e| e == SOURCE_EXT)
}

// =============================================================================
// Debounce State
// =============================================================================

/// Batches rapid file events with debouncing and rebuild cooldown.
struct Debouncer {
    pending: FxHashSet<PathBuf>,
    last_event: Option<Instant>,
    last_rebuild: Option<Instant>,
    debounce: Duration,
}

impl Debouncer {
    fn new(debounce: Duration) -> Self {
        Self {
            pending: FxHashSet::default(),
            last_event: None,
            last_rebuild: None,
            debounce,
        }
    }

    fn in_cooldown(&self) -> bool {
        self.last_rebuild
            .is_some_and(|t| t.elapsed() < Duration::from_millis(REBUILD_COOLDOWN_MS))
    }

    fn add(&mut self, event: Event) {
        for path in event.paths {
            if !is_temp_file(&path) {
                self.pending.insert(path);
            }
        }
        self.last_event = Some(Instant::now());
    }

    fn ready(&self) -> bool {
        !self.pending.is_empty() && self.last_event.is_some_and(|t| t.elapsed() >= self.debounce)
    }

    fn take(&mut self) -> Vec<PathBuf> {
        self.last_event = None;
        self.pending.drain().collect()
    }

    fn mark_rebuild(&mut self) {
        self.last_rebuild = Some(Instant::now());
    }

    fn timeout(&self) -> Duration {
        if self.pending.is_empty() {
            Duration::from_secs(60)
        } else {
            self.debounce
        }
    }
}

// =============================================================================
// Event Handler
// =============================================================================

const fn is_relevant(event: &Event) -> bool {
    matches!(event.kind, EventKind::Modify(_) | EventKind::Create(_))
}

/// Run a full compile pass, logging per-file errors.
/// Returns true if the pass published output (for cooldown tracking).
fn try_rebuild(manager: &mut BuildManager) -> bool {
    match manager.compile() {
        Ok(()) if manager.compile_errors().is_empty() => {
            log!("watch"; "rebuilt");
            true
        }
        Ok(()) => {
            for err in manager.compile_errors() {
                log!("error"; "{err}");
            }
            log!("watch"; "rebuild failed, previous output kept");
            false
        }
        Err(err) => {
            log!("error"; "rebuild failed: {err:#}");
            false
        }
    }
}

// =============================================================================
// Public API
// =============================================================================

/// Start blocking file watcher with debouncing and live recompilation.
pub fn watch_for_changes_blocking(config: &ToolConfig) -> Result<()> {
    let mut manager = BuildManager::from_config(config);

    let (tx, rx) = std::sync::mpsc::channel();
    let mut watcher = notify::recommended_watcher(tx).context("Failed to create file watcher")?;
    watcher
        .watch(&config.build.source, RecursiveMode::NonRecursive)
        .with_context(|| format!("Failed to watch {}", config.build.source.display()))?;

    log!("watch"; "watching {}", config.build.source.display());

    let mut debouncer = Debouncer::new(Duration::from_millis(config.watch.debounce_ms));

    loop {
        match rx.recv_timeout(debouncer.timeout()) {
            Ok(Ok(event)) if is_relevant(&event) && !debouncer.in_cooldown() => {
                debouncer.add(event);
            }
            Ok(Err(e)) => log!("watch"; "error: {e}"),
            Err(std::sync::mpsc::RecvTimeoutError::Timeout) if debouncer.ready() => {
                let changed: Vec<_> = debouncer
                    .take()
                    .into_iter()
                    .filter(|p| is_source_file(p))
                    .collect();
                if !changed.is_empty() {
                    log!("watch"; "{} file(s) changed, recompiling", changed.len());
                    if try_rebuild(&mut manager) {
                        debouncer.mark_rebuild();
                    }
                }
            }
            Err(std::sync::mpsc::RecvTimeoutError::Disconnected) => break,
            // Other cases: irrelevant events, timeout without ready, etc.
            _ => {}
        }
    }

    Ok(())
}

// =============================================================================
// Tests
// =============================================================================
