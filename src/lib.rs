// src/lib.rs

pub mod cli;
pub mod config;
pub mod effects;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod logging;
pub mod watch;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use tracing::info;

use crate::cli::CliArgs;
use crate::config::loader::load_and_validate;
use crate::config::settings::FolderSettings;
use crate::effects::{DesktopNotifier, Notifier};
use crate::engine::supervisor::run_supervisor;

const SAMPLE_CONFIG: &str = include_str!("../conf/sample-config.toml");

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading (or `--init` / `--dry-run` handling)
/// - the per-folder engines
/// - the calendar ticker
/// - config hot reload and Ctrl-C handling
pub async fn run(args: CliArgs) -> Result<()> {
    let config_path = PathBuf::from(&args.config);

    if args.init {
        return write_sample_config(&config_path);
    }

    if !config_path.exists() {
        bail!(
            "config file not found: {}\n\
             run `watchfolder --config {} --init` to create a sample one",
            config_path.display(),
            config_path.display()
        );
    }

    let folders = load_and_validate(&config_path)?;

    if args.dry_run {
        print_dry_run(&folders);
        return Ok(());
    }

    info!(folders = folders.len(), "watchfolder starting");

    let notifier: Arc<dyn Notifier> = Arc::new(DesktopNotifier::new());
    run_supervisor(config_path, folders, notifier).await?;
    Ok(())
}

fn write_sample_config(path: &Path) -> Result<()> {
    if path.exists() {
        bail!("refusing to overwrite existing config: {}", path.display());
    }
    std::fs::write(path, SAMPLE_CONFIG)
        .with_context(|| format!("writing sample config to {}", path.display()))?;
    println!("wrote sample config: {}", path.display());
    println!("edit it, then start watching with: watchfolder --config {}", path.display());
    Ok(())
}

/// Simple dry-run output: print the resolved folders and their actions.
fn print_dry_run(folders: &[FolderSettings]) {
    println!("watchfolder dry-run");
    println!();
    println!("folders ({}):", folders.len());
    for folder in folders {
        println!("  - {}", folder.path.display());
        println!("      debounce: {:?}", folder.debounce);
        println!("      concurrency: {}", folder.concurrency);
        println!("      cooldown: {:?}", folder.cooldown);
        for (trigger, action) in &folder.actions {
            println!("      action '{trigger}':");
            for line in action.exec.lines() {
                println!("          {line}");
            }
            if action.success_match.is_some() {
                println!("          (success pattern configured)");
            }
            if action.error_match.is_some() {
                println!("          (error pattern configured)");
            }
            if let Some(notify) = &action.notify {
                println!("          notify: {notify}");
            }
        }
    }
}
