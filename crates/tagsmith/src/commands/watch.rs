//! Watch command - rebuild templates as they change
//!
//! Performs a full build, then recompiles each changed template file and
//! its dependents until interrupted. A broken edit keeps the last good
//! output in place.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{info, warn};

use tagsmith_dev::{FileWatcher, HotReloader};
use tagsmith_templates::CommandCompiler;

use super::open_project;

/// Arguments for the watch command
#[derive(Debug)]
pub struct WatchArgs {
    pub project: Option<PathBuf>,
    pub compile: bool,
}

/// Execute the watch command
pub fn execute(args: WatchArgs) -> Result<()> {
    let runtime = tokio::runtime::Runtime::new().context("failed to start async runtime")?;
    runtime.block_on(run_watch(args))
}

async fn run_watch(args: WatchArgs) -> Result<()> {
    let project = open_project(args.project, None)?;
    let watcher = FileWatcher::for_project(&project).context("failed to watch template sources")?;

    let compiler = args
        .compile
        .then(|| CommandCompiler::from_config(&project.config.compiler));
    let mut reloader = HotReloader::new(project);
    if let Some(compiler) = compiler {
        reloader = reloader.with_compiler(Arc::new(compiler));
    }
    let reloader = Arc::new(reloader);

    match reloader.initialize() {
        Ok(summary) => info!(written = summary.written.len(), "initial build complete"),
        Err(_) => warn!("initial build failed, waiting for changes"),
    }

    tokio::select! {
        () = Arc::clone(&reloader).run(watcher) => {}
        result = tokio::signal::ctrl_c() => {
            result.context("failed to listen for interrupt")?;
            info!("interrupted, stopping");
        }
    }
    Ok(())
}
