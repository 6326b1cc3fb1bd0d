//! Command implementations for the tagsmith CLI
//!
//! Each command module handles the CLI interface and delegates to
//! tagsmith-templates and tagsmith-dev for the actual work.

use std::path::PathBuf;

use anyhow::{Context, Result};
use tagsmith_error_reporting::DiagnosticMessage;
use tagsmith_source_map::SourceContext;
use tagsmith_templates::{Project, find_project_root};
use tracing::debug;

pub mod build;
pub mod check;
pub mod list;
pub mod watch;

/// Open the project at `dir`, or the nearest one above the current directory.
///
/// `output` overrides the configured output directory.
pub fn open_project(dir: Option<PathBuf>, output: Option<PathBuf>) -> Result<Project> {
    let root = match dir {
        Some(dir) => dir,
        None => {
            let cwd = std::env::current_dir().context("failed to get current directory")?;
            find_project_root(&cwd).unwrap_or(cwd)
        }
    };
    let root = root
        .canonicalize()
        .with_context(|| format!("project directory {} not found", root.display()))?;

    let mut project = Project::open(&root).map_err(|err| {
        anyhow::anyhow!(err.to_diagnostic().to_text(None))
            .context(format!("failed to open project at {}", root.display()))
    })?;
    if let Some(output) = output {
        project.config.output_dir = output;
    }
    debug!(root = %project.root.display(), "opened project");
    Ok(project)
}

/// Print diagnostics to stderr, or as JSON lines to stdout.
pub fn print_diagnostics(
    diagnostics: impl IntoIterator<Item = DiagnosticMessage>,
    ctx: Option<&SourceContext>,
    json: bool,
) {
    for diagnostic in diagnostics {
        if json {
            println!("{}", diagnostic.to_json());
        } else {
            eprintln!("{}", diagnostic.to_text(ctx));
        }
    }
}
