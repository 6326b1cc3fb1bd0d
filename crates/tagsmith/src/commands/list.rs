//! List command implementation.

use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing::warn;

use tagsmith_templates::{TemplateDefinition, build};

use super::open_project;

/// Arguments for the list command
#[derive(Debug)]
pub struct ListArgs {
    pub project: Option<PathBuf>,
}

/// Execute the list command
///
/// Templates that failed to generate are still listed as long as their
/// file parsed.
pub fn execute(args: ListArgs) -> Result<()> {
    let project = open_project(args.project, None)?;
    let (output, report) = build(&project).context("failed to read template sources")?;
    if !report.is_ok() {
        warn!(errors = report.len(), "project has template errors");
    }
    for definition in output.registry.definitions() {
        println!("{}", format_definition(definition));
    }
    Ok(())
}

/// One line per template: namespace, name, visibility, parameters.
fn format_definition(definition: &TemplateDefinition) -> String {
    let visibility = if definition.is_page {
        "page"
    } else if definition.is_fragment {
        "fragment"
    } else {
        "private"
    };
    let parameters: Vec<String> = definition
        .parameters
        .iter()
        .map(|p| match &p.default {
            Some(default) => format!("{}: {} = {}", p.name, p.ty, default),
            None => format!("{}: {}", p.name, p.ty),
        })
        .collect();
    format!(
        "{}\t{}\t{}\t({})",
        definition.sub_path.describe(),
        definition.name,
        visibility,
        parameters.join(", ")
    )
}
