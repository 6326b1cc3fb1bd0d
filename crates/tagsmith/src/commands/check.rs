//! Check command implementation.
//!
//! Runs the whole pipeline short of writing files, so it is safe to use in
//! CI or editors.

use std::path::PathBuf;

use anyhow::Result;

use super::build::compile_templates;
use super::open_project;

/// Arguments for the check command
#[derive(Debug)]
pub struct CheckArgs {
    pub project: Option<PathBuf>,
    pub json: bool,
}

/// Execute the check command
pub fn execute(args: CheckArgs) -> Result<()> {
    let project = open_project(args.project, None)?;
    let output = compile_templates(&project, args.json)?;
    if !args.json {
        println!(
            "{} template(s) in {} file(s) OK",
            output.registry.len(),
            output.sources.len()
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn check_does_not_write() {
        let temp = TempDir::new().unwrap();
        std::fs::create_dir(temp.path().join("templates")).unwrap();
        std::fs::write(temp.path().join("templates/card.html"), "<my-card></my-card>").unwrap();

        execute(CheckArgs {
            project: Some(temp.path().to_path_buf()),
            json: false,
        })
        .unwrap();
        assert!(!temp.path().join("src").exists());
    }
}
