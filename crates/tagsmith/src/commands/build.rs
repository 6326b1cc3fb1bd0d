//! Build command implementation.
//!
//! Compiles every template of a project, writes the generated modules and
//! optionally runs the host compiler, reporting its errors in template
//! coordinates.

use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use tracing::info;

use tagsmith_templates::diagnostics::resolve;
use tagsmith_templates::{
    BuildOutput, CommandCompiler, CompileOutcome, CompileRequest, HostCompiler, Project, build,
};

use super::{open_project, print_diagnostics};

/// Arguments for the build command
#[derive(Debug)]
pub struct BuildArgs {
    pub project: Option<PathBuf>,
    pub compile: bool,
    pub output: Option<PathBuf>,
    pub json: bool,
}

/// Execute the build command
pub fn execute(args: BuildArgs) -> Result<()> {
    let project = open_project(args.project, args.output)?;
    let output = compile_templates(&project, args.json)?;

    let output_dir = project.output_dir();
    let summary = output
        .write(&output_dir)
        .with_context(|| format!("failed to write generated code to {}", output_dir.display()))?;
    info!(
        written = summary.written.len(),
        unchanged = summary.unchanged,
        removed = summary.removed.len(),
        "build complete"
    );

    if args.compile {
        host_compile(&project, &output, &CommandCompiler::from_config(&project.config.compiler), args.json)?;
    }
    Ok(())
}

/// Build all templates, printing every template error.
pub fn compile_templates(project: &Project, json: bool) -> Result<BuildOutput> {
    let (output, report) = build(project).context("failed to read template sources")?;
    if !report.is_ok() {
        let ctx = output.source_context();
        print_diagnostics(report.errors.iter().map(|err| err.to_diagnostic(&ctx)), Some(&ctx), json);
        bail!("{} template error(s)", report.len());
    }
    Ok(output)
}

/// Run the host compiler over written output and print remapped errors.
pub fn host_compile(
    project: &Project,
    output: &BuildOutput,
    compiler: &dyn HostCompiler,
    json: bool,
) -> Result<()> {
    let request = CompileRequest::for_build(project, output);
    match compiler.compile(&request).context("host compiler failed")? {
        CompileOutcome::Success => {
            info!("host compile succeeded");
            Ok(())
        }
        CompileOutcome::Failed(errors) => {
            let resolved = resolve(&output.generated_sources(&project.output_dir()), &errors);
            let ctx = output.source_context();
            print_diagnostics(resolved.iter().map(|err| err.to_diagnostic(&ctx)), Some(&ctx), json);
            bail!("host compiler reported {} error(s)", resolved.len());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tagsmith_templates::{CompilerError, HostError};
    use tempfile::TempDir;

    fn project_dir(files: &[(&str, &str)]) -> TempDir {
        let temp = TempDir::new().unwrap();
        let source_dir = temp.path().join("templates");
        std::fs::create_dir_all(&source_dir).unwrap();
        for (path, source) in files {
            std::fs::write(source_dir.join(path), source).unwrap();
        }
        temp
    }

    struct FixedCompiler(Vec<CompilerError>);

    impl HostCompiler for FixedCompiler {
        fn compile(&self, _request: &CompileRequest) -> Result<CompileOutcome, HostError> {
            if self.0.is_empty() {
                Ok(CompileOutcome::Success)
            } else {
                Ok(CompileOutcome::Failed(self.0.clone()))
            }
        }
    }

    #[test]
    fn build_writes_generated_modules() {
        let temp = project_dir(&[("card.html", "<my-card title=\"&str\" fragment><h1>${title}</h1></my-card>")]);
        execute(BuildArgs {
            project: Some(temp.path().to_path_buf()),
            compile: false,
            output: None,
            json: false,
        })
        .unwrap();

        let generated = std::fs::read_to_string(temp.path().join("src/templates/my_card.rs")).unwrap();
        assert!(generated.starts_with("// @generated by tagsmith"));
        assert!(temp.path().join("src/templates/mod.rs").is_file());
    }

    #[test]
    fn template_errors_fail_the_build() {
        let temp = project_dir(&[("page.html", "<home-page><no-such-thing/></home-page>")]);
        let err = execute(BuildArgs {
            project: Some(temp.path().to_path_buf()),
            compile: false,
            output: Some(PathBuf::from("out")),
            json: true,
        })
        .unwrap_err();

        assert_eq!(err.to_string(), "1 template error(s)");
        assert!(!temp.path().join("out").exists());
    }

    #[test]
    fn host_errors_fail_the_build() {
        let temp = project_dir(&[("card.html", "<my-card title=\"&str\"><h1>${title}</h1></my-card>")]);
        let project = open_project(Some(temp.path().to_path_buf()), None).unwrap();
        let output = compile_templates(&project, false).unwrap();
        output.write(&project.output_dir()).unwrap();

        host_compile(&project, &output, &FixedCompiler(Vec::new()), false).unwrap();

        let failing = FixedCompiler(vec![CompilerError {
            message: "cannot find value `titel`".to_string(),
            file: project.output_dir().join("my_card.rs"),
            line: 1,
            column: 1,
        }]);
        let err = host_compile(&project, &output, &failing, false).unwrap_err();
        assert_eq!(err.to_string(), "host compiler reported 1 error(s)");
    }
}
