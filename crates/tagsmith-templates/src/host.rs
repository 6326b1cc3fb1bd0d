/*
 * host.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Host compiler invocation and registry loading.
//!
//! Both are external collaborators: the compiler is an opaque blocking call
//! returning diagnostics against generated files, and the loader hands back
//! the compiled registry object by its well-known name.

use crate::build::BuildOutput;
use crate::config::{CompilerConfig, MODULE_PATH_ENV};
use crate::diagnostics::CompilerError;
use crate::project::Project;
use std::any::Any;
use std::collections::HashMap;
use std::path::PathBuf;
use std::process::Command;
use std::sync::Arc;
use tagsmith_runtime::{Registry, TemplateInfo};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileRequest {
    pub working_dir: PathBuf,
    /// Generated files handed to the compiler
    pub sources: Vec<PathBuf>,
    pub module_path: String,
    pub target: Option<String>,
}

impl CompileRequest {
    /// Request compiling every file of `output` as written into the
    /// project's output directory.
    pub fn for_build(project: &Project, output: &BuildOutput) -> Self {
        let output_dir = project.output_dir();
        CompileRequest {
            working_dir: project.root.clone(),
            sources: output.files.keys().map(|path| output_dir.join(path)).collect(),
            module_path: project.config.module_path().to_string(),
            target: project.config.compiler.target.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompileOutcome {
    Success,
    Failed(Vec<CompilerError>),
}

impl CompileOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, CompileOutcome::Success)
    }
}

#[derive(Debug, Error)]
pub enum HostError {
    #[error("failed to run `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("`{command}` failed ({status}) without reporting diagnostics: {stderr}")]
    Failed {
        command: String,
        status: String,
        stderr: String,
    },
}

pub trait HostCompiler: Send + Sync {
    fn compile(&self, request: &CompileRequest) -> Result<CompileOutcome, HostError>;
}

/// Runs an external command that prints cargo JSON messages.
#[derive(Debug, Clone)]
pub struct CommandCompiler {
    pub command: String,
    pub args: Vec<String>,
}

impl Default for CommandCompiler {
    fn default() -> Self {
        CommandCompiler::from_config(&CompilerConfig::default())
    }
}

impl CommandCompiler {
    pub fn from_config(config: &CompilerConfig) -> Self {
        CommandCompiler {
            command: config.command.clone(),
            args: config.args.clone(),
        }
    }

    fn describe(&self) -> String {
        std::iter::once(self.command.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl HostCompiler for CommandCompiler {
    fn compile(&self, request: &CompileRequest) -> Result<CompileOutcome, HostError> {
        let mut command = Command::new(&self.command);
        command
            .args(&self.args)
            .current_dir(&request.working_dir)
            .env(MODULE_PATH_ENV, &request.module_path);
        if let Some(target) = &request.target {
            command.arg("--target").arg(target);
        }

        tracing::info!(command = %self.describe(), files = request.sources.len(), "running host compiler");
        let output = command.output().map_err(|source| HostError::Spawn {
            command: self.describe(),
            source,
        })?;

        let errors = parse_messages(&String::from_utf8_lossy(&output.stdout));
        if !errors.is_empty() {
            tracing::debug!(count = errors.len(), "host compiler reported errors");
            return Ok(CompileOutcome::Failed(errors));
        }
        if !output.status.success() {
            return Err(HostError::Failed {
                command: self.describe(),
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(CompileOutcome::Success)
    }
}

/// Extract error diagnostics from cargo's `--message-format=json` output.
pub fn parse_messages(stdout: &str) -> Vec<CompilerError> {
    stdout
        .lines()
        .filter_map(|line| serde_json::from_str::<serde_json::Value>(line).ok())
        .filter(|value| value["reason"] == "compiler-message")
        .filter_map(|value| {
            let message = &value["message"];
            if message["level"] != "error" {
                return None;
            }
            let spans = message["spans"].as_array()?;
            let primary = spans
                .iter()
                .find(|s| s["is_primary"] == true)
                .or_else(|| spans.first())?;
            Some(CompilerError {
                message: message["message"].as_str()?.to_string(),
                file: PathBuf::from(primary["file_name"].as_str()?),
                line: primary["line_start"].as_u64()? as usize,
                column: primary["column_start"].as_u64()? as usize,
            })
        })
        .collect()
}

/// A compiled registry object.
pub trait LoadedRegistry: Send + Sync {
    fn name(&self) -> &str;
    fn templates(&self) -> Vec<&TemplateInfo>;
    fn find(&self, namespace: &str, name: &str) -> Option<&TemplateInfo>;
}

impl LoadedRegistry for Registry {
    fn name(&self) -> &str {
        self.name
    }

    fn templates(&self) -> Vec<&TemplateInfo> {
        Registry::templates(self).collect()
    }

    fn find(&self, namespace: &str, name: &str) -> Option<&TemplateInfo> {
        Registry::find(self, namespace, name)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum LoadError {
    #[error("registry `{0}` not found")]
    NotFound(String),

    #[error("`{0}` is not a tagsmith registry")]
    WrongType(String),
}

pub trait ModuleLoader: Send + Sync {
    fn load(&self, qualified_name: &str) -> Result<Arc<dyn LoadedRegistry>, LoadError>;
}

/// Serves registries linked into the running process.
#[derive(Default)]
pub struct StaticLoader {
    objects: HashMap<String, Arc<dyn Any + Send + Sync>>,
}

impl StaticLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a registry under its own name.
    pub fn with_registry(mut self, registry: Registry) -> Self {
        self.objects.insert(registry.name.to_string(), Arc::new(registry));
        self
    }

    /// Register an arbitrary object under `name`.
    pub fn insert<T: Any + Send + Sync>(&mut self, name: impl Into<String>, object: T) {
        self.objects.insert(name.into(), Arc::new(object));
    }
}

impl ModuleLoader for StaticLoader {
    fn load(&self, qualified_name: &str) -> Result<Arc<dyn LoadedRegistry>, LoadError> {
        let object = self
            .objects
            .get(qualified_name)
            .ok_or_else(|| LoadError::NotFound(qualified_name.to_string()))?;
        let registry = Arc::clone(object)
            .downcast::<Registry>()
            .map_err(|_| LoadError::WrongType(qualified_name.to_string()))?;
        Ok(registry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tagsmith_runtime::ParameterInfo;

    static TEMPLATES: &[TemplateInfo] = &[TemplateInfo {
        name: "icon",
        namespace: "components",
        function: "crate::templates::components::icon::render",
        page: false,
        parameters: &[ParameterInfo {
            name: "name",
            ty: "&str",
            default: None,
        }],
    }];

    static REGISTRY: Registry = Registry {
        name: "crate::templates::REGISTRY",
        namespaces: &[TEMPLATES],
    };

    #[test]
    fn parses_primary_spans_of_errors() {
        let stdout = [
            r#"{"reason":"compiler-artifact","package_id":"x"}"#,
            r#"{"reason":"compiler-message","message":{"level":"warning","message":"unused","spans":[{"file_name":"src/a.rs","line_start":1,"column_start":1,"is_primary":true}]}}"#,
            r#"{"reason":"compiler-message","message":{"level":"error","message":"mismatched types","spans":[{"file_name":"src/b.rs","line_start":3,"column_start":9,"is_primary":false},{"file_name":"src/templates/icon.rs","line_start":42,"column_start":17,"is_primary":true}]}}"#,
            "not json",
        ]
        .join("\n");

        assert_eq!(
            parse_messages(&stdout),
            vec![CompilerError {
                message: "mismatched types".into(),
                file: PathBuf::from("src/templates/icon.rs"),
                line: 42,
                column: 17,
            }]
        );
    }

    #[test]
    fn static_loader() {
        let mut loader = StaticLoader::new().with_registry(REGISTRY);
        loader.insert("crate::other::THING", 42u32);

        let registry = loader.load("crate::templates::REGISTRY").unwrap();
        assert_eq!(registry.templates().len(), 1);
        assert_eq!(registry.find("components", "icon").unwrap().parameters[0].name, "name");

        assert_eq!(
            loader.load("crate::missing").err(),
            Some(LoadError::NotFound("crate::missing".into()))
        );
        assert_eq!(
            loader.load("crate::other::THING").err(),
            Some(LoadError::WrongType("crate::other::THING".into()))
        );
    }

    #[test]
    fn request_for_build() {
        use crate::build::{BuildSettings, build_sources};
        use crate::config::ProjectConfig;

        let temp = tempfile::TempDir::new().unwrap();
        std::fs::create_dir(temp.path().join("templates")).unwrap();
        let mut config = ProjectConfig::default();
        config.compiler.target = Some("wasm32-unknown-unknown".into());
        let project = Project::with_config(temp.path(), config).unwrap();

        let (output, report) = build_sources(
            vec![(PathBuf::from("card.html"), "<my-card></my-card>".to_string())],
            &BuildSettings::from(&project.config),
        );
        assert!(report.is_ok());

        let request = CompileRequest::for_build(&project, &output);
        assert_eq!(request.working_dir, temp.path());
        assert_eq!(
            request.sources,
            vec![
                temp.path().join("src/templates/mod.rs"),
                temp.path().join("src/templates/my_card.rs"),
            ]
        );
        assert_eq!(request.module_path, "crate::templates");
        assert_eq!(request.target.as_deref(), Some("wasm32-unknown-unknown"));
    }

    #[cfg(unix)]
    #[test]
    fn command_status_without_diagnostics() {
        let request = CompileRequest {
            working_dir: std::env::temp_dir(),
            sources: Vec::new(),
            module_path: "crate::templates".into(),
            target: None,
        };
        let ok = CommandCompiler {
            command: "true".into(),
            args: Vec::new(),
        };
        assert_eq!(ok.compile(&request).unwrap(), CompileOutcome::Success);

        let failing = CommandCompiler {
            command: "false".into(),
            args: Vec::new(),
        };
        assert!(matches!(failing.compile(&request), Err(HostError::Failed { .. })));
    }
}
