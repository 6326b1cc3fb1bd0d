/*
 * config.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Project configuration (`tagsmith.yml`).

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tagsmith_error_reporting::{DiagnosticMessage, DiagnosticMessageBuilder, get_error_info};
use thiserror::Error;

pub const CONFIG_FILE: &str = "tagsmith.yml";

/// Environment variable through which the host compiler learns where the
/// generated modules are mounted.
pub const MODULE_PATH_ENV: &str = "TAGSMITH_MODULE_PATH";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("template source directory not found: {}", .0.display())]
    MissingSourceDir(PathBuf),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

impl ConfigError {
    pub fn code(&self) -> &'static str {
        "T-4-1"
    }

    pub fn to_diagnostic(&self) -> DiagnosticMessage {
        let title = get_error_info(self.code()).map_or("Configuration Error", |info| info.title.as_str());
        let builder = DiagnosticMessageBuilder::error(title)
            .with_code(self.code())
            .problem(self.to_string());
        match self {
            ConfigError::MissingSourceDir(_) => builder
                .add_hint(format!("Set `source_dir` in {} or pass --project?", CONFIG_FILE))
                .build(),
            _ => builder.build(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CompilerConfig {
    pub command: String,
    pub args: Vec<String>,
    /// Target triple passed as `--target`
    pub target: Option<String>,
    /// Module path exported to the compiler; defaults to `root_module`
    pub module_path: Option<String>,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        CompilerConfig {
            command: "cargo".to_string(),
            args: vec!["check".to_string(), "--message-format=json".to_string()],
            target: None,
            module_path: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WatchConfig {
    pub debounce_ms: u64,
}

impl Default for WatchConfig {
    fn default() -> Self {
        WatchConfig { debounce_ms: 200 }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProjectConfig {
    /// Template sources, relative to the project root
    pub source_dir: PathBuf,
    /// Generated Rust modules, relative to the project root
    pub output_dir: PathBuf,
    /// Rust path the output directory is mounted at
    pub root_module: String,
    /// Logical module prepended to every namespace path
    pub namespace: Option<String>,
    pub extension: String,
    /// Dashed tag names rendered as plain custom elements
    pub passthrough_elements: Vec<String>,
    pub compiler: CompilerConfig,
    pub watch: WatchConfig,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        ProjectConfig {
            source_dir: PathBuf::from("templates"),
            output_dir: PathBuf::from("src/templates"),
            root_module: "crate::templates".to_string(),
            namespace: None,
            extension: "html".to_string(),
            passthrough_elements: Vec::new(),
            compiler: CompilerConfig::default(),
            watch: WatchConfig::default(),
        }
    }
}

impl ProjectConfig {
    /// Load `tagsmith.yml` from `project_dir`. A missing file yields the
    /// defaults.
    pub fn load(project_dir: &Path) -> Result<Self, ConfigError> {
        let path = project_dir.join(CONFIG_FILE);
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            return Ok(ProjectConfig::default());
        }
        let content = std::fs::read_to_string(&path).map_err(|source| ConfigError::Io {
            path: path.clone(),
            source,
        })?;
        Self::from_yaml(&content, &path)
    }

    pub fn from_yaml(content: &str, path: &Path) -> Result<Self, ConfigError> {
        // An empty document deserializes to unit, not to the defaults.
        if content.trim().is_empty() {
            return Ok(ProjectConfig::default());
        }
        let config: ProjectConfig = serde_yaml::from_str(content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.root_module.trim().is_empty() {
            return Err(ConfigError::Invalid("`root_module` must not be empty".to_string()));
        }
        if self.extension.trim().is_empty() || self.extension.starts_with('.') {
            return Err(ConfigError::Invalid(
                "`extension` must be a bare file extension such as `html`".to_string(),
            ));
        }
        if let Some(name) = self.passthrough_elements.iter().find(|n| !n.contains('-')) {
            return Err(ConfigError::Invalid(format!(
                "passthrough element `{}` must contain a dash",
                name
            )));
        }
        Ok(())
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.watch.debounce_ms)
    }

    /// Module path exported to the host compiler.
    pub fn module_path(&self) -> &str {
        self.compiler.module_path.as_deref().unwrap_or(&self.root_module)
    }
}

/// Nearest directory at or above `start` containing `tagsmith.yml`.
pub fn find_project_root(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .find(|dir| dir.join(CONFIG_FILE).is_file())
        .map(Path::to_path_buf)
}
