/*
 * project.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Template project: configuration plus the template source tree.

use crate::config::{ConfigError, ProjectConfig};
use crate::error::{TemplateError, TemplateResult};
use crate::model::SubPath;
use std::path::{Component, Path, PathBuf};
use walkdir::WalkDir;

/// Directories never searched for templates.
const SKIPPED_DIRS: &[&str] = &["target", "node_modules"];

#[derive(Debug, Clone)]
pub struct Project {
    pub root: PathBuf,
    pub config: ProjectConfig,
}

impl Project {
    /// Open the project at `root`, loading `tagsmith.yml` if present.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let root = root.into();
        let config = ProjectConfig::load(&root)?;
        Self::with_config(root, config)
    }

    pub fn with_config(root: impl Into<PathBuf>, config: ProjectConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let project = Project {
            root: root.into(),
            config,
        };
        let source_dir = project.source_dir();
        if !source_dir.is_dir() {
            return Err(ConfigError::MissingSourceDir(source_dir));
        }
        Ok(project)
    }

    pub fn source_dir(&self) -> PathBuf {
        self.root.join(&self.config.source_dir)
    }

    pub fn output_dir(&self) -> PathBuf {
        self.root.join(&self.config.output_dir)
    }

    pub fn is_template_file(&self, path: &Path) -> bool {
        path.extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case(&self.config.extension))
    }

    /// Path of `path` relative to the source directory, if it is inside it.
    pub fn relative(&self, path: &Path) -> Option<PathBuf> {
        let source_dir = self.source_dir();
        path.strip_prefix(&source_dir)
            .ok()
            .or_else(|| {
                let canonical = source_dir.canonicalize().ok()?;
                path.strip_prefix(canonical).ok()
            })
            .map(Path::to_path_buf)
    }

    /// Every template file below the source directory, relative and sorted.
    pub fn discover(&self) -> TemplateResult<Vec<PathBuf>> {
        let source_dir = self.source_dir();
        let mut files = Vec::new();
        let walker = WalkDir::new(&source_dir)
            .follow_links(true)
            .into_iter()
            .filter_entry(|entry| entry.depth() == 0 || !is_skipped(entry.file_name().to_string_lossy().as_ref()));

        for entry in walker {
            let entry = entry.map_err(|err| TemplateError::Io {
                path: err.path().map_or_else(|| source_dir.clone(), Path::to_path_buf),
                source: err.into(),
            })?;
            if entry.file_type().is_file()
                && self.is_template_file(entry.path())
                && let Ok(relative) = entry.path().strip_prefix(&source_dir)
            {
                files.push(relative.to_path_buf());
            }
        }
        files.sort();
        tracing::debug!(dir = %source_dir.display(), count = files.len(), "discovered template files");
        Ok(files)
    }

    pub fn read_source(&self, relative: &Path) -> TemplateResult<String> {
        let path = self.source_dir().join(relative);
        std::fs::read_to_string(&path).map_err(|source| TemplateError::Io { path, source })
    }

    pub fn sub_path_for(&self, relative: &Path) -> SubPath {
        sub_path_for(self.config.namespace.as_deref(), relative)
    }
}

fn is_skipped(name: &str) -> bool {
    name.starts_with('.') || SKIPPED_DIRS.contains(&name)
}

/// Namespace path of a template file: the logical module, then the
/// directories between the source root and the file.
pub fn sub_path_for(namespace: Option<&str>, relative: &Path) -> SubPath {
    let mut segments: Vec<String> = namespace.map(|ns| SubPath::parse(ns).segments().to_vec()).unwrap_or_default();
    if let Some(parent) = relative.parent() {
        segments.extend(parent.components().filter_map(|c| match c {
            Component::Normal(s) => Some(s.to_string_lossy().into_owned()),
            _ => None,
        }));
    }
    SubPath::new(segments)
}
