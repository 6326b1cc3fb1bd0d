/*
 * build.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Batch and incremental builds.
//!
//! A batch build compiles every template file, registers every template,
//! then generates code for every template against the finished registry.
//! Per-file and per-template errors are collected in a [`BuildReport`] so
//! that one broken template does not hide problems in the others.
//!
//! Incremental rebuilds produce a new [`BuildOutput`]; the previous output
//! is never modified.

use crate::codegen::{GenerateOptions, generate};
use crate::compile::compile_file;
use crate::config::ProjectConfig;
use crate::diagnostics::GeneratedSource;
use crate::emit::emit;
use crate::error::{TemplateError, TemplateResult, path_key};
use crate::layout::{GENERATED_HEADER, TemplateLayout, registry_files};
use crate::model::{Template, TemplateKey};
use crate::project::{Project, sub_path_for};
use crate::registry::Registry;
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tagsmith_source_map::SourceContext;
use walkdir::WalkDir;

/// Settings a build needs from the project configuration.
#[derive(Debug, Clone)]
pub struct BuildSettings {
    pub root_module: String,
    pub namespace: Option<String>,
    pub options: GenerateOptions,
}

impl Default for BuildSettings {
    fn default() -> Self {
        BuildSettings::from(&ProjectConfig::default())
    }
}

impl From<&ProjectConfig> for BuildSettings {
    fn from(config: &ProjectConfig) -> Self {
        BuildSettings {
            root_module: config.root_module.clone(),
            namespace: config.namespace.clone(),
            options: GenerateOptions {
                passthrough_elements: config.passthrough_elements.iter().cloned().collect(),
            },
        }
    }
}

/// One generated Rust file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedFile {
    /// Path relative to the output directory
    pub path: PathBuf,
    pub contents: String,
    /// Template the file was generated from; `None` for registry objects
    pub template: Option<TemplateKey>,
}

/// Errors collected during a build.
#[derive(Debug, Default)]
pub struct BuildReport {
    pub errors: Vec<TemplateError>,
}

impl BuildReport {
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }
}

/// What an incremental rebuild regenerated.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RebuildSummary {
    pub file: PathBuf,
    pub regenerated: Vec<TemplateKey>,
}

/// What [`BuildOutput::write`] did on disk.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteSummary {
    pub written: Vec<PathBuf>,
    pub unchanged: usize,
    pub removed: Vec<PathBuf>,
}

/// Result of a build: templates, registry snapshot and generated files.
#[derive(Debug, Clone, Default)]
pub struct BuildOutput {
    /// Source text of every template file, keyed by relative path
    pub sources: BTreeMap<PathBuf, Arc<str>>,
    /// Templates of every file that compiled
    pub templates: BTreeMap<PathBuf, Vec<Arc<Template>>>,
    pub registry: Registry,
    pub files: BTreeMap<PathBuf, GeneratedFile>,
    /// Tag names each template looked up while generating
    pub referenced: BTreeMap<TemplateKey, BTreeSet<String>>,
    pub settings: Option<Arc<BuildSettings>>,
}

/// Build every template file of a project.
///
/// Infrastructure failures (the source tree cannot be listed) are returned
/// as `Err`; template errors are collected in the report.
pub fn build(project: &Project) -> TemplateResult<(BuildOutput, BuildReport)> {
    let files = project.discover()?;
    let mut report = BuildReport::default();
    let mut sources = Vec::with_capacity(files.len());
    for file in files {
        match project.read_source(&file) {
            Ok(source) => sources.push((file, source)),
            Err(err) => report.errors.push(err),
        }
    }
    let (output, build_report) = build_sources(sources, &BuildSettings::from(&project.config));
    report.errors.extend(build_report.errors);
    Ok((output, report))
}

/// Build from in-memory sources keyed by path relative to the source root.
pub fn build_sources(
    sources: impl IntoIterator<Item = (PathBuf, String)>,
    settings: &BuildSettings,
) -> (BuildOutput, BuildReport) {
    let mut report = BuildReport::default();
    let mut output = BuildOutput {
        settings: Some(Arc::new(settings.clone())),
        ..BuildOutput::default()
    };

    for (file, source) in sources {
        let sub_path = sub_path_for(settings.namespace.as_deref(), &file);
        match compile_file(&file, &source, &sub_path) {
            Ok(templates) => {
                output
                    .templates
                    .insert(file.clone(), templates.into_iter().map(Arc::new).collect());
            }
            Err(err) => report.errors.push(err),
        }
        output.sources.insert(file, Arc::from(source));
    }

    let mut builder = Registry::builder();
    for templates in output.templates.values() {
        for template in templates {
            if let Err(err) = builder.register(template.definition(&settings.root_module)) {
                report.errors.push(err);
            }
        }
    }
    output.registry = builder.build();

    let all: Vec<Arc<Template>> = output.templates.values().flatten().cloned().collect();
    for template in &all {
        if let Err(err) = output.generate_template(template, settings) {
            report.errors.push(err);
        }
    }
    if let Err(err) = output.regenerate_registry_files(settings) {
        report.errors.push(err);
    }

    tracing::info!(
        files = output.sources.len(),
        templates = all.len(),
        generated = output.files.len(),
        errors = report.len(),
        "build finished"
    );
    (output, report)
}

impl BuildOutput {
    pub fn template(&self, key: &TemplateKey) -> Option<&Arc<Template>> {
        self.templates.values().flatten().find(|t| &t.key() == key)
    }

    pub fn all_templates(&self) -> impl Iterator<Item = &Arc<Template>> {
        self.templates.values().flatten()
    }

    fn settings(&self) -> Arc<BuildSettings> {
        self.settings.clone().unwrap_or_default()
    }

    fn generate_template(&mut self, template: &Arc<Template>, settings: &BuildSettings) -> TemplateResult<()> {
        let key = template.key();
        let layout = TemplateLayout::new(&settings.root_module, &template.sub_path, &template.name);
        let path = layout.relative_path();

        let generated = generate(template, &self.registry, &settings.options);
        // Whatever the template referenced, it depends on those names.
        match generated {
            Ok(generated) => {
                self.referenced.insert(key.clone(), generated.referenced.clone());
                let contents = emit(template, &generated);
                self.files.insert(
                    path.clone(),
                    GeneratedFile {
                        path,
                        contents,
                        template: Some(key),
                    },
                );
                Ok(())
            }
            Err(err) => {
                self.files.remove(&path);
                Err(err)
            }
        }
    }

    fn regenerate_registry_files(&mut self, settings: &BuildSettings) -> TemplateResult<()> {
        self.files.retain(|_, f| f.template.is_some());
        let definitions: Vec<_> = self.registry.definitions().map(|d| d.as_ref()).collect();
        for (path, contents) in registry_files(&definitions, &settings.root_module)? {
            self.files.insert(
                path.clone(),
                GeneratedFile {
                    path,
                    contents,
                    template: None,
                },
            );
        }
        Ok(())
    }

    /// Recompile one changed file against this output.
    ///
    /// The file's definitions are replaced in a new registry snapshot, and
    /// the file's templates are regenerated together with every template
    /// that looked up one of the file's old or new template names.
    pub fn rebuild_file(&self, file: &Path, source: &str) -> Result<(BuildOutput, RebuildSummary), BuildReport> {
        let settings = self.settings();
        let sub_path = sub_path_for(settings.namespace.as_deref(), file);
        let fail = |err: TemplateError| BuildReport { errors: vec![err] };

        let templates: Vec<Arc<Template>> = compile_file(file, source, &sub_path)
            .map_err(fail)?
            .into_iter()
            .map(Arc::new)
            .collect();

        let mut builder = self.registry.to_builder();
        let removed = builder.remove_file(file);
        for template in &templates {
            builder
                .register(template.definition(&settings.root_module))
                .map_err(fail)?;
        }

        let mut next = self.clone();
        next.registry = builder.build();
        next.sources.insert(file.to_path_buf(), Arc::from(source));

        let names: HashSet<String> = removed
            .iter()
            .map(|k| k.name.clone())
            .chain(templates.iter().map(|t| t.name.clone()))
            .collect();

        for key in &removed {
            next.referenced.remove(key);
            let layout = TemplateLayout::new(&settings.root_module, &key.sub_path, &key.name);
            next.files.remove(&layout.relative_path());
        }
        if templates.is_empty() {
            next.templates.remove(file);
        } else {
            next.templates.insert(file.to_path_buf(), templates.clone());
        }

        let dependents: Vec<Arc<Template>> = next
            .all_templates()
            .filter(|t| t.file != file)
            .filter(|t| {
                next.referenced
                    .get(&t.key())
                    .is_some_and(|refs| refs.iter().any(|name| names.contains(name)))
            })
            .cloned()
            .collect();

        let mut report = BuildReport::default();
        let mut regenerated = Vec::new();
        for template in templates.iter().chain(dependents.iter()) {
            match next.generate_template(template, &settings) {
                Ok(()) => regenerated.push(template.key()),
                Err(err) => report.errors.push(err),
            }
        }
        if let Err(err) = next.regenerate_registry_files(&settings) {
            report.errors.push(err);
        }
        if !report.is_ok() {
            return Err(report);
        }

        tracing::info!(
            file = %file.display(),
            regenerated = regenerated.len(),
            "incremental rebuild finished"
        );
        Ok((
            next,
            RebuildSummary {
                file: file.to_path_buf(),
                regenerated,
            },
        ))
    }

    /// Rebuild from every retained source except `file`.
    pub fn remove_file(&self, file: &Path) -> (BuildOutput, BuildReport) {
        let sources = self
            .sources
            .iter()
            .filter(|(path, _)| path.as_path() != file)
            .map(|(path, source)| (path.clone(), source.to_string()));
        build_sources(sources, &self.settings())
    }

    /// Generated files together with their templates, with paths under
    /// `output_dir`, for diagnostic remapping.
    pub fn generated_sources(&self, output_dir: &Path) -> Vec<GeneratedSource> {
        self.files
            .values()
            .filter_map(|file| {
                let template = self.template(file.template.as_ref()?)?;
                Some(GeneratedSource {
                    path: output_dir.join(&file.path),
                    contents: file.contents.clone(),
                    template: template.clone(),
                })
            })
            .collect()
    }

    /// Source context with every template file registered under its
    /// relative path.
    pub fn source_context(&self) -> SourceContext {
        let mut ctx = SourceContext::new();
        for (path, source) in &self.sources {
            ctx.add_file(path_key(path), Some(source.to_string()));
        }
        ctx
    }

    /// Write all generated files below `output_dir`, skipping unchanged
    /// files and removing stale generated ones.
    pub fn write(&self, output_dir: &Path) -> TemplateResult<WriteSummary> {
        let io = |path: &Path| {
            let path = path.to_path_buf();
            move |source| TemplateError::Io { path, source }
        };
        let mut summary = WriteSummary::default();

        for file in self.files.values() {
            let path = output_dir.join(&file.path);
            if std::fs::read_to_string(&path).is_ok_and(|existing| existing == file.contents) {
                summary.unchanged += 1;
                continue;
            }
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent).map_err(io(parent))?;
            }
            std::fs::write(&path, &file.contents).map_err(io(&path))?;
            summary.written.push(file.path.clone());
        }

        for entry in WalkDir::new(output_dir).into_iter().filter_map(Result::ok) {
            let path = entry.path();
            if !entry.file_type().is_file() || path.extension().is_none_or(|ext| ext != "rs") {
                continue;
            }
            let Ok(relative) = path.strip_prefix(output_dir) else {
                continue;
            };
            if self.files.contains_key(relative) {
                continue;
            }
            let generated = std::fs::read_to_string(path).is_ok_and(|c| c.starts_with(GENERATED_HEADER));
            if generated {
                std::fs::remove_file(path).map_err(io(path))?;
                tracing::debug!(path = %path.display(), "removed stale generated file");
                summary.removed.push(relative.to_path_buf());
            }
        }

        tracing::info!(
            dir = %output_dir.display(),
            written = summary.written.len(),
            unchanged = summary.unchanged,
            removed = summary.removed.len(),
            "wrote generated files"
        );
        Ok(summary)
    }
}
