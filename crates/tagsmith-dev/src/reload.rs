//! Applying watch events to the live registry.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tagsmith_source_map::SourceContext;
use tagsmith_templates::diagnostics::resolve;
use tagsmith_templates::error::path_key;
use tagsmith_templates::layout::REGISTRY_STATIC;
use tagsmith_templates::{
    BuildOutput, BuildSettings, CompileOutcome, CompileRequest, HostCompiler, LoadedRegistry,
    ModuleLoader, Project, RebuildSummary, WriteSummary, build,
};
use tracing::{debug, error, info, warn};

use crate::error::ReloadError;
use crate::live::{LiveRegistry, LiveState};
use crate::watch::{FileWatcher, WatchEvent};

/// What a successful [`HotReloader::apply`] did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReloadOutcome {
    /// Not a template file, or nothing changed
    Ignored,
    /// One file was recompiled incrementally
    Rebuilt {
        summary: RebuildSummary,
        written: WriteSummary,
    },
    /// Every template was rebuilt from source
    FullRebuild { written: WriteSummary },
}

/// Recompiles changed templates and publishes the result.
pub struct HotReloader {
    project: Project,
    live: LiveRegistry,
    compiler: Option<Arc<dyn HostCompiler>>,
    loader: Option<Arc<dyn ModuleLoader>>,
}

impl HotReloader {
    /// A reloader with an empty live state; call [`HotReloader::initialize`]
    /// before serving.
    pub fn new(project: Project) -> Self {
        let settings = BuildSettings::from(&project.config);
        let empty = BuildOutput {
            settings: Some(Arc::new(settings)),
            ..BuildOutput::default()
        };
        HotReloader {
            project,
            live: LiveRegistry::new(LiveState::new(empty)),
            compiler: None,
            loader: None,
        }
    }

    pub fn with_compiler(mut self, compiler: Arc<dyn HostCompiler>) -> Self {
        self.compiler = Some(compiler);
        self
    }

    pub fn with_loader(mut self, loader: Arc<dyn ModuleLoader>) -> Self {
        self.loader = Some(loader);
        self
    }

    pub fn project(&self) -> &Project {
        &self.project
    }

    /// Handle for readers of the active registry.
    pub fn live(&self) -> &LiveRegistry {
        &self.live
    }

    /// Full build of the project, published on success.
    pub fn initialize(&self) -> Result<WriteSummary, Arc<ReloadError>> {
        let result = self.full_build().and_then(|next| self.finish(next));
        match result {
            Ok((state, written)) => {
                self.live.publish(state);
                Ok(written)
            }
            Err(err) => Err(self.fail(err)),
        }
    }

    /// Apply one watch event.
    ///
    /// On failure the previous build stays active and the error is recorded
    /// in the live state.
    pub fn apply(&self, event: &WatchEvent) -> Result<ReloadOutcome, Arc<ReloadError>> {
        let Some(relative) = self.project.relative(&event.path) else {
            debug!(path = %event.path.display(), "ignoring change outside the template directory");
            return Ok(ReloadOutcome::Ignored);
        };
        if !self.project.is_template_file(&relative) {
            return Ok(ReloadOutcome::Ignored);
        }

        let current = self.live.snapshot();
        match self.reload(&current, &event.path, relative, event.deleted) {
            Ok(None) => Ok(ReloadOutcome::Ignored),
            Ok(Some((state, outcome))) => {
                self.live.publish(state);
                Ok(outcome)
            }
            Err(err) => Err(self.fail(err)),
        }
    }

    /// Process watcher events until the watcher stops.
    ///
    /// Each event is applied on the blocking pool so that host compilation
    /// does not stall the runtime; events are still handled one at a time.
    pub async fn run(self: Arc<Self>, mut watcher: FileWatcher) {
        info!(dir = %self.project.source_dir().display(), "hot reload running");
        while let Some(event) = watcher.recv().await {
            let reloader = Arc::clone(&self);
            let task = tokio::task::spawn_blocking(move || reloader.apply(&event));
            match task.await {
                Ok(Ok(ReloadOutcome::Ignored)) => {}
                Ok(Ok(outcome)) => debug!(?outcome, "reload applied"),
                Ok(Err(_)) => {}
                Err(join) => {
                    self.fail(ReloadError::Task(join.to_string()));
                }
            }
        }
        info!("template watcher stopped");
    }

    fn reload(
        &self,
        current: &LiveState,
        path: &Path,
        relative: PathBuf,
        deleted: bool,
    ) -> Result<Option<(LiveState, ReloadOutcome)>, ReloadError> {
        let source = if deleted {
            None
        } else {
            match std::fs::read_to_string(path) {
                Ok(source) => Some(source),
                Err(err) if err.kind() == std::io::ErrorKind::NotFound => None,
                Err(source) => {
                    return Err(ReloadError::Read {
                        path: path.to_path_buf(),
                        source,
                    });
                }
            }
        };

        // A degraded state may hold a build that never saw some files, so
        // recover from scratch.
        if current.is_degraded() {
            info!(file = %relative.display(), "rebuilding all templates after earlier failure");
            let next = self.full_build()?;
            let (state, written) = self.finish(next)?;
            return Ok(Some((state, ReloadOutcome::FullRebuild { written })));
        }

        let Some(source) = source else {
            if !current.build.sources.contains_key(&relative) {
                return Ok(None);
            }
            info!(file = %relative.display(), "template removed, rebuilding");
            let (next, report) = current.build.remove_file(&relative);
            if !report.is_ok() {
                let sources = next.source_context();
                return Err(ReloadError::Build { report, sources });
            }
            let (state, written) = self.finish(next)?;
            return Ok(Some((state, ReloadOutcome::FullRebuild { written })));
        };

        if current
            .build
            .sources
            .get(&relative)
            .is_some_and(|previous| previous.as_ref() == source)
        {
            debug!(file = %relative.display(), "template unchanged");
            return Ok(None);
        }

        let (next, summary) = current
            .build
            .rebuild_file(&relative, &source)
            .map_err(|report| ReloadError::Build {
                report,
                sources: edited_context(&current.build, &relative, &source),
            })?;
        let (state, written) = self.finish(next)?;
        Ok(Some((state, ReloadOutcome::Rebuilt { summary, written })))
    }

    fn full_build(&self) -> Result<BuildOutput, ReloadError> {
        let (next, report) = build(&self.project)?;
        if !report.is_ok() {
            let sources = next.source_context();
            return Err(ReloadError::Build { report, sources });
        }
        Ok(next)
    }

    /// Write, compile and load `next`, producing the state to publish.
    fn finish(&self, next: BuildOutput) -> Result<(LiveState, WriteSummary), ReloadError> {
        let output_dir = self.project.output_dir();
        let written = next.write(&output_dir)?;

        if let Some(compiler) = &self.compiler {
            let request = CompileRequest::for_build(&self.project, &next);
            if let CompileOutcome::Failed(errors) = compiler.compile(&request)? {
                let errors = resolve(&next.generated_sources(&output_dir), &errors);
                let sources = next.source_context();
                return Err(ReloadError::Compile { errors, sources });
            }
        }

        let loaded: Option<Arc<dyn LoadedRegistry>> = match &self.loader {
            Some(loader) => Some(loader.load(&self.registry_name())?),
            None => None,
        };

        info!(
            templates = next.registry.len(),
            written = written.written.len(),
            removed = written.removed.len(),
            "publishing templates"
        );
        let state = LiveState {
            build: Arc::new(next),
            loaded,
            ..LiveState::default()
        };
        Ok((state, written))
    }

    fn registry_name(&self) -> String {
        format!("{}::{}", self.project.config.root_module, REGISTRY_STATIC)
    }

    fn fail(&self, err: ReloadError) -> Arc<ReloadError> {
        match &err {
            ReloadError::Build { .. } | ReloadError::Compile { .. } => {
                warn!(error = %err, "reload failed, keeping previous templates");
                for diagnostic in err.diagnostics() {
                    warn!("{}", diagnostic.to_text(err.sources()));
                }
            }
            _ => error!(error = %err, "reload failed, keeping previous templates"),
        }
        let err = Arc::new(err);
        self.live.record_error(Arc::clone(&err));
        err
    }
}

/// Source context of `build` with `relative` replaced by its edited text.
fn edited_context(build: &BuildOutput, relative: &Path, source: &str) -> SourceContext {
    let mut ctx = SourceContext::new();
    for (path, text) in build.sources.iter().filter(|(path, _)| path.as_path() != relative) {
        ctx.add_file(path_key(path), Some(text.to_string()));
    }
    ctx.add_file(path_key(relative), Some(source.to_string()));
    ctx
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tagsmith_templates::{CompilerError, HostError, ProjectConfig};
    use tempfile::TempDir;

    fn project(files: &[(&str, &str)]) -> (TempDir, Project) {
        let temp = TempDir::new().unwrap();
        let source_dir = temp.path().join("templates");
        std::fs::create_dir_all(&source_dir).unwrap();
        for (path, source) in files {
            let path = source_dir.join(path);
            std::fs::create_dir_all(path.parent().unwrap()).unwrap();
            std::fs::write(path, source).unwrap();
        }
        let project = Project::with_config(temp.path(), ProjectConfig::default()).unwrap();
        (temp, project)
    }

    fn write(project: &Project, path: &str, source: &str) -> WatchEvent {
        let path = project.source_dir().join(path);
        std::fs::write(&path, source).unwrap();
        WatchEvent::modified(path)
    }

    struct RejectingCompiler;

    impl HostCompiler for RejectingCompiler {
        fn compile(&self, request: &CompileRequest) -> Result<CompileOutcome, HostError> {
            let file = request
                .sources
                .iter()
                .find(|p| p.ends_with("my_card.rs"))
                .cloned()
                .unwrap_or_default();
            Ok(CompileOutcome::Failed(vec![CompilerError {
                message: "mismatched types".to_string(),
                file,
                line: 1,
                column: 1,
            }]))
        }
    }

    const CARD: &str = "<my-card title=\"&str\" fragment><h1>${title}</h1></my-card>";

    #[test]
    fn initialize_publishes_and_writes() {
        let (_temp, project) = project(&[("card.html", CARD)]);
        let reloader = HotReloader::new(project);
        let written = reloader.initialize().unwrap();

        assert_eq!(
            written.written,
            vec![PathBuf::from("mod.rs"), PathBuf::from("my_card.rs")]
        );
        let state = reloader.live().snapshot();
        assert!(state.registry().contains_name("my-card"));
        assert!(!state.is_degraded());
        assert!(reloader.project().output_dir().join("my_card.rs").is_file());
    }

    #[test]
    fn modified_file_is_rebuilt_incrementally() {
        let (_temp, project) = project(&[
            ("card.html", CARD),
            ("page.html", "<home-page><my-card title=\"Hi\"/></home-page>"),
            ("other.html", "<other-thing></other-thing>"),
        ]);
        let reloader = HotReloader::new(project);
        reloader.initialize().unwrap();

        let event = write(
            reloader.project(),
            "card.html",
            "<my-card title=\"&str\" fragment><h2>${title}</h2></my-card>",
        );
        let outcome = reloader.apply(&event).unwrap();

        let ReloadOutcome::Rebuilt { summary, written } = outcome else {
            panic!("expected an incremental rebuild, got {:?}", outcome);
        };
        let regenerated: Vec<String> = summary.regenerated.iter().map(|k| k.name.clone()).collect();
        assert_eq!(regenerated, vec!["my-card", "home-page"]);
        assert_eq!(written.written, vec![PathBuf::from("my_card.rs")]);
        assert_eq!(reloader.live().snapshot().generation, 2);
    }

    #[test]
    fn unchanged_and_foreign_files_are_ignored() {
        let (temp, project) = project(&[("card.html", CARD)]);
        let reloader = HotReloader::new(project);
        reloader.initialize().unwrap();

        let same = write(reloader.project(), "card.html", CARD);
        assert_eq!(reloader.apply(&same).unwrap(), ReloadOutcome::Ignored);

        let notes = write(reloader.project(), "notes.txt", "hello");
        assert_eq!(reloader.apply(&notes).unwrap(), ReloadOutcome::Ignored);

        let outside = WatchEvent::modified(temp.path().join("README.html"));
        assert_eq!(reloader.apply(&outside).unwrap(), ReloadOutcome::Ignored);
        assert_eq!(reloader.live().snapshot().generation, 1);
    }

    #[test]
    fn broken_edit_keeps_previous_build() {
        let (_temp, project) = project(&[("card.html", CARD)]);
        let reloader = HotReloader::new(project);
        reloader.initialize().unwrap();
        let before = reloader.live().snapshot();

        let event = write(reloader.project(), "card.html", "<my-card><p></my-card>");
        let err = reloader.apply(&event).unwrap_err();
        assert!(matches!(err.as_ref(), ReloadError::Build { .. }));
        let codes: Vec<_> = err.diagnostics().iter().map(|d| d.code.clone()).collect();
        assert_eq!(codes, vec![Some("T-1-1".to_string())]);

        let after = reloader.live().snapshot();
        assert!(after.is_degraded());
        assert!(Arc::ptr_eq(&before.build, &after.build));

        // Fixing the file recovers with a full rebuild.
        let event = write(reloader.project(), "card.html", CARD);
        let outcome = reloader.apply(&event).unwrap();
        assert!(matches!(outcome, ReloadOutcome::FullRebuild { .. }));
        assert!(!reloader.live().snapshot().is_degraded());
    }

    #[test]
    fn deleted_file_triggers_full_rebuild() {
        let (_temp, project) = project(&[("card.html", CARD), ("other.html", "<other-thing></other-thing>")]);
        let reloader = HotReloader::new(project);
        reloader.initialize().unwrap();

        let path = reloader.project().source_dir().join("card.html");
        std::fs::remove_file(&path).unwrap();
        let outcome = reloader.apply(&WatchEvent::deleted(path)).unwrap();

        let ReloadOutcome::FullRebuild { written } = outcome else {
            panic!("expected a full rebuild, got {:?}", outcome);
        };
        assert_eq!(written.removed, vec![PathBuf::from("my_card.rs")]);
        let state = reloader.live().snapshot();
        assert!(!state.registry().contains_name("my-card"));
        assert!(state.registry().contains_name("other-thing"));
    }

    #[test]
    fn deleting_a_provider_in_use_fails() {
        let (_temp, project) = project(&[
            ("card.html", CARD),
            ("page.html", "<home-page><my-card title=\"Hi\"/></home-page>"),
        ]);
        let reloader = HotReloader::new(project);
        reloader.initialize().unwrap();

        let path = reloader.project().source_dir().join("card.html");
        std::fs::remove_file(&path).unwrap();
        let err = reloader.apply(&WatchEvent::deleted(path)).unwrap_err();

        let codes: Vec<_> = err.diagnostics().iter().map(|d| d.code.clone()).collect();
        assert_eq!(codes, vec![Some("T-2-1".to_string())]);
        assert!(reloader.live().snapshot().registry().contains_name("my-card"));
    }

    #[test]
    fn host_compiler_errors_are_remapped() {
        let (_temp, project) = project(&[("card.html", CARD)]);
        let reloader = HotReloader::new(project).with_compiler(Arc::new(RejectingCompiler));

        let err = reloader.initialize().unwrap_err();
        let ReloadError::Compile { errors, .. } = err.as_ref() else {
            panic!("expected compile errors, got {:?}", err);
        };
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].template_file.as_deref(), Some(Path::new("card.html")));
        assert_eq!(errors[0].messages, vec!["mismatched types".to_string()]);
        assert!(reloader.live().snapshot().is_degraded());
    }
}
