//! End-to-end hot reload: watcher events flowing into the live registry.

use std::sync::Arc;
use std::time::Duration;

use tagsmith_dev::{FileWatcher, HotReloader};
use tagsmith_runtime::Registry;
use tagsmith_templates::{LoadError, Project, ProjectConfig, StaticLoader};
use tempfile::TempDir;

static COMPILED: Registry = Registry {
    name: "crate::templates::REGISTRY",
    namespaces: &[],
};

fn project(files: &[(&str, &str)]) -> (TempDir, Project) {
    let temp = TempDir::new().unwrap();
    // Canonicalize to handle macOS /var -> /private/var symlinks
    let root = temp.path().canonicalize().unwrap();
    let source_dir = root.join("templates");
    std::fs::create_dir_all(&source_dir).unwrap();
    for (path, source) in files {
        std::fs::write(source_dir.join(path), source).unwrap();
    }
    let project = Project::with_config(root, ProjectConfig::default()).unwrap();
    (temp, project)
}

async fn wait_for_generation(reloader: &HotReloader, generation: u64) {
    for _ in 0..40 {
        if reloader.live().snapshot().generation >= generation {
            return;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    panic!("live registry never reached generation {}", generation);
}

#[tokio::test]
async fn run_loop_publishes_edits() {
    let (_temp, project) = project(&[("card.html", "<my-card></my-card>")]);
    let reloader = Arc::new(HotReloader::new(project));
    reloader.initialize().unwrap();

    let watcher = FileWatcher::new(
        &reloader.project().source_dir(),
        "html",
        Duration::from_millis(50),
    )
    .unwrap();
    let task = tokio::spawn(Arc::clone(&reloader).run(watcher));

    std::fs::write(
        reloader.project().source_dir().join("badge.html"),
        "<my-badge label=\"&str\" fragment><span>${label}</span></my-badge>",
    )
    .unwrap();

    wait_for_generation(&reloader, 2).await;
    let state = reloader.live().snapshot();
    assert!(state.registry().contains_name("my-badge"));
    assert!(state.registry().contains_name("my-card"));
    assert!(
        reloader
            .project()
            .output_dir()
            .join("my_badge.rs")
            .is_file()
    );

    task.abort();
}

#[test]
fn loader_result_is_published() {
    let (_temp, project) = project(&[("card.html", "<my-card fragment></my-card>")]);
    let loader = StaticLoader::new().with_registry(COMPILED);
    let reloader = HotReloader::new(project).with_loader(Arc::new(loader));

    reloader.initialize().unwrap();

    let state = reloader.live().snapshot();
    let loaded = state.loaded.as_ref().unwrap();
    assert_eq!(loaded.name(), "crate::templates::REGISTRY");
}

#[test]
fn missing_registry_is_an_error() {
    let mut config = ProjectConfig::default();
    config.root_module = "crate::views".to_string();
    let temp = TempDir::new().unwrap();
    std::fs::create_dir_all(temp.path().join("templates")).unwrap();
    let project = Project::with_config(temp.path(), config).unwrap();

    let loader = StaticLoader::new().with_registry(COMPILED);
    let reloader = HotReloader::new(project).with_loader(Arc::new(loader));

    let err = reloader.initialize().unwrap_err();
    match err.as_ref() {
        tagsmith_dev::ReloadError::Load(LoadError::NotFound(name)) => {
            assert_eq!(name, "crate::views::REGISTRY");
        }
        other => panic!("unexpected error: {:?}", other),
    }
    assert!(reloader.live().snapshot().is_degraded());
}
