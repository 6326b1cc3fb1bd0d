//! Filesystem watching for template sources
//!
//! Detects when template files change on disk so the hot reloader can
//! recompile them. Rapid saves are batched by the debouncer.

use std::path::{Path, PathBuf};
use std::time::Duration;

use notify::RecursiveMode;
use notify_debouncer_mini::{DebouncedEvent, Debouncer, new_debouncer};
use tagsmith_templates::Project;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::error::ReloadError;

/// A template file changed on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchEvent {
    pub path: PathBuf,
    /// The file no longer exists
    pub deleted: bool,
}

impl WatchEvent {
    pub fn modified(path: impl Into<PathBuf>) -> Self {
        WatchEvent {
            path: path.into(),
            deleted: false,
        }
    }

    pub fn deleted(path: impl Into<PathBuf>) -> Self {
        WatchEvent {
            path: path.into(),
            deleted: true,
        }
    }
}

/// Watches a template source directory.
pub struct FileWatcher {
    _debouncer: Debouncer<notify::RecommendedWatcher>,
    event_rx: mpsc::UnboundedReceiver<WatchEvent>,
}

impl FileWatcher {
    /// Watch the project's source directory using its configured debounce.
    pub fn for_project(project: &Project) -> Result<Self, ReloadError> {
        Self::new(
            &project.source_dir(),
            &project.config.extension,
            project.config.debounce(),
        )
    }

    /// Recursively watch `dir` for files with the given extension.
    pub fn new(dir: &Path, extension: &str, debounce: Duration) -> Result<Self, ReloadError> {
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let extension = extension.to_string();

        let mut debouncer = new_debouncer(
            debounce,
            move |res: Result<Vec<DebouncedEvent>, notify::Error>| match res {
                Ok(events) => {
                    for event in events {
                        if !has_extension(&event.path, &extension) {
                            continue;
                        }
                        let deleted = !event.path.exists();
                        debug!(path = %event.path.display(), deleted, "template change detected");
                        if event_tx
                            .send(WatchEvent {
                                path: event.path,
                                deleted,
                            })
                            .is_err()
                        {
                            debug!("event receiver dropped, stopping watcher");
                            break;
                        }
                    }
                }
                Err(e) => {
                    warn!(error = %e, "filesystem watch error");
                }
            },
        )?;

        debouncer.watcher().watch(dir, RecursiveMode::Recursive)?;

        info!(
            path = %dir.display(),
            debounce_ms = debounce.as_millis() as u64,
            "started template watcher"
        );

        Ok(Self {
            _debouncer: debouncer,
            event_rx,
        })
    }

    /// Receive the next watch event.
    ///
    /// Returns `None` once the watcher has stopped.
    pub async fn recv(&mut self) -> Option<WatchEvent> {
        self.event_rx.recv().await
    }
}

fn has_extension(path: &Path, extension: &str) -> bool {
    path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case(extension))
}
