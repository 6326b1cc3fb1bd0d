//! The active template registry shared with request handlers.
//!
//! Readers take a snapshot and keep using it for as long as they like; a
//! reload builds a complete new [`LiveState`] and swaps it in. A reader
//! therefore sees either the old state or the new one, never a mix.

use std::sync::{Arc, PoisonError, RwLock};

use tagsmith_templates::{BuildOutput, LoadedRegistry, Registry};

use crate::error::ReloadError;

/// One published state of the dev server.
#[derive(Clone, Default)]
pub struct LiveState {
    pub build: Arc<BuildOutput>,
    /// Compiled registry object, when a module loader is configured
    pub loaded: Option<Arc<dyn LoadedRegistry>>,
    /// Set while the sources are broken; `build` is then the last good one
    pub last_error: Option<Arc<ReloadError>>,
    /// Incremented on every successful publish
    pub generation: u64,
}

impl LiveState {
    pub fn new(build: BuildOutput) -> Self {
        LiveState {
            build: Arc::new(build),
            ..LiveState::default()
        }
    }

    pub fn registry(&self) -> &Registry {
        &self.build.registry
    }

    pub fn is_degraded(&self) -> bool {
        self.last_error.is_some()
    }
}

impl std::fmt::Debug for LiveState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LiveState")
            .field("templates", &self.build.registry.len())
            .field("loaded", &self.loaded.as_ref().map(|r| r.name().to_string()))
            .field("last_error", &self.last_error)
            .field("generation", &self.generation)
            .finish()
    }
}

/// Shared handle to the current [`LiveState`].
#[derive(Debug, Clone, Default)]
pub struct LiveRegistry {
    state: Arc<RwLock<Arc<LiveState>>>,
}

impl LiveRegistry {
    pub fn new(state: LiveState) -> Self {
        LiveRegistry {
            state: Arc::new(RwLock::new(Arc::new(state))),
        }
    }

    /// The current state. The lock is held only to clone the `Arc`.
    pub fn snapshot(&self) -> Arc<LiveState> {
        let guard = self.state.read().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&*guard)
    }

    /// Replace the current state, clearing any recorded error.
    pub fn publish(&self, mut state: LiveState) {
        let mut guard = self.state.write().unwrap_or_else(PoisonError::into_inner);
        state.generation = guard.generation + 1;
        state.last_error = None;
        *guard = Arc::new(state);
    }

    /// Keep the current build but enter error-display mode.
    pub fn record_error(&self, error: Arc<ReloadError>) {
        let mut guard = self.state.write().unwrap_or_else(PoisonError::into_inner);
        let mut state = LiveState::clone(&**guard);
        state.last_error = Some(error);
        *guard = Arc::new(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::path::PathBuf;
    use tagsmith_templates::{BuildSettings, build_sources};

    fn build(source: &str) -> BuildOutput {
        let (output, report) = build_sources(
            vec![(PathBuf::from("card.html"), source.to_string())],
            &BuildSettings::default(),
        );
        assert!(report.is_ok(), "{:?}", report.errors);
        output
    }

    #[test]
    fn snapshots_are_stable_across_publish() {
        let live = LiveRegistry::new(LiveState::new(build("<my-card></my-card>")));
        let before = live.snapshot();

        live.publish(LiveState::new(build("<other-card></other-card>")));

        let after = live.snapshot();
        assert!(before.registry().contains_name("my-card"));
        assert!(!after.registry().contains_name("my-card"));
        assert!(after.registry().contains_name("other-card"));
        assert_eq!(after.generation, before.generation + 1);
    }

    #[test]
    fn recorded_error_keeps_build() {
        let live = LiveRegistry::new(LiveState::new(build("<my-card></my-card>")));
        live.record_error(Arc::new(ReloadError::Task("boom".to_string())));

        let state = live.snapshot();
        assert!(state.is_degraded());
        assert!(state.registry().contains_name("my-card"));

        live.publish(LiveState::new(build("<my-card></my-card>")));
        assert!(!live.snapshot().is_degraded());
    }
}
