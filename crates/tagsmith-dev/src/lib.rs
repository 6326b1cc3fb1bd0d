//! tagsmith-dev: hot reload for tagsmith templates
//!
//! This crate provides:
//! - A debounced filesystem watcher for template sources
//! - A shared live registry that request handlers snapshot
//! - A reloader that recompiles changed templates and swaps the registry
//!   only when the whole pipeline succeeded

pub mod error;
pub mod live;
pub mod reload;
pub mod watch;

pub use error::ReloadError;
pub use live::{LiveRegistry, LiveState};
pub use reload::{HotReloader, ReloadOutcome};
pub use watch::{FileWatcher, WatchEvent};
