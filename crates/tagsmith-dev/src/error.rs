//! Error types for hot reload

use std::path::PathBuf;

use tagsmith_error_reporting::{DiagnosticMessage, DiagnosticMessageBuilder, internal_error};
use tagsmith_source_map::SourceContext;
use tagsmith_templates::{BuildReport, ConfigError, HostError, LoadError, ResolvedError, TemplateError};

/// Why a reload did not produce a new live registry.
///
/// The previous registry stays active whenever one of these is recorded.
#[derive(Debug, thiserror::Error)]
pub enum ReloadError {
    #[error("failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("template build failed with {} error(s)", .report.len())]
    Build {
        report: BuildReport,
        sources: SourceContext,
    },

    #[error(transparent)]
    Template(#[from] TemplateError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("host compiler: {0}")]
    Host(#[from] HostError),

    #[error("host compiler reported {} error(s)", .errors.len())]
    Compile {
        errors: Vec<ResolvedError>,
        sources: SourceContext,
    },

    #[error("failed to load the compiled registry: {0}")]
    Load(#[from] LoadError),

    #[error("filesystem watcher: {0}")]
    Watch(#[from] notify::Error),

    #[error("reload task failed: {0}")]
    Task(String),
}

impl ReloadError {
    /// Template sources the diagnostics point into, when known.
    pub fn sources(&self) -> Option<&SourceContext> {
        match self {
            ReloadError::Build { sources, .. } | ReloadError::Compile { sources, .. } => Some(sources),
            _ => None,
        }
    }

    /// Render the failure as diagnostics, one per underlying problem.
    pub fn diagnostics(&self) -> Vec<DiagnosticMessage> {
        match self {
            ReloadError::Build { report, sources } => {
                if report.is_empty() {
                    return vec![internal_error!("build failed without reporting an error")];
                }
                report.errors.iter().map(|err| err.to_diagnostic(sources)).collect()
            }
            ReloadError::Template(err) => vec![err.to_diagnostic(&SourceContext::new())],
            ReloadError::Config(err) => vec![err.to_diagnostic()],
            ReloadError::Compile { errors, sources } => {
                errors.iter().map(|err| err.to_diagnostic(sources)).collect()
            }
            other => vec![
                DiagnosticMessageBuilder::error("Reload Failed")
                    .with_code("T-4-1")
                    .problem(other.to_string())
                    .build(),
            ],
        }
    }
}
