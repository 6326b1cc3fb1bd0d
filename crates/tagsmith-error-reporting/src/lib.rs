//! Error reporting and diagnostic messages for tagsmith.
//!
//! Every error the template compiler can report (syntax errors, resolution
//! errors, remapped compiler diagnostics, configuration problems) is turned
//! into a [`DiagnosticMessage`] before it reaches the user. A message has a
//! stable error code from the embedded catalog, a title, an optional problem
//! statement, bulleted details and hints, and an optional source location.
//!
//! Messages render either as text (with an ariadne source excerpt when a
//! [`tagsmith_source_map::SourceContext`] is available) or as JSON.
//!
//! # Example
//!
//! ```
//! use tagsmith_error_reporting::DiagnosticMessageBuilder;
//!
//! let error = DiagnosticMessageBuilder::error("Unknown template")
//!     .with_code("T-2-1")
//!     .problem("No template named `fancy-box` is visible from `pages`")
//!     .add_hint("Did you forget to mark the template as a `fragment`?")
//!     .build();
//!
//! assert!(error.to_text(None).contains("[T-2-1]"));
//! ```

pub mod builder;
pub mod catalog;
pub mod diagnostic;
pub mod macros;

pub use builder::DiagnosticMessageBuilder;
pub use catalog::{ERROR_CATALOG, ErrorCodeInfo, get_docs_url, get_error_info, get_subsystem};
pub use diagnostic::{DetailItem, DetailKind, DiagnosticKind, DiagnosticMessage, MessageContent};
