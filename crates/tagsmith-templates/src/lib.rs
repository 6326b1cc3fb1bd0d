/*
 * lib.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Template compiler for tagsmith.
//!
//! Templates are HTML-like markup with embedded Rust expressions:
//!
//! ```text
//! <user-card user="&User" compact="bool = false" content="Content" fragment>
//!   <div class="card" if="${!compact}">
//!     <h2>${user.name}</h2>
//!     ${content}
//!   </div>
//! </user-card>
//! ```
//!
//! Each root tag of a file defines a template. The compiler turns every
//! template into an ordinary Rust render function writing into a
//! [`tagsmith_runtime::Html`] buffer; nothing is interpreted at runtime.
//!
//! The pipeline, leaves first:
//!
//! 1. [`expression::extract`] cuts embedded expressions out of the text and
//!    leaves placeholder tokens behind.
//! 2. [`parser::parse`] builds the tag tree from the substituted text.
//! 3. [`model::build`] turns each root tag into a [`Template`].
//! 4. [`Registry`] indexes template definitions and resolves tag names by
//!    namespace proximity.
//! 5. [`codegen::generate`] produces the instruction stream and packed
//!    literal text; [`emit::emit`] renders it as Rust source.
//! 6. [`diagnostics::resolve`] maps host-compiler errors in generated code
//!    back to template coordinates.
//!
//! # Example
//!
//! ```rust
//! use std::path::PathBuf;
//! use tagsmith_templates::{BuildSettings, build_sources};
//!
//! let sources = vec![(
//!     PathBuf::from("components/greeting.html"),
//!     "<my-greeting name=\"&str\" fragment><p>Hello ${name}!</p></my-greeting>".to_string(),
//! )];
//! let (output, report) = build_sources(sources, &BuildSettings::default());
//! assert!(report.is_ok());
//! assert!(output.files.contains_key(&PathBuf::from("components/my_greeting.rs")));
//! ```

pub mod build;
pub mod codegen;
pub mod compile;
pub mod config;
pub mod diagnostics;
pub mod emit;
pub mod error;
pub mod expression;
pub mod host;
pub mod layout;
pub mod lexer;
pub mod marker;
pub mod model;
pub mod parser;
pub mod project;
pub mod registry;
pub mod tags;

pub use build::{
    BuildOutput, BuildReport, BuildSettings, GeneratedFile, RebuildSummary, WriteSummary, build,
    build_sources,
};
pub use codegen::{GenerateOptions, Generated, Instruction, generate};
pub use compile::compile_file;
pub use config::{CONFIG_FILE, ConfigError, ProjectConfig, find_project_root};
pub use diagnostics::{CompilerError, ErrorLocation, GeneratedSource, ResolvedError};
pub use error::{TemplateError, TemplateResult};
pub use expression::{EmbeddedExpression, ExprId, Position};
pub use host::{
    CommandCompiler, CompileOutcome, CompileRequest, HostCompiler, HostError, LoadError,
    LoadedRegistry, ModuleLoader, StaticLoader,
};
pub use model::{SubPath, Template, TemplateDefinition, TemplateKey, TemplateParameter};
pub use project::Project;
pub use registry::{Ambiguous, Registry, RegistryBuilder};
