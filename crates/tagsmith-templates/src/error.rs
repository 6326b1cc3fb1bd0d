/*
 * error.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Error types for template compilation.

use crate::lexer::Span;
use std::path::{Path, PathBuf};
use tagsmith_error_reporting::{DiagnosticMessage, DiagnosticMessageBuilder, get_error_info};
use tagsmith_source_map::{SourceContext, SourceInfo};
use thiserror::Error;

/// Errors that can occur while compiling templates.
///
/// Spans are byte ranges in the original template source. File paths are
/// relative to the template source directory.
#[derive(Debug, Error)]
pub enum TemplateError {
    /// Markup that could not be tokenized or nested.
    #[error("{}: syntax error: {message}", .file.display())]
    Syntax {
        file: PathBuf,
        message: String,
        span: Option<Span>,
    },

    #[error("{}: template source contains reserved character {character:?}", .file.display())]
    ReservedCharacter {
        file: PathBuf,
        character: char,
        span: Span,
    },

    #[error("{}: a file with an `<html>` root may not define other templates", .file.display())]
    MultipleDocumentRoots { file: PathBuf, span: Span },

    #[error("{}: `{name}` is a built-in element name and cannot name a template", .file.display())]
    ReservedElementName {
        file: PathBuf,
        name: String,
        span: Span,
    },

    #[error("{}: invalid parameter `{parameter}` on `{template}`: {message}", .file.display())]
    InvalidParameter {
        file: PathBuf,
        template: String,
        parameter: String,
        message: String,
        span: Option<Span>,
    },

    #[error("{}: unknown template `<{tag}>` used in `{template}`", .file.display())]
    UnknownTag {
        file: PathBuf,
        template: String,
        tag: String,
        span: Option<Span>,
    },

    #[error("{}: `<{tag}>` used in `{template}` is ambiguous between {}", .file.display(), .candidates.join(", "))]
    AmbiguousTag {
        file: PathBuf,
        template: String,
        tag: String,
        candidates: Vec<String>,
        span: Option<Span>,
    },

    #[error("{}: `<{tag}>` used in `{template}` is missing required attribute `{attribute}`", .file.display())]
    MissingAttribute {
        file: PathBuf,
        template: String,
        tag: String,
        attribute: String,
        span: Option<Span>,
    },

    #[error("{}: `<{tag}>` used in `{template}` is missing required content `{parameter}`", .file.display())]
    MissingContent {
        file: PathBuf,
        template: String,
        tag: String,
        parameter: String,
        span: Option<Span>,
    },

    #[error("{}: `None` passed to non-nullable `{attribute}` of `<{tag}>` in `{template}`", .file.display())]
    NullToNonNullable {
        file: PathBuf,
        template: String,
        tag: String,
        attribute: String,
        span: Option<Span>,
    },

    #[error("{}: template `{name}` in namespace `{namespace}` is already defined in {}", .file.display(), .previous.display())]
    DuplicateTemplate {
        file: PathBuf,
        namespace: String,
        name: String,
        previous: PathBuf,
    },

    #[error("{}: `<{tag}>` used in `{template}` has no parameter named `{attribute}`", .file.display())]
    UnknownAttribute {
        file: PathBuf,
        template: String,
        tag: String,
        attribute: String,
        span: Option<Span>,
    },

    #[error("{}: `<{tag}>` used in `{template}` does not accept content", .file.display())]
    UnexpectedContent {
        file: PathBuf,
        template: String,
        tag: String,
        span: Option<Span>,
    },

    #[error("{}: templates `{first}` and `{second}` both generate module `{module}` in namespace `{namespace}`", .file.display())]
    ModuleCollision {
        file: PathBuf,
        namespace: String,
        module: String,
        first: String,
        second: String,
    },

    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Result type for template operations.
pub type TemplateResult<T> = Result<T, TemplateError>;

impl TemplateError {
    /// Error code from the tagsmith error catalog.
    pub fn code(&self) -> &'static str {
        match self {
            TemplateError::Syntax { .. } => "T-1-1",
            TemplateError::ReservedCharacter { .. } => "T-1-2",
            TemplateError::MultipleDocumentRoots { .. } => "T-1-3",
            TemplateError::ReservedElementName { .. } => "T-1-4",
            TemplateError::InvalidParameter { .. } => "T-1-5",
            TemplateError::UnknownTag { .. } => "T-2-1",
            TemplateError::AmbiguousTag { .. } => "T-2-2",
            TemplateError::MissingAttribute { .. } => "T-2-3",
            TemplateError::MissingContent { .. } => "T-2-4",
            TemplateError::NullToNonNullable { .. } => "T-2-5",
            TemplateError::DuplicateTemplate { .. } => "T-2-6",
            TemplateError::UnknownAttribute { .. } => "T-2-7",
            TemplateError::UnexpectedContent { .. } => "T-2-8",
            TemplateError::ModuleCollision { .. } => "T-2-9",
            TemplateError::Io { .. } => "T-4-1",
        }
    }

    /// The template file the error belongs to.
    pub fn file(&self) -> &Path {
        match self {
            TemplateError::Syntax { file, .. }
            | TemplateError::ReservedCharacter { file, .. }
            | TemplateError::MultipleDocumentRoots { file, .. }
            | TemplateError::ReservedElementName { file, .. }
            | TemplateError::InvalidParameter { file, .. }
            | TemplateError::UnknownTag { file, .. }
            | TemplateError::AmbiguousTag { file, .. }
            | TemplateError::MissingAttribute { file, .. }
            | TemplateError::MissingContent { file, .. }
            | TemplateError::NullToNonNullable { file, .. }
            | TemplateError::DuplicateTemplate { file, .. }
            | TemplateError::UnknownAttribute { file, .. }
            | TemplateError::UnexpectedContent { file, .. }
            | TemplateError::ModuleCollision { file, .. } => file,
            TemplateError::Io { path, .. } => path,
        }
    }

    /// Byte range in the original template source, when known.
    pub fn span(&self) -> Option<Span> {
        match self {
            TemplateError::ReservedCharacter { span, .. }
            | TemplateError::MultipleDocumentRoots { span, .. }
            | TemplateError::ReservedElementName { span, .. } => Some(*span),
            TemplateError::Syntax { span, .. }
            | TemplateError::InvalidParameter { span, .. }
            | TemplateError::UnknownTag { span, .. }
            | TemplateError::AmbiguousTag { span, .. }
            | TemplateError::MissingAttribute { span, .. }
            | TemplateError::MissingContent { span, .. }
            | TemplateError::NullToNonNullable { span, .. }
            | TemplateError::UnknownAttribute { span, .. }
            | TemplateError::UnexpectedContent { span, .. } => *span,
            TemplateError::DuplicateTemplate { .. }
            | TemplateError::ModuleCollision { .. }
            | TemplateError::Io { .. } => None,
        }
    }

    /// Whether the error is an authoring error in a template, as opposed to
    /// an infrastructure problem.
    pub fn is_authoring_error(&self) -> bool {
        !matches!(self, TemplateError::Io { .. })
    }

    /// Convert to a diagnostic message. Locations resolve against files
    /// registered in `ctx` under their relative path.
    pub fn to_diagnostic(&self, ctx: &SourceContext) -> DiagnosticMessage {
        let code = self.code();
        let title = get_error_info(code).map_or("Template Error", |info| info.title.as_str());

        let mut builder = DiagnosticMessageBuilder::error(title)
            .with_code(code)
            .problem(self.to_string());

        if let Some(span) = self.span()
            && let Some(file_id) = ctx.find_file(&path_key(self.file()))
            && let Some(location) = SourceInfo::from_offsets(file_id, span.start, span.end, ctx)
        {
            builder = builder.with_location(location);
        }

        builder = match self {
            TemplateError::AmbiguousTag { candidates, .. } => {
                let builder = candidates
                    .iter()
                    .fold(builder, |b, c| b.add_info(format!("candidate in `{}`", c)));
                builder.add_hint("Reference the template from inside one of these namespaces?")
            }
            TemplateError::UnknownTag { tag, .. } if tag.contains('-') => builder.add_hint(
                "Add the tag to `passthrough_elements` if it is a custom element rendered by the browser?",
            ),
            TemplateError::DuplicateTemplate { previous, .. } => {
                builder.add_info(format!("first defined in `{}`", path_key(previous)))
            }
            TemplateError::ReservedCharacter { .. } => {
                builder.add_hint("Remove the private-use character from the template?")
            }
            _ => builder,
        };

        builder.build()
    }
}

/// Key under which a template file is registered in a [`SourceContext`].
pub fn path_key(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_file_and_details() {
        let err = TemplateError::AmbiguousTag {
            file: PathBuf::from("shared/page.html"),
            template: "page".into(),
            tag: "icon".into(),
            candidates: vec!["components".into(), "components/admin".into()],
            span: None,
        };
        assert_eq!(
            err.to_string(),
            "shared/page.html: `<icon>` used in `page` is ambiguous between components, components/admin"
        );
        assert_eq!(err.code(), "T-2-2");
    }

    #[test]
    fn diagnostic_carries_code_and_location() {
        let mut ctx = SourceContext::new();
        ctx.add_file("card.html".into(), Some("<card>\n  <x-y></x-y>\n</card>".into()));

        let err = TemplateError::UnknownTag {
            file: PathBuf::from("card.html"),
            template: "card".into(),
            tag: "x-y".into(),
            span: Some(Span::new(9, 14)),
        };
        let diagnostic = err.to_diagnostic(&ctx);
        assert_eq!(diagnostic.code.as_deref(), Some("T-2-1"));
        assert_eq!(diagnostic.title, "Unknown Template");
        let location = diagnostic.location.as_ref().unwrap();
        assert_eq!(location.range.start.row, 1);
        assert_eq!(location.range.start.column, 2);
        assert_eq!(diagnostic.hints.len(), 1);

        let text = diagnostic.to_text(Some(&ctx));
        assert!(text.contains("card.html:2:3"));
    }

    #[test]
    fn diagnostic_without_registered_file_has_no_location() {
        let err = TemplateError::Syntax {
            file: PathBuf::from("missing.html"),
            message: "unterminated comment".into(),
            span: Some(Span::new(0, 4)),
        };
        let diagnostic = err.to_diagnostic(&SourceContext::new());
        assert!(diagnostic.location.is_none());
        assert!(diagnostic.to_text(None).contains("unterminated comment"));
    }
}
