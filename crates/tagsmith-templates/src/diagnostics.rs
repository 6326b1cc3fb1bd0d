/*
 * diagnostics.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Remapping host-compiler diagnostics onto template sources.
//!
//! Generated code carries a marker comment after every spliced expression.
//! For a diagnostic at a generated (line, column), the resolver finds the
//! generated file, scans forward to the next marker and looks the
//! expression up in the owning template. Diagnostics with no later marker
//! point into the file's top-level code, which is emitted last.

use crate::error::path_key;
use crate::expression::{ExprId, Position};
use crate::marker::next_marker;
use crate::model::Template;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tagsmith_error_reporting::{DiagnosticMessage, DiagnosticMessageBuilder, get_error_info};
use tagsmith_source_map::{SourceContext, SourceInfo};

/// A diagnostic reported by the host compiler against generated code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompilerError {
    pub message: String,
    /// Generated file as reported by the compiler
    pub file: PathBuf,
    /// 1-based
    pub line: usize,
    /// 1-based, in characters
    pub column: usize,
}

/// A generated source file and the template it was produced from.
#[derive(Debug, Clone)]
pub struct GeneratedSource {
    pub path: PathBuf,
    pub contents: String,
    pub template: Arc<Template>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorLocation {
    /// An embedded expression or parameter type
    Expression {
        expr: ExprId,
        start: Position,
        end: Position,
        start_offset: usize,
        end_offset: usize,
    },
    /// The file's `<rust>` blocks; no line is known
    TopLevelCode,
    /// The generated file belongs to no known template
    Unmapped { file: PathBuf, line: usize, column: usize },
}

/// A compiler diagnostic expressed in template coordinates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedError {
    /// Template source path, relative to the template directory
    pub template_file: Option<PathBuf>,
    pub template: Option<String>,
    pub location: ErrorLocation,
    /// Every compiler message attributed to this location
    pub messages: Vec<String>,
    /// Original template lines spanned by the expression
    pub excerpt: Option<String>,
}

impl ResolvedError {
    /// `file:line:column` style description of where the error is.
    pub fn describe_location(&self) -> String {
        let file = self
            .template_file
            .as_deref()
            .map(path_key)
            .unwrap_or_default();
        match &self.location {
            ErrorLocation::Expression { start, .. } => format!("{}:{}", file, start),
            ErrorLocation::TopLevelCode => format!("{} (top-level code)", file),
            ErrorLocation::Unmapped { file, line, column } => {
                format!("{}:{}:{}", file.display(), line, column)
            }
        }
    }

    pub fn to_diagnostic(&self, ctx: &SourceContext) -> DiagnosticMessage {
        let code = "T-3-1";
        let title = get_error_info(code).map_or("Compiler Error", |info| info.title.as_str());
        let mut messages = self.messages.iter();

        let mut builder = DiagnosticMessageBuilder::error(title).with_code(code);
        if let Some(first) = messages.next() {
            builder = builder.problem(first.clone());
        }
        for message in messages {
            builder = builder.add_detail(message.clone());
        }

        if let ErrorLocation::Expression {
            start_offset,
            end_offset,
            ..
        } = &self.location
            && let Some(file) = &self.template_file
            && let Some(file_id) = ctx.find_file(&path_key(file))
            && let Some(location) = SourceInfo::from_offsets(file_id, *start_offset, *end_offset, ctx)
        {
            builder = builder.with_location(location);
        }

        match &self.location {
            ErrorLocation::TopLevelCode => {
                builder = builder.add_note(format!("in the top-level code of {}", self.describe_location()));
            }
            ErrorLocation::Unmapped { .. } => {
                builder = builder.add_note(format!("in generated code at {}", self.describe_location()));
            }
            ErrorLocation::Expression { .. } => {}
        }
        builder.build()
    }
}

/// Key identifying one group of diagnostics.
#[derive(PartialEq, Eq)]
enum GroupKey {
    Expression(PathBuf, ExprId),
    TopLevel(PathBuf),
    Unmapped(PathBuf, usize, usize),
}

/// The generated source a compiler-reported path refers to. The longest
/// matching path wins.
fn owning_source<'s>(sources: &'s [GeneratedSource], file: &Path) -> Option<&'s GeneratedSource> {
    sources
        .iter()
        .filter(|s| file == s.path || file.ends_with(&s.path) || s.path.ends_with(file))
        .max_by_key(|s| s.path.components().count())
}

fn excerpt(source: &str, start: Position, end: Position) -> String {
    source
        .lines()
        .skip(start.line.saturating_sub(1))
        .take(end.line.saturating_sub(start.line) + 1)
        .collect::<Vec<_>>()
        .join("\n")
}

/// Map compiler diagnostics back to template coordinates, grouping
/// diagnostics that land on the same expression.
pub fn resolve(sources: &[GeneratedSource], errors: &[CompilerError]) -> Vec<ResolvedError> {
    let mut groups: Vec<(GroupKey, ResolvedError)> = Vec::new();

    for error in errors {
        let (key, resolved) = match owning_source(sources, &error.file) {
            Some(source) => {
                let template = &source.template;
                let located = next_marker(&source.contents, error.line, error.column)
                    .and_then(|id| template.expressions.get(id));
                match located {
                    Some(expr) => (
                        GroupKey::Expression(template.file.clone(), expr.id),
                        ResolvedError {
                            template_file: Some(template.file.clone()),
                            template: Some(template.name.clone()),
                            location: ErrorLocation::Expression {
                                expr: expr.id,
                                start: expr.start,
                                end: expr.end,
                                start_offset: expr.start_offset,
                                end_offset: expr.end_offset,
                            },
                            messages: Vec::new(),
                            excerpt: Some(excerpt(&template.source, expr.start, expr.end)),
                        },
                    ),
                    None => (
                        GroupKey::TopLevel(template.file.clone()),
                        ResolvedError {
                            template_file: Some(template.file.clone()),
                            template: Some(template.name.clone()),
                            location: ErrorLocation::TopLevelCode,
                            messages: Vec::new(),
                            excerpt: None,
                        },
                    ),
                }
            }
            None => {
                tracing::debug!(file = %error.file.display(), "diagnostic outside generated templates");
                (
                    GroupKey::Unmapped(error.file.clone(), error.line, error.column),
                    ResolvedError {
                        template_file: None,
                        template: None,
                        location: ErrorLocation::Unmapped {
                            file: error.file.clone(),
                            line: error.line,
                            column: error.column,
                        },
                        messages: Vec::new(),
                        excerpt: None,
                    },
                )
            }
        };

        let index = match groups.iter().position(|(k, _)| *k == key) {
            Some(index) => index,
            None => {
                groups.push((key, resolved));
                groups.len() - 1
            }
        };
        let messages = &mut groups[index].1.messages;
        if !messages.contains(&error.message) {
            messages.push(error.message.clone());
        }
    }

    groups.into_iter().map(|(_, resolved)| resolved).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compile::compile_file;
    use crate::expression::{EmbeddedExpression, ExpressionKind};
    use crate::marker::marker;
    use crate::model::SubPath;
    use pretty_assertions::assert_eq;

    const SOURCE: &str = "<my-card user=\"&User\">\n  <div>\n    <h2>${user.name}</h2>\n  </div>\n</my-card>\n";

    fn template_with_e7() -> Arc<Template> {
        let mut template = compile_file(
            Path::new("components/my-card.html"),
            SOURCE,
            &SubPath::parse("components"),
        )
        .unwrap()
        .remove(0);
        let mut table = (*template.expressions).clone();
        table.push(EmbeddedExpression {
            id: ExprId(7),
            kind: ExpressionKind::Interpolation,
            raw: "user.name".into(),
            original: "${user.name}".into(),
            start: Position { line: 3, column: 10 },
            end: Position { line: 3, column: 22 },
            start_offset: 39,
            end_offset: 51,
            braced: true,
            placeholder: ExprId(7).placeholder(),
        });
        template.expressions = Arc::new(table);
        Arc::new(template)
    }

    fn generated(template: Arc<Template>) -> GeneratedSource {
        let mut contents = String::new();
        for line in 1..=45 {
            match line {
                43 => contents.push_str(&format!("    out.write(&(user.name) {});\n", marker(ExprId(7)))),
                _ => contents.push_str("    out.literal(&LITERALS[0..1]);\n"),
            }
        }
        GeneratedSource {
            path: PathBuf::from("src/templates/components/my_card.rs"),
            contents,
            template,
        }
    }

    fn error(line: usize, message: &str) -> CompilerError {
        CompilerError {
            message: message.into(),
            file: PathBuf::from("src/templates/components/my_card.rs"),
            line,
            column: 5,
        }
    }

    #[test]
    fn line_42_resolves_to_the_next_marker() {
        let sources = vec![generated(template_with_e7())];
        let resolved = resolve(&sources, &[error(42, "no field `name` on type `&User`")]);

        assert_eq!(resolved.len(), 1);
        let err = &resolved[0];
        assert_eq!(err.template_file.as_deref(), Some(Path::new("components/my-card.html")));
        let ErrorLocation::Expression { expr, start, .. } = &err.location else {
            panic!("expected an expression location");
        };
        assert_eq!(*expr, ExprId(7));
        assert_eq!(*start, Position { line: 3, column: 10 });
        assert_eq!(err.excerpt.as_deref(), Some("    <h2>${user.name}</h2>"));
        assert_eq!(err.describe_location(), "components/my-card.html:3:10");
    }

    #[test]
    fn past_the_last_marker_is_top_level_code() {
        let sources = vec![generated(template_with_e7())];
        let resolved = resolve(&sources, &[error(44, "unresolved import"), error(45, "unused")]);
        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].location, ErrorLocation::TopLevelCode);
        assert_eq!(resolved[0].messages, vec!["unresolved import", "unused"]);
    }

    #[test]
    fn diagnostics_group_by_expression() {
        let sources = vec![generated(template_with_e7())];
        let resolved = resolve(
            &sources,
            &[error(40, "first"), error(44, "top"), error(43, "second"), error(41, "first")],
        );
        assert_eq!(resolved.len(), 2);
        assert_eq!(resolved[0].messages, vec!["first", "second"]);
        assert_eq!(resolved[1].location, ErrorLocation::TopLevelCode);
    }

    #[test]
    fn unknown_files_stay_unmapped() {
        let sources = vec![generated(template_with_e7())];
        let mut err = error(3, "mismatched types");
        err.file = PathBuf::from("src/main.rs");
        let resolved = resolve(&sources, &[err]);
        assert!(matches!(resolved[0].location, ErrorLocation::Unmapped { line: 3, .. }));
        assert_eq!(resolved[0].describe_location(), "src/main.rs:3:5");
    }

    #[test]
    fn converts_to_a_located_diagnostic() {
        let sources = vec![generated(template_with_e7())];
        let resolved = resolve(&sources, &[error(42, "no field `name`"), error(43, "second")]);

        let mut ctx = SourceContext::new();
        ctx.add_file("components/my-card.html".into(), Some(SOURCE.into()));
        let diagnostic = resolved[0].to_diagnostic(&ctx);
        assert_eq!(diagnostic.code.as_deref(), Some("T-3-1"));
        assert!(diagnostic.location.is_some());
        let text = diagnostic.to_text(Some(&ctx));
        assert!(text.contains("no field `name`"));
        assert!(text.contains("second"));
    }
}
