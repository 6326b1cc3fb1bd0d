/*
 * model.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Template model: parameters, namespace paths, templates and definitions.

use crate::error::{TemplateError, TemplateResult};
use crate::expression::{
    EmbeddedExpression, ExprId, ExpressionKind, ExpressionTable, Extraction, Position,
};
use crate::layout::TemplateLayout;
use crate::lexer::{Attributes, Span};
use crate::parser::Tag;
use crate::tags::{CONTENT_PARAMETER, DEFAULT_DOCTYPE, DOCUMENT_TAG, FRAGMENT_ATTRIBUTE, PAGE_PARAMETER_PREFIX};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Namespace path of a template: optional logical module followed by the
/// directories below the template source root.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct SubPath(Vec<String>);

impl SubPath {
    pub fn root() -> Self {
        SubPath(Vec::new())
    }

    pub fn new<S: Into<String>>(segments: impl IntoIterator<Item = S>) -> Self {
        SubPath(
            segments
                .into_iter()
                .map(Into::into)
                .filter(|s: &String| !s.is_empty())
                .collect(),
        )
    }

    /// Parse a `/`-separated path; the empty string is the root.
    pub fn parse(path: &str) -> Self {
        SubPath::new(path.split('/'))
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    pub fn join(&self, segment: impl Into<String>) -> Self {
        let mut segments = self.0.clone();
        segments.push(segment.into());
        SubPath::new(segments)
    }

    pub fn is_strict_ancestor_of(&self, other: &SubPath) -> bool {
        self.0.len() < other.0.len() && other.0.starts_with(&self.0)
    }

    pub fn is_strict_descendant_of(&self, other: &SubPath) -> bool {
        other.is_strict_ancestor_of(self)
    }

    /// Human-readable form used in messages.
    pub fn describe(&self) -> String {
        if self.is_root() {
            "(root)".to_string()
        } else {
            self.to_string()
        }
    }
}

impl fmt::Display for SubPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join("/"))
    }
}

/// Stable identity of a template: namespace path plus name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TemplateKey {
    pub sub_path: SubPath,
    pub name: String,
}

impl fmt::Display for TemplateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.sub_path.is_root() {
            f.write_str(&self.name)
        } else {
            write!(f, "{}/{}", self.sub_path, self.name)
        }
    }
}

/// A declared template parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateParameter {
    pub name: String,
    /// Rust type, e.g. `&str` or `Option<Content>`
    pub ty: String,
    /// Rust expression used when the caller omits the parameter
    pub default: Option<String>,
    pub is_content: bool,
    pub is_nullable: bool,
    /// Expression-table entry locating the type in the template source
    pub type_expr: Option<ExprId>,
}

impl TemplateParameter {
    pub fn new(name: impl Into<String>, ty: impl Into<String>, default: Option<String>) -> Self {
        let ty = ty.into();
        let is_nullable = option_inner(&ty).is_some();
        let base = option_inner(&ty).unwrap_or(&ty);
        let is_content = base == "Content" || base.starts_with("Content<");
        TemplateParameter {
            name: name.into(),
            ty,
            default,
            is_content,
            is_nullable,
            type_expr: None,
        }
    }

    /// Parse a declaration of the form `type` or `type = default`.
    pub fn parse(name: &str, declaration: &str) -> Result<Self, String> {
        if !is_identifier(name) {
            return Err("parameter names must be Rust identifiers".to_string());
        }
        if name == "out" {
            return Err("`out` is reserved for the output buffer".to_string());
        }
        let (ty, default) = split_declaration(declaration);
        if ty.is_empty() {
            return Err("missing parameter type".to_string());
        }
        if default.is_some_and(str::is_empty) {
            return Err("missing default value after `=`".to_string());
        }
        Ok(TemplateParameter::new(name, ty, default.map(str::to_string)))
    }

    /// The primary content slot, filled by a tag's remaining children.
    pub fn is_primary_content(&self) -> bool {
        self.is_content && self.name == CONTENT_PARAMETER
    }

    pub fn is_required(&self) -> bool {
        self.default.is_none() && !self.is_nullable
    }

    fn sort_group(&self) -> u8 {
        match (self.is_content, self.is_primary_content()) {
            (false, _) => 0,
            (true, false) => 1,
            (true, true) => 2,
        }
    }
}

fn option_inner(ty: &str) -> Option<&str> {
    let ty = ty.trim();
    let inner = ty
        .strip_prefix("Option<")
        .or_else(|| ty.strip_prefix("std::option::Option<"))?;
    inner.strip_suffix('>').map(str::trim)
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_alphabetic() || c == '_')
        && chars.all(|c| c.is_alphanumeric() || c == '_')
}

/// Split `type = default` on the first `=` that is not part of an operator
/// and not nested in brackets.
fn split_declaration(declaration: &str) -> (&str, Option<&str>) {
    let mut depth = 0i32;
    let mut prev = None;
    for (idx, c) in declaration.char_indices() {
        match c {
            '<' | '(' | '[' | '{' => depth += 1,
            '>' if prev != Some('-') && prev != Some('=') => depth -= 1,
            ')' | ']' | '}' => depth -= 1,
            '=' if depth <= 0 => {
                let next = declaration[idx + 1..].chars().next();
                let operator = matches!(prev, Some('=' | '!' | '<' | '>'))
                    || matches!(next, Some('=' | '>'));
                if !operator {
                    return (
                        declaration[..idx].trim(),
                        Some(declaration[idx + 1..].trim()),
                    );
                }
            }
            _ => {}
        }
        prev = Some(c);
    }
    (declaration.trim(), None)
}

/// Canonical parameter order: non-content parameters alphabetically, then
/// content parameters alphabetically, then the primary content slot.
pub fn sort_parameters(parameters: &mut [TemplateParameter]) {
    parameters.sort_by(|a, b| {
        a.sort_group()
            .cmp(&b.sort_group())
            .then_with(|| a.name.cmp(&b.name))
    });
}

/// One compiled template.
#[derive(Debug, Clone)]
pub struct Template {
    /// Source path relative to the template directory
    pub file: PathBuf,
    pub name: String,
    pub sub_path: SubPath,
    /// Full-document (`<html>`) template
    pub is_page: bool,
    /// Listed in the generated registry object
    pub is_fragment: bool,
    /// Root `<rust>` blocks of the file
    pub top_level_code: Arc<[String]>,
    pub doctype: Option<String>,
    pub parameters: Vec<TemplateParameter>,
    /// Ordinary attributes of a page's `<html>` root
    pub document_attributes: Attributes,
    pub root: Tag,
    /// Expressions of the file plus this template's parameter types
    pub expressions: Arc<ExpressionTable>,
    pub extraction: Arc<Extraction>,
    pub source: Arc<str>,
}

impl Template {
    pub fn key(&self) -> TemplateKey {
        TemplateKey {
            sub_path: self.sub_path.clone(),
            name: self.name.clone(),
        }
    }

    /// Map a span in substituted text to the original source.
    pub fn original_span(&self, span: Span) -> Span {
        original_span(&self.extraction, span)
    }

    pub fn parameter(&self, name: &str) -> Option<&TemplateParameter> {
        self.parameters.iter().find(|p| p.name == name)
    }

    pub fn definition(&self, root_module: &str) -> TemplateDefinition {
        let layout = TemplateLayout::new(root_module, &self.sub_path, &self.name);
        TemplateDefinition {
            name: self.name.clone(),
            sub_path: self.sub_path.clone(),
            file: self.file.clone(),
            module: layout.module_path.clone(),
            function: layout.function_path(),
            alias: layout.alias.clone(),
            parameters: self.parameters.clone(),
            is_page: self.is_page,
            is_fragment: self.is_fragment,
        }
    }
}

/// What the registry knows about a template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateDefinition {
    pub name: String,
    pub sub_path: SubPath,
    pub file: PathBuf,
    /// Rust module path of the generated file
    pub module: String,
    /// Qualified path of the generated render function
    pub function: String,
    /// Name the module is imported under by callers
    pub alias: String,
    pub parameters: Vec<TemplateParameter>,
    pub is_page: bool,
    pub is_fragment: bool,
}

impl TemplateDefinition {
    pub fn key(&self) -> TemplateKey {
        TemplateKey {
            sub_path: self.sub_path.clone(),
            name: self.name.clone(),
        }
    }

    pub fn parameter(&self, name: &str) -> Option<&TemplateParameter> {
        self.parameters.iter().find(|p| p.name == name)
    }

    pub fn content_parameter(&self) -> Option<&TemplateParameter> {
        self.parameters.iter().find(|p| p.is_primary_content())
    }
}

pub(crate) fn original_span(extraction: &Extraction, span: Span) -> Span {
    let start = extraction.original_offset(span.start);
    let end = extraction.original_offset(span.end).max(start);
    Span::new(start, end)
}

/// 1-based position of a byte offset.
pub(crate) fn position_at(source: &str, offset: usize) -> Position {
    let location = tagsmith_source_map::offset_to_location(source, offset.min(source.len()));
    location.map_or(Position { line: 1, column: 1 }, |l| Position {
        line: l.row + 1,
        column: l.column + 1,
    })
}

/// Per-file state shared by every template root of one file.
pub struct FileContext {
    pub file: PathBuf,
    pub source: Arc<str>,
    pub extraction: Arc<Extraction>,
    pub doctype: Option<String>,
    pub top_level_code: Arc<[String]>,
}

/// Build a template from one root tag of a parsed file.
pub fn build(tag: &Tag, file: &FileContext, sub_path: &SubPath) -> TemplateResult<Template> {
    let is_page = tag.is_named(DOCUMENT_TAG);
    let name = if is_page {
        page_name(&file.file)
    } else {
        tag.name.clone()
    };

    let mut expressions = file.extraction.expressions.clone();
    let mut parameters = Vec::new();
    let mut document_attributes = Attributes::new();
    let mut is_fragment = is_page;

    for (attr_name, attribute) in &tag.attributes {
        let param_name = if is_page {
            match attr_name.strip_prefix(PAGE_PARAMETER_PREFIX) {
                Some(stripped) => stripped,
                None => {
                    document_attributes.insert(attr_name.clone(), attribute.clone());
                    continue;
                }
            }
        } else if attr_name == FRAGMENT_ATTRIBUTE && attribute.value.is_none() {
            is_fragment = true;
            continue;
        } else {
            attr_name.as_str()
        };

        let invalid = |message: String| TemplateError::InvalidParameter {
            file: file.file.clone(),
            template: name.clone(),
            parameter: param_name.to_string(),
            message,
            span: Some(original_span(&file.extraction, attribute.span)),
        };

        let Some(value) = &attribute.value else {
            return Err(invalid("missing parameter type".to_string()));
        };
        let declaration = file.extraction.expressions.restore_code(value);
        let mut parameter = TemplateParameter::parse(param_name, &declaration).map_err(invalid)?;

        let value_span = attribute.value_span.unwrap_or(attribute.span);
        let span = original_span(&file.extraction, value_span);
        let id = ExprId::next();
        expressions.push(EmbeddedExpression {
            id,
            kind: ExpressionKind::ParameterType,
            raw: parameter.ty.clone(),
            original: file.source[span.start..span.end].to_string(),
            start: position_at(&file.source, span.start),
            end: position_at(&file.source, span.end),
            start_offset: span.start,
            end_offset: span.end,
            braced: false,
            placeholder: id.placeholder(),
        });
        parameter.type_expr = Some(id);
        parameters.push(parameter);
    }

    sort_parameters(&mut parameters);

    let doctype = if is_page {
        Some(
            file.doctype
                .clone()
                .unwrap_or_else(|| DEFAULT_DOCTYPE.to_string()),
        )
    } else {
        None
    };

    Ok(Template {
        file: file.file.clone(),
        name,
        sub_path: sub_path.clone(),
        is_page,
        is_fragment,
        top_level_code: file.top_level_code.clone(),
        doctype,
        parameters,
        document_attributes,
        root: tag.clone(),
        expressions: Arc::new(expressions),
        extraction: file.extraction.clone(),
        source: file.source.clone(),
    })
}

/// Page templates are named after their file.
fn page_name(file: &Path) -> String {
    file.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "index".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn names(params: &[TemplateParameter]) -> Vec<&str> {
        params.iter().map(|p| p.name.as_str()).collect()
    }

    #[test]
    fn parse_type_and_default() {
        let p = TemplateParameter::parse("compact", "bool = false").unwrap();
        assert_eq!(p.ty, "bool");
        assert_eq!(p.default.as_deref(), Some("false"));
        assert!(!p.is_content);
        assert!(!p.is_nullable);

        let p = TemplateParameter::parse("items", "Vec<(u8, u8)>").unwrap();
        assert_eq!(p.ty, "Vec<(u8, u8)>");
        assert_eq!(p.default, None);
    }

    #[test]
    fn default_may_contain_operators() {
        let p = TemplateParameter::parse("ok", "bool = a == b").unwrap();
        assert_eq!(p.default.as_deref(), Some("a == b"));

        let p = TemplateParameter::parse("f", "fn(u8) -> bool = |x| x >= 2").unwrap();
        assert_eq!(p.ty, "fn(u8) -> bool");
        assert_eq!(p.default.as_deref(), Some("|x| x >= 2"));
    }

    #[test]
    fn content_and_nullable_flags() {
        let p = TemplateParameter::parse("content", "Content").unwrap();
        assert!(p.is_content && p.is_primary_content() && p.is_required());

        let p = TemplateParameter::parse("footer", "Option<Content>").unwrap();
        assert!(p.is_content && p.is_nullable && !p.is_primary_content());
        assert!(!p.is_required());

        let p = TemplateParameter::parse("title", "Option<&str>").unwrap();
        assert!(p.is_nullable && !p.is_content);
    }

    #[test]
    fn invalid_declarations() {
        assert!(TemplateParameter::parse("on-click", "String").is_err());
        assert!(TemplateParameter::parse("out", "String").is_err());
        assert!(TemplateParameter::parse("x", " ").is_err());
        assert!(TemplateParameter::parse("x", "u8 =").is_err());
    }

    #[test]
    fn canonical_sort_order() {
        let mut params = vec![
            TemplateParameter::new("content", "Content", None),
            TemplateParameter::new("zeta", "u8", None),
            TemplateParameter::new("header", "Content", None),
            TemplateParameter::new("alpha", "&str", None),
            TemplateParameter::new("footer", "Option<Content>", None),
        ];
        sort_parameters(&mut params);
        assert_eq!(names(&params), vec!["alpha", "zeta", "footer", "header", "content"]);

        let sorted = params.clone();
        sort_parameters(&mut params);
        assert_eq!(params, sorted);
    }

    #[test]
    fn sub_path_relations() {
        let components = SubPath::parse("components");
        let admin = SubPath::parse("components/admin");
        assert!(components.is_strict_ancestor_of(&admin));
        assert!(admin.is_strict_descendant_of(&components));
        assert!(!components.is_strict_ancestor_of(&components));
        assert!(SubPath::root().is_strict_ancestor_of(&components));
        assert!(!SubPath::parse("comp").is_strict_ancestor_of(&components));
        assert_eq!(admin.to_string(), "components/admin");
        assert_eq!(SubPath::parse("").describe(), "(root)");
        assert_eq!(components.join("admin"), admin);
    }

    #[test]
    fn template_key_display() {
        let key = TemplateKey {
            sub_path: SubPath::parse("components"),
            name: "icon".into(),
        };
        assert_eq!(key.to_string(), "components/icon");
    }
}
