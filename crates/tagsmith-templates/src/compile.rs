/*
 * compile.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Compile one template file into its templates.

use crate::error::{TemplateError, TemplateResult};
use crate::expression::extract;
use crate::lexer::Span;
use crate::model::{FileContext, SubPath, Template, build, original_span};
use crate::parser::{ParseError, parse};
use std::path::Path;
use std::sync::Arc;

/// Extract, parse and model every template root of `source`.
///
/// `file` is the path relative to the template source directory.
pub fn compile_file(file: &Path, source: &str, sub_path: &SubPath) -> TemplateResult<Vec<Template>> {
    let extraction = extract(source).map_err(|reserved| TemplateError::ReservedCharacter {
        file: file.to_path_buf(),
        character: reserved.character,
        span: Span::new(
            reserved.offset,
            reserved.offset + reserved.character.len_utf8(),
        ),
    })?;

    let document = parse(&extraction.text).map_err(|err| match err {
        ParseError::Syntax { message, span } => TemplateError::Syntax {
            file: file.to_path_buf(),
            message,
            span: Some(original_span(&extraction, span)),
        },
        ParseError::MultipleDocumentRoots { span } => TemplateError::MultipleDocumentRoots {
            file: file.to_path_buf(),
            span: original_span(&extraction, span),
        },
        ParseError::ReservedElementName { name, span } => TemplateError::ReservedElementName {
            file: file.to_path_buf(),
            name,
            span: original_span(&extraction, span),
        },
    })?;

    let top_level_code: Arc<[String]> = document
        .code_roots()
        .map(|tag| extraction.expressions.restore(&tag.text_content()))
        .collect();

    let context = FileContext {
        file: file.to_path_buf(),
        source: Arc::from(source),
        doctype: document.doctype.clone(),
        top_level_code,
        extraction: Arc::new(extraction),
    };

    let templates = document
        .template_roots()
        .map(|tag| build(tag, &context, sub_path))
        .collect::<TemplateResult<Vec<_>>>()?;

    tracing::debug!(
        file = %file.display(),
        templates = templates.len(),
        expressions = context.extraction.expressions.len(),
        "compiled template file"
    );
    Ok(templates)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expression::ExpressionKind;
    use pretty_assertions::assert_eq;

    fn compile(source: &str) -> TemplateResult<Vec<Template>> {
        compile_file(Path::new("components/card.html"), source, &SubPath::parse("components"))
    }

    #[test]
    fn several_templates_share_top_level_code() {
        let templates = compile(
            "<rust>\nuse crate::model::User;\n</rust>\n\
             <user-card user=\"&User\" fragment>\n  <p>${user.name}</p>\n</user-card>\n\
             <user-badge user=\"&User\" compact=\"bool = false\"></user-badge>\n",
        )
        .unwrap();

        assert_eq!(templates.len(), 2);
        let card = &templates[0];
        assert_eq!(card.name, "user-card");
        assert!(card.is_fragment);
        assert!(!templates[1].is_fragment);
        assert_eq!(card.sub_path.to_string(), "components");
        assert_eq!(card.top_level_code.len(), 1);
        assert!(card.top_level_code[0].contains("use crate::model::User;"));

        let badge = &templates[1];
        let names: Vec<_> = badge.parameters.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["compact", "user"]);
        assert_eq!(badge.parameters[0].default.as_deref(), Some("false"));
    }

    #[test]
    fn parameter_types_are_located_at_their_attribute() {
        let source = "<my-card\n  title=\"&str\">\n</my-card>";
        let templates = compile(source).unwrap();
        let param = &templates[0].parameters[0];
        let expr = templates[0]
            .expressions
            .get(param.type_expr.unwrap())
            .unwrap();
        assert_eq!(expr.kind, ExpressionKind::ParameterType);
        assert_eq!(expr.raw, "&str");
        assert_eq!(expr.start.line, 2);
        assert_eq!(&source[expr.start_offset..expr.end_offset], "&str");
    }

    #[test]
    fn page_template() {
        let templates = compile_file(
            Path::new("pages/about.html"),
            "<html lang=\"en\" @title=\"&str\">\n<body>${title}</body>\n</html>",
            &SubPath::parse("pages"),
        )
        .unwrap();
        let page = &templates[0];
        assert_eq!(page.name, "about");
        assert!(page.is_page && page.is_fragment);
        assert_eq!(page.doctype.as_deref(), Some("<!DOCTYPE html>"));
        assert_eq!(page.parameters[0].name, "title");
        assert!(page.document_attributes.contains_key("lang"));
    }

    #[test]
    fn errors_map_to_original_offsets() {
        let source = "<my-card a=\"${x}\">\n</p>\n</my-card>";
        let err = compile(source).unwrap_err();
        assert_eq!(err.code(), "T-1-1");
        let span = err.span().unwrap();
        assert_eq!(&source[span.start..span.start + 4], "</p>");
    }

    #[test]
    fn reserved_character() {
        let err = compile("<my-card>\u{E000}</my-card>").unwrap_err();
        assert_eq!(err.code(), "T-1-2");
        assert_eq!(err.span().unwrap().start, 9);
    }

    #[test]
    fn bare_attribute_is_not_a_parameter() {
        let err = compile("<my-card disabled></my-card>").unwrap_err();
        assert_eq!(err.code(), "T-1-5");
    }
}
