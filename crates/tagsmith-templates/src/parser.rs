/*
 * parser.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Structural parser: tokens to a tag tree.

use crate::lexer::{Attribute, Attributes, Span, Token, tokenize};
use crate::tags::{CODE_TAG, DOCUMENT_TAG, is_reserved_template_name, is_void_element, void_elements};
use std::collections::HashSet;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HtmlNode {
    Tag(Tag),
    Text(TextNode),
}

impl HtmlNode {
    /// Whitespace-only text.
    pub fn is_blank(&self) -> bool {
        matches!(self, HtmlNode::Text(t) if t.content.trim().is_empty())
    }

    pub fn span(&self) -> Span {
        match self {
            HtmlNode::Tag(t) => t.span,
            HtmlNode::Text(t) => t.span,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tag {
    pub name: String,
    pub attributes: Attributes,
    pub children: Vec<HtmlNode>,
    pub self_closing: bool,
    /// Span of the opening tag
    pub span: Span,
}

impl Tag {
    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.get(name)
    }

    pub fn has_attribute(&self, name: &str) -> bool {
        self.attributes.contains_key(name)
    }

    pub fn is_named(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
    }

    /// Concatenated text of the direct text children.
    pub fn text_content(&self) -> String {
        self.children
            .iter()
            .filter_map(|c| match c {
                HtmlNode::Text(t) => Some(t.content.as_str()),
                HtmlNode::Tag(_) => None,
            })
            .collect()
    }

    /// Whether any child is a tag or non-blank text.
    pub fn has_content(&self) -> bool {
        self.children.iter().any(|c| !c.is_blank())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextNode {
    pub content: String,
    pub span: Span,
}

/// Parsed template file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub doctype: Option<String>,
    pub roots: Vec<Tag>,
}

impl Document {
    /// Roots that define templates (everything but `<rust>` blocks).
    pub fn template_roots(&self) -> impl Iterator<Item = &Tag> {
        self.roots.iter().filter(|t| !t.is_named(CODE_TAG))
    }

    /// Roots holding top-level code.
    pub fn code_roots(&self) -> impl Iterator<Item = &Tag> {
        self.roots.iter().filter(|t| t.is_named(CODE_TAG))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    Syntax { message: String, span: Span },
    MultipleDocumentRoots { span: Span },
    ReservedElementName { name: String, span: Span },
}

/// Parse placeholder-substituted template text.
pub fn parse(text: &str) -> Result<Document, ParseError> {
    let tokens = tokenize(text, &void_elements()).map_err(|e| ParseError::Syntax {
        message: e.message,
        span: e.span,
    })?;
    let document = build_tree(normalize_self_closing(tokens))?;
    check_roots(&document)?;
    Ok(document)
}

/// Rewrite `<name/>` to `<name></name>` for every name that also appears
/// with an explicit closing tag anywhere in the file.
pub fn normalize_self_closing(tokens: Vec<Token>) -> Vec<Token> {
    let closed: HashSet<String> = tokens
        .iter()
        .filter_map(|t| match t {
            Token::Close { name, .. } => Some(name.clone()),
            _ => None,
        })
        .collect();

    let mut out = Vec::with_capacity(tokens.len());
    for token in tokens {
        match token {
            Token::Open {
                name,
                attributes,
                self_closing: true,
                void: false,
                span,
            } if closed.contains(&name) => {
                out.push(Token::Open {
                    name: name.clone(),
                    attributes,
                    self_closing: false,
                    void: false,
                    span,
                });
                out.push(Token::Close { name, span });
            }
            other => out.push(other),
        }
    }
    out
}

fn strip_comments(text: &str) -> String {
    let mut out = String::new();
    let mut rest = text;
    while let Some(start) = rest.find("<!--") {
        out.push_str(&rest[..start]);
        match rest[start..].find("-->") {
            Some(end) => rest = &rest[start + end + 3..],
            None => {
                rest = "";
            }
        }
    }
    out.push_str(rest);
    out
}

fn build_tree(tokens: Vec<Token>) -> Result<Document, ParseError> {
    let mut stack: Vec<Tag> = Vec::new();
    let mut roots: Vec<Tag> = Vec::new();
    let mut doctype = None;

    fn append(stack: &mut [Tag], roots: &mut Vec<Tag>, node: HtmlNode) {
        match (stack.last_mut(), node) {
            (Some(parent), node) => parent.children.push(node),
            (None, HtmlNode::Tag(tag)) => roots.push(tag),
            (None, HtmlNode::Text(_)) => {}
        }
    }

    for token in tokens {
        match token {
            Token::Doctype { text, span } => {
                if stack.is_empty() && roots.is_empty() && doctype.is_none() {
                    doctype = Some(text);
                } else {
                    return Err(ParseError::Syntax {
                        message: "`<!DOCTYPE>` must come before the document root".to_string(),
                        span,
                    });
                }
            }
            Token::Open {
                name,
                attributes,
                self_closing,
                void,
                span,
            } => {
                let tag = Tag {
                    name,
                    attributes,
                    children: Vec::new(),
                    self_closing,
                    span,
                };
                if self_closing || void {
                    append(&mut stack, &mut roots, HtmlNode::Tag(tag));
                } else {
                    stack.push(tag);
                }
            }
            Token::Close { name, span } => {
                if is_void_element(&name) {
                    continue;
                }
                match stack.last() {
                    Some(top) if top.name == name => {
                        if let Some(tag) = stack.pop() {
                            append(&mut stack, &mut roots, HtmlNode::Tag(tag));
                        }
                    }
                    Some(top) => {
                        return Err(ParseError::Syntax {
                            message: format!("expected `</{}>` but found `</{}>`", top.name, name),
                            span,
                        });
                    }
                    None => {
                        return Err(ParseError::Syntax {
                            message: format!("unexpected closing tag `</{}>`", name),
                            span,
                        });
                    }
                }
            }
            Token::Text { text, span } => {
                if stack.is_empty() {
                    if !strip_comments(&text).trim().is_empty() {
                        return Err(ParseError::Syntax {
                            message: "text outside of a template root".to_string(),
                            span,
                        });
                    }
                    continue;
                }
                append(
                    &mut stack,
                    &mut roots,
                    HtmlNode::Text(TextNode {
                        content: text,
                        span,
                    }),
                );
            }
        }
    }

    if let Some(top) = stack.last() {
        return Err(ParseError::Syntax {
            message: format!("unclosed `<{}>`", top.name),
            span: top.span,
        });
    }

    Ok(Document { doctype, roots })
}

fn check_roots(document: &Document) -> Result<(), ParseError> {
    for root in document.template_roots() {
        if is_reserved_template_name(&root.name) {
            return Err(ParseError::ReservedElementName {
                name: root.name.clone(),
                span: root.span,
            });
        }
    }

    let templates: Vec<&Tag> = document.template_roots().collect();
    if templates.len() > 1
        && let Some(idx) = templates.iter().position(|t| t.is_named(DOCUMENT_TAG))
    {
        // Report the document root itself unless it comes first.
        return Err(ParseError::MultipleDocumentRoots {
            span: templates[idx.max(1)].span,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn outline(node: &HtmlNode) -> String {
        match node {
            HtmlNode::Text(t) => format!("{:?}", t.content),
            HtmlNode::Tag(t) => {
                let children: Vec<String> = t.children.iter().map(outline).collect();
                format!("{}[{}]", t.name, children.join(" "))
            }
        }
    }

    fn roots(text: &str) -> Vec<String> {
        parse(text)
            .unwrap()
            .roots
            .into_iter()
            .map(|t| outline(&HtmlNode::Tag(t)))
            .collect()
    }

    #[test]
    fn builds_nested_tree() {
        assert_eq!(
            roots("<card>\n  <div><b>x</b><br></div>\n</card>"),
            vec!["card[\"\\n  \" div[b[\"x\"] br[]] \"\\n\"]"]
        );
    }

    #[test]
    fn blank_root_text_is_dropped() {
        assert_eq!(
            roots("\n<!-- two templates -->\n<a-b></a-b>\n\n<c-d></c-d>\n"),
            vec!["a-b[]", "c-d[]"]
        );
    }

    #[test]
    fn root_text_is_an_error() {
        let err = parse("hello <a-b></a-b>").unwrap_err();
        assert!(matches!(err, ParseError::Syntax { ref message, .. } if message.contains("outside")));
    }

    #[test]
    fn self_closing_rewritten_when_also_closed_explicitly() {
        // `x-icon` is closed explicitly once, so `<x-icon/>` closes itself.
        let doc = parse("<card><x-icon/><x-icon>a</x-icon><y-tag/></card>").unwrap();
        let card = &doc.roots[0];
        assert_eq!(
            outline(&HtmlNode::Tag(card.clone())),
            "card[x-icon[] x-icon[\"a\"] y-tag[]]"
        );
        let HtmlNode::Tag(first) = &card.children[0] else {
            panic!("expected tag");
        };
        assert!(!first.self_closing);
        let HtmlNode::Tag(last) = &card.children[2] else {
            panic!("expected tag");
        };
        assert!(last.self_closing);
    }

    #[test]
    fn normalization_is_whole_file() {
        let doc = parse("<a-b><x-y/></a-b><c-d><x-y></x-y></c-d>").unwrap();
        let HtmlNode::Tag(inner) = &doc.roots[0].children[0] else {
            panic!("expected tag");
        };
        assert!(!inner.self_closing);
    }

    #[test]
    fn void_close_tags_are_ignored() {
        assert_eq!(roots("<a-b><br></br></a-b>"), vec!["a-b[br[]]"]);
    }

    #[test]
    fn mismatched_and_unclosed_tags() {
        let err = parse("<a-b><p></a-b>").unwrap_err();
        assert!(matches!(err, ParseError::Syntax { ref message, .. } if message == "expected `</p>` but found `</a-b>`"));

        let err = parse("<a-b><p>").unwrap_err();
        assert!(matches!(err, ParseError::Syntax { ref message, .. } if message == "unclosed `<p>`"));

        let err = parse("</a-b>").unwrap_err();
        assert!(matches!(err, ParseError::Syntax { ref message, .. } if message.contains("unexpected closing")));
    }

    #[test]
    fn doctype_and_document_root() {
        let doc = parse("<!DOCTYPE html>\n<rust>use x::Y;</rust>\n<html lang=\"en\"><body></body></html>").unwrap();
        assert_eq!(doc.doctype.as_deref(), Some("<!DOCTYPE html>"));
        assert_eq!(doc.template_roots().count(), 1);
        assert_eq!(doc.code_roots().next().unwrap().text_content(), "use x::Y;");
    }

    #[test]
    fn document_root_must_be_alone() {
        let err = parse("<html></html><my-card></my-card>").unwrap_err();
        assert!(matches!(err, ParseError::MultipleDocumentRoots { .. }));

        let err = parse("<my-card></my-card><html></html>").unwrap_err();
        assert!(matches!(err, ParseError::MultipleDocumentRoots { span } if span.start == 19));
    }

    #[test]
    fn reserved_root_names() {
        let err = parse("<div></div>").unwrap_err();
        assert_eq!(
            err,
            ParseError::ReservedElementName {
                name: "div".to_string(),
                span: Span::new(0, 5)
            }
        );
        assert!(matches!(
            parse("<context></context>").unwrap_err(),
            ParseError::ReservedElementName { .. }
        ));
    }
}
