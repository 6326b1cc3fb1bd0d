/*
 * codegen.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Code generation: template tree to instruction stream.
//!
//! The generator walks a template's root children and produces a tree of
//! [`Instruction`]s. All literal markup is packed into one string; literal
//! instructions only carry an offset and a length into it. Repeated
//! literal runs share storage.

use crate::error::{TemplateError, TemplateResult};
use crate::expression::{ExprId, TextPart, has_placeholders, single_expression, split_placeholders};
use crate::lexer::{Attribute, Span};
use crate::model::{Template, TemplateDefinition, TemplateParameter};
use crate::parser::{HtmlNode, Tag};
use crate::registry::Registry;
use crate::tags::{
    CLEAR_ATTRIBUTE, CODE_TAG, EACH_ATTRIBUTE, IF_ATTRIBUTE, SCOPE_TAG, is_html_element,
    is_preformatted_element, is_void_element,
};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::Arc;

/// Binding name used by `each="${items}"` without an explicit pattern.
pub const DEFAULT_EACH_BINDING: &str = "it";

/// How a dynamic value is escaped when written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    Text,
    Attribute,
}

/// How interpolated text is converted for the receiving parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Conversion {
    /// Passed as the formatted `String`
    Owned,
    /// `&format!(..)`
    Borrow,
    /// `format!(..).into()`
    Into,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArgValue {
    /// Rust code built from literal attribute text
    Literal(String),
    /// A spliced template expression
    Expr { expr: ExprId, code: String },
    /// Literal text mixed with expressions
    Interpolated {
        format: String,
        args: Vec<(ExprId, String)>,
        conversion: Conversion,
        nullable: bool,
    },
    /// The callee's declared default
    Default(String),
    Content {
        body: Vec<Instruction>,
        nullable: bool,
    },
    None,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Argument {
    pub parameter: String,
    pub value: ArgValue,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Instruction {
    Literal {
        offset: usize,
        len: usize,
    },
    Write {
        expr: ExprId,
        code: String,
        mode: WriteMode,
    },
    /// Rust statements spliced verbatim
    Code(String),
    Scope {
        clear: bool,
        body: Vec<Instruction>,
    },
    Bind {
        key: String,
        value: ArgValue,
    },
    ClearBindings,
    If {
        condition: String,
        expr: Option<ExprId>,
        body: Vec<Instruction>,
    },
    Each {
        binding: String,
        iterable: String,
        expr: Option<ExprId>,
        body: Vec<Instruction>,
    },
    Call {
        alias: String,
        args: Vec<Argument>,
    },
}

/// A module imported by generated code.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct Import {
    pub module: String,
    pub alias: String,
}

#[derive(Debug, Clone, Default)]
pub struct GenerateOptions {
    /// Dashed tag names rendered as plain custom elements
    pub passthrough_elements: HashSet<String>,
}

/// Output of [`generate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Generated {
    pub instructions: Vec<Instruction>,
    pub imports: Vec<Import>,
    pub literals: String,
    /// Every tag name looked up in the registry
    pub referenced: BTreeSet<String>,
}

impl Generated {
    pub fn literal(&self, offset: usize, len: usize) -> &str {
        &self.literals[offset..offset + len]
    }
}

/// How a tag is handled, in priority order.
enum TagKind {
    Scoping,
    Code,
    SelfReference,
    TemplateCall(Arc<TemplateDefinition>),
    Element,
}

#[derive(Default)]
struct Block {
    instructions: Vec<Instruction>,
    pending: String,
}

struct Generator<'a> {
    template: &'a Template,
    registry: &'a Registry,
    options: &'a GenerateOptions,
    literals: String,
    imports: BTreeMap<String, String>,
    referenced: BTreeSet<String>,
}

/// Generate the instruction stream of one template.
pub fn generate(
    template: &Template,
    registry: &Registry,
    options: &GenerateOptions,
) -> TemplateResult<Generated> {
    let mut generator = Generator {
        template,
        registry,
        options,
        literals: String::new(),
        imports: BTreeMap::new(),
        referenced: BTreeSet::new(),
    };

    let mut block = Block::default();
    if template.is_page {
        generator.document(&mut block)?;
    } else {
        generator.nodes(&template.root.children, &mut block)?;
    }
    let instructions = generator.finish(block);

    let mut imports: Vec<Import> = generator
        .imports
        .into_iter()
        .map(|(alias, module)| Import { module, alias })
        .collect();
    imports.sort();

    Ok(Generated {
        instructions,
        imports,
        literals: generator.literals,
        referenced: generator.referenced,
    })
}

/// Children with blank leading and trailing text removed.
fn trimmed(nodes: &[HtmlNode]) -> &[HtmlNode] {
    let start = nodes.iter().position(|n| !n.is_blank()).unwrap_or(nodes.len());
    let end = nodes.iter().rposition(|n| !n.is_blank()).map_or(start, |i| i + 1);
    &nodes[start..end]
}

fn is_string_like(ty: &str) -> bool {
    let ty = ty.trim();
    ty.ends_with("str") || ty.ends_with("String") || ty.starts_with("Cow<") || ty.contains("Into<String>")
}

fn escape_format(text: &str) -> String {
    text.replace('{', "{{").replace('}', "}}")
}

impl<'a> Generator<'a> {
    fn literal(&self, block: &mut Block, text: &str) {
        block.pending.push_str(text);
    }

    fn flush(&mut self, block: &mut Block) {
        if block.pending.is_empty() {
            return;
        }
        let text = std::mem::take(&mut block.pending);
        let offset = match self.literals.find(&text) {
            Some(offset) => offset,
            None => {
                let offset = self.literals.len();
                self.literals.push_str(&text);
                offset
            }
        };
        block.instructions.push(Instruction::Literal {
            offset,
            len: text.len(),
        });
    }

    fn push(&mut self, block: &mut Block, instruction: Instruction) {
        self.flush(block);
        block.instructions.push(instruction);
    }

    fn finish(&mut self, mut block: Block) -> Vec<Instruction> {
        self.flush(&mut block);
        block.instructions
    }

    fn span(&self, span: Span) -> Option<Span> {
        Some(self.template.original_span(span))
    }

    fn syntax_error(&self, message: impl Into<String>, span: Span) -> TemplateError {
        TemplateError::Syntax {
            file: self.template.file.clone(),
            message: message.into(),
            span: self.span(span),
        }
    }

    fn expression_code(&self, id: ExprId) -> String {
        self.template
            .expressions
            .get(id)
            .map_or_else(|| id.placeholder(), |e| e.raw.clone())
    }

    fn document(&mut self, block: &mut Block) -> TemplateResult<()> {
        let template = self.template;
        if let Some(doctype) = &template.doctype {
            self.literal(block, doctype);
            self.literal(block, "\n");
        }
        self.literal(block, "<html");
        for (name, attribute) in &template.document_attributes {
            self.attribute(name, attribute, block)?;
        }
        self.literal(block, ">");
        self.nodes(&template.root.children, block)?;
        self.literal(block, "</html>");
        Ok(())
    }

    fn nodes(&mut self, nodes: &[HtmlNode], block: &mut Block) -> TemplateResult<()> {
        for node in trimmed(nodes) {
            self.node(node, block)?;
        }
        Ok(())
    }

    fn node(&mut self, node: &HtmlNode, block: &mut Block) -> TemplateResult<()> {
        match node {
            HtmlNode::Text(text) => {
                self.text(&text.content, WriteMode::Text, block);
                Ok(())
            }
            HtmlNode::Tag(tag) => self.tag(tag, block),
        }
    }

    fn text(&mut self, content: &str, mode: WriteMode, block: &mut Block) {
        for part in split_placeholders(content) {
            match part {
                TextPart::Literal(text) => self.literal(block, text),
                TextPart::Expression(expr) => {
                    let code = self.expression_code(expr);
                    self.push(block, Instruction::Write { expr, code, mode });
                }
            }
        }
    }

    fn classify(&mut self, tag: &Tag) -> TemplateResult<TagKind> {
        if tag.is_named(SCOPE_TAG) {
            return Ok(TagKind::Scoping);
        }
        if tag.is_named(CODE_TAG) {
            return Ok(TagKind::Code);
        }
        if is_html_element(&tag.name) {
            return Ok(TagKind::Element);
        }

        self.referenced.insert(tag.name.clone());
        match self.registry.resolve(&self.template.sub_path, &tag.name) {
            Ok(Some(def)) if def.key() == self.template.key() => Ok(TagKind::SelfReference),
            Ok(Some(def)) => Ok(TagKind::TemplateCall(def)),
            Ok(None) => {
                if tag.name.contains('-') && !self.options.passthrough_elements.contains(&tag.name) {
                    Err(TemplateError::UnknownTag {
                        file: self.template.file.clone(),
                        template: self.template.name.clone(),
                        tag: tag.name.clone(),
                        span: self.span(tag.span),
                    })
                } else {
                    Ok(TagKind::Element)
                }
            }
            Err(ambiguous) => Err(TemplateError::AmbiguousTag {
                file: self.template.file.clone(),
                template: self.template.name.clone(),
                tag: tag.name.clone(),
                candidates: ambiguous.candidates.iter().map(|c| c.describe()).collect(),
                span: self.span(tag.span),
            }),
        }
    }

    /// Emit a tag, wrapping it in its `if`/`each` control blocks. The first
    /// declared control attribute is the outermost block.
    fn tag(&mut self, tag: &Tag, block: &mut Block) -> TemplateResult<()> {
        let controls: Vec<(&String, &Attribute)> = tag
            .attributes
            .iter()
            .filter(|(name, _)| *name == IF_ATTRIBUTE || *name == EACH_ATTRIBUTE)
            .collect();
        if controls.is_empty() {
            return self.plain_tag(tag, block);
        }

        let mut stripped = tag.clone();
        for (name, _) in &controls {
            stripped.attributes.remove(*name);
        }

        let mut body = Block::default();
        self.plain_tag(&stripped, &mut body)?;
        let mut instructions = self.finish(body);

        for (name, attribute) in controls.iter().rev() {
            let value = attribute.value.as_deref().unwrap_or("");
            let wrapped = if *name == IF_ATTRIBUTE {
                let (condition, expr) = self.code_value(value, attribute.span)?;
                Instruction::If {
                    condition,
                    expr,
                    body: instructions,
                }
            } else {
                let (binding, iterable) = match value.find(" in ") {
                    Some(idx) => (value[..idx].trim(), &value[idx + 4..]),
                    None => (DEFAULT_EACH_BINDING, value),
                };
                if binding.is_empty() || has_placeholders(binding) {
                    return Err(self.syntax_error("`each` needs a binding pattern before `in`", attribute.span));
                }
                let (iterable, expr) = self.code_value(iterable, attribute.span)?;
                Instruction::Each {
                    binding: binding.to_string(),
                    iterable,
                    expr,
                    body: instructions,
                }
            };
            instructions = vec![wrapped];
        }

        self.flush(block);
        block.instructions.extend(instructions);
        Ok(())
    }

    /// Rust code of a control attribute: one expression, or plain code.
    fn code_value(&self, value: &str, span: Span) -> TemplateResult<(String, Option<ExprId>)> {
        let value = value.trim();
        if let Some(expr) = single_expression(value) {
            return Ok((self.expression_code(expr), Some(expr)));
        }
        let code = self.template.expressions.restore_code(value);
        if code.trim().is_empty() {
            return Err(self.syntax_error("control attribute needs an expression", span));
        }
        Ok((code, None))
    }

    fn plain_tag(&mut self, tag: &Tag, block: &mut Block) -> TemplateResult<()> {
        match self.classify(tag)? {
            TagKind::Scoping => self.scope(tag, block),
            TagKind::Code => {
                let code = self.template.expressions.restore(&tag.text_content());
                self.push(block, Instruction::Code(code));
                Ok(())
            }
            TagKind::SelfReference => {
                let markup = self.template.expressions.restore(&serialize_children(tag));
                self.literal(block, &markup);
                Ok(())
            }
            TagKind::TemplateCall(def) => self.call(tag, &def, block),
            TagKind::Element => self.element(tag, block),
        }
    }

    fn scope(&mut self, tag: &Tag, block: &mut Block) -> TemplateResult<()> {
        let clear = tag.has_attribute(CLEAR_ATTRIBUTE);
        let mut binds = Vec::new();
        for (key, attribute) in &tag.attributes {
            if key == CLEAR_ATTRIBUTE {
                continue;
            }
            let value = match &attribute.value {
                Some(value) if !has_placeholders(value) => ArgValue::Literal(format!("{:?}", value)),
                Some(value) => self.text_value(value, "String", false),
                None => ArgValue::Literal("true".to_string()),
            };
            binds.push(Instruction::Bind {
                key: key.clone(),
                value,
            });
        }

        if tag.has_content() {
            let mut body = Block::default();
            body.instructions.extend(binds);
            self.nodes(&tag.children, &mut body)?;
            let body = self.finish(body);
            self.push(block, Instruction::Scope { clear, body });
        } else {
            if clear {
                self.push(block, Instruction::ClearBindings);
            }
            for bind in binds {
                self.push(block, bind);
            }
        }
        Ok(())
    }

    fn element(&mut self, tag: &Tag, block: &mut Block) -> TemplateResult<()> {
        self.literal(block, "<");
        self.literal(block, &tag.name);
        for (name, attribute) in &tag.attributes {
            self.attribute(name, attribute, block)?;
        }
        self.literal(block, ">");
        if is_void_element(&tag.name) {
            return Ok(());
        }
        if is_preformatted_element(&tag.name) {
            for child in &tag.children {
                self.node(child, block)?;
            }
        } else {
            self.nodes(&tag.children, block)?;
        }
        self.literal(block, "</");
        self.literal(block, &tag.name);
        self.literal(block, ">");
        Ok(())
    }

    fn attribute(&mut self, name: &str, attribute: &Attribute, block: &mut Block) -> TemplateResult<()> {
        if has_placeholders(name) {
            return Err(self.syntax_error("expressions are not allowed in attribute names", attribute.span));
        }
        self.literal(block, " ");
        self.literal(block, name);
        if let Some(value) = &attribute.value {
            self.literal(block, "=\"");
            self.text(value, WriteMode::Attribute, block);
            self.literal(block, "\"");
        }
        Ok(())
    }

    fn import(&mut self, def: &TemplateDefinition) -> String {
        let mut alias = def.alias.clone();
        let mut n = 2;
        while let Some(module) = self.imports.get(&alias) {
            if module == &def.module {
                return alias;
            }
            alias = format!("{}_{}", def.alias, n);
            n += 1;
        }
        self.imports.insert(alias.clone(), def.module.clone());
        alias
    }

    /// Rust value for an attribute passed to a parameter of type `ty`.
    fn text_value(&self, value: &str, ty: &str, nullable: bool) -> ArgValue {
        if let Some(expr) = single_expression(value.trim()) {
            return ArgValue::Expr {
                expr,
                code: self.expression_code(expr),
            };
        }

        if !has_placeholders(value) {
            let code = if is_string_like(ty) {
                format!("{:?}.into()", value)
            } else {
                value.trim().to_string()
            };
            return ArgValue::Literal(if nullable { format!("Some({})", code) } else { code });
        }

        let mut format = String::new();
        let mut args = Vec::new();
        for part in split_placeholders(value) {
            match part {
                TextPart::Literal(text) => format.push_str(&escape_format(text)),
                TextPart::Expression(expr) => {
                    format.push_str("{}");
                    args.push((expr, self.expression_code(expr)));
                }
            }
        }
        let conversion = if ty.trim_start().starts_with('&') {
            Conversion::Borrow
        } else if ty == "String" {
            Conversion::Owned
        } else {
            Conversion::Into
        };
        ArgValue::Interpolated {
            format,
            args,
            conversion,
            nullable,
        }
    }

    fn call(&mut self, tag: &Tag, def: &TemplateDefinition, block: &mut Block) -> TemplateResult<()> {
        let alias = self.import(def);
        let mut remaining: Vec<&HtmlNode> = tag.children.iter().collect();
        let mut args = Vec::with_capacity(def.parameters.len());

        for param in &def.parameters {
            let value = if let Some(attribute) = tag.attribute(&param.name) {
                self.scalar_argument(tag, param, attribute)?
            } else if param.is_primary_content() {
                let children: Vec<HtmlNode> = remaining.drain(..).cloned().collect();
                self.content_argument(tag, param, &children)?
            } else if param.is_content {
                let slot = remaining
                    .iter()
                    .position(|n| matches!(n, HtmlNode::Tag(t) if t.name == param.name));
                match slot {
                    Some(idx) => match remaining.remove(idx) {
                        HtmlNode::Tag(slot) => self.content_argument(tag, param, &slot.children)?,
                        HtmlNode::Text(_) => ArgValue::None,
                    },
                    None => self.content_argument(tag, param, &[])?,
                }
            } else {
                self.missing_argument(tag, param)?
            };
            args.push(Argument {
                parameter: param.name.clone(),
                value,
            });
        }

        if let Some(unknown) = tag.attributes.keys().find(|name| def.parameter(name).is_none()) {
            return Err(TemplateError::UnknownAttribute {
                file: self.template.file.clone(),
                template: self.template.name.clone(),
                tag: tag.name.clone(),
                attribute: unknown.clone(),
                span: self.span(tag.span),
            });
        }
        if remaining.iter().any(|n| !n.is_blank()) {
            return Err(TemplateError::UnexpectedContent {
                file: self.template.file.clone(),
                template: self.template.name.clone(),
                tag: tag.name.clone(),
                span: self.span(tag.span),
            });
        }

        self.push(block, Instruction::Call { alias, args });
        Ok(())
    }

    fn scalar_argument(
        &self,
        tag: &Tag,
        param: &TemplateParameter,
        attribute: &Attribute,
    ) -> TemplateResult<ArgValue> {
        let Some(value) = &attribute.value else {
            return Ok(ArgValue::Literal(if param.is_nullable {
                "Some(true)".to_string()
            } else {
                "true".to_string()
            }));
        };

        let base = param.ty.trim();
        let base = base
            .strip_prefix("Option<")
            .and_then(|s| s.strip_suffix('>'))
            .unwrap_or(base);
        let argument = self.text_value(value, base, param.is_nullable);

        if let ArgValue::Expr { code, .. } = &argument
            && code == "None"
            && !param.is_nullable
        {
            return Err(TemplateError::NullToNonNullable {
                file: self.template.file.clone(),
                template: self.template.name.clone(),
                tag: tag.name.clone(),
                attribute: param.name.clone(),
                span: self.span(attribute.span),
            });
        }
        Ok(argument)
    }

    fn content_argument(
        &mut self,
        tag: &Tag,
        param: &TemplateParameter,
        children: &[HtmlNode],
    ) -> TemplateResult<ArgValue> {
        if trimmed(children).is_empty() {
            return self.missing_argument(tag, param);
        }
        let mut body = Block::default();
        self.nodes(children, &mut body)?;
        Ok(ArgValue::Content {
            body: self.finish(body),
            nullable: param.is_nullable,
        })
    }

    fn missing_argument(&self, tag: &Tag, param: &TemplateParameter) -> TemplateResult<ArgValue> {
        if let Some(default) = &param.default {
            return Ok(ArgValue::Default(default.clone()));
        }
        if param.is_nullable {
            return Ok(ArgValue::None);
        }
        let file = self.template.file.clone();
        let template = self.template.name.clone();
        let span = self.span(tag.span);
        Err(if param.is_content {
            TemplateError::MissingContent {
                file,
                template,
                tag: tag.name.clone(),
                parameter: param.name.clone(),
                span,
            }
        } else {
            TemplateError::MissingAttribute {
                file,
                template,
                tag: tag.name.clone(),
                attribute: param.name.clone(),
                span,
            }
        })
    }
}

/// Markup of a tag subtree, placeholders left in place.
/// Markup of a tag's children, without the tag itself.
pub fn serialize_children(tag: &Tag) -> String {
    let mut out = String::new();
    for child in &tag.children {
        match child {
            HtmlNode::Tag(t) => serialize_into(t, &mut out),
            HtmlNode::Text(t) => out.push_str(&t.content),
        }
    }
    out
}

fn serialize_into(tag: &Tag, out: &mut String) {
    out.push('<');
    out.push_str(&tag.name);
    for (name, attribute) in &tag.attributes {
        out.push(' ');
        out.push_str(name);
        if let Some(value) = &attribute.value {
            out.push_str("=\"");
            out.push_str(value);
            out.push('"');
        }
    }
    if tag.self_closing && tag.children.is_empty() {
        out.push_str("/>");
        return;
    }
    out.push('>');
    if is_void_element(&tag.name) {
        return;
    }
    out.push_str(&serialize_children(tag));
    out.push_str("</");
    out.push_str(&tag.name);
    out.push('>');
}
