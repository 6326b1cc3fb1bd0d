/*
 * emit.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Rust source emission for generated templates.

use crate::codegen::{ArgValue, Conversion, Generated, Instruction, WriteMode};
use crate::error::path_key;
use crate::layout::GENERATED_HEADER;
use crate::marker::marker;
use crate::model::Template;
use std::fmt::Write as _;

const INDENT: &str = "    ";

/// Lints silenced in generated modules.
pub const ALLOWED_LINTS: &str = "unused_imports, unused_variables, unused_mut, unused_parens, non_snake_case, clippy::all";

/// Render the generated module of one template.
pub fn emit(template: &Template, generated: &Generated) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{} from {}; do not edit.",
        GENERATED_HEADER,
        path_key(&template.file)
    );
    let _ = writeln!(out, "#![allow({})]", ALLOWED_LINTS);
    out.push('\n');

    out.push_str("use tagsmith_runtime::{Content, Html};\n");
    for import in &generated.imports {
        let _ = writeln!(out, "use {} as {};", import.module, import.alias);
    }
    out.push('\n');

    let _ = writeln!(out, "const LITERALS: &str = {:?};", generated.literals);
    out.push('\n');

    out.push_str("pub fn render(out: &mut Html");
    for param in &template.parameters {
        let _ = write!(out, ", {}: {}", param.name, param.ty);
        if let Some(id) = param.type_expr {
            let _ = write!(out, " {}", marker(id));
        }
    }
    out.push_str(") {\n");
    let mut emitter = Emitter { out };
    emitter.block(&generated.instructions, 1);
    let mut out = emitter.out;
    out.push_str("}\n");

    for code in template.top_level_code.iter() {
        let code = code.trim_matches('\n');
        if code.trim().is_empty() {
            continue;
        }
        out.push('\n');
        out.push_str(code);
        out.push('\n');
    }
    out
}

struct Emitter {
    out: String,
}

impl Emitter {
    fn line(&mut self, depth: usize, text: &str) {
        for _ in 0..depth {
            self.out.push_str(INDENT);
        }
        self.out.push_str(text);
        self.out.push('\n');
    }

    fn block(&mut self, instructions: &[Instruction], depth: usize) {
        for instruction in instructions {
            self.instruction(instruction, depth);
        }
    }

    fn instruction(&mut self, instruction: &Instruction, depth: usize) {
        match instruction {
            Instruction::Literal { offset, len } => {
                self.line(depth, &format!("out.literal(&LITERALS[{}..{}]);", offset, offset + len));
            }
            Instruction::Write { expr, code, mode } => {
                let method = match mode {
                    WriteMode::Text => "write",
                    WriteMode::Attribute => "write_attr",
                };
                self.line(depth, &format!("out.{}(&({}) {});", method, code, marker(*expr)));
            }
            Instruction::Code(code) => {
                for line in code.trim_matches('\n').lines() {
                    self.line(depth, line.trim_end());
                }
            }
            Instruction::Scope { clear, body } => {
                self.line(depth, &format!("out.scope({}, |out| {{", clear));
                self.block(body, depth + 1);
                self.line(depth, "});");
            }
            Instruction::Bind { key, value } => {
                let value = self.value(value, depth);
                self.line(depth, &format!("out.bind({:?}, {});", key, value));
            }
            Instruction::ClearBindings => self.line(depth, "out.clear_bindings();"),
            Instruction::If {
                condition,
                expr,
                body,
            } => {
                self.line(depth, &format!("if {} {{", spliced(condition, *expr)));
                self.block(body, depth + 1);
                self.line(depth, "}");
            }
            Instruction::Each {
                binding,
                iterable,
                expr,
                body,
            } => {
                self.line(
                    depth,
                    &format!("for {} in {} {{", binding, spliced(iterable, *expr)),
                );
                self.block(body, depth + 1);
                self.line(depth, "}");
            }
            Instruction::Call { alias, args } => {
                self.line(depth, &format!("{}::render(", alias));
                self.line(depth + 1, "out,");
                for arg in args {
                    let value = self.value(&arg.value, depth + 1);
                    self.line(depth + 1, &format!("{},", value));
                }
                self.line(depth, ");");
            }
        }
    }

    /// Rust expression for an argument or binding value. Content blocks are
    /// rendered at `depth`.
    fn value(&mut self, value: &ArgValue, depth: usize) -> String {
        match value {
            ArgValue::Literal(code) | ArgValue::Default(code) => code.clone(),
            ArgValue::Expr { expr, code } => spliced(code, Some(*expr)),
            ArgValue::None => "None".to_string(),
            ArgValue::Interpolated {
                format,
                args,
                conversion,
                nullable,
            } => {
                let mut call = format!("format!({:?}", format);
                for (expr, code) in args {
                    let _ = write!(call, ", {}", spliced(code, Some(*expr)));
                }
                call.push(')');
                let converted = match conversion {
                    Conversion::Owned => call,
                    Conversion::Borrow => format!("&{}", call),
                    Conversion::Into => format!("{}.into()", call),
                };
                if *nullable {
                    format!("Some({})", converted)
                } else {
                    converted
                }
            }
            ArgValue::Content { body, nullable } => {
                let mut inner = Emitter { out: String::new() };
                inner.block(body, depth + 1);
                let mut indent = String::new();
                for _ in 0..depth {
                    indent.push_str(INDENT);
                }
                let block = format!("Content::new(|out| {{\n{}{}}})", inner.out, indent);
                if *nullable {
                    format!("Some({})", block)
                } else {
                    block
                }
            }
        }
    }
}

fn spliced(code: &str, expr: Option<crate::expression::ExprId>) -> String {
    match expr {
        Some(id) => format!("({}) {}", code, marker(id)),
        None => code.to_string(),
    }
}
