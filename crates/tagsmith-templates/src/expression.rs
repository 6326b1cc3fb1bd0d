/*
 * expression.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Embedded expression extraction.
//!
//! Template text may embed Rust expressions as `${expr}` or `$identifier`.
//! Before the markup is tokenized, every expression is cut out of the text
//! and replaced with a placeholder token so that the tag tokenizer never has
//! to understand Rust syntax. The expressions themselves are kept in an
//! [`ExpressionTable`] for code generation and for mapping compiler
//! diagnostics back to the template.
//!
//! Placeholders are built from two private-use characters around the decimal
//! expression id. Template sources containing either character are rejected,
//! which keeps substitution injective.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use tagsmith_source_map::{RangeMapping, map_through};

pub const PLACEHOLDER_OPEN: char = '\u{E000}';
pub const PLACEHOLDER_CLOSE: char = '\u{E001}';

static NEXT_EXPR_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identifier of an embedded expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ExprId(pub u64);

impl ExprId {
    pub fn next() -> Self {
        ExprId(NEXT_EXPR_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn placeholder(self) -> String {
        format!("{}{}{}", PLACEHOLDER_OPEN, self.0, PLACEHOLDER_CLOSE)
    }
}

impl fmt::Display for ExprId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "e{}", self.0)
    }
}

/// 1-based line and column (columns count characters).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Position {
    pub line: usize,
    pub column: usize,
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpressionKind {
    /// `${expr}` or `$ident` in template text
    Interpolation,
    /// Type of a declared template parameter
    ParameterType,
}

/// An expression cut out of template text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbeddedExpression {
    pub id: ExprId,
    pub kind: ExpressionKind,
    /// Expression text with surrounding whitespace trimmed
    pub raw: String,
    /// The exact source span, delimiters included
    pub original: String,
    pub start: Position,
    /// Position just past the end of the span
    pub end: Position,
    /// Byte offsets of the span in the original source
    pub start_offset: usize,
    pub end_offset: usize,
    pub braced: bool,
    pub placeholder: String,
}

/// All expressions of one template file, in source order.
#[derive(Debug, Clone, Default)]
pub struct ExpressionTable {
    expressions: Vec<EmbeddedExpression>,
    index: HashMap<ExprId, usize>,
}

impl ExpressionTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, expression: EmbeddedExpression) {
        self.index.insert(expression.id, self.expressions.len());
        self.expressions.push(expression);
    }

    pub fn get(&self, id: ExprId) -> Option<&EmbeddedExpression> {
        self.index.get(&id).map(|&idx| &self.expressions[idx])
    }

    pub fn iter(&self) -> impl Iterator<Item = &EmbeddedExpression> {
        self.expressions.iter()
    }

    pub fn len(&self) -> usize {
        self.expressions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.expressions.is_empty()
    }

    /// Replace every placeholder in `text` with the original source span.
    pub fn restore(&self, text: &str) -> String {
        let mut out = String::with_capacity(text.len());
        for part in split_placeholders(text) {
            match part {
                TextPart::Literal(s) => out.push_str(s),
                TextPart::Expression(id) => match self.get(id) {
                    Some(expr) => out.push_str(&expr.original),
                    None => out.push_str(&id.placeholder()),
                },
            }
        }
        out
    }

    /// Replace every placeholder in `text` with the bare expression code.
    pub fn restore_code(&self, text: &str) -> String {
        let mut out = String::with_capacity(text.len());
        for part in split_placeholders(text) {
            match part {
                TextPart::Literal(s) => out.push_str(s),
                TextPart::Expression(id) => match self.get(id) {
                    Some(expr) => out.push_str(&expr.raw),
                    None => out.push_str(&id.placeholder()),
                },
            }
        }
        out
    }
}

/// Result of [`extract`].
#[derive(Debug, Clone)]
pub struct Extraction {
    /// Source text with expressions replaced by placeholders
    pub text: String,
    pub expressions: ExpressionTable,
    /// Piecewise mapping from `text` offsets to original offsets
    pub mapping: Vec<RangeMapping>,
}

impl Extraction {
    /// Map a byte offset in the substituted text back to the original source.
    ///
    /// Offsets inside a placeholder map to the start of its expression.
    pub fn original_offset(&self, offset: usize) -> usize {
        map_through(&self.mapping, offset)
            .unwrap_or_else(|| self.mapping.last().map_or(offset, |m| m.to_end))
    }
}

/// The source contained a character reserved for placeholders.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReservedCharacter {
    pub offset: usize,
    pub character: char,
}

/// Extract embedded expressions from template source text.
pub fn extract(source: &str) -> Result<Extraction, ReservedCharacter> {
    if let Some((offset, character)) = source
        .char_indices()
        .find(|(_, c)| *c == PLACEHOLDER_OPEN || *c == PLACEHOLDER_CLOSE)
    {
        return Err(ReservedCharacter { offset, character });
    }

    let mut scanner = Scanner::new(source);
    scanner.run();
    Ok(Extraction {
        text: scanner.out,
        expressions: scanner.expressions,
        mapping: scanner.mapping,
    })
}

struct Scanner<'s> {
    source: &'s str,
    chars: Vec<(usize, char)>,
    pos: usize,
    line: usize,
    column: usize,
    out: String,
    expressions: ExpressionTable,
    mapping: Vec<RangeMapping>,
}

impl<'s> Scanner<'s> {
    fn new(source: &'s str) -> Self {
        Scanner {
            source,
            chars: source.char_indices().collect(),
            pos: 0,
            line: 1,
            column: 1,
            out: String::with_capacity(source.len()),
            expressions: ExpressionTable::new(),
            mapping: Vec::new(),
        }
    }

    fn peek(&self, idx: usize) -> Option<char> {
        self.chars.get(idx).map(|&(_, c)| c)
    }

    fn byte_at(&self, idx: usize) -> usize {
        self.chars.get(idx).map_or(self.source.len(), |&(o, _)| o)
    }

    fn run(&mut self) {
        while let Some(c) = self.peek(self.pos) {
            match c {
                '\\' if self.peek(self.pos + 1) == Some('$') => self.escaped_dollar(),
                '$' => match self.peek(self.pos + 1) {
                    Some('{') => match find_closing_brace(&self.chars, self.pos + 2) {
                        Some(close)
                            if !self.source[self.byte_at(self.pos + 2)..self.byte_at(close)]
                                .trim()
                                .is_empty() =>
                        {
                            self.braced(close)
                        }
                        _ => self.literal_char(),
                    },
                    Some(n) if n.is_alphabetic() || n == '_' => self.bare(),
                    _ => self.literal_char(),
                },
                _ => self.literal_char(),
            }
        }
    }

    fn advance(&mut self, c: char) {
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
    }

    fn literal_char(&mut self) {
        let (offset, c) = self.chars[self.pos];
        let from = self.out.len();
        self.out.push(c);
        self.map_literal(from, offset, c.len_utf8());
        self.advance(c);
        self.pos += 1;
    }

    fn map_literal(&mut self, from: usize, to: usize, len: usize) {
        if let Some(last) = self.mapping.last_mut() {
            let linear = last.from_end - last.from_start == last.to_end - last.to_start;
            if linear && last.from_end == from && last.to_end == to {
                last.from_end += len;
                last.to_end += len;
                return;
            }
        }
        self.mapping.push(RangeMapping {
            from_start: from,
            from_end: from + len,
            to_start: to,
            to_end: to + len,
        });
    }

    // `\$` becomes a literal `$`
    fn escaped_dollar(&mut self) {
        let offset = self.byte_at(self.pos);
        let from = self.out.len();
        self.out.push('$');
        self.mapping.push(RangeMapping {
            from_start: from,
            from_end: from + 1,
            to_start: offset,
            to_end: offset + 2,
        });
        self.advance('\\');
        self.advance('$');
        self.pos += 2;
    }

    fn braced(&mut self, close: usize) {
        let start_offset = self.byte_at(self.pos);
        let end_offset = self.byte_at(close + 1);
        let source = self.source;
        let content = &source[self.byte_at(self.pos + 2)..self.byte_at(close)];
        self.register(start_offset, end_offset, content, true);

        for idx in self.pos..=close {
            let c = self.chars[idx].1;
            self.advance(c);
        }
        self.pos = close + 1;
    }

    fn bare(&mut self) {
        let mut end = self.pos + 1;
        while self
            .peek(end)
            .is_some_and(|c| c.is_alphanumeric() || c == '_')
        {
            end += 1;
        }
        let start_offset = self.byte_at(self.pos);
        let end_offset = self.byte_at(end);
        let source = self.source;
        let content = &source[self.byte_at(self.pos + 1)..end_offset];
        self.register(start_offset, end_offset, content, false);

        self.column += end - self.pos;
        self.pos = end;
    }

    fn register(&mut self, start_offset: usize, end_offset: usize, content: &str, braced: bool) {
        let id = ExprId::next();
        let placeholder = id.placeholder();
        let start = Position {
            line: self.line,
            column: self.column,
        };

        let from = self.out.len();
        self.out.push_str(&placeholder);
        self.mapping.push(RangeMapping {
            from_start: from,
            from_end: from + placeholder.len(),
            to_start: start_offset,
            to_end: end_offset,
        });

        self.expressions.push(EmbeddedExpression {
            id,
            kind: ExpressionKind::Interpolation,
            raw: content.trim().to_string(),
            original: self.source[start_offset..end_offset].to_string(),
            start,
            end: end_position(start, content, braced),
            start_offset,
            end_offset,
            braced,
            placeholder,
        });
    }
}

/// Position just past an expression span starting at `start`.
///
/// Single-line spans end `content length + 3` columns later for the braced
/// form (`${`, `}`) and `+ 1` for the bare form (`$`). A multi-line span ends
/// on the content's last line at column `last line length + 2`: one for the
/// closing brace and one because columns are 1-based.
pub fn end_position(start: Position, content: &str, braced: bool) -> Position {
    let newlines = content.matches('\n').count();
    if newlines == 0 {
        let delimiters = if braced { 3 } else { 1 };
        return Position {
            line: start.line,
            column: start.column + content.chars().count() + delimiters,
        };
    }
    let last_line = content.rsplit('\n').next().unwrap_or("");
    Position {
        line: start.line + newlines,
        column: last_line.chars().count() + 2,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScanState {
    Normal,
    InString(char),
    Escaped(char),
}

/// Index of the `}` closing a `${` whose content starts at `from`.
fn find_closing_brace(chars: &[(usize, char)], from: usize) -> Option<usize> {
    let mut depth = 1usize;
    let mut state = ScanState::Normal;
    let mut idx = from;

    while let Some(&(_, c)) = chars.get(idx) {
        state = match state {
            ScanState::Normal => match c {
                '{' => {
                    depth += 1;
                    ScanState::Normal
                }
                '}' => {
                    depth -= 1;
                    if depth == 0 {
                        return Some(idx);
                    }
                    ScanState::Normal
                }
                '"' => ScanState::InString(c),
                // A quote without a char literal shape starts a lifetime or label.
                '\'' => {
                    if let Some(len) = char_literal_len(&chars[idx..]) {
                        idx += len;
                        continue;
                    }
                    ScanState::Normal
                }
                _ => ScanState::Normal,
            },
            ScanState::InString(quote) => {
                if c == '\\' {
                    ScanState::Escaped(quote)
                } else if c == quote {
                    ScanState::Normal
                } else {
                    ScanState::InString(quote)
                }
            }
            ScanState::Escaped(quote) => ScanState::InString(quote),
        };
        idx += 1;
    }
    None
}

/// Length in chars of the char literal starting at `rest[0]`, if any.
///
/// Accepts `'x'`, `'\n'`, `'\''` and `'\u{1F600}'`.
fn char_literal_len(rest: &[(usize, char)]) -> Option<usize> {
    let at = |i: usize| rest.get(i).map(|&(_, c)| c);
    match at(1)? {
        '\\' => (3..rest.len().min(13)).find(|&i| at(i) == Some('\'')).map(|i| i + 1),
        '\'' | '\n' => None,
        _ => (at(2) == Some('\'')).then_some(3),
    }
}

/// A piece of placeholder-substituted text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextPart<'a> {
    Literal(&'a str),
    Expression(ExprId),
}

/// Split substituted text into literal runs and expression references.
pub fn split_placeholders(text: &str) -> Vec<TextPart<'_>> {
    let mut parts = Vec::new();
    let mut rest = text;

    while let Some(open) = rest.find(PLACEHOLDER_OPEN) {
        let after = &rest[open + PLACEHOLDER_OPEN.len_utf8()..];
        let Some(close) = after.find(PLACEHOLDER_CLOSE) else {
            break;
        };
        let Ok(id) = after[..close].parse::<u64>() else {
            break;
        };
        if open > 0 {
            parts.push(TextPart::Literal(&rest[..open]));
        }
        parts.push(TextPart::Expression(ExprId(id)));
        rest = &after[close + PLACEHOLDER_CLOSE.len_utf8()..];
    }

    if !rest.is_empty() {
        parts.push(TextPart::Literal(rest));
    }
    parts
}

/// The expression id if `text` is exactly one placeholder.
pub fn single_expression(text: &str) -> Option<ExprId> {
    match split_placeholders(text).as_slice() {
        [TextPart::Expression(id)] => Some(*id),
        _ => None,
    }
}

/// Whether `text` contains any placeholder.
pub fn has_placeholders(text: &str) -> bool {
    text.contains(PLACEHOLDER_OPEN)
}
