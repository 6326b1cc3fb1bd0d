/*
 * lexer.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Tag tokenizer.
//!
//! Turns placeholder-substituted template text into a flat stream of
//! open/close/text/doctype tokens. Comments are kept as text so they pass
//! through to the output. The content of raw-text elements (`script`,
//! `style`, `rust`, ...) is not scanned for tags.

use crate::tags::is_raw_text_element;
use hashlink::LinkedHashMap;
use std::collections::HashSet;
use thiserror::Error;

/// Byte range in the text being tokenized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Span { start, end }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    /// Raw value; `None` for a bare attribute
    pub value: Option<String>,
    /// Span of the whole `name="value"`
    pub span: Span,
    /// Span of the value between the quotes
    pub value_span: Option<Span>,
}

/// Attributes in declaration order.
pub type Attributes = LinkedHashMap<String, Attribute>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    Doctype {
        text: String,
        span: Span,
    },
    Open {
        name: String,
        attributes: Attributes,
        /// Written with `/>`
        self_closing: bool,
        /// Listed in the tokenizer's self-closing name set
        void: bool,
        span: Span,
    },
    Close {
        name: String,
        span: Span,
    },
    Text {
        text: String,
        span: Span,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct LexError {
    pub message: String,
    pub span: Span,
}

/// Tokenize `text`. Names in `self_closing` never take children.
pub fn tokenize(text: &str, self_closing: &HashSet<String>) -> Result<Vec<Token>, LexError> {
    Lexer {
        text,
        pos: 0,
        text_start: None,
        tokens: Vec::new(),
        self_closing,
    }
    .run()
}

struct Lexer<'t> {
    text: &'t str,
    pos: usize,
    text_start: Option<usize>,
    tokens: Vec<Token>,
    self_closing: &'t HashSet<String>,
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | ':' | '.')
}

impl<'t> Lexer<'t> {
    fn run(mut self) -> Result<Vec<Token>, LexError> {
        while self.pos < self.text.len() {
            let rest = &self.text[self.pos..];
            if rest.starts_with("<!--") {
                self.comment()?;
            } else if rest.starts_with("<!") {
                self.doctype()?;
            } else if rest.starts_with("</") {
                self.close_tag()?;
            } else if rest.starts_with('<') && rest[1..].starts_with(|c: char| c.is_ascii_alphabetic())
            {
                self.open_tag()?;
            } else {
                self.text_char();
            }
        }
        self.flush_text();
        Ok(self.tokens)
    }

    fn rest(&self) -> &'t str {
        &self.text[self.pos..]
    }

    fn error(&self, message: impl Into<String>, start: usize) -> LexError {
        LexError {
            message: message.into(),
            span: Span::new(start, self.pos.max(start)),
        }
    }

    fn text_char(&mut self) {
        if self.text_start.is_none() {
            self.text_start = Some(self.pos);
        }
        let len = self.rest().chars().next().map_or(1, char::len_utf8);
        self.pos += len;
    }

    fn flush_text(&mut self) {
        if let Some(start) = self.text_start.take()
            && start < self.pos
        {
            self.tokens.push(Token::Text {
                text: self.text[start..self.pos].to_string(),
                span: Span::new(start, self.pos),
            });
        }
    }

    fn skip_whitespace(&mut self) {
        let trimmed = self.rest().trim_start();
        self.pos = self.text.len() - trimmed.len();
    }

    fn read_name(&mut self) -> &'t str {
        let rest = self.rest();
        let len = rest.find(|c: char| !is_name_char(c)).unwrap_or(rest.len());
        self.pos += len;
        &rest[..len]
    }

    fn comment(&mut self) -> Result<(), LexError> {
        let start = self.pos;
        match self.text[start + 4..].find("-->") {
            Some(end) => {
                if self.text_start.is_none() {
                    self.text_start = Some(start);
                }
                self.pos = start + 4 + end + 3;
                Ok(())
            }
            None => {
                self.pos = self.text.len();
                Err(self.error("unterminated comment", start))
            }
        }
    }

    fn doctype(&mut self) -> Result<(), LexError> {
        self.flush_text();
        let start = self.pos;
        match self.rest().find('>') {
            Some(end) => {
                self.pos += end + 1;
                self.tokens.push(Token::Doctype {
                    text: self.text[start..self.pos].to_string(),
                    span: Span::new(start, self.pos),
                });
                Ok(())
            }
            None => {
                self.pos = self.text.len();
                Err(self.error("unterminated `<!` declaration", start))
            }
        }
    }

    fn close_tag(&mut self) -> Result<(), LexError> {
        self.flush_text();
        let start = self.pos;
        self.pos += 2;
        let name = self.read_name();
        if name.is_empty() {
            return Err(self.error("expected a tag name after `</`", start));
        }
        self.skip_whitespace();
        if !self.rest().starts_with('>') {
            return Err(self.error(format!("malformed closing tag `</{}`", name), start));
        }
        self.pos += 1;
        self.tokens.push(Token::Close {
            name: name.to_string(),
            span: Span::new(start, self.pos),
        });
        Ok(())
    }

    fn open_tag(&mut self) -> Result<(), LexError> {
        self.flush_text();
        let start = self.pos;
        self.pos += 1;
        let name = self.read_name();
        let mut attributes = Attributes::new();
        let self_closing;

        loop {
            self.skip_whitespace();
            let rest = self.rest();
            if rest.is_empty() {
                return Err(self.error(format!("unterminated `<{}>` tag", name), start));
            }
            if rest.starts_with("/>") {
                self.pos += 2;
                self_closing = true;
                break;
            }
            if rest.starts_with('>') {
                self.pos += 1;
                self_closing = false;
                break;
            }

            let attr_start = self.pos;
            let attr_name = self.read_attribute_name();
            if attr_name.is_empty() {
                let c = self.rest().chars().next().unwrap_or(' ');
                return Err(self.error(
                    format!("unexpected character `{}` in `<{}>` tag", c, name),
                    attr_start,
                ));
            }

            self.skip_whitespace();
            let (value, value_span) = if self.rest().starts_with('=') {
                self.pos += 1;
                self.skip_whitespace();
                let (value, span) = self.read_attribute_value(name)?;
                (Some(value), Some(span))
            } else {
                (None, None)
            };

            if attributes.contains_key(attr_name) {
                return Err(self.error(
                    format!("duplicate attribute `{}` on `<{}>`", attr_name, name),
                    attr_start,
                ));
            }
            attributes.insert(
                attr_name.to_string(),
                Attribute {
                    value,
                    span: Span::new(attr_start, self.pos),
                    value_span,
                },
            );
        }

        let void = self.self_closing.contains(&name.to_ascii_lowercase());
        self.tokens.push(Token::Open {
            name: name.to_string(),
            attributes,
            self_closing,
            void,
            span: Span::new(start, self.pos),
        });

        if !self_closing && !void && is_raw_text_element(name) {
            self.raw_text(name, start)?;
        }
        Ok(())
    }

    fn read_attribute_name(&mut self) -> &'t str {
        let rest = self.rest();
        let mut len = rest.len();
        for (idx, c) in rest.char_indices() {
            let stop = c.is_whitespace()
                || matches!(c, '=' | '>' | '"' | '\'' | '<')
                || (c == '/' && rest[idx + 1..].starts_with('>'));
            if stop {
                len = idx;
                break;
            }
        }
        self.pos += len;
        &rest[..len]
    }

    fn read_attribute_value(&mut self, tag: &str) -> Result<(String, Span), LexError> {
        let start = self.pos;
        let rest = self.rest();
        match rest.chars().next() {
            Some(quote @ ('"' | '\'')) => match rest[1..].find(quote) {
                Some(end) => {
                    let value = &rest[1..1 + end];
                    self.pos += end + 2;
                    Ok((value.to_string(), Span::new(start + 1, start + 1 + end)))
                }
                None => {
                    self.pos = self.text.len();
                    Err(self.error(
                        format!("unterminated attribute value in `<{}>`", tag),
                        start,
                    ))
                }
            },
            _ => {
                let len = rest
                    .find(|c: char| c.is_whitespace() || c == '>')
                    .unwrap_or(rest.len());
                if len == 0 {
                    return Err(self.error(format!("missing attribute value in `<{}>`", tag), start));
                }
                self.pos += len;
                Ok((rest[..len].to_string(), Span::new(start, start + len)))
            }
        }
    }

    fn raw_text(&mut self, name: &str, open_start: usize) -> Result<(), LexError> {
        let rest = self.rest();
        let lower = rest.to_ascii_lowercase();
        let needle = format!("</{}", name.to_ascii_lowercase());

        let mut search = 0;
        let end = loop {
            match lower[search..].find(&needle) {
                Some(found) => {
                    let at = search + found;
                    let after = &lower[at + needle.len()..];
                    if after.starts_with(|c: char| c == '>' || c.is_whitespace()) {
                        break at;
                    }
                    search = at + needle.len();
                }
                None => {
                    return Err(LexError {
                        message: format!("unclosed `<{}>` element", name),
                        span: Span::new(open_start, self.pos),
                    });
                }
            }
        };

        if end > 0 {
            self.tokens.push(Token::Text {
                text: rest[..end].to_string(),
                span: Span::new(self.pos, self.pos + end),
            });
        }
        self.pos += end;
        Ok(())
    }
}
