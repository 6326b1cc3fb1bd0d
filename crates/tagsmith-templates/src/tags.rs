/*
 * tags.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Element vocabulary of the host markup.

use once_cell::sync::Lazy;
use std::collections::HashSet;

/// Reserved tag for Rust code blocks.
pub const CODE_TAG: &str = "rust";
/// Reserved tag for binding scopes.
pub const SCOPE_TAG: &str = "context";
/// Root tag of a full-document template.
pub const DOCUMENT_TAG: &str = "html";

/// Attribute marking a template as visible in the generated registry.
pub const FRAGMENT_ATTRIBUTE: &str = "fragment";
/// Attribute of `<context>` that discards inherited bindings.
pub const CLEAR_ATTRIBUTE: &str = "clear";
pub const IF_ATTRIBUTE: &str = "if";
pub const EACH_ATTRIBUTE: &str = "each";

/// Name of the primary content slot.
pub const CONTENT_PARAMETER: &str = "content";
/// Prefix marking parameters on a document root.
pub const PAGE_PARAMETER_PREFIX: char = '@';

pub const DEFAULT_DOCTYPE: &str = "<!DOCTYPE html>";

static VOID_ELEMENTS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param",
        "source", "track", "wbr",
    ]
    .into_iter()
    .collect()
});

static RAW_TEXT_ELEMENTS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    ["script", "style", "textarea", "title", CODE_TAG]
        .into_iter()
        .collect()
});

/// Elements whose whitespace is part of the rendered output.
static PREFORMATTED_ELEMENTS: Lazy<HashSet<&'static str>> =
    Lazy::new(|| ["pre", "textarea"].into_iter().collect());

static HTML_ELEMENTS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        // document
        "html", "head", "body", "title", "base", "link", "meta", "style", "script", "noscript",
        "template", "slot",
        // sections
        "main", "header", "footer", "nav", "section", "article", "aside", "address", "hgroup",
        "h1", "h2", "h3", "h4", "h5", "h6", "search",
        // grouping
        "p", "hr", "pre", "blockquote", "ol", "ul", "li", "menu", "dl", "dt", "dd", "figure",
        "figcaption", "div",
        // text
        "a", "em", "strong", "small", "s", "cite", "q", "dfn", "abbr", "ruby", "rt", "rp",
        "data", "time", "code", "var", "samp", "kbd", "sub", "sup", "i", "b", "u", "mark",
        "bdi", "bdo", "span", "br", "wbr", "ins", "del",
        // embedded
        "picture", "source", "img", "iframe", "embed", "object", "param", "video", "audio",
        "track", "map", "area", "canvas", "svg", "math",
        // tables
        "table", "caption", "colgroup", "col", "tbody", "thead", "tfoot", "tr", "td", "th",
        // forms
        "form", "label", "input", "button", "select", "datalist", "optgroup", "option",
        "textarea", "output", "progress", "meter", "fieldset", "legend",
        // interactive
        "details", "summary", "dialog",
        // svg content
        "g", "path", "circle", "ellipse", "line", "polyline", "polygon", "rect", "text",
        "tspan", "defs", "use", "symbol", "lineargradient", "radialgradient", "stop",
        "clippath", "mask", "pattern", "image", "foreignobject",
    ]
    .into_iter()
    .collect()
});

pub fn is_void_element(name: &str) -> bool {
    VOID_ELEMENTS.contains(name.to_ascii_lowercase().as_str())
}

pub fn is_raw_text_element(name: &str) -> bool {
    RAW_TEXT_ELEMENTS.contains(name.to_ascii_lowercase().as_str())
}

pub fn is_preformatted_element(name: &str) -> bool {
    PREFORMATTED_ELEMENTS.contains(name.to_ascii_lowercase().as_str())
}

pub fn is_html_element(name: &str) -> bool {
    HTML_ELEMENTS.contains(name.to_ascii_lowercase().as_str())
}

/// Names that may not be used as template names.
pub fn is_reserved_template_name(name: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    lower == CODE_TAG || lower == SCOPE_TAG || (lower != DOCUMENT_TAG && is_html_element(&lower))
}

/// Tag names the tokenizer treats as self-terminating without `/>`.
pub fn void_elements() -> HashSet<String> {
    VOID_ELEMENTS.iter().map(|s| s.to_string()).collect()
}
