/*
 * marker.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Expression markers in generated code.
//!
//! Every spliced expression is followed by a comment carrying its id, e.g.
//! `out.write(&(user.name) /*@tagsmith:e12@*/);`. The diagnostic resolver
//! scans forward from a compiler error position to the next marker.

use crate::expression::ExprId;
use tagsmith_source_map::line_col_to_offset;

pub const MARKER_PREFIX: &str = "/*@tagsmith:e";
pub const MARKER_SUFFIX: &str = "@*/";

/// Marker comment for an expression.
pub fn marker(id: ExprId) -> String {
    format!("{}{}{}", MARKER_PREFIX, id.0, MARKER_SUFFIX)
}

/// First marker at or after byte `from` in `line`.
pub fn find_marker(line: &str, from: usize) -> Option<ExprId> {
    let mut rest = line.get(from..)?;
    while let Some(start) = rest.find(MARKER_PREFIX) {
        let after = &rest[start + MARKER_PREFIX.len()..];
        if let Some(end) = after.find(MARKER_SUFFIX)
            && let Ok(id) = after[..end].parse::<u64>()
        {
            return Some(ExprId(id));
        }
        rest = after;
    }
    None
}

/// Scan `source` forward from a 1-based line and column for the next marker.
pub fn next_marker(source: &str, line: usize, column: usize) -> Option<ExprId> {
    let line = line.saturating_sub(1);
    // A column past the end of its line continues on the next line.
    let start = line_col_to_offset(source, line, column.saturating_sub(1))
        .or_else(|| line_col_to_offset(source, line + 1, 0))?;
    source[start..].lines().find_map(|l| find_marker(l, 0))
}
