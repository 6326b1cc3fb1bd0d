//! Efficient file information for location lookups

use crate::types::Location;
use serde::{Deserialize, Serialize};

/// Line-break index of a file.
///
/// Stores the byte offset of every newline so that byte offsets can be turned
/// into (row, column) pairs with a binary search instead of a rescan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileInformation {
    /// Byte offsets of each newline character in the file
    line_breaks: Vec<usize>,

    /// Total length of the file in bytes
    total_length: usize,
}

impl FileInformation {
    /// Create file information by analyzing content
    ///
    /// # Example
    ///
    /// ```
    /// use tagsmith_source_map::FileInformation;
    ///
    /// let info = FileInformation::new("line 1\nline 2\nline 3");
    /// assert_eq!(info.line_count(), 3);
    /// ```
    pub fn new(content: &str) -> Self {
        let line_breaks: Vec<usize> = content
            .char_indices()
            .filter_map(|(idx, ch)| if ch == '\n' { Some(idx) } else { None })
            .collect();

        FileInformation {
            line_breaks,
            total_length: content.len(),
        }
    }

    /// Convert a byte offset to a Location with row and column.
    ///
    /// The column is counted in characters, which is why the content is
    /// needed. Returns None if the offset is out of bounds or not on a
    /// character boundary.
    ///
    /// ```
    /// use tagsmith_source_map::FileInformation;
    ///
    /// let text = "hello\nwörld";
    /// let info = FileInformation::new(text);
    /// let loc = info.offset_to_location(9, text).unwrap();
    /// assert_eq!(loc.row, 1);
    /// assert_eq!(loc.column, 2);
    /// ```
    pub fn offset_to_location(&self, offset: usize, content: &str) -> Option<Location> {
        if offset > self.total_length || !content.is_char_boundary(offset) {
            return None;
        }

        // A newline belongs to the line it terminates.
        let row = match self.line_breaks.binary_search(&offset) {
            Ok(idx) => idx,
            Err(idx) => idx,
        };

        let line_start = self.line_start(row)?;
        let column = content[line_start..offset].chars().count();

        Some(Location {
            offset,
            row,
            column,
        })
    }

    /// Byte offset where the given 0-indexed row starts.
    pub fn line_start(&self, row: usize) -> Option<usize> {
        match row {
            0 => Some(0),
            _ => self.line_breaks.get(row - 1).map(|brk| brk + 1),
        }
    }

    /// Byte offset where the given 0-indexed row ends (exclusive of the newline).
    pub fn line_end(&self, row: usize) -> Option<usize> {
        if row >= self.line_count() {
            return None;
        }
        Some(
            self.line_breaks
                .get(row)
                .copied()
                .unwrap_or(self.total_length),
        )
    }

    /// Get the total length of the file in bytes
    pub fn total_length(&self) -> usize {
        self.total_length
    }

    /// Get the number of lines in the file
    pub fn line_count(&self) -> usize {
        self.line_breaks.len() + 1
    }
}
