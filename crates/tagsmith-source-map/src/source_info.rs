//! Source ranges and piecewise offset mappings

use crate::context::SourceContext;
use crate::types::{FileId, Location, Range};
use serde::{Deserialize, Serialize};

/// Source information tracking a range and how it maps to its source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceInfo {
    /// The range in the immediate/current text
    pub range: Range,
    /// How this range maps to its source
    pub mapping: SourceMapping,
}

/// Describes where a range comes from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SourceMapping {
    /// Direct position in an original file
    Original { file_id: FileId },
}

/// Maps a range in transformed text to parent text
///
/// Offsets that fall inside `[from_start, from_end)` map linearly onto the
/// parent range; a piece whose lengths differ (a substituted token) maps
/// every inner offset to `to_start`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RangeMapping {
    /// Start offset in transformed text
    pub from_start: usize,
    /// End offset in transformed text
    pub from_end: usize,
    /// Start offset in parent text
    pub to_start: usize,
    /// End offset in parent text
    pub to_end: usize,
}

impl RangeMapping {
    /// Map an offset inside `[from_start, from_end)` onto the parent text.
    pub fn map(&self, offset: usize) -> usize {
        let from_len = self.from_end - self.from_start;
        let to_len = self.to_end - self.to_start;
        if from_len == to_len {
            self.to_start + (offset - self.from_start)
        } else {
            self.to_start
        }
    }
}

/// Map an offset in transformed text through its piecewise mapping.
///
/// An offset equal to a piece's end maps to that piece's parent end, so the
/// end of the text maps to the end of the parent. `None` when no piece
/// covers the offset.
pub fn map_through(mapping: &[RangeMapping], offset: usize) -> Option<usize> {
    if let Some(piece) = mapping
        .iter()
        .find(|m| offset >= m.from_start && offset < m.from_end)
    {
        return Some(piece.map(offset));
    }
    mapping.iter().find(|m| m.from_end == offset).map(|m| m.to_end)
}

/// Result of mapping a position back to an original file
#[derive(Debug, Clone, PartialEq)]
pub struct MappedLocation {
    /// The original file
    pub file_id: FileId,
    /// Location in the original file
    pub location: Location,
}

impl SourceInfo {
    /// Create source info for a range in an original file
    pub fn original(file_id: FileId, range: Range) -> Self {
        SourceInfo {
            range,
            mapping: SourceMapping::Original { file_id },
        }
    }

    /// Create source info for a byte range of a registered file, computing
    /// rows and columns from the file's line index.
    pub fn from_offsets(
        file_id: FileId,
        start: usize,
        end: usize,
        ctx: &SourceContext,
    ) -> Option<Self> {
        let file = ctx.get_file(file_id)?;
        let info = file.file_info.as_ref()?;
        let content = file.read_content()?;
        let start = info.offset_to_location(start, &content)?;
        let end = info.offset_to_location(end, &content)?;
        Some(SourceInfo::original(file_id, Range { start, end }))
    }

    /// The file this information ultimately points into.
    pub fn file_id(&self) -> FileId {
        let SourceMapping::Original { file_id } = &self.mapping;
        *file_id
    }

    /// Map an offset in the current text back to the original file
    pub fn map_offset(&self, offset: usize, ctx: &SourceContext) -> Option<MappedLocation> {
        let file_id = self.file_id();
        let file = ctx.get_file(file_id)?;
        let file_info = file.file_info.as_ref()?;
        let content = file.read_content()?;
        let location = file_info.offset_to_location(offset, &content)?;
        Some(MappedLocation { file_id, location })
    }

    /// Map this range back to the original file
    pub fn map_range(&self, ctx: &SourceContext) -> Option<(MappedLocation, MappedLocation)> {
        let start = self.map_offset(self.range.start.offset, ctx)?;
        let end = self.map_offset(self.range.end.offset, ctx)?;
        Some((start, end))
    }
}
