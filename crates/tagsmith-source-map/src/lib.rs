//! Source mapping for tagsmith
//!
//! This crate tracks source locations for template files and maps positions
//! in derived text (for example, template text after embedded expressions were
//! replaced by placeholder tokens) back to the original file.
//!
//! # Overview
//!
//! The core types are:
//! - [`SourceInfo`]: A range together with how it maps to its source
//! - [`SourceMapping`]: The original file a range points into
//! - [`RangeMapping`] / [`map_through`]: Piecewise mapping of derived text
//!   offsets onto the text it was derived from
//! - [`SourceContext`]: Owns registered files and their content
//!
//! # Example
//!
//! ```rust
//! use tagsmith_source_map::*;
//!
//! let mut ctx = SourceContext::new();
//! let file_id = ctx.add_file("card.html".into(), Some("<card>\n</card>".into()));
//!
//! let info = SourceInfo::from_offsets(file_id, 7, 14, &ctx).unwrap();
//! assert_eq!(info.range.start.row, 1);
//! assert_eq!(info.range.start.column, 0);
//! ```

pub mod context;
pub mod file_info;
pub mod source_info;
pub mod types;
pub mod utils;

pub use context::{SourceContext, SourceFile};
pub use file_info::FileInformation;
pub use source_info::{MappedLocation, RangeMapping, SourceInfo, SourceMapping, map_through};
pub use types::{FileId, Location, Range};
pub use utils::{line_col_to_offset, offset_to_location};
