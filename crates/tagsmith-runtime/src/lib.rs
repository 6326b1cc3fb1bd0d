//! Runtime support for templates compiled by tagsmith.
//!
//! Generated render functions take an [`Html`] buffer and append literal
//! markup, escaped values and nested template output to it:
//!
//! ```
//! use tagsmith_runtime::{Content, Html};
//!
//! fn card(out: &mut Html, title: &str, content: Content) {
//!     out.literal("<div class=\"card\"><h2>");
//!     out.write(&title);
//!     out.literal("</h2>");
//!     out.write(&content);
//!     out.literal("</div>");
//! }
//!
//! let mut out = Html::new();
//! card(&mut out, "A & B", Content::new(|out| out.literal("<p>body</p>")));
//! assert_eq!(
//!     out.into_string(),
//!     "<div class=\"card\"><h2>A &amp; B</h2><p>body</p></div>"
//! );
//! ```

mod content;
mod escape;
mod html;
mod registry;
mod render;

pub use content::Content;
pub use escape::{escape_attribute, escape_text};
pub use html::Html;
pub use registry::{ParameterInfo, Registry, TemplateInfo};
pub use render::{Escape, Raw, Render};
