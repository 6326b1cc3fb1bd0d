use crate::html::Html;
use std::fmt;

/// A block of template content passed to a content parameter.
///
/// The block is a closure that writes into the caller's buffer, so content
/// is rendered in place, with the bindings active where it is written.
pub struct Content<'a> {
    block: Box<dyn Fn(&mut Html) + 'a>,
}

impl<'a> Content<'a> {
    pub fn new(block: impl Fn(&mut Html) + 'a) -> Self {
        Content {
            block: Box::new(block),
        }
    }

    /// Content that renders nothing.
    pub fn empty() -> Self {
        Content::new(|_| {})
    }

    pub fn render_into(&self, out: &mut Html) {
        (self.block)(out)
    }

    /// Render into a fresh buffer and return the markup.
    pub fn to_html_string(&self) -> String {
        let mut out = Html::new();
        self.render_into(&mut out);
        out.into_string()
    }
}

impl fmt::Debug for Content<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Content(..)")
    }
}
