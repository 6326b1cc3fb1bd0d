use crate::content::Content;
use crate::escape::{escape_attribute, escape_text};
use crate::html::Html;
use std::borrow::Cow;
use std::rc::Rc;
use std::sync::Arc;

/// Where a value is being written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Escape {
    /// Between tags
    Text,
    /// Inside a quoted attribute value
    Attribute,
}

impl Escape {
    pub fn apply(self, input: &str) -> Cow<'_, str> {
        match self {
            Escape::Text => escape_text(input),
            Escape::Attribute => escape_attribute(input),
        }
    }
}

/// A value that can be written into template output.
pub trait Render {
    fn render(&self, out: &mut Html, escape: Escape);
}

/// Markup written without escaping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Raw<T>(pub T);

impl<T: AsRef<str>> Render for Raw<T> {
    fn render(&self, out: &mut Html, _escape: Escape) {
        out.literal(self.0.as_ref());
    }
}

impl Render for str {
    fn render(&self, out: &mut Html, escape: Escape) {
        out.literal(&escape.apply(self));
    }
}

impl Render for String {
    fn render(&self, out: &mut Html, escape: Escape) {
        self.as_str().render(out, escape);
    }
}

impl Render for Cow<'_, str> {
    fn render(&self, out: &mut Html, escape: Escape) {
        self.as_ref().render(out, escape);
    }
}

impl Render for char {
    fn render(&self, out: &mut Html, escape: Escape) {
        let mut buf = [0u8; 4];
        self.encode_utf8(&mut buf).render(out, escape);
    }
}

impl Render for bool {
    fn render(&self, out: &mut Html, _escape: Escape) {
        out.literal(if *self { "true" } else { "false" });
    }
}

macro_rules! render_display {
    ($($ty:ty),*) => {
        $(
            impl Render for $ty {
                fn render(&self, out: &mut Html, _escape: Escape) {
                    out.literal(&self.to_string());
                }
            }
        )*
    };
}

render_display!(i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize, f32, f64);

impl<T: Render + ?Sized> Render for &T {
    fn render(&self, out: &mut Html, escape: Escape) {
        (**self).render(out, escape);
    }
}

impl<T: Render + ?Sized> Render for &mut T {
    fn render(&self, out: &mut Html, escape: Escape) {
        (**self).render(out, escape);
    }
}

impl<T: Render + ?Sized> Render for Box<T> {
    fn render(&self, out: &mut Html, escape: Escape) {
        (**self).render(out, escape);
    }
}

impl<T: Render + ?Sized> Render for Rc<T> {
    fn render(&self, out: &mut Html, escape: Escape) {
        (**self).render(out, escape);
    }
}

impl<T: Render + ?Sized> Render for Arc<T> {
    fn render(&self, out: &mut Html, escape: Escape) {
        (**self).render(out, escape);
    }
}

impl<T: Render> Render for Option<T> {
    fn render(&self, out: &mut Html, escape: Escape) {
        if let Some(value) = self {
            value.render(out, escape);
        }
    }
}

impl Render for Content<'_> {
    fn render(&self, out: &mut Html, _escape: Escape) {
        self.render_into(out);
    }
}
