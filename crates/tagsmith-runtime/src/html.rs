use crate::render::{Escape, Render};
use std::any::Any;
use std::collections::HashMap;
use std::fmt;

/// Output buffer for generated render functions.
///
/// Besides the markup itself, the buffer carries a stack of binding scopes
/// used by `<context>` blocks. An inner scope sees the bindings of every
/// enclosing scope up to and including the nearest cleared one.
pub struct Html {
    buf: String,
    scopes: Vec<Scope>,
}

#[derive(Default)]
struct Scope {
    clear: bool,
    values: HashMap<String, Box<dyn Any>>,
}

impl Html {
    pub fn new() -> Self {
        Html {
            buf: String::new(),
            scopes: vec![Scope::default()],
        }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Html {
            buf: String::with_capacity(capacity),
            scopes: vec![Scope::default()],
        }
    }

    /// Append markup verbatim.
    pub fn literal(&mut self, markup: &str) {
        self.buf.push_str(markup);
    }

    /// Append a value between tags, escaping text.
    pub fn write<T: Render + ?Sized>(&mut self, value: &T) {
        value.render(self, Escape::Text);
    }

    /// Append a value inside a quoted attribute, escaping quotes as well.
    pub fn write_attr<T: Render + ?Sized>(&mut self, value: &T) {
        value.render(self, Escape::Attribute);
    }

    /// Run `body` inside a new binding scope. With `clear`, bindings of the
    /// enclosing scopes are hidden instead of inherited.
    pub fn scope(&mut self, clear: bool, body: impl FnOnce(&mut Html)) {
        self.scopes.push(Scope {
            clear,
            values: HashMap::new(),
        });
        body(self);
        self.scopes.pop();
    }

    /// Bind a value in the innermost scope.
    pub fn bind<T: Any>(&mut self, key: impl Into<String>, value: T) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.values.insert(key.into(), Box::new(value));
        }
    }

    /// Drop the bindings of the innermost scope and stop inheriting outer ones.
    pub fn clear_bindings(&mut self) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.values.clear();
            scope.clear = true;
        }
    }

    /// Look up a binding by key and type.
    pub fn binding<T: Any>(&self, key: &str) -> Option<&T> {
        for scope in self.scopes.iter().rev() {
            if let Some(value) = scope.values.get(key) {
                return value.downcast_ref::<T>();
            }
            if scope.clear {
                break;
            }
        }
        None
    }

    pub fn as_str(&self) -> &str {
        &self.buf
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn into_string(self) -> String {
        self.buf
    }
}

impl Default for Html {
    fn default() -> Self {
        Html::new()
    }
}

impl fmt::Debug for Html {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Html")
            .field("buf", &self.buf)
            .field("scopes", &self.scopes.len())
            .finish()
    }
}

impl fmt::Display for Html {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inner_scope_inherits_bindings() {
        let mut out = Html::new();
        out.bind("theme", "dark");
        out.scope(false, |out| {
            out.bind("user", 7u32);
            assert_eq!(out.binding::<&str>("theme"), Some(&"dark"));
            assert_eq!(out.binding::<u32>("user"), Some(&7));
        });
        assert_eq!(out.binding::<u32>("user"), None);
    }

    #[test]
    fn cleared_scope_hides_outer_bindings() {
        let mut out = Html::new();
        out.bind("theme", "dark");
        out.scope(true, |out| {
            assert_eq!(out.binding::<&str>("theme"), None);
            out.bind("theme", "light");
            assert_eq!(out.binding::<&str>("theme"), Some(&"light"));
        });
        assert_eq!(out.binding::<&str>("theme"), Some(&"dark"));
    }

    #[test]
    fn clear_bindings_applies_to_current_scope() {
        let mut out = Html::new();
        out.bind("a", 1i32);
        out.scope(false, |out| {
            out.bind("b", 2i32);
            out.clear_bindings();
            assert_eq!(out.binding::<i32>("a"), None);
            assert_eq!(out.binding::<i32>("b"), None);
        });
        assert_eq!(out.binding::<i32>("a"), Some(&1));
    }

    #[test]
    fn wrong_type_lookup_is_none() {
        let mut out = Html::new();
        out.bind("n", 1i64);
        assert_eq!(out.binding::<i32>("n"), None);
    }

    #[test]
    fn literal_and_write() {
        let mut out = Html::with_capacity(16);
        out.literal("<p>");
        out.write("1 < 2");
        out.literal("</p>");
        assert_eq!(out.to_string(), "<p>1 &lt; 2</p>");
        assert_eq!(out.len(), 15);
    }
}
