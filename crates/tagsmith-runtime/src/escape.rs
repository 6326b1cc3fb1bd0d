use std::borrow::Cow;

/// Escape text for use between tags.
pub fn escape_text(input: &str) -> Cow<'_, str> {
    escape(input, false)
}

/// Escape text for use inside a double- or single-quoted attribute value.
pub fn escape_attribute(input: &str) -> Cow<'_, str> {
    escape(input, true)
}

fn escape(input: &str, quotes: bool) -> Cow<'_, str> {
    let needs = |c: char| matches!(c, '&' | '<' | '>') || (quotes && matches!(c, '"' | '\''));
    if !input.chars().any(needs) {
        return Cow::Borrowed(input);
    }

    let mut out = String::with_capacity(input.len() + 8);
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' if quotes => out.push_str("&quot;"),
            '\'' if quotes => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    Cow::Owned(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_escaping_leaves_quotes() {
        assert_eq!(escape_text(r#"<a href="x">&</a>"#), r#"&lt;a href="x"&gt;&amp;&lt;/a&gt;"#);
    }

    #[test]
    fn attribute_escaping_covers_quotes() {
        assert_eq!(escape_attribute(r#"it's "quoted""#), "it&#39;s &quot;quoted&quot;");
    }

    #[test]
    fn clean_input_is_borrowed() {
        assert!(matches!(escape_text("plain"), Cow::Borrowed(_)));
    }
}
