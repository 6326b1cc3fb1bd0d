//! Core diagnostic message types.

use serde::{Deserialize, Serialize};
use tagsmith_source_map::{SourceContext, SourceInfo};

/// The kind of diagnostic message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DiagnosticKind {
    /// An error that prevents completion
    Error,
    /// A problem that does not prevent completion
    Warning,
    /// Informational message
    Info,
    /// Additional context
    Note,
}

impl DiagnosticKind {
    fn label(self) -> &'static str {
        match self {
            DiagnosticKind::Error => "Error",
            DiagnosticKind::Warning => "Warning",
            DiagnosticKind::Info => "Info",
            DiagnosticKind::Note => "Note",
        }
    }
}

/// How detail items are presented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DetailKind {
    /// Error detail (✖ bullet)
    Error,
    /// Info detail (ℹ bullet)
    Info,
    /// Note detail (plain bullet)
    Note,
}

impl DetailKind {
    fn bullet(self) -> &'static str {
        match self {
            DetailKind::Error => "✖",
            DetailKind::Info => "ℹ",
            DetailKind::Note => "•",
        }
    }

    fn name(self) -> &'static str {
        match self {
            DetailKind::Error => "error",
            DetailKind::Info => "info",
            DetailKind::Note => "note",
        }
    }
}

/// The content of a message or detail item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MessageContent {
    /// Plain text content
    Plain(String),
    /// Markdown content (backticks mark code)
    Markdown(String),
}

impl MessageContent {
    /// Get the raw string content for display
    pub fn as_str(&self) -> &str {
        match self {
            MessageContent::Plain(s) => s,
            MessageContent::Markdown(s) => s,
        }
    }

    /// Convert to JSON value with type information
    pub fn to_json(&self) -> serde_json::Value {
        use serde_json::json;
        match self {
            MessageContent::Plain(s) => json!({ "type": "plain", "content": s }),
            MessageContent::Markdown(s) => json!({ "type": "markdown", "content": s }),
        }
    }
}

impl From<String> for MessageContent {
    fn from(s: String) -> Self {
        MessageContent::Markdown(s)
    }
}

impl From<&str> for MessageContent {
    fn from(s: &str) -> Self {
        MessageContent::Markdown(s.to_string())
    }
}

/// A detail item in a diagnostic message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetailItem {
    /// The kind of detail (error, info, note)
    pub kind: DetailKind,
    /// The content of the detail
    pub content: MessageContent,
    /// Optional source location this detail points at
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<SourceInfo>,
}

/// A structured diagnostic message.
///
/// 1. **Code**: error code from the catalog (e.g., "T-2-1")
/// 2. **Title**: brief error message
/// 3. **Kind**: error, warning, info
/// 4. **Problem**: what went wrong
/// 5. **Details**: specific information, optionally located
/// 6. **Hints**: guidance for fixing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagnosticMessage {
    /// Error code (e.g., "T-1-1")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,

    /// Brief title for the error
    pub title: String,

    /// The kind of diagnostic
    pub kind: DiagnosticKind,

    /// The problem statement
    pub problem: Option<MessageContent>,

    /// Specific error details
    pub details: Vec<DetailItem>,

    /// Hints for fixing
    pub hints: Vec<MessageContent>,

    /// Source location for this diagnostic
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<SourceInfo>,
}

impl DiagnosticMessage {
    /// Create a new diagnostic message with just a title and kind.
    pub fn new(kind: DiagnosticKind, title: impl Into<String>) -> Self {
        Self {
            code: None,
            title: title.into(),
            kind,
            problem: None,
            details: Vec::new(),
            hints: Vec::new(),
            location: None,
        }
    }

    /// Create an error diagnostic.
    pub fn error(title: impl Into<String>) -> Self {
        Self::new(DiagnosticKind::Error, title)
    }

    /// Create a warning diagnostic.
    pub fn warning(title: impl Into<String>) -> Self {
        Self::new(DiagnosticKind::Warning, title)
    }

    /// Create an info diagnostic.
    pub fn info(title: impl Into<String>) -> Self {
        Self::new(DiagnosticKind::Info, title)
    }

    /// Set the error code.
    ///
    /// ```
    /// use tagsmith_error_reporting::DiagnosticMessage;
    ///
    /// let msg = DiagnosticMessage::error("Markup Syntax Error").with_code("T-1-1");
    /// assert_eq!(msg.code.as_deref(), Some("T-1-1"));
    /// ```
    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    /// Get the documentation URL for this error, if it has a known code.
    pub fn docs_url(&self) -> Option<&str> {
        self.code
            .as_ref()
            .and_then(|code| crate::catalog::get_docs_url(code))
    }

    /// Whether this diagnostic is an error.
    pub fn is_error(&self) -> bool {
        self.kind == DiagnosticKind::Error
    }

    /// Render this diagnostic message as text.
    ///
    /// With a source context and a location, the title, problem and located
    /// details are shown as an ariadne report over the original source;
    /// details without a location and hints follow as bullets. Otherwise
    /// everything is rendered as bullets:
    ///
    /// ```text
    /// Error [T-2-1]: title
    ///   at 3:10
    /// Problem statement here
    /// ✖ Error detail
    /// ℹ Info detail
    /// ? Hint
    /// ```
    pub fn to_text(&self, ctx: Option<&SourceContext>) -> String {
        use std::fmt::Write;

        let mut result = String::new();

        let location = self
            .location
            .as_ref()
            .or_else(|| self.details.iter().find_map(|d| d.location.as_ref()));

        let ariadne = match (location, ctx) {
            (Some(loc), Some(ctx)) => self.render_ariadne_source_context(loc, ctx),
            _ => None,
        };

        match ariadne {
            Some(rendered) => {
                result.push_str(&rendered);
                for detail in self.details.iter().filter(|d| d.location.is_none()) {
                    let _ = writeln!(result, "{} {}", detail.kind.bullet(), detail.content.as_str());
                }
            }
            None => {
                match &self.code {
                    Some(code) => {
                        let _ = writeln!(result, "{} [{}]: {}", self.kind.label(), code, self.title);
                    }
                    None => {
                        let _ = writeln!(result, "{}: {}", self.kind.label(), self.title);
                    }
                }
                if let Some(loc) = &self.location {
                    let _ = writeln!(
                        result,
                        "  at {}:{}",
                        loc.range.start.row + 1,
                        loc.range.start.column + 1
                    );
                }
                if let Some(problem) = &self.problem {
                    let _ = writeln!(result, "{}", problem.as_str());
                }
                for detail in &self.details {
                    let _ = writeln!(result, "{} {}", detail.kind.bullet(), detail.content.as_str());
                }
            }
        }

        for hint in &self.hints {
            let _ = writeln!(result, "? {}", hint.as_str());
        }

        result
    }

    /// Render this diagnostic message as a JSON value.
    ///
    /// ```
    /// use tagsmith_error_reporting::DiagnosticMessage;
    ///
    /// let json = DiagnosticMessage::error("Something went wrong").to_json();
    /// assert_eq!(json["kind"], "error");
    /// assert_eq!(json["title"], "Something went wrong");
    /// ```
    pub fn to_json(&self) -> serde_json::Value {
        use serde_json::json;

        let mut obj = json!({
            "kind": self.kind.label().to_lowercase(),
            "title": self.title,
        });

        if let Some(code) = &self.code {
            obj["code"] = json!(code);
        }

        if let Some(problem) = &self.problem {
            obj["problem"] = problem.to_json();
        }

        if !self.details.is_empty() {
            let details: Vec<_> = self
                .details
                .iter()
                .map(|d| {
                    let mut detail_obj = json!({
                        "kind": d.kind.name(),
                        "content": d.content.to_json()
                    });
                    if let Some(location) = &d.location {
                        detail_obj["location"] = json!(location);
                    }
                    detail_obj
                })
                .collect();
            obj["details"] = json!(details);
        }

        if !self.hints.is_empty() {
            let hints: Vec<_> = self.hints.iter().map(|h| h.to_json()).collect();
            obj["hints"] = json!(hints);
        }

        if let Some(location) = &self.location {
            obj["location"] = json!(location);
        }

        obj
    }

    fn render_ariadne_source_context(
        &self,
        main_location: &SourceInfo,
        ctx: &SourceContext,
    ) -> Option<String> {
        use ariadne::{Color, Config, Label, Report, ReportKind, Source};

        let file_id = main_location.file_id();
        let file = ctx.get_file(file_id)?;
        let content = file.read_content()?;

        // ariadne spans count characters, not bytes
        let char_offset = |byte: usize| content.get(..byte).map(|s| s.chars().count());

        let (start_mapped, end_mapped) = main_location.map_range(ctx)?;
        let main_start = char_offset(start_mapped.location.offset)?;
        let main_end = char_offset(end_mapped.location.offset)?;

        let (report_kind, main_color) = match self.kind {
            DiagnosticKind::Error => (ReportKind::Error, Color::Red),
            DiagnosticKind::Warning => (ReportKind::Warning, Color::Yellow),
            DiagnosticKind::Info => (ReportKind::Advice, Color::Cyan),
            DiagnosticKind::Note => (ReportKind::Advice, Color::Blue),
        };

        let mut report = Report::build(report_kind, file.path.clone(), main_start)
            .with_config(Config::default().with_color(false));

        report = match &self.code {
            Some(code) => report.with_message(format!("[{}] {}", code, self.title)),
            None => report.with_message(&self.title),
        };

        let main_message = match &self.problem {
            Some(problem) => problem.as_str(),
            None => &self.title,
        };

        report = report.with_label(
            Label::new((file.path.clone(), main_start..main_end.max(main_start)))
                .with_message(main_message)
                .with_color(main_color),
        );

        for detail in &self.details {
            let Some(detail_loc) = &detail.location else {
                continue;
            };
            if detail_loc.file_id() != file_id {
                continue;
            }
            let Some((detail_start, detail_end)) = detail_loc.map_range(ctx) else {
                continue;
            };
            let (Some(start), Some(end)) = (
                char_offset(detail_start.location.offset),
                char_offset(detail_end.location.offset),
            ) else {
                continue;
            };
            let detail_color = match detail.kind {
                DetailKind::Error => Color::Red,
                DetailKind::Info => Color::Cyan,
                DetailKind::Note => Color::Blue,
            };
            report = report.with_label(
                Label::new((file.path.clone(), start..end.max(start)))
                    .with_message(detail.content.as_str())
                    .with_color(detail_color),
            );
        }

        let mut output = Vec::new();
        report
            .finish()
            .write((file.path.clone(), Source::from(content.as_str())), &mut output)
            .ok()?;

        String::from_utf8(output).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::DiagnosticMessageBuilder;
    use pretty_assertions::assert_eq;
    use tagsmith_source_map::{FileId, Location, Range};

    fn location(offset: usize, row: usize, column: usize, len: usize) -> SourceInfo {
        SourceInfo::original(
            FileId(0),
            Range {
                start: Location {
                    offset,
                    row,
                    column,
                },
                end: Location {
                    offset: offset + len,
                    row,
                    column: column + len,
                },
            },
        )
    }

    #[test]
    fn test_diagnostic_message_new() {
        let msg = DiagnosticMessage::new(DiagnosticKind::Error, "Test error");
        assert_eq!(msg.title, "Test error");
        assert_eq!(msg.kind, DiagnosticKind::Error);
        assert!(msg.code.is_none());
        assert!(msg.problem.is_none());
        assert!(msg.details.is_empty());
        assert!(msg.hints.is_empty());
    }

    #[test]
    fn test_diagnostic_message_constructors() {
        assert_eq!(DiagnosticMessage::error("e").kind, DiagnosticKind::Error);
        assert_eq!(DiagnosticMessage::warning("w").kind, DiagnosticKind::Warning);
        assert_eq!(DiagnosticMessage::info("i").kind, DiagnosticKind::Info);
    }

    #[test]
    fn test_docs_url() {
        let msg = DiagnosticMessage::error("Internal Error").with_code("T-0-1");
        assert!(msg.docs_url().unwrap().contains("T-0-1"));
        assert!(DiagnosticMessage::error("x").docs_url().is_none());
        assert!(
            DiagnosticMessage::error("x")
                .with_code("T-99-1")
                .docs_url()
                .is_none()
        );
    }

    #[test]
    fn test_to_text_simple_error() {
        let msg = DiagnosticMessage::error("Something went wrong");
        assert_eq!(msg.to_text(None), "Error: Something went wrong\n");
    }

    #[test]
    fn test_to_text_with_code() {
        let msg = DiagnosticMessage::error("Something went wrong").with_code("T-1-1");
        assert_eq!(msg.to_text(None), "Error [T-1-1]: Something went wrong\n");
    }

    #[test]
    fn test_to_text_full_message() {
        let msg = DiagnosticMessageBuilder::error("Missing attribute")
            .problem("`user-card` requires `user`")
            .add_detail("No `user` attribute was given")
            .add_info("`user` has type `&User`")
            .add_hint("Add `user=\"${user}\"` to the tag?")
            .build();

        let text = msg.to_text(None);
        assert_eq!(
            text,
            "Error: Missing attribute\n\
             `user-card` requires `user`\n\
             ✖ No `user` attribute was given\n\
             ℹ `user` has type `&User`\n\
             ? Add `user=\"${user}\"` to the tag?\n"
        );
    }

    #[test]
    fn test_location_in_to_text_without_context() {
        let msg = DiagnosticMessageBuilder::error("Invalid syntax")
            .with_location(location(100, 10, 5, 10))
            .build();

        let text = msg.to_text(None);
        assert!(text.contains("Invalid syntax"));
        assert!(text.contains("at 11:6"));
    }

    #[test]
    fn test_location_in_to_text_with_context() {
        let mut ctx = SourceContext::new();
        let file_id = ctx.add_file(
            "card.html".to_string(),
            Some("<card>\n  ${oops\n</card>".to_string()),
        );
        let loc = SourceInfo::from_offsets(file_id, 9, 15, &ctx).unwrap();

        let msg = DiagnosticMessageBuilder::error("Invalid syntax")
            .with_code("T-1-1")
            .with_location(loc)
            .add_hint("Close the expression?")
            .build();

        let text = msg.to_text(Some(&ctx));
        assert!(text.contains("[T-1-1] Invalid syntax"));
        assert!(text.contains("card.html:2:3"));
        assert!(text.contains("${oops"));
        assert!(text.contains("? Close the expression?"));
    }

    #[test]
    fn test_to_json_full_message() {
        let msg = DiagnosticMessageBuilder::error("Ambiguous template")
            .with_code("T-2-2")
            .problem("`icon` matches several templates")
            .add_detail("defined in `components`")
            .add_info("defined in `components/admin`")
            .add_hint("Move the reference closer to one definition?")
            .build();

        let json = msg.to_json();
        assert_eq!(json["kind"], "error");
        assert_eq!(json["code"], "T-2-2");
        assert_eq!(json["problem"]["type"], "markdown");
        assert_eq!(json["details"][0]["kind"], "error");
        assert_eq!(json["details"][1]["kind"], "info");
        assert_eq!(
            json["details"][1]["content"]["content"],
            "defined in `components/admin`"
        );
        assert_eq!(
            json["hints"][0]["content"],
            "Move the reference closer to one definition?"
        );
        assert!(json.get("location").is_none());
    }

    #[test]
    fn test_location_in_to_json() {
        let msg = DiagnosticMessageBuilder::error("Invalid syntax")
            .with_location(location(100, 10, 5, 10))
            .build();

        let range = &msg.to_json()["location"]["range"];
        assert_eq!(range["start"]["row"], 10);
        assert_eq!(range["start"]["column"], 5);
        assert_eq!(range["end"]["offset"], 110);
    }
}
