//! Macros for creating diagnostic messages.

/// Create an internal error (code T-0-1) tagged with the file and line
/// where it was raised.
///
/// ```
/// use tagsmith_error_reporting::internal_error;
///
/// let error = internal_error!("registry snapshot missing");
/// assert_eq!(error.code.as_deref(), Some("T-0-1"));
/// assert!(error.title.contains("registry snapshot missing"));
/// ```
#[macro_export]
macro_rules! internal_error {
    ($message:expr) => {
        $crate::DiagnosticMessageBuilder::internal_error($message, file!(), line!())
    };
}
