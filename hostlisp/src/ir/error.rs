// Error type shared by every analyzer operation

use crate::ast::Form;
use crate::error_reporting::{SourceLocation, SourceSpan};
use crate::registry::RegistryError;

pub type AnalyzerResult<T> = Result<T, AnalyzerError>;

type Cause = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Any failure while turning forms into nodes.
///
/// The message text is stable and meant to be matched by callers and tests;
/// the span points at the offending form when the reader supplied one.
#[derive(Debug, thiserror::Error)]
#[error("{message}{}", location_suffix(.span))]
pub struct AnalyzerError {
    message: String,
    span: Option<SourceSpan>,
    #[source]
    cause: Option<Cause>,
}

fn location_suffix(span: &Option<SourceSpan>) -> String {
    span.as_ref()
        .map(|span| format!(" at {}", span))
        .unwrap_or_default()
}

impl AnalyzerError {
    pub fn new(message: impl Into<String>) -> Self {
        AnalyzerError {
            message: message.into(),
            span: None,
            cause: None,
        }
    }

    pub fn at_span(message: impl Into<String>, span: Option<&SourceSpan>) -> Self {
        AnalyzerError {
            span: span.cloned(),
            ..AnalyzerError::new(message)
        }
    }

    /// Error located at `form`.
    pub fn at(message: impl Into<String>, form: &Form) -> Self {
        AnalyzerError::at_span(message, form.span())
    }

    pub fn with_cause(mut self, cause: impl Into<Cause>) -> Self {
        self.cause = Some(cause.into());
        self
    }

    /// Fills in a location only when none is recorded yet.
    pub fn or_span(mut self, span: Option<&SourceSpan>) -> Self {
        if self.span.is_none() {
            self.span = span.cloned();
        }
        self
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn span(&self) -> Option<&SourceSpan> {
        self.span.as_ref()
    }

    pub fn start_location(&self) -> Option<SourceLocation> {
        self.span.as_ref().map(SourceSpan::start)
    }

    pub fn end_location(&self) -> Option<SourceLocation> {
        self.span.as_ref().map(SourceSpan::end)
    }
}

impl From<RegistryError> for AnalyzerError {
    fn from(err: RegistryError) -> Self {
        AnalyzerError::new(err.to_string()).with_cause(err)
    }
}
