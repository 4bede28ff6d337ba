//! Error taxonomy for the markup transform.
//!
//! Every failure aborts the subtree (and with it the whole `transform` call)
//! where it was detected; callers get the first error and no output.

use oxc_span::Span;
use serde::Serialize;
use std::fmt;
use thiserror::Error;

// ═══════════════════════════════════════════════════════════════════════════════
// ERROR CODES
// ═══════════════════════════════════════════════════════════════════════════════

pub const ERR_STRUCTURAL: &str = "JSX-STRUCT";
pub const ERR_UNSUPPORTED_BINDING: &str = "JSX-BINDING";
pub const ERR_VALIDATION: &str = "JSX-VALIDATE";
pub const ERR_EMIT: &str = "JSX-EMIT";

// ═══════════════════════════════════════════════════════════════════════════════
// SOURCE LOCATION
// ═══════════════════════════════════════════════════════════════════════════════

/// Byte span plus 1-based line/column of the node an error points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceLocation {
    pub start: u32,
    pub end: u32,
    pub line: u32,
    pub column: u32,
}

impl SourceLocation {
    pub fn from_span(source: &str, span: Span) -> Self {
        let prefix = source.get(..span.start as usize).unwrap_or(source);
        let line = prefix.matches('\n').count() as u32 + 1;
        let line_start = prefix.rfind('\n').map(|i| i + 1).unwrap_or(0);
        let column = prefix[line_start..].chars().count() as u32 + 1;
        SourceLocation {
            start: span.start,
            end: span.end,
            line,
            column,
        }
    }

    pub fn from_offset(source: &str, offset: usize) -> Self {
        let offset = offset.min(source.len()) as u32;
        Self::from_span(source, Span::new(offset, offset))
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// TRANSFORM ERROR
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum TransformError {
    /// Malformed markup shape: parser rejection, conflicting spreads or attributes.
    #[error("structural error at {location}: {message}")]
    Structural {
        message: String,
        location: SourceLocation,
    },

    /// A construct with no emission strategy under the active configuration.
    #[error("unsupported binding `{attribute}` at {location}: {message}")]
    UnsupportedBinding {
        attribute: String,
        message: String,
        location: SourceLocation,
    },

    /// Semantic rule violation, only raised when `validate` is on.
    #[error("validation error at {location}: {message}")]
    Validation {
        message: String,
        location: SourceLocation,
    },

    /// The assembled output did not re-parse.
    #[error("emitted code failed to parse: {message}")]
    Emit { message: String },
}

impl TransformError {
    pub fn structural(source: &str, span: Span, message: impl Into<String>) -> Self {
        TransformError::Structural {
            message: message.into(),
            location: SourceLocation::from_span(source, span),
        }
    }

    pub fn unsupported(
        source: &str,
        span: Span,
        attribute: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        TransformError::UnsupportedBinding {
            attribute: attribute.into(),
            message: message.into(),
            location: SourceLocation::from_span(source, span),
        }
    }

    pub fn validation(source: &str, span: Span, message: impl Into<String>) -> Self {
        TransformError::Validation {
            message: message.into(),
            location: SourceLocation::from_span(source, span),
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            TransformError::Structural { .. } => ERR_STRUCTURAL,
            TransformError::UnsupportedBinding { .. } => ERR_UNSUPPORTED_BINDING,
            TransformError::Validation { .. } => ERR_VALIDATION,
            TransformError::Emit { .. } => ERR_EMIT,
        }
    }

    pub fn location(&self) -> Option<SourceLocation> {
        match self {
            TransformError::Structural { location, .. }
            | TransformError::UnsupportedBinding { location, .. }
            | TransformError::Validation { location, .. } => Some(*location),
            TransformError::Emit { .. } => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, TransformError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_location_counts_lines_and_columns() {
        let source = "const a = 1;\nconst b = <div>\n  x";
        let offset = source.find("<div>").unwrap();
        let loc = SourceLocation::from_offset(source, offset);
        assert_eq!(loc.line, 2);
        assert_eq!(loc.column, 11);
        assert_eq!(loc.to_string(), "2:11");
    }

    #[test]
    fn test_error_codes() {
        let err = TransformError::structural("<a>", Span::new(0, 3), "bad");
        assert_eq!(err.code(), ERR_STRUCTURAL);
        assert_eq!(err.location().unwrap().column, 1);

        let err = TransformError::Emit {
            message: "oops".to_string(),
        };
        assert_eq!(err.code(), ERR_EMIT);
        assert!(err.location().is_none());
    }
}
