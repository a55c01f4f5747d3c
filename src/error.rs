// Parse Error Taxonomy
//
// Every failure produced while parsing or compiling a statement is one of
// these kinds. Errors are terminal: no partial plan is ever returned, and
// callers receive the kind plus the offending fragment unchanged.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    /// The general grammar rejected the statement outright.
    #[error("syntax error: {0}")]
    Syntax(String),

    /// A mini-parser step found something other than what it expected.
    #[error("expecting {expected:?} but got {found:?} instead")]
    UnexpectedSyntax { expected: String, found: String },

    /// The statement parsed, but uses syntax this front end does not accept.
    #[error("unsupported syntax: {0}")]
    UnsupportedSyntax(String),

    /// The construct is recognized but deliberately not implemented.
    #[error("unsupported feature: {0}")]
    UnsupportedFeature(String),

    #[error("invalid value {value:?}: {reason}")]
    InvalidValue { value: String, reason: String },

    #[error("invalid sort order: {0}")]
    InvalidSortOrder(String),

    /// Index column prefix lengths must be strictly positive.
    #[error("invalid index prefix length on column {0:?}")]
    InvalidIndexPrefix(String),

    #[error("unknown column {column:?} in index {index:?}")]
    UnknownIndexColumn { column: String, index: String },

    #[error("unknown constraint definition: {0}")]
    UnknownConstraintDefinition(String),

    #[error("the view name {0:?} is not valid")]
    MalformedViewName(String),

    #[error("the view definition {0:?} is not valid")]
    MalformedViewDefinition(String),

    #[error("invalid format {format:?} for DESCRIBE, supported formats: {supported}")]
    InvalidDescribeFormat { format: String, supported: String },

    #[error("incorrect index name {0:?}")]
    IncorrectIndexName(String),

    #[error("All parts of PRIMARY KEY must be NOT NULL")]
    PrimaryKeyOnNullField,

    /// Index column lists must be uniformly bare identifiers.
    #[error("invalid expression to index: {0}")]
    InvalidIndexExpression(String),
}

impl ParseError {
    pub(crate) fn unexpected(expected: impl Into<String>, found: impl Into<String>) -> ParseError {
        ParseError::UnexpectedSyntax {
            expected: expected.into(),
            found: found.into(),
        }
    }

    pub(crate) fn invalid_value(value: impl Into<String>, reason: impl Into<String>) -> ParseError {
        ParseError::InvalidValue {
            value: value.into(),
            reason: reason.into(),
        }
    }
}

/// Result type used across the parser and compiler.
pub type ParseResult<T> = Result<T, ParseError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unexpected_syntax_message() {
        let err = ParseError::unexpected("tables", "table");
        assert_eq!(
            err.to_string(),
            "expecting \"tables\" but got \"table\" instead"
        );
    }

    #[test]
    fn test_describe_format_message() {
        let err = ParseError::InvalidDescribeFormat {
            format: "json".to_string(),
            supported: "tree".to_string(),
        };
        assert!(err.to_string().contains("supported formats: tree"));
    }
}
