//! Error types for the query parser.

use thiserror::Error;

/// A specialized Result type for query parsing operations.
pub type QueryResult<T> = Result<T, QueryError>;

/// Errors that can occur while tokenizing or resolving a query.
///
/// Every error aborts the whole parse. No partial expression is returned and
/// extension parameters collected during the failed parse are discarded.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum QueryError {
    /// The query is empty or contains only whitespace.
    #[error("query is empty")]
    EmptyQuery,

    /// The lexer met a character that starts no token.
    #[error("unexpected character '{character}' at position {position}")]
    UnexpectedCharacter {
        /// The offending character.
        character: char,
        /// Byte offset of the character in the query.
        position: usize,
    },

    /// A quoted string literal was never closed.
    #[error("unterminated string starting at position {position}")]
    UnterminatedString {
        /// Byte offset of the opening quote.
        position: usize,
    },

    /// Parentheses are not balanced.
    #[error("parentheses do not match")]
    UnmatchedParenthesis,

    /// The token sequence has a shape the grammar does not accept.
    #[error("invalid query")]
    InvalidQuery,

    /// The values inside an `IN` list are not a valid comma separated list.
    #[error("values inside parenthesis are not a valid list")]
    MalformedList,

    /// A parenthesized group was expected after a keyword.
    #[error("expected opening parenthesis after {after}")]
    ParenthesisExpected {
        /// The keyword preceding the missing group.
        after: String,
    },

    /// A comparison operator is not part of the operator table.
    #[error("operator '{operator}' is invalid")]
    UnknownOperator {
        /// The operator text as written.
        operator: String,
    },

    /// The field does not exist on the query target.
    #[error("field '{field}' does not exist{}", suggestion_suffix(.suggestion))]
    UnknownField {
        /// The normalized field path.
        field: String,
        /// A similarly named field, if one exists.
        suggestion: Option<String>,
    },

    /// The literal cannot be turned into a value for the field.
    #[error("unsupported literal: {literal}")]
    UnsupportedLiteral {
        /// The literal text as written.
        literal: String,
    },

    /// A date literal does not match the configured date format.
    #[error("cannot parse '{value}' as a date with format '{format}'")]
    DateParse {
        /// The literal text, quotes removed.
        value: String,
        /// The configured date format.
        format: String,
    },

    /// A function call has the wrong number or kind of arguments.
    #[error("{name}() expects {expected} numeric arguments, got {found}")]
    InvalidExtensionArguments {
        /// The called function.
        name: String,
        /// Number of arguments the function takes.
        expected: usize,
        /// Number of arguments found.
        found: usize,
    },

    /// A function call names no registered extension.
    #[error("unknown function: {name}")]
    UnknownExtension {
        /// The called function.
        name: String,
    },

    /// The operand of `IS` is neither `NULL` nor `NOT NULL`.
    #[error("'{value}' is not a valid value for IS")]
    InvalidIsOperand {
        /// The operand text.
        value: String,
    },

    /// The query nests deeper than the parser allows.
    #[error("query nesting exceeds the limit of {limit}")]
    NestingTooDeep {
        /// The configured depth limit.
        limit: usize,
    },
}

fn suggestion_suffix(suggestion: &Option<String>) -> String {
    match suggestion {
        Some(name) => format!(" (did you mean '{name}'?)"),
        None => String::new(),
    }
}

impl QueryError {
    /// Creates a missing parenthesis error.
    pub fn parenthesis_expected(after: impl Into<String>) -> Self {
        QueryError::ParenthesisExpected {
            after: after.into(),
        }
    }

    /// Creates an unknown operator error.
    pub fn unknown_operator(operator: impl Into<String>) -> Self {
        QueryError::UnknownOperator {
            operator: operator.into(),
        }
    }

    /// Creates an unknown field error without a suggestion.
    pub fn unknown_field(field: impl Into<String>) -> Self {
        QueryError::UnknownField {
            field: field.into(),
            suggestion: None,
        }
    }

    /// Creates an unsupported literal error.
    pub fn unsupported_literal(literal: impl Into<String>) -> Self {
        QueryError::UnsupportedLiteral {
            literal: literal.into(),
        }
    }

    /// Creates an unknown extension error.
    pub fn unknown_extension(name: impl Into<String>) -> Self {
        QueryError::UnknownExtension { name: name.into() }
    }

    /// Creates an invalid IS operand error.
    pub fn invalid_is_operand(value: impl Into<String>) -> Self {
        QueryError::InvalidIsOperand {
            value: value.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_field_message_with_suggestion() {
        let err = QueryError::UnknownField {
            field: "numfeld".to_string(),
            suggestion: Some("numfield".to_string()),
        };
        assert_eq!(
            err.to_string(),
            "field 'numfeld' does not exist (did you mean 'numfield'?)"
        );
    }

    #[test]
    fn test_unknown_field_message_without_suggestion() {
        let err = QueryError::unknown_field("unknown");
        assert_eq!(err.to_string(), "field 'unknown' does not exist");
    }

    #[test]
    fn test_unknown_operator_message() {
        assert_eq!(
            QueryError::unknown_operator("?").to_string(),
            "operator '?' is invalid"
        );
    }
}
