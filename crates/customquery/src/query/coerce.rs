//! Literal to typed value coercion.

use chrono::NaiveDate;

use super::ast::TypedValue;
use super::error::{QueryError, QueryResult};
use super::grouping::TokenTree;
use super::lexer::TokenKind;
use crate::schema::{FieldDescriptor, FieldKind};

/// Default format for date literals.
pub const DEFAULT_DATE_FORMAT: &str = "%Y-%m-%d";

/// Removes one matching pair of surrounding single or double quotes.
pub fn strip_quotes(text: &str) -> &str {
    for quote in ['\'', '"'] {
        if text.len() >= 2 && text.starts_with(quote) && text.ends_with(quote) {
            return &text[1..text.len() - 1];
        }
    }
    text
}

/// Turns a literal into a value for the given field.
///
/// Rules, first match wins:
/// 1. date fields parse the unquoted text with `date_format`;
/// 2. integer literals become `Integer`;
/// 3. float literals become `Float`;
/// 4. bare words become `Text` (`charfield=foo`);
/// 5. quoted strings become `Text` without their quotes.
///
/// Because date fields read the raw text, an unquoted `13/12/2018` (which
/// groups as an arithmetic operation) still parses as a date.
///
/// # Errors
///
/// Returns `QueryError::DateParse` if a date does not match the format and
/// `QueryError::UnsupportedLiteral` if no rule applies.
pub fn coerce(
    field: &FieldDescriptor,
    literal: &TokenTree,
    date_format: &str,
) -> QueryResult<TypedValue> {
    let text = literal.text();
    let value = strip_quotes(&text);

    if field.kind == FieldKind::Date {
        return NaiveDate::parse_from_str(value, date_format)
            .map(TypedValue::Date)
            .map_err(|_| QueryError::DateParse {
                value: value.to_string(),
                format: date_format.to_string(),
            });
    }

    let Some(token) = literal.as_token() else {
        return Err(QueryError::unsupported_literal(text.as_str()));
    };

    match token.kind {
        TokenKind::Integer => value
            .parse::<i64>()
            .map(TypedValue::Integer)
            .map_err(|_| QueryError::unsupported_literal(value)),
        TokenKind::Float => value
            .parse::<f64>()
            .map(TypedValue::Float)
            .map_err(|_| QueryError::unsupported_literal(value)),
        // A dotted bare word names its last segment.
        TokenKind::Identifier => {
            let name = token.text.rsplit('.').next().unwrap_or(&token.text);
            Ok(TypedValue::Text(name.to_string()))
        }
        TokenKind::String => Ok(TypedValue::Text(value.to_string())),
        TokenKind::Whitespace
        | TokenKind::Punctuation
        | TokenKind::Keyword
        | TokenKind::Comparison
        | TokenKind::Arithmetic
        | TokenKind::FunctionName => Err(QueryError::unsupported_literal(text.as_str())),
    }
}
