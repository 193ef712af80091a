//! Comparison operator table.

use super::ast::PredicateOp;
use super::error::{QueryError, QueryResult};
use super::grouping::TokenTree;
use super::lexer::TokenKind;

/// Maps a comparison token to its predicate operator and negation flag.
///
/// | Token        | Operator   | Negated |
/// |--------------|------------|---------|
/// | `=`          | `Eq`       | no      |
/// | `>`          | `Gt`       | no      |
/// | `>=`         | `Gte`      | no      |
/// | `<`          | `Lt`       | no      |
/// | `<=`         | `Lte`      | no      |
/// | `~`          | `Contains` | no      |
/// | `<>` or `!=` | `Eq`       | yes     |
/// | `NOT`        | `Eq`       | yes     |
///
/// # Errors
///
/// Returns `QueryError::UnknownOperator` with the operator text for anything
/// else.
pub fn lookup(operator: &TokenTree) -> QueryResult<(PredicateOp, bool)> {
    let Some(token) = operator.as_token() else {
        return Err(QueryError::unknown_operator(operator.text()));
    };

    if token.is_keyword("NOT") {
        return Ok((PredicateOp::Eq, true));
    }
    if token.kind != TokenKind::Comparison {
        return Err(QueryError::unknown_operator(token.text.as_str()));
    }

    match token.text.as_str() {
        "=" => Ok((PredicateOp::Eq, false)),
        ">" => Ok((PredicateOp::Gt, false)),
        ">=" => Ok((PredicateOp::Gte, false)),
        "<" => Ok((PredicateOp::Lt, false)),
        "<=" => Ok((PredicateOp::Lte, false)),
        "~" => Ok((PredicateOp::Contains, false)),
        "<>" | "!=" => Ok((PredicateOp::Eq, true)),
        other => Err(QueryError::unknown_operator(other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::lexer::Token;

    fn op(kind: TokenKind, text: &str) -> TokenTree {
        TokenTree::Token(Token::new(kind, text))
    }

    #[test]
    fn test_lookup_table() {
        let cases = [
            ("=", PredicateOp::Eq, false),
            (">", PredicateOp::Gt, false),
            (">=", PredicateOp::Gte, false),
            ("<", PredicateOp::Lt, false),
            ("<=", PredicateOp::Lte, false),
            ("~", PredicateOp::Contains, false),
            ("<>", PredicateOp::Eq, true),
            ("!=", PredicateOp::Eq, true),
        ];
        for (text, expected, negated) in cases {
            assert_eq!(
                lookup(&op(TokenKind::Comparison, text)),
                Ok((expected, negated)),
                "operator {text}"
            );
        }
    }

    #[test]
    fn test_lookup_not_keyword() {
        assert_eq!(
            lookup(&op(TokenKind::Keyword, "not")),
            Ok((PredicateOp::Eq, true))
        );
    }

    #[test]
    fn test_lookup_unknown() {
        assert_eq!(
            lookup(&op(TokenKind::Comparison, "?")),
            Err(QueryError::unknown_operator("?"))
        );
        assert_eq!(
            lookup(&op(TokenKind::Comparison, "==")),
            Err(QueryError::unknown_operator("=="))
        );
        assert_eq!(
            lookup(&op(TokenKind::Identifier, "like")),
            Err(QueryError::unknown_operator("like"))
        );
    }
}
