//! Groups a flat token stream into token trees.
//!
//! The resolver works on slices of [`TokenTree`]s so that a parenthesized
//! sub-expression, a function call or an arithmetic operation each count as a
//! single position. That keeps the positional checks of the resolver (the
//! `BETWEEN` lookbehind, the three-token comparison shape) independent of how
//! much text a group spans.

use super::error::{QueryError, QueryResult};
use super::lexer::{Token, TokenKind};

/// A token or a group of tokens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenTree {
    /// A single token.
    Token(Token),

    /// A parenthesized group. The children include both delimiters.
    Parenthesis(Vec<TokenTree>),

    /// A function call such as `cone(1, 2, 3)`.
    Function {
        /// The function name token.
        name: Token,
        /// The argument group, delimiters included.
        arguments: Vec<TokenTree>,
    },

    /// An arithmetic operation `operand (+|-|*|/) operand`, whitespace kept.
    Operation(Vec<TokenTree>),
}

impl TokenTree {
    /// Returns the underlying token if this is a single token.
    pub fn as_token(&self) -> Option<&Token> {
        match self {
            TokenTree::Token(token) => Some(token),
            _ => None,
        }
    }

    /// Reconstructs the source text covered by this tree.
    pub fn text(&self) -> String {
        let mut text = String::new();
        self.write_text(&mut text);
        text
    }

    fn write_text(&self, out: &mut String) {
        match self {
            TokenTree::Token(token) => out.push_str(&token.text),
            TokenTree::Parenthesis(children) | TokenTree::Operation(children) => {
                for child in children {
                    child.write_text(out);
                }
            }
            TokenTree::Function { name, arguments } => {
                out.push_str(&name.text);
                for child in arguments {
                    child.write_text(out);
                }
            }
        }
    }

    /// Returns true for whitespace tokens.
    pub fn is_whitespace(&self) -> bool {
        self.is_kind(TokenKind::Whitespace)
    }

    /// Returns true if this is a single token of the given kind.
    pub fn is_kind(&self, kind: TokenKind) -> bool {
        self.as_token().is_some_and(|t| t.kind == kind)
    }

    /// Returns true if this is the given keyword.
    pub fn is_keyword(&self, keyword: &str) -> bool {
        self.as_token().is_some_and(|t| t.is_keyword(keyword))
    }

    /// Returns true if this is the given punctuation character.
    pub fn is_punctuation(&self, punctuation: char) -> bool {
        self.as_token().is_some_and(|t| t.is_punctuation(punctuation))
    }

    /// Returns the normalized keyword text if this is a keyword token.
    pub fn keyword(&self) -> Option<&str> {
        self.as_token()
            .filter(|t| t.kind == TokenKind::Keyword)
            .map(|t| t.normalized.as_str())
    }

    /// Returns the normalized text of a single token, whatever its kind.
    pub fn normalized(&self) -> Option<&str> {
        self.as_token().map(|t| t.normalized.as_str())
    }

    /// Returns true if this tree can stand on either side of an arithmetic
    /// operator.
    fn is_operand(&self) -> bool {
        match self {
            TokenTree::Token(token) => matches!(
                token.kind,
                TokenKind::Identifier | TokenKind::Integer | TokenKind::Float
            ),
            TokenTree::Operation(_) => true,
            TokenTree::Parenthesis(_) | TokenTree::Function { .. } => false,
        }
    }
}

/// Groups tokens into trees.
///
/// Parentheses must balance; a stray `)` or an unclosed `(` fails with
/// [`QueryError::UnmatchedParenthesis`]. The grouping uses an explicit stack,
/// so arbitrarily deep nesting cannot overflow the call stack here.
pub fn group(tokens: Vec<Token>) -> QueryResult<Vec<TokenTree>> {
    let mut stack: Vec<Vec<TokenTree>> = vec![Vec::new()];

    for token in tokens {
        if token.is_punctuation('(') {
            stack.push(vec![TokenTree::Token(token)]);
            continue;
        }

        if token.is_punctuation(')') {
            if stack.len() == 1 {
                return Err(QueryError::UnmatchedParenthesis);
            }
            let mut children = stack.pop().unwrap_or_default();
            children.push(TokenTree::Token(token));
            let children = group_operations(children);

            let parent = stack.last_mut().ok_or(QueryError::UnmatchedParenthesis)?;
            let is_call = parent.last().is_some_and(|t| t.is_kind(TokenKind::FunctionName));
            let callee = if is_call { parent.pop() } else { None };
            match callee {
                Some(TokenTree::Token(name)) => parent.push(TokenTree::Function {
                    name,
                    arguments: children,
                }),
                _ => parent.push(TokenTree::Parenthesis(children)),
            }
            continue;
        }

        if let Some(current) = stack.last_mut() {
            current.push(TokenTree::Token(token));
        }
    }

    if stack.len() != 1 {
        return Err(QueryError::UnmatchedParenthesis);
    }
    Ok(group_operations(stack.pop().unwrap_or_default()))
}

/// Folds `operand op operand` runs into left-associative operation trees.
fn group_operations(trees: Vec<TokenTree>) -> Vec<TokenTree> {
    let mut output: Vec<TokenTree> = Vec::with_capacity(trees.len());
    let mut input = trees.into_iter().peekable();

    while let Some(tree) = input.next() {
        if !tree.is_kind(TokenKind::Arithmetic) {
            output.push(tree);
            continue;
        }

        // Left operand: last non-whitespace tree already emitted.
        let left_index = output.iter().rposition(|t| !t.is_whitespace());
        let left_ok = left_index.is_some_and(|i| output[i].is_operand());

        // Right operand: next non-whitespace tree still to come.
        let mut gap = Vec::new();
        while input.peek().is_some_and(TokenTree::is_whitespace) {
            gap.extend(input.next());
        }
        let right_ok = input.peek().is_some_and(TokenTree::is_operand);

        match (left_index, left_ok && right_ok) {
            (Some(index), true) => {
                let mut children: Vec<TokenTree> = output.drain(index..).collect();
                children.push(tree);
                children.extend(gap);
                children.extend(input.next());
                output.push(TokenTree::Operation(children));
            }
            _ => {
                output.push(tree);
                output.extend(gap);
            }
        }
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::lexer::Lexer;

    fn trees(input: &str) -> Vec<TokenTree> {
        group(Lexer::new(input).tokenize().unwrap()).unwrap()
    }

    fn significant(input: &str) -> Vec<TokenTree> {
        trees(input)
            .into_iter()
            .filter(|t| !t.is_whitespace())
            .collect()
    }

    #[test]
    fn test_group_parenthesis() {
        let result = significant("(a = 1) and b = 2");
        assert_eq!(result.len(), 5);
        assert!(matches!(&result[0], TokenTree::Parenthesis(children) if children.len() == 7));
        assert_eq!(result[0].text(), "(a = 1)");
    }

    #[test]
    fn test_group_nested_parenthesis() {
        let result = significant("((a = 1))");
        assert_eq!(result.len(), 1);
        let TokenTree::Parenthesis(outer) = &result[0] else {
            panic!("expected parenthesis");
        };
        assert!(matches!(outer[1], TokenTree::Parenthesis(_)));
    }

    #[test]
    fn test_group_function() {
        let result = significant("cone(1, 2, 3) or x = 1");
        let TokenTree::Function { name, arguments } = &result[0] else {
            panic!("expected function");
        };
        assert_eq!(name.text, "cone");
        assert!(arguments.first().unwrap().is_punctuation('('));
        assert!(arguments.last().unwrap().is_punctuation(')'));
        assert_eq!(result[0].text(), "cone(1, 2, 3)");
    }

    #[test]
    fn test_group_operation() {
        let result = significant("numfield - numfield2 between 1 and 5");
        assert_eq!(result.len(), 5);
        assert!(matches!(result[0], TokenTree::Operation(_)));
        assert_eq!(result[0].text(), "numfield - numfield2");
    }

    #[test]
    fn test_group_operation_left_associative() {
        let result = significant("13/12/2018");
        assert_eq!(result.len(), 1);
        let TokenTree::Operation(children) = &result[0] else {
            panic!("expected operation");
        };
        assert!(matches!(children[0], TokenTree::Operation(_)));
        assert_eq!(result[0].text(), "13/12/2018");
    }

    #[test]
    fn test_group_operation_inside_parenthesis() {
        let result = significant("(a + b > 1)");
        let TokenTree::Parenthesis(children) = &result[0] else {
            panic!("expected parenthesis");
        };
        let inner: Vec<_> = children.iter().filter(|t| !t.is_whitespace()).collect();
        assert_eq!(inner.len(), 5);
        assert!(matches!(inner[1], TokenTree::Operation(_)));
    }

    #[test]
    fn test_group_dangling_operator_left_alone() {
        let result = significant("a = 1 -");
        assert_eq!(result.len(), 4);
        assert!(result[3].is_kind(TokenKind::Arithmetic));
    }

    #[test]
    fn test_group_unclosed_parenthesis() {
        let tokens = Lexer::new("(x > 10").tokenize().unwrap();
        assert_eq!(group(tokens), Err(QueryError::UnmatchedParenthesis));
    }

    #[test]
    fn test_group_stray_closing_parenthesis() {
        let tokens = Lexer::new("x > 10)").tokenize().unwrap();
        assert_eq!(group(tokens), Err(QueryError::UnmatchedParenthesis));
    }

    #[test]
    fn test_group_deep_nesting_does_not_overflow() {
        let depth = 1_000;
        let query = format!("{}x = 1{}", "(".repeat(depth), ")".repeat(depth));
        let result = trees(&query);
        assert_eq!(result.len(), 1);
    }
}
