//! Recursive resolver turning token trees into filter expressions.

use serde::Serialize;
use tracing::{debug, trace};

use super::ast::{
    ArithmeticOp, ArithmeticRef, FieldPath, FilterExpression, PredicateOp, PredicateValue,
};
use super::coerce::{coerce, DEFAULT_DATE_FORMAT};
use super::error::{QueryError, QueryResult};
use super::extension::{discriminator_tag, ExtensionRegistry, ExtensionSpec, ExtraParam, ExtraParams};
use super::grouping::{group, TokenTree};
use super::lexer::{Lexer, Token, TokenKind};
use super::operator;
use crate::schema::FieldResolver;

/// Default limit on nested parentheses.
pub const DEFAULT_MAX_DEPTH: usize = 64;

/// Parser configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParserOptions {
    /// `chrono` format used for literals compared with date fields.
    pub date_format: String,
    /// Maximum number of nested parentheses before a query is rejected.
    pub max_depth: usize,
}

impl Default for ParserOptions {
    fn default() -> Self {
        Self {
            date_format: DEFAULT_DATE_FORMAT.to_string(),
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

/// The result of a successful parse.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParsedQuery {
    /// The filter expression.
    pub filter: FilterExpression,
    /// Every extension parameter the parser holds after this parse,
    /// including records from earlier parses that were not reset.
    pub extra_params: ExtraParams,
}

/// Parser for SQL-like filter conditions.
///
/// # Grammar
///
/// ```text
/// expression ::= expression OR expression
///              | expression AND expression
///              | "(" expression ")"
///              | subject BETWEEN value AND value
///              | subject [NOT] IN "(" value ("," value)* ")"
///              | subject IS [NOT] NULL
///              | subject operator value
///              | function "(" number ("," number)* ")"
/// subject    ::= field | field ("+" | "-" | "*" | "/") field
/// operator   ::= "=" | ">" | ">=" | "<" | "<=" | "~" | "<>" | "!=" | NOT
/// ```
///
/// `OR` binds looser than `AND`. Both are split at their rightmost
/// occurrence, so chains group to the left: `a and b and c` is
/// `(a and b) and c`.
///
/// The parser keeps the parameters of extension calls across parses, so the
/// second `cone(...)` seen by an instance is tagged `query1` even when it
/// comes from a different query. Call [`QueryParser::reset_extra_params`] or
/// use a fresh instance to start over.
///
/// # Example
///
/// ```
/// use customquery_rs::query::{FilterExpression, QueryParser};
/// use customquery_rs::schema::{FieldKind, Model, Schema};
///
/// let schema = Schema::new().model("Star", Model::new().field("mag", FieldKind::Float));
/// let target = schema.target("Star").unwrap();
///
/// let mut parser = QueryParser::new();
/// let parsed = parser.parse(&target, "mag < 6 and cone(10, 20, 0.5)").unwrap();
/// assert!(matches!(parsed.filter, FilterExpression::And(_, _)));
/// assert_eq!(parsed.extra_params.len(), 1);
/// ```
#[derive(Debug, Clone, Default)]
pub struct QueryParser {
    options: ParserOptions,
    extensions: ExtensionRegistry,
    extra_params: ExtraParams,
}

impl QueryParser {
    /// Creates a parser with default options and the cone search extension.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a parser with the given options.
    pub fn with_options(options: ParserOptions) -> Self {
        Self {
            options,
            ..Self::default()
        }
    }

    /// Creates a parser with the given date format.
    pub fn with_date_format(date_format: impl Into<String>) -> Self {
        Self::with_options(ParserOptions {
            date_format: date_format.into(),
            ..ParserOptions::default()
        })
    }

    /// Returns the parser options.
    pub fn options(&self) -> &ParserOptions {
        &self.options
    }

    /// Registers an additional function-call extension.
    pub fn register_extension(&mut self, spec: ExtensionSpec) {
        debug!(name = spec.name(), arity = spec.arity(), "registered extension");
        self.extensions.register(spec);
    }

    /// Returns the extension parameters accumulated so far.
    pub fn extra_params(&self) -> &ExtraParams {
        &self.extra_params
    }

    /// Clears the accumulated extension parameters, restarting tag numbering.
    pub fn reset_extra_params(&mut self) {
        self.extra_params.clear();
    }

    /// Takes the accumulated extension parameters, leaving the parser empty.
    pub fn take_extra_params(&mut self) -> ExtraParams {
        std::mem::take(&mut self.extra_params)
    }

    /// Parses a query against a target.
    ///
    /// # Errors
    ///
    /// Returns a [`QueryError`] describing the first problem found. A failed
    /// parse leaves the accumulated extension parameters untouched.
    pub fn parse<R>(&mut self, target: &R, query: &str) -> QueryResult<ParsedQuery>
    where
        R: FieldResolver + ?Sized,
    {
        if query.trim().is_empty() {
            return Err(QueryError::EmptyQuery);
        }

        let tokens = Lexer::new(query).tokenize()?;
        let trees = group(tokens)?;
        let trees: Vec<&TokenTree> = trees.iter().collect();

        let mut resolution = Resolution {
            target,
            options: &self.options,
            extensions: &self.extensions,
            committed: &self.extra_params,
            pending: Vec::new(),
        };
        let filter = resolution.resolve(&trees, 0)?;
        let pending = resolution.pending;

        debug!(query, extensions = pending.len(), "parsed query");
        self.extra_params.extend(pending);

        Ok(ParsedQuery {
            filter,
            extra_params: self.extra_params.clone(),
        })
    }
}

/// State of a single parse.
///
/// Extension records are collected in `pending` and only appended to the
/// parser once the whole query resolved.
struct Resolution<'a, R: ?Sized> {
    target: &'a R,
    options: &'a ParserOptions,
    extensions: &'a ExtensionRegistry,
    committed: &'a ExtraParams,
    pending: Vec<ExtraParam>,
}

impl<R> Resolution<'_, R>
where
    R: FieldResolver + ?Sized,
{
    /// Resolves a slice of token trees into one expression.
    fn resolve(&mut self, trees: &[&TokenTree], depth: usize) -> QueryResult<FilterExpression> {
        if depth > self.options.max_depth {
            return Err(QueryError::NestingTooDeep {
                limit: self.options.max_depth,
            });
        }

        let tokens: Vec<&TokenTree> = trees.iter().copied().filter(|t| !t.is_whitespace()).collect();

        match tokens.as_slice() {
            [] => return Err(QueryError::InvalidQuery),
            [TokenTree::Parenthesis(children)] => {
                let inner: Vec<&TokenTree> = children.iter().collect();
                return self.resolve(&inner, depth + 1);
            }
            [TokenTree::Function { name, arguments }] => return self.extension(name, arguments),
            [_] => return Err(QueryError::InvalidQuery),
            _ => {}
        }

        if tokens[0].is_punctuation('(') {
            // Same parenthesis level as the group holding these children.
            let inner = strip_group(&tokens)?;
            return self.resolve(inner, depth);
        }

        // OR binds loosest. Splitting at the rightmost one nests to the left,
        // so a chain folds left over its operands.
        let ors: Vec<usize> = (0..tokens.len()).filter(|&i| tokens[i].is_keyword("OR")).collect();
        if !ors.is_empty() {
            trace!(positions = ?ors, "split on OR");
            return self.fold_chain(&tokens, &ors, depth, FilterExpression::or);
        }

        let has_between = tokens.iter().any(|t| t.is_keyword("BETWEEN"));
        let ands: Vec<usize> = (0..tokens.len())
            .filter(|&i| tokens[i].is_keyword("AND"))
            // An AND two positions after BETWEEN belongs to it.
            .filter(|&i| !(has_between && i > 2 && tokens[i - 2].is_keyword("BETWEEN")))
            .collect();
        if !ands.is_empty() {
            trace!(positions = ?ands, "split on AND");
            return self.fold_chain(&tokens, &ands, depth, FilterExpression::and);
        }

        if let Some(i) = tokens.iter().position(|t| t.is_keyword("BETWEEN")) {
            return self.between(&tokens, i, depth);
        }

        let operator = tokens[1];
        match operator.as_token().filter(|t| t.kind == TokenKind::Comparison) {
            Some(token) if token.normalized == "IN" => {
                return self.in_list(&tokens, tokens.get(2).copied(), false);
            }
            Some(token) if token.normalized == "NOT IN" => {
                return self.in_list(&tokens, tokens.get(2).copied(), true);
            }
            _ => {}
        }

        if let Some(keyword) = operator.keyword() {
            return match (keyword, tokens.len()) {
                ("NOT", 3) => self.compare(tokens[0], tokens[1], tokens[2]),
                ("NOT", 4) if tokens[2].normalized() == Some("IN") => {
                    self.in_list(&tokens, Some(tokens[3]), true)
                }
                ("NOT", _) => Err(QueryError::InvalidQuery),
                ("IS", _) => self.is_null(tokens[0], &tokens[2..]),
                _ => Err(QueryError::InvalidQuery),
            };
        }

        if tokens.len() != 3 {
            return Err(QueryError::InvalidQuery);
        }
        self.compare(tokens[0], tokens[1], tokens[2])
    }

    /// Resolves the operands between `splits` and folds them left with
    /// `combine`. Operands stay at the depth of the chain.
    fn fold_chain(
        &mut self,
        tokens: &[&TokenTree],
        splits: &[usize],
        depth: usize,
        combine: fn(FilterExpression, FilterExpression) -> FilterExpression,
    ) -> QueryResult<FilterExpression> {
        let mut start = 0;
        let mut folded: Option<FilterExpression> = None;
        for end in splits.iter().copied().chain(std::iter::once(tokens.len())) {
            let operand = self.resolve(&tokens[start..end], depth)?;
            folded = Some(match folded {
                Some(left) => combine(left, operand),
                None => operand,
            });
            start = end + 1;
        }
        folded.ok_or(QueryError::InvalidQuery)
    }

    /// `subject BETWEEN floor AND ceil` as `subject >= floor AND subject <= ceil`.
    fn between(
        &mut self,
        tokens: &[&TokenTree],
        position: usize,
        depth: usize,
    ) -> QueryResult<FilterExpression> {
        if tokens.len() != 5 || position != 1 || !tokens[3].is_keyword("AND") {
            return Err(QueryError::InvalidQuery);
        }

        let gte = comparison(">=");
        let lte = comparison("<=");
        let floor = self.resolve(&[tokens[0], &gte, tokens[2]], depth + 1)?;
        let ceil = self.resolve(&[tokens[0], &lte, tokens[4]], depth + 1)?;
        Ok(FilterExpression::and(floor, ceil))
    }

    /// `subject [NOT] IN (v1, v2, ...)`.
    ///
    /// `tokens` is the whole slice, used to check its shape.
    fn in_list(
        &mut self,
        tokens: &[&TokenTree],
        values: Option<&TokenTree>,
        negated: bool,
    ) -> QueryResult<FilterExpression> {
        let expected_len = if tokens[1].is_keyword("NOT") { 4 } else { 3 };
        let Some(values) = values else {
            return Err(QueryError::parenthesis_expected("IN"));
        };
        let TokenTree::Parenthesis(children) = values else {
            return Err(QueryError::parenthesis_expected("IN"));
        };
        if tokens.len() != expected_len {
            return Err(QueryError::InvalidQuery);
        }

        let field = field_path(tokens[0])?;
        let descriptor = self.target.resolve_field(&field)?;

        let items = split_list(strip_delimiters(children))?;
        let values = items
            .into_iter()
            .map(|item| coerce(&descriptor, item, &self.options.date_format))
            .collect::<QueryResult<Vec<_>>>()?;

        Ok(FilterExpression::In {
            field,
            values,
            negated,
        })
    }

    /// `subject IS NULL` or `subject IS NOT NULL`.
    fn is_null(&mut self, subject: &TokenTree, tail: &[&TokenTree]) -> QueryResult<FilterExpression> {
        let is_null = match tail {
            [value] if value.is_keyword("NULL") => true,
            [value] if value.is_keyword("NOT NULL") => false,
            [not, value] if not.is_keyword("NOT") && value.is_keyword("NULL") => false,
            _ => {
                let text: Vec<String> = tail.iter().map(|t| t.text()).collect();
                return Err(QueryError::invalid_is_operand(text.join(" ")));
            }
        };

        let field = field_path(subject)?;
        self.target.resolve_field(&field)?;
        Ok(FilterExpression::is_null(field, is_null))
    }

    /// A leaf comparison `subject operator predicate`.
    fn compare(
        &mut self,
        subject: &TokenTree,
        operator: &TokenTree,
        predicate: &TokenTree,
    ) -> QueryResult<FilterExpression> {
        let (op, negated) = operator::lookup(operator)?;

        if let TokenTree::Operation(children) = subject {
            return self.compare_arithmetic(children, op, negated, predicate);
        }

        let field = field_path(subject)?;
        let descriptor = self.target.resolve_field(&field)?;
        let value = coerce(&descriptor, predicate, &self.options.date_format)?;
        Ok(FilterExpression::predicate(field, op, value, negated))
    }

    /// Rewrites `a OP b <cmp> k` into `a <cmp> (k INV(OP) b)`.
    fn compare_arithmetic(
        &mut self,
        children: &[TokenTree],
        op: PredicateOp,
        negated: bool,
        predicate: &TokenTree,
    ) -> QueryResult<FilterExpression> {
        let parts: Vec<&TokenTree> = children.iter().filter(|t| !t.is_whitespace()).collect();
        let [left, arithmetic, right] = parts.as_slice() else {
            return Err(QueryError::InvalidQuery);
        };
        let arithmetic = arithmetic
            .as_token()
            .and_then(|t| ArithmeticOp::from_symbol(&t.text))
            .ok_or(QueryError::InvalidQuery)?;

        let field = field_path(left)?;
        let other = field_path(right)?;
        let descriptor = self.target.resolve_field(&field)?;
        self.target.resolve_field(&other)?;

        let constant = coerce(&descriptor, predicate, &self.options.date_format)?;
        Ok(FilterExpression::Predicate {
            field,
            op,
            value: PredicateValue::Arithmetic(ArithmeticRef {
                constant,
                op: arithmetic.inverse(),
                field: other,
            }),
            negated,
        })
    }

    /// A registered function call.
    fn extension(&mut self, name: &Token, arguments: &[TokenTree]) -> QueryResult<FilterExpression> {
        let spec = self
            .extensions
            .find(&name.text)
            .ok_or_else(|| QueryError::unknown_extension(name.text.to_lowercase()))?;

        let param = spec.bind(arguments)?;
        let index = self.committed.count_for(spec.name())
            + self
                .pending
                .iter()
                .filter(|p| p.extension == spec.name())
                .count();
        let tag = discriminator_tag(index);

        debug!(extension = spec.name(), tag = %tag, "recorded extension call");
        self.pending.push(param);

        Ok(FilterExpression::Extension {
            name: spec.name().to_string(),
            tag,
        })
    }
}

/// Creates a synthetic comparison operator token.
fn comparison(symbol: &str) -> TokenTree {
    TokenTree::Token(Token::new(TokenKind::Comparison, symbol))
}

/// Returns the inside of a slice that starts with `(` and must end with `)`.
fn strip_group<'t, 'a>(tokens: &'t [&'a TokenTree]) -> QueryResult<&'t [&'a TokenTree]> {
    match tokens {
        [first, inner @ .., last] if first.is_punctuation('(') && last.is_punctuation(')') => {
            Ok(inner)
        }
        _ => Err(QueryError::UnmatchedParenthesis),
    }
}

/// Drops the delimiters and whitespace of a parenthesis group's children.
fn strip_delimiters(children: &[TokenTree]) -> Vec<&TokenTree> {
    let inner = match children {
        [first, inner @ .., last] if first.is_punctuation('(') && last.is_punctuation(')') => inner,
        _ => children,
    };
    inner.iter().filter(|t| !t.is_whitespace()).collect()
}

/// Splits `v1 , v2 , v3` into its values.
///
/// Values and commas must strictly alternate, starting and ending with a
/// value.
fn split_list(tokens: Vec<&TokenTree>) -> QueryResult<Vec<&TokenTree>> {
    if tokens.is_empty() {
        return Err(QueryError::MalformedList);
    }

    let mut values = Vec::with_capacity(tokens.len() / 2 + 1);
    for (i, token) in tokens.iter().enumerate() {
        let is_punctuation = token.is_kind(TokenKind::Punctuation);
        if i % 2 == 0 {
            if is_punctuation {
                return Err(QueryError::MalformedList);
            }
            values.push(*token);
        } else if !token.is_punctuation(',') {
            return Err(QueryError::MalformedList);
        }
    }

    if tokens.len() % 2 == 0 {
        // Trailing comma.
        return Err(QueryError::MalformedList);
    }
    Ok(values)
}

/// Reads a field path from an identifier token.
fn field_path(tree: &TokenTree) -> QueryResult<FieldPath> {
    match tree.as_token() {
        Some(token) if token.kind == TokenKind::Identifier => Ok(FieldPath::parse(&token.text)),
        _ => Err(QueryError::InvalidQuery),
    }
}
