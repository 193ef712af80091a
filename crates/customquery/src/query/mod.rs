//! Query parsing.
//!
//! A query is a SQL `WHERE`-style condition:
//!
//! ```text
//! numfield >= 10 and (charfield ~ 'abc' or related.name in ('a', 'b'))
//! datefield between '2018-01-01' and '2018-12-31'
//! numfield + numfield2 < 12
//! related__name is not null and cone(120.3, 23, 1.0)
//! ```
//!
//! Parsing runs in three stages:
//!
//! 1. [`Lexer`] splits the text into [`Token`]s.
//! 2. [`group`] nests them into [`TokenTree`]s: parenthesized groups,
//!    function calls and arithmetic operations become single trees.
//! 3. [`QueryParser`] resolves the trees recursively into a
//!    [`FilterExpression`], validating every field through a
//!    [`FieldResolver`](crate::schema::FieldResolver).
//!
//! Keywords are case-insensitive. Field paths may use `.` or `__` to cross
//! relations.

mod ast;
mod coerce;
mod error;
mod extension;
mod grouping;
mod lexer;
mod operator;
mod parser;


pub use ast::{
    ArithmeticOp, ArithmeticRef, FieldPath, FilterExpression, PredicateOp, PredicateValue,
    TypedValue,
};
pub use coerce::DEFAULT_DATE_FORMAT;
pub use error::{QueryError, QueryResult};
pub use extension::{
    discriminator_tag, Argument, ExtensionRegistry, ExtensionSpec, ExtraParam, ExtraParams,
};
pub use grouping::{group, TokenTree};
pub use lexer::{Lexer, Token, TokenKind};
pub use parser::{ParsedQuery, ParserOptions, QueryParser, DEFAULT_MAX_DEPTH};
