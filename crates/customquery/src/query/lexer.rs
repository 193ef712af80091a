//! Lexer (tokenizer) for query expressions.

use std::iter::Peekable;
use std::str::Chars;

use super::error::{QueryError, QueryResult};

/// Words that are always keywords, regardless of case.
const KEYWORDS: &[&str] = &["AND", "OR", "NOT", "BETWEEN", "IS", "NULL"];

/// Characters that make up comparison operators (`=`, `<>`, `>=`, ...).
///
/// Runs of these are read greedily, so an unsupported spelling such as `?`
/// or `=>` still produces a comparison token and is rejected later by the
/// operator table with the exact text the user wrote.
const OPERATOR_CHARS: &[char] = &['=', '<', '>', '!', '~', '?', '^', '&', '|', ':'];

/// The kind of a lexical token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    /// A run of whitespace.
    Whitespace,
    /// `(`, `)` or `,`.
    Punctuation,
    /// `AND`, `OR`, `NOT`, `BETWEEN`, `IS`, `NULL` and the compound `NOT NULL`.
    Keyword,
    /// A comparison operator, including the words `IN` and `NOT IN`.
    Comparison,
    /// One of `+ - * /`.
    Arithmetic,
    /// A bare word such as a field path (`related.name`) or an unquoted value.
    Identifier,
    /// An integer literal, optionally signed.
    Integer,
    /// A float literal, optionally signed.
    Float,
    /// A single or double quoted string, quotes included in the text.
    String,
    /// A bare word immediately followed by `(`.
    FunctionName,
}

/// A token with its source text and position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    /// The token kind.
    pub kind: TokenKind,
    /// The text exactly as written in the query.
    pub text: String,
    /// Upper-cased, whitespace-collapsed text for keywords and comparison
    /// words; identical to `text` for every other kind.
    pub normalized: String,
    /// The byte position where the token starts (0-indexed).
    pub position: usize,
}

impl Token {
    /// Creates a token that does not originate from query text.
    pub fn new(kind: TokenKind, text: impl Into<String>) -> Self {
        Self::at(kind, text, 0)
    }

    fn at(kind: TokenKind, text: impl Into<String>, position: usize) -> Self {
        let text = text.into();
        let normalized = match kind {
            TokenKind::Keyword | TokenKind::Comparison => text
                .split_whitespace()
                .map(str::to_uppercase)
                .collect::<Vec<_>>()
                .join(" "),
            _ => text.clone(),
        };
        Self {
            kind,
            text,
            normalized,
            position,
        }
    }

    /// Returns true if this is the given keyword (compared case-insensitively).
    pub fn is_keyword(&self, keyword: &str) -> bool {
        self.kind == TokenKind::Keyword && self.normalized == keyword
    }

    /// Returns true if this is the given punctuation character.
    pub fn is_punctuation(&self, punctuation: char) -> bool {
        self.kind == TokenKind::Punctuation && self.text.starts_with(punctuation)
    }
}

/// Lexer for tokenizing query expressions.
pub struct Lexer<'a> {
    chars: Peekable<Chars<'a>>,
    /// Current byte position in the input string.
    position: usize,
    /// The last token that was not whitespace, used to tell a sign from a
    /// subtraction.
    previous: Option<Token>,
}

impl<'a> Lexer<'a> {
    /// Creates a new lexer for the given input string.
    pub fn new(input: &'a str) -> Self {
        Self {
            chars: input.chars().peekable(),
            position: 0,
            previous: None,
        }
    }

    fn peek(&mut self) -> Option<char> {
        self.chars.peek().copied()
    }

    /// Peeks `offset` characters ahead of the current one.
    fn peek_nth(&self, offset: usize) -> Option<char> {
        self.chars.clone().nth(offset)
    }

    fn next_char(&mut self) -> Option<char> {
        let c = self.chars.next();
        if let Some(ch) = c {
            self.position += ch.len_utf8();
        }
        c
    }

    /// Consumes characters while `predicate` holds and returns them.
    fn read_while(&mut self, predicate: impl Fn(char) -> bool) -> String {
        let mut text = String::new();
        while let Some(c) = self.peek() {
            if !predicate(c) {
                break;
            }
            text.push(c);
            self.next_char();
        }
        text
    }

    /// Returns true if a `+`/`-` at the current position starts a signed number
    /// rather than an arithmetic operator.
    fn sign_starts_number(&self) -> bool {
        let starts_digits = match self.peek_nth(1) {
            Some(c) if c.is_ascii_digit() => true,
            Some('.') => self.peek_nth(2).is_some_and(|c| c.is_ascii_digit()),
            _ => false,
        };
        if !starts_digits {
            return false;
        }
        match &self.previous {
            None => true,
            Some(token) => match token.kind {
                TokenKind::Comparison | TokenKind::Keyword | TokenKind::Arithmetic => true,
                TokenKind::Punctuation => !token.is_punctuation(')'),
                _ => false,
            },
        }
    }

    /// Reads a quoted string, keeping the quotes in the token text.
    fn read_string(&mut self, quote: char, start: usize) -> QueryResult<Token> {
        let mut text = String::new();
        text.push(quote);
        self.next_char();

        loop {
            match self.next_char() {
                Some(c) if c == quote => {
                    text.push(c);
                    return Ok(Token::at(TokenKind::String, text, start));
                }
                Some('\\') => {
                    text.push('\\');
                    if let Some(escaped) = self.next_char() {
                        text.push(escaped);
                    }
                }
                Some(c) => text.push(c),
                None => return Err(QueryError::UnterminatedString { position: start }),
            }
        }
    }

    /// Reads an integer or float literal with an optional leading sign.
    fn read_number(&mut self, start: usize) -> Token {
        let mut text = String::new();
        if let Some(sign @ ('+' | '-')) = self.peek() {
            text.push(sign);
            self.next_char();
        }
        text.push_str(&self.read_while(|c| c.is_ascii_digit()));

        let mut is_float = false;
        if self.peek() == Some('.') {
            is_float = true;
            text.push('.');
            self.next_char();
            text.push_str(&self.read_while(|c| c.is_ascii_digit()));
        }

        if matches!(self.peek(), Some('e' | 'E')) {
            let exponent_digits = match self.peek_nth(1) {
                Some(c) if c.is_ascii_digit() => true,
                Some('+' | '-') => self.peek_nth(2).is_some_and(|c| c.is_ascii_digit()),
                _ => false,
            };
            if exponent_digits {
                is_float = true;
                text.extend(self.next_char());
                if let Some(sign @ ('+' | '-')) = self.peek() {
                    text.push(sign);
                    self.next_char();
                }
                text.push_str(&self.read_while(|c| c.is_ascii_digit()));
            }
        }

        let kind = if is_float {
            TokenKind::Float
        } else {
            TokenKind::Integer
        };
        Token::at(kind, text, start)
    }

    /// Reads a word and classifies it as keyword, comparison word, function
    /// name or identifier.
    fn read_word(&mut self, start: usize) -> Token {
        let word = self.read_while(|c| c.is_alphanumeric() || c == '_' || c == '.' || c == '$');
        let upper = word.to_uppercase();

        if upper == "IN" {
            return Token::at(TokenKind::Comparison, word, start);
        }

        if upper == "NOT" {
            if let Some(compound) = self.read_compound_not(&word, start) {
                return compound;
            }
        }

        if KEYWORDS.contains(&upper.as_str()) {
            return Token::at(TokenKind::Keyword, word, start);
        }

        if self.peek() == Some('(') {
            return Token::at(TokenKind::FunctionName, word, start);
        }

        Token::at(TokenKind::Identifier, word, start)
    }

    /// Merges `NOT IN` and `NOT NULL` (any case, any whitespace in between)
    /// into a single token.
    fn read_compound_not(&mut self, not: &str, start: usize) -> Option<Token> {
        let mut lookahead = self.chars.clone();
        let mut gap = String::new();
        while let Some(&c) = lookahead.peek() {
            if !c.is_whitespace() {
                break;
            }
            gap.push(c);
            lookahead.next();
        }
        if gap.is_empty() {
            return None;
        }

        let mut next_word = String::new();
        while let Some(&c) = lookahead.peek() {
            if !(c.is_alphanumeric() || c == '_' || c == '.' || c == '$') {
                break;
            }
            next_word.push(c);
            lookahead.next();
        }

        let kind = match next_word.to_uppercase().as_str() {
            "IN" => TokenKind::Comparison,
            "NULL" => TokenKind::Keyword,
            _ => return None,
        };

        for _ in 0..gap.chars().count() + next_word.chars().count() {
            self.next_char();
        }
        Some(Token::at(kind, format!("{not}{gap}{next_word}"), start))
    }

    /// Returns the next token, or None at the end of input.
    pub fn next_token(&mut self) -> QueryResult<Option<Token>> {
        let Some(c) = self.peek() else {
            return Ok(None);
        };
        let start = self.position;

        let token = match c {
            _ if c.is_whitespace() => {
                let text = self.read_while(char::is_whitespace);
                Token::at(TokenKind::Whitespace, text, start)
            }
            '(' | ')' | ',' => {
                self.next_char();
                Token::at(TokenKind::Punctuation, c.to_string(), start)
            }
            '\'' | '"' => self.read_string(c, start)?,
            _ if c.is_ascii_digit() => self.read_number(start),
            '.' if self.peek_nth(1).is_some_and(|d| d.is_ascii_digit()) => {
                self.read_number(start)
            }
            '+' | '-' if self.sign_starts_number() => self.read_number(start),
            '+' | '-' | '*' | '/' => {
                self.next_char();
                Token::at(TokenKind::Arithmetic, c.to_string(), start)
            }
            _ if c.is_alphabetic() || c == '_' => self.read_word(start),
            _ if OPERATOR_CHARS.contains(&c) => {
                let text = self.read_while(|c| OPERATOR_CHARS.contains(&c));
                Token::at(TokenKind::Comparison, text, start)
            }
            _ => {
                return Err(QueryError::UnexpectedCharacter {
                    character: c,
                    position: start,
                })
            }
        };

        if token.kind != TokenKind::Whitespace {
            self.previous = Some(token.clone());
        }
        Ok(Some(token))
    }

    /// Collects all tokens, whitespace included.
    pub fn tokenize(mut self) -> QueryResult<Vec<Token>> {
        let mut tokens = Vec::new();
        while let Some(token) = self.next_token()? {
            tokens.push(token);
        }
        Ok(tokens)
    }
}
