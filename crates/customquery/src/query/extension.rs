//! Function-call extensions and the parameters they record.
//!
//! An extension turns a call such as `cone(120.3, 23, 1.0)` into a boolean
//! discriminator node in the expression tree. The numeric arguments do not
//! belong in the tree; they are recorded as an [`ExtraParam`] so the caller
//! can annotate its data source before filtering on the discriminator.

use serde::Serialize;

use super::error::{QueryError, QueryResult};
use super::grouping::TokenTree;
use super::lexer::TokenKind;

/// Declaration of a function the parser accepts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtensionSpec {
    name: String,
    parameters: Vec<String>,
}

impl ExtensionSpec {
    /// Declares an extension with named numeric parameters.
    pub fn new(name: &str, parameters: &[&str]) -> Self {
        Self {
            name: name.to_lowercase(),
            parameters: parameters.iter().map(|p| p.to_string()).collect(),
        }
    }

    /// The cone search `cone(ra, dec, radius)`.
    pub fn cone() -> Self {
        Self::new("cone", &["ra", "dec", "radius"])
    }

    /// Returns the lower-case function name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the parameter names in call order.
    pub fn parameters(&self) -> &[String] {
        &self.parameters
    }

    /// Returns the number of arguments the function takes.
    pub fn arity(&self) -> usize {
        self.parameters.len()
    }

    /// Reads the call arguments into a parameter record.
    ///
    /// Commas and whitespace between arguments are skipped; every remaining
    /// token must be a numeric literal.
    pub fn bind(&self, arguments: &[TokenTree]) -> QueryResult<ExtraParam> {
        let values: Vec<&TokenTree> = arguments
            .iter()
            .filter(|t| !t.is_whitespace() && !t.is_kind(TokenKind::Punctuation))
            .collect();

        let invalid = || QueryError::InvalidExtensionArguments {
            name: self.name.clone(),
            expected: self.arity(),
            found: values.len(),
        };

        if values.len() != self.arity() {
            return Err(invalid());
        }

        let arguments = self
            .parameters
            .iter()
            .zip(&values)
            .map(|(name, tree)| {
                let token = tree
                    .as_token()
                    .filter(|t| matches!(t.kind, TokenKind::Integer | TokenKind::Float))
                    .ok_or_else(invalid)?;
                let value = token.text.parse::<f64>().map_err(|_| invalid())?;
                Ok(Argument {
                    name: name.clone(),
                    value,
                })
            })
            .collect::<QueryResult<Vec<_>>>()?;

        Ok(ExtraParam {
            extension: self.name.clone(),
            arguments,
        })
    }
}

/// The set of functions a parser accepts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtensionRegistry {
    specs: Vec<ExtensionSpec>,
}

impl Default for ExtensionRegistry {
    /// A registry holding the cone search.
    fn default() -> Self {
        Self {
            specs: vec![ExtensionSpec::cone()],
        }
    }
}

impl ExtensionRegistry {
    /// Creates a registry without any extension.
    pub fn empty() -> Self {
        Self { specs: Vec::new() }
    }

    /// Registers an extension, replacing one with the same name.
    pub fn register(&mut self, spec: ExtensionSpec) {
        self.specs.retain(|s| s.name != spec.name);
        self.specs.push(spec);
    }

    /// Finds an extension by name, ignoring case.
    pub fn find(&self, name: &str) -> Option<&ExtensionSpec> {
        let name = name.to_lowercase();
        self.specs.iter().find(|s| s.name == name)
    }

    /// Iterates over the registered extensions.
    pub fn iter(&self) -> impl Iterator<Item = &ExtensionSpec> {
        self.specs.iter()
    }
}

/// One named argument of an extension call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Argument {
    /// The parameter name.
    pub name: String,
    /// The argument value.
    pub value: f64,
}

/// The arguments of one extension call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExtraParam {
    /// The extension name.
    pub extension: String,
    /// Arguments in call order.
    pub arguments: Vec<Argument>,
}

impl ExtraParam {
    /// Returns the value of the named argument.
    pub fn get(&self, name: &str) -> Option<f64> {
        self.arguments
            .iter()
            .find(|a| a.name == name)
            .map(|a| a.value)
    }
}

/// Extension parameters accumulated by a parser, in encounter order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ExtraParams(Vec<ExtraParam>);

impl ExtraParams {
    /// Creates an empty accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a record.
    pub fn push(&mut self, param: ExtraParam) {
        self.0.push(param);
    }

    /// Returns the number of records.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the record at `index`.
    pub fn get(&self, index: usize) -> Option<&ExtraParam> {
        self.0.get(index)
    }

    /// Iterates over records in encounter order.
    pub fn iter(&self) -> std::slice::Iter<'_, ExtraParam> {
        self.0.iter()
    }

    /// Iterates over the records of one extension.
    pub fn for_extension<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a ExtraParam> {
        self.0.iter().filter(move |p| p.extension == name)
    }

    /// Counts the records of one extension.
    pub fn count_for(&self, name: &str) -> usize {
        self.for_extension(name).count()
    }

    /// Removes all records.
    pub fn clear(&mut self) {
        self.0.clear();
    }
}

impl Extend<ExtraParam> for ExtraParams {
    fn extend<I: IntoIterator<Item = ExtraParam>>(&mut self, iter: I) {
        self.0.extend(iter);
    }
}

impl<'a> IntoIterator for &'a ExtraParams {
    type Item = &'a ExtraParam;
    type IntoIter = std::slice::Iter<'a, ExtraParam>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Returns the discriminator tag of the `index`-th call (0-based) of an
/// extension: `query`, `query1`, `query2`, ...
pub fn discriminator_tag(index: usize) -> String {
    if index == 0 {
        "query".to_string()
    } else {
        format!("query{index}")
    }
}
