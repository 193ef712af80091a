//! Abstract Syntax Tree (AST) for filter expressions.

use std::fmt;

use chrono::NaiveDate;
use serde::{Serialize, Serializer};

/// A field reference, possibly traversing relations.
///
/// Both `related.name` and `related__name` normalize to the same path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FieldPath {
    segments: Vec<String>,
}

impl FieldPath {
    /// Parses a dotted or double-underscore field path.
    pub fn parse(path: &str) -> Self {
        let segments = path
            .replace('.', "__")
            .split("__")
            .map(str::to_string)
            .collect();
        Self { segments }
    }

    /// Returns the path segments, relations first.
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Returns the last segment, the field on the final model.
    pub fn name(&self) -> &str {
        self.segments.last().map(String::as_str).unwrap_or_default()
    }

    /// Returns the path joined with double underscores (`related__name`).
    pub fn lookup_key(&self) -> String {
        self.segments.join("__")
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.segments.join("."))
    }
}

impl From<&str> for FieldPath {
    fn from(path: &str) -> Self {
        Self::parse(path)
    }
}

impl Serialize for FieldPath {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// A comparison operator of a predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PredicateOp {
    /// `=` (and, negated, `<>`, `!=`, `NOT`).
    Eq,
    /// `>`
    Gt,
    /// `>=`
    Gte,
    /// `<`
    Lt,
    /// `<=`
    Lte,
    /// `~`, case-insensitive containment.
    Contains,
}

impl PredicateOp {
    /// Returns the operator as written in a query.
    pub fn symbol(self) -> &'static str {
        match self {
            PredicateOp::Eq => "=",
            PredicateOp::Gt => ">",
            PredicateOp::Gte => ">=",
            PredicateOp::Lt => "<",
            PredicateOp::Lte => "<=",
            PredicateOp::Contains => "~",
        }
    }
}

/// An arithmetic operator between two fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ArithmeticOp {
    /// `+`
    Add,
    /// `-`
    Sub,
    /// `*`
    Mul,
    /// `/`
    Div,
}

impl ArithmeticOp {
    /// Parses an arithmetic operator symbol.
    pub fn from_symbol(symbol: &str) -> Option<Self> {
        match symbol {
            "+" => Some(ArithmeticOp::Add),
            "-" => Some(ArithmeticOp::Sub),
            "*" => Some(ArithmeticOp::Mul),
            "/" => Some(ArithmeticOp::Div),
            _ => None,
        }
    }

    /// Returns the operator that undoes this one.
    pub fn inverse(self) -> Self {
        match self {
            ArithmeticOp::Add => ArithmeticOp::Sub,
            ArithmeticOp::Sub => ArithmeticOp::Add,
            ArithmeticOp::Mul => ArithmeticOp::Div,
            ArithmeticOp::Div => ArithmeticOp::Mul,
        }
    }

    /// Returns the operator symbol.
    pub fn symbol(self) -> &'static str {
        match self {
            ArithmeticOp::Add => "+",
            ArithmeticOp::Sub => "-",
            ArithmeticOp::Mul => "*",
            ArithmeticOp::Div => "/",
        }
    }
}

/// A literal value coerced to the type of the field it is compared with.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TypedValue {
    /// A string.
    Text(String),
    /// A signed integer.
    Integer(i64),
    /// A floating point number.
    Float(f64),
    /// A calendar date.
    Date(NaiveDate),
}

impl fmt::Display for TypedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypedValue::Text(text) => write!(f, "{text:?}"),
            TypedValue::Integer(value) => write!(f, "{value}"),
            TypedValue::Float(value) => write!(f, "{value:?}"),
            TypedValue::Date(date) => write!(f, "{}", date.format("%Y-%m-%d")),
        }
    }
}

/// A deferred `constant op field` computation.
///
/// `a + b > 1` is rewritten to `a > 1 - b`: the comparison keeps the first
/// field as its subject and the right-hand side becomes
/// `ArithmeticRef { constant: 1, op: Sub, field: b }`. The expression is never
/// evaluated; the backend pushes it into its own expression language.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArithmeticRef {
    /// The literal from the query.
    pub constant: TypedValue,
    /// The inverse of the operator written in the query.
    pub op: ArithmeticOp,
    /// The second field of the arithmetic expression.
    pub field: FieldPath,
}

/// The right-hand side of a predicate.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PredicateValue {
    /// A plain literal.
    Literal(TypedValue),
    /// A literal combined with another field.
    Arithmetic(ArithmeticRef),
}

impl fmt::Display for PredicateValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PredicateValue::Literal(value) => write!(f, "{value}"),
            PredicateValue::Arithmetic(arithmetic) => write!(
                f,
                "({} {} {})",
                arithmetic.constant,
                arithmetic.op.symbol(),
                arithmetic.field
            ),
        }
    }
}

/// A parsed filter expression.
///
/// Trees compare structurally. `And` and `Or` keep the grouping the parser
/// produced, so `And(And(a, b), c)` and `And(a, And(b, c))` are different
/// trees.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterExpression {
    /// A single field comparison.
    Predicate {
        /// The compared field.
        field: FieldPath,
        /// The comparison operator.
        op: PredicateOp,
        /// The value compared against.
        value: PredicateValue,
        /// Whether the comparison is negated (`<>`, `!=`, `NOT`).
        negated: bool,
    },

    /// Membership in a list of values.
    In {
        /// The tested field.
        field: FieldPath,
        /// The candidate values, in query order.
        values: Vec<TypedValue>,
        /// Whether this is `NOT IN`.
        negated: bool,
    },

    /// A null check.
    IsNull {
        /// The tested field.
        field: FieldPath,
        /// `true` for `IS NULL`, `false` for `IS NOT NULL`.
        is_null: bool,
    },

    /// Logical AND of two expressions.
    And(Box<FilterExpression>, Box<FilterExpression>),

    /// Logical OR of two expressions.
    Or(Box<FilterExpression>, Box<FilterExpression>),

    /// A registered function call such as `cone(ra, dec, radius)`.
    ///
    /// Only the discriminator lives in the tree; the call's arguments are
    /// recorded in the parser's extra parameters.
    Extension {
        /// The extension name, lower case.
        name: String,
        /// `query` for the first call of this extension, then `query1`, ...
        tag: String,
    },
}

impl FilterExpression {
    /// Creates an AND expression from two expressions.
    ///
    /// # Example
    ///
    /// ```
    /// use customquery_rs::query::{FilterExpression, FieldPath};
    ///
    /// let a = FilterExpression::is_null("a".into(), true);
    /// let b = FilterExpression::is_null("b".into(), false);
    /// assert!(matches!(FilterExpression::and(a, b), FilterExpression::And(_, _)));
    /// ```
    pub fn and(left: FilterExpression, right: FilterExpression) -> Self {
        FilterExpression::And(Box::new(left), Box::new(right))
    }

    /// Creates an OR expression from two expressions.
    pub fn or(left: FilterExpression, right: FilterExpression) -> Self {
        FilterExpression::Or(Box::new(left), Box::new(right))
    }

    /// Creates a comparison against a literal.
    pub fn predicate(field: FieldPath, op: PredicateOp, value: TypedValue, negated: bool) -> Self {
        FilterExpression::Predicate {
            field,
            op,
            value: PredicateValue::Literal(value),
            negated,
        }
    }

    /// Creates a null check.
    pub fn is_null(field: FieldPath, is_null: bool) -> Self {
        FilterExpression::IsNull { field, is_null }
    }

    /// Returns the boolean key a backend filters on for an extension node
    /// (`cone_query`, `cone_query1`, ...), or None for other nodes.
    pub fn extension_key(&self) -> Option<String> {
        match self {
            FilterExpression::Extension { name, tag } => Some(format!("{name}_{tag}")),
            _ => None,
        }
    }
}

impl fmt::Display for FilterExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterExpression::Predicate {
                field,
                op: PredicateOp::Eq,
                value,
                negated: true,
            } => write!(f, "{field} != {value}"),
            FilterExpression::Predicate {
                field,
                op,
                value,
                negated,
            } => {
                if *negated {
                    write!(f, "NOT ({field} {} {value})", op.symbol())
                } else {
                    write!(f, "{field} {} {value}", op.symbol())
                }
            }
            FilterExpression::In {
                field,
                values,
                negated,
            } => {
                let keyword = if *negated { "NOT IN" } else { "IN" };
                let values: Vec<String> = values.iter().map(ToString::to_string).collect();
                write!(f, "{field} {keyword} ({})", values.join(", "))
            }
            FilterExpression::IsNull { field, is_null } => {
                if *is_null {
                    write!(f, "{field} IS NULL")
                } else {
                    write!(f, "{field} IS NOT NULL")
                }
            }
            FilterExpression::And(left, right) => write!(f, "({left} AND {right})"),
            FilterExpression::Or(left, right) => write!(f, "({left} OR {right})"),
            FilterExpression::Extension { name, tag } => write!(f, "{name}_{tag}"),
        }
    }
}
