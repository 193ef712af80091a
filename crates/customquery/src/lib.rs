//! Parser for SQL-like filter conditions over a relational schema.
//!
//! [`query::QueryParser`] turns text such as
//! `numfield > 10 and related.name in ('a', 'b')` into a
//! [`query::FilterExpression`] tree, checking every field against a
//! [`schema::FieldResolver`]. Function calls such as `cone(ra, dec, radius)`
//! become discriminator nodes whose arguments are collected separately.
//!
//! ```
//! use customquery_rs::query::QueryParser;
//! use customquery_rs::schema::{FieldKind, Model, Schema};
//!
//! let schema = Schema::new().model(
//!     "Main",
//!     Model::new()
//!         .field("numfield", FieldKind::Integer)
//!         .field("charfield", FieldKind::Text),
//! );
//! let target = schema.target("Main").unwrap();
//!
//! let parsed = QueryParser::new()
//!     .parse(&target, "numfield >= 10 or charfield = 'abc'")
//!     .unwrap();
//! assert_eq!(parsed.filter.to_string(), "(numfield >= 10 OR charfield = \"abc\")");
//! ```

pub mod query;
pub mod schema;
