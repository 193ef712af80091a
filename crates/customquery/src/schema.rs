//! Schema description and field resolution.
//!
//! The parser validates every field it meets through the [`FieldResolver`]
//! trait. [`QueryTarget`] implements it over an in-memory [`Schema`], which
//! can be built in code or loaded from TOML:
//!
//! ```toml
//! [models.Observation]
//! name = "text"
//! magnitude = "float"
//! observed = "date"
//! telescope = { relation = "Telescope" }
//!
//! [models.Telescope]
//! name = "text"
//! aperture = "integer"
//! ```

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use strsim::levenshtein;
use thiserror::Error;

use crate::query::{FieldPath, QueryError, QueryResult};

/// Maximum edit distance for suggesting a similar field name.
const MAX_SUGGESTION_DISTANCE: usize = 3;

/// The semantic type of a field.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    /// Character data.
    Text,
    /// Whole numbers.
    Integer,
    /// Floating point numbers.
    Float,
    /// Calendar dates, parsed with the parser's date format.
    Date,
    /// A foreign key to the named model.
    Relation(String),
    /// A computed field known only by name. Literals compared with it keep
    /// the type their token suggests.
    #[serde(skip_deserializing)]
    Annotated,
}

/// A resolved field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDescriptor {
    /// The normalized path that was resolved.
    pub path: FieldPath,
    /// The field's semantic type.
    pub kind: FieldKind,
}

/// Resolves field paths against a query target.
pub trait FieldResolver {
    /// Resolves a field path.
    ///
    /// # Errors
    ///
    /// Returns `QueryError::UnknownField` if any segment of the path does not
    /// exist or an intermediate segment is not a relation.
    fn resolve_field(&self, path: &FieldPath) -> QueryResult<FieldDescriptor>;
}

/// Errors raised while loading or querying a schema.
#[derive(Debug, Error)]
pub enum SchemaError {
    /// The schema file could not be read.
    #[error("failed to read schema: {0}")]
    Io(#[from] std::io::Error),

    /// The schema file is not valid TOML or has an unexpected shape.
    #[error("failed to parse schema: {0}")]
    Toml(#[from] toml::de::Error),

    /// A relation points at a model the schema does not define.
    #[error("field '{model}.{field}' relates to unknown model '{target}'")]
    UnknownRelation {
        /// Model declaring the relation.
        model: String,
        /// Relation field.
        field: String,
        /// The missing model.
        target: String,
    },

    /// The requested model does not exist.
    #[error("unknown model: {0}")]
    UnknownModel(String),
}

/// The fields of one model.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Model {
    fields: BTreeMap<String, FieldKind>,
}

impl Model {
    /// Creates a model without fields.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a field, builder style.
    pub fn field(mut self, name: impl Into<String>, kind: FieldKind) -> Self {
        self.fields.insert(name.into(), kind);
        self
    }

    /// Looks up a field by name.
    pub fn get(&self, name: &str) -> Option<&FieldKind> {
        self.fields.get(name)
    }

    /// Iterates over fields in name order.
    pub fn fields(&self) -> impl Iterator<Item = (&str, &FieldKind)> {
        self.fields.iter().map(|(name, kind)| (name.as_str(), kind))
    }
}

/// A set of named models.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schema {
    #[serde(default)]
    models: BTreeMap<String, Model>,
}

impl Schema {
    /// Creates an empty schema.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a model, builder style.
    pub fn model(mut self, name: impl Into<String>, model: Model) -> Self {
        self.models.insert(name.into(), model);
        self
    }

    /// Parses a schema from TOML and checks that every relation resolves.
    pub fn from_toml_str(content: &str) -> Result<Self, SchemaError> {
        let schema: Schema = toml::from_str(content)?;
        schema.validate()?;
        Ok(schema)
    }

    /// Loads a schema from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SchemaError> {
        let content = fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Checks that every relation points at a defined model.
    pub fn validate(&self) -> Result<(), SchemaError> {
        for (model_name, model) in &self.models {
            for (field, kind) in model.fields() {
                if let FieldKind::Relation(target) = kind {
                    if !self.models.contains_key(target) {
                        return Err(SchemaError::UnknownRelation {
                            model: model_name.clone(),
                            field: field.to_string(),
                            target: target.clone(),
                        });
                    }
                }
            }
        }
        Ok(())
    }

    /// Looks up a model by name.
    pub fn get(&self, name: &str) -> Option<&Model> {
        self.models.get(name)
    }

    /// Iterates over model names in order.
    pub fn model_names(&self) -> impl Iterator<Item = &str> {
        self.models.keys().map(String::as_str)
    }

    /// Creates a query target rooted at the named model.
    pub fn target(&self, model: &str) -> Result<QueryTarget<'_>, SchemaError> {
        QueryTarget::new(self, model)
    }
}

/// A root model plus the annotated (computed) fields available on it.
#[derive(Debug, Clone)]
pub struct QueryTarget<'a> {
    schema: &'a Schema,
    model: String,
    annotations: BTreeSet<String>,
}

impl<'a> QueryTarget<'a> {
    /// Creates a target for the named model.
    pub fn new(schema: &'a Schema, model: &str) -> Result<Self, SchemaError> {
        if schema.get(model).is_none() {
            return Err(SchemaError::UnknownModel(model.to_string()));
        }
        Ok(Self {
            schema,
            model: model.to_string(),
            annotations: BTreeSet::new(),
        })
    }

    /// Declares a computed field. Paths are normalized, so `a.b` and `a__b`
    /// name the same annotation.
    pub fn with_annotation(mut self, name: &str) -> Self {
        self.annotations.insert(FieldPath::parse(name).lookup_key());
        self
    }

    /// Returns the root model name.
    pub fn model_name(&self) -> &str {
        &self.model
    }

    /// Returns true if the name is a declared annotation.
    pub fn is_annotated(&self, path: &FieldPath) -> bool {
        self.annotations.contains(&path.lookup_key())
    }
}

impl FieldResolver for QueryTarget<'_> {
    fn resolve_field(&self, path: &FieldPath) -> QueryResult<FieldDescriptor> {
        if self.is_annotated(path) {
            return Ok(FieldDescriptor {
                path: path.clone(),
                kind: FieldKind::Annotated,
            });
        }

        let unknown = || QueryError::unknown_field(path.to_string());
        let mut model = self.schema.get(&self.model).ok_or_else(unknown)?;
        let (last, relations) = path.segments().split_last().ok_or_else(unknown)?;

        for segment in relations {
            match model.get(segment) {
                Some(FieldKind::Relation(target)) => {
                    model = self.schema.get(target).ok_or_else(unknown)?;
                }
                _ => return Err(unknown()),
            }
        }

        match model.get(last) {
            Some(kind) => Ok(FieldDescriptor {
                path: path.clone(),
                kind: kind.clone(),
            }),
            None => {
                let mut candidates: Vec<&str> = model.fields().map(|(name, _)| name).collect();
                if relations.is_empty() {
                    candidates.extend(self.annotations.iter().map(String::as_str));
                }
                Err(QueryError::UnknownField {
                    field: path.to_string(),
                    suggestion: find_similar_name(last, candidates.into_iter()),
                })
            }
        }
    }
}

/// Finds the candidate closest to `query` by edit distance, if close enough.
fn find_similar_name<'a>(query: &str, candidates: impl Iterator<Item = &'a str>) -> Option<String> {
    let query_lower = query.to_lowercase();

    let (best_match, best_distance) = candidates
        .filter(|name| !name.is_empty())
        .map(|name| (name.to_string(), levenshtein(&query_lower, &name.to_lowercase())))
        .min_by_key(|(_, d)| *d)?;

    if best_distance > 0 && best_distance <= MAX_SUGGESTION_DISTANCE {
        Some(best_match)
    } else {
        None
    }
}
