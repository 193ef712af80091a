//! Command implementations for the cq CLI.
//!
//! This module contains the actual command handlers that are invoked by the CLI.

pub mod config;
pub mod fields;
pub mod parse;

use std::path::Path;

use customquery_rs::query::QueryError;
use customquery_rs::schema::{Schema, SchemaError};
use tracing::debug;

use crate::cli::Cli;
use config::Config;

/// Error type for command execution.
#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    /// Query parsing error.
    #[error("query error: {0}")]
    Query(#[from] QueryError),

    /// Schema loading error.
    #[error("schema error: {0}")]
    Schema(#[from] SchemaError),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for command execution.
pub type Result<T> = std::result::Result<T, CommandError>;

/// Context for command execution, containing common dependencies.
pub struct CommandContext {
    /// Whether to output JSON.
    pub json_output: bool,
    /// Whether to use colors.
    pub use_colors: bool,
    /// Whether to be quiet (errors only).
    pub quiet: bool,
    /// Whether to be verbose.
    pub verbose: bool,
}

impl CommandContext {
    /// Creates a new command context from CLI arguments.
    ///
    /// Colors are off when `--no-color` is given, when `NO_COLOR` is set, or
    /// when the config file disables them.
    pub fn from_cli(cli: &Cli, config: &Config) -> Self {
        let no_color_env = std::env::var_os("NO_COLOR").is_some_and(|v| !v.is_empty());
        Self {
            json_output: cli.json,
            use_colors: !cli.no_color && !no_color_env && config.output.color.unwrap_or(true),
            quiet: cli.quiet,
            verbose: cli.verbose,
        }
    }
}

/// Loads the schema named on the command line, falling back to the config file.
pub(crate) fn load_schema(path: Option<&Path>, config: &Config) -> Result<Schema> {
    let path = path.or(config.schema.as_deref()).ok_or_else(|| {
        CommandError::Config(
            "No schema file given. Pass --schema, set CQ_SCHEMA or set 'schema' in the config file"
                .to_string(),
        )
    })?;

    debug!(path = %path.display(), "loading schema");
    Ok(Schema::load(path)?)
}

/// Picks the model to query.
///
/// An explicit name wins, then the config default. A schema with a single
/// model needs no name at all.
pub(crate) fn resolve_model(
    schema: &Schema,
    requested: Option<&str>,
    config: &Config,
) -> Result<String> {
    if let Some(name) = requested.or(config.model.as_deref()) {
        return Ok(name.to_string());
    }

    let names: Vec<&str> = schema.model_names().collect();
    match names.as_slice() {
        [only] => Ok(only.to_string()),
        [] => Err(CommandError::Config("Schema defines no models".to_string())),
        _ => Err(CommandError::Config(format!(
            "Schema defines several models ({}); choose one with --model",
            names.join(", ")
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use customquery_rs::schema::{FieldKind, Model};

    fn two_models() -> Schema {
        Schema::new()
            .model("A", Model::new().field("x", FieldKind::Integer))
            .model("B", Model::new().field("y", FieldKind::Text))
    }

    #[test]
    fn test_resolve_model_explicit() {
        let model = resolve_model(&two_models(), Some("B"), &Config::default()).unwrap();
        assert_eq!(model, "B");
    }

    #[test]
    fn test_resolve_model_from_config() {
        let config = Config {
            model: Some("A".to_string()),
            ..Config::default()
        };
        assert_eq!(resolve_model(&two_models(), None, &config).unwrap(), "A");
        assert_eq!(resolve_model(&two_models(), Some("B"), &config).unwrap(), "B");
    }

    #[test]
    fn test_resolve_single_model() {
        let schema = Schema::new().model("Only", Model::new());
        assert_eq!(resolve_model(&schema, None, &Config::default()).unwrap(), "Only");
    }

    #[test]
    fn test_resolve_model_ambiguous() {
        let err = resolve_model(&two_models(), None, &Config::default()).unwrap_err();
        assert!(err.to_string().contains("A, B"));
    }

    #[test]
    fn test_load_schema_without_path() {
        let err = load_schema(None, &Config::default()).unwrap_err();
        assert!(matches!(err, CommandError::Config(_)));
    }
}
