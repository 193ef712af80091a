//! Fields command implementation.

use std::path::PathBuf;

use customquery_rs::schema::{Model, SchemaError};

use super::config::load_config;
use super::{load_schema, CommandContext, Result};
use crate::output::{format_fields_json, format_fields_table};

/// Options for the fields command.
#[derive(Debug)]
pub struct FieldsOptions {
    /// Schema file, overriding the config.
    pub schema: Option<PathBuf>,
    /// Model to list; every model when absent.
    pub model: Option<String>,
}

/// Executes the fields command.
pub fn execute(ctx: &CommandContext, opts: &FieldsOptions) -> Result<()> {
    let config = load_config()?;
    let schema = load_schema(opts.schema.as_deref(), &config)?;

    let models: Vec<(&str, &Model)> = match opts.model.as_deref() {
        Some(name) => {
            let model = schema
                .get(name)
                .ok_or_else(|| SchemaError::UnknownModel(name.to_string()))?;
            vec![(name, model)]
        }
        None => schema
            .model_names()
            .filter_map(|name| schema.get(name).map(|model| (name, model)))
            .collect(),
    };

    if ctx.json_output {
        println!("{}", format_fields_json(&models)?);
    } else if !ctx.quiet {
        print!("{}", format_fields_table(&models, ctx.use_colors));
    }

    Ok(())
}
