//! Parse command implementation.
//!
//! Parses queries against a schema model and prints the resulting filters.

use std::path::PathBuf;

use customquery_rs::query::{ParserOptions, QueryParser};
use tracing::{debug, info};

use super::config::{load_config, Config};
use super::{load_schema, resolve_model, CommandContext, Result};
use crate::output::{format_parsed_json, format_parsed_text, ParsedEntry};

/// Options for the parse command.
#[derive(Debug)]
pub struct ParseOptions {
    /// Queries to parse, in order.
    pub queries: Vec<String>,
    /// Schema file, overriding the config.
    pub schema: Option<PathBuf>,
    /// Model name, overriding the config.
    pub model: Option<String>,
    /// Computed fields to declare on the model.
    pub annotations: Vec<String>,
    /// Date format, overriding the config.
    pub date_format: Option<String>,
    /// Maximum nesting depth, overriding the config.
    pub max_depth: Option<usize>,
}

/// Executes the parse command.
///
/// All queries go through one parser, so extension tags keep counting from
/// one query to the next.
pub fn execute(ctx: &CommandContext, opts: &ParseOptions) -> Result<()> {
    let config = load_config()?;
    let schema = load_schema(opts.schema.as_deref(), &config)?;
    let model = resolve_model(&schema, opts.model.as_deref(), &config)?;

    let target = opts
        .annotations
        .iter()
        .fold(schema.target(&model)?, |target, name| target.with_annotation(name));

    let mut parser = QueryParser::with_options(parser_options(opts, &config));
    debug!(model = %model, options = ?parser.options(), "parsing queries");

    let mut entries = Vec::with_capacity(opts.queries.len());
    for query in &opts.queries {
        let parsed = parser.parse(&target, query)?;
        info!(query = %query, "parsed");
        entries.push(ParsedEntry {
            query: query.clone(),
            filter: parsed.filter,
        });
    }

    if ctx.json_output {
        println!(
            "{}",
            format_parsed_json(&model, &entries, parser.extra_params())?
        );
    } else if !ctx.quiet {
        if ctx.verbose {
            let options = parser.options();
            println!("Model: {model}");
            println!("  Date format: {}", options.date_format);
            println!("  Max depth: {}\n", options.max_depth);
        }
        print!(
            "{}",
            format_parsed_text(&entries, parser.extra_params(), ctx.use_colors)
        );
    }

    Ok(())
}

/// Merges command-line overrides with config values and defaults.
fn parser_options(opts: &ParseOptions, config: &Config) -> ParserOptions {
    let defaults = ParserOptions::default();
    ParserOptions {
        date_format: opts
            .date_format
            .clone()
            .or_else(|| config.date_format.clone())
            .unwrap_or(defaults.date_format),
        max_depth: opts
            .max_depth
            .or(config.max_depth)
            .unwrap_or(defaults.max_depth),
    }
}
