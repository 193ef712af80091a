use clap::Parser;
use std::process::ExitCode;
use tracing::debug;
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;
mod output;

use cli::{Cli, Commands, ConfigCommands};
use commands::config::{self, load_config, Config, ConfigSetOptions};
use commands::fields::FieldsOptions;
use commands::parse::ParseOptions;
use commands::{CommandContext, CommandError};

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(&cli);

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            if cli.json {
                let error_json = serde_json::json!({
                    "error": {
                        "code": error_code(&e),
                        "message": e.to_string(),
                    }
                });
                eprintln!("{error_json:#}");
            } else {
                eprintln!("Error: {e}");
            }
            error_exit_code(&e)
        }
    }
}

/// Installs the stderr log subscriber.
///
/// `CQ_LOG` takes an `EnvFilter` directive; without it the level is `warn`,
/// or `debug` with `--verbose`.
fn init_logging(cli: &Cli) {
    let default = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "error"
    } else {
        "warn"
    };
    let filter = EnvFilter::try_from_env("CQ_LOG").unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: &Cli) -> commands::Result<()> {
    let file_config = load_config().unwrap_or_else(|e| {
        debug!(error = %e, "config unreadable, using default colors");
        Config::default()
    });
    let ctx = CommandContext::from_cli(cli, &file_config);

    match &cli.command {
        Commands::Parse {
            queries,
            schema,
            model,
            annotations,
            date_format,
            max_depth,
        } => commands::parse::execute(
            &ctx,
            &ParseOptions {
                queries: queries.clone(),
                schema: schema.clone(),
                model: model.clone(),
                annotations: annotations.clone(),
                date_format: date_format.clone(),
                max_depth: *max_depth,
            },
        ),
        Commands::Fields { schema, model } => commands::fields::execute(
            &ctx,
            &FieldsOptions {
                schema: schema.clone(),
                model: model.clone(),
            },
        ),
        Commands::Config { command } => match command {
            None | Some(ConfigCommands::Show) => config::execute_show(&ctx),
            Some(ConfigCommands::Path) => config::execute_path(&ctx),
            Some(ConfigCommands::Set { key, value }) => config::execute_set(
                &ctx,
                &ConfigSetOptions {
                    key: key.clone(),
                    value: value.clone(),
                },
            ),
        },
    }
}

/// Returns the error code string for JSON output.
fn error_code(e: &CommandError) -> &'static str {
    match e {
        CommandError::Query(_) => "QUERY_ERROR",
        CommandError::Schema(_) => "SCHEMA_ERROR",
        CommandError::Config(_) => "CONFIG_ERROR",
        CommandError::Io(_) => "IO_ERROR",
        CommandError::Json(_) => "JSON_ERROR",
    }
}

/// Returns the exit code for an error.
fn error_exit_code(e: &CommandError) -> ExitCode {
    match e {
        CommandError::Query(_) => ExitCode::from(1),
        CommandError::Json(_) => ExitCode::from(1),
        CommandError::Io(_) => ExitCode::from(3),
        CommandError::Schema(_) => ExitCode::from(4),
        CommandError::Config(_) => ExitCode::from(5),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use customquery_rs::query::QueryError;
    use customquery_rs::schema::SchemaError;

    #[test]
    fn test_error_codes() {
        assert_eq!(
            error_code(&CommandError::Query(QueryError::EmptyQuery)),
            "QUERY_ERROR"
        );
        assert_eq!(
            error_code(&CommandError::Schema(SchemaError::UnknownModel("X".to_string()))),
            "SCHEMA_ERROR"
        );
        assert_eq!(
            error_code(&CommandError::Config("bad".to_string())),
            "CONFIG_ERROR"
        );
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(
            error_exit_code(&CommandError::Query(QueryError::InvalidQuery)),
            ExitCode::from(1)
        );
        assert_eq!(
            error_exit_code(&CommandError::Schema(SchemaError::UnknownModel("X".to_string()))),
            ExitCode::from(4)
        );
        assert_eq!(
            error_exit_code(&CommandError::Config("bad".to_string())),
            ExitCode::from(5)
        );
    }

    #[test]
    fn test_query_error_message() {
        let err = CommandError::from(QueryError::unknown_operator("?"));
        assert_eq!(err.to_string(), "query error: operator '?' is invalid");
    }
}
