//! CLI argument parsing using clap derive macros.
//!
//! This module defines the command-line interface for the cq CLI.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// cq - Parse SQL-like filter conditions against a schema
#[derive(Parser, Debug)]
#[command(name = "cq")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbose output (show debug information)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Quiet mode (errors only)
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Output JSON instead of text
    #[arg(long, global = true)]
    pub json: bool,

    /// Disable colors in output
    #[arg(long, global = true)]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Parse one or more queries and print the filter expressions
    #[command(alias = "p")]
    Parse {
        /// Queries to parse, in order; extension tags continue across them
        #[arg(required = true)]
        queries: Vec<String>,

        /// Schema file (TOML)
        #[arg(short, long, env = "CQ_SCHEMA")]
        schema: Option<PathBuf>,

        /// Model the query filters (default: the only model in the schema)
        #[arg(short, long)]
        model: Option<String>,

        /// Declare a computed field (repeatable)
        #[arg(short, long = "annotate", action = clap::ArgAction::Append)]
        annotations: Vec<String>,

        /// Date format for date literals (chrono syntax, e.g. "%d/%m/%Y")
        #[arg(short, long)]
        date_format: Option<String>,

        /// Maximum nesting depth
        #[arg(long)]
        max_depth: Option<usize>,
    },

    /// List the fields of a model
    #[command(alias = "f")]
    Fields {
        /// Schema file (TOML)
        #[arg(short, long, env = "CQ_SCHEMA")]
        schema: Option<PathBuf>,

        /// Model to list (default: every model)
        #[arg(short, long)]
        model: Option<String>,
    },

    /// View and manage configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
}

/// Config subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show current configuration
    Show,

    /// Set a configuration value
    Set {
        /// Configuration key (e.g. date_format, output.color)
        key: String,

        /// Value to set
        value: String,
    },

    /// Print the config file path
    Path,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_command() {
        let cli = Cli::try_parse_from([
            "cq",
            "parse",
            "numfield > 1",
            "cone(1, 2, 3)",
            "--schema",
            "schema.toml",
            "-m",
            "Main",
            "-a",
            "full_name",
            "-a",
            "age",
            "--date-format",
            "%d/%m/%Y",
        ])
        .unwrap();

        match cli.command {
            Commands::Parse {
                queries,
                schema,
                model,
                annotations,
                date_format,
                max_depth,
            } => {
                assert_eq!(queries, vec!["numfield > 1", "cone(1, 2, 3)"]);
                assert_eq!(schema, Some(PathBuf::from("schema.toml")));
                assert_eq!(model.as_deref(), Some("Main"));
                assert_eq!(annotations, vec!["full_name", "age"]);
                assert_eq!(date_format.as_deref(), Some("%d/%m/%Y"));
                assert_eq!(max_depth, None);
            }
            other => panic!("expected parse command, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_requires_query() {
        assert!(Cli::try_parse_from(["cq", "parse"]).is_err());
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["cq", "fields", "--json", "--no-color"]).unwrap();
        assert!(cli.json);
        assert!(cli.no_color);
        assert!(matches!(cli.command, Commands::Fields { .. }));
    }

    #[test]
    fn test_quiet_conflicts_with_verbose() {
        assert!(Cli::try_parse_from(["cq", "-q", "-v", "config"]).is_err());
    }

    #[test]
    fn test_config_set() {
        let cli = Cli::try_parse_from(["cq", "config", "set", "max_depth", "32"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Config {
                command: Some(ConfigCommands::Set { ref key, ref value })
            } if key == "max_depth" && value == "32"
        ));
    }
}
