//! Config command implementation.
//!
//! View and manage configuration settings.
//! Config file is located at ~/.config/cq/config.toml.

use std::env;
use std::fs;
use std::path::PathBuf;

use directories::BaseDirs;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{CommandContext, CommandError, Result};

/// Current config file version. Increment when making breaking changes to schema.
const CONFIG_VERSION: u32 = 1;

/// Configuration file structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Config schema version for migrations.
    /// Defaults to current version when not present in file.
    #[serde(default = "default_version")]
    pub version: u32,

    /// Default schema file.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema: Option<PathBuf>,

    /// Default model.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    /// Date format for date literals.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_format: Option<String>,

    /// Maximum nesting depth of a query.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_depth: Option<usize>,

    /// Output settings.
    #[serde(default)]
    pub output: OutputConfig,
}

/// Returns the current config version (used by serde default).
fn default_version() -> u32 {
    CONFIG_VERSION
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            schema: None,
            model: None,
            date_format: None,
            max_depth: None,
            output: OutputConfig::default(),
        }
    }
}

/// Output configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Enable colors.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<bool>,
}

/// Gets the config file path.
///
/// `CQ_CONFIG` names the file directly. Otherwise the file lives in
/// `$XDG_CONFIG_HOME/cq/` or `~/.config/cq/`.
pub fn get_config_path() -> Result<PathBuf> {
    if let Ok(path) = env::var("CQ_CONFIG") {
        return Ok(PathBuf::from(path));
    }

    if let Ok(xdg_config) = env::var("XDG_CONFIG_HOME") {
        return Ok(PathBuf::from(xdg_config).join("cq").join("config.toml"));
    }

    BaseDirs::new()
        .map(|dirs| dirs.home_dir().join(".config").join("cq").join("config.toml"))
        .ok_or_else(|| CommandError::Config("Could not determine config directory".to_string()))
}

/// Loads the configuration from disk, or the defaults if there is no file.
pub fn load_config() -> Result<Config> {
    let path = get_config_path()?;

    if !path.exists() {
        debug!(path = %path.display(), "no config file, using defaults");
        return Ok(Config::default());
    }

    let content = fs::read_to_string(&path)
        .map_err(|e| CommandError::Config(format!("Failed to read config: {}", e)))?;

    let config: Config = toml::from_str(&content)
        .map_err(|e| CommandError::Config(format!("Failed to parse config: {}", e)))?;

    debug!(path = %path.display(), "loaded config");
    migrate_config(config)
}

/// Migrates config to current version if needed.
fn migrate_config(mut config: Config) -> Result<Config> {
    if config.version > CONFIG_VERSION {
        return Err(CommandError::Config(format!(
            "Config version {} is newer than supported version {}",
            config.version, CONFIG_VERSION
        )));
    }
    config.version = CONFIG_VERSION;
    Ok(config)
}

/// Saves the configuration to disk.
fn save_config(config: &Config) -> Result<()> {
    let path = get_config_path()?;

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| CommandError::Config(format!("Failed to create config directory: {}", e)))?;
    }

    let content = toml::to_string_pretty(config)
        .map_err(|e| CommandError::Config(format!("Failed to serialize config: {}", e)))?;

    fs::write(&path, content)
        .map_err(|e| CommandError::Config(format!("Failed to write config: {}", e)))?;

    Ok(())
}

/// Executes the config show command.
pub fn execute_show(ctx: &CommandContext) -> Result<()> {
    let config = load_config()?;
    let path = get_config_path()?;

    if ctx.json_output {
        let output = serde_json::json!({
            "path": path.display().to_string(),
            "exists": path.exists(),
            "config": config,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else if !ctx.quiet {
        use owo_colors::OwoColorize;

        let header = "Configuration";
        if ctx.use_colors {
            println!("{}\n", header.green().bold());
        } else {
            println!("{}\n", header);
        }

        println!("File: {}", path.display());
        println!("Exists: {}\n", path.exists());

        println!("Settings:");
        if let Some(ref schema) = config.schema {
            println!("  schema: {}", schema.display());
        }
        if let Some(ref model) = config.model {
            println!("  model: {}", model);
        }
        if let Some(ref format) = config.date_format {
            println!("  date_format: {}", format);
        }
        if let Some(depth) = config.max_depth {
            println!("  max_depth: {}", depth);
        }

        println!("\n[output]");
        if let Some(color) = config.output.color {
            println!("  color: {}", color);
        }
    }

    Ok(())
}

/// Options for the config set command.
pub struct ConfigSetOptions {
    /// Configuration key.
    pub key: String,
    /// Configuration value.
    pub value: String,
}

/// Executes the config set command.
pub fn execute_set(ctx: &CommandContext, opts: &ConfigSetOptions) -> Result<()> {
    let mut config = load_config()?;
    apply_setting(&mut config, &opts.key, &opts.value)?;
    save_config(&config)?;

    let path = get_config_path()?;
    if ctx.json_output {
        let output = serde_json::json!({
            "status": "success",
            "key": opts.key,
            "value": opts.value,
            "path": path.display().to_string(),
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else if !ctx.quiet {
        println!("Set {} = {}", opts.key, opts.value);
    }

    Ok(())
}

/// Writes one `key = value` setting into the config.
fn apply_setting(config: &mut Config, key: &str, value: &str) -> Result<()> {
    match key {
        "schema" => config.schema = Some(PathBuf::from(value)),
        "model" => config.model = Some(value.to_string()),
        "date_format" => {
            if value.trim().is_empty() {
                return Err(CommandError::Config("date_format cannot be empty".to_string()));
            }
            config.date_format = Some(value.to_string());
        }
        "max_depth" => {
            let depth = value.parse::<usize>().ok().filter(|d| *d > 0).ok_or_else(|| {
                CommandError::Config(format!(
                    "Invalid max_depth value '{}'. Use a positive integer",
                    value
                ))
            })?;
            config.max_depth = Some(depth);
        }
        "output.color" => config.output.color = Some(parse_bool(value)?),
        _ => {
            return Err(CommandError::Config(format!(
                "Unknown config key '{}'. Valid keys: schema, model, date_format, max_depth, output.color",
                key
            )));
        }
    }
    Ok(())
}

/// Executes the config path command.
pub fn execute_path(ctx: &CommandContext) -> Result<()> {
    let path = get_config_path()?;

    if ctx.json_output {
        let output = serde_json::json!({
            "path": path.display().to_string(),
            "exists": path.exists(),
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        println!("{}", path.display());
    }

    Ok(())
}

/// Parses a boolean value from string.
fn parse_bool(s: &str) -> Result<bool> {
    match s.to_lowercase().as_str() {
        "true" | "yes" | "1" | "on" => Ok(true),
        "false" | "no" | "0" | "off" => Ok(false),
        _ => Err(CommandError::Config(format!(
            "Invalid boolean value '{}'. Use true/false, yes/no, 1/0, or on/off",
            s
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use tempfile::TempDir;

    /// Points `CQ_CONFIG` at a file in a fresh temp dir for the duration of `f`.
    fn with_config_path<F: FnOnce(&std::path::Path)>(f: F) {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("cq").join("config.toml");

        let original = env::var("CQ_CONFIG").ok();
        env::set_var("CQ_CONFIG", &path);

        f(&path);

        match original {
            Some(val) => env::set_var("CQ_CONFIG", val),
            None => env::remove_var("CQ_CONFIG"),
        }
    }

    #[test]
    fn test_parse_bool_values() {
        assert!(parse_bool("true").unwrap());
        assert!(parse_bool("YES").unwrap());
        assert!(parse_bool("on").unwrap());
        assert!(!parse_bool("False").unwrap());
        assert!(!parse_bool("0").unwrap());
        assert!(parse_bool("maybe").is_err());
    }

    #[test]
    fn test_config_deserializes_all_fields() {
        let config: Config = toml::from_str(
            r#"
schema = "/tmp/schema.toml"
model = "Main"
date_format = "%d/%m/%Y"
max_depth = 16

[output]
color = false
"#,
        )
        .unwrap();

        assert_eq!(config.version, CONFIG_VERSION);
        assert_eq!(config.schema, Some(PathBuf::from("/tmp/schema.toml")));
        assert_eq!(config.model.as_deref(), Some("Main"));
        assert_eq!(config.date_format.as_deref(), Some("%d/%m/%Y"));
        assert_eq!(config.max_depth, Some(16));
        assert_eq!(config.output.color, Some(false));
    }

    #[test]
    fn test_migrate_rejects_future_version() {
        let config = Config {
            version: CONFIG_VERSION + 1,
            ..Config::default()
        };
        assert!(migrate_config(config).is_err());
    }

    #[test]
    fn test_apply_setting() {
        let mut config = Config::default();
        apply_setting(&mut config, "max_depth", "32").unwrap();
        apply_setting(&mut config, "output.color", "off").unwrap();
        apply_setting(&mut config, "model", "Main").unwrap();

        assert_eq!(config.max_depth, Some(32));
        assert_eq!(config.output.color, Some(false));
        assert_eq!(config.model.as_deref(), Some("Main"));

        assert!(apply_setting(&mut config, "max_depth", "0").is_err());
        assert!(apply_setting(&mut config, "max_depth", "deep").is_err());
        assert!(apply_setting(&mut config, "token", "x").is_err());
    }

    #[test]
    #[serial]
    fn test_config_path_env_override() {
        with_config_path(|path| {
            assert_eq!(get_config_path().unwrap(), path);
        });
    }

    #[test]
    #[serial]
    fn test_load_missing_config_uses_defaults() {
        with_config_path(|_| {
            let config = load_config().unwrap();
            assert_eq!(config.version, CONFIG_VERSION);
            assert!(config.schema.is_none());
            assert!(config.max_depth.is_none());
        });
    }

    #[test]
    #[serial]
    fn test_save_then_load() {
        with_config_path(|path| {
            let mut config = Config::default();
            apply_setting(&mut config, "date_format", "%d/%m/%Y").unwrap();
            apply_setting(&mut config, "schema", "models.toml").unwrap();
            save_config(&config).unwrap();

            assert!(path.exists());
            let loaded = load_config().unwrap();
            assert_eq!(loaded.date_format.as_deref(), Some("%d/%m/%Y"));
            assert_eq!(loaded.schema, Some(PathBuf::from("models.toml")));
        });
    }

    #[test]
    #[serial]
    fn test_load_invalid_config() {
        with_config_path(|path| {
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, "max_depth = \"deep\"").unwrap();
            assert!(matches!(load_config(), Err(CommandError::Config(_))));
        });
    }
}
