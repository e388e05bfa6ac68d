use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::document::{QuoteStyle, RenderOptions};

pub const DEFAULT_INPUT: &str = "tiddlers.json";
pub const DEFAULT_OUTPUT: &str = "output";
pub const DEFAULT_CONFIG_FILENAME: &str = "tidconv.toml";

pub const ENV_INPUT: &str = "TIDCONV_INPUT";
pub const ENV_OUTPUT: &str = "TIDCONV_OUTPUT";
pub const ENV_VERBOSE: &str = "TIDCONV_VERBOSE";

#[derive(Debug, Clone, Deserialize, Default, PartialEq, Eq)]
pub struct FileConfig {
    #[serde(default)]
    pub convert: ConvertSection,
}

#[derive(Debug, Clone, Deserialize, Default, PartialEq, Eq)]
pub struct ConvertSection {
    pub input: Option<String>,
    pub output: Option<String>,
    pub verbose: Option<bool>,
    pub quote_style: Option<QuoteStyle>,
    pub aliases: Option<bool>,
    pub allow_duplicate_tags: Option<bool>,
}

/// Values given on the command line. `None`/`false` means "not given".
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub input: Option<PathBuf>,
    pub output: Option<PathBuf>,
    pub verbose: bool,
    pub quote_style: Option<QuoteStyle>,
    pub no_aliases: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConvertConfig {
    pub input: PathBuf,
    pub output: PathBuf,
    pub verbose: bool,
    pub render: RenderOptions,
}

/// Load and parse a FileConfig from a TOML file. Returns default if file doesn't exist.
pub fn load_config(config_path: &Path) -> Result<FileConfig> {
    if !config_path.exists() {
        return Ok(FileConfig::default());
    }
    let content = fs::read_to_string(config_path)
        .with_context(|| format!("failed to read {}", config_path.display()))?;
    let parsed: FileConfig = toml::from_str(&content)
        .with_context(|| format!("failed to parse {}", config_path.display()))?;
    Ok(parsed)
}

/// Resolve the effective settings: flag > env > config file > default.
pub fn resolve_config(file: &FileConfig, overrides: &ConfigOverrides) -> ConvertConfig {
    resolve_with_env(file, overrides, |key| env::var(key).ok())
}

pub fn resolve_with_env(
    file: &FileConfig,
    overrides: &ConfigOverrides,
    lookup: impl Fn(&str) -> Option<String>,
) -> ConvertConfig {
    let section = &file.convert;
    let env_value = |key: &str| {
        lookup(key)
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
    };

    let input = overrides
        .input
        .clone()
        .or_else(|| env_value(ENV_INPUT).map(PathBuf::from))
        .or_else(|| section.input.as_ref().map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_INPUT));
    let output = overrides
        .output
        .clone()
        .or_else(|| env_value(ENV_OUTPUT).map(PathBuf::from))
        .or_else(|| section.output.as_ref().map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT));
    let verbose = overrides.verbose
        || env_value(ENV_VERBOSE)
            .map(|value| parse_flag(&value))
            .or(section.verbose)
            .unwrap_or(false);

    let defaults = RenderOptions::default();
    let render = RenderOptions {
        quote_style: overrides
            .quote_style
            .or(section.quote_style)
            .unwrap_or(defaults.quote_style),
        emit_aliases: !overrides.no_aliases && section.aliases.unwrap_or(defaults.emit_aliases),
        allow_duplicate_tags: section
            .allow_duplicate_tags
            .unwrap_or(defaults.allow_duplicate_tags),
    };

    ConvertConfig {
        input,
        output,
        verbose,
        render,
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}
