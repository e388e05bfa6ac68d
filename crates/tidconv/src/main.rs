use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Parser, ValueEnum};
use tidconv_core::config::{
    ConfigOverrides, ConvertConfig, DEFAULT_CONFIG_FILENAME, load_config, resolve_config,
};
use tidconv_core::convert::convert;
use tidconv_core::document::QuoteStyle;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

const CRITICAL_ERROR_MESSAGE: &str = "The script found a critical error and had to stop.";

#[derive(Debug, Parser)]
#[command(
    name = "tidconv",
    version,
    about = "Convert a TiddlyWiki JSON export into Markdown files with front matter"
)]
struct Cli {
    #[arg(short, long, help = "Print progress while converting")]
    verbose: bool,
    #[arg(
        short,
        long,
        value_name = "PATH",
        help = "Tiddler JSON export [default: tiddlers.json]"
    )]
    input: Option<PathBuf>,
    #[arg(
        short,
        long,
        value_name = "PATH",
        help = "Folder receiving the .md files [default: output]"
    )]
    output: Option<PathBuf>,
    #[arg(long, value_name = "PATH", help = "TOML config [default: ./tidconv.toml if present]")]
    config: Option<PathBuf>,
    #[arg(long, value_enum, help = "Quote character for front matter values")]
    quote: Option<QuoteArg>,
    #[arg(long, help = "Do not add an aliases entry for titles that are not valid file names")]
    no_aliases: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum QuoteArg {
    Single,
    Double,
}

impl From<QuoteArg> for QuoteStyle {
    fn from(value: QuoteArg) -> Self {
        match value {
            QuoteArg::Single => QuoteStyle::Single,
            QuoteArg::Double => QuoteStyle::Double,
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    dotenvy::dotenv().ok();

    let config = resolve_cli_config(&cli)?;
    init_tracing(config.verbose)?;

    println!("Processing tiddlers from: {}...", normalize_path(&config.input));
    let report = convert(&config).await.context(CRITICAL_ERROR_MESSAGE)?;
    for line in report.summary_lines(&config.output) {
        println!("{line}");
    }
    Ok(())
}

fn resolve_cli_config(cli: &Cli) -> Result<ConvertConfig> {
    let config_path = match &cli.config {
        Some(path) => {
            if !path.exists() {
                bail!("config file not found: {}", normalize_path(path));
            }
            path.clone()
        }
        None => PathBuf::from(DEFAULT_CONFIG_FILENAME),
    };
    let file = load_config(&config_path)?;
    let overrides = ConfigOverrides {
        input: cli.input.clone(),
        output: cli.output.clone(),
        verbose: cli.verbose,
        quote_style: cli.quote.map(QuoteStyle::from),
        no_aliases: cli.no_aliases,
    };
    Ok(resolve_config(&file, &overrides))
}

fn init_tracing(verbose: bool) -> Result<()> {
    let level = if verbose { "info" } else { "warn" };
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(format!("tidconv={level},tidconv_core={level}")))?;
    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stdout)
                .with_target(false)
                .without_time(),
        )
        .init();
    Ok(())
}

fn normalize_path(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}
