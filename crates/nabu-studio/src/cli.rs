//! Command-line arguments.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use nabu_engine::ThemeMode;

#[derive(Parser)]
#[command(name = "nabu-studio", version, about = "Inspect and run Nabu microapps from the terminal")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Log filter in `env_logger` syntax; overrides RUST_LOG.
    #[arg(long = "log", value_name = "FILTER", global = true)]
    pub log_filter: Option<String>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Parse a microapp directory and report what was found.
    Parse(ParseArgs),

    /// Resolve one value expression against the given variables.
    Resolve(ResolveArgs),

    /// Start a session and replay a JSON list of actions against it.
    Run(RunArgs),
}

#[derive(Parser)]
pub struct ParseArgs {
    /// Directory holding microapp.xml, styles.xml, queries.xml and screens/.
    #[arg(value_name = "DIR")]
    pub dir: PathBuf,

    /// Print the parsed document as JSON.
    #[arg(long)]
    pub json: bool,
}

#[derive(Parser)]
pub struct ResolveArgs {
    /// Expression, e.g. `*if(@{shop.count} > 0)*then(items)*else(empty)`.
    #[arg(value_name = "EXPR")]
    pub expr: String,

    /// Variable as `key=value`; `scope.name` keys are microapp variables.
    #[arg(long = "var", value_name = "KEY=VALUE", value_parser = parse_var)]
    pub vars: Vec<(String, String)>,
}

#[derive(Parser)]
pub struct RunArgs {
    #[arg(value_name = "DIR")]
    pub dir: PathBuf,

    /// JSON array of actions, e.g. `[{"type": "openScreen", "screenCode": "detail"}]`.
    #[arg(long, value_name = "FILE")]
    pub script: Option<PathBuf>,

    /// Screen to start on; defaults to the first screen.
    #[arg(long = "initial", value_name = "SCREEN")]
    pub initial_screen: Option<String>,

    #[arg(long, value_enum, default_value = "light")]
    pub theme: ThemeArg,

    /// Variable set before the first action, as `key=value`.
    #[arg(long = "var", value_name = "KEY=VALUE", value_parser = parse_var)]
    pub vars: Vec<(String, String)>,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum ThemeArg {
    Light,
    Dark,
}

impl From<ThemeArg> for ThemeMode {
    fn from(arg: ThemeArg) -> Self {
        match arg {
            ThemeArg::Light => ThemeMode::Light,
            ThemeArg::Dark => ThemeMode::Dark,
        }
    }
}

fn parse_var(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!("expected KEY=VALUE, got `{raw}`")),
    }
}
