use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// CLI arguments for the mixr binary.
#[derive(Parser, Debug)]
#[command(
    name = "mixr",
    version,
    about = "Resolve mixin compositions described by a JSON manifest"
)]
pub struct CliArgs {
    /// Path to the manifest (type universe plus contexts).
    #[arg(default_value = "mixr.json")]
    pub manifest: PathBuf,

    /// Only build the named contexts. May be repeated.
    #[arg(short = 'c', long = "context")]
    pub contexts: Vec<String>,

    /// Report format.
    #[arg(short = 'f', long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    /// Pretty-print JSON output.
    #[arg(long)]
    pub pretty: bool,

    /// Disable structural binding, overriding the manifest options.
    #[arg(long = "no-structural")]
    pub no_structural: bool,

    /// Never colorize text output.
    #[arg(long = "no-color")]
    pub no_color: bool,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}
