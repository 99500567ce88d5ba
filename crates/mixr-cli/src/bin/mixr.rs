#![allow(clippy::print_stderr)]

use anyhow::Result;
use clap::Parser;
use std::io::{IsTerminal, Write};

use mixr_cli::args::CliArgs;
use mixr_cli::{driver, tracing_config};

const EXIT_COMPOSITION_FAILED: i32 = 1;

fn main() -> Result<()> {
    // Only installs a subscriber when MIXR_LOG or RUST_LOG is set.
    tracing_config::init_tracing();

    let args = CliArgs::parse();
    let color = !args.no_color && std::io::stdout().is_terminal();
    let (rendered, reports) = driver::run(&args, color)?;

    let mut stdout = std::io::stdout().lock();
    writeln!(stdout, "{rendered}")?;
    stdout.flush()?;

    let failed = reports.iter().filter(|r| !r.is_success()).count();
    if failed > 0 {
        eprintln!("{failed} of {} contexts failed to compose", reports.len());
        std::process::exit(EXIT_COMPOSITION_FAILED);
    }
    Ok(())
}
