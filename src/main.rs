//! `paper-qa` binary entry point.

use clap::Parser;
use tracing_subscriber::EnvFilter;

use paper_qa::cli::{Cli, execute};

#[allow(clippy::print_stdout)]
fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // RUST_LOG wins; otherwise -v turns on debug for this crate.
    let default_filter = if cli.verbose {
        "paper_qa=debug"
    } else {
        "paper_qa=info"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let output = execute(&cli)?;
    print!("{output}");
    Ok(())
}
