use anyhow::Result;
use clap::Parser;
use tracing::Level;

mod cli;

fn main() -> Result<()> {
    let cli = cli::Cli::parse();
    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        _ => Level::DEBUG,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
    cli::run(cli)
}
