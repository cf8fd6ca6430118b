use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("jmx_builder=debug,jmxb=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let args = cli::RootArgs::parse();
    init_logging(args.verbose);
    match args.command {
        cli::Command::Compile(args) => commands::run_compile(args),
        cli::Command::Capabilities(args) => commands::run_capabilities(args),
        cli::Command::Inspect(args) => commands::run_inspect(args),
    }
}
