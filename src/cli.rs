//! CLI argument parsing for the test-plan compiler.
//!
//! Argument types only; command bodies live in `commands`.
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Root CLI entrypoint.
#[derive(Parser, Debug)]
#[command(
    name = "jmxb",
    version,
    about = "Compile load-test scenarios into JMeter test plans",
    after_help = "Examples:\n  jmxb compile --scenario blazedemo.json --out plan.jmx --jmeter-version 2.13\n  jmxb capabilities --jmeter-version 3.3 --json\n  jmxb inspect --jmx plan.jmx",
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct RootArgs {
    /// Log compiler decisions to stderr
    #[arg(long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    Compile(CompileArgs),
    Capabilities(CapabilitiesArgs),
    Inspect(InspectArgs),
}

/// Compile command inputs.
#[derive(Parser, Debug)]
#[command(about = "Compile a merged scenario into a .jmx test plan")]
pub struct CompileArgs {
    /// Merged scenario JSON
    #[arg(long, value_name = "FILE")]
    pub scenario: PathBuf,

    /// Destination .jmx file (replaced if it exists)
    #[arg(long, value_name = "FILE")]
    pub out: PathBuf,

    /// Target JMeter release (overrides the settings file)
    #[arg(long, value_name = "VERSION")]
    pub jmeter_version: Option<String>,

    /// Optional settings JSON
    #[arg(long, value_name = "FILE")]
    pub settings: Option<PathBuf>,

    /// Emit a machine-readable JSON summary
    #[arg(long)]
    pub json: bool,
}

#[derive(Parser, Debug)]
#[command(about = "Show the element variant chosen per feature family")]
pub struct CapabilitiesArgs {
    /// Target JMeter release
    #[arg(long, value_name = "VERSION")]
    pub jmeter_version: String,

    /// Emit machine-readable JSON output
    #[arg(long)]
    pub json: bool,
}

#[derive(Parser, Debug)]
#[command(about = "Read back JSON extraction fields from a generated plan")]
pub struct InspectArgs {
    /// Test plan to read
    #[arg(long, value_name = "FILE")]
    pub jmx: PathBuf,

    /// Emit machine-readable JSON output
    #[arg(long)]
    pub json: bool,
}
