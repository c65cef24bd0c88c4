//! Command-line interface definitions for the `drawbridge` binary.
//!
//! This module centralises the clap parser structures so both the main binary
//! and the build script can reuse them when generating the manual page.

use clap::Parser;

/// Top-level CLI for the `drawbridge` binary.
#[derive(Debug, Parser)]
#[command(
    name = "drawbridge",
    about = "Synthesise a CloudFormation stack for an RDS bastion host",
    arg_required_else_help = true
)]
pub(crate) enum Cli {
    /// Look up the target database and emit the stack template.
    #[command(
        name = "synth",
        about = "Look up the target database and emit the stack template"
    )]
    Synth(SynthCommand),
}

/// Arguments for the `drawbridge synth` subcommand.
#[derive(Debug, Parser)]
pub(crate) struct SynthCommand {
    /// Write the rendered template to this path instead of stdout.
    #[arg(long, value_name = "PATH")]
    pub(crate) output: Option<String>,
}
