//! Binary entry point for the drawbridge CLI.

use std::io::{self, Write};
use std::process;

use clap::Parser;
use thiserror::Error;

use drawbridge::fs::open_parent_dir;
use drawbridge::{AwsNetworkLookup, DeploymentConfig, SynthError, SynthOrchestrator};

mod cli;

use cli::{Cli, SynthCommand};

#[derive(Debug, Error)]
enum CliError {
    #[error("configuration error: {0}")]
    Config(String),
    #[error("synthesis failed: {0}")]
    Synth(#[from] SynthError),
    #[error("failed to render template: {0}")]
    Render(String),
    #[error("failed to write template to `{path}`: {message}")]
    Emit {
        path: String,
        message: String,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let exit_code = match dispatch(cli).await {
        Ok(()) => 0,
        Err(err) => {
            report_error(&err);
            1
        }
    };

    process::exit(exit_code);
}

async fn dispatch(cli: Cli) -> Result<(), CliError> {
    match cli {
        Cli::Synth(command) => synth_command(command).await,
    }
}

async fn synth_command(args: SynthCommand) -> Result<(), CliError> {
    let config = DeploymentConfig::load_without_cli_args()
        .map_err(|err| CliError::Config(err.to_string()))?;
    let deployment = config
        .resolve()
        .map_err(|err| CliError::Config(err.to_string()))?;

    let lookup = AwsNetworkLookup::connect(&deployment.aws_region).await;
    let orchestrator = SynthOrchestrator::new(lookup);
    let synthesis = orchestrator.synthesise(&deployment).await?;

    let rendered = synthesis
        .template
        .render()
        .map_err(|err| CliError::Render(err.to_string()))?;
    emit(&rendered, args.output.as_deref())
}

fn emit(rendered: &str, output: Option<&str>) -> Result<(), CliError> {
    match output {
        None => writeln!(io::stdout(), "{rendered}").map_err(|err| CliError::Emit {
            path: String::from("<stdout>"),
            message: err.to_string(),
        }),
        Some(path) => write_ambient(path, rendered).map_err(|message| CliError::Emit {
            path: path.to_owned(),
            message,
        }),
    }
}

fn write_ambient(path: &str, content: &str) -> Result<(), String> {
    let (dir, file_path) = open_parent_dir(path)?;
    dir.write(file_path, content).map_err(|err| err.to_string())
}

fn report_error(err: &CliError) {
    write_error(io::stderr(), err);
}

fn write_error(mut target: impl Write, err: &CliError) {
    writeln!(target, "{err}").ok();
}
