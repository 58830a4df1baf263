use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};
use nestegg::core::{FinancialInputs, plan_retirement};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, error};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "nestegg", about = "Retirement projection and financial health scoring")]
struct Cli {
    /// Log filter used when RUST_LOG is not set.
    #[arg(long, global = true, default_value = "info")]
    log_level: String,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Serve the JSON API.
    Serve {
        #[arg(long, default_value_t = 8080)]
        port: u16,
    },
    /// Run the full plan for a JSON input file and print the report.
    Plan {
        #[arg(long)]
        input: PathBuf,
        /// Overrides any scenario named in the input file.
        #[arg(long, value_enum)]
        scenario: Option<CliScenario>,
        #[arg(long)]
        pretty: bool,
    },
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum CliScenario {
    Conservative,
    Moderate,
    Aggressive,
}

impl CliScenario {
    fn key(self) -> &'static str {
        match self {
            CliScenario::Conservative => "conservative",
            CliScenario::Moderate => "moderate",
            CliScenario::Aggressive => "aggressive",
        }
    }
}

#[derive(Debug, Error)]
enum CliError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("input file must contain a JSON object of input fields")]
    NotAnObject,
}

fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run_plan(input: PathBuf, scenario: Option<CliScenario>, pretty: bool) -> Result<String, CliError> {
    let text = std::fs::read_to_string(&input).map_err(|source| CliError::Io {
        path: input.clone(),
        source,
    })?;
    let mut value: Value = serde_json::from_str(&text)?;
    if let (Some(fields), Some(scenario)) = (value.as_object_mut(), scenario) {
        debug!(scenario = scenario.key(), "scenario overridden from command line");
        fields.insert("riskProfile".to_string(), Value::from(scenario.key()));
    }
    let raw = FinancialInputs::from_value(value).ok_or(CliError::NotAnObject)?;
    let report = plan_retirement(&raw);
    let out = if pretty {
        serde_json::to_string_pretty(&report)?
    } else {
        serde_json::to_string(&report)?
    };
    Ok(out)
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(&cli.log_level);

    match cli.command {
        Command::Serve { port } => {
            if let Err(e) = nestegg::api::run_http_server(port).await {
                error!(error = %e, "server error");
                return ExitCode::FAILURE;
            }
        }
        Command::Plan {
            input,
            scenario,
            pretty,
        } => match run_plan(input, scenario, pretty) {
            Ok(report) => println!("{report}"),
            Err(e) => {
                error!(error = %e, "plan failed");
                return ExitCode::FAILURE;
            }
        },
    }
    ExitCode::SUCCESS
}
