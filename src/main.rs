use std::fs;
use std::io::{self, IsTerminal, Read};
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::process;

use amortize::api::{self, CalculateRequest};
use amortize::core::Scenario;
use clap::{Parser, Subcommand, ValueEnum};
use serde_json::Value;
use tracing::error;
use tracing_subscriber::EnvFilter;

/// Mortgage, refinance, credit card and savings calculators
#[derive(Parser)]
#[command(name = "amortize", version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the JSON calculation API
    Serve {
        #[arg(long, env = "AMORTIZE_HOST", default_value = "0.0.0.0")]
        host: IpAddr,
        #[arg(long, env = "AMORTIZE_PORT", default_value_t = 5000)]
        port: u16,
    },
    /// Run one calculation and print the result as JSON
    Calculate {
        /// Free-text script name, matched by keyword
        #[arg(long, required_unless_present = "scenario")]
        script: Option<String>,
        #[arg(long, value_enum, conflicts_with = "script")]
        scenario: Option<CliScenario>,
        /// JSON data dictionary; read from stdin when omitted
        #[arg(long)]
        input: Option<PathBuf>,
    },
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum CliScenario {
    SavingsGrowth,
    RolloverExport,
    Rollover,
    Refinance,
    Revolving,
    TargetTerm,
    Overpayment,
}

impl From<CliScenario> for Scenario {
    fn from(value: CliScenario) -> Self {
        match value {
            CliScenario::SavingsGrowth => Scenario::SavingsGrowth,
            CliScenario::RolloverExport => Scenario::RolloverExport,
            CliScenario::Rollover => Scenario::Rollover,
            CliScenario::Refinance => Scenario::Refinance,
            CliScenario::Revolving => Scenario::Revolving,
            CliScenario::TargetTerm => Scenario::TargetTerm,
            CliScenario::Overpayment => Scenario::Overpayment,
        }
    }
}

fn read_data(input: Option<PathBuf>) -> Result<Value, String> {
    let text = match input {
        Some(path) => fs::read_to_string(&path)
            .map_err(|e| format!("Failed to read '{}': {e}", path.display()))?,
        None if io::stdin().is_terminal() => return Ok(Value::Null),
        None => {
            let mut buffer = String::new();
            io::stdin()
                .read_to_string(&mut buffer)
                .map_err(|e| format!("Failed to read stdin: {e}"))?;
            buffer
        }
    };
    if text.trim().is_empty() {
        return Ok(Value::Null);
    }
    serde_json::from_str(&text).map_err(|e| format!("Invalid JSON input: {e}"))
}

fn calculate(
    script: Option<String>,
    scenario: Option<CliScenario>,
    input: Option<PathBuf>,
) -> Result<String, String> {
    let request = CalculateRequest {
        script,
        scenario: scenario.map(Scenario::from),
        data: read_data(input)?,
    };
    let response = api::calculate(request).map_err(|e| e.to_string())?;
    serde_json::to_string_pretty(&response).map_err(|e| e.to_string())
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();

    match Cli::parse().command {
        Commands::Serve { host, port } => {
            if let Err(e) = api::run_http_server(SocketAddr::new(host, port)).await {
                error!(error = %e, "server error");
                process::exit(1);
            }
        }
        Commands::Calculate {
            script,
            scenario,
            input,
        } => match calculate(script, scenario, input) {
            Ok(json) => println!("{json}"),
            Err(e) => {
                error!("{e}");
                process::exit(1);
            }
        },
    }
}
