//! One-shot lap lookup: prints a single lap of a race as JSON.
//!
//! `pick_lap --year 2024 --race-name "Australian Grand Prix" --driver-code RUS --lap-number 10`

use clap::Parser;
use pit_strategy_api::{
    config::ServiceConfig,
    error::PitWallError,
    telemetry::{self, openf1::OpenF1Provider, LapQuery},
};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "pick_lap", about = "Fetch one lap of a race session")]
struct Args {
    #[arg(long)]
    year: i32,

    #[arg(long)]
    race_name: String,

    /// Three-letter driver code, e.g. RUS
    #[arg(long)]
    driver_code: String,

    #[arg(long)]
    lap_number: u32,

    /// Defaults to the service configuration (PITWALL_CONFIG, OPENF1_BASE_URL)
    #[arg(long)]
    base_url: Option<String>,
}

impl Args {
    fn base_url(&self, cfg: &ServiceConfig) -> String {
        self.base_url
            .clone()
            .unwrap_or_else(|| cfg.openf1_base_url.clone())
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let cfg = ServiceConfig::from_env()?;
    let provider = OpenF1Provider::new(args.base_url(&cfg));
    let q = LapQuery {
        year: args.year,
        race_name: args.race_name,
        driver_code: args.driver_code,
        lap_number: args.lap_number,
    };

    match telemetry::pick_lap(&provider, &q).await {
        Ok(lap) => {
            println!("{}", serde_json::to_string_pretty(&lap)?);
            Ok(ExitCode::SUCCESS)
        }
        Err(PitWallError::NotFound(msg)) => {
            eprintln!("{}", msg);
            Ok(ExitCode::from(2))
        }
        Err(e) => Err(e.into()),
    }
}
