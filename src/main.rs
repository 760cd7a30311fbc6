// Entry point and command-line flow.
//
// Each subcommand maps to one agent-facing operation and prints the text that
// operation returns. Logs go to stderr so stdout carries only that text.
use clap::{Parser, Subcommand};
use fire_report::config::Config;
use fire_report::kakao::KakaoClient;
use fire_report::tools::FireService;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::error;
use tracing_subscriber::EnvFilter;

/// Wildfire incident records: listing, statistics, risk analysis and maps.
#[derive(Parser)]
#[command(name = "fire_report", about = "Wildfire incident query and analysis")]
struct Cli {
    /// TOML config file; built-in defaults and environment variables otherwise.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List fires matching a province and/or year (first 10 shown).
    Records {
        #[arg(long)]
        province: Option<String>,
        #[arg(long)]
        year: Option<String>,
    },
    /// Counts by year, region and cause.
    Stats {
        /// Also write the tables as CSV (plus a JSON summary) into this directory.
        #[arg(long)]
        export: Option<PathBuf>,
    },
    /// Risk level, main causes, busy months and trend for one province.
    Risk { province: String },
    /// Attach WGS84 positions to more records and save store and cache.
    Convert {
        #[arg(long, default_value_t = 10)]
        count: usize,
    },
    /// Look up the coordinates of a place name.
    Search { name: String },
    /// Write a map page of matching fires (first 100).
    Visualize {
        #[arg(long)]
        province: Option<String>,
        #[arg(long)]
        year: Option<String>,
    },
    /// Map up to 30 fires of one region, placed by address search.
    RegionMap { region: String },
    /// Print the whole record store as JSON.
    Data,
    /// Wildfire prevention and response guidance.
    Tips,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();

    let config = match Config::load(cli.config.as_deref()) {
        Ok(c) => c,
        Err(e) => {
            error!("{}", e);
            return ExitCode::from(2);
        }
    };
    let client = match KakaoClient::new(&config.geocoding) {
        Ok(c) => c,
        Err(e) => {
            error!("{}", e);
            return ExitCode::from(2);
        }
    };
    let service = FireService::new(config, Arc::new(client));

    let text = match cli.command {
        Command::Records { province, year } => {
            service.get_records(province.as_deref(), year.as_deref())
        }
        Command::Stats { export: None } => service.get_stats(),
        Command::Stats { export: Some(dir) } => {
            format!("{}\n{}", service.get_stats(), service.export_stats(&dir))
        }
        Command::Risk { province } => service.analyze_risk(&province),
        Command::Convert { count } => service.convert_coordinates_batch(count).await,
        Command::Search { name } => service.search_location(&name).await,
        Command::Visualize { province, year } => {
            service.visualize(province.as_deref(), year.as_deref())
        }
        Command::RegionMap { region } => service.visualize_region(&region).await,
        Command::Data => service.data_resource(),
        Command::Tips => service.safety_tips().to_string(),
    };
    println!("{text}");
    ExitCode::SUCCESS
}
