use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use regime_options_core::config_loader::DEFAULT_CONFIG_PATH;
use rust_decimal::Decimal;

mod commands;

use commands::{ClassifyArgs, PositionsArgs, PreflightArgs, SizeArgs};

#[derive(Parser)]
#[command(name = "regime-options")]
#[command(about = "Regime-based 0DTE SPY options strategy on Alpaca", long_about = None)]
struct Cli {
    /// Config file path
    #[arg(short, long, global = true, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Write logs to <DIR>/<date>/strategy_<time>.log instead of stderr
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,

    /// Trade against the in-memory paper broker instead of Alpaca
    #[arg(long, global = true)]
    paper: bool,

    /// Underlying price used by the paper broker
    #[arg(long, global = true, default_value = "500")]
    paper_spot: Decimal,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the strategy loop until Ctrl-C
    Run,
    /// Run a single cycle now and print the outcome
    Cycle,
    /// Classify a regime from given VIX and momentum values
    Classify(ClassifyArgs),
    /// Size a position offline
    Size(SizeArgs),
    /// Print the open position ledger
    Positions(PositionsArgs),
    /// Check credentials, account, option chain and VIX feed
    Preflight(PreflightArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    init_logging(cli.log_dir.as_deref())?;

    let config = regime_options_core::ConfigLoader::load_from(&cli.config)?;
    let backend = commands::Backend {
        paper: cli.paper,
        paper_spot: cli.paper_spot,
    };

    match cli.command {
        Commands::Run => commands::run_loop(config, &backend).await?,
        Commands::Cycle => commands::run_once(config, &backend).await?,
        Commands::Classify(args) => commands::run_classify(&config, &args),
        Commands::Size(args) => commands::run_size(&config, &args),
        Commands::Positions(args) => commands::run_positions(&config, &args)?,
        Commands::Preflight(args) => commands::run_preflight(&config, &args).await?,
    }

    Ok(())
}

fn init_logging(log_dir: Option<&Path>) -> anyhow::Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    match log_dir {
        Some(dir) => {
            let now = chrono::Local::now();
            let day_dir = dir.join(now.format("%Y-%m-%d").to_string());
            std::fs::create_dir_all(&day_dir)?;
            let path = day_dir.join(format!("strategy_{}.log", now.format("%H%M%S")));
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)?;
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_ansi(false)
                .with_writer(std::sync::Mutex::new(file))
                .init();
            tracing::info!(path = %path.display(), "Logging to file");
        }
        None => {
            tracing_subscriber::fmt().with_env_filter(filter).init();
        }
    }
    Ok(())
}
