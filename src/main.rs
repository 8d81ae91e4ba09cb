use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use log::info;

use strategy_engine::models::{BacktestConfig, PriceBar, Strategy};
use strategy_engine::{orchestrator, validator};

#[derive(Parser)]
#[command(name = "strategy-engine", about = "Strategy validation, backtesting and signal scanning")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a strategy definition file
    Validate {
        /// Path to a strategy JSON file
        strategy: PathBuf,
    },
    /// Backtest a strategy over historical bars
    Backtest {
        /// Path to a strategy JSON file
        strategy: PathBuf,
        /// Path to a bars JSON file ({"SYMBOL": [bar, ...], ...})
        bars: PathBuf,
        #[arg(long, default_value_t = 10_000.0)]
        initial_capital: f64,
        #[arg(long, default_value_t = 0.001)]
        commission: f64,
        #[arg(long, default_value_t = 0.0005)]
        slippage: f64,
    },
    /// Scan the latest bars for live buy/sell signals
    Scan {
        /// Path to a strategy JSON file
        strategy: PathBuf,
        /// Path to a bars JSON file ({"SYMBOL": [bar, ...], ...})
        bars: PathBuf,
        #[arg(long, default_value_t = 0.6)]
        min_confidence: f64,
    },
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Validate { strategy } => {
            let strategy = load_strategy(&strategy)?;
            let validation = validator::validate_strategy(&strategy);
            println!("{}", serde_json::to_string_pretty(&validation)?);
            if !validation.valid {
                bail!("strategy '{}' failed validation", strategy.name);
            }
        }
        Commands::Backtest {
            strategy,
            bars,
            initial_capital,
            commission,
            slippage,
        } => {
            let strategy = load_strategy(&strategy)?;
            let bars_by_symbol = load_bars(&bars)?;
            let config = BacktestConfig {
                initial_capital,
                commission,
                slippage,
                ..BacktestConfig::default()
            };
            let report = orchestrator::run_backtests(&strategy, &bars_by_symbol, &config)?;
            info!(
                "{}/{} symbols succeeded",
                report.summary.successful_backtests, report.summary.total_symbols
            );
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Commands::Scan {
            strategy,
            bars,
            min_confidence,
        } => {
            let strategy = load_strategy(&strategy)?;
            let bars_by_symbol = load_bars(&bars)?;
            let report = orchestrator::scan(&strategy, &bars_by_symbol, min_confidence)?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
    }
    Ok(())
}

fn load_strategy(path: &Path) -> Result<Strategy> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read strategy file {}", path.display()))?;
    serde_json::from_str(&raw)
        .with_context(|| format!("failed to parse strategy file {}", path.display()))
}

fn load_bars(path: &Path) -> Result<HashMap<String, Vec<PriceBar>>> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read bars file {}", path.display()))?;
    serde_json::from_str(&raw)
        .with_context(|| format!("failed to parse bars file {}", path.display()))
}
