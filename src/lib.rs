pub mod backtester;
pub mod conditions;
pub mod confidence;
pub mod error;
pub mod indicators;
pub mod models;
pub mod orchestrator;
pub mod param_utils;
pub mod performance;
pub mod validator;

pub use backtester::{run_backtest, MIN_WARMUP_BARS};
pub use confidence::{ConfidenceScorer, LiveAlertScorer, ScanScorer};
pub use error::EngineError;
pub use models::{
    AggregateMetrics, BacktestConfig, BacktestResult, MultiBacktestReport, PriceBar, ScanReport,
    Signal, SignalType, Strategy, SymbolFailure, Trade, Validation,
};
pub use orchestrator::{run_backtests, scan};
pub use validator::validate_strategy;
