//! Facade over the engine: validate, fan out across symbols, aggregate.
//! Multi-symbol runs are partial-failure tolerant; one symbol's error is
//! collected next to the other symbols' results instead of aborting.

use std::collections::HashMap;

use chrono::Utc;
use log::{info, warn};
use rayon::prelude::*;

use crate::backtester;
use crate::conditions;
use crate::confidence::{ConfidenceScorer, ScanScorer};
use crate::error::EngineError;
use crate::models::{
    AggregateMetrics, BacktestConfig, BacktestResult, MultiBacktestReport, PriceBar, ScanReport,
    Signal, SignalType, Strategy, SymbolFailure,
};
use crate::validator;

/// Backtest a strategy over every supplied symbol in parallel.
pub fn run_backtests(
    strategy: &Strategy,
    bars_by_symbol: &HashMap<String, Vec<PriceBar>>,
    config: &BacktestConfig,
) -> Result<MultiBacktestReport, EngineError> {
    let validation = validator::validate_strategy(strategy);
    if !validation.valid {
        return Err(EngineError::InvalidStrategy(validation.errors));
    }

    info!(
        "backtesting strategy '{}' over {} symbols",
        strategy.name,
        bars_by_symbol.len()
    );

    let outcomes: Vec<Result<BacktestResult, SymbolFailure>> = bars_by_symbol
        .par_iter()
        .map(|(symbol, bars)| {
            backtester::run_backtest(strategy, symbol, bars, config).map_err(|err| SymbolFailure {
                symbol: symbol.clone(),
                error: err.to_string(),
            })
        })
        .collect();

    let mut results = Vec::new();
    let mut failures = Vec::new();
    for outcome in outcomes {
        match outcome {
            Ok(result) => results.push(result),
            Err(failure) => {
                warn!("backtest failed for {}: {}", failure.symbol, failure.error);
                failures.push(failure);
            }
        }
    }
    results.sort_by(|a, b| a.symbol.cmp(&b.symbol));
    failures.sort_by(|a, b| a.symbol.cmp(&b.symbol));

    let summary = summarize(bars_by_symbol.len(), &results, &failures);
    Ok(MultiBacktestReport {
        results,
        failures,
        summary,
    })
}

fn summarize(
    total_symbols: usize,
    results: &[BacktestResult],
    failures: &[SymbolFailure],
) -> AggregateMetrics {
    let successful = results.len();
    let avg = |f: fn(&BacktestResult) -> f64| -> f64 {
        if successful == 0 {
            0.0
        } else {
            results.iter().map(f).sum::<f64>() / successful as f64
        }
    };

    AggregateMetrics {
        total_symbols: total_symbols as i32,
        successful_backtests: successful as i32,
        failed_backtests: failures.len() as i32,
        avg_total_return: avg(|r| r.total_return),
        avg_sharpe_ratio: avg(|r| r.sharpe_ratio),
        avg_win_rate: avg(|r| r.win_rate),
        total_trades: results.iter().map(|r| r.total_trades).sum(),
    }
}

/// Scan the latest bars of every symbol for live signals. Buy conditions
/// are checked first; at most one signal is emitted per symbol.
pub fn scan(
    strategy: &Strategy,
    bars_by_symbol: &HashMap<String, Vec<PriceBar>>,
    min_confidence: f64,
) -> Result<ScanReport, EngineError> {
    let validation = validator::validate_strategy(strategy);
    if !validation.valid {
        return Err(EngineError::InvalidStrategy(validation.errors));
    }

    let scorer = ScanScorer;
    let outcomes: Vec<Result<Option<Signal>, SymbolFailure>> = bars_by_symbol
        .par_iter()
        .map(|(symbol, bars)| {
            if bars.is_empty() {
                return Err(SymbolFailure {
                    symbol: symbol.clone(),
                    error: EngineError::EmptySeries {
                        symbol: symbol.clone(),
                    }
                    .to_string(),
                });
            }
            Ok(evaluate_symbol(strategy, symbol, bars, &scorer, min_confidence))
        })
        .collect();

    let mut signals = Vec::new();
    let mut failures = Vec::new();
    for outcome in outcomes {
        match outcome {
            Ok(Some(signal)) => signals.push(signal),
            Ok(None) => {}
            Err(failure) => {
                warn!("scan failed for {}: {}", failure.symbol, failure.error);
                failures.push(failure);
            }
        }
    }
    signals.sort_by(|a, b| a.symbol.cmp(&b.symbol));
    failures.sort_by(|a, b| a.symbol.cmp(&b.symbol));

    info!(
        "scan of '{}' produced {} signals over {} symbols",
        strategy.name,
        signals.len(),
        bars_by_symbol.len()
    );
    Ok(ScanReport { signals, failures })
}

fn evaluate_symbol(
    strategy: &Strategy,
    symbol: &str,
    bars: &[PriceBar],
    scorer: &dyn ConfidenceScorer,
    min_confidence: f64,
) -> Option<Signal> {
    let candidates = [
        (SignalType::Buy, &strategy.buy_conditions),
        (SignalType::Sell, &strategy.sell_conditions),
    ];

    for (signal_type, condition_list) in candidates {
        if let Some(descriptions) = conditions::evaluate_all(bars, condition_list) {
            let confidence = scorer.score(bars, strategy, signal_type);
            if confidence < min_confidence {
                return None;
            }
            return Some(Signal {
                strategy_id: strategy.id.clone(),
                symbol: symbol.to_string(),
                signal_type,
                conditions: descriptions,
                confidence,
                timestamp: Utc::now(),
            });
        }
    }
    None
}
