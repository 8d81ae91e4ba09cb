//! Heuristic signal confidence. Two scorers with deliberately different
//! constants exist: `LiveAlertScorer` is used when turning a fresh bar into
//! an alert, `ScanScorer` when the orchestrator sweeps a symbol list. Their
//! numbers diverged independently and are kept separate so neither call
//! site changes behavior.

use statrs::statistics::Statistics;

use crate::models::{PriceBar, SignalType, Strategy};

const BASE_CONFIDENCE: f64 = 0.6;
const MIN_CONFIDENCE: f64 = 0.1;
const MAX_CONFIDENCE: f64 = 1.0;
const VOLUME_AVG_WINDOW: usize = 10;
const HIGH_VOLUME_RATIO: f64 = 1.5;
const LOW_VOLUME_RATIO: f64 = 0.5;
const CONDITION_RICHNESS_THRESHOLD: usize = 3;
const VOLATILITY_PENALTY_THRESHOLD: f64 = 0.05;

pub trait ConfidenceScorer {
    fn score(&self, bars: &[PriceBar], strategy: &Strategy, signal_type: SignalType) -> f64;
}

/// Scorer used for per-bar live alerts. Volume confirmation is additive.
#[derive(Debug, Default)]
pub struct LiveAlertScorer;

/// Scorer used by the multi-symbol scan. Volume confirmation is a
/// multiplier and volatility is measured over a longer window.
#[derive(Debug, Default)]
pub struct ScanScorer;

impl ConfidenceScorer for LiveAlertScorer {
    fn score(&self, bars: &[PriceBar], strategy: &Strategy, signal_type: SignalType) -> f64 {
        let mut confidence = BASE_CONFIDENCE;

        match volume_ratio(bars) {
            Some(ratio) if ratio > HIGH_VOLUME_RATIO => confidence += 0.15,
            Some(ratio) if ratio < LOW_VOLUME_RATIO => confidence -= 0.1,
            _ => {}
        }

        if momentum_aligned(bars, signal_type) {
            confidence += 0.1;
        }

        if strategy.condition_count() >= CONDITION_RICHNESS_THRESHOLD {
            confidence += 0.05;
        }

        if trailing_volatility(bars, 5) > VOLATILITY_PENALTY_THRESHOLD {
            confidence -= 0.05;
        }

        clamp(confidence)
    }
}

impl ConfidenceScorer for ScanScorer {
    fn score(&self, bars: &[PriceBar], strategy: &Strategy, signal_type: SignalType) -> f64 {
        let mut confidence = BASE_CONFIDENCE;

        match volume_ratio(bars) {
            Some(ratio) if ratio > HIGH_VOLUME_RATIO => confidence *= 1.1,
            Some(ratio) if ratio < LOW_VOLUME_RATIO => confidence -= 0.1,
            _ => {}
        }

        if momentum_aligned(bars, signal_type) {
            confidence += 0.1;
        }

        if strategy.condition_count() >= CONDITION_RICHNESS_THRESHOLD {
            confidence += 0.05;
        }

        if trailing_volatility(bars, 10) > VOLATILITY_PENALTY_THRESHOLD {
            confidence -= 0.05;
        }

        clamp(confidence)
    }
}

/// Latest volume over the trailing average. `None` when the window is not
/// filled or the average is zero.
fn volume_ratio(bars: &[PriceBar]) -> Option<f64> {
    if bars.len() <= VOLUME_AVG_WINDOW {
        return None;
    }
    let latest = bars[bars.len() - 1].volume;
    let window = &bars[bars.len() - 1 - VOLUME_AVG_WINDOW..bars.len() - 1];
    let average = window.iter().map(|bar| bar.volume).sum::<f64>() / VOLUME_AVG_WINDOW as f64;
    if average > 0.0 {
        Some(latest / average)
    } else {
        None
    }
}

fn momentum_aligned(bars: &[PriceBar], signal_type: SignalType) -> bool {
    if bars.len() < 2 {
        return false;
    }
    let previous = bars[bars.len() - 2].close;
    if previous <= 0.0 {
        return false;
    }
    let last_return = (bars[bars.len() - 1].close - previous) / previous;
    match signal_type {
        SignalType::Buy => last_return > 0.0,
        SignalType::Sell => last_return < 0.0,
    }
}

/// Standard deviation of the trailing `window` bar-over-bar returns. Zero
/// when there is not enough history to form the window.
fn trailing_volatility(bars: &[PriceBar], window: usize) -> f64 {
    if bars.len() < window + 1 {
        return 0.0;
    }
    let returns: Vec<f64> = bars[bars.len() - window - 1..]
        .windows(2)
        .filter(|pair| pair[0].close > 0.0)
        .map(|pair| (pair[1].close - pair[0].close) / pair[0].close)
        .collect();
    if returns.len() < 2 {
        return 0.0;
    }
    let std_dev = returns.std_dev();
    if std_dev.is_finite() {
        std_dev
    } else {
        0.0
    }
}

fn clamp(confidence: f64) -> f64 {
    confidence.clamp(MIN_CONFIDENCE, MAX_CONFIDENCE)
}
