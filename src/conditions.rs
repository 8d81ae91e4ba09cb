//! Condition evaluation. A condition compares the latest value of an
//! indicator series against a comparison target that is either a literal
//! number or a reference to another indicator ("sma_200", "ema_50") or, for
//! volume conditions, a trailing average ("avg", "avg_volume", ...).
//!
//! Resolution failures never raise: an author's typo suppresses the signal
//! instead of crashing a scan, so unresolvable values and insufficient
//! history both evaluate to "not met".

use crate::indicators;
use crate::models::{CompareValue, ConditionOperator, IndicatorKind, PriceBar, StrategyCondition};
use crate::param_utils::{get_param_f64, get_param_usize_min};
use log::debug;

/// Tolerance for `==` / `!=` against floating-point indicator values.
pub const EQUALITY_EPSILON: f64 = 1e-4;

#[derive(Debug, Clone)]
pub struct ConditionOutcome {
    pub met: bool,
    pub description: String,
}

impl ConditionOutcome {
    fn not_met(description: String) -> Self {
        Self {
            met: false,
            description,
        }
    }
}

/// Comparison target after one-shot resolution of the wire value.
#[derive(Debug, Clone, PartialEq)]
enum ResolvedCompare {
    Literal(f64),
    IndicatorRef { kind: IndicatorKind, period: usize },
    VolumeAverage { period: usize },
}

fn resolve_compare(condition: &StrategyCondition) -> Option<ResolvedCompare> {
    match &condition.value {
        CompareValue::Literal(value) if value.is_finite() => {
            Some(ResolvedCompare::Literal(*value))
        }
        CompareValue::Literal(_) => None,
        CompareValue::Text(text) => {
            let trimmed = text.trim();
            if let Some(reference) = parse_indicator_reference(trimmed) {
                return Some(reference);
            }
            if condition.indicator == IndicatorKind::Volume
                && trimmed.to_lowercase().contains("avg")
            {
                let period = get_param_usize_min(&condition.parameters, "period", 20, 1);
                return Some(ResolvedCompare::VolumeAverage { period });
            }
            trimmed
                .parse::<f64>()
                .ok()
                .filter(|v| v.is_finite())
                .map(ResolvedCompare::Literal)
        }
    }
}

/// Parse "sma_<N>" / "ema_<N>" references.
fn parse_indicator_reference(text: &str) -> Option<ResolvedCompare> {
    let (prefix, suffix) = text.split_once('_')?;
    let kind = match prefix.to_lowercase().as_str() {
        "sma" => IndicatorKind::Sma,
        "ema" => IndicatorKind::Ema,
        _ => return None,
    };
    let period = suffix.parse::<usize>().ok().filter(|p| *p > 0)?;
    Some(ResolvedCompare::IndicatorRef { kind, period })
}

fn closes(bars: &[PriceBar]) -> Vec<f64> {
    bars.iter().map(|bar| bar.close).collect()
}

fn last_defined(series: &[f64]) -> Option<f64> {
    series.last().copied().filter(|v| v.is_finite())
}

/// Latest value of the condition's indicator over `bars`. `None` when the
/// series is empty or the indicator is still inside its lookback warm-up.
fn indicator_value(bars: &[PriceBar], condition: &StrategyCondition) -> Option<f64> {
    if bars.is_empty() {
        return None;
    }
    let params = &condition.parameters;
    let period = get_param_usize_min(
        params,
        "period",
        condition.indicator.default_period(),
        1,
    );

    match condition.indicator {
        IndicatorKind::Price => bars.last().map(|bar| bar.close),
        IndicatorKind::Sma => last_defined(&indicators::calculate_sma(&closes(bars), period)),
        IndicatorKind::Ema => last_defined(&indicators::calculate_ema(&closes(bars), period)),
        IndicatorKind::Rsi => last_defined(&indicators::calculate_rsi(&closes(bars), period)),
        IndicatorKind::Macd => {
            let fast = get_param_usize_min(params, "fastPeriod", 12, 1);
            let slow = get_param_usize_min(params, "slowPeriod", 26, 1);
            let signal = get_param_usize_min(params, "signalPeriod", 9, 1);
            let (macd_line, _, _) = indicators::calculate_macd(&closes(bars), fast, slow, signal);
            last_defined(&macd_line)
        }
        IndicatorKind::Bollinger => {
            let std_dev = get_param_f64(params, "stdDev", 2.0);
            let (_, middle, _) = indicators::calculate_bollinger_bands(&closes(bars), period, std_dev);
            last_defined(&middle)
        }
        IndicatorKind::Stochastic => {
            let k_period = get_param_usize_min(params, "kPeriod", period, 1);
            let d_period = get_param_usize_min(params, "dPeriod", 3, 1);
            let highs: Vec<f64> = bars.iter().map(|bar| bar.high).collect();
            let lows: Vec<f64> = bars.iter().map(|bar| bar.low).collect();
            let (k, _) = indicators::calculate_stochastic(&highs, &lows, &closes(bars), k_period, d_period);
            last_defined(&k)
        }
        IndicatorKind::Volume => bars.last().map(|bar| bar.volume),
    }
}

fn compare_target_value(bars: &[PriceBar], resolved: &ResolvedCompare) -> Option<f64> {
    match resolved {
        ResolvedCompare::Literal(value) => Some(*value),
        ResolvedCompare::IndicatorRef { kind, period } => {
            let series = match kind {
                IndicatorKind::Sma => indicators::calculate_sma(&closes(bars), *period),
                IndicatorKind::Ema => indicators::calculate_ema(&closes(bars), *period),
                _ => return None,
            };
            last_defined(&series)
        }
        ResolvedCompare::VolumeAverage { period } => {
            let volumes: Vec<f64> = bars.iter().map(|bar| bar.volume).collect();
            last_defined(&indicators::calculate_volume_sma(&volumes, *period))
        }
    }
}

fn apply_operator(operator: ConditionOperator, current: f64, compare: f64) -> bool {
    match operator {
        ConditionOperator::GreaterThan => current > compare,
        ConditionOperator::LessThan => current < compare,
        ConditionOperator::GreaterOrEqual => current >= compare,
        ConditionOperator::LessOrEqual => current <= compare,
        ConditionOperator::Equal => (current - compare).abs() <= EQUALITY_EPSILON,
        ConditionOperator::NotEqual => (current - compare).abs() > EQUALITY_EPSILON,
        // Crossing operators need the previous bar and are handled separately.
        ConditionOperator::CrossesAbove | ConditionOperator::CrossesBelow => false,
    }
}

/// Evaluate one condition against the bar window ending at the latest bar.
pub fn evaluate(bars: &[PriceBar], condition: &StrategyCondition) -> ConditionOutcome {
    let label = condition.indicator.as_str();

    let Some(current) = indicator_value(bars, condition) else {
        return ConditionOutcome::not_met(format!(
            "{} undefined at latest bar (insufficient history)",
            label
        ));
    };

    let Some(resolved) = resolve_compare(condition) else {
        debug!(
            "unresolvable comparison value '{}' for {} condition; failing closed",
            condition.value.describe(),
            label
        );
        return ConditionOutcome::not_met(format!(
            "{}: comparison value '{}' unresolvable",
            label,
            condition.value.describe()
        ));
    };

    let Some(compare) = compare_target_value(bars, &resolved) else {
        return ConditionOutcome::not_met(format!(
            "{}: comparison '{}' undefined at latest bar",
            label,
            condition.value.describe()
        ));
    };

    let met = match condition.operator {
        ConditionOperator::CrossesAbove | ConditionOperator::CrossesBelow => {
            if bars.len() < 2 {
                false
            } else {
                let previous = indicator_value(&bars[..bars.len() - 1], condition);
                match previous {
                    Some(previous) => match condition.operator {
                        ConditionOperator::CrossesAbove => {
                            current > compare && previous <= compare
                        }
                        ConditionOperator::CrossesBelow => {
                            current < compare && previous >= compare
                        }
                        _ => unreachable!(),
                    },
                    None => false,
                }
            }
        }
        operator => apply_operator(operator, current, compare),
    };

    ConditionOutcome {
        met,
        description: format!(
            "{} {:.4} {} {} ({:.4})",
            label,
            current,
            condition.operator.as_str(),
            condition.value.describe(),
            compare
        ),
    }
}

/// Evaluate a whole condition list with AND semantics. Returns the
/// descriptions of every condition when all of them hold, `None` otherwise.
pub fn evaluate_all(bars: &[PriceBar], conditions: &[StrategyCondition]) -> Option<Vec<String>> {
    if conditions.is_empty() {
        return None;
    }

    let mut descriptions = Vec::with_capacity(conditions.len());
    for condition in conditions {
        let outcome = evaluate(bars, condition);
        if !outcome.met {
            return None;
        }
        descriptions.push(outcome.description);
    }
    Some(descriptions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};
    use std::collections::HashMap;

    fn bars_from_closes(closes: &[f64]) -> Vec<PriceBar> {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        closes
            .iter()
            .enumerate()
            .map(|(i, &close)| PriceBar {
                timestamp: start + Duration::days(i as i64),
                open: close,
                high: close,
                low: close,
                close,
                volume: 1_000.0,
            })
            .collect()
    }

    fn condition(
        indicator: IndicatorKind,
        operator: ConditionOperator,
        value: CompareValue,
    ) -> StrategyCondition {
        StrategyCondition {
            indicator,
            operator,
            value,
            parameters: HashMap::new(),
            timeframe: None,
        }
    }

    #[test]
    fn price_above_literal_threshold() {
        let bars = bars_from_closes(&[100.0, 101.0, 102.0]);
        let cond = condition(
            IndicatorKind::Price,
            ConditionOperator::GreaterThan,
            CompareValue::Literal(101.5),
        );
        assert!(evaluate(&bars, &cond).met);

        let cond = condition(
            IndicatorKind::Price,
            ConditionOperator::LessThan,
            CompareValue::Literal(101.5),
        );
        assert!(!evaluate(&bars, &cond).met);
    }

    #[test]
    fn indicator_reference_resolves_fresh_series() {
        // Close pinned above its own 3-bar SMA on a rising series.
        let bars = bars_from_closes(&[100.0, 102.0, 104.0, 106.0, 108.0]);
        let mut cond = condition(
            IndicatorKind::Price,
            ConditionOperator::GreaterThan,
            CompareValue::Text("sma_3".to_string()),
        );
        assert!(evaluate(&bars, &cond).met);

        cond.operator = ConditionOperator::LessThan;
        assert!(!evaluate(&bars, &cond).met);
    }

    #[test]
    fn unresolvable_comparison_fails_closed() {
        let bars = bars_from_closes(&[100.0, 101.0, 102.0]);
        let cond = condition(
            IndicatorKind::Price,
            ConditionOperator::GreaterThan,
            CompareValue::Text("sma_oops".to_string()),
        );
        let outcome = evaluate(&bars, &cond);
        assert!(!outcome.met);
        assert!(outcome.description.contains("unresolvable"));
    }

    #[test]
    fn insufficient_history_fails_closed() {
        let bars = bars_from_closes(&[100.0, 101.0]);
        let mut cond = condition(
            IndicatorKind::Sma,
            ConditionOperator::GreaterThan,
            CompareValue::Literal(50.0),
        );
        cond.parameters.insert("period".to_string(), 14.0);
        let outcome = evaluate(&bars, &cond);
        assert!(!outcome.met);
        assert!(outcome.description.contains("insufficient history"));
    }

    #[test]
    fn equality_uses_epsilon() {
        let bars = bars_from_closes(&[100.0, 100.00005]);
        let cond = condition(
            IndicatorKind::Price,
            ConditionOperator::Equal,
            CompareValue::Literal(100.0),
        );
        assert!(evaluate(&bars, &cond).met);

        let cond = condition(
            IndicatorKind::Price,
            ConditionOperator::NotEqual,
            CompareValue::Literal(100.0),
        );
        assert!(!evaluate(&bars, &cond).met);
    }

    #[test]
    fn crosses_above_fires_only_at_the_crossing_bar() {
        // Rises through 105 exactly once, between index 5 and 6.
        let closes: Vec<f64> = (0..12).map(|i| 100.0 + i as f64).collect();
        let bars = bars_from_closes(&closes);
        let above = condition(
            IndicatorKind::Price,
            ConditionOperator::CrossesAbove,
            CompareValue::Literal(105.0),
        );
        let below = condition(
            IndicatorKind::Price,
            ConditionOperator::CrossesBelow,
            CompareValue::Literal(105.0),
        );

        let mut fired_at = Vec::new();
        for end in 2..=bars.len() {
            if evaluate(&bars[..end], &above).met {
                fired_at.push(end - 1);
            }
            assert!(!evaluate(&bars[..end], &below).met);
        }
        assert_eq!(fired_at, vec![6]);
    }

    #[test]
    fn volume_average_reference_compares_against_trailing_mean() {
        let mut bars = bars_from_closes(&(0..25).map(|i| 100.0 + i as f64).collect::<Vec<_>>());
        // Final bar volume well above the trailing average.
        bars.last_mut().unwrap().volume = 10_000.0;
        let cond = condition(
            IndicatorKind::Volume,
            ConditionOperator::GreaterThan,
            CompareValue::Text("avg_volume".to_string()),
        );
        assert!(evaluate(&bars, &cond).met);
    }

    #[test]
    fn all_conditions_require_every_member() {
        let bars = bars_from_closes(&(0..30).map(|i| 100.0 + i as f64).collect::<Vec<_>>());
        let passing = condition(
            IndicatorKind::Price,
            ConditionOperator::GreaterThan,
            CompareValue::Text("sma_20".to_string()),
        );
        let failing = condition(
            IndicatorKind::Price,
            ConditionOperator::LessThan,
            CompareValue::Literal(0.0),
        );

        assert!(evaluate_all(&bars, &[passing.clone()]).is_some());
        assert!(evaluate_all(&bars, &[passing, failing]).is_none());
        assert!(evaluate_all(&bars, &[]).is_none());
    }
}
