//! Aggregate performance metrics derived from a completed simulation.

use statrs::statistics::Statistics;

use crate::models::Trade;

const RISK_FREE_RATE: f64 = 0.02;
const TRADING_DAYS_PER_YEAR: f64 = 252.0;

pub struct PerformanceCalculator;

impl PerformanceCalculator {
    pub fn total_return(initial_capital: f64, final_value: f64) -> f64 {
        if initial_capital <= 0.0 {
            return 0.0;
        }
        (final_value - initial_capital) / initial_capital
    }

    /// Annualize a total return over `num_bars` daily bars under the
    /// 252-trading-day convention.
    pub fn annualized_return(total_return: f64, num_bars: usize) -> f64 {
        if num_bars == 0 || total_return <= -1.0 {
            return 0.0;
        }
        (1.0 + total_return).powf(TRADING_DAYS_PER_YEAR / num_bars as f64) - 1.0
    }

    pub fn win_rate(trades: &[Trade]) -> f64 {
        if trades.is_empty() {
            return 0.0;
        }
        let winners = trades.iter().filter(|t| t.return_pct > 0.0).count();
        winners as f64 / trades.len() as f64
    }

    /// Gross profit over gross loss. Infinity when there are profits but no
    /// losses, zero when there are no profits at all.
    pub fn profit_factor(trades: &[Trade]) -> f64 {
        let gross_profit: f64 = trades
            .iter()
            .filter(|t| t.profit_loss > 0.0)
            .map(|t| t.profit_loss)
            .sum();
        let gross_loss: f64 = trades
            .iter()
            .filter(|t| t.profit_loss < 0.0)
            .map(|t| t.profit_loss)
            .sum::<f64>()
            .abs();

        if gross_loss > 0.0 {
            gross_profit / gross_loss
        } else if gross_profit > 0.0 {
            f64::INFINITY
        } else {
            0.0
        }
    }

    /// Max peak-to-trough decline of the trade-event equity curve (initial
    /// capital plus cumulative realized P&L after each trade).
    pub fn max_drawdown(initial_capital: f64, trades: &[Trade]) -> f64 {
        let mut equity = initial_capital;
        let mut peak = initial_capital;
        let mut max_drawdown: f64 = 0.0;

        for trade in trades {
            equity += trade.profit_loss;
            if equity > peak {
                peak = equity;
            } else if peak > 0.0 {
                max_drawdown = max_drawdown.max((peak - equity) / peak);
            }
        }
        max_drawdown
    }

    /// Sharpe ratio over per-trade returns, annualized. Zero with fewer
    /// than two trades or zero variance.
    pub fn sharpe_ratio(trades: &[Trade]) -> f64 {
        if trades.len() < 2 {
            return 0.0;
        }
        let returns: Vec<f64> = trades.iter().map(|t| t.return_pct).collect();
        let mean = returns.as_slice().mean();
        let std_dev = returns.as_slice().std_dev();
        if !std_dev.is_finite() || std_dev == 0.0 {
            return 0.0;
        }
        (mean - RISK_FREE_RATE / TRADING_DAYS_PER_YEAR) / std_dev * TRADING_DAYS_PER_YEAR.sqrt()
    }

    pub fn avg_trade_duration(trades: &[Trade]) -> f64 {
        if trades.is_empty() {
            return 0.0;
        }
        let total: i64 = trades.iter().map(|t| t.duration_days).sum();
        total as f64 / trades.len() as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ExitReason;
    use chrono::{Duration, TimeZone, Utc};

    fn trade(profit_loss: f64, return_pct: f64, duration_days: i64) -> Trade {
        let entry = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        Trade {
            symbol: "AAPL".to_string(),
            entry_date: entry,
            exit_date: entry + Duration::days(duration_days),
            entry_price: 100.0,
            exit_price: 100.0 * (1.0 + return_pct),
            quantity: 10,
            return_pct,
            profit_loss,
            duration_days,
            exit_reason: ExitReason::Sell,
            conditions_met: vec![],
        }
    }

    #[test]
    fn total_return_is_relative_to_initial_capital() {
        assert!((PerformanceCalculator::total_return(10_000.0, 12_000.0) - 0.2).abs() < 1e-12);
        assert!((PerformanceCalculator::total_return(10_000.0, 9_000.0) + 0.1).abs() < 1e-12);
        assert_eq!(PerformanceCalculator::total_return(0.0, 1.0), 0.0);
    }

    #[test]
    fn annualized_return_over_one_year_equals_total() {
        let annualized = PerformanceCalculator::annualized_return(0.1, 252);
        assert!((annualized - 0.1).abs() < 1e-12);

        // A 10% gain in half a year compounds to more than 10% annualized.
        assert!(PerformanceCalculator::annualized_return(0.1, 126) > 0.1);
        assert_eq!(PerformanceCalculator::annualized_return(0.1, 0), 0.0);
    }

    #[test]
    fn win_rate_bounds() {
        assert_eq!(PerformanceCalculator::win_rate(&[]), 0.0);
        let trades = vec![trade(50.0, 0.05, 3), trade(-20.0, -0.02, 2), trade(10.0, 0.01, 1)];
        let rate = PerformanceCalculator::win_rate(&trades);
        assert!((rate - 2.0 / 3.0).abs() < 1e-12);
        assert!((0.0..=1.0).contains(&rate));
    }

    #[test]
    fn profit_factor_edge_cases() {
        assert_eq!(PerformanceCalculator::profit_factor(&[]), 0.0);
        assert_eq!(
            PerformanceCalculator::profit_factor(&[trade(-10.0, -0.01, 1)]),
            0.0
        );
        assert_eq!(
            PerformanceCalculator::profit_factor(&[trade(10.0, 0.01, 1)]),
            f64::INFINITY
        );
        let mixed = vec![trade(100.0, 0.1, 1), trade(-50.0, -0.05, 1)];
        assert!((PerformanceCalculator::profit_factor(&mixed) - 2.0).abs() < 1e-12);
    }

    #[test]
    fn max_drawdown_tracks_running_peak() {
        let trades = vec![
            trade(1_000.0, 0.1, 1),  // equity 11000, peak 11000
            trade(-2_200.0, -0.2, 1), // equity 8800, drawdown 0.2
            trade(3_000.0, 0.3, 1),  // recovers
        ];
        let drawdown = PerformanceCalculator::max_drawdown(10_000.0, &trades);
        assert!((drawdown - 0.2).abs() < 1e-12);
        assert_eq!(PerformanceCalculator::max_drawdown(10_000.0, &[]), 0.0);
    }

    #[test]
    fn sharpe_is_zero_without_dispersion() {
        assert_eq!(PerformanceCalculator::sharpe_ratio(&[]), 0.0);
        assert_eq!(PerformanceCalculator::sharpe_ratio(&[trade(10.0, 0.01, 1)]), 0.0);
        let flat = vec![trade(10.0, 0.01, 1), trade(10.0, 0.01, 1)];
        assert_eq!(PerformanceCalculator::sharpe_ratio(&flat), 0.0);
    }

    #[test]
    fn sharpe_matches_hand_computation() {
        let trades = vec![trade(10.0, 0.02, 1), trade(-5.0, -0.01, 1)];
        let mean = 0.005;
        let std_dev = ((0.015f64.powi(2) + 0.015f64.powi(2)) / 1.0).sqrt();
        let expected = (mean - 0.02 / 252.0) / std_dev * 252f64.sqrt();
        let actual = PerformanceCalculator::sharpe_ratio(&trades);
        assert!((actual - expected).abs() < 1e-9);
    }

    #[test]
    fn avg_trade_duration_in_days() {
        let trades = vec![trade(0.0, 0.0, 2), trade(0.0, 0.0, 4)];
        assert!((PerformanceCalculator::avg_trade_duration(&trades) - 3.0).abs() < 1e-12);
        assert_eq!(PerformanceCalculator::avg_trade_duration(&[]), 0.0);
    }
}
