//! Single-symbol backtest simulation. The loop walks bars past the warm-up
//! boundary, evaluating conditions on the window ending at each bar, and
//! carries all run state in a local `SimulationState` value so concurrent
//! backtests over different symbols never share anything.

use chrono::{DateTime, Utc};
use log::debug;
use uuid::Uuid;

use crate::conditions;
use crate::error::EngineError;
use crate::models::{BacktestConfig, BacktestResult, ExitReason, PriceBar, Strategy, Trade};
use crate::performance::PerformanceCalculator;

/// Bars to skip before trading so indicator warm-up NaNs cannot drive
/// decisions. Series shorter than this are rejected.
pub const MIN_WARMUP_BARS: usize = 50;

#[derive(Debug)]
struct Position {
    quantity: i32,
    entry_price: f64,
    entry_date: DateTime<Utc>,
    entry_cost: f64,
    conditions_met: Vec<String>,
}

#[derive(Debug)]
struct SimulationState {
    cash: f64,
    position: Option<Position>,
    trades: Vec<Trade>,
}

pub fn run_backtest(
    strategy: &Strategy,
    symbol: &str,
    bars: &[PriceBar],
    config: &BacktestConfig,
) -> Result<BacktestResult, EngineError> {
    if bars.is_empty() {
        return Err(EngineError::EmptySeries {
            symbol: symbol.to_string(),
        });
    }
    if bars.len() < MIN_WARMUP_BARS {
        return Err(EngineError::InsufficientData {
            symbol: symbol.to_string(),
            available: bars.len(),
            required: MIN_WARMUP_BARS,
        });
    }

    let mut state = SimulationState {
        cash: config.initial_capital,
        position: None,
        trades: Vec::new(),
    };

    for i in MIN_WARMUP_BARS..bars.len() {
        let window = &bars[..=i];
        let bar = &bars[i];

        match state.position.take() {
            Some(position) => {
                if let Some(exit_reason) = exit_trigger(strategy, window, bar, &position) {
                    close_position(&mut state, symbol, bar, position, exit_reason, config);
                } else {
                    state.position = Some(position);
                }
            }
            None => {
                if let Some(descriptions) =
                    conditions::evaluate_all(window, &strategy.buy_conditions)
                {
                    try_open_position(&mut state, symbol, bar, descriptions, strategy, config);
                }
            }
        }
    }

    // An open position at the end of the series is marked to market but not
    // recorded as a trade.
    let last_close = bars[bars.len() - 1].close;
    let final_value = state.cash
        + state
            .position
            .as_ref()
            .map(|p| p.quantity as f64 * last_close)
            .unwrap_or(0.0);

    let total_return = PerformanceCalculator::total_return(config.initial_capital, final_value);
    Ok(BacktestResult {
        id: Uuid::new_v4().to_string(),
        symbol: symbol.to_string(),
        total_return,
        annualized_return: PerformanceCalculator::annualized_return(total_return, bars.len()),
        sharpe_ratio: PerformanceCalculator::sharpe_ratio(&state.trades),
        max_drawdown: PerformanceCalculator::max_drawdown(config.initial_capital, &state.trades),
        win_rate: PerformanceCalculator::win_rate(&state.trades),
        total_trades: state.trades.len() as i32,
        avg_trade_duration: PerformanceCalculator::avg_trade_duration(&state.trades),
        profit_factor: PerformanceCalculator::profit_factor(&state.trades),
        trades: state.trades,
        final_portfolio_value: final_value,
        created_at: Utc::now(),
    })
}

/// Exit precedence: sell signal, then stop-loss, then take-profit.
fn exit_trigger(
    strategy: &Strategy,
    window: &[PriceBar],
    bar: &PriceBar,
    position: &Position,
) -> Option<ExitReason> {
    if conditions::evaluate_all(window, &strategy.sell_conditions).is_some() {
        return Some(ExitReason::Sell);
    }
    let risk = &strategy.risk_management;
    if let Some(stop_loss) = risk.stop_loss {
        if bar.close <= position.entry_price * (1.0 - stop_loss) {
            return Some(ExitReason::StopLoss);
        }
    }
    if let Some(take_profit) = risk.take_profit {
        if bar.close >= position.entry_price * (1.0 + take_profit) {
            return Some(ExitReason::TakeProfit);
        }
    }
    None
}

fn try_open_position(
    state: &mut SimulationState,
    symbol: &str,
    bar: &PriceBar,
    conditions_met: Vec<String>,
    strategy: &Strategy,
    config: &BacktestConfig,
) {
    let fill_price = bar.close * (1.0 + config.slippage);
    if fill_price <= 0.0 {
        return;
    }
    let budget = state.cash * strategy.risk_management.position_size;
    let quantity = (budget / fill_price).floor() as i32;
    if quantity <= 0 {
        return;
    }
    let cost = quantity as f64 * fill_price * (1.0 + config.commission);
    if cost > state.cash {
        debug!(
            "{}: skipping entry at {:.2}, cost {:.2} exceeds cash {:.2}",
            symbol, fill_price, cost, state.cash
        );
        return;
    }

    state.cash -= cost;
    state.position = Some(Position {
        quantity,
        entry_price: fill_price,
        entry_date: bar.timestamp,
        entry_cost: cost,
        conditions_met,
    });
}

fn close_position(
    state: &mut SimulationState,
    symbol: &str,
    bar: &PriceBar,
    position: Position,
    exit_reason: ExitReason,
    config: &BacktestConfig,
) {
    let fill_price = bar.close * (1.0 - config.slippage);
    let proceeds = position.quantity as f64 * fill_price * (1.0 - config.commission);
    state.cash += proceeds;

    let profit_loss = proceeds - position.entry_cost;
    let return_pct = if position.entry_cost > 0.0 {
        profit_loss / position.entry_cost
    } else {
        0.0
    };

    state.trades.push(Trade {
        symbol: symbol.to_string(),
        entry_date: position.entry_date,
        exit_date: bar.timestamp,
        entry_price: position.entry_price,
        exit_price: fill_price,
        quantity: position.quantity,
        return_pct,
        profit_loss,
        duration_days: (bar.timestamp - position.entry_date).num_days(),
        exit_reason,
        conditions_met: position.conditions_met,
    });
}
