use anyhow::anyhow;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::str::FromStr;

/// One OHLCV sample for a fixed interval. Series are ordered ascending by
/// timestamp with no duplicates; the engine treats them as immutable input.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceBar {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndicatorKind {
    Price,
    Sma,
    Ema,
    Rsi,
    Macd,
    Bollinger,
    Stochastic,
    Volume,
}

impl IndicatorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            IndicatorKind::Price => "price",
            IndicatorKind::Sma => "sma",
            IndicatorKind::Ema => "ema",
            IndicatorKind::Rsi => "rsi",
            IndicatorKind::Macd => "macd",
            IndicatorKind::Bollinger => "bollinger",
            IndicatorKind::Stochastic => "stochastic",
            IndicatorKind::Volume => "volume",
        }
    }

    /// Default lookback used when a condition does not override `period`.
    pub fn default_period(&self) -> usize {
        match self {
            IndicatorKind::Rsi | IndicatorKind::Stochastic => 14,
            _ => 20,
        }
    }
}

impl FromStr for IndicatorKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "price" => Ok(IndicatorKind::Price),
            "sma" => Ok(IndicatorKind::Sma),
            "ema" => Ok(IndicatorKind::Ema),
            "rsi" => Ok(IndicatorKind::Rsi),
            "macd" => Ok(IndicatorKind::Macd),
            "bollinger" => Ok(IndicatorKind::Bollinger),
            "stochastic" => Ok(IndicatorKind::Stochastic),
            "volume" => Ok(IndicatorKind::Volume),
            other => Err(anyhow!("Unknown indicator '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConditionOperator {
    #[serde(rename = ">")]
    GreaterThan,
    #[serde(rename = "<")]
    LessThan,
    #[serde(rename = ">=")]
    GreaterOrEqual,
    #[serde(rename = "<=")]
    LessOrEqual,
    #[serde(rename = "==")]
    Equal,
    #[serde(rename = "!=")]
    NotEqual,
    #[serde(rename = "crosses_above")]
    CrossesAbove,
    #[serde(rename = "crosses_below")]
    CrossesBelow,
}

impl ConditionOperator {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConditionOperator::GreaterThan => ">",
            ConditionOperator::LessThan => "<",
            ConditionOperator::GreaterOrEqual => ">=",
            ConditionOperator::LessOrEqual => "<=",
            ConditionOperator::Equal => "==",
            ConditionOperator::NotEqual => "!=",
            ConditionOperator::CrossesAbove => "crosses_above",
            ConditionOperator::CrossesBelow => "crosses_below",
        }
    }
}

/// Comparison target of a condition as it arrives over the wire: either a
/// number or a string that may reference another indicator (e.g. "sma_200").
/// Resolution into a concrete value happens once per evaluation in the
/// condition evaluator; unresolvable strings make the condition fail closed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CompareValue {
    Literal(f64),
    Text(String),
}

impl CompareValue {
    pub fn describe(&self) -> String {
        match self {
            CompareValue::Literal(value) => format!("{}", value),
            CompareValue::Text(text) => text.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StrategyCondition {
    pub indicator: IndicatorKind,
    pub operator: ConditionOperator,
    pub value: CompareValue,
    #[serde(default)]
    pub parameters: HashMap<String, f64>,
    /// Informational only; bar aggregation happens upstream.
    #[serde(default)]
    pub timeframe: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskManagement {
    /// Fractional stop distance below entry, e.g. 0.1 for -10%.
    #[serde(default)]
    pub stop_loss: Option<f64>,
    /// Fractional profit target above entry.
    #[serde(default)]
    pub take_profit: Option<f64>,
    /// Fraction of available cash committed per entry, in (0, 1].
    pub position_size: f64,
    pub max_positions: u32,
    #[serde(default)]
    pub risk_per_trade: f64,
}

impl Default for RiskManagement {
    fn default() -> Self {
        Self {
            stop_loss: None,
            take_profit: None,
            position_size: 0.1,
            max_positions: 1,
            risk_per_trade: 0.02,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetType {
    Deck,
    List,
    Asset,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetSelection {
    #[serde(rename = "type")]
    pub kind: TargetType,
    #[serde(default)]
    pub symbols: Vec<String>,
    #[serde(default)]
    pub deck_id: Option<String>,
}

/// A user-defined strategy. Immutable input to the engine; mutation lives
/// in the persistence layer, which is not this crate's concern.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Strategy {
    pub id: String,
    pub name: String,
    pub buy_conditions: Vec<StrategyCondition>,
    pub sell_conditions: Vec<StrategyCondition>,
    #[serde(default)]
    pub risk_management: RiskManagement,
    pub target_selection: TargetSelection,
}

impl Strategy {
    pub fn condition_count(&self) -> usize {
        self.buy_conditions.len() + self.sell_conditions.len()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitReason {
    Sell,
    StopLoss,
    TakeProfit,
}

impl ExitReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExitReason::Sell => "sell",
            ExitReason::StopLoss => "stop_loss",
            ExitReason::TakeProfit => "take_profit",
        }
    }
}

/// One completed round trip. Immutable once recorded.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Trade {
    pub symbol: String,
    pub entry_date: DateTime<Utc>,
    pub exit_date: DateTime<Utc>,
    pub entry_price: f64,
    pub exit_price: f64,
    pub quantity: i32,
    pub return_pct: f64,
    pub profit_loss: f64,
    pub duration_days: i64,
    pub exit_reason: ExitReason,
    pub conditions_met: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BacktestResult {
    pub id: String,
    pub symbol: String,
    pub total_return: f64,
    pub annualized_return: f64,
    pub sharpe_ratio: f64,
    pub max_drawdown: f64,
    pub win_rate: f64,
    pub total_trades: i32,
    pub avg_trade_duration: f64,
    pub profit_factor: f64,
    pub trades: Vec<Trade>,
    pub final_portfolio_value: f64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignalType {
    Buy,
    Sell,
}

impl SignalType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SignalType::Buy => "buy",
            SignalType::Sell => "sell",
        }
    }
}

/// Live-scan output. Created once, never mutated; persistence is the
/// caller's responsibility.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Signal {
    pub strategy_id: String,
    pub symbol: String,
    pub signal_type: SignalType,
    pub conditions: Vec<String>,
    pub confidence: f64,
    pub timestamp: DateTime<Utc>,
}

/// Run configuration supplied by the caller alongside the bar series.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BacktestConfig {
    #[serde(default)]
    pub start_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub end_date: Option<DateTime<Utc>>,
    #[serde(default = "default_initial_capital")]
    pub initial_capital: f64,
    #[serde(default = "default_commission")]
    pub commission: f64,
    #[serde(default = "default_slippage")]
    pub slippage: f64,
    /// Informational; benchmark comparison happens upstream.
    #[serde(default)]
    pub benchmark: Option<String>,
}

fn default_initial_capital() -> f64 {
    10_000.0
}

fn default_commission() -> f64 {
    0.001
}

fn default_slippage() -> f64 {
    0.0005
}

impl Default for BacktestConfig {
    fn default() -> Self {
        Self {
            start_date: None,
            end_date: None,
            initial_capital: default_initial_capital(),
            commission: default_commission(),
            slippage: default_slippage(),
            benchmark: None,
        }
    }
}

/// Per-symbol failure captured during a multi-symbol run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SymbolFailure {
    pub symbol: String,
    pub error: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateMetrics {
    pub total_symbols: i32,
    pub successful_backtests: i32,
    pub failed_backtests: i32,
    pub avg_total_return: f64,
    pub avg_sharpe_ratio: f64,
    pub avg_win_rate: f64,
    pub total_trades: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MultiBacktestReport {
    pub results: Vec<BacktestResult>,
    pub failures: Vec<SymbolFailure>,
    pub summary: AggregateMetrics,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanReport {
    pub signals: Vec<Signal>,
    pub failures: Vec<SymbolFailure>,
}

/// Validation outcome. Failure is data, not an error.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Validation {
    pub valid: bool,
    pub errors: Vec<String>,
}

impl Validation {
    pub fn ok() -> Self {
        Self {
            valid: true,
            errors: Vec::new(),
        }
    }

    pub fn failed(errors: Vec<String>) -> Self {
        Self {
            valid: false,
            errors,
        }
    }
}
