//! Structural validation of a strategy definition. Pure check over the
//! deserialized value; failures come back as data, never as errors.

use crate::models::{Strategy, TargetType, Validation};

const MAX_NAME_LEN: usize = 100;

pub fn validate_strategy(strategy: &Strategy) -> Validation {
    let mut errors = Vec::new();

    let name = strategy.name.trim();
    if name.is_empty() {
        errors.push("name must be non-empty".to_string());
    } else if name.len() > MAX_NAME_LEN {
        errors.push(format!("name must be at most {MAX_NAME_LEN} characters"));
    }

    if strategy.buy_conditions.is_empty() {
        errors.push("strategy must define at least one buy condition".to_string());
    }
    if strategy.sell_conditions.is_empty() {
        errors.push("strategy must define at least one sell condition".to_string());
    }

    let risk = &strategy.risk_management;
    if !(risk.position_size > 0.0 && risk.position_size <= 1.0) {
        errors.push("positionSize must be in (0, 1]".to_string());
    }
    if let Some(stop_loss) = risk.stop_loss {
        if !(stop_loss > 0.0 && stop_loss <= 1.0) {
            errors.push("stopLoss must be in (0, 1]".to_string());
        }
    }
    if let Some(take_profit) = risk.take_profit {
        if !(take_profit > 0.0) {
            errors.push("takeProfit must be greater than 0".to_string());
        }
    }
    if risk.max_positions < 1 {
        errors.push("maxPositions must be at least 1".to_string());
    }
    if !(0.0..=1.0).contains(&risk.risk_per_trade) {
        errors.push("riskPerTrade must be in [0, 1]".to_string());
    }

    let target = &strategy.target_selection;
    match target.kind {
        TargetType::Asset | TargetType::List => {
            if target.symbols.is_empty() {
                errors.push("target selection must list at least one symbol".to_string());
            }
        }
        TargetType::Deck => {
            if target.deck_id.as_deref().map_or(true, |id| id.trim().is_empty()) {
                errors.push("deck target selection must carry a deck id".to_string());
            }
        }
    }

    if errors.is_empty() {
        Validation::ok()
    } else {
        Validation::failed(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        CompareValue, ConditionOperator, IndicatorKind, RiskManagement, StrategyCondition,
        TargetSelection,
    };
    use std::collections::HashMap;

    fn condition() -> StrategyCondition {
        StrategyCondition {
            indicator: IndicatorKind::Rsi,
            operator: ConditionOperator::LessThan,
            value: CompareValue::Literal(30.0),
            parameters: HashMap::new(),
            timeframe: None,
        }
    }

    fn valid_strategy() -> Strategy {
        Strategy {
            id: "s-1".to_string(),
            name: "RSI reversal".to_string(),
            buy_conditions: vec![condition()],
            sell_conditions: vec![condition()],
            risk_management: RiskManagement::default(),
            target_selection: TargetSelection {
                kind: TargetType::Asset,
                symbols: vec!["AAPL".to_string()],
                deck_id: None,
            },
        }
    }

    #[test]
    fn well_formed_strategy_passes() {
        let validation = validate_strategy(&valid_strategy());
        assert!(validation.valid);
        assert!(validation.errors.is_empty());
    }

    #[test]
    fn validation_is_idempotent() {
        let strategy = valid_strategy();
        let first = validate_strategy(&strategy);
        let second = validate_strategy(&strategy);
        assert!(first.valid && second.valid);
        assert_eq!(first.errors, second.errors);
    }

    #[test]
    fn rejects_missing_name_and_conditions() {
        let mut strategy = valid_strategy();
        strategy.name = "  ".to_string();
        strategy.buy_conditions.clear();
        strategy.sell_conditions.clear();

        let validation = validate_strategy(&strategy);
        assert!(!validation.valid);
        assert_eq!(validation.errors.len(), 3);
    }

    #[test]
    fn rejects_out_of_range_risk_parameters() {
        let mut strategy = valid_strategy();
        strategy.risk_management = RiskManagement {
            stop_loss: Some(1.5),
            take_profit: Some(0.0),
            position_size: 0.0,
            max_positions: 0,
            risk_per_trade: 2.0,
        };

        let validation = validate_strategy(&strategy);
        assert!(!validation.valid);
        assert!(validation.errors.iter().any(|e| e.contains("positionSize")));
        assert!(validation.errors.iter().any(|e| e.contains("stopLoss")));
        assert!(validation.errors.iter().any(|e| e.contains("takeProfit")));
        assert!(validation.errors.iter().any(|e| e.contains("maxPositions")));
        assert!(validation.errors.iter().any(|e| e.contains("riskPerTrade")));
    }

    #[test]
    fn rejects_inconsistent_target_selection() {
        let mut asset = valid_strategy();
        asset.target_selection.symbols.clear();
        assert!(!validate_strategy(&asset).valid);

        let mut deck = valid_strategy();
        deck.target_selection = TargetSelection {
            kind: TargetType::Deck,
            symbols: vec![],
            deck_id: None,
        };
        assert!(!validate_strategy(&deck).valid);

        deck.target_selection.deck_id = Some("deck-7".to_string());
        assert!(validate_strategy(&deck).valid);
    }
}
