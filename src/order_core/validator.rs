use crate::error::TradingError;
use crate::models::order::Order;

/// Order validation interface. Validators run before any network call; a
/// rejected order never reaches the exchange.
pub trait OrderValidator: Send + Sync {
    fn validate(&self, order: &Order) -> Result<(), TradingError>;
}

/// Accepts USDT-M perpetual symbols only (uppercase letters ending in USDT).
pub struct SymbolValidator;

impl OrderValidator for SymbolValidator {
    fn validate(&self, order: &Order) -> Result<(), TradingError> {
        let symbol = &order.symbol;
        if symbol.is_empty() {
            return Err(TradingError::Validation("Symbol cannot be empty".to_string()));
        }
        let well_formed = symbol.len() > 4
            && symbol.ends_with("USDT")
            && symbol.chars().all(|c| c.is_ascii_uppercase());
        if !well_formed {
            return Err(TradingError::Validation(format!(
                "Invalid symbol {}: only USDT-M perpetuals are supported (e.g. BTCUSDT)",
                symbol
            )));
        }
        Ok(())
    }
}

/// Basic quantity checks.
pub struct QuantityValidator {
    min_order_size: f64,
}

impl QuantityValidator {
    pub fn new(min_order_size: f64) -> Self {
        QuantityValidator { min_order_size }
    }
}

impl OrderValidator for QuantityValidator {
    fn validate(&self, order: &Order) -> Result<(), TradingError> {
        if order.quantity <= 0.0 {
            return Err(TradingError::Validation("Quantity must be greater than 0".to_string()));
        }
        if order.quantity < self.min_order_size {
            return Err(TradingError::Validation(format!(
                "Quantity must be at least {}",
                self.min_order_size
            )));
        }
        Ok(())
    }
}

/// Enforces that price/stop-price presence matches the order type exactly:
/// a limit price on LIMIT and STOP_LIMIT only, a stop price on STOP_MARKET
/// and STOP_LIMIT only, and both positive when present.
pub struct PriceRuleValidator;

impl OrderValidator for PriceRuleValidator {
    fn validate(&self, order: &Order) -> Result<(), TradingError> {
        match (order.order_type.needs_price(), order.price) {
            (true, None) => {
                return Err(TradingError::Validation(format!(
                    "{} orders require a price",
                    order.order_type
                )))
            }
            (false, Some(_)) => {
                return Err(TradingError::Validation(format!(
                    "{} orders do not take a price",
                    order.order_type
                )))
            }
            (_, Some(price)) if price <= 0.0 => {
                return Err(TradingError::Validation("Price must be greater than 0".to_string()))
            }
            _ => {}
        }
        match (order.order_type.needs_stop_price(), order.stop_price) {
            (true, None) => {
                return Err(TradingError::Validation(format!(
                    "{} orders require a stop price",
                    order.order_type
                )))
            }
            (false, Some(_)) => {
                return Err(TradingError::Validation(format!(
                    "{} orders do not take a stop price",
                    order.order_type
                )))
            }
            (_, Some(stop_price)) if stop_price <= 0.0 => {
                return Err(TradingError::Validation("Stop price must be greater than 0".to_string()))
            }
            _ => {}
        }
        Ok(())
    }
}

/// The validator chain used by default: symbol format, quantity bounds,
/// price-field rules.
pub fn default_validators(min_order_size: f64) -> Vec<Box<dyn OrderValidator>> {
    vec![
        Box::new(SymbolValidator),
        Box::new(QuantityValidator::new(min_order_size)),
        Box::new(PriceRuleValidator),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::order::{Order, OrderSide};

    #[test]
    fn limit_without_price_is_rejected() {
        let mut order = Order::limit("BTCUSDT", OrderSide::Buy, 0.1, 50_000.0);
        order.price = None;
        assert!(PriceRuleValidator.validate(&order).is_err());
    }

    #[test]
    fn market_with_price_is_rejected() {
        let mut order = Order::market("BTCUSDT", OrderSide::Buy, 0.1);
        order.price = Some(50_000.0);
        assert!(PriceRuleValidator.validate(&order).is_err());
    }

    #[test]
    fn stop_limit_needs_both_prices() {
        let order = Order::stop_limit("BTCUSDT", OrderSide::Sell, 0.1, 49_000.0, 49_500.0);
        assert!(PriceRuleValidator.validate(&order).is_ok());

        let mut missing_stop = order.clone();
        missing_stop.stop_price = None;
        assert!(PriceRuleValidator.validate(&missing_stop).is_err());
    }

    #[test]
    fn symbol_format() {
        let order = Order::market("btcusdt", OrderSide::Buy, 0.1);
        assert!(SymbolValidator.validate(&order).is_err());

        let order = Order::market("BTCBUSD", OrderSide::Buy, 0.1);
        assert!(SymbolValidator.validate(&order).is_err());

        let order = Order::market("ETHUSDT", OrderSide::Buy, 0.1);
        assert!(SymbolValidator.validate(&order).is_ok());
    }

    #[test]
    fn quantity_bounds() {
        let validator = QuantityValidator::new(0.001);
        assert!(validator.validate(&Order::market("BTCUSDT", OrderSide::Buy, 0.0)).is_err());
        assert!(validator.validate(&Order::market("BTCUSDT", OrderSide::Buy, -1.0)).is_err());
        assert!(validator.validate(&Order::market("BTCUSDT", OrderSide::Buy, 0.0001)).is_err());
        assert!(validator.validate(&Order::market("BTCUSDT", OrderSide::Buy, 0.5)).is_ok());
    }
}
