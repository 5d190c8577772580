use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::TradingError;
use crate::exchange::traits::Exchange;
use crate::models::balance::AccountBalance;
use crate::models::order::{Order, OrderId, OrderReceipt, OrderStatus};
use crate::models::position::Position;
use crate::order_core::validator::OrderValidator;

/// Order façade: validates requests, then forwards them to the exchange
/// unchanged. No retry logic lives here; a transient exchange failure
/// propagates to the caller.
pub struct OrderManager {
    exchange: Arc<RwLock<dyn Exchange>>,
    validators: Vec<Box<dyn OrderValidator>>,
    max_leverage: u32,
}

impl OrderManager {
    pub fn new(exchange: Arc<RwLock<dyn Exchange>>) -> Self {
        OrderManager {
            exchange,
            validators: Vec::new(),
            max_leverage: 125,
        }
    }

    pub fn add_validator(&mut self, validator: Box<dyn OrderValidator>) {
        self.validators.push(validator);
    }

    pub fn with_validators(mut self, validators: Vec<Box<dyn OrderValidator>>) -> Self {
        self.validators = validators;
        self
    }

    pub fn with_max_leverage(mut self, max_leverage: u32) -> Self {
        self.max_leverage = max_leverage;
        self
    }

    /// Validate and submit an order. Validation failures never reach the
    /// exchange.
    pub async fn submit(&self, mut order: Order) -> Result<OrderReceipt, TradingError> {
        for validator in &self.validators {
            validator.validate(&order)?;
        }

        if order.client_order_id.is_none() {
            order.client_order_id = Some(Uuid::new_v4().to_string());
        }

        log::info!(
            "Placing {} {} order: {} {} {}",
            order.order_type,
            order.side,
            order.quantity,
            order.symbol,
            order
                .price
                .map(|p| format!("@ {}", p))
                .unwrap_or_default(),
        );

        let receipt = {
            let mut exchange = self.exchange.write().await;
            exchange.place_order(order).await?
        };

        log::info!("Order placed | id: {} status: {:?}", receipt.order_id, receipt.status);
        Ok(receipt)
    }

    pub async fn cancel(&self, symbol: &str, order_id: &OrderId) -> Result<bool, TradingError> {
        let cancelled = {
            let mut exchange = self.exchange.write().await;
            exchange.cancel_order(symbol, order_id).await?
        };
        if cancelled {
            log::info!("Order {} cancelled", order_id);
        } else {
            log::warn!("Order {} was no longer open", order_id);
        }
        Ok(cancelled)
    }

    pub async fn cancel_all(&self, symbol: &str) -> Result<usize, TradingError> {
        let count = {
            let mut exchange = self.exchange.write().await;
            exchange.cancel_all(symbol).await?
        };
        log::info!("Cancelled {} open orders for {}", count, symbol);
        Ok(count)
    }

    pub async fn order_status(&self, symbol: &str, order_id: &OrderId) -> Result<OrderStatus, TradingError> {
        let exchange = self.exchange.read().await;
        exchange.get_order_status(symbol, order_id).await
    }

    pub async fn open_orders(&self, symbol: &str) -> Result<Vec<OrderReceipt>, TradingError> {
        let exchange = self.exchange.read().await;
        exchange.get_open_orders(symbol).await
    }

    pub async fn price(&self, symbol: &str) -> Result<f64, TradingError> {
        let exchange = self.exchange.read().await;
        exchange.get_price(symbol).await
    }

    pub async fn balance(&self) -> Result<AccountBalance, TradingError> {
        let exchange = self.exchange.read().await;
        exchange.get_balance().await
    }

    pub async fn position(&self, symbol: &str) -> Result<Option<Position>, TradingError> {
        let exchange = self.exchange.read().await;
        exchange.get_position(symbol).await
    }

    pub async fn set_leverage(&self, symbol: &str, leverage: u32) -> Result<bool, TradingError> {
        if leverage < 1 || leverage > self.max_leverage {
            return Err(TradingError::Validation(format!(
                "Leverage must be between 1 and {}",
                self.max_leverage
            )));
        }
        let ok = {
            let mut exchange = self.exchange.write().await;
            exchange.set_leverage(symbol, leverage).await?
        };
        if ok {
            log::info!("Leverage set to {}x for {}", leverage, symbol);
        }
        Ok(ok)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exchange::mocks::MockExchange;
    use crate::models::order::OrderSide;
    use crate::order_core::validator::default_validators;

    fn manager_with_mock() -> (OrderManager, Arc<RwLock<MockExchange>>) {
        let exchange = Arc::new(RwLock::new(MockExchange::new()));
        let manager = OrderManager::new(exchange.clone()).with_validators(default_validators(0.001));
        (manager, exchange)
    }

    #[tokio::test]
    async fn market_order_round_trip() {
        let (manager, _) = manager_with_mock();
        let receipt = manager
            .submit(Order::market("BTCUSDT", OrderSide::Buy, 0.5))
            .await
            .unwrap();
        assert_eq!(receipt.status, OrderStatus::Filled);
        assert_eq!(receipt.executed_quantity, 0.5);
    }

    #[tokio::test]
    async fn invalid_order_never_reaches_the_exchange() {
        let (manager, exchange) = manager_with_mock();
        let result = manager.submit(Order::market("BTCUSDT", OrderSide::Buy, 0.0)).await;
        assert!(matches!(result, Err(TradingError::Validation(_))));
        assert_eq!(exchange.read().await.place_calls(), 0);
    }

    #[tokio::test]
    async fn leverage_bounds_are_enforced() {
        let (manager, _) = manager_with_mock();
        assert!(manager.set_leverage("BTCUSDT", 0).await.is_err());
        assert!(manager.set_leverage("BTCUSDT", 126).await.is_err());
        assert!(manager.set_leverage("BTCUSDT", 10).await.unwrap());
    }
}
