use std::collections::HashMap;

use async_trait::async_trait;

use crate::error::TradingError;
use crate::exchange::traits::Exchange;
use crate::models::balance::AccountBalance;
use crate::models::order::{Order, OrderId, OrderReceipt, OrderSide, OrderStatus, OrderType};
use crate::models::position::Position;
use crate::utils::current_timestamp_ms;

/// A mock implementation of the Exchange trait for testing and `--mock` runs.
///
/// Market orders fill immediately at the mark price. Limit orders rest until
/// the mark price crosses them; tests drive fills by moving the mark price
/// with [`MockExchange::set_price`]. `place_order` calls can be made to fail
/// after a set count to exercise partial-execution paths.
pub struct MockExchange {
    orders: HashMap<OrderId, OrderReceipt>,
    mark_prices: HashMap<String, f64>,
    positions: HashMap<String, Position>,
    leverages: HashMap<String, u32>,
    wallet_balance: f64,
    order_id_counter: u64,
    place_calls: usize,
    fail_place_after: Option<usize>,
}

impl MockExchange {
    pub fn new() -> Self {
        let mut exchange = Self {
            orders: HashMap::new(),
            mark_prices: HashMap::new(),
            positions: HashMap::new(),
            leverages: HashMap::new(),
            wallet_balance: 10_000.0,
            order_id_counter: 0,
            place_calls: 0,
            fail_place_after: None,
        };
        exchange.mark_prices.insert("BTCUSDT".to_string(), 50_000.0);
        exchange.mark_prices.insert("ETHUSDT".to_string(), 3_000.0);
        exchange
    }

    /// Succeed the first `n` `place_order` calls, fail every one after.
    pub fn fail_place_after(&mut self, n: usize) {
        self.fail_place_after = Some(n);
    }

    /// How many `place_order` calls have been made, including failed ones.
    pub fn place_calls(&self) -> usize {
        self.place_calls
    }

    /// Move the mark price and fill any resting limit order it crossed.
    pub fn set_price(&mut self, symbol: &str, price: f64) {
        self.mark_prices.insert(symbol.to_string(), price);

        let crossed: Vec<OrderId> = self
            .orders
            .values()
            .filter(|r| r.symbol == symbol && r.status.is_open() && r.order_type == OrderType::Limit)
            .filter(|r| match r.side {
                OrderSide::Buy => price <= r.avg_price,
                OrderSide::Sell => price >= r.avg_price,
            })
            .map(|r| r.order_id.clone())
            .collect();

        for order_id in crossed {
            self.fill_order(&order_id);
        }
    }

    pub fn open_order_count(&self, symbol: &str) -> usize {
        self.orders
            .values()
            .filter(|r| r.symbol == symbol && r.status.is_open())
            .count()
    }

    fn next_order_id(&mut self) -> OrderId {
        self.order_id_counter += 1;
        OrderId(format!("mock-{}", self.order_id_counter))
    }

    fn fill_order(&mut self, order_id: &OrderId) {
        let (symbol, side, quantity, price) = {
            let receipt = match self.orders.get_mut(order_id) {
                Some(r) => r,
                None => return,
            };
            receipt.status = OrderStatus::Filled;
            receipt.executed_quantity = receipt.orig_quantity;
            receipt.update_time = current_timestamp_ms();
            (receipt.symbol.clone(), receipt.side, receipt.orig_quantity, receipt.avg_price)
        };
        self.apply_fill(&symbol, side, quantity, price);
    }

    fn apply_fill(&mut self, symbol: &str, side: OrderSide, quantity: f64, price: f64) {
        let delta = match side {
            OrderSide::Buy => quantity,
            OrderSide::Sell => -quantity,
        };
        let leverage = self.leverages.get(symbol).copied().unwrap_or(1);
        let position = self
            .positions
            .entry(symbol.to_string())
            .or_insert_with(|| Position::new(symbol, 0.0, price, leverage));

        let previous = position.amount;
        position.amount += delta;
        if previous == 0.0 || previous.signum() != position.amount.signum() {
            position.entry_price = price;
        } else if previous.signum() == delta.signum() {
            // adding to the position: volume-weighted entry
            let total = previous.abs() + quantity;
            position.entry_price = (position.entry_price * previous.abs() + price * quantity) / total;
        }
    }
}

impl Default for MockExchange {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Exchange for MockExchange {
    async fn place_order(&mut self, order: Order) -> Result<OrderReceipt, TradingError> {
        self.place_calls += 1;
        if let Some(limit) = self.fail_place_after {
            if self.place_calls > limit {
                return Err(TradingError::Exchange("mock: order rejected by injection".to_string()));
            }
        }

        let mark = *self
            .mark_prices
            .get(&order.symbol)
            .ok_or_else(|| TradingError::Exchange(format!("mock: unknown symbol {}", order.symbol)))?;

        let order_id = self.next_order_id();
        let mut receipt = OrderReceipt {
            order_id: order_id.clone(),
            client_order_id: order.client_order_id.clone(),
            symbol: order.symbol.clone(),
            side: order.side,
            order_type: order.order_type,
            status: OrderStatus::New,
            orig_quantity: order.quantity,
            executed_quantity: 0.0,
            // resting price for limit orders, mark price otherwise
            avg_price: order.price.unwrap_or(mark),
            update_time: current_timestamp_ms(),
        };

        let fills_now = match order.order_type {
            OrderType::Market => true,
            OrderType::Limit => {
                // strict comparison: an order at the touch rests in the book
                let price = order.price.unwrap_or(mark);
                match order.side {
                    OrderSide::Buy => price > mark,
                    OrderSide::Sell => price < mark,
                }
            }
            // stop orders rest until triggered; the mock never triggers them
            OrderType::StopMarket | OrderType::StopLimit => false,
        };

        if fills_now {
            receipt.status = OrderStatus::Filled;
            receipt.executed_quantity = order.quantity;
            if order.order_type == OrderType::Market {
                receipt.avg_price = mark;
            }
            self.apply_fill(&order.symbol, order.side, order.quantity, receipt.avg_price);
        }

        self.orders.insert(order_id, receipt.clone());
        Ok(receipt)
    }

    async fn cancel_order(&mut self, _symbol: &str, order_id: &OrderId) -> Result<bool, TradingError> {
        match self.orders.get_mut(order_id) {
            Some(receipt) if receipt.status.is_open() => {
                receipt.status = OrderStatus::Cancelled;
                receipt.update_time = current_timestamp_ms();
                Ok(true)
            }
            Some(_) => Ok(false),
            None => Err(TradingError::OrderNotFound(order_id.clone())),
        }
    }

    async fn cancel_all(&mut self, symbol: &str) -> Result<usize, TradingError> {
        let open: Vec<OrderId> = self
            .orders
            .values()
            .filter(|r| r.symbol == symbol && r.status.is_open())
            .map(|r| r.order_id.clone())
            .collect();
        for order_id in &open {
            if let Some(receipt) = self.orders.get_mut(order_id) {
                receipt.status = OrderStatus::Cancelled;
            }
        }
        Ok(open.len())
    }

    async fn get_order_status(&self, _symbol: &str, order_id: &OrderId) -> Result<OrderStatus, TradingError> {
        self.orders
            .get(order_id)
            .map(|r| r.status)
            .ok_or_else(|| TradingError::OrderNotFound(order_id.clone()))
    }

    async fn get_open_orders(&self, symbol: &str) -> Result<Vec<OrderReceipt>, TradingError> {
        Ok(self
            .orders
            .values()
            .filter(|r| r.symbol == symbol && r.status.is_open())
            .cloned()
            .collect())
    }

    async fn get_price(&self, symbol: &str) -> Result<f64, TradingError> {
        self.mark_prices
            .get(symbol)
            .copied()
            .ok_or_else(|| TradingError::Exchange(format!("mock: unknown symbol {}", symbol)))
    }

    async fn get_balance(&self) -> Result<AccountBalance, TradingError> {
        let unrealized: f64 = self
            .positions
            .values()
            .map(|p| {
                let mark = self.mark_prices.get(&p.symbol).copied().unwrap_or(p.entry_price);
                (mark - p.entry_price) * p.amount
            })
            .sum();
        Ok(AccountBalance::new(self.wallet_balance, self.wallet_balance, unrealized))
    }

    async fn get_position(&self, symbol: &str) -> Result<Option<Position>, TradingError> {
        let position = match self.positions.get(symbol) {
            Some(p) if !p.is_flat() => p.clone(),
            _ => return Ok(None),
        };
        let mark = self.mark_prices.get(symbol).copied().unwrap_or(position.entry_price);
        let mut position = position;
        position.unrealized_pnl = (mark - position.entry_price) * position.amount;
        Ok(Some(position))
    }

    async fn set_leverage(&mut self, symbol: &str, leverage: u32) -> Result<bool, TradingError> {
        self.leverages.insert(symbol.to_string(), leverage);
        if let Some(position) = self.positions.get_mut(symbol) {
            position.leverage = leverage;
        }
        Ok(true)
    }
}
