use async_trait::async_trait;

use crate::error::TradingError;
use crate::models::balance::AccountBalance;
use crate::models::order::{Order, OrderId, OrderReceipt, OrderStatus};
use crate::models::position::Position;

/// The `Exchange` trait defines the interface for interacting with the
/// futures exchange. It is implemented by the real testnet connector and by
/// mock implementations used in tests.
#[async_trait]
pub trait Exchange: Send + Sync {
    /// Submit a new order to the exchange
    async fn place_order(&mut self, order: Order) -> Result<OrderReceipt, TradingError>;

    /// Cancel an existing order. Returns false if the order was no longer open.
    async fn cancel_order(&mut self, symbol: &str, order_id: &OrderId) -> Result<bool, TradingError>;

    /// Cancel every open order on a symbol, returning how many were open.
    async fn cancel_all(&mut self, symbol: &str) -> Result<usize, TradingError>;

    /// Get the current status of an order
    async fn get_order_status(&self, symbol: &str, order_id: &OrderId) -> Result<OrderStatus, TradingError>;

    /// Get all open orders for a symbol
    async fn get_open_orders(&self, symbol: &str) -> Result<Vec<OrderReceipt>, TradingError>;

    /// Get the current mark/last price for a symbol
    async fn get_price(&self, symbol: &str) -> Result<f64, TradingError>;

    /// Get the futures account balance
    async fn get_balance(&self) -> Result<AccountBalance, TradingError>;

    /// Get the current position for a symbol, if any is open
    async fn get_position(&self, symbol: &str) -> Result<Option<Position>, TradingError>;

    /// Set leverage for a symbol. Returns true on success.
    async fn set_leverage(&mut self, symbol: &str, leverage: u32) -> Result<bool, TradingError>;
}
