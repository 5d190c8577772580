//! Binance USDT-M futures testnet trading bot
//!
//! Order primitives behind a validated façade, plus two execution
//! strategies: TWAP slicing and grid trading.

pub mod cli;
pub mod config;
pub mod core;
pub mod error;
pub mod exchange;
pub mod models;
pub mod order_core;
pub mod utils;

// Core type re-exports
pub use crate::core::{GridHandle, GridPlan, GridRunner, TwapPlan, TwapReport, TwapRunner};
pub use crate::error::TradingError;
pub use crate::exchange::traits::Exchange;
pub use crate::models::balance::AccountBalance;
pub use crate::models::order::{Order, OrderId, OrderReceipt, OrderSide, OrderStatus, OrderType};
pub use crate::models::position::Position;
pub use crate::order_core::OrderManager;

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Result type alias
pub type Result<T> = std::result::Result<T, TradingError>;
