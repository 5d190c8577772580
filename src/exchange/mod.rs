pub mod binance_futures;
pub mod mocks;
pub mod traits;

pub use binance_futures::BinanceFuturesExchange;
pub use mocks::MockExchange;
pub use traits::Exchange;
