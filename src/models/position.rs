use serde::{Deserialize, Serialize};

/// A futures position as reported by the exchange. `amount` is signed:
/// positive for long, negative for short.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Position {
    pub symbol: String,
    pub amount: f64,
    pub entry_price: f64,
    pub unrealized_pnl: f64,
    pub leverage: u32,
}

impl Position {
    pub fn new(symbol: impl Into<String>, amount: f64, entry_price: f64, leverage: u32) -> Self {
        Position {
            symbol: symbol.into(),
            amount,
            entry_price,
            unrealized_pnl: 0.0,
            leverage,
        }
    }

    pub fn is_long(&self) -> bool {
        self.amount > 0.0
    }

    pub fn is_short(&self) -> bool {
        self.amount < 0.0
    }

    pub fn is_flat(&self) -> bool {
        self.amount == 0.0
    }
}
