use serde::{Deserialize, Serialize};

/// USDT-M futures account balance summary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountBalance {
    pub total_wallet_balance: f64,
    pub available_balance: f64,
    pub total_unrealized_profit: f64,
}

impl AccountBalance {
    pub fn new(total_wallet_balance: f64, available_balance: f64, total_unrealized_profit: f64) -> Self {
        AccountBalance {
            total_wallet_balance,
            available_balance,
            total_unrealized_profit,
        }
    }
}
