use std::sync::Arc;
use std::time::Duration;

use crate::error::TradingError;
use crate::models::order::{Order, OrderReceipt, OrderSide};
use crate::order_core::manager::OrderManager;
use crate::utils::{round_down_to_step, round_to_step};

/// Parameters for one TWAP execution.
#[derive(Debug, Clone)]
pub struct TwapPlan {
  pub symbol: String,
  pub side: OrderSide,
  pub total_quantity: f64,
  pub slices: usize,
  pub interval: Duration,
}

impl TwapPlan {
  pub fn new(
    symbol: impl Into<String>,
    side: OrderSide,
    total_quantity: f64,
    slices: usize,
    interval: Duration,
  ) -> Self {
    TwapPlan {
      symbol: symbol.into(),
      side,
      total_quantity,
      slices,
      interval,
    }
  }

  pub fn validate(&self, quantity_step: f64) -> Result<(), TradingError> {
    if self.total_quantity <= 0.0 {
      return Err(TradingError::Validation("Total quantity must be greater than 0".to_string()));
    }
    if self.slices < 1 {
      return Err(TradingError::Validation("Slice count must be at least 1".to_string()));
    }
    if self.total_quantity / (self.slices as f64) < quantity_step {
      return Err(TradingError::Validation(format!(
        "Per-slice quantity falls below the quantity step {}",
        quantity_step
      )));
    }
    Ok(())
  }
}

/// Outcome of a TWAP run. On a slice failure the receipts collected so far
/// are kept and `error` holds the failure; already-placed slices are never
/// rolled back.
#[derive(Debug)]
pub struct TwapReport {
  pub symbol: String,
  pub side: OrderSide,
  pub total_quantity: f64,
  pub slices: usize,
  pub receipts: Vec<OrderReceipt>,
  pub error: Option<TradingError>,
}

impl TwapReport {
  pub fn is_complete(&self) -> bool {
    self.error.is_none() && self.receipts.len() == self.slices
  }

  pub fn executed_quantity(&self) -> f64 {
    self.receipts.iter().map(|r| r.executed_quantity).sum()
  }

  /// Volume-weighted average fill price over the executed slices.
  pub fn avg_price(&self) -> f64 {
    let executed = self.executed_quantity();
    if executed <= 0.0 {
      return 0.0;
    }
    let cost: f64 = self.receipts.iter().map(|r| r.executed_quantity * r.avg_price).sum();
    cost / executed
  }
}

/// Splits a total quantity into equal market orders submitted at a fixed
/// interval, in strict slice order.
pub struct TwapRunner {
  orders: Arc<OrderManager>,
  quantity_step: f64,
}

impl TwapRunner {
  pub fn new(orders: Arc<OrderManager>, quantity_step: f64) -> Self {
    TwapRunner { orders, quantity_step }
  }

  /// Run the plan to completion or first failure. A plan that fails
  /// validation is rejected before any order is placed; an exchange failure
  /// mid-run stops further slices and is surfaced on the report.
  pub async fn run(&self, plan: &TwapPlan) -> Result<TwapReport, TradingError> {
    plan.validate(self.quantity_step)?;

    let quantities = slice_quantities(plan.total_quantity, plan.slices, self.quantity_step);
    log::info!(
      "TWAP start: {} {} {} in {} slices every {:?}",
      plan.side,
      plan.total_quantity,
      plan.symbol,
      plan.slices,
      plan.interval,
    );

    let mut report = TwapReport {
      symbol: plan.symbol.clone(),
      side: plan.side,
      total_quantity: plan.total_quantity,
      slices: plan.slices,
      receipts: Vec::with_capacity(plan.slices),
      error: None,
    };

    for (i, quantity) in quantities.iter().enumerate() {
      if i > 0 {
        tokio::time::sleep(plan.interval).await;
      }

      log::info!("TWAP slice {}/{}: {} {}", i + 1, plan.slices, quantity, plan.symbol);
      match self.orders.submit(Order::market(&plan.symbol, plan.side, *quantity)).await {
        Ok(receipt) => report.receipts.push(receipt),
        Err(e) => {
          log::error!("TWAP slice {}/{} failed: {}", i + 1, plan.slices, e);
          report.error = Some(e);
          break;
        }
      }
    }

    log::info!(
      "TWAP done: {}/{} slices, executed {} @ avg {}",
      report.receipts.len(),
      plan.slices,
      report.executed_quantity(),
      report.avg_price(),
    );
    Ok(report)
  }
}

/// Equal per-slice quantities rounded down to the quantity step; the final
/// slice absorbs the remainder so the sum stays within one step of the total.
pub fn slice_quantities(total: f64, slices: usize, step: f64) -> Vec<f64> {
  let base = round_down_to_step(total / slices as f64, step);
  let mut quantities = vec![base; slices];
  let remainder = total - base * (slices - 1) as f64;
  quantities[slices - 1] = round_to_step(remainder, step);
  quantities
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_even_split() {
    let quantities = slice_quantities(1.0, 4, 0.001);
    assert_eq!(quantities.len(), 4);
    for q in &quantities {
      assert!((q - 0.25).abs() < 1e-9);
    }
  }

  #[test]
  fn test_remainder_goes_to_last_slice() {
    let quantities = slice_quantities(1.0, 3, 0.001);
    assert!((quantities[0] - 0.333).abs() < 1e-9);
    assert!((quantities[1] - 0.333).abs() < 1e-9);
    assert!((quantities[2] - 0.334).abs() < 1e-9);

    let sum: f64 = quantities.iter().sum();
    assert!((sum - 1.0).abs() < 0.001);
  }

  #[test]
  fn test_single_slice_takes_everything() {
    let quantities = slice_quantities(0.7, 1, 0.001);
    assert_eq!(quantities.len(), 1);
    assert!((quantities[0] - 0.7).abs() < 1e-9);
  }

  #[test]
  fn test_plan_validation() {
    let plan = TwapPlan::new("BTCUSDT", OrderSide::Buy, 1.0, 4, Duration::from_secs(5));
    assert!(plan.validate(0.001).is_ok());

    let zero_qty = TwapPlan::new("BTCUSDT", OrderSide::Buy, 0.0, 4, Duration::from_secs(5));
    assert!(zero_qty.validate(0.001).is_err());

    let zero_slices = TwapPlan::new("BTCUSDT", OrderSide::Buy, 1.0, 0, Duration::from_secs(5));
    assert!(zero_slices.validate(0.001).is_err());

    // 1.0 over 2000 slices is below the 0.001 step
    let dust = TwapPlan::new("BTCUSDT", OrderSide::Buy, 1.0, 2000, Duration::from_secs(5));
    assert!(dust.validate(0.001).is_err());
  }
}
