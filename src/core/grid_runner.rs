use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio::time::interval;

use crate::error::TradingError;
use crate::models::order::{Order, OrderId, OrderSide, OrderStatus};
use crate::order_core::manager::OrderManager;

/// Parameters for one grid session.
#[derive(Debug, Clone)]
pub struct GridPlan {
  pub symbol: String,
  pub lower: f64,
  pub upper: f64,
  pub levels: usize,
  pub quantity_per_level: f64,
  /// Side used for a level sitting exactly on the current price. The default
  /// is Sell: a resting sell at the touch does not cross the book, while a
  /// buy there would lift the offer.
  pub tie_break: OrderSide,
}

impl GridPlan {
  pub fn new(
    symbol: impl Into<String>,
    lower: f64,
    upper: f64,
    levels: usize,
    quantity_per_level: f64,
  ) -> Self {
    GridPlan {
      symbol: symbol.into(),
      lower,
      upper,
      levels,
      quantity_per_level,
      tie_break: OrderSide::Sell,
    }
  }

  pub fn with_tie_break(mut self, tie_break: OrderSide) -> Self {
    self.tie_break = tie_break;
    self
  }

  pub fn validate(&self) -> Result<(), TradingError> {
    if self.lower <= 0.0 {
      return Err(TradingError::Validation("Lower bound must be greater than 0".to_string()));
    }
    if self.lower >= self.upper {
      return Err(TradingError::Validation("Lower bound must be less than upper bound".to_string()));
    }
    if self.levels < 2 {
      return Err(TradingError::Validation("A grid needs at least 2 levels".to_string()));
    }
    if self.quantity_per_level <= 0.0 {
      return Err(TradingError::Validation("Quantity per level must be greater than 0".to_string()));
    }
    Ok(())
  }

  /// Evenly spaced, strictly increasing level prices from lower to upper.
  pub fn level_prices(&self) -> Vec<f64> {
    let step = (self.upper - self.lower) / (self.levels - 1) as f64;
    (0..self.levels).map(|k| self.lower + k as f64 * step).collect()
  }
}

/// Side for a level given the current price: buy below, sell above, the
/// plan's tie-break side exactly at it. Never produces a crossing order.
pub fn side_for_level(level_price: f64, current_price: f64, tie_break: OrderSide) -> OrderSide {
  if level_price < current_price {
    OrderSide::Buy
  } else if level_price > current_price {
    OrderSide::Sell
  } else {
    tie_break
  }
}

/// One rung of the ladder. `side` is the side of the order currently (or
/// next to be) resting at this price; it flips on every fill.
#[derive(Debug, Clone)]
pub struct GridLevel {
  pub price: f64,
  pub side: OrderSide,
  pub order_id: Option<OrderId>,
  pub fills: usize,
  pub terminal: bool,
}

/// Places the initial ladder and hands out a [`GridHandle`] whose polling
/// task keeps it refilled until stopped.
pub struct GridRunner {
  orders: Arc<OrderManager>,
  poll_interval: Duration,
}

impl GridRunner {
  pub fn new(orders: Arc<OrderManager>, poll_interval: Duration) -> Self {
    GridRunner { orders, poll_interval }
  }

  pub async fn start(&self, plan: GridPlan) -> Result<GridHandle, TradingError> {
    plan.validate()?;

    let current_price = self.orders.price(&plan.symbol).await?;
    if current_price < plan.lower || current_price > plan.upper {
      return Err(TradingError::Validation(format!(
        "Current price {} is outside the grid range {}..{}",
        current_price, plan.lower, plan.upper
      )));
    }

    log::info!(
      "Grid start: {} levels on {} between {} and {}, current price {}",
      plan.levels,
      plan.symbol,
      plan.lower,
      plan.upper,
      current_price,
    );

    // Initial ladder. A failed placement leaves the level empty; the polling
    // task retries it on the next cycle.
    let mut levels = Vec::with_capacity(plan.levels);
    for price in plan.level_prices() {
      let side = side_for_level(price, current_price, plan.tie_break);
      let order = Order::limit(&plan.symbol, side, plan.quantity_per_level, price);
      let order_id = match self.orders.submit(order).await {
        Ok(receipt) => Some(receipt.order_id),
        Err(e) => {
          log::warn!("Grid {} order at {} failed: {} (will retry)", side, price, e);
          None
        }
      };
      levels.push(GridLevel {
        price,
        side,
        order_id,
        fills: 0,
        terminal: false,
      });
    }

    let active = Arc::new(RwLock::new(true));
    let levels = Arc::new(RwLock::new(levels));

    let task = {
      let orders = self.orders.clone();
      let active = active.clone();
      let levels = levels.clone();
      let symbol = plan.symbol.clone();
      let quantity = plan.quantity_per_level;
      let poll_interval = self.poll_interval;

      tokio::spawn(async move {
        let mut ticker = interval(poll_interval);
        ticker.tick().await; // the first tick completes immediately

        loop {
          ticker.tick().await;
          let mut levels = levels.write().await;
          if !*active.read().await {
            break;
          }
          poll_cycle(&orders, &symbol, quantity, &mut levels).await;
        }
        log::info!("Grid polling loop for {} stopped", symbol);
      })
    };

    Ok(GridHandle {
      symbol: plan.symbol,
      orders: self.orders.clone(),
      active,
      levels,
      task: Some(task),
    })
  }
}

/// One pass over the ladder: restore empty levels, flip filled ones. A
/// failed submission is logged and retried on the next cycle; a single
/// failed call never terminates the runner.
async fn poll_cycle(orders: &OrderManager, symbol: &str, quantity: f64, levels: &mut [GridLevel]) {
  for level in levels.iter_mut() {
    if level.terminal {
      continue;
    }

    let order_id = match &level.order_id {
      None => {
        match orders.submit(Order::limit(symbol, level.side, quantity, level.price)).await {
          Ok(receipt) => level.order_id = Some(receipt.order_id),
          Err(e) => log::warn!("Grid {} order at {} failed: {} (will retry)", level.side, level.price, e),
        }
        continue;
      }
      Some(order_id) => order_id.clone(),
    };

    let status = match orders.order_status(symbol, &order_id).await {
      Ok(status) => status,
      Err(e) => {
        log::warn!("Failed to poll grid order {}: {}", order_id, e);
        continue;
      }
    };

    match status {
      OrderStatus::Filled => {
        level.fills += 1;
        level.side = level.side.opposite();
        level.order_id = None;
        log::info!(
          "Grid level {} filled ({} round trips), replacing with {}",
          level.price,
          level.fills,
          level.side,
        );
        match orders.submit(Order::limit(symbol, level.side, quantity, level.price)).await {
          Ok(receipt) => level.order_id = Some(receipt.order_id),
          Err(e) => log::warn!("Grid replacement at {} failed: {} (will retry)", level.price, e),
        }
      }
      OrderStatus::Cancelled => {
        // cancelled outside the runner: the level is done
        log::warn!("Grid order {} at {} cancelled externally", order_id, level.price);
        level.order_id = None;
        level.terminal = true;
      }
      OrderStatus::Rejected | OrderStatus::Expired => {
        level.order_id = None;
      }
      OrderStatus::New | OrderStatus::PartiallyFilled => {}
    }
  }
}

/// Handle to a running grid. Stopping is cooperative: the polling task is
/// signalled at its next cycle and never preempted mid-submission.
pub struct GridHandle {
  symbol: String,
  orders: Arc<OrderManager>,
  active: Arc<RwLock<bool>>,
  levels: Arc<RwLock<Vec<GridLevel>>>,
  task: Option<JoinHandle<()>>,
}

impl GridHandle {
  pub fn symbol(&self) -> &str {
    &self.symbol
  }

  pub async fn is_active(&self) -> bool {
    *self.active.read().await
  }

  /// Snapshot of the ladder state.
  pub async fn levels(&self) -> Vec<GridLevel> {
    self.levels.read().await.clone()
  }

  /// Completed buy/sell round trips across all levels.
  pub async fn total_fills(&self) -> usize {
    self.levels.read().await.iter().map(|l| l.fills).sum()
  }

  /// Stop the grid and cancel every order still pending. Filled orders are
  /// not reversed. Stopping an already-stopped grid is a no-op.
  pub async fn stop(&mut self) -> Result<usize, TradingError> {
    let mut levels = self.levels.write().await;
    {
      let mut active = self.active.write().await;
      if !*active {
        return Ok(0);
      }
      *active = false;
    }

    let mut cancelled = 0;
    for level in levels.iter_mut() {
      if let Some(order_id) = level.order_id.take() {
        match self.orders.cancel(&self.symbol, &order_id).await {
          Ok(true) => cancelled += 1,
          Ok(false) => {}
          Err(e) => log::warn!("Failed to cancel grid order {}: {}", order_id, e),
        }
      }
      level.terminal = true;
    }
    let fills: usize = levels.iter().map(|l| l.fills).sum();
    drop(levels); // let the polling task observe the stop and exit

    if let Some(task) = self.task.take() {
      let _ = task.await;
    }

    log::info!(
      "Grid stopped: {} orders cancelled, {} round trips completed",
      cancelled,
      fills,
    );
    Ok(cancelled)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_level_prices_are_evenly_spaced() {
    let plan = GridPlan::new("BTCUSDT", 100.0, 110.0, 3, 0.1);
    let prices = plan.level_prices();
    assert_eq!(prices, vec![100.0, 105.0, 110.0]);
  }

  #[test]
  fn test_level_prices_strictly_increasing() {
    let plan = GridPlan::new("BTCUSDT", 40_000.0, 60_000.0, 21, 0.01);
    let prices = plan.level_prices();
    assert_eq!(prices.len(), 21);
    for pair in prices.windows(2) {
      assert!(pair[0] < pair[1]);
    }
    assert_eq!(prices[0], 40_000.0);
    assert_eq!(prices[20], 60_000.0);
  }

  #[test]
  fn test_side_for_level() {
    assert_eq!(side_for_level(100.0, 105.0, OrderSide::Sell), OrderSide::Buy);
    assert_eq!(side_for_level(110.0, 105.0, OrderSide::Sell), OrderSide::Sell);
    // exactly at the price: the tie-break side wins
    assert_eq!(side_for_level(105.0, 105.0, OrderSide::Sell), OrderSide::Sell);
    assert_eq!(side_for_level(105.0, 105.0, OrderSide::Buy), OrderSide::Buy);
  }

  #[test]
  fn test_plan_validation() {
    assert!(GridPlan::new("BTCUSDT", 100.0, 110.0, 3, 0.1).validate().is_ok());
    assert!(GridPlan::new("BTCUSDT", 110.0, 100.0, 3, 0.1).validate().is_err());
    assert!(GridPlan::new("BTCUSDT", 100.0, 110.0, 1, 0.1).validate().is_err());
    assert!(GridPlan::new("BTCUSDT", 100.0, 110.0, 3, 0.0).validate().is_err());
    assert!(GridPlan::new("BTCUSDT", 0.0, 110.0, 3, 0.1).validate().is_err());
  }
}
