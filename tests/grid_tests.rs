//! Grid runner integration tests
//!
//! Fills are driven by moving the mock mark price, then letting the polling
//! task observe them on the paused tokio clock.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;

use xTrader::core::grid_runner::{GridPlan, GridRunner};
use xTrader::exchange::mocks::MockExchange;
use xTrader::models::order::OrderSide;
use xTrader::order_core::manager::OrderManager;
use xTrader::order_core::validator::default_validators;
use xTrader::TradingError;

const POLL: Duration = Duration::from_millis(100);

fn runner_with_mock() -> (GridRunner, Arc<RwLock<MockExchange>>) {
    let exchange = Arc::new(RwLock::new(MockExchange::new()));
    let manager = OrderManager::new(exchange.clone()).with_validators(default_validators(0.001));
    (GridRunner::new(Arc::new(manager), POLL), exchange)
}

/// Long enough for the polling task to run at least one full cycle.
async fn let_poll_run() {
    tokio::time::sleep(POLL * 3).await;
}

#[tokio::test(start_paused = true)]
async fn ladder_sides_follow_the_current_price() {
    let (runner, exchange) = runner_with_mock();
    exchange.write().await.set_price("BTCUSDT", 105.0);

    let mut handle = runner
        .start(GridPlan::new("BTCUSDT", 100.0, 110.0, 3, 0.1))
        .await
        .unwrap();

    let levels = handle.levels().await;
    assert_eq!(levels.len(), 3);
    assert_eq!(levels[0].price, 100.0);
    assert_eq!(levels[0].side, OrderSide::Buy);
    // the level at the current price takes the non-crossing tie-break side
    assert_eq!(levels[1].price, 105.0);
    assert_eq!(levels[1].side, OrderSide::Sell);
    assert_eq!(levels[2].price, 110.0);
    assert_eq!(levels[2].side, OrderSide::Sell);

    // nothing crossed: every order is still resting
    assert_eq!(exchange.read().await.open_order_count("BTCUSDT"), 3);

    handle.stop().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn tie_break_is_configurable() {
    let (runner, exchange) = runner_with_mock();
    exchange.write().await.set_price("BTCUSDT", 105.0);

    let plan = GridPlan::new("BTCUSDT", 100.0, 110.0, 3, 0.1).with_tie_break(OrderSide::Buy);
    let mut handle = runner.start(plan).await.unwrap();

    let levels = handle.levels().await;
    assert_eq!(levels[1].side, OrderSide::Buy);
    assert_eq!(exchange.read().await.open_order_count("BTCUSDT"), 3);

    handle.stop().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn filled_level_is_replaced_with_the_opposite_side() {
    let (runner, exchange) = runner_with_mock();
    exchange.write().await.set_price("BTCUSDT", 105.0);

    let mut handle = runner
        .start(GridPlan::new("BTCUSDT", 100.0, 110.0, 3, 0.1))
        .await
        .unwrap();

    // price drops to the lowest rung: the buy fills
    exchange.write().await.set_price("BTCUSDT", 100.0);
    let_poll_run().await;

    let levels = handle.levels().await;
    assert_eq!(levels[0].fills, 1);
    assert_eq!(levels[0].side, OrderSide::Sell);
    assert!(levels[0].order_id.is_some());
    assert_eq!(exchange.read().await.open_order_count("BTCUSDT"), 3);

    // price bounces: the replacement sell at 100 fills and flips back
    exchange.write().await.set_price("BTCUSDT", 104.0);
    let_poll_run().await;

    let levels = handle.levels().await;
    assert_eq!(levels[0].fills, 2);
    assert_eq!(levels[0].side, OrderSide::Buy);
    assert_eq!(handle.total_fills().await, 2);

    handle.stop().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn failed_replacement_is_retried_not_fatal() {
    let (runner, exchange) = runner_with_mock();
    exchange.write().await.set_price("BTCUSDT", 105.0);

    let mut handle = runner
        .start(GridPlan::new("BTCUSDT", 100.0, 110.0, 3, 0.1))
        .await
        .unwrap();

    // the ladder used three calls; everything after it fails
    exchange.write().await.fail_place_after(3);
    exchange.write().await.set_price("BTCUSDT", 100.0);

    let_poll_run().await;
    let calls_after_first_attempt = exchange.read().await.place_calls();
    assert!(calls_after_first_attempt >= 4);

    let_poll_run().await;
    // still alive and still retrying the replacement
    assert!(handle.is_active().await);
    assert!(exchange.read().await.place_calls() > calls_after_first_attempt);

    let levels = handle.levels().await;
    assert_eq!(levels[0].side, OrderSide::Sell);
    assert!(levels[0].order_id.is_none());

    handle.stop().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn stop_cancels_pending_orders_and_is_idempotent() {
    let (runner, exchange) = runner_with_mock();
    exchange.write().await.set_price("BTCUSDT", 105.0);

    let mut handle = runner
        .start(GridPlan::new("BTCUSDT", 100.0, 110.0, 5, 0.1))
        .await
        .unwrap();
    assert_eq!(exchange.read().await.open_order_count("BTCUSDT"), 5);

    let cancelled = handle.stop().await.unwrap();
    assert_eq!(cancelled, 5);
    assert_eq!(exchange.read().await.open_order_count("BTCUSDT"), 0);
    assert!(!handle.is_active().await);

    // stopping again is a no-op, not an error
    assert_eq!(handle.stop().await.unwrap(), 0);
}

#[tokio::test(start_paused = true)]
async fn price_outside_the_range_is_rejected() {
    let (runner, exchange) = runner_with_mock();
    exchange.write().await.set_price("BTCUSDT", 105.0);

    let result = runner.start(GridPlan::new("BTCUSDT", 110.0, 120.0, 3, 0.1)).await;
    assert!(matches!(result, Err(TradingError::Validation(_))));
    assert_eq!(exchange.read().await.place_calls(), 0);
}
