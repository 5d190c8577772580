//! TWAP runner integration tests
//!
//! Run against the mock exchange on a paused tokio clock, so interval waits
//! advance virtual time only.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tokio::time::Instant;

use xTrader::core::twap_runner::{TwapPlan, TwapRunner};
use xTrader::exchange::mocks::MockExchange;
use xTrader::models::order::{OrderSide, OrderStatus};
use xTrader::order_core::manager::OrderManager;
use xTrader::order_core::validator::default_validators;
use xTrader::TradingError;

fn runner_with_mock() -> (TwapRunner, Arc<RwLock<MockExchange>>) {
    let exchange = Arc::new(RwLock::new(MockExchange::new()));
    let manager = OrderManager::new(exchange.clone()).with_validators(default_validators(0.001));
    (TwapRunner::new(Arc::new(manager), 0.001), exchange)
}

#[tokio::test(start_paused = true)]
async fn four_slices_of_a_quarter_each() {
    let (runner, _) = runner_with_mock();
    let plan = TwapPlan::new("BTCUSDT", OrderSide::Buy, 1.0, 4, Duration::from_secs(5));

    let started = Instant::now();
    let report = runner.run(&plan).await.unwrap();

    assert!(report.is_complete());
    assert_eq!(report.receipts.len(), 4);
    for receipt in &report.receipts {
        assert!((receipt.executed_quantity - 0.25).abs() < 1e-9);
        assert_eq!(receipt.status, OrderStatus::Filled);
    }
    assert!((report.executed_quantity() - 1.0).abs() < 0.001);

    // three waits between four slices, none after the last
    let elapsed = started.elapsed();
    assert!(elapsed >= Duration::from_secs(15));
    assert!(elapsed < Duration::from_secs(16));
}

#[tokio::test(start_paused = true)]
async fn single_slice_submits_once_without_waiting() {
    let (runner, exchange) = runner_with_mock();
    let plan = TwapPlan::new("BTCUSDT", OrderSide::Sell, 0.5, 1, Duration::from_secs(60));

    let started = Instant::now();
    let report = runner.run(&plan).await.unwrap();

    assert_eq!(report.receipts.len(), 1);
    assert!((report.executed_quantity() - 0.5).abs() < 1e-9);
    assert_eq!(exchange.read().await.place_calls(), 1);
    assert_eq!(started.elapsed(), Duration::ZERO);
}

#[tokio::test(start_paused = true)]
async fn failure_on_slice_three_keeps_two_results() {
    let (runner, exchange) = runner_with_mock();
    exchange.write().await.fail_place_after(2);

    let plan = TwapPlan::new("BTCUSDT", OrderSide::Buy, 1.0, 4, Duration::from_secs(5));
    let report = runner.run(&plan).await.unwrap();

    assert!(!report.is_complete());
    assert_eq!(report.receipts.len(), 2);
    assert!(matches!(report.error, Some(TradingError::Exchange(_))));
    // the third call failed and no fourth was attempted
    assert_eq!(exchange.read().await.place_calls(), 3);
}

#[tokio::test(start_paused = true)]
async fn child_quantities_sum_within_one_step() {
    let (runner, _) = runner_with_mock();
    let plan = TwapPlan::new("BTCUSDT", OrderSide::Buy, 0.01, 3, Duration::from_secs(1));

    let report = runner.run(&plan).await.unwrap();

    assert!(report.is_complete());
    assert!((report.executed_quantity() - 0.01).abs() <= 0.001);
}

#[tokio::test(start_paused = true)]
async fn invalid_plan_places_no_orders() {
    let (runner, exchange) = runner_with_mock();
    let plan = TwapPlan::new("BTCUSDT", OrderSide::Buy, 1.0, 0, Duration::from_secs(5));

    let result = runner.run(&plan).await;

    assert!(matches!(result, Err(TradingError::Validation(_))));
    assert_eq!(exchange.read().await.place_calls(), 0);
}
