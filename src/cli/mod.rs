//! Command-line interface
//!
//! The interactive surface of the bot: one subcommand per order primitive or
//! strategy, dispatched against the shared order façade.

use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand, ValueEnum};
use tokio::sync::RwLock;

use crate::config::Config;
use crate::core::grid_runner::{GridPlan, GridRunner};
use crate::core::twap_runner::{TwapPlan, TwapRunner};
use crate::error::TradingError;
use crate::exchange::binance_futures::BinanceFuturesExchange;
use crate::exchange::mocks::MockExchange;
use crate::exchange::traits::Exchange;
use crate::models::order::{Order, OrderId, OrderReceipt, OrderSide};
use crate::order_core::manager::OrderManager;
use crate::order_core::validator::default_validators;

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum SideArg {
    Buy,
    Sell,
}

impl From<SideArg> for OrderSide {
    fn from(side: SideArg) -> Self {
        match side {
            SideArg::Buy => OrderSide::Buy,
            SideArg::Sell => OrderSide::Sell,
        }
    }
}

#[derive(Parser)]
#[command(name = "xtrader", version, about = "Binance USDT-M futures testnet trading bot")]
pub struct Cli {
    /// Use the in-memory mock exchange instead of the testnet
    #[arg(long, global = true)]
    pub mock: bool,

    /// Trading pair (defaults to the configured symbol)
    #[arg(long, short, global = true)]
    pub symbol: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Show the current price
    Price,
    /// Show the futures account balance
    Balance,
    /// Show the open position, if any
    Position,
    /// List open orders
    OpenOrders,
    /// Place a market order
    Market {
        #[arg(value_enum)]
        side: SideArg,
        quantity: f64,
    },
    /// Place a limit order
    Limit {
        #[arg(value_enum)]
        side: SideArg,
        quantity: f64,
        price: f64,
    },
    /// Place a stop-market order
    StopMarket {
        #[arg(value_enum)]
        side: SideArg,
        quantity: f64,
        stop_price: f64,
    },
    /// Place a stop-limit order
    StopLimit {
        #[arg(value_enum)]
        side: SideArg,
        quantity: f64,
        price: f64,
        stop_price: f64,
    },
    /// Cancel one order by id
    Cancel { order_id: String },
    /// Cancel all open orders on the symbol
    CancelAll,
    /// Set leverage for the symbol
    Leverage { leverage: u32 },
    /// Split a quantity into market orders submitted at a fixed interval
    Twap {
        #[arg(value_enum)]
        side: SideArg,
        quantity: f64,
        /// Number of child orders
        #[arg(long)]
        slices: Option<usize>,
        /// Seconds between child orders
        #[arg(long)]
        interval: Option<u64>,
    },
    /// Run a grid of resting limit orders until Ctrl-C
    Grid {
        lower: f64,
        upper: f64,
        quantity_per_level: f64,
        /// Number of price levels
        #[arg(long)]
        levels: Option<usize>,
        /// Place a buy (instead of a sell) at a level equal to the current price
        #[arg(long)]
        tie_break_buy: bool,
    },
}

fn build_exchange(cli: &Cli, config: &Config) -> Result<Arc<RwLock<dyn Exchange>>, TradingError> {
    if cli.mock || config.exchange.use_mock {
        log::info!("Using the mock exchange");
        return Ok(Arc::new(RwLock::new(MockExchange::new())));
    }

    let api_key = config
        .exchange
        .api_key
        .clone()
        .ok_or_else(|| TradingError::Config("Missing API key (set BINANCE_API_KEY)".to_string()))?;
    let api_secret = config
        .exchange
        .api_secret
        .clone()
        .ok_or_else(|| TradingError::Config("Missing API secret (set BINANCE_API_SECRET)".to_string()))?;

    Ok(Arc::new(RwLock::new(BinanceFuturesExchange::new(
        config.exchange.base_url.clone(),
        api_key,
        api_secret,
    ))))
}

fn print_receipt(receipt: &OrderReceipt) {
    println!("{}", "=".repeat(60));
    println!("Order ID:        {}", receipt.order_id);
    println!("Symbol:          {}", receipt.symbol);
    println!("Side:            {}", receipt.side);
    println!("Type:            {}", receipt.order_type);
    println!("Quantity:        {}", receipt.orig_quantity);
    println!("Executed:        {}", receipt.executed_quantity);
    println!("Avg Price:       {}", receipt.avg_price);
    println!("Status:          {:?}", receipt.status);
    println!("{}", "=".repeat(60));
}

/// Run one CLI command to completion.
pub async fn execute(cli: Cli, config: Config) -> Result<(), TradingError> {
    let exchange = build_exchange(&cli, &config)?;
    let orders = Arc::new(
        OrderManager::new(exchange)
            .with_validators(default_validators(config.trading.min_order_size))
            .with_max_leverage(config.trading.max_leverage),
    );
    let symbol = cli
        .symbol
        .clone()
        .unwrap_or_else(|| config.trading.default_symbol.clone());

    match cli.command {
        Command::Price => {
            let price = orders.price(&symbol).await?;
            println!("{}: {}", symbol, price);
        }
        Command::Balance => {
            let balance = orders.balance().await?;
            println!("Total Wallet Balance:  {:.2} USDT", balance.total_wallet_balance);
            println!("Available Balance:     {:.2} USDT", balance.available_balance);
            println!("Unrealized Profit:     {:.2} USDT", balance.total_unrealized_profit);
        }
        Command::Position => match orders.position(&symbol).await? {
            Some(position) => {
                println!("Symbol:            {}", position.symbol);
                println!("Position Size:     {}", position.amount);
                println!("Entry Price:       {}", position.entry_price);
                println!("Leverage:          {}x", position.leverage);
                println!("Unrealized Profit: {:.2} USDT", position.unrealized_pnl);
            }
            None => println!("No open position for {}", symbol),
        },
        Command::OpenOrders => {
            let open = orders.open_orders(&symbol).await?;
            if open.is_empty() {
                println!("No open orders for {}", symbol);
            }
            for receipt in &open {
                println!(
                    "{}  {}  {}  {} @ {}  {:?}",
                    receipt.order_id,
                    receipt.side,
                    receipt.order_type,
                    receipt.orig_quantity,
                    receipt.avg_price,
                    receipt.status,
                );
            }
        }
        Command::Market { side, quantity } => {
            let receipt = orders.submit(Order::market(&symbol, side.into(), quantity)).await?;
            print_receipt(&receipt);
        }
        Command::Limit { side, quantity, price } => {
            let order = Order::limit(&symbol, side.into(), quantity, price)
                .with_time_in_force(config.trading.time_in_force.clone());
            let receipt = orders.submit(order).await?;
            print_receipt(&receipt);
        }
        Command::StopMarket { side, quantity, stop_price } => {
            let receipt = orders
                .submit(Order::stop_market(&symbol, side.into(), quantity, stop_price))
                .await?;
            print_receipt(&receipt);
        }
        Command::StopLimit { side, quantity, price, stop_price } => {
            let order = Order::stop_limit(&symbol, side.into(), quantity, price, stop_price)
                .with_time_in_force(config.trading.time_in_force.clone());
            let receipt = orders.submit(order).await?;
            print_receipt(&receipt);
        }
        Command::Cancel { order_id } => {
            let cancelled = orders.cancel(&symbol, &OrderId(order_id)).await?;
            if cancelled {
                println!("Order cancelled");
            } else {
                println!("Order was no longer open");
            }
        }
        Command::CancelAll => {
            let count = orders.cancel_all(&symbol).await?;
            println!("Cancelled {} orders", count);
        }
        Command::Leverage { leverage } => {
            orders.set_leverage(&symbol, leverage).await?;
            println!("Leverage set to {}x for {}", leverage, symbol);
        }
        Command::Twap { side, quantity, slices, interval } => {
            let plan = TwapPlan::new(
                &symbol,
                side.into(),
                quantity,
                slices.unwrap_or(config.twap.default_slices),
                Duration::from_secs(interval.unwrap_or(config.twap.default_interval_secs)),
            );
            let runner = TwapRunner::new(orders.clone(), config.trading.quantity_step);
            let mut report = tokio::select! {
                report = runner.run(&plan) => report?,
                _ = tokio::signal::ctrl_c() => {
                    return Err(TradingError::Interrupted("TWAP run stopped by user".to_string()));
                }
            };

            println!("{}", "=".repeat(60));
            println!("TWAP EXECUTION SUMMARY");
            println!("{}", "=".repeat(60));
            println!("Symbol:            {}", report.symbol);
            println!("Side:              {}", report.side);
            println!("Target Quantity:   {:.6}", report.total_quantity);
            println!("Executed Quantity: {:.6}", report.executed_quantity());
            println!("Average Price:     {:.2}", report.avg_price());
            println!("Completed Slices:  {}/{}", report.receipts.len(), report.slices);
            println!("{}", "=".repeat(60));

            if let Some(error) = report.error.take() {
                println!("Run stopped early: {}", error);
                return Err(error);
            }
        }
        Command::Grid { lower, upper, quantity_per_level, levels, tie_break_buy } => {
            let mut plan = GridPlan::new(
                &symbol,
                lower,
                upper,
                levels.unwrap_or(config.grid.default_levels),
                quantity_per_level,
            );
            if tie_break_buy {
                plan = plan.with_tie_break(OrderSide::Buy);
            }

            let runner = GridRunner::new(
                orders.clone(),
                Duration::from_millis(config.grid.poll_interval_ms),
            );
            let mut handle = runner.start(plan).await?;
            println!("Grid running on {}. Press Ctrl-C to stop.", handle.symbol());

            tokio::signal::ctrl_c().await?;
            let cancelled = handle.stop().await?;
            println!(
                "Grid stopped: {} orders cancelled, {} round trips completed",
                cancelled,
                handle.total_fills().await,
            );
        }
    }

    Ok(())
}
