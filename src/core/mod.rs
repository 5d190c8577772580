//! Core implementations of the order execution strategies

pub mod grid_runner;
pub mod twap_runner;

pub use grid_runner::{GridHandle, GridPlan, GridRunner};
pub use twap_runner::{TwapPlan, TwapReport, TwapRunner};
