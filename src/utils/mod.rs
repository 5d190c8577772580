//! Quantity and time helpers shared by the strategy runners.

pub mod logging;

use chrono::Utc;

/// Current time as a millisecond timestamp
pub fn current_timestamp_ms() -> i64 {
  Utc::now().timestamp_millis()
}

/// Round down to a multiple of `step` (exchange quantity precision)
pub fn round_down_to_step(value: f64, step: f64) -> f64 {
  if step <= 0.0 {
    return value;
  }
  (value / step).floor() * step
}

/// Round to the nearest multiple of `step`
pub fn round_to_step(value: f64, step: f64) -> f64 {
  if step <= 0.0 {
    return value;
  }
  (value / step).round() * step
}
