use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::error::TradingError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub exchange: ExchangeConfig,
    pub trading: TradingConfig,
    pub twap: TwapConfig,
    pub grid: GridConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExchangeConfig {
    pub name: String,
    pub api_key: Option<String>,
    pub api_secret: Option<String>,
    pub base_url: String,
    pub use_mock: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradingConfig {
    pub default_symbol: String,
    /// Exchange quantity precision: child quantities are rounded to this step.
    pub quantity_step: f64,
    pub min_order_size: f64,
    pub max_leverage: u32,
    pub time_in_force: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TwapConfig {
    pub default_slices: usize,
    pub default_interval_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GridConfig {
    pub default_levels: usize,
    pub poll_interval_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub file_path: Option<String>,
}

impl Config {
    /// Load configuration from config.json if present, falling back to
    /// defaults. Environment variables override either source.
    pub fn load() -> Result<Self, TradingError> {
        let config_path = Path::new("config.json");

        let mut cfg = if config_path.exists() {
            let mut file = File::open(config_path)
                .map_err(|e| TradingError::Config(format!("Failed to open config file: {}", e)))?;

            let mut contents = String::new();
            file.read_to_string(&mut contents)
                .map_err(|e| TradingError::Config(format!("Failed to read config file: {}", e)))?;

            serde_json::from_str::<Config>(&contents)
                .map_err(|e| TradingError::Config(format!("Failed to parse config file: {}", e)))?
        } else {
            Config::default()
        };

        cfg.apply_env_overrides();
        Ok(cfg)
    }

    /// Apply environment variable overrides for sensitive/runtime fields
    fn apply_env_overrides(&mut self) {
        use std::env;
        if let Ok(v) = env::var("BINANCE_API_KEY") {
            if !v.is_empty() {
                self.exchange.api_key = Some(v);
            }
        }
        if let Ok(v) = env::var("BINANCE_API_SECRET") {
            if !v.is_empty() {
                self.exchange.api_secret = Some(v);
            }
        }
        if let Ok(v) = env::var("EXCHANGE_BASE_URL") {
            if !v.is_empty() {
                self.exchange.base_url = v;
            }
        }
        if let Ok(v) = env::var("USE_MOCK") {
            let lower = v.to_lowercase();
            if ["1", "true", "yes"].contains(&lower.as_str()) {
                self.exchange.use_mock = true;
            }
            if ["0", "false", "no"].contains(&lower.as_str()) {
                self.exchange.use_mock = false;
            }
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            exchange: ExchangeConfig {
                name: "binance-futures-testnet".to_string(),
                api_key: None,
                api_secret: None,
                base_url: "https://testnet.binancefuture.com".to_string(),
                use_mock: false,
            },
            trading: TradingConfig {
                default_symbol: "BTCUSDT".to_string(),
                quantity_step: 0.001,
                min_order_size: 0.001,
                max_leverage: 125,
                time_in_force: "GTC".to_string(),
            },
            twap: TwapConfig {
                default_slices: 10,
                default_interval_secs: 60,
            },
            grid: GridConfig {
                default_levels: 20,
                poll_interval_ms: 1000,
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                file_path: Some("logs/trading_bot.log".to_string()),
            },
        }
    }
}
