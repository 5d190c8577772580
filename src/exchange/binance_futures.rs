use async_trait::async_trait;
use hmac::{Hmac, Mac};
use serde_json::Value;
use sha2::Sha256;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::TradingError;
use crate::exchange::traits::Exchange;
use crate::models::balance::AccountBalance;
use crate::models::order::{Order, OrderId, OrderReceipt, OrderSide, OrderStatus, OrderType};
use crate::models::position::Position;

type HmacSha256 = Hmac<Sha256>;

/// Binance USDT-M Futures REST connector. Points at the futures testnet by
/// default; every account-scoped request is signed with HMAC-SHA256 over the
/// query string.
pub struct BinanceFuturesExchange {
  base_url: String,
  api_key: String,
  api_secret: String,
  recv_window: u64,
  http: reqwest::Client,
}

impl BinanceFuturesExchange {
  pub fn new(base_url: impl Into<String>, api_key: impl Into<String>, api_secret: impl Into<String>) -> Self {
    BinanceFuturesExchange {
      base_url: base_url.into(),
      api_key: api_key.into(),
      api_secret: api_secret.into(),
      recv_window: 5000,
      http: reqwest::Client::new(),
    }
  }

  fn timestamp_ms() -> i64 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap().as_millis() as i64
  }

  fn sign(&self, query: &str) -> String {
    let mut mac = HmacSha256::new_from_slice(self.api_secret.as_bytes()).unwrap();
    mac.update(query.as_bytes());
    hex::encode(mac.finalize().into_bytes())
  }

  /// Append timestamp, recvWindow and signature to the given params.
  fn signed_url(&self, path: &str, mut params: Vec<String>) -> String {
    params.push(format!("timestamp={}", Self::timestamp_ms()));
    params.push(format!("recvWindow={}", self.recv_window));
    let query = params.join("&");
    let signature = self.sign(&query);
    format!("{}{}?{}&signature={}", self.base_url, path, query, signature)
  }

  async fn check(&self, res: reqwest::Response, context: &str) -> Result<Value, TradingError> {
    let status = res.status();
    let body = res.text().await?;
    if !status.is_success() {
      return Err(TradingError::Exchange(format!("{} failed ({}): {}", context, status, body)));
    }
    serde_json::from_str(&body).map_err(TradingError::from)
  }

  fn str_f64(json: &Value, key: &str) -> f64 {
    json.get(key)
      .and_then(|v| v.as_str())
      .and_then(|s| s.parse::<f64>().ok())
      .unwrap_or(0.0)
  }

  fn parse_receipt(json: &Value) -> Result<OrderReceipt, TradingError> {
    let order_id = json.get("orderId")
      .and_then(|v| v.as_i64())
      .map(|id| OrderId(id.to_string()))
      .ok_or_else(|| TradingError::Exchange("order response missing orderId".to_string()))?;
    let side = match json.get("side").and_then(|v| v.as_str()) {
      Some("SELL") => OrderSide::Sell,
      _ => OrderSide::Buy,
    };
    let order_type = match json.get("type").and_then(|v| v.as_str()) {
      Some("LIMIT") => OrderType::Limit,
      Some("STOP_MARKET") => OrderType::StopMarket,
      Some("STOP") => OrderType::StopLimit,
      _ => OrderType::Market,
    };
    let status = json.get("status")
      .and_then(|v| v.as_str())
      .and_then(OrderStatus::from_api)
      .unwrap_or(OrderStatus::New);
    Ok(OrderReceipt {
      order_id,
      client_order_id: json.get("clientOrderId").and_then(|v| v.as_str()).map(String::from),
      symbol: json.get("symbol").and_then(|v| v.as_str()).unwrap_or_default().to_string(),
      side,
      order_type,
      status,
      orig_quantity: Self::str_f64(json, "origQty"),
      executed_quantity: Self::str_f64(json, "executedQty"),
      avg_price: Self::str_f64(json, "avgPrice"),
      update_time: json.get("updateTime").and_then(|v| v.as_i64()).unwrap_or(0),
    })
  }
}

#[async_trait]
impl Exchange for BinanceFuturesExchange {
  async fn place_order(&mut self, order: Order) -> Result<OrderReceipt, TradingError> {
    let mut params = vec![
      format!("symbol={}", order.symbol),
      format!("side={}", order.side.as_str()),
      format!("type={}", order.order_type.as_str()),
      format!("quantity={}", order.quantity),
    ];
    if let Some(price) = order.price {
      params.push(format!("price={}", price));
      params.push(format!("timeInForce={}", order.time_in_force));
    }
    if let Some(stop_price) = order.stop_price {
      params.push(format!("stopPrice={}", stop_price));
    }
    if let Some(client_id) = &order.client_order_id {
      params.push(format!("newClientOrderId={}", client_id));
    }
    let url = self.signed_url("/fapi/v1/order", params);
    let res = self.http.post(url)
      .header("X-MBX-APIKEY", &self.api_key)
      .send().await?;
    let json = self.check(res, "place_order").await?;
    Self::parse_receipt(&json)
  }

  async fn cancel_order(&mut self, symbol: &str, order_id: &OrderId) -> Result<bool, TradingError> {
    let params = vec![
      format!("symbol={}", symbol),
      format!("orderId={}", order_id),
    ];
    let url = self.signed_url("/fapi/v1/order", params);
    let res = self.http.delete(url)
      .header("X-MBX-APIKEY", &self.api_key)
      .send().await?;
    match self.check(res, "cancel_order").await {
      Ok(_) => Ok(true),
      // -2011 UNKNOWN_ORDER: already filled or cancelled
      Err(TradingError::Exchange(msg)) if msg.contains("-2011") => Ok(false),
      Err(e) => Err(e),
    }
  }

  async fn cancel_all(&mut self, symbol: &str) -> Result<usize, TradingError> {
    // The endpoint does not report a count, so take it from the open orders.
    let open = self.get_open_orders(symbol).await?.len();
    let params = vec![format!("symbol={}", symbol)];
    let url = self.signed_url("/fapi/v1/allOpenOrders", params);
    let res = self.http.delete(url)
      .header("X-MBX-APIKEY", &self.api_key)
      .send().await?;
    self.check(res, "cancel_all").await?;
    Ok(open)
  }

  async fn get_order_status(&self, symbol: &str, order_id: &OrderId) -> Result<OrderStatus, TradingError> {
    let params = vec![
      format!("symbol={}", symbol),
      format!("orderId={}", order_id),
    ];
    let url = self.signed_url("/fapi/v1/order", params);
    let res = self.http.get(url)
      .header("X-MBX-APIKEY", &self.api_key)
      .send().await?;
    let json = self.check(res, "get_order_status").await?;
    json.get("status")
      .and_then(|v| v.as_str())
      .and_then(OrderStatus::from_api)
      .ok_or_else(|| TradingError::Exchange("order response missing status".to_string()))
  }

  async fn get_open_orders(&self, symbol: &str) -> Result<Vec<OrderReceipt>, TradingError> {
    let params = vec![format!("symbol={}", symbol)];
    let url = self.signed_url("/fapi/v1/openOrders", params);
    let res = self.http.get(url)
      .header("X-MBX-APIKEY", &self.api_key)
      .send().await?;
    let json = self.check(res, "get_open_orders").await?;
    let orders = json.as_array()
      .ok_or_else(|| TradingError::Exchange("expected an order array".to_string()))?;
    orders.iter().map(Self::parse_receipt).collect()
  }

  async fn get_price(&self, symbol: &str) -> Result<f64, TradingError> {
    let url = format!("{}/fapi/v1/ticker/price?symbol={}", self.base_url, symbol);
    let res = self.http.get(url).send().await?;
    let json = self.check(res, "get_price").await?;
    let price = Self::str_f64(&json, "price");
    if price <= 0.0 {
      return Err(TradingError::Exchange(format!("no price for {}", symbol)));
    }
    Ok(price)
  }

  async fn get_balance(&self) -> Result<AccountBalance, TradingError> {
    let url = self.signed_url("/fapi/v2/account", Vec::new());
    let res = self.http.get(url)
      .header("X-MBX-APIKEY", &self.api_key)
      .send().await?;
    let json = self.check(res, "get_balance").await?;
    Ok(AccountBalance::new(
      Self::str_f64(&json, "totalWalletBalance"),
      Self::str_f64(&json, "availableBalance"),
      Self::str_f64(&json, "totalUnrealizedProfit"),
    ))
  }

  async fn get_position(&self, symbol: &str) -> Result<Option<Position>, TradingError> {
    let params = vec![format!("symbol={}", symbol)];
    let url = self.signed_url("/fapi/v2/positionRisk", params);
    let res = self.http.get(url)
      .header("X-MBX-APIKEY", &self.api_key)
      .send().await?;
    let json = self.check(res, "get_position").await?;
    let entry = match json.as_array().and_then(|a| a.first()) {
      Some(entry) => entry,
      None => return Ok(None),
    };
    let amount = Self::str_f64(entry, "positionAmt");
    if amount == 0.0 {
      return Ok(None);
    }
    let mut position = Position::new(
      symbol,
      amount,
      Self::str_f64(entry, "entryPrice"),
      entry.get("leverage")
        .and_then(|v| v.as_str())
        .and_then(|s| s.parse::<u32>().ok())
        .unwrap_or(1),
    );
    position.unrealized_pnl = Self::str_f64(entry, "unRealizedProfit");
    Ok(Some(position))
  }

  async fn set_leverage(&mut self, symbol: &str, leverage: u32) -> Result<bool, TradingError> {
    let params = vec![
      format!("symbol={}", symbol),
      format!("leverage={}", leverage),
    ];
    let url = self.signed_url("/fapi/v1/leverage", params);
    let res = self.http.post(url)
      .header("X-MBX-APIKEY", &self.api_key)
      .send().await?;
    self.check(res, "set_leverage").await?;
    Ok(true)
  }
}
