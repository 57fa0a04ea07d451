//! Exchange price client
//!
//! Converts base-asset amounts into the quote asset using the opening price
//! of the minute bar containing a timestamp.

use crate::cache::PriceCache;
use crate::types::kline_open_price;
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Mutex;
use std::time::Duration;
use tracing::{debug, warn};

/// Earliest timestamp the exchange serves minute bars for (2017-08-17).
pub const MIN_PRICE_TIMESTAMP: u64 = 1_502_942_460;

/// Historical base -> quote conversion.
#[async_trait]
pub trait PriceOracle: Send + Sync {
    /// Convert `amount` of the base asset at `timestamp` (epoch seconds).
    ///
    /// `Ok(None)` means no price is available: the timestamp predates
    /// [`MIN_PRICE_TIMESTAMP`], the exchange answered with a non-success
    /// status, or the price series was empty. `Err` is a transport failure
    /// or timeout.
    async fn convert(&self, amount: f64, timestamp: u64) -> Result<Option<f64>>;
}

/// Candlestick client for a Binance-compatible REST API.
pub struct BinanceClient {
    client: reqwest::Client,
    klines_url: String,
    symbol: String,
    cache: Mutex<PriceCache>,
}

impl BinanceClient {
    /// Create a new client; `base_url` is the REST root that `klines` is appended to.
    pub fn new(base_url: &str, symbol: String, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build exchange HTTP client")?;
        Ok(Self {
            client,
            klines_url: format!("{}klines", base_url),
            symbol,
            cache: Mutex::new(PriceCache::default()),
        })
    }

    /// Opening price of the minute bar starting at `minute * 60`.
    async fn open_price(&self, minute: u64) -> Result<Option<f64>> {
        if let Some(price) = self.cached(minute) {
            debug!("Price cache hit for minute {}", minute);
            return Ok(Some(price));
        }

        let start_ms = minute * 60 * 1000;
        let response = self
            .client
            .get(&self.klines_url)
            .query(&[
                ("symbol", self.symbol.clone()),
                ("interval", "1m".to_string()),
                ("startTime", start_ms.to_string()),
                ("limit", "1".to_string()),
            ])
            .send()
            .await
            .context("Failed to send klines request")?;

        let status = response.status();
        if !status.is_success() {
            warn!("Exchange returned HTTP {} for {} at {}", status, self.symbol, start_ms);
            return Ok(None);
        }

        let rows: Vec<Vec<Value>> = response
            .json()
            .await
            .context("Failed to parse klines response")?;

        let price = rows.first().and_then(|row| kline_open_price(row));
        if let Some(price) = price {
            if let Ok(mut cache) = self.cache.lock() {
                cache.insert(minute, price);
            }
        }
        Ok(price)
    }

    fn cached(&self, minute: u64) -> Option<f64> {
        self.cache.lock().ok().and_then(|cache| cache.get(minute))
    }
}

#[async_trait]
impl PriceOracle for BinanceClient {
    async fn convert(&self, amount: f64, timestamp: u64) -> Result<Option<f64>> {
        if timestamp < MIN_PRICE_TIMESTAMP {
            return Ok(None);
        }
        let price = self.open_price(timestamp / 60).await?;
        Ok(price.map(|p| amount * p))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};

    fn client(server: &Server) -> BinanceClient {
        BinanceClient::new(
            &format!("{}/api/v3/", server.url()),
            "ETHUSDT".to_string(),
            Duration::from_secs(5),
        )
        .unwrap()
    }

    const KLINE: &str = r#"[[1620000000000,"2949.33000000","2952.00000000","2947.10000000","2950.01000000","812.3",1620000059999,"2396000.1",1420,"400.1","1180000.2","0"]]"#;

    #[tokio::test]
    async fn test_convert_uses_open_price() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/api/v3/klines")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("symbol".into(), "ETHUSDT".into()),
                Matcher::UrlEncoded("interval".into(), "1m".into()),
                Matcher::UrlEncoded("startTime".into(), "1620000000000".into()),
            ]))
            .with_status(200)
            .with_body(KLINE)
            .expect(1)
            .create_async()
            .await;

        let oracle = client(&server);
        let usdt = oracle.convert(1.0, 1_620_000_000).await.unwrap().unwrap();
        assert!((usdt - 2949.33).abs() < 0.1);

        // Same minute bar is served from the cache
        let half = oracle.convert(0.5, 1_620_000_030).await.unwrap().unwrap();
        assert!((half - 1474.665).abs() < 1e-9);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_convert_before_minimum_makes_no_call() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", Matcher::Any)
            .expect(0)
            .create_async()
            .await;

        let oracle = client(&server);
        assert_eq!(oracle.convert(1.0, 0).await.unwrap(), None);
        assert_eq!(oracle.convert(1.0, MIN_PRICE_TIMESTAMP - 1).await.unwrap(), None);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_convert_empty_series() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/api/v3/klines")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body("[]")
            .create_async()
            .await;

        assert_eq!(client(&server).convert(1.0, 1_700_000_000).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_convert_non_success_status() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/api/v3/klines")
            .match_query(Matcher::Any)
            .with_status(429)
            .with_body(r#"{"code":-1003,"msg":"Too many requests"}"#)
            .create_async()
            .await;

        assert_eq!(client(&server).convert(1.0, 1_700_000_000).await.unwrap(), None);
    }
}
