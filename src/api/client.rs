use crate::stock::models::{StockRecord, VariantStock, parse_inventory};
use crate::timer::models::TimerRecord;
use anyhow::{Context, Result};
use reqwest::StatusCode;
use reqwest::blocking::Client;
use serde::de::DeserializeOwned;

pub const DEFAULT_BASE_URL: &str = "http://localhost:8000/api";

/// Client for the app's public storefront endpoints.
pub struct WidgetClient {
    client: Client,
    base_url: String,
}

impl WidgetClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Helper for testing to override base URL (e.g. wiremock)
    pub fn with_base_url(mut self, url: &str) -> Self {
        self.base_url = url.trim_end_matches('/').to_string();
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// GET {base}/countdown-timers/config/{timer_id}
    pub fn get_timer(&self, timer_id: &str) -> Result<TimerRecord> {
        let url = format!("{}/countdown-timers/config/{}", self.base_url, timer_id);
        self.get_config(&url, "Timer", timer_id)
    }

    /// GET {base}/stock-countdown/config/{stock_id}
    pub fn get_stock(&self, stock_id: &str) -> Result<StockRecord> {
        let url = format!("{}/stock-countdown/config/{}", self.base_url, stock_id);
        self.get_config(&url, "Stock countdown", stock_id)
    }

    /// GET {base}/apps/secure_inventory?shop=..&productId=..
    pub fn get_inventory(&self, shop: &str, product_id: &str) -> Result<Vec<VariantStock>> {
        let url = format!("{}/apps/secure_inventory", self.base_url);
        tracing::debug!(%url, shop, product_id, "fetching inventory");

        let response = self
            .client
            .get(&url)
            .query(&[("shop", shop), ("productId", product_id)])
            .send()
            .context("Failed to send inventory request")?;

        if !response.status().is_success() {
            anyhow::bail!("Inventory API error: status {}", response.status());
        }

        let body = response
            .json::<serde_json::Value>()
            .context("Failed to parse inventory JSON response")?;
        parse_inventory(&body).context("Inventory response has an unexpected shape")
    }

    fn get_config<T: DeserializeOwned>(&self, url: &str, what: &str, id: &str) -> Result<T> {
        tracing::debug!(%url, "fetching widget config");

        let response = self
            .client
            .get(url)
            .send()
            .with_context(|| format!("Failed to send request for {} {}", what, id))?;

        match response.status() {
            StatusCode::NOT_FOUND => anyhow::bail!("{} {} not found or not published", what, id),
            status if !status.is_success() => {
                anyhow::bail!("{} config API error: status {}", what, status)
            }
            _ => {}
        }

        response
            .json::<T>()
            .with_context(|| format!("Failed to parse {} config JSON response", what))
    }
}

impl Default for WidgetClient {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL)
    }
}
