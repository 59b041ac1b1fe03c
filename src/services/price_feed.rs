use async_trait::async_trait;

/// Source of current prices for monitors.
///
/// Implementations swallow their own failures: `None` means "no usable
/// price right now" and the caller simply skips the tick.
#[async_trait]
pub trait PriceFeed: Send + Sync {
    async fn fetch_price(&self, ticker: &str) -> Option<f64>;
}
