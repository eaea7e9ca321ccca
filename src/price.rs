//! Current SOL price from the CoinGecko simple price API.

use reqwest::Client;
use serde::Deserialize;
use tracing::warn;

use crate::constants;

#[derive(Debug, Deserialize)]
struct SimplePriceResponse {
    solana: Option<SolanaPrice>,
}

#[derive(Debug, Deserialize)]
struct SolanaPrice {
    usd: f64,
}

/// Fetch the current SOL/USD quote. Any failure is logged and collapsed to
/// `None`; a missing quote suppresses the USD metrics for one scrape and
/// nothing else.
pub async fn fetch_sol_price(http: &Client) -> Option<f64> {
    let url = format!(
        "{}{}",
        constants::COINGECKO_API_BASE,
        constants::COINGECKO_SIMPLE_PRICE
    );

    let response = match http
        .get(&url)
        .header("Accept", "application/json")
        .send()
        .await
    {
        Ok(response) => response,
        Err(e) => {
            warn!("price request failed: {e}");
            return None;
        }
    };

    if !response.status().is_success() {
        warn!("price API returned status {}", response.status());
        return None;
    }

    match response.json::<SimplePriceResponse>().await {
        Ok(data) => match data.solana {
            Some(price) => Some(price.usd),
            None => {
                warn!("price response missing solana quote");
                None
            }
        },
        Err(e) => {
            warn!("price response parse error: {e}");
            None
        }
    }
}
