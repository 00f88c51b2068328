use super::DataProvider;
use crate::chain::types::{Contract, OptionType};
use crate::errors::{ScanError, ScanResult};
use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::Client;
use serde::Deserialize;

/// Snapshot page size (Polygon's maximum).
const PAGE_LIMIT: u32 = 250;

/// Hard stop on `next_url` chains.
const MAX_PAGES: usize = 200;

/// Polygon.io REST client. All methods return Result, never panic.
#[derive(Clone)]
pub struct PolygonProvider {
    client: Client,
    base_url: String,
    api_key: String,
}

impl PolygonProvider {
    pub fn new(base_url: &str, api_key: &str) -> ScanResult<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(15))
            .pool_max_idle_per_host(4)
            .build()
            .map_err(|e| ScanError::Config(format!("http client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        })
    }

    /// The key travels as a query param; errors are built without the URL
    /// so it never reaches a log line.
    async fn get_json<T: serde::de::DeserializeOwned>(&self, url: &str) -> ScanResult<T> {
        let resp = self
            .client
            .get(url)
            .query(&[("apiKey", self.api_key.as_str())])
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ScanError::ProviderApi { status: status.as_u16(), body });
        }

        let path = url.split('?').next().unwrap_or(url);
        resp.json::<T>()
            .await
            .map_err(|e| ScanError::Parse(format!("GET {path}: {}", e.without_url())))
    }

    /// Last trade price of the underlying.
    pub async fn get_spot(&self, ticker: &str) -> ScanResult<f64> {
        let resp: LastTradeResponse =
            self.get_json(&format!("{}/v2/last/trade/{ticker}", self.base_url)).await?;

        let price = resp
            .results
            .and_then(|r| r.p)
            .ok_or_else(|| ScanError::Parse(format!("no last trade for {ticker}")))?;

        if price <= 0.0 || !price.is_finite() {
            return Err(ScanError::Parse(format!("invalid spot for {ticker}: {price}")));
        }
        Ok(price)
    }

    /// Every snapshot page for `ticker`, following `next_url`.
    pub async fn get_snapshot(&self, ticker: &str) -> ScanResult<Vec<SnapshotResult>> {
        let mut url = format!(
            "{}/v3/snapshot/options/{ticker}?limit={PAGE_LIMIT}",
            self.base_url
        );
        let mut results = Vec::new();

        for page in 1..=MAX_PAGES {
            let resp: SnapshotResponse = self.get_json(&url).await?;
            results.extend(resp.results.unwrap_or_default());

            match resp.next_url {
                Some(next) if !next.is_empty() => url = next,
                _ => return Ok(results),
            }

            if page == MAX_PAGES {
                tracing::warn!(ticker = %ticker, pages = page, "snapshot truncated at page cap");
            }
        }

        Ok(results)
    }
}

#[async_trait]
impl DataProvider for PolygonProvider {
    fn name(&self) -> &'static str {
        "polygon"
    }

    async fn fetch_chain(&self, ticker: &str) -> ScanResult<Vec<Contract>> {
        let spot = self.get_spot(ticker).await?;
        let raw = self.get_snapshot(ticker).await?;
        let total = raw.len();

        let contracts: Vec<Contract> = raw
            .into_iter()
            .filter_map(|r| normalize(ticker, spot, r))
            .collect();

        if contracts.len() < total {
            tracing::debug!(
                ticker = %ticker,
                skipped = total - contracts.len(),
                "snapshot records without strike/expiry/type"
            );
        }
        Ok(contracts)
    }
}

/// Map one snapshot record to a contract. None when the record lacks
/// the fields that identify a contract.
fn normalize(ticker: &str, spot: f64, r: SnapshotResult) -> Option<Contract> {
    let details = r.details?;
    let option_type = match details.contract_type.as_deref()? {
        "call" => OptionType::Call,
        "put" => OptionType::Put,
        _ => return None,
    };
    let expiry = NaiveDate::parse_from_str(details.expiration_date.as_deref()?, "%Y-%m-%d").ok()?;
    let strike = details.strike_price?;

    let quote = r.last_quote.unwrap_or_default();
    let day = r.day.unwrap_or_default();
    let underlying = r
        .underlying_asset
        .and_then(|u| u.price)
        .filter(|p| *p > 0.0 && p.is_finite());

    Some(Contract {
        ticker: ticker.to_string(),
        expiry,
        strike,
        option_type,
        bid: quote.bid,
        ask: quote.ask,
        last: r.last_trade.and_then(|t| t.price).or(day.close),
        volume: day.volume.map(|v| v.max(0.0) as u64).unwrap_or(0),
        open_interest: r.open_interest.map(|v| v.max(0.0) as u64).unwrap_or(0),
        spot: underlying.unwrap_or(spot),
        vendor_iv: r.implied_volatility,
        symbol: details.ticker,
    })
}

// ── Responses ──

#[derive(Debug, Deserialize)]
struct LastTradeResponse {
    results: Option<LastTrade>,
}

#[derive(Debug, Deserialize)]
struct LastTrade {
    p: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub struct SnapshotResponse {
    pub results: Option<Vec<SnapshotResult>>,
    pub next_url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SnapshotResult {
    pub details: Option<ContractDetails>,
    pub day: Option<DayBar>,
    pub last_quote: Option<LastQuote>,
    pub last_trade: Option<LastTradeInfo>,
    pub open_interest: Option<f64>,
    pub implied_volatility: Option<f64>,
    pub underlying_asset: Option<UnderlyingAsset>,
}

#[derive(Debug, Deserialize)]
pub struct ContractDetails {
    pub contract_type: Option<String>,
    pub expiration_date: Option<String>,
    pub strike_price: Option<f64>,
    pub ticker: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct DayBar {
    pub close: Option<f64>,
    pub volume: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct LastQuote {
    pub bid: Option<f64>,
    pub ask: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub struct LastTradeInfo {
    pub price: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub struct UnderlyingAsset {
    pub price: Option<f64>,
}
