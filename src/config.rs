use crate::errors::{ScanError, ScanResult};
use std::collections::HashSet;
use std::fmt::Display;
use std::path::PathBuf;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    Polygon,
    Fixture,
}

impl FromStr for ProviderKind {
    type Err = ScanError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "polygon" => Ok(Self::Polygon),
            "fixture" => Ok(Self::Fixture),
            other => Err(ScanError::Config(format!("DATA_PROVIDER: unknown provider '{other}'"))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub data_provider: ProviderKind,
    pub polygon_api_key: String,
    pub polygon_base_url: String,
    pub fixture_dir: PathBuf,
    pub reports_dir: PathBuf,
    pub tickers: Vec<String>,
    pub max_concurrent_tickers: usize,
    pub scanner: ScannerConfig,
}

/// Thresholds consumed by the enricher and the five scanners.
/// Every field is validated once at startup; scanners assume a valid config.
#[derive(Debug, Clone, PartialEq)]
pub struct ScannerConfig {
    pub risk_free_rate: f64,
    pub min_volume: u64,
    pub min_open_interest: u64,
    pub iv_low_threshold: f64,
    pub iv_high_threshold: f64,
    /// Liquidity gate for the IV scanner. 0 disables it.
    pub iv_min_volume: u64,
    pub mispricing_threshold: f64,
    /// Theoretical prices at or below this are treated as unevaluable.
    pub min_theoretical_price: f64,
    /// Maximum (ask - bid) / mid for a spread to count as tight.
    pub spread_tightness: f64,
    /// Lower edges of Sensible, Directional and Deep ITM, in |delta|.
    pub delta_bucket_edges: [f64; 3],
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            risk_free_rate: 0.045,
            min_volume: 50,
            min_open_interest: 100,
            iv_low_threshold: 0.20,
            iv_high_threshold: 0.80,
            iv_min_volume: 0,
            mispricing_threshold: 0.10,
            min_theoretical_price: 0.01,
            spread_tightness: 0.05,
            delta_bucket_edges: [0.10, 0.40, 0.70],
        }
    }
}

impl ScannerConfig {
    pub fn validate(&self) -> ScanResult<()> {
        let floats = [
            ("RISK_FREE_RATE", self.risk_free_rate),
            ("IV_LOW_THRESHOLD", self.iv_low_threshold),
            ("IV_HIGH_THRESHOLD", self.iv_high_threshold),
            ("MISPRICING_THRESHOLD", self.mispricing_threshold),
            ("MIN_THEORETICAL_PRICE", self.min_theoretical_price),
            ("SPREAD_TIGHTNESS", self.spread_tightness),
        ];
        for (key, value) in floats {
            if !value.is_finite() {
                return Err(ScanError::Config(format!("{key}: must be finite, got {value}")));
            }
        }

        if !(-0.05..=0.25).contains(&self.risk_free_rate) {
            return Err(ScanError::Config(format!(
                "RISK_FREE_RATE: {} outside [-0.05, 0.25]",
                self.risk_free_rate
            )));
        }

        if self.iv_low_threshold < 0.0 {
            return Err(ScanError::Config(format!(
                "IV_LOW_THRESHOLD: must be non-negative, got {}",
                self.iv_low_threshold
            )));
        }
        if self.iv_low_threshold >= self.iv_high_threshold {
            return Err(ScanError::Config(format!(
                "IV_LOW_THRESHOLD ({}) must be below IV_HIGH_THRESHOLD ({})",
                self.iv_low_threshold, self.iv_high_threshold
            )));
        }

        if self.mispricing_threshold <= 0.0 {
            return Err(ScanError::Config(format!(
                "MISPRICING_THRESHOLD: must be positive, got {}",
                self.mispricing_threshold
            )));
        }
        if self.min_theoretical_price <= 0.0 {
            return Err(ScanError::Config(format!(
                "MIN_THEORETICAL_PRICE: must be positive, got {}",
                self.min_theoretical_price
            )));
        }
        if self.spread_tightness <= 0.0 {
            return Err(ScanError::Config(format!(
                "SPREAD_TIGHTNESS: must be positive, got {}",
                self.spread_tightness
            )));
        }

        let [a, b, c] = self.delta_bucket_edges;
        let ordered = a > 0.0 && a < b && b < c && c <= 1.0;
        if !ordered || !(a.is_finite() && b.is_finite() && c.is_finite()) {
            return Err(ScanError::Config(format!(
                "DELTA_BUCKET_EDGES: need 0 < a < b < c <= 1, got {a},{b},{c}"
            )));
        }

        Ok(())
    }
}

impl AppConfig {
    pub fn from_env() -> ScanResult<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build and validate from an arbitrary key lookup (the process env in production).
    pub fn from_lookup<F>(lookup: F) -> ScanResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = ScannerConfig::default();

        let scanner = ScannerConfig {
            risk_free_rate: parse_or(&lookup, "RISK_FREE_RATE", defaults.risk_free_rate)?,
            min_volume: parse_or(&lookup, "MIN_VOLUME", defaults.min_volume)?,
            min_open_interest: parse_or(&lookup, "MIN_OI", defaults.min_open_interest)?,
            iv_low_threshold: parse_or(&lookup, "IV_LOW_THRESHOLD", defaults.iv_low_threshold)?,
            iv_high_threshold: parse_or(&lookup, "IV_HIGH_THRESHOLD", defaults.iv_high_threshold)?,
            iv_min_volume: parse_or(&lookup, "IV_MIN_VOLUME", defaults.iv_min_volume)?,
            mispricing_threshold: parse_or(
                &lookup,
                "MISPRICING_THRESHOLD",
                defaults.mispricing_threshold,
            )?,
            min_theoretical_price: parse_or(
                &lookup,
                "MIN_THEORETICAL_PRICE",
                defaults.min_theoretical_price,
            )?,
            spread_tightness: parse_or(&lookup, "SPREAD_TIGHTNESS", defaults.spread_tightness)?,
            delta_bucket_edges: match lookup("DELTA_BUCKET_EDGES") {
                Some(raw) => parse_edges(&raw)?,
                None => defaults.delta_bucket_edges,
            },
        };
        scanner.validate()?;

        let data_provider = lookup("DATA_PROVIDER")
            .unwrap_or_else(|| "polygon".to_string())
            .parse::<ProviderKind>()?;

        let polygon_api_key = lookup("POLYGON_API_KEY").unwrap_or_default();
        if data_provider == ProviderKind::Polygon && polygon_api_key.trim().is_empty() {
            return Err(ScanError::Config("missing env var: POLYGON_API_KEY".into()));
        }

        let max_concurrent_tickers: usize = parse_or(&lookup, "MAX_CONCURRENT_TICKERS", 4)?;
        if max_concurrent_tickers == 0 {
            return Err(ScanError::Config("MAX_CONCURRENT_TICKERS: must be at least 1".into()));
        }

        Ok(Self {
            data_provider,
            polygon_api_key,
            polygon_base_url: lookup("POLYGON_BASE_URL")
                .unwrap_or_else(|| "https://api.polygon.io".to_string()),
            fixture_dir: PathBuf::from(lookup("FIXTURE_DIR").unwrap_or_else(|| "fixtures".into())),
            reports_dir: PathBuf::from(
                lookup("REPORTS_DIR").unwrap_or_else(|| "outputs/reports".into()),
            ),
            tickers: lookup("TICKERS").map(|s| parse_tickers(&s)).unwrap_or_default(),
            max_concurrent_tickers,
            scanner,
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> ScanResult<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: Display,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| ScanError::Config(format!("{key}: {e}"))),
        None => Ok(default),
    }
}

fn parse_edges(raw: &str) -> ScanResult<[f64; 3]> {
    let parts: Vec<f64> = raw
        .split(',')
        .map(|p| p.trim().parse::<f64>())
        .collect::<Result<_, _>>()
        .map_err(|e| ScanError::Config(format!("DELTA_BUCKET_EDGES: {e}")))?;

    <[f64; 3]>::try_from(parts.as_slice()).map_err(|_| {
        ScanError::Config(format!("DELTA_BUCKET_EDGES: expected 3 values, got {}", parts.len()))
    })
}

/// Comma or whitespace separated, upper-cased, empties and repeats dropped.
/// First occurrence wins, so the order is the order given.
pub fn parse_tickers(raw: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    raw.split(|c: char| c == ',' || c.is_whitespace())
        .filter(|t| !t.is_empty())
        .map(|t| t.to_ascii_uppercase())
        .filter(|t| seen.insert(t.clone()))
        .collect()
}
