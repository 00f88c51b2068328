pub mod black_scholes;

use crate::chain::types::OptionType;
use crate::errors::{ScanError, ScanResult};
use serde::Serialize;

/// Bounds for the implied-volatility search.
pub const MIN_VOL: f64 = 0.001;
pub const MAX_VOL: f64 = 5.0;

/// All pricing models implement this trait.
/// Every method is a pure function of its inputs.
/// Send + Sync required so one model can serve every ticker task.
pub trait PricingModel: Send + Sync {
    fn name(&self) -> &'static str;

    /// Theoretical price at `vol`. Intrinsic value when ttl is zero.
    fn price(&self, params: &ContractParams, vol: f64, rate: f64) -> ScanResult<f64>;

    /// Analytic sensitivities at `vol`.
    fn greeks(&self, params: &ContractParams, vol: f64, rate: f64) -> ScanResult<Greeks>;

    /// Volatility in [MIN_VOL, MAX_VOL] that reproduces `market_price`.
    fn implied_volatility(
        &self,
        params: &ContractParams,
        market_price: f64,
        rate: f64,
    ) -> ScanResult<f64>;
}

/// Validated pricing inputs for one contract. Stack-allocated, Copy.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContractParams {
    pub spot: f64,
    pub strike: f64,
    pub ttl_years: f64,
    pub option_type: OptionType,
}

impl ContractParams {
    pub fn new(spot: f64, strike: f64, ttl_years: f64, option_type: OptionType) -> ScanResult<Self> {
        if !(spot.is_finite() && spot > 0.0) {
            return Err(ScanError::InvalidInput(format!("spot must be positive, got {spot}")));
        }
        if !(strike.is_finite() && strike > 0.0) {
            return Err(ScanError::InvalidInput(format!("strike must be positive, got {strike}")));
        }
        if !(ttl_years.is_finite() && ttl_years >= 0.0) {
            return Err(ScanError::InvalidInput(format!(
                "time to expiry must be non-negative, got {ttl_years}"
            )));
        }
        Ok(Self { spot, strike, ttl_years, option_type })
    }

    #[inline]
    pub fn intrinsic(&self) -> f64 {
        self.option_type.intrinsic(self.spot, self.strike)
    }
}

/// Option sensitivities.
/// Theta is per calendar day; vega and rho are per one percentage point.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Greeks {
    pub delta: f64,
    pub gamma: f64,
    pub theta: f64,
    pub vega: f64,
    pub rho: f64,
}

#[inline]
pub(crate) fn check_vol(vol: f64) -> ScanResult<()> {
    if vol.is_finite() && vol > 0.0 {
        Ok(())
    } else {
        Err(ScanError::InvalidInput(format!("volatility must be positive, got {vol}")))
    }
}

#[inline]
pub(crate) fn check_rate(rate: f64) -> ScanResult<()> {
    if rate.is_finite() {
        Ok(())
    } else {
        Err(ScanError::InvalidInput(format!("risk-free rate must be finite, got {rate}")))
    }
}
