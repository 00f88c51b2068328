use crate::chain::types::OptionType;
use crate::errors::{ScanError, ScanResult};
use crate::models::{check_rate, check_vol, ContractParams, Greeks, PricingModel, MAX_VOL, MIN_VOL};
use statrs::distribution::{Continuous, ContinuousCDF, Normal};

/// Newton/bisection iteration cap for the IV solve.
const MAX_ITERATIONS: usize = 100;

/// Absolute price tolerance for the IV solve.
const PRICE_TOLERANCE: f64 = 1e-8;

/// Below this total standard deviation (sigma * sqrt(T)) the option is priced at intrinsic.
const MIN_STD_DEV: f64 = 1e-12;

/// Black-Scholes European option pricing (no dividends).
///
/// d1 = (ln(S/K) + (r + sigma^2/2)*T) / (sigma * sqrt(T))
/// d2 = d1 - sigma * sqrt(T)
///
/// call = S*N(d1) - K*e^(-rT)*N(d2)
/// put  = K*e^(-rT)*N(-d2) - S*N(-d1)
pub struct BlackScholes {
    /// Standard normal distribution (created once, reused)
    normal: Normal,
}

impl BlackScholes {
    pub fn new() -> Self {
        Self { normal: Normal::standard() }
    }

    #[inline]
    fn d1_d2(&self, p: &ContractParams, vol: f64, rate: f64) -> (f64, f64) {
        let std_dev = vol * p.ttl_years.sqrt();
        let d1 = ((p.spot / p.strike).ln() + (rate + 0.5 * vol * vol) * p.ttl_years) / std_dev;
        (d1, d1 - std_dev)
    }

    /// Price without input validation. Callers guarantee valid params and vol.
    #[inline]
    fn price_unchecked(&self, p: &ContractParams, vol: f64, rate: f64) -> f64 {
        if vol * p.ttl_years.sqrt() < MIN_STD_DEV {
            return p.intrinsic();
        }

        let (d1, d2) = self.d1_d2(p, vol, rate);
        let df = (-rate * p.ttl_years).exp();

        match p.option_type {
            OptionType::Call => p.spot * self.normal.cdf(d1) - p.strike * df * self.normal.cdf(d2),
            OptionType::Put => p.strike * df * self.normal.cdf(-d2) - p.spot * self.normal.cdf(-d1),
        }
    }

    /// dV/dsigma per unit vol (not per point). Newton step denominator.
    #[inline]
    fn raw_vega(&self, p: &ContractParams, vol: f64, rate: f64) -> f64 {
        let (d1, _) = self.d1_d2(p, vol, rate);
        p.spot * p.ttl_years.sqrt() * self.normal.pdf(d1)
    }
}

impl Default for BlackScholes {
    fn default() -> Self {
        Self::new()
    }
}

impl PricingModel for BlackScholes {
    #[inline]
    fn name(&self) -> &'static str {
        "Black-Scholes"
    }

    fn price(&self, params: &ContractParams, vol: f64, rate: f64) -> ScanResult<f64> {
        check_vol(vol)?;
        check_rate(rate)?;
        Ok(self.price_unchecked(params, vol, rate))
    }

    fn greeks(&self, p: &ContractParams, vol: f64, rate: f64) -> ScanResult<Greeks> {
        check_vol(vol)?;
        check_rate(rate)?;

        // At expiry: step delta, every other sensitivity is zero
        if vol * p.ttl_years.sqrt() < MIN_STD_DEV {
            let delta = match p.option_type {
                OptionType::Call if p.spot > p.strike => 1.0,
                OptionType::Put if p.spot < p.strike => -1.0,
                _ => 0.0,
            };
            return Ok(Greeks { delta, ..Greeks::default() });
        }

        let t = p.ttl_years;
        let sqrt_t = t.sqrt();
        let (d1, d2) = self.d1_d2(p, vol, rate);
        let pdf_d1 = self.normal.pdf(d1);
        let df = (-rate * t).exp();

        let gamma = pdf_d1 / (p.spot * vol * sqrt_t);
        let vega = p.spot * sqrt_t * pdf_d1 / 100.0;
        let decay = -(p.spot * pdf_d1 * vol) / (2.0 * sqrt_t);

        let (delta, theta_year, rho) = match p.option_type {
            OptionType::Call => (
                self.normal.cdf(d1),
                decay - rate * p.strike * df * self.normal.cdf(d2),
                p.strike * t * df * self.normal.cdf(d2) / 100.0,
            ),
            OptionType::Put => (
                self.normal.cdf(d1) - 1.0,
                decay + rate * p.strike * df * self.normal.cdf(-d2),
                -p.strike * t * df * self.normal.cdf(-d2) / 100.0,
            ),
        };

        Ok(Greeks {
            delta: delta.clamp(-1.0, 1.0),
            gamma: gamma.max(0.0),
            theta: theta_year / 365.0,
            vega: vega.max(0.0),
            rho,
        })
    }

    /// Newton-Raphson on vega, falling back to bisection whenever the Newton
    /// step leaves the current bracket or vega vanishes.
    fn implied_volatility(
        &self,
        p: &ContractParams,
        market_price: f64,
        rate: f64,
    ) -> ScanResult<f64> {
        check_rate(rate)?;
        if !(market_price.is_finite() && market_price > 0.0) {
            return Err(ScanError::InvalidInput(format!(
                "market price must be positive, got {market_price}"
            )));
        }
        if p.ttl_years <= 0.0 {
            return Err(ScanError::Convergence("no time value left to invert".into()));
        }

        // Price is monotone increasing in vol: the search range maps to [floor, cap]
        let floor = self.price_unchecked(p, MIN_VOL, rate);
        let cap = self.price_unchecked(p, MAX_VOL, rate);
        if market_price < floor - PRICE_TOLERANCE {
            return Err(ScanError::Convergence(format!(
                "price {market_price:.4} below achievable floor {floor:.4}"
            )));
        }
        if market_price > cap + PRICE_TOLERANCE {
            return Err(ScanError::Convergence(format!(
                "price {market_price:.4} above achievable cap {cap:.4}"
            )));
        }

        let (mut lo, mut hi) = (MIN_VOL, MAX_VOL);

        // Brenner-Subrahmanyam seed
        let seed = (2.0 * std::f64::consts::PI / p.ttl_years).sqrt() * market_price / p.spot;
        let mut vol = seed.clamp(0.05, 3.0);

        for _ in 0..MAX_ITERATIONS {
            let diff = self.price_unchecked(p, vol, rate) - market_price;
            if diff.abs() < PRICE_TOLERANCE {
                return Ok(vol);
            }

            if diff > 0.0 {
                hi = vol;
            } else {
                lo = vol;
            }

            let vega = self.raw_vega(p, vol, rate);
            let newton = vol - diff / vega;
            vol = if vega > 1e-12 && newton > lo && newton < hi {
                newton
            } else {
                0.5 * (lo + hi)
            };
        }

        Err(ScanError::Convergence(format!(
            "no convergence after {MAX_ITERATIONS} iterations (bracket {lo:.6}..{hi:.6})"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RATE: f64 = 0.045;

    fn params(spot: f64, strike: f64, ttl: f64, option_type: OptionType) -> ContractParams {
        ContractParams::new(spot, strike, ttl, option_type).unwrap()
    }

    #[test]
    fn test_atm_call_reference_value() {
        // S=K=100, T=1, r=0.05, sigma=0.2 -> 10.4506 (textbook value)
        let bs = BlackScholes::new();
        let p = params(100.0, 100.0, 1.0, OptionType::Call);
        let price = bs.price(&p, 0.2, 0.05).unwrap();
        assert!((price - 10.4506).abs() < 1e-3, "ATM call={price}");
    }

    #[test]
    fn test_put_call_parity() {
        let bs = BlackScholes::new();
        let call = bs.price(&params(105.0, 100.0, 0.5, OptionType::Call), 0.3, RATE).unwrap();
        let put = bs.price(&params(105.0, 100.0, 0.5, OptionType::Put), 0.3, RATE).unwrap();
        let parity = 105.0 - 100.0 * (-RATE * 0.5_f64).exp();
        assert!((call - put - parity).abs() < 1e-9, "C-P={} parity={parity}", call - put);
    }

    #[test]
    fn test_zero_ttl_returns_intrinsic() {
        let bs = BlackScholes::new();
        let call = bs.price(&params(110.0, 100.0, 0.0, OptionType::Call), 0.25, RATE).unwrap();
        let put = bs.price(&params(110.0, 100.0, 0.0, OptionType::Put), 0.25, RATE).unwrap();
        assert_eq!(call, 10.0);
        assert_eq!(put, 0.0);

        let g = bs.greeks(&params(110.0, 100.0, 0.0, OptionType::Call), 0.25, RATE).unwrap();
        assert_eq!(g.delta, 1.0);
        assert_eq!(g.gamma, 0.0);
    }

    #[test]
    fn test_invalid_vol_rejected() {
        let bs = BlackScholes::new();
        let p = params(100.0, 100.0, 0.5, OptionType::Call);
        assert!(matches!(bs.price(&p, 0.0, RATE), Err(ScanError::InvalidInput(_))));
        assert!(matches!(bs.greeks(&p, -0.2, RATE), Err(ScanError::InvalidInput(_))));
        assert!(matches!(bs.price(&p, 0.2, f64::NAN), Err(ScanError::InvalidInput(_))));
    }

    #[test]
    fn test_greek_signs_and_bounds() {
        let bs = BlackScholes::new();
        for &strike in &[60.0, 90.0, 100.0, 110.0, 160.0] {
            for &vol in &[0.05, 0.3, 1.5] {
                let call = bs.greeks(&params(100.0, strike, 0.25, OptionType::Call), vol, RATE).unwrap();
                let put = bs.greeks(&params(100.0, strike, 0.25, OptionType::Put), vol, RATE).unwrap();

                assert!((0.0..=1.0).contains(&call.delta), "call delta={}", call.delta);
                assert!((-1.0..=0.0).contains(&put.delta), "put delta={}", put.delta);
                assert!(call.gamma >= 0.0 && put.gamma >= 0.0);
                assert!(call.vega >= 0.0 && put.vega >= 0.0);
                assert!((call.gamma - put.gamma).abs() < 1e-12);
                assert!(call.rho >= 0.0 && put.rho <= 0.0);
            }
        }
    }

    #[test]
    fn test_atm_theta_is_daily_decay() {
        let bs = BlackScholes::new();
        let p = params(100.0, 100.0, 30.0 / 365.0, OptionType::Call);
        let g = bs.greeks(&p, 0.25, RATE).unwrap();
        assert!(g.theta < 0.0, "long call theta should be negative: {}", g.theta);

        // Per-day theta should roughly match a one-day reprice
        let today = bs.price(&p, 0.25, RATE).unwrap();
        let tomorrow = bs.price(&params(100.0, 100.0, 29.0 / 365.0, OptionType::Call), 0.25, RATE).unwrap();
        assert!((tomorrow - today - g.theta).abs() < 0.01, "theta={} reprice={}", g.theta, tomorrow - today);
    }

    #[test]
    fn test_iv_round_trip() {
        let bs = BlackScholes::new();
        for option_type in [OptionType::Call, OptionType::Put] {
            for &(strike, ttl, vol) in &[
                (100.0, 0.5, 0.25),
                (80.0, 0.1, 0.60),
                (130.0, 1.5, 0.35),
                (100.0, 7.0 / 365.0, 0.15),
                (95.0, 2.0, 2.5),
            ] {
                let p = params(100.0, strike, ttl, option_type);
                let market = bs.price(&p, vol, RATE).unwrap();
                let iv = bs.implied_volatility(&p, market, RATE).unwrap();
                let repriced = bs.price(&p, iv, RATE).unwrap();
                assert!(
                    (repriced - market).abs() < 1e-6,
                    "{option_type} K={strike} T={ttl}: market={market} repriced={repriced}"
                );
                assert!((MIN_VOL..=MAX_VOL).contains(&iv));
            }
        }
    }

    #[test]
    fn test_iv_recovers_input_vol_when_vega_is_material() {
        let bs = BlackScholes::new();
        let p = params(100.0, 100.0, 0.5, OptionType::Call);
        let market = bs.price(&p, 0.42, RATE).unwrap();
        let iv = bs.implied_volatility(&p, market, RATE).unwrap();
        assert!((iv - 0.42).abs() < 1e-6, "iv={iv}");
    }

    #[test]
    fn test_iv_below_intrinsic_fails() {
        let bs = BlackScholes::new();
        // Put intrinsic is 20; no vol produces 15
        let p = params(80.0, 100.0, 0.5, OptionType::Put);
        assert!(matches!(bs.implied_volatility(&p, 15.0, RATE), Err(ScanError::Convergence(_))));

        let p = params(120.0, 100.0, 0.5, OptionType::Call);
        assert!(matches!(bs.implied_volatility(&p, 15.0, RATE), Err(ScanError::Convergence(_))));
    }

    #[test]
    fn test_iv_above_cap_fails() {
        let bs = BlackScholes::new();
        // A call can never be worth more than the underlying
        let p = params(100.0, 100.0, 0.5, OptionType::Call);
        assert!(matches!(bs.implied_volatility(&p, 150.0, RATE), Err(ScanError::Convergence(_))));
    }

    #[test]
    fn test_iv_rejects_bad_price_and_zero_ttl() {
        let bs = BlackScholes::new();
        let p = params(100.0, 100.0, 0.5, OptionType::Call);
        assert!(matches!(bs.implied_volatility(&p, 0.0, RATE), Err(ScanError::InvalidInput(_))));

        let expired = params(100.0, 100.0, 0.0, OptionType::Call);
        assert!(matches!(bs.implied_volatility(&expired, 1.0, RATE), Err(ScanError::Convergence(_))));
    }
}
