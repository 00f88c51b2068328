//! Enriched-chain builders shared by scanner tests.

use crate::chain::types::{Contract, EnrichedContract, OptionType};
use crate::models::Greeks;
use chrono::NaiveDate;

/// A liquid, fairly priced, mid-vol ATM call; `edit` tweaks it.
///
/// Quote fields are not re-derived after `edit`: a test that moves
/// bid/ask must also set `mid`/`market_price` (see [`quote`]).
pub(crate) fn enriched(edit: impl FnOnce(&mut EnrichedContract)) -> EnrichedContract {
    let mut c = EnrichedContract {
        contract: Contract {
            ticker: "SPY".into(),
            expiry: NaiveDate::from_ymd_opt(2026, 12, 18).unwrap(),
            strike: 100.0,
            option_type: OptionType::Call,
            bid: Some(1.98),
            ask: Some(2.02),
            last: Some(2.0),
            volume: 1_000,
            open_interest: 500,
            spot: 100.0,
            vendor_iv: None,
            symbol: None,
        },
        ttl_years: 60.0 / 365.0,
        mid: Some(2.0),
        market_price: Some(2.0),
        implied_vol: Some(0.30),
        greeks: Some(Greeks { delta: 0.5, gamma: 0.04, theta: -0.05, vega: 0.16, rho: 0.08 }),
        reference_vol: Some(0.30),
        theoretical_price: Some(2.0),
    };
    edit(&mut c);
    c
}

/// Set bid/ask and the derived mid/market price together.
pub(crate) fn quote(c: &mut EnrichedContract, bid: f64, ask: f64) {
    c.contract.bid = Some(bid);
    c.contract.ask = Some(ask);
    c.mid = c.contract.mid();
    c.market_price = c.contract.market_price();
}

/// Set the delta, keeping the other Greeks.
pub(crate) fn with_delta(c: &mut EnrichedContract, delta: f64) {
    let greeks = c.greeks.get_or_insert_with(Greeks::default);
    greeks.delta = delta;
}
