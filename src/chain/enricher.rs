use crate::chain::types::{Contract, EnrichedContract, OptionType};
use crate::errors::{ScanError, ScanResult};
use crate::models::{ContractParams, Greeks, PricingModel};
use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;

/// US equity options stop trading at 16:00 ET; 21:00 UTC covers both EST and EDT.
const EXPIRY_CLOSE_UTC_HOUR: u32 = 21;

/// ACT/365 year fraction.
const SECONDS_PER_YEAR: f64 = 365.0 * 24.0 * 3600.0;

/// A contract dropped before enrichment, with enough context to find it again.
#[derive(Debug, Clone, Serialize)]
pub struct Rejection {
    pub ticker: String,
    pub expiry: NaiveDate,
    pub strike: f64,
    pub option_type: OptionType,
    pub reason: String,
}

/// Output of one enrichment pass. `contracts` keeps input order.
#[derive(Debug, Clone, Default)]
pub struct Enrichment {
    pub contracts: Vec<EnrichedContract>,
    pub rejected: Vec<Rejection>,
}

impl Enrichment {
    /// Records whose implied volatility could not be solved.
    pub fn unresolved(&self) -> usize {
        self.contracts.iter().filter(|c| c.implied_vol.is_none()).count()
    }
}

/// Applies a pricing model to every contract of a chain snapshot.
/// A bad contract is rejected or left unresolved; it never aborts the batch.
#[derive(Clone)]
pub struct ChainEnricher {
    model: Arc<dyn PricingModel>,
}

struct Solved {
    contract: Contract,
    params: ContractParams,
    market_price: Option<f64>,
    fit: Option<(f64, Greeks)>,
}

impl ChainEnricher {
    pub fn new(model: Arc<dyn PricingModel>) -> Self {
        Self { model }
    }

    pub fn model_name(&self) -> &'static str {
        self.model.name()
    }

    pub fn enrich(&self, raw_chain: &[Contract], rate: f64, as_of: DateTime<Utc>) -> Enrichment {
        let mut rejected = Vec::new();
        let mut solved = Vec::with_capacity(raw_chain.len());

        // ── Pass 1: validate and solve IV per contract ──
        for contract in raw_chain {
            let params = match validate(contract, as_of) {
                Ok(p) => p,
                Err(e) => {
                    tracing::debug!(
                        ticker = %contract.ticker,
                        strike = contract.strike,
                        expiry = %contract.expiry,
                        option_type = %contract.option_type,
                        reason = %e,
                        "contract rejected"
                    );
                    rejected.push(Rejection {
                        ticker: contract.ticker.clone(),
                        expiry: contract.expiry,
                        strike: contract.strike,
                        option_type: contract.option_type,
                        reason: e.to_string(),
                    });
                    continue;
                }
            };

            let market_price = contract.market_price();
            let fit = market_price
                .ok_or_else(|| ScanError::Convergence("no usable market price".into()))
                .and_then(|m| self.model.implied_volatility(&params, m, rate))
                .and_then(|iv| self.model.greeks(&params, iv, rate).map(|g| (iv, g)));

            let fit = match fit {
                Ok(f) => Some(f),
                Err(e) => {
                    tracing::debug!(
                        ticker = %contract.ticker,
                        strike = contract.strike,
                        expiry = %contract.expiry,
                        option_type = %contract.option_type,
                        reason = %e,
                        "implied volatility unresolved"
                    );
                    None
                }
            };

            solved.push(Solved { contract: contract.clone(), params, market_price, fit });
        }

        // ── Pass 2: reference vol per expiry, theoretical prices ──
        let medians = median_iv_by_expiry(&solved);

        let contracts = solved
            .into_iter()
            .map(|s| {
                let reference_vol = s
                    .contract
                    .vendor_iv
                    .filter(|v| v.is_finite() && *v > 0.0)
                    .or_else(|| medians.get(&(s.contract.ticker.clone(), s.contract.expiry)).copied());
                let theoretical_price =
                    reference_vol.and_then(|v| self.model.price(&s.params, v, rate).ok());

                EnrichedContract {
                    ttl_years: s.params.ttl_years,
                    mid: s.contract.mid(),
                    market_price: s.market_price,
                    implied_vol: s.fit.map(|(iv, _)| iv),
                    greeks: s.fit.map(|(_, g)| g),
                    reference_vol,
                    theoretical_price,
                    contract: s.contract,
                }
            })
            .collect();

        Enrichment { contracts, rejected }
    }
}

/// Contract-level checks plus pricing params at `as_of`.
fn validate(contract: &Contract, as_of: DateTime<Utc>) -> ScanResult<ContractParams> {
    let ttl_years = time_to_expiry(contract.expiry, as_of)?;
    if ttl_years <= 0.0 {
        return Err(ScanError::InvalidInput(format!("expired on {}", contract.expiry)));
    }

    if contract.bid.is_some_and(|b| b < 0.0) || contract.ask.is_some_and(|a| a < 0.0) {
        return Err(ScanError::InvalidInput("negative quote".into()));
    }
    if let (Some(bid), Some(ask)) = (contract.bid, contract.ask) {
        if bid > 0.0 && ask > 0.0 && bid > ask {
            return Err(ScanError::InvalidInput(format!("crossed quote: bid {bid} > ask {ask}")));
        }
    }

    ContractParams::new(contract.spot, contract.strike, ttl_years, contract.option_type)
}

/// Years from `as_of` to the expiry session close. Negative once expired.
pub fn time_to_expiry(expiry: NaiveDate, as_of: DateTime<Utc>) -> ScanResult<f64> {
    let close = expiry
        .and_hms_opt(EXPIRY_CLOSE_UTC_HOUR, 0, 0)
        .ok_or_else(|| ScanError::InvalidInput(format!("bad expiry {expiry}")))?
        .and_utc();
    Ok((close - as_of).num_seconds() as f64 / SECONDS_PER_YEAR)
}

fn median_iv_by_expiry(solved: &[Solved]) -> HashMap<(String, NaiveDate), f64> {
    let mut groups: HashMap<(String, NaiveDate), Vec<f64>> = HashMap::new();
    for s in solved {
        if let Some((iv, _)) = s.fit {
            groups
                .entry((s.contract.ticker.clone(), s.contract.expiry))
                .or_default()
                .push(iv);
        }
    }

    groups
        .into_iter()
        .map(|(key, mut ivs)| {
            ivs.sort_by(f64::total_cmp);
            let n = ivs.len();
            let median = if n % 2 == 1 {
                ivs[n / 2]
            } else {
                0.5 * (ivs[n / 2 - 1] + ivs[n / 2])
            };
            (key, median)
        })
        .collect()
}
