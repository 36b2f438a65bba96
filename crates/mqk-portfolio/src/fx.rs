//! FX snapshot and hedge-quantity service (§4.6).
//!
//! A snapshot holds direct rates keyed by `(from_ccy, to_ccy)`; lookups fall
//! back to the inverse rate, then to a cross rate via `base_ccy`. Pure,
//! deterministic, no network/refresh logic (that lives at the adapter
//! boundary, out of scope here).

use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FxError {
    NoRate { from: String, to: String },
}

impl std::fmt::Display for FxError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoRate { from, to } => write!(f, "no FX rate available for {from}/{to}"),
        }
    }
}

impl std::error::Error for FxError {}

/// A snapshot of FX rates against a base currency, with an age stamp for
/// staleness checks. `age_ms` is caller-supplied (no wall-clock reads here).
#[derive(Debug, Clone)]
pub struct FxSnapshot {
    pub base_ccy: String,
    rates: BTreeMap<(String, String), f64>,
    pub age_ms: i64,
}

impl FxSnapshot {
    pub fn new(base_ccy: impl Into<String>) -> Self {
        Self {
            base_ccy: base_ccy.into(),
            rates: BTreeMap::new(),
            age_ms: 0,
        }
    }

    pub fn set_rate(&mut self, from_ccy: &str, to_ccy: &str, rate: f64) {
        self.rates
            .insert((from_ccy.to_string(), to_ccy.to_string()), rate);
    }

    /// Units of `to_ccy` per unit of `from_ccy`. Tries direct, then inverse,
    /// then a cross rate routed through `base_ccy`.
    pub fn get_rate(&self, from_ccy: &str, to_ccy: &str) -> Result<f64, FxError> {
        if from_ccy == to_ccy {
            return Ok(1.0);
        }
        if let Some(&r) = self.rates.get(&(from_ccy.to_string(), to_ccy.to_string())) {
            return Ok(r);
        }
        if let Some(&r) = self.rates.get(&(to_ccy.to_string(), from_ccy.to_string())) {
            return Ok(1.0 / r);
        }
        if from_ccy != self.base_ccy && to_ccy != self.base_ccy {
            let from_base = self.get_rate(from_ccy, &self.base_ccy)?;
            let to_base = self.get_rate(to_ccy, &self.base_ccy)?;
            return Ok(from_base / to_base);
        }
        Err(FxError::NoRate {
            from: from_ccy.to_string(),
            to: to_ccy.to_string(),
        })
    }

    pub fn convert(&self, amount: f64, from_ccy: &str, to_ccy: &str) -> Result<f64, FxError> {
        Ok(amount * self.get_rate(from_ccy, to_ccy)?)
    }

    pub fn to_base(&self, amount: f64, from_ccy: &str) -> Result<f64, FxError> {
        let base = self.base_ccy.clone();
        self.convert(amount, from_ccy, &base)
    }

    pub fn is_stale(&self, max_age_ms: i64) -> bool {
        self.age_ms > max_age_ms
    }
}

/// `cash_in_base = sum(to_base(amount, ccy))` across all currency buckets.
pub fn cash_in_base_ccy(
    cash_by_ccy: &BTreeMap<String, f64>,
    snapshot: &FxSnapshot,
) -> Result<f64, FxError> {
    let mut total = 0.0;
    for (ccy, &amount) in cash_by_ccy {
        total += snapshot.to_base(amount, ccy)?;
    }
    Ok(total)
}

/// `net_fx_exposure[ccy] = sum(position market values in ccy) + cash[ccy]`,
/// with the base currency omitted (no hedge needed against itself).
pub fn compute_net_fx_exposure(
    position_values_by_ccy: &BTreeMap<String, f64>,
    cash_by_ccy: &BTreeMap<String, f64>,
    base_ccy: &str,
) -> BTreeMap<String, f64> {
    let mut exposure = position_values_by_ccy.clone();
    for (ccy, &amount) in cash_by_ccy {
        *exposure.entry(ccy.clone()).or_insert(0.0) += amount;
    }
    exposure.remove(base_ccy);
    exposure
}

/// `hedge_contracts[ccy] = -round(exposure[ccy] * hedge_ratio / contract_size[ccy])`.
/// Currencies with no known contract size are skipped.
pub fn compute_fx_hedge_quantities(
    net_fx_exposure: &BTreeMap<String, f64>,
    hedge_ratio: f64,
    contract_sizes: &BTreeMap<String, f64>,
) -> BTreeMap<String, i64> {
    let mut hedges = BTreeMap::new();
    for (ccy, &exposure) in net_fx_exposure {
        let Some(&contract_size) = contract_sizes.get(ccy) else {
            continue;
        };
        if contract_size <= 0.0 {
            continue;
        }
        let hedge_notional = exposure * hedge_ratio;
        let contracts = (hedge_notional / contract_size).round() as i64;
        hedges.insert(ccy.clone(), -contracts);
    }
    hedges
}

/// Default micro-futures contract sizes per hedged currency, grounded on
/// the reference's M6E/M6B/M6S/M6J/MCD/M6A table.
pub fn default_contract_sizes() -> BTreeMap<String, f64> {
    [
        ("EUR", 12_500.0),
        ("GBP", 6_250.0),
        ("CHF", 12_500.0),
        ("JPY", 1_250_000.0),
        ("CAD", 10_000.0),
        ("AUD", 10_000.0),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v))
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_rate_is_one() {
        let snap = FxSnapshot::new("USD");
        assert_eq!(snap.get_rate("USD", "USD").unwrap(), 1.0);
    }

    #[test]
    fn direct_and_inverse_rate_agree() {
        let mut snap = FxSnapshot::new("USD");
        snap.set_rate("EUR", "USD", 1.05);
        assert_eq!(snap.get_rate("EUR", "USD").unwrap(), 1.05);
        assert!((snap.get_rate("USD", "EUR").unwrap() - 1.0 / 1.05).abs() < 1e-12);
    }

    #[test]
    fn cross_rate_routes_via_base() {
        let mut snap = FxSnapshot::new("USD");
        snap.set_rate("EUR", "USD", 1.10);
        snap.set_rate("GBP", "USD", 1.25);
        let cross = snap.get_rate("EUR", "GBP").unwrap();
        assert!((cross - (1.10 / 1.25)).abs() < 1e-12);
    }

    #[test]
    fn missing_rate_errors() {
        let snap = FxSnapshot::new("USD");
        assert!(snap.get_rate("EUR", "GBP").is_err());
    }

    #[test]
    fn net_fx_exposure_omits_base_currency() {
        let mut positions = BTreeMap::new();
        positions.insert("EUR".to_string(), -1_400_000.0);
        positions.insert("USD".to_string(), 500_000.0);
        let cash = BTreeMap::new();
        let exposure = compute_net_fx_exposure(&positions, &cash, "USD");
        assert!(!exposure.contains_key("USD"));
        assert_eq!(exposure["EUR"], -1_400_000.0);
    }

    #[test]
    fn hedge_quantities_are_negative_of_exposure_direction() {
        let mut exposure = BTreeMap::new();
        exposure.insert("EUR".to_string(), 1_250_000.0);
        let hedges = compute_fx_hedge_quantities(&exposure, 1.0, &default_contract_sizes());
        // long 1.25mm EUR exposure -> short 100 EUR futures to hedge
        assert_eq!(hedges["EUR"], -100);
    }

    #[test]
    fn hedge_quantities_skip_unknown_currency() {
        let mut exposure = BTreeMap::new();
        exposure.insert("SEK".to_string(), 1_000_000.0);
        let hedges = compute_fx_hedge_quantities(&exposure, 1.0, &default_contract_sizes());
        assert!(hedges.is_empty());
    }

    #[test]
    fn is_stale_compares_against_max_age() {
        let mut snap = FxSnapshot::new("USD");
        snap.age_ms = 400_000;
        assert!(snap.is_stale(300_000));
        assert!(!snap.is_stale(500_000));
    }
}
