//! Tail-Hedge Manager (§4.5) — entry, maintenance (roll/monetize) flow for
//! protective option positions paid for out of the annual hedge budget.

use std::collections::BTreeMap;

use crate::budget::HedgeBudget;
use crate::validator::{validate, OptionHedgeType, OptionQuote, ValidationConfig};

#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum HedgeType {
    EquityPut,
    VolCall,
    CreditPut,
    SovereignSpread,
}

impl HedgeType {
    fn option_kind(self) -> OptionHedgeType {
        match self {
            HedgeType::EquityPut => OptionHedgeType::EquityPut,
            HedgeType::VolCall => OptionHedgeType::VolCall,
            HedgeType::CreditPut => OptionHedgeType::CreditPut,
            HedgeType::SovereignSpread => OptionHedgeType::EquityPut,
        }
    }
}

/// Target allocation of the hedge budget across types; must sum to ~1.0.
pub fn default_allocation() -> BTreeMap<HedgeType, f64> {
    let mut m = BTreeMap::new();
    m.insert(HedgeType::VolCall, 0.45);
    m.insert(HedgeType::EquityPut, 0.30);
    m.insert(HedgeType::CreditPut, 0.15);
    m.insert(HedgeType::SovereignSpread, 0.10);
    m
}

#[derive(Clone, Debug, PartialEq)]
pub struct HedgePosition {
    pub hedge_id: String,
    pub hedge_type: HedgeType,
    pub instrument_id: String,
    pub quantity: i64,
    pub premium_paid: f64,
    pub current_value: f64,
    pub days_to_expiry: i64,
    pub is_active: bool,
}

impl HedgePosition {
    pub fn pnl(&self) -> f64 {
        self.current_value - self.premium_paid
    }
}

const MIN_DTE_ROLL: i64 = 21;

/// Roll any active leg whose DTE has dropped to the roll threshold. Returns
/// the ids of legs marked inactive (the replacement is the caller's
/// responsibility once a fresh option chain candidate is validated).
pub fn legs_needing_roll(positions: &[HedgePosition]) -> Vec<&HedgePosition> {
    positions
        .iter()
        .filter(|p| p.is_active && p.days_to_expiry <= MIN_DTE_ROLL)
        .collect()
}

/// Monetization: when a daily P&L spike crosses `pnl_spike_threshold`, sell
/// `crisis_redeploy_fraction` of every ITM (positive-PnL) active leg. Returns
/// (symbol, contracts_to_close, realized_value) triples.
pub fn monetize_itm_hedges(
    positions: &[HedgePosition],
    daily_pnl_pct: f64,
    pnl_spike_threshold: f64,
    crisis_redeploy_fraction: f64,
) -> Vec<(String, i64, f64)> {
    if daily_pnl_pct < pnl_spike_threshold {
        return Vec::new();
    }
    positions
        .iter()
        .filter(|p| p.is_active && p.pnl() > 0.0)
        .filter_map(|p| {
            let contracts = (p.quantity.unsigned_abs() as f64 * crisis_redeploy_fraction).floor() as i64;
            if contracts <= 0 {
                return None;
            }
            let realized = p.pnl() / p.quantity.unsigned_abs() as f64 * contracts as f64;
            Some((p.instrument_id.clone(), contracts, realized))
        })
        .collect()
}

/// A sized, validated entry candidate ready to submit to the execution
/// stack (no broker/order-type details here — that's the Execution Policy's
/// job once this becomes a routable intent).
#[derive(Clone, Debug, PartialEq)]
pub struct HedgeEntryPlan {
    pub hedge_type: HedgeType,
    pub contracts: i64,
    pub allocated_dollars: f64,
}

/// For each hedge type under its target allocation, with remaining budget
/// positive, size an entry against a validated option quote. Types whose
/// quote fails validation, or whose current coverage already meets 50% of
/// target, are skipped.
pub fn fill_coverage_gaps(
    budget: &HedgeBudget,
    allocation: &BTreeMap<HedgeType, f64>,
    current_coverage_usd: &BTreeMap<HedgeType, f64>,
    quotes: &BTreeMap<HedgeType, OptionQuote>,
    validation_cfg: &ValidationConfig,
    multiplier: f64,
) -> Vec<HedgeEntryPlan> {
    let remaining = budget.remaining();
    if remaining <= 0.0 {
        return Vec::new();
    }
    let target_coverage = remaining * 0.8;

    let mut plans = Vec::new();
    for (&hedge_type, &target_alloc) in allocation {
        let current = *current_coverage_usd.get(&hedge_type).unwrap_or(&0.0);
        let target_value = target_coverage * target_alloc;
        if current >= target_value * 0.5 {
            continue;
        }
        let Some(quote) = quotes.get(&hedge_type) else {
            continue;
        };
        let gap = target_value - current;
        let result = validate(
            validation_cfg,
            quote,
            hedge_type.option_kind(),
            1,
            remaining,
        );
        if !result.is_valid {
            continue;
        }
        let contracts = crate::validator::size_contracts(gap, quote.premium_per_contract, multiplier);
        if contracts > 0 {
            plans.push(HedgeEntryPlan {
                hedge_type,
                contracts,
                allocated_dollars: gap,
            });
        }
    }
    plans
}
