//! Risk-parity sleeve weighting (§4.3): inverse-vol weights, constraints,
//! portfolio vol targeting, and blending with the base strategy's weights.
//!
//! Pure deterministic logic; no IO, no time. Callers supply vol estimates
//! and a rebalance clock externally.

use std::collections::BTreeMap;

use crate::sleeve::Sleeve;

/// Rebalance cadence for the "calendar" leg of the rebalance trigger.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum RebalanceFrequency {
    Daily,
    Weekly,
    Monthly,
    Quarterly,
}

impl RebalanceFrequency {
    /// Trading-day cadence threshold; `days_since >= cadence_days()` fires
    /// the calendar leg of the rebalance trigger.
    pub fn cadence_days(&self) -> u32 {
        match self {
            RebalanceFrequency::Daily => 1,
            RebalanceFrequency::Weekly => 7,
            RebalanceFrequency::Monthly => 21,
            RebalanceFrequency::Quarterly => 63,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct RiskParityConfig {
    pub target_vol_annual: f64,
    pub vol_floor: f64,
    pub vol_ceiling: f64,
    pub min_sleeve_weight: f64,
    pub max_sleeve_weight: f64,
    pub drift_threshold: f64,
    pub rebalance_frequency: RebalanceFrequency,
    /// Average cross-sleeve correlation used by the simplified portfolio-vol
    /// estimator (no full correlation matrix).
    pub avg_correlation: f64,
    /// Scaling-factor clamp bounds.
    pub scaling_min: f64,
    pub scaling_max: f64,
}

impl RiskParityConfig {
    pub fn sane_defaults() -> Self {
        Self {
            target_vol_annual: 0.12,
            vol_floor: 0.06,
            vol_ceiling: 0.30,
            min_sleeve_weight: 0.05,
            max_sleeve_weight: 0.40,
            drift_threshold: 0.05,
            rebalance_frequency: RebalanceFrequency::Monthly,
            avg_correlation: 0.5,
            scaling_min: 0.5,
            scaling_max: 2.0,
        }
    }
}

/// Blended per-sleeve volatility: `0.7*ewma + 0.3*realized_60d`, clamped to
/// `[vol_floor, vol_ceiling]`. Falls back to `prior` when fewer than 5 days
/// of history back the estimate.
pub fn blended_vol(
    cfg: &RiskParityConfig,
    ewma_vol: f64,
    realized_vol_60d: f64,
    history_days: usize,
    prior: f64,
) -> f64 {
    if history_days < 5 {
        return prior.clamp(cfg.vol_floor, cfg.vol_ceiling);
    }
    let blended = 0.7 * ewma_vol + 0.3 * realized_vol_60d;
    blended.clamp(cfg.vol_floor, cfg.vol_ceiling)
}

/// Inverse-vol weights, normalized to sum to 1.0. Falls back to equal
/// weight if every input vol is non-positive after flooring (never happens
/// given the floor, but mirrors the reference's defensive fallback).
pub fn compute_inverse_vol_weights(
    cfg: &RiskParityConfig,
    sleeve_vols: &BTreeMap<Sleeve, f64>,
) -> BTreeMap<Sleeve, f64> {
    let inverse_vols: BTreeMap<Sleeve, f64> = sleeve_vols
        .iter()
        .map(|(&sleeve, &vol)| (sleeve, 1.0 / vol.max(cfg.vol_floor)))
        .collect();

    let total: f64 = inverse_vols.values().sum();
    if total <= 0.0 {
        let n = inverse_vols.len().max(1) as f64;
        return inverse_vols.keys().map(|&s| (s, 1.0 / n)).collect();
    }

    inverse_vols
        .into_iter()
        .map(|(s, inv)| (s, inv / total))
        .collect()
}

/// Apply per-sleeve `[min_w, max_w]` constraints, redistributing
/// overflow/underflow across the sleeves still strictly inside the band,
/// then renormalizing to sum to 1.0.
pub fn apply_weight_constraints(
    cfg: &RiskParityConfig,
    weights: &BTreeMap<Sleeve, f64>,
) -> BTreeMap<Sleeve, f64> {
    let mut constrained = BTreeMap::new();
    let mut overflow = 0.0;
    let mut underflow = 0.0;

    for (&sleeve, &weight) in weights {
        if weight < cfg.min_sleeve_weight {
            underflow += cfg.min_sleeve_weight - weight;
            constrained.insert(sleeve, cfg.min_sleeve_weight);
        } else if weight > cfg.max_sleeve_weight {
            overflow += weight - cfg.max_sleeve_weight;
            constrained.insert(sleeve, cfg.max_sleeve_weight);
        } else {
            constrained.insert(sleeve, weight);
        }
    }

    if overflow > 0.0 || underflow > 0.0 {
        let net_adjustment = overflow - underflow;
        let adjustable: Vec<Sleeve> = constrained
            .iter()
            .filter(|(_, &w)| w > cfg.min_sleeve_weight && w < cfg.max_sleeve_weight)
            .map(|(&s, _)| s)
            .collect();

        if !adjustable.is_empty() {
            let adj_per_sleeve = net_adjustment / adjustable.len() as f64;
            for sleeve in adjustable {
                *constrained.get_mut(&sleeve).unwrap() += adj_per_sleeve;
            }
        }
    }

    let total: f64 = constrained.values().sum();
    if total > 0.0 {
        for w in constrained.values_mut() {
            *w /= total;
        }
    }
    constrained
}

/// Expected portfolio vol: `sqrt(sum(w_i^2*vol_i^2) + 2*sum_{i<j} rho*w_i*w_j*vol_i*vol_j)`.
pub fn expected_portfolio_vol(
    cfg: &RiskParityConfig,
    weights: &BTreeMap<Sleeve, f64>,
    sleeve_vols: &BTreeMap<Sleeve, f64>,
) -> f64 {
    let sleeves: Vec<Sleeve> = weights.keys().copied().collect();
    let mut variance = 0.0;

    for (i, &si) in sleeves.iter().enumerate() {
        let wi = weights[&si];
        let voli = *sleeve_vols.get(&si).unwrap_or(&cfg.vol_floor);
        variance += wi * wi * voli * voli;

        for &sj in &sleeves[i + 1..] {
            let wj = weights[&sj];
            let volj = *sleeve_vols.get(&sj).unwrap_or(&cfg.vol_floor);
            let covariance = cfg.avg_correlation * voli * volj;
            variance += 2.0 * wi * wj * covariance;
        }
    }

    variance.max(0.0).sqrt()
}

/// `target_vol / expected_vol`, clamped to `[scaling_min, scaling_max]`.
pub fn compute_scaling_factor(cfg: &RiskParityConfig, expected_vol: f64) -> f64 {
    if expected_vol <= 0.0 {
        return 1.0;
    }
    (cfg.target_vol_annual / expected_vol).clamp(cfg.scaling_min, cfg.scaling_max)
}

/// Rebalance trigger: max per-sleeve drift over threshold, OR calendar
/// cadence elapsed, OR no prior rebalance at all.
pub fn should_rebalance(
    cfg: &RiskParityConfig,
    current_weights: &BTreeMap<Sleeve, f64>,
    target_weights: &BTreeMap<Sleeve, f64>,
    days_since_last_rebalance: Option<u32>,
) -> (bool, &'static str) {
    let max_drift = target_weights
        .iter()
        .map(|(sleeve, &target)| {
            let current = current_weights.get(sleeve).copied().unwrap_or(0.0);
            (current - target).abs()
        })
        .fold(0.0_f64, f64::max);

    if max_drift >= cfg.drift_threshold {
        return (true, "drift exceeds threshold");
    }

    match days_since_last_rebalance {
        None => (true, "initial rebalance"),
        Some(days) if days >= cfg.rebalance_frequency.cadence_days() => {
            (true, "calendar cadence elapsed")
        }
        Some(_) => (false, "no rebalance needed"),
    }
}

/// Blend the base strategy's weights with risk-parity weights.
///
/// `override_mode = true`: take the risk-parity weight wherever it is
/// positive, else fall back to base. `override_mode = false`: linear blend
/// `final = (1-alpha)*base + alpha*risk_parity`. Result always renormalized
/// to sum to 1.0 (sleeves absent from both inputs are omitted).
pub fn blend_weights(
    base: &BTreeMap<Sleeve, f64>,
    risk_parity: &BTreeMap<Sleeve, f64>,
    alpha: f64,
    override_mode: bool,
) -> BTreeMap<Sleeve, f64> {
    let mut sleeves: Vec<Sleeve> = base.keys().chain(risk_parity.keys()).copied().collect();
    sleeves.sort();
    sleeves.dedup();

    let mut blended: BTreeMap<Sleeve, f64> = sleeves
        .into_iter()
        .map(|sleeve| {
            let b = base.get(&sleeve).copied().unwrap_or(0.0);
            let rp = risk_parity.get(&sleeve).copied().unwrap_or(0.0);
            let w = if override_mode && rp > 0.0 {
                rp
            } else if override_mode {
                b
            } else {
                (1.0 - alpha) * b + alpha * rp
            };
            (sleeve, w.max(0.0))
        })
        .collect();

    let total: f64 = blended.values().sum();
    if total > 0.0 {
        for w in blended.values_mut() {
            *w /= total;
        }
    }
    blended
}

/// Post-blend constraint (i): cap the hedge sleeve's total weight at
/// `max_hedge_pct`, scaling it down proportionally and redistributing the
/// freed weight across the remaining sleeves pro-rata, then renormalize.
pub fn apply_hedge_cap(
    weights: &BTreeMap<Sleeve, f64>,
    max_hedge_pct: f64,
) -> BTreeMap<Sleeve, f64> {
    let hedge_total: f64 = weights
        .iter()
        .filter(|(s, _)| s.is_hedge())
        .map(|(_, &w)| w)
        .sum();

    if hedge_total <= max_hedge_pct || hedge_total <= 0.0 {
        return weights.clone();
    }

    let scale = max_hedge_pct / hedge_total;
    let freed = hedge_total - max_hedge_pct;
    let non_hedge_total: f64 = weights
        .iter()
        .filter(|(s, _)| !s.is_hedge())
        .map(|(_, &w)| w)
        .sum();

    let mut out = BTreeMap::new();
    for (&sleeve, &w) in weights {
        if sleeve.is_hedge() {
            out.insert(sleeve, w * scale);
        } else if non_hedge_total > 0.0 {
            out.insert(sleeve, w + freed * (w / non_hedge_total));
        } else {
            out.insert(sleeve, w);
        }
    }

    let total: f64 = out.values().sum();
    if total > 0.0 {
        for w in out.values_mut() {
            *w /= total;
        }
    }
    out
}
