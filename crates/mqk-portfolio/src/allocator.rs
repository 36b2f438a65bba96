//! mqk-portfolio: allocator
//!
//! §4.3 Sleeve Allocator — produces final sleeve target weights by blending
//! the base strategy's sleeve weights with risk-parity weights, applying
//! the post-blend hedge cap, and deciding whether a rebalance fires this
//! tick.
//!
//! Design notes:
//! - Weights are dimensionless fractions of equity (1.0 = 100 % of NAV).
//! - Pure, no IO, no broker: callers supply per-sleeve signal weights, the
//!   blended vol estimate for each sleeve (see `risk_parity::blended_vol`),
//!   the currently-live weights, and the elapsed days since the last fired
//!   rebalance.
//! - Actually mapping a sleeve's target notional to concrete instrument
//!   orders is strategy logic downstream of this module.

use std::collections::BTreeMap;

use crate::risk_parity::{
    apply_hedge_cap, apply_weight_constraints, blend_weights, compute_inverse_vol_weights,
    compute_scaling_factor, expected_portfolio_vol, should_rebalance, RiskParityConfig,
};
use crate::sleeve::Sleeve;

// ─── Error ───────────────────────────────────────────────────────────────────

/// Errors produced during allocation.
#[derive(Clone, Debug, PartialEq)]
pub enum AllocationError {
    /// Both the base weights and vol universe are empty; nothing to allocate.
    EmptyUniverse,
    /// A sleeve's vol estimate is negative, NaN, or infinite.
    InvalidVol { sleeve: Sleeve },
    /// A sleeve's base weight is NaN or infinite.
    InvalidWeight { sleeve: Sleeve },
}

impl std::fmt::Display for AllocationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyUniverse => write!(f, "no sleeves to allocate: base weights and vols both empty"),
            Self::InvalidVol { sleeve } => write!(f, "invalid (negative/NaN/inf) vol for sleeve '{sleeve}'"),
            Self::InvalidWeight { sleeve } => write!(f, "invalid (NaN/inf) base weight for sleeve '{sleeve}'"),
        }
    }
}

impl std::error::Error for AllocationError {}

// ─── AllocatorConfig ─────────────────────────────────────────────────────────

/// Configuration for one allocation pass.
#[derive(Clone, Debug, PartialEq)]
pub struct AllocatorConfig {
    pub risk_parity: RiskParityConfig,
    /// Blend weight applied when `override_mode` is false:
    /// `final = (1-alpha)*base + alpha*risk_parity`.
    pub blend_alpha: f64,
    /// Override mode takes the risk-parity weight wherever it is positive,
    /// falling back to the base weight otherwise.
    pub override_mode: bool,
    /// Post-blend cap on the crisis/tail-hedge sleeve's total weight.
    pub max_hedge_pct: f64,
}

impl AllocatorConfig {
    pub fn sane_defaults() -> Self {
        Self {
            risk_parity: RiskParityConfig::sane_defaults(),
            blend_alpha: 0.5,
            override_mode: false,
            max_hedge_pct: 0.15,
        }
    }
}

// ─── AllocationDecision ──────────────────────────────────────────────────────

/// The output of one allocation run.
///
/// `weights` are the sleeve target weights that should actually be acted
/// on this tick: the newly-blended weights if `rebalanced`, or the
/// unchanged `current_weights` passed in otherwise (drift alone is not a
/// trade).
#[derive(Clone, Debug, PartialEq)]
pub struct AllocationDecision {
    pub weights: BTreeMap<Sleeve, f64>,
    pub rebalanced: bool,
    pub rebalance_reason: &'static str,
    /// Expected portfolio vol of the blended (pre-gating) target weights.
    pub expected_vol: f64,
    /// `target_vol / expected_vol`, clamped — the sizing multiplier a
    /// downstream engine applies on top of these weights.
    pub scaling_factor: f64,
    pub gross_weight: f64,
    pub net_weight: f64,
}

impl AllocationDecision {
    /// Returns true if no sleeve carries a non-zero weight.
    pub fn is_empty(&self) -> bool {
        self.weights.is_empty() || self.weights.values().all(|w| *w == 0.0)
    }

    /// Number of sleeves in the returned weight map.
    pub fn position_count(&self) -> usize {
        self.weights.len()
    }
}

// ─── Allocator ───────────────────────────────────────────────────────────────

/// Sleeve allocator — blends base strategy weights with risk parity,
/// applies the hedge cap, and gates on the rebalance trigger.
///
/// # Algorithm (§4.3)
///
/// 1. Validate inputs.
/// 2. Inverse-vol risk-parity weights from `sleeve_vols`, constrained to
///    each sleeve's `[min_w, max_w]` band and renormalized.
/// 3. Blend base weights with the constrained risk-parity weights.
/// 4. Cap the hedge sleeve's total weight, redistributing the freed weight
///    pro-rata across the remaining sleeves, then renormalize.
/// 5. Compute expected portfolio vol and the vol-targeting scaling factor
///    off the blended weights.
/// 6. Evaluate the rebalance trigger (drift vs. threshold, or calendar
///    cadence elapsed); if it doesn't fire, return `current_weights`
///    unchanged.
pub struct Allocator {
    config: AllocatorConfig,
}

impl Allocator {
    /// Create an allocator with the given configuration.
    pub fn new(config: AllocatorConfig) -> Self {
        Self { config }
    }

    /// Create an allocator with sane defaults.
    pub fn with_defaults() -> Self {
        Self::new(AllocatorConfig::sane_defaults())
    }

    pub fn config(&self) -> &AllocatorConfig {
        &self.config
    }

    /// Run one allocation pass.
    ///
    /// `base_weights`  — the base strategy's sleeve weights (signal-driven,
    ///                   need not sum to 1.0 or be non-negative).
    /// `sleeve_vols`   — blended per-sleeve vol estimate (see
    ///                   `risk_parity::blended_vol`); sleeves absent here
    ///                   are excluded from the risk-parity leg.
    /// `current_weights` — the weights currently live in the portfolio.
    /// `days_since_last_rebalance` — `None` means no rebalance has ever
    ///                   fired (forces one now).
    pub fn allocate(
        &self,
        base_weights: &BTreeMap<Sleeve, f64>,
        sleeve_vols: &BTreeMap<Sleeve, f64>,
        current_weights: &BTreeMap<Sleeve, f64>,
        days_since_last_rebalance: Option<u32>,
    ) -> Result<AllocationDecision, AllocationError> {
        // ── 0. Guard inputs ──────────────────────────────────────────────────
        if base_weights.is_empty() && sleeve_vols.is_empty() {
            return Err(AllocationError::EmptyUniverse);
        }

        for (&sleeve, &vol) in sleeve_vols {
            if !vol.is_finite() || vol < 0.0 {
                return Err(AllocationError::InvalidVol { sleeve });
            }
        }

        for (&sleeve, &w) in base_weights {
            if !w.is_finite() {
                return Err(AllocationError::InvalidWeight { sleeve });
            }
        }

        let rp_cfg = &self.config.risk_parity;

        // ── 1. Risk-parity leg ───────────────────────────────────────────────
        let raw_rp = compute_inverse_vol_weights(rp_cfg, sleeve_vols);
        let constrained_rp = apply_weight_constraints(rp_cfg, &raw_rp);

        // ── 2. Blend with base ───────────────────────────────────────────────
        let blended = blend_weights(
            base_weights,
            &constrained_rp,
            self.config.blend_alpha,
            self.config.override_mode,
        );

        // ── 3. Post-blend hedge cap ──────────────────────────────────────────
        let final_weights = apply_hedge_cap(&blended, self.config.max_hedge_pct);

        // ── 4. Expected vol + scaling factor off the blended target ─────────
        let expected_vol = expected_portfolio_vol(rp_cfg, &final_weights, sleeve_vols);
        let scaling_factor = compute_scaling_factor(rp_cfg, expected_vol);

        // ── 5. Rebalance gate ─────────────────────────────────────────────────
        let (rebalanced, rebalance_reason) = should_rebalance(
            rp_cfg,
            current_weights,
            &final_weights,
            days_since_last_rebalance,
        );

        let weights = if rebalanced {
            final_weights
        } else {
            current_weights.clone()
        };

        let gross_weight: f64 = weights.values().map(|w| w.abs()).sum();
        let net_weight: f64 = weights.values().sum();

        Ok(AllocationDecision {
            weights,
            rebalanced,
            rebalance_reason,
            expected_vol,
            scaling_factor,
            gross_weight,
            net_weight,
        })
    }
}

impl Default for Allocator {
    fn default() -> Self {
        Self::with_defaults()
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────────
