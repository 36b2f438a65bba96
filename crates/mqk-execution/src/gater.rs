//! Trade Gater (§4.4.6) — decides whether a drift between current and
//! target weight is worth trading, net of estimated transaction cost, unless
//! an override condition forces the trade regardless of cost.

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum OverrideReason {
    GrossBreach,
    NetBreach,
    FxBreach,
    EmergencyDeRisk,
    ReconciliationFailed,
    CrisisUrgency,
    Hedge,
}

#[derive(Clone, Debug, PartialEq)]
pub struct GaterInput {
    pub current_weight: f64,
    pub target_weight: f64,
    pub nav_micros: i64,
    pub notional_micros: i64,
    /// bps: slippage + commission + borrow + dividend buffer, summed.
    pub cost_bps: f64,
    pub min_drift: f64,
    pub regime_mult: f64,
    pub cost_mult: f64,
    pub override_reason: Option<OverrideReason>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct GaterDecision {
    pub should_trade: bool,
    pub drift: f64,
    pub predicted_cost_micros: f64,
    pub predicted_benefit_micros: f64,
    pub reason: &'static str,
}

/// Decide whether a position should be traded toward its target this tick.
pub fn should_trade(input: &GaterInput) -> GaterDecision {
    if let Some(reason) = input.override_reason {
        return GaterDecision {
            should_trade: true,
            drift: (input.current_weight - input.target_weight).abs(),
            predicted_cost_micros: 0.0,
            predicted_benefit_micros: 0.0,
            reason: override_reason_str(reason),
        };
    }

    let drift = (input.current_weight - input.target_weight).abs();
    let required_drift = input.min_drift * input.regime_mult;
    if drift < required_drift {
        return GaterDecision {
            should_trade: false,
            drift,
            predicted_cost_micros: 0.0,
            predicted_benefit_micros: 0.0,
            reason: "drift below threshold",
        };
    }

    let notional = input.notional_micros as f64;
    let predicted_cost_micros = notional * input.cost_bps / 10_000.0;
    let predicted_benefit_micros = notional * drift;
    let required_benefit = input.cost_mult * input.regime_mult * predicted_cost_micros;

    let should = predicted_benefit_micros >= required_benefit;
    GaterDecision {
        should_trade: should,
        drift,
        predicted_cost_micros,
        predicted_benefit_micros,
        reason: if should {
            "benefit exceeds cost"
        } else {
            "cost exceeds benefit"
        },
    }
}

fn override_reason_str(reason: OverrideReason) -> &'static str {
    match reason {
        OverrideReason::GrossBreach => "gross exposure breach",
        OverrideReason::NetBreach => "net exposure breach",
        OverrideReason::FxBreach => "fx exposure breach",
        OverrideReason::EmergencyDeRisk => "emergency de-risk",
        OverrideReason::ReconciliationFailed => "reconciliation failed",
        OverrideReason::CrisisUrgency => "crisis urgency",
        OverrideReason::Hedge => "hedge",
    }
}
