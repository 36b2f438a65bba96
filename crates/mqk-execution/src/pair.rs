//! Pair Executor (§4.4.4) — legs submitted concurrently; tracks imbalance
//! between the two legs and decides what to do about a leg that has run
//! away from its partner.

use crate::types::Side;

const TRIGGER_FILL_PCT: f64 = 0.3;
const LAGGING_FILL_PCT: f64 = 0.1;
const MAX_LEGGING_SECONDS: i64 = 60;

#[derive(Clone, Debug, PartialEq)]
pub struct PairLeg {
    pub symbol: String,
    pub side: Side,
    pub target_qty: i64,
    pub filled_qty: i64,
}

pub fn fill_frac(leg: &PairLeg) -> f64 {
    if leg.target_qty == 0 {
        return 0.0;
    }
    leg.filled_qty as f64 / leg.target_qty as f64
}

/// Snapshot of both legs' fill state.
#[derive(Clone, Debug, PartialEq)]
pub struct PairLegState {
    pub max_fill_pct: f64,
    pub min_fill_pct: f64,
    pub imbalance: f64,
    pub is_legged: bool,
}

pub fn leg_state(legs: &[PairLeg]) -> PairLegState {
    let fracs: Vec<f64> = legs.iter().map(fill_frac).collect();
    let max_fill_pct = fracs.iter().cloned().fold(f64::MIN, f64::max);
    let min_fill_pct = fracs.iter().cloned().fold(f64::MAX, f64::min);
    let imbalance = max_fill_pct - min_fill_pct;
    let is_legged = max_fill_pct >= TRIGGER_FILL_PCT && min_fill_pct < LAGGING_FILL_PCT;
    PairLegState {
        max_fill_pct,
        min_fill_pct,
        imbalance,
        is_legged,
    }
}

/// What to do about a pair that has become legged and stayed that way past
/// `max_legging_seconds`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum LegAction {
    /// Not legged, or within the grace window — keep waiting.
    None,
    /// Deploy a hedge sized at roughly half the leading leg's filled qty.
    DeployHedge { hedge_qty: i64 },
    /// Cancel/unwind the leading leg back toward flat.
    UndoLeadingLeg,
    /// Re-price the lagging leg more aggressively to catch up.
    RepriceLagging,
}

/// Decide what action to take given the current leg state and how long the
/// pair has been legged. `undo_enabled` opts into unwinding the leading leg
/// instead of the default hedge+reprice behavior.
pub fn decide_action(
    state: &PairLegState,
    seconds_since_legged: i64,
    undo_enabled: bool,
    leading_leg: &PairLeg,
) -> LegAction {
    if !state.is_legged {
        return LegAction::None;
    }
    if seconds_since_legged < MAX_LEGGING_SECONDS {
        return LegAction::None;
    }
    if undo_enabled {
        LegAction::UndoLeadingLeg
    } else if leading_leg.filled_qty > 1 {
        LegAction::DeployHedge {
            hedge_qty: leading_leg.filled_qty / 2,
        }
    } else {
        LegAction::RepriceLagging
    }
}

/// A pair is complete when every leg (and any deployed hedge) is fully
/// filled or otherwise terminal — callers pass `legs_done` for the legs and
/// `hedge_done` for an optional hedge leg (true if none was deployed).
pub fn pair_is_complete(legs_done: &[bool], hedge_done: bool) -> bool {
    legs_done.iter().all(|&d| d) && hedge_done
}
