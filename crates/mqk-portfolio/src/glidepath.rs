//! Legacy unwind glidepath (§2 step 9): blends strategy targets with a
//! frozen first-run snapshot over `unwind_days`, so a one-time migration
//! onto this engine doesn't dump legacy positions in a single rebalance.
//!
//! Pure logic: callers own the snapshot's persistence (`state/portfolio_init.json`)
//! and supply `today_day_index` as an elapsed trading-day counter rather than
//! a wall-clock date.

use std::collections::BTreeMap;

#[derive(Clone, Debug, PartialEq)]
pub struct GlidepathConfig {
    pub enabled: bool,
    pub unwind_days: i64,
}

impl GlidepathConfig {
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            unwind_days: 10,
        }
    }
}

/// A frozen snapshot of legacy positions taken on the glidepath's first run.
#[derive(Clone, Debug, PartialEq)]
pub struct GlidepathSnapshot {
    pub snapshot_day_index: i64,
    pub positions: BTreeMap<String, f64>,
}

/// `alpha = min(1.0, days_elapsed / unwind_days)`. Disabled config, missing
/// snapshot, or a snapshot dated after `today_day_index` (clock skew) all
/// fully defer to the target (`alpha = 1.0`).
pub fn compute_alpha(
    cfg: &GlidepathConfig,
    snapshot: Option<&GlidepathSnapshot>,
    today_day_index: i64,
) -> f64 {
    if !cfg.enabled {
        return 1.0;
    }
    let Some(snapshot) = snapshot else {
        return 1.0;
    };
    let days_elapsed = today_day_index - snapshot.snapshot_day_index;
    if days_elapsed < 0 {
        return 1.0;
    }
    if cfg.unwind_days <= 0 {
        return 1.0;
    }
    (days_elapsed as f64 / cfg.unwind_days as f64).min(1.0)
}

/// Blend `target_positions` toward the snapshot: `alpha*target + (1-alpha)*initial`,
/// rounded to whole shares. Instruments present in only one side are treated
/// as zero on the other. Returns the targets unchanged once `alpha >= 1.0`
/// or when there is nothing to blend against.
pub fn blend_positions(
    cfg: &GlidepathConfig,
    snapshot: Option<&GlidepathSnapshot>,
    target_positions: &BTreeMap<String, f64>,
    today_day_index: i64,
) -> BTreeMap<String, i64> {
    let alpha = compute_alpha(cfg, snapshot, today_day_index);

    if alpha >= 1.0 {
        return target_positions
            .iter()
            .map(|(k, &v)| (k.clone(), v.round() as i64))
            .collect();
    }

    let Some(snapshot) = snapshot else {
        return target_positions
            .iter()
            .map(|(k, &v)| (k.clone(), v.round() as i64))
            .collect();
    };

    let mut instruments: Vec<&String> = target_positions
        .keys()
        .chain(snapshot.positions.keys())
        .collect();
    instruments.sort();
    instruments.dedup();

    instruments
        .into_iter()
        .map(|inst_id| {
            let target_qty = target_positions.get(inst_id).copied().unwrap_or(0.0);
            let initial_qty = snapshot.positions.get(inst_id).copied().unwrap_or(0.0);
            let blended = alpha * target_qty + (1.0 - alpha) * initial_qty;
            (inst_id.clone(), blended.round() as i64)
        })
        .collect()
}
