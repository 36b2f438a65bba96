//! Volatility targeting, regime classification, and drawdown.
//!
//! Pure functions over a returns history. No IO, no time source: callers
//! supply the returns series and VIX/spread-momentum readings already
//! synchronized to the current trade date.

pub const TRADING_DAYS_PER_YEAR: f64 = 252.0;

/// Annualized realized volatility of the trailing `window` returns.
///
/// Returns 0.0 if fewer than 2 returns are available (stddev undefined).
pub fn realized_vol(returns: &[f64], window: usize) -> f64 {
    let n = returns.len().min(window);
    if n < 2 {
        return 0.0;
    }
    let slice = &returns[returns.len() - n..];
    let mean = slice.iter().sum::<f64>() / n as f64;
    let var = slice.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / (n as f64 - 1.0);
    var.sqrt() * TRADING_DAYS_PER_YEAR.sqrt()
}

/// Volatility floor/burn-in blend: while the history is shorter than
/// `burn_in_days`, fall back to `max(realized, initial_prior)` (the prior
/// dominates noisy short-history estimates); afterward use
/// `max(realized, vol_floor)`.
pub fn effective_vol(realized: f64, history_days: usize, burn_in_days: usize, initial_prior: f64, vol_floor: f64) -> f64 {
    if history_days < burn_in_days {
        realized.max(initial_prior)
    } else {
        realized.max(vol_floor)
    }
}

/// `clamp(target_vol / effective_vol, f_min, f_max)`.
///
/// `effective_vol` is guaranteed > 0 by construction (floor/prior are both
/// positive), so this never divides by zero; a zero-length returns history
/// still yields a clamped, finite scaling factor.
pub fn scaling_factor(target_vol: f64, effective_vol: f64, f_min: f64, f_max: f64) -> f64 {
    if effective_vol <= 0.0 {
        return f_max;
    }
    (target_vol / effective_vol).clamp(f_min, f_max)
}

/// Running maximum of an equity curve, `cummax[i] = max(eq[0..=i])`.
pub fn cummax(equity: &[f64]) -> Vec<f64> {
    let mut out = Vec::with_capacity(equity.len());
    let mut running = f64::MIN;
    for &e in equity {
        running = running.max(e);
        out.push(running);
    }
    out
}

/// Drawdown series `(eq - cummax(eq)) / cummax(eq)`, always <= 0.
pub fn drawdown_series(equity: &[f64]) -> Vec<f64> {
    let peaks = cummax(equity);
    equity
        .iter()
        .zip(peaks.iter())
        .map(|(&e, &peak)| if peak > 0.0 { (e - peak) / peak } else { 0.0 })
        .collect()
}

/// `max_dd` over the whole series and `current_dd` (the series' last value).
/// Returns `(0.0, 0.0)` for an empty series (no NaN, no div-by-zero).
pub fn drawdown_stats(equity: &[f64]) -> (f64, f64) {
    if equity.is_empty() {
        return (0.0, 0.0);
    }
    let dd = drawdown_series(equity);
    let max_dd = dd.iter().cloned().fold(0.0_f64, f64::min);
    let current_dd = *dd.last().unwrap();
    (max_dd, current_dd)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RiskRegime {
    Normal,
    Elevated,
    Crisis,
    Recovery,
}

impl RiskRegime {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskRegime::Normal => "NORMAL",
            RiskRegime::Elevated => "ELEVATED",
            RiskRegime::Crisis => "CRISIS",
            RiskRegime::Recovery => "RECOVERY",
        }
    }
}

/// Regime classification: CRISIS if `vix >= 40` or `current_dd <= -0.10`;
/// ELEVATED if `vix >= 25` or `current_dd <= -0.05`; RECOVERY if
/// `-0.03 < current_dd < 0` and `vix < 20`; else NORMAL.
///
/// `RECOVERY` is computed for observability only — per the reference
/// source it does not feed back into `scaling_factor` (see DESIGN.md).
pub fn classify_regime(vix: f64, current_dd: f64) -> RiskRegime {
    if vix >= 40.0 || current_dd <= -0.10 {
        RiskRegime::Crisis
    } else if vix >= 25.0 || current_dd <= -0.05 {
        RiskRegime::Elevated
    } else if current_dd > -0.03 && current_dd < 0.0 && vix < 20.0 {
        RiskRegime::Recovery
    } else {
        RiskRegime::Normal
    }
}

/// Emergency-derisk: `current_dd <= -max_dd_pct` forces scaling to 0.25.
pub fn emergency_derisk(current_dd: f64, max_dd_pct: f64) -> bool {
    current_dd <= -max_dd_pct
}
