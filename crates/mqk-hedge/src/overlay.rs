//! Sovereign Overlay (§4.5) — put spreads on US-listed European sovereign
//! proxies (EWI, EWQ, FXE, EUFN), stress-scored off 52-week drawdown with a
//! tiered ADD/INCREASE/MONETIZE/HOLD/ROLL response.

#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum SovereignProxy {
    /// iShares MSCI Italy ETF.
    Ewi,
    /// iShares MSCI France ETF.
    Ewq,
    /// Invesco CurrencyShares Euro Trust.
    Fxe,
    /// iShares MSCI Europe Financials ETF.
    Eufn,
}

impl SovereignProxy {
    pub fn otm_pct(self) -> f64 {
        match self {
            SovereignProxy::Ewi => 0.10,
            SovereignProxy::Ewq => 0.08,
            SovereignProxy::Fxe => 0.05,
            SovereignProxy::Eufn => 0.12,
        }
    }

    pub fn spread_width_pct(self) -> f64 {
        match self {
            SovereignProxy::Ewi => 0.05,
            SovereignProxy::Ewq => 0.04,
            SovereignProxy::Fxe => 0.03,
            SovereignProxy::Eufn => 0.06,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum StressLevel {
    Low,
    Elevated,
    High,
    Crisis,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Trend {
    Widening,
    Stable,
    Tightening,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum OverlayAction {
    Hold,
    Add,
    Increase,
    Monetize,
    Roll,
}

#[derive(Clone, Debug, PartialEq)]
pub struct StressConfig {
    pub threshold_elevated: f64,
    pub threshold_high: f64,
    pub threshold_crisis: f64,
    pub min_dte_roll: i64,
}

impl StressConfig {
    pub fn sane_defaults() -> Self {
        Self {
            threshold_elevated: 0.25,
            threshold_high: 0.40,
            threshold_crisis: 0.55,
            min_dte_roll: 21,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StressSignal {
    pub stress_level: StressLevel,
    pub stress_score: f64,
    pub drawdown: f64,
    pub trend: Trend,
}

/// `drawdown = (current - high_52w) / high_52w`, always <= 0.
pub fn compute_drawdown(current_price: f64, high_52w: f64) -> f64 {
    if high_52w <= 0.0 {
        return 0.0;
    }
    (current_price - high_52w) / high_52w
}

/// 20-day momentum classified into a trend bucket.
pub fn classify_trend(momentum_20d: f64) -> Trend {
    if momentum_20d < -0.05 {
        Trend::Widening
    } else if momentum_20d > 0.03 {
        Trend::Tightening
    } else {
        Trend::Stable
    }
}

/// Stress score in [0, 1]: `min(1, max(0, -drawdown / 0.50))`.
pub fn stress_score(drawdown: f64) -> f64 {
    (-drawdown / 0.50).clamp(0.0, 1.0)
}

pub fn classify_stress_level(cfg: &StressConfig, drawdown: f64) -> StressLevel {
    let severity = -drawdown;
    if severity >= cfg.threshold_crisis {
        StressLevel::Crisis
    } else if severity >= cfg.threshold_high {
        StressLevel::High
    } else if severity >= cfg.threshold_elevated {
        StressLevel::Elevated
    } else {
        StressLevel::Low
    }
}

pub fn compute_stress_signal(cfg: &StressConfig, current_price: f64, high_52w: f64, momentum_20d: f64) -> StressSignal {
    let drawdown = compute_drawdown(current_price, high_52w);
    StressSignal {
        stress_level: classify_stress_level(cfg, drawdown),
        stress_score: stress_score(drawdown),
        drawdown,
        trend: classify_trend(momentum_20d),
    }
}

/// Tiered action decision given stress level, trend, and whether coverage
/// with more than `min_dte_roll` days remaining is already held.
pub fn determine_action(signal: &StressSignal, has_live_coverage: bool) -> OverlayAction {
    match signal.stress_level {
        StressLevel::Crisis => {
            if has_live_coverage {
                OverlayAction::Monetize
            } else {
                OverlayAction::Add
            }
        }
        StressLevel::High => {
            if has_live_coverage && signal.trend == Trend::Tightening {
                OverlayAction::Monetize
            } else if !has_live_coverage {
                OverlayAction::Add
            } else {
                OverlayAction::Hold
            }
        }
        StressLevel::Elevated => {
            if !has_live_coverage && signal.trend == Trend::Widening {
                OverlayAction::Add
            } else if has_live_coverage {
                OverlayAction::Hold
            } else {
                OverlayAction::Hold
            }
        }
        StressLevel::Low => {
            if !has_live_coverage {
                OverlayAction::Add
            } else {
                OverlayAction::Hold
            }
        }
    }
}

/// Target per-proxy allocation of the overlay budget; must sum to ~1.0.
pub fn default_country_allocation() -> [(SovereignProxy, f64); 4] {
    [
        (SovereignProxy::Ewi, 0.35),
        (SovereignProxy::Ewq, 0.25),
        (SovereignProxy::Fxe, 0.20),
        (SovereignProxy::Eufn, 0.20),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drawdown_is_nonpositive_below_high() {
        let d = compute_drawdown(80.0, 100.0);
        assert!((d - (-0.20)).abs() < 1e-9);
    }

    #[test]
    fn stress_score_clamped_to_unit_interval() {
        assert_eq!(stress_score(-1.0), 1.0);
        assert_eq!(stress_score(0.0), 0.0);
        assert!((stress_score(-0.25) - 0.5).abs() < 1e-9);
    }

    #[test]
    fn stress_levels_escalate_with_drawdown() {
        let cfg = StressConfig::sane_defaults();
        assert_eq!(classify_stress_level(&cfg, -0.10), StressLevel::Low);
        assert_eq!(classify_stress_level(&cfg, -0.30), StressLevel::Elevated);
        assert_eq!(classify_stress_level(&cfg, -0.45), StressLevel::High);
        assert_eq!(classify_stress_level(&cfg, -0.60), StressLevel::Crisis);
    }

    #[test]
    fn crisis_without_coverage_adds_protection() {
        let signal = StressSignal {
            stress_level: StressLevel::Crisis,
            stress_score: 1.0,
            drawdown: -0.60,
            trend: Trend::Widening,
        };
        assert_eq!(determine_action(&signal, false), OverlayAction::Add);
    }

    #[test]
    fn crisis_with_coverage_monetizes() {
        let signal = StressSignal {
            stress_level: StressLevel::Crisis,
            stress_score: 1.0,
            drawdown: -0.60,
            trend: Trend::Widening,
        };
        assert_eq!(determine_action(&signal, true), OverlayAction::Monetize);
    }

    #[test]
    fn high_stress_tightening_with_coverage_monetizes() {
        let signal = StressSignal {
            stress_level: StressLevel::High,
            stress_score: 0.8,
            drawdown: -0.45,
            trend: Trend::Tightening,
        };
        assert_eq!(determine_action(&signal, true), OverlayAction::Monetize);
    }

    #[test]
    fn low_stress_without_coverage_still_adds_cheap_protection() {
        let signal = StressSignal {
            stress_level: StressLevel::Low,
            stress_score: 0.1,
            drawdown: -0.05,
            trend: Trend::Stable,
        };
        assert_eq!(determine_action(&signal, false), OverlayAction::Add);
    }

    #[test]
    fn country_allocation_sums_to_one() {
        let total: f64 = default_country_allocation().iter().map(|(_, w)| w).sum();
        assert!((total - 1.0).abs() < 1e-9);
    }
}
