//! EU Sovereign Fragility Short sleeve: BTP-Bund DV01-neutral spread trade.
//!
//! Short BTP (Italy), long Bund (Germany), isolating fragmentation risk
//! rather than a directional rates bet. A deflation scaler forces the
//! sleeve flat in risk-off + rates-rally scenarios where the spread trade
//! would otherwise bleed, and loss-based kill-switches cut sizing
//! independent of the deflation read.

use crate::vol::RiskRegime;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KillSwitchType {
    None,
    Soft,
    Hard,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SleeveState {
    Active,
    SoftKilled,
    HardKilled,
    ReenablePending,
}

#[derive(Clone, Copy, Debug)]
pub struct FragmentationSignal {
    pub spread_bps: f64,
    pub spread_z: f64,
    pub bund_yield_mom_60d_bps: f64,
    pub bund_yield_change_5d_bps: f64,
    pub bund_yield_mom_20d_bps: f64,
    pub vix_level: f64,
    pub stress_score: f64,
}

impl FragmentationSignal {
    pub fn risk_off(&self) -> bool {
        self.vix_level > 30.0 || self.stress_score > 0.75
    }

    pub fn rates_down_shock(&self) -> bool {
        self.bund_yield_change_5d_bps < -30.0 || self.bund_yield_mom_20d_bps < -40.0
    }

    /// Legacy binary guard, kept for reporting alongside the v3 tiered scaler.
    pub fn deflation_guard(&self) -> bool {
        self.risk_off() && self.rates_down_shock()
    }
}

#[derive(Clone, Copy, Debug)]
pub struct RegimeWeights {
    pub normal: f64,
    pub elevated: f64,
    pub crisis: f64,
}

impl RegimeWeights {
    fn for_regime(&self, regime: RiskRegime) -> f64 {
        match regime {
            RiskRegime::Crisis => self.crisis,
            RiskRegime::Elevated => self.elevated,
            RiskRegime::Normal | RiskRegime::Recovery => self.normal,
        }
    }
}

#[derive(Clone, Debug)]
pub struct SovereignConfig {
    pub enabled: bool,
    pub base_weights: RegimeWeights,
    pub max_weights: RegimeWeights,
    pub dv01_budget_per_nav: f64,
    pub dv01_per_btp: f64,
    pub dv01_per_bund: f64,

    pub frag_mult_z_low: f64,
    pub frag_mult_z_mid: f64,
    pub frag_mult_z_high: f64,
    pub rates_mult_low_bps: f64,
    pub rates_mult_high_bps: f64,

    pub deflation_scaler_enabled: bool,
    pub deflation_fragmentation_bypass_z: f64,
    pub deflation_tier1_vix: f64,
    pub deflation_tier1_bund_5d_bps: f64,
    pub deflation_tier2_vix: f64,
    pub deflation_tier2_bund_5d_bps: f64,
    pub deflation_tier3_vix: f64,
    pub deflation_tier3_bund_5d_bps: f64,

    pub hard_kill_daily_loss_pct: f64,
    pub hard_kill_10d_drawdown_pct: f64,
    pub soft_kill_spread_z: f64,
    pub soft_kill_bund_mom_20d_bps: f64,
    pub reenable_days: u32,

    pub take_profit_spread_z: f64,
    pub take_profit_spread_widening_bps: f64,
    pub profit_take_pct: f64,
    pub recycle_wait_days: u32,
}

impl SovereignConfig {
    pub fn sane_defaults() -> Self {
        SovereignConfig {
            enabled: true,
            base_weights: RegimeWeights { normal: 0.06, elevated: 0.12, crisis: 0.16 },
            max_weights: RegimeWeights { normal: 0.10, elevated: 0.16, crisis: 0.20 },
            dv01_budget_per_nav: 0.0007,
            dv01_per_btp: 78.0,
            dv01_per_bund: 80.0,

            frag_mult_z_low: 0.0,
            frag_mult_z_mid: 1.0,
            frag_mult_z_high: 2.0,
            rates_mult_low_bps: 10.0,
            rates_mult_high_bps: 40.0,

            deflation_scaler_enabled: true,
            deflation_fragmentation_bypass_z: 0.5,
            deflation_tier1_vix: 35.0,
            deflation_tier1_bund_5d_bps: -30.0,
            deflation_tier2_vix: 45.0,
            deflation_tier2_bund_5d_bps: -40.0,
            deflation_tier3_vix: 55.0,
            deflation_tier3_bund_5d_bps: -60.0,

            hard_kill_daily_loss_pct: 0.006,
            hard_kill_10d_drawdown_pct: 0.015,
            soft_kill_spread_z: -0.5,
            soft_kill_bund_mom_20d_bps: -20.0,
            reenable_days: 5,

            take_profit_spread_z: 2.5,
            take_profit_spread_widening_bps: 120.0,
            profit_take_pct: 0.50,
            recycle_wait_days: 3,
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct SleeveTracker {
    pub state_active: bool,
    pub state: Option<SleeveState>,
    pub days_at_zero: u32,
    pub entry_spread_avg_bps: f64,
    pub entry_day: Option<i64>,
    pub last_profit_take_day: Option<i64>,
    pub cumulative_pnl: f64,
    pub daily_pnl_history: Vec<f64>,
}

impl SleeveTracker {
    pub fn new() -> Self {
        SleeveTracker { state: Some(SleeveState::Active), ..Default::default() }
    }

    pub fn state(&self) -> SleeveState {
        self.state.unwrap_or(SleeveState::Active)
    }

    pub fn update_daily_pnl(&mut self, pnl: f64) {
        self.daily_pnl_history.push(pnl);
        if self.daily_pnl_history.len() > 10 {
            let drop = self.daily_pnl_history.len() - 10;
            self.daily_pnl_history.drain(0..drop);
        }
        self.cumulative_pnl += pnl;
    }

    pub fn rolling_10d_pnl(&self) -> f64 {
        self.daily_pnl_history.iter().sum()
    }
}

#[derive(Clone, Copy, Debug)]
pub struct SizingResult {
    pub target_weight: f64,
    pub base_weight: f64,
    pub frag_multiplier: f64,
    pub rates_multiplier: f64,
    pub deflation_scaler: f64,
    pub max_weight: f64,
    pub soft_kill: bool,
    pub regime: RiskRegime,
}

/// 3-tier continuous deflation scaler (1.0 / 0.5 / 0.25 / 0.0). A fragmentation
/// bypass keeps the position at full size when the spread itself is widening,
/// since fragmentation stress is exactly what this sleeve is meant to hold.
fn deflation_scaler(cfg: &SovereignConfig, signal: &FragmentationSignal) -> f64 {
    if !cfg.deflation_scaler_enabled {
        return 1.0;
    }
    if signal.spread_z >= cfg.deflation_fragmentation_bypass_z {
        return 1.0;
    }
    let vix = signal.vix_level;
    let bund_5d = signal.bund_yield_change_5d_bps;
    if vix >= cfg.deflation_tier3_vix && bund_5d <= cfg.deflation_tier3_bund_5d_bps {
        0.0
    } else if vix >= cfg.deflation_tier2_vix && bund_5d <= cfg.deflation_tier2_bund_5d_bps {
        0.25
    } else if vix >= cfg.deflation_tier1_vix && bund_5d <= cfg.deflation_tier1_bund_5d_bps {
        0.5
    } else {
        1.0
    }
}

/// Loss-based kill-switches, independent of the deflation scaler. Mutates
/// the tracker's state so callers can observe soft/hard-killed history.
pub fn check_kill_switches(
    cfg: &SovereignConfig,
    tracker: &mut SleeveTracker,
    signal: &FragmentationSignal,
    nav: f64,
    current_daily_pnl: f64,
) -> KillSwitchType {
    let daily_loss_pct = if nav > 0.0 { -current_daily_pnl / nav } else { 0.0 };
    if daily_loss_pct > cfg.hard_kill_daily_loss_pct {
        tracker.state = Some(SleeveState::HardKilled);
        return KillSwitchType::Hard;
    }

    let rolling_10d_pct = if nav > 0.0 { tracker.rolling_10d_pnl() / nav } else { 0.0 };
    if rolling_10d_pct < -cfg.hard_kill_10d_drawdown_pct {
        tracker.state = Some(SleeveState::HardKilled);
        return KillSwitchType::Hard;
    }

    if signal.spread_z < cfg.soft_kill_spread_z {
        tracker.state = Some(SleeveState::SoftKilled);
        return KillSwitchType::Soft;
    }
    if signal.bund_yield_mom_20d_bps < cfg.soft_kill_bund_mom_20d_bps {
        tracker.state = Some(SleeveState::SoftKilled);
        return KillSwitchType::Soft;
    }

    if tracker.state() == SleeveState::SoftKilled {
        tracker.state = Some(SleeveState::Active);
    }
    KillSwitchType::None
}

/// `target_w = base_w_by_regime * frag_mult * rates_up_mult * deflation_scaler`,
/// clamped to `max_w_by_regime`. A deflation-scaler tier-3 kill or a hard
/// loss-based kill both force the weight to zero outright.
pub fn compute_target_weight(
    cfg: &SovereignConfig,
    tracker: &mut SleeveTracker,
    signal: &FragmentationSignal,
    regime: RiskRegime,
    nav: f64,
    current_daily_pnl: f64,
) -> SizingResult {
    let base_w = cfg.base_weights.for_regime(regime);
    let max_w = cfg.max_weights.for_regime(regime);
    let defl_scaler = deflation_scaler(cfg, signal);

    if defl_scaler == 0.0 {
        return SizingResult {
            target_weight: 0.0,
            base_weight: base_w,
            frag_multiplier: 0.0,
            rates_multiplier: 0.0,
            deflation_scaler: 0.0,
            max_weight: max_w,
            soft_kill: false,
            regime,
        };
    }

    let kill = check_kill_switches(cfg, tracker, signal, nav, current_daily_pnl);
    if kill == KillSwitchType::Hard {
        return SizingResult {
            target_weight: 0.0,
            base_weight: base_w,
            frag_multiplier: 0.0,
            rates_multiplier: 0.0,
            deflation_scaler: defl_scaler,
            max_weight: max_w,
            soft_kill: false,
            regime,
        };
    }

    let frag_mult = if signal.spread_z < cfg.frag_mult_z_low {
        0.5
    } else if signal.spread_z < cfg.frag_mult_z_mid {
        1.0
    } else if signal.spread_z < cfg.frag_mult_z_high {
        1.3
    } else {
        1.6
    };

    let rates_mult = if signal.bund_yield_mom_60d_bps < cfg.rates_mult_low_bps {
        0.8
    } else if signal.bund_yield_mom_60d_bps < cfg.rates_mult_high_bps {
        1.0
    } else {
        1.2
    };

    let mut target_w = base_w * frag_mult * rates_mult * defl_scaler;
    let soft_kill = kill == KillSwitchType::Soft;
    if soft_kill {
        target_w *= 0.5;
    }
    target_w = target_w.clamp(0.0, max_w);

    SizingResult {
        target_weight: target_w,
        base_weight: base_w,
        frag_multiplier: frag_mult,
        rates_multiplier: rates_mult,
        deflation_scaler: defl_scaler,
        max_weight: max_w,
        soft_kill,
        regime,
    }
}

#[derive(Clone, Copy, Debug)]
pub struct Dv01Position {
    pub btp_contracts: i64,
    pub bund_contracts: i64,
    pub target_dv01: f64,
    pub actual_net_dv01: f64,
}

impl Dv01Position {
    /// Neutral within 5% of target DV01 (flat target is trivially neutral iff both legs are flat).
    pub fn is_neutral(&self) -> bool {
        if self.target_dv01 == 0.0 {
            return self.btp_contracts == 0 && self.bund_contracts == 0;
        }
        self.actual_net_dv01.abs() < self.target_dv01.abs() * 0.05
    }
}

/// DV01-neutral construction: short BTP sized off the DV01 budget, then Bund
/// sized to match the BTP leg's DV01 exactly (subject to whole-contract rounding).
pub fn compute_dv01_position(cfg: &SovereignConfig, target_weight: f64, nav: f64) -> Dv01Position {
    if target_weight <= 0.0 {
        return Dv01Position { btp_contracts: 0, bund_contracts: 0, target_dv01: 0.0, actual_net_dv01: 0.0 };
    }

    let target_dv01 = target_weight * nav * cfg.dv01_budget_per_nav;
    let btp_contracts = -(target_dv01 / cfg.dv01_per_btp).round() as i64;
    let bund_dv01_needed = (btp_contracts.unsigned_abs() as f64) * cfg.dv01_per_btp;
    let bund_contracts = (bund_dv01_needed / cfg.dv01_per_bund).round() as i64;
    let actual_net_dv01 = btp_contracts as f64 * cfg.dv01_per_btp + bund_contracts as f64 * cfg.dv01_per_bund;

    Dv01Position { btp_contracts, bund_contracts, target_dv01, actual_net_dv01 }
}

/// `(should_take_profit, take_pct)`. Respects the recycle wait period after a
/// prior take so the sleeve doesn't re-trim on every subsequent tick.
pub fn check_take_profit(
    cfg: &SovereignConfig,
    tracker: &SleeveTracker,
    signal: &FragmentationSignal,
    today_day_index: i64,
) -> (bool, f64) {
    if let Some(last) = tracker.last_profit_take_day {
        if today_day_index - last < cfg.recycle_wait_days as i64 {
            return (false, 0.0);
        }
    }

    if signal.spread_z >= cfg.take_profit_spread_z {
        return (true, cfg.profit_take_pct);
    }

    if tracker.entry_spread_avg_bps > 0.0 {
        let widening = signal.spread_bps - tracker.entry_spread_avg_bps;
        if widening >= cfg.take_profit_spread_widening_bps {
            return (true, cfg.profit_take_pct);
        }
    }

    (false, 0.0)
}

/// Re-enable requires N consecutive non-deflation-guard days since the kill,
/// and the spread must not be compressing in a NORMAL regime.
pub fn should_reenable(cfg: &SovereignConfig, tracker: &SleeveTracker, signal: &FragmentationSignal, last_regime: Option<RiskRegime>) -> bool {
    if signal.deflation_guard() {
        return false;
    }
    if signal.spread_z < 0.0 && last_regime == Some(RiskRegime::Normal) {
        return false;
    }
    tracker.days_at_zero >= cfg.reenable_days
}

#[cfg(test)]
mod tests {
    use super::*;

    fn calm_signal() -> FragmentationSignal {
        FragmentationSignal {
            spread_bps: 180.0,
            spread_z: 0.8,
            bund_yield_mom_60d_bps: 5.0,
            bund_yield_change_5d_bps: 2.0,
            bund_yield_mom_20d_bps: 1.0,
            vix_level: 18.0,
            stress_score: 0.2,
        }
    }

    #[test]
    fn deflation_tier3_zeroes_weight() {
        let cfg = SovereignConfig::sane_defaults();
        let mut tracker = SleeveTracker::new();
        let signal = FragmentationSignal {
            spread_bps: 150.0,
            spread_z: 0.1, // below bypass
            bund_yield_mom_60d_bps: -5.0,
            bund_yield_change_5d_bps: -70.0,
            bund_yield_mom_20d_bps: -50.0,
            vix_level: 60.0,
            stress_score: 0.9,
        };
        let result = compute_target_weight(&cfg, &mut tracker, &signal, RiskRegime::Crisis, 1_000_000.0, 0.0);
        assert_eq!(result.target_weight, 0.0);
        assert_eq!(result.deflation_scaler, 0.0);
    }

    #[test]
    fn fragmentation_bypass_keeps_full_scaler_despite_vix() {
        let cfg = SovereignConfig::sane_defaults();
        let signal = FragmentationSignal {
            spread_bps: 400.0,
            spread_z: 2.5, // above bypass threshold
            bund_yield_mom_60d_bps: 0.0,
            bund_yield_change_5d_bps: -70.0,
            bund_yield_mom_20d_bps: -50.0,
            vix_level: 60.0,
            stress_score: 0.9,
        };
        assert_eq!(deflation_scaler(&cfg, &signal), 1.0);
    }

    #[test]
    fn hard_kill_on_daily_loss_zeroes_weight() {
        let cfg = SovereignConfig::sane_defaults();
        let mut tracker = SleeveTracker::new();
        let signal = calm_signal();
        let nav = 1_000_000.0;
        let daily_pnl = -7_000.0; // 0.7% loss > 0.6% threshold
        let result = compute_target_weight(&cfg, &mut tracker, &signal, RiskRegime::Normal, nav, daily_pnl);
        assert_eq!(result.target_weight, 0.0);
        assert_eq!(tracker.state(), SleeveState::HardKilled);
    }

    #[test]
    fn soft_kill_halves_weight() {
        let cfg = SovereignConfig::sane_defaults();
        let mut tracker = SleeveTracker::new();
        let signal = FragmentationSignal { spread_z: -0.8, ..calm_signal() };
        let result = compute_target_weight(&cfg, &mut tracker, &signal, RiskRegime::Normal, 1_000_000.0, 0.0);
        assert!(result.soft_kill);
        assert!(result.target_weight > 0.0);
        assert!(result.target_weight <= result.max_weight);
    }

    #[test]
    fn normal_regime_weight_within_bounds() {
        let cfg = SovereignConfig::sane_defaults();
        let mut tracker = SleeveTracker::new();
        let signal = calm_signal();
        let result = compute_target_weight(&cfg, &mut tracker, &signal, RiskRegime::Normal, 1_000_000.0, 0.0);
        assert!(result.target_weight > 0.0);
        assert!(result.target_weight <= cfg.max_weights.normal);
    }

    #[test]
    fn dv01_position_is_neutral() {
        let cfg = SovereignConfig::sane_defaults();
        let pos = compute_dv01_position(&cfg, 0.10, 1_000_000.0);
        assert!(pos.btp_contracts < 0);
        assert!(pos.bund_contracts > 0);
        assert!(pos.is_neutral());
    }

    #[test]
    fn dv01_position_flat_at_zero_weight() {
        let cfg = SovereignConfig::sane_defaults();
        let pos = compute_dv01_position(&cfg, 0.0, 1_000_000.0);
        assert_eq!(pos.btp_contracts, 0);
        assert_eq!(pos.bund_contracts, 0);
        assert!(pos.is_neutral());
    }

    #[test]
    fn take_profit_on_spread_z_threshold() {
        let cfg = SovereignConfig::sane_defaults();
        let tracker = SleeveTracker::new();
        let signal = FragmentationSignal { spread_z: 3.0, ..calm_signal() };
        let (should, pct) = check_take_profit(&cfg, &tracker, &signal, 100);
        assert!(should);
        assert_eq!(pct, 0.50);
    }

    #[test]
    fn take_profit_respects_recycle_wait() {
        let cfg = SovereignConfig::sane_defaults();
        let mut tracker = SleeveTracker::new();
        tracker.last_profit_take_day = Some(100);
        let signal = FragmentationSignal { spread_z: 3.0, ..calm_signal() };
        let (should, _) = check_take_profit(&cfg, &tracker, &signal, 101);
        assert!(!should);
    }

    #[test]
    fn reenable_requires_consecutive_days_and_no_deflation_guard() {
        let cfg = SovereignConfig::sane_defaults();
        let mut tracker = SleeveTracker::new();
        tracker.days_at_zero = cfg.reenable_days;
        let signal = calm_signal();
        assert!(should_reenable(&cfg, &tracker, &signal, Some(RiskRegime::Elevated)));

        tracker.days_at_zero = 0;
        assert!(!should_reenable(&cfg, &tracker, &signal, Some(RiskRegime::Elevated)));
    }
}
